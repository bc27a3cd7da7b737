//! Fetching and decoding the repository listing
//!
//! The listing is whatever JSON array the hosting provider's API returns for
//! `request_url`. One GET, no pagination and no authentication flow: tokens,
//! if any, have to be part of the URL.

use std::io::Read;
use std::time::Duration;

use log::debug;
use serde_json::Value;

use crate::error::{Error, Result};

/// Sent with every request; GitHub rejects API calls without a User-Agent.
pub const USER_AGENT: &str = concat!("git-backup/", env!("CARGO_PKG_VERSION"));

/// How long the listing request may take in total.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Bodies quoted in error messages are cut to this many bytes.
const MAX_QUOTED_BODY: usize = 200;

fn truncate(body: &str) -> String {
    if body.len() <= MAX_QUOTED_BODY {
        return body.to_string();
    }
    let mut cut = MAX_QUOTED_BODY;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &body[..cut])
}

/// Decode a listing body, which must be a JSON array.
///
/// Entries are returned as-is; turning them into repositories is the
/// resolver's job, so one odd entry cannot fail the whole listing.
pub fn parse_listing(body: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(entries)) => Ok(entries),
        Ok(_) => Err(Error::ListingNotArray {
            body: truncate(body.trim()),
        }),
        Err(e) => Err(Error::Json(e)),
    }
}

/// GET `url` and decode the repository listing.
pub fn fetch_listing(url: &str) -> Result<Vec<Value>> {
    let agent = ureq::AgentBuilder::new()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build();

    let response = agent
        .get(url)
        .set("Accept", "application/json")
        .call()
        .map_err(|e| match e {
            ureq::Error::Status(code, response) => {
                let body = response.into_string().unwrap_or_default();
                Error::Network {
                    url: url.to_string(),
                    message: format!("HTTP status {}: {}", code, truncate(body.trim())),
                }
            }
            ureq::Error::Transport(transport) => Error::Network {
                url: url.to_string(),
                message: transport.to_string(),
            },
        })?;

    let mut body = String::new();
    response
        .into_reader()
        .read_to_string(&mut body)
        .map_err(|e| Error::Network {
            url: url.to_string(),
            message: format!("failed to read response body: {}", e),
        })?;

    debug!("Fetched {} bytes from {}", body.len(), url);
    parse_listing(&body)
}
