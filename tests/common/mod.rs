//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to a test file, then:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = TestFixture::new();
//! let url = serve_listing(r#"[]"#);
//! fixture.write_config(&url, false);
//! fixture.command().arg("create").arg(fixture.config_path()).assert().success();
//! ```

use assert_fs::prelude::*;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git_available, init_source_repo, serve_listing, TestFixture};
}

/// Serve `body` as a JSON response to every request on a random local port.
///
/// The server thread lives until the test process exits. Returns the URL.
#[allow(dead_code)]
pub fn serve_listing(body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    let body = body.to_string();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut reader = BufReader::new(stream.try_clone().expect("Failed to clone stream"));
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap_or(0) > 0 {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }
            let _ = write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
        }
    });

    format!("http://{}/api/repos", addr)
}

/// Whether a usable `git` is on PATH.
#[allow(dead_code)]
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Create a non-bare repository with one commit at `dir`.
#[allow(dead_code)]
pub fn init_source_repo(dir: &Path) {
    let run = |args: &[&str]| {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .expect("Failed to run git");
        assert!(
            status.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&status.stderr)
        );
    };

    std::fs::create_dir_all(dir).expect("Failed to create source dir");
    run(&["init", "-q"]);
    run(&[
        "-c",
        "user.name=Backup Test",
        "-c",
        "user.email=backup@example.com",
        "commit",
        "-q",
        "--allow-empty",
        "-m",
        "initial",
    ]);
}

/// A temporary directory holding a config file, a backup directory and
/// optionally source repositories.
#[allow(dead_code)]
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a fixture with an empty `backup/` directory.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("backup")
            .create_dir_all()
            .expect("Failed to create backup dir");
        Self { temp_dir }
    }

    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    #[allow(dead_code)]
    pub fn backup_dir(&self) -> PathBuf {
        self.temp_dir.path().join("backup")
    }

    #[allow(dead_code)]
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("backup.toml")
    }

    /// Write a config pointing at `request_url` and the fixture's backup dir.
    #[allow(dead_code)]
    pub fn write_config(&self, request_url: &str, clone_bare: bool) -> &Self {
        self.write_raw_config(&format!(
            "request_url = {:?}\nbackup_dir = \"backup\"\nclone_bare = {}\n",
            request_url, clone_bare
        ))
    }

    /// Write the config file verbatim.
    #[allow(dead_code)]
    pub fn write_raw_config(&self, content: &str) -> &Self {
        self.temp_dir
            .child("backup.toml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// A command for the git-backup binary, colors off.
    #[allow(dead_code)]
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("git-backup");
        cmd.current_dir(self.path())
            .env_remove("GIT_BACKUP_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--color")
            .arg("never");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
