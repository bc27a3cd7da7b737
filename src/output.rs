//! # Summary Styling
//!
//! `create`, `plan` and `validate` end with a short human readable report:
//! `[OK]`/`[FAIL]` markers, the clone/update verb of each planned action and
//! the cloned/updated/failed/skipped counts. On a color terminal the markers
//! become emoji and the counts are tinted by [`Tone`]: green for work done,
//! red for failures, dim for things that did not happen. Piped output and
//! `--color never` get the plain text, which is what scripts and the tests
//! match against.
//!
//! `--color auto` looks at the environment before asking the terminal:
//! `NO_COLOR` and `CLICOLOR=0` switch colors off, `CLICOLOR_FORCE` switches
//! them on, and `TERM=dumb` switches them off again.

use std::env;

use console::style;

/// Whether summaries are decorated.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and the `--color` flag
    /// value (`always`, `never` or `auto`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        let var = |name: &str| env::var(name).ok();

        if env::var_os("NO_COLOR").is_some() || var("CLICOLOR").as_deref() == Some("0") {
            return false;
        }
        if var("CLICOLOR_FORCE").is_some_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        var("TERM").as_deref() != Some("dumb") && console::Term::stdout().features().colors_supported()
    }

    /// Colors always enabled.
    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Colors always disabled.
    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns `emoji_str` when colors are enabled, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Meaning of a status word, mapped to a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Bad,
    Muted,
}

/// Style `text` according to `tone`, or return it unchanged without colors.
pub fn paint(config: &OutputConfig, text: &str, tone: Tone) -> String {
    if !config.use_color {
        return text.to_string();
    }
    let styled = match tone {
        Tone::Good => style(text).green(),
        Tone::Bad => style(text).red().bold(),
        Tone::Muted => style(text).dim(),
    };
    // force_styling: the decision was already made above
    styled.force_styling(true).to_string()
}
