//! Terminal screen model: attributed cell grid + escape-sequence parser.
//!
//! The screen is the engine's single source of truth about the game. Raw
//! transport bytes go in through [`ScreenBuffer::apply`]; the watch loop
//! reads prompts and messages back out through the query methods.

mod grid;
mod parser;

pub use grid::{
    AttrFlags, Cell, CellAttrs, Charset, Register, ScreenBuffer, DEFAULT_FG, HEIGHT, MESSAGE_ROW,
    WIDTH,
};

use regex::Regex;

use crate::error::{Error, Result};

/// Compiles a pattern for cursor-anchored matching, appending the end
/// anchor when the caller left it off.
pub fn anchored(pattern: &str) -> Result<Regex> {
    let owned;
    let anchored = if pattern.ends_with('$') {
        pattern
    } else {
        owned = format!("{pattern}$");
        &owned
    };
    Regex::new(anchored).map_err(|source| Error::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchored_appends_end_anchor() {
        let re = anchored(r"--More--").unwrap();
        assert!(re.is_match("foo --More--"));
        assert!(!re.is_match("--More-- foo"));
        // An existing anchor is left alone.
        assert_eq!(anchored(r"x$").unwrap().as_str(), "x$");
    }

    #[test]
    fn test_anchored_rejects_bad_pattern() {
        let err = anchored(r"[yn").unwrap_err();
        assert!(matches!(err, Error::Pattern { ref pattern, .. } if pattern == "[yn"));
    }
}
