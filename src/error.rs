//! Error taxonomy for the automation engine
//!
//! Everything here is fatal for the current call: the engine refuses to
//! guess once the screen or protocol state is in doubt. End-of-session is
//! deliberately NOT an error; it is reported as the terminal
//! [`Event::Ended`](crate::core::session::Event::Ended).

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A prompt is still unanswered. Carries the question of the pending
    /// interaction so the offending call site can be identified from logs.
    #[error("Interaction already pending: {question:?}")]
    InteractionPending { question: String },

    /// An interaction was answered against a session that is not holding
    /// it as pending (already answered, or a different session).
    #[error("Interaction is not pending on this session")]
    InteractionNotPending,

    /// Escape sequence outside the recognized table. The cursor position
    /// can no longer be trusted, so the screen model refuses to continue.
    #[error("Unrecognized control sequence {sequence:?} at cursor ({x}, {y})")]
    UnrecognizedSequence {
        /// Sequence body as received, without the leading ESC byte.
        sequence: String,
        x: usize,
        y: usize,
    },

    /// Stream went idle, nothing classified, and the cursor is parked on
    /// an empty message row: the screen state cannot be explained.
    #[error("Ambiguous prompt at cursor ({x}, {y}): expected {expected:?}, text before cursor {before:?}")]
    AmbiguousPrompt {
        expected: Vec<String>,
        /// Text on the cursor row, up to the cursor.
        before: String,
        x: usize,
        y: usize,
    },

    /// A typed answer outside the prompt's legal option set.
    #[error("Answer {answer:?} is not among the legal options {options:?}")]
    InvalidAnswer { answer: String, options: String },

    /// A select dialog stopped showing its page marker while the engine
    /// was paging through it.
    #[error("Select dialog lost its page marker while paging")]
    DialogDesync,

    /// A caller-supplied watch pattern failed to compile.
    #[error("Invalid watch pattern {pattern:?}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Transport I/O failed: {0}")]
    Io(#[from] io::Error),

    /// Local process spawn failure (PTY transport).
    #[error("Failed to start game process: {0}")]
    Spawn(String),
}

impl Error {
    /// True for pending-slot misuse, the protocol-violation family.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Error::InteractionPending { .. } | Error::InteractionNotPending
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnrecognizedSequence {
            sequence: "[99x".to_string(),
            x: 3,
            y: 0,
        };
        assert_eq!(
            err.to_string(),
            "Unrecognized control sequence \"[99x\" at cursor (3, 0)"
        );

        let err = Error::InvalidAnswer {
            answer: "z".to_string(),
            options: "yn".to_string(),
        };
        assert!(err.to_string().contains("legal options"));
    }

    #[test]
    fn test_protocol_violation_predicate() {
        assert!(Error::InteractionNotPending.is_protocol_violation());
        assert!(Error::InteractionPending {
            question: "Eat it?".to_string()
        }
        .is_protocol_violation());
        assert!(!Error::Io(io::Error::new(io::ErrorKind::Other, "x")).is_protocol_violation());
    }
}
