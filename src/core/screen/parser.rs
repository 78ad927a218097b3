//! Escape-sequence recognition
//!
//! Two small pieces:
//!
//! - an incremental lexer that slices the byte stream into plain bytes and
//!   complete escape sequences, keeping partial sequences pending across
//!   chunk boundaries;
//! - a data-driven dispatch table mapping complete sequence bodies to
//!   screen actions.
//!
//! The table holds exactly the sequences the game is known to emit. A
//! complete sequence with no table entry is a hard error: once a cursor
//! movement goes uninterpreted, every later screen read is suspect, so
//! the model refuses to continue rather than desync silently.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::trace;

use crate::error::{Error, Result};

use super::grid::{Charset, Register, ScreenBuffer};

/// Lexer state between bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LexState {
    /// Plain bytes go straight to the screen.
    #[default]
    Ground,
    /// Saw ESC, waiting for the introducer.
    Escape,
    /// Inside a `[`-introduced sequence; a byte in 0x40..=0x7E ends it.
    Csi,
    /// Charset designation; exactly one byte follows.
    Designate,
}

/// Incremental sequence lexer. Owned by the screen; survives chunk
/// boundaries so `apply` stays chunk-independent.
#[derive(Debug, Default)]
pub(crate) struct SeqParser {
    state: LexState,
    buf: String,
}

impl SeqParser {
    pub(crate) fn advance(&mut self, screen: &mut ScreenBuffer, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.feed(screen, byte)?;
        }
        Ok(())
    }

    fn feed(&mut self, screen: &mut ScreenBuffer, byte: u8) -> Result<()> {
        match self.state {
            LexState::Ground => {
                if byte == 0x1b {
                    self.buf.clear();
                    self.state = LexState::Escape;
                } else {
                    screen.handle_byte(byte);
                }
                Ok(())
            }
            LexState::Escape => {
                self.buf.push(byte as char);
                match byte {
                    b'[' => {
                        self.state = LexState::Csi;
                        Ok(())
                    }
                    b'(' | b')' => {
                        self.state = LexState::Designate;
                        Ok(())
                    }
                    _ => self.complete(screen),
                }
            }
            LexState::Csi => {
                self.buf.push(byte as char);
                if (0x40..=0x7e).contains(&byte) {
                    self.complete(screen)
                } else {
                    Ok(())
                }
            }
            LexState::Designate => {
                self.buf.push(byte as char);
                self.complete(screen)
            }
        }
    }

    fn complete(&mut self, screen: &mut ScreenBuffer) -> Result<()> {
        self.state = LexState::Ground;
        dispatch(&self.buf, screen)
    }
}

#[derive(Debug, Clone, Copy)]
enum SeqAction {
    Home,
    Goto,
    GotoRow,
    SaveCursor,
    RestoreCursor,
    EraseToEol,
    Clear,
    CursorUp,
    CursorRight,
    Attributes,
    DesignateG0,
    DesignateG1,
    Ignore,
}

/// Recognized sequence bodies (everything after the ESC byte).
const SEQUENCE_TABLE: &[(&str, SeqAction)] = &[
    (r"^\[H$", SeqAction::Home),
    (r"^\[(\d+);(\d+)H$", SeqAction::Goto),
    (r"^\[(\d+)d$", SeqAction::GotoRow),
    (r"^7$", SeqAction::SaveCursor),
    (r"^8$", SeqAction::RestoreCursor),
    (r"^\[K$", SeqAction::EraseToEol),
    (r"^\[2J$", SeqAction::Clear),
    (r"^\[A$", SeqAction::CursorUp),
    (r"^\[C$", SeqAction::CursorRight),
    (r"^\[([0-9;]*)m$", SeqAction::Attributes),
    (r"^\(([B0])$", SeqAction::DesignateG0),
    (r"^\)([B0])$", SeqAction::DesignateG1),
    // Recognized but ignored: emitted during startup, no cursor effect.
    (r"^\[\d+;\d+r$", SeqAction::Ignore), // scroll region
    (r"^\[\?\d+h$", SeqAction::Ignore),   // DEC private mode set
    (r"^\[\?\d+l$", SeqAction::Ignore),   // DEC private mode reset
    (r"^\[\d+l$", SeqAction::Ignore),     // ANSI mode reset
    (r"^=$", SeqAction::Ignore),          // application keypad
    (r"^>$", SeqAction::Ignore),          // normal keypad
];

static COMPILED_TABLE: Lazy<Vec<(Regex, SeqAction)>> = Lazy::new(|| {
    SEQUENCE_TABLE
        .iter()
        .map(|&(pattern, action)| (Regex::new(pattern).unwrap(), action))
        .collect()
});

fn dispatch(seq: &str, screen: &mut ScreenBuffer) -> Result<()> {
    for (re, action) in COMPILED_TABLE.iter() {
        if let Some(caps) = re.captures(seq) {
            trace!(sequence = seq, action = ?action, "control sequence");
            run(*action, &caps, screen);
            return Ok(());
        }
    }
    let (x, y) = screen.cursor();
    Err(Error::UnrecognizedSequence {
        sequence: seq.to_string(),
        x,
        y,
    })
}

fn run(action: SeqAction, caps: &Captures<'_>, screen: &mut ScreenBuffer) {
    match action {
        SeqAction::Home => screen.home(),
        SeqAction::Goto => screen.goto(num(caps, 1), num(caps, 2)),
        SeqAction::GotoRow => screen.goto_row(num(caps, 1)),
        SeqAction::SaveCursor => screen.save_cursor(),
        SeqAction::RestoreCursor => screen.restore_cursor(),
        SeqAction::EraseToEol => screen.erase_to_eol(),
        SeqAction::Clear => screen.clear(),
        SeqAction::CursorUp => screen.cursor_up(),
        SeqAction::CursorRight => screen.cursor_right(),
        SeqAction::Attributes => {
            let params: Vec<u16> = caps[1]
                .split(';')
                .filter(|s| !s.is_empty())
                .map(|s| s.parse().unwrap_or(u16::MAX))
                .collect();
            screen.set_attributes(&params);
        }
        SeqAction::DesignateG0 => screen.designate(Register::G0, charset(&caps[1])),
        SeqAction::DesignateG1 => screen.designate(Register::G1, charset(&caps[1])),
        SeqAction::Ignore => {}
    }
}

/// Numeric capture; absurd values saturate and get clamped by the grid.
fn num(caps: &Captures<'_>, index: usize) -> usize {
    caps[index].parse().unwrap_or(usize::MAX)
}

fn charset(code: &str) -> Charset {
    match code {
        "0" => Charset::DecGraphics,
        _ => Charset::UsAscii,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::screen::{HEIGHT, WIDTH};

    fn snapshot(screen: &ScreenBuffer) -> (Vec<String>, (usize, usize)) {
        ((0..HEIGHT).map(|y| screen.row(y)).collect(), screen.cursor())
    }

    #[test]
    fn test_row_and_column_addressing_is_one_based() {
        let mut screen = ScreenBuffer::new();
        screen.apply(b"\x1b[3;10H").unwrap();
        assert_eq!(screen.cursor(), (9, 2));
    }

    #[test]
    fn test_absolute_row_keeps_column() {
        let mut screen = ScreenBuffer::new();
        screen.apply(b"abc\x1b[5d").unwrap();
        assert_eq!(screen.cursor(), (3, 4));
    }

    #[test]
    fn test_home() {
        let mut screen = ScreenBuffer::new();
        screen.apply(b"\x1b[12;40Hx\x1b[H").unwrap();
        assert_eq!(screen.cursor(), (0, 0));
    }

    #[test]
    fn test_save_move_restore() {
        let mut screen = ScreenBuffer::new();
        screen.apply(b"\x1b[4;7H\x1b7\x1b[20;70H\x1b8").unwrap();
        assert_eq!(screen.cursor(), (6, 3));
    }

    #[test]
    fn test_clear_leaves_only_later_text() {
        let mut screen = ScreenBuffer::new();
        screen.apply(b"Hello\x1b[2JWorld").unwrap();
        assert_eq!(&screen.row(0)[..5], "World");
        let joined: String = (0..HEIGHT).map(|y| screen.row(y)).collect();
        assert!(!joined.contains("Hello"));
        assert_eq!(joined.matches("World").count(), 1);
    }

    #[test]
    fn test_cursor_up_and_right() {
        let mut screen = ScreenBuffer::new();
        screen.apply(b"\x1b[10;10H\x1b[A\x1b[C").unwrap();
        assert_eq!(screen.cursor(), (10, 8));
        // Saturates at the edges.
        screen.apply(b"\x1b[H\x1b[A").unwrap();
        assert_eq!(screen.cursor(), (0, 0));
        screen.apply(&b"\x1b[C".repeat(WIDTH + 10)).unwrap();
        assert_eq!(screen.cursor_x(), WIDTH - 1);
    }

    #[test]
    fn test_charset_designation() {
        let mut screen = ScreenBuffer::new();
        screen.apply(b"\x1b(0").unwrap();
        assert_eq!(screen.charset(), Charset::DecGraphics);
        screen.apply(b"\x1b(B").unwrap();
        assert_eq!(screen.charset(), Charset::UsAscii);
        // G1 designation alone does not change the active set.
        screen.apply(b"\x1b)0").unwrap();
        assert_eq!(screen.charset(), Charset::UsAscii);
        screen.apply(b"\x0e").unwrap();
        assert_eq!(screen.charset(), Charset::DecGraphics);
    }

    #[test]
    fn test_recognized_noops_do_not_move_cursor() {
        let mut screen = ScreenBuffer::new();
        screen.apply(b"ab").unwrap();
        for seq in [
            b"\x1b[1;24r".as_slice(),
            b"\x1b[?1049h",
            b"\x1b[?25l",
            b"\x1b[4l",
            b"\x1b=",
            b"\x1b>",
        ] {
            screen.apply(seq).unwrap();
        }
        assert_eq!(screen.cursor(), (2, 0));
    }

    #[test]
    fn test_unknown_sequence_is_fatal() {
        let mut screen = ScreenBuffer::new();
        screen.apply(b"hi").unwrap();
        let err = screen.apply(b"\x1b[5B").unwrap_err();
        match err {
            Error::UnrecognizedSequence { sequence, x, y } => {
                assert_eq!(sequence, "[5B");
                assert_eq!((x, y), (2, 0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Single-byte sequences outside the table fail too.
        let err = ScreenBuffer::new().apply(b"\x1bM").unwrap_err();
        assert!(matches!(err, Error::UnrecognizedSequence { ref sequence, .. } if sequence == "M"));
        // Unknown charset designations are not silently accepted.
        let err = ScreenBuffer::new().apply(b"\x1b(A").unwrap_err();
        assert!(matches!(err, Error::UnrecognizedSequence { ref sequence, .. } if sequence == "(A"));
    }

    #[test]
    fn test_sequence_split_across_chunks() {
        let mut whole = ScreenBuffer::new();
        whole.apply(b"\x1b[3;10Hx").unwrap();

        let mut split = ScreenBuffer::new();
        split.apply(b"\x1b[3;1").unwrap();
        split.apply(b"0Hx").unwrap();

        assert_eq!(snapshot(&whole), snapshot(&split));
    }

    #[test]
    fn test_chunk_independence_at_every_split() {
        let stream: &[u8] = b"You hit it!\x1b[K\x1b[2;1H\x1b[1;32m@\x1b[0m\x1b7\x1b[24;1HSt:18\x1b8\x1b(B";
        let mut whole = ScreenBuffer::new();
        whole.apply(stream).unwrap();
        let expected = snapshot(&whole);

        for cut in 0..=stream.len() {
            let mut split = ScreenBuffer::new();
            split.apply(&stream[..cut]).unwrap();
            split.apply(&stream[cut..]).unwrap();
            assert_eq!(snapshot(&split), expected, "split at {cut}");
        }
    }
}
