//! In-memory model of the remote terminal screen
//!
//! A fixed 80x24 grid of attributed cells plus cursor state. The model is
//! deliberately small: it understands exactly the byte subset the game
//! emits (printable ASCII, a handful of C0 controls, and the escape table
//! in [`parser`](super::parser)) and treats everything else as suspect.
//!
//! The grid never scrolls. Output that runs past the last row is clamped
//! there; the game repaints with absolute cursor addressing instead.

use bitflags::bitflags;
use regex::Regex;
use tracing::{trace, warn};

use crate::error::Result;

use super::parser::SeqParser;

/// Grid width in columns.
pub const WIDTH: usize = 80;
/// Grid height in rows.
pub const HEIGHT: usize = 24;
/// The row reserved for game messages and prompt text.
pub const MESSAGE_ROW: usize = 0;
/// Foreground colour index meaning "terminal default".
pub const DEFAULT_FG: u8 = 9;

bitflags! {
    /// Per-cell display attribute flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AttrFlags: u8 {
        const BOLD = 1 << 0;
        const INVERSE = 1 << 1;
    }
}

/// Display attributes applied to printed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAttrs {
    pub flags: AttrFlags,
    /// Foreground colour 0-7, or [`DEFAULT_FG`].
    pub fg: u8,
}

impl Default for CellAttrs {
    fn default() -> Self {
        CellAttrs {
            flags: AttrFlags::empty(),
            fg: DEFAULT_FG,
        }
    }
}

/// One character cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub attrs: CellAttrs,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            ch: ' ',
            attrs: CellAttrs::default(),
        }
    }
}

impl Cell {
    pub fn bold(&self) -> bool {
        self.attrs.flags.contains(AttrFlags::BOLD)
    }

    pub fn inverse(&self) -> bool {
        self.attrs.flags.contains(AttrFlags::INVERSE)
    }

    pub fn fg(&self) -> u8 {
        self.attrs.fg
    }
}

/// Character set loadable into a charset register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    UsAscii,
    DecGraphics,
}

/// The two charset registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    G0,
    G1,
}

/// The screen model. Feed raw terminal output through [`apply`] and read
/// the resulting state back through the query methods.
///
/// [`apply`]: ScreenBuffer::apply
pub struct ScreenBuffer {
    cells: Vec<Vec<Cell>>,
    cursor_x: usize,
    cursor_y: usize,
    saved_x: usize,
    saved_y: usize,
    attrs: CellAttrs,
    g0: Charset,
    g1: Charset,
    active: Register,
    parser: SeqParser,
}

impl Default for ScreenBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenBuffer {
    pub fn new() -> Self {
        ScreenBuffer {
            cells: vec![vec![Cell::default(); WIDTH]; HEIGHT],
            cursor_x: 0,
            cursor_y: 0,
            saved_x: 0,
            saved_y: 0,
            attrs: CellAttrs::default(),
            g0: Charset::UsAscii,
            g1: Charset::DecGraphics,
            active: Register::G0,
            parser: SeqParser::default(),
        }
    }

    /// Applies a chunk of raw terminal output.
    ///
    /// Deterministic and chunk-independent: splitting a stream at any byte
    /// boundary, including inside an escape sequence, yields the same final
    /// state as applying it whole. Fails on an escape sequence outside the
    /// recognized table; the screen then reflects everything up to the
    /// offending sequence.
    pub fn apply(&mut self, bytes: &[u8]) -> Result<()> {
        let mut parser = std::mem::take(&mut self.parser);
        let result = parser.advance(self, bytes);
        self.parser = parser;
        result
    }

    /// Cursor position as (column, row), zero-based.
    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_x, self.cursor_y)
    }

    pub fn cursor_x(&self) -> usize {
        self.cursor_x
    }

    pub fn cursor_y(&self) -> usize {
        self.cursor_y
    }

    /// Active charset register contents.
    pub fn charset(&self) -> Charset {
        match self.active {
            Register::G0 => self.g0,
            Register::G1 => self.g1,
        }
    }

    // --- byte handling (driven by the parser) ---

    /// Handles one byte outside an escape sequence.
    pub(crate) fn handle_byte(&mut self, byte: u8) {
        match byte {
            0x20..=0x7E => self.print_char(byte as char),
            b'\r' => self.cursor_x = 0,
            b'\n' => self.cursor_y = (self.cursor_y + 1).min(HEIGHT - 1),
            0x08 => self.cursor_x = self.cursor_x.saturating_sub(1),
            0x0F => self.active = Register::G0,
            0x0E => self.active = Register::G1,
            // NUL padding and bells are routine on the wire.
            0x00 | 0x07 => trace!(byte, "ignoring control byte"),
            _ => warn!(byte, "ignoring unprintable byte"),
        }
    }

    fn print_char(&mut self, ch: char) {
        self.cells[self.cursor_y][self.cursor_x] = Cell {
            ch,
            attrs: self.attrs,
        };
        self.cursor_x += 1;
        if self.cursor_x >= WIDTH {
            self.cursor_x = 0;
            if self.cursor_y < HEIGHT - 1 {
                self.cursor_y += 1;
            }
        }
    }

    // --- escape-sequence actions (driven by the parser) ---

    pub(crate) fn home(&mut self) {
        self.cursor_x = 0;
        self.cursor_y = 0;
    }

    /// Absolute row addressing; one-based on the wire, column unchanged.
    pub(crate) fn goto_row(&mut self, row: usize) {
        self.cursor_y = row.saturating_sub(1).min(HEIGHT - 1);
    }

    /// Row+column addressing; one-based on the wire.
    pub(crate) fn goto(&mut self, row: usize, col: usize) {
        self.cursor_y = row.saturating_sub(1).min(HEIGHT - 1);
        self.cursor_x = col.saturating_sub(1).min(WIDTH - 1);
    }

    pub(crate) fn save_cursor(&mut self) {
        self.saved_x = self.cursor_x;
        self.saved_y = self.cursor_y;
    }

    pub(crate) fn restore_cursor(&mut self) {
        self.cursor_x = self.saved_x;
        self.cursor_y = self.saved_y;
    }

    pub(crate) fn erase_to_eol(&mut self) {
        for cell in &mut self.cells[self.cursor_y][self.cursor_x..] {
            *cell = Cell::default();
        }
    }

    /// Blanks the whole grid and homes the cursor.
    ///
    /// Homing is a deliberate choice: the game repaints from the top-left
    /// after a clear, and text printed immediately afterwards must land
    /// there even when no explicit addressing follows.
    pub(crate) fn clear(&mut self) {
        for row in &mut self.cells {
            for cell in row {
                *cell = Cell::default();
            }
        }
        self.cursor_x = 0;
        self.cursor_y = 0;
    }

    pub(crate) fn cursor_up(&mut self) {
        self.cursor_y = self.cursor_y.saturating_sub(1);
    }

    pub(crate) fn cursor_right(&mut self) {
        self.cursor_x = (self.cursor_x + 1).min(WIDTH - 1);
    }

    /// Folds SGR parameters into the current write attributes. An empty
    /// parameter list means reset. Unrecognized parameters are skipped:
    /// the sequence itself is recognized, so cursor tracking is safe.
    pub(crate) fn set_attributes(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.attrs = CellAttrs::default();
            return;
        }
        for &p in params {
            match p {
                0 => self.attrs = CellAttrs::default(),
                1 => self.attrs.flags |= AttrFlags::BOLD,
                7 => self.attrs.flags |= AttrFlags::INVERSE,
                30..=37 => self.attrs.fg = (p - 30) as u8,
                _ => warn!(param = p, "ignoring unrecognized display attribute"),
            }
        }
    }

    pub(crate) fn designate(&mut self, register: Register, charset: Charset) {
        match register {
            Register::G0 => self.g0 = charset,
            Register::G1 => self.g1 = charset,
        }
    }

    // --- queries ---

    /// Full text of one row. Out-of-range rows read as empty.
    pub fn row(&self, y: usize) -> String {
        self.row_range(y, 0, WIDTH)
    }

    /// Text of one row between two columns (end exclusive, clamped).
    pub fn row_range(&self, y: usize, start: usize, end: usize) -> String {
        if y >= HEIGHT {
            return String::new();
        }
        let end = end.min(WIDTH);
        if start >= end {
            return String::new();
        }
        self.cells[y][start..end].iter().map(|c| c.ch).collect()
    }

    /// Rectangular area as plain strings, attributes stripped. The
    /// rectangle is clamped to the grid.
    pub fn area(&self, x: usize, y: usize, width: usize, height: usize) -> Vec<String> {
        let y_end = (y + height).min(HEIGHT);
        (y..y_end)
            .map(|row| self.row_range(row, x, x + width))
            .collect()
    }

    /// Single-cell lookup with attributes intact.
    pub fn cell(&self, x: usize, y: usize) -> Option<Cell> {
        if x < WIDTH && y < HEIGHT {
            Some(self.cells[y][x])
        } else {
            None
        }
    }

    /// Matches the text ending exactly at the cursor against an
    /// end-anchored pattern, returning the matched text. Compile patterns
    /// with [`anchored`](super::anchored) to guarantee the anchor.
    pub fn match_before_cursor(&self, re: &Regex) -> Option<String> {
        let before = self.row_range(self.cursor_y, 0, self.cursor_x);
        re.find(&before).map(|m| m.as_str().to_string())
    }

    /// Renders the grid to a string with ANSI attributes re-applied.
    /// Debug aid only; the engine itself never renders.
    pub fn dump(&self) -> String {
        let mut out = String::with_capacity(HEIGHT * (WIDTH + 1));
        for row in &self.cells {
            for cell in row {
                match sgr_params(&cell.attrs) {
                    Some(params) => {
                        out.push_str("\x1b[");
                        out.push_str(&params);
                        out.push('m');
                        out.push(cell.ch);
                        out.push_str("\x1b[0m");
                    }
                    None => out.push(cell.ch),
                }
            }
            out.push('\n');
        }
        out
    }
}

fn sgr_params(attrs: &CellAttrs) -> Option<String> {
    let mut params: Vec<String> = Vec::new();
    if attrs.flags.contains(AttrFlags::BOLD) {
        params.push("1".to_string());
    }
    if attrs.flags.contains(AttrFlags::INVERSE) {
        params.push("7".to_string());
    }
    if attrs.fg != DEFAULT_FG {
        params.push((30 + attrs.fg as u16).to_string());
    }
    if params.is_empty() {
        None
    } else {
        Some(params.join(";"))
    }
}
