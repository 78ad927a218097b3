//! Prompt species and the single-pending-interaction protocol
//!
//! When the watch loop classifies the screen as a prompt it hands back
//! one of the species below. Every species owns a [`TurnToken`], the
//! right to send the game its next keystroke. Exactly one token exists
//! per session, so the type system enforces the protocol: while a prompt
//! is unanswered the session refuses to watch or send, and answering
//! consumes the prompt, returns the token, and re-enters the watch loop.
//!
//! Species overview:
//!
//! ```text
//! YesNo         "Really attack the kitten? [yn] (n)"
//! YesNoQuit     "Force its lock? [ynq] (q)"
//! Select        "What do you want to drink? [fh or ?*]"
//! SelectDialog  full-screen options menu, possibly paginated
//! Direction     "In what direction?"
//! FreeText      "What do you want to call it?"
//! CursorPoint   "Pick an object." (caller-built, answered by position)
//! ```

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::core::screen::{MESSAGE_ROW, WIDTH};
use crate::core::session::{Event, Session};
use crate::core::transport::Transport;
use crate::error::{Error, Result};
use crate::items::{parse_menu_rows, MenuItem};
use crate::keys::{self, Compass};

// Classifier grammar. All end-anchored: prompts are matched against the
// text ending exactly at the cursor.
pub(crate) static YES_NO_PROMPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".* \[yn\]( \(.\))? ?$").unwrap());
pub(crate) static YES_NO_QUIT_PROMPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".* \[ynq\]( \(.\))? ?$").unwrap());
pub(crate) static SELECT_PROMPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".* \[.* or \?\*\] $").unwrap());
pub(crate) static DIALOG_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(DIALOG_MARKER_PATTERN).unwrap());
pub(crate) static DIRECTION_PROMPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"In what direction.*\?.*$").unwrap());

/// Source pattern for [`DIALOG_MARKER`], reused in diagnostics.
pub(crate) const DIALOG_MARKER_PATTERN: &str = r"\(end\) $|\(\d+ of \d+\) $";

// Question parsers, applied to already-classified prompt text.
static YES_NO_PARTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<q>.*) \[yn\]( \((?P<d>.)\))? ?$").unwrap());
static YES_NO_QUIT_PARTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<q>.*) \[ynq\]( \((?P<d>.)\))? ?$").unwrap());
static SELECT_PARTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<q>.*) \[(?P<keys>.*) or \?\*\] $").unwrap());
static DIRECTION_PARTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<q>.*) \[(?P<keys>[^\]]+)\] ?$").unwrap());
static PAGE_OF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+) of (\d+)\) ").unwrap());

/// The right to send the game its next keystroke.
///
/// Not copyable, not clonable: one per session, held by the session
/// between prompts and by the pending interaction otherwise.
#[derive(Debug)]
pub struct TurnToken {
    session_id: u64,
}

impl TurnToken {
    pub(crate) fn new(session_id: u64) -> Self {
        TurnToken { session_id }
    }

    pub(crate) fn session_id(&self) -> u64 {
        self.session_id
    }
}

/// An immutable batch of message lines harvested during one watch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Information {
    lines: Vec<String>,
}

impl Information {
    pub(crate) fn new(lines: Vec<String>) -> Self {
        Information { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True when any harvested line contains the needle.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

impl fmt::Display for Information {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}

/// The closed set of prompt species. Matching is exhaustive by
/// construction: adding a species forces every match site to be
/// revisited.
#[derive(Debug)]
pub enum Interaction {
    YesNo(YesNo),
    YesNoQuit(YesNoQuit),
    Select(Select),
    SelectDialog(SelectDialog),
    Direction(Direction),
    FreeText(FreeText),
    CursorPoint(CursorPoint),
}

impl Interaction {
    pub fn question(&self) -> &str {
        match self {
            Interaction::YesNo(p) => p.question(),
            Interaction::YesNoQuit(p) => p.question(),
            Interaction::Select(p) => p.question(),
            Interaction::SelectDialog(p) => p.question(),
            Interaction::Direction(p) => p.question(),
            Interaction::FreeText(p) => p.question(),
            Interaction::CursorPoint(p) => p.question(),
        }
    }

    /// Declines the prompt with the cancel keystroke and re-enters the
    /// watch loop.
    pub fn answer_default<T: Transport>(self, session: &mut Session<T>) -> Result<Event> {
        match self {
            Interaction::YesNo(p) => p.answer_default(session),
            Interaction::YesNoQuit(p) => p.answer_default(session),
            Interaction::Select(p) => p.answer_default(session),
            Interaction::SelectDialog(p) => p.answer_default(session),
            Interaction::Direction(p) => p.answer_default(session),
            Interaction::FreeText(p) => p.answer_default(session),
            Interaction::CursorPoint(p) => p.answer_default(session),
        }
    }
}

/// Returns the token, sends the answering keystrokes, and watches for
/// what the game does next.
fn resolve<T: Transport>(
    session: &mut Session<T>,
    token: TurnToken,
    keys: &str,
    dialog_question: Option<String>,
) -> Result<Event> {
    session.release(token)?;
    session.push_keys(keys)?;
    session.watch_resumed(dialog_question)
}

fn cancel<T: Transport>(session: &mut Session<T>, token: TurnToken) -> Result<Event> {
    resolve(session, token, &keys::CANCEL.to_string(), None)
}

// --- YesNo --------------------------------------------------------------

/// A `[yn]` confirmation. Options are y and n; the game may display a
/// default in parentheses.
#[derive(Debug)]
pub struct YesNo {
    question: String,
    default: Option<char>,
    token: TurnToken,
}

impl YesNo {
    pub(crate) fn from_prompt(token: TurnToken, matched: &str) -> YesNo {
        let (question, default) = split_question(&YES_NO_PARTS, matched);
        YesNo {
            question,
            default,
            token,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn default(&self) -> Option<char> {
        self.default
    }

    pub fn answer<T: Transport>(self, session: &mut Session<T>, yes: bool) -> Result<Event> {
        let key = if yes { "y" } else { "n" };
        resolve(session, self.token, key, None)
    }

    pub fn answer_default<T: Transport>(self, session: &mut Session<T>) -> Result<Event> {
        cancel(session, self.token)
    }
}

// --- YesNoQuit ----------------------------------------------------------

/// Answer to a [`YesNoQuit`] prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Yes,
    No,
    Quit,
}

/// A `[ynq]` confirmation. The game's own default is q unless the
/// prompt names another.
#[derive(Debug)]
pub struct YesNoQuit {
    question: String,
    default: char,
    token: TurnToken,
}

impl YesNoQuit {
    pub(crate) fn from_prompt(token: TurnToken, matched: &str) -> YesNoQuit {
        let (question, default) = split_question(&YES_NO_QUIT_PARTS, matched);
        YesNoQuit {
            question,
            default: default.unwrap_or('q'),
            token,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn default(&self) -> char {
        self.default
    }

    pub fn answer<T: Transport>(self, session: &mut Session<T>, choice: Choice) -> Result<Event> {
        let key = match choice {
            Choice::Yes => "y",
            Choice::No => "n",
            Choice::Quit => "q",
        };
        resolve(session, self.token, key, None)
    }

    pub fn answer_default<T: Transport>(self, session: &mut Session<T>) -> Result<Event> {
        cancel(session, self.token)
    }
}

// --- Select -------------------------------------------------------------

/// A single-key choice among listed keys, e.g.
/// `What do you want to drink? [fh or ?*]`. The meta keys `?` and `*`
/// are always legal and open a select dialog; their question is carried
/// over so the dialog keeps it.
#[derive(Debug)]
pub struct Select {
    question: String,
    options: Vec<char>,
    token: TurnToken,
}

impl Select {
    pub(crate) fn from_prompt(token: TurnToken, matched: &str) -> Select {
        let (question, options) = match SELECT_PARTS.captures(matched) {
            Some(caps) => {
                let mut options: Vec<char> = caps["keys"].chars().collect();
                options.push('?');
                options.push('*');
                (caps["q"].to_string(), options)
            }
            None => (matched.trim_end().to_string(), vec!['?', '*']),
        };
        Select {
            question,
            options,
            token,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[char] {
        &self.options
    }

    /// Answers with one of the listed keys. An invalid key releases the
    /// prompt unanswered; watch again to reclassify.
    pub fn answer<T: Transport>(self, session: &mut Session<T>, key: char) -> Result<Event> {
        session.release(self.token)?;
        if !self.options.contains(&key) {
            return Err(Error::InvalidAnswer {
                answer: key.to_string(),
                options: self.options.iter().collect(),
            });
        }
        session.push_key(key)?;
        session.watch_resumed(Some(self.question))
    }

    pub fn answer_default<T: Transport>(self, session: &mut Session<T>) -> Result<Event> {
        cancel(session, self.token)
    }
}

// --- SelectDialog -------------------------------------------------------

/// A full-screen options menu, harvested across all of its pages.
///
/// Construction drives the pagination sub-protocol: while the marker
/// reads page k of n with k < n it sends `>` and harvests the next page,
/// then rewinds with `<` so answers are always issued from page 1.
#[derive(Debug)]
pub struct SelectDialog {
    question: String,
    options: Vec<MenuItem>,
    pages: usize,
    token: TurnToken,
}

impl SelectDialog {
    pub(crate) fn harvest<T: Transport>(
        session: &mut Session<T>,
        question: Option<String>,
        first_marker: String,
    ) -> Result<SelectDialog> {
        let question = question
            .unwrap_or_else(|| session.screen().row(MESSAGE_ROW).trim().to_string());
        let mut options: Vec<MenuItem> = Vec::new();
        let mut pages = 1;
        let mut marker = first_marker;
        loop {
            let (x, y) = session.screen().cursor();
            let col = x.saturating_sub(marker.len());
            let rows = session.screen().area(col, 0, WIDTH - col, y);
            options.extend(parse_menu_rows(&rows));
            match page_of(&marker) {
                Some((page, total)) if page < total => {
                    debug!(page, total, options = options.len(), "advancing select dialog");
                    pages = total;
                    session.push_key(keys::NEXT_PAGE)?;
                    marker = session.await_dialog_marker()?;
                }
                Some((_, total)) => {
                    pages = total.max(1);
                    break;
                }
                None => break,
            }
        }
        // Rewind so answers are issued from a known page.
        for _ in 1..pages {
            session.push_key(keys::PREV_PAGE)?;
            session.await_dialog_marker()?;
        }
        let token = session.claim(&question)?;
        Ok(SelectDialog {
            question,
            options,
            pages,
            token,
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[MenuItem] {
        &self.options
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    fn ensure_first_page<T: Transport>(&self, session: &Session<T>) -> Result<()> {
        let marker = session
            .screen()
            .match_before_cursor(&DIALOG_MARKER)
            .ok_or(Error::DialogDesync)?;
        match page_of(&marker) {
            Some((page, _)) if page != 1 => Err(Error::DialogDesync),
            _ => Ok(()),
        }
    }

    fn ensure_known_keys(options: &[MenuItem], picks: &[char]) -> Result<()> {
        for &key in picks {
            if !options.iter().any(|o| o.key() == key) {
                return Err(Error::InvalidAnswer {
                    answer: key.to_string(),
                    options: options.iter().map(|o| o.key()).collect(),
                });
            }
        }
        Ok(())
    }

    /// Answers a single-select dialog: the one keystroke closes it.
    pub fn answer<T: Transport>(self, session: &mut Session<T>, key: char) -> Result<Event> {
        self.ensure_first_page(session)?;
        session.release(self.token)?;
        Self::ensure_known_keys(&self.options, &[key])?;
        session.push_key(key)?;
        session.watch_resumed(None)
    }

    /// Answers a multi-select dialog: toggles the picked keys page by
    /// page, acknowledging each page with a space.
    pub fn answer_many<T: Transport>(
        self,
        session: &mut Session<T>,
        picks: &[char],
    ) -> Result<Event> {
        self.ensure_first_page(session)?;
        session.release(self.token)?;
        Self::ensure_known_keys(&self.options, picks)?;
        let mut page_keys: String = picks.iter().collect();
        page_keys.push(keys::CONTINUE);
        for _ in 0..self.pages {
            session.push_keys(&page_keys)?;
        }
        session.watch_resumed(None)
    }

    pub fn answer_default<T: Transport>(self, session: &mut Session<T>) -> Result<Event> {
        cancel(session, self.token)
    }
}

// --- Direction ----------------------------------------------------------

/// A directional prompt, optionally restricted to a listed key subset.
#[derive(Debug)]
pub struct Direction {
    question: String,
    allowed: Vec<Compass>,
    token: TurnToken,
}

impl Direction {
    pub(crate) fn from_prompt(token: TurnToken, matched: &str) -> Direction {
        let (question, allowed) = match DIRECTION_PARTS.captures(matched) {
            Some(caps) => {
                let allowed: Vec<Compass> =
                    caps["keys"].chars().filter_map(Compass::from_key).collect();
                (caps["q"].to_string(), allowed)
            }
            None => (matched.trim_end().to_string(), Compass::ALL.to_vec()),
        };
        Direction {
            question,
            allowed,
            token,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn allowed(&self) -> &[Compass] {
        &self.allowed
    }

    pub fn answer<T: Transport>(
        self,
        session: &mut Session<T>,
        direction: Compass,
    ) -> Result<Event> {
        session.release(self.token)?;
        if !self.allowed.contains(&direction) {
            return Err(Error::InvalidAnswer {
                answer: direction.key().to_string(),
                options: self.allowed.iter().map(|d| d.key()).collect(),
            });
        }
        session.push_key(direction.key())?;
        session.watch_resumed(None)
    }

    pub fn answer_default<T: Transport>(self, session: &mut Session<T>) -> Result<Event> {
        cancel(session, self.token)
    }
}

// --- FreeText -----------------------------------------------------------

/// A free-form line prompt ("What do you want to call it?").
#[derive(Debug)]
pub struct FreeText {
    question: String,
    token: TurnToken,
}

impl FreeText {
    pub(crate) fn new(token: TurnToken, question: String) -> FreeText {
        FreeText { question, token }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer<T: Transport>(self, session: &mut Session<T>, text: &str) -> Result<Event> {
        session.release(self.token)?;
        session.push_line(text)?;
        session.watch_resumed(None)
    }

    pub fn answer_default<T: Transport>(self, session: &mut Session<T>) -> Result<Event> {
        cancel(session, self.token)
    }
}

// --- CursorPoint --------------------------------------------------------

/// A pick-a-position prompt. Unlike the other species this one is built
/// by the caller, when a harvested message asks for a spot ("Pick an
/// object."). The answer walks the game's cursor to the target with
/// single-step motion keys and confirms.
#[derive(Debug)]
pub struct CursorPoint {
    question: String,
    token: TurnToken,
}

impl CursorPoint {
    /// Claims the pending slot. Fails if another prompt is pending.
    pub fn new<T: Transport>(
        session: &mut Session<T>,
        question: impl Into<String>,
    ) -> Result<CursorPoint> {
        let question = question.into();
        let token = session.claim(&question)?;
        Ok(CursorPoint { question, token })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// Walks the game's cursor from where it stands to (x, y) in screen
    /// coordinates, one keystroke per unit of displacement, east/west
    /// before south/north, then confirms.
    pub fn answer<T: Transport>(
        self,
        session: &mut Session<T>,
        x: usize,
        y: usize,
    ) -> Result<Event> {
        let (cx, cy) = session.screen().cursor();
        let mut steps = String::new();
        if x >= cx {
            steps.extend(std::iter::repeat(Compass::East.key()).take(x - cx));
        } else {
            steps.extend(std::iter::repeat(Compass::West.key()).take(cx - x));
        }
        if y >= cy {
            steps.extend(std::iter::repeat(Compass::South.key()).take(y - cy));
        } else {
            steps.extend(std::iter::repeat(Compass::North.key()).take(cy - y));
        }
        steps.push(keys::CONFIRM);
        resolve(session, self.token, &steps, None)
    }

    pub fn answer_default<T: Transport>(self, session: &mut Session<T>) -> Result<Event> {
        cancel(session, self.token)
    }
}

fn split_question(parts: &Regex, matched: &str) -> (String, Option<char>) {
    match parts.captures(matched) {
        Some(caps) => {
            let question = caps["q"].to_string();
            let default = caps.name("d").and_then(|d| d.as_str().chars().next());
            (question, default)
        }
        None => (matched.trim_end().to_string(), None),
    }
}

fn page_of(marker: &str) -> Option<(usize, usize)> {
    let caps = PAGE_OF.captures(marker)?;
    let page = caps[1].parse().ok()?;
    let total = caps[2].parse().ok()?;
    Some((page, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> TurnToken {
        TurnToken::new(0)
    }

    #[test]
    fn test_yes_no_without_default() {
        let p = YesNo::from_prompt(token(), "Really attack the kitten? [yn] ");
        assert_eq!(p.question(), "Really attack the kitten?");
        assert_eq!(p.default(), None);
    }

    #[test]
    fn test_yes_no_with_default() {
        let p = YesNo::from_prompt(token(), "Stop eating? [yn] (y) ");
        assert_eq!(p.question(), "Stop eating?");
        assert_eq!(p.default(), Some('y'));
    }

    #[test]
    fn test_yes_no_quit_default_falls_back_to_quit() {
        let p = YesNoQuit::from_prompt(token(), "Force its lock? [ynq] ");
        assert_eq!(p.question(), "Force its lock?");
        assert_eq!(p.default(), 'q');

        let p = YesNoQuit::from_prompt(token(), "Really quit? [ynq] (n) ");
        assert_eq!(p.default(), 'n');
    }

    #[test]
    fn test_select_options_include_meta_keys() {
        let p = Select::from_prompt(token(), "What do you want to drink? [fh or ?*] ");
        assert_eq!(p.question(), "What do you want to drink?");
        assert_eq!(p.options(), &['f', 'h', '?', '*']);
    }

    #[test]
    fn test_direction_unrestricted() {
        let p = Direction::from_prompt(token(), "In what direction? ");
        assert_eq!(p.question(), "In what direction?");
        assert_eq!(p.allowed().len(), Compass::ALL.len());
    }

    #[test]
    fn test_direction_restricted_to_listed_keys() {
        let p = Direction::from_prompt(token(), "In what direction? [jk] ");
        assert_eq!(p.question(), "In what direction?");
        assert_eq!(p.allowed(), &[Compass::South, Compass::North]);
    }

    #[test]
    fn test_page_of_marker() {
        assert_eq!(page_of("(2 of 3) "), Some((2, 3)));
        assert_eq!(page_of("(end) "), None);
    }

    #[test]
    fn test_information_display_joins_lines() {
        let info = Information::new(vec!["You hit it.".to_string(), "It dies.".to_string()]);
        assert_eq!(info.to_string(), "You hit it.\nIt dies.");
        assert!(info.contains("dies"));
        assert!(!info.contains("fountain"));
    }
}
