//! Session: the watch loop and prompt classifier
//!
//! A session owns one transport and one screen. Its single operation is
//! `watch`: drain the transport until the stream goes idle, keep the
//! screen current, then decide what the game is waiting for.
//!
//! ```text
//! watch: read chunk -> apply to screen -> "--More--"? ack and loop
//!          │
//!          ├── EOF  -> Event::Ended
//!          └── idle -> classify, in order: expected patterns,
//!                      prompt species, free turn
//! ```
//!
//! Classification runs in a fixed priority order; the first hit wins.
//! Prompts claim the session's [`TurnToken`], so nothing else can be
//! sent until they are answered.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::core::interaction::{
    Direction, FreeText, Information, Interaction, Select, SelectDialog, TurnToken, YesNo,
    YesNoQuit, DIALOG_MARKER, DIALOG_MARKER_PATTERN, DIRECTION_PROMPT, SELECT_PROMPT,
    YES_NO_PROMPT, YES_NO_QUIT_PROMPT,
};
use crate::core::screen::{anchored, ScreenBuffer, MESSAGE_ROW, WIDTH};
use crate::core::transport::{Chunk, Transport};
use crate::error::{Error, Result};
use crate::keys;

/// Idle timeout used when none is configured.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(300);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

static MORE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"--More--$").unwrap());

/// What a watch produced.
#[derive(Debug)]
pub enum Event {
    /// The game asked something; answer it to continue.
    Prompt(Interaction),
    /// A caller-supplied pattern matched; carries the exact text.
    Expected(String),
    /// Free turn: the game is waiting for the next command. Carries the
    /// messages harvested on the way here, possibly none.
    Turn(Information),
    /// The transport reported end-of-session. Terminal.
    Ended,
}

/// A live game session: transport + screen + pending-prompt guard.
pub struct Session<T: Transport> {
    id: u64,
    transport: T,
    screen: ScreenBuffer,
    idle_timeout: Duration,
    /// Present while no prompt is pending.
    token: Option<TurnToken>,
    /// Question of the pending prompt, for diagnostics.
    pending_question: Option<String>,
    history: Vec<Information>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self::with_idle_timeout(transport, DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(transport: T, idle_timeout: Duration) -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        info!(id, ?idle_timeout, "session opened");
        Session {
            id,
            transport,
            screen: ScreenBuffer::new(),
            idle_timeout,
            token: Some(TurnToken::new(id)),
            pending_question: None,
            history: Vec::new(),
        }
    }

    pub fn screen(&self) -> &ScreenBuffer {
        &self.screen
    }

    /// Everything harvested so far, in watch order.
    pub fn history(&self) -> &[Information] {
        &self.history
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// True while a prompt is waiting for its answer.
    pub fn pending(&self) -> bool {
        self.token.is_none()
    }

    /// Sends raw keystrokes. Refused while a prompt is pending: answer
    /// it (or cancel it) first.
    pub fn send_key(&mut self, keys: &str) -> Result<()> {
        self.ensure_free()?;
        self.push_keys(keys)
    }

    /// Sends a full line. Refused while a prompt is pending.
    pub fn send_text_line(&mut self, line: &str) -> Result<()> {
        self.ensure_free()?;
        self.push_line(line)
    }

    /// Watches with no extra expectations.
    pub fn watch(&mut self) -> Result<Event> {
        self.watch_for(&[])
    }

    /// Reads until the stream goes idle, then classifies the screen.
    ///
    /// `expected` patterns are matched against the text ending at the
    /// cursor before any built-in classification; the end anchor is
    /// added when missing.
    pub fn watch_for(&mut self, expected: &[&str]) -> Result<Event> {
        self.ensure_free()?;
        let patterns: Vec<Regex> = expected
            .iter()
            .map(|p| anchored(p))
            .collect::<Result<Vec<_>>>()?;
        self.watch_inner(&patterns, expected, None)
    }

    /// Re-entry point used by interaction answers.
    pub(crate) fn watch_resumed(&mut self, dialog_question: Option<String>) -> Result<Event> {
        self.ensure_free()?;
        self.watch_inner(&[], &[], dialog_question)
    }

    fn watch_inner(
        &mut self,
        patterns: &[Regex],
        raw_patterns: &[&str],
        dialog_question: Option<String>,
    ) -> Result<Event> {
        let mut lines: Vec<String> = Vec::new();
        loop {
            match self.transport.read_chunk(self.idle_timeout)? {
                Chunk::Data(bytes) => {
                    self.screen.apply(&bytes)?;
                    if let Some(marker) = self.screen.match_before_cursor(&MORE_MARKER) {
                        let harvested = self.harvest_paged_lines(marker.len());
                        debug!(lines = harvested.len(), "acknowledging pagination");
                        lines.extend(harvested);
                        self.push_key(keys::CONTINUE)?;
                    }
                }
                Chunk::Idle => return self.classify(patterns, raw_patterns, dialog_question, lines),
                Chunk::Eof => {
                    info!(id = self.id, "session ended");
                    self.remember(lines);
                    return Ok(Event::Ended);
                }
            }
        }
    }

    /// Lines shown with a pagination marker: on the message row the text
    /// before the marker; one row down, the wrapped message rejoined into
    /// one line; further down, the overlay rectangle above the marker
    /// starting at its column.
    fn harvest_paged_lines(&self, marker_len: usize) -> Vec<String> {
        let (x, y) = self.screen.cursor();
        let col = x.saturating_sub(marker_len);
        let collected = if y == MESSAGE_ROW {
            vec![self.screen.row_range(MESSAGE_ROW, 0, col)]
        } else if y == MESSAGE_ROW + 1 {
            let mut joined = self.screen.row(MESSAGE_ROW).trim_end().to_string();
            let rest = self.screen.row_range(MESSAGE_ROW + 1, 0, col);
            let rest = rest.trim();
            if !rest.is_empty() {
                joined.push(' ');
                joined.push_str(rest);
            }
            vec![joined]
        } else {
            self.screen.area(col, 0, WIDTH - col, y)
        };
        collected
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    fn classify(
        &mut self,
        patterns: &[Regex],
        raw_patterns: &[&str],
        dialog_question: Option<String>,
        mut lines: Vec<String>,
    ) -> Result<Event> {
        for re in patterns {
            if let Some(matched) = self.screen.match_before_cursor(re) {
                debug!(matched = %matched, "expected pattern hit");
                self.remember(lines);
                return Ok(Event::Expected(matched));
            }
        }

        if let Some(m) = self.screen.match_before_cursor(&YES_NO_PROMPT) {
            self.remember(lines);
            let token = self.claim(&m)?;
            return Ok(Event::Prompt(Interaction::YesNo(YesNo::from_prompt(
                token, &m,
            ))));
        }
        if let Some(m) = self.screen.match_before_cursor(&YES_NO_QUIT_PROMPT) {
            self.remember(lines);
            let token = self.claim(&m)?;
            return Ok(Event::Prompt(Interaction::YesNoQuit(
                YesNoQuit::from_prompt(token, &m),
            )));
        }
        if let Some(m) = self.screen.match_before_cursor(&SELECT_PROMPT) {
            self.remember(lines);
            let token = self.claim(&m)?;
            return Ok(Event::Prompt(Interaction::Select(Select::from_prompt(
                token, &m,
            ))));
        }
        if let Some(m) = self.screen.match_before_cursor(&DIALOG_MARKER) {
            self.remember(lines);
            let dialog = SelectDialog::harvest(self, dialog_question, m)?;
            return Ok(Event::Prompt(Interaction::SelectDialog(dialog)));
        }
        if let Some(m) = self.screen.match_before_cursor(&DIRECTION_PROMPT) {
            self.remember(lines);
            let token = self.claim(&m)?;
            return Ok(Event::Prompt(Interaction::Direction(
                Direction::from_prompt(token, &m),
            )));
        }

        let (x, y) = self.screen.cursor();
        if y == MESSAGE_ROW {
            let question = self.screen.row_range(MESSAGE_ROW, 0, x).trim().to_string();
            if question.is_empty() {
                warn!(x, y, "idle with empty message row under the cursor");
                debug!("screen at ambiguity:\n{}", self.screen.dump());
                return Err(Error::AmbiguousPrompt {
                    expected: raw_patterns.iter().map(|p| p.to_string()).collect(),
                    before: question,
                    x,
                    y,
                });
            }
            self.remember(lines);
            let token = self.claim(&question)?;
            return Ok(Event::Prompt(Interaction::FreeText(FreeText::new(
                token, question,
            ))));
        }

        let message = self.screen.row(MESSAGE_ROW).trim().to_string();
        if !message.is_empty() {
            lines.push(message);
        }
        let info = Information::new(lines);
        if !info.is_empty() {
            self.history.push(info.clone());
        }
        debug!(id = self.id, messages = info.lines().len(), "free turn");
        Ok(Event::Turn(info))
    }

    /// Waits for the next dialog page marker after a page-turn key.
    pub(crate) fn await_dialog_marker(&mut self) -> Result<String> {
        let marker = [DIALOG_MARKER.clone()];
        match self.watch_inner(&marker, &[DIALOG_MARKER_PATTERN], None)? {
            Event::Expected(m) => Ok(m),
            Event::Ended => Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "session ended while paging a select dialog",
            ))),
            _ => Err(Error::DialogDesync),
        }
    }

    fn remember(&mut self, lines: Vec<String>) {
        if !lines.is_empty() {
            self.history.push(Information::new(lines));
        }
    }

    // --- pending-prompt guard ---

    fn ensure_free(&self) -> Result<()> {
        if self.token.is_none() {
            return Err(Error::InteractionPending {
                question: self.pending_question.clone().unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Hands the turn token to a new prompt.
    pub(crate) fn claim(&mut self, question: &str) -> Result<TurnToken> {
        match self.token.take() {
            Some(token) => {
                debug!(id = self.id, question, "prompt pending");
                self.pending_question = Some(question.to_string());
                Ok(token)
            }
            None => Err(Error::InteractionPending {
                question: self.pending_question.clone().unwrap_or_default(),
            }),
        }
    }

    /// Takes the turn token back from an answered prompt.
    pub(crate) fn release(&mut self, token: TurnToken) -> Result<()> {
        if token.session_id() != self.id || self.token.is_some() {
            return Err(Error::InteractionNotPending);
        }
        debug!(id = self.id, "prompt answered");
        self.token = Some(token);
        self.pending_question = None;
        Ok(())
    }

    // --- unguarded sends (engine internal) ---

    pub(crate) fn push_keys(&mut self, keys: &str) -> Result<()> {
        self.transport.send(keys)
    }

    pub(crate) fn push_key(&mut self, key: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.transport.send(key.encode_utf8(&mut buf))
    }

    pub(crate) fn push_line(&mut self, line: &str) -> Result<()> {
        self.transport.send_line(line)
    }

    // --- human hand-off ---

    /// Hands the terminal to a human: mirrors game output to stdout and
    /// forwards local keystrokes to the transport until Ctrl-A. Requests
    /// a redraw on entry and exit so both sides repaint cleanly.
    pub fn interact(&mut self) -> Result<()> {
        self.ensure_free()?;
        info!(id = self.id, "handing terminal over, Ctrl-A returns");
        self.push_key(keys::REDRAW)?;
        enable_raw_mode()?;
        let result = self.interact_loop();
        disable_raw_mode()?;
        self.push_key(keys::REDRAW)?;
        info!(id = self.id, "hand-off ended");
        result
    }

    fn interact_loop(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        loop {
            match self.transport.read_chunk(Duration::from_millis(30))? {
                Chunk::Data(bytes) => {
                    self.screen.apply(&bytes)?;
                    stdout.write_all(&bytes)?;
                    stdout.flush()?;
                }
                Chunk::Idle => {}
                Chunk::Eof => return Ok(()),
            }
            while event::poll(Duration::from_millis(0))? {
                if let TermEvent::Key(key) = event::read()? {
                    if key.code == KeyCode::Char('a')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        return Ok(());
                    }
                    if let Some(encoded) = encode_key(key) {
                        self.push_keys(&encoded)?;
                    }
                }
            }
        }
    }
}

/// Maps a local key event to the bytes the game expects. Arrows become
/// the movement keys so they work regardless of the game's keypad mode.
fn encode_key(key: KeyEvent) -> Option<String> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let byte = (c.to_ascii_lowercase() as u8)
                .wrapping_sub(b'a')
                .wrapping_add(1);
            (byte < 0x20).then(|| char::from(byte).to_string())
        }
        KeyCode::Char(c) => Some(c.to_string()),
        KeyCode::Enter => Some("\r".to_string()),
        KeyCode::Esc => Some(keys::CANCEL.to_string()),
        KeyCode::Backspace => Some("\x08".to_string()),
        KeyCode::Tab => Some("\t".to_string()),
        KeyCode::Up => Some(keys::Compass::North.key().to_string()),
        KeyCode::Down => Some(keys::Compass::South.key().to_string()),
        KeyCode::Left => Some(keys::Compass::West.key().to_string()),
        KeyCode::Right => Some(keys::Compass::East.key().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::core::interaction::{Choice, CursorPoint};
    use crate::core::transport::ScriptedTransport;
    use crate::keys::Compass;

    fn data(s: &str) -> Chunk {
        Chunk::Data(s.as_bytes().to_vec())
    }

    fn session_with(steps: Vec<Chunk>) -> (Session<ScriptedTransport>, Rc<RefCell<Vec<String>>>) {
        let transport = ScriptedTransport::new(steps);
        let log = transport.sent_log();
        (Session::new(transport), log)
    }

    fn expect_prompt(event: Event) -> Interaction {
        match event {
            Event::Prompt(p) => p,
            other => panic!("expected a prompt, got {other:?}"),
        }
    }

    fn expect_turn(event: Event) -> Information {
        match event {
            Event::Turn(info) => info,
            other => panic!("expected a free turn, got {other:?}"),
        }
    }

    #[test]
    fn test_watch_classifies_yes_no() {
        let (mut session, log) = session_with(vec![
            data("Really attack the kitten? [yn] "),
            Chunk::Idle,
            data("\r\x1b[KYou miss the kitten.\x1b[5;10H"),
            Chunk::Idle,
        ]);
        let prompt = match expect_prompt(session.watch().unwrap()) {
            Interaction::YesNo(p) => p,
            other => panic!("expected YesNo, got {other:?}"),
        };
        assert_eq!(prompt.question(), "Really attack the kitten?");
        assert_eq!(prompt.default(), None);

        let info = expect_turn(prompt.answer(&mut session, false).unwrap());
        assert_eq!(info.lines(), &["You miss the kitten.".to_string()]);
        assert_eq!(*log.borrow(), vec!["n".to_string()]);
    }

    #[test]
    fn test_answer_default_sends_cancel() {
        let (mut session, log) = session_with(vec![
            data("Stop eating? [yn] (y) "),
            Chunk::Idle,
            data("\r\x1b[KYou stop eating.\x1b[4;4H"),
            Chunk::Idle,
        ]);
        let prompt = expect_prompt(session.watch().unwrap());
        match &prompt {
            Interaction::YesNo(p) => assert_eq!(p.default(), Some('y')),
            other => panic!("expected YesNo, got {other:?}"),
        }
        prompt.answer_default(&mut session).unwrap();
        assert_eq!(*log.borrow(), vec!["\x1b".to_string()]);
    }

    #[test]
    fn test_yes_no_quit_and_session_end() {
        let (mut session, log) = session_with(vec![
            data("Really quit? [ynq] (q) "),
            Chunk::Idle,
            data("\x1b[2JSad that you are leaving."),
            Chunk::Eof,
        ]);
        let prompt = match expect_prompt(session.watch().unwrap()) {
            Interaction::YesNoQuit(p) => p,
            other => panic!("expected YesNoQuit, got {other:?}"),
        };
        assert_eq!(prompt.default(), 'q');
        let event = prompt.answer(&mut session, Choice::Quit).unwrap();
        assert!(matches!(event, Event::Ended));
        assert_eq!(*log.borrow(), vec!["q".to_string()]);
    }

    #[test]
    fn test_select_prompt_and_invalid_answer_recovery() {
        let (mut session, log) = session_with(vec![
            data("What do you want to drink? [fh or ?*] "),
            Chunk::Idle,
            Chunk::Idle,
            data("\r\x1b[KGulp.\x1b[6;6H"),
            Chunk::Idle,
        ]);
        let prompt = match expect_prompt(session.watch().unwrap()) {
            Interaction::Select(p) => p,
            other => panic!("expected Select, got {other:?}"),
        };
        assert_eq!(prompt.options(), &['f', 'h', '?', '*']);

        // An invalid key releases the prompt unanswered...
        let err = prompt.answer(&mut session, 'z').unwrap_err();
        assert!(matches!(err, Error::InvalidAnswer { .. }));
        assert!(!session.pending());

        // ...and the unchanged screen classifies to the same prompt.
        let prompt = match expect_prompt(session.watch().unwrap()) {
            Interaction::Select(p) => p,
            other => panic!("expected Select again, got {other:?}"),
        };
        prompt.answer(&mut session, 'f').unwrap();
        assert_eq!(*log.borrow(), vec!["f".to_string()]);
    }

    #[test]
    fn test_two_page_dialog_merges_options_and_rewinds() {
        let page1 = "\x1b[2JWeapons\r\n a - a +1 long sword\r\n b - a dagger\r\n(1 of 2) ";
        let page2 = "\x1b[2JArmor\r\n c - a leather armor\r\n(2 of 2) ";
        let (mut session, log) = session_with(vec![
            data(page1),
            Chunk::Idle,
            data(page2),
            Chunk::Idle,
            data(page1),
            Chunk::Idle,
            data("\x1b[2JYou are now wearing a leather armor.\x1b[9;9H"),
            Chunk::Idle,
        ]);
        let dialog = match expect_prompt(session.watch().unwrap()) {
            Interaction::SelectDialog(d) => d,
            other => panic!("expected SelectDialog, got {other:?}"),
        };
        assert_eq!(dialog.pages(), 2);
        let keys: Vec<char> = dialog.options().iter().map(|o| o.key()).collect();
        assert_eq!(keys, vec!['a', 'b', 'c']);
        assert_eq!(dialog.options()[0].category(), Some("Weapons"));
        assert_eq!(dialog.options()[2].category(), Some("Armor"));

        dialog.answer(&mut session, 'c').unwrap();
        assert_eq!(
            *log.borrow(),
            vec![">".to_string(), "<".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_multi_select_dialog_answers_on_one_page() {
        let (mut session, log) = session_with(vec![
            data("\x1b[2JPick up what?\r\n a - a rock\r\n b - a gem\r\n(end) "),
            Chunk::Idle,
            data("\x1b[2J\x1b[7;7H"),
            Chunk::Idle,
        ]);
        let dialog = match expect_prompt(session.watch().unwrap()) {
            Interaction::SelectDialog(d) => d,
            other => panic!("expected SelectDialog, got {other:?}"),
        };
        assert_eq!(dialog.pages(), 1);
        assert_eq!(dialog.question(), "Pick up what?");
        dialog.answer_many(&mut session, &['a', 'b']).unwrap();
        assert_eq!(*log.borrow(), vec!["ab ".to_string()]);
    }

    #[test]
    fn test_direction_prompt_restriction() {
        let (mut session, log) = session_with(vec![
            data("In what direction? [jk] "),
            Chunk::Idle,
            Chunk::Idle,
            data("\r\x1b[KYou kick the door.\x1b[7;7H"),
            Chunk::Idle,
        ]);
        let prompt = match expect_prompt(session.watch().unwrap()) {
            Interaction::Direction(p) => p,
            other => panic!("expected Direction, got {other:?}"),
        };
        assert_eq!(prompt.allowed(), &[Compass::South, Compass::North]);

        let err = prompt.answer(&mut session, Compass::West).unwrap_err();
        assert!(matches!(err, Error::InvalidAnswer { .. }));

        let prompt = match expect_prompt(session.watch().unwrap()) {
            Interaction::Direction(p) => p,
            other => panic!("expected Direction again, got {other:?}"),
        };
        prompt.answer(&mut session, Compass::North).unwrap();
        assert_eq!(*log.borrow(), vec!["k".to_string()]);
    }

    #[test]
    fn test_free_text_prompt_on_message_row() {
        let (mut session, log) = session_with(vec![
            data("What do you want to name it? "),
            Chunk::Idle,
            data("\r\x1b[K\x1b[8;8H"),
            Chunk::Idle,
        ]);
        let prompt = match expect_prompt(session.watch().unwrap()) {
            Interaction::FreeText(p) => p,
            other => panic!("expected FreeText, got {other:?}"),
        };
        assert_eq!(prompt.question(), "What do you want to name it?");
        let info = expect_turn(prompt.answer(&mut session, "Fluffy").unwrap());
        assert!(info.is_empty());
        assert_eq!(*log.borrow(), vec!["Fluffy\n".to_string()]);
    }

    #[test]
    fn test_free_turn_collects_message_row() {
        let (mut session, _log) =
            session_with(vec![data("You see here a carrot.\x1b[10;10H"), Chunk::Idle]);
        let info = expect_turn(session.watch().unwrap());
        assert_eq!(info.lines(), &["You see here a carrot.".to_string()]);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_pagination_harvests_and_acknowledges() {
        let (mut session, log) = session_with(vec![
            data("There is a fountain here.--More--"),
            data("\r\x1b[KYou hear bubbling water.\x1b[8;8H"),
            Chunk::Idle,
        ]);
        let info = expect_turn(session.watch().unwrap());
        assert_eq!(
            info.lines(),
            &[
                "There is a fountain here.".to_string(),
                "You hear bubbling water.".to_string(),
            ]
        );
        assert_eq!(*log.borrow(), vec![" ".to_string()]);
    }

    #[test]
    fn test_expected_patterns_win_over_species() {
        let (mut session, _log) =
            session_with(vec![data("Really attack the kitten? [yn] "), Chunk::Idle]);
        let event = session.watch_for(&[r".* \[yn\] "]).unwrap();
        match event {
            Event::Expected(m) => assert_eq!(m, "Really attack the kitten? [yn] "),
            other => panic!("expected pattern hit, got {other:?}"),
        }
        assert!(!session.pending());
    }

    #[test]
    fn test_ambiguous_prompt_carries_diagnostics() {
        let (mut session, _log) = session_with(vec![data("\x1b[H"), Chunk::Idle]);
        let err = session.watch_for(&["Bazinga"]).unwrap_err();
        match err {
            Error::AmbiguousPrompt {
                expected,
                before,
                x,
                y,
            } => {
                assert_eq!(expected, vec!["Bazinga".to_string()]);
                assert_eq!(before, "");
                assert_eq!((x, y), (0, 0));
            }
            other => panic!("expected AmbiguousPrompt, got {other:?}"),
        }
    }

    #[test]
    fn test_single_pending_prompt_guard() {
        let (mut session, log) = session_with(vec![
            data("Really attack the kitten? [yn] "),
            Chunk::Idle,
            data("\r\x1b[KYou hit the kitten.\x1b[5;5H"),
            Chunk::Idle,
        ]);
        let prompt = expect_prompt(session.watch().unwrap());
        assert!(session.pending());

        let err = session.watch().unwrap_err();
        assert!(matches!(err, Error::InteractionPending { ref question }
            if question.contains("Really attack the kitten?")));
        let err = session.send_key("i").unwrap_err();
        assert!(err.is_protocol_violation());

        match prompt {
            Interaction::YesNo(p) => {
                p.answer(&mut session, true).unwrap();
            }
            other => panic!("expected YesNo, got {other:?}"),
        }
        assert!(!session.pending());
        session.send_key("i").unwrap();
        assert_eq!(*log.borrow(), vec!["y".to_string(), "i".to_string()]);
    }

    #[test]
    fn test_answer_on_wrong_session_is_rejected() {
        let (mut alpha, _a) =
            session_with(vec![data("Really attack the kitten? [yn] "), Chunk::Idle]);
        let (mut beta, _b) = session_with(vec![]);
        let prompt = match expect_prompt(alpha.watch().unwrap()) {
            Interaction::YesNo(p) => p,
            other => panic!("expected YesNo, got {other:?}"),
        };
        let err = prompt.answer(&mut beta, true).unwrap_err();
        assert!(matches!(err, Error::InteractionNotPending));
    }

    #[test]
    fn test_cursor_point_walks_and_confirms() {
        let (mut session, log) = session_with(vec![
            data("Pick an object.\x1b[10;20H"),
            Chunk::Idle,
            data("\x1b[H\x1b[Ka fountain.\x1b[10;20H"),
            Chunk::Idle,
        ]);
        let info = expect_turn(session.watch().unwrap());
        assert!(info.contains("Pick an object."));

        let point = CursorPoint::new(&mut session, "Pick an object.").unwrap();
        assert!(session.pending());
        // A second claim while this one is outstanding must fail.
        let err = CursorPoint::new(&mut session, "again").unwrap_err();
        assert!(err.is_protocol_violation());

        let info = expect_turn(point.answer(&mut session, 25, 5).unwrap());
        assert!(info.contains("a fountain."));
        // Cursor was at (19, 9): six steps east, four north, confirm.
        assert_eq!(*log.borrow(), vec!["llllllkkkk.".to_string()]);
    }
}
