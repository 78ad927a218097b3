//! nhbot - a screen-scraping engine for writing NetHack bots
//!
//! nhbot drives a terminal rogue-like over a live session: it keeps an
//! in-memory model of the remote 80x24 screen, reads the game's output
//! until the stream goes idle, and classifies what the game is waiting
//! for into typed prompts. A prompt must be answered before anything
//! else may be sent; answering re-enters the watch loop.
//!
//! # Features
//!
//! - **Screen model**: attributed 80x24 cell grid fed by the game's
//!   escape-sequence subset; an unrecognized sequence fails fast instead
//!   of silently desyncing the cursor
//! - **Watch loop**: bounded-wait reads, transparent `--More--`
//!   pagination, message harvesting
//! - **Typed prompts**: yes/no, yes/no/quit, single-key select,
//!   paginated select dialogs, directions, free text, cursor pointing
//! - **Single-pending-prompt protocol**: an unanswered prompt blocks all
//!   other input, enforced through ownership
//! - **Transports**: local game process under a PTY, or raw TCP with
//!   minimal telnet handling
//! - **Player layer**: named actions (eat, wield, travel, ...) and
//!   status-line readers on top of a session
//!
//! # Quick start
//!
//! ```no_run
//! use nhbot::core::session::{Event, Session};
//! use nhbot::core::transport::PtyTransport;
//!
//! fn main() -> nhbot::Result<()> {
//!     let transport = PtyTransport::spawn("nethack")?;
//!     let mut session = Session::new(transport);
//!     let mut event = session.watch()?;
//!     loop {
//!         event = match event {
//!             Event::Prompt(prompt) => {
//!                 println!("asked: {}", prompt.question());
//!                 prompt.answer_default(&mut session)?
//!             }
//!             Event::Turn(info) => {
//!                 println!("{info}");
//!                 session.send_key("s")?;
//!                 session.watch()?
//!             }
//!             Event::Expected(_) => session.watch()?,
//!             Event::Ended => break,
//!         };
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The modules mirror the layering: [`core`](crate::core) is the engine
//! (screen, transport, session, interactions), [`player`] the
//! convenience layer on top, [`config`]/[`keys`]/[`items`] the
//! supporting tables.

pub mod config;
pub mod core;
pub mod error;
pub mod items;
pub mod keys;
pub mod player;

pub use crate::config::Config;
pub use crate::core::interaction::{Information, Interaction};
pub use crate::core::screen::ScreenBuffer;
pub use crate::core::session::{Event, Session};
pub use crate::core::transport::{PtyTransport, TcpTransport, Transport};
pub use crate::error::{Error, Result};
pub use crate::player::Player;
