//! Core game-driving components.
//!
//! This module contains the engine underneath the player layer:
//!
//! - **screen**: 80x24 cell grid + ANSI escape sequence parser
//! - **transport**: byte streams to a game over TCP or a local PTY
//! - **session**: watch loop combining transport + screen, classifying
//!   what the game is waiting for
//! - **interaction**: prompt species and the single-pending-answer
//!   protocol
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── Transport (TCP / PTY / scripted byte stream)
//! └── ScreenBuffer
//!     ├── Cell grid (char + bold/inverse + color)
//!     ├── Cursor (position + one saved slot)
//!     └── SeqParser (ANSI escape sequences)
//! ```

pub mod interaction;
pub mod screen;
pub mod session;
pub mod transport;
