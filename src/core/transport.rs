//! Transports: where the game's bytes come from and keystrokes go
//!
//! The engine is transport-agnostic; everything it needs is the
//! [`Transport`] trait's bounded-wait read plus raw and line sends.
//! Two real transports are provided:
//!
//! - [`TcpTransport`]: a public server reached over raw TCP, with just
//!   enough telnet awareness to refuse option negotiation and pass game
//!   bytes through clean;
//! - [`PtyTransport`]: a local game process under a pseudo-terminal
//!   sized to the grid, drained by a reader thread into a channel.
//!
//! Test builds add a scripted playback transport.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tracing::{debug, info, trace};

use crate::core::screen::{HEIGHT, WIDTH};
use crate::error::{Error, Result};

/// Outcome of one bounded-wait read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Fresh bytes from the game. May be empty when the read consisted
    /// entirely of filtered protocol chatter.
    Data(Vec<u8>),
    /// Nothing arrived within the wait.
    Idle,
    /// The far end hung up; no more data will ever arrive.
    Eof,
}

pub trait Transport {
    /// Waits up to `wait` for the next chunk of game output.
    fn read_chunk(&mut self, wait: Duration) -> Result<Chunk>;

    /// Sends raw keystrokes, unbuffered.
    fn send(&mut self, keys: &str) -> Result<()>;

    /// Sends a line with a terminating newline.
    fn send_line(&mut self, line: &str) -> Result<()> {
        self.send(&format!("{line}\n"))
    }
}

const READ_BUF: usize = 4096;

// --- telnet command filtering -------------------------------------------

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

/// Strips telnet command sequences out of a byte stream, refusing every
/// option the server proposes. Incomplete commands at the end of a chunk
/// stay pending until the next one.
#[derive(Debug, Default)]
struct TelnetFilter {
    pending: Vec<u8>,
}

impl TelnetFilter {
    fn filter(&mut self, input: &[u8], reply: &mut Vec<u8>) -> Vec<u8> {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(input);
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != IAC {
                out.push(bytes[i]);
                i += 1;
                continue;
            }
            if i + 1 >= bytes.len() {
                self.pending = bytes[i..].to_vec();
                break;
            }
            match bytes[i + 1] {
                IAC => {
                    out.push(IAC);
                    i += 2;
                }
                verb @ (DO | DONT | WILL | WONT) => {
                    if i + 2 >= bytes.len() {
                        self.pending = bytes[i..].to_vec();
                        break;
                    }
                    let option = bytes[i + 2];
                    match verb {
                        DO => reply.extend_from_slice(&[IAC, WONT, option]),
                        WILL => reply.extend_from_slice(&[IAC, DONT, option]),
                        _ => {}
                    }
                    trace!(verb, option, "refused telnet option");
                    i += 3;
                }
                SB => {
                    // Swallow subnegotiation through IAC SE.
                    let mut j = i + 2;
                    let mut end = None;
                    while j + 1 < bytes.len() {
                        if bytes[j] == IAC && bytes[j + 1] == SE {
                            end = Some(j + 2);
                            break;
                        }
                        j += 1;
                    }
                    match end {
                        Some(e) => i = e,
                        None => {
                            self.pending = bytes[i..].to_vec();
                            break;
                        }
                    }
                }
                _ => i += 2,
            }
        }
        out
    }
}

// --- TCP ----------------------------------------------------------------

/// Raw TCP connection to a public game server.
pub struct TcpTransport {
    stream: TcpStream,
    telnet: TelnetFilter,
}

impl TcpTransport {
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_nodelay(true)?;
        info!(host, port, "connected to game server");
        Ok(TcpTransport {
            stream,
            telnet: TelnetFilter::default(),
        })
    }
}

impl Transport for TcpTransport {
    fn read_chunk(&mut self, wait: Duration) -> Result<Chunk> {
        self.stream
            .set_read_timeout(Some(wait.max(Duration::from_millis(1))))?;
        let mut buf = [0u8; READ_BUF];
        match self.stream.read(&mut buf) {
            Ok(0) => {
                debug!("server closed the connection");
                Ok(Chunk::Eof)
            }
            Ok(n) => {
                let mut reply = Vec::new();
                let data = self.telnet.filter(&buf[..n], &mut reply);
                if !reply.is_empty() {
                    self.stream.write_all(&reply)?;
                }
                Ok(Chunk::Data(data))
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(Chunk::Idle)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn send(&mut self, keys: &str) -> Result<()> {
        self.stream.write_all(keys.as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }
}

// --- local PTY ----------------------------------------------------------

/// Local game process under a pseudo-terminal sized to the grid.
///
/// A reader thread drains the PTY into a channel so the bounded wait is
/// a plain `recv_timeout`; the engine itself stays single-threaded.
pub struct PtyTransport {
    // Held so the PTY outlives the child.
    _master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    writer: Box<dyn Write + Send>,
    output: Receiver<Vec<u8>>,
}

impl PtyTransport {
    /// Spawns `command` (program plus whitespace-separated arguments)
    /// with the environment the game expects for an 80x24 terminal.
    pub fn spawn(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| Error::Spawn("empty command".to_string()))?;

        let pty = native_pty_system()
            .openpty(PtySize {
                rows: HEIGHT as u16,
                cols: WIDTH as u16,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| Error::Spawn(e.to_string()))?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(parts);
        cmd.env("TERM", "xterm");
        cmd.env("LINES", HEIGHT.to_string());
        cmd.env("COLUMNS", WIDTH.to_string());

        let child = pty
            .slave
            .spawn_command(cmd)
            .map_err(|e| Error::Spawn(e.to_string()))?;
        drop(pty.slave);

        let mut reader = pty
            .master
            .try_clone_reader()
            .map_err(|e| Error::Spawn(e.to_string()))?;
        let writer = pty
            .master
            .take_writer()
            .map_err(|e| Error::Spawn(e.to_string()))?;

        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        thread::spawn(move || {
            let mut buf = [0u8; READ_BUF];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        info!(command, "spawned game process");
        Ok(PtyTransport {
            _master: pty.master,
            child,
            writer,
            output: rx,
        })
    }
}

impl Transport for PtyTransport {
    fn read_chunk(&mut self, wait: Duration) -> Result<Chunk> {
        match self.output.recv_timeout(wait) {
            Ok(data) => Ok(Chunk::Data(data)),
            Err(RecvTimeoutError::Timeout) => Ok(Chunk::Idle),
            Err(RecvTimeoutError::Disconnected) => {
                debug!("game process hung up");
                Ok(Chunk::Eof)
            }
        }
    }

    fn send(&mut self, keys: &str) -> Result<()> {
        self.writer.write_all(keys.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for PtyTransport {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// --- scripted (tests) ---------------------------------------------------

#[cfg(test)]
pub(crate) use script::ScriptedTransport;

#[cfg(test)]
mod script {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;

    /// Plays back a fixed sequence of read outcomes and records every
    /// keystroke sent. Once the script runs out, reads report Idle.
    pub(crate) struct ScriptedTransport {
        steps: VecDeque<Chunk>,
        sent: Rc<RefCell<Vec<String>>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(steps: Vec<Chunk>) -> Self {
            ScriptedTransport {
                steps: steps.into(),
                sent: Rc::new(RefCell::new(Vec::new())),
            }
        }

        /// Shared handle to the send log, usable after the transport has
        /// been moved into a session.
        pub(crate) fn sent_log(&self) -> Rc<RefCell<Vec<String>>> {
            Rc::clone(&self.sent)
        }
    }

    impl Transport for ScriptedTransport {
        fn read_chunk(&mut self, _wait: Duration) -> Result<Chunk> {
            Ok(self.steps.pop_front().unwrap_or(Chunk::Idle))
        }

        fn send(&mut self, keys: &str) -> Result<()> {
            self.sent.borrow_mut().push(keys.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telnet_filter_passes_plain_bytes() {
        let mut filter = TelnetFilter::default();
        let mut reply = Vec::new();
        let out = filter.filter(b"Hello", &mut reply);
        assert_eq!(out, b"Hello");
        assert!(reply.is_empty());
    }

    #[test]
    fn test_telnet_filter_refuses_options() {
        let mut filter = TelnetFilter::default();
        let mut reply = Vec::new();
        // IAC DO ECHO(1), IAC WILL SGA(3), then game bytes.
        let out = filter.filter(&[IAC, DO, 1, IAC, WILL, 3, b'x'], &mut reply);
        assert_eq!(out, b"x");
        assert_eq!(reply, vec![IAC, WONT, 1, IAC, DONT, 3]);
    }

    #[test]
    fn test_telnet_filter_unescapes_literal_iac() {
        let mut filter = TelnetFilter::default();
        let mut reply = Vec::new();
        let out = filter.filter(&[b'a', IAC, IAC, b'b'], &mut reply);
        assert_eq!(out, vec![b'a', IAC, b'b']);
    }

    #[test]
    fn test_telnet_filter_split_command() {
        let mut filter = TelnetFilter::default();
        let mut reply = Vec::new();
        let out = filter.filter(&[b'a', IAC], &mut reply);
        assert_eq!(out, b"a");
        assert!(reply.is_empty());
        let out = filter.filter(&[DO, 1, b'b'], &mut reply);
        assert_eq!(out, b"b");
        assert_eq!(reply, vec![IAC, WONT, 1]);
    }

    #[test]
    fn test_telnet_filter_swallows_subnegotiation() {
        let mut filter = TelnetFilter::default();
        let mut reply = Vec::new();
        let out = filter.filter(&[b'a', IAC, SB, 24, 1, IAC, SE, b'b'], &mut reply);
        assert_eq!(out, vec![b'a', b'b']);
    }

    #[test]
    fn test_scripted_transport_playback() {
        let mut t = ScriptedTransport::new(vec![
            Chunk::Data(b"hi".to_vec()),
            Chunk::Idle,
            Chunk::Eof,
        ]);
        let wait = Duration::from_millis(1);
        assert_eq!(t.read_chunk(wait).unwrap(), Chunk::Data(b"hi".to_vec()));
        assert_eq!(t.read_chunk(wait).unwrap(), Chunk::Idle);
        assert_eq!(t.read_chunk(wait).unwrap(), Chunk::Eof);
        assert_eq!(t.read_chunk(wait).unwrap(), Chunk::Idle);
        t.send("y").unwrap();
        t.send_line("Crga").unwrap();
        assert_eq!(*t.sent_log().borrow(), vec!["y".to_string(), "Crga\n".to_string()]);
    }
}
