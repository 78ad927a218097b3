//! nhbot - demo bot binary
//!
//! Connects to a game (local process under a PTY, or a public server
//! over telnet), creates a character, walks around at random for a few
//! turns while answering every prompt with its default, then quits.
//! `--interact` hands the terminal to a human instead.
//!
//! Logging goes to stderr through `tracing`; set `RUST_LOG=nhbot=debug`
//! to watch the classifier decide, and to dump the screen every turn.

use std::env;
use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nhbot::config::Config;
use nhbot::core::session::{Event, Session};
use nhbot::core::transport::{PtyTransport, TcpTransport, Transport};
use nhbot::error::Result as EngineResult;
use nhbot::keys::Compass;
use nhbot::player::Player;

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Turns the demo bot walks when --turns is not given.
const DEFAULT_TURNS: usize = 20;

/// Command-line arguments
#[derive(Default)]
struct CliArgs {
    /// Connect to HOST:PORT over TCP
    telnet: Option<(String, u16)>,
    /// Run a local game command under a PTY
    command: Option<String>,
    /// Read configuration from this path instead of ~/.nhbot/config.toml
    config_path: Option<PathBuf>,
    /// Walk this many turns before quitting
    turns: Option<usize>,
    /// Hand the terminal to a human instead of running the bot
    interact: bool,
}

fn print_version() {
    eprintln!("nhbot {}", VERSION);
}

fn print_help() {
    eprintln!("nhbot {} - a screen-scraping NetHack bot engine", VERSION);
    eprintln!();
    eprintln!("Usage: nhbot [OPTIONS]");
    eprintln!();
    eprintln!("Connection options:");
    eprintln!("  --telnet <HOST:PORT>  Connect to a public game server (port defaults to 23)");
    eprintln!("  --command <CMD>       Run a local game command under a PTY");
    eprintln!("  (default)             Whatever ~/.nhbot/config.toml configures");
    eprintln!();
    eprintln!("Bot options:");
    eprintln!(
        "  --turns <N>           Walk N turns before quitting (default: {})",
        DEFAULT_TURNS
    );
    eprintln!("  --interact            Hand the terminal to you instead (Ctrl-A ends)");
    eprintln!();
    eprintln!("Other options:");
    eprintln!("  --config <PATH>       Read configuration from PATH");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Logging:");
    eprintln!("  RUST_LOG=nhbot=debug  Watch-loop detail plus a screen dump per turn");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  nhbot --command nethack");
    eprintln!("  nhbot --command nethack --turns 50");
    eprintln!("  nhbot --telnet nethack.alt.org --interact");
    eprintln!();
    eprintln!("Configuration: ~/.nhbot/config.toml");
}

fn parse_args() -> Result<CliArgs, String> {
    let args: Vec<String> = env::args().collect();
    let mut cli = CliArgs::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "--telnet" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --telnet".to_string());
                }
                cli.telnet = Some(parse_host_port(&args[i])?);
            }
            "--command" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --command".to_string());
                }
                cli.command = Some(args[i].clone());
            }
            "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --config".to_string());
                }
                cli.config_path = Some(PathBuf::from(&args[i]));
            }
            "--turns" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --turns".to_string());
                }
                cli.turns = Some(
                    args[i]
                        .parse()
                        .map_err(|_| format!("Invalid turn count: {}", args[i]))?,
                );
            }
            "--interact" => {
                cli.interact = true;
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use --help for usage.", arg));
            }
        }
        i += 1;
    }

    Ok(cli)
}

fn parse_host_port(addr: &str) -> Result<(String, u16), String> {
    let (host, port) = addr.split_once(':').unwrap_or((addr, "23"));
    if host.is_empty() {
        return Err(format!("Missing host in: {}", addr));
    }
    let port = port
        .parse()
        .map_err(|_| format!("Invalid port in: {}", addr))?;
    Ok((host.to_string(), port))
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nhbot=info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Where the game comes from, after merging CLI over config.
enum Connect {
    Tcp(String, u16),
    Command(String),
}

fn resolve_connection(cli: &CliArgs, config: &Config) -> Result<Connect, String> {
    if let Some((host, port)) = &cli.telnet {
        return Ok(Connect::Tcp(host.clone(), *port));
    }
    if let Some(command) = &cli.command {
        return Ok(Connect::Command(command.clone()));
    }
    if let Some(host) = &config.connection.host {
        return Ok(Connect::Tcp(host.clone(), config.connection.port));
    }
    if let Some(command) = &config.connection.command {
        return Ok(Connect::Command(command.clone()));
    }
    Err("No connection configured: pass --telnet HOST:PORT or --command CMD".to_string())
}

fn main() -> anyhow::Result<()> {
    let cli = match parse_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging();

    let config = match &cli.config_path {
        Some(path) => Config::load_from(path).map_err(|e| anyhow::anyhow!(e))?,
        None => Config::load(),
    };

    let connect = match resolve_connection(&cli, &config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    info!(version = VERSION, "nhbot starting");

    match connect {
        Connect::Tcp(host, port) => {
            let transport = TcpTransport::connect(&host, port)?;
            let session = Session::with_idle_timeout(transport, config.idle_timeout());
            run(session, &cli, &config)
        }
        Connect::Command(command) => {
            let transport = PtyTransport::spawn(&command)?;
            let session = Session::with_idle_timeout(transport, config.idle_timeout());
            run(session, &cli, &config)
        }
    }
}

fn run<T: Transport>(session: Session<T>, cli: &CliArgs, config: &Config) -> anyhow::Result<()> {
    let mut player = Player::new(session, config.character.clone());

    if cli.interact {
        player.session_mut().interact()?;
        return Ok(());
    }

    match drive(&mut player, cli.turns.unwrap_or(DEFAULT_TURNS)) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("bot stopped: {}", e);
            eprintln!("{}", player.session().screen().dump());
            Err(e.into())
        }
    }
}

/// The demo bot: create a character, wander, quit.
fn drive<T: Transport>(player: &mut Player<T>, turns: usize) -> EngineResult<()> {
    let mut rng = WalkRng::new();
    let mut walked = 0;

    let mut event = player.play()?;
    while walked < turns {
        event = match event {
            Event::Prompt(prompt) => {
                info!(question = prompt.question(), "declining prompt");
                prompt.answer_default(player.session_mut())?
            }
            Event::Turn(info) => {
                for line in info.lines() {
                    info!(%line, "game says");
                }
                debug!(
                    hp = ?player.hit_points(),
                    dlvl = ?player.dungeon_level(),
                    "screen:\n{}",
                    player.session().screen().dump()
                );
                walked += 1;
                let step = WALK[(rng.next() as usize) % WALK.len()];
                player.go(step)?
            }
            // watch() without expected patterns never yields this
            Event::Expected(_) => player.session_mut().watch()?,
            Event::Ended => {
                info!(walked, "session ended mid-walk");
                return Ok(());
            }
        };
    }

    // Settle whatever the last step left pending, then quit and answer
    // the end-of-game prompts with their defaults until the game hangs up.
    info!(walked, "walk finished, quitting");
    for _ in 0..4 {
        match event {
            Event::Prompt(prompt) => {
                event = prompt.answer_default(player.session_mut())?;
            }
            _ => break,
        }
    }
    if matches!(event, Event::Ended) {
        return Ok(());
    }

    let mut event = player.quit()?;
    for _ in 0..8 {
        event = match event {
            Event::Ended => return Ok(()),
            Event::Prompt(prompt) => prompt.answer_default(player.session_mut())?,
            other => {
                debug!(?other, "unexpected event while quitting");
                break;
            }
        };
    }
    info!("game did not end cleanly after quit");
    Ok(())
}

/// Walk directions the demo bot picks from.
const WALK: [Compass; 8] = [
    Compass::North,
    Compass::NorthEast,
    Compass::East,
    Compass::SouthEast,
    Compass::South,
    Compass::SouthWest,
    Compass::West,
    Compass::NorthWest,
];

/// Tiny xorshift generator; plenty for picking a walk direction.
struct WalkRng(u64);

impl WalkRng {
    fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9e37_79b9_7f4a_7c15);
        WalkRng(seed | 1)
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}
