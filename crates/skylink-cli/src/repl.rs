//! REPL – Read-Eval-Print Loop for the SkyLink ground-station shell.
//!
//! Supported slash-commands:
//!   /help                 – show this list
//!   /status               – telemetry core status and latest readouts
//!   /connect              – connect the simulated link and activate telemetry
//!   /disconnect           – deactivate telemetry and drop the link
//!   /relink               – re-announce the link (forces a capability re-probe)
//!   /video on|off         – toggle the vehicle's video capability
//!   /heading fpv|compass  – persist the heading preference
//!   /quit | /exit         – gracefully exit the CLI

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use skylink_hal::{HeadlessSurface, SimLink, VideoSurface};
use skylink_runtime::TelemetryHandle;
use skylink_types::HeadingMode;

use crate::config::{self, Config};
use crate::display::ConsoleDisplay;

const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// A parsed slash-command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Status,
    Connect,
    Disconnect,
    Relink,
    Video(bool),
    Heading(HeadingMode),
    Quit,
}

impl Command {
    /// Parse one input line. The error is the message shown to the user.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default();
        let arg = words.next();
        match (head, arg) {
            ("/help", _) => Ok(Self::Help),
            ("/status", _) => Ok(Self::Status),
            ("/connect", _) => Ok(Self::Connect),
            ("/disconnect", _) => Ok(Self::Disconnect),
            ("/relink", _) => Ok(Self::Relink),
            ("/video", Some("on")) => Ok(Self::Video(true)),
            ("/video", Some("off")) => Ok(Self::Video(false)),
            ("/video", _) => Err("usage: /video on|off".to_string()),
            ("/heading", Some("fpv")) => Ok(Self::Heading(HeadingMode::Fpv)),
            ("/heading", Some("compass")) => Ok(Self::Heading(HeadingMode::Compass)),
            ("/heading", _) => Err("usage: /heading fpv|compass".to_string()),
            ("/quit" | "/exit", _) => Ok(Self::Quit),
            (other, _) => Err(format!("Unknown command: '{other}'")),
        }
    }
}

/// Everything the shell drives.
pub struct Session {
    pub runtime: tokio::runtime::Handle,
    pub telemetry: TelemetryHandle,
    pub link: SimLink,
    pub surface: HeadlessSurface,
    pub display: ConsoleDisplay,
    pub config_path: PathBuf,
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(session: &Session, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "skylink>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Command::parse(line) {
            Ok(Command::Help) => cmd_help(),
            Ok(Command::Status) => cmd_status(session),
            Ok(Command::Connect) => cmd_connect(session),
            Ok(Command::Disconnect) => cmd_disconnect(session),
            Ok(Command::Relink) => cmd_relink(session),
            Ok(Command::Video(supported)) => cmd_video(session, supported),
            Ok(Command::Heading(mode)) => cmd_heading(session, mode),
            Ok(Command::Quit) => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Err(msg) => println!(
                "{}. Type {} for available commands.",
                msg.red(),
                "/help".bold()
            ),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "SkyLink Commands".bold().underline());
    println!("  {}               – telemetry and video status", "/status".bold().cyan());
    println!("  {}              – connect the link and start telemetry", "/connect".bold().cyan());
    println!("  {}           – stop telemetry and drop the link", "/disconnect".bold().cyan());
    println!("  {}               – re-announce the link", "/relink".bold().cyan());
    println!("  {}        – toggle vehicle video support", "/video on|off".bold().cyan());
    println!("  {} – heading mode used on next connect", "/heading fpv|compass".bold().cyan());
    println!("  {}         – exit the CLI", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_status(session: &Session) {
    let status = session
        .runtime
        .block_on(async { tokio::time::timeout(STATUS_TIMEOUT, session.telemetry.status()).await });
    match status {
        Ok(Ok(s)) => {
            println!("{}", "Telemetry".bold().underline());
            println!("  link       : {:?}", s.connection);
            println!("  heading    : {:?}", s.heading_mode);
            println!("  subscribed : {}", s.subscribed);
            println!("  video      : {:?} ({:?})", s.stream_phase, s.capability);
            println!(
                "  surface    : {}",
                if s.surface_visible { "visible".green() } else { "hidden".dimmed() }
            );
            println!("  epoch      : {}", s.epoch);
            println!("{}", session.display.render());
        }
        Ok(Err(e)) => println!("{}: {}", "Status unavailable".red(), e),
        Err(_) => println!("{}", "Status request timed out".red()),
    }
    println!(
        "  sim        : connected={} streaming={} probes={} starts={} stops={}",
        session.link.is_connected(),
        session.link.is_streaming(),
        session.link.probe_count(),
        session.link.start_count(),
        session.link.stop_count()
    );
    if let Some(handle) = session.surface.ready_handle() {
        println!("  buffer     : {:?}", handle);
    }
}

fn cmd_connect(session: &Session) {
    session.link.connect();
    match session.telemetry.activate() {
        Ok(()) => println!("{}", "  ✓ Link connected; telemetry active.".green()),
        Err(e) => println!("{}: {}", "Activation failed".red(), e),
    }
}

fn cmd_disconnect(session: &Session) {
    if let Err(e) = session.telemetry.deactivate() {
        println!("{}: {}", "Deactivation failed".red(), e);
    }
    session.link.disconnect();
    println!("{}", "  ✓ Link dropped; telemetry idle.".green());
}

fn cmd_relink(session: &Session) {
    if !session.link.is_connected() {
        println!("{}", "  Link is not connected. Use /connect first.".yellow());
        return;
    }
    session.link.connect();
    println!("  Link re-announced; capability re-probe requested.");
}

fn cmd_video(session: &Session, supported: bool) {
    session.link.set_video_supported(supported);
    println!(
        "  Vehicle video support {}. Use {} to re-probe.",
        if supported { "enabled".green() } else { "disabled".yellow() },
        "/relink".bold()
    );
}

fn cmd_heading(session: &Session, mode: HeadingMode) {
    let mut cfg = match config::load_from(&session.config_path) {
        Ok(Some(c)) => c,
        Ok(None) => Config::default(),
        Err(e) => {
            println!("{}: {}", "Error loading config".red(), e);
            return;
        }
    };
    cfg.pref_heading_mode = mode == HeadingMode::Compass;
    match config::save_to(&cfg, &session.config_path) {
        Ok(()) => println!(
            "  Heading preference set to {:?}; applied on next {}.",
            mode,
            "/connect".bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}
