//! `skylink` – SkyLink ground-station shell
//!
//! This binary wires the telemetry core to a simulated vehicle link.  It:
//!
//! 1. Loads `~/.skylink/config.toml`, writing the defaults on first run.
//! 2. Builds the event bus, simulated link, headless video surface and the
//!    telemetry coordinator, then starts the simulated telemetry feed.
//! 3. Drops the user into an **interactive REPL** with slash-commands
//!    (`/connect`, `/disconnect`, `/status`, `/video`, `/heading`, `/help`).
//! 4. Intercepts **Ctrl-C** to stop the telemetry core and drop the link.

mod config;
mod display;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

use skylink_hal::{HeadlessSurface, SimLink, SimSettings, formatter_for};
use skylink_middleware::EventBus;
use skylink_runtime::{Collaborators, TelemetryCoordinator, TelemetryOptions};

use crate::config::{Config, FilePreferences};
use crate::display::ConsoleDisplay;

const SURFACE_WIDTH: u32 = 1280;
const SURFACE_HEIGHT: u32 = 720;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG filters (default "info"); SKYLINK_LOG_FORMAT=json switches to
    // JSON lines.  User-facing output still goes through println!.
    let _tracing = skylink_runtime::init_tracing("skylink");

    print_banner();

    let cfg = load_or_init_config();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start async runtime".red(), e);
            std::process::exit(1);
        }
    };
    // Lets the simulated link and surface spawn their timers from the REPL
    // thread.
    let _enter = runtime.enter();

    // ── Wiring ────────────────────────────────────────────────────────────
    let bus = EventBus::new(cfg.bus_capacity);
    let link = SimLink::new(
        bus.clone(),
        SimSettings {
            video_supported: cfg.sim_video_supported,
            reply_latency: Duration::from_millis(cfg.sim_probe_latency_ms),
            start_outcome: None,
        },
    );
    let surface = HeadlessSurface::new(
        SURFACE_WIDTH,
        SURFACE_HEIGHT,
        Duration::from_millis(cfg.sim_surface_delay_ms),
    );
    let display = ConsoleDisplay::new();
    let config_path = config::config_path();

    let link_state = Arc::new(link.state());
    let link_service = Arc::new(link.clone());
    let coordinator = TelemetryCoordinator::new(
        bus,
        Collaborators {
            state: link_state,
            capability: link_service.clone(),
            transport: link_service,
            surface: Box::new(surface.clone()),
            display: Box::new(display.clone()),
            formatter: formatter_for(cfg.speed_unit),
            preferences: Arc::new(FilePreferences::new(config_path.clone())),
        },
        TelemetryOptions {
            hide_video_on_start_failure: cfg.hide_video_on_start_failure,
        },
    );
    let (telemetry, telemetry_task) = coordinator.spawn();
    let feed = link.spawn_feed(cfg.sim_feed_hz);
    info!(hz = cfg.sim_feed_hz, unit = ?cfg.speed_unit, "telemetry core started");

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    let telemetry_ctrlc = telemetry.clone();
    let link_ctrlc = link.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – initiating graceful shutdown …".yellow().bold());
        if telemetry_ctrlc.shutdown().is_ok() {
            println!("{}", "  ✓ Telemetry core stopped.".green());
        }
        link_ctrlc.disconnect();
        println!("{}", "  ✓ Link dropped. Press Enter to exit.".green());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    let session = repl::Session {
        runtime: runtime.handle().clone(),
        telemetry,
        link,
        surface,
        display,
        config_path,
    };
    repl::run(&session, shutdown);

    // ── Teardown ──────────────────────────────────────────────────────────
    let _ = session.telemetry.shutdown();
    feed.abort();
    drop(session);
    if runtime
        .block_on(async { tokio::time::timeout(Duration::from_secs(2), telemetry_task).await })
        .is_err()
    {
        warn!("telemetry loop did not stop in time");
    }
}

fn load_or_init_config() -> Config {
    match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            match config::save(&Config::default()) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   _____ __         __    _       __  "#.bold().cyan());
    println!("{}", r#"  / ___// /____  __/ /   (_)___  / /__"#.bold().cyan());
    println!("{}", r#"  \__ \/ //_/ / / / /   / / __ \/ //_/"#.bold().cyan());
    println!("{}", r#" ___/ / ,< / /_/ / /___/ / / / / ,<   "#.bold().cyan());
    println!("{}", r#"/____/_/|_|\__, /_____/_/_/ /_/_/|_|  "#.bold().cyan());
    println!("{}", r#"          /____/                      "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "SkyLink".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  {}", "Vehicle telemetry & video ground station".dimmed());
}
