//! `parley-cli` – Parley console voice agent
//!
//! This binary runs one conversation per launch against the configured form.
//! It:
//!
//! 1. Loads `~/.parley/config.toml` (or defaults plus `PARLEY_*` overrides on
//!    first run).
//! 2. Opens the record store for the configured form and reports how many
//!    entries are on file.
//! 3. Runs a [`Session`] with the OpenAI-compatible [`LlmDriver`] as the
//!    reasoning engine and the terminal as the voice transport
//!    (`/help`, `/history`, `/settings`, `/quit`).
//! 4. Intercepts **Ctrl-C** so the current turn finishes before hanging up.

mod config;
mod console;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, warn};

use parley_memory::{CoffeeOrder, RecallProvider, Record, RecordStore, WellnessEntry};
use parley_runtime::{Form, LlmDriver, Session, SessionConfig};
use parley_types::{FormKind, ParleyError};

use crate::config::Config;
use crate::console::ConsoleTransport;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG filters (default "info"); PARLEY_LOG_FORMAT=json switches to
    // JSON lines; OTEL_EXPORTER_OTLP_ENDPOINT adds span export.  Installed
    // before the runtime exists and dropped after it, so the exporter is
    // never built or shut down on a runtime thread.
    let telemetry = parley_runtime::telemetry::init_tracing("parley");

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!(
            "{}",
            "⚠  Ctrl-C received – hanging up after the current turn …".yellow().bold()
        );
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; use /quit to hang up");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            println!(
                "  No config at {} – using defaults. Run {} to create one.",
                config::config_path().display().to_string().bold(),
                "/settings".bold().cyan()
            );
            config::from_env()
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::from_env()
        }
    };

    if cfg.api_key.is_empty() {
        println!(
            "  {} export {} or set {} in the config file.",
            "No API key configured:".yellow(),
            "GROQ_API_KEY".bold(),
            "api_key".bold()
        );
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start async runtime");
            println!("{}: {}", "Startup error".red(), e);
            drop(telemetry);
            std::process::exit(1);
        }
    };

    let outcome = runtime.block_on(async {
        match cfg.form {
            FormKind::Coffee => converse::<CoffeeOrder>(&cfg, shutdown).await,
            FormKind::Wellness => converse::<WellnessEntry>(&cfg, shutdown).await,
        }
    });
    drop(runtime);

    if let Err(e) = outcome {
        error!(error = %e, "session aborted");
        println!("{}: {}", "Session error".red(), e);
        drop(telemetry);
        std::process::exit(1);
    }
}

/// Open the store, wire engine and console, run one session, print the result.
async fn converse<F: Form>(cfg: &Config, shutdown: Arc<AtomicBool>) -> Result<(), ParleyError> {
    let store_path = cfg.resolved_store_path(&config::config_dir());
    let store = Arc::new(RecordStore::<F>::open(&store_path));

    println!(
        "  Form: {}   Records: {} ({} on file)",
        F::KIND.to_string().bold(),
        store_path.display().to_string().dimmed(),
        store.len()
    );
    println!(
        "  Model: {} via {}",
        cfg.model.bold(),
        cfg.llm_base_url.dimmed()
    );
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    let mut driver = LlmDriver::new(&cfg.llm_base_url, &cfg.model);
    if !cfg.api_key.is_empty() {
        driver = driver.with_api_key(cfg.api_key.clone());
    }

    let transport = ConsoleTransport::spawn(
        RecallProvider::new(Arc::clone(&store)),
        cfg.clone(),
        shutdown,
    )?;

    let session_config = SessionConfig {
        recall_window: cfg.recall_window(),
        max_tool_rounds: cfg.max_tool_rounds,
        ..SessionConfig::default()
    };
    let summary = Session::new(session_config, store, Arc::new(driver), transport)
        .run()
        .await?;

    println!();
    match &summary.saved {
        Some(record) => println!(
            "  {} Saved {} ({} turns)",
            "✓".green().bold(),
            record.label().bold(),
            summary.turns
        ),
        None => println!(
            "  {} Nothing saved this time ({} turns)",
            "•".dimmed(),
            summary.turns
        ),
    }
    println!("  Session {}", summary.session_id.to_string().dimmed());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"    ___  ___ _____/ /__ __ __"#.bold().cyan());
    println!("{}", r#"   / _ \/ _ `/ __/ / -_) // /"#.bold().cyan());
    println!("{}", r#"  / .__/\_,_/_/ /_/\__/\_, / "#.bold().cyan());
    println!("{}", r#" /_/                  /___/  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Parley".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Conversational form-filling voice agent (console mode)");
    println!();
}
