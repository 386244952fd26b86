//! Console transport – typed lines stand in for speech recognition and
//! printed lines for speech synthesis.
//!
//! Supported slash-commands (never forwarded to the agent):
//!   /help         – show this list
//!   /history [n]  – the last `n` stored entries, straight from the store
//!   /settings     – interactively edit `~/.parley/config.toml`
//!   /quit | /exit – hang up
//!
//! `rustyline` runs on its own thread; the async side hands it one prompt at a
//! time and awaits the answer, so the prompt never interleaves with the
//! agent's replies.

use async_trait::async_trait;
use colored::Colorize;
use parley_memory::recall::MAX_RECALL;
use parley_memory::{RecallProvider, Record};
use parley_runtime::VoiceTransport;
use parley_types::{FormKind, ParleyError};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use tokio::sync::mpsc as async_mpsc;
use tracing::warn;

use crate::config::{self, Config};

const USER_PROMPT: &str = "you> ";

/// Reads utterances from the terminal and prints the agent's replies.
pub struct ConsoleTransport<R> {
    prompts: mpsc::Sender<String>,
    lines: async_mpsc::Receiver<Option<String>>,
    recall: RecallProvider<R>,
    config: Config,
    shutdown: Arc<AtomicBool>,
}

impl<R: Record> ConsoleTransport<R> {
    /// Start the line-editor thread.
    ///
    /// `shutdown` is polled before every prompt; once set the session sees a
    /// hang-up.
    pub fn spawn(
        recall: RecallProvider<R>,
        config: Config,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, ParleyError> {
        let (prompt_tx, prompt_rx) = mpsc::channel::<String>();
        let (line_tx, line_rx) = async_mpsc::channel::<Option<String>>(1);

        std::thread::Builder::new()
            .name("parley-console".into())
            .spawn(move || read_lines(prompt_rx, line_tx))
            .map_err(|e| ParleyError::Transport(format!("failed to start console reader: {e}")))?;

        Ok(Self {
            prompts: prompt_tx,
            lines: line_rx,
            recall,
            config,
            shutdown,
        })
    }

    /// One line from the terminal; `None` on Ctrl-C / Ctrl-D.
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>, ParleyError> {
        self.prompts
            .send(prompt.to_string())
            .map_err(|_| ParleyError::Transport("console reader has stopped".into()))?;
        Ok(self.lines.recv().await.flatten())
    }

    /// Ask for a value; Enter keeps `current`.
    async fn prompt_value(&mut self, label: &str, current: &str) -> Result<String, ParleyError> {
        let answer = self.read_line(&format!("  {label} [{current}]: ")).await?;
        Ok(answer
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| current.to_string()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Command handlers
    // ─────────────────────────────────────────────────────────────────────────

    fn cmd_history(&self, count: Option<usize>) {
        let count = count.unwrap_or_else(|| self.config.recall_window()).min(MAX_RECALL);
        println!();
        println!("{}", format!("Last {count} entries").bold().underline());
        println!("{}", self.recall.digest(count));
        println!();
    }

    async fn cmd_settings(&mut self) -> Result<(), ParleyError> {
        let mut cfg = self.config.clone();
        println!("{}", "Settings Editor".bold().underline());

        let form = self
            .prompt_value("Form (coffee / wellness)", &cfg.form.to_string())
            .await?;
        match form.parse::<FormKind>() {
            Ok(kind) => cfg.form = kind,
            Err(e) => println!("  {} {}, keeping {}", "Warning:".yellow(), e, cfg.form),
        }

        cfg.llm_base_url = self.prompt_value("LLM base URL", &cfg.llm_base_url).await?;
        cfg.model = self.prompt_value("Model", &cfg.model).await?;

        let window = self
            .prompt_value("Recall window", &cfg.recall_window.to_string())
            .await?;
        match window.parse::<usize>() {
            Ok(n) => cfg.recall_window = n.min(MAX_RECALL),
            Err(_) => println!(
                "  {} '{}' is not a number, keeping {}",
                "Warning:".yellow(),
                window,
                cfg.recall_window
            ),
        }

        match config::save(&cfg) {
            Ok(()) => {
                println!(
                    "{} {}",
                    "✓ Settings saved to".green(),
                    config::config_path().display().to_string().bold()
                );
                println!("  {}", "Changes apply from the next session.".dimmed());
                self.config = cfg;
            }
            Err(e) => println!("{}: {}", "Error saving config".red(), e),
        }
        Ok(())
    }
}

#[async_trait]
impl<R: Record> VoiceTransport for ConsoleTransport<R> {
    async fn next_utterance(&mut self) -> Result<Option<String>, ParleyError> {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return Ok(None);
            }
            let Some(line) = self.read_line(USER_PROMPT).await? else {
                return Ok(None);
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if !line.starts_with('/') {
                return Ok(Some(line.to_string()));
            }

            match Command::parse(line) {
                Command::Help => print_help(),
                Command::History(count) => self.cmd_history(count),
                Command::Settings => self.cmd_settings().await?,
                Command::Quit => {
                    println!("{}", "Goodbye.".green());
                    return Ok(None);
                }
                Command::Unknown(other) => println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "/help".bold()
                ),
            }
        }
    }

    async fn speak(&mut self, text: &str) -> Result<(), ParleyError> {
        println!("{} {}", "agent>".bold().green(), text);
        Ok(())
    }
}

/// Line-editor loop: waits for a prompt, reads one line, sends it back.
fn read_lines(prompts: mpsc::Receiver<String>, lines: async_mpsc::Sender<Option<String>>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            warn!(error = %e, "console line editor unavailable");
            let _ = lines.blocking_send(None);
            return;
        }
    };

    while let Ok(prompt) = prompts.recv() {
        let line = match editor.readline(&prompt) {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                Some(line)
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => None,
            Err(e) => {
                warn!(error = %e, "console read failed");
                None
            }
        };
        if lines.blocking_send(line).is_err() {
            break;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum Command {
    Help,
    History(Option<usize>),
    Settings,
    Quit,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        match parts.next().unwrap_or_default() {
            "/help" => Command::Help,
            "/history" => Command::History(parts.next().and_then(|n| n.parse().ok())),
            "/settings" => Command::Settings,
            "/quit" | "/exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

fn print_help() {
    println!();
    println!("{}", "Parley Commands".bold().underline());
    println!("  {}  – show recent entries", "/history [n]".bold().cyan());
    println!("  {}     – edit ~/.parley/config.toml", "/settings".bold().cyan());
    println!("  {}  – hang up", "/quit  /exit".bold().cyan());
    println!("  Anything else is said to the agent.");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(Command::parse("/help"), Command::Help);
        assert_eq!(Command::parse("/settings"), Command::Settings);
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("/exit"), Command::Quit);
    }

    #[test]
    fn history_takes_optional_count() {
        assert_eq!(Command::parse("/history"), Command::History(None));
        assert_eq!(Command::parse("/history 7"), Command::History(Some(7)));
        assert_eq!(Command::parse("/history   2  "), Command::History(Some(2)));
        assert_eq!(Command::parse("/history lots"), Command::History(None));
        assert_eq!(Command::parse("/history -3"), Command::History(None));
    }

    #[test]
    fn unknown_command_is_reported_by_name() {
        assert_eq!(Command::parse("/models gpt"), Command::Unknown("/models".into()));
    }
}
