mod chart;
mod command;
mod helper;
mod terminal_view;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use sentibot_application::{ChatSession, ChatUseCase, SessionView};
use sentibot_core::sentiment::SentimentAnalyzer;
use sentibot_infrastructure::{ConfigService, JsonSessionStore, SentibotPaths};
use sentibot_interaction::{OllamaApiClient, ResponseGenerator, RobertaSentimentModel};

use crate::command::{Command, HELP_TEXT, SessionRef};
use crate::helper::CliHelper;
use crate::terminal_view::TerminalView;

/// Installs a daily-rolling file log under `logs_dir`.
///
/// `RUST_LOG` wins over `level`. Returns `None` (no logging) when the log
/// file cannot be created.
fn setup_logging(logs_dir: &Path, level: &str) -> Option<WorkerGuard> {
    let file_appender = match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("sentibot.log")
        .build(logs_dir)
    {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!(
                "{}",
                format!("Logging disabled: cannot write to {}: {}", logs_dir.display(), e).yellow()
            );
            return None;
        }
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},hyper=warn,hyper_util=warn,reqwest=warn,h2=warn", level))
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .init();

    tracing::info!("Logging initialised with level: {}", level);
    Some(guard)
}

/// Runs one chat turn. Ctrl-C while the reply streams cuts it short.
async fn run_turn(
    chat: &ChatUseCase,
    session: &mut ChatSession,
    text: &str,
    view: &mut TerminalView,
) {
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let watcher = tokio::spawn({
        let cancel_flag = Arc::clone(&cancel_flag);
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel_flag.store(true, Ordering::SeqCst);
            }
        }
    });

    chat.handle_user_turn(session, text, view, cancel_flag).await;
    watcher.abort();
}

async fn show_history(chat: &ChatUseCase, view: &mut TerminalView) {
    match chat.history().await {
        Ok(names) if names.is_empty() => view.show_notice("No saved chats yet."),
        Ok(names) => {
            println!("{}", "HISTORY".bright_black());
            for (i, name) in names.iter().enumerate() {
                println!("{:>3}. {}", i + 1, name);
            }
        }
        Err(e) => view.show_error(&format!("{:#}", e)),
    }
}

async fn load(
    chat: &ChatUseCase,
    session: &mut ChatSession,
    target: SessionRef,
    view: &mut TerminalView,
) {
    let name = match target {
        SessionRef::Name(name) => name,
        SessionRef::Index(n) => {
            let names = match chat.history().await {
                Ok(names) => names,
                Err(e) => {
                    view.show_error(&format!("{:#}", e));
                    return;
                }
            };
            match n.checked_sub(1).and_then(|i| names.get(i)) {
                Some(name) => name.clone(),
                None => {
                    view.show_error(&format!("No saved chat #{}. Use /history to list them.", n));
                    return;
                }
            }
        }
    };

    match chat.load_session(session, &name, view).await {
        Ok(()) => view.show_notice(&format!("Loaded {}.", name)),
        Err(e) => view.show_error(&format!("{:#}", e)),
    }
}

/// The main entry point for the SentiBOT terminal chat.
///
/// Builds the classifier, the Ollama-backed generator and the session store
/// once, then runs a rustyline REPL until `quit`, `exit` or Ctrl-D.
#[tokio::main]
async fn main() -> Result<()> {
    // ===== Configuration & Logging =====
    let config_service =
        ConfigService::default_location().context("Cannot locate the SentiBOT config directory")?;
    let (config, config_error) = config_service.load_or_default();
    let logs_dir = SentibotPaths::logs_dir().context("Cannot locate the log directory")?;
    let _log_guard = setup_logging(&logs_dir, &config.logging.level);

    let mut view = TerminalView::new();
    println!("{}", "=== SentiBOT ===".bright_magenta().bold());
    if let Some(e) = config_error {
        view.show_error(&format!("{} (using defaults)", e));
    }

    // ===== Backend Initialization =====
    view.show_notice(&format!("Loading sentiment model {}...", config.classifier.model_id));
    let classifier_config = config.classifier.clone();
    let analyzer = tokio::task::spawn_blocking(move || {
        SentimentAnalyzer::from_load(RobertaSentimentModel::load(&classifier_config))
    })
    .await
    .context("Sentiment model loader crashed")?;
    if !analyzer.is_available() {
        view.show_error(
            "Sentiment model unavailable: every message will score as Neutral. See the log for details.",
        );
    }

    let client = OllamaApiClient::from_config(&config.generation)
        .context("Failed to set up the Ollama client")?;
    if let Err(e) = client.health_check().await {
        tracing::warn!("Ollama health check failed: {}", e);
        view.show_error(&format!("{}. Replies will show an error until this is fixed.", e));
    }
    let generator = ResponseGenerator::new(Arc::new(client));

    let store = match &config.storage.sessions_dir {
        Some(dir) => JsonSessionStore::new(dir.clone()),
        None => JsonSessionStore::default_location().context("Cannot locate the sessions directory")?,
    };
    view.show_notice(&format!("Chats are saved in {}", store.sessions_dir().display()));

    let chat = ChatUseCase::new(Arc::new(analyzer), generator, Arc::new(store));
    let mut session = ChatSession::new();

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!(
        "{}",
        "Type a message to chat, '/help' for commands, or 'quit' to exit.".bright_black()
    );
    view.render(&session);

    // ===== Main REPL Loop =====
    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let Some(command) = Command::parse(&line) else {
                    continue;
                };
                let _ = rl.add_history_entry(line.trim());

                match command {
                    Command::Quit => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Command::Chat(text) => run_turn(&chat, &mut session, &text, &mut view).await,
                    Command::NewChat => match chat.new_chat(&mut session, &mut view).await {
                        Ok(Some(name)) => {
                            view.show_notice(&format!("Saved {}. Started a new chat.", name))
                        }
                        Ok(None) => view.show_notice("Started a new chat."),
                        Err(e) => view.show_error(&format!("{:#}", e)),
                    },
                    Command::History => show_history(&chat, &mut view).await,
                    Command::Load(target) => load(&chat, &mut session, target, &mut view).await,
                    Command::EndAndAnalyze => {
                        match chat.end_and_analyze(&session, &mut view).await {
                            Ok(outcome) => match outcome.saved_as {
                                Some(name) => view.show_notice(&format!("Session saved as {}.", name)),
                                None => view.show_notice("Nothing to save yet."),
                            },
                            Err(e) => view.show_error(&format!("{:#}", e)),
                        }
                    }
                    Command::Help => println!("{}", HELP_TEXT.bright_black()),
                    Command::Invalid(message) => view.show_error(&message),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    tracing::info!("SentiBOT exiting");
    Ok(())
}
