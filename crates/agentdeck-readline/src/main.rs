mod helper;
mod local;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use agentdeck_application::{
    ActionHandler, CommandContext, PlaygroundController, SessionState, SubmitOutcome,
};
use agentdeck_core::config::DeckConfig;
use agentdeck_core::ids::{AgentId, ThreadId};
use agentdeck_core::message::{Message, MessageRole};
use agentdeck_core::streaming::{ConnectionState, StreamingChannel};
use agentdeck_core::thread::AgentRef;
use agentdeck_core::{DeckError, PlaygroundApi};
use agentdeck_infrastructure::{ConfigService, DeckPaths, HttpPlaygroundApi, WebSocketChannel};

use crate::helper::ReplHelper;
use crate::local::LocalCommand;

/// Playground REPL for multi-tenant agent platforms.
#[derive(Parser, Debug)]
#[command(name = "agentdeck", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/agentdeck/config.toml)
    #[arg(short, long, env = "AGENTDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Agent to chat with
    #[arg(short, long, env = "AGENTDECK_AGENT")]
    agent: String,

    /// Display name of the agent, used in default thread titles
    #[arg(long)]
    agent_name: Option<String>,

    /// Tool names offered after /tool (repeatable)
    #[arg(long = "tool")]
    tools: Vec<String>,

    /// Agent names offered after /invoke and /switch (repeatable)
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Use HTTP even when streaming is configured
    #[arg(long)]
    no_stream: bool,
}

/// Prints backend-requested side effects the REPL cannot perform itself.
struct ReplActions;

impl ActionHandler for ReplActions {
    fn project_entered(&self, project_name: Option<&str>, _data: Option<&Value>) {
        let name = project_name.unwrap_or("(unnamed)");
        println!("{}", format!("Entered project session: {}", name).bright_yellow());
    }

    fn project_exited(&self) {
        println!("{}", "Left project session".bright_yellow());
    }

    fn open_memory_manager(&self) {
        println!(
            "{}",
            "The agent asked to open the memory manager (not available here)".bright_black()
        );
    }

    fn switch_agent(&self, agent_id: Option<&AgentId>) {
        if let Some(agent_id) = agent_id {
            println!(
                "{}",
                format!("The agent suggests switching: :agent {}", agent_id).bright_yellow()
            );
        }
    }

    fn unrecognized(&self, name: &str, _data: Option<&Value>) {
        println!("{}", format!("Unhandled action: {}", name).bright_black());
    }
}

fn init_logging() -> Result<WorkerGuard> {
    let logs_dir = DeckPaths::logs_dir()?;
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&logs_dir, "agentdeck.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_env("AGENTDECK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

async fn connect_streaming(config: &DeckConfig) -> Option<Arc<dyn StreamingChannel>> {
    let url = config.streaming.endpoint()?;
    match WebSocketChannel::connect(url).await {
        Ok(channel) => {
            let channel: Arc<dyn StreamingChannel> = Arc::new(channel);
            Some(channel)
        }
        Err(e) => {
            tracing::warn!("[Repl] Streaming unavailable, using HTTP: {}", e);
            println!(
                "{}",
                format!("Streaming unavailable ({}); using HTTP", e.user_message()).yellow()
            );
            None
        }
    }
}

fn print_message(index: usize, message: &Message) {
    let mark = if message.is_bookmarked { "*" } else { " " };
    let label = match message.role {
        MessageRole::User => "you".green(),
        MessageRole::Assistant => "agent".bright_blue(),
    };
    println!("{}{:>3} [{}]", mark.yellow(), index, label);
    for line in message.content.lines() {
        match message.role {
            MessageRole::User => println!("      {}", line),
            MessageRole::Assistant => println!("      {}", line.bright_blue()),
        }
    }
}

fn print_threads(state: &SessionState) {
    if state.threads.is_empty() {
        println!("{}", "No threads".bright_black());
        return;
    }
    for thread in &state.threads {
        let active = thread.id.as_ref().is_some_and(|id| state.is_active_thread(id));
        let id = thread.id.as_ref().map(ThreadId::as_str).unwrap_or("-");
        let line = format!(
            "{} {:<8} {} ({} messages){}",
            if active { ">" } else { " " },
            id,
            thread.title,
            thread.message_count,
            if thread.is_archived { " [archived]" } else { "" }
        );
        if active {
            println!("{}", line.bright_green());
        } else {
            println!("{}", line);
        }
    }
}

/// Echoes streamed fragments as they arrive.
fn spawn_stream_printer(
    mut state: watch::Receiver<SessionState>,
    streamed: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut printed = 0;
        while state.changed().await.is_ok() {
            let chunk = {
                let state = state.borrow_and_update();
                match &state.streaming_message {
                    Some(streaming) if streaming.content.len() > printed => {
                        let chunk = streaming.content[printed..].to_string();
                        printed = streaming.content.len();
                        Some(chunk)
                    }
                    _ => None,
                }
            };
            if let Some(chunk) = chunk {
                streamed.store(true, Ordering::SeqCst);
                print!("{}", chunk.bright_blue());
                let _ = std::io::stdout().flush();
            }
        }
    })
}

fn print_error(err: &DeckError) {
    if !err.is_cancelled() {
        eprintln!("{}", format!("Error: {}", err.user_message()).red());
    }
}

fn message_at(controller: &PlaygroundController, index: usize) -> Option<Message> {
    controller
        .store()
        .read(|state| state.messages.get(index - 1).cloned())
}

/// Runs a `:command`. Returns `false` when the REPL should exit.
async fn run_local(controller: &PlaygroundController, command: LocalCommand) -> bool {
    let active = controller
        .store()
        .read(|state| state.active_thread_id().cloned());

    let result: Result<(), DeckError> = match command {
        LocalCommand::Quit => return false,
        LocalCommand::Help => {
            println!("{}", local::HELP.bright_black());
            Ok(())
        }
        LocalCommand::Threads => {
            controller.store().read(print_threads);
            Ok(())
        }
        LocalCommand::Messages => {
            controller.store().read(|state| {
                for (i, message) in state.messages.iter().enumerate() {
                    print_message(i + 1, message);
                }
            });
            Ok(())
        }
        LocalCommand::Open(id) => controller
            .select_thread(ThreadId::from(id))
            .await
            .map(|outcome| println!("{}", format!("{:?}", outcome).bright_black())),
        LocalCommand::New(title) => controller.new_thread(title).await.map(|thread| {
            println!("{}", format!("Started '{}'", thread.title).bright_green())
        }),
        LocalCommand::Rename(title) => match active {
            Some(id) => controller.rename_thread(&id, &title).await.map(|_| ()),
            None => Err(DeckError::invalid_state("No active thread")),
        },
        LocalCommand::Archive(archived) => match active {
            Some(id) => controller.archive_thread(&id, archived).await.map(|_| ()),
            None => Err(DeckError::invalid_state("No active thread")),
        },
        LocalCommand::Delete => match active {
            Some(id) => controller.delete_thread(&id).await,
            None => Err(DeckError::invalid_state("No active thread")),
        },
        LocalCommand::Bookmark(index, bookmarked) => match message_at(controller, index) {
            Some(message) => controller.set_bookmark(&message.id, bookmarked).await,
            None => Err(DeckError::not_found("message", index.to_string())),
        },
        LocalCommand::Forget(index) => match message_at(controller, index) {
            Some(message) => controller.delete_message(&message.id).await,
            None => Err(DeckError::not_found("message", index.to_string())),
        },
        LocalCommand::Agent { id, name } => {
            let name = name.unwrap_or_else(|| id.clone());
            controller
                .select_agent(AgentRef::new(id, name))
                .await
                .map(|thread| {
                    println!("{}", format!("Now in '{}'", thread.title).bright_green())
                })
        }
        LocalCommand::Refresh => {
            controller.request_thread_refresh();
            Ok(())
        }
        LocalCommand::Dismiss => {
            controller.dismiss_error();
            Ok(())
        }
    };

    if let Err(e) = result {
        print_error(&e);
    }
    true
}

async fn submit(controller: &PlaygroundController, line: &str) {
    controller.set_input(line).await;

    let streamed = Arc::new(AtomicBool::new(false));
    let printer = spawn_stream_printer(controller.subscribe(), streamed.clone());
    let outcome = controller.submit().await;
    printer.abort();
    if streamed.load(Ordering::SeqCst) {
        println!();
    }

    match outcome {
        Ok(SubmitOutcome::Empty) => {}
        Ok(SubmitOutcome::Sent(sent)) => {
            if !streamed.load(Ordering::SeqCst)
                && let Some(reply) = sent.reply()
            {
                for line in reply.content.lines() {
                    println!("{}", line.bright_blue());
                }
            }
        }
        Ok(SubmitOutcome::Command { reply, .. }) => {
            if let Some(reply) = reply {
                for line in reply.lines() {
                    println!("{}", line.bright_cyan());
                }
            }
        }
        Err(e) => print_error(&e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging()?;

    // ===== Backend Initialization =====
    let config_service = match &cli.config {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    };
    let config = config_service.get_config()?;

    let api: Arc<dyn PlaygroundApi> = Arc::new(HttpPlaygroundApi::new(&config.api)?);
    let streaming = if cli.no_stream {
        None
    } else {
        connect_streaming(&config).await
    };
    let connected = streaming.as_ref().is_some_and(|channel| channel.is_connected());

    let controller = PlaygroundController::new(api, streaming, &config.playground)
        .with_action_handler(Arc::new(ReplActions));
    if connected {
        controller.store().set_connection(ConnectionState::Connected);
    }

    if let Err(e) = controller.load_commands().await {
        println!(
            "{}",
            format!("Slash commands unavailable: {}", e.user_message()).yellow()
        );
    }
    let context = CommandContext {
        tools: cli.tools.clone(),
        agents: cli.peers.clone(),
        inject_targets: Vec::new(),
    };
    controller.set_command_context(context.clone()).await;

    let agent_name = cli.agent_name.clone().unwrap_or_else(|| cli.agent.clone());
    let thread = controller
        .select_agent(AgentRef::new(cli.agent.as_str(), agent_name.as_str()))
        .await?;

    // ===== REPL Setup =====
    let helper = ReplHelper::new(
        config.playground.suggestion_limit,
        controller.commands().await,
        context,
    );
    let mut rl: Editor<ReplHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(helper));

    println!("{}", "=== agentdeck ===".bright_magenta().bold());
    println!(
        "{}",
        format!(
            "{} / '{}' via {}. Type /help for agent commands, :help for local ones.",
            agent_name,
            thread.title,
            if controller.is_streaming_available() { "streaming" } else { "HTTP" }
        )
        .bright_black()
    );
    println!();

    // ===== Main REPL Loop =====
    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match local::parse(trimmed) {
                    Some(Ok(command)) => {
                        if !run_local(&controller, command).await {
                            println!("{}", "Goodbye!".bright_green());
                            break;
                        }
                    }
                    Some(Err(usage)) => println!("{}", usage.yellow()),
                    None => submit(&controller, line.trim_end()).await,
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type :quit to exit.".yellow());
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

    Ok(())
}
