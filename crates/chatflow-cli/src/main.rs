use std::env;
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chatflow_core::config::Config;
use chatflow_core::ChatMessage;
use chatflow_core::ChatRole;
use chatflow_core::ChatSnapshot;
use chatflow_exec::BroadcastEventChannel;
use chatflow_exec::ChatController;
use chatflow_exec::ControllerSettings;
use chatflow_exec::InMemorySessionCatalog;
use chatflow_exec::SendOutcome;
use chatflow_exec::SimulatedBackend;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CHATFLOW_LOG";
const CONFIG_ENV: &str = "CHATFLOW_CONFIG";
const CHUNK_DELAY: Duration = Duration::from_millis(30);

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> CliResult<()> {
    init_logging();

    let mut args = env::args().skip(1);
    let Some(command) = args.next() else {
        print_help();
        return Ok(());
    };

    match command.as_str() {
        "--help" | "-h" | "help" => {
            print_help();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("chatflow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "chat" => {
            let mut config = load_config()?;
            apply_chat_args(&mut config, args.collect::<Vec<_>>())?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(chat(config))
        }
        "config" => {
            let config = load_config()?;
            if let Some(path) = config_path() {
                println!("# {}", path.display());
            }
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        _ => {
            print_help();
            Err(format!("unknown command: {command}").into())
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn config_path() -> Option<PathBuf> {
    env::var_os(CONFIG_ENV).map(PathBuf::from).or_else(|| {
        dirs::config_dir().map(|dir| dir.join("chatflow").join("config.toml"))
    })
}

fn load_config() -> CliResult<Config> {
    match config_path() {
        Some(path) => Ok(Config::load(&path)?),
        None => Ok(Config::default()),
    }
}

fn apply_chat_args(config: &mut Config, args: Vec<String>) -> CliResult<()> {
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--provider" | "--model" => {
                let Some(value) = args.get(i + 1) else {
                    return Err(format!("{flag} requires a value").into());
                };
                if flag == "--provider" {
                    config.model.default_provider = Some(value.clone());
                } else {
                    config.model.default_model = Some(value.clone());
                }
                i += 2;
            }
            other => {
                return Err(format!("unsupported argument: {other}").into());
            }
        }
    }
    Ok(())
}

async fn chat(config: Config) -> CliResult<()> {
    let channel = Arc::new(BroadcastEventChannel::from_config(&config.stream));
    let catalog = Arc::new(InMemorySessionCatalog::new());
    let backend = Arc::new(
        SimulatedBackend::new(channel.publisher(), Arc::clone(&catalog))
            .with_chunk_delay(CHUNK_DELAY),
    );
    tracing::info!(channel = channel.name(), "starting chat");

    let controller = ChatController::new(
        backend,
        channel,
        catalog,
        ControllerSettings::from_config(&config),
    );
    controller.start();
    let mut frames = controller.watch();

    println!("chatflow {} (type /help for commands)", env!("CARGO_PKG_VERSION"));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        match command {
            "" => {}
            "/quit" | "/exit" => break,
            "/help" => print_repl_help(),
            "/new" => {
                controller.new_session();
                println!("started a new session");
            }
            "/sessions" => list_sessions(&controller).await?,
            "/resume" if !rest.is_empty() => {
                match controller.continue_from_catalog(rest).await {
                    Ok(()) => {
                        for message in &controller.snapshot().messages {
                            print_message(message);
                        }
                    }
                    Err(err) => println!("cannot resume: {err}"),
                }
            }
            "/delete" if !rest.is_empty() => match controller.delete_session(rest).await {
                Ok(()) => println!("deleted {rest}"),
                Err(err) => println!("cannot delete: {err}"),
            },
            "/resume" | "/delete" => println!("usage: {command} <session-id>"),
            _ => send_turn(&controller, &mut frames, line).await?,
        }
    }

    controller.shutdown();
    Ok(())
}

async fn send_turn(
    controller: &ChatController,
    frames: &mut watch::Receiver<ChatSnapshot>,
    line: &str,
) -> CliResult<()> {
    let committed = controller.snapshot().messages.len();
    match controller.send_message(line).await {
        SendOutcome::Ignored => return Ok(()),
        SendOutcome::Accepted(session_id) => {
            tracing::debug!(%session_id, "turn accepted");
        }
        SendOutcome::Failed(_) => {}
    }

    let mut shown = Vec::new();
    loop {
        let snapshot = frames.borrow_and_update().clone();
        for activity in &snapshot.activities {
            if !shown.contains(&activity.id) {
                println!("  · {}", activity.label);
                shown.push(activity.id.clone());
            }
        }
        if !snapshot.is_streaming {
            break;
        }
        if frames.changed().await.is_err() {
            break;
        }
    }

    let snapshot = controller.snapshot();
    for message in snapshot.messages.iter().skip(committed) {
        if message.role != ChatRole::User {
            print_message(message);
        }
    }
    Ok(())
}

async fn list_sessions(controller: &ChatController) -> CliResult<()> {
    let sessions = controller.reload_sessions().await?;
    if sessions.is_empty() {
        println!("no sessions yet");
    }
    let active = controller.snapshot().session_id;
    for session in sessions {
        let marker = if active.as_ref().map(|id| id.as_str()) == Some(session.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {}  {}  ({} messages, {}/{}, updated {})",
            session.id,
            session.title,
            session.message_count,
            session.provider,
            session.model,
            session.updated_at
        );
    }
    Ok(())
}

fn print_message(message: &ChatMessage) {
    let tool = message.tool_name.as_deref().unwrap_or("tool");
    match message.role {
        ChatRole::User => println!("you> {}", message.content),
        ChatRole::Assistant => println!("assistant> {}", message.content),
        ChatRole::ToolCall => println!(
            "  [{tool}] {}",
            message.tool_args.as_deref().unwrap_or_default()
        ),
        ChatRole::ToolResult => {
            let status = match message.tool_success {
                Some(false) => "error",
                _ => "ok",
            };
            println!("  [{tool} {status}] {}", message.content);
        }
    }
}

fn print_repl_help() {
    println!("Commands:");
    println!("  /new             start a new session");
    println!("  /sessions        list stored sessions");
    println!("  /resume <id>     continue a stored session");
    println!("  /delete <id>     delete a stored session");
    println!("  /quit            leave");
    println!("Messages starting with /tool <name> [input] or /fail [reason]");
    println!("drive the simulated backend.");
}

fn print_help() {
    println!("chatflow {}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  chatflow chat [--provider NAME] [--model NAME]");
    println!("  chatflow config");
    println!("  chatflow --help");
    println!("  chatflow --version");
    println!();
    println!("Environment:");
    println!("  {CONFIG_ENV}  config file (default: <config dir>/chatflow/config.toml)");
    println!("  {LOG_ENV}     log filter (default: warn)");
}
