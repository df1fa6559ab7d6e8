use alma_core::{AlmaConfig, Profile, TurnError};
use alma_memory::InMemoryStore;
use alma_reasoning::{create_oracle, TurnOrchestrator};
use clap::Parser;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, IsTerminal};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_IDENTITY: &str =
    "Tienes 28 años, eres curiosa, algo irónica y muy leal con la gente que quieres.";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file (missing file means defaults)
    #[arg(short, long, default_value = "alma.toml", env = "ALMA_CONFIG")]
    config: String,

    /// User id the companion profile belongs to
    #[arg(short, long, default_value = "local", env = "ALMA_USER")]
    user: String,

    /// Chat session id (a fresh one per run by default)
    #[arg(short, long)]
    session: Option<String>,

    /// Companion name
    #[arg(long, default_value = "Alma")]
    persona_name: String,

    /// Companion identity text
    #[arg(long, default_value = DEFAULT_IDENTITY)]
    identity: String,

    /// Print the reaction trace after every reply
    #[arg(long)]
    debug: bool,

    /// Log as JSON lines (stderr)
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = AlmaConfig::load_or_default(&args.config);
    info!(
        "Provider: {} ({})",
        config.llm.provider, config.llm.model
    );
    let oracle = create_oracle(&config.llm)?;

    let store = Arc::new(InMemoryStore::new());
    store
        .insert_profile(Profile::new(&args.user, &args.persona_name, &args.identity))
        .await;

    let engine = TurnOrchestrator::new(config)
        .with_oracle(oracle)
        .with_store(store);
    let session = args
        .session
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    info!("Session {}", session);

    if io::stdin().is_terminal() {
        println!(
            "{} está aquí. Escribe 'salir' para terminar.",
            args.persona_name
        );
        let mut rl = rustyline::DefaultEditor::new()?;
        loop {
            match rl.readline("> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line);
                    if is_exit(line) {
                        break;
                    }
                    turn(&engine, &args, &session, line).await?;
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }
    } else {
        // Piped input: one utterance per line, no prompt.
        for line in io::stdin().lock().lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if is_exit(line) {
                break;
            }
            turn(&engine, &args, &session, line).await?;
        }
    }

    Ok(())
}

fn is_exit(line: &str) -> bool {
    matches!(line, "quit" | "exit" | "salir")
}

async fn turn(
    engine: &TurnOrchestrator,
    args: &Args,
    session: &str,
    line: &str,
) -> anyhow::Result<()> {
    match engine.chat(&args.user, session, line).await {
        Ok((reply, trace)) => {
            println!("{}: {}", args.persona_name, reply.content);
            if args.debug {
                println!("{}", serde_json::to_string_pretty(&trace)?);
            }
        }
        Err(e) => {
            let hint = if e.is_transient() {
                " (temporal, vuelve a intentarlo)"
            } else {
                ""
            };
            println!("[error] {}{}", e, hint);
            if matches!(e, TurnError::NotConfigured(_) | TurnError::ProfileNotFound(_)) {
                return Err(e.into());
            }
        }
    }
    Ok(())
}
