use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use botflow_core::config::AppConfig;
use botflow_core::event::EventBus;
use botflow_core::types::RunStatus;

use botflow_engine::session::catalog_from_config;
use botflow_engine::{ExecutionEngine, FlowSnapshot, InputOutcome, Session};

#[derive(Parser)]
#[command(name = "botflow", version, about = "Chatbot flow execution engine")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "botflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a flow file without executing it
    Validate {
        /// Path to the flow JSON file
        flow: PathBuf,
    },
    /// Execute a flow statelessly and print the execution report
    Test {
        /// Path to the flow JSON file
        flow: PathBuf,
        /// Flow id to stamp into the report
        #[arg(long)]
        id: Option<String>,
        /// Flow name to stamp into the report
        #[arg(long)]
        name: Option<String>,
    },
    /// Chat with a flow interactively on stdin/stdout
    Simulate {
        /// Path to the flow JSON file
        flow: PathBuf,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("botflow=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Validate { flow } => {
            let snapshot = load_snapshot(&flow)?;
            let node_count = snapshot.nodes.len();
            let edge_count = snapshot.edges.len();
            match snapshot.into_graph() {
                Ok(graph) => {
                    println!("{}: ok", flow.display());
                    println!("  nodes: {}", node_count);
                    println!("  edges: {}", edge_count);
                    println!("  end nodes: {}", graph.end_node_ids().len());
                }
                Err(e) => {
                    eprintln!("{}: invalid: {}", flow.display(), e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Test { flow, id, name } => {
            let snapshot = load_snapshot(&flow)?;
            let flow_id = id.unwrap_or_else(|| file_stem(&flow));
            let flow_name = name.unwrap_or_else(|| flow_id.clone());
            let catalog = catalog_from_config(&config);

            let report =
                ExecutionEngine::test_execute(snapshot, &flow_id, &flow_name, catalog, &config)
                    .await;
            println!("{}", serde_json::to_string_pretty(&report)?);

            if !matches!(
                report.status,
                botflow_core::types::FlowStatus::Success | botflow_core::types::FlowStatus::Empty
            ) {
                std::process::exit(1);
            }
        }
        Commands::Simulate { flow } => {
            let snapshot = load_snapshot(&flow)?;
            let graph = snapshot.into_graph().map_err(|e| anyhow::anyhow!("{e}"))?;
            info!(nodes = graph.node_count(), "Flow loaded");

            let engine = Arc::new(ExecutionEngine::new(
                Arc::new(graph),
                catalog_from_config(&config),
                &config,
            ));
            let session = Session::new(
                engine,
                config.simulator.greeting.clone(),
                Arc::new(EventBus::default()),
            );
            run_simulator(&session).await?;
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn run_simulator(session: &Session) -> anyhow::Result<()> {
    println!("botflow v{}", env!("CARGO_PKG_VERSION"));
    println!("Session: {}", session.id());
    println!("Type /help for commands, /quit to exit.\n");

    session.start().await?;
    let mut printed = print_new_messages(session, 0).await;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        match session.status().await {
            RunStatus::Completed => {
                println!("(flujo completado; /reset para empezar de nuevo)");
            }
            RunStatus::Failed => {
                println!("(flujo fallido; /reset para empezar de nuevo)");
            }
            _ => {}
        }

        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break; // EOF
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" | "/q" => break,
            "/reset" => {
                session.reset().await;
                printed = 0;
                session.start().await?;
                printed = print_new_messages(session, printed).await;
                continue;
            }
            "/status" => {
                println!("Status: {}", session.status().await);
                continue;
            }
            "/choices" => {
                let choices = session.pending_choices().await;
                if choices.is_empty() {
                    println!("(sin opciones pendientes)");
                } else {
                    for (i, choice) in choices.iter().enumerate() {
                        println!("  {}. {}", i + 1, choice.value);
                    }
                }
                continue;
            }
            "/help" => {
                println!("Commands:");
                println!("  /quit      Exit");
                println!("  /reset     Restart the conversation");
                println!("  /status    Show run status");
                println!("  /choices   Show pending choices");
                continue;
            }
            _ if input.starts_with('/') => {
                println!("Unknown command: {input}. Type /help for available commands.");
                continue;
            }
            _ => {}
        }

        match session.feed_input(input).await? {
            InputOutcome::Accepted => {
                // The user line is part of the transcript now; skip echoing it.
                printed += 1;
                printed = print_new_messages(session, printed).await;
            }
            InputOutcome::Rejected { status } => {
                println!("(el flujo no está esperando entrada; status: {status})");
            }
        }
    }

    Ok(())
}

/// Print transcript entries appended since `from`, returning the new cursor.
async fn print_new_messages(session: &Session, from: usize) -> usize {
    let transcript = session.transcript().await;
    for message in &transcript[from..] {
        match message.origin {
            botflow_core::types::MessageOrigin::Bot => println!("{}", message.content),
            botflow_core::types::MessageOrigin::System => println!("[!] {}", message.content),
            botflow_core::types::MessageOrigin::User => {}
        }
    }
    transcript.len()
}

fn load_snapshot(path: &PathBuf) -> anyhow::Result<FlowSnapshot> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
    Ok(FlowSnapshot::parse(&content)?)
}

fn file_stem(path: &PathBuf) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "flow".to_string())
}
