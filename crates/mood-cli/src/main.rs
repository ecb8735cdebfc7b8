mod server;
mod session;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mood_engine::{MoodEngine, MoodSnapshot, MoodTransition};
use rmcp::{ServiceExt, transport::stdio};
use tokio::io::AsyncBufReadExt;
use tokio::sync::broadcast;

/// How long `serve` waits for pending refinements on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "mood", about = "Progressive conversational mood engine")]
struct Cli {
    /// Classifier endpoint (Ollama-style); overrides MOOD_CLASSIFIER_URL and config.toml
    #[arg(long, global = true)]
    classifier_url: Option<String>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio transport
    Serve,

    /// Analyze one or more messages as a single conversation
    Analyze {
        /// Message text(s), in conversation order
        #[arg(required = true)]
        texts: Vec<String>,

        /// Print one JSON object per message
        #[arg(long)]
        json: bool,
    },

    /// Read messages from stdin, one per line, and report the mood as it evolves
    Chat,

    /// Show recently recorded readings
    History {
        /// Number of readings to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show stored statistics
    Stats,

    /// Forget every learned word pattern
    Forget,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Serve => cmd_serve(&cli).await,
        Commands::Analyze { texts, json } => cmd_analyze(&cli, texts, *json).await,
        Commands::Chat => cmd_chat(&cli).await,
        Commands::History { limit } => cmd_history(*limit),
        Commands::Stats => cmd_stats(&cli),
        Commands::Forget => cmd_forget(),
    }
}

fn describe(snapshot: &MoodSnapshot) -> String {
    format!(
        "{:<10} {:.2}  {}",
        snapshot.mood, snapshot.confidence, snapshot.intensity
    )
}

fn print_transitions(rx: &mut broadcast::Receiver<MoodTransition>) {
    loop {
        match rx.try_recv() {
            Ok(t) => println!(
                "  ~ {} -> {} ({:.2} -> {:.2})",
                t.from, t.to, t.previous_confidence, t.confidence
            ),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                tracing::debug!("skipped {n} transitions");
            }
            Err(_) => break,
        }
    }
}

async fn cmd_serve(cli: &Cli) -> Result<()> {
    let session = session::open(cli.classifier_url.as_deref())?;
    tracing::info!(
        classifier = session.engine.gateway_enabled(),
        "starting MCP server"
    );

    let server = server::MoodServer::new(session.engine, session.store);
    let service = match server.clone().serve(stdio()).await {
        Ok(service) => service,
        Err(e) => {
            // Client went away before completing the handshake.
            tracing::info!("MCP session ended before initialization: {e}");
            server.shutdown(SHUTDOWN_GRACE).await;
            return Ok(());
        }
    };

    tokio::select! {
        res = service.waiting() => {
            res.context("MCP server failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
        }
    }

    server.shutdown(SHUTDOWN_GRACE).await;
    Ok(())
}

async fn analyze_one(engine: &MoodEngine, text: &str, json: bool) -> Result<()> {
    engine.analyze(text).await;
    let fast = engine.snapshot();
    engine.settle().await;
    let state = engine.snapshot();

    if json {
        let line = serde_json::json!({
            "text": text,
            "sequence": state.sequence,
            "mood": state.mood,
            "confidence": state.confidence,
            "intensity": state.intensity.to_string(),
            "refined": state.refined,
            "fast": {
                "mood": fast.mood,
                "confidence": fast.confidence,
            },
        });
        println!("{}", serde_json::to_string(&line)?);
    } else {
        let marker = if state.refined { "" } else { "  (fast)" };
        println!("{}  {text}{marker}", describe(&state));
    }
    Ok(())
}

async fn cmd_analyze(cli: &Cli, texts: &[String], json: bool) -> Result<()> {
    let session = session::open(cli.classifier_url.as_deref())?;
    for text in texts {
        analyze_one(&session.engine, text, json).await?;
    }

    if cli.verbose {
        let stats = session.engine.stats().await;
        eprintln!(
            "--- analyzed={}, cache_hits={}, refined={}, superseded={}, patterns={} ---",
            stats.analyzed,
            stats.cache_hits,
            stats.refined_published,
            stats.superseded,
            stats.pattern_count
        );
    }
    Ok(())
}

async fn cmd_chat(cli: &Cli) -> Result<()> {
    let session = session::open(cli.classifier_url.as_deref())?;
    let engine = &session.engine;
    let mut transitions = engine.transitions();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let text = line.trim();
        match text {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                engine.reset_conversation().await;
                println!("(conversation reset)");
                continue;
            }
            _ => {}
        }

        engine.analyze(text).await;
        println!("fast     {}", describe(&engine.snapshot()));
        engine.settle().await;
        let state = engine.snapshot();
        if state.refined {
            println!("refined  {}", describe(&state));
        }
        print_transitions(&mut transitions);
    }
    Ok(())
}

fn cmd_history(limit: usize) -> Result<()> {
    let store = session::open_store()?;
    let readings = store
        .recent_readings(limit)
        .context("failed to read history")?;
    if readings.is_empty() {
        println!("(no readings yet)");
        return Ok(());
    }
    for r in readings.iter().rev() {
        println!(
            "{}  {:<10} {:.2}  {}",
            r.recorded_at, r.reading.mood, r.reading.confidence, r.reading.source_text
        );
    }
    Ok(())
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let config = session::load_config(cli.classifier_url.as_deref())?;
    let store = session::open_store()?;
    let patterns = store
        .load_patterns()
        .context("failed to load learned patterns")?;

    println!("readings:      {}", store.reading_count()?);
    println!("conversations: {}", store.conversation_count()?);
    println!("patterns:      {}", patterns.pattern_count());
    println!(
        "classifier:    {}",
        config.gateway.endpoint.as_deref().unwrap_or("disabled")
    );
    let distribution = store.mood_distribution()?;
    if !distribution.is_empty() {
        println!("moods:");
        for (mood, n) in distribution {
            println!("  {mood:<10} {n}");
        }
    }
    Ok(())
}

fn cmd_forget() -> Result<()> {
    let store = session::open_store()?;
    let removed = store
        .clear_patterns()
        .context("failed to clear patterns")?;
    println!("forgot {removed} pattern(s)");
    Ok(())
}
