use std::{net::SocketAddr, path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use game::{presentation::{BellAudio, ConsoleSurface}, word_pool::{self, session_rng}, Grid, WordPool};
use msgs::framing::Framing;
use participant::{agent::{Agent, AgentOutcome, Responder}, console_input::console_input_thread};
use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

/// One player of a bingo session.
#[derive(Debug, Parser)]
#[command(name = "participant")]
struct Args {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "127.0.0.1:65432")]
    server: SocketAddr,
    #[arg(long, default_value_t = 5)]
    grid_size: usize,
    #[arg(long, default_value = "words.txt")]
    words: PathBuf,
    #[arg(long, default_value_t = Framing::LengthPrefixed)]
    framing: Framing,
    #[arg(long)]
    seed: Option<u64>,
    /// Answer truthfully without prompting.
    #[arg(long)]
    auto: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(AgentOutcome::GameOver { .. }) => ExitCode::SUCCESS,
        Ok(AgentOutcome::Disconnected) => ExitCode::from(2),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<AgentOutcome> {
    let words = word_pool::load(&args.words)?;
    let mut pool = WordPool::new(words, session_rng(args.seed));
    let grid = Grid::construct(pool.sample_distinct(args.grid_size * args.grid_size)?, args.grid_size)?;

    let stream = TcpStream::connect(args.server)
        .await
        .with_context(|| format!("unable to connect to the coordinator at {}", args.server))?;

    let responder = if args.auto {
        Responder::Truthful
    }
    else {
        Responder::Console (console_input_thread())
    };

    let mut agent = Agent::new(args.name, grid, args.framing, responder)
        .with_surface(Arc::new(ConsoleSurface))
        .with_audio(Arc::new(BellAudio));
    Ok(agent.run(stream).await)
}
