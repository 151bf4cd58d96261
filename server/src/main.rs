use std::{net::SocketAddr, path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use game::{presentation::{BellAudio, ConsoleSurface}, word_pool::{self, session_rng}, WordPool};
use local_ip_address::local_ip;
use msgs::framing::Framing;
use server::{config::{DrawPolicy, SessionConfig}, report::SessionReport, session::Session};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Coordinator of a word-matching bingo session.
#[derive(Debug, Parser)]
#[command(name = "server")]
struct Args {
    /// JSON session config; replaces the flags below when given.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 2)]
    participants: usize,
    #[arg(long, default_value_t = 5)]
    grid_size: usize,
    /// Display name, in connect order. Repeatable.
    #[arg(long = "name")]
    names: Vec<String>,
    #[arg(long, default_value = "127.0.0.1:65432")]
    listen: SocketAddr,
    #[arg(long, default_value = "words.txt")]
    words: PathBuf,
    #[arg(long, default_value_t = DrawPolicy::WithoutReplacement)]
    draw_policy: DrawPolicy,
    #[arg(long, default_value_t = 30_000)]
    round_millis: u64,
    #[arg(long, default_value_t = 2_000)]
    grace_millis: u64,
    #[arg(long, default_value_t = 100)]
    poll_millis: u64,
    #[arg(long, default_value_t = 10_000)]
    countdown_warning_millis: u64,
    #[arg(long, default_value_t = Framing::LengthPrefixed)]
    framing: Framing,
    /// Seed for a reproducible draw order.
    #[arg(long)]
    seed: Option<u64>,
    /// Write the session report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Args {
    fn session_config(&self) -> anyhow::Result<SessionConfig> {
        if let Some(path) = &self.config {
            return Ok(SessionConfig::load(path)?);
        }
        Ok(SessionConfig {
            participants: self.participants,
            grid_size: self.grid_size,
            names: self.names.clone(),
            listen: self.listen,
            words: self.words.clone(),
            draw_policy: self.draw_policy,
            round_millis: self.round_millis,
            grace_millis: self.grace_millis,
            poll_millis: self.poll_millis,
            countdown_warning_millis: self.countdown_warning_millis,
            framing: self.framing,
            seed: self.seed,
            ..SessionConfig::default()
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.session_config()?;
    config.validate()?;

    let words = word_pool::load(&config.words)?;
    if words.len() < config.required_words() {
        let report = SessionReport::insufficient_words(config.required_words(), words.len());
        return finish(&report, args.report.as_ref());
    }
    let pool = WordPool::new(words, session_rng(config.seed));

    let listener = TcpListener::bind(config.listen).await.with_context(|| format!("binding {}", config.listen))?;
    let bound = listener.local_addr()?;
    if bound.ip().is_unspecified() {
        match local_ip() {
            Ok(ip) => info!("coordinator listening at {ip}:{}", bound.port()),
            Err(e) => warn!("could not determine local ip: {e}"),
        }
    }
    info!(addr = %bound, participants = config.participants, framing = %config.framing, "coordinator started");

    let session = Session::new(config, pool)
        .with_surface(Arc::new(ConsoleSurface))
        .with_audio(Arc::new(BellAudio));

    tokio::select! {
        report = session.run(listener) => finish(&report?, args.report.as_ref()),
        _ = tokio::signal::ctrl_c() => {
            println!("The session was aborted.");
            Ok(())
        }
    }
}

fn finish(report: &SessionReport, path: Option<&PathBuf>) -> anyhow::Result<()> {
    print!("{}", report.summary());
    if let Some(path) = path {
        report.save(path).with_context(|| format!("writing report to {}", path.display()))?;
    }
    Ok(())
}
