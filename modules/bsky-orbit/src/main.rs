use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bsky_client::BskyClient;
use bsky_orbit::render::{render_table, write_artifacts};
use bsky_orbit::text::truncate;
use bsky_orbit::{normalize_handle, CancellationToken, Orbit, OrbitConfig, Progress, ProgressReporter};

#[derive(Parser)]
#[command(
    name = "bsky-orbit",
    version,
    about = "Discover who to follow on Bluesky based on your network. No API key required.",
    after_help = "Examples:\n    bsky-orbit jasonlong.me\n    bsky-orbit @username.bsky.social"
)]
struct Cli {
    /// Handle to analyze (a leading @ is ignored)
    handle: String,

    /// Directory for the JSON and Markdown reports
    #[arg(long, short, default_value = ".")]
    output_dir: PathBuf,

    /// Number of recommendations to keep
    #[arg(long)]
    top: Option<usize>,

    /// Follows requested per page (max 100)
    #[arg(long)]
    page_size: Option<u32>,

    /// Follow lists / profiles fetched at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Minimum milliseconds between requests (0 disables pacing)
    #[arg(long)]
    pacing_ms: Option<u64>,

    /// Retries for transient API failures
    #[arg(long)]
    retries: Option<u32>,

    /// Stop fetching after this many seconds and report what was collected
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// XRPC base URL
    #[arg(long)]
    api_base: Option<String>,

    /// Show diagnostics on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply(&self, config: &mut OrbitConfig) {
        if let Some(top) = self.top {
            config.top_n = top;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(pacing_ms) = self.pacing_ms {
            config.pacing = Duration::from_millis(pacing_ms);
        }
        if let Some(retries) = self.retries {
            config.max_retries = retries;
        }
        if let Some(ref api_base) = self.api_base {
            config.api_base = api_base.clone();
        }
    }
}

fn init_tracing(verbose: u8) -> Result<()> {
    let default = match verbose {
        0 => "warn",
        1 => "warn,bsky_orbit=debug,bsky_client=debug",
        _ => "trace",
    };
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::try_new(directives)?,
        _ => EnvFilter::new(default),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Live status on stdout; per-account lines redraw in place.
fn draw_progress(event: &Progress) -> io::Result<()> {
    let mut out = io::stdout().lock();
    match event {
        Progress::FollowsFound { count } => {
            writeln!(out, "   Found {count} accounts")?;
            writeln!(out, "\n🔍 Analyzing who your follows follow...")?;
            writeln!(out, "   This may take a few minutes for large networks")?;
        }
        Progress::Hop { done, total, handle } => {
            write!(out, "\r   [{done}/{total}] {:<45}", truncate(handle, 40))?;
        }
        Progress::Enriching { count } => {
            writeln!(out, "\n\n📊 Fetching details for top {count} recommendations...")?;
        }
        Progress::Profile { done, total, handle } => {
            write!(out, "\r   [{done}/{total}] @{:<44}", truncate(handle, 40))?;
        }
    }
    out.flush()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut config = OrbitConfig::from_env()?;
    cli.apply(&mut config);
    config.validate()?;
    config.log();

    let handle = normalize_handle(&cli.handle)?;
    println!("\n🔭 bsky-orbit: Analyzing @{handle}'s network");
    println!("{}", "=".repeat(60));
    println!("\n📡 Fetching who you follow...");

    let client = BskyClient::new(&config.api_base, config.request_timeout)
        .context("Failed to build HTTP client")?;
    let orbit = Orbit::new(Arc::new(client), config).with_progress(ProgressReporter::new(|event| {
        if let Err(err) = draw_progress(event) {
            tracing::debug!(error = %err, "Could not draw progress");
        }
    }));

    let cancel = CancellationToken::new();
    if let Some(secs) = cli.timeout_secs {
        cancel.cancel_after(Duration::from_secs(secs));
    }
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\n⏹  Interrupted, finishing with what has been collected...");
                cancel.cancel();
            }
        });
    }

    let report = match orbit.run(&handle, &cancel).await {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    println!();
    println!(
        "\n✨ Found {} accounts in your extended network ({} follows analyzed)",
        report.stats.candidates, report.stats.first_hop
    );
    if report.stats.cancelled {
        println!("⚠️  Run was cut short; these results are partial.");
    }
    if report.stats.origin_partial && !report.stats.cancelled {
        println!("⚠️  Only part of your follow list could be fetched; some accounts you follow may be listed.");
    }
    println!("\n{}", render_table(&report));

    let (json_path, md_path) = write_artifacts(&report, &cli.output_dir)?;
    println!("📁 Saved: {}", json_path.display());
    println!("📁 Saved: {}", md_path.display());
    tracing::debug!("{}", report.stats);
    println!("\n🚀 Done! Happy following.\n");

    Ok(())
}
