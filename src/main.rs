//! podsum - recompute podcast show-download summaries

mod cli;

use clap::Parser;
use cli::Cli;
use podsum_core::error::Result;
use podsum_engine::run_job;
use podsum_store::FsStore;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "podsum=info" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let request = cli.job_request()?;
    let store = FsStore::new(&cli.store);

    let outcome = run_job(&store, &request).await?;

    info!(
        dailies = outcome.dailies_processed,
        overall_changed = ?outcome.overall_changed,
        "recomputation complete"
    );

    if cli.verbose {
        for (step, millis) in &outcome.times {
            println!("{step}: {millis}ms");
        }
        if let Some(summary) = &outcome.month_summary {
            println!("month total downloads: {}", summary.total());
        }
        if let Some(audience) = &outcome.audience {
            println!("audience: {} distinct ids", audience.audience);
        }
    }

    Ok(())
}
