use std::path::PathBuf;

use clap::Parser;
use server::database::RedisStore;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON file with an array of destinations
    path: PathBuf,

    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// Report what would be stored without writing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let destinations = process::read_destinations(&args.path)?;
    println!("Read Destinations: {}", destinations.len());

    let store = RedisStore::connect(&args.redis_url).await?;
    let summary = process::store_destinations(&store, destinations, args.dry_run).await?;

    if summary.new_items == 0 {
        println!("No new destinations found. Exiting.");
    } else {
        println!("Total New Destinations: {}", summary.new_items);
    }
    println!("Skipped Duplicates: {}", summary.duplicates);

    Ok(())
}
