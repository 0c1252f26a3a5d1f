use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use sqlx::PgPool;
use uuid::Uuid;

use darp_scoring::{parse_csv, parse_json, ParsedBatch, ScoringPipeline};

#[derive(Debug, Parser)]
#[command(name = "darp-cli")]
#[command(about = "Domain auction ranking pipeline command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ImportFormat {
    Csv,
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import an auction-site export file and merge it into the main table.
    Import {
        /// Path to the CSV or JSON export.
        #[arg(long)]
        file: PathBuf,
        /// Auction site the export came from.
        #[arg(long)]
        site: String,
        /// Default offer type for records that do not carry one.
        #[arg(long)]
        offering_type: Option<String>,
        /// File format; inferred from the extension when omitted.
        #[arg(long, value_enum)]
        format: Option<ImportFormat>,
    },
    /// Score unprocessed auctions in batches until none remain.
    Score {
        /// Batch size; defaults to the configured value.
        #[arg(long)]
        batch_size: Option<i64>,
    },
    /// Recompute dense ranks and preferred flags for all scored auctions.
    Rank,
    /// Delete auctions whose expiration date has passed.
    Sweep,
    /// Print pipeline progress counters.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = darp_core::load_app_config()?;
    let pool_config = darp_db::PoolConfig::from_app_config(&config);
    let pool = darp_db::connect_pool(&config.database_url, pool_config).await?;
    darp_db::run_migrations(&pool).await?;

    match cli.command {
        Commands::Import {
            file,
            site,
            offering_type,
            format,
        } => run_import(&pool, &config, &file, &site, offering_type.as_deref(), format).await,
        Commands::Score { batch_size } => run_score_loop(&pool, &config, batch_size).await,
        Commands::Rank => run_rank(&pool).await,
        Commands::Sweep => run_sweep(&pool).await,
        Commands::Stats => run_stats(&pool).await,
    }
}

fn infer_format(file: &PathBuf, explicit: Option<ImportFormat>) -> anyhow::Result<ImportFormat> {
    if let Some(format) = explicit {
        return Ok(format);
    }
    match file.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(ImportFormat::Csv),
        Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(ImportFormat::Json),
        _ => anyhow::bail!(
            "cannot infer format of {}; pass --format csv|json",
            file.display()
        ),
    }
}

async fn run_import(
    pool: &PgPool,
    config: &darp_core::AppConfig,
    file: &PathBuf,
    site: &str,
    offering_type: Option<&str>,
    format: Option<ImportFormat>,
) -> anyhow::Result<()> {
    let format = infer_format(file, format)?;
    let data = std::fs::read_to_string(file)?;

    let batch: ParsedBatch = match format {
        ImportFormat::Csv => parse_csv(&data, offering_type)?,
        ImportFormat::Json => parse_json(&data, offering_type)?,
    };
    for record in &batch.skipped {
        tracing::warn!(record = record.record, reason = %record.reason, "skipped record");
    }

    let pipeline = ScoringPipeline::from_app_config(config);
    let job_id = Uuid::new_v4();
    let outcome = pipeline
        .run_import(pool, job_id, site, &batch.listings, batch.skipped.len() as u64)
        .await?;
    let deleted = darp_db::delete_expired_auctions(pool).await?;

    println!(
        "import {job_id}: inserted {}, updated {}, skipped {}, swept {} expired",
        outcome.inserted, outcome.updated, outcome.skipped, deleted
    );
    Ok(())
}

async fn run_score_loop(
    pool: &PgPool,
    config: &darp_core::AppConfig,
    batch_size: Option<i64>,
) -> anyhow::Result<()> {
    let batch_size = batch_size.unwrap_or(config.scoring_batch_size).clamp(1, 10_000);
    let pipeline = ScoringPipeline::from_app_config(config);
    let scoring_config = darp_db::get_active_scoring_config(pool).await?;

    let mut total_processed: u64 = 0;
    loop {
        let outcome = pipeline
            .run_scoring_batch(pool, &scoring_config, batch_size)
            .await?;
        total_processed += outcome.processed_count;
        if outcome.total_fetched == 0 {
            break;
        }
        println!(
            "batch: fetched {}, processed {}",
            outcome.total_fetched, outcome.processed_count
        );
    }

    println!("scoring complete: {total_processed} rows processed");
    Ok(())
}

async fn run_rank(pool: &PgPool) -> anyhow::Result<()> {
    let config = darp_db::get_active_scoring_config(pool).await?;
    let outcome = darp_db::recalculate_rankings(pool, config.preferred_rank_threshold).await?;
    println!(
        "ranked {} auctions, {} preferred, in {:.3}s",
        outcome.ranked_count, outcome.preferred_count, outcome.execution_time_seconds
    );
    Ok(())
}

async fn run_sweep(pool: &PgPool) -> anyhow::Result<()> {
    let deleted = darp_db::delete_expired_auctions(pool).await?;
    println!("swept {deleted} expired auctions");
    Ok(())
}

async fn run_stats(pool: &PgPool) -> anyhow::Result<()> {
    let stats = darp_db::scoring_stats(pool).await?;
    println!("total:       {}", stats.total_count);
    println!("unprocessed: {}", stats.unprocessed_count);
    println!("processed:   {}", stats.processed_count);
    println!("scored:      {}", stats.scored_count);
    Ok(())
}
