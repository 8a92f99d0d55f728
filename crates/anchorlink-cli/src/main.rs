use std::collections::HashMap;

use clap::{Parser, Subcommand};
use sqlx::PgPool;

use anchorlink_core::{load_app_config, load_settings, AppConfig};
use anchorlink_db::{connect_pool, PoolConfig};
use anchorlink_engine::VectorStoreClient;

#[derive(Debug, Parser)]
#[command(name = "anchorlink")]
#[command(about = "Anchorlink matching, enrichment, and digest pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full pipeline: score, enrich, select.
    Run {
        /// Recorded on the pipeline run row (e.g. "cron", "manual").
        #[arg(long, default_value = "cli")]
        trigger: String,
    },
    /// Score pending articles against active anchors.
    Score {
        /// Process a single batch of at most this many articles.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Classify unflagged matches with calibrated thresholds.
    Enrich,
    /// Select digest content and print it as JSON.
    Digest {
        /// Stamp the selected articles as sent after printing.
        #[arg(long)]
        mark_sent: bool,
    },
    /// Apply pending database migrations.
    Migrate,
    /// Anchor administration.
    Anchors {
        #[command(subcommand)]
        command: AnchorCommands,
    },
    /// Deliberate resets of derived data.
    Reset {
        #[command(subcommand)]
        command: ResetCommands,
    },
}

#[derive(Debug, Subcommand)]
enum AnchorCommands {
    /// List active anchors.
    List,
    /// Soft-delete an anchor; its historical matches remain.
    Deactivate {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Debug, Subcommand)]
enum ResetCommands {
    /// Clear all highlight flags and enrichment stamps.
    Enrichment,
    /// Delete all match links and clear analysis stamps.
    Analysis,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_app_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let cli = Cli::parse();

    let pool_config = PoolConfig {
        max_connections: config.db_max_connections,
        min_connections: config.db_min_connections,
        acquire_timeout_secs: config.db_acquire_timeout_secs,
    };
    let pool = connect_pool(&config.database_url, pool_config).await?;

    match cli.command {
        Commands::Run { trigger } => {
            let settings = load_settings(&config.settings_path)?;
            let store = vector_store(&config)?;
            let summary =
                anchorlink_engine::run_full_pipeline(&pool, &store, &config, &settings, &trigger)
                    .await?;
            println!(
                "run {}: scored {} articles ({} links), {} org highlights, {} digest items",
                summary.run_id,
                summary.scoring.articles_scored,
                summary.scoring.links_created,
                summary.enrichment.org_highlights,
                summary.selection.item_count(),
            );
        }
        Commands::Score { limit } => {
            let settings = load_settings(&config.settings_path)?;
            let store = vector_store(&config)?;
            let outcome = anchorlink_engine::run_scoring_pass(
                &pool,
                &store,
                &settings,
                config.scoring_batch_size,
                limit,
            )
            .await?;
            println!(
                "scored {} articles: {} links created, {} below floor",
                outcome.articles_scored, outcome.links_created, outcome.links_floored
            );
        }
        Commands::Enrich => {
            let settings = load_settings(&config.settings_path)?;
            let outcome = anchorlink_engine::run_enrichment_pass(&pool, &settings).await?;
            println!(
                "flagged {} links: {} anchor highlights, {} org highlights",
                outcome.links_flagged, outcome.anchor_highlights, outcome.org_highlights
            );
        }
        Commands::Digest { mark_sent } => {
            let settings = load_settings(&config.settings_path)?;
            let selection = anchorlink_engine::run_digest_pass(&pool, &settings).await?;
            println!("{}", serde_json::to_string_pretty(&selection)?);
            if mark_sent {
                let sent = mark_selection_sent(&pool, &selection).await?;
                tracing::info!(sent, "marked selected articles as sent");
            }
        }
        Commands::Migrate => {
            anchorlink_db::run_migrations(&pool).await?;
            println!("migrations applied");
        }
        Commands::Anchors { command } => match command {
            AnchorCommands::List => {
                let anchors = anchorlink_db::list_active_anchors(&pool).await?;
                let components = anchorlink_db::list_anchor_components(&pool).await?;
                let mut counts: HashMap<i64, usize> = HashMap::new();
                for component in &components {
                    *counts.entry(component.anchor_id).or_default() += 1;
                }
                for anchor in &anchors {
                    println!(
                        "{:>6}  {:<40}  {} components  {}",
                        anchor.id,
                        anchor.name,
                        counts.get(&anchor.id).copied().unwrap_or(0),
                        anchor.description.as_deref().unwrap_or("")
                    );
                }
                println!("{} active anchors", anchors.len());
            }
            AnchorCommands::Deactivate { id } => {
                anchorlink_db::deactivate_anchor(&pool, id).await?;
                println!("anchor {id} deactivated");
            }
        },
        Commands::Reset { command } => match command {
            ResetCommands::Enrichment => {
                let cleared = anchorlink_db::reset_enrichment(&pool).await?;
                println!("cleared {cleared} link flags");
            }
            ResetCommands::Analysis => {
                let deleted = anchorlink_db::reset_analysis(&pool).await?;
                println!("deleted {deleted} links");
            }
        },
    }

    Ok(())
}

fn vector_store(config: &AppConfig) -> anyhow::Result<VectorStoreClient> {
    Ok(VectorStoreClient::new(
        &config.vector_url,
        &config.vector_collection,
        config.vector_request_timeout_secs,
    )?)
}

async fn mark_selection_sent(
    pool: &PgPool,
    selection: &anchorlink_engine::DigestSelection,
) -> anyhow::Result<u64> {
    let ids = selection.article_ids();
    let sent = anchorlink_db::mark_articles_sent(pool, &ids).await?;
    Ok(sent)
}
