use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use advscope::config::Config;
use advscope::models::AdvisorFilter;
use advscope::services::extraction::{
    CostTracker, ExtractionOptions, FleetRunner, Orchestrator, TierModels, estimate_batch_cost,
};
use advscope::services::llm::AnthropicClient;
use advscope::store::{PgStore, Store};

#[derive(Parser, Debug)]
#[command(name = "advscope")]
#[command(version, about = "ADV intelligence extraction engine")]
struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a single advisor by CRD number
    Extract {
        #[arg(long)]
        crd: i64,
        #[command(flatten)]
        run: RunFlags,
    },
    /// Run extraction over every advisor matching the filter
    Fleet {
        /// Minimum regulatory AUM
        #[arg(long)]
        min_aum: Option<i64>,
        /// Main office state (two-letter code)
        #[arg(long)]
        state: Option<String>,
        /// Skip advisors that already have a completed run
        #[arg(long)]
        skip_extracted: bool,
        /// Cap the number of advisors
        #[arg(long)]
        limit: Option<i64>,
        #[command(flatten)]
        run: RunFlags,
    },
}

#[derive(Parser, Debug, Clone)]
struct RunFlags {
    /// Print the cost estimate and exit
    #[arg(long)]
    dry_run: bool,
    /// Cap the pipeline at this tier (1-3)
    #[arg(long, value_name = "N")]
    max_tier: Option<u8>,
    /// Per-advisor USD budget
    #[arg(long, value_name = "X")]
    max_cost: Option<f64>,
    /// Archive existing answers, then re-extract
    #[arg(long)]
    force: bool,
    /// Skip advisor-scope phases; extract funds only
    #[arg(long)]
    funds_only: bool,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    let (run_flags, max_tier, budget) = match &cli.command {
        Command::Extract { run, .. } | Command::Fleet { run, .. } => {
            let max_tier = run.max_tier.unwrap_or(config.extraction.max_tier).clamp(1, 3);
            let budget = run.max_cost.or(config.extraction.max_cost_usd);
            (run.clone(), max_tier, budget)
        },
    };

    let pricing = config.pricing.to_table();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database.url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    let client = Arc::new(AnthropicClient::with_base(
        config.llm.api_key.clone(),
        config.llm.api_base.clone(),
    ));
    let cost = Arc::new(CostTracker::new(pricing, budget));
    let models = TierModels {
        tier1: config.llm.tier1_model.clone(),
        tier2: config.llm.tier2_model.clone(),
        tier3: config.llm.tier3_model.clone(),
    };
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&store),
        client,
        Arc::clone(&cost),
        models,
    ));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling in-flight work");
                cancel.cancel();
            }
        });
    }

    let opts = ExtractionOptions {
        max_tier,
        force: run_flags.force,
        funds_only: run_flags.funds_only,
    };

    match cli.command {
        Command::Extract { crd, .. } => {
            if run_flags.dry_run {
                let estimate = estimate_batch_cost(&pricing, 1, max_tier);
                println!("Estimated cost for CRD {} through tier {}: ${:.2}", crd, max_tier, estimate);
                return Ok(());
            }
            let summary = orchestrator.extract_advisor(&cancel, crd, &opts).await?;
            println!(
                "CRD {}: {}/{} questions answered through tier {}, ${:.4}",
                summary.crd_number,
                summary.answered,
                summary.total_questions,
                summary.tier_completed,
                summary.cost_usd
            );
        },
        Command::Fleet { min_aum, state, skip_extracted, limit, .. } => {
            let filter = AdvisorFilter { min_aum, state, skip_extracted, limit };
            let crds = store.list_advisors(&cancel, &filter).await?;
            if run_flags.dry_run {
                let estimate = estimate_batch_cost(&pricing, crds.len(), max_tier);
                println!(
                    "Estimated cost for {} advisor(s) through tier {}: ${:.2}",
                    crds.len(),
                    max_tier,
                    estimate
                );
                return Ok(());
            }
            tracing::info!(advisors = crds.len(), "fleet run starting");

            let runner = FleetRunner::new(orchestrator, Arc::clone(&store), Arc::clone(&cost));
            let summary = runner.run_batch(&cancel, &crds, &opts).await;
            println!(
                "Fleet run: {} completed, {} failed, ${:.2} total, {}s elapsed",
                summary.completed,
                summary.failed,
                summary.total_cost_usd,
                summary.elapsed.as_secs()
            );
        },
    }

    Ok(())
}
