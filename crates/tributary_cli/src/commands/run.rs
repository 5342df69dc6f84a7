use super::load_pipeline;
use clap::Args;
use color_eyre::Result;
use color_eyre::eyre::bail;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tributary_core::RunConfig;
use tributary_fetch::HttpClient;
use tributary_runtime::{
    CancellationToken, Engine, EngineConfig, NodeOutcome, NodeSummary, Pipeline, RetryPolicy,
    RunContext,
};
use tributary_storage::{DirObjectStore, DirWarehouse};

/// Arguments of the `run` command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to pipeline JSON file
    pub pipeline: PathBuf,

    /// Object-storage bucket
    #[arg(long, env = "TRIBUTARY_BUCKET")]
    pub bucket: Option<String>,

    /// Warehouse project
    #[arg(long, env = "TRIBUTARY_PROJECT")]
    pub project: Option<String>,

    /// Warehouse dataset
    #[arg(long, env = "TRIBUTARY_DATASET")]
    pub dataset: Option<String>,

    /// Local directory for artifacts, objects and tables
    #[arg(long, env = "TRIBUTARY_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Cap items fetched per resource (0 fetches everything)
    #[arg(long)]
    pub max_items: Option<usize>,

    /// Retries per failed stage
    #[arg(long, default_value_t = tributary_runtime::retry::DEFAULT_RETRIES)]
    pub retries: u32,

    /// Seconds between retries
    #[arg(long, default_value_t = tributary_runtime::retry::DEFAULT_RETRY_DELAY.as_secs())]
    pub retry_delay_secs: u64,

    /// Nodes allowed to run at once
    #[arg(long, default_value_t = tributary_runtime::engine::DEFAULT_MAX_PARALLEL)]
    pub max_parallel: usize,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the `run` command: prepare, run and report.
pub async fn execute(args: RunArgs) -> Result<()> {
    let config = load_pipeline(&args.pipeline)?;
    let mut pipeline = Pipeline::prepare(&config)?;
    if let Some(max_items) = args.max_items {
        pipeline = pipeline.with_max_items(max_items);
    }

    let mut builder = RunConfig::builder().data_dir(&args.data_dir);
    if let Some(bucket) = args.bucket {
        builder = builder.bucket(bucket);
    }
    if let Some(project) = args.project {
        builder = builder.project(project);
    }
    if let Some(dataset) = args.dataset {
        builder = builder.dataset(dataset);
    }
    let run_config = Arc::new(builder.build()?);

    let objects = DirObjectStore::new(args.data_dir.join("objects"));
    let warehouse = DirWarehouse::new(args.data_dir.join("warehouse"), objects.clone());
    let http = HttpClient::new(Duration::from_secs(args.timeout_secs))?;

    let cancel = CancellationToken::new();
    let ctx = RunContext::new(
        Arc::clone(&run_config),
        Arc::new(http),
        Arc::new(objects),
        Arc::new(warehouse),
    )?
    .with_cancel(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            cancel.cancel();
        }
    });

    let engine_config = EngineConfig::default()
        .with_retry(
            RetryPolicy::default()
                .with_retries(args.retries)
                .with_delay(Duration::from_secs(args.retry_delay_secs)),
        )
        .with_max_parallel(args.max_parallel);

    info!(
        pipeline = %args.pipeline.display(),
        bucket = run_config.bucket(),
        project = run_config.project(),
        dataset = run_config.dataset(),
        "Pipeline prepared"
    );

    let report = Engine::new(ctx, engine_config).run(&pipeline).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Run {} ({:?})", report.run_id, report.status());
        for (name, outcome) in &report.nodes {
            match outcome {
                NodeOutcome::Succeeded(NodeSummary::Chain(chain)) => println!(
                    "  {:24} ok      {} fetched, {} rejected, {} rows -> {}",
                    name, chain.fetched, chain.rejected, chain.load.rows, chain.load.table_id
                ),
                NodeOutcome::Succeeded(NodeSummary::Summary { table_id }) => {
                    println!("  {:24} ok      -> {}", name, table_id);
                }
                NodeOutcome::Failed { error } => println!("  {:24} FAILED  {}", name, error),
                NodeOutcome::Skipped { reason } => println!("  {:24} skipped {}", name, reason),
            }
        }
        let elapsed = report.finished_at - report.started_at;
        println!("  Duration: {:.2}s", elapsed.num_milliseconds() as f64 / 1000.0);
    }

    if !report.succeeded() {
        let failed = report.failed_nodes();
        if failed.is_empty() {
            bail!("Run did not complete: {} node(s) skipped", report.skipped_nodes().len());
        }
        bail!("Run failed: {}", failed.join(", "));
    }
    Ok(())
}
