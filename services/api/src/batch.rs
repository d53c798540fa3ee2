use crate::infra::open_decision_log;
use clap::Args;
use decision_desk::config::AppConfig;
use decision_desk::error::AppError;
use decision_desk::telemetry;
use decision_desk::workflows::decision::batch::{
    parse_delimiter, read_rows_from_path, RejectedRow, ScenarioRow,
};
use decision_desk::workflows::decision::{
    prepare_batch, DecisionLogStore, DecisionService, DecisionSubmitter, ModelCatalog, ModelId,
    TomApiClient,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// Model identifier to request decisions from
    #[arg(long)]
    pub(crate) model: String,
    /// CSV file with a header row naming model fields
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Field delimiter; use \t for tab separated files
    #[arg(long, default_value = ",")]
    pub(crate) delimiter: String,
}

/// Decisions returned for the clean rows plus the rows that never left the process.
#[derive(Debug, Default)]
pub(crate) struct BatchReport {
    pub(crate) results: Vec<Value>,
    pub(crate) rejected: Vec<RejectedRow>,
}

impl BatchReport {
    fn to_json(&self) -> Value {
        let rejected: Vec<Value> = self
            .rejected
            .iter()
            .map(|row| json!({ "row": row.row, "reason": row.reason }))
            .collect();
        json!({ "results": self.results, "rejected": rejected })
    }
}

fn connect(config: &AppConfig) -> Result<TomApiClient, AppError> {
    let api_key = config.decision_api.require_api_key()?;
    Ok(TomApiClient::new(&config.decision_api.base_url, api_key)?)
}

pub(crate) async fn run_models() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let client = connect(&config)?;
    let models = client.list_models().await?;

    if models.is_empty() {
        println!("No models available for this API key.");
        return Ok(());
    }

    for model in models {
        println!("{}  {}", model.id, model.name);
        if !model.description.is_empty() {
            println!("    {}", model.description);
        }
    }
    Ok(())
}

pub(crate) async fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let delimiter = parse_delimiter(&args.delimiter)?;
    let rows = read_rows_from_path(&args.csv, delimiter)?;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let client = connect(&config)?;
    let (decision_log, database) = open_decision_log(&config.database).await?;
    let service = DecisionService::new(Arc::new(client), Arc::new(decision_log));

    let outcome = submit_rows(&service, &ModelId(args.model), rows).await;

    if let Some(pool) = database {
        pool.close().await;
    }
    println!("{}", outcome?.to_json());
    Ok(())
}

/// Validates every row against the model and submits the clean ones as one
/// batch. Each returned decision is recorded in the service's decision log.
pub(crate) async fn submit_rows<G, L>(
    service: &DecisionService<G, L>,
    model_id: &ModelId,
    rows: Vec<ScenarioRow>,
) -> Result<BatchReport, AppError>
where
    G: ModelCatalog + DecisionSubmitter + 'static,
    L: DecisionLogStore + 'static,
{
    let model = service.model(model_id).await?;
    let batch = prepare_batch(&model, rows);

    for rejected in &batch.rejected {
        warn!(row = rejected.row, reason = %rejected.reason, "scenario row rejected");
    }

    if batch.inputs.is_empty() {
        return Ok(BatchReport {
            results: Vec::new(),
            rejected: batch.rejected,
        });
    }

    info!(model_id = %model.id, rows = batch.inputs.len(), "submitting batch");
    let results = service.decide_batch(&model.id, batch.inputs).await?;

    Ok(BatchReport {
        results,
        rejected: batch.rejected,
    })
}
