//! The `run` command — wire everything up and drive one digest run.

use newsbrief_agent::PlanRunner;
use newsbrief_config::AppConfig;
use newsbrief_core::Provider;
use newsbrief_mail::{GraphAuthenticator, GraphMailClient};
use newsbrief_providers::OpenAiCompatProvider;
use newsbrief_storage::{AnalysisStore, ChunkStore, MetadataStore};
use newsbrief_tools::{PipelineSettings, default_registry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub async fn run(
    objective: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => AppConfig::load_from(&path)?,
        None => AppConfig::load()?,
    };

    let Some(api_key) = config.api_key.clone() else {
        eprintln!("No LLM API key configured. Set NEWSBRIEF_API_KEY or add api_key to the config.");
        std::process::exit(1);
    };

    let Some(client_secret) = config.graph.client_secret.clone() else {
        eprintln!(
            "No Graph client secret configured. Set GRAPH_CLIENT_SECRET or add \
             graph.client_secret to the config."
        );
        std::process::exit(1);
    };

    let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::new(
        "openai",
        config.api_url.clone(),
        api_key,
    ));

    let auth = Arc::new(GraphAuthenticator::new(
        config.graph.tenant_id.clone(),
        config.graph.client_id.clone(),
        client_secret,
    ));
    let mail = Arc::new(GraphMailClient::new(auth, config.graph.user_id.clone()));

    let metadata = Arc::new(MetadataStore::new(&config.storage.database_path).await?);
    let chunks = Arc::new(ChunkStore::new());
    let analyses = Arc::new(AnalysisStore::new());

    let settings = Arc::new(PipelineSettings {
        model: config.default_model.clone(),
        embedding_model: config.embedding_model.clone(),
        temperature: config.default_temperature,
        senders: config.graph.senders.clone(),
        receiver_email: config.graph.receiver_email.clone(),
        chunk_size: config.storage.chunk_size,
        chunk_overlap: config.storage.chunk_overlap,
    });

    let registry = Arc::new(default_registry(
        provider.clone(),
        mail,
        metadata,
        chunks,
        analyses,
        settings,
    ));

    let runner = PlanRunner::new(
        provider,
        registry,
        config.default_model.clone(),
        config.default_temperature,
    )
    .with_max_transitions(config.agent.max_transitions);

    let objective = objective.unwrap_or_else(|| config.default_objective());
    info!(%objective, "Starting digest run");

    match runner.run(&objective).await {
        Ok(outcome) => {
            println!("{}", outcome.response);
            info!(
                run_id = %outcome.run_id,
                transitions = outcome.transitions,
                "Run finished"
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Run failed: {e}");
            std::process::exit(1);
        }
    }
}
