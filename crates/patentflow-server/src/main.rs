mod routes;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use patentflow_core::config::Config;
use patentflow_core::ledger::MemoryLedger;
use patentflow_core::pipeline::{Pipeline, ProviderSet};
use patentflow_core::registry::ModelRegistry;
use patentflow_core::search::PriorArtAdapter;
use patentflow_core::store::MemoryJobStore;
use patentflow_providers::{AnthropicClient, GeminiClient, GoogleSearchClient, OpenAiClient};

use routes::{AppState, PhaseTimeouts};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "patentflow=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env();

    for (key, name) in [
        (&config.anthropic_api_key, "ANTHROPIC_API_KEY"),
        (&config.openai_api_key, "OPENAI_API_KEY"),
        (&config.gemini_api_key, "GEMINI_API_KEY"),
    ] {
        if key.is_empty() {
            warn!("{name} not set; requests routed to that provider will fail");
        }
    }

    let providers = ProviderSet {
        anthropic: Arc::new(AnthropicClient::new(config.anthropic_api_key.clone())),
        openai: Arc::new(OpenAiClient::new(config.openai_api_key.clone())),
        gemini: Arc::new(GeminiClient::new(config.gemini_api_key.clone())),
    };

    let store = Arc::new(MemoryJobStore::new());
    let ledger = Arc::new(MemoryLedger::new());

    let mut pipeline = Pipeline::new(
        store.clone(),
        ledger,
        providers,
        ModelRegistry::builtin(),
        patentflow_phases::drafting_plan(),
    );

    if config.google_search_api_key.is_empty() {
        warn!("GOOGLE_SEARCH_API_KEY not set; prior-art enrichment disabled");
    } else {
        let search = GoogleSearchClient::new(
            config.google_search_api_key.clone(),
            config.google_search_engine_id.clone(),
        );
        pipeline = pipeline.with_prior_art(
            PriorArtAdapter::new(Arc::new(search), config.search_max_results),
            config.search_cost,
        );
    }

    let state = Arc::new(AppState {
        pipeline,
        store,
        timeouts: PhaseTimeouts {
            analyze: Duration::from_secs(config.analyze_timeout_s),
            think: Duration::from_secs(config.think_timeout_s),
            write: Duration::from_secs(config.write_timeout_s),
        },
    });

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("patentflow-server listening on {addr}");

    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
