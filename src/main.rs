mod config;
mod dispatcher;
mod error;
mod knowledge;
mod llm;
mod retriever;
mod server;
mod utils;
mod vector_db;

use std::{env, sync::Arc};

use anyhow::{Context, Result};
use config::AppConfig;
use dispatcher::{Dispatcher, Messages};
use knowledge::load_knowledge;
use llm::OpenAiLlm;
use retriever::Retriever;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; a broken one is not
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(err).context("failed to read .env");
        }
    }
    init_tracing();

    let mut config = AppConfig::from_env().context("invalid configuration")?;

    // First argument overrides the knowledge file location
    if let Some(path) = env::args().nth(1) {
        config.knowledge_path = path.into();
    }

    info!(
        port = config.port,
        knowledge = %config.knowledge_path.display(),
        index_page = %config.index_page.display(),
        threshold = config.threshold,
        model = %config.llm.model,
        "starting"
    );

    let store = load_knowledge(&config.knowledge_path).context("failed to load knowledge store")?;
    let retriever = Retriever::new(store).context("failed to build similarity index")?;
    info!(entries = retriever.store().len(), "ready to answer");

    let generator =
        Arc::new(OpenAiLlm::new(config.llm.clone()).context("failed to set up generator")?);

    let mut messages = Messages::default();
    if let Some(template) = config.prompt_template.clone() {
        messages.prompt_template = template;
    }

    let dispatcher = Arc::new(
        Dispatcher::new(retriever, generator)
            .with_threshold(config.threshold)
            .with_messages(messages),
    );

    let app = server::create_app(dispatcher, &config.index_page);
    server::start(config.port, app)
        .await
        .context("server error")?;

    Ok(())
}
