use std::sync::Arc;

use quoteline_agent::{generator_from_config, QuoteRuntime, TracingAuditSink};
use quoteline_core::config::AppConfig;
use quoteline_core::DeliveryError;
use quoteline_messaging::channel_from_config;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<QuoteRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("reply channel setup failed: {0}")]
    Channel(#[source] DeliveryError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let generator = generator_from_config(&config.llm);
    let channel = channel_from_config(&config.messaging).map_err(BootstrapError::Channel)?;
    let runtime = QuoteRuntime::new(
        config.catalog.build(),
        generator,
        channel,
        Arc::new(TracingAuditSink),
        &config.pricing,
    );

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        generator_mode = runtime.generator_mode().as_str(),
        channel = runtime.channel_name(),
        products = config.catalog.products.len(),
        "quote runtime initialized"
    );

    Ok(Application { config, runtime: Arc::new(runtime) })
}
