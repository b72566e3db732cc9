use std::sync::Arc;

use domain::provider::ProviderRegistry;
use log::*;
use service::config::Config;
use service::logging::Logger;
use web::AppState;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    let registry = match config.service_providers_file() {
        Some(path) => match ProviderRegistry::from_json_file(path) {
            Ok(registry) => registry,
            Err(e) => {
                error!("Failed to load service providers from {path}: {e:?}");
                std::process::exit(1);
            }
        },
        None => ProviderRegistry::new(),
    };

    if registry.is_empty() {
        warn!("No service providers registered, every callback will be rejected");
    }

    if let Err(e) = registry.validate(&config) {
        error!("Invalid configuration: {e:?}");
        std::process::exit(1);
    }

    let app_state = AppState::new(config, Arc::new(registry));
    if let Err(e) = web::init_server(app_state).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}
