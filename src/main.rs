use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{self, info};
use webhook_relay::api::build_router;
use webhook_relay::delivery::DeliveryClient;
use webhook_relay::error::RelayError;
use webhook_relay::{AppState, RelayConfig};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";
const DEFAULT_CONFIG_PATH: &str = "relay_config.toml";

/// Load and parse the configuration file
fn load_config(path: &str) -> Result<RelayConfig, RelayError> {
    let config_str = fs::read_to_string(path).map_err(|e| {
        RelayError::Config(format!("Failed to read config file '{}': {}", path, e))
    })?;

    let config: RelayConfig = toml::from_str(&config_str).map_err(|e| {
        RelayError::Config(format!("Failed to parse config file '{}': {}", path, e))
    })?;

    Ok(config)
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());
    let config_path =
        std::env::var("RELAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config: RelayConfig = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let delivery = match DeliveryClient::new() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState { config, delivery });

    tracing_subscriber::fmt::init();
    let app = build_router(state);

    info!("Listening on {}", bind_address);
    info!("Using config at {:?}", config_path);
    let listener = tokio::net::TcpListener::bind(bind_address).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
