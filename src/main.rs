//! Store Greeter MCP Server
//!
//! Greets businesses by approximate name, with the current weather at
//! their location, over the MCP streamable HTTP transport.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use store_greeter::config::{Args, Config, LogFormat};
use store_greeter::http::{self, HttpState};
use store_greeter::mcp::{McpServer, SessionRegistry, ToolRegistry};
use store_greeter::sdk::{OpenWeatherMap, SupabaseStoreSearch};
use store_greeter::service::{GreetingService, StoreResolver, WeatherEnricher};
use store_greeter::{metrics, tools, SERVER_NAME, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_logging(args.debug, args.log_format);

    let config: Config = args.into();
    config.validate()?;

    info!("Store Greeter MCP Server v{}", VERSION);
    info!(
        "Similarity threshold: {}, search timeout: {}s, weather timeout: {}s",
        config.similarity_threshold, config.search_timeout_secs, config.weather_timeout_secs
    );

    // Initialize services
    let supabase_url = config.supabase_url.as_deref().unwrap_or_default();
    let service_key = config.supabase_service_key.clone().unwrap_or_default();
    let search = SupabaseStoreSearch::new(supabase_url, service_key)
        .context("Failed to create Supabase client")?;
    let resolver = StoreResolver::new(
        Arc::new(search),
        config.similarity_threshold,
        Duration::from_secs(config.search_timeout_secs),
    );

    let weather = match &config.weather_api_key {
        Some(key) => {
            let provider = OpenWeatherMap::new(config.weather_base_url.clone(), key.clone())
                .context("Failed to create weather client")?;
            WeatherEnricher::new(
                Arc::new(provider),
                Duration::from_secs(config.weather_timeout_secs),
            )
        }
        None => {
            warn!("WEATHER_API_KEY is not set; greetings will carry no live weather");
            WeatherEnricher::disabled()
        }
    };

    let greeting_service = Arc::new(GreetingService::new(resolver, weather));

    // Create MCP server and register tools
    let mut registry = ToolRegistry::new();
    tools::register_all_tools(&mut registry, greeting_service)?;
    info!("Registered {} MCP tools", registry.tool_count());

    let server = Arc::new(McpServer::new(registry, SERVER_NAME));
    let mut state = HttpState::new(server, Arc::new(SessionRegistry::new()));
    if config.metrics {
        state = state.with_metrics(metrics::install_recorder()?);
        info!("Prometheus metrics enabled on /metrics");
    }

    http::start_server(&config, state).await?;
    Ok(())
}

fn init_logging(debug: bool, format: LogFormat) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
