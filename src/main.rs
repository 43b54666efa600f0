use clap::Parser;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trackcache::{
    Config,
    config::{Command, IndexConfig, ServeConfig},
    formats::{IntervalFileWriter, bed},
    handlers::{AppState, create_router},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match config.command {
        Command::Serve(serve) => run_server(serve).await,
        Command::Index(index) => build_index(index).await,
    }
}

async fn run_server(config: ServeConfig) -> anyhow::Result<()> {
    let state = AppState::new(config.data_dir.clone(), config.cache_options());

    let app = create_router(state);
    let app = if config.cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    let addr = config.bind_addr();
    tracing::info!("Starting trackcache server on {}", addr);
    tracing::info!("Data directory: {:?}", config.data_dir);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_index(config: IndexConfig) -> anyhow::Result<()> {
    let records = bed::read_bed(&config.input).await?;
    tracing::info!("Read {} records from {:?}", records.len(), config.input);

    let columns = bed::BED_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut writer = IntervalFileWriter::new(columns);
    writer.extend(records)?;

    let output = config.output_path();
    let summary = writer.write(&output).await?;
    tracing::info!(
        "Wrote {:?}: {} references, {} records, {} bytes",
        output,
        summary.references,
        summary.records,
        summary.bytes
    );

    Ok(())
}
