use phq_screening::{handlers, records::RecordStore, storage::AudioStore, AppState, Config};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Ensure the default ./data folder exists so sqlite can create the DB file.
    if config.database_url.contains("./data/") {
        std::fs::create_dir_all("data")?;
    }

    let records = RecordStore::connect(&config).await?;
    let audio = AudioStore::from_config(&config)?;

    tracing::info!(
        "Using {} record store, {} audio store, questionnaire {}",
        records.backend_name(),
        audio.backend_name(),
        config.questionnaire
    );
    if config.convert_audio_to_wav {
        tracing::info!("Recordings will be converted to WAV with ffmpeg");
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        records,
        audio,
    });

    let app = handlers::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
