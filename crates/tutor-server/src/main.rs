//! GPT Tutor backend — word-list storage, prompt actions, settings, and a
//! streaming fetch proxy behind one HTTP surface.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("TUTOR_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" | "help" => {
                println!("GPT Tutor — language learning backend");
                println!();
                println!("Usage: tutor");
                println!();
                println!("Environment:");
                println!("  TUTOR_DATA_DIR    Data directory (default: data)");
                println!("  PORT              Listen port (default: 3010)");
                println!("  OPENAI_API_KEY    Fallback API key when none is configured");
                return Ok(());
            }
            other => {
                eprintln!("Unknown command: {other}. Use 'tutor help' for usage.");
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = tutor_core::TutorConfig::from_env(&data_dir)?;
    let port = config.port;

    let state = Arc::new(AppState::new(config).map_err(|e| anyhow::anyhow!("{e}"))?);

    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Tutor server listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
