use prediction_sim::{App, AppConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_help() {
    eprintln!(
        r#"Prediction Market Simulator - play-money LMSR markets with live candles

USAGE:
    prediction-sim [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --demo              Seed a few demo markets and a funded user
    --help              Print this help message

ENVIRONMENT VARIABLES:
    HOST                Server host (default: 0.0.0.0)
    PORT                Server port (default: 8080)
    RUST_LOG            Log level filter

EXAMPLES:
    # Run with defaults
    prediction-sim

    # Run with config file
    prediction-sim --config config.json

    # Run with custom port
    PORT=9000 prediction-sim --demo
"#
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prediction_sim=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut demo = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            "--demo" => demo = true,
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            AppConfig::from_file(&path)?
        }
        None if demo => AppConfig::with_demo_markets(),
        None => {
            tracing::info!("Using default configuration");
            AppConfig::default()
        }
    };

    // Env vars override the file
    if let Ok(host) = std::env::var("HOST") {
        config.server.host = host;
    }
    if let Ok(port) = std::env::var("PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
        }
    }

    tracing::info!("Markets: {}", config.markets.len());
    tracing::info!("Users: {}", config.users.len());
    tracing::info!(
        "Bots: {}",
        if config.bots.enabled {
            config.bots.count
        } else {
            0
        }
    );

    let app = App::from_config(config)?;

    tracing::info!("Starting Prediction Market Simulator");
    tracing::info!(
        "REST API: http://{}:{}/api/",
        app.config.server.host,
        app.config.server.port
    );
    tracing::info!(
        "WebSocket: ws://{}:{}/ws",
        app.config.server.host,
        app.config.server.port
    );
    tracing::info!("Available endpoints:");
    tracing::info!("  GET  /api/markets");
    tracing::info!("  GET  /api/markets/{{id}}/candles?tf=5s");
    tracing::info!("  POST /api/markets/{{id}}/trade");
    tracing::info!("  POST /api/markets/{{id}}/resolve");
    tracing::info!("  POST /admin/bots/start");

    app.run().await
}
