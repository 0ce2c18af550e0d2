//! Warden Web Server
//!
//! Bearer-token session authentication and a role x element x action x
//! ownership permission matrix over HTTP.

use clap::Parser;
use warden_core::logging::{init_logging, LoggingConfig};
use warden_web::server::WardenServerBuilder;
use warden_web::WebConfig;

/// Warden - session authentication and permission gating service
#[derive(Parser)]
#[command(name = "warden-web")]
#[command(about = "Authentication and authorization service")]
#[command(version)]
struct Args {
    /// Server host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Database URL for identity and session storage
    #[arg(long)]
    database_url: Option<String>,

    /// Seed the demo roles, rules, and accounts on startup
    #[arg(long)]
    seed: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let logging = LoggingConfig {
        level: args.log_level.clone(),
        ..LoggingConfig::default()
    };
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let mut config = WebConfig::from_env();
    config.host = args.host;
    config.port = args.port;
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }
    config.seed_demo_data = config.seed_demo_data || args.seed;

    let server = match WardenServerBuilder::new()
        .host(config.host.clone())
        .port(config.port)
        .database_url(config.database_url.clone())
        .seed_demo_data(config.seed_demo_data)
        .build()
        .await
    {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Failed to build server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
