use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use tollgate::config::GatewayConfig;
use tollgate::server::run_server;

#[derive(Parser)]
#[command(name = "gateway", version, about = "OpenAI-compatible LLM gateway")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, env = "GATEWAY_CONFIG", default_value = "config/gateway.yaml")]
    config: String,
}

#[actix_web::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match GatewayConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run_server(config).await {
        error!(error = %e, "server exited with error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
