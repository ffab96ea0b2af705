use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ai_client::ChatClient;
use crisiswatch_common::Config;
use crisiswatch_fusion::FusionContext;
use crisiswatch_server::routes;
use crisiswatch_sources::standard_adapters;

#[derive(Parser)]
#[command(name = "crisiswatch-server", about = "Crisis signal fusion server")]
struct Cli {
    /// Bind host; overrides WEB_HOST
    #[arg(long)]
    host: Option<String>,

    /// Bind port; overrides WEB_PORT
    #[arg(long)]
    port: Option<u16>,

    /// One-shot mode: assess and analyze this country, print JSON, exit
    #[arg(long)]
    country: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting crisiswatch-server");

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_redacted();

    let host = cli.host.unwrap_or_else(|| config.web_host.clone());
    let port = cli.port.unwrap_or(config.web_port);

    let chat = Arc::new(ChatClient::new(&config.openrouter_api_key));
    let adapters = standard_adapters(&config);
    let ctx = Arc::new(FusionContext::new(adapters, chat, config.fusion.clone())?);

    if let Some(country) = cli.country {
        let assessment = ctx.assess(&country).await;
        let (analysis, plan) = ctx.analyze_and_plan(&country).await;
        let report = serde_json::json!({
            "assessment": assessment,
            "analysis": analysis,
            "plan": plan,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let app = routes::build_router(ctx);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(addr = %addr, "Serving assessment API");
    axum::serve(listener, app).await?;

    Ok(())
}
