//! One-shot Grafana setup.
//!
//! Registers a Prometheus data source pointing at the monitor service
//! metrics endpoint. Fire-and-forget: the call is made once and the
//! response status is printed, with no retry and no response validation.

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;

#[derive(Parser)]
#[command(name = "grafana-setup")]
#[command(about = "Register the monitor metrics endpoint as a Grafana data source", long_about = None)]
struct Cli {
    #[arg(long, env = "GRAFANA_URL", default_value = "http://localhost:3000")]
    grafana_url: String,

    #[arg(long, env = "GRAFANA_API_KEY", help = "Bearer token, if Grafana requires one")]
    api_key: Option<String>,

    #[arg(long, env = "METRICS_URL", default_value = "http://localhost:9091")]
    metrics_url: String,

    #[arg(long, default_value = "monitor-prometheus", help = "Data source name")]
    name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let cli = Cli::parse();

    let body = serde_json::json!({
        "name": cli.name,
        "type": "prometheus",
        "url": cli.metrics_url,
        "access": "proxy",
        "basicAuth": false,
    });

    let client = reqwest::Client::new();
    let mut request = client
        .post(format!("{}/api/datasources", cli.grafana_url))
        .json(&body);
    if let Some(key) = &cli.api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await?;
    println!(
        "Registered data source '{}' -> {}: {}",
        cli.name,
        cli.metrics_url,
        response.status()
    );

    Ok(())
}
