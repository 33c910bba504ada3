//! `scheduler-admin`: a thin HTTP client over `scheduler-http`'s
//! routes, grounded on `task-queue-cli`'s `clap` subcommand layout.

mod commands;

use anyhow::{bail, Result};
use commands::{Cli, Commands};
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let client = reqwest::Client::new();
    let base = cli.base_url.trim_end_matches('/').to_string();

    let response = match cli.command {
        Commands::Submit {
            model_id,
            task_type,
            input,
            priority,
        } => {
            client
                .post(format!("{base}/tasks"))
                .json(&json!({"model_id": model_id, "task_type": task_type, "input": input, "priority": priority}))
                .send()
                .await?
        }
        Commands::Get { task_id } => client.get(format!("{base}/tasks/{task_id}")).send().await?,
        Commands::List {
            status,
            model_id,
            page,
            size,
        } => {
            let mut req = client.get(format!("{base}/tasks")).query(&[("page", page), ("size", size)]);
            if let Some(status) = status {
                req = req.query(&[("status", status)]);
            }
            if let Some(model_id) = model_id {
                req = req.query(&[("model_id", model_id)]);
            }
            req.send().await?
        }
        Commands::Cancel { task_id } => client.delete(format!("{base}/tasks/{task_id}")).send().await?,
        Commands::Retry { task_id } => client.post(format!("{base}/tasks/{task_id}/retry")).send().await?,
        Commands::Stats => client.get(format!("{base}/tasks/stats")).send().await?,
        Commands::CreateModel {
            name,
            model_type,
            max_workers,
        } => {
            client
                .post(format!("{base}/models"))
                .json(&json!({"name": name, "model_type": model_type, "max_workers": max_workers}))
                .send()
                .await?
        }
        Commands::Models => client.get(format!("{base}/models")).send().await?,
        Commands::Model { model_id } => client.get(format!("{base}/models/{model_id}")).send().await?,
        Commands::DeleteModel { model_id } => client.delete(format!("{base}/models/{model_id}")).send().await?,
        Commands::SetModelStatus { model_id, status } => {
            client
                .put(format!("{base}/models/{model_id}/status"))
                .json(&json!({"status": status}))
                .send()
                .await?
        }
        Commands::Dashboard => client.get(format!("{base}/stats/dashboard")).send().await?,
        Commands::Health => client.get(format!("{base}/system/health")).send().await?,
        Commands::Info => client.get(format!("{base}/system/info")).send().await?,
    };

    let status = response.status();
    let body: Value = response.json().await.unwrap_or_else(|_| json!({}));
    println!("{}", serde_json::to_string_pretty(&body)?);

    if !status.is_success() {
        bail!("request failed with status {status}");
    }
    Ok(())
}
