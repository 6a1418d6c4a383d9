//! Handlers for the backend's auxiliary endpoints.

use anyhow::{Result, bail};
use kgx_core::api::ApiClient;
use kgx_core::config::Config;

fn client(config: &Config) -> Result<ApiClient> {
    ApiClient::new(config.resolve_base_url()?, config.connect_timeout())
}

pub async fn health(config: &Config) -> Result<()> {
    let client = client(config)?;
    if !client.health().await {
        bail!("backend at {} is not healthy", client.base_url());
    }
    println!("Backend at {} is healthy", client.base_url());
    Ok(())
}

pub async fn info(config: &Config) -> Result<()> {
    let info = client(config)?.system_info().await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

pub async fn samples(config: &Config) -> Result<()> {
    let samples = client(config)?.sample_queries().await?;
    if samples.queries.is_empty() {
        println!("No sample queries available");
        return Ok(());
    }

    let mut categories = samples.categories.clone();
    for query in &samples.queries {
        if !categories.contains(&query.category) {
            categories.push(query.category.clone());
        }
    }
    for category in &categories {
        let in_category: Vec<_> = samples
            .queries
            .iter()
            .filter(|q| &q.category == category)
            .collect();
        if in_category.is_empty() {
            continue;
        }
        println!("{category}");
        for sample in in_category {
            println!("  {}", sample.title);
            println!("    {}", sample.query);
            if let Some(description) = &sample.description {
                println!("    ({description})");
            }
        }
    }
    Ok(())
}
