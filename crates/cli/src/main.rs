//! CLI entrypoint for the product catalog.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use catalog_core::{Catalog, CatalogConfig, MetadataPatch, NewProduct, ProductId};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "Product catalog: keyword search with fallback ranking", long_about = None)]
struct Cli {
    /// Config file (default: search standard locations)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for products
    Search {
        query: String,
        #[arg(long)]
        json: bool,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Create a product from a JSON payload (`-` reads stdin)
    Create {
        payload: String,
    },
    /// Update product metadata from a JSON payload (`-` reads stdin)
    UpdateMetadata {
        payload: String,
    },
    /// Push every product into the search index
    Reindex {
        /// Recreate the index before pushing
        #[arg(long)]
        fresh: bool,
    },
    /// Write a commented default config file
    InitConfig {
        path: Option<PathBuf>,
    },
}

#[derive(Deserialize)]
struct MetadataUpdate {
    #[serde(rename = "productId")]
    product_id: ProductId,
    #[serde(rename = "Metadata", default)]
    metadata: MetadataPatch,
}

fn read_payload(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))
    }
}

fn load_config(path: Option<&Path>) -> Result<CatalogConfig> {
    match path {
        Some(path) => CatalogConfig::load_from(path),
        None => CatalogConfig::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Commands::InitConfig { path } = &cli.command {
        let path = match path.clone().or_else(CatalogConfig::default_config_path) {
            Some(path) => path,
            None => anyhow::bail!("No config directory on this platform; pass a PATH"),
        };
        if path.exists() {
            anyhow::bail!("Config already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, CatalogConfig::generate_default_config())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote config to {}", path.display());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let catalog = Catalog::open(&config)?;

    match cli.command {
        Commands::Search { query, json, limit } => {
            let limit = limit.unwrap_or(config.search.results_limit);
            let results = catalog.search_limited(&query, limit).await?;
            if json {
                println!("{}", serde_json::json!({ "data": results }));
            } else if results.is_empty() {
                println!("No results.");
            } else {
                for (i, r) in results.iter().enumerate() {
                    println!(
                        "{}. [{}] {}  {:.2} (mrp {:.2})  rating {:.1}  stock {}",
                        i + 1,
                        r.product_id,
                        r.title,
                        r.selling_price,
                        r.mrp,
                        r.rating,
                        r.stock
                    );
                }
            }
        }
        Commands::Create { payload } => {
            let new: NewProduct = serde_json::from_str(&read_payload(&payload)?)
                .context("Invalid product payload")?;
            let product = catalog.create_product(new)?;
            println!("{}", serde_json::json!({ "productId": product.id }));
        }
        Commands::UpdateMetadata { payload } => {
            let update: MetadataUpdate = serde_json::from_str(&read_payload(&payload)?)
                .context("Invalid metadata payload")?;
            let product = catalog.update_metadata(update.product_id, update.metadata)?;
            println!(
                "{}",
                serde_json::json!({ "productId": product.id, "Metadata": product.metadata })
            );
        }
        Commands::Reindex { fresh } => {
            let report = catalog.reindex(fresh).await?;
            if report.indexed < report.products {
                log::warn!("{} of {} products not indexed", report.products - report.indexed, report.products);
            }
            println!("Reindexed {} products.", report.indexed);
        }
        Commands::InitConfig { .. } => {}
    }

    // Let queued index writes land before the runtime shuts down
    catalog.flush().await;
    Ok(())
}
