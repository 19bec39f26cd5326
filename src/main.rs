use std::path::Path;
use std::sync::Arc;

use clap::Parser;

mod cli;
mod config;
mod listings;
mod semantic;
#[cfg(test)]
mod tests;
mod web;

use config::Config;
use listings::{ListingCatalog, RestCatalog};
use semantic::{EmbeddingClient, IndexMaintainer, QueryService, RestStore, SimilarityStore};

struct Components {
    query: Arc<QueryService>,
    maintainer: Arc<IndexMaintainer>,
}

/// Wire the semantic subsystem from configuration. Missing store or catalog
/// credentials leave the corresponding seam empty; callers then see the
/// degraded outcomes instead of startup failures.
fn build_components(config: &Config) -> anyhow::Result<Components> {
    let embeddings = Arc::new(EmbeddingClient::new(config.embedding.clone())?);

    let store: Option<Arc<dyn SimilarityStore>> = match RestStore::new(&config.store) {
        Some(store) => Some(Arc::new(store)),
        None => {
            log::warn!("similarity store is not configured; search will be disabled");
            None
        }
    };

    let catalog: Option<Arc<dyn ListingCatalog>> = match RestCatalog::new(&config.store) {
        Some(catalog) => Some(Arc::new(catalog)),
        None => {
            log::warn!("listing catalog is not configured; batch re-index will fail");
            None
        }
    };

    Ok(Components {
        query: Arc::new(QueryService::new(
            embeddings.clone(),
            store.clone(),
            config.search.clone(),
        )),
        maintainer: Arc::new(IndexMaintainer::new(catalog, embeddings, store)),
    })
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::load_with(Path::new(&args.base_dir));
    let components = build_components(&config)?;

    match args.command {
        cli::Command::Daemon {} => {
            web::start_daemon(web::SharedState {
                query: components.query,
                maintainer: components.maintainer,
                config: Arc::new(config),
            });
            Ok(())
        }

        cli::Command::Reindex { page_size, offset } => {
            let page_size = page_size.unwrap_or(config.reindex.page_size);
            let mut offset = offset;

            loop {
                let report = components.maintainer.reindex_page(offset, page_size)?;
                println!("{}", serde_json::to_string(&report).unwrap());

                if !report.has_more {
                    break;
                }
                offset = report.next_offset;
            }
            Ok(())
        }

        cli::Command::Search {
            query,
            limit,
            min_similarity,
        } => {
            let outcome = components.query.search(&query, limit, min_similarity);
            println!("{}", serde_json::to_string_pretty(&outcome).unwrap());
            Ok(())
        }
    }
}
