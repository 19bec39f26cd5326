use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Base directory holding config.yaml
    #[clap(long, default_value = ".")]
    pub base_dir: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP service
    Daemon {},

    /// Drive the batch re-index job page by page until the catalog is
    /// exhausted
    Reindex {
        /// Listings per page (config default when omitted)
        #[clap(long)]
        page_size: Option<usize>,

        /// Offset to resume from
        #[clap(long, default_value = "0")]
        offset: usize,
    },

    /// Run one semantic search and print the JSON outcome
    Search {
        /// Free-text query
        query: String,

        /// Maximum results (1..=120)
        #[clap(short, long)]
        limit: Option<usize>,

        /// Minimum similarity [0.0, 1.0]
        #[clap(long)]
        min_similarity: Option<f32>,
    },
}
