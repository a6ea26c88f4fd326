//! CLI commands

use crate::catalog::SortOrder;
use crate::config::CatalogConfig;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Movie catalog CLI
#[derive(Parser)]
#[command(name = "movie-catalog")]
#[command(about = "Browse a movie catalog through a caching client")]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Catalog API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Snapshot time-to-live in seconds
    #[arg(long, global = true)]
    pub ttl_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Command line flags win over file and environment settings
    pub fn apply_to(&self, config: &mut CatalogConfig) {
        if let Some(url) = &self.base_url {
            config.api_base_url = url.clone();
        }
        if let Some(ttl) = self.ttl_secs {
            config.ttl_secs = ttl;
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List movies, optionally within one genre
    List {
        /// Genre name, case-insensitive
        #[arg(short, long)]
        genre: Option<String>,
        /// Rating order
        #[arg(short, long, value_enum, default_value_t = SortOrder::Desc)]
        sort: SortOrder,
    },
    /// Show one movie
    Show {
        /// Movie slug
        slug: String,
    },
    /// Search titles, directors and descriptions
    Search {
        query: String,
    },
    /// List genres
    Genres,
    /// Featured movie of the day
    Featured {
        /// Day to select for (YYYY-MM-DD), today by default
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// A random movie
    Random,
    /// Reviews of a movie and its resulting rating
    Reviews {
        /// Movie ID
        id: u64,
    },
    /// Cache state as JSON
    Inspect,
}
