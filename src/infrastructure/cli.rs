use std::path::PathBuf;

use clap::Parser;

use super::source::SortOrder;
use crate::domain::{ContentKind, FilterCriteria};
use crate::utils::version;

/// Page through a feed the way a "Load More" button would
#[derive(Parser, Debug)]
#[command(author, version = version(), about)]
pub struct Cli {
    /// JSON file holding an array of posts
    #[arg(short, long, value_name = "FILE")]
    pub feed: Option<PathBuf>,

    /// Number of generated posts when no feed file is given
    #[arg(long, value_name = "COUNT", default_value_t = 120)]
    pub synthetic: usize,

    /// Free-text search; `#tag` terms match tags
    #[arg(short, long)]
    pub search: Option<String>,

    /// Content kinds to keep (repeatable)
    #[arg(short, long, value_name = "KIND")]
    pub kind: Vec<ContentKind>,

    /// Tags to require (repeatable)
    #[arg(short, long, value_name = "TAG")]
    pub tag: Vec<String>,

    #[arg(short, long)]
    pub author: Option<String>,

    #[arg(long, value_name = "N")]
    pub min_likes: Option<u64>,

    /// How many times to press "Load More"
    #[arg(short, long, value_name = "N", default_value_t = 3)]
    pub pages: usize,

    /// Overrides pagination.page_size from the config
    #[arg(long, value_name = "N")]
    pub page_size: Option<usize>,

    /// Overrides pagination.sort from the config
    #[arg(long)]
    pub sort: Option<SortOrder>,

    /// Simulated backend latency in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub latency: u64,

    /// Print each page as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// The criteria described by the filter flags
    pub fn criteria(&self) -> FilterCriteria {
        let mut criteria = self
            .search
            .as_deref()
            .map(FilterCriteria::search)
            .unwrap_or_default();
        for kind in &self.kind {
            criteria = criteria.with_kind(*kind);
        }
        for tag in &self.tag {
            criteria = criteria.with_tag(tag);
        }
        if let Some(author) = &self.author {
            criteria = criteria.with_author(author);
        }
        if let Some(min_likes) = self.min_likes {
            criteria = criteria.with_min_likes(min_likes);
        }
        criteria
    }
}
