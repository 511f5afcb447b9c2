//! Backend collaborator contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::core::error::SourceError;
use crate::domain::Post;

/// Order in which the backend returns items. Ranking itself is the backend's business.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Trending,
}

/// An offset-paged query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub page_size: usize,
    pub sort: SortOrder,
}

impl PageRequest {
    pub fn new(offset: usize, page_size: usize, sort: SortOrder) -> Self {
        Self {
            offset,
            page_size,
            sort,
        }
    }

    /// Index of this page when the store is paged in `page_size` steps
    pub fn page_index(&self) -> usize {
        self.offset / self.page_size.max(1)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageResponse {
    pub items: Vec<Post>,
    pub total_count: Option<usize>,
}

/// Paged access to the content backend.
///
/// The backend cannot apply search or filters; it only pages through
/// content in the requested order.
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResponse, SourceError>;
}

#[async_trait]
impl<S> PostSource for std::sync::Arc<S>
where
    S: PostSource + ?Sized,
{
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResponse, SourceError> {
        (**self).fetch_page(request).await
    }
}
