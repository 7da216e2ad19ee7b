//! Remote service clients.

pub mod bioc;
pub mod idconv;

use async_trait::async_trait;
use crate::models::FetchedDocument;

/// Maps a PMID to its PMC archive identifier.
#[async_trait]
pub trait IdResolver: Send + Sync {
    /// Returns `None` when the service knows no PMCID for `pmid`.
    async fn resolve(&self, pmid: &str) -> Option<String>;
}

/// Retrieves the full text of a PMC article.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Returns `None` on transport failure, parse failure, or an empty passage set.
    async fn fetch(&self, pmcid: &str) -> Option<FetchedDocument>;
}
