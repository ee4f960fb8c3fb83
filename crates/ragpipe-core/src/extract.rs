//! Page-text extraction capability trait.
//!
//! Extraction is backend-layer: callers supply raw bytes plus a content
//! type, and get back page-numbered plain text. Concrete extractors
//! (PDF, plain text) live in the `ragpipe` app crate.

use async_trait::async_trait;

use crate::error::RagError;
use crate::models::PageContent;

/// Capability: binary document → ordered page texts.
///
/// Returned page numbers are 1-based and contiguous. Unreadable or
/// unsupported input fails with [`RagError::Extraction`].
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract_pages(
        &self,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<Vec<PageContent>, RagError>;
}
