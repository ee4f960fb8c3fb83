//! Page-text extraction for uploaded files.
//!
//! PDF pages go through `pdf-extract`; plain text and Markdown pass
//! through as a single page. Extraction runs on the blocking thread
//! pool since PDF parsing is CPU-bound.

use async_trait::async_trait;

use ragpipe_core::error::RagError;
use ragpipe_core::extract::PageExtractor;
use ragpipe_core::models::PageContent;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";

/// Guess a supported content type from a file name.
pub fn content_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next().map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "pdf" => MIME_PDF,
        Some(ext) if ext == "md" || ext == "markdown" => MIME_MARKDOWN,
        _ => MIME_TEXT,
    }
}

/// Extracts page-numbered text from uploaded bytes, dispatching on
/// content type.
pub struct FileExtractor;

#[async_trait]
impl PageExtractor for FileExtractor {
    async fn extract_pages(
        &self,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<Vec<PageContent>, RagError> {
        match content_type {
            MIME_PDF => extract_pdf(bytes.to_vec()).await,
            MIME_TEXT | MIME_MARKDOWN => extract_plain_text(bytes),
            other => Err(RagError::Extraction(format!(
                "unsupported content type: {other}"
            ))),
        }
    }
}

async fn extract_pdf(bytes: Vec<u8>) -> Result<Vec<PageContent>, RagError> {
    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    })
    .await
    .map_err(|e| RagError::Extraction(format!("extraction task panicked: {e}")))?
    .map_err(|e| RagError::Extraction(format!("PDF extraction failed: {e}")))?;

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageContent {
            page_number: i as i64 + 1,
            text,
        })
        .collect())
}

fn extract_plain_text(bytes: &[u8]) -> Result<Vec<PageContent>, RagError> {
    let text = String::from_utf8_lossy(bytes).into_owned();
    Ok(vec![PageContent {
        page_number: 1,
        text,
    }])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for("report.pdf"), MIME_PDF);
        assert_eq!(content_type_for("Report.PDF"), MIME_PDF);
        assert_eq!(content_type_for("notes.md"), MIME_MARKDOWN);
        assert_eq!(content_type_for("readme"), MIME_TEXT);
        assert_eq!(content_type_for("data.txt"), MIME_TEXT);
    }

    #[tokio::test]
    async fn plain_text_is_one_page() {
        let pages = FileExtractor
            .extract_pages(b"hello\nworld", MIME_TEXT)
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[0].text, "hello\nworld");
    }

    #[tokio::test]
    async fn unsupported_content_type_fails_extraction() {
        let err = FileExtractor
            .extract_pages(b"GIF89a", "image/gif")
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Extraction(_)));
    }

    #[tokio::test]
    async fn garbage_pdf_fails_extraction() {
        let err = FileExtractor
            .extract_pages(b"not a pdf at all", MIME_PDF)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Extraction(_)));
    }
}
