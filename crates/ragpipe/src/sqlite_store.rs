//! SQLite-backed [`DocumentStore`] implementation.
//!
//! Documents and chunks live in two tables; embeddings are stored
//! inline on the chunk rows as little-endian f32 BLOBs. Vector search
//! is brute-force cosine similarity computed in Rust over all embedded
//! chunks, which is fine for the corpus sizes a single SQLite file holds.
//!
//! `save_chunks` runs in one transaction: a mid-batch failure rolls
//! the whole document back, so the store never holds a partial chunk
//! set. Faults are logged and reported per the store contract
//! (`false` / `None` / empty), never raised.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use ragpipe_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use ragpipe_core::models::{Document, DocumentChunk, DocumentStatus, SearchResult};
use ragpipe_core::store::DocumentStore;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn try_save_chunks(&self, document: &Document) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        // A document row only exists after a successful save, so the
        // persisted status is always `completed`.
        sqlx::query(
            r#"
            INSERT INTO documents (id, file_name, content_type, file_size, uploaded_at, status)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                file_name = excluded.file_name,
                content_type = excluded.content_type,
                file_size = excluded.file_size,
                uploaded_at = excluded.uploaded_at,
                status = excluded.status
            "#,
        )
        .bind(&document.id)
        .bind(&document.file_name)
        .bind(&document.content_type)
        .bind(document.file_size as i64)
        .bind(document.uploaded_at.timestamp())
        .bind(DocumentStatus::Completed.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(&document.id)
            .execute(&mut *tx)
            .await?;

        for chunk in &document.chunks {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, document_id, chunk_index, page_number, text, metadata_json, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index)
            .bind(chunk.page_number)
            .bind(&chunk.text)
            .bind(serde_json::to_string(&chunk.metadata)?)
            .bind(chunk.embedding.as_ref().map(|v| vec_to_blob(v)))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn try_get_document(&self, document_id: &str) -> anyhow::Result<Option<Document>> {
        let rows = sqlx::query(
            "SELECT id, document_id, chunk_index, page_number, text, metadata_json, embedding
             FROM chunks WHERE document_id = ?
             ORDER BY page_number, chunk_index",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }
        let chunks: Vec<DocumentChunk> = rows.iter().map(row_to_chunk).collect();

        let doc_row = sqlx::query(
            "SELECT file_name, content_type, file_size, uploaded_at, status
             FROM documents WHERE id = ?",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        let mut document = match doc_row {
            Some(row) => Document {
                id: document_id.to_string(),
                file_name: row.get("file_name"),
                content_type: row.get("content_type"),
                file_size: row.get::<i64, _>("file_size") as u64,
                uploaded_at: chrono::DateTime::from_timestamp(row.get("uploaded_at"), 0)
                    .unwrap_or(chrono::DateTime::<chrono::Utc>::UNIX_EPOCH),
                status: row
                    .get::<String, _>("status")
                    .parse()
                    .unwrap_or(DocumentStatus::Completed),
                chunks: Vec::new(),
            },
            None => {
                let mut d = Document::new("", "", 0);
                d.id = document_id.to_string();
                d.status = DocumentStatus::Completed;
                d
            }
        };
        document.chunks = chunks;
        Ok(Some(document))
    }
}

fn row_to_chunk(row: &SqliteRow) -> DocumentChunk {
    let metadata: HashMap<String, serde_json::Value> =
        serde_json::from_str(&row.get::<String, _>("metadata_json")).unwrap_or_default();
    let embedding: Option<Vec<u8>> = row.get("embedding");

    DocumentChunk {
        id: row.get("id"),
        document_id: row.get("document_id"),
        chunk_index: row.get("chunk_index"),
        page_number: row.get("page_number"),
        text: row.get("text"),
        embedding: embedding.map(|blob| blob_to_vec(&blob)),
        metadata,
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn save_chunks(&self, document: &Document) -> bool {
        match self.try_save_chunks(document).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(document_id = %document.id, error = %err, "save_chunks failed");
                false
            }
        }
    }

    async fn delete_document(&self, document_id: &str) -> bool {
        let result = async {
            sqlx::query("DELETE FROM chunks WHERE document_id = ?")
                .bind(document_id)
                .execute(&self.pool)
                .await?;
            sqlx::query("DELETE FROM documents WHERE id = ?")
                .bind(document_id)
                .execute(&self.pool)
                .await?;
            anyhow::Ok(())
        }
        .await;

        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(document_id, error = %err, "delete_document failed");
                false
            }
        }
    }

    async fn get_document(&self, document_id: &str) -> Option<Document> {
        match self.try_get_document(document_id).await {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(document_id, error = %err, "get_document failed");
                None
            }
        }
    }

    async fn get_all_documents(&self) -> Vec<Document> {
        let ids: Vec<String> = match sqlx::query_scalar(
            "SELECT DISTINCT document_id FROM chunks ORDER BY document_id",
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(ids) => ids,
            Err(err) => {
                tracing::warn!(error = %err, "get_all_documents failed");
                return Vec::new();
            }
        };

        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self.get_document(&id).await {
                documents.push(doc);
            }
        }
        documents
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Vec<SearchResult> {
        let rows = match sqlx::query(
            "SELECT id, document_id, chunk_index, page_number, text, metadata_json, embedding
             FROM chunks WHERE embedding IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(error = %err, "vector search failed");
                return Vec::new();
            }
        };

        let mut results: Vec<SearchResult> = rows
            .iter()
            .filter_map(|row| {
                let chunk = row_to_chunk(row);
                let score = cosine_similarity(query_vector, chunk.embedding.as_ref()?);
                (score >= min_score).then_some(SearchResult { chunk, score })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        results
    }
}
