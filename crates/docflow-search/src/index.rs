//! The index itself: a Tantivy `Index` plus a writer guarded by an async `RwLock`, with a
//! background task that periodically commits pending writes (grounded on the retrieval pack's
//! `SearchIndex` — same split between a foreground writer handle and a background committer).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use docflow_util::id::{DocumentId, FolderId, TenantId};
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{doc, Index, IndexWriter, ReloadPolicy, Term, TantivyDocument};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::error::{SearchError, SearchResult};
use crate::model::{DocRef, Page, Pagination, SearchQuery, UpsertDoc};
use crate::schema::{self, Fields};

const WRITER_HEAP_BYTES: usize = 50_000_000;

pub struct SearchIndex {
    index: Arc<Index>,
    writer: Arc<RwLock<IndexWriter>>,
    fields: Fields,
    commit_task: Option<JoinHandle<()>>,
}

impl Drop for SearchIndex {
    fn drop(&mut self) {
        if let Some(task) = self.commit_task.take() {
            task.abort();
        }
    }
}

impl SearchIndex {
    /// Opens an on-disk index at `dir`, creating it with the fixed schema if absent. When
    /// `commit_interval` is `Some`, spawns a background task that commits the writer on that
    /// cadence so callers never block on a commit.
    pub fn open(dir: impl AsRef<Path>, commit_interval: Option<Duration>) -> SearchResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| SearchError::Backend(e.into()))?;

        let (schema, fields) = schema::build();
        let mmap_dir = MmapDirectory::open(dir).map_err(|e| SearchError::Backend(e.into()))?;
        let index = if dir.read_dir().map_err(|e| SearchError::Backend(e.into()))?.next().is_some() {
            Index::open(mmap_dir).map_err(|e| SearchError::Backend(e.into()))?
        } else {
            Index::create(mmap_dir, schema, tantivy::IndexSettings::default())
                .map_err(|e| SearchError::Backend(e.into()))?
        };

        let writer = index
            .writer(WRITER_HEAP_BYTES)
            .map_err(|e| SearchError::Backend(e.into()))?;
        let writer = Arc::new(RwLock::new(writer));

        let commit_task = commit_interval.map(|interval| {
            let writer = writer.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    ticker.tick().await;
                    let mut guard = writer.write().await;
                    if let Err(error) = guard.commit() {
                        tracing::warn!(%error, "search index background commit failed");
                    }
                }
            })
        });

        Ok(Self {
            index: Arc::new(index),
            writer,
            fields,
            commit_task,
        })
    }

    /// Replaces any existing indexed version of `doc.document_id` within `doc.tenant_id`.
    /// The write is staged in the writer's buffer; visibility waits for the next commit
    /// (foreground, via [`Self::commit`], or the background committer).
    pub async fn upsert(&self, doc: UpsertDoc) -> SearchResult<()> {
        let writer = self.writer.write().await;
        writer.delete_term(Term::from_field_text(self.fields.document_id, &doc.document_id.to_string()));

        let metadata_blob = doc
            .metadata
            .iter()
            .map(|pair| format!("{}={}", pair.key, pair.value))
            .collect::<Vec<_>>()
            .join(" ");

        let mut tantivy_doc = doc!(
            self.fields.tenant_id => doc.tenant_id.to_string(),
            self.fields.document_id => doc.document_id.to_string(),
            self.fields.name => doc.name,
            self.fields.content_type => doc.content_type,
            self.fields.text_content => doc.text_content,
            self.fields.metadata => metadata_blob,
            self.fields.created_at => tantivy::DateTime::from_timestamp_secs(doc.created_at.timestamp()),
        );
        if let Some(folder_id) = doc.folder_id {
            tantivy_doc.add_text(self.fields.folder_id, folder_id.to_string());
        }

        writer
            .add_document(tantivy_doc)
            .map_err(|e| SearchError::Backend(e.into()))?;
        Ok(())
    }

    /// Removes `document_id` from the index. Idempotent — deleting an absent term is a no-op.
    pub async fn delete(&self, document_id: DocumentId, _tenant_id: TenantId) -> SearchResult<()> {
        let writer = self.writer.write().await;
        writer.delete_term(Term::from_field_text(self.fields.document_id, &document_id.to_string()));
        Ok(())
    }

    /// Flushes pending writes so they become visible to subsequent searches. Tests call this
    /// directly instead of waiting on the background committer.
    pub async fn commit(&self) -> SearchResult<()> {
        let mut writer = self.writer.write().await;
        writer.commit().map_err(|e| SearchError::Backend(e.into()))?;
        Ok(())
    }

    /// Searches within `tenant_id`, ANDing the mandatory tenant term into whatever the caller
    /// asked for (invariant I8). Rejects a request whose `tenant_id` is the zero id, the only
    /// stand-in this adapter has for "missing" since `TenantId` itself cannot be absent.
    pub fn search(
        &self,
        tenant_id: TenantId,
        query: SearchQuery,
        pagination: Pagination,
    ) -> SearchResult<Page<DocRef>> {
        if tenant_id.as_bytes() == &[0u8; 16] {
            return Err(SearchError::MissingTenant);
        }

        let reader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e: tantivy::TantivyError| SearchError::Backend(e.into()))?;
        let searcher = reader.searcher();

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(
            Occur::Must,
            Box::new(TermQuery::new(
                Term::from_field_text(self.fields.tenant_id, &tenant_id.to_string()),
                IndexRecordOption::Basic,
            )),
        )];

        if let Some(folder_id) = query.folder_scope {
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(
                    Term::from_field_text(self.fields.folder_id, &folder_id.to_string()),
                    IndexRecordOption::Basic,
                )),
            ));
        }

        for pair in &query.metadata_filters {
            let token = format!("{}={}", pair.key, pair.value);
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(
                    Term::from_field_text(self.fields.metadata, &token),
                    IndexRecordOption::Basic,
                )),
            ));
        }

        if let Some(content_query) = query.content_query.as_deref().filter(|s| !s.is_empty()) {
            let parser = QueryParser::for_index(
                &self.index,
                vec![self.fields.text_content, self.fields.name, self.fields.metadata],
            );
            let parsed = parser
                .parse_query(content_query)
                .map_err(|e| SearchError::Backend(e.into()))?;
            clauses.push((Occur::Must, parsed));
        }

        let query = BooleanQuery::new(clauses);
        let fetch = pagination.offset + pagination.limit + 1;
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(fetch))
            .map_err(|e| SearchError::Backend(e.into()))?;

        let mut items = Vec::new();
        let mut has_more = false;
        for (i, (_score, address)) in top_docs.into_iter().enumerate() {
            if i < pagination.offset {
                continue;
            }
            if items.len() == pagination.limit {
                has_more = true;
                break;
            }
            let retrieved: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| SearchError::Backend(e.into()))?;
            items.push(to_doc_ref(&retrieved, &self.fields)?);
        }

        Ok(Page {
            items,
            next_offset: has_more.then_some(pagination.offset + pagination.limit),
        })
    }
}

fn to_doc_ref(doc: &TantivyDocument, fields: &Fields) -> SearchResult<DocRef> {
    let document_id = doc
        .get_first(fields.document_id)
        .and_then(|v| v.as_str())
        .ok_or_else(|| SearchError::Backend(anyhow::anyhow!("indexed document missing document_id")))?
        .parse()
        .map_err(|_| SearchError::Backend(anyhow::anyhow!("indexed document_id is not valid hex")))?;
    let folder_id = doc
        .get_first(fields.folder_id)
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<FolderId>().ok());
    let name = doc
        .get_first(fields.name)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    Ok(DocRef {
        document_id,
        folder_id,
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample(tenant: TenantId, name: &str, text: &str) -> UpsertDoc {
        UpsertDoc {
            document_id: DocumentId::generate(),
            tenant_id: tenant,
            text_content: text.to_string(),
            metadata: vec![],
            folder_id: None,
            name: name.to_string(),
            content_type: "text/plain".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn search_finds_upserted_document_after_commit() {
        let dir = TempDir::new().unwrap();
        let index = SearchIndex::open(dir.path(), None).unwrap();
        let tenant = TenantId::generate();
        let doc = sample(tenant, "quarterly report", "revenue grew in q3");
        let doc_id = doc.document_id;
        index.upsert(doc).await.unwrap();
        index.commit().await.unwrap();

        let page = index
            .search(
                tenant,
                SearchQuery {
                    content_query: Some("revenue".to_string()),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].document_id, doc_id);
    }

    #[tokio::test]
    async fn search_never_crosses_tenant_boundary() {
        let dir = TempDir::new().unwrap();
        let index = SearchIndex::open(dir.path(), None).unwrap();
        let tenant_a = TenantId::generate();
        let tenant_b = TenantId::generate();
        index.upsert(sample(tenant_a, "doc", "shared keyword")).await.unwrap();
        index.commit().await.unwrap();

        let page = index
            .search(
                tenant_b,
                SearchQuery {
                    content_query: Some("shared".to_string()),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn search_rejects_zero_tenant_id() {
        let dir = TempDir::new().unwrap();
        let index = SearchIndex::open(dir.path(), None).unwrap();
        let zero = TenantId::from_bytes([0u8; 16]);
        let result = index.search(zero, SearchQuery::default(), Pagination::default());
        assert!(matches!(result, Err(SearchError::MissingTenant)));
    }

    #[tokio::test]
    async fn delete_then_commit_removes_document_from_results() {
        let dir = TempDir::new().unwrap();
        let index = SearchIndex::open(dir.path(), None).unwrap();
        let tenant = TenantId::generate();
        let doc = sample(tenant, "doc", "ephemeral content");
        let doc_id = doc.document_id;
        index.upsert(doc).await.unwrap();
        index.commit().await.unwrap();

        index.delete(doc_id, tenant).await.unwrap();
        index.commit().await.unwrap();

        let page = index
            .search(
                tenant,
                SearchQuery {
                    content_query: Some("ephemeral".to_string()),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .unwrap();
        assert!(page.items.is_empty());
    }
}
