//! Knowledge Base Ingestion
//!
//! Pages and documents the agent can draw on. Ingestion itself is done by a
//! [`KnowledgeIngestor`]; [`KnowledgeBase`] tracks what has been indexed and
//! whether a crawl is running.
//!
//! ```text
//!  crawl(url) ──▶ spawn ──▶ ingestor.ingest(Url) ──ok──▶ prepend IndexedPage
//!                  │                             └─err─▶ pages unchanged
//!                  └─ crawling flag held until the task finishes
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;

/// Something to add to the knowledge base
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KnowledgeResource {
    /// A local document
    File(PathBuf),
    /// A web page to crawl
    Url(String),
}

impl std::fmt::Display for KnowledgeResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Acknowledgement from the ingestion service
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReceipt {
    /// Identifier assigned by the service, when it reports one
    #[serde(default)]
    pub document_id: Option<String>,
}

/// Errors from ingestion
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// Blank URL
    #[error("url is empty")]
    EmptyUrl,

    /// A crawl is already running
    #[error("a crawl is already in progress")]
    CrawlInProgress,

    /// Local file could not be read
    #[error("could not read {path}: {message}")]
    Io {
        /// File that failed
        path: String,
        /// Underlying error
        message: String,
    },

    /// Could not reach the service
    #[error("ingestion transport error: {0}")]
    Transport(String),

    /// Service answered with a non-success HTTP status
    #[error("ingestion service returned HTTP {0}")]
    Status(u16),

    /// Service refused the resource
    #[error("ingestion rejected: {0}")]
    Rejected(String),

    /// Crawl task ended without a result
    #[error("crawl task aborted")]
    Aborted,
}

/// Knowledge ingestion collaborator
#[async_trait]
pub trait KnowledgeIngestor: Send + Sync {
    /// Add `resource` to knowledge base `knowledge_base_id`
    async fn ingest(
        &self,
        resource: KnowledgeResource,
        knowledge_base_id: &str,
    ) -> Result<IngestReceipt, IngestError>;
}

#[async_trait]
impl<T: KnowledgeIngestor + ?Sized> KnowledgeIngestor for Arc<T> {
    async fn ingest(
        &self,
        resource: KnowledgeResource,
        knowledge_base_id: &str,
    ) -> Result<IngestReceipt, IngestError> {
        (**self).ingest(resource, knowledge_base_id).await
    }
}

#[derive(Serialize)]
struct UrlRequest<'a> {
    url: &'a str,
    knowledge_base_id: &'a str,
}

#[derive(Deserialize)]
struct IngestEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    document_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Ingestor speaking to an HTTP ingestion service.
///
/// URLs are posted as JSON to `{endpoint}/urls`; files are posted as raw
/// bytes to `{endpoint}/files`.
#[derive(Clone, Debug)]
pub struct HttpIngestor {
    endpoint: String,
    http_client: reqwest::Client,
}

impl HttpIngestor {
    /// Create an ingestor for the given base endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint: String = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    async fn read_envelope(response: reqwest::Response) -> Result<IngestReceipt, IngestError> {
        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Status(status.as_u16()));
        }
        let envelope: IngestEnvelope = response
            .json()
            .await
            .map_err(|e| IngestError::Transport(e.to_string()))?;
        if !envelope.success {
            return Err(IngestError::Rejected(
                envelope.error.unwrap_or_else(|| "unspecified".to_string()),
            ));
        }
        Ok(IngestReceipt {
            document_id: envelope.document_id,
        })
    }
}

#[async_trait]
impl KnowledgeIngestor for HttpIngestor {
    async fn ingest(
        &self,
        resource: KnowledgeResource,
        knowledge_base_id: &str,
    ) -> Result<IngestReceipt, IngestError> {
        let request = match &resource {
            KnowledgeResource::Url(url) => self
                .http_client
                .post(format!("{}/urls", self.endpoint))
                .json(&UrlRequest {
                    url,
                    knowledge_base_id,
                }),
            KnowledgeResource::File(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| IngestError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.http_client
                    .post(format!("{}/files", self.endpoint))
                    .query(&[("knowledge_base_id", knowledge_base_id), ("filename", filename.as_str())])
                    .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                    .body(bytes)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| IngestError::Transport(e.to_string()))?;

        let receipt = Self::read_envelope(response).await?;
        tracing::debug!(resource = %resource, knowledge_base_id, "Resource ingested");
        Ok(receipt)
    }
}

/// A crawled page in the knowledge base
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedPage {
    /// Page address
    pub url: String,
    /// When it was last indexed
    pub last_updated: DateTime<Utc>,
}

/// Releases the crawling flag when the crawl task ends
struct CrawlGuard(Arc<AtomicBool>);

impl Drop for CrawlGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Indexed pages plus the ingestion collaborator
pub struct KnowledgeBase<I> {
    ingestor: Arc<I>,
    knowledge_base_id: String,
    pages: Arc<RwLock<Vec<IndexedPage>>>,
    crawling: Arc<AtomicBool>,
}

impl<I: KnowledgeIngestor + 'static> KnowledgeBase<I> {
    /// Empty knowledge base
    pub fn new(ingestor: I, knowledge_base_id: impl Into<String>) -> Self {
        Self {
            ingestor: Arc::new(ingestor),
            knowledge_base_id: knowledge_base_id.into(),
            pages: Arc::new(RwLock::new(Vec::new())),
            crawling: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start with already indexed pages (newest first)
    #[must_use]
    pub fn with_pages(self, pages: Vec<IndexedPage>) -> Self {
        *self.pages.write() = pages;
        self
    }

    /// Knowledge base identifier
    #[must_use]
    pub fn knowledge_base_id(&self) -> &str {
        &self.knowledge_base_id
    }

    /// Indexed pages, newest first
    #[must_use]
    pub fn pages(&self) -> Vec<IndexedPage> {
        self.pages.read().clone()
    }

    /// Whether a crawl is running
    #[must_use]
    pub fn is_crawling(&self) -> bool {
        self.crawling.load(Ordering::Acquire)
    }

    /// Start crawling `url` in the background.
    ///
    /// The page is listed once the ingestor accepts it. Await the returned
    /// handle to observe the outcome.
    pub fn crawl(
        &self,
        url: &str,
    ) -> Result<JoinHandle<Result<IngestReceipt, IngestError>>, IngestError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(IngestError::EmptyUrl);
        }
        if self
            .crawling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(IngestError::CrawlInProgress);
        }
        let guard = CrawlGuard(Arc::clone(&self.crawling));

        let url = url.to_string();
        let ingestor = Arc::clone(&self.ingestor);
        let pages = Arc::clone(&self.pages);
        let knowledge_base_id = self.knowledge_base_id.clone();

        tracing::info!(url = %url, "Crawl started");
        Ok(tokio::spawn(async move {
            let _guard = guard;
            let result = ingestor
                .ingest(KnowledgeResource::Url(url.clone()), &knowledge_base_id)
                .await;
            match &result {
                Ok(_) => {
                    pages.write().insert(
                        0,
                        IndexedPage {
                            url: url.clone(),
                            last_updated: Utc::now(),
                        },
                    );
                    tracing::info!(url = %url, "Crawl finished");
                }
                Err(e) => tracing::warn!(url = %url, error = %e, "Crawl failed"),
            }
            result
        }))
    }

    /// Ingest a local document
    pub async fn upload(&self, path: &Path) -> Result<IngestReceipt, IngestError> {
        let result = self
            .ingestor
            .ingest(KnowledgeResource::File(path.to_path_buf()), &self.knowledge_base_id)
            .await;
        match &result {
            Ok(_) => tracing::info!(path = %path.display(), "Document uploaded"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Upload failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio::sync::Notify;

    /// Records resources and waits for a go signal before answering
    struct GatedIngestor {
        gate: Arc<Notify>,
        seen: Mutex<Vec<KnowledgeResource>>,
        fail: bool,
    }

    impl GatedIngestor {
        fn new(fail: bool) -> Self {
            Self {
                gate: Arc::new(Notify::new()),
                seen: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl KnowledgeIngestor for GatedIngestor {
        async fn ingest(
            &self,
            resource: KnowledgeResource,
            _knowledge_base_id: &str,
        ) -> Result<IngestReceipt, IngestError> {
            self.seen.lock().push(resource);
            self.gate.notified().await;
            if self.fail {
                Err(IngestError::Status(500))
            } else {
                Ok(IngestReceipt::default())
            }
        }
    }

    #[tokio::test]
    async fn test_crawl_prepends_page() {
        let ingestor = GatedIngestor::new(false);
        let gate = Arc::clone(&ingestor.gate);
        let kb = KnowledgeBase::new(ingestor, "kb").with_pages(vec![IndexedPage {
            url: "https://example.com/old".to_string(),
            last_updated: Utc::now(),
        }]);

        let handle = kb.crawl("  https://example.com/new ").unwrap();
        assert!(kb.is_crawling());
        assert!(matches!(kb.crawl("https://example.com/other"), Err(IngestError::CrawlInProgress)));

        gate.notify_one();
        handle.await.unwrap().unwrap();

        assert!(!kb.is_crawling());
        let urls: Vec<_> = kb.pages().into_iter().map(|p| p.url).collect();
        assert_eq!(urls, vec!["https://example.com/new", "https://example.com/old"]);
    }

    #[tokio::test]
    async fn test_failed_crawl_leaves_pages() {
        let ingestor = GatedIngestor::new(true);
        let gate = Arc::clone(&ingestor.gate);
        let kb = KnowledgeBase::new(ingestor, "kb");

        let handle = kb.crawl("https://example.com").unwrap();
        gate.notify_one();
        assert_eq!(handle.await.unwrap(), Err(IngestError::Status(500)));
        assert!(kb.pages().is_empty());
        assert!(!kb.is_crawling());
    }

    #[test]
    fn test_empty_url_rejected() {
        let kb = KnowledgeBase::new(GatedIngestor::new(false), "kb");
        assert_eq!(kb.crawl("   ").unwrap_err(), IngestError::EmptyUrl);
        assert!(!kb.is_crawling());
    }

    #[tokio::test]
    async fn test_upload_does_not_list_page() {
        let ingestor = GatedIngestor::new(false);
        ingestor.gate.notify_one();
        let kb = KnowledgeBase::new(ingestor, "kb");

        kb.upload(Path::new("/tmp/faq.pdf")).await.unwrap();
        assert!(kb.pages().is_empty());
        assert_eq!(
            kb.ingestor.seen.lock().as_slice(),
            &[KnowledgeResource::File(PathBuf::from("/tmp/faq.pdf"))]
        );
    }

    #[tokio::test]
    async fn test_http_missing_file_is_io_error() {
        let ingestor = HttpIngestor::new("http://127.0.0.1:9/knowledge/");
        let err = ingestor
            .ingest(KnowledgeResource::File(PathBuf::from("/nonexistent/omniserve.pdf")), "kb")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Io { .. }));
    }
}
