use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    cache::{CacheStore, derive_key},
    dispatch::{
        error::DispatchError,
        registry::ToolHandler,
    },
};

pub const FILE_SUMMARY_TOOL: &str = "file_summary";

const FILE_SUMMARY_CONSUMER: &str = "file_summary";

/// The summarization collaborator behind the file summary tool. Ingestion,
/// OCR, and the summarizing model all live on the far side of this trait.
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    async fn summarize(&self, target: &str) -> Result<String, DispatchError>;
}

/// Fetches a condensed view of one source document, consulting the cache
/// before calling the summarization backend and writing the result back on a
/// miss. A failed cache write degrades to a log line; the summary is still
/// returned.
pub struct FileSummaryTool {
    cache: Arc<CacheStore>,
    backend: Arc<dyn SummaryBackend>,
}

impl FileSummaryTool {
    pub fn new(cache: Arc<CacheStore>, backend: Arc<dyn SummaryBackend>) -> Self {
        Self { cache, backend }
    }
}

#[async_trait]
impl ToolHandler for FileSummaryTool {
    async fn fetch(&self, target: &str) -> Result<String, DispatchError> {
        let key = derive_key(target, FILE_SUMMARY_CONSUMER);
        if let Some(entry) = self.cache.get(&key) {
            tracing::debug!(target: "dispatch", %target, "file_summary_cache_hit");
            return Ok(entry.content);
        }

        let summary = self.backend.summarize(target).await?;
        if let Err(err) = self.cache.put(&key, &summary) {
            tracing::warn!(
                target: "dispatch",
                %target,
                error = %err,
                "file_summary_cache_write_failed"
            );
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        sync::{
            Arc,
            atomic::{AtomicU32, Ordering},
        },
    };

    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::{
        cache::CacheStore,
        config::CacheConfig,
        dispatch::{error::DispatchError, registry::ToolHandler},
    };

    use super::{FileSummaryTool, SummaryBackend};

    struct CountingBackend {
        calls: AtomicU32,
    }

    #[async_trait]
    impl SummaryBackend for CountingBackend {
        async fn summarize(&self, target: &str) -> Result<String, DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("summary of {target}"))
        }
    }

    #[tokio::test]
    async fn repeated_fetches_hit_the_cache() {
        let dir = std::env::temp_dir().join(format!("lexscore-tool-test-{}", Uuid::now_v7()));
        let cache = Arc::new(CacheStore::new(&CacheConfig {
            dir: dir.clone(),
            partition_count: 2,
        }));
        let backend = Arc::new(CountingBackend {
            calls: AtomicU32::new(0),
        });
        let tool = FileSummaryTool::new(cache, Arc::clone(&backend) as Arc<dyn SummaryBackend>);

        let first = tool.fetch("cases/depo-001.pdf").await.expect("fetch should succeed");
        let second = tool.fetch("cases/depo-001.pdf").await.expect("fetch should succeed");
        assert_eq!(first, "summary of cases/depo-001.pdf");
        assert_eq!(first, second);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        let _ = fs::remove_dir_all(&dir);
    }
}
