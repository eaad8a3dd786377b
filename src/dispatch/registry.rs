use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use crate::dispatch::error::{
    DispatchError, DispatchErrorKind, duplicate_target, registration_conflict, unknown_tool,
};

/// A registered evidence-fetching tool. `target` identifies what the oracle
/// wants fetched (a source document path, a search phrase); the handler is
/// free to interpret it.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn fetch(&self, target: &str) -> Result<String, DispatchError>;
}

/// Explicit registration table built at process start. Names are unique;
/// a target may be fetched at most once per session.
#[derive(Default)]
pub struct ToolDispatcher {
    handlers: RwLock<BTreeMap<String, Arc<dyn ToolHandler>>>,
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        name: &str,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), DispatchError> {
        if name.trim().is_empty() {
            return Err(registration_conflict("tool name cannot be empty"));
        }

        let mut guard = self
            .handlers
            .write()
            .map_err(|_| registration_conflict("dispatcher lock poisoned"))?;
        if guard.contains_key(name) {
            return Err(registration_conflict(format!(
                "tool already registered: '{name}'"
            )));
        }
        guard.insert(name.to_string(), handler);
        Ok(())
    }

    pub fn registered_tools(&self) -> Vec<String> {
        self.handlers
            .read()
            .map(|guard| guard.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Dispatches one tool invocation. `invoked_targets` is the calling
    /// session's record of targets already fetched; a repeat is rejected
    /// before the handler runs so the caller can re-prompt for a different
    /// target instead of aborting.
    pub async fn invoke(
        &self,
        name: &str,
        target: &str,
        invoked_targets: &BTreeSet<String>,
    ) -> Result<String, DispatchError> {
        let handler = {
            let guard = self
                .handlers
                .read()
                .map_err(|_| registration_conflict("dispatcher lock poisoned"))?;
            guard
                .get(name)
                .cloned()
                .ok_or_else(|| unknown_tool(format!("no tool registered under '{name}'")))?
        };

        if invoked_targets.contains(target) {
            return Err(duplicate_target(format!(
                "target '{target}' was already fetched in this session"
            )));
        }

        handler.fetch(target).await.map_err(|err| {
            if err.kind == DispatchErrorKind::ExternalService {
                err
            } else {
                DispatchError::new(
                    DispatchErrorKind::ExternalService,
                    format!("tool '{name}' failed on target '{target}': {err}"),
                )
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, sync::Arc};

    use async_trait::async_trait;

    use crate::dispatch::error::{DispatchError, DispatchErrorKind, external_service};

    use super::{ToolDispatcher, ToolHandler};

    struct StaticTool(&'static str);

    #[async_trait]
    impl ToolHandler for StaticTool {
        async fn fetch(&self, _target: &str) -> Result<String, DispatchError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl ToolHandler for FailingTool {
        async fn fetch(&self, _target: &str) -> Result<String, DispatchError> {
            Err(external_service("backend unreachable"))
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let dispatcher = ToolDispatcher::new();
        dispatcher
            .register("file_summary", Arc::new(StaticTool("ok")))
            .expect("first registration should succeed");
        let err = dispatcher
            .register("file_summary", Arc::new(StaticTool("other")))
            .expect_err("duplicate name should fail");
        assert_eq!(err.kind, DispatchErrorKind::RegistrationConflict);
        assert_eq!(dispatcher.registered_tools(), vec!["file_summary"]);
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let dispatcher = ToolDispatcher::new();
        let err = dispatcher
            .invoke("missing", "doc.pdf", &BTreeSet::new())
            .await
            .expect_err("unregistered tool should fail");
        assert_eq!(err.kind, DispatchErrorKind::UnknownTool);
    }

    #[tokio::test]
    async fn duplicate_target_is_rejected_before_the_handler_runs() {
        let dispatcher = ToolDispatcher::new();
        dispatcher
            .register("file_summary", Arc::new(StaticTool("summary")))
            .expect("registration should succeed");

        let mut invoked = BTreeSet::new();
        invoked.insert("doc.pdf".to_string());
        let err = dispatcher
            .invoke("file_summary", "doc.pdf", &invoked)
            .await
            .expect_err("repeat target should fail");
        assert_eq!(err.kind, DispatchErrorKind::DuplicateTarget);
    }

    #[tokio::test]
    async fn handler_failures_surface_as_external_service_errors() {
        let dispatcher = ToolDispatcher::new();
        dispatcher
            .register("file_summary", Arc::new(FailingTool))
            .expect("registration should succeed");

        let err = dispatcher
            .invoke("file_summary", "doc.pdf", &BTreeSet::new())
            .await
            .expect_err("handler failure should surface");
        assert_eq!(err.kind, DispatchErrorKind::ExternalService);
        assert!(err.message.contains("backend unreachable"));
    }
}
