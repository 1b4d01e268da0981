//! Protocol name to handler lookup.

use crate::error::DirectiveError;
use crate::handlers::{
    AnalyzeHandler, FilesHandler, Handler, MemoryHandler, MonitorHandler, NetworkHandler,
    SearchHandler, SecurityHandler, StateHandler, TerminalHandler,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Registered handlers keyed by protocol name.
#[derive(Default, Clone)]
pub struct ProtocolRegistry {
    handlers: BTreeMap<String, Arc<dyn Handler>>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding all nine built-in handlers. `terminal` is shared
    /// with whoever runs delegated shell directives.
    pub fn with_default_handlers(terminal: Arc<TerminalHandler>) -> Self {
        let mut registry = Self::new();
        registry.register_handler(terminal);
        registry.register_handler(Arc::new(FilesHandler::new()));
        registry.register_handler(Arc::new(MemoryHandler::new()));
        registry.register_handler(Arc::new(NetworkHandler::new()));
        registry.register_handler(Arc::new(SecurityHandler::new()));
        registry.register_handler(Arc::new(MonitorHandler::new()));
        registry.register_handler(Arc::new(StateHandler::new()));
        registry.register_handler(Arc::new(AnalyzeHandler::new()));
        registry.register_handler(Arc::new(SearchHandler::new()));
        registry
    }

    /// Associate `name` with `handler`. An existing handler for the same
    /// name is replaced and returned.
    pub fn register(
        &mut self,
        name: &str,
        handler: Arc<dyn Handler>,
    ) -> Option<Arc<dyn Handler>> {
        let name = name.to_ascii_lowercase();
        let previous = self.handlers.insert(name.clone(), handler);
        if previous.is_some() {
            warn!(protocol = %name, "replacing registered handler");
        } else {
            info!(protocol = %name, "registered handler");
        }
        previous
    }

    /// Register under the handler's own protocol name.
    pub fn register_handler(&mut self, handler: Arc<dyn Handler>) -> Option<Arc<dyn Handler>> {
        let name = handler.protocol();
        self.register(name, handler)
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Handler>, DirectiveError> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| DirectiveError::UnknownProtocol(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered protocol names, sorted.
    pub fn protocols(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolRegistry")
            .field("protocols", &self.protocols())
            .finish()
    }
}
