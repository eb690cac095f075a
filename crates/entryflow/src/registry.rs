//! Handler registry: domain identifiers mapped to handler factories.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::info;

use crate::handler::FlowHandler;

/// Factory producing a fresh handler instance per flow.
pub type HandlerFactory = Arc<dyn Fn() -> Box<dyn FlowHandler> + Send + Sync>;

/// Registry mapping configuration domains to handler factories.
///
/// Registrations may happen at any time — including mid-test, which swaps a
/// domain's handler out from under subsequent [`lookup`](Self::lookup)
/// calls — so the map lives behind a lock instead of being frozen at build
/// time. Same-domain registration is last-write-wins. Flows that are
/// already in progress keep the handler instance they were created with.
///
/// The registry carries no ambient global state: construct one and hand it
/// to the manager.
///
/// # Example
///
/// ```ignore
/// let registry = Arc::new(HandlerRegistry::new());
/// registry.register("hue", || Box::new(HueSetup::default()));
///
/// let manager = FlowManager::new(Arc::clone(&registry), MemoryEntryStore::new());
/// ```
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, HandlerFactory>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler factory for a domain, replacing any previous one.
    pub fn register<F>(&self, domain: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn FlowHandler> + Send + Sync + 'static,
    {
        let domain = domain.into();
        let replaced = self
            .write_handlers()
            .insert(domain.clone(), Arc::new(factory))
            .is_some();
        info!(domain = %domain, replaced, "flow handler registered");
    }

    /// Look up the factory registered for a domain.
    ///
    /// Observes the latest registration at the time of the call.
    pub fn lookup(&self, domain: &str) -> Option<HandlerFactory> {
        self.read_handlers().get(domain).cloned()
    }

    /// Remove a domain's registration. Returns whether one was present.
    ///
    /// Mainly for tests that restore a registry to its previous shape.
    pub fn unregister(&self, domain: &str) -> bool {
        self.write_handlers().remove(domain).is_some()
    }

    /// Number of registered domains.
    pub fn len(&self) -> usize {
        self.read_handlers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_handlers().is_empty()
    }

    fn read_handlers(&self) -> RwLockReadGuard<'_, HashMap<String, HandlerFactory>> {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_handlers(&self) -> RwLockWriteGuard<'_, HashMap<String, HandlerFactory>> {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner)
    }
}
