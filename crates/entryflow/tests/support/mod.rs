//! Shared helpers for manager integration tests.

pub mod handlers;

use std::sync::Arc;

use entryflow::{
    FlowHandler, FlowManager, FlowResult, Form, HandlerRegistry, MemoryEntryStore, StepResult,
};

/// Manager over a fresh registry with a single registered domain.
pub fn manager_with<F>(domain: &str, factory: F) -> FlowManager<MemoryEntryStore>
where
    F: Fn() -> Box<dyn FlowHandler> + Send + Sync + 'static,
{
    let registry = Arc::new(HandlerRegistry::new());
    registry.register(domain, factory);
    FlowManager::new(registry, MemoryEntryStore::new())
}

/// Unwrap a form result or panic with the unexpected variant.
pub fn as_form(result: &FlowResult) -> &Form {
    match &result.result {
        StepResult::Form(form) => form,
        other => panic!("expected form, got {other:?}"),
    }
}
