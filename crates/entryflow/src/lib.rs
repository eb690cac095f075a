//! Multi-step configuration flow engine.
//!
//! Entryflow lets a pluggable handler walk a caller through a setup wizard
//! and, on success, durably register a **configuration entry**:
//!
//! - **String-keyed step dispatch** — a [`FlowHandler`] matches on step
//!   names and returns a [`StepResult`] per step
//! - **Schema-driven forms** — each form carries a [`Schema`] that both
//!   describes its fields on the wire and validates submitted input
//! - **Terminal transitions** — `Abort` and `CreateEntry` end a flow's
//!   lifecycle; `CreateEntry` materializes an entry in the [`EntryStore`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        FlowManager<S: EntryStore>                   │
//! │                                                                     │
//! │   init_flow(domain) ──► HandlerRegistry lookup ──► fresh Flow       │
//! │                                                     │               │
//! │   configure(flow_id, input)                         ▼               │
//! │     1. Look up flow slot (per-flow lock)         step("init")       │
//! │     2. Validate input against active schema         │               │
//! │     3. Merge input into flow context                ▼               │
//! │     4. Dispatch current step          Form | Abort | CreateEntry   │
//! │     5. Form: stay registered, advance cursor                        │
//! │        Terminal: deregister (+ EntryStore::add for CreateEntry)     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use entryflow::{
//!     Field, FieldKind, FlowHandler, FlowManager, Form, HandlerRegistry,
//!     MemoryEntryStore, Schema, StepContext, StepResult,
//! };
//!
//! let registry = Arc::new(HandlerRegistry::new());
//! registry.register("hub", || Box::new(HubSetup::default()));
//!
//! let manager = FlowManager::new(Arc::clone(&registry), MemoryEntryStore::new());
//!
//! let started = manager.init_flow("hub").await?;
//! // ... present the form, collect input ...
//! let finished = manager
//!     .configure(&started.flow_id, Some(json!({"host": "10.0.0.2"})))
//!     .await?;
//! ```
//!
//! The transport layer (HTTP routing, auth) is an external collaborator;
//! [`view`] renders the JSON shapes such a layer serves.

mod error;
mod handler;
mod manager;
mod registry;
mod schema;
mod store;
pub mod view;

pub use error::{FlowError, Result};
pub use handler::{FlowHandler, FlowId, Form, StepContext, StepResult};
pub use manager::{FlowManager, FlowManagerConfig, FlowProgress, FlowResult};
pub use registry::{HandlerFactory, HandlerRegistry};
pub use schema::{Field, FieldDescriptor, FieldKind, Schema, ValidationErrors};
pub use store::{ConfigEntry, EntryStore, FlowSource, MemoryEntryStore};
