//! Flow orchestration: creation, step advancement, termination, and entry
//! materialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{FlowError, Result};
use crate::handler::{FlowHandler, FlowId, Form, StepContext, StepResult};
use crate::registry::HandlerRegistry;
use crate::schema::ValidationErrors;
use crate::store::{ConfigEntry, EntryStore, FlowSource};

/// Configuration for the flow manager.
#[derive(Debug, Clone, Default)]
pub struct FlowManagerConfig {
    /// Log submitted user input at debug level.
    ///
    /// Off by default: wizard input routinely carries credentials.
    pub log_user_input: bool,
}

/// Read-only snapshot of one in-progress flow.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowProgress {
    pub flow_id: FlowId,
    pub domain: String,
    pub current_step: String,
    /// When the flow was created; staleness input for an external watchdog
    /// that expires abandoned flows via [`FlowManager::abandon`].
    pub started_at: OffsetDateTime,
}

/// A step result paired with the flow it belongs to.
///
/// This is the unit a transport serializes; see [`crate::view`].
#[derive(Debug, Clone, PartialEq)]
pub struct FlowResult {
    pub flow_id: FlowId,
    pub result: StepResult,
}

/// Mutable state of one in-progress flow, serialized per flow.
struct FlowState {
    handler: Box<dyn FlowHandler>,
    context: Map<String, Value>,
    last_form: Option<Form>,
    finished: bool,
}

/// One in-progress flow: immutable identity plus locked state.
///
/// `current_step` sits outside the async state lock so progress listings
/// never wait behind an executing step.
struct FlowSlot {
    flow_id: FlowId,
    domain: String,
    source: FlowSource,
    started_at: OffsetDateTime,
    current_step: StdMutex<String>,
    state: Mutex<FlowState>,
}

impl FlowSlot {
    fn current_step(&self) -> String {
        self.current_step
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_current_step(&self, step_id: &str) {
        *self
            .current_step
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = step_id.to_owned();
    }
}

/// Orchestrates configuration flows for registered domains.
///
/// The manager owns the in-progress flow registry and delegates entry
/// creation to the injected [`EntryStore`]. Flows for distinct flow ids
/// proceed concurrently; step executions for the same flow id are
/// serialized by a per-flow lock, and the registry lock is never held
/// across an await.
pub struct FlowManager<S: EntryStore> {
    registry: Arc<HandlerRegistry>,
    store: S,
    config: FlowManagerConfig,
    in_progress: StdMutex<HashMap<FlowId, Arc<FlowSlot>>>,
}

impl<S: EntryStore> FlowManager<S> {
    /// Create a manager with default configuration.
    pub fn new(registry: Arc<HandlerRegistry>, store: S) -> Self {
        Self::with_config(registry, store, FlowManagerConfig::default())
    }

    /// Create a manager with explicit configuration.
    pub fn with_config(
        registry: Arc<HandlerRegistry>,
        store: S,
        config: FlowManagerConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
            in_progress: StdMutex::new(HashMap::new()),
        }
    }

    /// Returns the manager configuration.
    pub fn config(&self) -> &FlowManagerConfig {
        &self.config
    }

    /// Returns the entry store handle.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start a user-initiated flow for a domain.
    ///
    /// Looks up the domain's handler (`UnknownHandler` on miss), registers
    /// a fresh flow and dispatches its `"init"` step. A handler without an
    /// `"init"` step fails with `UnknownStep` and the flow is deregistered
    /// again — a flow that never produced a form must not linger.
    pub async fn init_flow(&self, domain: &str) -> Result<FlowResult> {
        self.init_flow_from(domain, FlowSource::User, None).await
    }

    /// Start a flow with an explicit source and optional seed data.
    ///
    /// The source selects the initial step name (`"init"`, `"discovery"`,
    /// `"import"`) and is stamped onto the entry the flow produces. Seed
    /// data — discovery info, an imported config blob — must be a mapping;
    /// it is merged into the flow context and handed to the initial step as
    /// its input.
    pub async fn init_flow_from(
        &self,
        domain: &str,
        source: FlowSource,
        data: Option<Value>,
    ) -> Result<FlowResult> {
        let factory = self
            .registry
            .lookup(domain)
            .ok_or_else(|| FlowError::UnknownHandler(domain.to_owned()))?;

        let input = match data {
            Some(value) => match value {
                Value::Object(map) => Some(map),
                _ => {
                    return Err(FlowError::MalformedInput(ValidationErrors::single(
                        "*",
                        "expected a mapping of field values",
                    )));
                }
            },
            None => None,
        };

        let slot = Arc::new(FlowSlot {
            flow_id: FlowId::generate(),
            domain: domain.to_owned(),
            source,
            started_at: OffsetDateTime::now_utc(),
            current_step: StdMutex::new(source.init_step().to_owned()),
            state: Mutex::new(FlowState {
                handler: factory(),
                context: Map::new(),
                last_form: None,
                finished: false,
            }),
        });

        // Hold the state lock across registration so a concurrent configure
        // against the fresh id queues behind the init step.
        let mut state = slot.state.lock().await;
        self.progress_map()
            .insert(slot.flow_id.clone(), Arc::clone(&slot));
        info!(flow_id = %slot.flow_id, domain, source = %source, "flow started");

        if let Some(map) = &input {
            state.context.extend(map.clone());
        }

        match self.dispatch(&slot, &mut state, input).await {
            Ok(result) => Ok(result),
            Err(err) => {
                state.finished = true;
                drop(state);
                self.progress_map().remove(&slot.flow_id);
                Err(err)
            }
        }
    }

    /// Advance an in-progress flow with the caller's input.
    ///
    /// `UnknownFlow` for ids that are stale, unknown, or already past their
    /// terminal transition. Input is validated against the active step's
    /// schema before the step runs; `MalformedInput` leaves the flow's
    /// state untouched.
    pub async fn configure(
        &self,
        flow_id: &FlowId,
        user_input: Option<Value>,
    ) -> Result<FlowResult> {
        let slot = self.get_slot(flow_id)?;
        let mut state = slot.state.lock().await;
        if state.finished {
            return Err(FlowError::UnknownFlow(flow_id.clone()));
        }

        let input = match user_input {
            Some(value) => Some(Self::check_input(&state, &value)?),
            None => None,
        };
        if let Some(map) = &input {
            state.context.extend(map.clone());
        }

        self.dispatch(&slot, &mut state, input).await
    }

    /// Re-fetch the current form of a flow without advancing it.
    pub async fn peek(&self, flow_id: &FlowId) -> Result<FlowResult> {
        let slot = self.get_slot(flow_id)?;
        let state = slot.state.lock().await;
        match &state.last_form {
            Some(form) if !state.finished => Ok(FlowResult {
                flow_id: slot.flow_id.clone(),
                result: StepResult::Form(form.clone()),
            }),
            _ => Err(FlowError::UnknownFlow(flow_id.clone())),
        }
    }

    /// Remove an in-progress flow before it reaches a terminal result.
    ///
    /// Idempotent: removing an already-gone flow returns `false`. This is
    /// the hook for explicit abandonment and for deployment-level watchdogs
    /// expiring stale flows.
    pub fn abandon(&self, flow_id: &FlowId) -> bool {
        let removed = self.progress_map().remove(flow_id).is_some();
        if removed {
            info!(flow_id = %flow_id, "flow abandoned");
        }
        removed
    }

    /// Snapshot of all in-progress flows, sorted by flow id.
    ///
    /// Sorting keeps repeated snapshots identical when nothing changed in
    /// between; no live flow state is exposed.
    pub fn list_in_progress(&self) -> Vec<FlowProgress> {
        let mut flows: Vec<FlowProgress> = self
            .progress_map()
            .values()
            .map(|slot| FlowProgress {
                flow_id: slot.flow_id.clone(),
                domain: slot.domain.clone(),
                current_step: slot.current_step(),
                started_at: slot.started_at,
            })
            .collect();
        flows.sort_by(|a, b| a.flow_id.as_str().cmp(b.flow_id.as_str()));
        flows
    }

    /// All materialized entries, in creation order.
    pub async fn list_entries(&self) -> Vec<ConfigEntry> {
        self.store.list().await
    }

    /// Remove a materialized entry. Returns whether one was removed.
    pub async fn remove_entry(&self, entry_id: &str) -> bool {
        self.store.remove(entry_id).await
    }

    /// Run the flow's current step and classify the outcome.
    ///
    /// Caller holds the flow's state lock. Terminal results deregister the
    /// flow before returning; `CreateEntry` additionally validates the
    /// payload against the handler's entry schema (when declared) and
    /// materializes the entry.
    async fn dispatch(
        &self,
        slot: &FlowSlot,
        state: &mut FlowState,
        input: Option<Map<String, Value>>,
    ) -> Result<FlowResult> {
        let step_id = slot.current_step();
        if self.config.log_user_input {
            debug!(flow_id = %slot.flow_id, step = %step_id, input = ?input, "user input received");
        }
        debug!(flow_id = %slot.flow_id, domain = %slot.domain, step = %step_id, "dispatching step");

        let ctx = StepContext {
            flow_id: &slot.flow_id,
            source: slot.source,
            context: &mut state.context,
            input: input.as_ref(),
        };
        let result = state.handler.step(&step_id, ctx).await?;

        match result {
            StepResult::Form(form) => {
                slot.set_current_step(&form.step_id);
                state.last_form = Some(form.clone());
                Ok(FlowResult {
                    flow_id: slot.flow_id.clone(),
                    result: StepResult::Form(form),
                })
            }
            StepResult::Abort { reason } => {
                state.finished = true;
                self.progress_map().remove(&slot.flow_id);
                info!(flow_id = %slot.flow_id, domain = %slot.domain, reason = %reason, "flow aborted");
                Ok(FlowResult {
                    flow_id: slot.flow_id.clone(),
                    result: StepResult::Abort { reason },
                })
            }
            StepResult::CreateEntry { title, data } => {
                let data = match state.handler.entry_schema() {
                    Some(schema) => match schema.validate(&data) {
                        Ok(normalized) => Value::Object(normalized),
                        Err(errors) => {
                            warn!(
                                flow_id = %slot.flow_id,
                                domain = %slot.domain,
                                errors = %errors,
                                "entry payload rejected by entry schema"
                            );
                            return Err(FlowError::MalformedInput(errors));
                        }
                    },
                    None => data,
                };

                state.finished = true;
                self.progress_map().remove(&slot.flow_id);
                let entry_id = self
                    .store
                    .add(&slot.domain, &title, slot.source, data.clone())
                    .await;
                info!(
                    flow_id = %slot.flow_id,
                    domain = %slot.domain,
                    entry_id = %entry_id,
                    title = %title,
                    "config entry created"
                );
                Ok(FlowResult {
                    flow_id: slot.flow_id.clone(),
                    result: StepResult::CreateEntry { title, data },
                })
            }
        }
    }

    /// Validate this call's input against the active step's schema.
    ///
    /// Steps that declared no schema accept any mapping as-is (the step
    /// inspects what it needs); everything else goes through
    /// [`Schema::validate`](crate::Schema::validate).
    fn check_input(state: &FlowState, value: &Value) -> Result<Map<String, Value>> {
        let schema = state
            .last_form
            .as_ref()
            .and_then(|form| form.data_schema.as_ref());
        match schema {
            Some(schema) => schema.validate(value).map_err(FlowError::MalformedInput),
            None => value.as_object().cloned().ok_or_else(|| {
                FlowError::MalformedInput(ValidationErrors::single(
                    "*",
                    "expected a mapping of field values",
                ))
            }),
        }
    }

    fn get_slot(&self, flow_id: &FlowId) -> Result<Arc<FlowSlot>> {
        self.progress_map()
            .get(flow_id)
            .cloned()
            .ok_or_else(|| FlowError::UnknownFlow(flow_id.clone()))
    }

    fn progress_map(&self) -> MutexGuard<'_, HashMap<FlowId, Arc<FlowSlot>>> {
        self.in_progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
