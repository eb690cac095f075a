//! Flow handler trait, step results, and flow identifiers.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::Result;
use crate::schema::Schema;
use crate::store::FlowSource;

/// An in-progress flow identifier.
///
/// Opaque token minted by the manager when a flow is created; never reused.
///
/// # Example
///
/// ```
/// use entryflow::FlowId;
///
/// let id = FlowId::new("abc123");
/// assert_eq!(id.as_str(), "abc123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(String);

impl FlowId {
    /// Wrap an existing id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh unique id.
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl From<String> for FlowId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for FlowId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// A form requesting more input, naming the step that will consume it.
///
/// Built with chained setters:
///
/// ```
/// use entryflow::{Field, FieldKind, Form, Schema};
///
/// let form = Form::new("account", "Link your account")
///     .with_description("Credentials are stored locally.")
///     .with_schema(Schema::new().field(Field::required("token", FieldKind::String)));
/// assert_eq!(form.step_id, "account");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    /// Step that will handle the next `configure` call.
    pub step_id: String,
    /// Human-readable form title.
    pub title: String,
    /// Optional longer description shown with the form.
    pub description: Option<String>,
    /// Fields the form expects; `None` renders as an empty `data_schema`.
    pub data_schema: Option<Schema>,
    /// Field-keyed messages from a failed previous attempt, for re-prompting.
    pub errors: BTreeMap<String, String>,
}

impl Form {
    /// Create a form for the given step.
    pub fn new(step_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            title: title.into(),
            description: None,
            data_schema: None,
            errors: BTreeMap::new(),
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach the input schema the step expects.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.data_schema = Some(schema);
        self
    }

    /// Attach an error message for one field.
    ///
    /// Used when re-prompting after the step's own downstream validation
    /// failed (an unreachable host, a rejected credential).
    pub fn with_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors.insert(field.into(), message.into());
        self
    }
}

/// Outcome of one step execution.
///
/// `Form` is the only non-terminal variant; `Abort` and `CreateEntry` end
/// the flow's lifecycle, and `CreateEntry` additionally materializes a
/// configuration entry.
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    /// Request more input; the flow stays in progress.
    Form(Form),
    /// Terminal: the flow cannot proceed.
    Abort {
        /// Why the flow ended without an entry.
        reason: String,
    },
    /// Terminal: register a configuration entry built from the flow.
    CreateEntry {
        /// Entry title shown in listings.
        title: String,
        /// Opaque entry payload.
        data: Value,
    },
}

impl StepResult {
    /// Shorthand for a form result.
    pub fn form(form: Form) -> Self {
        StepResult::Form(form)
    }

    /// Shorthand for an abort result.
    pub fn abort(reason: impl Into<String>) -> Self {
        StepResult::Abort {
            reason: reason.into(),
        }
    }

    /// Shorthand for an entry-creating result.
    pub fn create_entry(title: impl Into<String>, data: Value) -> Self {
        StepResult::CreateEntry {
            title: title.into(),
            data,
        }
    }

    /// Whether this result ends the flow.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepResult::Form(_))
    }
}

/// Context handed to a step operation.
///
/// `context` is the flow's accumulated input across all previous steps
/// (already including this call's validated input); `input` is the input
/// submitted for this call alone, `None` on re-render requests.
pub struct StepContext<'a> {
    /// The flow this step belongs to.
    pub flow_id: &'a FlowId,
    /// How the flow was started.
    pub source: FlowSource,
    /// Accumulated input, writable for steps that derive values.
    pub context: &'a mut Map<String, Value>,
    /// Validated input for this call, if any was submitted.
    pub input: Option<&'a Map<String, Value>>,
}

impl StepContext<'_> {
    /// String value from this call's input.
    pub fn input_str(&self, field: &str) -> Option<&str> {
        self.input.and_then(|map| map.get(field)).and_then(Value::as_str)
    }

    /// String value from the accumulated context.
    pub fn context_str(&self, field: &str) -> Option<&str> {
        self.context.get(field).and_then(Value::as_str)
    }
}

/// Pluggable state-machine definition for one configuration domain.
///
/// One handler instance is created per flow; it lives until the flow
/// reaches a terminal result, so implementations may keep private state
/// across steps (a probed device, a half-built client).
///
/// Step dispatch is by name: match on `step_id` and fail the fall-through
/// arm with [`FlowError::UnknownStep`](crate::FlowError::UnknownStep). The
/// manager dispatches `"init"` first for user-started flows (`"discovery"`
/// and `"import"` for the respective sources) and thereafter whatever step
/// the last returned form named.
///
/// # Results
///
/// | Result | Meaning |
/// |--------|---------|
/// | `Ok(StepResult::Form(_))` | Ask for (more) input; names the next step |
/// | `Ok(StepResult::Abort { .. })` | Flow ends without an entry |
/// | `Ok(StepResult::CreateEntry { .. })` | Flow ends, entry is registered |
/// | `Err(_)` | Dispatch failure (`UnknownStep`), surfaced to the caller |
///
/// Downstream failures inside a step (unreachable host, rejected
/// credential) are not errors: return the same form again with
/// [`Form::with_error`] so the wizard can re-prompt without losing state.
///
/// # Example
///
/// ```ignore
/// struct BridgeSetup;
///
/// #[async_trait]
/// impl FlowHandler for BridgeSetup {
///     async fn step(&mut self, step_id: &str, ctx: StepContext<'_>) -> Result<StepResult> {
///         match step_id {
///             "init" => Ok(StepResult::form(
///                 Form::new("link", "Press the bridge button")
///                     .with_schema(Schema::new().field(Field::required("host", FieldKind::String))),
///             )),
///             "link" => {
///                 let host = ctx.input_str("host").unwrap_or_default().to_owned();
///                 match pair_with_bridge(&host).await {
///                     Ok(token) => Ok(StepResult::create_entry(
///                         format!("Bridge at {host}"),
///                         json!({"host": host, "token": token}),
///                     )),
///                     Err(_) => Ok(StepResult::form(
///                         Form::new("link", "Press the bridge button")
///                             .with_error("host", "No bridge found at this address."),
///                     )),
///                 }
///             }
///             other => Err(FlowError::UnknownStep(other.to_owned())),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait FlowHandler: Send + Sync {
    /// Schema a `CreateEntry` payload must satisfy, if the handler declares
    /// one. Validated by the manager before the entry is accepted.
    fn entry_schema(&self) -> Option<&Schema> {
        None
    }

    /// Execute the step named `step_id` against the flow's context.
    async fn step(&mut self, step_id: &str, ctx: StepContext<'_>) -> Result<StepResult>;
}
