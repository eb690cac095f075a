//! Wire representations consumed by a transport layer.
//!
//! The crate does not route HTTP, but the JSON a transport emits is part of
//! the core's contract: step results carry a `type` tag
//! (`form` / `abort` / `create_entry`), a form's `data_schema` is always an
//! array (empty when the step declared no schema), and entry listings omit
//! the payload — secrets stay server-side.

use serde_json::{Value, json};

use crate::handler::StepResult;
use crate::manager::{FlowProgress, FlowResult};
use crate::schema::Schema;
use crate::store::ConfigEntry;

/// Render a step result into its wire shape.
pub fn render_result(result: &FlowResult) -> Value {
    let flow_id = result.flow_id.as_str();
    match &result.result {
        StepResult::Form(form) => {
            let fields = form
                .data_schema
                .as_ref()
                .map(Schema::to_fields)
                .unwrap_or_default();
            let mut rendered = json!({
                "flow_id": flow_id,
                "type": "form",
                "step_id": form.step_id,
                "title": form.title,
                "errors": form.errors,
                "data_schema": fields,
            });
            if let Some(description) = &form.description {
                if let Some(object) = rendered.as_object_mut() {
                    object.insert("description".to_owned(), json!(description));
                }
            }
            rendered
        }
        StepResult::Abort { reason } => json!({
            "flow_id": flow_id,
            "type": "abort",
            "reason": reason,
        }),
        // The payload is not echoed back to the caller.
        StepResult::CreateEntry { title, .. } => json!({
            "flow_id": flow_id,
            "type": "create_entry",
            "title": title,
        }),
    }
}

/// Render an entry listing row: `{entry_id, domain, title, source}`.
pub fn render_entry(entry: &ConfigEntry) -> Value {
    json!({
        "entry_id": entry.entry_id,
        "domain": entry.domain,
        "title": entry.title,
        "source": entry.source,
    })
}

/// Render a progress listing row: `{flow_id, domain, current_step}`.
pub fn render_progress(progress: &FlowProgress) -> Value {
    json!({
        "flow_id": progress.flow_id,
        "domain": progress.domain,
        "current_step": progress.current_step,
    })
}
