//! Purpose-built flow handlers for testing manager mechanics.
//!
//! Covers:
//! - Form rendering with schema, description and field errors
//! - Immediate terminal results (abort, create_entry)
//! - Multi-step dispatch driven by accumulated context
//! - Entry-schema enforcement
//! - Discovery-started flows and slow steps for concurrency tests

use std::time::Duration;

use async_trait::async_trait;
use entryflow::{
    Field, FieldKind, FlowError, FlowHandler, Form, Result, Schema, StepContext, StepResult,
};
use serde_json::json;

/// Single-form wizard whose init form carries a schema, a description and a
/// pre-populated field error.
pub struct CredentialsHandler;

#[async_trait]
impl FlowHandler for CredentialsHandler {
    async fn step(&mut self, step_id: &str, _ctx: StepContext<'_>) -> Result<StepResult> {
        match step_id {
            "init" => Ok(StepResult::form(
                Form::new("init", "test-title")
                    .with_description("test-description")
                    .with_schema(
                        Schema::new()
                            .field(Field::required("username", FieldKind::String))
                            .field(Field::required("password", FieldKind::String)),
                    )
                    .with_error("username", "Should be unique."),
            )),
            other => Err(FlowError::UnknownStep(other.to_owned())),
        }
    }
}

/// Aborts straight from its init step.
pub struct AbortingHandler {
    pub reason: &'static str,
}

#[async_trait]
impl FlowHandler for AbortingHandler {
    async fn step(&mut self, step_id: &str, _ctx: StepContext<'_>) -> Result<StepResult> {
        match step_id {
            "init" => Ok(StepResult::abort(self.reason)),
            other => Err(FlowError::UnknownStep(other.to_owned())),
        }
    }
}

/// Creates an entry straight from its init step.
pub struct InstantEntryHandler;

#[async_trait]
impl FlowHandler for InstantEntryHandler {
    async fn step(&mut self, step_id: &str, _ctx: StepContext<'_>) -> Result<StepResult> {
        match step_id {
            "init" => Ok(StepResult::create_entry(
                "Test Entry",
                json!({"secret": "account_token"}),
            )),
            other => Err(FlowError::UnknownStep(other.to_owned())),
        }
    }
}

/// Two-step wizard: init requests account details, the account step titles
/// the entry after the submitted `user_title`.
pub struct AccountWizardHandler;

#[async_trait]
impl FlowHandler for AccountWizardHandler {
    async fn step(&mut self, step_id: &str, ctx: StepContext<'_>) -> Result<StepResult> {
        match step_id {
            "init" => Ok(StepResult::form(
                Form::new("account", "Account details").with_schema(
                    Schema::new().field(Field::required("user_title", FieldKind::String)),
                ),
            )),
            "account" => {
                let title = ctx.context_str("user_title").unwrap_or("unnamed").to_owned();
                Ok(StepResult::create_entry(
                    title.clone(),
                    json!({"user_title": title}),
                ))
            }
            other => Err(FlowError::UnknownStep(other.to_owned())),
        }
    }
}

/// Has no steps at all, init included.
pub struct NoInitHandler;

#[async_trait]
impl FlowHandler for NoInitHandler {
    async fn step(&mut self, step_id: &str, _ctx: StepContext<'_>) -> Result<StepResult> {
        Err(FlowError::UnknownStep(step_id.to_owned()))
    }
}

/// Discovery-started wizard; records the discovered host in its entry.
pub struct DiscoveredDeviceHandler;

#[async_trait]
impl FlowHandler for DiscoveredDeviceHandler {
    async fn step(&mut self, step_id: &str, ctx: StepContext<'_>) -> Result<StepResult> {
        match step_id {
            "discovery" => {
                let host = ctx.input_str("host").unwrap_or("unknown").to_owned();
                Ok(StepResult::create_entry(
                    format!("Device at {host}"),
                    json!({"host": host}),
                ))
            }
            other => Err(FlowError::UnknownStep(other.to_owned())),
        }
    }
}

/// Declares an entry schema and builds its payload from accumulated
/// context, so a bad submission can be corrected on a later attempt.
pub struct TokenGuardedHandler {
    entry_schema: Schema,
}

impl Default for TokenGuardedHandler {
    fn default() -> Self {
        Self {
            entry_schema: Schema::new().field(Field::required("token", FieldKind::String)),
        }
    }
}

#[async_trait]
impl FlowHandler for TokenGuardedHandler {
    fn entry_schema(&self) -> Option<&Schema> {
        Some(&self.entry_schema)
    }

    async fn step(&mut self, step_id: &str, ctx: StepContext<'_>) -> Result<StepResult> {
        match step_id {
            // Schemaless form: the confirm step takes whatever was sent and
            // lets the entry schema arbitrate.
            "init" => Ok(StepResult::form(Form::new("confirm", "Confirm token"))),
            "confirm" => {
                let token = ctx.context.get("token").cloned().unwrap_or(json!(null));
                Ok(StepResult::create_entry(
                    "Guarded device",
                    json!({"token": token}),
                ))
            }
            other => Err(FlowError::UnknownStep(other.to_owned())),
        }
    }
}

/// Takes its time finishing; used to race concurrent configure calls.
pub struct SlowFinishHandler;

#[async_trait]
impl FlowHandler for SlowFinishHandler {
    async fn step(&mut self, step_id: &str, _ctx: StepContext<'_>) -> Result<StepResult> {
        match step_id {
            "init" => Ok(StepResult::form(Form::new("finish", "Finishing up"))),
            "finish" => {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(StepResult::create_entry("Finished", json!({})))
            }
            other => Err(FlowError::UnknownStep(other.to_owned())),
        }
    }
}
