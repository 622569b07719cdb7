//! [`HandlerRegistry`]: a type-indexed map from `job_type` to `(payload
//! schema, handler)`, and the dispatch logic that validates then invokes
//! (§4.4).
//!
//! Registration happens once during process init and is immutable
//! thereafter — there is no `unregister`. `Ctx` is the application's own
//! handler context type (exposing `Clock`, `ErrorReporter`, the
//! `ScheduleApi`, and whatever external collaborators the application's
//! handlers need); scheduler-core stays agnostic to what it contains.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

/// Outcome of a handler's `run`, as named (not typed) by §9's "exceptions
/// as control flow → typed error results" redesign note: `{ok, retryable,
/// permanent}`, plus the payload-validation case the dispatcher itself can
/// produce before `run` is ever called.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The payload failed to parse against the handler's declared shape.
    /// Always a permanent failure — the payload can never become valid by
    /// retrying (§4.4, §4.5, §7 item 3).
    #[error("payload validation failed: {0}")]
    Validation(#[source] anyhow::Error),

    /// A business failure that may succeed if retried later.
    #[error("retryable failure: {0}")]
    Retryable(#[source] anyhow::Error),

    /// A business failure that will not succeed no matter how many times
    /// it is retried.
    #[error("permanent failure: {0}")]
    Permanent(#[source] anyhow::Error),
}

impl HandlerError {
    /// Whether the worker should consult [`crate::retry::RetryPolicy`] at
    /// all. Validation and permanent failures always dead-letter.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HandlerError::Retryable(_))
    }
}

/// Deserializes `raw` as `T`, mapping any failure to
/// [`HandlerError::Validation`]. Handlers call this first, before doing
/// any work, to get the "validate then invoke" split described in §4.4.
pub fn parse_payload<T: DeserializeOwned>(raw: &serde_json::Value) -> Result<T, HandlerError> {
    serde_json::from_value(raw.clone())
        .map_err(|e| HandlerError::Validation(anyhow::anyhow!(e)))
}

/// One registered job type: a handler plus the name it answers to.
#[async_trait::async_trait]
pub trait Handler<Ctx>: Send + Sync {
    /// Stable identifier matching [`crate::record::JobRecord::job_type`].
    fn job_type(&self) -> &'static str;

    /// Validates `payload` (typically via [`parse_payload`]) and executes.
    /// Handlers MUST be idempotent: at-least-once delivery means `run` can
    /// be called more than once for the same logical unit of work.
    async fn run(&self, payload: serde_json::Value, ctx: &Ctx) -> Result<(), HandlerError>;
}

/// Error produced by [`HandlerRegistry::dispatch`] before a handler's own
/// logic runs.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// §7 item 5: unknown job_type. Fatal on the *emit* path if caught at
    /// `Schedule` time; if it somehow reaches a worker (e.g. after a
    /// deploy removed a handler), it is treated like any other
    /// registry miss — non-retryable.
    #[error("no handler registered for job type {0}")]
    UnknownJobType(String),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Immutable-after-init map from `job_type` to handler.
pub struct HandlerRegistry<Ctx> {
    handlers: HashMap<&'static str, Arc<dyn Handler<Ctx>>>,
}

impl<Ctx> Default for HandlerRegistry<Ctx> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<Ctx> HandlerRegistry<Ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler. Panics on duplicate `job_type` — a collision
    /// here is a startup-time programming error, not a runtime condition.
    pub fn register(&mut self, handler: Arc<dyn Handler<Ctx>>) {
        let job_type = handler.job_type();
        if self.handlers.insert(job_type, handler).is_some() {
            panic!("handler already registered for job type: {job_type}");
        }
    }

    pub fn is_registered(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    pub fn registered_types(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }

    /// Validates then invokes the handler registered for `job_type`.
    pub async fn dispatch(
        &self,
        job_type: &str,
        payload: serde_json::Value,
        ctx: &Ctx,
    ) -> Result<(), DispatchError> {
        let handler = self
            .handlers
            .get(job_type)
            .ok_or_else(|| DispatchError::UnknownJobType(job_type.to_string()))?;
        handler.run(payload, ctx).await.map_err(DispatchError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    struct Ctx;

    #[derive(Deserialize)]
    struct Greet {
        name: String,
    }

    struct GreetHandler;

    #[async_trait::async_trait]
    impl Handler<Ctx> for GreetHandler {
        fn job_type(&self) -> &'static str {
            "greet"
        }

        async fn run(&self, payload: serde_json::Value, _ctx: &Ctx) -> Result<(), HandlerError> {
            let greet: Greet = parse_payload(&payload)?;
            if greet.name.is_empty() {
                return Err(HandlerError::Permanent(anyhow::anyhow!("empty name")));
            }
            Ok(())
        }
    }

    fn registry() -> HandlerRegistry<Ctx> {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(GreetHandler));
        registry
    }

    #[tokio::test]
    async fn dispatch_runs_the_registered_handler() {
        let registry = registry();
        let result = registry
            .dispatch("greet", serde_json::json!({"name": "Ada"}), &Ctx)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn dispatch_reports_unknown_job_type() {
        let registry = registry();
        let result = registry.dispatch("nope", serde_json::json!({}), &Ctx).await;
        assert!(matches!(result, Err(DispatchError::UnknownJobType(_))));
    }

    #[tokio::test]
    async fn malformed_payload_is_a_validation_error_not_a_panic() {
        let registry = registry();
        let result = registry
            .dispatch("greet", serde_json::json!({"wrong_field": 1}), &Ctx)
            .await;
        match result {
            Err(DispatchError::Handler(HandlerError::Validation(_))) => {}
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handler_business_failure_surfaces_as_permanent() {
        let registry = registry();
        let result = registry
            .dispatch("greet", serde_json::json!({"name": ""}), &Ctx)
            .await;
        match result {
            Err(DispatchError::Handler(HandlerError::Permanent(_))) => {}
            other => panic!("expected permanent error, got {other:?}"),
        }
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut registry = registry();
        registry.register(Arc::new(GreetHandler));
    }

    #[test]
    fn registered_types_reflects_registrations() {
        let registry = registry();
        assert_eq!(registry.registered_types(), vec!["greet"]);
        assert!(registry.is_registered("greet"));
        assert!(!registry.is_registered("other"));
    }
}
