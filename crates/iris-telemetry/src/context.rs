//! Request-scoped correlation context for tracing spans.
//!
//! A [`RequestContext`] carries a correlation id across the suspension
//! points of a single tell/command/sleep dispatch so every log line for
//! that request can be grouped together regardless of which target's
//! worker task emitted it.

use tracing::Span;
use uuid::Uuid;

/// A correlation id plus the component/operation it is scoped to, wrapping
/// a `tracing::Span` that call sites enter for the lifetime of one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    correlation_id: Uuid,
    component: String,
    operation: Option<String>,
}

impl RequestContext {
    /// Start a fresh context for `component` (e.g. `"orchestrator"`, `"pool"`).
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self { correlation_id: Uuid::new_v4(), component: component.into(), operation: None }
    }

    /// Attach an operation label (e.g. `"send_message"`).
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// This context's correlation id.
    #[must_use]
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Build the `tracing::Span` call sites should enter for the duration
    /// of the request this context describes.
    #[must_use]
    pub fn span(&self) -> Span {
        match &self.operation {
            Some(operation) => {
                tracing::info_span!("request", correlation_id = %self.correlation_id, component = %self.component, operation = %operation)
            },
            None => tracing::info_span!("request", correlation_id = %self.correlation_id, component = %self.component),
        }
    }

    /// Enter this context's span, returning a guard that exits it on drop.
    #[must_use]
    pub fn enter(&self) -> RequestGuard {
        RequestGuard { _entered: self.span().entered() }
    }
}

/// Holds a [`RequestContext`]'s span entered; dropping it exits the span.
pub struct RequestGuard {
    _entered: tracing::span::EnteredSpan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_ids_are_distinct_per_context() {
        let a = RequestContext::new("orchestrator");
        let b = RequestContext::new("orchestrator");
        assert_ne!(a.correlation_id(), b.correlation_id());
    }

    #[test]
    fn with_operation_is_chainable() {
        let ctx = RequestContext::new("pool").with_operation("send_message");
        assert_eq!(ctx.operation.as_deref(), Some("send_message"));
    }
}
