//! Timing trace sinks.

use std::time::Duration;

use crate::method::{ArgumentSnapshot, MethodDescriptor};

/// Log target used by [`LogTracer`].
pub const TIMING_TARGET: &str = "rstest_bdd_bindings::timing";

/// Receives the duration of traced invocations.
///
/// Tracers observe invocations; they cannot change their outcome. A tracer
/// that panics is reported through the `log` facade and otherwise ignored.
pub trait BindingTracer {
    /// Record that `method` ran with `arguments` for `duration`.
    fn trace_duration(
        &self,
        duration: Duration,
        method: &MethodDescriptor,
        arguments: &[ArgumentSnapshot],
    );
}

/// Tracer that writes one `info` record per invocation through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl BindingTracer for LogTracer {
    fn trace_duration(
        &self,
        duration: Duration,
        method: &MethodDescriptor,
        arguments: &[ArgumentSnapshot],
    ) {
        let rendered: Vec<String> = arguments.iter().map(ToString::to_string).collect();
        log::info!(
            target: TIMING_TARGET,
            "{method} with [{}] took {}ms",
            rendered.join(", "),
            duration.as_millis()
        );
    }
}

/// Tracer that discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl BindingTracer for NoopTracer {
    fn trace_duration(&self, _: Duration, _: &MethodDescriptor, _: &[ArgumentSnapshot]) {}
}
