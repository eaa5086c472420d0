#![allow(dead_code)]

use std::sync::Arc;

use step_context::{ExecutionContext, RecordingHandle, Step, StepContext, StepSettings};

/// Root context on the `test` execution context, without backtrace capture.
pub fn root(name: &str) -> (StepContext, Arc<RecordingHandle>) {
    let owner = Arc::new(RecordingHandle::new());
    let ctx = StepContext::with_settings(
        owner.clone(),
        Arc::new(ExecutionContext::Test),
        StepSettings {
            capture_backtrace: false,
        },
        name,
        Vec::new(),
    );
    (ctx, owner)
}

pub fn child_names(step: &Step) -> Vec<&str> {
    step.steps.iter().map(|s| s.name.as_str()).collect()
}
