use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// Owner handle: the test-runner primitive every context reports through
// ============================================================================

/// Pass/fail/abort/log sink shared by a whole step tree.
pub trait TestHandle: Send + Sync {
    /// Record a non-fatal error; the test is marked failed but keeps running.
    fn error(&self, message: &str);

    /// Plain log output.
    fn log(&self, message: &str);

    /// Mark the test failed and stop the current thread of execution.
    ///
    /// Implementations are expected to end with [`fatal_abort`] so step
    /// boundaries can tell an abort apart from a panic.
    fn fail_now(&self) -> !;

    fn errorf(&self, args: fmt::Arguments<'_>) {
        self.error(&args.to_string());
    }

    fn logf(&self, args: fmt::Arguments<'_>) {
        self.log(&args.to_string());
    }
}

/// Unwind payload raised by [`fatal_abort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatalAbort;

/// Unwind the current thread with a [`FatalAbort`] payload.
///
/// Uses `resume_unwind`, so the panic hook does not fire.
pub fn fatal_abort() -> ! {
    std::panic::resume_unwind(Box::new(FatalAbort))
}

// ============================================================================
// Environment: execution-context name lookup
// ============================================================================

pub trait Environment: Send + Sync {
    /// Human-readable name of the context the step executes under.
    fn execution_context_name(&self) -> String;
}

/// Lifecycle phase of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionContext {
    BeforeAll,
    BeforeEach,
    Test,
    AfterEach,
    AfterAll,
}

impl ExecutionContext {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionContext::BeforeAll => "before all",
            ExecutionContext::BeforeEach => "before each",
            ExecutionContext::Test => "test",
            ExecutionContext::AfterEach => "after each",
            ExecutionContext::AfterAll => "after all",
        }
    }
}

impl Environment for ExecutionContext {
    fn execution_context_name(&self) -> String {
        self.name().to_string()
    }
}

// ============================================================================
// RecordingHandle: in-memory owner handle
// ============================================================================

/// A [`TestHandle`] that keeps everything in memory.
///
/// Used by the CLI and by tests. Every call is also emitted as a tracing
/// event.
#[derive(Debug, Default)]
pub struct RecordingHandle {
    failed: AtomicBool,
    aborted: AtomicBool,
    errors: Mutex<Vec<String>>,
    logs: Mutex<Vec<String>>,
}

impl RecordingHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any error or abort was reported.
    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Whether `fail_now` was called at least once.
    pub fn aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl TestHandle for RecordingHandle {
    fn error(&self, message: &str) {
        tracing::warn!(target: "step_context::owner", "{}", message);
        self.failed.store(true, Ordering::SeqCst);
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }

    fn log(&self, message: &str) {
        tracing::info!(target: "step_context::owner", "{}", message);
        self.logs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }

    fn fail_now(&self) -> ! {
        self.failed.store(true, Ordering::SeqCst);
        self.aborted.store(true, Ordering::SeqCst);
        fatal_abort()
    }
}
