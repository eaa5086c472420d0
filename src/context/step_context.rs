use std::any::Any;
use std::fmt;
use std::panic;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};

use crate::asserts::{AssertMode, Asserts};
use crate::context::handle::{Environment, TestHandle};
use crate::context::panic::{Contained, contain, panic_diagnostic, report_test_error};
use crate::context::tree::{NodeId, StepTree};
use crate::context::wait_group::WaitGroup;
use crate::model::status::{Status, StatusDetails};
use crate::model::step_model::{Attachment, MimeType, Parameter, Step, parameters};

// ============================================================================
// Settings and outcomes
// ============================================================================

/// Behaviour switches shared by every context of one tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSettings {
    /// Capture a backtrace when a step body panics
    #[serde(default = "default_true")]
    pub capture_backtrace: bool,
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            capture_backtrace: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Final state of an async step as seen by whoever joins it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Passed,
    Failed,
    Broken,
    /// The step thread was stopped by a fatal abort
    Aborted,
}

impl From<Status> for StepOutcome {
    fn from(status: Status) -> Self {
        match status {
            Status::Passed => StepOutcome::Passed,
            Status::Failed => StepOutcome::Failed,
            Status::Broken => StepOutcome::Broken,
        }
    }
}

enum Execution {
    Finished(Status),
    Aborted(Box<dyn Any + Send>),
}

// ============================================================================
// StepContext
// ============================================================================

struct Shared {
    owner: Arc<dyn TestHandle>,
    environment: Arc<dyn Environment>,
    tree: Arc<StepTree>,
    settings: StepSettings,
}

/// Link from a child to the context that declared it.
///
/// Holds the parent's node id and pending counter, never the parent context
/// itself.
struct ParentLink {
    node: NodeId,
    pending: Arc<WaitGroup>,
}

/// Execution context of one step.
///
/// Creating a child context links its node into the shared tree right away,
/// so the tree follows declaration order. Failures walk the tree's parent
/// links up to the root.
pub struct StepContext {
    shared: Arc<Shared>,
    name: String,
    node: NodeId,
    parent: Option<ParentLink>,
    pending: Arc<WaitGroup>,
    /// Counter this context's own async execution is registered in
    counted_in: Option<Arc<WaitGroup>>,
}

impl StepContext {
    /// Root context with default settings.
    pub fn new(
        owner: Arc<dyn TestHandle>,
        environment: Arc<dyn Environment>,
        name: impl Into<String>,
        parameters: Vec<Parameter>,
    ) -> Self {
        Self::with_settings(owner, environment, StepSettings::default(), name, parameters)
    }

    pub fn with_settings(
        owner: Arc<dyn TestHandle>,
        environment: Arc<dyn Environment>,
        settings: StepSettings,
        name: impl Into<String>,
        parameters: Vec<Parameter>,
    ) -> Self {
        let name = name.into();
        let (tree, node) = StepTree::new(Step::new(name.clone(), parameters));
        Self {
            shared: Arc::new(Shared {
                owner,
                environment,
                tree: Arc::new(tree),
                settings,
            }),
            name,
            node,
            parent: None,
            pending: WaitGroup::new(),
            counted_in: None,
        }
    }

    fn new_child_ctx(
        &self,
        name: String,
        parameters: Vec<Parameter>,
        counted_in: Option<Arc<WaitGroup>>,
    ) -> StepContext {
        let node = self
            .shared
            .tree
            .insert_child(self.node, Step::new(name.clone(), parameters));
        StepContext {
            shared: Arc::clone(&self.shared),
            name,
            node,
            parent: Some(ParentLink {
                node: self.node,
                pending: Arc::clone(&self.pending),
            }),
            pending: WaitGroup::new(),
            counted_in,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn parent_node(&self) -> Option<NodeId> {
        self.parent.as_ref().map(|p| p.node)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn tree(&self) -> Arc<StepTree> {
        Arc::clone(&self.shared.tree)
    }

    pub fn status(&self) -> Status {
        self.shared.tree.status(self.node)
    }

    /// Snapshot of this step and everything declared under it so far.
    pub fn current_step(&self) -> Step {
        self.shared
            .tree
            .snapshot(self.node)
            .unwrap_or_else(|| Step::new(self.name.clone(), Vec::new()))
    }

    pub fn execution_context_name(&self) -> String {
        self.shared.environment.execution_context_name()
    }

    /// Number of async steps currently counted against this context.
    pub fn pending_async(&self) -> usize {
        self.pending.pending()
    }

    /// Block until every async step counted against this context is done.
    pub fn wait(&self) {
        self.pending.wait();
    }

    pub fn assert(&self) -> Asserts<'_> {
        Asserts::new(self, AssertMode::Assert)
    }

    pub fn require(&self) -> Asserts<'_> {
        Asserts::new(self, AssertMode::Require)
    }

    // ------------------------------------------------------------------------
    // Nested steps
    // ------------------------------------------------------------------------

    /// Run `body` as a child step on the current thread.
    ///
    /// A panic in `body` stops here: the child is marked broken and the crash
    /// is reported on the owner handle. A fatal abort finishes the child and
    /// keeps unwinding.
    pub fn with_new_step<F>(&self, name: impl Into<String>, body: F, parameters: Vec<Parameter>) -> Status
    where
        F: FnOnce(&StepContext),
    {
        self.run_new_step(name.into(), parameters, |ctx| {
            body(ctx);
            None
        })
    }

    /// Like [`with_new_step`](Self::with_new_step) for a fallible body.
    ///
    /// An `Err` is stored as the child's status details and reported through
    /// [`error`](Self::error).
    pub fn try_with_new_step<F, E>(
        &self,
        name: impl Into<String>,
        body: F,
        parameters: Vec<Parameter>,
    ) -> Status
    where
        F: FnOnce(&StepContext) -> Result<(), E>,
        E: fmt::Display,
    {
        self.run_new_step(name.into(), parameters, |ctx| body(ctx).err().map(|e| e.to_string()))
    }

    fn run_new_step<F>(&self, name: String, parameters: Vec<Parameter>, body: F) -> Status
    where
        F: FnOnce(&StepContext) -> Option<String>,
    {
        let child = self.new_child_ctx(name, parameters, None);
        match child.execute(body) {
            Execution::Finished(status) => status,
            Execution::Aborted(payload) => panic::resume_unwind(payload),
        }
    }

    /// Run `body` as a child step on its own thread.
    ///
    /// The step is counted in the parent's counter when this context has a
    /// parent, otherwise in this context's own. Launching from a context
    /// with a parent waits on that counter before returning.
    pub fn with_new_async_step<F>(
        &self,
        name: impl Into<String>,
        body: F,
        parameters: Vec<Parameter>,
    ) -> AsyncStep
    where
        F: FnOnce(&StepContext) + Send + 'static,
    {
        self.launch_new_step(name.into(), parameters, move |ctx| {
            body(ctx);
            None
        })
    }

    /// Like [`with_new_async_step`](Self::with_new_async_step) for a fallible
    /// body; an `Err` fails the step as in [`try_with_new_step`](Self::try_with_new_step).
    pub fn try_with_new_async_step<F, E>(
        &self,
        name: impl Into<String>,
        body: F,
        parameters: Vec<Parameter>,
    ) -> AsyncStep
    where
        F: FnOnce(&StepContext) -> Result<(), E> + Send + 'static,
        E: fmt::Display,
    {
        self.launch_new_step(name.into(), parameters, move |ctx| {
            body(ctx).err().map(|e| e.to_string())
        })
    }

    fn launch_new_step<F>(&self, name: String, parameters: Vec<Parameter>, body: F) -> AsyncStep
    where
        F: FnOnce(&StepContext) -> Option<String> + Send + 'static,
    {
        let group = match &self.parent {
            Some(parent) => Arc::clone(&parent.pending),
            None => Arc::clone(&self.pending),
        };
        let child = self.new_child_ctx(name.clone(), parameters, Some(Arc::clone(&group)));
        let node = child.node;
        let guard = group.add();

        let spawned = thread::Builder::new()
            .name(format!("step:{}", name))
            .spawn(move || {
                let _guard = guard;
                match child.execute(body) {
                    Execution::Finished(status) => StepOutcome::from(status),
                    Execution::Aborted(_) => StepOutcome::Aborted,
                }
            });

        let state = match spawned {
            Ok(handle) => AsyncState::Running(handle),
            Err(e) => {
                tracing::error!(step = %name, error = %e, "failed to spawn step thread");
                let message = format!("failed to spawn thread for step '{}': {}", name, e);
                let tree = &self.shared.tree;
                tree.set_details(node, StatusDetails::new(message.clone()));
                tree.escalate_chain(node, Status::Broken);
                tree.finish(node);
                report_test_error(
                    self.shared.owner.as_ref(),
                    &self.execution_context_name(),
                    &message,
                );
                AsyncState::Finished(StepOutcome::Broken)
            }
        };

        let mut step = AsyncStep { name, node, state };
        if self.parent.is_some() {
            let counts_self = self
                .counted_in
                .as_ref()
                .is_some_and(|own| Arc::ptr_eq(own, &group));
            if counts_self {
                // the group includes this very step, waiting on it would never return
                step.settle();
            } else {
                group.wait();
            }
        }
        step
    }

    fn execute<F>(&self, body: F) -> Execution
    where
        F: FnOnce(&StepContext) -> Option<String>,
    {
        tracing::debug!(step = %self.name, "step started");

        let execution = match contain(self.shared.settings.capture_backtrace, || body(self)) {
            Contained::Returned(failure) => {
                if let Some(message) = failure {
                    self.shared
                        .tree
                        .set_details(self.node, StatusDetails::new(message.clone()));
                    self.error(&message);
                }
                Execution::Finished(self.status())
            }
            Contained::Panicked { message, trace } => {
                let context_name = self.execution_context_name();
                tracing::warn!(step = %self.name, panic = %message, "contained panic in step");
                self.shared.tree.set_details(
                    self.node,
                    StatusDetails::new(message.clone()).with_trace(trace.clone()),
                );
                self.broken();
                report_test_error(
                    self.shared.owner.as_ref(),
                    &context_name,
                    &panic_diagnostic(&context_name, &message, &trace),
                );
                Execution::Finished(Status::Broken)
            }
            Contained::Aborted(payload) => Execution::Aborted(payload),
        };

        self.shared.tree.finish(self.node);
        tracing::debug!(step = %self.name, status = %self.status(), "step finished");
        execution
    }

    // ------------------------------------------------------------------------
    // Status and owner forwarding
    // ------------------------------------------------------------------------

    /// Mark this step and all its ancestors failed.
    pub fn fail(&self) {
        self.shared.tree.escalate_chain(self.node, Status::Failed);
    }

    /// Mark this step and all its ancestors broken.
    pub fn broken(&self) {
        self.shared.tree.escalate_chain(self.node, Status::Broken);
    }

    pub fn error(&self, message: &str) {
        self.fail();
        self.shared.owner.error(message);
    }

    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.fail();
        self.shared.owner.errorf(args);
    }

    pub fn fail_now(&self) -> ! {
        self.shared.owner.fail_now()
    }

    pub fn log(&self, message: &str) {
        self.shared.owner.log(message);
    }

    pub fn logf(&self, args: fmt::Arguments<'_>) {
        self.shared.owner.logf(args);
    }

    // ------------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------------

    pub fn with_parameters(&self, parameters: Vec<Parameter>) {
        self.shared.tree.add_parameters(self.node, parameters);
    }

    /// Add parameters from key/value pairs.
    pub fn with_new_parameters<I, K, V>(&self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.with_parameters(parameters(pairs));
    }

    pub fn with_attachments(&self, attachments: Vec<Attachment>) {
        self.shared.tree.add_attachments(self.node, attachments);
    }

    pub fn with_new_attachment(&self, name: impl Into<String>, mime_type: MimeType, content: Vec<u8>) {
        self.with_attachments(vec![Attachment::new(name, mime_type, content)]);
    }

    /// Append a prebuilt step (and its nested steps) as the next child.
    pub fn step(&self, step: Step) -> NodeId {
        self.shared.tree.insert_child(self.node, step)
    }

    /// Append a passed leaf step without creating a context for it.
    pub fn new_step(&self, name: impl Into<String>, parameters: Vec<Parameter>) -> NodeId {
        self.step(Step::new(name, parameters))
    }
}

impl fmt::Debug for StepContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("name", &self.name)
            .field("node", &self.node)
            .field("parent", &self.parent_node())
            .field("pending_async", &self.pending.pending())
            .finish()
    }
}

// ============================================================================
// AsyncStep: handle to a launched async step
// ============================================================================

enum AsyncState {
    Running(JoinHandle<StepOutcome>),
    Finished(StepOutcome),
}

/// Handle returned by [`StepContext::with_new_async_step`].
///
/// Dropping it does not cancel the step; the counter it was registered in
/// still tracks it.
pub struct AsyncStep {
    name: String,
    node: NodeId,
    state: AsyncState,
}

impl AsyncStep {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            AsyncState::Running(handle) => handle.is_finished(),
            AsyncState::Finished(_) => true,
        }
    }

    /// Wait for this step alone.
    pub fn join(mut self) -> StepOutcome {
        self.settle();
        match self.state {
            AsyncState::Finished(outcome) => outcome,
            AsyncState::Running(_) => StepOutcome::Broken,
        }
    }

    fn settle(&mut self) {
        let state = std::mem::replace(&mut self.state, AsyncState::Finished(StepOutcome::Broken));
        self.state = match state {
            AsyncState::Running(handle) => {
                AsyncState::Finished(handle.join().unwrap_or(StepOutcome::Broken))
            }
            finished => finished,
        };
    }
}

impl fmt::Debug for AsyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncStep")
            .field("name", &self.name)
            .field("node", &self.node)
            .field("finished", &self.is_finished())
            .finish()
    }
}
