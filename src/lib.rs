//! Hierarchical step contexts for structured test reporting.
//!
//! A [`StepContext`] owns one node of a report tree. Nested steps run either
//! on the calling thread ([`StepContext::with_new_step`]) or on their own
//! thread ([`StepContext::with_new_async_step`]); every step call is a panic
//! boundary, and failures escalate the status of every ancestor.
//!
//! ```no_run
//! use std::sync::Arc;
//! use step_context::{ExecutionContext, RecordingHandle, StepContext};
//!
//! let owner = Arc::new(RecordingHandle::new());
//! let root = StepContext::new(owner.clone(), Arc::new(ExecutionContext::Test), "login", Vec::new());
//!
//! root.with_new_step("open page", |ctx| {
//!     ctx.with_new_parameters([("url", "https://example.com")]);
//!     ctx.assert().is_true(true, "page is open");
//! }, Vec::new());
//!
//! root.wait();
//! let tree = root.current_step();
//! assert_eq!(tree.steps.len(), 1);
//! ```

pub mod asserts;
pub mod cli;
pub mod context;
pub mod error;
pub mod model;
pub mod report;

pub use asserts::{AssertMode, Asserts};
pub use context::handle::{Environment, ExecutionContext, FatalAbort, RecordingHandle, TestHandle, fatal_abort};
pub use context::step_context::{AsyncStep, StepContext, StepOutcome, StepSettings};
pub use context::tree::{NodeId, StepTree};
pub use context::wait_group::{WaitGroup, WaitGuard};
pub use error::StepError;
pub use model::status::{Status, StatusDetails};
pub use model::step_model::{Attachment, MimeType, Parameter, Step, parameters};
