use std::fmt::{Debug, Display};

use crate::context::step_context::StepContext;
use crate::model::status::{Status, StatusDetails};
use crate::model::step_model::{Parameter, Step};

/// Non-fatal `Assert` keeps the step running after a failed check; `Require`
/// aborts the current thread of execution through the owner handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertMode {
    Assert,
    Require,
}

impl AssertMode {
    fn prefix(&self) -> &'static str {
        match self {
            AssertMode::Assert => "ASSERT",
            AssertMode::Require => "REQUIRE",
        }
    }
}

/// Check reporter bound to one [`StepContext`].
///
/// Every check is recorded as a leaf step under the bound context. A failed
/// check reports an error through the context, which taints the step tree.
#[derive(Debug, Clone, Copy)]
pub struct Asserts<'a> {
    ctx: &'a StepContext,
    mode: AssertMode,
}

impl<'a> Asserts<'a> {
    pub fn new(ctx: &'a StepContext, mode: AssertMode) -> Self {
        Self { ctx, mode }
    }

    pub fn mode(&self) -> AssertMode {
        self.mode
    }

    /// Record an already-evaluated check.
    pub fn check(&self, name: &str, passed: bool, message: impl Display) -> bool {
        self.record(name, passed, Vec::new(), message)
    }

    pub fn equal<T: PartialEq + Debug>(&self, expected: T, actual: T, message: impl Display) -> bool {
        let passed = expected == actual;
        self.record("Equal", passed, compared(&expected, &actual), message)
    }

    pub fn not_equal<T: PartialEq + Debug>(&self, expected: T, actual: T, message: impl Display) -> bool {
        let passed = expected != actual;
        self.record("Not Equal", passed, compared(&expected, &actual), message)
    }

    pub fn is_true(&self, value: bool, message: impl Display) -> bool {
        let params = vec![Parameter::new("Actual", value)];
        self.record("True", value, params, message)
    }

    pub fn is_false(&self, value: bool, message: impl Display) -> bool {
        let params = vec![Parameter::new("Actual", value)];
        self.record("False", !value, params, message)
    }

    pub fn is_some<T: Debug>(&self, value: &Option<T>, message: impl Display) -> bool {
        let params = vec![Parameter::new("Actual", format!("{:?}", value))];
        self.record("Some", value.is_some(), params, message)
    }

    pub fn is_ok<T: Debug, E: Debug>(&self, value: &Result<T, E>, message: impl Display) -> bool {
        let params = vec![Parameter::new("Actual", format!("{:?}", value))];
        self.record("Ok", value.is_ok(), params, message)
    }

    fn record(&self, name: &str, passed: bool, params: Vec<Parameter>, message: impl Display) -> bool {
        let title = format!("{}: {}", self.mode.prefix(), name);
        if passed {
            self.ctx.step(Step::new(title, params));
            return true;
        }

        let message = message.to_string();
        self.ctx.step(
            Step::new(title, params)
                .with_status(Status::Failed)
                .with_details(StatusDetails::new(message.clone())),
        );
        self.ctx.errorf(format_args!("{}: {}", name, message));
        if self.mode == AssertMode::Require {
            self.ctx.fail_now();
        }
        false
    }
}

fn compared<T: Debug>(expected: &T, actual: &T) -> Vec<Parameter> {
    vec![
        Parameter::new("Expected", format!("{:?}", expected)),
        Parameter::new("Actual", format!("{:?}", actual)),
    ]
}
