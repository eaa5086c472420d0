use std::sync::Arc;

use crate::cli::config::{OutputFormat, StepConfig};
use crate::context::handle::{ExecutionContext, RecordingHandle};
use crate::context::step_context::StepContext;
use crate::error::StepError;
use crate::model::step_model::{MimeType, Parameter, Step, parameters};
use crate::report::console::format_step_tree;
use crate::report::report_model::TreeSummary;

// ============================================================================
// demo subcommand
// ============================================================================

/// Behaviour of one demo async step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoKind {
    Pass,
    Fail,
    Panic,
}

/// The first `panics` steps panic, the next `failures` fail, the rest pass.
pub fn demo_plan(async_steps: usize, panics: usize, failures: usize) -> Vec<DemoKind> {
    (0..async_steps)
        .map(|i| {
            if i < panics {
                DemoKind::Panic
            } else if i < panics.saturating_add(failures) {
                DemoKind::Fail
            } else {
                DemoKind::Pass
            }
        })
        .collect()
}

/// Build the demo tree: one synchronous setup step followed by the planned
/// async steps, all joined before returning.
pub fn run_demo(plan: &[DemoKind], config: &StepConfig) -> (Step, Arc<RecordingHandle>) {
    let owner = Arc::new(RecordingHandle::new());
    let root = StepContext::with_settings(
        owner.clone(),
        Arc::new(ExecutionContext::Test),
        config.steps.clone(),
        "demo",
        parameters([("async_steps", plan.len())]),
    );

    root.with_new_step(
        "setup",
        |ctx| {
            ctx.with_new_parameters([("seed", "42")]);
            ctx.with_new_attachment("plan", MimeType::Text, format!("{:?}", plan).into_bytes());
            ctx.new_step("fixtures loaded", Vec::new());
        },
        Vec::new(),
    );

    for (i, kind) in plan.iter().copied().enumerate() {
        root.with_new_async_step(
            format!("async step {}", i),
            move |ctx| match kind {
                DemoKind::Pass => {
                    ctx.assert().equal(i, i, "index matches");
                }
                DemoKind::Fail => {
                    ctx.assert().equal(i, i + 1, "index is off by one");
                }
                DemoKind::Panic => panic!("async step {} crashed", i),
            },
            vec![Parameter::new("kind", format!("{:?}", kind))],
        );
    }

    root.wait();
    (root.current_step(), owner)
}

pub fn cmd_demo(
    async_steps: usize,
    panics: usize,
    failures: usize,
    format: Option<&str>,
    config: &StepConfig,
    verbose: u8,
) -> Result<bool, StepError> {
    let format: OutputFormat = format.unwrap_or(&config.report.format).parse()?;
    let plan = demo_plan(async_steps, panics, failures);

    if verbose > 0 {
        eprintln!(
            "Running demo ({} async steps, {} panics, {} failures)...",
            async_steps, panics, failures
        );
    }

    let (tree, owner) = run_demo(&plan, config);
    print_tree(&tree, format, config)?;

    if verbose > 0 {
        eprintln!("Owner handle recorded {} error(s)", owner.errors().len());
    }

    Ok(TreeSummary::from_step(&tree).all_passed())
}

// ============================================================================
// render subcommand
// ============================================================================

pub fn cmd_render(input: &str, format: Option<&str>, config: &StepConfig) -> Result<bool, StepError> {
    let format: OutputFormat = format.unwrap_or(&config.report.format).parse()?;
    let content = std::fs::read_to_string(input).map_err(|source| StepError::Read {
        path: input.to_string(),
        source,
    })?;
    let tree: Step = serde_json::from_str(&content)?;

    print_tree(&tree, format, config)?;
    Ok(TreeSummary::from_step(&tree).all_passed())
}

fn print_tree(tree: &Step, format: OutputFormat, config: &StepConfig) -> Result<(), StepError> {
    match format {
        OutputFormat::Console => {
            print!("{}", format_step_tree(tree, &config.report.render_options()));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(tree)?);
        }
    }
    Ok(())
}
