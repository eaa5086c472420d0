use crate::model::status::Status;
use crate::model::step_model::Step;
use crate::report::report_model::TreeSummary;

// ============================================================================
// Console renderer: indented step tree for terminal output
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub show_parameters: bool,
    pub show_attachments: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_parameters: true,
            show_attachments: true,
        }
    }
}

/// Format a step tree for terminal output.
///
/// Produces output like:
/// ```text
/// ! checkout (12ms)
///   ✓ add item [sku=42]
///   ✗ pay (3ms)
///       failed: card declined
///   ! render receipt
///       broken: index out of bounds
///
/// === Steps: 1 passed, 1 failed, 2 broken (4 total) ===
/// ```
pub fn format_step_tree(root: &Step, options: &RenderOptions) -> String {
    let mut out = String::new();
    render_step(&mut out, root, 0, options);

    let summary = TreeSummary::from_step(root);
    out.push_str(&format!(
        "\n=== Steps: {} passed, {} failed, {} broken ({} total) ===\n",
        summary.passed, summary.failed, summary.broken, summary.total
    ));
    out
}

fn render_step(out: &mut String, step: &Step, depth: usize, options: &RenderOptions) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!("{}{} {}", indent, marker(step.status), step.name));

    if options.show_parameters && !step.parameters.is_empty() {
        let params: Vec<String> = step
            .parameters
            .iter()
            .map(|p| format!("{}={}", p.name, p.value))
            .collect();
        out.push_str(&format!(" [{}]", params.join(", ")));
    }

    let duration = step.duration_ms();
    if duration > 0 {
        out.push_str(&format!(" ({}ms)", duration));
    }
    out.push('\n');

    if let Some(details) = &step.status_details {
        // first line only, traces are too long for the console
        let first = details.message.lines().next().unwrap_or("");
        out.push_str(&format!("{}    {}: {}\n", indent, step.status, first));
    }

    if options.show_attachments {
        for attachment in &step.attachments {
            out.push_str(&format!(
                "{}    @ {} ({}, {})\n",
                indent, attachment.name, attachment.mime_type, attachment.source
            ));
        }
    }

    for child in &step.steps {
        render_step(out, child, depth + 1, options);
    }
}

fn marker(status: Status) -> &'static str {
    match status {
        Status::Passed => "\u{2713}",
        Status::Failed => "\u{2717}",
        Status::Broken => "!",
    }
}
