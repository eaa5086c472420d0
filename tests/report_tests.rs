use step_context::report::console::{RenderOptions, format_step_tree};
use step_context::report::report_model::TreeSummary;
use step_context::{Attachment, MimeType, Status, StatusDetails, Step, parameters};

// ============================================================================
// Helper builders
// ============================================================================

fn checkout_tree() -> Step {
    Step::new("checkout", Vec::new())
        .with_status(Status::Broken)
        .with_child(Step::new("add item", parameters([("sku", "42")])))
        .with_child(
            Step::new("pay", Vec::new())
                .with_status(Status::Failed)
                .with_details(StatusDetails::new("card declined")),
        )
        .with_child(
            Step::new("render receipt", Vec::new())
                .with_status(Status::Broken)
                .with_details(
                    StatusDetails::new("index out of bounds\nsecond line").with_trace("frame 0"),
                )
                .with_attachment(Attachment::new("receipt", MimeType::Html, b"<p/>".to_vec())),
        )
}

// ============================================================================
// 1. Summary counts
// ============================================================================

#[test]
fn summary_counts_every_node() {
    let summary = TreeSummary::from_step(&checkout_tree());
    assert_eq!(summary.total, 4);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.broken, 2);
    assert_eq!(summary.depth, 2);
    assert!(!summary.all_passed());
}

#[test]
fn summary_of_passing_tree() {
    let tree = Step::new("root", Vec::new())
        .with_child(Step::new("a", Vec::new()).with_child(Step::new("a.1", Vec::new())));
    let summary = TreeSummary::from_step(&tree);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.depth, 3);
    assert!(summary.all_passed());
}

// ============================================================================
// 2. Console rendering
// ============================================================================

#[test]
fn console_tree_shows_markers_and_indentation() {
    let output = format_step_tree(&checkout_tree(), &RenderOptions::default());

    assert!(output.starts_with("! checkout"));
    assert!(output.contains("\n  \u{2713} add item [sku=42]\n"));
    assert!(output.contains("\n  \u{2717} pay\n"));
    assert!(output.contains("failed: card declined"));
    assert!(output.contains("\n  ! render receipt\n"));
}

#[test]
fn console_tree_shows_only_first_detail_line() {
    let output = format_step_tree(&checkout_tree(), &RenderOptions::default());
    assert!(output.contains("broken: index out of bounds\n"));
    assert!(!output.contains("second line"));
    assert!(!output.contains("frame 0"));
}

#[test]
fn console_tree_lists_attachments() {
    let output = format_step_tree(&checkout_tree(), &RenderOptions::default());
    assert!(output.contains("@ receipt (text/html, "));
    assert!(output.contains("-attachment.html)"));
}

#[test]
fn console_tree_can_hide_parameters_and_attachments() {
    let options = RenderOptions {
        show_parameters: false,
        show_attachments: false,
    };
    let output = format_step_tree(&checkout_tree(), &options);
    assert!(!output.contains("[sku=42]"));
    assert!(!output.contains("@ receipt"));
}

#[test]
fn console_tree_ends_with_summary_line() {
    let output = format_step_tree(&checkout_tree(), &RenderOptions::default());
    assert!(output.ends_with("=== Steps: 1 passed, 1 failed, 2 broken (4 total) ===\n"));
}
