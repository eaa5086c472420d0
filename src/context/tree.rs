use std::sync::{Mutex, MutexGuard};

use crate::model::status::{Status, StatusDetails};
use crate::model::step_model::{Attachment, Parameter, Step, now_ms};

/// Index of a node in a [`StepTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Stored node: the step's own fields plus arena links.
///
/// `step.steps` stays empty in storage; children live in `children` and are
/// assembled by [`StepTree::snapshot`].
#[derive(Debug)]
struct StepRecord {
    step: Step,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena of report nodes shared by every context of one root.
///
/// Parent links are ids, so contexts can walk the ancestor chain without
/// holding references to each other. User code never runs under the lock.
#[derive(Debug)]
pub struct StepTree {
    nodes: Mutex<Vec<StepRecord>>,
}

impl StepTree {
    /// New tree holding a single root node.
    pub fn new(root: Step) -> (Self, NodeId) {
        let tree = Self {
            nodes: Mutex::new(Vec::new()),
        };
        let id = {
            let mut nodes = tree.lock();
            push_subtree(&mut nodes, root, None)
        };
        (tree, id)
    }

    /// Append `step` (with any nested steps it already carries) as the last
    /// child of `parent`.
    pub fn insert_child(&self, parent: NodeId, step: Step) -> NodeId {
        let mut nodes = self.lock();
        push_subtree(&mut nodes, step, Some(parent))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.lock().get(id.0).and_then(|r| r.parent)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.lock()
            .get(id.0)
            .map(|r| r.children.clone())
            .unwrap_or_default()
    }

    pub fn status(&self, id: NodeId) -> Status {
        self.lock()
            .get(id.0)
            .map(|r| r.step.status)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Escalate `id` and every ancestor to at least `status`.
    ///
    /// The whole chain is updated under one lock acquisition.
    pub fn escalate_chain(&self, id: NodeId, status: Status) {
        let mut nodes = self.lock();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(record) = nodes.get_mut(current.0) else {
                break;
            };
            record.step.status = record.step.status.escalate(status);
            cursor = record.parent;
        }
    }

    /// Set status details unless the node already has some.
    pub fn set_details(&self, id: NodeId, details: StatusDetails) {
        self.update(id, |step| {
            if step.status_details.is_none() {
                step.status_details = Some(details);
            }
        });
    }

    pub fn add_parameters(&self, id: NodeId, parameters: Vec<Parameter>) {
        self.update(id, |step| step.parameters.extend(parameters));
    }

    pub fn add_attachments(&self, id: NodeId, attachments: Vec<Attachment>) {
        self.update(id, |step| step.attachments.extend(attachments));
    }

    /// Record the stop timestamp.
    pub fn finish(&self, id: NodeId) {
        self.update(id, |step| step.stop = now_ms());
    }

    /// Owned copy of the node and its whole subtree.
    pub fn snapshot(&self, id: NodeId) -> Option<Step> {
        let nodes = self.lock();
        build_snapshot(&nodes, id)
    }

    fn update(&self, id: NodeId, f: impl FnOnce(&mut Step)) {
        let mut nodes = self.lock();
        if let Some(record) = nodes.get_mut(id.0) {
            f(&mut record.step);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StepRecord>> {
        self.nodes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn push_subtree(nodes: &mut Vec<StepRecord>, mut step: Step, parent: Option<NodeId>) -> NodeId {
    let nested = std::mem::take(&mut step.steps);
    let id = NodeId(nodes.len());
    nodes.push(StepRecord {
        step,
        parent,
        children: Vec::new(),
    });
    if let Some(record) = parent.and_then(|p| nodes.get_mut(p.0)) {
        record.children.push(id);
    }
    for child in nested {
        push_subtree(nodes, child, Some(id));
    }
    id
}

fn build_snapshot(nodes: &[StepRecord], id: NodeId) -> Option<Step> {
    let record = nodes.get(id.0)?;
    let mut step = record.step.clone();
    step.steps = record
        .children
        .iter()
        .filter_map(|child| build_snapshot(nodes, *child))
        .collect();
    Some(step)
}
