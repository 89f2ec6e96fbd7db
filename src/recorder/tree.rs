use std::collections::HashMap;
use std::fmt;

use super::measurement::{Measurement, Mergeable};
use super::path::{CallPath, Frame};

/// One node of a [`MergeableTree`].
///
/// `value` holds only what was reported at exactly this path; a node that
/// exists solely as an ancestor of reported paths has no value.
#[derive(Debug, Clone)]
struct Node<T> {
    value: Option<T>,
    children: HashMap<Frame, Node<T>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            value: None,
            children: HashMap::new(),
        }
    }
}

impl<T: Mergeable> Node<T> {
    fn absorb(&mut self, value: &T) {
        self.value = Some(match self.value.take() {
            Some(existing) => existing.merge(value),
            None => value.clone(),
        });
    }

    fn merge_from(&mut self, other: &Node<T>) {
        if let Some(value) = &other.value {
            self.absorb(value);
        }
        for (frame, child) in &other.children {
            self.children
                .entry(frame.clone())
                .or_default()
                .merge_from(child);
        }
    }

    fn count(&self) -> usize {
        1 + self.children.values().map(Node::count).sum::<usize>()
    }

    fn collect<'a>(&'a self, path: &mut CallPath, out: &mut Vec<(CallPath, &'a T)>) {
        if let Some(value) = &self.value {
            out.push((path.clone(), value));
        }
        for (frame, child) in self.sorted_children() {
            path.push(frame.clone());
            child.collect(path, out);
            path.pop();
        }
    }

    fn sorted_children(&self) -> Vec<(&Frame, &Node<T>)> {
        let mut children: Vec<_> = self.children.iter().collect();
        children.sort_unstable_by(|a, b| a.0.cmp(b.0));
        children
    }
}

/// Hierarchical accumulator keyed by call path.
///
/// Not synchronized: the live tree has exactly one owner (the recording
/// worker). Readers get an independent copy through [`MergeableTree::snapshot`].
#[derive(Debug, Clone)]
pub struct MergeableTree<T> {
    root: Node<T>,
}

impl<T> Default for MergeableTree<T> {
    fn default() -> Self {
        Self {
            root: Node::default(),
        }
    }
}

impl<T: Mergeable> MergeableTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `value` into the node at exactly `path`, creating any missing
    /// nodes along the way. Ancestors are materialized but not credited.
    pub fn record_path(&mut self, path: &CallPath, value: &T) {
        let mut node = &mut self.root;
        for frame in path.frames() {
            node = node.children.entry(frame.clone()).or_default();
        }
        node.absorb(value);
    }

    /// Structural union with `other`; nodes present in both are merged.
    pub fn merge_tree(&mut self, other: &MergeableTree<T>) {
        self.root.merge_from(&other.root);
    }

    /// Owned variant of [`MergeableTree::merge_tree`].
    pub fn merged(mut self, other: &MergeableTree<T>) -> Self {
        self.merge_tree(other);
        self
    }

    /// Value recorded at exactly `path`, if any.
    pub fn get(&self, path: &CallPath) -> Option<&T> {
        let mut node = &self.root;
        for frame in path.frames() {
            node = node.children.get(frame.as_str())?;
        }
        node.value.as_ref()
    }

    /// Total number of nodes, including the root and bare ancestors.
    pub fn node_count(&self) -> usize {
        self.root.count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.value.is_none() && self.root.children.is_empty()
    }

    /// Every path holding a directly recorded value, depth-first with
    /// children in frame order.
    pub fn entries(&self) -> Vec<(CallPath, &T)> {
        let mut out = Vec::new();
        let mut path = CallPath::root();
        self.root.collect(&mut path, &mut out);
        out
    }

    /// Deep copy that never aliases this tree's storage.
    pub fn snapshot(&self) -> Snapshot<T> {
        Snapshot(self.clone())
    }
}

impl MergeableTree<Measurement> {
    /// Records one elapsed-time sample (nanoseconds) at `path`.
    pub fn record_elapsed(&mut self, path: &CallPath, elapsed_ns: f64) {
        self.record_path(path, &Measurement::from_elapsed_time(elapsed_ns));
    }
}

impl<T: Mergeable + fmt::Display> fmt::Display for MergeableTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_node<T: Mergeable + fmt::Display>(
            f: &mut fmt::Formatter<'_>,
            label: &str,
            node: &Node<T>,
            depth: usize,
        ) -> fmt::Result {
            write!(f, "{:indent$}{label}", "", indent = depth * 2)?;
            if let Some(value) = &node.value {
                write!(f, " {value}")?;
            }
            writeln!(f)?;
            for (frame, child) in node.sorted_children() {
                write_node(f, frame.as_str(), child, depth + 1)?;
            }
            Ok(())
        }

        write_node(f, "<root>", &self.root, 0)
    }
}

/// Frozen, independently readable copy of a [`MergeableTree`].
#[derive(Debug, Clone)]
pub struct Snapshot<T>(MergeableTree<T>);

impl<T: Mergeable> Snapshot<T> {
    pub fn get(&self, path: &CallPath) -> Option<&T> {
        self.0.get(path)
    }

    pub fn node_count(&self) -> usize {
        self.0.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> Vec<(CallPath, &T)> {
        self.0.entries()
    }

    pub fn as_tree(&self) -> &MergeableTree<T> {
        &self.0
    }

    /// Thaws the snapshot into a tree that can be merged further.
    pub fn into_tree(self) -> MergeableTree<T> {
        self.0
    }
}

impl<T: Mergeable + fmt::Display> fmt::Display for Snapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
