use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::constants::SUMMARY_MAX_CHARS;

/// Opaque node handle: a dense index into the tree's arena.
///
/// Ids are allocated in creation order and never reused, so a child's id
/// is always strictly greater than its parent's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One question/answer exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub question: String,
    /// Markdown from the answerer; always present, a node only exists
    /// once its queue item resolved.
    pub answer: String,
    /// Short caption shown in the tree. Derived once, never updated.
    pub summary: String,
    pub created_at: DateTime<Local>,
    #[serde(default)]
    pub parent: Option<NodeId>,
    /// Creation order; traversal and rendering order.
    #[serde(default)]
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    pub total: usize,
    pub roots: usize,
    pub follow_ups: usize,
    pub max_depth: usize,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TreeError {
    /// `add_node` was given a parent id that is not in the tree.
    UnknownParent(NodeId),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::UnknownParent(id) => write!(f, "unknown parent node {}", id),
        }
    }
}

impl std::error::Error for TreeError {}

/// Forest of exchanges for one content item. Append-only: nodes are
/// never edited or deleted, parents and child order never change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    /// Derived content key (see `slugify`); one record per key.
    pub key: String,
    pub nodes: Vec<Node>,
    pub roots: Vec<NodeId>,
}

impl Tree {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), nodes: Vec::new(), roots: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Append a resolved exchange. `parent` of `None` creates a new root;
    /// otherwise the node is appended to the parent's children.
    pub fn add_node(
        &mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
        summary: impl Into<String>,
        parent: Option<NodeId>,
    ) -> Result<NodeId, TreeError> {
        if let Some(p) = parent
            && !self.contains(p)
        {
            return Err(TreeError::UnknownParent(p));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            question: question.into(),
            answer: answer.into(),
            summary: summary.into(),
            created_at: Local::now(),
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Depth of a node: roots are 0.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(|n| n.parent);
        while let Some(p) = current {
            depth += 1;
            current = self.get(p).and_then(|n| n.parent);
        }
        depth
    }

    /// The root-to-node chain, root first. Used by the filing flow.
    pub fn chain(&self, id: NodeId) -> Vec<&Node> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            let node = &self.nodes[c.0];
            chain.push(node);
            current = node.parent;
        }
        chain.reverse();
        chain
    }

    pub fn stats(&self) -> TreeStats {
        let total = self.nodes.len();
        let roots = self.roots.len();
        let max_depth = (0..total).map(|i| self.depth(NodeId(i))).max().unwrap_or(0);
        TreeStats { total, roots, follow_ups: total - roots, max_depth }
    }

    /// Structural validation of a deserialized tree. Construction keeps
    /// these invariants automatically; loads must re-check them.
    pub fn validate(&self) -> Result<(), String> {
        for (i, node) in self.nodes.iter().enumerate() {
            if node.id.0 != i {
                return Err(format!("node at index {} carries id {}", i, node.id));
            }
            for &child in &node.children {
                if !self.contains(child) {
                    return Err(format!("node {} references missing child {}", node.id, child));
                }
                // append-only construction means children are younger
                if child.0 <= i {
                    return Err(format!("node {} has non-descendant child {}", node.id, child));
                }
                if self.nodes[child.0].parent != Some(node.id) {
                    return Err(format!("child {} does not point back to {}", child, node.id));
                }
            }
        }
        // every node is referenced exactly once: as a root or as a child
        let mut seen = vec![false; self.nodes.len()];
        for &r in &self.roots {
            if !self.contains(r) {
                return Err(format!("missing root {}", r));
            }
            if self.nodes[r.0].parent.is_some() {
                return Err(format!("root {} has a parent", r));
            }
            if std::mem::replace(&mut seen[r.0], true) {
                return Err(format!("root {} listed twice", r));
            }
        }
        for node in &self.nodes {
            for &child in &node.children {
                if std::mem::replace(&mut seen[child.0], true) {
                    return Err(format!("node {} has two incoming references", child));
                }
            }
        }
        if let Some(orphan) = seen.iter().position(|&s| !s) {
            return Err(format!("node #{} is unreachable", orphan));
        }
        Ok(())
    }
}

/// Fallback caption when no summarizer is available or it failed:
/// the question itself, truncated on a char boundary.
pub fn truncate_summary(question: &str) -> String {
    if question.chars().count() <= SUMMARY_MAX_CHARS {
        question.to_string()
    } else {
        let cut: String = question.chars().take(SUMMARY_MAX_CHARS).collect();
        format!("{}...", cut.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_root_and_follow_up() {
        let mut tree = Tree::new("t");
        let root = tree.add_node("q1", "a1", "s1", None).unwrap();
        let child = tree.add_node("q2", "a2", "s2", Some(root)).unwrap();
        assert_eq!(tree.roots, vec![root]);
        assert_eq!(tree.get(root).unwrap().children, vec![child]);
        assert_eq!(tree.get(child).unwrap().parent, Some(root));
        assert_eq!(tree.depth(child), 1);
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut tree = Tree::new("t");
        let err = tree.add_node("q", "a", "s", Some(NodeId(7))).unwrap_err();
        assert_eq!(err, TreeError::UnknownParent(NodeId(7)));
        assert!(tree.is_empty());
    }

    #[test]
    fn stats_invariant_follow_ups_plus_roots() {
        let mut tree = Tree::new("t");
        let r1 = tree.add_node("q1", "a", "s", None).unwrap();
        let r2 = tree.add_node("q2", "a", "s", None).unwrap();
        let c1 = tree.add_node("q3", "a", "s", Some(r1)).unwrap();
        tree.add_node("q4", "a", "s", Some(c1)).unwrap();
        tree.add_node("q5", "a", "s", Some(r2)).unwrap();
        let stats = tree.stats();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.roots, 2);
        assert_eq!(stats.follow_ups + stats.roots, stats.total);
        assert_eq!(stats.max_depth, 2);
    }

    #[test]
    fn empty_tree_stats() {
        let stats = Tree::new("t").stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.max_depth, 0);
    }

    #[test]
    fn chain_is_root_first() {
        let mut tree = Tree::new("t");
        let r = tree.add_node("root", "a", "s", None).unwrap();
        let c = tree.add_node("mid", "a", "s", Some(r)).unwrap();
        let g = tree.add_node("leaf", "a", "s", Some(c)).unwrap();
        let chain: Vec<&str> = tree.chain(g).iter().map(|n| n.question.as_str()).collect();
        assert_eq!(chain, vec!["root", "mid", "leaf"]);
    }

    #[test]
    fn validate_accepts_constructed_tree() {
        let mut tree = Tree::new("t");
        let r = tree.add_node("q", "a", "s", None).unwrap();
        tree.add_node("q2", "a", "s", Some(r)).unwrap();
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn validate_rejects_double_reference() {
        let mut tree = Tree::new("t");
        let r = tree.add_node("q", "a", "s", None).unwrap();
        let c = tree.add_node("q2", "a", "s", Some(r)).unwrap();
        // corrupt: child referenced twice
        tree.nodes[r.0].children.push(c);
        assert!(tree.validate().is_err());
    }

    #[test]
    fn validate_rejects_orphan() {
        let mut tree = Tree::new("t");
        let r = tree.add_node("q", "a", "s", None).unwrap();
        tree.add_node("q2", "a", "s", Some(r)).unwrap();
        // corrupt: detach the child without removing the node
        tree.nodes[r.0].children.clear();
        assert!(tree.validate().is_err());
    }

    #[test]
    fn summary_truncation() {
        assert_eq!(truncate_summary("short"), "short");
        let long = "x".repeat(100);
        let s = truncate_summary(&long);
        assert!(s.ends_with("..."));
        assert!(s.chars().count() <= SUMMARY_MAX_CHARS + 3);
    }
}
