//! Navigator: cursor, expansion and viewport state over one tree.
//!
//! The state machine is a plain state object plus pure transition
//! functions; everything terminal-related lives in `run` and `render`.
//! The visible tree is derived purely from `{tree, expanded, selected}`,
//! so the Navigator can always be rebuilt from current store state.

pub mod render;
pub mod run;

use std::collections::HashSet;

use crate::state::{NodeId, Tree};

/// Sub-view facet of the navigation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavMode {
    Tree,
    /// Full question/answer of the selected node.
    Detail { scroll: usize },
    /// Line input scoped to the selected node; each submitted line
    /// becomes a follow-up queue item.
    FollowUp { input: String },
}

/// One discrete input event, already mapped from the raw key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    Up,
    Down,
    Expand,
    Collapse,
    Open,
    StartFollowUp,
    RequestFile,
    Dismiss,
    Quit,
    Input(char),
    Backspace,
    Submit,
}

/// Side effects a transition asks the caller to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEffect {
    FollowUpQueued { target: NodeId, question: String },
    Exit(NavOutcome),
}

/// Why the Navigator closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Quit,
    /// The user asked to file the selected node into the vault.
    FileNode(NodeId),
}

#[derive(Debug, Clone)]
pub struct NavState {
    pub selected: Option<NodeId>,
    pub expanded: HashSet<NodeId>,
    /// First visible row of the tree viewport.
    pub offset: usize,
    /// Rows available to the tree list; updated by the render loop.
    pub viewport_rows: usize,
    pub mode: NavMode,
}

impl NavState {
    /// Fresh state for an opened Navigator: all roots expanded, first
    /// visible node selected. Never persisted.
    pub fn open(tree: &Tree) -> Self {
        let expanded: HashSet<NodeId> = tree.roots.iter().copied().collect();
        let selected = tree.roots.first().copied();
        Self { selected, expanded, offset: 0, viewport_rows: 20, mode: NavMode::Tree }
    }
}

/// Nodes currently shown, in depth-first order with expanded children
/// inline. Derived purely from the tree and the expansion set.
pub fn visible_nodes(tree: &Tree, expanded: &HashSet<NodeId>) -> Vec<NodeId> {
    fn walk(tree: &Tree, expanded: &HashSet<NodeId>, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        if expanded.contains(&id) {
            for &child in &tree.nodes[id.0].children {
                walk(tree, expanded, child, out);
            }
        }
    }
    let mut out = Vec::new();
    for &root in &tree.roots {
        walk(tree, expanded, root, &mut out);
    }
    out
}

/// Apply one event. Pure: mutates only `state`, reports side effects.
pub fn apply(state: &mut NavState, tree: &Tree, event: NavEvent) -> Option<NavEffect> {
    match &mut state.mode {
        NavMode::Tree => apply_tree(state, tree, event),
        NavMode::Detail { scroll } => match event {
            NavEvent::Up => {
                *scroll = scroll.saturating_sub(1);
                None
            }
            NavEvent::Down => {
                *scroll += 1;
                None
            }
            NavEvent::RequestFile => {
                state.selected.map(|id| NavEffect::Exit(NavOutcome::FileNode(id)))
            }
            NavEvent::Dismiss | NavEvent::Open | NavEvent::Quit => {
                state.mode = NavMode::Tree;
                None
            }
            _ => None,
        },
        NavMode::FollowUp { input } => match event {
            NavEvent::Input(c) => {
                input.push(c);
                None
            }
            NavEvent::Backspace => {
                input.pop();
                None
            }
            NavEvent::Submit => {
                let line = std::mem::take(input);
                let line = line.trim().to_string();
                // sentinel: an empty line or "done" ends the sub-mode
                if line.is_empty() || line.eq_ignore_ascii_case("done") {
                    state.mode = NavMode::Tree;
                    return None;
                }
                let target = state.selected?;
                Some(NavEffect::FollowUpQueued { target, question: line })
            }
            NavEvent::Dismiss => {
                state.mode = NavMode::Tree;
                None
            }
            _ => None,
        },
    }
}

fn apply_tree(state: &mut NavState, tree: &Tree, event: NavEvent) -> Option<NavEffect> {
    match event {
        NavEvent::Up => {
            move_selection(state, tree, -1);
            None
        }
        NavEvent::Down => {
            move_selection(state, tree, 1);
            None
        }
        NavEvent::Expand => {
            if let Some(id) = state.selected
                && !tree.nodes[id.0].children.is_empty()
            {
                state.expanded.insert(id);
            }
            None
        }
        NavEvent::Collapse => {
            if let Some(id) = state.selected {
                if state.expanded.contains(&id) {
                    state.expanded.remove(&id);
                } else if let Some(parent) = tree.nodes[id.0].parent {
                    // collapsed root stays selected
                    state.selected = Some(parent);
                }
                clamp_viewport(state, tree);
            }
            None
        }
        NavEvent::Open => {
            if state.selected.is_some() {
                state.mode = NavMode::Detail { scroll: 0 };
            }
            None
        }
        NavEvent::StartFollowUp => {
            if state.selected.is_some() {
                state.mode = NavMode::FollowUp { input: String::new() };
            }
            None
        }
        NavEvent::Quit => Some(NavEffect::Exit(NavOutcome::Quit)),
        _ => None,
    }
}

fn move_selection(state: &mut NavState, tree: &Tree, delta: isize) {
    let visible = visible_nodes(tree, &state.expanded);
    if visible.is_empty() {
        state.selected = None;
        return;
    }
    let current = state
        .selected
        .and_then(|sel| visible.iter().position(|&id| id == sel))
        .unwrap_or(0);
    let next = current.saturating_add_signed(delta).min(visible.len() - 1);
    state.selected = Some(visible[next]);
    clamp_viewport(state, tree);
}

/// Keep the selected row inside the viewport.
fn clamp_viewport(state: &mut NavState, tree: &Tree) {
    let visible = visible_nodes(tree, &state.expanded);
    let Some(row) = state.selected.and_then(|sel| visible.iter().position(|&id| id == sel)) else {
        state.offset = 0;
        return;
    };
    let rows = state.viewport_rows.max(1);
    if row < state.offset {
        state.offset = row;
    } else if row >= state.offset + rows {
        state.offset = row + 1 - rows;
    }
    // never scroll past the end
    state.offset = state.offset.min(visible.len().saturating_sub(1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Tree;

    /// root0 -> (child1 -> grand3, child2), root4
    fn sample_tree() -> Tree {
        let mut tree = Tree::new("t");
        let r0 = tree.add_node("r0", "a", "r0", None).unwrap();
        let c1 = tree.add_node("c1", "a", "c1", Some(r0)).unwrap();
        tree.add_node("c2", "a", "c2", Some(r0)).unwrap();
        tree.add_node("g3", "a", "g3", Some(c1)).unwrap();
        tree.add_node("r4", "a", "r4", None).unwrap();
        tree
    }

    fn assert_visible(state: &NavState, tree: &Tree) {
        if let Some(sel) = state.selected {
            let visible = visible_nodes(tree, &state.expanded);
            assert!(visible.contains(&sel), "selected {} not visible", sel);
        }
    }

    #[test]
    fn open_expands_roots_and_selects_first() {
        let tree = sample_tree();
        let state = NavState::open(&tree);
        assert_eq!(state.selected, Some(NodeId(0)));
        assert!(state.expanded.contains(&NodeId(0)));
        assert!(state.expanded.contains(&NodeId(4)));
        // roots expanded but grandchildren hidden
        let visible = visible_nodes(&tree, &state.expanded);
        assert_eq!(visible, vec![NodeId(0), NodeId(1), NodeId(2), NodeId(4)]);
    }

    #[test]
    fn move_clamps_at_both_ends() {
        let tree = sample_tree();
        let mut state = NavState::open(&tree);
        apply(&mut state, &tree, NavEvent::Up);
        assert_eq!(state.selected, Some(NodeId(0)));
        for _ in 0..10 {
            apply(&mut state, &tree, NavEvent::Down);
        }
        assert_eq!(state.selected, Some(NodeId(4)));
        assert_visible(&state, &tree);
    }

    #[test]
    fn expand_reveals_children_in_dfs_order() {
        let tree = sample_tree();
        let mut state = NavState::open(&tree);
        apply(&mut state, &tree, NavEvent::Down); // c1
        apply(&mut state, &tree, NavEvent::Expand);
        let visible = visible_nodes(&tree, &state.expanded);
        assert_eq!(visible, vec![NodeId(0), NodeId(1), NodeId(3), NodeId(2), NodeId(4)]);
        // selection unchanged by expand
        assert_eq!(state.selected, Some(NodeId(1)));
    }

    #[test]
    fn expand_on_leaf_is_a_noop() {
        let tree = sample_tree();
        let mut state = NavState::open(&tree);
        for _ in 0..2 {
            apply(&mut state, &tree, NavEvent::Down); // c2
        }
        let before = state.expanded.clone();
        apply(&mut state, &tree, NavEvent::Expand);
        assert_eq!(state.expanded, before);
    }

    #[test]
    fn collapse_folds_then_jumps_to_parent() {
        let tree = sample_tree();
        let mut state = NavState::open(&tree);
        apply(&mut state, &tree, NavEvent::Down); // c1 (not expanded)
        apply(&mut state, &tree, NavEvent::Collapse);
        assert_eq!(state.selected, Some(NodeId(0)), "jumps to parent");
        apply(&mut state, &tree, NavEvent::Collapse);
        assert!(!state.expanded.contains(&NodeId(0)), "root folds");
        apply(&mut state, &tree, NavEvent::Collapse);
        assert_eq!(state.selected, Some(NodeId(0)), "collapsed root stays selected");
        assert_visible(&state, &tree);
    }

    #[test]
    fn selection_stays_visible_under_event_storm() {
        let tree = sample_tree();
        let mut state = NavState::open(&tree);
        let storm = [
            NavEvent::Down,
            NavEvent::Expand,
            NavEvent::Down,
            NavEvent::Down,
            NavEvent::Collapse,
            NavEvent::Collapse,
            NavEvent::Up,
            NavEvent::Collapse,
            NavEvent::Down,
            NavEvent::Expand,
            NavEvent::Collapse,
            NavEvent::Collapse,
        ];
        for event in storm {
            apply(&mut state, &tree, event);
            assert_visible(&state, &tree);
        }
    }

    #[test]
    fn detail_opens_and_dismisses_without_changing_tree_state() {
        let tree = sample_tree();
        let mut state = NavState::open(&tree);
        apply(&mut state, &tree, NavEvent::Down);
        let selected = state.selected;
        let expanded = state.expanded.clone();
        apply(&mut state, &tree, NavEvent::Open);
        assert!(matches!(state.mode, NavMode::Detail { .. }));
        apply(&mut state, &tree, NavEvent::Dismiss);
        assert_eq!(state.mode, NavMode::Tree);
        assert_eq!(state.selected, selected);
        assert_eq!(state.expanded, expanded);
    }

    #[test]
    fn follow_up_submits_lines_until_sentinel() {
        let tree = sample_tree();
        let mut state = NavState::open(&tree);
        apply(&mut state, &tree, NavEvent::StartFollowUp);
        for c in "why?".chars() {
            apply(&mut state, &tree, NavEvent::Input(c));
        }
        let effect = apply(&mut state, &tree, NavEvent::Submit);
        assert_eq!(
            effect,
            Some(NavEffect::FollowUpQueued { target: NodeId(0), question: "why?".into() })
        );
        // still in the sub-mode, navigator still open
        assert!(matches!(state.mode, NavMode::FollowUp { .. }));
        let effect = apply(&mut state, &tree, NavEvent::Submit); // empty = sentinel
        assert_eq!(effect, None);
        assert_eq!(state.mode, NavMode::Tree);
    }

    #[test]
    fn quit_exits_with_outcome() {
        let tree = sample_tree();
        let mut state = NavState::open(&tree);
        let effect = apply(&mut state, &tree, NavEvent::Quit);
        assert_eq!(effect, Some(NavEffect::Exit(NavOutcome::Quit)));
    }

    #[test]
    fn file_request_from_detail_carries_node() {
        let tree = sample_tree();
        let mut state = NavState::open(&tree);
        apply(&mut state, &tree, NavEvent::Open);
        let effect = apply(&mut state, &tree, NavEvent::RequestFile);
        assert_eq!(effect, Some(NavEffect::Exit(NavOutcome::FileNode(NodeId(0)))));
    }

    #[test]
    fn viewport_follows_selection() {
        let mut tree = Tree::new("t");
        for i in 0..30 {
            tree.add_node(format!("q{}", i), "a", format!("q{}", i), None).unwrap();
        }
        let mut state = NavState::open(&tree);
        state.viewport_rows = 5;
        for _ in 0..10 {
            apply(&mut state, &tree, NavEvent::Down);
        }
        // row 10 must be inside [offset, offset+5)
        assert!(state.offset <= 10 && 10 < state.offset + 5);
        for _ in 0..10 {
            apply(&mut state, &tree, NavEvent::Up);
        }
        assert_eq!(state.offset, 0);
    }

    #[test]
    fn empty_tree_has_no_selection() {
        let tree = Tree::new("t");
        let mut state = NavState::open(&tree);
        assert_eq!(state.selected, None);
        apply(&mut state, &tree, NavEvent::Down);
        assert_eq!(state.selected, None);
    }
}
