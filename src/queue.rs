//! Queue Engine: pending questions and the sequential drain protocol.
//!
//! Items are strict FIFO and resolved one at a time: the answerer is a
//! single shared conversation, so calls never overlap, and sequential
//! resolution gives deterministic node-creation order. A failed item
//! never aborts the batch; it is reported in the outcome sequence and
//! the drain moves on.

use std::collections::VecDeque;
use std::fmt;

use tracing::{info, warn};

use crate::llms::{Answerer, DocumentSource, LlmError};
use crate::state::{NodeId, StoreError, Tree, TreeStore, truncate_summary};

/// Where a pending question attaches once answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueTarget {
    NewRoot,
    FollowUp(NodeId),
}

#[derive(Debug, Clone)]
pub struct QueueItem {
    pub question: String,
    pub target: QueueTarget,
}

/// Drain-level failures. Per-item failures live in `DrainOutcome`.
#[derive(Debug)]
pub enum QueueError {
    /// A drain is already in progress; the second request is rejected,
    /// not queued.
    AlreadyRunning,
    /// Persisting after a resolved item failed; the drain stops so the
    /// user sees it immediately.
    Store(StoreError),
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::AlreadyRunning => write!(f, "a drain is already running"),
            QueueError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for QueueError {}

impl From<StoreError> for QueueError {
    fn from(e: StoreError) -> Self {
        QueueError::Store(e)
    }
}

/// Why a single item failed. The item is dropped either way; re-asking
/// means re-enqueueing.
#[derive(Debug)]
pub enum ItemFailure {
    /// The follow-up's target node does not exist at resolution time.
    DanglingTarget(NodeId),
    Answerer(LlmError),
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemFailure::DanglingTarget(id) => write!(f, "target node {} does not exist", id),
            ItemFailure::Answerer(e) => write!(f, "{}", e),
        }
    }
}

/// One entry per drained item, in submission order.
#[derive(Debug)]
pub enum DrainOutcome {
    Answered { id: NodeId, question: String },
    Failed { question: String, failure: ItemFailure },
}

#[derive(Default)]
pub struct QueueEngine {
    items: VecDeque<QueueItem>,
    draining: bool,
}

impl QueueEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a question; returns its 1-based queue position. The target
    /// is not validated here; validation happens at resolution time.
    pub fn enqueue(&mut self, question: impl Into<String>, target: QueueTarget) -> usize {
        self.items.push_back(QueueItem { question: question.into(), target });
        self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// Snapshot of pending items for display.
    pub fn list(&self) -> Vec<&QueueItem> {
        self.items.iter().collect()
    }

    /// Discard pending items. Rejected while a drain is in progress.
    pub fn clear(&mut self) -> Result<usize, QueueError> {
        if self.draining {
            return Err(QueueError::AlreadyRunning);
        }
        let dropped = self.items.len();
        self.items.clear();
        Ok(dropped)
    }

    /// Mark a drain as started. Split out so re-entrancy is observable.
    fn begin_drain(&mut self) -> Result<(), QueueError> {
        if self.draining {
            return Err(QueueError::AlreadyRunning);
        }
        self.draining = true;
        Ok(())
    }

    /// Process every queued item in FIFO order, one answerer call at a
    /// time. `source` is consumed by the first successful call so the
    /// document travels exactly once per loaded content item. The tree
    /// is saved after every successful resolution.
    pub fn drain(
        &mut self,
        tree: &mut Tree,
        store: &TreeStore,
        answerer: &dyn Answerer,
        source: &mut Option<DocumentSource>,
    ) -> Result<Vec<DrainOutcome>, QueueError> {
        self.begin_drain()?;
        let result = self.drain_inner(tree, store, answerer, source);
        self.draining = false;
        result
    }

    fn drain_inner(
        &mut self,
        tree: &mut Tree,
        store: &TreeStore,
        answerer: &dyn Answerer,
        source: &mut Option<DocumentSource>,
    ) -> Result<Vec<DrainOutcome>, QueueError> {
        let mut outcomes = Vec::with_capacity(self.items.len());
        while let Some(item) = self.items.pop_front() {
            let parent = match item.target {
                QueueTarget::NewRoot => None,
                QueueTarget::FollowUp(id) => {
                    if !tree.contains(id) {
                        warn!(%id, question = %item.question, "follow-up target missing");
                        outcomes.push(DrainOutcome::Failed {
                            question: item.question,
                            failure: ItemFailure::DanglingTarget(id),
                        });
                        continue;
                    }
                    Some(id)
                }
            };

            let answer = match answerer.answer(&item.question, source.as_ref()) {
                Ok(text) => text,
                Err(e) => {
                    warn!(question = %item.question, error = %e, "answerer failed");
                    outcomes.push(DrainOutcome::Failed {
                        question: item.question,
                        failure: ItemFailure::Answerer(e),
                    });
                    continue;
                }
            };
            // document delivered; later calls continue the conversation
            *source = None;

            let summary = match answerer.summarize(&item.question, &answer) {
                Ok(s) if !s.is_empty() => s,
                Ok(_) => truncate_summary(&item.question),
                Err(e) => {
                    warn!(error = %e, "summarizer failed, truncating question");
                    truncate_summary(&item.question)
                }
            };

            // parent was validated above; the tree is not mutated between
            let id = tree
                .add_node(&item.question, answer, summary, parent)
                .expect("validated parent");
            store.save(tree)?;
            info!(%id, question = %item.question, "queue item resolved");
            outcomes.push(DrainOutcome::Answered { id, question: item.question });
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
pub mod test_helpers {
    use std::cell::RefCell;

    use super::*;

    /// Test double: pre-scripted replies, records whether the source was
    /// attached to each call. A reply of `Err` simulates a provider
    /// failure for that call.
    pub struct ScriptedAnswerer {
        replies: RefCell<VecDeque<Result<String, LlmError>>>,
        pub sources_seen: RefCell<Vec<bool>>,
    }

    impl ScriptedAnswerer {
        pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self { replies: RefCell::new(replies.into()), sources_seen: RefCell::new(Vec::new()) }
        }

        pub fn always(reply: &str) -> Self {
            Self {
                replies: RefCell::new(std::iter::repeat_n(Ok(reply.to_string()), 64).collect()),
                sources_seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Answerer for ScriptedAnswerer {
        fn answer(&self, _q: &str, source: Option<&DocumentSource>) -> Result<String, LlmError> {
            self.sources_seen.borrow_mut().push(source.is_some());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Network("script exhausted".into())))
        }

        fn summarize(&self, question: &str, _answer: &str) -> Result<String, LlmError> {
            Ok(format!("sum: {}", question))
        }

        fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(String::new())
        }
    }
}
