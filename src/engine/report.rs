// src/engine/report.rs

//! What a run reports, per leaf and overall.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::sequence::SequenceTask;

/// Execution state of one leaf in one run.
#[derive(Debug, Clone, Default)]
pub struct ItemStats {
    pub started: Option<Instant>,
    pub completed: Option<Instant>,
    pub skipped: bool,
    pub duration: Duration,
    pub errors: Vec<Arc<anyhow::Error>>,
}

impl ItemStats {
    pub(crate) fn started_now() -> Self {
        Self {
            started: Some(Instant::now()),
            ..Self::default()
        }
    }

    pub(crate) fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub(crate) fn complete(&mut self) {
        let now = Instant::now();
        self.completed = Some(now);
        if let Some(started) = self.started {
            self.duration = now.duration_since(started);
        }
    }

    pub fn is_error(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Start,
    End,
    Error,
}

#[derive(Debug, Clone)]
pub enum Report {
    Start {
        item: Arc<SequenceTask>,
        stats: ItemStats,
    },
    End {
        item: Arc<SequenceTask>,
        stats: ItemStats,
    },
    Error {
        item: Arc<SequenceTask>,
        stats: ItemStats,
        error: Arc<anyhow::Error>,
    },
}

impl Report {
    pub fn kind(&self) -> ReportKind {
        match self {
            Report::Start { .. } => ReportKind::Start,
            Report::End { .. } => ReportKind::End,
            Report::Error { .. } => ReportKind::Error,
        }
    }

    pub fn item(&self) -> &Arc<SequenceTask> {
        match self {
            Report::Start { item, .. } | Report::End { item, .. } | Report::Error { item, .. } => {
                item
            }
        }
    }

    pub fn stats(&self) -> &ItemStats {
        match self {
            Report::Start { stats, .. } | Report::End { stats, .. } | Report::Error { stats, .. } => {
                stats
            }
        }
    }
}

/// Final state of one leaf.
#[derive(Debug, Clone)]
pub struct LeafResult {
    pub item: Arc<SequenceTask>,
    pub stats: ItemStats,
}

/// Outcome of a whole run; leaves in declared order.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub leaves: Vec<LeafResult>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.leaves.iter().all(|l| !l.stats.is_error())
    }

    pub fn errors(&self) -> Vec<&Arc<anyhow::Error>> {
        self.leaves.iter().flat_map(|l| l.stats.errors.iter()).collect()
    }

    pub fn completed(&self) -> usize {
        self.leaves
            .iter()
            .filter(|l| l.stats.completed.is_some() && !l.stats.is_error())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.leaves.iter().filter(|l| l.stats.is_error()).count()
    }

    pub fn skipped(&self) -> usize {
        self.leaves.iter().filter(|l| l.stats.skipped).count()
    }

    pub fn leaf(&self, label: &str) -> Option<&LeafResult> {
        self.leaves.iter().find(|l| l.item.label() == label)
    }
}
