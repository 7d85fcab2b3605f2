//! Stage identities and the per-request execution registry.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a computation.
///
/// Assigned once when a [`Computation`](crate::computation::Computation) is
/// built and shared by all of its clones, so `depends_on` can refer to "that
/// computation" rather than to a stage name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(u64);

impl StageId {
    pub(crate) fn next() -> Self {
        StageId(NEXT_STAGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        StageId(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage#{}", self.0)
    }
}

/// Which computations have run for one request.
#[derive(Debug, Clone, Default)]
pub struct ExecutionRegistry {
    executed: AHashMap<StageId, bool>,
}

impl ExecutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, id: StageId) {
        self.executed.insert(id, true);
    }

    pub fn set(&mut self, id: StageId, executed: bool) {
        self.executed.insert(id, executed);
    }

    /// True only when `id` is present and set to `true`.
    pub fn has_executed(&self, id: StageId) -> bool {
        self.executed.get(&id).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.executed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executed.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StageId, bool)> + '_ {
        self.executed.iter().map(|(id, ran)| (*id, *ran))
    }
}
