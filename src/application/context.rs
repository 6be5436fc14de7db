//! Request-scoped resolution context.
//!
//! A context pins the instant every decision is taken against and memoises
//! resolver lookups for the lifetime of one request, sweep run or profile
//! event. It is dropped afterwards; nothing is cached across requests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::curriculum::{ActiveCycle, Cycle, Version};
use crate::domain::foundation::{LearnerId, ProgramId, Timestamp, VersionId};
use crate::ports::Clock;

#[derive(Default)]
struct Memo {
    active_versions: HashMap<ProgramId, Option<Version>>,
    version_cycles: HashMap<VersionId, Vec<Cycle>>,
    first_cycles: HashMap<VersionId, Option<Cycle>>,
    learner_cycles: HashMap<(ProgramId, LearnerId), Vec<ActiveCycle>>,
}

/// Frozen `now` plus memo caches for one unit of work.
pub struct ResolutionContext {
    now: Timestamp,
    memo: Mutex<Memo>,
}

impl ResolutionContext {
    /// Creates a context frozen at `now`.
    pub fn new(now: Timestamp) -> Self {
        Self {
            now,
            memo: Mutex::new(Memo::default()),
        }
    }

    /// Creates a context frozen at the clock's current time.
    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self::new(clock.now())
    }

    /// The instant all decisions in this context are taken against.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    // A poisoned memo is still a valid cache.
    fn memo(&self) -> MutexGuard<'_, Memo> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn cached_active_version(&self, program_id: &ProgramId) -> Option<Option<Version>> {
        self.memo().active_versions.get(program_id).cloned()
    }

    pub(crate) fn store_active_version(&self, program_id: ProgramId, version: Option<Version>) {
        self.memo().active_versions.insert(program_id, version);
    }

    pub(crate) fn cached_cycles(&self, version_id: &VersionId) -> Option<Vec<Cycle>> {
        self.memo().version_cycles.get(version_id).cloned()
    }

    pub(crate) fn store_cycles(&self, version_id: VersionId, cycles: Vec<Cycle>) {
        self.memo().version_cycles.insert(version_id, cycles);
    }

    pub(crate) fn cached_first_cycle(&self, version_id: &VersionId) -> Option<Option<Cycle>> {
        self.memo().first_cycles.get(version_id).cloned()
    }

    pub(crate) fn store_first_cycle(&self, version_id: VersionId, cycle: Option<Cycle>) {
        self.memo().first_cycles.insert(version_id, cycle);
    }

    pub(crate) fn cached_learner_cycles(
        &self,
        program_id: &ProgramId,
        learner_id: &LearnerId,
    ) -> Option<Vec<ActiveCycle>> {
        self.memo()
            .learner_cycles
            .get(&(*program_id, *learner_id))
            .cloned()
    }

    pub(crate) fn store_learner_cycles(
        &self,
        program_id: ProgramId,
        learner_id: LearnerId,
        cycles: Vec<ActiveCycle>,
    ) {
        self.memo()
            .learner_cycles
            .insert((program_id, learner_id), cycles);
    }

    /// Drops every cached decision about `learner_id`.
    ///
    /// Called after any assignment write for the learner.
    pub fn invalidate_learner(&self, learner_id: &LearnerId) {
        self.memo()
            .learner_cycles
            .retain(|(_, learner), _| learner != learner_id);
    }
}

impl std::fmt::Debug for ResolutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}
