//! Cycle activation math.
//!
//! Pure functions: given the learner's origin time, a version's cycles in
//! stage order and the learner's assignments, compute which cycles are
//! active and when every stage activates. The resolver feeds these from
//! the stores; nothing here performs I/O.
//!
//! Cycle *i* activates at `origin + days(duration_0 + ... + duration_{i-1})`.
//! A sum past the calendar range means the cycle, and every later one,
//! never activates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::assignment::{Assignment, EndReason};
use super::cycle::Cycle;
use crate::domain::foundation::{AssignmentId, CycleId, Timestamp};

/// A cycle whose activation time has passed and which the learner has not
/// finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCycle {
    pub cycle: Cycle,
    /// Existing open assignment, or `None` when the cycle still needs one.
    pub assignment: Option<Assignment>,
    pub activation_time: Timestamp,
}

impl ActiveCycle {
    /// True when the cycle activated but nobody created the assignment yet.
    pub fn needs_assignment(&self) -> bool {
        self.assignment.is_none()
    }
}

/// Activation time of every cycle, in the order given.
///
/// `cycles` must already be in stage order. `None` marks a cycle whose
/// activation lies beyond the representable calendar.
pub fn activation_times(origin: Timestamp, cycles: &[Cycle]) -> Vec<Option<Timestamp>> {
    let mut accumulated_days: Option<u64> = Some(0);
    cycles
        .iter()
        .map(|cycle| {
            let at = accumulated_days.and_then(|days| origin.checked_plus_days(days));
            accumulated_days = accumulated_days
                .and_then(|days| days.checked_add(u64::from(cycle.duration_days)));
            at
        })
        .collect()
}

/// Indexes assignments by cycle.
///
/// When a learner holds several records for one cycle (re-entry after a
/// program change) the open one is authoritative; otherwise the most
/// recently started ended record is kept.
pub fn index_by_cycle(assignments: &[Assignment]) -> HashMap<CycleId, &Assignment> {
    let mut by_cycle: HashMap<CycleId, &Assignment> = HashMap::new();
    for assignment in assignments {
        by_cycle
            .entry(assignment.cycle_id())
            .and_modify(|current| {
                if prefer(assignment, current) {
                    *current = assignment;
                }
            })
            .or_insert(assignment);
    }
    by_cycle
}

fn prefer(candidate: &Assignment, current: &Assignment) -> bool {
    match (candidate.is_open(), current.is_open()) {
        (true, false) => true,
        (false, true) => false,
        _ => (candidate.start(), candidate.id()) > (current.start(), current.id()),
    }
}

/// Computes the cycles currently active for a learner.
///
/// Walks `cycles` (stage order) accumulating durations and stops at the
/// first cycle whose activation lies after `now`. A walked cycle is
/// returned when the learner has no assignment for it or an open one.
pub fn active_cycles(
    origin: Timestamp,
    cycles: &[Cycle],
    assignments: &[Assignment],
    now: Timestamp,
) -> Vec<ActiveCycle> {
    let by_cycle = index_by_cycle(assignments);
    let mut active = Vec::new();

    for (cycle, activation_time) in cycles.iter().zip(activation_times(origin, cycles)) {
        let activation_time = match activation_time {
            Some(at) if !at.is_after(&now) => at,
            _ => break,
        };

        let existing = by_cycle.get(&cycle.id).copied();
        if existing.map_or(true, Assignment::is_open) {
            active.push(ActiveCycle {
                cycle: cycle.clone(),
                assignment: existing.cloned(),
                activation_time,
            });
        }
    }

    active
}

/// Where a learner stands on one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CycleState {
    /// Activation time is still in the future.
    Pending,
    /// Activated, but no assignment exists yet (the next sweep creates it).
    Available,
    /// The learner holds an open assignment.
    InProgress { assignment_id: AssignmentId },
    /// The learner's assignment was closed.
    Ended { reason: Option<EndReason> },
}

/// One row of a learner timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleProgress {
    pub cycle: Cycle,
    /// `None` when the cycle never activates.
    pub activation_time: Option<Timestamp>,
    pub state: CycleState,
}

/// Full stage-by-stage view of a learner in one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerTimeline {
    pub origin: Timestamp,
    pub cycles: Vec<CycleProgress>,
    /// When the next pending cycle activates, if any remain.
    pub next_activation: Option<Timestamp>,
}

/// Builds the complete timeline, including cycles not yet active.
pub fn learner_timeline(
    origin: Timestamp,
    cycles: &[Cycle],
    assignments: &[Assignment],
    now: Timestamp,
) -> LearnerTimeline {
    let by_cycle = index_by_cycle(assignments);

    let rows: Vec<CycleProgress> = cycles
        .iter()
        .zip(activation_times(origin, cycles))
        .map(|(cycle, activation_time)| {
            let state = match by_cycle.get(&cycle.id) {
                Some(a) if a.is_open() => CycleState::InProgress {
                    assignment_id: a.id(),
                },
                Some(a) => CycleState::Ended {
                    reason: a.end_reason(),
                },
                None if activation_time.map_or(true, |at| at.is_after(&now)) => {
                    CycleState::Pending
                }
                None => CycleState::Available,
            };
            CycleProgress {
                cycle: cycle.clone(),
                activation_time,
                state,
            }
        })
        .collect();

    let next_activation = rows
        .iter()
        .find(|row| row.state == CycleState::Pending)
        .and_then(|row| row.activation_time);

    LearnerTimeline {
        origin,
        cycles: rows,
        next_activation,
    }
}
