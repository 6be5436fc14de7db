//! Learner profile events consumed by the engine.
//!
//! The host platform stores each program as a free-text profile attribute,
//! and a learner may carry several such attributes. Only positive integers
//! name a program; anything else means the attribute declares none.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{LearnerId, ProgramId};

/// Program reference read from a learner profile attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ProgramAttribute(Option<ProgramId>);

impl ProgramAttribute {
    /// Interprets the raw attribute text.
    ///
    /// Empty, non-numeric, zero and negative values all mean "no program".
    pub fn parse(raw: Option<&str>) -> Self {
        let program = raw
            .map(str::trim)
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(ProgramId::new);
        Self(program)
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn program_id(&self) -> Option<ProgramId> {
        self.0
    }
}

/// Every program a learner's profile declares, across all program attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclaredPrograms(BTreeSet<ProgramId>);

impl DeclaredPrograms {
    /// Parses each raw attribute value; values naming no program are skipped.
    pub fn from_attributes<'a, I>(raw: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        raw.into_iter()
            .filter_map(|value| ProgramAttribute::parse(value).program_id())
            .collect()
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn contains(&self, program_id: &ProgramId) -> bool {
        self.0.contains(program_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_set(&self) -> &BTreeSet<ProgramId> {
        &self.0
    }
}

impl FromIterator<ProgramId> for DeclaredPrograms {
    fn from_iter<T: IntoIterator<Item = ProgramId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A profile change the engine reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProfileEvent {
    /// The learner's profile was updated.
    ///
    /// Both sides list every program the profile declares, before and
    /// after the change.
    ProfileChanged {
        learner_id: LearnerId,
        #[serde(default)]
        previous_programs: DeclaredPrograms,
        declared_programs: DeclaredPrograms,
    },
    /// The learner was removed from the platform.
    LearnerDeleted { learner_id: LearnerId },
}

impl ProfileEvent {
    /// Builds a `ProfileChanged` from raw attribute text.
    pub fn changed<'a, P, N>(learner_id: LearnerId, previous: P, declared: N) -> Self
    where
        P: IntoIterator<Item = Option<&'a str>>,
        N: IntoIterator<Item = Option<&'a str>>,
    {
        ProfileEvent::ProfileChanged {
            learner_id,
            previous_programs: DeclaredPrograms::from_attributes(previous),
            declared_programs: DeclaredPrograms::from_attributes(declared),
        }
    }

    pub fn learner_id(&self) -> LearnerId {
        match self {
            ProfileEvent::ProfileChanged { learner_id, .. } => *learner_id,
            ProfileEvent::LearnerDeleted { learner_id } => *learner_id,
        }
    }

    /// Event name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProfileEvent::ProfileChanged { .. } => "profile_changed",
            ProfileEvent::LearnerDeleted { .. } => "learner_deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_attribute_names_a_program() {
        assert_eq!(
            ProgramAttribute::parse(Some("7")).program_id(),
            Some(ProgramId::new(7))
        );
        assert_eq!(
            ProgramAttribute::parse(Some(" 12 ")).program_id(),
            Some(ProgramId::new(12))
        );
    }

    #[test]
    fn empty_zero_and_garbage_mean_no_program() {
        for raw in [None, Some(""), Some("0"), Some("-4"), Some("nursing"), Some("3.5")] {
            assert_eq!(ProgramAttribute::parse(raw), ProgramAttribute::none(), "{:?}", raw);
        }
    }

    #[test]
    fn declared_programs_collect_every_attribute() {
        let declared =
            DeclaredPrograms::from_attributes([Some("3"), None, Some("x"), Some(" 1 "), Some("3")]);

        assert_eq!(
            declared.as_set().iter().copied().collect::<Vec<_>>(),
            vec![ProgramId::new(1), ProgramId::new(3)]
        );
        assert!(DeclaredPrograms::from_attributes([Some(""), Some("0")]).is_empty());
    }

    #[test]
    fn changed_parses_both_sides() {
        let event = ProfileEvent::changed(LearnerId::new(5), [Some("")], [Some("7"), Some("2")]);

        assert_eq!(
            event,
            ProfileEvent::ProfileChanged {
                learner_id: LearnerId::new(5),
                previous_programs: DeclaredPrograms::none(),
                declared_programs: [ProgramId::new(2), ProgramId::new(7)].into_iter().collect(),
            }
        );
        assert_eq!(event.learner_id(), LearnerId::new(5));
        assert_eq!(event.kind(), "profile_changed");
    }

    #[test]
    fn profile_event_deserializes_from_tagged_json() {
        let json = r#"{"type":"profile_changed","learner_id":5,"declared_programs":[7,4]}"#;
        let event: ProfileEvent = serde_json::from_str(json).unwrap();

        assert_eq!(
            event,
            ProfileEvent::ProfileChanged {
                learner_id: LearnerId::new(5),
                previous_programs: DeclaredPrograms::none(),
                declared_programs: DeclaredPrograms::from_attributes([Some("4"), Some("7")]),
            }
        );

        let deleted: ProfileEvent =
            serde_json::from_str(r#"{"type":"learner_deleted","learner_id":9}"#).unwrap();
        assert_eq!(deleted.learner_id(), LearnerId::new(9));
    }
}
