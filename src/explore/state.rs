//! SubEntity states, the transition table, and per-state energy multipliers.
//!
//! The table is plain data so it can be checked independently of the
//! handlers that drive it. `SubEntity::transition_to` refuses any edge
//! that is not listed here.

use serde::{Deserialize, Serialize};

/// Where a walker is in its exploration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubEntityState {
    /// Scoring outgoing links and moving along the best one.
    Seeking,
    /// Forking into children at an ambiguous moment.
    Branching,
    /// Weighing the content at the current position for crystallization.
    Absorbing,
    /// Standing on a narrative and measuring how well it answers the intent.
    Resonating,
    /// Out of road; deciding between finishing and crystallizing.
    Reflecting,
    /// Materializing a new narrative node.
    Crystallizing,
    /// Terminal. Results are ready for collection.
    Merging,
}

use SubEntityState::*;

impl SubEntityState {
    pub const ALL: [SubEntityState; 7] =
        [Seeking, Branching, Absorbing, Resonating, Reflecting, Crystallizing, Merging];

    pub fn is_terminal(self) -> bool {
        self == Merging
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Seeking => "SEEKING",
            Branching => "BRANCHING",
            Absorbing => "ABSORBING",
            Resonating => "RESONATING",
            Reflecting => "REFLECTING",
            Crystallizing => "CRYSTALLIZING",
            Merging => "MERGING",
        }
    }

    /// Energy injection multiplier for work done in this state.
    pub fn multiplier(self) -> f32 {
        STATE_MULTIPLIER
            .iter()
            .find(|(s, _)| *s == self)
            .map(|(_, m)| *m)
            .unwrap_or(0.0)
    }
}

impl std::fmt::Display for SubEntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Transition table
// ============================================================================

/// Every legal `(from, to)` edge.
///
/// Rows mirror the decision each handler makes; the trailing `Merging`
/// edges are the step-ceiling escape hatch available to every live state.
pub const TRANSITIONS: &[(SubEntityState, SubEntityState)] = &[
    // SEEKING: dead end / fork / narrative / content / keep walking
    (Seeking, Reflecting),
    (Seeking, Branching),
    (Seeking, Resonating),
    (Seeking, Absorbing),
    (Seeking, Seeking),
    // BRANCHING: aborted fork / children merged
    (Branching, Seeking),
    (Branching, Reflecting),
    // ABSORBING: aligned and novel / otherwise
    (Absorbing, Crystallizing),
    (Absorbing, Seeking),
    // RESONATING: satisfied / keep looking
    (Resonating, Merging),
    (Resonating, Seeking),
    // REFLECTING: good enough / make something
    (Reflecting, Merging),
    (Reflecting, Crystallizing),
    // CRYSTALLIZING: resume / never moved
    (Crystallizing, Seeking),
    (Crystallizing, Merging),
    // step ceiling
    (Seeking, Merging),
    (Branching, Merging),
    (Absorbing, Merging),
];

pub fn can_transition(from: SubEntityState, to: SubEntityState) -> bool {
    TRANSITIONS.iter().any(|&(f, t)| f == from && t == to)
}

/// All states reachable in one step from `from`.
pub fn successors(from: SubEntityState) -> impl Iterator<Item = SubEntityState> {
    TRANSITIONS.iter().filter(move |(f, _)| *f == from).map(|(_, t)| *t)
}

// ============================================================================
// Energy multipliers
// ============================================================================

/// Injection = criticality × multiplier × node weight.
pub const STATE_MULTIPLIER: [(SubEntityState, f32); 7] = [
    (Seeking, 1.0),
    (Branching, 0.8),
    (Absorbing, 1.2),
    (Resonating, 1.5),
    (Reflecting, 0.6),
    (Crystallizing, 2.0),
    (Merging, 0.0),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merging_is_a_sink() {
        assert_eq!(successors(Merging).count(), 0);
        for s in SubEntityState::ALL {
            assert!(!can_transition(Merging, s));
        }
    }

    #[test]
    fn every_live_state_can_terminate() {
        // Each non-terminal state reaches MERGING through the table.
        for start in SubEntityState::ALL {
            let mut seen = vec![start];
            let mut frontier = vec![start];
            while let Some(s) = frontier.pop() {
                for n in successors(s) {
                    if !seen.contains(&n) {
                        seen.push(n);
                        frontier.push(n);
                    }
                }
            }
            assert!(seen.contains(&Merging), "{start} cannot reach MERGING");
        }
    }

    #[test]
    fn crystallizing_only_from_absorbing_or_reflecting() {
        let sources: Vec<_> = TRANSITIONS
            .iter()
            .filter(|(_, t)| *t == Crystallizing)
            .map(|(f, _)| *f)
            .collect();
        assert_eq!(sources, vec![Absorbing, Reflecting]);
    }

    #[test]
    fn branching_only_from_seeking() {
        assert!(can_transition(Seeking, Branching));
        for s in SubEntityState::ALL {
            if s != Seeking {
                assert!(!can_transition(s, Branching));
            }
        }
    }

    #[test]
    fn resonating_and_crystallizing_outweigh_seeking() {
        assert!(Resonating.multiplier() > Seeking.multiplier());
        assert!(Crystallizing.multiplier() > Seeking.multiplier());
        assert_eq!(Merging.multiplier(), 0.0);
    }

    #[test]
    fn state_serializes_screaming() {
        assert_eq!(serde_json::to_string(&Crystallizing).unwrap(), "\"CRYSTALLIZING\"");
    }
}
