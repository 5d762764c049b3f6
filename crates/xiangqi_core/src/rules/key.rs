//! The rule-variant registry: keys, values, and the static
//! dependency/conflict table enforced on every mutation.

use serde::{Deserialize, Serialize};

/// Every toggleable rule variant.
///
/// Wire names are the snake_case form of the variant name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RuleKey {
    /// The two kings may face each other on an open file.
    KingFaceToFace,
    /// A king may capture the facing king along a clear rank or file.
    FlyingGeneral,
    /// The king steps one point in any of eight directions.
    InternationalKing,
    /// The king may leave the palace and cross the river.
    KingCrossRiver,
    /// Advisors may leave the palace.
    AdvisorLeavePalace,
    /// Advisors slide any distance straight or diagonally.
    InternationalAdvisor,
    /// Elephants may cross the river.
    ElephantCrossRiver,
    /// Elephant moves ignore the blocking eye point.
    ElephantUnblockEye,
    /// Horse moves ignore the blocking leg point.
    HorseUnblockLeg,
    /// Soldiers may step backward after crossing the river.
    PawnCanRetreat,
    /// Soldiers may step backward on their own half as well.
    PawnInsideRetreat,
    /// Removes the river distinction for soldiers and the palace
    /// confinement for kings.
    NoRiverLimit,
    /// The left and right board edges are adjacent (cylinder topology).
    LeftRightConnected,
    /// Chariots may slide around the side boundary.
    ChariotWrap,
    /// Cannons may slide and screen-capture around the side boundary.
    CannonWrap,
    /// Horses gain the mirrored jump across the side boundary.
    HorseWrap,
    /// Elephants gain the mirrored jump across the side boundary.
    ElephantWrap,
    /// Soldiers treat left and right steps as cyclic.
    SoldierWrap,
    /// Sliding advisors may walk diagonal paths across the boundary.
    AdvisorWrap,
    /// Same-side pieces may pile onto one cell as an ordered stack.
    Stacking,
    /// Maximum stack height (a small count, not a toggle).
    StackingLimit,
    /// A buried stack element may be selected and moved out.
    StackSelect,
    /// Moving a buried element carries every piece above it along.
    StackCarry,
    /// Capturing flips the captured piece to the capturer's side in
    /// place instead of removing it; the capturer does not move.
    CaptureConversion,
    /// Soldiers reaching the enemy back rank promote to an archetype
    /// chosen by the caller.
    PawnPromotion,
    /// Out-of-band moves bypassing legality are accepted.
    ForceMove,
}

/// The value carried by a rule: a toggle or a small count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    /// An on/off toggle.
    Bool(bool),
    /// A small integer parameter, e.g. the stacking limit.
    Count(u8),
}

impl RuleValue {
    /// Whether this value counts as "enabled" for dependency and
    /// conflict checks. Count-valued rules are parameters and never
    /// gate other rules.
    pub fn enabled(self) -> bool {
        matches!(self, RuleValue::Bool(true))
    }

    /// The count carried by a count-valued rule, zero otherwise.
    pub fn count(self) -> u8 {
        match self {
            RuleValue::Bool(_) => 0,
            RuleValue::Count(n) => n,
        }
    }
}

impl std::fmt::Display for RuleValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleValue::Bool(b) => write!(f, "{}", b),
            RuleValue::Count(n) => write!(f, "{}", n),
        }
    }
}

/// Where a rule change originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    /// Local user interface.
    Ui,
    /// A peer over the LAN protocol.
    Network,
    /// Programmatic access, including snapshot import.
    Api,
}

/// Static description of one rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    /// Human-readable name, recorded in rule-change history.
    pub display_name: &'static str,
    /// Value when no snapshot has been applied.
    pub default: RuleValue,
    /// Keys that must all be enabled before this rule may change.
    pub requires: &'static [RuleKey],
    /// Keys that must all be disabled before this rule may enable.
    pub conflicts: &'static [RuleKey],
}

impl RuleKey {
    /// The static registry entry for this key.
    pub fn spec(self) -> RuleSpec {
        use RuleKey::*;
        match self {
            KingFaceToFace => RuleSpec {
                display_name: "Kings may face each other",
                default: RuleValue::Bool(false),
                requires: &[],
                conflicts: &[],
            },
            FlyingGeneral => RuleSpec {
                display_name: "Flying general",
                default: RuleValue::Bool(false),
                requires: &[KingFaceToFace],
                conflicts: &[],
            },
            InternationalKing => RuleSpec {
                display_name: "International king",
                default: RuleValue::Bool(false),
                requires: &[],
                conflicts: &[],
            },
            KingCrossRiver => RuleSpec {
                display_name: "King may cross the river",
                default: RuleValue::Bool(false),
                requires: &[],
                conflicts: &[],
            },
            AdvisorLeavePalace => RuleSpec {
                display_name: "Advisors may leave the palace",
                default: RuleValue::Bool(false),
                requires: &[],
                conflicts: &[],
            },
            InternationalAdvisor => RuleSpec {
                display_name: "International advisor",
                default: RuleValue::Bool(false),
                requires: &[AdvisorLeavePalace],
                conflicts: &[],
            },
            ElephantCrossRiver => RuleSpec {
                display_name: "Elephants may cross the river",
                default: RuleValue::Bool(false),
                requires: &[],
                conflicts: &[],
            },
            ElephantUnblockEye => RuleSpec {
                display_name: "Unblocked elephant eye",
                default: RuleValue::Bool(false),
                requires: &[],
                conflicts: &[],
            },
            HorseUnblockLeg => RuleSpec {
                display_name: "Unblocked horse leg",
                default: RuleValue::Bool(false),
                requires: &[],
                conflicts: &[],
            },
            PawnCanRetreat => RuleSpec {
                display_name: "Soldiers may retreat",
                default: RuleValue::Bool(false),
                requires: &[],
                conflicts: &[],
            },
            PawnInsideRetreat => RuleSpec {
                display_name: "Soldiers may retreat before the river",
                default: RuleValue::Bool(false),
                requires: &[PawnCanRetreat],
                conflicts: &[],
            },
            NoRiverLimit => RuleSpec {
                display_name: "No river limit",
                default: RuleValue::Bool(false),
                requires: &[],
                conflicts: &[],
            },
            LeftRightConnected => RuleSpec {
                display_name: "Left and right edges connected",
                default: RuleValue::Bool(false),
                requires: &[],
                conflicts: &[],
            },
            ChariotWrap => RuleSpec {
                display_name: "Chariot wraparound",
                default: RuleValue::Bool(false),
                requires: &[LeftRightConnected],
                conflicts: &[],
            },
            CannonWrap => RuleSpec {
                display_name: "Cannon wraparound",
                default: RuleValue::Bool(false),
                requires: &[LeftRightConnected],
                conflicts: &[],
            },
            HorseWrap => RuleSpec {
                display_name: "Horse wraparound",
                default: RuleValue::Bool(false),
                requires: &[LeftRightConnected],
                conflicts: &[],
            },
            ElephantWrap => RuleSpec {
                display_name: "Elephant wraparound",
                default: RuleValue::Bool(false),
                requires: &[LeftRightConnected],
                conflicts: &[],
            },
            SoldierWrap => RuleSpec {
                display_name: "Soldier wraparound",
                default: RuleValue::Bool(false),
                requires: &[LeftRightConnected],
                conflicts: &[],
            },
            AdvisorWrap => RuleSpec {
                display_name: "Advisor wraparound",
                default: RuleValue::Bool(false),
                requires: &[LeftRightConnected, InternationalAdvisor],
                conflicts: &[],
            },
            Stacking => RuleSpec {
                display_name: "Stacking",
                default: RuleValue::Bool(false),
                requires: &[],
                conflicts: &[CaptureConversion],
            },
            StackingLimit => RuleSpec {
                display_name: "Stacking limit",
                default: RuleValue::Count(3),
                requires: &[Stacking],
                conflicts: &[],
            },
            StackSelect => RuleSpec {
                display_name: "Stack element selection",
                default: RuleValue::Bool(false),
                requires: &[Stacking],
                conflicts: &[],
            },
            StackCarry => RuleSpec {
                display_name: "Stack carry",
                default: RuleValue::Bool(false),
                requires: &[StackSelect],
                conflicts: &[],
            },
            CaptureConversion => RuleSpec {
                display_name: "Capture conversion",
                default: RuleValue::Bool(false),
                requires: &[],
                conflicts: &[Stacking],
            },
            PawnPromotion => RuleSpec {
                display_name: "Soldier promotion",
                default: RuleValue::Bool(false),
                requires: &[],
                conflicts: &[],
            },
            ForceMove => RuleSpec {
                display_name: "Force move",
                default: RuleValue::Bool(false),
                requires: &[],
                conflicts: &[],
            },
        }
    }

    /// Human-readable name from the registry.
    pub fn display_name(self) -> &'static str {
        self.spec().display_name
    }

    /// The all-defaults snapshot: the baseline rule state of a fresh
    /// game, which rule-change history replays forward from.
    pub fn default_snapshot() -> super::RuleSnapshot {
        use strum::IntoEnumIterator;
        RuleKey::iter().map(|key| (key, key.spec().default)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_registry_covers_every_key() {
        for key in RuleKey::iter() {
            let spec = key.spec();
            assert!(!spec.display_name.is_empty());
        }
    }

    #[test]
    fn test_conflicts_are_symmetric() {
        for key in RuleKey::iter() {
            for &other in key.spec().conflicts {
                assert!(
                    other.spec().conflicts.contains(&key),
                    "conflict {key} <-> {other} declared on one side only"
                );
            }
        }
    }

    #[test]
    fn test_dependencies_acyclic() {
        // Walking requires-chains must terminate well before the key
        // count; a cycle would exceed the bound.
        let bound = RuleKey::iter().count();
        for key in RuleKey::iter() {
            let mut frontier = vec![key];
            for _ in 0..=bound {
                frontier = frontier
                    .into_iter()
                    .flat_map(|k| k.spec().requires.iter().copied())
                    .collect();
                if frontier.is_empty() {
                    break;
                }
            }
            assert!(frontier.is_empty(), "dependency cycle through {key}");
        }
    }

    #[test]
    fn test_wire_name_round_trip() {
        use std::str::FromStr;
        for key in RuleKey::iter() {
            let name = key.to_string();
            assert_eq!(RuleKey::from_str(&name).unwrap(), key);
        }
    }
}
