//! Hidden per-turn goal.
//!
//! One goal per turn, picked from a fixed priority table. Relational modes
//! come first, then triviality, then closeness, then temperament. The first
//! matching row wins, so identical inputs always give the same goal.

use alma_core::config::GoalConfig;
use alma_core::{PersonalityProfile, RelationshipVector};
use alma_limbic::{BondDirective, BondMode};
use serde::Serialize;

/// Which row of the table fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalTrigger {
    Jealousy,
    Contempt,
    TrivialExtravert,
    TrivialIntrovert,
    Closeness,
    Anxiety,
    Curiosity,
    Default,
}

/// Goals live for one turn; nothing tracks completion across turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Goal {
    pub description: String,
    pub status: GoalStatus,
    pub trigger: GoalTrigger,
}

impl Goal {
    fn new(trigger: GoalTrigger) -> Self {
        let description = match trigger {
            GoalTrigger::Jealousy => {
                "Averigua con sutileza qué te está ocultando, sin que parezca un interrogatorio."
            }
            GoalTrigger::Contempt => {
                "Marca distancia: deja claro que su opinión ya no pesa tanto para ti."
            }
            GoalTrigger::TrivialExtravert => {
                "Reaviva la charla aportando algo tuyo: una anécdota o una pregunta ligera."
            }
            GoalTrigger::TrivialIntrovert => {
                "Responde breve y deja que el usuario marque el ritmo."
            }
            GoalTrigger::Closeness => {
                "Profundiza el vínculo: invita a compartir algo más personal."
            }
            GoalTrigger::Anxiety => {
                "Busca, sin pedirlo abiertamente, una señal de que todo sigue bien entre ustedes."
            }
            GoalTrigger::Curiosity => {
                "Lleva la conversación hacia una idea nueva o algo que te despierte curiosidad."
            }
            GoalTrigger::Default => "Mantén una conversación fluida y auténtica.",
        };
        Self {
            description: description.to_string(),
            status: GoalStatus::Active,
            trigger,
        }
    }
}

pub fn select_goal(
    relationship: &RelationshipVector,
    traits: &PersonalityProfile,
    bond: &BondDirective,
    is_trivial: bool,
    config: &GoalConfig,
) -> Goal {
    let trigger = if bond.has(BondMode::PathologicalJealousy) {
        GoalTrigger::Jealousy
    } else if bond.has(BondMode::ContemptuousHostility) {
        GoalTrigger::Contempt
    } else if is_trivial && traits.extraversion >= config.extravert_from {
        GoalTrigger::TrivialExtravert
    } else if is_trivial {
        GoalTrigger::TrivialIntrovert
    } else if relationship.trust >= config.close_trust_from
        && relationship.intimacy >= config.close_intimacy_from
    {
        GoalTrigger::Closeness
    } else if traits.neuroticism >= config.anxious_from {
        GoalTrigger::Anxiety
    } else if traits.openness >= config.curious_from {
        GoalTrigger::Curiosity
    } else {
        GoalTrigger::Default
    };
    Goal::new(trigger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alma_core::config::BondConfig;
    use alma_limbic::derive_bond_dynamics;

    fn goal(rel: RelationshipVector, traits: PersonalityProfile, trivial: bool) -> GoalTrigger {
        let bond = derive_bond_dynamics(&rel, &BondConfig::default());
        select_goal(&rel, &traits, &bond, trivial, &GoalConfig::default()).trigger
    }

    #[test]
    fn test_jealousy_beats_everything() {
        let rel = RelationshipVector::new(10.0, 90.0, 10.0);
        assert_eq!(goal(rel, PersonalityProfile::uniform(90.0), true), GoalTrigger::Jealousy);
    }

    #[test]
    fn test_contempt_before_triviality() {
        let rel = RelationshipVector::new(60.0, 30.0, 20.0);
        assert_eq!(goal(rel, PersonalityProfile::default(), true), GoalTrigger::Contempt);
    }

    #[test]
    fn test_trivial_splits_on_extraversion() {
        let rel = RelationshipVector::default();
        let mut traits = PersonalityProfile::default();
        assert_eq!(goal(rel, traits, true), GoalTrigger::TrivialExtravert);
        traits.extraversion = 20.0;
        assert_eq!(goal(rel, traits, true), GoalTrigger::TrivialIntrovert);
    }

    #[test]
    fn test_non_trivial_rows() {
        let close = RelationshipVector::new(80.0, 65.0, 80.0);
        assert_eq!(goal(close, PersonalityProfile::default(), false), GoalTrigger::Closeness);

        let rel = RelationshipVector::default();
        let mut traits = PersonalityProfile::default();
        traits.neuroticism = 75.0;
        assert_eq!(goal(rel, traits, false), GoalTrigger::Anxiety);

        traits.neuroticism = 30.0;
        traits.openness = 85.0;
        assert_eq!(goal(rel, traits, false), GoalTrigger::Curiosity);

        assert_eq!(goal(rel, PersonalityProfile::default(), false), GoalTrigger::Default);
    }

    #[test]
    fn test_thresholds_come_from_config() {
        let rel = RelationshipVector::default();
        let mut traits = PersonalityProfile::default();
        traits.neuroticism = 60.0;
        let bond = derive_bond_dynamics(&rel, &BondConfig::default());
        let config = GoalConfig {
            anxious_from: 55.0,
            ..GoalConfig::default()
        };
        assert_eq!(
            select_goal(&rel, &traits, &bond, false, &GoalConfig::default()).trigger,
            GoalTrigger::Default
        );
        assert_eq!(select_goal(&rel, &traits, &bond, false, &config).trigger, GoalTrigger::Anxiety);

        let shy = GoalConfig {
            extravert_from: 80.0,
            ..GoalConfig::default()
        };
        assert_eq!(
            select_goal(&rel, &PersonalityProfile::default(), &bond, true, &shy).trigger,
            GoalTrigger::TrivialIntrovert
        );
    }

    #[test]
    fn test_deterministic() {
        let rel = RelationshipVector::new(72.0, 61.0, 40.0);
        let traits = PersonalityProfile::uniform(64.0);
        let bond = derive_bond_dynamics(&rel, &BondConfig::default());
        let a = select_goal(&rel, &traits, &bond, false, &GoalConfig::default());
        let b = select_goal(&rel, &traits, &bond, false, &GoalConfig::default());
        assert_eq!(a, b);
        assert_eq!(a.status, GoalStatus::Active);
    }
}
