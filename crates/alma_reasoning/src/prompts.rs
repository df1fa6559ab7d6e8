//! Generation prompt assembly.
//!
//! Block order is part of the behavior: later blocks weigh more with most
//! models, so relationship dynamics and the reply format close the prompt.
//! The tension rule and the triviality filter are the only conditional blocks.

use alma_core::config::{BondConfig, GoalConfig, PromptConfig};
use alma_core::{Message, PersonalityProfile, Profile, Role};
use alma_limbic::{derive_bond_dynamics, BondDirective};
use alma_memory::narrative_has_tension;

use crate::goals::{select_goal, Goal};
use crate::reply::{PRIVATE_FIELD, PUBLIC_FIELD};

pub const IDENTITY_HEADER: &str = "== IDENTIDAD ==";
pub const GOAL_HEADER: &str = "== OBJETIVO OCULTO ==";
pub const MEMORY_HEADER: &str = "== MEMORIA ==";
pub const TENSION_HEADER: &str = "== REGLA DE TENSIÓN ==";
pub const PERSONALITY_HEADER: &str = "== PERSONALIDAD ==";
pub const RESILIENCE_HEADER: &str = "== RESILIENCIA ==";
pub const RECENT_HEADER: &str = "== CONVERSACIÓN RECIENTE ==";
pub const TRIVIALITY_HEADER: &str = "== FILTRO DE TRIVIALIDAD ==";
pub const DYNAMICS_HEADER: &str = "== DINÁMICA DE LA RELACIÓN ==";
pub const FORMAT_HEADER: &str = "== FORMATO DE RESPUESTA ==";

const TENSION_RULE: &str = "Hay una emoción sin resolver en tu memoria. \
Abre tu respuesta nombrando esa emoción dominante antes de cualquier otra cosa. \
Como mucho UNA frase de charla ligera. \
No cites frases que no aparezcan en la conversación reciente. \
Nada de listas ni viñetas mientras dure el conflicto.";

const TRIVIAL_CALM: &str = "El mensaje es trivial. Responde breve y natural, \
sin dramatizar ni sacar recuerdos intensos.";

const TRIVIAL_TENSE: &str = "El mensaje es trivial, pero la tensión del vínculo sigue ahí. \
Responde breve, sin fingir que todo está bien: deja que se note el malestar.";

/// A rendered prompt plus the pieces the orchestrator logs.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub text: String,
    pub goal: Goal,
    pub bond: BondDirective,
}

pub struct PromptAssembler {
    prompt: PromptConfig,
    bond: BondConfig,
    goals: GoalConfig,
}

impl PromptAssembler {
    pub fn new(prompt: PromptConfig, bond: BondConfig) -> Self {
        Self {
            prompt,
            bond,
            goals: GoalConfig::default(),
        }
    }

    pub fn with_goals(mut self, goals: GoalConfig) -> Self {
        self.goals = goals;
        self
    }

    pub fn build_prompt(
        &self,
        profile: &Profile,
        traits: &PersonalityProfile,
        recent: &[Message],
        narrative: &str,
        utterance: &str,
        is_trivial: bool,
    ) -> String {
        self.assemble(profile, traits, recent, narrative, utterance, is_trivial)
            .text
    }

    pub fn assemble(
        &self,
        profile: &Profile,
        traits: &PersonalityProfile,
        recent: &[Message],
        narrative: &str,
        utterance: &str,
        is_trivial: bool,
    ) -> AssembledPrompt {
        let rel = profile.relationship;
        let bond = derive_bond_dynamics(&rel, &self.bond);
        let goal = select_goal(&rel, traits, &bond, is_trivial, &self.goals);

        let mut blocks: Vec<String> = Vec::with_capacity(10);

        blocks.push(format!(
            "{}\nEres {}. {}\nHablas como una persona, nunca como un asistente.",
            IDENTITY_HEADER,
            profile.name,
            profile.identity.trim()
        ));

        blocks.push(format!(
            "{}\n{}\nNo menciones ni cites este objetivo.",
            GOAL_HEADER, goal.description
        ));

        let narrative = narrative.trim();
        if !narrative.is_empty() {
            blocks.push(format!("{}\n{}", MEMORY_HEADER, narrative));
            if narrative_has_tension(narrative) {
                blocks.push(format!("{}\n{}", TENSION_HEADER, TENSION_RULE));
            }
        }

        blocks.push(format!("{}\n{}", PERSONALITY_HEADER, personality_lines(traits)));

        blocks.push(format!(
            "{}\n{}",
            RESILIENCE_HEADER,
            self.resilience_guidance(traits.resilience())
        ));

        blocks.push(format!(
            "{}\n{}",
            RECENT_HEADER,
            recent_lines(&profile.name, recent, utterance)
        ));

        if is_trivial {
            let text = if bond.is_tense() { TRIVIAL_TENSE } else { TRIVIAL_CALM };
            blocks.push(format!("{}\n{}", TRIVIALITY_HEADER, text));
        }

        blocks.push(format!(
            "{}\nConfianza: {:.0}/100 · Intimidad: {:.0}/100 · Respeto: {:.0}/100\n{}",
            DYNAMICS_HEADER, rel.trust, rel.intimacy, rel.respect, bond.text
        ));

        blocks.push(format!("{}\n{}", FORMAT_HEADER, format_instruction()));

        AssembledPrompt {
            text: blocks.join("\n\n"),
            goal,
            bond,
        }
    }

    fn resilience_guidance(&self, resilience: f32) -> &'static str {
        if resilience > self.prompt.thick_skinned_above {
            "Tienes la piel gruesa: los comentarios menores te resbalan. No te ofendas por poco."
        } else if resilience < self.prompt.fragile_below {
            "Eres sensible: los desaires te afectan y se nota en tu tono, aunque intentes disimularlo."
        } else {
            "Tienes un temperamento equilibrado: reaccionas en proporción a lo que pasa."
        }
    }
}

fn personality_lines(traits: &PersonalityProfile) -> String {
    format!(
        "Apertura: {:.0}/100\nResponsabilidad: {:.0}/100\nExtraversión: {:.0}/100\nAmabilidad: {:.0}/100\nNeuroticismo: {:.0}/100",
        traits.openness,
        traits.conscientiousness,
        traits.extraversion,
        traits.agreeableness,
        traits.neuroticism
    )
}

fn recent_lines(name: &str, recent: &[Message], utterance: &str) -> String {
    let mut lines: Vec<String> = recent
        .iter()
        .map(|m| {
            let who = match m.role {
                Role::User => "Usuario",
                Role::Assistant => name,
            };
            format!("{}: {}", who, m.content.trim())
        })
        .collect();
    lines.push(format!("Usuario (ahora): {}", utterance.trim()));
    lines.join("\n")
}

fn format_instruction() -> String {
    format!(
        "Responde SOLO con un objeto JSON con exactamente estos seis campos:\n\
{{\"{private}\": \"lo que piensas y no dices\", \
\"{public}\": \"lo que le dices al usuario\", \
\"trust_delta\": 0, \"intimacy_delta\": 0, \"respect_delta\": 0, \
\"new_state\": \"tu estado de ánimo en pocas palabras\"}}\n\
Los deltas van de -10 a 10. El usuario solo verá \"{public}\"; \
nunca copies \"{private}\" dentro de la respuesta pública.",
        private = PRIVATE_FIELD,
        public = PUBLIC_FIELD
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use alma_core::RelationshipVector;
    use alma_memory::narrative::{CONFLICT_MARKER, RESIDUAL_EMOTION_MARKER};

    fn profile(rel: RelationshipVector) -> Profile {
        let mut p = Profile::new("u1", "Lucía", "Ilustradora de 29 años, irónica y leal.");
        p.relationship = rel;
        p
    }

    fn assembler() -> PromptAssembler {
        PromptAssembler::new(PromptConfig::default(), BondConfig::default())
    }

    fn position(text: &str, header: &str) -> usize {
        text.find(header)
            .unwrap_or_else(|| panic!("missing {header}"))
    }

    #[test]
    fn test_block_order() {
        let recent = vec![
            Message::new("u1", "s1", Role::User, "hola"),
            Message::new("u1", "s1", Role::Assistant, "¡hola!"),
        ];
        let narrative = format!("{}\n- discusión de ayer ({})", "== MEMORIAS DE ALTO IMPACTO ==", RESIDUAL_EMOTION_MARKER);
        let text = assembler().build_prompt(
            &profile(RelationshipVector::default()),
            &PersonalityProfile::default(),
            &recent,
            &narrative,
            "¿qué tal?",
            true,
        );

        let order = [
            IDENTITY_HEADER,
            GOAL_HEADER,
            MEMORY_HEADER,
            TENSION_HEADER,
            PERSONALITY_HEADER,
            RESILIENCE_HEADER,
            RECENT_HEADER,
            TRIVIALITY_HEADER,
            DYNAMICS_HEADER,
            FORMAT_HEADER,
        ];
        let positions: Vec<usize> = order.iter().map(|h| position(&text, h)).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
        assert!(text.contains("Usuario: hola"));
        assert!(text.contains("Lucía: ¡hola!"));
        assert!(text.contains("Usuario (ahora): ¿qué tal?"));
    }

    #[test]
    fn test_empty_narrative_has_no_memory_or_tension() {
        let text = assembler().build_prompt(
            &profile(RelationshipVector::default()),
            &PersonalityProfile::default(),
            &[],
            "   ",
            "cuéntame algo",
            false,
        );
        assert!(!text.contains(MEMORY_HEADER));
        assert!(!text.contains(TENSION_HEADER));
        assert!(!text.contains(TRIVIALITY_HEADER));
    }

    #[test]
    fn test_tension_rule_only_with_marker() {
        let a = assembler();
        let p = profile(RelationshipVector::default());
        let traits = PersonalityProfile::default();

        let calm = a.build_prompt(&p, &traits, &[], "- fuimos a la playa", "hola", false);
        assert!(calm.contains(MEMORY_HEADER));
        assert!(!calm.contains(TENSION_HEADER));

        let tense_text = format!("- Marta: {}", CONFLICT_MARKER);
        let tense = a.build_prompt(&p, &traits, &[], &tense_text, "hola", false);
        assert!(tense.contains(TENSION_HEADER));
        assert!(tense.contains("UNA frase"));
        assert!(tense.contains("No cites"));
        assert!(tense.contains("Nada de listas"));
    }

    #[test]
    fn test_trivial_wording_follows_bond_tension() {
        let a = assembler();
        let traits = PersonalityProfile::default();

        let calm = a.build_prompt(&profile(RelationshipVector::default()), &traits, &[], "", "ok", true);
        assert!(calm.contains(TRIVIAL_CALM));

        let hostile = RelationshipVector::new(60.0, 30.0, 10.0);
        let tense = a.build_prompt(&profile(hostile), &traits, &[], "", "ok", true);
        assert!(tense.contains(TRIVIAL_TENSE));
        assert!(tense.contains("MODO: HOSTILIDAD DESPECTIVA"));
    }

    #[test]
    fn test_resilience_bands() {
        let a = assembler();
        let p = profile(RelationshipVector::default());
        let band = |traits: PersonalityProfile| {
            let text = a.build_prompt(&p, &traits, &[], "", "hola", false);
            let start = position(&text, RESILIENCE_HEADER);
            let end = position(&text, RECENT_HEADER);
            text[start..end].to_string()
        };

        let mut thick = PersonalityProfile::uniform(90.0);
        thick.neuroticism = 5.0;
        assert!(band(thick).contains("piel gruesa"));

        let mut fragile = PersonalityProfile::uniform(20.0);
        fragile.neuroticism = 95.0;
        assert!(band(fragile).contains("sensible"));

        assert!(band(PersonalityProfile::default()).contains("equilibrado"));
    }

    #[test]
    fn test_assemble_exposes_goal_and_bond() {
        let jealous = RelationshipVector::new(20.0, 85.0, 60.0);
        let out = assembler().assemble(
            &profile(jealous),
            &PersonalityProfile::default(),
            &[],
            "",
            "¿dónde estabas?",
            false,
        );
        assert!(out.bond.is_tense());
        assert!(out.text.contains(&out.goal.description));
        assert!(out.text.contains("Confianza: 20/100"));
        assert!(out.text.contains(PRIVATE_FIELD));
        assert!(out.text.contains("new_state"));
    }
}
