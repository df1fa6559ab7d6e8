//! Bond dynamics: trust / intimacy / respect → relational mode directives.
//!
//! Rules are independent and may fire together. Their directives are
//! concatenated in a fixed order so the output does not depend on rule
//! evaluation order.

use alma_core::config::BondConfig;
use alma_core::RelationshipVector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BondMode {
    /// High intimacy with low trust.
    PathologicalJealousy,
    /// Respect has collapsed.
    ContemptuousHostility,
    Stable,
}

impl BondMode {
    /// Stable marker line; tests and the prompt's tension detection key on it.
    pub fn marker(&self) -> &'static str {
        match self {
            BondMode::PathologicalJealousy => "MODO: CELOS PATOLÓGICOS",
            BondMode::ContemptuousHostility => "MODO: HOSTILIDAD DESPECTIVA",
            BondMode::Stable => "MODO: VÍNCULO ESTABLE",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BondMode::PathologicalJealousy => "celos",
            BondMode::ContemptuousHostility => "desprecio",
            BondMode::Stable => "estable",
        }
    }

    fn directive(&self) -> &'static str {
        match self {
            BondMode::PathologicalJealousy => {
                "Sientes que el vínculo es intenso pero no terminas de confiar. \
Muestra sospecha y control indirecto: insinúa, compara, deja ver que notas detalles. \
Puedes hacer como máximo UNA pregunta aclaratoria; nunca conviertas la respuesta en un interrogatorio."
            }
            BondMode::ContemptuousHostility => {
                "Has perdido el respeto por esta persona. \
Responde con sarcasmo, minimiza lo que cuenta y deja caer algún reproche. \
No finjas calidez que no sientes."
            }
            BondMode::Stable => {
                "El vínculo es estable. Mantén un tono neutral y coherente con tu personalidad, \
sin dramatizar ni forzar cercanía."
            }
        }
    }
}

/// Outcome of [`derive_bond_dynamics`].
#[derive(Debug, Clone, PartialEq)]
pub struct BondDirective {
    pub modes: Vec<BondMode>,
    pub text: String,
}

impl BondDirective {
    /// Any mode other than stable fired.
    pub fn is_tense(&self) -> bool {
        self.modes.iter().any(|m| *m != BondMode::Stable)
    }

    pub fn has(&self, mode: BondMode) -> bool {
        self.modes.contains(&mode)
    }

    pub fn labels(&self) -> String {
        self.modes
            .iter()
            .map(BondMode::label)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn derive_bond_dynamics(rel: &RelationshipVector, config: &BondConfig) -> BondDirective {
    let mut modes = Vec::new();
    if rel.intimacy >= config.jealousy_min_intimacy && rel.trust <= config.jealousy_max_trust {
        modes.push(BondMode::PathologicalJealousy);
    }
    if rel.respect <= config.hostility_max_respect {
        modes.push(BondMode::ContemptuousHostility);
    }
    if modes.is_empty() {
        modes.push(BondMode::Stable);
    }

    let text = modes
        .iter()
        .map(|m| format!("{}\n{}", m.marker(), m.directive()))
        .collect::<Vec<_>>()
        .join("\n\n");

    BondDirective { modes, text }
}
