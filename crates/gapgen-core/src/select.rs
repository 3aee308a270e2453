//! Accept/reject predicates applied to signal-source events.
//!
//! Each predicate is a pure function of one event's particle list. The
//! policies mirror the trigger configurations used in production: species
//! presence inside an acceptance window, heavy-flavor ancestry tagging,
//! opposite-sign pairs, leading charged pt, and multiplicity thresholds.

use crate::common::constants::is_charged_final_state;
use crate::event::{Event, Particle};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowVariable {
    Pseudorapidity,
    Rapidity,
}

/// Longitudinal acceptance window in pseudorapidity or rapidity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RapidityWindow {
    pub variable: WindowVariable,
    pub min: f64,
    pub max: f64,
}

impl RapidityWindow {
    pub fn contains(&self, particle: &Particle) -> bool {
        let value = match self.variable {
            WindowVariable::Pseudorapidity => particle.pseudorapidity(),
            WindowVariable::Rapidity => particle.rapidity(),
        };
        value >= self.min && value <= self.max
    }
}

/// Heavy quark flavors recognised by the ancestry heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeavyFlavor {
    Charm,
    Beauty,
}

impl HeavyFlavor {
    const fn quark_digit(self) -> i32 {
        match self {
            Self::Charm => 4,
            Self::Beauty => 5,
        }
    }

    /// Integer-division heuristic: the code's hundreds digit (mesons) or
    /// thousands digit (baryons) is the heavy quark.
    pub fn carried_by(self, code: i32) -> bool {
        let code = code.abs();
        let digit = self.quark_digit();
        code / 100 == digit || code / 1000 == digit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Selection {
    /// At least one particle of the species, optionally inside a window.
    SpeciesPresence {
        pdg: i32,
        #[serde(default = "default_true")]
        abs_code: bool,
        #[serde(default)]
        window: Option<RapidityWindow>,
    },
    /// A particle of the species whose mother chain reaches a heavy-flavor
    /// hadron. An empty flavor list means charm or beauty.
    HeavyFlavorAncestry {
        pdg: i32,
        #[serde(default)]
        flavors: Vec<HeavyFlavor>,
    },
    /// Both charge states of the species individually present.
    OppositeSignPair {
        pdg: i32,
        #[serde(default)]
        window: Option<RapidityWindow>,
    },
    /// Leading charged final-state particle above threshold, optionally
    /// combined with a second condition.
    LeadingChargedPt {
        min_pt: f64,
        #[serde(default)]
        then: Option<Box<Selection>>,
    },
    /// Final-state multiplicity threshold.
    MinMultiplicity { min_final_state: usize },
}

fn default_true() -> bool {
    true
}

impl Selection {
    pub fn accept(&self, event: &Event) -> bool {
        match self {
            Self::SpeciesPresence {
                pdg,
                abs_code,
                window,
            } => event
                .particles
                .iter()
                .any(|particle| species_match(particle, *pdg, *abs_code, window)),
            Self::HeavyFlavorAncestry { pdg, flavors } => event
                .particles
                .iter()
                .enumerate()
                .filter(|(_, particle)| particle.code().abs() == pdg.abs())
                .any(|(index, _)| has_heavy_flavor_ancestor(event, index, flavors)),
            Self::OppositeSignPair { pdg, window } => {
                let code = pdg.abs();
                let found = |wanted: i32| {
                    event
                        .particles
                        .iter()
                        .any(|particle| species_match(particle, wanted, false, window))
                };
                found(code) && found(-code)
            }
            Self::LeadingChargedPt { min_pt, then } => {
                let leading = event
                    .final_state()
                    .filter(|(_, particle)| is_charged_final_state(particle.code()))
                    .map(|(_, particle)| particle.pt())
                    .fold(0.0_f64, f64::max);
                leading > *min_pt
                    && then
                        .as_deref()
                        .map(|selection| selection.accept(event))
                        .unwrap_or(true)
            }
            Self::MinMultiplicity { min_final_state } => {
                event.final_state().count() >= *min_final_state
            }
        }
    }
}

fn species_match(
    particle: &Particle,
    pdg: i32,
    abs_code: bool,
    window: &Option<RapidityWindow>,
) -> bool {
    let code_matches = if abs_code {
        particle.code().abs() == pdg.abs()
    } else {
        particle.code() == pdg
    };
    code_matches
        && window
            .as_ref()
            .map(|window| window.contains(particle))
            .unwrap_or(true)
}

/// Whether any ancestor of `index` carries one of the requested flavors.
/// Particles with no recorded mother simply end the walk.
fn has_heavy_flavor_ancestor(event: &Event, index: usize, flavors: &[HeavyFlavor]) -> bool {
    let flavors: &[HeavyFlavor] = if flavors.is_empty() {
        &[HeavyFlavor::Charm, HeavyFlavor::Beauty]
    } else {
        flavors
    };
    event.ancestors(index).any(|(_, ancestor)| {
        flavors
            .iter()
            .any(|flavor| flavor.carried_by(ancestor.code()))
    })
}
