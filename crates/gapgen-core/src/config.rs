//! Run configuration for a cocktail generation job.
//!
//! A JSON document declares the event count, the inverse trigger ratio, the
//! signal source, the minimum-bias sources and an optional selection
//! predicate. [`GenerationConfig::build_scheduler`] turns the declaration
//! into a ready [`CocktailScheduler`].

use crate::cocktail::{CocktailScheduler, RetryPolicy};
use crate::domain::{GapError, GapResult};
use crate::select::Selection;
use crate::sources::{EventSource, ParametricConfig, PythiaConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One declared event source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SourceSpec {
    Parametric {
        #[serde(default)]
        label: Option<String>,
        config: ParametricConfig,
    },
    HepMc {
        #[serde(default)]
        label: Option<String>,
        path: PathBuf,
    },
    /// Declared for provenance, but this build links no external generator;
    /// binding one goes through [`EventSource::pythia`] in library code.
    Pythia {
        #[serde(default)]
        label: Option<String>,
        config: PythiaConfig,
    },
}

impl SourceSpec {
    fn label_or(&self, fallback: &str) -> String {
        let label = match self {
            Self::Parametric { label, .. } => label,
            Self::HepMc { label, .. } => label,
            Self::Pythia { label, .. } => label,
        };
        label.clone().unwrap_or_else(|| fallback.to_string())
    }

    /// Build the source, seeding stochastic engines with `seed`.
    pub fn build(&self, fallback_label: &str, seed: u64) -> GapResult<EventSource> {
        match self {
            Self::Parametric { config, .. } => {
                config.validate()?;
                Ok(EventSource::parametric(
                    self.label_or(fallback_label),
                    config.clone(),
                    seed,
                ))
            }
            Self::HepMc { path, .. } => EventSource::hepmc(self.label_or(fallback_label), path),
            Self::Pythia { .. } => Err(GapError::input_validation(
                "INPUT.PYTHIA_UNBOUND",
                format!(
                    "source '{}' needs an external generator, and none is linked into \
                     this binary; bind one through the library API",
                    self.label_or(fallback_label)
                ),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Total number of events to deliver.
    pub events: u64,
    /// Inverse trigger ratio: one signal event per `ratio` events.
    #[serde(default = "default_ratio")]
    pub ratio: u64,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
    pub signal: SourceSpec,
    #[serde(default)]
    pub minimum_bias: Vec<SourceSpec>,
    #[serde(default)]
    pub selection: Option<Selection>,
}

fn default_ratio() -> u64 {
    1
}

impl GenerationConfig {
    pub fn load(path: &Path) -> GapResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| {
            GapError::io_system(
                "IO.CONFIG_READ",
                format!("failed to read '{}': {}", path.display(), source),
            )
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| {
            GapError::input_validation(
                "INPUT.CONFIG_PARSE",
                format!("invalid generation config '{}': {}", path.display(), source),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GapResult<()> {
        if self.events == 0 {
            return Err(GapError::input_validation(
                "INPUT.CONFIG_EVENTS",
                "event count must be >= 1",
            ));
        }
        if self.ratio > 1 && self.minimum_bias.is_empty() {
            return Err(GapError::input_validation(
                "INPUT.CONFIG_MINIMUM_BIAS",
                format!(
                    "ratio {} requires at least one minimum-bias source",
                    self.ratio
                ),
            ));
        }
        Ok(())
    }

    /// Build all declared sources and hand them to the scheduler. Each
    /// source gets a distinct seed derived from the run seed.
    pub fn build_scheduler(&self) -> GapResult<CocktailScheduler> {
        let mut sources = Vec::with_capacity(1 + self.minimum_bias.len());
        sources.push(self.signal.build("signal", self.seed)?);
        for (index, spec) in self.minimum_bias.iter().enumerate() {
            let fallback = format!("minimum bias {index}");
            sources.push(spec.build(&fallback, self.seed + 1 + index as u64)?);
        }
        CocktailScheduler::new(sources, self.ratio, self.selection.clone(), self.retry)
    }
}

#[cfg(test)]
mod tests {
    use super::{GenerationConfig, SourceSpec};
    use crate::domain::SourceId;

    const RATIO_FIVE_CONFIG: &str = r#"{
        "events": 10,
        "ratio": 5,
        "seed": 42,
        "signal": {
            "kind": "parametric",
            "label": "xi_c signal",
            "config": {
                "pdg": 4132,
                "pt": [0.5, 4.0],
                "y": [-0.5, 0.5],
                "decay": { "daughters": [3312, 211] }
            }
        },
        "minimumBias": [
            {
                "kind": "parametric",
                "config": { "pdg": 211, "multiplicity": 5, "pt": [0.1, 2.0] }
            }
        ],
        "selection": { "policy": "speciesPresence", "pdg": 4132 }
    }"#;

    #[test]
    fn full_config_round_trips_and_drives_the_scheduler() {
        let config: GenerationConfig = serde_json::from_str(RATIO_FIVE_CONFIG).unwrap();
        config.validate().unwrap();
        assert_eq!(config.events, 10);
        assert_eq!(config.ratio, 5);

        let mut scheduler = config.build_scheduler().unwrap();
        let sequence: Vec<u16> = (0..config.events)
            .map(|_| scheduler.next_event().unwrap().source.unwrap().0)
            .collect();
        assert_eq!(sequence, vec![0, 1, 1, 1, 1, 0, 1, 1, 1, 1]);
        assert_eq!(
            scheduler.registry().label(SourceId(0)),
            Some("xi_c signal")
        );
        assert_eq!(
            scheduler.registry().label(SourceId(1)),
            Some("minimum bias 0")
        );
    }

    #[test]
    fn ratio_above_one_without_minimum_bias_is_rejected() {
        let mut config: GenerationConfig = serde_json::from_str(RATIO_FIVE_CONFIG).unwrap();
        config.minimum_bias.clear();
        let error = config.validate().unwrap_err();
        assert_eq!(error.code(), "INPUT.CONFIG_MINIMUM_BIAS");
    }

    #[test]
    fn zero_events_are_rejected() {
        let mut config: GenerationConfig = serde_json::from_str(RATIO_FIVE_CONFIG).unwrap();
        config.events = 0;
        let error = config.validate().unwrap_err();
        assert_eq!(error.code(), "INPUT.CONFIG_EVENTS");
    }

    #[test]
    fn unbound_pythia_source_fails_with_a_usage_error() {
        let spec: SourceSpec = serde_json::from_str(
            r#"{
                "kind": "pythia",
                "label": "ccbar pythia",
                "config": { "directives": ["HardQCD:hardccbar = on"], "seed": 7 }
            }"#,
        )
        .unwrap();
        let error = spec.build("signal", 0).unwrap_err();
        assert_eq!(error.code(), "INPUT.PYTHIA_UNBOUND");
    }
}
