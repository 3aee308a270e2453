//! Event source adapters.
//!
//! A [`GeneratorEngine`] is the seam to an underlying generator: it either
//! produces a raw event, reports a per-attempt failure (the generator's own
//! "next event failed" flag), or fails unrecoverably. The [`EventSource`]
//! adapter wraps an engine with a bounded attempt budget so an engine that
//! keeps failing surfaces as an observable error instead of a silent spin.

pub mod hepmc;
pub mod parametric;

use crate::domain::{GapError, SourceKind, SourceResult};
use crate::event::Event;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use hepmc::HepMcEngine;
pub use parametric::{ForcedDecay, ParametricConfig, ParametricEngine};

/// One attempt of the underlying generator.
#[derive(Debug)]
pub enum EngineOutcome {
    Generated(Event),
    /// The generator's per-attempt success flag was false; the adapter may
    /// try again.
    Failed,
}

pub trait GeneratorEngine {
    fn try_generate(&mut self) -> SourceResult<EngineOutcome>;
}

/// Configuration surface for an external Pythia-style generator bound
/// through [`GeneratorEngine`]: plain string directives plus a seed, exactly
/// what the underlying library consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PythiaConfig {
    pub directives: Vec<String>,
    #[serde(default)]
    pub seed: Option<u64>,
}

const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

/// Wraps one underlying generator and produces raw events from it.
pub struct EventSource {
    kind: SourceKind,
    label: String,
    engine: Box<dyn GeneratorEngine>,
    max_attempts: u32,
}

impl EventSource {
    pub fn new(kind: SourceKind, label: impl Into<String>, engine: Box<dyn GeneratorEngine>) -> Self {
        Self {
            kind,
            label: label.into(),
            engine,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn parametric(label: impl Into<String>, config: ParametricConfig, seed: u64) -> Self {
        Self::new(
            SourceKind::Parametric,
            label,
            Box::new(ParametricEngine::new(config, seed)),
        )
    }

    pub fn hepmc(label: impl Into<String>, path: &Path) -> SourceResult<Self> {
        Ok(Self::new(
            SourceKind::HepMc,
            label,
            Box::new(HepMcEngine::open(path)?),
        ))
    }

    /// Bind an externally linked Pythia-style generator. The engine is the
    /// black box; the config is logged for provenance.
    pub fn pythia(
        label: impl Into<String>,
        config: &PythiaConfig,
        engine: Box<dyn GeneratorEngine>,
    ) -> Self {
        let label = label.into();
        tracing::info!(
            source = %label,
            directives = config.directives.len(),
            seed = ?config.seed,
            "binding external generator"
        );
        Self::new(SourceKind::Pythia, label, engine)
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub const fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Produce one raw event, retrying per-attempt generator failures up to
    /// the attempt budget. Unrecoverable engine errors propagate untouched.
    pub fn produce_event(&mut self) -> SourceResult<Event> {
        for attempt in 1..=self.max_attempts {
            match self.engine.try_generate()? {
                EngineOutcome::Generated(event) => return Ok(event),
                EngineOutcome::Failed => {
                    tracing::debug!(
                        source = %self.label,
                        attempt,
                        "generator attempt failed, retrying"
                    );
                }
            }
        }
        Err(GapError::computation(
            "RUN.SOURCE_ATTEMPTS_EXHAUSTED",
            format!(
                "source '{}' failed {} consecutive generation attempts",
                self.label, self.max_attempts
            ),
        ))
    }
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}
