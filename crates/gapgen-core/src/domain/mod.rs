pub mod errors;

pub use errors::{GapError, GapErrorCategory, GapResult, SourceResult, ValidationResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identifier of the sub-generator that produced an event.
///
/// Assigned by the [`SourceRegistry`] in registration order and stamped on
/// each accepted event for offline normalization bookkeeping.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SourceId(pub u16);

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of event source adapter kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Pythia,
    HepMc,
    Parametric,
}

impl SourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pythia => "pythia",
            Self::HepMc => "hepmc",
            Self::Parametric => "parametric",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Ordered sub-generator identifier table, declared once at scheduler
/// construction and consulted only for logging and provenance.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    labels: Vec<String>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, label: impl Into<String>) -> SourceId {
        let id = SourceId(self.labels.len() as u16);
        self.labels.push(label.into());
        id
    }

    pub fn label(&self, id: SourceId) -> Option<&str> {
        self.labels.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = SourceId> + '_ {
        (0..self.labels.len()).map(|index| SourceId(index as u16))
    }
}

#[cfg(test)]
mod tests {
    use super::{SourceId, SourceRegistry};

    #[test]
    fn registry_assigns_ids_in_registration_order() {
        let mut registry = SourceRegistry::new();
        let signal = registry.register("signal ccbar");
        let mb = registry.register("minimum bias");

        assert_eq!(signal, SourceId(0));
        assert_eq!(mb, SourceId(1));
        assert_eq!(registry.label(signal), Some("signal ccbar"));
        assert_eq!(registry.label(mb), Some("minimum bias"));
        assert_eq!(registry.label(SourceId(7)), None);
        assert_eq!(registry.len(), 2);
    }
}
