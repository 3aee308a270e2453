//! In-memory event model: an append-only particle arena with index links.
//!
//! Mother indices always point at earlier positions in the particle list and
//! daughter ranges at later positions, so ancestry walks terminate by
//! construction. Sentinel "no mother"/"no daughter" links are `None`, never
//! magic negative indices.

pub mod record;

use crate::domain::{GapError, GapResult, SourceId};
use crate::kinematics;
use particle_id::ParticleID;

/// Generation-level particle status, following the HepMC2 convention
/// (1 = undecayed, 2 = decayed, 3 = documentation, 4 = beam).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleStatus {
    Undecayed,
    Decayed,
    Documentation,
    Beam,
    Other(i32),
}

impl ParticleStatus {
    pub const fn to_i32(self) -> i32 {
        match self {
            Self::Undecayed => 1,
            Self::Decayed => 2,
            Self::Documentation => 3,
            Self::Beam => 4,
            Self::Other(code) => code,
        }
    }

    pub const fn from_i32(code: i32) -> Self {
        match code {
            1 => Self::Undecayed,
            2 => Self::Decayed,
            3 => Self::Documentation,
            4 => Self::Beam,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub pdg: ParticleID,
    /// Four-momentum `[px, py, pz, e]` in GeV.
    pub p: [f64; 4],
    /// Production vertex `[x, y, z]`.
    pub vertex: [f64; 3],
    pub status: ParticleStatus,
    pub mothers: [Option<usize>; 2],
    /// Inclusive contiguous daughter index range.
    pub daughters: Option<(usize, usize)>,
}

impl Particle {
    pub fn new(pdg: i32, p: [f64; 4], status: ParticleStatus) -> Self {
        Self {
            pdg: ParticleID::new(pdg),
            p,
            vertex: [0.0; 3],
            status,
            mothers: [None, None],
            daughters: None,
        }
    }

    pub fn code(&self) -> i32 {
        self.pdg.id()
    }

    pub fn is_final_state(&self) -> bool {
        matches!(self.status, ParticleStatus::Undecayed)
    }

    pub fn pt(&self) -> f64 {
        kinematics::pt(&self.p)
    }

    pub fn pseudorapidity(&self) -> f64 {
        kinematics::pseudorapidity(&self.p)
    }

    pub fn rapidity(&self) -> f64 {
        kinematics::rapidity(&self.p)
    }
}

/// Event-level heavy-ion metadata for flow studies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeavyIonInfo {
    pub impact_parameter: f64,
    pub event_plane_angle: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub particles: Vec<Particle>,
    pub weight: f64,
    /// Sub-generator provenance; stamped exactly once, on acceptance.
    pub source: Option<SourceId>,
    pub heavy_ion: Option<HeavyIonInfo>,
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl Event {
    pub fn new() -> Self {
        Self {
            particles: Vec::new(),
            weight: 1.0,
            source: None,
            heavy_ion: None,
        }
    }

    /// Append a particle and return its index.
    pub fn push(&mut self, particle: Particle) -> usize {
        self.particles.push(particle);
        self.particles.len() - 1
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Stamp the producing sub-generator. Stamping twice is a logic error.
    pub fn stamp_source(&mut self, id: SourceId) -> GapResult<()> {
        if let Some(existing) = self.source {
            return Err(GapError::internal(
                "SYS.EVENT_SOURCE_RESTAMP",
                format!("event already stamped with source {existing}, refusing {id}"),
            ));
        }
        self.source = Some(id);
        Ok(())
    }

    pub fn final_state(&self) -> impl Iterator<Item = (usize, &Particle)> {
        self.particles
            .iter()
            .enumerate()
            .filter(|(_, particle)| particle.is_final_state())
    }

    /// The contiguous daughter slice of `index`, empty when the particle has
    /// no recorded daughters or the range is out of bounds.
    pub fn daughters_of(&self, index: usize) -> &[Particle] {
        let Some(particle) = self.particles.get(index) else {
            return &[];
        };
        let Some((first, last)) = particle.daughters else {
            return &[];
        };
        if first <= index || last < first || last >= self.particles.len() {
            return &[];
        }
        &self.particles[first..=last]
    }

    pub fn daughter_codes(&self, index: usize) -> Vec<i32> {
        self.daughters_of(index)
            .iter()
            .map(Particle::code)
            .collect()
    }

    /// Walk the first-mother chain starting from (and excluding) `index`.
    ///
    /// Each step must strictly decrease the index; a link violating the
    /// append-only invariant stops the walk instead of looping.
    pub fn ancestors(&self, index: usize) -> Ancestors<'_> {
        Ancestors {
            event: self,
            current: Some(index),
        }
    }
}

pub struct Ancestors<'a> {
    event: &'a Event,
    current: Option<usize>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = (usize, &'a Particle);

    fn next(&mut self) -> Option<Self::Item> {
        let here = self.current.take()?;
        let mother = self.event.particles.get(here)?.mothers[0]?;
        if mother >= here {
            return None;
        }
        self.current = Some(mother);
        Some((mother, &self.event.particles[mother]))
    }
}
