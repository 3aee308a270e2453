//! HepMC2 ASCII file source.
//!
//! Events are read with the `hepmc2` crate and flattened from its vertex
//! graph into the append-only mother/daughter index representation: vertices
//! are processed in file order, each vertex's incoming particles become the
//! mothers of its contiguously appended outgoing particles.

use super::{EngineOutcome, GeneratorEngine};
use crate::domain::{GapError, SourceResult};
use crate::event::{Event, HeavyIonInfo, Particle, ParticleStatus};
use hepmc2::Reader;
use particle_id::ParticleID;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// HepMC status code for a decayed particle: it reappears as an incoming
/// particle at its decay vertex.
const HEPMC_DECAYED: i32 = 2;

pub struct HepMcEngine {
    reader: Reader<BufReader<File>>,
    path: PathBuf,
    events_read: u64,
}

impl HepMcEngine {
    pub fn open(path: &Path) -> SourceResult<Self> {
        let file = File::open(path).map_err(|source| {
            GapError::io_system(
                "IO.HEPMC_OPEN",
                format!("failed to open '{}': {}", path.display(), source),
            )
        })?;
        Ok(Self {
            reader: Reader::from(BufReader::new(file)),
            path: path.to_path_buf(),
            events_read: 0,
        })
    }
}

impl GeneratorEngine for HepMcEngine {
    fn try_generate(&mut self) -> SourceResult<EngineOutcome> {
        match self.reader.next() {
            Some(Ok(event)) => {
                self.events_read += 1;
                Ok(EngineOutcome::Generated(flatten(event)))
            }
            Some(Err(source)) => Err(GapError::input_validation(
                "INPUT.HEPMC_PARSE",
                format!(
                    "malformed HepMC record in '{}' after {} events: {}",
                    self.path.display(),
                    self.events_read,
                    source
                ),
            )),
            // Running out of recorded events is unrecoverable: the driver
            // asked for more than the file holds.
            None => Err(GapError::input_validation(
                "INPUT.HEPMC_EXHAUSTED",
                format!(
                    "'{}' exhausted after {} events",
                    self.path.display(),
                    self.events_read
                ),
            )),
        }
    }
}

fn convert(source: &hepmc2::event::Particle, efact: f64, vertex: [f64; 3]) -> Particle {
    // hepmc2 four-vectors are (E, px, py, pz).
    let [e, px, py, pz] = source.p.0;
    Particle {
        pdg: ParticleID::new(source.id),
        p: [px * efact, py * efact, pz * efact, e * efact],
        vertex,
        status: ParticleStatus::from_i32(source.status),
        mothers: [None, None],
        daughters: None,
    }
}

/// Flatten the vertex list into one particle arena.
pub fn flatten(source: hepmc2::Event) -> Event {
    let efact = if source.energy_unit == hepmc2::event::EnergyUnit::MEV {
        1e-3
    } else {
        1.0
    };
    let lfact = if source.length_unit == hepmc2::event::LengthUnit::MM {
        0.1
    } else {
        1.0
    };

    let mut event = Event::new();
    if let Some(weight) = source.weights.first() {
        event.weight = *weight;
    }
    if let Some(info) = source.heavy_ion_info {
        event.heavy_ion = Some(HeavyIonInfo {
            impact_parameter: info.impact_parameter,
            event_plane_angle: info.event_plane_angle,
        });
    }

    // Flat indices waiting as mothers at a given end-vertex barcode.
    let mut pending: HashMap<i32, Vec<usize>> = HashMap::new();
    for vx in source.vertices {
        // Particles entering this vertex without having been produced at an
        // earlier one (beams, externally supplied initial state).
        for incoming in &vx.particles_in {
            if incoming.status != HEPMC_DECAYED {
                let index = event.push(convert(incoming, efact, [0.0; 3]));
                pending.entry(vx.barcode).or_default().push(index);
            }
        }
        let mothers = pending.remove(&vx.barcode).unwrap_or_default();
        let mother_links = [mothers.first().copied(), mothers.get(1).copied()];
        let position = [lfact * vx.x, lfact * vx.y, lfact * vx.z];

        let mut range: Option<(usize, usize)> = None;
        for outgoing in vx.particles_out {
            let end_vtx = outgoing.end_vtx;
            let mut particle = convert(&outgoing, efact, position);
            particle.mothers = mother_links;
            let index = event.push(particle);
            if end_vtx != 0 {
                pending.entry(end_vtx).or_default().push(index);
            }
            range = Some(match range {
                None => (index, index),
                Some((first, _)) => (first, index),
            });
        }
        if let Some(range) = range {
            for &mother in &mothers {
                event.particles[mother].daughters = Some(range);
            }
        }
    }
    event
}

#[cfg(test)]
mod tests {
    use super::flatten;
    use hepmc2::event::{FourVector, Vertex};

    fn hepmc_particle(id: i32, pz: f64, e: f64, status: i32, end_vtx: i32) -> hepmc2::event::Particle {
        hepmc2::event::Particle {
            id,
            p: FourVector([e, 0.0, 0.0, pz]),
            status,
            end_vtx,
            ..Default::default()
        }
    }

    #[test]
    fn vertex_graph_flattens_into_mother_daughter_indices() {
        // One production vertex emitting a D0 that decays at a second vertex
        // into K- pi+.
        let production = Vertex {
            barcode: -1,
            particles_in: vec![hepmc_particle(2212, 100.0, 100.0, 4, -1)],
            particles_out: vec![hepmc_particle(421, 5.0, 5.4, 2, -2)],
            ..Default::default()
        };
        let decay = Vertex {
            barcode: -2,
            particles_in: vec![hepmc_particle(421, 5.0, 5.4, 2, -2)],
            particles_out: vec![
                hepmc_particle(-321, 2.4, 2.5, 1, 0),
                hepmc_particle(211, 2.6, 2.7, 1, 0),
            ],
            ..Default::default()
        };
        let source = hepmc2::Event {
            number: 1,
            vertices: vec![production, decay],
            ..Default::default()
        };

        let event = flatten(source);

        // Beam proton, D0, K-, pi+ in append order.
        let codes: Vec<i32> = event.particles.iter().map(|p| p.code()).collect();
        assert_eq!(codes, vec![2212, 421, -321, 211]);

        let d0 = 1;
        assert_eq!(event.particles[d0].mothers[0], Some(0));
        assert_eq!(event.particles[d0].daughters, Some((2, 3)));
        assert_eq!(event.daughter_codes(d0), vec![-321, 211]);
        assert_eq!(event.particles[2].mothers[0], Some(d0));
        assert!(!event.particles[0].is_final_state());

        // Final-state kinematics survive the flattening untouched.
        assert!((event.particles[3].p[2] - 2.6).abs() < 1.0e-12);
        assert!((event.particles[3].p[3] - 2.7).abs() < 1.0e-12);
    }

    #[test]
    fn mev_units_are_rescaled_to_gev() {
        let vertex = Vertex {
            barcode: -1,
            particles_in: vec![hepmc_particle(2212, 100.0, 100.0, 4, -1)],
            particles_out: vec![hepmc_particle(211, 1000.0, 1010.0, 1, 0)],
            ..Default::default()
        };
        let source = hepmc2::Event {
            number: 1,
            vertices: vec![vertex],
            energy_unit: hepmc2::event::EnergyUnit::MEV,
            ..Default::default()
        };

        let event = flatten(source);
        let pion = event.particles.last().unwrap();
        assert!((pion.p[2] - 1.0).abs() < 1.0e-12);
        assert!((pion.p[3] - 1.01).abs() < 1.0e-12);
    }
}
