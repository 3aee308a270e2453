//! Persisted event records: one JSON object per line.
//!
//! The record types mirror the in-memory model with plain integer species
//! codes so the stream stays readable by anything that can parse JSON. The
//! columnar store used upstream is out of scope; this is the exchange format
//! between `generate` and `validate`.

use super::{Event, HeavyIonInfo, Particle, ParticleStatus};
use crate::domain::{GapError, GapResult, SourceId};
use particle_id::ParticleID;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticleRecord {
    pub pdg: i32,
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub e: f64,
    #[serde(default)]
    pub vx: f64,
    #[serde(default)]
    pub vy: f64,
    #[serde(default)]
    pub vz: f64,
    pub status: i32,
    #[serde(default)]
    pub mother1: Option<usize>,
    #[serde(default)]
    pub mother2: Option<usize>,
    #[serde(default)]
    pub daughter_first: Option<usize>,
    #[serde(default)]
    pub daughter_last: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(default)]
    pub source: Option<SourceId>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub impact_parameter: Option<f64>,
    #[serde(default)]
    pub event_plane_angle: Option<f64>,
    pub particles: Vec<ParticleRecord>,
}

fn default_weight() -> f64 {
    1.0
}

impl From<&Event> for EventRecord {
    fn from(event: &Event) -> Self {
        let particles = event
            .particles
            .iter()
            .map(|particle| ParticleRecord {
                pdg: particle.code(),
                px: particle.p[0],
                py: particle.p[1],
                pz: particle.p[2],
                e: particle.p[3],
                vx: particle.vertex[0],
                vy: particle.vertex[1],
                vz: particle.vertex[2],
                status: particle.status.to_i32(),
                mother1: particle.mothers[0],
                mother2: particle.mothers[1],
                daughter_first: particle.daughters.map(|(first, _)| first),
                daughter_last: particle.daughters.map(|(_, last)| last),
            })
            .collect();
        Self {
            source: event.source,
            weight: event.weight,
            impact_parameter: event.heavy_ion.map(|info| info.impact_parameter),
            event_plane_angle: event.heavy_ion.map(|info| info.event_plane_angle),
            particles,
        }
    }
}

impl EventRecord {
    /// Rebuild the in-memory event, rejecting index links that violate the
    /// append-only invariant.
    pub fn into_event(self) -> GapResult<Event> {
        let count = self.particles.len();
        let mut event = Event::new();
        event.weight = self.weight;
        event.source = self.source;
        if let (Some(b), Some(psi)) = (self.impact_parameter, self.event_plane_angle) {
            event.heavy_ion = Some(HeavyIonInfo {
                impact_parameter: b,
                event_plane_angle: psi,
            });
        }

        for (index, row) in self.particles.into_iter().enumerate() {
            for mother in [row.mother1, row.mother2].into_iter().flatten() {
                if mother >= index {
                    return Err(GapError::input_validation(
                        "INPUT.RECORD_MOTHER_INDEX",
                        format!(
                            "particle {index}: mother index {mother} does not precede it"
                        ),
                    ));
                }
            }
            let daughters = match (row.daughter_first, row.daughter_last) {
                (Some(first), Some(last)) => {
                    if first <= index || last < first || last >= count {
                        return Err(GapError::input_validation(
                            "INPUT.RECORD_DAUGHTER_RANGE",
                            format!(
                                "particle {index}: daughter range {first}..={last} is not a \
                                 contiguous later slice of a {count}-particle event"
                            ),
                        ));
                    }
                    Some((first, last))
                }
                (None, None) => None,
                _ => {
                    return Err(GapError::input_validation(
                        "INPUT.RECORD_DAUGHTER_RANGE",
                        format!("particle {index}: half-open daughter range"),
                    ));
                }
            };

            let mut particle = Particle {
                pdg: ParticleID::new(row.pdg),
                p: [row.px, row.py, row.pz, row.e],
                vertex: [row.vx, row.vy, row.vz],
                status: ParticleStatus::from_i32(row.status),
                mothers: [row.mother1, row.mother2],
                daughters,
            };
            // Normalise mother ordering so the ancestry walk always follows
            // the first link.
            if particle.mothers[0].is_none() {
                particle.mothers.swap(0, 1);
            }
            event.push(particle);
        }
        Ok(event)
    }
}

/// Writes one JSON event record per line.
pub struct EventWriter<W: Write> {
    inner: W,
    written: u64,
}

impl EventWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> GapResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| {
                    GapError::io_system(
                        "IO.EVENT_STREAM_CREATE",
                        format!("failed to create '{}': {}", parent.display(), source),
                    )
                })?;
            }
        }
        let file = File::create(path).map_err(|source| {
            GapError::io_system(
                "IO.EVENT_STREAM_CREATE",
                format!("failed to create '{}': {}", path.display(), source),
            )
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> EventWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn write_event(&mut self, event: &Event) -> GapResult<()> {
        let record = EventRecord::from(event);
        let line = serde_json::to_string(&record).map_err(|source| {
            GapError::internal(
                "SYS.EVENT_RECORD_ENCODE",
                format!("failed to encode event record: {source}"),
            )
        })?;
        writeln!(self.inner, "{line}").map_err(|source| {
            GapError::io_system(
                "IO.EVENT_STREAM_WRITE",
                format!("failed to write event record: {source}"),
            )
        })?;
        self.written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> GapResult<u64> {
        self.inner.flush().map_err(|source| {
            GapError::io_system(
                "IO.EVENT_STREAM_FLUSH",
                format!("failed to flush event stream: {source}"),
            )
        })?;
        Ok(self.written)
    }
}

/// Streams events back from a JSON-lines file; blank lines are skipped.
pub struct EventReader<R: BufRead> {
    lines: Lines<R>,
    line_number: usize,
}

impl EventReader<BufReader<File>> {
    pub fn open(path: &Path) -> GapResult<Self> {
        let file = File::open(path).map_err(|source| {
            GapError::io_system(
                "IO.EVENT_STREAM_OPEN",
                format!("failed to open '{}': {}", path.display(), source),
            )
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EventReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            lines: inner.lines(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = GapResult<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_number += 1;
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(source) => {
                    return Some(Err(GapError::io_system(
                        "IO.EVENT_STREAM_READ",
                        format!("read failed at line {}: {}", self.line_number, source),
                    )));
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let record: EventRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(source) => {
                    return Some(Err(GapError::input_validation(
                        "INPUT.RECORD_MALFORMED",
                        format!("malformed event record at line {}: {}", self.line_number, source),
                    )));
                }
            };
            return Some(record.into_event());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EventReader, EventRecord, EventWriter};
    use crate::domain::SourceId;
    use crate::event::{Event, Particle, ParticleStatus};
    use std::io::BufReader;

    fn sample_event() -> Event {
        let mut event = Event::new();
        event.weight = 0.5;
        event.source = Some(SourceId(1));
        let mother = event.push(Particle::new(
            421,
            [0.1, -0.2, 3.0, 3.6],
            ParticleStatus::Decayed,
        ));
        let mut kaon = Particle::new(-321, [0.0, 0.1, 1.4, 1.5], ParticleStatus::Undecayed);
        kaon.mothers[0] = Some(mother);
        let mut pion = Particle::new(211, [0.1, -0.3, 1.6, 1.7], ParticleStatus::Undecayed);
        pion.mothers[0] = Some(mother);
        let first = event.push(kaon);
        let last = event.push(pion);
        event.particles[mother].daughters = Some((first, last));
        event
    }

    #[test]
    fn stream_round_trip_preserves_ancestry_links() {
        let event = sample_event();
        let mut buffer = Vec::new();
        {
            let mut writer = EventWriter::new(&mut buffer);
            writer.write_event(&event).unwrap();
            assert_eq!(writer.finish().unwrap(), 1);
        }

        let mut reader = EventReader::new(BufReader::new(buffer.as_slice()));
        let restored = reader.next().unwrap().unwrap();
        assert!(reader.next().is_none());

        assert_eq!(restored, event);
        assert_eq!(restored.daughter_codes(0), vec![-321, 211]);
    }

    #[test]
    fn forward_mother_link_is_rejected() {
        let json = r#"{"particles":[
            {"pdg":421,"px":0,"py":0,"pz":0,"e":2,"status":2,"mother1":1}
        ]}"#
        .replace('\n', "");
        let record: EventRecord = serde_json::from_str(&json).unwrap();
        let error = record.into_event().unwrap_err();
        assert_eq!(error.code(), "INPUT.RECORD_MOTHER_INDEX");
    }

    #[test]
    fn half_open_daughter_range_is_rejected() {
        let json = r#"{"particles":[
            {"pdg":421,"px":0,"py":0,"pz":0,"e":2,"status":2,"daughterFirst":1}
        ]}"#
        .replace('\n', "");
        let record: EventRecord = serde_json::from_str(&json).unwrap();
        let error = record.into_event().unwrap_err();
        assert_eq!(error.code(), "INPUT.RECORD_DAUGHTER_RANGE");
    }
}
