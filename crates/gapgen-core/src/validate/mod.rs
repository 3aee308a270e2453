//! Offline decay-chain validation.
//!
//! A batch consumer of the persisted event stream: for every particle whose
//! species code matches a configured signal species, the daughter-range
//! codes are compared as a sorted multiset against a table of expected decay
//! channels, with antiparticle symmetry handled by sign-flipping every
//! non-self-conjugate code. The run fails when the good-decay fraction drops
//! below the policy tolerance or when the basic sanity counts are off.

pub mod report;

use crate::common::constants::{self, is_self_conjugate};
use crate::domain::{GapError, SourceId, ValidationResult};
use crate::event::record::EventReader;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

pub use report::{
    render_human_summary, write_report, CheckReport, SourceCountReport, SpeciesDecayReport,
    ValidationReport,
};

/// Expected decay-daughter multisets per signal species, keyed by |pdg|.
#[derive(Debug, Clone, Default)]
pub struct DecayTable {
    channels: BTreeMap<i32, Vec<Vec<i32>>>,
}

impl DecayTable {
    /// The channels covered by the standard production configurations.
    pub fn builtin() -> Self {
        let mut table = Self::default();
        table.insert(constants::D_ZERO, vec![vec![-321, 211], vec![-321, 211, 111]]);
        table.insert(constants::D_PLUS, vec![vec![-321, 211, 211]]);
        table.insert(constants::D_S_PLUS, vec![vec![333, 211], vec![321, -321, 211]]);
        table.insert(constants::LAMBDA_C_PLUS, vec![vec![2212, -321, 211]]);
        table.insert(constants::XI_C_ZERO, vec![vec![211, 3312]]);
        table.insert(constants::LAMBDA, vec![vec![2212, -211]]);
        table.insert(constants::PHI, vec![vec![321, -321], vec![130, 310]]);
        table.insert(constants::JPSI, vec![vec![11, -11], vec![13, -13]]);
        table
    }

    pub fn insert(&mut self, pdg: i32, channels: Vec<Vec<i32>>) {
        let channels = channels
            .into_iter()
            .map(|mut channel| {
                channel.sort_unstable();
                channel
            })
            .collect();
        self.channels.insert(pdg.abs(), channels);
    }

    pub fn species(&self) -> impl Iterator<Item = i32> + '_ {
        self.channels.keys().copied()
    }

    pub fn covers(&self, pdg: i32) -> bool {
        self.channels.contains_key(&pdg.abs())
    }

    /// Whether `observed` matches one of the expected channels for the
    /// species, directly or as the charge conjugate.
    pub fn matches(&self, pdg: i32, observed: &[i32]) -> bool {
        let Some(channels) = self.channels.get(&pdg.abs()) else {
            return false;
        };
        if observed.is_empty() {
            return false;
        }
        let mut direct = observed.to_vec();
        direct.sort_unstable();
        let conjugated = conjugate_multiset(&direct);
        channels
            .iter()
            .any(|channel| *channel == direct || *channel == conjugated)
    }
}

/// Sign-flip every non-self-conjugate code, then re-sort.
fn conjugate_multiset(codes: &[i32]) -> Vec<i32> {
    let mut flipped: Vec<i32> = codes
        .iter()
        .map(|&code| if is_self_conjugate(code) { code } else { -code })
        .collect();
    flipped.sort_unstable();
    flipped
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesOverride {
    pub pdg: i32,
    pub min_good_decay_fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecayChannelSpec {
    pub pdg: i32,
    pub daughters: Vec<Vec<i32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationPolicy {
    /// Species to validate; empty means every species the decay table
    /// covers that actually occurs in the file.
    #[serde(default)]
    pub signal_species: Vec<i32>,
    #[serde(default = "default_min_fraction")]
    pub min_good_decay_fraction: f64,
    #[serde(default)]
    pub species_overrides: Vec<SpeciesOverride>,
    #[serde(default = "default_true")]
    pub require_signal: bool,
    /// Expected fraction of events carrying the signal sub-generator id,
    /// for multi-generator mixes.
    #[serde(default)]
    pub expected_signal_fraction: Option<f64>,
    #[serde(default = "default_fraction_tolerance")]
    pub signal_fraction_tolerance: f64,
    #[serde(default)]
    pub signal_source: SourceId,
    /// Additional or overriding decay channels.
    #[serde(default)]
    pub decay_channels: Vec<DecayChannelSpec>,
}

fn default_min_fraction() -> f64 {
    0.9
}

fn default_true() -> bool {
    true
}

fn default_fraction_tolerance() -> f64 {
    0.05
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            signal_species: Vec::new(),
            min_good_decay_fraction: default_min_fraction(),
            species_overrides: Vec::new(),
            require_signal: default_true(),
            expected_signal_fraction: None,
            signal_fraction_tolerance: default_fraction_tolerance(),
            signal_source: SourceId(0),
            decay_channels: Vec::new(),
        }
    }
}

impl ValidationPolicy {
    pub fn load(path: &Path) -> ValidationResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| {
            GapError::io_system(
                "IO.POLICY_READ",
                format!("failed to read '{}': {}", path.display(), source),
            )
        })?;
        serde_json::from_str(&text).map_err(|source| {
            GapError::input_validation(
                "INPUT.POLICY_PARSE",
                format!("invalid validation policy '{}': {}", path.display(), source),
            )
        })
    }

    fn min_fraction_for(&self, pdg: i32) -> f64 {
        self.species_overrides
            .iter()
            .find(|entry| entry.pdg.abs() == pdg.abs())
            .map(|entry| entry.min_good_decay_fraction)
            .unwrap_or(self.min_good_decay_fraction)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SpeciesCounts {
    signal: u64,
    good: u64,
}

/// Stream the persisted events and evaluate the policy checks.
///
/// Statistical failures leave the report's `passed` flag false; only broken
/// input (missing file, malformed rows, zero events) is an `Err`.
pub fn run_validation(
    events_path: &Path,
    policy: &ValidationPolicy,
) -> ValidationResult<ValidationReport> {
    let mut table = DecayTable::builtin();
    for spec in &policy.decay_channels {
        table.insert(spec.pdg, spec.daughters.clone());
    }
    let configured: BTreeSet<i32> = policy
        .signal_species
        .iter()
        .map(|code| code.abs())
        .collect();
    let restrict = !configured.is_empty();

    let mut counts: BTreeMap<i32, SpeciesCounts> = BTreeMap::new();
    let mut source_counts: BTreeMap<SourceId, u64> = BTreeMap::new();
    let mut event_count = 0u64;

    for event in EventReader::open(events_path)? {
        let event = event?;
        event_count += 1;
        if let Some(source) = event.source {
            *source_counts.entry(source).or_default() += 1;
        }
        for (index, particle) in event.particles.iter().enumerate() {
            let species = particle.code().abs();
            if restrict {
                if !configured.contains(&species) {
                    continue;
                }
            } else if !table.covers(species) {
                continue;
            }
            let entry = counts.entry(species).or_default();
            entry.signal += 1;
            if table.matches(species, &event.daughter_codes(index)) {
                entry.good += 1;
            }
        }
    }

    if event_count == 0 {
        return Err(GapError::input_validation(
            "INPUT.EVENTS_EMPTY",
            format!("'{}' holds no events", events_path.display()),
        ));
    }

    // Explicitly configured species must show up in the report even with a
    // zero count.
    for &species in &configured {
        counts.entry(species).or_default();
    }

    let species_reports: Vec<SpeciesDecayReport> = counts
        .iter()
        .map(|(&pdg, &SpeciesCounts { signal, good })| {
            let fraction = if signal > 0 {
                good as f64 / signal as f64
            } else {
                0.0
            };
            let required = policy.min_fraction_for(pdg);
            SpeciesDecayReport {
                pdg,
                signal_count: signal,
                good_decay_count: good,
                good_decay_fraction: fraction,
                min_required_fraction: required,
                passed: signal > 0 && fraction >= required,
            }
        })
        .collect();

    let total_signal: u64 = species_reports
        .iter()
        .map(|species| species.signal_count)
        .sum();

    let mut checks = Vec::new();
    if policy.require_signal {
        checks.push(CheckReport {
            name: "nonZeroSignal".to_string(),
            passed: total_signal > 0,
            detail: format!("{total_signal} signal particles in {event_count} events"),
        });
    }
    if let Some(expected) = policy.expected_signal_fraction {
        let signal_events = source_counts
            .get(&policy.signal_source)
            .copied()
            .unwrap_or(0);
        let observed = signal_events as f64 / event_count as f64;
        let deviation = (observed - expected).abs();
        checks.push(CheckReport {
            name: "signalEventFraction".to_string(),
            passed: deviation <= policy.signal_fraction_tolerance,
            detail: format!(
                "observed={observed:.4} expected={expected:.4} tolerance={:.4}",
                policy.signal_fraction_tolerance
            ),
        });
    }

    let passed = species_reports.iter().all(|species| species.passed)
        && checks.iter().all(|check| check.passed);

    let source_count_reports = source_counts
        .into_iter()
        .map(|(source, events)| SourceCountReport {
            source,
            events,
            fraction: events as f64 / event_count as f64,
        })
        .collect();

    tracing::info!(
        events = event_count,
        signal = total_signal,
        passed,
        "decay-chain validation finished"
    );
    Ok(ValidationReport {
        generated_at_unix_seconds: report::now_unix_seconds(),
        passed,
        events_path: events_path.display().to_string(),
        event_count,
        source_counts: source_count_reports,
        species: species_reports,
        checks,
    })
}

#[cfg(test)]
mod tests {
    use super::{run_validation, DecayChannelSpec, DecayTable, ValidationPolicy};
    use crate::domain::SourceId;
    use crate::event::record::EventWriter;
    use crate::event::{Event, Particle, ParticleStatus};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn decay_event(mother_pdg: i32, daughters: &[i32], source: u16) -> Event {
        let mut event = Event::new();
        event.source = Some(SourceId(source));
        let mother = event.push(Particle::new(
            mother_pdg,
            [0.0, 0.0, 1.0, 3.0],
            ParticleStatus::Decayed,
        ));
        let mut first_last = None;
        for &code in daughters {
            let mut daughter =
                Particle::new(code, [0.0, 0.0, 0.4, 1.0], ParticleStatus::Undecayed);
            daughter.mothers[0] = Some(mother);
            let index = event.push(daughter);
            first_last = Some(match first_last {
                None => (index, index),
                Some((first, _)) => (first, index),
            });
        }
        event.particles[mother].daughters = first_last;
        event
    }

    fn write_events(dir: &TempDir, events: &[Event]) -> PathBuf {
        let path = dir.path().join("events.jsonl");
        let mut writer = EventWriter::create(&path).unwrap();
        for event in events {
            writer.write_event(event).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn antiparticle_conjugated_decay_matches_the_table() {
        let table = DecayTable::builtin();
        assert!(table.matches(4132, &[211, 3312]));
        assert!(table.matches(4132, &[-3312, -211]));
        assert!(table.matches(-4132, &[-3312, -211]));
        assert!(!table.matches(4132, &[-3312, 211]));
        assert!(!table.matches(4132, &[]));
    }

    #[test]
    fn self_conjugate_daughters_keep_their_sign_under_conjugation() {
        let table = DecayTable::builtin();
        // D0 -> K- pi+ pi0 and its conjugate K+ pi- pi0.
        assert!(table.matches(421, &[-321, 211, 111]));
        assert!(table.matches(421, &[321, -211, 111]));
    }

    #[test]
    fn good_fraction_below_tolerance_fails_without_being_an_error() {
        let temp = TempDir::new().unwrap();
        let events = vec![
            decay_event(4132, &[3312, 211], 0),
            decay_event(4132, &[211, 211], 0),
        ];
        let path = write_events(&temp, &events);

        let report = run_validation(&path, &ValidationPolicy::default()).unwrap();
        assert!(!report.passed);
        let species = &report.species[0];
        assert_eq!(species.signal_count, 2);
        assert_eq!(species.good_decay_count, 1);
        assert!(!species.passed);
    }

    #[test]
    fn validation_is_idempotent_across_reruns() {
        let temp = TempDir::new().unwrap();
        let events = vec![
            decay_event(4132, &[3312, 211], 0),
            decay_event(-4132, &[-3312, -211], 1),
        ];
        let path = write_events(&temp, &events);
        let policy = ValidationPolicy::default();

        let first = run_validation(&path, &policy).unwrap();
        let second = run_validation(&path, &policy).unwrap();
        assert_eq!(first.passed, second.passed);
        assert_eq!(first.event_count, second.event_count);
        assert_eq!(first.species[0].signal_count, second.species[0].signal_count);
        assert_eq!(
            first.species[0].good_decay_count,
            second.species[0].good_decay_count
        );
        assert!(first.passed);
    }

    #[test]
    fn signal_fraction_check_uses_the_stamped_sources() {
        let temp = TempDir::new().unwrap();
        // 1 signal-tagged event in 5, matching a ratio-5 cocktail.
        let mut events = vec![decay_event(4132, &[3312, 211], 0)];
        for _ in 0..4 {
            events.push(decay_event(3122, &[2212, -211], 1));
        }
        let path = write_events(&temp, &events);

        let mut policy = ValidationPolicy {
            expected_signal_fraction: Some(0.2),
            ..ValidationPolicy::default()
        };
        let report = run_validation(&path, &policy).unwrap();
        assert!(report.passed);

        policy.expected_signal_fraction = Some(0.5);
        policy.signal_fraction_tolerance = 0.1;
        let report = run_validation(&path, &policy).unwrap();
        assert!(!report.passed);
        let check = report
            .checks
            .iter()
            .find(|check| check.name == "signalEventFraction")
            .unwrap();
        assert!(!check.passed);
    }

    #[test]
    fn explicitly_configured_species_missing_from_the_file_fail_the_run() {
        let temp = TempDir::new().unwrap();
        let events = vec![decay_event(3122, &[2212, -211], 0)];
        let path = write_events(&temp, &events);

        let policy = ValidationPolicy {
            signal_species: vec![4132],
            ..ValidationPolicy::default()
        };
        let report = run_validation(&path, &policy).unwrap();
        assert!(!report.passed);
        assert_eq!(report.species[0].pdg, 4132);
        assert_eq!(report.species[0].signal_count, 0);
    }

    #[test]
    fn custom_decay_channels_extend_the_builtin_table() {
        let temp = TempDir::new().unwrap();
        let events = vec![decay_event(3312, &[3122, -211], 0)];
        let path = write_events(&temp, &events);

        let policy = ValidationPolicy {
            signal_species: vec![3312],
            decay_channels: vec![DecayChannelSpec {
                pdg: 3312,
                daughters: vec![vec![3122, -211]],
            }],
            ..ValidationPolicy::default()
        };
        let report = run_validation(&path, &policy).unwrap();
        assert!(report.passed, "custom channel should match");
    }

    #[test]
    fn empty_event_file_is_an_input_error() {
        let temp = TempDir::new().unwrap();
        let path = write_events(&temp, &[]);
        let error = run_validation(&path, &ValidationPolicy::default()).unwrap_err();
        assert_eq!(error.code(), "INPUT.EVENTS_EMPTY");
    }
}
