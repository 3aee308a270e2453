//! Gap-triggered cocktail scheduling.
//!
//! The scheduler alternates between a signal source and one or more
//! minimum-bias sources at a fixed integer ratio: request `n` lands in slot
//! `n % ratio`, slot 0 goes to the signal source, every other slot to a
//! minimum-bias source. Signal events loop on the selection predicate until
//! accepted; minimum-bias events are accepted unconditionally.

use crate::domain::{GapError, GapResult, SourceId, SourceRegistry};
use crate::event::Event;
use crate::select::Selection;
use crate::sources::EventSource;
use serde::{Deserialize, Serialize};

/// Retry behaviour of the signal selection loop.
///
/// The production configurations rely on statistically satisfiable
/// predicates and run unbounded; the bounded variant turns a never-satisfied
/// predicate into an observable error instead of a hang.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RetryPolicy {
    #[default]
    Unbounded,
    Bounded(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStats {
    pub id: SourceId,
    pub delivered: u64,
    /// Signal candidates discarded by the selection predicate.
    pub rejected: u64,
}

#[derive(Debug)]
pub struct CocktailScheduler {
    sources: Vec<EventSource>,
    ids: Vec<SourceId>,
    registry: SourceRegistry,
    selection: Option<Selection>,
    ratio: u64,
    retry: RetryPolicy,
    n: u64,
    stats: Vec<SourceStats>,
}

impl CocktailScheduler {
    /// `sources[0]` is the signal source; the rest serve minimum-bias slots.
    pub fn new(
        sources: Vec<EventSource>,
        ratio: u64,
        selection: Option<Selection>,
        retry: RetryPolicy,
    ) -> GapResult<Self> {
        if sources.is_empty() {
            return Err(GapError::input_validation(
                "INPUT.COCKTAIL_SOURCES",
                "a cocktail needs at least one event source",
            ));
        }
        if ratio < 1 {
            return Err(GapError::input_validation(
                "INPUT.COCKTAIL_RATIO",
                "inverse trigger ratio must be >= 1, got 0",
            ));
        }
        if ratio > 1 && sources.len() < 2 {
            return Err(GapError::input_validation(
                "INPUT.COCKTAIL_SOURCES",
                format!(
                    "ratio {ratio} requires a minimum-bias source besides the signal source"
                ),
            ));
        }

        let mut registry = SourceRegistry::new();
        let ids: Vec<SourceId> = sources
            .iter()
            .map(|source| registry.register(source.label()))
            .collect();
        let stats = ids
            .iter()
            .map(|&id| SourceStats {
                id,
                delivered: 0,
                rejected: 0,
            })
            .collect();
        tracing::info!(
            sources = sources.len(),
            ratio,
            selected = selection.is_some(),
            "cocktail scheduler configured"
        );
        Ok(Self {
            sources,
            ids,
            registry,
            selection,
            ratio,
            retry,
            n: 0,
            stats,
        })
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn source_stats(&self) -> &[SourceStats] {
        &self.stats
    }

    pub const fn events_delivered(&self) -> u64 {
        self.n
    }

    /// Index into `sources` serving the given slot. Slot 0 is signal; the
    /// remaining slots rotate over the minimum-bias sources.
    fn source_index(&self, slot: u64) -> usize {
        if slot == 0 {
            0
        } else {
            let mb_count = (self.sources.len() - 1) as u64;
            1 + ((slot - 1) % mb_count) as usize
        }
    }

    /// Produce the next event of the cocktail.
    ///
    /// Post-condition: if the event came from the signal source and a
    /// selection is configured, the selection accepts it.
    pub fn next_event(&mut self) -> GapResult<Event> {
        let slot = self.n % self.ratio;
        let index = self.source_index(slot);
        let is_signal = index == 0;

        let mut rejections = 0u64;
        loop {
            let mut event = self.sources[index].produce_event()?;
            if is_signal {
                if let Some(selection) = &self.selection {
                    if !selection.accept(&event) {
                        rejections += 1;
                        self.stats[index].rejected += 1;
                        if let RetryPolicy::Bounded(limit) = self.retry {
                            if rejections >= limit {
                                return Err(GapError::computation(
                                    "RUN.SELECTION_RETRY_LIMIT",
                                    format!(
                                        "selection rejected {limit} consecutive events from \
                                         signal source '{}'",
                                        self.sources[index].label()
                                    ),
                                ));
                            }
                        }
                        continue;
                    }
                }
            }

            event.stamp_source(self.ids[index])?;
            self.stats[index].delivered += 1;
            self.n += 1;
            tracing::debug!(
                event = self.n,
                source = %self.sources[index].label(),
                rejections,
                "event accepted"
            );
            return Ok(event);
        }
    }
}

/// Per-run provenance summary written next to the event stream.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    pub event_count: u64,
    pub ratio: u64,
    pub sources: Vec<SourceSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub id: SourceId,
    pub label: String,
    pub delivered: u64,
    pub rejected: u64,
}

impl GenerationSummary {
    pub fn from_scheduler(scheduler: &CocktailScheduler) -> Self {
        let sources = scheduler
            .source_stats()
            .iter()
            .map(|stats| SourceSummary {
                id: stats.id,
                label: scheduler
                    .registry()
                    .label(stats.id)
                    .unwrap_or("<unregistered>")
                    .to_string(),
                delivered: stats.delivered,
                rejected: stats.rejected,
            })
            .collect();
        Self {
            event_count: scheduler.events_delivered(),
            ratio: scheduler.ratio,
            sources,
        }
    }
}
