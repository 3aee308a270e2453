//! Gap-triggered cocktail event generation and offline decay validation.
//!
//! The crate drives a cocktail of event sources at a fixed inverse trigger
//! ratio: one signal event, filtered by a selection predicate, per `ratio`
//! delivered events, the rest drawn from minimum-bias sources. Accepted
//! events carry a sub-generator provenance stamp and stream to a JSON-lines
//! file that the [`validate`] module checks offline against expected decay
//! channels.

pub mod cocktail;
pub mod common;
pub mod config;
pub mod domain;
pub mod event;
pub mod kinematics;
pub mod select;
pub mod sources;
pub mod validate;
