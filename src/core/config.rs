/// Tunables for bond progression and cooking, loadable from RON.
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::Path;
use thiserror::Error;

use crate::core::matcher::{MatcherError, RequiredSequence};
use crate::schema::entity::SignalCode;
use crate::schema::relationship::MAX_AFFECTION;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid signal sequence: {0}")]
    Sequence(#[from] MatcherError),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("proposal threshold {0} exceeds the affection cap")]
    ThresholdOutOfRange(u8),
    #[error("hint chance {0} is outside 0.0..=1.0")]
    HintChanceOutOfRange(f64),
}

/// Raw configuration as written in a RON file. Missing fields take the
/// defaults of the shipped mod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BondConfig {
    pub required_sequence: Vec<SignalCode>,
    pub friendly_affection_gain: u8,
    pub romance_affection_gain: u8,
    pub proposal_threshold: u8,
    pub cook_duration_ticks: u32,
    pub ticks_per_second: u32,
    pub capability_check_interval: u32,
    /// Probability that a non-matching signal gets a visible reaction.
    pub hint_chance: f64,
}

impl Default for BondConfig {
    fn default() -> Self {
        Self {
            required_sequence: RequiredSequence::default().into(),
            friendly_affection_gain: 1,
            romance_affection_gain: 5,
            proposal_threshold: 80,
            // 5 minutes at 60 ticks per second
            cook_duration_ticks: 18_000,
            ticks_per_second: 60,
            capability_check_interval: 600,
            hint_chance: 0.2,
        }
    }
}

/// Configuration after validation; the engine only ever sees this.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    pub required_sequence: RequiredSequence,
    pub friendly_affection_gain: u8,
    pub romance_affection_gain: u8,
    pub proposal_threshold: u8,
    pub cook_duration: NonZeroU32,
    pub ticks_per_second: NonZeroU32,
    pub capability_check_interval: NonZeroU32,
    pub hint_chance: f64,
}

impl BondConfig {
    pub fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(contents)?)
    }

    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Reject configurations the engine cannot run with. An empty required
    /// sequence is caught here rather than at match time.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let required_sequence = RequiredSequence::new(self.required_sequence.clone())?;
        if self.proposal_threshold > MAX_AFFECTION {
            return Err(ConfigError::ThresholdOutOfRange(self.proposal_threshold));
        }
        if !(0.0..=1.0).contains(&self.hint_chance) {
            return Err(ConfigError::HintChanceOutOfRange(self.hint_chance));
        }
        Ok(ValidatedConfig {
            required_sequence,
            friendly_affection_gain: self.friendly_affection_gain,
            romance_affection_gain: self.romance_affection_gain,
            proposal_threshold: self.proposal_threshold,
            cook_duration: non_zero(self.cook_duration_ticks, "cook_duration_ticks")?,
            ticks_per_second: non_zero(self.ticks_per_second, "ticks_per_second")?,
            capability_check_interval: non_zero(
                self.capability_check_interval,
                "capability_check_interval",
            )?,
            hint_chance: self.hint_chance,
        })
    }
}

fn non_zero(value: u32, field: &'static str) -> Result<NonZeroU32, ConfigError> {
    NonZeroU32::new(value).ok_or(ConfigError::Zero(field))
}
