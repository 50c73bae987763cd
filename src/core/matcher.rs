/// Signal sequence matching: trailing-window comparison of emote history.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::entity::SignalCode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatcherError {
    #[error("required signal sequence must not be empty")]
    EmptySequence,
}

/// A validated, non-empty sequence of signals that befriends a stranger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SignalCode>", into = "Vec<SignalCode>")]
pub struct RequiredSequence(Vec<SignalCode>);

impl RequiredSequence {
    pub fn new(codes: Vec<SignalCode>) -> Result<Self, MatcherError> {
        if codes.is_empty() {
            return Err(MatcherError::EmptySequence);
        }
        Ok(Self(codes))
    }

    pub fn codes(&self) -> &[SignalCode] {
        &self.0
    }

    /// Always at least 1.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether the trailing window of `history` equals this sequence.
    pub fn matches<'a, I>(&self, history: I) -> bool
    where
        I: IntoIterator<Item = &'a SignalCode>,
        I::IntoIter: DoubleEndedIterator + ExactSizeIterator,
    {
        let history = history.into_iter();
        if history.len() < self.0.len() {
            return false;
        }
        history.rev().zip(self.0.iter().rev()).all(|(seen, want)| seen == want)
    }
}

impl Default for RequiredSequence {
    fn default() -> Self {
        Self(vec![
            SignalCode::HEART,
            SignalCode::HAPPY,
            SignalCode::WAVE,
            SignalCode::QUESTION,
        ])
    }
}

impl TryFrom<Vec<SignalCode>> for RequiredSequence {
    type Error = MatcherError;

    fn try_from(codes: Vec<SignalCode>) -> Result<Self, Self::Error> {
        Self::new(codes)
    }
}

impl From<RequiredSequence> for Vec<SignalCode> {
    fn from(sequence: RequiredSequence) -> Self {
        sequence.0
    }
}

/// Pure trailing-window check over raw slices.
///
/// An empty `required` never matches; configuration rejects it before it
/// can reach this point.
pub fn trailing_window_matches(history: &[SignalCode], required: &[SignalCode]) -> bool {
    if required.is_empty() || history.len() < required.len() {
        return false;
    }
    &history[history.len() - required.len()..] == required
}
