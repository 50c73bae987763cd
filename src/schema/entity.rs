use serde::{Deserialize, Serialize};

/// Newtype wrapper for the host's stable entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

/// A discrete player-issued cue, e.g. an emote bubble id.
///
/// The engine never interprets the numeric value; it only compares codes
/// against the configured required sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalCode(pub u32);

impl SignalCode {
    pub const HAPPY: SignalCode = SignalCode(1);
    pub const HEART: SignalCode = SignalCode(3);
    pub const QUESTION: SignalCode = SignalCode(5);
    pub const WAVE: SignalCode = SignalCode(10);

    /// Human-readable label for the well-known emote codes.
    pub fn label(&self) -> Option<&'static str> {
        match *self {
            Self::HAPPY => Some("happy"),
            Self::HEART => Some("heart"),
            Self::QUESTION => Some("question"),
            Self::WAVE => Some("wave"),
            _ => None,
        }
    }

    /// Parse either a well-known label or a raw numeric code.
    pub fn parse(input: &str) -> Option<SignalCode> {
        match input.trim().to_ascii_lowercase().as_str() {
            "happy" => Some(Self::HAPPY),
            "heart" => Some(Self::HEART),
            "question" => Some(Self::QUESTION),
            "wave" => Some(Self::WAVE),
            other => other.parse().ok().map(SignalCode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_for_known_emotes() {
        assert_eq!(SignalCode::HEART.label(), Some("heart"));
        assert_eq!(SignalCode::WAVE.label(), Some("wave"));
        assert_eq!(SignalCode(99).label(), None);
    }

    #[test]
    fn parse_label_or_number() {
        assert_eq!(SignalCode::parse("Heart"), Some(SignalCode::HEART));
        assert_eq!(SignalCode::parse(" question "), Some(SignalCode::QUESTION));
        assert_eq!(SignalCode::parse("42"), Some(SignalCode(42)));
        assert_eq!(SignalCode::parse("shrug"), None);
    }

    #[test]
    fn entity_ids_order_by_value() {
        let mut ids = vec![EntityId(7), EntityId(2), EntityId(5)];
        ids.sort();
        assert_eq!(ids, vec![EntityId(2), EntityId(5), EntityId(7)]);
    }
}
