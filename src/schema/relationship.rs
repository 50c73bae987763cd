use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::entity::SignalCode;

/// Upper bound of the affection scale.
pub const MAX_AFFECTION: u8 = 100;

/// Progression of an entity's bond with the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BondState {
    #[default]
    Stranger,
    Befriended,
    Partner,
}

impl BondState {
    /// Integer code used by the save and wire formats.
    pub fn code(&self) -> u8 {
        match self {
            Self::Stranger => 0,
            Self::Befriended => 1,
            Self::Partner => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<BondState> {
        match code {
            0 => Some(Self::Stranger),
            1 => Some(Self::Befriended),
            2 => Some(Self::Partner),
            _ => None,
        }
    }

    /// Whether affection is tracked in this state.
    pub fn is_bonded(&self) -> bool {
        !matches!(self, Self::Stranger)
    }
}

/// Cosmetic state derived from the bond, for the host's AI and sprite layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    /// Default wandering behaviour; may still turn hostile when provoked.
    Wild,
    /// Friendly, stationary, cannot be damaged.
    Companion,
    /// Lives in the player's town like a resident.
    Resident,
}

impl From<BondState> for Disposition {
    fn from(state: BondState) -> Self {
        match state {
            BondState::Stranger => Self::Wild,
            BondState::Befriended => Self::Companion,
            BondState::Partner => Self::Resident,
        }
    }
}

/// Everything the engine knows about one governed entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipRecord {
    pub state: BondState,
    pub affection: u8,
    /// Externally probed; never authoritative in a save.
    pub can_produce: bool,
    pub recent_signals: VecDeque<SignalCode>,
}

impl RelationshipRecord {
    /// Raise affection by `gain`, saturating at [`MAX_AFFECTION`].
    pub fn add_affection(&mut self, gain: u8) {
        self.affection = self.affection.saturating_add(gain).min(MAX_AFFECTION);
    }

    /// Append a signal, evicting the oldest entries beyond `capacity`.
    pub fn push_signal(&mut self, code: SignalCode, capacity: usize) {
        self.recent_signals.push_back(code);
        while self.recent_signals.len() > capacity {
            self.recent_signals.pop_front();
        }
    }

    pub fn disposition(&self) -> Disposition {
        self.state.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes_round_trip() {
        for state in [BondState::Stranger, BondState::Befriended, BondState::Partner] {
            assert_eq!(BondState::from_code(state.code() as i64), Some(state));
        }
        assert_eq!(BondState::from_code(3), None);
        assert_eq!(BondState::from_code(-1), None);
    }

    #[test]
    fn states_are_ordered_by_progression() {
        assert!(BondState::Stranger < BondState::Befriended);
        assert!(BondState::Befriended < BondState::Partner);
    }

    #[test]
    fn affection_saturates_at_max() {
        let mut record = RelationshipRecord {
            affection: 98,
            ..Default::default()
        };
        record.add_affection(5);
        assert_eq!(record.affection, MAX_AFFECTION);
        record.add_affection(u8::MAX);
        assert_eq!(record.affection, MAX_AFFECTION);
    }

    #[test]
    fn signal_buffer_is_fifo_bounded() {
        let mut record = RelationshipRecord::default();
        for code in 1..=6 {
            record.push_signal(SignalCode(code), 4);
        }
        let kept: Vec<u32> = record.recent_signals.iter().map(|s| s.0).collect();
        assert_eq!(kept, vec![3, 4, 5, 6]);
    }

    #[test]
    fn disposition_follows_state() {
        assert_eq!(Disposition::from(BondState::Stranger), Disposition::Wild);
        assert_eq!(Disposition::from(BondState::Befriended), Disposition::Companion);
        assert_eq!(Disposition::from(BondState::Partner), Disposition::Resident);
    }
}
