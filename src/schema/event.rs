use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::relationship::BondState;

/// A discrete notification for the presentation layer.
///
/// Each one is emitted exactly once per causing transition; the engine
/// never formats or localizes the message itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Notification {
    Befriended(EntityId),
    BecamePartner(EntityId),
    GainedProductionCapability(EntityId),
    CookingCompleted(EntityId),
    /// Attacked before being befriended; signal progress was lost.
    Provoked(EntityId),
    /// A signal that did not complete the sequence but got a reaction.
    SignalNoticed(EntityId),
}

impl Notification {
    pub fn entity(&self) -> EntityId {
        match *self {
            Self::Befriended(id)
            | Self::BecamePartner(id)
            | Self::GainedProductionCapability(id)
            | Self::CookingCompleted(id)
            | Self::Provoked(id)
            | Self::SignalNoticed(id) => id,
        }
    }
}

/// One of the two chat buttons the host shows for a governed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    /// "Chat": raises affection.
    Talk,
    /// "Partner" while befriended, "Cook" once a partner.
    Special,
}

impl Choice {
    pub fn from_index(index: usize) -> Option<Choice> {
        match index {
            0 => Some(Self::Talk),
            1 => Some(Self::Special),
            _ => None,
        }
    }
}

/// Result of feeding one signal to a stranger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Befriended,
    Progressed,
    /// The entity is already past the stranger stage.
    Ignored,
}

/// Result of a proposal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalOutcome {
    Accepted,
    /// Affection is below the configured threshold.
    NotReady { affection: u8, required: u8 },
    /// Affection is high enough but the required item was not handed over.
    MissingItem,
    Ignored(BondState),
}

/// Why a cooking request was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CookingRejection {
    NotPartner,
    CapabilityMissing,
    AlreadyInProgress,
}

/// Result of asking a partner to cook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookingRequest {
    Started { ticks: u32 },
    Rejected(CookingRejection),
}

/// Result of a chat-button press, routed per state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceOutcome {
    AffectionRaised(u8),
    Proposal(ProposalOutcome),
    Cooking(CookingRequest),
    Ignored,
}
