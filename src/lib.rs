//! Companion Bond: relationship progression for befriendable game NPCs.
//!
//! Tracks each entity's bond with the player (stranger, befriended,
//! partner), gated by an ordered emote sequence and a consumable item, and
//! runs the timed cooking jobs a partner can perform. The host game drives
//! everything through explicit calls and drains notifications; saves and
//! state sync go through the persistence codec.

pub mod core;
pub mod schema;
