/// Save and wire formats.
///
/// Saves are RON and load leniently: a missing or mistyped field falls back
/// to its default and a garbled entry is skipped, so one corrupt record
/// never blocks the rest of the world. The sync payload is a fixed-order
/// JSON tuple and decodes strictly.
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::engine::RelationshipEngine;
use crate::schema::entity::EntityId;
use crate::schema::relationship::{BondState, MAX_AFFECTION};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("RON serialization error: {0}")]
    Ron(#[from] ron::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown bond state code: {0}")]
    UnknownState(u8),
    #[error("affection {0} exceeds the cap")]
    AffectionOutOfRange(u8),
}

/// Per-entity save unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SavedRelationship {
    pub entity_id: u32,
    pub state: u8,
    pub affection: u8,
}

/// One active cooking job in the per-world save unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SavedJob {
    pub entity_id: u32,
    pub remaining_ticks: u32,
}

/// Everything in one document, for hosts that save a single blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorldSnapshot {
    pub relationships: Vec<SavedRelationship>,
    pub cooking_jobs: Vec<SavedJob>,
}

/// Replicated state for one entity, sent when it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SyncTuple", try_from = "SyncTuple")]
pub struct SyncPayload {
    pub entity: EntityId,
    pub state: BondState,
    pub affection: u8,
    pub can_produce: bool,
}

type SyncTuple = (u32, u8, u8, bool);

impl From<SyncPayload> for SyncTuple {
    fn from(p: SyncPayload) -> Self {
        (p.entity.0, p.state.code(), p.affection, p.can_produce)
    }
}

impl TryFrom<SyncTuple> for SyncPayload {
    type Error = CodecError;

    fn try_from((entity, state, affection, can_produce): SyncTuple) -> Result<Self, Self::Error> {
        let state = BondState::from_code(i64::from(state)).ok_or(CodecError::UnknownState(state))?;
        if affection > MAX_AFFECTION {
            return Err(CodecError::AffectionOutOfRange(affection));
        }
        Ok(Self {
            entity: EntityId(entity),
            state,
            affection,
            can_produce,
        })
    }
}

/// Counts from a restore, so the host can surface save damage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub records: usize,
    pub jobs: usize,
    /// Fields that were missing or invalid and fell back to a default.
    pub defaulted_fields: usize,
    /// Entries that could not be keyed to an entity and were dropped.
    pub skipped_entries: usize,
}

// ----------------------------------------------------------------------
// Lenient read side
// ----------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum Lenient {
    Int(i64),
    Other(IgnoredAny),
    #[default]
    #[serde(skip_deserializing)]
    Missing,
}

impl Lenient {
    fn int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Entry<T> {
    Valid(T),
    Garbage(IgnoredAny),
}

// Loaders share the writers' names so struct-named RON saves are accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename = "SavedRelationship")]
struct LoadedRelationship {
    entity_id: Lenient,
    state: Lenient,
    affection: Lenient,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename = "SavedJob")]
struct LoadedJob {
    entity_id: Lenient,
    remaining_ticks: Lenient,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename = "WorldSnapshot")]
struct LoadedWorld {
    relationships: Vec<Entry<LoadedRelationship>>,
    cooking_jobs: Vec<Entry<LoadedJob>>,
}

fn entity_of(field: &Lenient) -> Option<EntityId> {
    field
        .int()
        .and_then(|n| u32::try_from(n).ok())
        .map(EntityId)
}

impl LoadedRelationship {
    /// Sanitized `(state, affection)` plus the number of defaulted fields.
    fn sanitize(&self) -> (BondState, u8, usize) {
        let mut defaulted = 0;
        let state = match self.state.int().and_then(BondState::from_code) {
            Some(state) => state,
            None => {
                defaulted += 1;
                BondState::Stranger
            }
        };
        let affection = match self.affection.int() {
            Some(n) if (0..=i64::from(MAX_AFFECTION)).contains(&n) => n as u8,
            Some(n) => {
                defaulted += 1;
                n.clamp(0, i64::from(MAX_AFFECTION)) as u8
            }
            None => {
                defaulted += 1;
                0
            }
        };
        (state, affection, defaulted)
    }
}

impl LoadedJob {
    fn sanitize(&self) -> Option<(EntityId, u32)> {
        let entity = entity_of(&self.entity_id)?;
        let ticks = self.remaining_ticks.int().and_then(|n| u32::try_from(n).ok())?;
        (ticks > 0).then_some((entity, ticks))
    }
}

// ----------------------------------------------------------------------
// Codec
// ----------------------------------------------------------------------

/// Converts engine state to and from the host's save and wire formats.
pub struct PersistenceCodec;

impl PersistenceCodec {
    pub fn saved_record(engine: &RelationshipEngine, entity: EntityId) -> SavedRelationship {
        SavedRelationship {
            entity_id: entity.0,
            state: engine.state(entity).code(),
            affection: engine.affection(entity),
        }
    }

    /// Encode the per-entity save unit.
    pub fn encode_record(engine: &RelationshipEngine, entity: EntityId) -> Result<String, CodecError> {
        Ok(ron::to_string(&Self::saved_record(engine, entity))?)
    }

    /// Load a per-entity save unit for `entity`. Never fails: an unreadable
    /// unit restores the entity as a stranger.
    pub fn load_record(engine: &mut RelationshipEngine, entity: EntityId, contents: &str) -> RestoreReport {
        let mut report = RestoreReport::default();
        let loaded = match ron::from_str::<LoadedRelationship>(contents) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(entity = entity.0, error = %e, "unreadable relationship save, using defaults");
                LoadedRelationship::default()
            }
        };
        if let Some(saved_id) = entity_of(&loaded.entity_id).filter(|id| *id != entity) {
            tracing::warn!(entity = entity.0, saved = saved_id.0, "saved entity id differs from host key");
        }
        let (state, affection, defaulted) = loaded.sanitize();
        if defaulted > 0 {
            tracing::warn!(entity = entity.0, defaulted, "relationship save had invalid fields");
        }
        engine.restore_record(entity, state, affection);
        report.records = 1;
        report.defaulted_fields = defaulted;
        report
    }

    pub fn saved_jobs(engine: &RelationshipEngine) -> Vec<SavedJob> {
        engine
            .jobs()
            .jobs()
            .into_iter()
            .map(|(entity, remaining_ticks)| SavedJob {
                entity_id: entity.0,
                remaining_ticks,
            })
            .collect()
    }

    /// Encode the per-world list of active cooking jobs.
    pub fn encode_jobs(engine: &RelationshipEngine) -> Result<String, CodecError> {
        Ok(ron::to_string(&Self::saved_jobs(engine))?)
    }

    /// Load the per-world job list. Invalid entries are dropped.
    pub fn load_jobs(engine: &mut RelationshipEngine, contents: &str) -> RestoreReport {
        let entries = match ron::from_str::<Vec<Entry<LoadedJob>>>(contents) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable cooking job save, no jobs restored");
                Vec::new()
            }
        };
        let mut report = RestoreReport::default();
        restore_jobs(engine, entries, &mut report);
        report
    }

    pub fn snapshot(engine: &RelationshipEngine) -> WorldSnapshot {
        WorldSnapshot {
            relationships: engine
                .entities()
                .into_iter()
                .map(|id| Self::saved_record(engine, id))
                .collect(),
            cooking_jobs: Self::saved_jobs(engine),
        }
    }

    /// Encode every record and job as one pretty-printed document.
    pub fn encode_world(engine: &RelationshipEngine) -> Result<String, CodecError> {
        let pretty = ron::ser::PrettyConfig::default();
        Ok(ron::ser::to_string_pretty(&Self::snapshot(engine), pretty)?)
    }

    /// Load a whole-world document. Each record is sanitized on its own.
    pub fn load_world(engine: &mut RelationshipEngine, contents: &str) -> RestoreReport {
        let world = match ron::from_str::<LoadedWorld>(contents) {
            Ok(world) => world,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable world save, starting fresh");
                LoadedWorld::default()
            }
        };
        let mut report = RestoreReport::default();
        for entry in world.relationships {
            let Entry::Valid(loaded) = entry else {
                report.skipped_entries += 1;
                continue;
            };
            let Some(entity) = entity_of(&loaded.entity_id) else {
                tracing::warn!("relationship entry without a usable entity id skipped");
                report.skipped_entries += 1;
                continue;
            };
            let (state, affection, defaulted) = loaded.sanitize();
            if defaulted > 0 {
                tracing::warn!(entity = entity.0, defaulted, "relationship save had invalid fields");
            }
            engine.restore_record(entity, state, affection);
            report.records += 1;
            report.defaulted_fields += defaulted;
        }
        restore_jobs(engine, world.cooking_jobs, &mut report);
        report
    }

    /// Encode a sync payload as a JSON tuple, e.g. `[7,2,85,true]`.
    pub fn encode_sync(payload: &SyncPayload) -> Result<String, CodecError> {
        Ok(serde_json::to_string(payload)?)
    }

    pub fn decode_sync(contents: &str) -> Result<SyncPayload, CodecError> {
        Ok(serde_json::from_str(contents)?)
    }
}

fn restore_jobs(engine: &mut RelationshipEngine, entries: Vec<Entry<LoadedJob>>, report: &mut RestoreReport) {
    for entry in entries {
        match entry {
            Entry::Valid(job) => match job.sanitize() {
                Some((entity, ticks)) if engine.restore_job(entity, ticks) => report.jobs += 1,
                _ => {
                    tracing::warn!(?job, "cooking job entry dropped");
                    report.skipped_entries += 1;
                }
            },
            Entry::Garbage(_) => report.skipped_entries += 1,
        }
    }
}
