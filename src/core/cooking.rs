/// Cooking jobs: a keyed countdown store advanced once per world tick.
use rustc_hash::FxHashMap;
use std::num::NonZeroU32;

use crate::schema::entity::EntityId;
use crate::schema::event::Notification;

/// Result of [`CookingJobRegistry::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyInProgress { remaining_ticks: u32 },
}

/// Active cooking jobs keyed by entity. A job exists iff it has ticks left.
#[derive(Debug, Clone)]
pub struct CookingJobRegistry {
    jobs: FxHashMap<EntityId, NonZeroU32>,
    ticks_per_second: NonZeroU32,
}

impl CookingJobRegistry {
    pub fn new(ticks_per_second: NonZeroU32) -> Self {
        Self {
            jobs: FxHashMap::default(),
            ticks_per_second,
        }
    }

    /// Start a job unless one is already running for `entity`.
    pub fn start(&mut self, entity: EntityId, duration: NonZeroU32) -> StartOutcome {
        if let Some(remaining) = self.jobs.get(&entity) {
            tracing::debug!(entity = entity.0, remaining = remaining.get(), "cooking already in progress");
            return StartOutcome::AlreadyInProgress {
                remaining_ticks: remaining.get(),
            };
        }
        self.jobs.insert(entity, duration);
        tracing::info!(entity = entity.0, ticks = duration.get(), "cooking started");
        StartOutcome::Started
    }

    /// Advance every job by one tick and complete the ones that hit zero.
    ///
    /// Completions are returned in entity order so replays are deterministic.
    pub fn tick(&mut self) -> Vec<Notification> {
        let mut finished = Vec::new();
        self.jobs.retain(|entity, remaining| match NonZeroU32::new(remaining.get() - 1) {
            Some(next) => {
                *remaining = next;
                true
            }
            None => {
                finished.push(*entity);
                false
            }
        });
        finished.sort();
        for entity in &finished {
            tracing::info!(entity = entity.0, "cooking completed");
        }
        finished.into_iter().map(Notification::CookingCompleted).collect()
    }

    pub fn is_active(&self, entity: EntityId) -> bool {
        self.jobs.contains_key(&entity)
    }

    pub fn remaining_ticks(&self, entity: EntityId) -> u32 {
        self.jobs.get(&entity).map_or(0, |ticks| ticks.get())
    }

    /// Whole seconds left, truncated; 0 when no job is running.
    pub fn remaining_seconds(&self, entity: EntityId) -> u32 {
        self.remaining_ticks(entity) / self.ticks_per_second.get()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Active jobs as `(entity, remaining_ticks)`, sorted by entity.
    pub fn jobs(&self) -> Vec<(EntityId, u32)> {
        let mut jobs: Vec<_> = self.jobs.iter().map(|(id, ticks)| (*id, ticks.get())).collect();
        jobs.sort();
        jobs
    }

    /// Reinstate a job from a save. Zero-length jobs are dropped; an existing
    /// entry for the same entity wins.
    pub fn restore(&mut self, entity: EntityId, remaining_ticks: u32) -> bool {
        match NonZeroU32::new(remaining_ticks) {
            Some(ticks) if !self.jobs.contains_key(&entity) => {
                self.jobs.insert(entity, ticks);
                true
            }
            _ => false,
        }
    }

    /// Drop every job. The only bulk cancellation.
    pub fn clear(&mut self) {
        self.jobs.clear();
    }
}
