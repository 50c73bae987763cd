/// The bond state machine: stranger → befriended → partner, plus cooking.
///
/// Every entry point is total over (state, event). An event that does not
/// apply to the entity's current state is logged at debug level and
/// ignored, so duplicated or out-of-order host events cannot corrupt state.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::core::codec::SyncPayload;
use crate::core::config::{BondConfig, ConfigError, ValidatedConfig};
use crate::core::cooking::{CookingJobRegistry, StartOutcome};
use crate::core::host::{CapabilityProbe, InventoryCollaborator};
use crate::core::matcher::RequiredSequence;
use crate::schema::entity::{EntityId, SignalCode};
use crate::schema::event::{
    Choice, ChoiceOutcome, CookingRejection, CookingRequest, Notification, ProposalOutcome,
    SignalOutcome,
};
use crate::schema::relationship::{BondState, Disposition, RelationshipRecord, MAX_AFFECTION};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Owns every relationship record and the cooking registry for one world.
pub struct RelationshipEngine {
    config: ValidatedConfig,
    records: FxHashMap<EntityId, RelationshipRecord>,
    jobs: CookingJobRegistry,
    notifications: Vec<Notification>,
    dirty: FxHashSet<EntityId>,
    rng: StdRng,
}

/// Builder for constructing a `RelationshipEngine`.
pub struct RelationshipEngineBuilder {
    config: BondConfig,
    required_sequence: Option<RequiredSequence>,
    seed: u64,
}

impl RelationshipEngine {
    pub fn builder() -> RelationshipEngineBuilder {
        RelationshipEngineBuilder {
            config: BondConfig::default(),
            required_sequence: None,
            seed: 0,
        }
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Feed one player signal to a stranger. Creates the record lazily.
    pub fn on_signal(&mut self, entity: EntityId, code: SignalCode) -> SignalOutcome {
        let capacity = self.config.required_sequence.len();
        let record = self.records.entry(entity).or_default();
        if record.state != BondState::Stranger {
            tracing::debug!(entity = entity.0, state = ?record.state, "signal ignored");
            return SignalOutcome::Ignored;
        }

        record.push_signal(code, capacity);
        if !self.config.required_sequence.matches(&record.recent_signals) {
            if self.rng.gen_bool(self.config.hint_chance) {
                self.notifications.push(Notification::SignalNoticed(entity));
            }
            return SignalOutcome::Progressed;
        }

        record.state = BondState::Befriended;
        record.affection = 0;
        record.recent_signals.clear();
        self.dirty.insert(entity);
        self.notifications.push(Notification::Befriended(entity));
        tracing::info!(entity = entity.0, "befriended");
        SignalOutcome::Befriended
    }

    /// The entity was hurt. A stranger loses any partial signal progress;
    /// bonded entities cannot be damaged and ignore it.
    pub fn on_attacked(&mut self, entity: EntityId) -> bool {
        let record = self.records.entry(entity).or_default();
        if record.state != BondState::Stranger {
            tracing::debug!(entity = entity.0, state = ?record.state, "attack ignored");
            return false;
        }
        record.recent_signals.clear();
        self.notifications.push(Notification::Provoked(entity));
        tracing::debug!(entity = entity.0, "provoked, signal progress cleared");
        true
    }

    /// Chat with a befriended entity. Returns the new affection.
    pub fn on_friendly_interaction(&mut self, entity: EntityId) -> Option<u8> {
        let gain = self.config.friendly_affection_gain;
        self.raise_affection(entity, BondState::Befriended, gain)
    }

    /// Chat with a partner. Returns the new affection.
    pub fn on_romance_interaction(&mut self, entity: EntityId) -> Option<u8> {
        let gain = self.config.romance_affection_gain;
        self.raise_affection(entity, BondState::Partner, gain)
    }

    fn raise_affection(&mut self, entity: EntityId, required: BondState, gain: u8) -> Option<u8> {
        let Some(record) = self.records.get_mut(&entity).filter(|r| r.state == required) else {
            tracing::debug!(entity = entity.0, expected = ?required, "interaction ignored");
            return None;
        };
        let before = record.affection;
        record.add_affection(gain);
        if record.affection != before {
            self.dirty.insert(entity);
        }
        Some(record.affection)
    }

    /// Propose to a befriended entity, with the item check already resolved
    /// by the host.
    pub fn on_proposal(&mut self, entity: EntityId, item_consumed: bool) -> ProposalOutcome {
        let threshold = self.config.proposal_threshold;
        let Some(record) = self.records.get_mut(&entity) else {
            tracing::debug!(entity = entity.0, "proposal to unknown entity ignored");
            return ProposalOutcome::Ignored(BondState::Stranger);
        };
        if record.state != BondState::Befriended {
            tracing::debug!(entity = entity.0, state = ?record.state, "proposal ignored");
            return ProposalOutcome::Ignored(record.state);
        }
        if record.affection < threshold {
            return ProposalOutcome::NotReady {
                affection: record.affection,
                required: threshold,
            };
        }
        if !item_consumed {
            return ProposalOutcome::MissingItem;
        }

        record.state = BondState::Partner;
        self.dirty.insert(entity);
        self.notifications.push(Notification::BecamePartner(entity));
        tracing::info!(entity = entity.0, "became partner");
        ProposalOutcome::Accepted
    }

    /// Propose, asking the inventory for the item only once affection is
    /// high enough. An early proposal never costs the player the item.
    pub fn propose<I>(&mut self, entity: EntityId, inventory: &mut I) -> ProposalOutcome
    where
        I: InventoryCollaborator + ?Sized,
    {
        if self.state(entity) == BondState::Befriended
            && self.affection(entity) >= self.config.proposal_threshold
        {
            let consumed = inventory.consume_required_item(entity);
            self.on_proposal(entity, consumed)
        } else {
            self.on_proposal(entity, false)
        }
    }

    /// Ask a partner to cook. Rejections carry a reason for the host to show.
    pub fn request_cooking(&mut self, entity: EntityId) -> CookingRequest {
        let Some(record) = self.records.get(&entity).filter(|r| r.state == BondState::Partner) else {
            tracing::debug!(entity = entity.0, "cooking request from non-partner ignored");
            return CookingRequest::Rejected(CookingRejection::NotPartner);
        };
        if !record.can_produce {
            return CookingRequest::Rejected(CookingRejection::CapabilityMissing);
        }
        match self.jobs.start(entity, self.config.cook_duration) {
            StartOutcome::Started => CookingRequest::Started {
                ticks: self.config.cook_duration.get(),
            },
            StartOutcome::AlreadyInProgress { .. } => {
                CookingRequest::Rejected(CookingRejection::AlreadyInProgress)
            }
        }
    }

    /// Overwrite the capability flag. Returns `true` on a false→true edge,
    /// which is also the only time a notification is emitted.
    pub fn recompute_can_produce(&mut self, entity: EntityId, can_produce: bool) -> bool {
        let record = self.records.entry(entity).or_default();
        let gained = can_produce && !record.can_produce;
        if record.can_produce != can_produce {
            record.can_produce = can_produce;
            self.dirty.insert(entity);
        }
        if gained {
            self.notifications
                .push(Notification::GainedProductionCapability(entity));
            tracing::info!(entity = entity.0, "gained production capability");
        }
        gained
    }

    /// Route a chat button press to the transition for the current state.
    pub fn on_choice(&mut self, entity: EntityId, choice: Choice, item_consumed: bool) -> ChoiceOutcome {
        match (self.state(entity), choice) {
            (BondState::Stranger, _) => {
                tracing::debug!(entity = entity.0, ?choice, "choice ignored for stranger");
                ChoiceOutcome::Ignored
            }
            (BondState::Befriended, Choice::Talk) => self
                .on_friendly_interaction(entity)
                .map_or(ChoiceOutcome::Ignored, ChoiceOutcome::AffectionRaised),
            (BondState::Befriended, Choice::Special) => {
                ChoiceOutcome::Proposal(self.on_proposal(entity, item_consumed))
            }
            (BondState::Partner, Choice::Talk) => self
                .on_romance_interaction(entity)
                .map_or(ChoiceOutcome::Ignored, ChoiceOutcome::AffectionRaised),
            (BondState::Partner, Choice::Special) => {
                ChoiceOutcome::Cooking(self.request_cooking(entity))
            }
        }
    }

    // ------------------------------------------------------------------
    // Ticking
    // ------------------------------------------------------------------

    /// Per-entity host tick: re-probes capability for partners on interval
    /// ticks and returns the cosmetic state for the host's AI layer.
    pub fn advance<P>(&mut self, entity: EntityId, probe: &P, tick: u64) -> Disposition
    where
        P: CapabilityProbe + ?Sized,
    {
        let state = self.state(entity);
        let interval = u64::from(self.config.capability_check_interval.get());
        if state == BondState::Partner && tick % interval == 0 {
            let found = probe.nearby_production_station_exists(entity);
            tracing::debug!(entity = entity.0, found, "production station probe");
            self.recompute_can_produce(entity, found);
        }
        state.into()
    }

    /// World tick: advances every cooking job by one step.
    pub fn tick(&mut self) -> usize {
        let completed = self.jobs.tick();
        let count = completed.len();
        self.notifications.extend(completed);
        count
    }

    /// Drain notifications in emission order.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Sync payloads for every entity whose replicated fields changed since
    /// the last call, sorted by entity.
    pub fn pending_sync(&mut self) -> Vec<SyncPayload> {
        let mut dirty: Vec<EntityId> = self.dirty.drain().collect();
        dirty.sort();
        dirty.into_iter().map(|id| self.sync_payload(id)).collect()
    }

    /// World unload: forget every record, job and pending notification.
    pub fn reset(&mut self) {
        self.records.clear();
        self.jobs.clear();
        self.notifications.clear();
        self.dirty.clear();
        tracing::info!("relationship state reset");
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn state(&self, entity: EntityId) -> BondState {
        self.records.get(&entity).map_or(BondState::Stranger, |r| r.state)
    }

    /// Affection, or 0 while the entity is still a stranger.
    pub fn affection(&self, entity: EntityId) -> u8 {
        self.records
            .get(&entity)
            .filter(|r| r.state.is_bonded())
            .map_or(0, |r| r.affection)
    }

    pub fn can_produce(&self, entity: EntityId) -> bool {
        self.records.get(&entity).is_some_and(|r| r.can_produce)
    }

    pub fn disposition(&self, entity: EntityId) -> Disposition {
        self.state(entity).into()
    }

    pub fn is_cooking(&self, entity: EntityId) -> bool {
        self.jobs.is_active(entity)
    }

    pub fn remaining_cook_seconds(&self, entity: EntityId) -> u32 {
        self.jobs.remaining_seconds(entity)
    }

    pub fn record(&self, entity: EntityId) -> Option<&RelationshipRecord> {
        self.records.get(&entity)
    }

    /// Tracked entities, sorted.
    pub fn entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.records.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Read-only view of the cooking registry.
    pub fn jobs(&self) -> &CookingJobRegistry {
        &self.jobs
    }

    // ------------------------------------------------------------------
    // Replication and restore
    // ------------------------------------------------------------------

    pub fn sync_payload(&self, entity: EntityId) -> SyncPayload {
        SyncPayload {
            entity,
            state: self.state(entity),
            affection: self.affection(entity),
            can_produce: self.can_produce(entity),
        }
    }

    /// Mirror an authoritative record on a replica. Emits nothing.
    pub fn apply_sync(&mut self, payload: &SyncPayload) {
        let record = self.records.entry(payload.entity).or_default();
        record.state = payload.state;
        record.affection = payload.affection.min(MAX_AFFECTION);
        record.can_produce = payload.can_produce;
        if record.state.is_bonded() {
            record.recent_signals.clear();
        }
    }

    /// Reinstate a saved record. `can_produce` starts false until the next
    /// probe.
    pub(crate) fn restore_record(&mut self, entity: EntityId, state: BondState, affection: u8) {
        self.records.insert(
            entity,
            RelationshipRecord {
                state,
                affection: if state.is_bonded() {
                    affection.min(MAX_AFFECTION)
                } else {
                    0
                },
                ..Default::default()
            },
        );
    }

    pub(crate) fn restore_job(&mut self, entity: EntityId, remaining_ticks: u32) -> bool {
        self.jobs.restore(entity, remaining_ticks)
    }
}

impl RelationshipEngineBuilder {
    pub fn config(mut self, config: BondConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the configured required sequence.
    pub fn required_sequence(mut self, sequence: RequiredSequence) -> Self {
        self.required_sequence = Some(sequence);
        self
    }

    /// Seed for the hint roll.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Result<RelationshipEngine, EngineError> {
        let mut config = self.config.validate()?;
        if let Some(sequence) = self.required_sequence {
            config.required_sequence = sequence;
        }
        Ok(RelationshipEngine {
            jobs: CookingJobRegistry::new(config.ticks_per_second),
            config,
            records: FxHashMap::default(),
            notifications: Vec::new(),
            dirty: FxHashSet::default(),
            rng: StdRng::seed_from_u64(self.seed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> BondConfig {
        BondConfig {
            hint_chance: 0.0,
            ..Default::default()
        }
    }

    fn build_engine() -> RelationshipEngine {
        RelationshipEngine::builder()
            .config(quiet_config())
            .build()
            .unwrap()
    }

    fn befriend(engine: &mut RelationshipEngine, id: EntityId) {
        for code in [
            SignalCode::HEART,
            SignalCode::HAPPY,
            SignalCode::WAVE,
            SignalCode::QUESTION,
        ] {
            engine.on_signal(id, code);
        }
        assert_eq!(engine.state(id), BondState::Befriended);
    }

    fn make_partner(engine: &mut RelationshipEngine, id: EntityId) {
        befriend(engine, id);
        while engine.affection(id) < 80 {
            engine.on_friendly_interaction(id);
        }
        assert_eq!(engine.on_proposal(id, true), ProposalOutcome::Accepted);
    }

    #[test]
    fn befriends_on_fourth_signal_only() {
        let mut engine = build_engine();
        let id = EntityId(1);
        let signals = [
            SignalCode::HEART,
            SignalCode::HAPPY,
            SignalCode::WAVE,
            SignalCode::QUESTION,
        ];
        for code in &signals[..3] {
            assert_eq!(engine.on_signal(id, *code), SignalOutcome::Progressed);
            assert_eq!(engine.state(id), BondState::Stranger);
        }
        assert_eq!(engine.on_signal(id, signals[3]), SignalOutcome::Befriended);
        assert_eq!(engine.take_notifications(), vec![Notification::Befriended(id)]);
        assert!(engine.record(id).unwrap().recent_signals.is_empty());
    }

    #[test]
    fn signals_after_befriending_are_ignored() {
        let mut engine = build_engine();
        befriend(&mut engine, EntityId(1));
        engine.take_notifications();
        assert_eq!(engine.on_signal(EntityId(1), SignalCode::HEART), SignalOutcome::Ignored);
        assert!(engine.take_notifications().is_empty());
    }

    #[test]
    fn attack_clears_partial_progress() {
        let mut engine = build_engine();
        let id = EntityId(3);
        engine.on_signal(id, SignalCode::HEART);
        engine.on_signal(id, SignalCode::HAPPY);
        engine.on_signal(id, SignalCode::WAVE);
        assert!(engine.on_attacked(id));
        assert_eq!(engine.on_signal(id, SignalCode::QUESTION), SignalOutcome::Progressed);
        assert_eq!(engine.state(id), BondState::Stranger);
        assert_eq!(engine.take_notifications(), vec![Notification::Provoked(id)]);
    }

    #[test]
    fn attack_on_partner_is_ignored() {
        let mut engine = build_engine();
        let id = EntityId(3);
        make_partner(&mut engine, id);
        assert!(!engine.on_attacked(id));
        assert_eq!(engine.state(id), BondState::Partner);
    }

    #[test]
    fn friendly_interaction_requires_befriended() {
        let mut engine = build_engine();
        assert_eq!(engine.on_friendly_interaction(EntityId(1)), None);
        befriend(&mut engine, EntityId(1));
        assert_eq!(engine.on_friendly_interaction(EntityId(1)), Some(1));
    }

    #[test]
    fn affection_clamps_at_max() {
        let mut engine = build_engine();
        let id = EntityId(1);
        make_partner(&mut engine, id);
        for _ in 0..50 {
            engine.on_romance_interaction(id);
        }
        assert_eq!(engine.affection(id), MAX_AFFECTION);
    }

    #[test]
    fn proposal_threshold_is_inclusive() {
        let mut engine = build_engine();
        let id = EntityId(1);
        befriend(&mut engine, id);
        for _ in 0..79 {
            engine.on_friendly_interaction(id);
        }
        assert_eq!(
            engine.on_proposal(id, true),
            ProposalOutcome::NotReady {
                affection: 79,
                required: 80
            }
        );
        engine.on_friendly_interaction(id);
        assert_eq!(engine.on_proposal(id, false), ProposalOutcome::MissingItem);
        assert_eq!(engine.on_proposal(id, true), ProposalOutcome::Accepted);
        assert_eq!(
            engine.on_proposal(id, true),
            ProposalOutcome::Ignored(BondState::Partner)
        );
    }

    #[test]
    fn early_proposal_keeps_the_item() {
        let mut engine = build_engine();
        let id = EntityId(1);
        befriend(&mut engine, id);
        let mut asked = 0;
        let mut inventory = |_: EntityId| {
            asked += 1;
            true
        };
        assert!(matches!(
            engine.propose(id, &mut inventory),
            ProposalOutcome::NotReady { .. }
        ));
        assert_eq!(asked, 0);
    }

    #[test]
    fn cooking_rejections_are_distinct() {
        let mut engine = build_engine();
        let id = EntityId(1);
        assert_eq!(
            engine.request_cooking(id),
            CookingRequest::Rejected(CookingRejection::NotPartner)
        );
        make_partner(&mut engine, id);
        assert_eq!(
            engine.request_cooking(id),
            CookingRequest::Rejected(CookingRejection::CapabilityMissing)
        );
        engine.recompute_can_produce(id, true);
        assert_eq!(engine.request_cooking(id), CookingRequest::Started { ticks: 18_000 });
        assert_eq!(
            engine.request_cooking(id),
            CookingRequest::Rejected(CookingRejection::AlreadyInProgress)
        );
        assert!(engine.is_cooking(id));
        assert_eq!(engine.remaining_cook_seconds(id), 300);
    }

    #[test]
    fn capability_edge_notifies_once() {
        let mut engine = build_engine();
        let id = EntityId(1);
        assert!(engine.recompute_can_produce(id, true));
        assert!(!engine.recompute_can_produce(id, true));
        assert!(!engine.recompute_can_produce(id, false));
        assert!(engine.recompute_can_produce(id, true));
        let gained = engine
            .take_notifications()
            .into_iter()
            .filter(|n| matches!(n, Notification::GainedProductionCapability(_)))
            .count();
        assert_eq!(gained, 2);
    }

    #[test]
    fn advance_probes_partners_on_interval() {
        let mut engine = build_engine();
        let id = EntityId(1);
        make_partner(&mut engine, id);
        let probe = |_: EntityId| true;

        assert_eq!(engine.advance(id, &probe, 599), Disposition::Resident);
        assert!(!engine.can_produce(id));
        engine.advance(id, &probe, 600);
        assert!(engine.can_produce(id));
    }

    #[test]
    fn advance_never_probes_strangers() {
        let mut engine = build_engine();
        let probe = |_: EntityId| true;
        assert_eq!(engine.advance(EntityId(5), &probe, 0), Disposition::Wild);
        assert!(!engine.can_produce(EntityId(5)));
    }

    #[test]
    fn choices_route_by_state() {
        let mut engine = build_engine();
        let id = EntityId(1);
        assert_eq!(engine.on_choice(id, Choice::Talk, false), ChoiceOutcome::Ignored);
        befriend(&mut engine, id);
        assert_eq!(
            engine.on_choice(id, Choice::Talk, false),
            ChoiceOutcome::AffectionRaised(1)
        );
        assert!(matches!(
            engine.on_choice(id, Choice::Special, true),
            ChoiceOutcome::Proposal(ProposalOutcome::NotReady { .. })
        ));
    }

    #[test]
    fn tick_reports_cooking_completion() {
        let config = BondConfig {
            cook_duration_ticks: 2,
            hint_chance: 0.0,
            ..Default::default()
        };
        let mut engine = RelationshipEngine::builder().config(config).build().unwrap();
        let id = EntityId(4);
        make_partner(&mut engine, id);
        engine.recompute_can_produce(id, true);
        engine.request_cooking(id);
        engine.take_notifications();

        assert_eq!(engine.tick(), 0);
        assert_eq!(engine.tick(), 1);
        assert_eq!(engine.take_notifications(), vec![Notification::CookingCompleted(id)]);
        assert!(!engine.is_cooking(id));
    }

    #[test]
    fn hint_chance_one_always_notices() {
        let config = BondConfig {
            hint_chance: 1.0,
            ..Default::default()
        };
        let mut engine = RelationshipEngine::builder().config(config).seed(7).build().unwrap();
        engine.on_signal(EntityId(1), SignalCode(42));
        assert_eq!(
            engine.take_notifications(),
            vec![Notification::SignalNoticed(EntityId(1))]
        );
    }

    #[test]
    fn pending_sync_reports_changes_once() {
        let mut engine = build_engine();
        befriend(&mut engine, EntityId(2));
        let payloads = engine.pending_sync();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].state, BondState::Befriended);
        assert!(engine.pending_sync().is_empty());
    }

    #[test]
    fn reset_forgets_everything() {
        let mut engine = build_engine();
        let id = EntityId(1);
        make_partner(&mut engine, id);
        engine.recompute_can_produce(id, true);
        engine.request_cooking(id);
        engine.reset();
        assert_eq!(engine.state(id), BondState::Stranger);
        assert!(!engine.is_cooking(id));
        assert!(engine.take_notifications().is_empty());
        assert!(engine.entities().is_empty());
    }

    #[test]
    fn custom_sequence_overrides_config() {
        let sequence = RequiredSequence::new(vec![SignalCode::WAVE]).unwrap();
        let mut engine = RelationshipEngine::builder()
            .config(quiet_config())
            .required_sequence(sequence)
            .build()
            .unwrap();
        assert_eq!(engine.on_signal(EntityId(1), SignalCode::WAVE), SignalOutcome::Befriended);
    }

    #[test]
    fn invalid_config_fails_build() {
        let config = BondConfig {
            required_sequence: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            RelationshipEngine::builder().config(config).build(),
            Err(EngineError::Config(_))
        ));
    }
}
