/// Tick driver: turns the host's game loop into engine calls.
use crate::core::engine::RelationshipEngine;
use crate::core::host::CapabilityProbe;
use crate::schema::event::Notification;
use crate::schema::relationship::BondState;

/// Counts world ticks and drives the periodic work of one engine.
///
/// The driver must be the only caller of [`RelationshipEngine::tick`] so
/// that every job is advanced exactly once per simulated step.
#[derive(Debug, Clone, Default)]
pub struct TickDriver {
    tick: u64,
}

impl TickDriver {
    pub fn new() -> Self {
        Self { tick: 0 }
    }

    /// Resume counting from a host-supplied tick, e.g. after a reload.
    pub fn starting_at(tick: u64) -> Self {
        Self { tick }
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Advance the counter by one step.
    pub fn every_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Whether the current tick falls on an `n`-tick boundary. `n == 0`
    /// never fires.
    pub fn every_n_ticks(&self, n: u64) -> bool {
        n != 0 && self.tick % n == 0
    }

    /// Run one simulation step: per-entity advance for partners (capability
    /// probe on interval ticks), then the world tick for cooking jobs.
    /// Returns the notifications produced during the step.
    pub fn step<P>(&mut self, engine: &mut RelationshipEngine, probe: &P) -> Vec<Notification>
    where
        P: CapabilityProbe + ?Sized,
    {
        let interval = u64::from(engine.config().capability_check_interval.get());
        if self.every_n_ticks(interval) {
            for entity in engine.entities() {
                if engine.state(entity) == BondState::Partner {
                    engine.advance(entity, probe, self.tick);
                }
            }
        }
        engine.tick();
        self.every_tick();
        engine.take_notifications()
    }

    /// Run `steps` simulation steps, collecting every notification.
    pub fn run<P>(&mut self, engine: &mut RelationshipEngine, probe: &P, steps: u64) -> Vec<Notification>
    where
        P: CapabilityProbe + ?Sized,
    {
        let mut out = Vec::new();
        for _ in 0..steps {
            out.extend(self.step(engine, probe));
        }
        out
    }
}
