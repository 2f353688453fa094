//! Projectile reconciliation: predict -> confirm -> resolve/expire
//!
//! This module owns the map from projectile identity to in-flight state and
//! mediates between local prediction and the server's authoritative echo and
//! impact verdicts. The registry makes no assumption about message ordering:
//! a verdict may arrive before the echo it logically follows, after the
//! local copy already expired, or twice. Every such case degrades to a
//! logged no-op or a best-effort visualization, never a fault.
//!
//! Correlating our own echoed shots relies on FIFO order against the queue
//! of not-yet-confirmed local shots: the server has no client-minted token
//! to send back, so the oldest unconfirmed shot is taken as the match. Under
//! heavy packet reordering two same-tick shots could swap identities; the
//! verdicts still land on *a* live shot, so the presentation stays correct.

use crate::effects::{EffectKind, EffectRequest, EffectSink};
use crate::physics::{BodyId, PhysicsWorld};
use glam::Vec3;
use log::{debug, warn};
use shared::{
    BulletData, HitZone, ImpactKind, PlayerId, ServerBulletId, BULLET_MASS, BULLET_SPEED,
    PROJECTILE_LIFETIME, PROJECTILE_MAX_RANGE,
};
use std::collections::{HashMap, VecDeque};

pub type LocalShotId = u64;

/// How many recently retired server ids are remembered for late verdicts.
const RECENT_IDS_CAP: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Predicted,
    Confirmed,
    Resolved,
    Expired,
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub local_id: LocalShotId,
    pub server_id: Option<ServerBulletId>,
    pub source_player: PlayerId,
    pub origin: Vec3,
    pub direction: Vec3,
    pub position: Vec3,
    pub age: f32,
    pub is_pellet: bool,
    pub state: LifecycleState,
    pub body: Option<BodyId>,
}

pub struct ProjectileRegistry {
    local_player: PlayerId,
    live: HashMap<LocalShotId, Projectile>,
    by_server: HashMap<ServerBulletId, LocalShotId>,
    /// Per-source FIFO of predicted shots still waiting for their echo.
    unconfirmed: HashMap<PlayerId, VecDeque<LocalShotId>>,
    /// Own shots that expired with a bound server id; confirms authorship
    /// of a late verdict so hit audio still fires, exactly once.
    recent_own: VecDeque<ServerBulletId>,
    /// Any bound shot that expired; a late verdict for one of these must
    /// not be mistaken for a verdict that overtook its echo.
    recent_expired: VecDeque<ServerBulletId>,
    /// Recently resolved ids; a duplicate verdict becomes a no-op.
    recent_resolved: VecDeque<ServerBulletId>,
    next_local_id: LocalShotId,
}

impl ProjectileRegistry {
    pub fn new(local_player: PlayerId) -> Self {
        Self {
            local_player,
            live: HashMap::new(),
            by_server: HashMap::new(),
            unconfirmed: HashMap::new(),
            recent_own: VecDeque::new(),
            recent_expired: VecDeque::new(),
            recent_resolved: VecDeque::new(),
            next_local_id: 1,
        }
    }

    pub fn local_player(&self) -> PlayerId {
        self.local_player
    }

    /// Registers a locally fired shot before the server has seen it.
    ///
    /// The projectile is immediately live for rendering/audio side effects
    /// and is returned so the caller can transmit the shot intent. Pellets
    /// share their discharge's flash and report, so they only get a tracer.
    pub fn predict_local_shot(
        &mut self,
        physics: &mut PhysicsWorld,
        effects: &mut dyn EffectSink,
        origin: Vec3,
        direction: Vec3,
        is_pellet: bool,
    ) -> Projectile {
        let direction = direction.normalize_or_zero();
        let local_id = self.next_local_id;
        self.next_local_id += 1;

        let body = physics.create_projectile_body(origin, direction, BULLET_SPEED, BULLET_MASS);
        let projectile = Projectile {
            local_id,
            server_id: None,
            source_player: self.local_player,
            origin,
            direction,
            position: origin,
            age: 0.0,
            is_pellet,
            state: LifecycleState::Predicted,
            body: Some(body),
        };

        effects.spawn_effect(EffectRequest {
            kind: EffectKind::Tracer,
            position: origin,
            direction,
        });
        if !is_pellet {
            effects.spawn_effect(EffectRequest {
                kind: EffectKind::MuzzleFlash,
                position: origin,
                direction,
            });
            effects.spawn_effect(EffectRequest {
                kind: EffectKind::FireAudio,
                position: origin,
                direction,
            });
        }

        self.unconfirmed
            .entry(self.local_player)
            .or_default()
            .push_back(local_id);
        self.live.insert(local_id, projectile.clone());
        debug!("Predicted local shot {}", local_id);

        projectile
    }

    /// Binds the authoritative echo of one of our own shots to the matching
    /// predicted projectile instead of spawning a second one.
    ///
    /// Matching is FIFO against the sender's unconfirmed queue, oldest
    /// first; entries whose projectile was already pruned are skipped.
    pub fn bind_server_echo(
        &mut self,
        source_player: PlayerId,
        server_id: ServerBulletId,
        bullet: &BulletData,
    ) {
        if self.by_server.contains_key(&server_id) {
            warn!("Duplicate shot echo for server id {}", server_id);
            return;
        }

        match self.pop_oldest_unconfirmed(source_player) {
            Some(local_id) => {
                if let Some(projectile) = self.live.get_mut(&local_id) {
                    let drift = bullet.origin.distance(projectile.origin);
                    if drift > 1.0 {
                        debug!(
                            "Echo origin drifted {:.2}m from prediction for shot {}",
                            drift, local_id
                        );
                    }
                    projectile.server_id = Some(server_id);
                    projectile.state = LifecycleState::Confirmed;
                    self.by_server.insert(server_id, local_id);
                    debug!("Bound server id {} to local shot {}", server_id, local_id);
                }
            }
            None => {
                warn!(
                    "Shot echo {} from player {} has no unconfirmed local projectile",
                    server_id, source_player
                );
            }
        }
    }

    /// Spawns another player's confirmed shot with the full presentation;
    /// remote shots never had a prediction phase.
    pub fn spawn_remote_shot(
        &mut self,
        physics: &mut PhysicsWorld,
        effects: &mut dyn EffectSink,
        player_id: PlayerId,
        bullet: &BulletData,
        server_id: ServerBulletId,
    ) {
        if self.by_server.contains_key(&server_id) {
            warn!("Duplicate remote shot for server id {}", server_id);
            return;
        }

        let direction = bullet.direction.normalize_or_zero();
        let local_id = self.next_local_id;
        self.next_local_id += 1;

        let body =
            physics.create_projectile_body(bullet.origin, direction, BULLET_SPEED, BULLET_MASS);
        let projectile = Projectile {
            local_id,
            server_id: Some(server_id),
            source_player: player_id,
            origin: bullet.origin,
            direction,
            position: bullet.origin,
            age: 0.0,
            is_pellet: bullet.is_pellet,
            state: LifecycleState::Confirmed,
            body: Some(body),
        };

        effects.spawn_effect(EffectRequest {
            kind: EffectKind::Tracer,
            position: bullet.origin,
            direction,
        });
        if !bullet.is_pellet {
            effects.spawn_effect(EffectRequest {
                kind: EffectKind::MuzzleFlash,
                position: bullet.origin,
                direction,
            });
            effects.spawn_effect(EffectRequest {
                kind: EffectKind::FireAudio,
                position: bullet.origin,
                direction,
            });
        }

        self.live.insert(local_id, projectile);
        self.by_server.insert(server_id, local_id);
        debug!(
            "Spawned remote shot {} (server id {}) from player {}",
            local_id, server_id, player_id
        );
    }

    /// Applies the server's impact verdict.
    ///
    /// The verdict may precede our own echo (bind on demand), follow a local
    /// expiry (best-effort visualization), or repeat (no-op). Exactly one
    /// terminal effect is produced per projectile either way.
    pub fn resolve_impact(
        &mut self,
        physics: &mut PhysicsWorld,
        effects: &mut dyn EffectSink,
        server_id: ServerBulletId,
        kind: ImpactKind,
        target_id: Option<u32>,
        position: Vec3,
        hit_zone: Option<HitZone>,
    ) {
        debug!(
            "Impact verdict: server id {}, {:?} on target {:?}",
            server_id, kind, target_id
        );

        if let Some(local_id) = self.by_server.get(&server_id).copied() {
            self.finish_resolved(physics, effects, local_id, server_id, position, hit_zone);
            return;
        }

        if self.recent_resolved.contains(&server_id) {
            debug!("Duplicate impact verdict for server id {}", server_id);
            return;
        }

        // A verdict for a shot that expired here must not be mistaken for
        // one that overtook its echo, or it would steal the next
        // unconfirmed shot.
        if !self.recent_expired.contains(&server_id) {
            // The verdict can race ahead of our own echo; bind it to the
            // oldest unconfirmed local shot instead of rejecting it.
            if let Some(local_id) = self.pop_oldest_unconfirmed(self.local_player) {
                debug!(
                    "Impact verdict {} arrived before echo; binding on demand",
                    server_id
                );
                if let Some(projectile) = self.live.get_mut(&local_id) {
                    projectile.server_id = Some(server_id);
                    projectile.state = LifecycleState::Confirmed;
                }
                self.by_server.insert(server_id, local_id);
                self.finish_resolved(physics, effects, local_id, server_id, position, hit_zone);
                return;
            }
        }

        // The local copy is already gone, expired before the verdict
        // arrived. Best effort: impact visual with a default orientation,
        // own-shot audio only with confirmed authorship. The authorship
        // entry is consumed so a replayed verdict cannot double the audio.
        warn!("Impact verdict for unknown server id {}", server_id);
        effects.spawn_effect(EffectRequest {
            kind: EffectKind::Impact,
            position,
            direction: Vec3::Y,
        });
        if let Some(slot) = self.recent_own.iter().position(|id| *id == server_id) {
            self.recent_own.remove(slot);
            if let Some(zone) = hit_zone {
                effects.spawn_effect(EffectRequest {
                    kind: EffectKind::HitAudio(zone),
                    position,
                    direction: Vec3::Y,
                });
            }
        }
        Self::remember(&mut self.recent_resolved, server_id);
    }

    /// Advances all live projectiles kinematically and retires the ones
    /// past their lifetime or range bound. A round nobody reported an
    /// impact for retires silently, with no terminal effect.
    pub fn tick(&mut self, physics: &mut PhysicsWorld, dt: f32) {
        let mut retired = Vec::new();
        for projectile in self.live.values_mut() {
            projectile.age += dt;
            projectile.position += projectile.direction * BULLET_SPEED * dt;

            let travelled = projectile.position.distance(projectile.origin);
            if projectile.age > PROJECTILE_LIFETIME || travelled > PROJECTILE_MAX_RANGE {
                retired.push(projectile.local_id);
            }
        }

        for local_id in retired {
            if let Some(mut projectile) = self.live.remove(&local_id) {
                projectile.state = LifecycleState::Expired;
                if let Some(body) = projectile.body.take() {
                    physics.remove_body(body);
                }
                if let Some(server_id) = projectile.server_id {
                    self.by_server.remove(&server_id);
                    Self::remember(&mut self.recent_expired, server_id);
                    if projectile.source_player == self.local_player {
                        Self::remember(&mut self.recent_own, server_id);
                    }
                }
                debug!("Shot {} expired after {:.1}s", local_id, projectile.age);
            }
        }
    }

    /// Discards all live state; used at shutdown after the physics world
    /// has already dropped the bodies.
    pub fn clear(&mut self) {
        self.live.clear();
        self.by_server.clear();
        self.unconfirmed.clear();
        self.recent_own.clear();
        self.recent_expired.clear();
        self.recent_resolved.clear();
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn get(&self, local_id: LocalShotId) -> Option<&Projectile> {
        self.live.get(&local_id)
    }

    pub fn has_server_id(&self, server_id: ServerBulletId) -> bool {
        self.by_server.contains_key(&server_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.live.values()
    }

    fn finish_resolved(
        &mut self,
        physics: &mut PhysicsWorld,
        effects: &mut dyn EffectSink,
        local_id: LocalShotId,
        server_id: ServerBulletId,
        position: Vec3,
        hit_zone: Option<HitZone>,
    ) {
        if let Some(mut projectile) = self.live.remove(&local_id) {
            projectile.state = LifecycleState::Resolved;
            self.by_server.remove(&server_id);
            if let Some(body) = projectile.body.take() {
                physics.remove_body(body);
            }
            Self::remember(&mut self.recent_resolved, server_id);

            effects.spawn_effect(EffectRequest {
                kind: EffectKind::Impact,
                position,
                direction: projectile.direction,
            });
            if projectile.source_player == self.local_player {
                if let Some(zone) = hit_zone {
                    effects.spawn_effect(EffectRequest {
                        kind: EffectKind::HitAudio(zone),
                        position,
                        direction: projectile.direction,
                    });
                }
            }
            debug!("Shot {} resolved at {:?}", local_id, position);
        }
    }

    /// Oldest unconfirmed shot from `player` that is still live; stale
    /// queue entries (already pruned projectiles) are discarded on the way.
    fn pop_oldest_unconfirmed(&mut self, player: PlayerId) -> Option<LocalShotId> {
        if let Some(queue) = self.unconfirmed.get_mut(&player) {
            while let Some(candidate) = queue.pop_front() {
                if self.live.contains_key(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    fn remember(recent: &mut VecDeque<ServerBulletId>, server_id: ServerBulletId) {
        recent.push_back(server_id);
        if recent.len() > RECENT_IDS_CAP {
            recent.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::RecordingEffects;
    use shared::MIN_SIM_RATE;

    const OWN: PlayerId = 1;
    const OTHER: PlayerId = 2;

    fn setup() -> (ProjectileRegistry, PhysicsWorld, RecordingEffects) {
        let mut physics = PhysicsWorld::new();
        physics.init();
        (
            ProjectileRegistry::new(OWN),
            physics,
            RecordingEffects::default(),
        )
    }

    fn bullet(origin: Vec3, direction: Vec3) -> BulletData {
        BulletData {
            origin,
            direction,
            is_pellet: false,
        }
    }

    fn expire_all(registry: &mut ProjectileRegistry, physics: &mut PhysicsWorld) {
        let dt = 1.0 / MIN_SIM_RATE;
        let steps = (PROJECTILE_LIFETIME / dt) as usize + 2;
        for _ in 0..steps {
            registry.tick(physics, dt);
        }
    }

    #[test]
    fn test_predict_registers_and_fires_effects() {
        let (mut registry, mut physics, mut effects) = setup();

        let shot =
            registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::X, false);

        assert_eq!(shot.state, LifecycleState::Predicted);
        assert_eq!(shot.source_player, OWN);
        assert_eq!(registry.live_count(), 1);
        assert!(physics.get_body(shot.body.unwrap()).is_some());
        assert_eq!(effects.count_of(EffectKind::MuzzleFlash), 1);
        assert_eq!(effects.count_of(EffectKind::FireAudio), 1);
        assert_eq!(effects.count_of(EffectKind::Tracer), 1);
    }

    #[test]
    fn test_pellet_shares_discharge_effects() {
        let (mut registry, mut physics, mut effects) = setup();

        registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::X, true);

        assert_eq!(effects.count_of(EffectKind::MuzzleFlash), 0);
        assert_eq!(effects.count_of(EffectKind::FireAudio), 0);
        assert_eq!(effects.count_of(EffectKind::Tracer), 1);
    }

    #[test]
    fn test_echo_binds_oldest_first() {
        let (mut registry, mut physics, mut effects) = setup();

        let first =
            registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::X, false);
        let second =
            registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::Z, false);

        registry.bind_server_echo(OWN, 100, &bullet(Vec3::ZERO, Vec3::X));
        registry.bind_server_echo(OWN, 101, &bullet(Vec3::ZERO, Vec3::Z));

        let first = registry.get(first.local_id).unwrap();
        let second = registry.get(second.local_id).unwrap();
        assert_eq!(first.server_id, Some(100));
        assert_eq!(first.state, LifecycleState::Confirmed);
        assert_eq!(second.server_id, Some(101));
        // Bound, not re-spawned: still exactly two live projectiles.
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn test_echo_without_prediction_is_ignored() {
        let (mut registry, _physics, _effects) = setup();

        registry.bind_server_echo(OWN, 100, &bullet(Vec3::ZERO, Vec3::X));
        assert_eq!(registry.live_count(), 0);
        assert!(!registry.has_server_id(100));
    }

    #[test]
    fn test_duplicate_echo_is_ignored() {
        let (mut registry, mut physics, mut effects) = setup();

        let a = registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::X, false);
        let b = registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::Z, false);

        registry.bind_server_echo(OWN, 100, &bullet(Vec3::ZERO, Vec3::X));
        registry.bind_server_echo(OWN, 100, &bullet(Vec3::ZERO, Vec3::Z));

        assert_eq!(registry.get(a.local_id).unwrap().server_id, Some(100));
        // The second shot stays unconfirmed; the server id was not reused.
        assert_eq!(registry.get(b.local_id).unwrap().server_id, None);
    }

    #[test]
    fn test_remote_shot_spawns_confirmed() {
        let (mut registry, mut physics, mut effects) = setup();

        registry.spawn_remote_shot(
            &mut physics,
            &mut effects,
            OTHER,
            &bullet(Vec3::new(5.0, 1.5, 0.0), Vec3::Z),
            200,
        );

        assert_eq!(registry.live_count(), 1);
        assert!(registry.has_server_id(200));
        assert_eq!(effects.count_of(EffectKind::MuzzleFlash), 1);
        assert_eq!(effects.count_of(EffectKind::FireAudio), 1);

        // Duplicate delivery of the same shot is a no-op.
        registry.spawn_remote_shot(
            &mut physics,
            &mut effects,
            OTHER,
            &bullet(Vec3::new(5.0, 1.5, 0.0), Vec3::Z),
            200,
        );
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_full_local_flow_one_terminal_effect() {
        let (mut registry, mut physics, mut effects) = setup();
        let baseline_bodies = physics.body_count();

        registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::X, false);
        registry.bind_server_echo(OWN, 100, &bullet(Vec3::ZERO, Vec3::X));
        registry.resolve_impact(
            &mut physics,
            &mut effects,
            100,
            ImpactKind::Player,
            Some(OTHER),
            Vec3::new(12.0, 1.5, 0.0),
            Some(HitZone::Head),
        );

        assert_eq!(registry.live_count(), 0);
        assert_eq!(physics.body_count(), baseline_bodies);
        assert_eq!(effects.count_of(EffectKind::Impact), 1);
        assert_eq!(effects.count_of(EffectKind::HitAudio(HitZone::Head)), 1);
    }

    #[test]
    fn test_resolve_before_echo_binds_on_demand() {
        let (mut registry, mut physics, mut effects) = setup();

        registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::X, false);

        // The verdict overtakes the echo.
        registry.resolve_impact(
            &mut physics,
            &mut effects,
            100,
            ImpactKind::Player,
            Some(OTHER),
            Vec3::new(12.0, 1.5, 0.0),
            Some(HitZone::Body),
        );
        assert_eq!(registry.live_count(), 0);
        assert_eq!(effects.count_of(EffectKind::Impact), 1);

        // The late echo finds nothing left to bind and is dropped.
        registry.bind_server_echo(OWN, 100, &bullet(Vec3::ZERO, Vec3::X));
        assert_eq!(registry.live_count(), 0);
        assert_eq!(effects.count_of(EffectKind::Impact), 1);
    }

    #[test]
    fn test_unknown_verdict_falls_back_without_audio() {
        let (mut registry, mut physics, mut effects) = setup();

        registry.resolve_impact(
            &mut physics,
            &mut effects,
            900,
            ImpactKind::World,
            None,
            Vec3::new(3.0, 0.0, 4.0),
            Some(HitZone::Head),
        );

        let impact = &effects.requests[0];
        assert_eq!(impact.kind, EffectKind::Impact);
        assert_eq!(impact.position, Vec3::new(3.0, 0.0, 4.0));
        assert_eq!(impact.direction, Vec3::Y);
        // Authorship cannot be confirmed, so no own-shot feedback.
        assert_eq!(effects.hit_audio_count(), 0);
    }

    #[test]
    fn test_verdict_after_expiry_confirms_authorship_once() {
        let (mut registry, mut physics, mut effects) = setup();

        registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::X, false);
        registry.bind_server_echo(OWN, 100, &bullet(Vec3::ZERO, Vec3::X));
        expire_all(&mut registry, &mut physics);
        assert_eq!(registry.live_count(), 0);
        assert_eq!(effects.count_of(EffectKind::Impact), 0);

        registry.resolve_impact(
            &mut physics,
            &mut effects,
            100,
            ImpactKind::Player,
            Some(OTHER),
            Vec3::new(200.0, 1.0, 0.0),
            Some(HitZone::Body),
        );
        assert_eq!(effects.count_of(EffectKind::Impact), 1);
        assert_eq!(effects.hit_audio_count(), 1);

        // A replayed verdict is a pure no-op.
        registry.resolve_impact(
            &mut physics,
            &mut effects,
            100,
            ImpactKind::Player,
            Some(OTHER),
            Vec3::new(200.0, 1.0, 0.0),
            Some(HitZone::Body),
        );
        assert_eq!(effects.count_of(EffectKind::Impact), 1);
        assert_eq!(effects.hit_audio_count(), 1);
    }

    #[test]
    fn test_duplicate_verdict_is_noop() {
        let (mut registry, mut physics, mut effects) = setup();

        registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::X, false);
        registry.bind_server_echo(OWN, 100, &bullet(Vec3::ZERO, Vec3::X));
        registry.resolve_impact(
            &mut physics,
            &mut effects,
            100,
            ImpactKind::Player,
            Some(OTHER),
            Vec3::new(12.0, 1.5, 0.0),
            Some(HitZone::Head),
        );
        registry.resolve_impact(
            &mut physics,
            &mut effects,
            100,
            ImpactKind::Player,
            Some(OTHER),
            Vec3::new(12.0, 1.5, 0.0),
            Some(HitZone::Head),
        );

        // No resurrection, no second terminal effect.
        assert_eq!(registry.live_count(), 0);
        assert_eq!(effects.count_of(EffectKind::Impact), 1);
        assert_eq!(effects.hit_audio_count(), 1);
    }

    #[test]
    fn test_duplicate_verdict_does_not_steal_pending_shot() {
        let (mut registry, mut physics, mut effects) = setup();

        registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::X, false);
        registry.bind_server_echo(OWN, 100, &bullet(Vec3::ZERO, Vec3::X));
        registry.resolve_impact(
            &mut physics,
            &mut effects,
            100,
            ImpactKind::Player,
            Some(OTHER),
            Vec3::new(12.0, 1.5, 0.0),
            Some(HitZone::Head),
        );

        // A second shot is in flight, echo still pending, when the first
        // verdict is replayed.
        let pending =
            registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::Z, false);
        registry.resolve_impact(
            &mut physics,
            &mut effects,
            100,
            ImpactKind::Player,
            Some(OTHER),
            Vec3::new(12.0, 1.5, 0.0),
            Some(HitZone::Head),
        );

        assert_eq!(
            registry.get(pending.local_id).unwrap().state,
            LifecycleState::Predicted
        );
        assert_eq!(effects.count_of(EffectKind::Impact), 1);
    }

    #[test]
    fn test_expiry_is_silent_and_frees_bodies() {
        let (mut registry, mut physics, mut effects) = setup();
        let baseline_bodies = physics.body_count();

        registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::X, false);
        let fired_effects = effects.requests.len();

        expire_all(&mut registry, &mut physics);

        assert_eq!(registry.live_count(), 0);
        assert_eq!(physics.body_count(), baseline_bodies);
        // No terminal effect for a round nobody ruled on.
        assert_eq!(effects.requests.len(), fired_effects);
    }

    #[test]
    fn test_expired_remote_verdict_does_not_steal_unconfirmed_shot() {
        let (mut registry, mut physics, mut effects) = setup();

        // A remote shot expires locally before the server rules on it.
        registry.spawn_remote_shot(
            &mut physics,
            &mut effects,
            OTHER,
            &bullet(Vec3::ZERO, Vec3::X),
            300,
        );
        expire_all(&mut registry, &mut physics);

        // We now have our own shot waiting for its echo.
        let own =
            registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::Z, false);
        let impacts_before = effects.count_of(EffectKind::Impact);

        registry.resolve_impact(
            &mut physics,
            &mut effects,
            300,
            ImpactKind::World,
            None,
            Vec3::new(50.0, 0.0, 0.0),
            None,
        );

        // The late verdict fell back; our unconfirmed shot is untouched.
        assert_eq!(effects.count_of(EffectKind::Impact), impacts_before + 1);
        assert!(registry.get(own.local_id).is_some());
        assert_eq!(
            registry.get(own.local_id).unwrap().state,
            LifecycleState::Predicted
        );
        // Not our shot, so no own-shot feedback either.
        assert_eq!(effects.hit_audio_count(), 0);
    }

    #[test]
    fn test_stale_queue_entry_skipped_on_bind() {
        let (mut registry, mut physics, mut effects) = setup();

        // First prediction expires before any echo arrives.
        registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::X, false);
        expire_all(&mut registry, &mut physics);
        let survivor =
            registry.predict_local_shot(&mut physics, &mut effects, Vec3::ZERO, Vec3::Z, false);

        registry.bind_server_echo(OWN, 100, &bullet(Vec3::ZERO, Vec3::Z));

        let survivor = registry.get(survivor.local_id).unwrap();
        assert_eq!(survivor.server_id, Some(100));
        assert_eq!(survivor.state, LifecycleState::Confirmed);
    }
}
