//! Session glue: firing, message dispatch, and the per-frame update
//!
//! `DuelSession` wires the physics world, the projectile registry, the
//! registered hit targets and the injected effect sink into one service
//! object. Everything is constructed once and passed by reference; there is
//! no ambient global state anywhere in the core.

use crate::effects::{EffectKind, EffectRequest, EffectSink};
use crate::hitzone::{HitTarget, HitZoneResolver};
use crate::physics::PhysicsWorld;
use crate::projectile::ProjectileRegistry;
use glam::Vec3;
use log::{debug, error};
use rand::Rng;
use shared::{Packet, PlayerId, PELLETS_PER_SHELL, PELLET_SPREAD, PROJECTILE_MAX_RANGE};
use std::collections::HashMap;

pub struct DuelSession {
    local_player: PlayerId,
    physics: PhysicsWorld,
    projectiles: ProjectileRegistry,
    targets: HashMap<PlayerId, HitTarget>,
    effects: Box<dyn EffectSink>,
}

impl DuelSession {
    pub fn new(local_player: PlayerId, effects: Box<dyn EffectSink>) -> Self {
        let mut physics = PhysicsWorld::new();
        physics.init();

        Self {
            local_player,
            physics,
            projectiles: ProjectileRegistry::new(local_player),
            targets: HashMap::new(),
            effects,
        }
    }

    pub fn local_player(&self) -> PlayerId {
        self.local_player
    }

    /// Fires a single predicted shot and returns the intent to transmit.
    pub fn fire_shot(&mut self, origin: Vec3, direction: Vec3) -> Packet {
        let projectile = self.projectiles.predict_local_shot(
            &mut self.physics,
            self.effects.as_mut(),
            origin,
            direction,
            false,
        );
        self.preview_hit(origin, projectile.direction);

        Packet::ShootIntent {
            origin,
            direction: projectile.direction,
            is_pellet: false,
        }
    }

    /// Fires one shotgun discharge: a single flash and report, one pellet
    /// intent per spread sample.
    pub fn fire_shotgun(&mut self, origin: Vec3, direction: Vec3) -> Vec<Packet> {
        let direction = direction.normalize_or_zero();
        self.effects.spawn_effect(EffectRequest {
            kind: EffectKind::MuzzleFlash,
            position: origin,
            direction,
        });
        self.effects.spawn_effect(EffectRequest {
            kind: EffectKind::FireAudio,
            position: origin,
            direction,
        });

        let mut rng = rand::thread_rng();
        let mut intents = Vec::with_capacity(PELLETS_PER_SHELL);
        for _ in 0..PELLETS_PER_SHELL {
            let spread = Vec3::new(
                rng.gen_range(-PELLET_SPREAD..PELLET_SPREAD),
                rng.gen_range(-PELLET_SPREAD..PELLET_SPREAD),
                rng.gen_range(-PELLET_SPREAD..PELLET_SPREAD),
            );
            let pellet_direction = (direction + spread).normalize_or_zero();
            let projectile = self.projectiles.predict_local_shot(
                &mut self.physics,
                self.effects.as_mut(),
                origin,
                pellet_direction,
                true,
            );
            intents.push(Packet::ShootIntent {
                origin,
                direction: projectile.direction,
                is_pellet: true,
            });
        }

        intents
    }

    /// Routes one already-deserialized server message. Handlers run to
    /// completion and never propagate errors; nothing here may halt the
    /// simulation loop.
    pub fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::ShootIntent { .. } => {
                // Intents are outbound-only; the server never relays them raw.
                debug!("Ignoring inbound shoot intent");
            }
            Packet::ShotEcho {
                player_id,
                server_id,
                bullet,
            } => {
                if player_id == self.local_player {
                    self.projectiles
                        .bind_server_echo(player_id, server_id, &bullet);
                } else {
                    self.projectiles.spawn_remote_shot(
                        &mut self.physics,
                        self.effects.as_mut(),
                        player_id,
                        &bullet,
                        server_id,
                    );
                }
            }
            Packet::BulletImpact {
                server_id,
                kind,
                target_id,
                position,
                hit_zone,
            } => {
                self.projectiles.resolve_impact(
                    &mut self.physics,
                    self.effects.as_mut(),
                    server_id,
                    kind,
                    target_id,
                    position,
                    hit_zone,
                );
            }
            Packet::ArenaAssign {
                index,
                center,
                radius,
                height,
            } => {
                if let Err(e) = self.physics.create_arena_boundary(center, radius, height, index)
                {
                    error!("Rejected arena assignment: {}", e);
                }
            }
            Packet::ArenaRelease { index } => {
                self.physics.remove_arena_boundary(index);
            }
        }
    }

    /// One cooperative frame: registry tick, then physics step.
    pub fn update(&mut self, dt: f32) {
        self.projectiles.tick(&mut self.physics, dt);
        self.physics.step(dt);
    }

    pub fn register_target(&mut self, target: HitTarget) {
        let player_id = target.player_id();
        self.physics.debug_view_mut().add_outline(player_id);
        self.targets.insert(player_id, target);
    }

    pub fn remove_target(&mut self, player_id: PlayerId) {
        self.targets.remove(&player_id);
        self.physics.debug_view_mut().remove_outline(player_id);
    }

    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.physics.set_debug_mode(enabled);
        if enabled {
            for player_id in self.targets.keys() {
                self.physics.debug_view_mut().add_outline(*player_id);
            }
        }
    }

    pub fn is_point_in_arena(&self, point: Vec3, index: usize) -> bool {
        self.physics.is_point_in_arena(point, index)
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn projectiles(&self) -> &ProjectileRegistry {
        &self.projectiles
    }

    /// Shutdown: every body, arena and debug resource is released.
    pub fn cleanup(&mut self) {
        self.projectiles.clear();
        self.targets.clear();
        self.physics.cleanup();
    }

    /// Immediate feedback on prediction: march the shot ray against the
    /// registered targets and report the would-be zone. The authoritative
    /// verdict may still disagree.
    fn preview_hit(&self, origin: Vec3, direction: Vec3) {
        let targets: Vec<&HitTarget> = self.targets.values().collect();
        if let Some((player_id, sample)) =
            HitZoneResolver::first_hit_along(&targets, origin, direction, PROJECTILE_MAX_RANGE)
        {
            debug!(
                "Predicted {:?} hit on player {} at {:?}",
                sample.zone, player_id, sample.point
            );
        }
    }
}
