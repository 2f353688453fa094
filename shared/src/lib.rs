use glam::Vec3;
use serde::{Deserialize, Serialize};

// Combat tuning shared between the core and the loopback/test harnesses.
pub const BULLET_SPEED: f32 = 120.0;
pub const BULLET_MASS: f32 = 0.02;
pub const PROJECTILE_LIFETIME: f32 = 5.0;
pub const PROJECTILE_MAX_RANGE: f32 = 700.0;
pub const PELLETS_PER_SHELL: usize = 8;
pub const PELLET_SPREAD: f32 = 0.06;

// World and arena tuning.
pub const GRAVITY: f32 = 9.81;
pub const MIN_SIM_RATE: f32 = 30.0;
pub const MAX_ARENAS: usize = 8;
pub const ARENA_WALL_SEGMENTS: usize = 16;
pub const ARENA_WALL_THICKNESS: f32 = 0.5;
pub const ARENA_CAP_THICKNESS: f32 = 0.3;

// Player hit geometry.
pub const PLAYER_RADIUS: f32 = 0.4;
pub const PLAYER_HEIGHT: f32 = 1.8;
pub const HEAD_RADIUS: f32 = 0.22;

pub type PlayerId = u32;
pub type ServerBulletId = u64;

/// Classified region of a player's hit geometry.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum HitZone {
    Head,
    Body,
    Limb,
}

/// What the server ruled a bullet struck.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ImpactKind {
    Player,
    Npc,
    World,
}

/// Origin and heading of a fired bullet as the server confirms it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BulletData {
    pub origin: Vec3,
    pub direction: Vec3,
    pub is_pellet: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    ShootIntent {
        origin: Vec3,
        direction: Vec3,
        is_pellet: bool,
    },
    ShotEcho {
        player_id: PlayerId,
        server_id: ServerBulletId,
        bullet: BulletData,
    },
    BulletImpact {
        server_id: ServerBulletId,
        kind: ImpactKind,
        target_id: Option<u32>,
        position: Vec3,
        hit_zone: Option<HitZone>,
    },
    ArenaAssign {
        index: usize,
        center: Vec3,
        radius: f32,
        height: f32,
    },
    ArenaRelease {
        index: usize,
    },
}

/// Distance between two points projected onto the ground plane (XZ).
pub fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = b.x - a.x;
    let dz = b.z - a.z;
    (dx * dx + dz * dz).sqrt()
}
