//! Rigid-body bookkeeping, arena containment and fixed-step simulation
//!
//! The world owns every static and dynamic body: the ground plane, the
//! per-arena boundary primitives, and the dynamic player/projectile bodies
//! the combat layer creates and releases. Collision eligibility is
//! partitioned with group/mask filters so arena walls stop players and
//! bullets but never interact with each other or the ground.

use crate::arena::{apothem, build_arena_boundary, PrimitiveShape};
use crate::debug::DebugView;
use glam::Vec3;
use log::{debug, info};
use shared::{
    flat_distance, ARENA_WALL_SEGMENTS, GRAVITY, MAX_ARENAS, MIN_SIM_RATE, PROJECTILE_LIFETIME,
};
use std::collections::HashMap;
use thiserror::Error;

pub type BodyId = u64;

const PLAYER_MASS: f32 = 80.0;
const PROJECTILE_RADIUS: f32 = 0.05;

/// Collision-filter groups partitioning which body categories may collide.
pub mod filter {
    pub const GROUND: u16 = 1 << 0;
    pub const ARENA: u16 = 1 << 1;
    pub const PLAYER: u16 = 1 << 2;
    pub const PROJECTILE: u16 = 1 << 3;

    // Static geometry never collides with other static geometry.
    pub const GROUND_MASK: u16 = PLAYER | PROJECTILE;
    pub const ARENA_MASK: u16 = PLAYER | PROJECTILE;
    pub const PLAYER_MASK: u16 = GROUND | ARENA | PLAYER;
    pub const PROJECTILE_MASK: u16 = GROUND | ARENA | PLAYER;
}

#[derive(Debug, Clone, PartialEq)]
pub enum BodyKind {
    Ground,
    ArenaWallSegment { arena_index: usize },
    ArenaCap { arena_index: usize },
    Player,
    Projectile { age: f32 },
}

#[derive(Debug, Clone)]
pub enum BodyShape {
    Plane,
    Box { half_extents: Vec3 },
    Cylinder { radius: f32, half_height: f32 },
    Capsule { radius: f32, half_height: f32 },
    Sphere { radius: f32 },
}

#[derive(Debug, Clone)]
pub struct PhysicsBody {
    pub id: BodyId,
    pub kind: BodyKind,
    pub shape: BodyShape,
    pub position: Vec3,
    /// Rotation around the vertical axis, radians
    pub yaw: f32,
    pub velocity: Vec3,
    /// Zero mass marks a static body
    pub mass: f32,
    pub group: u16,
    pub mask: u16,
}

impl PhysicsBody {
    pub fn is_static(&self) -> bool {
        self.mass == 0.0
    }

    pub fn collides_with(&self, other: &PhysicsBody) -> bool {
        self.group & other.mask != 0 && other.group & self.mask != 0
    }

    fn collides_with_group(&self, group: u16) -> bool {
        self.mask & group != 0
    }
}

#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("arena {index}: radius must be positive, got {radius}")]
    InvalidRadius { index: usize, radius: f32 },
    #[error("arena {index}: height must be positive, got {height}")]
    InvalidHeight { index: usize, height: f32 },
    #[error("arena index {index} out of range (max {max})")]
    IndexOutOfRange { index: usize, max: usize },
}

#[derive(Debug, Clone)]
struct ArenaRecord {
    center: Vec3,
    radius: f32,
    /// Distance from center to the physical wall panels; slightly inside
    /// `radius` because the wall ring is an inscribed polygon.
    wall_apothem: f32,
    body_ids: Vec<BodyId>,
}

pub struct PhysicsWorld {
    bodies: HashMap<BodyId, PhysicsBody>,
    arenas: HashMap<usize, ArenaRecord>,
    ground: Option<BodyId>,
    next_body_id: BodyId,
    debug: DebugView,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            bodies: HashMap::new(),
            arenas: HashMap::new(),
            ground: None,
            next_body_id: 1,
            debug: DebugView::new(),
        }
    }

    /// Creates the single static ground plane. Idempotent.
    pub fn init(&mut self) {
        if self.ground.is_some() {
            return;
        }
        let id = self.insert_body(
            BodyKind::Ground,
            BodyShape::Plane,
            Vec3::ZERO,
            0.0,
            Vec3::ZERO,
            0.0,
            filter::GROUND,
            filter::GROUND_MASK,
        );
        self.ground = Some(id);
        info!("Physics world initialized (ground body {})", id);
    }

    /// Builds the boundary primitives for `index`, first fully detaching any
    /// boundary already registered there. Rejected before any body is
    /// created if the parameters violate the contract.
    pub fn create_arena_boundary(
        &mut self,
        center: Vec3,
        radius: f32,
        height: f32,
        index: usize,
    ) -> Result<(), PhysicsError> {
        if index >= MAX_ARENAS {
            return Err(PhysicsError::IndexOutOfRange {
                index,
                max: MAX_ARENAS - 1,
            });
        }
        if radius <= 0.0 {
            return Err(PhysicsError::InvalidRadius { index, radius });
        }
        if height <= 0.0 {
            return Err(PhysicsError::InvalidHeight { index, height });
        }

        // The previous boundary must be gone before the new one becomes
        // queryable; no overlap, no leaked bodies.
        self.remove_arena_boundary(index);

        let primitives = build_arena_boundary(center, radius, height, ARENA_WALL_SEGMENTS);
        let mut body_ids = Vec::with_capacity(primitives.len());

        for prim in primitives {
            let (kind, shape) = match prim.shape {
                PrimitiveShape::Panel {
                    length,
                    height,
                    thickness,
                } => (
                    BodyKind::ArenaWallSegment { arena_index: index },
                    BodyShape::Box {
                        half_extents: Vec3::new(length * 0.5, height * 0.5, thickness * 0.5),
                    },
                ),
                PrimitiveShape::Disc { radius, thickness } => (
                    BodyKind::ArenaCap { arena_index: index },
                    BodyShape::Cylinder {
                        radius,
                        half_height: thickness * 0.5,
                    },
                ),
            };
            body_ids.push(self.insert_body(
                kind,
                shape,
                prim.position,
                prim.yaw,
                Vec3::ZERO,
                0.0,
                filter::ARENA,
                filter::ARENA_MASK,
            ));
        }

        info!(
            "Arena {} boundary created at {:?} (radius {}, height {}, {} bodies)",
            index,
            center,
            radius,
            height,
            body_ids.len()
        );
        self.arenas.insert(
            index,
            ArenaRecord {
                center,
                radius,
                wall_apothem: apothem(radius, ARENA_WALL_SEGMENTS),
                body_ids,
            },
        );
        Ok(())
    }

    /// Detaches and discards the boundary at `index`; no-op if none exists.
    pub fn remove_arena_boundary(&mut self, index: usize) {
        if let Some(record) = self.arenas.remove(&index) {
            for id in record.body_ids {
                self.remove_body(id);
            }
            info!("Arena {} boundary removed", index);
        }
    }

    pub fn remove_all_arena_boundaries(&mut self) {
        let indices: Vec<usize> = self.arenas.keys().copied().collect();
        for index in indices {
            self.remove_arena_boundary(index);
        }
    }

    /// Creates a dynamic capsule body. The caller owns the returned id and
    /// is responsible for eventually calling `remove_body`.
    pub fn create_player_body(&mut self, position: Vec3, radius: f32, height: f32) -> BodyId {
        let half_height = (height * 0.5 - radius).max(0.0);
        self.insert_body(
            BodyKind::Player,
            BodyShape::Capsule {
                radius,
                half_height,
            },
            position,
            0.0,
            Vec3::ZERO,
            PLAYER_MASS,
            filter::PLAYER,
            filter::PLAYER_MASK,
        )
    }

    /// Creates a dynamic projectile body already moving along `direction`.
    pub fn create_projectile_body(
        &mut self,
        position: Vec3,
        direction: Vec3,
        speed: f32,
        mass: f32,
    ) -> BodyId {
        let velocity = direction.normalize_or_zero() * speed;
        self.insert_body(
            BodyKind::Projectile { age: 0.0 },
            BodyShape::Sphere {
                radius: PROJECTILE_RADIUS,
            },
            position,
            0.0,
            velocity,
            mass,
            filter::PROJECTILE,
            filter::PROJECTILE_MASK,
        )
    }

    pub fn remove_body(&mut self, id: BodyId) -> bool {
        if self.bodies.remove(&id).is_some() {
            self.debug.on_body_removed(id);
            true
        } else {
            false
        }
    }

    /// Coarse duel-eligibility gate: horizontal distance from `point` to the
    /// arena center compared against the exact radius, ignoring height.
    /// Deliberately decoupled from the panel collision geometry.
    pub fn is_point_in_arena(&self, point: Vec3, index: usize) -> bool {
        match self.arenas.get(&index) {
            Some(record) => flat_distance(point, record.center) <= record.radius,
            None => false,
        }
    }

    /// Advances every dynamic body and prunes expired projectiles.
    ///
    /// A long frame stall integrates as a single 1/30 s step so bodies never
    /// tunnel through the thin arena walls.
    pub fn step(&mut self, dt: f32) {
        let dt = dt.min(1.0 / MIN_SIM_RATE);
        if dt <= 0.0 {
            return;
        }

        let walls: Vec<(Vec3, f32)> = self
            .arenas
            .values()
            .map(|record| (record.center, record.wall_apothem))
            .collect();
        let mut expired = Vec::new();

        for body in self.bodies.values_mut() {
            if body.is_static() {
                continue;
            }

            if body.kind == BodyKind::Player {
                body.velocity.y -= GRAVITY * dt;
            }

            let before = body.position;
            body.position += body.velocity * dt;

            // Ground support (plane at y = 0) for capsule bodies.
            if let BodyShape::Capsule {
                radius,
                half_height,
            } = &body.shape
            {
                if body.collides_with_group(filter::GROUND) {
                    let feet = body.position.y - (half_height + radius);
                    if feet < 0.0 {
                        body.position.y -= feet;
                        body.velocity.y = body.velocity.y.max(0.0);
                    }
                }
            }

            // Wall confinement: a body that was inside an arena's wall ring
            // and would cross it this step is held at the ring instead.
            if body.collides_with_group(filter::ARENA) {
                for (center, wall_radius) in &walls {
                    let was_inside = flat_distance(before, *center) <= *wall_radius;
                    let now_outside = flat_distance(body.position, *center) > *wall_radius;
                    if was_inside && now_outside {
                        let outward = Vec3::new(
                            body.position.x - center.x,
                            0.0,
                            body.position.z - center.z,
                        )
                        .normalize_or_zero();
                        body.position = Vec3::new(
                            center.x + outward.x * wall_radius,
                            body.position.y,
                            center.z + outward.z * wall_radius,
                        );
                        let radial_speed = body.velocity.dot(outward);
                        if radial_speed > 0.0 {
                            body.velocity -= outward * radial_speed;
                        }
                    }
                }
            }

            if let BodyKind::Projectile { age } = &mut body.kind {
                *age += dt;
                if *age > PROJECTILE_LIFETIME {
                    expired.push(body.id);
                }
            }
        }

        for id in expired {
            debug!("Pruning expired projectile body {}", id);
            self.remove_body(id);
        }
    }

    /// Toggles the parallel wireframe mirror of every live body. Idempotent
    /// and fully reversible; repeated cycles leave no net resource growth.
    pub fn set_debug_mode(&mut self, enabled: bool) {
        if enabled == self.debug.is_enabled() {
            return;
        }
        if enabled {
            self.debug.enable(self.bodies.values());
            info!(
                "Debug visualization enabled ({} meshes)",
                self.debug.mesh_count()
            );
        } else {
            self.debug.disable();
            info!("Debug visualization disabled");
        }
    }

    /// Removes every body and debug resource; used at shutdown.
    pub fn cleanup(&mut self) {
        let removed = self.bodies.len();
        self.bodies.clear();
        self.arenas.clear();
        self.ground = None;
        self.debug.disable();
        info!("Physics world cleaned up ({} bodies removed)", removed);
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn arena_body_count(&self, index: usize) -> usize {
        self.arenas
            .get(&index)
            .map(|record| record.body_ids.len())
            .unwrap_or(0)
    }

    pub fn has_arena(&self, index: usize) -> bool {
        self.arenas.contains_key(&index)
    }

    pub fn get_body(&self, id: BodyId) -> Option<&PhysicsBody> {
        self.bodies.get(&id)
    }

    pub fn debug_mesh_count(&self) -> usize {
        self.debug.mesh_count()
    }

    pub fn debug_view_mut(&mut self) -> &mut DebugView {
        &mut self.debug
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_body(
        &mut self,
        kind: BodyKind,
        shape: BodyShape,
        position: Vec3,
        yaw: f32,
        velocity: Vec3,
        mass: f32,
        group: u16,
        mask: u16,
    ) -> BodyId {
        let id = self.next_body_id;
        self.next_body_id += 1;

        let body = PhysicsBody {
            id,
            kind,
            shape,
            position,
            yaw,
            velocity,
            mass,
            group,
            mask,
        };
        self.debug.on_body_added(&body);
        self.bodies.insert(id, body);
        id
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
