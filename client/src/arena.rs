//! Procedural construction of cylindrical duel-arena boundary geometry

use glam::Vec3;
use shared::{ARENA_CAP_THICKNESS, ARENA_WALL_THICKNESS};
use std::f32::consts::{PI, TAU};

/// Shape of a single boundary collision primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveShape {
    /// Thin rectangular wall panel: chord length x wall height x thickness
    Panel {
        length: f32,
        height: f32,
        thickness: f32,
    },
    /// Flat disc closing the arena floor
    Disc { radius: f32, thickness: f32 },
}

/// A collision primitive posed in world space.
#[derive(Debug, Clone)]
pub struct BoundaryPrimitive {
    pub shape: PrimitiveShape,
    pub position: Vec3,
    /// Rotation around the vertical axis, radians
    pub yaw: f32,
}

/// Distance from the arena center to the midpoint of each wall panel.
///
/// The panel ring is a regular polygon inscribed in the requested circle, so
/// the physical walls sit slightly inside the exact radius used by the
/// containment query. Converges to `radius` as `segments` grows; at 16
/// segments the deviation is about 1.9% of the radius.
pub fn apothem(radius: f32, segments: usize) -> f32 {
    radius * (PI / segments as f32).cos()
}

/// Builds the primitive set for one cylindrical arena boundary.
///
/// Emits `segments` flat panels posed along the chords of the circle plus
/// one bottom disc so nothing falls through the floor. The top is
/// intentionally left open: wall height plus gravity and jump limits bound
/// escape in normal play, so the volume is an approximation rather than a
/// sealed container.
pub fn build_arena_boundary(
    center: Vec3,
    radius: f32,
    height: f32,
    segments: usize,
) -> Vec<BoundaryPrimitive> {
    let mut primitives = Vec::with_capacity(segments + 1);

    for i in 0..segments {
        let a0 = TAU * i as f32 / segments as f32;
        let a1 = TAU * (i + 1) as f32 / segments as f32;

        let p0 = center + Vec3::new(radius * a0.cos(), 0.0, radius * a0.sin());
        let p1 = center + Vec3::new(radius * a1.cos(), 0.0, radius * a1.sin());

        let chord = p0.distance(p1);
        let mid = (p0 + p1) * 0.5 + Vec3::new(0.0, height * 0.5, 0.0);
        // Panel long axis runs along the chord, i.e. the circle tangent at
        // the chord midpoint.
        let yaw = (p1.z - p0.z).atan2(p1.x - p0.x);

        primitives.push(BoundaryPrimitive {
            shape: PrimitiveShape::Panel {
                length: chord,
                height,
                thickness: ARENA_WALL_THICKNESS,
            },
            position: mid,
            yaw,
        });
    }

    primitives.push(BoundaryPrimitive {
        shape: PrimitiveShape::Disc {
            radius,
            thickness: ARENA_CAP_THICKNESS,
        },
        position: center - Vec3::new(0.0, ARENA_CAP_THICKNESS * 0.5, 0.0),
        yaw: 0.0,
    });

    primitives
}
