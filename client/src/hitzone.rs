//! Hit-zone classification against player hit geometry

use glam::Vec3;
use shared::{flat_distance, HitZone, PlayerId, HEAD_RADIUS, PLAYER_HEIGHT, PLAYER_RADIUS};

/// Sampling stride for ray marching, meters.
const RAY_STEP: f32 = 0.25;

/// A classified hit: the zone that was struck and the resolved world point.
#[derive(Debug, Clone)]
pub struct HitSample {
    pub zone: HitZone,
    pub point: Vec3,
}

/// Capability to classify a world-space point against own hit geometry.
pub trait Hittable {
    fn resolve_hit(&self, point: Vec3) -> Option<HitSample>;
}

/// Upright cylinder-capsule hit geometry with a head sphere on top.
#[derive(Debug, Clone)]
pub struct HitCapsule {
    /// Feet position (bottom center)
    pub base: Vec3,
    pub radius: f32,
    pub height: f32,
    pub head_radius: f32,
}

impl HitCapsule {
    pub fn standard(base: Vec3) -> Self {
        Self {
            base,
            radius: PLAYER_RADIUS,
            height: PLAYER_HEIGHT,
            head_radius: HEAD_RADIUS,
        }
    }

    fn head_center(&self) -> Vec3 {
        self.base + Vec3::new(0.0, self.height - self.head_radius, 0.0)
    }

    /// Head sphere first, then the torso band, then anything else still
    /// inside the capsule counts as a limb.
    pub fn classify(&self, point: Vec3) -> Option<HitZone> {
        if point.distance(self.head_center()) <= self.head_radius {
            return Some(HitZone::Head);
        }

        let lateral = flat_distance(point, self.base);
        let rise = point.y - self.base.y;
        if lateral <= self.radius && rise >= 0.0 && rise <= self.height {
            if rise >= self.height * 0.45 && rise <= self.height * 0.8 {
                return Some(HitZone::Body);
            }
            return Some(HitZone::Limb);
        }

        None
    }
}

/// The locally simulated player representation.
pub struct LocalPlayer {
    pub id: PlayerId,
    pub hitbox: HitCapsule,
}

/// A server-replicated player. Hit geometry may lag the first state update,
/// in which case queries resolve nothing rather than guessing.
pub struct RemotePlayer {
    pub id: PlayerId,
    pub hitbox: Option<HitCapsule>,
}

impl Hittable for LocalPlayer {
    fn resolve_hit(&self, point: Vec3) -> Option<HitSample> {
        self.hitbox
            .classify(point)
            .map(|zone| HitSample { zone, point })
    }
}

impl Hittable for RemotePlayer {
    fn resolve_hit(&self, point: Vec3) -> Option<HitSample> {
        self.hitbox
            .as_ref()
            .and_then(|hitbox| hitbox.classify(point))
            .map(|zone| HitSample { zone, point })
    }
}

/// Closed set of hittable player representations.
pub enum HitTarget {
    Local(LocalPlayer),
    Remote(RemotePlayer),
}

impl HitTarget {
    pub fn player_id(&self) -> PlayerId {
        match self {
            HitTarget::Local(player) => player.id,
            HitTarget::Remote(player) => player.id,
        }
    }
}

impl Hittable for HitTarget {
    fn resolve_hit(&self, point: Vec3) -> Option<HitSample> {
        match self {
            HitTarget::Local(player) => player.resolve_hit(point),
            HitTarget::Remote(player) => player.resolve_hit(point),
        }
    }
}

/// Dispatches hit queries over the closed target set.
pub struct HitZoneResolver;

impl HitZoneResolver {
    /// Asks the entity to resolve the point against its own geometry.
    /// Entities without geometry yield a generic not-found; a hit is never
    /// synthesized on their behalf.
    pub fn resolve(target: &HitTarget, point: Vec3) -> Option<HitSample> {
        target.resolve_hit(point)
    }

    /// Marches along a ray and returns the first classified hit among the
    /// given targets. Used for immediate local feedback when a shot is
    /// predicted; the authoritative verdict may still differ.
    pub fn first_hit_along(
        targets: &[&HitTarget],
        origin: Vec3,
        direction: Vec3,
        max_range: f32,
    ) -> Option<(PlayerId, HitSample)> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }

        let mut travelled = 0.0;
        while travelled <= max_range {
            let point = origin + direction * travelled;
            for target in targets {
                if let Some(sample) = target.resolve_hit(point) {
                    return Some((target.player_id(), sample));
                }
            }
            travelled += RAY_STEP;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing_target(id: PlayerId, base: Vec3) -> HitTarget {
        HitTarget::Remote(RemotePlayer {
            id,
            hitbox: Some(HitCapsule::standard(base)),
        })
    }

    #[test]
    fn test_head_shot() {
        let capsule = HitCapsule::standard(Vec3::ZERO);
        let head = Vec3::new(0.0, PLAYER_HEIGHT - HEAD_RADIUS, 0.0);
        assert_eq!(capsule.classify(head), Some(HitZone::Head));
    }

    #[test]
    fn test_body_shot() {
        let capsule = HitCapsule::standard(Vec3::ZERO);
        let chest = Vec3::new(0.1, PLAYER_HEIGHT * 0.6, 0.0);
        assert_eq!(capsule.classify(chest), Some(HitZone::Body));
    }

    #[test]
    fn test_limb_shot() {
        let capsule = HitCapsule::standard(Vec3::ZERO);
        let shin = Vec3::new(0.2, 0.3, 0.0);
        assert_eq!(capsule.classify(shin), Some(HitZone::Limb));
    }

    #[test]
    fn test_clean_miss() {
        let capsule = HitCapsule::standard(Vec3::ZERO);
        let wide = Vec3::new(2.0, 1.0, 0.0);
        assert_eq!(capsule.classify(wide), None);
        let below = Vec3::new(0.0, -0.5, 0.0);
        assert_eq!(capsule.classify(below), None);
    }

    #[test]
    fn test_remote_without_geometry_resolves_nothing() {
        let player = RemotePlayer { id: 9, hitbox: None };
        assert!(player.resolve_hit(Vec3::ZERO).is_none());
    }

    #[test]
    fn test_resolver_dispatches_over_closed_set() {
        let local = HitTarget::Local(LocalPlayer {
            id: 1,
            hitbox: HitCapsule::standard(Vec3::ZERO),
        });
        let chest = Vec3::new(0.0, PLAYER_HEIGHT * 0.6, 0.0);
        let sample = HitZoneResolver::resolve(&local, chest).unwrap();
        assert_eq!(sample.zone, HitZone::Body);
        assert_eq!(sample.point, chest);
    }

    #[test]
    fn test_ray_march_finds_target_in_line() {
        let target = standing_target(2, Vec3::new(0.0, 0.0, 10.0));
        let targets = vec![&target];

        let origin = Vec3::new(0.0, 1.0, 0.0);
        let hit = HitZoneResolver::first_hit_along(&targets, origin, Vec3::Z, 50.0);
        let (player_id, sample) = hit.unwrap();
        assert_eq!(player_id, 2);
        assert!(matches!(sample.zone, HitZone::Body | HitZone::Limb));
    }

    #[test]
    fn test_ray_march_misses_off_line_target() {
        let target = standing_target(2, Vec3::new(8.0, 0.0, 10.0));
        let targets = vec![&target];

        let origin = Vec3::new(0.0, 1.0, 0.0);
        assert!(HitZoneResolver::first_hit_along(&targets, origin, Vec3::Z, 50.0).is_none());
    }

    #[test]
    fn test_ray_march_rejects_zero_direction() {
        let target = standing_target(2, Vec3::ZERO);
        let targets = vec![&target];
        assert!(
            HitZoneResolver::first_hit_along(&targets, Vec3::ZERO, Vec3::ZERO, 50.0).is_none()
        );
    }
}
