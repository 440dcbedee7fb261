use glam::{Quat, Vec3};
use rapier3d::geometry::SharedShape;

use crate::movement::{
    Capsule, CollisionChannel, CollisionQuery, CollisionShape, FloorResult, HitResult,
    MovementHost,
};

use super::PhysicsWorld;

const SKIN: f32 = 0.02;
const GROUND_TOLERANCE: f32 = 0.05;
const MAX_FLOOR_DISTANCE: f32 = 0.25;

/// A character body standing in a rapier world. The body itself is not a
/// collider; overlaps and sweeps are shape queries against the level, floor
/// checks are raycasts.
pub struct PhysicsHost {
    world: PhysicsWorld,
    location: Vec3,
    capsule: Capsule,
    velocity: Vec3,
    yaw: f32,
}

impl PhysicsHost {
    /// `world` must already have been stepped once so the broad phase knows
    /// its colliders.
    pub fn new(world: PhysicsWorld, feet: Vec3, capsule: Capsule) -> Self {
        Self {
            world,
            location: feet + Vec3::Y * capsule.half_height,
            capsule,
            velocity: Vec3::ZERO,
            yaw: 0.0,
        }
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    /// Radians around `Y`. Zero faces `-Z`.
    pub fn set_yaw(&mut self, yaw: f32) {
        self.yaw = yaw;
    }

    pub fn feet(&self) -> Vec3 {
        self.location - Vec3::Y * self.capsule.half_height
    }

    /// Moves horizontally by `velocity * dt`, refusing steps into geometry.
    pub fn integrate(&mut self, dt: f32) {
        let step = Vec3::new(self.velocity.x, 0.0, self.velocity.z) * dt;
        let distance = step.length();
        if distance <= f32::EPSILON {
            return;
        }

        let shape = self.capsule.shape();
        let target = self.location + step;
        if self
            .sweep(self.location, target, shape, CollisionChannel::Pawn)
            .is_none()
        {
            self.location = target;
        }
    }
}

/// Query shape shrunk by `SKIN` on every side so resting contact with the
/// floor does not count as a hit.
fn query_shape(shape: CollisionShape) -> SharedShape {
    match shape {
        CollisionShape::Capsule {
            radius,
            half_height,
        } => {
            let radius = (radius - SKIN).max(SKIN);
            let half_segment = (half_height - SKIN - radius).max(0.0);
            SharedShape::capsule_y(half_segment, radius)
        }
        CollisionShape::Sphere { radius } => SharedShape::ball((radius - SKIN).max(SKIN)),
    }
}

impl CollisionQuery for PhysicsHost {
    fn overlap_blocking(
        &self,
        shape: CollisionShape,
        location: Vec3,
        rotation: Quat,
        _channel: CollisionChannel,
    ) -> bool {
        self.world
            .intersects(&query_shape(shape), location, rotation)
    }

    fn sweep(
        &self,
        from: Vec3,
        to: Vec3,
        shape: CollisionShape,
        _channel: CollisionChannel,
    ) -> Option<HitResult> {
        let delta = to - from;
        let length = delta.length();
        if length <= f32::EPSILON {
            return None;
        }
        let direction = delta / length;

        self.world
            .cast_shape(&query_shape(shape), from, direction, length)
            .map(|(impact_point, distance)| HitResult {
                location: from + direction * distance,
                impact_point,
                distance,
            })
    }

    fn find_floor(
        &self,
        location: Vec3,
        capsule: Capsule,
        walkable_floor_angle: f32,
    ) -> FloorResult {
        let lift = GROUND_TOLERANCE;
        let feet = location - Vec3::Y * capsule.half_height;
        let max = lift + MAX_FLOOR_DISTANCE;
        let r = capsule.radius * 0.5;

        let ray = |offset: Vec3| self.world.raycast(feet + offset + Vec3::Y * lift, Vec3::NEG_Y, max);

        let Some((center, toi)) = ray(Vec3::ZERO) else {
            return FloorResult::none();
        };

        let normal = match (ray(Vec3::X * r), ray(Vec3::Z * r)) {
            (Some((px, _)), Some((pz, _))) => {
                let n = (pz - center).cross(px - center).normalize_or_zero();
                if n.y < 0.0 { -n } else { n }
            }
            _ => Vec3::Y,
        };
        let normal = if normal == Vec3::ZERO { Vec3::Y } else { normal };

        let distance = (toi - lift).max(0.0);
        let walkable = distance <= GROUND_TOLERANCE
            && normal.y >= walkable_floor_angle.to_radians().cos() - 1e-4;

        FloorResult {
            walkable,
            normal,
            distance,
        }
    }
}

impl MovementHost for PhysicsHost {
    fn is_grounded(&self) -> bool {
        let feet = self.feet();
        self.world
            .raycast(feet + Vec3::Y * SKIN, Vec3::NEG_Y, SKIN + GROUND_TOLERANCE)
            .is_some()
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }

    fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }

    fn location(&self) -> Vec3 {
        self.location
    }

    fn set_location(&mut self, location: Vec3) {
        self.location = location;
    }

    fn capsule(&self) -> Capsule {
        self.capsule
    }

    fn set_capsule_half_height(&mut self, half_height: f32) {
        self.capsule.half_height = half_height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::{CheckLevel, Posture, PostureConfig, PostureMachine};
    use crate::time::FrameTime;

    fn room(ceiling: Option<f32>) -> PhysicsHost {
        let mut world = PhysicsWorld::new();
        world.add_ground(0.0, 20.0);
        if let Some(y) = ceiling {
            world.add_static_box(Vec3::new(0.0, y + 0.5, 0.0), Vec3::new(5.0, 0.5, 5.0));
        }
        world.step();

        let config = PostureConfig::default();
        PhysicsHost::new(
            world,
            Vec3::ZERO,
            Capsule::new(config.capsule_radius, config.stand_half_height),
        )
    }

    #[test]
    fn standing_on_ground_is_grounded() {
        let host = room(None);
        assert!(host.is_grounded());

        let floor = host.find_floor(host.location(), host.capsule(), 44.765);
        assert!(floor.walkable);
        assert!(floor.normal.y > 0.99);
    }

    #[test]
    fn low_ceiling_blocks_standing_up() {
        let config = PostureConfig::default();
        let mut host = room(Some(1.4));
        let mut machine = PostureMachine::new(config.clone());

        // Standing height collides with the ceiling; replay ignores that.
        let time = FrameTime::new(0.0, 0.0, 0.0);
        assert!(machine.try_change_next_posture(&mut host, Posture::Crouch, CheckLevel::CheckAll, &time));

        let later = FrameTime::new(5.0, 5.0, 0.0);
        assert!(!machine.try_change_next_posture(&mut host, Posture::Stand, CheckLevel::CheckAll, &later));
        assert_eq!(machine.current(), Posture::Crouch);
        assert!((host.capsule().half_height - config.crouch_half_height).abs() < 1e-6);
        assert!((host.feet().y).abs() < 1e-5);
    }

    #[test]
    fn open_sky_allows_standing_up() {
        let mut host = room(None);
        let mut machine = PostureMachine::new(PostureConfig::default());

        let time = FrameTime::new(0.0, 0.0, 0.0);
        assert!(machine.try_change_next_posture(&mut host, Posture::Prone, CheckLevel::CheckAll, &time));
        let later = FrameTime::new(5.0, 5.0, 0.0);
        assert!(machine.try_change_next_posture(&mut host, Posture::Stand, CheckLevel::CheckAll, &later));
        assert!(host.feet().y.abs() < 1e-5);
    }

    fn room_with_obstacle(center: Vec3, half_extents: Vec3) -> PhysicsHost {
        let mut world = PhysicsWorld::new();
        world.add_ground(0.0, 20.0);
        world.add_static_box(center, half_extents);
        world.step();

        let config = PostureConfig::default();
        PhysicsHost::new(
            world,
            Vec3::ZERO,
            Capsule::new(config.capsule_radius, config.crouch_half_height),
        )
    }

    #[test]
    fn resting_on_the_floor_is_not_an_overlap() {
        let host = room(None);
        let capsule = host.capsule();
        assert!(!host.overlap_blocking(
            capsule.shape(),
            host.location(),
            Quat::IDENTITY,
            CollisionChannel::Pawn,
        ));
    }

    #[test]
    fn small_obstacle_between_edge_and_axis_overlaps() {
        let config = PostureConfig::default();
        let host = room_with_obstacle(Vec3::new(0.2, 1.3, 0.2), Vec3::splat(0.05));
        let standing = Capsule::new(config.capsule_radius, config.stand_half_height);

        assert!(host.overlap_blocking(
            standing.shape(),
            Vec3::new(0.0, config.stand_half_height, 0.0),
            Quat::IDENTITY,
            CollisionChannel::Pawn,
        ));
    }

    #[test]
    fn small_obstacle_blocks_standing_up() {
        let config = PostureConfig::default();
        let mut host = room_with_obstacle(Vec3::new(0.2, 1.3, 0.2), Vec3::splat(0.05));
        let mut machine = PostureMachine::new(config.clone());

        let time = FrameTime::new(0.0, 0.0, 0.0);
        assert!(machine.try_change_next_posture(
            &mut host,
            Posture::Crouch,
            CheckLevel::IgnoreDelay,
            &time
        ));
        assert!(host.overlap_blocking(
            Capsule::new(config.capsule_radius, config.stand_half_height).shape(),
            Vec3::new(0.0, config.stand_half_height, 0.0),
            Quat::IDENTITY,
            CollisionChannel::Pawn,
        ));

        let later = FrameTime::new(5.0, 5.0, 0.0);
        assert!(!machine.try_change_next_posture(&mut host, Posture::Stand, CheckLevel::CheckAll, &later));
        assert_eq!(machine.current(), Posture::Crouch);
        assert!((host.capsule().half_height - config.crouch_half_height).abs() < 1e-6);
    }

    #[test]
    fn sweep_hits_thin_post_between_edge_and_axis() {
        let config = PostureConfig::default();
        let host = room_with_obstacle(Vec3::new(0.25, 0.6, -2.0), Vec3::new(0.02, 0.6, 0.02));
        let from = host.location();

        let hit = host
            .sweep(
                from,
                from + Vec3::NEG_Z * 4.0,
                Capsule::new(config.capsule_radius, config.crouch_half_height).shape(),
                CollisionChannel::Pawn,
            )
            .expect("post is inside the swept volume");
        assert!(hit.distance > 1.5 && hit.distance < 2.0, "{}", hit.distance);
    }

    #[test]
    fn walls_stop_integration() {
        let mut world = PhysicsWorld::new();
        world.add_ground(0.0, 20.0);
        world.add_static_box(Vec3::new(0.0, 1.0, -1.0), Vec3::new(5.0, 1.0, 0.1));
        world.step();

        let mut host = PhysicsHost::new(world, Vec3::ZERO, Capsule::new(0.34, 0.88));
        host.set_velocity(Vec3::new(0.0, 0.0, -4.0));
        for _ in 0..60 {
            host.integrate(1.0 / 60.0);
        }
        assert!(host.location().z > -0.9);
    }
}
