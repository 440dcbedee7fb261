use glam::Vec3;

use crate::movement::{CharacterMovement, CollisionChannel, CollisionShape, MovementHost, Posture};

const PRONE_TRACE_RADIUS: f32 = 0.1;
const PRONE_TRACE_DEPTH: f32 = 1.0;

/// Read-only view of a character for the animation graph.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimSnapshot {
    pub move_speed: f32,
    /// Degrees between velocity and facing, counter-clockwise seen from above.
    pub move_direction: f32,
    pub posture: Posture,
    pub is_on_ground: bool,
    /// Only set above the animation's minimum sprint speed.
    pub is_sprinting: bool,
    pub aim_pitch: f32,
    pub aim_yaw: f32,
    /// Body pitch in degrees so a prone mesh follows the slope.
    pub mesh_pitch_offset: f32,
}

impl AnimSnapshot {
    /// `aim_yaw` and `aim_pitch` are the view angles relative to the body in
    /// degrees.
    pub fn capture(
        movement: &CharacterMovement,
        host: &dyn MovementHost,
        aim_yaw: f32,
        aim_pitch: f32,
    ) -> Self {
        let velocity = horizontal(host.velocity());
        let forward = horizontal(host.forward()).normalize_or_zero();
        let move_speed = velocity.length();
        let posture = movement.posture().current();

        Self {
            move_speed,
            move_direction: direction_degrees(forward, velocity),
            posture,
            is_on_ground: host.is_grounded(),
            is_sprinting: movement.is_sprinting()
                && move_speed > movement.config().anim_min_sprint_speed,
            aim_pitch: aim_pitch.clamp(-90.0, 90.0),
            aim_yaw: normalize_degrees(aim_yaw),
            mesh_pitch_offset: if posture == Posture::Prone {
                prone_pitch(movement, host, forward)
            } else {
                0.0
            },
        }
    }
}

fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

fn direction_degrees(forward: Vec3, velocity: Vec3) -> f32 {
    if velocity.length_squared() < 1e-6 || forward == Vec3::ZERO {
        return 0.0;
    }
    let velocity = velocity.normalize();
    forward
        .cross(velocity)
        .y
        .atan2(forward.dot(velocity))
        .to_degrees()
}

fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 { 180.0 } else { wrapped }
}

/// Traces the ground at head and feet; falls back to the floor normal when
/// either end hangs over nothing.
fn prone_pitch(movement: &CharacterMovement, host: &dyn MovementHost, forward: Vec3) -> f32 {
    if forward == Vec3::ZERO {
        return 0.0;
    }

    let capsule = host.capsule();
    let reach = movement.config().posture.capsule_radius + capsule.half_height;
    let center = host.location();
    let tracer = CollisionShape::Sphere {
        radius: PRONE_TRACE_RADIUS,
    };

    let ground_at = |offset: f32| {
        let from = center + forward * offset;
        let to = from - Vec3::Y * (capsule.half_height + PRONE_TRACE_DEPTH);
        host.sweep(from, to, tracer, CollisionChannel::Visibility)
    };

    if let (Some(front), Some(back)) = (ground_at(reach), ground_at(-reach)) {
        let rise = front.location.y - back.location.y;
        return rise.atan2(reach * 2.0).to_degrees();
    }

    let floor = host.find_floor(center, capsule, movement.posture().walkable_floor_angle());
    if !floor.walkable && floor.distance.is_infinite() {
        return 0.0;
    }
    (-forward.dot(floor.normal)).clamp(-1.0, 1.0).asin().to_degrees()
}
