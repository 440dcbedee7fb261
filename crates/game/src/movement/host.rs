use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    pub radius: f32,
    pub half_height: f32,
}

impl Capsule {
    pub fn new(radius: f32, half_height: f32) -> Self {
        Self {
            radius,
            half_height,
        }
    }

    pub fn shape(&self) -> CollisionShape {
        CollisionShape::Capsule {
            radius: self.radius,
            half_height: self.half_height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionShape {
    Capsule { radius: f32, half_height: f32 },
    Sphere { radius: f32 },
}

impl CollisionShape {
    /// Horizontal footprint radius and vertical half extent.
    pub fn extents(&self) -> (f32, f32) {
        match *self {
            Self::Capsule {
                radius,
                half_height,
            } => (radius, half_height),
            Self::Sphere { radius } => (radius, radius),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionChannel {
    Pawn,
    Visibility,
    WorldStatic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub location: Vec3,
    pub impact_point: Vec3,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorResult {
    pub walkable: bool,
    pub normal: Vec3,
    pub distance: f32,
}

impl FloorResult {
    pub fn none() -> Self {
        Self {
            walkable: false,
            normal: Vec3::Y,
            distance: f32::INFINITY,
        }
    }
}

/// Collision queries owned by the host runtime.
pub trait CollisionQuery {
    fn overlap_blocking(
        &self,
        shape: CollisionShape,
        location: Vec3,
        rotation: Quat,
        channel: CollisionChannel,
    ) -> bool;

    fn sweep(
        &self,
        from: Vec3,
        to: Vec3,
        shape: CollisionShape,
        channel: CollisionChannel,
    ) -> Option<HitResult>;

    /// `walkable_floor_angle` is in degrees; a floor steeper than it is
    /// reported as not walkable.
    fn find_floor(&self, location: Vec3, capsule: Capsule, walkable_floor_angle: f32)
    -> FloorResult;
}

/// The character body as seen by the movement state machines. `Y` is up.
pub trait MovementHost: CollisionQuery {
    fn is_grounded(&self) -> bool;
    fn velocity(&self) -> Vec3;
    fn forward(&self) -> Vec3;
    fn rotation(&self) -> Quat;
    fn location(&self) -> Vec3;
    fn set_location(&mut self, location: Vec3);
    fn capsule(&self) -> Capsule;
    fn set_capsule_half_height(&mut self, half_height: f32);
}
