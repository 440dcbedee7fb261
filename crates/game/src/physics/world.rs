use glam::{Quat, Vec3};
use rapier3d::parry::query::ShapeCastOptions;
use rapier3d::prelude::*;

/// Static level geometry queried by `PhysicsHost`.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    gravity: Vector,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    const TICK_RATE: Real = 1.0 / 60.0;

    pub fn new() -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = Self::TICK_RATE;

        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity: Vector::new(0.0, -9.81, 0.0),
        }
    }

    /// Queries only see colliders the broad phase has picked up, so call
    /// this after adding geometry.
    pub fn step(&mut self) {
        self.pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }

    pub fn add_static_box(&mut self, position: Vec3, half_extents: Vec3) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(Vector::new(position.x, position.y, position.z))
            .build();
        self.colliders.insert(collider)
    }

    /// A slab whose top face sits at `y`.
    pub fn add_ground(&mut self, y: Real, half_size: Real) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_size, 0.1, half_size)
            .translation(Vector::new(0.0, y - 0.1, 0.0))
            .build();
        self.colliders.insert(collider)
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    fn query_pipeline(&self) -> QueryPipeline<'_> {
        self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            QueryFilter::default(),
        )
    }

    /// Whether `shape` placed at `position` touches any collider.
    pub fn intersects(&self, shape: &SharedShape, position: Vec3, rotation: Quat) -> bool {
        let query = self.query_pipeline();
        query
            .intersect_shape(to_pose(position, rotation), shape.as_ref())
            .next()
            .is_some()
    }

    /// Moves `shape` from `origin` along the normalized `direction` and
    /// returns the first contact point and the distance travelled before it.
    pub fn cast_shape(
        &self,
        shape: &SharedShape,
        origin: Vec3,
        direction: Vec3,
        max_distance: Real,
    ) -> Option<(Vec3, Real)> {
        let query = self.query_pipeline();
        let options = ShapeCastOptions {
            max_time_of_impact: max_distance,
            stop_at_penetration: false,
            ..ShapeCastOptions::default()
        };

        query
            .cast_shape(
                &to_pose(origin, Quat::IDENTITY),
                Vector::new(direction.x, direction.y, direction.z),
                shape.as_ref(),
                options,
            )
            .map(|(_, hit)| {
                let witness = hit.witness1;
                (Vec3::new(witness.x, witness.y, witness.z), hit.time_of_impact)
            })
    }

    /// `direction` must be normalized. Returns the hit point and distance.
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: Real,
    ) -> Option<(Vec3, Real)> {
        let query = self.query_pipeline();
        let ray = Ray::new(
            Vector::new(origin.x, origin.y, origin.z),
            Vector::new(direction.x, direction.y, direction.z),
        );

        query.cast_ray(&ray, max_distance, true).map(|(_, toi)| {
            let hit_point = origin + direction * toi;
            (hit_point, toi)
        })
    }
}

fn to_pose(position: Vec3, rotation: Quat) -> Pose {
    Pose::from_parts(
        Vector::new(position.x, position.y, position.z),
        Rotation::from_xyzw(rotation.x, rotation.y, rotation.z, rotation.w),
    )
}
