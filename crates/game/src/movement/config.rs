use serde::{Deserialize, Serialize};

use super::Posture;

/// How `MovementConfig::sprint_speed` combines with the walk speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SprintSpeed {
    #[default]
    Absolute,
    Relative,
    Multiply,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostureConfig {
    pub capsule_radius: f32,

    pub stand_half_height: f32,
    pub crouch_half_height: f32,
    pub prone_half_height: f32,

    pub stand_eye_height: f32,
    pub crouch_eye_height: f32,
    pub prone_eye_height: f32,

    /// Degrees.
    pub walkable_floor_angle: f32,
    pub prone_walkable_floor_angle: f32,

    pub perch_radius_threshold: f32,
    pub prone_perch_radius_threshold: f32,

    /// Seconds, indexed `[from][to]` by `Posture::index`.
    pub transition_durations: [[f32; 3]; 3],
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            capsule_radius: 0.34,

            stand_half_height: 0.88,
            crouch_half_height: 0.6,
            prone_half_height: 0.34,

            stand_eye_height: 1.5,
            crouch_eye_height: 1.0,
            prone_eye_height: 0.35,

            walkable_floor_angle: 44.765,
            prone_walkable_floor_angle: 60.0,

            perch_radius_threshold: 0.0,
            prone_perch_radius_threshold: 0.3,

            //                      stand  crouch  prone
            transition_durations: [
                [0.0, 0.25, 1.5], // from stand
                [0.3, 0.0, 1.2],  // from crouch
                [1.4, 1.0, 0.0],  // from prone
            ],
        }
    }
}

impl PostureConfig {
    pub fn half_height(&self, posture: Posture) -> f32 {
        match posture {
            Posture::Stand => self.stand_half_height,
            Posture::Crouch => self.crouch_half_height,
            Posture::Prone => self.prone_half_height,
        }
    }

    pub fn eye_height(&self, posture: Posture) -> f32 {
        match posture {
            Posture::Stand => self.stand_eye_height,
            Posture::Crouch => self.crouch_eye_height,
            Posture::Prone => self.prone_eye_height,
        }
    }

    pub fn walkable_floor_angle(&self, posture: Posture) -> f32 {
        match posture {
            Posture::Prone => self.prone_walkable_floor_angle,
            Posture::Stand | Posture::Crouch => self.walkable_floor_angle,
        }
    }

    pub fn perch_radius_threshold(&self, posture: Posture) -> f32 {
        match posture {
            Posture::Prone => self.prone_perch_radius_threshold,
            Posture::Stand | Posture::Crouch => self.perch_radius_threshold,
        }
    }

    pub fn transition_duration(&self, from: Posture, to: Posture) -> f32 {
        self.transition_durations[from.index()][to.index()]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementConfig {
    pub posture: PostureConfig,

    pub walk_speed: f32,
    pub walk_slow_speed: f32,
    pub crouch_speed: f32,
    pub prone_speed: f32,

    pub sprint_speed: f32,
    pub sprint_speed_type: SprintSpeed,
    /// Minimum cosine between velocity and facing for sprint to hold.
    pub max_sprint_angle_cos: f32,
    pub min_sprint_speed: f32,
    /// Weapon actions stay blocked this long after a sprint ends.
    pub sprint_recovery_time: f32,

    /// Below this speed the animation snapshot never reports sprinting.
    pub anim_min_sprint_speed: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            posture: PostureConfig::default(),

            walk_speed: 4.0,
            walk_slow_speed: 1.6,
            crouch_speed: 2.0,
            prone_speed: 1.0,

            sprint_speed: 6.0,
            sprint_speed_type: SprintSpeed::Absolute,
            max_sprint_angle_cos: 0.1,
            min_sprint_speed: 0.1,
            sprint_recovery_time: 0.25,

            anim_min_sprint_speed: 4.0,
        }
    }
}

impl MovementConfig {
    pub fn effective_sprint_speed(&self) -> f32 {
        match self.sprint_speed_type {
            SprintSpeed::Absolute => self.sprint_speed,
            SprintSpeed::Relative => self.walk_speed + self.sprint_speed,
            SprintSpeed::Multiply => self.walk_speed * self.sprint_speed,
        }
    }
}
