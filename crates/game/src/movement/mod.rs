mod component;
mod config;
mod eye;
mod host;
mod posture;
mod sprint;

pub use component::CharacterMovement;
pub use config::{MovementConfig, PostureConfig, SprintSpeed};
pub use eye::EyeHeightBlend;
pub use host::{
    Capsule, CollisionChannel, CollisionQuery, CollisionShape, FloorResult, HitResult,
    MovementHost,
};
pub use posture::{CheckLevel, Posture, PostureChanged, PostureMachine};
pub use sprint::SprintGate;
