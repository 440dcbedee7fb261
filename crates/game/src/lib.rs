pub mod anim;
pub mod character;
pub mod input;
pub mod movement;
pub mod net;
pub mod physics;
pub mod time;
pub mod weapon;

pub use anim::AnimSnapshot;
pub use character::{Character, CharacterConfig, CharacterId, NetRole};
pub use input::{InputAction, InputActionEntry, InputKind, INPUT_ACTIONS};
pub use movement::{
    Capsule, CharacterMovement, CheckLevel, CollisionChannel, CollisionQuery, CollisionShape,
    FloorResult, HitResult, MovementConfig, MovementHost, Posture, PostureChanged, PostureConfig,
    SprintSpeed,
};
pub use net::{
    LoopbackEndpoint, LoopbackNetwork, NetMessage, Outgoing, Packet, PacketError,
    PacketLossSimulation, PeerId, ReconcileConfig, Target, Transport, SERVER_PEER,
};
pub use physics::{PhysicsHost, PhysicsWorld};
pub use time::{FixedTimestep, FrameTime};
pub use weapon::{
    ActionGate, FireMode, FireModes, Weapon, WeaponComponent, WeaponConfig, WeaponEvent,
    WeaponState,
};
