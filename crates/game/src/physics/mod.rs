mod host;
mod world;

pub use host::PhysicsHost;
pub use world::PhysicsWorld;
