mod component;
mod config;
mod events;
mod fire_mode;
mod machine;
mod state;

pub use component::WeaponComponent;
pub use config::WeaponConfig;
pub use events::WeaponEvent;
pub use fire_mode::{FireMode, FireModes};
pub use machine::{ActionGate, Weapon};
pub use state::{FiringData, ReloadData, StateData, TimerData, WeaponState};
