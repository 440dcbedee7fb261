use rkyv::{Archive, Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub enum WeaponState {
    #[default]
    Idle,
    Firing,
    Reloading,
    Deploying,
    Holstering,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FiringData {
    pub shots: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReloadData {
    pub elapsed: f32,
    pub empty: bool,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimerData {
    pub elapsed: f32,
}

/// Scratch data for the active state only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StateData {
    #[default]
    Idle,
    Firing(FiringData),
    Reloading(ReloadData),
    Deploying(TimerData),
    Holstering(TimerData),
}

impl StateData {
    pub fn state(&self) -> WeaponState {
        match self {
            Self::Idle => WeaponState::Idle,
            Self::Firing(_) => WeaponState::Firing,
            Self::Reloading(_) => WeaponState::Reloading,
            Self::Deploying(_) => WeaponState::Deploying,
            Self::Holstering(_) => WeaponState::Holstering,
        }
    }

    /// Fresh payload for entering `state`. `empty_clip` picks the reload kind.
    pub fn fresh(state: WeaponState, empty_clip: bool) -> Self {
        match state {
            WeaponState::Idle => Self::Idle,
            WeaponState::Firing => Self::Firing(FiringData::default()),
            WeaponState::Reloading => Self::Reloading(ReloadData {
                elapsed: 0.0,
                empty: empty_clip,
                completed: false,
            }),
            WeaponState::Deploying => Self::Deploying(TimerData::default()),
            WeaponState::Holstering => Self::Holstering(TimerData::default()),
        }
    }
}
