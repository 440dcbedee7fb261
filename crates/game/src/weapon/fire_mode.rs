use bitflags::bitflags;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub enum FireMode {
    SemiAuto,
    Burst,
    #[default]
    FullAuto,
}

impl FireMode {
    const CYCLE: [FireMode; 3] = [FireMode::SemiAuto, FireMode::Burst, FireMode::FullAuto];

    pub fn flag(self) -> FireModes {
        match self {
            Self::SemiAuto => FireModes::SEMI_AUTO,
            Self::Burst => FireModes::BURST,
            Self::FullAuto => FireModes::FULL_AUTO,
        }
    }

    fn position(self) -> usize {
        match self {
            Self::SemiAuto => 0,
            Self::Burst => 1,
            Self::FullAuto => 2,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    pub struct FireModes: u8 {
        const SEMI_AUTO = 1 << 0;
        const BURST = 1 << 1;
        const FULL_AUTO = 1 << 2;
    }
}

impl FireModes {
    pub fn allows(self, mode: FireMode) -> bool {
        self.contains(mode.flag())
    }

    /// The next enabled mode after `current` in semi → burst → full order,
    /// wrapping around. Returns `current` when nothing else is enabled.
    pub fn next_after(self, current: FireMode) -> FireMode {
        let start = current.position();
        (1..FireMode::CYCLE.len())
            .map(|offset| FireMode::CYCLE[(start + offset) % FireMode::CYCLE.len()])
            .find(|mode| self.allows(*mode))
            .unwrap_or(current)
    }

    /// Fallback for a configured default that the mask does not allow.
    pub fn first(self) -> Option<FireMode> {
        FireMode::CYCLE.into_iter().find(|mode| self.allows(*mode))
    }
}
