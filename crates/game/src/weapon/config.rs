use serde::{Deserialize, Serialize};

use super::{FireMode, FireModes};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponConfig {
    pub rpm: f32,

    pub clip_size: u8,
    /// A tactical reload keeps the chambered round.
    pub chamber: bool,

    pub fire_modes: FireModes,
    pub default_fire_mode: FireMode,
    pub burst_count: u8,

    pub reload_time_tactical: f32,
    pub reload_time_empty: f32,

    pub deploy_time: f32,
    pub holster_time: f32,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            rpm: 650.0,

            clip_size: 30,
            chamber: true,

            fire_modes: FireModes::all(),
            default_fire_mode: FireMode::FullAuto,
            burst_count: 3,

            reload_time_tactical: 2.0,
            reload_time_empty: 3.0,

            deploy_time: 0.67,
            holster_time: 0.67,
        }
    }
}

impl WeaponConfig {
    pub fn fire_delay(&self) -> f32 {
        60.0 / self.rpm.max(1.0)
    }

    pub fn max_clip(&self) -> u8 {
        self.clip_size.saturating_add(u8::from(self.chamber))
    }

    pub fn reload_time(&self, empty: bool) -> f32 {
        if empty {
            self.reload_time_empty
        } else {
            self.reload_time_tactical
        }
    }

    pub fn initial_fire_mode(&self) -> FireMode {
        if self.fire_modes.allows(self.default_fire_mode) {
            self.default_fire_mode
        } else {
            self.fire_modes.first().unwrap_or(self.default_fire_mode)
        }
    }
}
