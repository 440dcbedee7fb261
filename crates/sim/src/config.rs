use stance::{CharacterConfig, PacketLossSimulation, WeaponConfig};

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub tick_rate: u32,
    /// Simulated seconds to run.
    pub duration: f32,
    pub seed: u64,
    pub network: Option<PacketLossSimulation>,
    /// Puts a ceiling over the spawn so standing up from prone is refused.
    pub low_ceiling: bool,
    pub character: CharacterConfig,
    pub weapon: WeaponConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            duration: 12.0,
            seed: 0x5EED,
            network: None,
            low_ceiling: false,
            character: CharacterConfig::default(),
            weapon: WeaponConfig::default(),
        }
    }
}
