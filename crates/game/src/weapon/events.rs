use super::FireMode;

/// Cosmetic and gameplay notifications raised by a weapon. Hosts drain them
/// to play effects, spawn projectiles or drive animation montages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeaponEvent {
    Fire { clip: u8, spread_seed: u32 },
    DryFire,
    ReloadStart { empty: bool },
    ReloadFinished { clip: u8 },
    ReloadCancelled,
    FireModeSwitched(FireMode),
    Deploy,
    Holster,
}
