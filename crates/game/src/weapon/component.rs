use crate::character::CharacterId;
use crate::time::FrameTime;

use super::{ActionGate, Weapon, WeaponEvent, WeaponState};

/// The weapons a character carries and which one is in hand.
#[derive(Debug, Clone)]
pub struct WeaponComponent {
    owner: CharacterId,
    weapons: Vec<Weapon>,
    equipped: Option<usize>,
    switching_to: Option<usize>,
}

impl WeaponComponent {
    pub fn new(owner: CharacterId) -> Self {
        Self {
            owner,
            weapons: Vec::new(),
            equipped: None,
            switching_to: None,
        }
    }

    pub fn add(&mut self, weapon: Weapon) -> usize {
        self.weapons.push(weapon);
        self.weapons.len() - 1
    }

    pub fn weapons(&self) -> &[Weapon] {
        &self.weapons
    }

    pub fn equipped_index(&self) -> Option<usize> {
        self.equipped
    }

    pub fn equipped(&self) -> Option<&Weapon> {
        self.equipped.and_then(|index| self.weapons.get(index))
    }

    pub fn equipped_mut(&mut self) -> Option<&mut Weapon> {
        self.equipped.and_then(|index| self.weapons.get_mut(index))
    }

    /// Starts equipping `index`. A weapon already in hand is holstered first
    /// and the new one deploys once the holster completes. Asking for the
    /// weapon that is being holstered cancels the switch and redeploys it.
    pub fn equip(&mut self, index: usize, time: &FrameTime) -> bool {
        if index >= self.weapons.len() {
            log::warn!("equip of unknown weapon slot {index}");
            return false;
        }

        match self.equipped {
            None => {
                self.equipped = Some(index);
                self.weapons[index].deploy(self.owner, time);
                true
            }
            Some(current) if current == index => {
                self.switching_to = None;
                if self.weapons[current].state() != WeaponState::Holstering {
                    return false;
                }
                log::debug!("character {} redeploying slot {index}", self.owner);
                self.weapons[current].deploy(self.owner, time);
                true
            }
            Some(current) => {
                self.switching_to = Some(index);
                if self.weapons[current].state() != WeaponState::Holstering {
                    self.weapons[current].holster(time);
                }
                true
            }
        }
    }

    pub fn tick(&mut self, gate: ActionGate, time: &FrameTime) {
        let Some(current) = self.equipped else {
            return;
        };

        if self.weapons[current].tick(gate, time) {
            self.weapons[current].release(time);
            self.equipped = self.switching_to.take();
            if let Some(next) = self.equipped {
                log::debug!("character {} deploying slot {next}", self.owner);
                self.weapons[next].deploy(self.owner, time);
            }
        }
    }

    /// Mirrors the authority's equipped slot on a replica, skipping the
    /// holster handoff.
    pub fn apply_replicated_equipped(&mut self, index: Option<usize>, time: &FrameTime) {
        let index = index.filter(|index| *index < self.weapons.len());
        if index == self.equipped {
            return;
        }

        if let Some(current) = self.equipped {
            self.weapons[current].release(time);
        }
        self.switching_to = None;
        self.equipped = index;
        if let Some(next) = index {
            self.weapons[next].deploy(self.owner, time);
        }
    }

    pub fn drain_events(&mut self) -> Vec<(usize, WeaponEvent)> {
        self.weapons
            .iter_mut()
            .enumerate()
            .flat_map(|(index, weapon)| {
                weapon
                    .drain_events()
                    .into_iter()
                    .map(move |event| (index, event))
            })
            .collect()
    }
}
