use crate::movement::{CharacterMovement, Posture};
use crate::weapon::WeaponComponent;

use super::protocol::{CorrectionSnapshot, NetMessage, ReplicatedField, WeaponCorrection};
use super::transport::{PeerId, SERVER_PEER};

/// Who a message produced by a character is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Server,
    /// The client controlling the character.
    Owner,
    /// Every client except the owner.
    Others,
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub target: Target,
    pub message: NetMessage,
}

impl Outgoing {
    pub fn new(target: Target, message: NetMessage) -> Self {
        Self { target, message }
    }
}

/// Resolves a target against the connected clients.
pub fn route(target: Target, owner: Option<PeerId>, clients: &[PeerId]) -> Vec<PeerId> {
    match target {
        Target::Server => vec![SERVER_PEER],
        Target::Owner => owner.into_iter().collect(),
        Target::Others => clients
            .iter()
            .copied()
            .filter(|peer| Some(*peer) != owner)
            .collect(),
        Target::All => clients.to_vec(),
    }
}

/// The replicated view of a character at one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicatedState {
    pub posture: Posture,
    pub sprinting: bool,
    pub equipped: Option<u8>,
    pub weapon: Option<WeaponCorrection>,
}

impl ReplicatedState {
    pub fn capture(movement: &CharacterMovement, weapons: &WeaponComponent) -> Self {
        let equipped = weapons
            .equipped_index()
            .and_then(|index| u8::try_from(index).ok());

        Self {
            posture: movement.posture().current(),
            sprinting: movement.is_sprinting(),
            equipped,
            weapon: equipped
                .zip(weapons.equipped())
                .map(|(slot, weapon)| weapon.correction(slot)),
        }
    }

    pub fn correction(&self) -> CorrectionSnapshot {
        CorrectionSnapshot {
            posture: self.posture,
            sprinting: self.sprinting,
            weapon: self.weapon,
        }
    }

    /// Fields that differ from `previous`, or every field when nothing was
    /// sent yet. The equipped slot comes before the weapon fields.
    pub fn changes_since(&self, previous: Option<&Self>) -> Vec<ReplicatedField> {
        let mut fields = Vec::new();

        if previous.is_none_or(|p| p.posture != self.posture) {
            fields.push(ReplicatedField::Posture(self.posture));
        }
        if previous.is_none_or(|p| p.sprinting != self.sprinting) {
            fields.push(ReplicatedField::Sprinting(self.sprinting));
        }
        if previous.is_none_or(|p| p.equipped != self.equipped) {
            fields.push(ReplicatedField::Equipped(self.equipped));
        }

        let Some(weapon) = self.weapon else {
            return fields;
        };
        let before = previous
            .filter(|p| p.equipped == self.equipped)
            .and_then(|p| p.weapon);

        if before.is_none_or(|b| b.clip != weapon.clip) {
            fields.push(ReplicatedField::Clip(weapon.clip));
        }
        if before.is_none_or(|b| b.fire_mode != weapon.fire_mode) {
            fields.push(ReplicatedField::FireMode(weapon.fire_mode));
        }
        if before.is_none_or(|b| b.state != weapon.state) {
            fields.push(ReplicatedField::WeaponState(weapon.state));
        }
        if before.is_none_or(|b| b.aiming != weapon.aiming) {
            fields.push(ReplicatedField::Aiming(weapon.aiming));
        }

        fields
    }
}
