use serde::{Deserialize, Serialize};

use crate::anim::AnimSnapshot;
use crate::input::{self, InputAction, InputKind};
use crate::movement::{CharacterMovement, MovementConfig, MovementHost, PostureChanged};
use crate::net::{
    sequence_greater_than, CorrectionSnapshot, CorrectionTimer, NetMessage, Outgoing, Packet,
    ReconcileConfig, ReplicatedField, ReplicatedState, RttEstimator, Target,
};
use crate::time::FrameTime;
use crate::weapon::{ActionGate, Weapon, WeaponComponent, WeaponEvent, WeaponState};

pub type CharacterId = u32;

/// Which copy of a character this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetRole {
    /// The server copy. Validates input and replicates results.
    Authority,
    /// The owning client. Predicts ahead of the authority.
    AutonomousProxy,
    /// Everyone else's view. Replays replicated values only.
    SimulatedProxy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterConfig {
    pub movement: MovementConfig,
    pub reconcile: ReconcileConfig,
    /// Real seconds between pings from the owning client.
    pub ping_interval: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            movement: MovementConfig::default(),
            reconcile: ReconcileConfig::default(),
            ping_interval: 1.0,
        }
    }
}

pub struct Character {
    id: CharacterId,
    role: NetRole,
    movement: CharacterMovement,
    weapons: WeaponComponent,
    reconcile: ReconcileConfig,
    correction_timer: CorrectionTimer,
    replicated: Option<ReplicatedState>,
    last_correction: Option<u32>,
    outbox: Vec<Outgoing>,
    rtt: RttEstimator,
    ping_interval: f32,
    next_ping_at: f32,
    aim_yaw: f32,
    aim_pitch: f32,
    seed_state: u32,
}

impl Character {
    pub fn new(id: CharacterId, role: NetRole, config: CharacterConfig) -> Self {
        Self {
            id,
            role,
            movement: CharacterMovement::new(config.movement),
            weapons: WeaponComponent::new(id),
            reconcile: config.reconcile,
            correction_timer: CorrectionTimer::new(),
            replicated: None,
            last_correction: None,
            outbox: Vec::new(),
            rtt: RttEstimator::new(),
            ping_interval: config.ping_interval,
            next_ping_at: 0.0,
            aim_yaw: 0.0,
            aim_pitch: 0.0,
            seed_state: id.wrapping_mul(0x9E37_79B9) | 1,
        }
    }

    pub fn id(&self) -> CharacterId {
        self.id
    }

    pub fn role(&self) -> NetRole {
        self.role
    }

    pub fn movement(&self) -> &CharacterMovement {
        &self.movement
    }

    pub fn movement_mut(&mut self) -> &mut CharacterMovement {
        &mut self.movement
    }

    pub fn weapons(&self) -> &WeaponComponent {
        &self.weapons
    }

    pub fn weapons_mut(&mut self) -> &mut WeaponComponent {
        &mut self.weapons
    }

    /// Weapons on a simulated proxy are cosmetic.
    pub fn add_weapon(&mut self, mut weapon: Weapon) -> usize {
        weapon.set_cosmetic(self.role == NetRole::SimulatedProxy);
        self.weapons.add(weapon)
    }

    /// Equipping is authority driven; clients follow the replicated slot.
    pub fn equip(&mut self, index: usize, time: &FrameTime) -> bool {
        if self.role != NetRole::Authority {
            log::trace!("character {} equip ignored as {:?}", self.id, self.role);
            return false;
        }
        self.weapons.equip(index, time)
    }

    /// Smoothed round trip time in seconds.
    pub fn rtt(&self) -> f32 {
        self.rtt.srtt()
    }

    pub fn max_speed(&self, now: f32) -> f32 {
        self.movement.max_speed(now)
    }

    /// View angles relative to the body, in degrees.
    pub fn set_aim(&mut self, yaw: f32, pitch: f32) {
        self.aim_yaw = yaw;
        self.aim_pitch = pitch;
    }

    pub fn action_gate(&self, now: f32) -> ActionGate {
        ActionGate {
            blocked_by_sprint: self.movement.blocks_weapon_actions(now),
        }
    }

    pub fn anim_snapshot(&self, host: &dyn MovementHost) -> AnimSnapshot {
        AnimSnapshot::capture(&self.movement, host, self.aim_yaw, self.aim_pitch)
    }

    pub fn drain_outgoing(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbox)
    }

    pub fn drain_posture_events(&mut self) -> Vec<PostureChanged> {
        self.movement.drain_posture_events()
    }

    pub fn drain_weapon_events(&mut self) -> Vec<(usize, WeaponEvent)> {
        self.weapons.drain_events()
    }

    /// Local input. Returns whether the action executed.
    pub fn handle_input(&mut self, action: InputAction, kind: InputKind, time: &FrameTime) -> bool {
        if self.role == NetRole::SimulatedProxy {
            log::trace!("character {} is not locally controlled", self.id);
            return false;
        }

        let seed = if action == InputAction::Fire {
            self.next_seed()
        } else {
            0
        };
        self.run_input(action, kind, seed, time)
    }

    fn run_input(
        &mut self,
        action: InputAction,
        kind: InputKind,
        seed: u32,
        time: &FrameTime,
    ) -> bool {
        let entry = input::entry(action);
        let executed = (entry.dispatch)(self, kind, seed, time);

        if executed && entry.send_to_server && self.role != NetRole::Authority {
            self.outbox.push(Outgoing::new(
                Target::Server,
                NetMessage::Input { action, kind, seed },
            ));
        }
        executed
    }

    /// Called by the fire action when the firing state flipped.
    pub(crate) fn notify_firing(&mut self, firing: bool, seed: u32) {
        if self.role == NetRole::Authority {
            self.outbox.push(Outgoing::new(
                Target::Others,
                NetMessage::FiringChanged { firing, seed },
            ));
        }
    }

    pub fn tick(&mut self, host: &mut dyn MovementHost, time: &FrameTime) {
        match self.role {
            NetRole::Authority | NetRole::AutonomousProxy => self.movement.tick(host, time),
            NetRole::SimulatedProxy => self.movement.tick_simulated(time),
        }

        let gate = self.action_gate(time.now);
        self.weapons.tick(gate, time);

        match self.role {
            NetRole::Authority => self.replicate(time),
            NetRole::AutonomousProxy => self.ping_if_due(time),
            NetRole::SimulatedProxy => {}
        }
    }

    fn replicate(&mut self, time: &FrameTime) {
        let current = ReplicatedState::capture(&self.movement, &self.weapons);

        for field in current.changes_since(self.replicated.as_ref()) {
            let target = match field {
                ReplicatedField::Equipped(_) => Target::All,
                _ => Target::Others,
            };
            self.outbox
                .push(Outgoing::new(target, NetMessage::Replicated(field)));
        }
        self.replicated = Some(current);

        if self.correction_timer.is_due(time.real_now, &self.reconcile) {
            self.outbox.push(Outgoing::new(
                Target::Owner,
                NetMessage::Correction(current.correction()),
            ));
        }
    }

    fn ping_if_due(&mut self, time: &FrameTime) {
        if time.real_now < self.next_ping_at {
            return;
        }
        self.next_ping_at = time.real_now + self.ping_interval;
        let timestamp = (time.real_now.max(0.0) * 1000.0) as u64;
        self.outbox
            .push(Outgoing::new(Target::Server, NetMessage::Ping { timestamp }));
    }

    pub fn receive(&mut self, host: &mut dyn MovementHost, packet: &Packet, time: &FrameTime) {
        match (&packet.message, self.role) {
            (NetMessage::Input { action, kind, seed }, NetRole::Authority) => {
                if !self.run_input(*action, *kind, *seed, time) {
                    log::trace!("character {} rejected {:?} {:?}", self.id, action, kind);
                }
            }
            (NetMessage::Replicated(field), NetRole::SimulatedProxy) => {
                self.apply_replicated(host, *field, time);
            }
            (NetMessage::Replicated(ReplicatedField::Equipped(slot)), NetRole::AutonomousProxy) => {
                self.weapons
                    .apply_replicated_equipped(slot.map(usize::from), time);
            }
            (NetMessage::Correction(snapshot), NetRole::AutonomousProxy) => {
                let sequence = packet.header.sequence;
                if self
                    .last_correction
                    .is_some_and(|last| !sequence_greater_than(sequence, last))
                {
                    log::trace!("character {} dropped out of order correction", self.id);
                    return;
                }
                self.last_correction = Some(sequence);
                self.apply_correction(host, snapshot, time);
            }
            (NetMessage::FiringChanged { firing, seed }, NetRole::SimulatedProxy) => {
                if let Some(weapon) = self.weapons.equipped_mut() {
                    weapon.set_fire_seed(*seed);
                    let state = if *firing {
                        WeaponState::Firing
                    } else {
                        WeaponState::Idle
                    };
                    weapon.force_state(state, time);
                }
            }
            (NetMessage::Ping { timestamp }, NetRole::Authority) => {
                self.outbox.push(Outgoing::new(
                    Target::Owner,
                    NetMessage::Pong {
                        timestamp: *timestamp,
                    },
                ));
            }
            (NetMessage::Pong { timestamp }, NetRole::AutonomousProxy) => {
                self.rtt
                    .update(time.real_now - *timestamp as f32 / 1000.0);
            }
            (message, role) => {
                log::trace!("character {} as {:?} ignored {:?}", self.id, role, message);
            }
        }
    }

    fn apply_replicated(
        &mut self,
        host: &mut dyn MovementHost,
        field: ReplicatedField,
        time: &FrameTime,
    ) {
        match field {
            ReplicatedField::Posture(posture) => {
                self.movement.apply_replicated_posture(host, posture, time);
            }
            ReplicatedField::Sprinting(sprinting) => {
                self.movement.apply_replicated_sprinting(sprinting, time);
            }
            ReplicatedField::Equipped(slot) => {
                self.weapons
                    .apply_replicated_equipped(slot.map(usize::from), time);
            }
            ReplicatedField::Clip(clip) => {
                if let Some(weapon) = self.weapons.equipped_mut() {
                    weapon.force_clip(clip, time);
                }
            }
            ReplicatedField::FireMode(mode) => {
                if let Some(weapon) = self.weapons.equipped_mut() {
                    weapon.force_fire_mode(mode, time);
                }
            }
            ReplicatedField::WeaponState(state) => {
                if let Some(weapon) = self.weapons.equipped_mut() {
                    weapon.force_state(state, time);
                }
            }
            ReplicatedField::Aiming(aiming) => {
                if let Some(weapon) = self.weapons.equipped_mut() {
                    weapon.force_aiming(aiming, time);
                }
            }
        }
    }

    fn apply_correction(
        &mut self,
        host: &mut dyn MovementHost,
        snapshot: &CorrectionSnapshot,
        time: &FrameTime,
    ) {
        let rtt = self.rtt.srtt();
        let config = &self.reconcile;

        let mut applied =
            self.movement
                .correct_posture(host, snapshot.posture, rtt, config, time);
        applied |= self
            .movement
            .correct_sprinting(snapshot.sprinting, rtt, config, time);

        if let Some(authoritative) = &snapshot.weapon {
            let slot = usize::from(authoritative.slot);
            if self.weapons.equipped_index() != Some(slot) {
                log::trace!(
                    "character {} skipped weapon correction for slot {slot}",
                    self.id
                );
            } else if let Some(weapon) = self.weapons.equipped_mut() {
                applied |= weapon.correct(authoritative, rtt, config, time);
            }
        }

        if applied {
            log::debug!("character {} corrected to {:?}", self.id, snapshot);
        }
    }

    fn next_seed(&mut self) -> u32 {
        let mut x = self.seed_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.seed_state = x;
        x
    }
}
