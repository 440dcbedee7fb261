use std::collections::VecDeque;

use anyhow::{Result, bail};
use glam::{Quat, Vec3};

use stance::net::route;
use stance::{
    Capsule, Character, FixedTimestep, FrameTime, InputAction, InputKind, LoopbackEndpoint,
    LoopbackNetwork, NetRole, PeerId, PhysicsHost, PhysicsWorld, Posture, SERVER_PEER, Transport,
    Weapon, WeaponEvent, WeaponState,
};

use crate::config::SimConfig;

const CHARACTER: u32 = 1;
const OWNER_PEER: PeerId = 1;
const OBSERVER_PEER: PeerId = 2;
const CLIENTS: [PeerId; 2] = [OWNER_PEER, OBSERVER_PEER];
/// Radians per second. Keeps the walked circle inside the low ceiling.
const TURN_RATE: f32 = 3.0;

#[derive(Debug, Clone, Copy)]
struct ScriptStep {
    at: f32,
    action: InputAction,
    kind: InputKind,
}

/// Inputs pressed by the owning client over a run.
fn script() -> VecDeque<ScriptStep> {
    use InputAction::*;
    use InputKind::*;

    [
        (0.5, Crouch, Enable),
        (1.5, Prone, Enable),
        (3.0, Prone, Disable),
        (5.0, Sprint, Enable),
        (6.5, Fire, Enable),
        (6.6, Sprint, Disable),
        (7.0, Fire, Enable),
        (8.0, Fire, Disable),
        (8.5, SwitchFireMode, Enable),
        (9.0, Reload, Enable),
        (9.1, WalkSlow, Toggle),
        (11.5, Aim, Enable),
    ]
    .into_iter()
    .map(|(at, action, kind)| ScriptStep { at, action, kind })
    .collect()
}

fn level(low_ceiling: bool) -> PhysicsWorld {
    let mut world = PhysicsWorld::new();
    world.add_ground(0.0, 50.0);
    if low_ceiling {
        world.add_static_box(Vec3::new(0.0, 1.9, 0.0), Vec3::new(5.0, 0.5, 5.0));
    }
    world.step();
    world
}

struct Peer {
    name: &'static str,
    endpoint: LoopbackEndpoint,
    character: Character,
    host: PhysicsHost,
    shots: u32,
    distance: f32,
}

impl Peer {
    fn new(
        name: &'static str,
        network: &LoopbackNetwork,
        peer: PeerId,
        role: NetRole,
        config: &SimConfig,
    ) -> Self {
        let mut character = Character::new(CHARACTER, role, config.character.clone());
        character.add_weapon(Weapon::new(config.weapon.clone()));

        let posture = &config.character.movement.posture;
        let host = PhysicsHost::new(
            level(config.low_ceiling),
            Vec3::ZERO,
            Capsule::new(posture.capsule_radius, posture.stand_half_height),
        );

        Self {
            name,
            endpoint: network.endpoint(peer),
            character,
            host,
            shots: 0,
            distance: 0.0,
        }
    }

    /// Walks a circle at whatever speed the current posture allows.
    fn walk(&mut self, time: &FrameTime) {
        let yaw = time.now * TURN_RATE;
        let movement = self.character.movement();
        let speed = if movement.is_move_input_ignored(time.now) {
            0.0
        } else {
            movement.max_speed(time.now)
        };

        self.host.set_yaw(yaw);
        self.host
            .set_velocity(Quat::from_rotation_y(yaw) * Vec3::NEG_Z * speed);

        let before = self.host.feet();
        self.host.integrate(time.dt);
        self.distance += (self.host.feet() - before).length();
    }

    fn step(&mut self, time: &FrameTime) -> Result<()> {
        for (_, packet) in self.endpoint.receive() {
            self.character.receive(&mut self.host, &packet, time);
        }

        self.walk(time);
        self.character.tick(&mut self.host, time);

        for outgoing in self.character.drain_outgoing() {
            for peer in route(outgoing.target, Some(OWNER_PEER), &CLIENTS) {
                self.endpoint
                    .send_message(peer, CHARACTER, outgoing.message.clone())?;
            }
        }

        for change in self.character.drain_posture_events() {
            log::info!(
                "[{:>8}] {:6.2}s posture {:?} -> {:?}",
                self.name,
                time.now,
                change.previous,
                change.current
            );
        }

        for (_, event) in self.character.drain_weapon_events() {
            match event {
                WeaponEvent::Fire { .. } => self.shots += 1,
                other => log::info!("[{:>8}] {:6.2}s weapon {:?}", self.name, time.now, other),
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PeerSummary {
    pub name: &'static str,
    pub posture: Posture,
    pub sprinting: bool,
    pub clip: Option<u8>,
    pub weapon_state: Option<WeaponState>,
    pub shots: u32,
    pub distance: f32,
}

#[derive(Debug, Clone)]
pub struct Summary {
    pub ticks: u64,
    pub sim_time: f32,
    pub rejected_inputs: u32,
    pub owner_rtt: f32,
    pub peers: Vec<PeerSummary>,
}

/// An authority, its owning client and one observer on a loopback network,
/// driven by a scripted input timeline.
pub struct Simulation {
    config: SimConfig,
    network: LoopbackNetwork,
    server: Peer,
    owner: Peer,
    observer: Peer,
    timestep: FixedTimestep,
    script: VecDeque<ScriptStep>,
    rejected_inputs: u32,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self> {
        if config.tick_rate == 0 {
            bail!("tick rate must be positive");
        }
        if !(config.duration > 0.0) {
            bail!("duration must be positive, got {}", config.duration);
        }

        let network = LoopbackNetwork::new(config.seed);
        if let Some(conditions) = &config.network {
            for peer in [SERVER_PEER, OWNER_PEER, OBSERVER_PEER] {
                network.set_conditions(peer, conditions.clone());
            }
        }

        let mut server = Peer::new("server", &network, SERVER_PEER, NetRole::Authority, &config);
        let owner = Peer::new("owner", &network, OWNER_PEER, NetRole::AutonomousProxy, &config);
        let observer = Peer::new(
            "observer",
            &network,
            OBSERVER_PEER,
            NetRole::SimulatedProxy,
            &config,
        );

        if !server.character.equip(0, &FrameTime::default()) {
            bail!("authority failed to equip its weapon");
        }

        Ok(Self {
            timestep: FixedTimestep::new(config.tick_rate),
            config,
            network,
            server,
            owner,
            observer,
            script: script(),
            rejected_inputs: 0,
        })
    }

    pub fn run(&mut self) -> Result<Summary> {
        let frame = self.timestep.dt();
        let total_ticks = (self.config.duration * self.config.tick_rate as f32).ceil() as u64;
        let mut ticks = 0;

        while ticks < total_ticks {
            self.timestep.accumulate(frame);
            while ticks < total_ticks {
                let Some(time) = self.timestep.consume_tick() else {
                    break;
                };
                self.tick(&time)?;
                ticks += 1;
            }
        }

        Ok(self.summary(ticks))
    }

    fn tick(&mut self, time: &FrameTime) -> Result<()> {
        self.network.advance(time.dt);

        while let Some(step) = self.script.front().copied() {
            if step.at > time.now {
                break;
            }
            self.script.pop_front();

            let executed = self
                .owner
                .character
                .handle_input(step.action, step.kind, time);
            log::info!(
                "[{:>8}] {:6.2}s input {:?} {:?}{}",
                self.owner.name,
                time.now,
                step.action,
                step.kind,
                if executed { "" } else { " (rejected)" }
            );
            if !executed {
                self.rejected_inputs += 1;
            }
        }

        self.server.step(time)?;
        self.owner.step(time)?;
        self.observer.step(time)?;
        Ok(())
    }

    fn summary(&self, ticks: u64) -> Summary {
        let peer = |peer: &Peer| {
            let weapon = peer.character.weapons().equipped();
            PeerSummary {
                name: peer.name,
                posture: peer.character.movement().posture().current(),
                sprinting: peer.character.movement().is_sprinting(),
                clip: weapon.map(|w| w.clip()),
                weapon_state: weapon.map(|w| w.state()),
                shots: peer.shots,
                distance: peer.distance,
            }
        };

        Summary {
            ticks,
            sim_time: self.timestep.sim_time(),
            rejected_inputs: self.rejected_inputs,
            owner_rtt: self.owner.character.rtt(),
            peers: vec![peer(&self.server), peer(&self.owner), peer(&self.observer)],
        }
    }
}
