#![allow(dead_code)]

use glam::{Quat, Vec3};

use stance::net::route;
use stance::{
    Capsule, Character, CharacterConfig, CollisionChannel, CollisionQuery, CollisionShape,
    FloorResult, FrameTime, HitResult, LoopbackEndpoint, LoopbackNetwork, MovementHost, NetRole,
    PacketLossSimulation, PeerId, SERVER_PEER, Transport, Weapon, WeaponConfig,
};

pub const DT: f32 = 1.0 / 60.0;
pub const CHARACTER: u32 = 1;
pub const OWNER_PEER: PeerId = 1;
pub const OBSERVER_PEER: PeerId = 2;

/// Flat ground with an optional ceiling and a switchable grounded flag.
pub struct TestHost {
    pub location: Vec3,
    pub capsule: Capsule,
    pub velocity: Vec3,
    pub grounded: bool,
    pub ceiling: Option<f32>,
}

impl TestHost {
    pub fn new() -> Self {
        Self {
            location: Vec3::new(0.0, 0.88, 0.0),
            capsule: Capsule::new(0.34, 0.88),
            velocity: Vec3::ZERO,
            grounded: true,
            ceiling: None,
        }
    }
}

impl CollisionQuery for TestHost {
    fn overlap_blocking(
        &self,
        shape: CollisionShape,
        location: Vec3,
        _rotation: Quat,
        _channel: CollisionChannel,
    ) -> bool {
        let (_, half) = shape.extents();
        self.ceiling.is_some_and(|y| location.y + half > y)
    }

    fn sweep(
        &self,
        _from: Vec3,
        _to: Vec3,
        _shape: CollisionShape,
        _channel: CollisionChannel,
    ) -> Option<HitResult> {
        None
    }

    fn find_floor(&self, _location: Vec3, _capsule: Capsule, _angle: f32) -> FloorResult {
        FloorResult {
            walkable: self.grounded,
            normal: Vec3::Y,
            distance: 0.0,
        }
    }
}

impl MovementHost for TestHost {
    fn is_grounded(&self) -> bool {
        self.grounded
    }
    fn velocity(&self) -> Vec3 {
        self.velocity
    }
    fn forward(&self) -> Vec3 {
        Vec3::NEG_Z
    }
    fn rotation(&self) -> Quat {
        Quat::IDENTITY
    }
    fn location(&self) -> Vec3 {
        self.location
    }
    fn set_location(&mut self, location: Vec3) {
        self.location = location;
    }
    fn capsule(&self) -> Capsule {
        self.capsule
    }
    fn set_capsule_half_height(&mut self, half_height: f32) {
        self.capsule.half_height = half_height;
    }
}

pub struct Peer {
    pub endpoint: LoopbackEndpoint,
    pub character: Character,
    pub host: TestHost,
}

impl Peer {
    fn new(network: &LoopbackNetwork, peer: PeerId, role: NetRole) -> Self {
        let mut character = Character::new(CHARACTER, role, CharacterConfig::default());
        character.add_weapon(Weapon::new(WeaponConfig::default()));
        Self {
            endpoint: network.endpoint(peer),
            character,
            host: TestHost::new(),
        }
    }

    fn step(&mut self, time: &FrameTime) {
        for (_, packet) in self.endpoint.receive() {
            self.character.receive(&mut self.host, &packet, time);
        }

        self.character.tick(&mut self.host, time);

        let clients = [OWNER_PEER, OBSERVER_PEER];
        for outgoing in self.character.drain_outgoing() {
            for peer in route(outgoing.target, Some(OWNER_PEER), &clients) {
                self.endpoint
                    .send_message(peer, CHARACTER, outgoing.message.clone())
                    .unwrap();
            }
        }
    }
}

/// One authority, its owning client and one observing client.
pub struct Session {
    pub network: LoopbackNetwork,
    pub server: Peer,
    pub owner: Peer,
    pub observer: Peer,
    pub time: FrameTime,
}

impl Session {
    pub fn new(conditions: Option<PacketLossSimulation>) -> Self {
        let network = LoopbackNetwork::new(0xC0FFEE);
        if let Some(conditions) = conditions {
            for peer in [SERVER_PEER, OWNER_PEER, OBSERVER_PEER] {
                network.set_conditions(peer, conditions.clone());
            }
        }

        Self {
            server: Peer::new(&network, SERVER_PEER, NetRole::Authority),
            owner: Peer::new(&network, OWNER_PEER, NetRole::AutonomousProxy),
            observer: Peer::new(&network, OBSERVER_PEER, NetRole::SimulatedProxy),
            network,
            time: FrameTime::new(0.0, 0.0, DT),
        }
    }

    pub fn latency(ms: u32) -> Option<PacketLossSimulation> {
        Some(PacketLossSimulation {
            enabled: true,
            min_latency_ms: ms,
            max_latency_ms: ms,
            ..Default::default()
        })
    }

    pub fn step(&mut self) {
        self.time = self.time.advance(DT);
        self.network.advance(DT);

        self.server.step(&self.time);
        self.owner.step(&self.time);
        self.observer.step(&self.time);
    }

    pub fn run(&mut self, seconds: f32) {
        let ticks = (seconds / DT).round() as usize;
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Equips slot 0 on the authority and waits for the deploy to finish.
    pub fn arm(&mut self) {
        assert!(self.server.character.equip(0, &self.time));
        self.run(1.0);
    }
}
