use crate::character::CharacterId;
use crate::net::{ReconcileConfig, Timestamped, WeaponCorrection};
use crate::time::FrameTime;

use super::state::{ReloadData, StateData};
use super::{FireMode, WeaponConfig, WeaponEvent, WeaponState};

/// Conditions outside the weapon that gate common actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionGate {
    /// The wielder is sprinting or still recovering from a sprint.
    pub blocked_by_sprint: bool,
}

impl ActionGate {
    pub const OPEN: Self = Self {
        blocked_by_sprint: false,
    };
}

/// Weapon finite state machine. Every transition goes through `set_state`,
/// which runs the old state's exit hook and then the new state's enter hook.
#[derive(Debug, Clone)]
pub struct Weapon {
    config: WeaponConfig,
    owner: Option<CharacterId>,
    clip: Timestamped<u8>,
    fire_mode: Timestamped<FireMode>,
    aiming: Timestamped<bool>,
    data: StateData,
    state_modified: f32,
    fire_lag: f32,
    burst_counter: u8,
    fire_seed: u32,
    cosmetic: bool,
    events: Vec<WeaponEvent>,
}

impl Default for Weapon {
    fn default() -> Self {
        Self::new(WeaponConfig::default())
    }
}

impl Weapon {
    pub fn new(config: WeaponConfig) -> Self {
        Self {
            owner: None,
            clip: Timestamped::new(config.clip_size),
            fire_mode: Timestamped::new(config.initial_fire_mode()),
            aiming: Timestamped::new(false),
            data: StateData::Idle,
            state_modified: f32::NEG_INFINITY,
            fire_lag: config.fire_delay(),
            burst_counter: 0,
            fire_seed: 0,
            cosmetic: false,
            events: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &WeaponConfig {
        &self.config
    }

    /// The character currently wielding this weapon.
    pub fn owner(&self) -> Option<CharacterId> {
        self.owner
    }

    pub fn is_equipped(&self) -> bool {
        self.owner.is_some() && self.state() != WeaponState::Holstering
    }

    pub fn state(&self) -> WeaponState {
        self.data.state()
    }

    pub fn state_data(&self) -> &StateData {
        &self.data
    }

    pub fn clip(&self) -> u8 {
        self.clip.get()
    }

    pub fn fire_mode(&self) -> FireMode {
        self.fire_mode.get()
    }

    pub fn is_aiming(&self) -> bool {
        self.aiming.get()
    }

    pub fn burst_counter(&self) -> u8 {
        self.burst_counter
    }

    pub fn fire_seed(&self) -> u32 {
        self.fire_seed
    }

    /// Current values as seen from inventory `slot`.
    pub fn correction(&self, slot: u8) -> WeaponCorrection {
        WeaponCorrection {
            slot,
            clip: self.clip(),
            fire_mode: self.fire_mode(),
            state: self.state(),
            aiming: self.is_aiming(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<WeaponEvent> {
        std::mem::take(&mut self.events)
    }

    fn can_do_common_action(&self, gate: ActionGate) -> bool {
        self.is_equipped() && !gate.blocked_by_sprint
    }

    pub fn can_fire(&self, gate: ActionGate) -> bool {
        self.can_do_common_action(gate)
    }

    pub fn start_firing(&mut self, gate: ActionGate, seed: u32, time: &FrameTime) -> bool {
        if self.state() != WeaponState::Idle || !self.can_fire(gate) {
            log::trace!("start firing rejected in {:?}", self.state());
            return false;
        }

        self.fire_seed = seed;
        self.set_state(StateData::fresh(WeaponState::Firing, false), time);
        true
    }

    pub fn stop_firing(&mut self, time: &FrameTime) -> bool {
        if self.state() != WeaponState::Firing {
            return false;
        }
        self.set_state(StateData::Idle, time);
        true
    }

    pub fn reload(&mut self, gate: ActionGate, time: &FrameTime) -> bool {
        if self.state() != WeaponState::Idle
            || !self.can_do_common_action(gate)
            || self.clip() >= self.config.max_clip()
        {
            log::trace!("reload rejected in {:?} with clip {}", self.state(), self.clip());
            return false;
        }

        let empty = self.clip() == 0;
        self.set_state(StateData::fresh(WeaponState::Reloading, empty), time);
        true
    }

    pub fn switch_fire_mode(&mut self, gate: ActionGate, time: &FrameTime) -> bool {
        if self.state() != WeaponState::Idle || !self.can_do_common_action(gate) {
            return false;
        }

        let modes = self.config.fire_modes;
        if modes.bits().count_ones() <= 1 {
            return false;
        }

        let next = modes.next_after(self.fire_mode());
        if !self.fire_mode.set(next, time.real_now) {
            return false;
        }

        self.events.push(WeaponEvent::FireModeSwitched(next));
        true
    }

    pub fn set_aiming(&mut self, aiming: bool, time: &FrameTime) -> bool {
        if aiming && !self.is_equipped() {
            return false;
        }
        self.aiming.set(aiming, time.real_now)
    }

    pub fn deploy(&mut self, owner: CharacterId, time: &FrameTime) {
        self.owner = Some(owner);
        self.set_state(StateData::fresh(WeaponState::Deploying, false), time);
    }

    pub fn holster(&mut self, time: &FrameTime) -> bool {
        if self.owner.is_none() || self.state() == WeaponState::Holstering {
            return false;
        }

        self.aiming.set(false, time.real_now);
        self.set_state(StateData::fresh(WeaponState::Holstering, false), time);
        true
    }

    /// Drops the back-reference to the wielder once the weapon is put away.
    pub fn release(&mut self, time: &FrameTime) {
        if self.state() != WeaponState::Idle {
            self.set_state(StateData::Idle, time);
        }
        self.aiming.set(false, time.real_now);
        self.owner = None;
    }

    /// Advances the active state. Returns true on the tick a holster
    /// finishes.
    pub fn tick(&mut self, gate: ActionGate, time: &FrameTime) -> bool {
        match self.data {
            StateData::Idle => {
                self.recover_fire_lag(time.dt);
                false
            }
            StateData::Firing(_) => {
                self.tick_firing(gate, time);
                false
            }
            StateData::Reloading(_) => {
                self.recover_fire_lag(time.dt);
                self.tick_reloading(gate, time);
                false
            }
            StateData::Deploying(_) => {
                self.recover_fire_lag(time.dt);
                if self.advance_timer(time.dt) >= self.config.deploy_time {
                    self.set_state(StateData::Idle, time);
                }
                false
            }
            StateData::Holstering(_) => {
                self.recover_fire_lag(time.dt);
                if self.advance_timer(time.dt) >= self.config.holster_time {
                    self.set_state(StateData::Idle, time);
                    return true;
                }
                false
            }
        }
    }

    fn tick_firing(&mut self, gate: ActionGate, time: &FrameTime) {
        if !self.can_fire(gate) {
            self.set_state(StateData::Idle, time);
            return;
        }

        let delay = self.config.fire_delay();
        self.fire_lag += time.dt;

        while self.fire_lag >= delay {
            self.fire_lag -= delay;
            if !self.fire(time) {
                self.fire_lag = self.fire_lag.min(delay);
                self.set_state(StateData::Idle, time);
                break;
            }
        }
    }

    fn tick_reloading(&mut self, gate: ActionGate, time: &FrameTime) {
        if !self.can_do_common_action(gate) {
            self.set_state(StateData::Idle, time);
            return;
        }

        let elapsed = self.advance_timer(time.dt);
        let StateData::Reloading(reload) = self.data else {
            return;
        };

        if elapsed < self.config.reload_time(reload.empty) {
            return;
        }

        let clip = if reload.empty {
            self.config.clip_size
        } else {
            self.config.max_clip()
        };
        if !self.cosmetic {
            self.clip.set(clip, time.real_now);
        }
        self.data = StateData::Reloading(ReloadData {
            completed: true,
            ..reload
        });
        self.events.push(WeaponEvent::ReloadFinished { clip });
        self.set_state(StateData::Idle, time);
    }

    /// One trigger pull worth of ammunition. Returns whether firing should
    /// continue afterwards.
    fn fire(&mut self, time: &FrameTime) -> bool {
        let clip = self.clip();
        if clip == 0 && !self.cosmetic {
            self.events.push(WeaponEvent::DryFire);
            return false;
        }

        let remaining = if self.cosmetic {
            clip
        } else {
            self.clip.set(clip - 1, time.real_now);
            clip - 1
        };

        let shots = match &mut self.data {
            StateData::Firing(firing) => {
                firing.shots += 1;
                firing.shots
            }
            _ => 0,
        };

        let mode = self.fire_mode();
        if mode == FireMode::Burst {
            self.burst_counter += 1;
        }

        self.events.push(WeaponEvent::Fire {
            clip: remaining,
            spread_seed: spread_seed(self.fire_seed, shots),
        });

        match mode {
            FireMode::SemiAuto => false,
            FireMode::Burst => self.burst_counter < self.config.burst_count,
            FireMode::FullAuto => true,
        }
    }

    fn set_state(&mut self, next: StateData, time: &FrameTime) {
        let old = std::mem::replace(&mut self.data, next);
        self.state_modified = time.real_now;
        self.exit(old);
        self.enter(time);
    }

    fn exit(&mut self, old: StateData) {
        match old {
            StateData::Reloading(reload) if !reload.completed => {
                self.events.push(WeaponEvent::ReloadCancelled);
            }
            StateData::Firing(_) => {
                self.burst_counter = 0;
            }
            _ => {}
        }
    }

    fn enter(&mut self, time: &FrameTime) {
        match self.data {
            StateData::Idle => {}
            StateData::Firing(_) => {
                self.burst_counter = 0;
                let delay = self.config.fire_delay();
                if self.fire_lag >= delay {
                    self.fire_lag -= delay;
                    if !self.fire(time) {
                        self.set_state(StateData::Idle, time);
                    }
                }
            }
            StateData::Reloading(reload) => {
                self.events.push(WeaponEvent::ReloadStart {
                    empty: reload.empty,
                });
            }
            StateData::Deploying(_) => self.events.push(WeaponEvent::Deploy),
            StateData::Holstering(_) => self.events.push(WeaponEvent::Holster),
        }
    }

    fn advance_timer(&mut self, dt: f32) -> f32 {
        match &mut self.data {
            StateData::Deploying(timer) | StateData::Holstering(timer) => {
                timer.elapsed += dt;
                timer.elapsed
            }
            StateData::Reloading(reload) => {
                reload.elapsed += dt;
                reload.elapsed
            }
            StateData::Idle | StateData::Firing(_) => 0.0,
        }
    }

    fn recover_fire_lag(&mut self, dt: f32) {
        self.fire_lag = (self.fire_lag + dt).min(self.config.fire_delay());
    }

    pub fn force_state(&mut self, state: WeaponState, time: &FrameTime) {
        if state != self.state() {
            let empty = self.clip() == 0;
            self.set_state(StateData::fresh(state, empty), time);
        }
    }

    pub fn force_clip(&mut self, clip: u8, time: &FrameTime) {
        self.clip.set(clip.min(self.config.max_clip()), time.real_now);
    }

    pub fn force_fire_mode(&mut self, mode: FireMode, time: &FrameTime) {
        self.fire_mode.set(mode, time.real_now);
    }

    pub fn force_aiming(&mut self, aiming: bool, time: &FrameTime) {
        self.aiming.set(aiming, time.real_now);
    }

    /// A cosmetic weapon plays shots and reloads but leaves the clip to
    /// replication.
    pub fn set_cosmetic(&mut self, cosmetic: bool) {
        self.cosmetic = cosmetic;
    }

    pub fn set_fire_seed(&mut self, seed: u32) {
        self.fire_seed = seed;
    }

    /// Heals locally predicted fields that disagree with the authority and
    /// have not been touched for long enough. Returns whether anything
    /// changed.
    pub fn correct(
        &mut self,
        snapshot: &WeaponCorrection,
        rtt: f32,
        config: &ReconcileConfig,
        time: &FrameTime,
    ) -> bool {
        let clip = snapshot.clip.min(self.config.max_clip());
        let mut applied = self.clip.correct(clip, time.real_now, rtt, config);
        applied |= self
            .fire_mode
            .correct(snapshot.fire_mode, time.real_now, rtt, config);
        applied |= self
            .aiming
            .correct(snapshot.aiming, time.real_now, rtt, config);

        if snapshot.state != self.state()
            && config.is_expired(self.state_modified, time.real_now, rtt)
        {
            log::debug!("weapon state corrected {:?} -> {:?}", self.state(), snapshot.state);
            self.force_state(snapshot.state, time);
            applied = true;
        }

        applied
    }
}

fn spread_seed(seed: u32, shot: u32) -> u32 {
    let mut x = seed ^ shot.wrapping_mul(0x9E37_79B9);
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weapon::FireModes;

    const DT: f32 = 0.01;

    fn equipped(config: WeaponConfig) -> (Weapon, FrameTime) {
        let mut weapon = Weapon::new(config);
        let mut time = FrameTime::new(0.0, 0.0, DT);
        weapon.deploy(7, &time);
        while weapon.state() != WeaponState::Idle {
            time = time.advance(DT);
            weapon.tick(ActionGate::OPEN, &time);
        }
        weapon.drain_events();
        (weapon, time)
    }

    fn run(weapon: &mut Weapon, time: &mut FrameTime, seconds: f32, gate: ActionGate) {
        let ticks = (seconds / DT).round() as usize;
        for _ in 0..ticks {
            *time = time.advance(DT);
            weapon.tick(gate, time);
        }
    }

    fn count(events: &[WeaponEvent], pred: impl Fn(&WeaponEvent) -> bool) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    #[test]
    fn full_auto_empties_clip_then_dry_fires_once() {
        let config = WeaponConfig {
            rpm: 600.0,
            clip_size: 30,
            ..Default::default()
        };
        let (mut weapon, mut time) = equipped(config);

        assert!(weapon.start_firing(ActionGate::OPEN, 1, &time));
        run(&mut weapon, &mut time, 3.05, ActionGate::OPEN);

        let events = weapon.drain_events();
        assert_eq!(weapon.clip(), 0);
        assert_eq!(weapon.state(), WeaponState::Idle);
        assert_eq!(count(&events, |e| matches!(e, WeaponEvent::Fire { .. })), 30);
        assert_eq!(count(&events, |e| matches!(e, WeaponEvent::DryFire)), 1);
    }

    #[test]
    fn tactical_reload_of_largest_clip_saturates() {
        let config = WeaponConfig {
            clip_size: u8::MAX,
            chamber: true,
            ..Default::default()
        };
        let (mut weapon, mut time) = equipped(config);
        weapon.force_clip(200, &time);

        assert!(weapon.reload(ActionGate::OPEN, &time));
        run(&mut weapon, &mut time, 2.1, ActionGate::OPEN);

        assert_eq!(weapon.state(), WeaponState::Idle);
        assert_eq!(weapon.clip(), u8::MAX);
    }

    #[test]
    fn semi_auto_fires_once_per_pull() {
        let config = WeaponConfig {
            default_fire_mode: FireMode::SemiAuto,
            ..Default::default()
        };
        let (mut weapon, mut time) = equipped(config);

        assert!(weapon.start_firing(ActionGate::OPEN, 1, &time));
        run(&mut weapon, &mut time, 1.0, ActionGate::OPEN);

        assert_eq!(weapon.clip(), 29);
        assert_eq!(weapon.state(), WeaponState::Idle);
    }

    #[test]
    fn burst_stops_after_burst_count() {
        let config = WeaponConfig {
            default_fire_mode: FireMode::Burst,
            burst_count: 3,
            ..Default::default()
        };
        let (mut weapon, mut time) = equipped(config);

        assert!(weapon.start_firing(ActionGate::OPEN, 1, &time));
        run(&mut weapon, &mut time, 1.0, ActionGate::OPEN);
        assert_eq!(weapon.clip(), 27);
        assert_eq!(weapon.state(), WeaponState::Idle);
        assert_eq!(weapon.burst_counter(), 0);

        assert!(weapon.start_firing(ActionGate::OPEN, 2, &time));
        run(&mut weapon, &mut time, 1.0, ActionGate::OPEN);
        assert_eq!(weapon.clip(), 24);
    }

    #[test]
    fn rapid_semi_pulls_respect_rpm() {
        let config = WeaponConfig {
            rpm: 60.0,
            default_fire_mode: FireMode::SemiAuto,
            ..Default::default()
        };
        let (mut weapon, mut time) = equipped(config);

        assert!(weapon.start_firing(ActionGate::OPEN, 1, &time));
        assert_eq!(weapon.clip(), 29);

        assert!(weapon.start_firing(ActionGate::OPEN, 1, &time));
        run(&mut weapon, &mut time, 0.5, ActionGate::OPEN);
        assert_eq!(weapon.clip(), 29, "second shot waits for the delay");
        run(&mut weapon, &mut time, 0.6, ActionGate::OPEN);
        assert_eq!(weapon.clip(), 28);
    }

    #[test]
    fn sprint_forces_idle_while_firing() {
        let (mut weapon, mut time) = equipped(WeaponConfig::default());

        assert!(weapon.start_firing(ActionGate::OPEN, 1, &time));
        let blocked = ActionGate {
            blocked_by_sprint: true,
        };
        run(&mut weapon, &mut time, 0.1, blocked);
        assert_eq!(weapon.state(), WeaponState::Idle);
        assert!(!weapon.start_firing(blocked, 1, &time));
    }

    #[test]
    fn reload_refills_only_after_duration() {
        let (mut weapon, mut time) = equipped(WeaponConfig::default());
        weapon.force_clip(10, &time);

        assert!(weapon.reload(ActionGate::OPEN, &time));
        run(&mut weapon, &mut time, 1.9, ActionGate::OPEN);
        assert_eq!(weapon.state(), WeaponState::Reloading);
        assert_eq!(weapon.clip(), 10);

        run(&mut weapon, &mut time, 0.11, ActionGate::OPEN);
        assert_eq!(weapon.state(), WeaponState::Idle);
        assert_eq!(weapon.clip(), 31);
    }

    #[test]
    fn empty_reload_takes_longer_and_skips_chamber() {
        let (mut weapon, mut time) = equipped(WeaponConfig::default());
        weapon.force_clip(0, &time);

        assert!(weapon.reload(ActionGate::OPEN, &time));
        run(&mut weapon, &mut time, 2.5, ActionGate::OPEN);
        assert_eq!(weapon.clip(), 0);
        run(&mut weapon, &mut time, 0.51, ActionGate::OPEN);
        assert_eq!(weapon.clip(), 30);
        assert!(weapon.drain_events().contains(&WeaponEvent::ReloadStart { empty: true }));
    }

    #[test]
    fn full_clip_refuses_reload() {
        let (mut weapon, time) = equipped(WeaponConfig::default());
        weapon.force_clip(31, &time);
        assert!(!weapon.reload(ActionGate::OPEN, &time));
    }

    #[test]
    fn interrupted_reload_reports_cancel() {
        let (mut weapon, mut time) = equipped(WeaponConfig::default());
        weapon.force_clip(5, &time);
        assert!(weapon.reload(ActionGate::OPEN, &time));

        let blocked = ActionGate {
            blocked_by_sprint: true,
        };
        run(&mut weapon, &mut time, 0.05, blocked);

        assert_eq!(weapon.state(), WeaponState::Idle);
        assert_eq!(weapon.clip(), 5);
        assert!(weapon.drain_events().contains(&WeaponEvent::ReloadCancelled));
    }

    #[test]
    fn switch_fire_mode_skips_disabled() {
        let config = WeaponConfig {
            fire_modes: FireModes::SEMI_AUTO | FireModes::FULL_AUTO,
            default_fire_mode: FireMode::FullAuto,
            ..Default::default()
        };
        let (mut weapon, time) = equipped(config);

        assert!(weapon.switch_fire_mode(ActionGate::OPEN, &time));
        assert_eq!(weapon.fire_mode(), FireMode::SemiAuto);
        assert!(weapon.switch_fire_mode(ActionGate::OPEN, &time));
        assert_eq!(weapon.fire_mode(), FireMode::FullAuto);
    }

    #[test]
    fn single_fire_mode_cannot_switch() {
        let config = WeaponConfig {
            fire_modes: FireModes::BURST,
            default_fire_mode: FireMode::Burst,
            ..Default::default()
        };
        let (mut weapon, time) = equipped(config);

        assert!(!weapon.switch_fire_mode(ActionGate::OPEN, &time));
        assert_eq!(weapon.fire_mode(), FireMode::Burst);
    }

    #[test]
    fn unequipped_weapon_refuses_common_actions() {
        let mut weapon = Weapon::default();
        let time = FrameTime::default();

        assert!(!weapon.start_firing(ActionGate::OPEN, 0, &time));
        assert!(!weapon.reload(ActionGate::OPEN, &time));
        assert!(!weapon.set_aiming(true, &time));
    }

    #[test]
    fn holster_reports_completion() {
        let (mut weapon, mut time) = equipped(WeaponConfig::default());
        assert!(weapon.holster(&time));
        assert!(!weapon.is_equipped());

        let mut finished = false;
        for _ in 0..100 {
            time = time.advance(DT);
            finished |= weapon.tick(ActionGate::OPEN, &time);
        }
        assert!(finished);
        assert_eq!(weapon.state(), WeaponState::Idle);
    }

    #[test]
    fn cosmetic_weapon_leaves_clip_alone() {
        let (mut weapon, mut time) = equipped(WeaponConfig::default());
        weapon.set_cosmetic(true);
        weapon.force_state(WeaponState::Firing, &time);
        run(&mut weapon, &mut time, 0.5, ActionGate::OPEN);

        assert_eq!(weapon.clip(), 30);
        assert_eq!(weapon.state(), WeaponState::Firing);
        let shots = count(&weapon.drain_events(), |e| matches!(e, WeaponEvent::Fire { .. }));
        assert!(shots >= 5);
    }

    #[test]
    fn stale_state_is_corrected_fresh_state_is_kept() {
        let reconcile = ReconcileConfig::default();
        let (mut weapon, mut time) = equipped(WeaponConfig::default());
        weapon.force_clip(10, &time);
        assert!(weapon.reload(ActionGate::OPEN, &time));

        let authority = WeaponCorrection {
            slot: 0,
            clip: 10,
            fire_mode: weapon.fire_mode(),
            state: WeaponState::Idle,
            aiming: false,
        };

        time = time.advance(0.05);
        assert!(!weapon.correct(&authority, 0.1, &reconcile, &time));
        assert_eq!(weapon.state(), WeaponState::Reloading);

        time = time.advance(0.3);
        assert!(weapon.correct(&authority, 0.1, &reconcile, &time));
        assert_eq!(weapon.state(), WeaponState::Idle);
    }
}
