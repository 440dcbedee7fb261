use crate::net::ReconcileConfig;
use crate::time::FrameTime;

use super::{
    CheckLevel, MovementConfig, MovementHost, Posture, PostureChanged, PostureMachine, SprintGate,
};

/// Posture and sprint state for one character.
///
/// The owning peer (authority, or the locally controlled client predicting
/// ahead of it) drives transitions from intent in `tick`. Other peers only
/// replay replicated values.
pub struct CharacterMovement {
    config: MovementConfig,
    posture: PostureMachine,
    sprint: SprintGate,
    wanted_posture: Posture,
}

impl Default for CharacterMovement {
    fn default() -> Self {
        Self::new(MovementConfig::default())
    }
}

impl CharacterMovement {
    pub fn new(config: MovementConfig) -> Self {
        Self {
            posture: PostureMachine::new(config.posture.clone()),
            sprint: SprintGate::new(),
            wanted_posture: Posture::Stand,
            config,
        }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    pub fn posture(&self) -> &PostureMachine {
        &self.posture
    }

    pub fn sprint(&self) -> &SprintGate {
        &self.sprint
    }

    pub fn wanted_posture(&self) -> Posture {
        self.wanted_posture
    }

    pub fn drain_posture_events(&mut self) -> Vec<PostureChanged> {
        self.posture.drain_events()
    }

    pub fn is_sprinting(&self) -> bool {
        self.sprint.is_sprinting()
    }

    /// Crouch or prone requests drop any sprint intent.
    pub fn request_posture(&mut self, target: Posture, time: &FrameTime) {
        self.wanted_posture = target;
        if target != Posture::Stand && self.sprint.wants_sprint() {
            self.sprint.request_sprint(false, time);
        }
    }

    /// Sprinting from crouch or prone asks to stand first.
    pub fn request_sprint(&mut self, enabled: bool, time: &FrameTime) {
        self.sprint.request_sprint(enabled, time);
        if enabled {
            self.wanted_posture = Posture::Stand;
        }
    }

    pub fn set_walking_slow(&mut self, enabled: bool, time: &FrameTime) {
        self.sprint.set_walking_slow(enabled, time);
    }

    pub fn try_change_next_posture(
        &mut self,
        host: &mut dyn MovementHost,
        target: Posture,
        level: CheckLevel,
        time: &FrameTime,
    ) -> bool {
        self.posture.try_change_next_posture(host, target, level, time)
    }

    pub fn tick(&mut self, host: &mut dyn MovementHost, time: &FrameTime) {
        if self.wanted_posture != self.posture.current() {
            self.posture
                .try_change_next_posture(host, self.wanted_posture, CheckLevel::CheckAll, time);
        }

        self.sprint.process(host, &self.posture, &self.config, time);
        self.posture.tick(time.dt);
    }

    /// Eye blending only, for peers that do not own this character.
    pub fn tick_simulated(&mut self, time: &FrameTime) {
        self.posture.tick(time.dt);
    }

    pub fn max_speed(&self, now: f32) -> f32 {
        if self.posture.is_prone_transition_in_progress(now) {
            return 0.0;
        }

        match self.posture.current() {
            Posture::Crouch => self.config.crouch_speed,
            Posture::Prone => self.config.prone_speed,
            Posture::Stand if self.sprint.is_sprinting() => self.config.effective_sprint_speed(),
            Posture::Stand if self.sprint.is_walking_slow() => self.config.walk_slow_speed,
            Posture::Stand => self.config.walk_speed,
        }
    }

    pub fn is_move_input_ignored(&self, now: f32) -> bool {
        self.posture.is_prone_transition_in_progress(now)
    }

    /// Weapon actions are refused while sprinting and shortly after.
    pub fn blocks_weapon_actions(&self, now: f32) -> bool {
        self.sprint.is_sprinting() || self.sprint.is_recovering(&self.config, now)
    }

    pub fn apply_replicated_posture(
        &mut self,
        host: &mut dyn MovementHost,
        posture: Posture,
        time: &FrameTime,
    ) {
        self.wanted_posture = posture;
        if !self
            .posture
            .try_change_next_posture(host, posture, CheckLevel::ClientSimulation, time)
        {
            log::debug!("replicated posture {:?} could not be replayed", posture);
        }
    }

    pub fn apply_replicated_sprinting(&mut self, sprinting: bool, time: &FrameTime) {
        self.sprint.force_sprinting(sprinting, time);
    }

    pub fn correct_posture(
        &mut self,
        host: &mut dyn MovementHost,
        authoritative: Posture,
        rtt: f32,
        config: &ReconcileConfig,
        time: &FrameTime,
    ) -> bool {
        let expired = config.is_expired(self.posture.last_modified(), time.real_now, rtt);
        if authoritative == self.posture.current() || !expired {
            return false;
        }

        self.wanted_posture = authoritative;
        self.posture
            .try_change_next_posture(host, authoritative, CheckLevel::Correction, time)
    }

    pub fn correct_sprinting(
        &mut self,
        authoritative: bool,
        rtt: f32,
        config: &ReconcileConfig,
        time: &FrameTime,
    ) -> bool {
        self.sprint.correct_sprinting(authoritative, rtt, config, time)
    }
}
