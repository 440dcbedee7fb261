use glam::Vec3;

use crate::net::{ReconcileConfig, Timestamped};
use crate::time::FrameTime;

use super::{MovementConfig, MovementHost, Posture, PostureMachine};

/// Sprint and slow-walk modifiers layered over posture.
///
/// Input only sets intent. `process` turns the sprint intent into the
/// `sprinting` flag each tick, so a held sprint key engages as soon as the
/// character is actually able to sprint. Sprint and slow-walk exclude each
/// other; whichever was requested last wins.
#[derive(Debug, Clone)]
pub struct SprintGate {
    wants_sprint: bool,
    sprinting: Timestamped<bool>,
    walking_slow: Timestamped<bool>,
    sprint_ended_at: f32,
}

impl Default for SprintGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SprintGate {
    pub fn new() -> Self {
        Self {
            wants_sprint: false,
            sprinting: Timestamped::new(false),
            walking_slow: Timestamped::new(false),
            sprint_ended_at: f32::NEG_INFINITY,
        }
    }

    pub fn wants_sprint(&self) -> bool {
        self.wants_sprint
    }

    pub fn is_sprinting(&self) -> bool {
        self.sprinting.get()
    }

    pub fn is_walking_slow(&self) -> bool {
        self.walking_slow.get()
    }

    pub fn sprinting(&self) -> &Timestamped<bool> {
        &self.sprinting
    }

    pub fn walking_slow(&self) -> &Timestamped<bool> {
        &self.walking_slow
    }

    pub fn request_sprint(&mut self, enabled: bool, time: &FrameTime) {
        self.wants_sprint = enabled;
        if enabled {
            self.walking_slow.set(false, time.real_now);
        } else {
            self.stop(time);
        }
    }

    pub fn set_walking_slow(&mut self, enabled: bool, time: &FrameTime) {
        self.walking_slow.set(enabled, time.real_now);
        if enabled {
            self.wants_sprint = false;
            self.stop(time);
        }
    }

    pub fn can_sprint(
        &self,
        host: &dyn MovementHost,
        posture: &PostureMachine,
        config: &MovementConfig,
        now: f32,
    ) -> bool {
        if !host.is_grounded()
            || posture.current() != Posture::Stand
            || posture.is_transition_locked_out(now)
        {
            return false;
        }

        let velocity = horizontal(host.velocity());
        let speed = velocity.length();
        if speed < config.min_sprint_speed {
            return false;
        }

        let forward = horizontal(host.forward()).normalize_or_zero();
        velocity.dot(forward) / speed >= config.max_sprint_angle_cos
    }

    pub fn process(
        &mut self,
        host: &dyn MovementHost,
        posture: &PostureMachine,
        config: &MovementConfig,
        time: &FrameTime,
    ) {
        let allowed = self.wants_sprint && self.can_sprint(host, posture, config, time.now);

        if allowed && !self.is_sprinting() {
            self.sprinting.set(true, time.real_now);
            log::debug!("sprint started");
        } else if !allowed && self.is_sprinting() {
            self.stop(time);
            log::debug!("sprint stopped");
        }
    }

    /// True while weapon actions are still blocked by a sprint that just
    /// ended.
    pub fn is_recovering(&self, config: &MovementConfig, now: f32) -> bool {
        !self.is_sprinting() && now - self.sprint_ended_at < config.sprint_recovery_time
    }

    /// Applies a replicated value without gating.
    pub fn force_sprinting(&mut self, sprinting: bool, time: &FrameTime) {
        if sprinting {
            self.sprinting.set(true, time.real_now);
        } else {
            self.stop(time);
        }
    }

    pub fn correct_sprinting(
        &mut self,
        authoritative: bool,
        rtt: f32,
        config: &ReconcileConfig,
        time: &FrameTime,
    ) -> bool {
        if !self.sprinting.needs_correction(authoritative, time.real_now, rtt, config) {
            return false;
        }

        self.wants_sprint = authoritative;
        self.force_sprinting(authoritative, time);
        true
    }

    fn stop(&mut self, time: &FrameTime) {
        if self.sprinting.set(false, time.real_now) {
            self.sprint_ended_at = time.now;
        }
    }
}

fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}
