use glam::Vec3;
use rkyv::{Archive, Deserialize, Serialize};

use crate::time::FrameTime;

use super::{EyeHeightBlend, MovementHost, PostureConfig};
use super::host::{Capsule, CollisionChannel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub enum Posture {
    #[default]
    Stand,
    Crouch,
    Prone,
}

impl Posture {
    pub const ALL: [Posture; 3] = [Posture::Stand, Posture::Crouch, Posture::Prone];

    pub fn index(self) -> usize {
        match self {
            Self::Stand => 0,
            Self::Crouch => 1,
            Self::Prone => 2,
        }
    }
}

/// A committed transition, drained by whoever presents the character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostureChanged {
    pub previous: Posture,
    pub current: Posture,
}

/// How strictly `PostureMachine::try_change_next_posture` validates a
/// transition. Ordered from most permissive to strictest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckLevel {
    /// Forced by the authority. Skips every guard and never arms a lockout.
    Correction,
    /// Replay of a transition the authority already validated.
    ClientSimulation,
    /// Full collision and floor validation, lockout ignored.
    IgnoreDelay,
    CheckAll,
}

impl CheckLevel {
    fn validates_collision(self) -> bool {
        self >= Self::IgnoreDelay
    }
}

/// Values a transition touches before it is known to succeed.
#[derive(Debug, Clone, Copy)]
struct Provisional {
    location: Vec3,
    half_height: f32,
    walkable_floor_angle: f32,
    perch_radius_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct PostureMachine {
    config: PostureConfig,
    current: Posture,
    previous: Posture,
    next_transition_allowed_at: f32,
    walkable_floor_angle: f32,
    perch_radius_threshold: f32,
    mesh_offset: f32,
    eye_height: EyeHeightBlend,
    last_modified: f32,
    events: Vec<PostureChanged>,
}

impl PostureMachine {
    pub fn new(config: PostureConfig) -> Self {
        let stand = Posture::Stand;
        Self {
            current: stand,
            previous: stand,
            next_transition_allowed_at: 0.0,
            walkable_floor_angle: config.walkable_floor_angle(stand),
            perch_radius_threshold: config.perch_radius_threshold(stand),
            mesh_offset: -config.half_height(stand),
            eye_height: EyeHeightBlend::new(config.eye_height(stand)),
            last_modified: f32::NEG_INFINITY,
            events: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &PostureConfig {
        &self.config
    }

    pub fn current(&self) -> Posture {
        self.current
    }

    pub fn previous(&self) -> Posture {
        self.previous
    }

    pub fn next_transition_allowed_at(&self) -> f32 {
        self.next_transition_allowed_at
    }

    pub fn walkable_floor_angle(&self) -> f32 {
        self.walkable_floor_angle
    }

    pub fn perch_radius_threshold(&self) -> f32 {
        self.perch_radius_threshold
    }

    /// Mesh height relative to the capsule center.
    pub fn mesh_offset(&self) -> f32 {
        self.mesh_offset
    }

    pub fn eye_height(&self) -> &EyeHeightBlend {
        &self.eye_height
    }

    /// Real time of the last local transition.
    pub fn last_modified(&self) -> f32 {
        self.last_modified
    }

    pub fn is_transition_locked_out(&self, now: f32) -> bool {
        now < self.next_transition_allowed_at
    }

    pub fn is_prone_transition_in_progress(&self, now: f32) -> bool {
        self.is_transition_locked_out(now)
            && (self.previous == Posture::Prone || self.current == Posture::Prone)
    }

    pub fn drain_events(&mut self) -> Vec<PostureChanged> {
        std::mem::take(&mut self.events)
    }

    pub fn tick(&mut self, dt: f32) {
        self.eye_height.tick(dt);
    }

    /// Attempts to move to `target`. On failure every provisional change is
    /// rolled back and the machine is exactly as it was before the call.
    pub fn try_change_next_posture(
        &mut self,
        host: &mut dyn MovementHost,
        target: Posture,
        level: CheckLevel,
        time: &FrameTime,
    ) -> bool {
        if level > CheckLevel::Correction && target == self.current {
            return true;
        }

        if level == CheckLevel::CheckAll && self.is_transition_locked_out(time.now) {
            log::trace!(
                "posture {:?} -> {:?} rejected: locked out until {:.2}",
                self.current,
                target,
                self.next_transition_allowed_at
            );
            return false;
        }

        if level > CheckLevel::Correction && target != Posture::Stand && !host.is_grounded() {
            log::trace!("posture {:?} -> {:?} rejected: airborne", self.current, target);
            return false;
        }

        let saved = Provisional {
            location: host.location(),
            half_height: host.capsule().half_height,
            walkable_floor_angle: self.walkable_floor_angle,
            perch_radius_threshold: self.perch_radius_threshold,
        };

        let new_half_height = self.config.half_height(target);
        let height_delta = new_half_height - saved.half_height;
        let new_location = saved.location + Vec3::Y * height_delta;
        let new_capsule = Capsule::new(host.capsule().radius, new_half_height);

        self.walkable_floor_angle = self.config.walkable_floor_angle(target);
        self.perch_radius_threshold = self.config.perch_radius_threshold(target);

        if level.validates_collision() && height_delta > 0.0 {
            let blocked = host.overlap_blocking(
                new_capsule.shape(),
                new_location,
                host.rotation(),
                CollisionChannel::Pawn,
            );
            if blocked {
                log::debug!(
                    "posture {:?} -> {:?} blocked by encroachment",
                    self.current,
                    target
                );
                self.rollback(host, &saved);
                return false;
            }
        }

        host.set_capsule_half_height(new_half_height);
        host.set_location(new_location);

        if level.validates_collision() {
            let floor = host.find_floor(new_location, new_capsule, self.walkable_floor_angle);
            if !floor.walkable {
                log::debug!(
                    "posture {:?} -> {:?} rejected: no walkable floor",
                    self.current,
                    target
                );
                self.rollback(host, &saved);
                return false;
            }
        }

        self.commit(target, level, time);
        true
    }

    fn rollback(&mut self, host: &mut dyn MovementHost, saved: &Provisional) {
        host.set_capsule_half_height(saved.half_height);
        host.set_location(saved.location);
        self.walkable_floor_angle = saved.walkable_floor_angle;
        self.perch_radius_threshold = saved.perch_radius_threshold;
    }

    fn commit(&mut self, target: Posture, level: CheckLevel, time: &FrameTime) {
        let duration = self.config.transition_duration(self.current, target);

        self.mesh_offset = -self.config.half_height(target);
        self.eye_height
            .blend_to(self.config.eye_height(target), duration);

        self.previous = self.current;
        self.current = target;
        self.last_modified = time.real_now;
        if self.previous != target {
            self.events.push(PostureChanged {
                previous: self.previous,
                current: target,
            });
        }

        if level > CheckLevel::Correction {
            self.next_transition_allowed_at = time.now + duration;
        }

        log::debug!(
            "posture {:?} -> {:?} ({:?}, {:.2}s)",
            self.previous,
            self.current,
            level,
            duration
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::host::{CollisionQuery, CollisionShape, FloorResult, HitResult};
    use glam::Quat;

    struct TestHost {
        location: Vec3,
        capsule: Capsule,
        grounded: bool,
        ceiling: Option<f32>,
        floor_walkable: bool,
    }

    impl TestHost {
        fn standing(config: &PostureConfig) -> Self {
            Self {
                location: Vec3::new(0.0, config.stand_half_height, 0.0),
                capsule: Capsule::new(config.capsule_radius, config.stand_half_height),
                grounded: true,
                ceiling: None,
                floor_walkable: true,
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
                walkable: self.floor_walkable,
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
            Vec3::ZERO
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

    fn at(now: f32) -> FrameTime {
        FrameTime::new(now, now, 0.0)
    }

    #[test]
    fn every_posture_reachable_with_full_checks() {
        let config = PostureConfig::default();
        for target in [Posture::Crouch, Posture::Prone] {
            let mut host = TestHost::standing(&config);
            let mut machine = PostureMachine::new(config.clone());

            assert!(machine.try_change_next_posture(&mut host, target, CheckLevel::CheckAll, &at(2.0)));
            assert_eq!(machine.current(), target);
            assert_eq!(machine.previous(), Posture::Stand);
            assert_eq!(host.capsule.half_height, config.half_height(target));
            assert!(
                (machine.next_transition_allowed_at()
                    - (2.0 + config.transition_duration(Posture::Stand, target)))
                .abs()
                    < 1e-6
            );
            assert!((host.location.y - config.half_height(target)).abs() < 1e-6);
        }
    }

    #[test]
    fn airborne_cannot_crouch_or_prone() {
        let config = PostureConfig::default();
        let mut host = TestHost::standing(&config);
        host.grounded = false;
        let mut machine = PostureMachine::new(config);

        for level in [CheckLevel::ClientSimulation, CheckLevel::IgnoreDelay, CheckLevel::CheckAll] {
            assert!(!machine.try_change_next_posture(&mut host, Posture::Crouch, level, &at(0.0)));
            assert!(!machine.try_change_next_posture(&mut host, Posture::Prone, level, &at(0.0)));
        }
        assert_eq!(machine.current(), Posture::Stand);
    }

    #[test]
    fn blocked_stand_up_rolls_everything_back() {
        let config = PostureConfig::default();
        let mut host = TestHost::standing(&config);
        let mut machine = PostureMachine::new(config.clone());

        assert!(machine.try_change_next_posture(&mut host, Posture::Prone, CheckLevel::CheckAll, &at(0.0)));
        host.ceiling = Some(1.0);

        let half_height = host.capsule.half_height;
        let location = host.location;
        let walkable = machine.walkable_floor_angle();
        let perch = machine.perch_radius_threshold();

        assert!(!machine.try_change_next_posture(&mut host, Posture::Stand, CheckLevel::CheckAll, &at(10.0)));
        assert_eq!(machine.current(), Posture::Prone);
        assert_eq!(host.capsule.half_height, half_height);
        assert_eq!(host.location, location);
        assert_eq!(machine.walkable_floor_angle(), walkable);
        assert_eq!(machine.perch_radius_threshold(), perch);
        assert_eq!(walkable, config.prone_walkable_floor_angle);
    }

    #[test]
    fn unwalkable_floor_rolls_back() {
        let config = PostureConfig::default();
        let mut host = TestHost::standing(&config);
        host.floor_walkable = false;
        let mut machine = PostureMachine::new(config.clone());

        assert!(!machine.try_change_next_posture(&mut host, Posture::Crouch, CheckLevel::IgnoreDelay, &at(0.0)));
        assert_eq!(host.capsule.half_height, config.stand_half_height);
        assert_eq!(machine.current(), Posture::Stand);

        // Replays skip floor validation.
        assert!(machine.try_change_next_posture(&mut host, Posture::Crouch, CheckLevel::ClientSimulation, &at(0.0)));
    }

    #[test]
    fn lockout_blocks_until_window_elapses() {
        let config = PostureConfig::default();
        let mut host = TestHost::standing(&config);
        let mut machine = PostureMachine::new(config);

        assert!(machine.try_change_next_posture(&mut host, Posture::Prone, CheckLevel::CheckAll, &at(0.0)));
        assert!(machine.is_prone_transition_in_progress(0.5));

        assert!(!machine.try_change_next_posture(&mut host, Posture::Crouch, CheckLevel::CheckAll, &at(0.5)));
        assert!(!machine.try_change_next_posture(&mut host, Posture::Crouch, CheckLevel::CheckAll, &at(1.49)));
        assert_eq!(machine.current(), Posture::Prone);

        assert!(machine.try_change_next_posture(&mut host, Posture::Crouch, CheckLevel::CheckAll, &at(1.5)));
        assert_eq!(machine.current(), Posture::Crouch);
        assert_eq!(machine.previous(), Posture::Prone);
    }

    #[test]
    fn ignore_delay_bypasses_only_the_lockout() {
        let config = PostureConfig::default();
        let mut host = TestHost::standing(&config);
        let mut machine = PostureMachine::new(config);

        assert!(machine.try_change_next_posture(&mut host, Posture::Crouch, CheckLevel::CheckAll, &at(0.0)));
        host.ceiling = Some(1.0);
        assert!(!machine.try_change_next_posture(&mut host, Posture::Stand, CheckLevel::IgnoreDelay, &at(0.1)));
        host.ceiling = None;
        assert!(machine.try_change_next_posture(&mut host, Posture::Stand, CheckLevel::IgnoreDelay, &at(0.1)));
    }

    #[test]
    fn correction_always_succeeds_and_does_not_arm_lockout() {
        let config = PostureConfig::default();
        let mut host = TestHost::standing(&config);
        host.grounded = false;
        host.ceiling = Some(0.1);
        let mut machine = PostureMachine::new(config);

        assert!(machine.try_change_next_posture(&mut host, Posture::Prone, CheckLevel::Correction, &at(3.0)));
        assert_eq!(machine.current(), Posture::Prone);
        assert!(!machine.is_transition_locked_out(3.0));
    }

    #[test]
    fn committed_transitions_are_reported_once() {
        let config = PostureConfig::default();
        let mut host = TestHost::standing(&config);
        let mut machine = PostureMachine::new(config);

        assert!(machine.try_change_next_posture(&mut host, Posture::Crouch, CheckLevel::CheckAll, &at(0.0)));
        host.ceiling = Some(1.0);
        assert!(!machine.try_change_next_posture(&mut host, Posture::Stand, CheckLevel::CheckAll, &at(1.0)));
        assert!(machine.try_change_next_posture(&mut host, Posture::Prone, CheckLevel::Correction, &at(1.0)));
        assert!(machine.try_change_next_posture(&mut host, Posture::Prone, CheckLevel::Correction, &at(1.0)));

        assert_eq!(
            machine.drain_events(),
            vec![
                PostureChanged {
                    previous: Posture::Stand,
                    current: Posture::Crouch,
                },
                PostureChanged {
                    previous: Posture::Crouch,
                    current: Posture::Prone,
                },
            ]
        );
        assert!(machine.drain_events().is_empty());
    }

    #[test]
    fn same_posture_is_trivial_success() {
        let config = PostureConfig::default();
        let mut host = TestHost::standing(&config);
        let mut machine = PostureMachine::new(config);

        assert!(machine.try_change_next_posture(&mut host, Posture::Stand, CheckLevel::CheckAll, &at(0.0)));
        assert!(!machine.is_transition_locked_out(0.0));
        assert_eq!(machine.previous(), Posture::Stand);
    }
}
