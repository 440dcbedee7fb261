use rkyv::{Archive, Deserialize, Serialize};

use crate::character::Character;
use crate::movement::Posture;
use crate::time::FrameTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub enum InputAction {
    Sprint,
    Crouch,
    Prone,
    WalkSlow,
    Fire,
    Aim,
    Reload,
    SwitchFireMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub enum InputKind {
    Enable,
    Disable,
    Toggle,
}

impl InputKind {
    /// Resolves the kind against the current on/off state.
    pub fn resolve(self, current: bool) -> bool {
        match self {
            Self::Enable => true,
            Self::Disable => false,
            Self::Toggle => !current,
        }
    }
}

/// Runs an action on a character. Returns whether it executed.
pub type InputDispatch = fn(&mut Character, InputKind, u32, &FrameTime) -> bool;

pub struct InputActionEntry {
    pub action: InputAction,
    pub dispatch: InputDispatch,
    /// Forward to the server when executed on a non-authoritative peer.
    pub send_to_server: bool,
}

pub static INPUT_ACTIONS: [InputActionEntry; 8] = [
    InputActionEntry {
        action: InputAction::Sprint,
        dispatch: sprint,
        send_to_server: true,
    },
    InputActionEntry {
        action: InputAction::Crouch,
        dispatch: crouch,
        send_to_server: true,
    },
    InputActionEntry {
        action: InputAction::Prone,
        dispatch: prone,
        send_to_server: true,
    },
    InputActionEntry {
        action: InputAction::WalkSlow,
        dispatch: walk_slow,
        send_to_server: false,
    },
    InputActionEntry {
        action: InputAction::Fire,
        dispatch: fire,
        send_to_server: true,
    },
    InputActionEntry {
        action: InputAction::Aim,
        dispatch: aim,
        send_to_server: true,
    },
    InputActionEntry {
        action: InputAction::Reload,
        dispatch: reload,
        send_to_server: true,
    },
    InputActionEntry {
        action: InputAction::SwitchFireMode,
        dispatch: switch_fire_mode,
        send_to_server: true,
    },
];

pub fn entry(action: InputAction) -> &'static InputActionEntry {
    let index = match action {
        InputAction::Sprint => 0,
        InputAction::Crouch => 1,
        InputAction::Prone => 2,
        InputAction::WalkSlow => 3,
        InputAction::Fire => 4,
        InputAction::Aim => 5,
        InputAction::Reload => 6,
        InputAction::SwitchFireMode => 7,
    };
    &INPUT_ACTIONS[index]
}

fn sprint(character: &mut Character, kind: InputKind, _seed: u32, time: &FrameTime) -> bool {
    let movement = character.movement_mut();
    let enabled = kind.resolve(movement.sprint().wants_sprint());
    movement.request_sprint(enabled, time);
    true
}

fn crouch(character: &mut Character, kind: InputKind, _seed: u32, time: &FrameTime) -> bool {
    request_posture(character, Posture::Crouch, kind, time)
}

fn prone(character: &mut Character, kind: InputKind, _seed: u32, time: &FrameTime) -> bool {
    request_posture(character, Posture::Prone, kind, time)
}

/// Enabling asks for `posture`, disabling from it asks to stand.
fn request_posture(
    character: &mut Character,
    posture: Posture,
    kind: InputKind,
    time: &FrameTime,
) -> bool {
    let movement = character.movement_mut();
    let active = movement.wanted_posture() == posture;
    let target = if kind.resolve(active) {
        posture
    } else if active {
        Posture::Stand
    } else {
        return false;
    };

    movement.request_posture(target, time);
    true
}

fn walk_slow(character: &mut Character, kind: InputKind, _seed: u32, time: &FrameTime) -> bool {
    let movement = character.movement_mut();
    let enabled = kind.resolve(movement.sprint().is_walking_slow());
    movement.set_walking_slow(enabled, time);
    true
}

fn fire(character: &mut Character, kind: InputKind, seed: u32, time: &FrameTime) -> bool {
    let gate = character.action_gate(time.now);
    let Some(weapon) = character.weapons_mut().equipped_mut() else {
        return false;
    };

    let firing = weapon.state() == crate::weapon::WeaponState::Firing;
    let executed = if kind.resolve(firing) {
        weapon.start_firing(gate, seed, time)
    } else {
        weapon.stop_firing(time)
    };

    if executed {
        character.notify_firing(!firing, seed);
    }
    executed
}

fn aim(character: &mut Character, kind: InputKind, _seed: u32, time: &FrameTime) -> bool {
    let Some(weapon) = character.weapons_mut().equipped_mut() else {
        return false;
    };
    let aiming = kind.resolve(weapon.is_aiming());
    weapon.set_aiming(aiming, time)
}

fn reload(character: &mut Character, kind: InputKind, _seed: u32, time: &FrameTime) -> bool {
    if kind == InputKind::Disable {
        return false;
    }
    let gate = character.action_gate(time.now);
    character
        .weapons_mut()
        .equipped_mut()
        .is_some_and(|weapon| weapon.reload(gate, time))
}

fn switch_fire_mode(
    character: &mut Character,
    kind: InputKind,
    _seed: u32,
    time: &FrameTime,
) -> bool {
    if kind == InputKind::Disable {
        return false;
    }
    let gate = character.action_gate(time.now);
    character
        .weapons_mut()
        .equipped_mut()
        .is_some_and(|weapon| weapon.switch_fire_mode(gate, time))
}
