use bevy::prelude::*;

use crate::config::Config;

use super::PlayerMarker;

/// Everything the player can ask for. Continuous axes carry `None` when they are released so
/// they return to neutral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputCommand {
    Movement(Option<Vec2>),
    Jump,
    MirrorModeToggle,
    MirrorSelectNext,
    MirrorRotate(Option<f32>),
    Interact,
}

/// [`Component`] that latches input between [`Update`] and the next fixed tick.
///
/// Axes hold their latest value. One-shot commands stay set until a fixed-step system takes them,
/// so a press is never lost when several frames pass between ticks.
#[derive(Component, Debug, Default, Clone, PartialEq)]
pub struct PlayerInput {
    pub movement: Vec2,
    /// Counter-clockwise positive.
    pub rotation: f32,
    jump: bool,
    mode_toggle: bool,
    select_next: bool,
    interact: bool,
}

impl PlayerInput {
    pub fn apply(&mut self, command: InputCommand) {
        match command {
            InputCommand::Movement(movement) => self.movement = movement.unwrap_or_default(),
            InputCommand::MirrorRotate(rotation) => self.rotation = rotation.unwrap_or_default(),
            InputCommand::Jump => self.jump = true,
            InputCommand::MirrorModeToggle => self.mode_toggle = true,
            InputCommand::MirrorSelectNext => self.select_next = true,
            InputCommand::Interact => self.interact = true,
        }
    }

    pub fn take_jump(&mut self) -> bool {
        std::mem::take(&mut self.jump)
    }

    pub fn take_mode_toggle(&mut self) -> bool {
        std::mem::take(&mut self.mode_toggle)
    }

    pub fn take_select_next(&mut self) -> bool {
        std::mem::take(&mut self.select_next)
    }

    pub fn take_interact(&mut self) -> bool {
        std::mem::take(&mut self.interact)
    }
}

/// [`System`] that maps the configured keys to [`InputCommand`]s every frame.
pub fn read_keyboard_input(
    mut q_player: Query<&mut PlayerInput, With<PlayerMarker>>,
    keys: Res<ButtonInput<KeyCode>>,
    config: Res<Config>,
) {
    let Ok(mut input) = q_player.get_single_mut() else {
        return;
    };
    let controls = &config.controls_config;
    let axis = |positive: KeyCode, negative: KeyCode| {
        keys.pressed(positive) as i8 as f32 - keys.pressed(negative) as i8 as f32
    };

    let movement = Vec2::new(
        axis(controls.key_right, controls.key_left),
        axis(controls.key_up, controls.key_down),
    );
    input.apply(InputCommand::Movement(
        (movement != Vec2::ZERO).then_some(movement),
    ));

    let rotation = axis(controls.key_rotate_left, controls.key_rotate_right);
    input.apply(InputCommand::MirrorRotate((rotation != 0.).then_some(rotation)));

    for (key, command) in [
        (controls.key_jump, InputCommand::Jump),
        (controls.key_mirror_mode, InputCommand::MirrorModeToggle),
        (controls.key_mirror_next, InputCommand::MirrorSelectNext),
        (controls.key_interact, InputCommand::Interact),
    ] {
        if keys.just_pressed(key) {
            input.apply(command);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_axes_return_to_neutral() {
        let mut input = PlayerInput::default();
        input.apply(InputCommand::Movement(Some(Vec2::new(1., -1.))));
        input.apply(InputCommand::MirrorRotate(Some(-1.)));
        assert_eq!(input.movement, Vec2::new(1., -1.));
        assert_eq!(input.rotation, -1.);

        input.apply(InputCommand::Movement(None));
        input.apply(InputCommand::MirrorRotate(None));
        assert_eq!(input.movement, Vec2::ZERO);
        assert_eq!(input.rotation, 0.);
    }

    #[test]
    fn one_shot_commands_are_taken_once() {
        let mut input = PlayerInput::default();
        input.apply(InputCommand::Jump);
        input.apply(InputCommand::Interact);
        input.apply(InputCommand::Interact);

        assert!(input.take_jump());
        assert!(!input.take_jump());
        assert!(input.take_interact());
        assert!(!input.take_interact());
        assert!(!input.take_mode_toggle());
        assert!(!input.take_select_next());
    }

    #[test]
    fn keyboard_maps_to_commands() {
        let mut world = World::new();
        world.insert_resource(Config::default());
        let mut keys = ButtonInput::<KeyCode>::default();
        keys.press(KeyCode::KeyD);
        keys.press(KeyCode::KeyQ);
        keys.press(KeyCode::Tab);
        world.insert_resource(keys);
        let player = world
            .spawn((PlayerMarker, PlayerInput::default()))
            .id();

        let system = world.register_system(read_keyboard_input);
        world.run_system(system).unwrap();

        let mut input = world.get_mut::<PlayerInput>(player).unwrap();
        assert_eq!(input.movement, Vec2::X);
        assert_eq!(input.rotation, 1.);
        assert!(input.take_mode_toggle());
        assert!(!input.take_jump());
    }
}
