use bevy::prelude::*;

use crate::{
    config::{Config, MirrorControlConfig},
    level::mirror::{DuplicateAnchor, Mirror, SetMirrorActivationEvent, ToggleMirrorModeEvent},
    session::{GameSession, MirrorRegistry},
};

use super::{input::PlayerInput, PlayerMarker};

/// The player either walks around ([`ControlMode::Direct`]) or steers one of the level's mirrors
/// ([`ControlMode::MirrorRemote`]).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    #[default]
    Direct,
    MirrorRemote,
}

/// The mirrors whose activation changes when the selection moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChange {
    pub leaving: Option<Entity>,
    pub entering: Entity,
}

/// [`Component`] holding the control state of the player.
#[derive(Component, Debug, Default, Clone)]
pub struct PlayerController {
    control_mode: ControlMode,
    /// Index into the [`MirrorRegistry`], only meaningful in [`ControlMode::MirrorRemote`].
    selected_mirror: usize,
    pending_mirror_velocity: Vec2,
    pending_mirror_angular_velocity: f32,
    pub grounded: bool,
    /// What the ground probe hit last tick.
    pub ground: Option<Entity>,
    pub submerged: bool,
}

impl PlayerController {
    pub fn control_mode(&self) -> ControlMode {
        self.control_mode
    }

    pub fn selected_index(&self) -> usize {
        self.selected_mirror
    }

    pub fn pending_mirror_velocity(&self) -> Vec2 {
        self.pending_mirror_velocity
    }

    pub fn pending_mirror_angular_velocity(&self) -> f32 {
        self.pending_mirror_angular_velocity
    }

    /// The mirror being steered, if any.
    pub fn selected(&self, registry: &MirrorRegistry) -> Option<Entity> {
        match self.control_mode {
            ControlMode::Direct => None,
            ControlMode::MirrorRemote => registry.get(self.selected_mirror),
        }
    }

    /// Flips the control mode and returns the activation change for the selected mirror.
    /// Entering mirror control without any mirror in the registry does nothing.
    pub fn toggle_mode(&mut self, registry: &MirrorRegistry) -> Option<SetMirrorActivationEvent> {
        self.reset_mirror_command();
        match self.control_mode {
            ControlMode::Direct => {
                if registry.is_empty() {
                    return None;
                }
                if self.selected_mirror >= registry.len() {
                    self.selected_mirror = 0;
                }
                self.control_mode = ControlMode::MirrorRemote;
                registry
                    .get(self.selected_mirror)
                    .map(|mirror| SetMirrorActivationEvent {
                        mirror,
                        active: true,
                    })
            }
            ControlMode::MirrorRemote => {
                self.control_mode = ControlMode::Direct;
                registry
                    .get(self.selected_mirror)
                    .map(|mirror| SetMirrorActivationEvent {
                        mirror,
                        active: false,
                    })
            }
        }
    }

    /// Moves the selection to the next mirror, wrapping around. Only in mirror control.
    pub fn select_next(&mut self, registry: &MirrorRegistry) -> Option<SelectionChange> {
        if self.control_mode != ControlMode::MirrorRemote {
            return None;
        }
        let next = registry.next_index(self.selected_mirror)?;
        let leaving = registry.get(self.selected_mirror);
        self.selected_mirror = next;
        self.reset_mirror_command();
        Some(SelectionChange {
            leaving,
            entering: registry.get(next)?,
        })
    }

    /// Returns the command to apply to the selected mirror this tick, then feeds in the current
    /// input. Without input the command decays by the damping factors instead of stopping.
    pub fn advance_mirror_command(
        &mut self,
        movement: Vec2,
        rotation: f32,
        config: &MirrorControlConfig,
    ) -> (Vec2, f32) {
        let command = (
            self.pending_mirror_velocity,
            self.pending_mirror_angular_velocity,
        );

        self.pending_mirror_velocity = if movement != Vec2::ZERO {
            movement * config.move_speed
        } else {
            self.pending_mirror_velocity * config.movement_damping
        };
        self.pending_mirror_angular_velocity = if rotation != 0. {
            rotation * config.rotation_speed
        } else {
            self.pending_mirror_angular_velocity * config.rotation_damping
        };

        command
    }

    fn reset_mirror_command(&mut self) {
        self.pending_mirror_velocity = Vec2::ZERO;
        self.pending_mirror_angular_velocity = 0.;
    }
}

/// [`System`] that turns the latched one-shot input into mode changes and mirror events.
pub fn handle_control_commands(
    mut q_player: Query<(&mut PlayerController, &mut PlayerInput), With<PlayerMarker>>,
    session: Res<GameSession>,
    mut ev_activation: EventWriter<SetMirrorActivationEvent>,
    mut ev_toggle: EventWriter<ToggleMirrorModeEvent>,
) {
    let Ok((mut controller, mut input)) = q_player.get_single_mut() else {
        return;
    };
    let registry = session.mirrors();

    if input.take_mode_toggle() {
        if let Some(activation) = controller.toggle_mode(registry) {
            ev_activation.send(activation);
        }
        info!("Control mode: {:?}", controller.control_mode());
    }

    if input.take_select_next() {
        if let Some(change) = controller.select_next(registry) {
            if let Some(leaving) = change.leaving {
                ev_activation.send(SetMirrorActivationEvent {
                    mirror: leaving,
                    active: false,
                });
            }
            ev_activation.send(SetMirrorActivationEvent {
                mirror: change.entering,
                active: true,
            });
        }
    }

    if input.take_interact() {
        if let Some(mirror) = controller.selected(registry) {
            ev_toggle.send(ToggleMirrorModeEvent(mirror));
        }
    }
}

/// [`System`] that applies the damped movement and rotation commands to the selected mirror.
pub fn drive_selected_mirror(
    mut q_player: Query<(&mut PlayerController, &PlayerInput), With<PlayerMarker>>,
    mut q_mirrors: Query<(&mut Mirror, &mut Transform)>,
    mut q_anchors: Query<&mut Transform, (With<DuplicateAnchor>, Without<Mirror>)>,
    session: Res<GameSession>,
    config: Res<Config>,
) {
    let Ok((mut controller, input)) = q_player.get_single_mut() else {
        return;
    };
    let Some(selected) = controller.selected(session.mirrors()) else {
        return;
    };
    let (velocity, angular_velocity) = controller.advance_mirror_command(
        input.movement,
        input.rotation,
        &config.mirror_control_config,
    );

    let Ok((mut mirror, mut transform)) = q_mirrors.get_mut(selected) else {
        return;
    };
    mirror.translate(&mut transform, velocity);
    let mut anchor = mirror
        .anchor()
        .and_then(|anchor| q_anchors.get_mut(anchor).ok());
    mirror.rotate(&mut transform, anchor.as_deref_mut(), angular_velocity);
}
