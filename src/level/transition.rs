use std::time::Duration;

use bevy::{color::Alpha, prelude::*};
use bevy_ecs_ldtk::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::{
    player::PlayerMarker,
    shared::GameState,
    sound::{PlaySfxEvent, SoundEffect},
};

use super::{entity::FixedEntityBundle, LevelSystems};

/// How long the screen takes to fade to black, and back.
pub const FADE_DURATION: Duration = Duration::from_millis(500);

pub struct LevelTransitionPlugin;

impl Plugin for LevelTransitionPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<LoadLevelEvent>()
            .init_resource::<LevelTransition>()
            .register_ldtk_entity::<LevelSwitchBundle>("LevelSwitch")
            .add_systems(Startup, spawn_transition_overlay)
            .add_systems(
                FixedUpdate,
                detect_level_switch.in_set(LevelSystems::Simulation),
            )
            .add_systems(Update, (animate_transition, load_level).chain());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelTarget {
    /// Respawn the level the player is in.
    Reload,
    /// Switch to the LDtk level with this index.
    Index(usize),
}

/// Picks the target of a switch from its editor fields. A negative destination reloads.
pub fn level_target(restart: bool, destination: i32) -> LevelTarget {
    if restart {
        return LevelTarget::Reload;
    }
    match usize::try_from(destination) {
        Ok(index) => LevelTarget::Index(index),
        Err(_) => {
            warn!("Level switch with destination {}, reloading instead", destination);
            LevelTarget::Reload
        }
    }
}

/// Sent once the screen is fully black.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadLevelEvent(pub LevelTarget);

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSwitchTrigger {
    pub target: LevelTarget,
}

impl From<&EntityInstance> for LevelSwitchTrigger {
    fn from(entity_instance: &EntityInstance) -> Self {
        let restart = entity_instance
            .get_bool_field("restart")
            .copied()
            .unwrap_or(false);
        let destination = entity_instance
            .get_int_field("destination")
            .copied()
            .unwrap_or(-1);
        Self {
            target: level_target(restart, destination),
        }
    }
}

#[derive(Bundle, LdtkEntity)]
pub struct LevelSwitchBundle {
    #[from_entity_instance]
    fixed_entity_bundle: FixedEntityBundle,
    #[from_entity_instance]
    trigger: LevelSwitchTrigger,
    #[default]
    sensor: Sensor,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum TransitionPhase {
    #[default]
    Idle,
    FadingOut,
    FadingIn,
}

/// What happened during one [`LevelTransition::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStep {
    Idle,
    Running,
    /// The screen just turned black, load this level now.
    Load(LevelTarget),
    /// The screen is visible again.
    Finished,
}

/// [`Resource`] tracking the fade out, level load and fade in of a level switch.
#[derive(Resource, Debug, Default)]
pub struct LevelTransition {
    phase: TransitionPhase,
    elapsed: Duration,
    target: Option<LevelTarget>,
}

impl LevelTransition {
    /// Starts fading out towards `target`. Ignored while a transition is running.
    pub fn start(&mut self, target: LevelTarget) -> bool {
        if self.is_running() {
            return false;
        }
        self.phase = TransitionPhase::FadingOut;
        self.elapsed = Duration::ZERO;
        self.target = Some(target);
        true
    }

    pub fn is_running(&self) -> bool {
        self.phase != TransitionPhase::Idle
    }

    pub fn tick(&mut self, delta: Duration) -> TransitionStep {
        if self.phase == TransitionPhase::Idle {
            return TransitionStep::Idle;
        }
        self.elapsed += delta;
        if self.elapsed < FADE_DURATION {
            return TransitionStep::Running;
        }

        self.elapsed = Duration::ZERO;
        match self.phase {
            TransitionPhase::FadingOut => {
                self.phase = TransitionPhase::FadingIn;
                TransitionStep::Load(self.target.take().unwrap_or(LevelTarget::Reload))
            }
            _ => {
                self.phase = TransitionPhase::Idle;
                TransitionStep::Finished
            }
        }
    }

    /// Opacity of the black overlay.
    pub fn overlay_alpha(&self) -> f32 {
        let progress = (self.elapsed.as_secs_f32() / FADE_DURATION.as_secs_f32()).clamp(0., 1.);
        match self.phase {
            TransitionPhase::Idle => 0.,
            TransitionPhase::FadingOut => progress,
            TransitionPhase::FadingIn => 1. - progress,
        }
    }
}

/// Marker for the full screen node that covers the level during a transition.
#[derive(Component)]
pub struct TransitionOverlay;

fn spawn_transition_overlay(mut commands: Commands) {
    commands.spawn((
        Node {
            width: Val::Percent(100.),
            height: Val::Percent(100.),
            position_type: PositionType::Absolute,
            ..default()
        },
        BackgroundColor(Color::BLACK.with_alpha(0.)),
        GlobalZIndex(100),
        TransitionOverlay,
    ));
}

/// [`System`] that starts a transition when the player touches a [`LevelSwitchTrigger`].
pub fn detect_level_switch(
    rapier_context: Query<&RapierContext>,
    q_player: Query<Entity, With<PlayerMarker>>,
    q_switches: Query<(Entity, &LevelSwitchTrigger)>,
    mut transition: ResMut<LevelTransition>,
    mut next_state: ResMut<NextState<GameState>>,
    mut ev_sfx: EventWriter<PlaySfxEvent>,
) {
    let Ok(rapier_context) = rapier_context.get_single() else {
        return;
    };
    let Ok(player) = q_player.get_single() else {
        return;
    };

    for (switch, trigger) in q_switches.iter() {
        if rapier_context.intersection_pair(player, switch) != Some(true) {
            continue;
        }
        if transition.start(trigger.target) {
            info!("Level switch to {:?}", trigger.target);
            next_state.set(GameState::Transition);
            ev_sfx.send(PlaySfxEvent(SoundEffect::LevelTransition));
        }
        break;
    }
}

pub fn animate_transition(
    time: Res<Time>,
    mut transition: ResMut<LevelTransition>,
    mut q_overlay: Query<&mut BackgroundColor, With<TransitionOverlay>>,
    mut next_state: ResMut<NextState<GameState>>,
    mut ev_load: EventWriter<LoadLevelEvent>,
) {
    match transition.tick(time.delta()) {
        TransitionStep::Idle => return,
        TransitionStep::Running => (),
        TransitionStep::Load(target) => {
            ev_load.send(LoadLevelEvent(target));
        }
        TransitionStep::Finished => next_state.set(GameState::Playing),
    }
    for mut overlay in q_overlay.iter_mut() {
        overlay.0 = Color::BLACK.with_alpha(transition.overlay_alpha());
    }
}

pub fn load_level(
    mut commands: Commands,
    mut ev_load: EventReader<LoadLevelEvent>,
    q_levels: Query<Entity, With<LevelIid>>,
    mut level_selection: ResMut<LevelSelection>,
) {
    for LoadLevelEvent(target) in ev_load.read() {
        match *target {
            LevelTarget::Reload => {
                for level in q_levels.iter() {
                    commands.entity(level).insert(Respawn);
                }
            }
            LevelTarget::Index(index) => *level_selection = LevelSelection::index(index),
        }
    }
}
