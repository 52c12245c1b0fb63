use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Labels used for rapier_2d [`CollisionGroups`]
pub struct GroupLabel;

impl GroupLabel {
    pub const PLAYER_COLLIDER: Group = Group::GROUP_1;
    pub const PLAYER_SENSOR: Group = Group::GROUP_2;
    pub const TERRAIN: Group = Group::GROUP_3;
    pub const WATER: Group = Group::GROUP_4;
    /// Dynamic bodies a mirror may duplicate.
    pub const BODY: Group = Group::GROUP_5;
    /// Clones spawned by a duplicating mirror.
    pub const DUPLICATE: Group = Group::GROUP_6;
    pub const MIRROR: Group = Group::GROUP_7;
    pub const TRIGGER: Group = Group::GROUP_8;
    pub const ALL: Group = Group::from_bits_truncate(!0);
}

#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash)]
pub enum GameState {
    #[default]
    Playing,
    /// A level switch animation is running; gameplay input is ignored.
    Transition,
}
