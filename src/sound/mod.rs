use bevy::{
    audio::{PlaybackMode, Volume},
    prelude::*,
};
use enum_map::{Enum, EnumMap};
use rand::Rng;

pub struct SoundPlugin;

impl Plugin for SoundPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SfxHandles>()
            .init_resource::<BgmTracks>()
            .add_event::<PlaySfxEvent>()
            .add_systems(Update, (play_sfx, cycle_bgm));
    }
}

/// Every one-shot sound the game can play.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    MirrorActivated,
    MirrorDeactivated,
    DuplicatingEnabled,
    DuplicatingDisabled,
    Jump,
    LevelTransition,
}

impl SoundEffect {
    pub fn path(self) -> &'static str {
        match self {
            SoundEffect::MirrorActivated => "sfx/mirror_on.wav",
            SoundEffect::MirrorDeactivated => "sfx/mirror_off.wav",
            SoundEffect::DuplicatingEnabled => "sfx/duplicate_on.wav",
            SoundEffect::DuplicatingDisabled => "sfx/duplicate_off.wav",
            SoundEffect::Jump => "sfx/jump.wav",
            SoundEffect::LevelTransition => "sfx/transition.wav",
        }
    }
}

#[derive(Resource)]
pub struct SfxHandles(EnumMap<SoundEffect, Handle<AudioSource>>);

impl FromWorld for SfxHandles {
    fn from_world(world: &mut World) -> Self {
        let asset_server = world.resource::<AssetServer>();
        Self(EnumMap::from_fn(|effect: SoundEffect| {
            asset_server.load(effect.path())
        }))
    }
}

/// Plays a one-shot [`SoundEffect`].
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaySfxEvent(pub SoundEffect);

pub const SFX_VOLUME: f32 = 0.6;

pub fn play_sfx(
    mut commands: Commands,
    mut ev_play_sfx: EventReader<PlaySfxEvent>,
    handles: Res<SfxHandles>,
) {
    for PlaySfxEvent(effect) in ev_play_sfx.read() {
        commands.spawn((
            AudioPlayer::new(handles.0[*effect].clone()),
            PlaybackSettings {
                mode: PlaybackMode::Despawn,
                volume: Volume::new(SFX_VOLUME),
                ..default()
            },
        ));
    }
}

#[derive(Component, Default)]
pub struct BgmMarker;

#[derive(Resource)]
pub struct BgmTracks(Vec<Handle<AudioSource>>);

impl FromWorld for BgmTracks {
    fn from_world(world: &mut World) -> Self {
        let asset_server = world.resource::<AssetServer>();
        Self(vec![
            asset_server.load("music/reflections.mp3"),
            asset_server.load("music/glasswork.mp3"),
            asset_server.load("music/still_water.mp3"),
        ])
    }
}

pub const BGM_VOLUME: f32 = 0.8;

/// Starts a new random track whenever the previous one has finished.
pub fn cycle_bgm(
    mut commands: Commands,
    q_playing: Query<(), With<BgmMarker>>,
    tracks: Res<BgmTracks>,
    mut previous: Local<Option<usize>>,
) {
    if !q_playing.is_empty() {
        return;
    }
    let Some(index) = next_track(&mut rand::rng(), tracks.0.len(), *previous) else {
        return;
    };
    debug!("Playing bgm track {}", index);

    *previous = Some(index);
    commands.spawn((
        AudioPlayer::new(tracks.0[index].clone()),
        PlaybackSettings {
            mode: PlaybackMode::Despawn,
            volume: Volume::new(BGM_VOLUME),
            ..default()
        },
        BgmMarker,
    ));
}

/// Picks a random track out of `count`, never repeating `previous` unless it is the only one.
pub fn next_track(rng: &mut impl Rng, count: usize, previous: Option<usize>) -> Option<usize> {
    match (count, previous) {
        (0, _) => None,
        (1, _) => Some(0),
        (_, Some(previous)) if previous < count => {
            let pick = rng.random_range(0..count - 1);
            Some(if pick >= previous { pick + 1 } else { pick })
        }
        _ => Some(rng.random_range(0..count)),
    }
}
