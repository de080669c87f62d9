//! Native bridge contract
//!
//! The opaque boundary to the platform sound engine. Everything behind
//! this trait is outside the crate: implementations wrap an
//! AVAudioPlayer-, MediaPlayer-, or Windows-media-backed engine and run
//! the completion callbacks from their own threads.

use std::path::PathBuf;

use serde::{ Deserialize, Serialize };
use thiserror::Error;
use tokio::sync::broadcast;

use crate::platform::Platform;
use crate::session::{ SessionCategory, SessionMode };


/// Identity of one prepared player inside the engine.
pub type SoundKey = u32;


/// Completion callback for `prepare`.
pub type PrepareCallback = Box<dyn FnOnce( Result<PreparedMetadata, BridgeError> ) + Send + 'static>;

/// Completion callback for `play`; receives true when the clip finished.
pub type EndCallback = Box<dyn FnOnce( bool ) + Send + 'static>;

/// Completion callback for position reads, in seconds.
pub type PositionCallback = Box<dyn FnOnce( f64 ) + Send + 'static>;

/// Completion callback for system-volume reads.
pub type VolumeCallback = Box<dyn FnOnce( f32 ) + Send + 'static>;


/// Metadata the engine reports once a prepare completes.
#[derive( Debug, Clone, Copy, Default, PartialEq )]
pub struct PreparedMetadata {
    /// Clip length in seconds, when the engine knows it.
    pub duration: Option<f64>,

    /// Channel count, when the engine knows it.
    pub channels: Option<u16>,
}


/// Options handed to the engine alongside a prepare call.
#[derive( Debug, Clone, Default, PartialEq, Serialize, Deserialize )]
#[serde( default )]
pub struct LoadOptions {
    /// Route playback through the device speaker even when a headset
    /// is attached.
    pub speaker_phone: bool,

    /// Session category to apply before the engine opens the source.
    pub category: Option<SessionCategory>,
}


/// One play-state transition broadcast by the engine.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub struct PlayChange {
    pub key: SoundKey,
    pub is_playing: bool,
}


/// Well-known directories reported by the engine, where the platform
/// has them.
#[derive( Debug, Clone, Default, PartialEq, Eq )]
pub struct Directories {
    pub main_bundle: Option<PathBuf>,
    pub documents: Option<PathBuf>,
    pub library: Option<PathBuf>,
    pub caches: Option<PathBuf>,
}


/// Errors surfaced by the engine.
#[derive( Debug, Clone, PartialEq, Eq, Error )]
pub enum BridgeError {
    #[error( "Failed to load {path}: {reason}" )]
    Load { path: String, reason: String },

    #[error( "No player registered for key {0}" )]
    UnknownKey( SoundKey ),

    #[error( "Engine unavailable: {0}" )]
    Unavailable( String ),
}


/// Contract between playback handles and the platform engine.
///
/// Every call is non-blocking; completions arrive through the boxed
/// callbacks, on whatever thread the engine runs them. No ordering is
/// guaranteed between calls issued before a prepare completes.
pub trait NativeBridge: Send + Sync {
    /// Which platform family this engine drives.
    fn platform( &self ) -> Platform;

    /// Opens `path` under `key` and reports metadata when done.
    fn prepare( &self, key: SoundKey, path: &str, options: &LoadOptions, done: PrepareCallback );

    /// Starts playback; `on_end` fires when the clip finishes.
    fn play( &self, key: SoundKey, on_end: EndCallback );

    fn pause( &self, key: SoundKey );

    fn stop( &self, key: SoundKey );

    /// Rewinds the player to its just-prepared state. Android-family
    /// engines only.
    fn reset( &self, key: SoundKey );

    /// Frees the native player behind `key`.
    fn release( &self, key: SoundKey );

    /// Single-value volume, for engines without per-channel control.
    fn set_volume( &self, key: SoundKey, volume: f32 );

    /// Independent left/right levels, for engines with per-channel
    /// control.
    fn set_channel_volumes( &self, key: SoundKey, left: f32, right: f32 );

    /// Native stereo pan in [-1, 1].
    fn set_pan( &self, key: SoundKey, pan: f32 );

    /// On/off looping.
    fn set_looping( &self, key: SoundKey, looping: bool );

    /// Exact repeat count; -1 loops forever.
    fn set_loop_count( &self, key: SoundKey, count: i32 );

    fn set_speed( &self, key: SoundKey, speed: f32 );

    fn set_pitch( &self, key: SoundKey, pitch: f32 );

    /// Reads the playback position in seconds.
    fn current_position( &self, key: SoundKey, done: PositionCallback );

    /// Jumps to `seconds`.
    fn seek_to( &self, key: SoundKey, seconds: f64 );

    /// Per-player speaker routing.
    fn set_speakerphone_on( &self, key: SoundKey, on: bool );

    // Process-wide session surface.

    fn enable( &self, enabled: bool );

    fn enable_in_silence_mode( &self, enabled: bool );

    fn set_active( &self, active: bool );

    fn set_category( &self, category: SessionCategory, mix_with_others: bool );

    fn set_mode( &self, mode: SessionMode );

    fn set_speaker_phone( &self, on: bool );

    fn system_volume( &self, done: VolumeCallback );

    fn set_system_volume( &self, volume: f32 );

    /// Engine-reported well-known paths.
    fn directories( &self ) -> Directories;

    /// Subscribes to the engine's play-state broadcast. Every handle
    /// receives every event and filters by key.
    fn play_changes( &self ) -> broadcast::Receiver<PlayChange>;
}


/// Inert engine for headless use: accepts every call, reports an
/// immediate successful prepare with no metadata, never broadcasts a
/// play change.
pub struct NullBridge {
    platform: Platform,
    play_changes: broadcast::Sender<PlayChange>,
}


impl NullBridge {
    pub fn new( platform: Platform ) -> Self {
        let ( play_changes, _ ) = broadcast::channel( 16 );
        Self { platform, play_changes }
    }
}


impl NativeBridge for NullBridge {
    fn platform( &self ) -> Platform {
        self.platform
    }


    fn prepare( &self, key: SoundKey, path: &str, _options: &LoadOptions, done: PrepareCallback ) {
        tracing::debug!( "NullBridge: prepare {} as {}", path, key );
        done( Ok( PreparedMetadata::default() ) );
    }


    fn play( &self, key: SoundKey, on_end: EndCallback ) {
        tracing::debug!( "NullBridge: play {}", key );
        on_end( true );
    }


    fn pause( &self, _key: SoundKey ) {}


    fn stop( &self, _key: SoundKey ) {}


    fn reset( &self, _key: SoundKey ) {}


    fn release( &self, key: SoundKey ) {
        tracing::debug!( "NullBridge: release {}", key );
    }


    fn set_volume( &self, _key: SoundKey, _volume: f32 ) {}


    fn set_channel_volumes( &self, _key: SoundKey, _left: f32, _right: f32 ) {}


    fn set_pan( &self, _key: SoundKey, _pan: f32 ) {}


    fn set_looping( &self, _key: SoundKey, _looping: bool ) {}


    fn set_loop_count( &self, _key: SoundKey, _count: i32 ) {}


    fn set_speed( &self, _key: SoundKey, _speed: f32 ) {}


    fn set_pitch( &self, _key: SoundKey, _pitch: f32 ) {}


    fn current_position( &self, _key: SoundKey, done: PositionCallback ) {
        done( 0.0 );
    }


    fn seek_to( &self, _key: SoundKey, _seconds: f64 ) {}


    fn set_speakerphone_on( &self, _key: SoundKey, _on: bool ) {}


    fn enable( &self, _enabled: bool ) {}


    fn enable_in_silence_mode( &self, _enabled: bool ) {}


    fn set_active( &self, _active: bool ) {}


    fn set_category( &self, _category: SessionCategory, _mix_with_others: bool ) {}


    fn set_mode( &self, _mode: SessionMode ) {}


    fn set_speaker_phone( &self, _on: bool ) {}


    fn system_volume( &self, done: VolumeCallback ) {
        done( 1.0 );
    }


    fn set_system_volume( &self, _volume: f32 ) {}


    fn directories( &self ) -> Directories {
        Directories::default()
    }


    fn play_changes( &self ) -> broadcast::Receiver<PlayChange> {
        self.play_changes.subscribe()
    }
}
