//! Process-wide audio-session surface
//!
//! Pass-through wrappers over the engine's session controls, plus the
//! persisted defaults applied at startup. Nothing here keeps per-handle
//! state; calls that a platform's engine does not expose are dropped.

use std::fs;
use std::path::PathBuf;

use serde::{ Deserialize, Serialize };

use crate::bridge::VolumeCallback;
use crate::system::SoundSystem;


/// Audio-session category understood by the engine.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize )]
pub enum SessionCategory {
    Ambient,
    SoloAmbient,
    Playback,
    PlayAndRecord,
    MultiRoute,
    Alarm,
}


/// Audio-session mode refining the category.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize )]
pub enum SessionMode {
    Default,
    VoiceChat,
    VideoChat,
    GameChat,
    VideoRecording,
    Measurement,
    MoviePlayback,
    SpokenAudio,
}


/// Enables or disables the engine process-wide.
pub fn enable( system: &SoundSystem, enabled: bool ) {
    tracing::info!( "Audio engine enabled: {}", enabled );
    system.bridge().enable( enabled );
}


/// Keeps playback audible under the ring/silent switch. Dropped where
/// the engine has no silence-mode override.
pub fn enable_in_silence_mode( system: &SoundSystem, enabled: bool ) {
    if system.platform().has_session_controls() {
        system.bridge().enable_in_silence_mode( enabled );
    }
}


/// Activates or deactivates the audio session.
pub fn set_active( system: &SoundSystem, active: bool ) {
    if system.platform().has_session_controls() {
        system.bridge().set_active( active );
    }
}


/// Sets the session category, optionally mixing with other apps'
/// audio. Dropped where the engine has no category control.
pub fn set_category( system: &SoundSystem, category: SessionCategory, mix_with_others: bool ) {
    if system.platform().has_session_category() {
        system.bridge().set_category( category, mix_with_others );
    }
}


/// Sets the session mode refining the category.
pub fn set_mode( system: &SoundSystem, mode: SessionMode ) {
    if system.platform().has_session_controls() {
        system.bridge().set_mode( mode );
    }
}


/// Routes session audio through the device speaker.
pub fn set_speaker_phone( system: &SoundSystem, on: bool ) {
    if system.platform().has_session_controls() {
        system.bridge().set_speaker_phone( on );
    }
}


/// Reads the device output volume; `done` receives a level in [0, 1].
/// Dropped where the engine does not report it.
pub fn system_volume( system: &SoundSystem, done: VolumeCallback ) {
    if system.platform().reports_system_volume() {
        system.bridge().system_volume( done );
    }
}


/// Writes the device output volume. Dropped where the engine does not
/// accept it.
pub fn set_system_volume( system: &SoundSystem, volume: f32 ) {
    if system.platform().accepts_system_volume() {
        system.bridge().set_system_volume( volume );
    }
}


/// Session defaults applied when the engine comes up.
#[derive( Debug, Clone, Serialize, Deserialize )]
#[serde( default )]
pub struct SessionConfig {
    /// Engine enabled process-wide.
    pub enabled: bool,

    /// Category applied at startup, where the platform has one.
    pub category: Option<SessionCategory>,

    /// Allow mixing with other apps' audio.
    pub mix_with_others: bool,

    /// Session mode refining the category.
    pub mode: Option<SessionMode>,

    /// Keep playing under the ring/silent switch.
    pub play_in_silence_mode: bool,

    /// Route session audio through the device speaker.
    pub speaker_phone: bool,
}


impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            category: None,
            mix_with_others: false,
            mode: None,
            play_in_silence_mode: false,
            speaker_phone: false,
        }
    }
}


impl SessionConfig {
    /// Returns the path to the config file.
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map( |p| p.join( "soundbridge" ).join( "session.json" ) )
    }


    /// Loads the persisted defaults, or built-ins if not found.
    pub fn load() -> Self {
        let path = match Self::config_path() {
            Some( p ) => p,
            None => return Self::default(),
        };

        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string( &path ) {
            Ok( contents ) => {
                serde_json::from_str( &contents ).unwrap_or_default()
            }
            Err( e ) => {
                tracing::warn!( "Failed to read session config: {}", e );
                Self::default()
            }
        }
    }


    /// Saves the defaults to disk.
    pub fn save( &self ) {
        let path = match Self::config_path() {
            Some( p ) => p,
            None => return,
        };

        // Create parent directory if needed
        if let Some( parent ) = path.parent() {
            if !parent.exists() {
                if let Err( e ) = fs::create_dir_all( parent ) {
                    tracing::warn!( "Failed to create config directory: {}", e );
                    return;
                }
            }
        }

        match serde_json::to_string_pretty( self ) {
            Ok( json ) => {
                if let Err( e ) = fs::write( &path, json ) {
                    tracing::warn!( "Failed to save session config: {}", e );
                }
            }
            Err( e ) => {
                tracing::warn!( "Failed to serialize session config: {}", e );
            }
        }
    }


    /// Pushes these defaults through the engine's session surface.
    pub fn apply( &self, system: &SoundSystem ) {
        enable( system, self.enabled );
        if let Some( category ) = self.category {
            set_category( system, category, self.mix_with_others );
        }
        if let Some( mode ) = self.mode {
            set_mode( system, mode );
        }
        if self.play_in_silence_mode {
            enable_in_silence_mode( system, true );
        }
        if self.speaker_phone {
            set_speaker_phone( system, true );
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: SessionConfig = serde_json::from_str( "{}" ).unwrap();
        assert!( config.enabled );
        assert!( config.category.is_none() );
        assert!( !config.mix_with_others );
    }


    #[test]
    fn test_config_round_trips() {
        let config = SessionConfig {
            enabled: true,
            category: Some( SessionCategory::Playback ),
            mix_with_others: true,
            mode: Some( SessionMode::SpokenAudio ),
            play_in_silence_mode: true,
            speaker_phone: false,
        };

        let json = serde_json::to_string( &config ).unwrap();
        let parsed: SessionConfig = serde_json::from_str( &json ).unwrap();
        assert_eq!( parsed.category, Some( SessionCategory::Playback ) );
        assert_eq!( parsed.mode, Some( SessionMode::SpokenAudio ) );
        assert!( parsed.play_in_silence_mode );
    }
}
