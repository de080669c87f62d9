//! Platform families recognized by the native layer
//!
//! Encodes which controls each platform's engine actually exposes, so
//! the handle can decide between forwarding, approximating, and caching.

use std::fmt;


/// Platform family reported by the native bridge.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum Platform {
    Ios,
    Android,
    Windows,
}


impl Platform {
    /// True when the engine looks sounds up by lower-cased,
    /// extension-less resource name instead of by file path.
    pub fn uses_asset_name_lookup( self ) -> bool {
        matches!( self, Platform::Android )
    }


    /// True when the engine has a native stereo pan control.
    pub fn has_native_pan( self ) -> bool {
        matches!( self, Platform::Ios )
    }


    /// True when the engine takes independent left/right volume levels.
    pub fn splits_channel_volume( self ) -> bool {
        matches!( self, Platform::Android )
    }


    /// True when the engine broadcasts play-state changes.
    pub fn emits_play_changes( self ) -> bool {
        !matches!( self, Platform::Windows )
    }


    /// True when the engine accepts a playback rate.
    pub fn has_native_speed( self ) -> bool {
        !matches!( self, Platform::Windows )
    }


    /// True when the engine accepts a pitch multiplier.
    pub fn has_native_pitch( self ) -> bool {
        matches!( self, Platform::Android )
    }


    /// True when the engine only understands looping as on/off rather
    /// than an exact repeat count.
    pub fn boolean_looping( self ) -> bool {
        matches!( self, Platform::Android | Platform::Windows )
    }


    /// True when the engine can rewind a player to its just-prepared
    /// state.
    pub fn has_reset( self ) -> bool {
        matches!( self, Platform::Android )
    }


    /// True when speaker routing is set per player rather than on the
    /// session.
    pub fn per_player_speakerphone( self ) -> bool {
        matches!( self, Platform::Android )
    }


    /// True when the engine exposes an audio-session category control.
    pub fn has_session_category( self ) -> bool {
        !matches!( self, Platform::Windows )
    }


    /// True when the engine exposes the full audio-session surface:
    /// active flag, mode, session-level speaker phone, silence-mode
    /// override.
    pub fn has_session_controls( self ) -> bool {
        matches!( self, Platform::Ios )
    }


    /// True when the engine reports the device output volume.
    pub fn reports_system_volume( self ) -> bool {
        !matches!( self, Platform::Windows )
    }


    /// True when the engine accepts writes to the device output volume.
    pub fn accepts_system_volume( self ) -> bool {
        matches!( self, Platform::Android )
    }
}


impl fmt::Display for Platform {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        match self {
            Platform::Ios => write!( f, "iOS" ),
            Platform::Android => write!( f, "Android" ),
            Platform::Windows => write!( f, "Windows" ),
        }
    }
}
