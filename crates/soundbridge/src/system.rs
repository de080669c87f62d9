//! Engine entry point
//!
//! Owns the shared bridge handle and hands out playback handles with
//! process-unique keys.

use std::sync::Arc;
use std::sync::atomic::{ AtomicU32, Ordering };

use thiserror::Error;
use tokio::runtime::Handle;

use crate::bridge::{ BridgeError, Directories, LoadOptions, NativeBridge, PreparedMetadata };
use crate::platform::Platform;
use crate::resolve::Source;
use crate::sound::Sound;


/// Errors that can occur while bringing the façade up.
#[derive( Debug, Error )]
pub enum SystemError {
    #[error( "No Tokio runtime available for play-change watchers" )]
    NoRuntime,
}


/// Shared entry point to one native engine.
pub struct SoundSystem {
    bridge: Arc<dyn NativeBridge>,
    platform: Platform,
    runtime: Handle,
    next_key: AtomicU32,
}


impl SoundSystem {
    /// Wraps an engine. Must be called inside a Tokio runtime; the
    /// handles' play-change watchers run on it.
    pub fn new( bridge: Arc<dyn NativeBridge> ) -> Result<Self, SystemError> {
        let runtime = Handle::try_current().map_err( |_| SystemError::NoRuntime )?;
        let platform = bridge.platform();

        tracing::info!( "Sound system up for {}", platform );

        Ok( Self {
            bridge,
            platform,
            runtime,
            next_key: AtomicU32::new( 0 ),
        })
    }


    /// Creates a handle and fires its async prepare request. `on_load`
    /// runs once, when the engine reports the outcome; metadata read
    /// before that stays at its unknown sentinel.
    pub fn load<F>( &self, source: Source, options: LoadOptions, on_load: F ) -> Sound
    where
        F: FnOnce( Result<PreparedMetadata, BridgeError> ) + Send + 'static,
    {
        let key = self.next_key.fetch_add( 1, Ordering::Relaxed );
        Sound::new(
            Arc::clone( &self.bridge ),
            self.platform,
            self.runtime.clone(),
            key,
            source,
            options,
            on_load,
        )
    }


    /// The platform family the engine drives.
    pub fn platform( &self ) -> Platform {
        self.platform
    }


    /// Engine-reported well-known directories.
    pub fn directories( &self ) -> Directories {
        self.bridge.directories()
    }


    pub(crate) fn bridge( &self ) -> &dyn NativeBridge {
        self.bridge.as_ref()
    }
}


#[cfg( test )]
mod tests {
    use super::*;

    use crate::bridge::NullBridge;


    #[tokio::test]
    async fn test_keys_are_assigned_monotonically() {
        let bridge = Arc::new( NullBridge::new( Platform::Ios ) );
        let system = SoundSystem::new( bridge ).unwrap();

        let first = system.load( Source::file( "a.mp3" ), LoadOptions::default(), |_| {} );
        let second = system.load( Source::file( "b.mp3" ), LoadOptions::default(), |_| {} );

        assert_eq!( first.key(), 0 );
        assert_eq!( second.key(), 1 );
    }


    #[test]
    fn test_construction_outside_a_runtime_fails() {
        let bridge = Arc::new( NullBridge::new( Platform::Ios ) );
        let result = SoundSystem::new( bridge );

        assert!( matches!( result, Err( SystemError::NoRuntime ) ) );
    }
}
