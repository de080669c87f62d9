//! Playback handle
//!
//! One prepared sound inside the native engine, mirrored into a local
//! handle: the engine owns the audio, the handle owns the key, the
//! resolved path, and a cache of the last pushed parameters.

use std::sync::{ Arc, Mutex, RwLock };
use std::sync::atomic::{ AtomicBool, Ordering };

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::bridge::{ BridgeError, LoadOptions, NativeBridge, PrepareCallback, PreparedMetadata, SoundKey };
use crate::platform::Platform;
use crate::resolve::Source;


/// Errors a handle can raise synchronously.
#[derive( Debug, PartialEq, Eq, Error )]
pub enum SoundError {
    #[error( "Stereo pan is not supported on {0}" )]
    PanUnsupported( Platform ),
}


/// Playback parameters cached locally and forwarded while loaded.
#[derive( Debug, Clone, Copy )]
struct Params {
    volume: f32,
    pan: f32,
    loop_count: i32,
    speed: f32,
    pitch: f32,
}


impl Default for Params {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pan: 0.0,
            loop_count: 0,
            speed: 1.0,
            pitch: 1.0,
        }
    }
}


/// State shared between the handle, the prepare callback, and the
/// play-change watcher task.
struct Shared {
    loaded: AtomicBool,
    playing: AtomicBool,
    /// Seconds; -1.0 until the engine reports it.
    duration: RwLock<f64>,
    /// -1 until the engine reports it.
    channels: RwLock<i32>,
    params: RwLock<Params>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}


/// Handle to one sound inside the native engine.
///
/// Created through [`crate::SoundSystem::load`], which fires the async
/// prepare request. Until the load callback reports success every
/// operation is a local no-op; mutators still cache their value and the
/// getters reflect it immediately. Cleanup is manual: call
/// [`Sound::release`] when done, or the native player and the
/// play-change subscription leak.
pub struct Sound {
    key: SoundKey,
    filename: String,
    platform: Platform,
    bridge: Arc<dyn NativeBridge>,
    shared: Arc<Shared>,
}


impl Sound {
    pub(crate) fn new<F>(
        bridge: Arc<dyn NativeBridge>,
        platform: Platform,
        runtime: Handle,
        key: SoundKey,
        source: Source,
        options: LoadOptions,
        on_load: F,
    ) -> Self
    where
        F: FnOnce( Result<PreparedMetadata, BridgeError> ) + Send + 'static,
    {
        let filename = source.resolve( platform );

        let shared = Arc::new( Shared {
            loaded: AtomicBool::new( false ),
            playing: AtomicBool::new( false ),
            duration: RwLock::new( -1.0 ),
            channels: RwLock::new( -1 ),
            params: RwLock::new( Params::default() ),
            watcher: Mutex::new( None ),
        });

        tracing::info!( "Preparing sound {} from {}", key, filename );

        let callback_shared = Arc::clone( &shared );
        let callback_bridge = Arc::clone( &bridge );
        let done: PrepareCallback = Box::new( move |result| {
            match &result {
                Ok( metadata ) => {
                    if let Some( duration ) = metadata.duration {
                        *callback_shared.duration.write().unwrap() = duration;
                    }
                    if let Some( channels ) = metadata.channels {
                        *callback_shared.channels.write().unwrap() = channels as i32;
                    }
                    callback_shared.loaded.store( true, Ordering::Release );
                    if platform.emits_play_changes() {
                        Self::watch_play_changes( &runtime, &callback_bridge, key, &callback_shared );
                    }
                    tracing::info!( "Sound {} loaded", key );
                }
                Err( e ) => {
                    tracing::warn!( "Sound {} failed to load: {}", key, e );
                }
            }
            on_load( result );
        });

        bridge.prepare( key, &filename, &options, done );

        Self {
            key,
            filename,
            platform,
            bridge,
            shared,
        }
    }


    /// Spawns the task that mirrors the engine's play-state broadcast
    /// into the local playing flag.
    fn watch_play_changes(
        runtime: &Handle,
        bridge: &Arc<dyn NativeBridge>,
        key: SoundKey,
        shared: &Arc<Shared>,
    ) {
        let mut watcher = shared.watcher.lock().unwrap();
        if watcher.is_some() {
            tracing::warn!( "Play-change watcher for sound {} is already registered", key );
            return;
        }

        let mut rx = bridge.play_changes();
        let task_shared = Arc::clone( shared );
        *watcher = Some( runtime.spawn( async move {
            loop {
                match rx.recv().await {
                    Ok( change ) => {
                        if change.key == key {
                            task_shared.playing.store( change.is_playing, Ordering::Release );
                        }
                    }
                    // A lagged receiver resumes at the oldest retained
                    // event; the next transition for this key resyncs
                    // the flag.
                    Err( RecvError::Lagged( skipped ) ) => {
                        tracing::debug!( "Sound {} play-change stream lagged by {}", key, skipped );
                    }
                    Err( RecvError::Closed ) => break,
                }
            }
        }));
    }


    /// The identity keying native calls for this handle.
    pub fn key( &self ) -> SoundKey {
        self.key
    }


    /// The resolved path handed to the engine.
    pub fn filename( &self ) -> &str {
        &self.filename
    }


    /// True once the engine reported a successful prepare.
    pub fn is_loaded( &self ) -> bool {
        self.shared.loaded.load( Ordering::Acquire )
    }


    /// True while the engine reports this sound as playing.
    pub fn is_playing( &self ) -> bool {
        self.shared.playing.load( Ordering::Acquire )
    }


    /// Clip length in seconds; -1.0 until the engine has reported it.
    pub fn duration( &self ) -> f64 {
        *self.shared.duration.read().unwrap()
    }


    /// Channel count; -1 until the engine has reported it.
    pub fn number_of_channels( &self ) -> i32 {
        *self.shared.channels.read().unwrap()
    }


    /// Starts playback. `on_end` fires with true when the clip
    /// finishes, or immediately with false when the handle never
    /// loaded. The playing flag follows the engine's broadcast rather
    /// than this call.
    pub fn play<F>( &self, on_end: F )
    where
        F: FnOnce( bool ) + Send + 'static,
    {
        if !self.is_loaded() {
            on_end( false );
            return;
        }
        tracing::debug!( "Playing sound {}", self.key );
        self.bridge.play( self.key, Box::new( on_end ) );
    }


    /// Pauses playback. The playing flag clears immediately; the
    /// engine catches up on its own time.
    pub fn pause( &self ) {
        if self.is_loaded() {
            self.shared.playing.store( false, Ordering::Release );
            self.bridge.pause( self.key );
        }
    }


    /// Stops playback.
    pub fn stop( &self ) {
        if self.is_loaded() {
            self.shared.playing.store( false, Ordering::Release );
            self.bridge.stop( self.key );
        }
    }


    /// Rewinds the player to its just-prepared state, where the engine
    /// supports it; a no-op elsewhere.
    pub fn reset( &self ) {
        if self.is_loaded() && self.platform.has_reset() {
            self.shared.playing.store( false, Ordering::Release );
            self.bridge.reset( self.key );
        }
    }


    /// Frees the native player and detaches the play-change watcher.
    /// The handle is permanently unloaded afterwards; every further
    /// call is a local no-op.
    pub fn release( &self ) {
        if !self.is_loaded() {
            return;
        }
        self.shared.loaded.store( false, Ordering::Release );
        self.bridge.release( self.key );
        if let Some( watcher ) = self.shared.watcher.lock().unwrap().take() {
            watcher.abort();
        }
        tracing::info!( "Sound {} released", self.key );
    }


    /// Nominal volume as last set locally.
    pub fn volume( &self ) -> f32 {
        self.shared.params.read().unwrap().volume
    }


    /// Sets the nominal volume (0.0 mute, 1.0 full). Cached locally
    /// always; forwarded while loaded, as split channel levels where
    /// the engine wants them.
    pub fn set_volume( &self, volume: f32 ) {
        self.shared.params.write().unwrap().volume = volume;
        if self.is_loaded() {
            if self.platform.splits_channel_volume() {
                self.forward_channel_volumes();
            } else {
                self.bridge.set_volume( self.key, volume );
            }
        }
    }


    /// Stereo pan as last set locally.
    pub fn pan( &self ) -> f32 {
        self.shared.params.read().unwrap().pan
    }


    /// Sets the stereo pan in [-1, 1]; negative favors the left
    /// channel. Cached locally always. While loaded: native pan where
    /// the engine has one, a left/right volume approximation where it
    /// takes split levels, and an error where it has neither.
    pub fn set_pan( &self, pan: f32 ) -> Result<(), SoundError> {
        self.shared.params.write().unwrap().pan = pan;
        if self.is_loaded() {
            if self.platform.has_native_pan() {
                self.bridge.set_pan( self.key, pan );
            } else if self.platform.splits_channel_volume() {
                self.forward_channel_volumes();
            } else {
                return Err( SoundError::PanUnsupported( self.platform ) );
            }
        }
        Ok(())
    }


    /// Pushes the cached volume and pan as left/right channel levels.
    /// The louder channel keeps the nominal volume; the quieter one is
    /// scaled by how far the pan points away from it.
    fn forward_channel_volumes( &self ) {
        let ( volume, pan ) = {
            let params = self.shared.params.read().unwrap();
            ( params.volume, params.pan )
        };

        if pan == 0.0 {
            self.bridge.set_channel_volumes( self.key, volume, volume );
        } else if pan < 0.0 {
            self.bridge.set_channel_volumes( self.key, volume, relative_volume( volume, pan ) );
        } else {
            self.bridge.set_channel_volumes( self.key, relative_volume( volume, pan ), volume );
        }
    }


    /// Repeat count as last set locally; -1 loops forever, 0 plays
    /// once.
    pub fn number_of_loops( &self ) -> i32 {
        self.shared.params.read().unwrap().loop_count
    }


    /// Sets the repeat count. Engines that only understand on/off
    /// looping receive `count != 0`.
    pub fn set_number_of_loops( &self, count: i32 ) {
        self.shared.params.write().unwrap().loop_count = count;
        if self.is_loaded() {
            if self.platform.boolean_looping() {
                self.bridge.set_looping( self.key, count != 0 );
            } else {
                self.bridge.set_loop_count( self.key, count );
            }
        }
    }


    /// Playback rate as last set locally.
    pub fn speed( &self ) -> f32 {
        self.shared.params.read().unwrap().speed
    }


    /// Sets the playback rate. Engines without a rate control keep the
    /// cached value only.
    pub fn set_speed( &self, speed: f32 ) {
        self.shared.params.write().unwrap().speed = speed;
        if self.is_loaded() && self.platform.has_native_speed() {
            self.bridge.set_speed( self.key, speed );
        }
    }


    /// Pitch multiplier as last set locally.
    pub fn pitch( &self ) -> f32 {
        self.shared.params.read().unwrap().pitch
    }


    /// Sets the pitch multiplier. Forwarded only where the engine has
    /// a pitch control.
    pub fn set_pitch( &self, pitch: f32 ) {
        self.shared.params.write().unwrap().pitch = pitch;
        if self.is_loaded() && self.platform.has_native_pitch() {
            self.bridge.set_pitch( self.key, pitch );
        }
    }


    /// Reads the playback position; `done` receives seconds. Unloaded
    /// handles never invoke the callback.
    pub fn current_time<F>( &self, done: F )
    where
        F: FnOnce( f64 ) + Send + 'static,
    {
        if self.is_loaded() {
            self.bridge.current_position( self.key, Box::new( done ) );
        }
    }


    /// Jumps to `seconds`.
    pub fn set_current_time( &self, seconds: f64 ) {
        if self.is_loaded() {
            self.bridge.seek_to( self.key, seconds );
        }
    }


    /// Routes this player through the device speaker, where the engine
    /// routes per player; a no-op elsewhere.
    pub fn set_speakerphone_on( &self, on: bool ) {
        if self.is_loaded() && self.platform.per_player_speakerphone() {
            self.bridge.set_speakerphone_on( self.key, on );
        }
    }
}


/// Volume for the channel the pan points away from, rounded to one
/// decimal place.
fn relative_volume( volume: f32, pan: f32 ) -> f32 {
    ( volume * ( 1.0 - pan.abs() ) * 10.0 ).round() / 10.0
}


#[cfg( test )]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::sync::broadcast;

    use crate::bridge::{ Directories, EndCallback, PlayChange, PositionCallback, VolumeCallback };
    use crate::session::{ SessionCategory, SessionMode };


    /// One recorded native call.
    #[derive( Debug, Clone, PartialEq )]
    enum Call {
        Prepare { key: SoundKey, path: String },
        Play( SoundKey ),
        Pause( SoundKey ),
        Stop( SoundKey ),
        Reset( SoundKey ),
        Release( SoundKey ),
        Volume { key: SoundKey, volume: f32 },
        ChannelVolumes { key: SoundKey, left: f32, right: f32 },
        Pan { key: SoundKey, pan: f32 },
        Looping { key: SoundKey, looping: bool },
        LoopCount { key: SoundKey, count: i32 },
        Speed { key: SoundKey, speed: f32 },
        Pitch { key: SoundKey, pitch: f32 },
        Seek { key: SoundKey, seconds: f64 },
        SpeakerphoneOn { key: SoundKey, on: bool },
    }


    /// How a scripted bridge answers prepare requests.
    #[derive( Debug, Clone, Copy, PartialEq, Eq )]
    enum PrepareScript {
        Succeed,
        Fail,
        /// Never complete; models a load still in flight.
        Defer,
    }


    /// Records every native call and lets tests script the prepare
    /// outcome and drive the play-change broadcast.
    struct RecordingBridge {
        platform: Platform,
        script: PrepareScript,
        calls: Mutex<Vec<Call>>,
        play_changes: broadcast::Sender<PlayChange>,
    }


    impl RecordingBridge {
        fn new( platform: Platform, script: PrepareScript ) -> Arc<Self> {
            let ( play_changes, _ ) = broadcast::channel( 16 );
            Arc::new( Self {
                platform,
                script,
                calls: Mutex::new( Vec::new() ),
                play_changes,
            })
        }


        fn record( &self, call: Call ) {
            self.calls.lock().unwrap().push( call );
        }


        fn calls( &self ) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }


        fn emit( &self, key: SoundKey, is_playing: bool ) {
            let _ = self.play_changes.send( PlayChange { key, is_playing } );
        }
    }


    impl NativeBridge for RecordingBridge {
        fn platform( &self ) -> Platform {
            self.platform
        }

        fn prepare( &self, key: SoundKey, path: &str, _options: &LoadOptions, done: PrepareCallback ) {
            self.record( Call::Prepare { key, path: path.to_string() } );
            match self.script {
                PrepareScript::Succeed => done( Ok( PreparedMetadata {
                    duration: Some( 2.5 ),
                    channels: Some( 2 ),
                })),
                PrepareScript::Fail => done( Err( BridgeError::Load {
                    path: path.to_string(),
                    reason: "no such resource".into(),
                })),
                PrepareScript::Defer => drop( done ),
            }
        }

        fn play( &self, key: SoundKey, on_end: EndCallback ) {
            self.record( Call::Play( key ) );
            drop( on_end );
        }

        fn pause( &self, key: SoundKey ) {
            self.record( Call::Pause( key ) );
        }

        fn stop( &self, key: SoundKey ) {
            self.record( Call::Stop( key ) );
        }

        fn reset( &self, key: SoundKey ) {
            self.record( Call::Reset( key ) );
        }

        fn release( &self, key: SoundKey ) {
            self.record( Call::Release( key ) );
        }

        fn set_volume( &self, key: SoundKey, volume: f32 ) {
            self.record( Call::Volume { key, volume } );
        }

        fn set_channel_volumes( &self, key: SoundKey, left: f32, right: f32 ) {
            self.record( Call::ChannelVolumes { key, left, right } );
        }

        fn set_pan( &self, key: SoundKey, pan: f32 ) {
            self.record( Call::Pan { key, pan } );
        }

        fn set_looping( &self, key: SoundKey, looping: bool ) {
            self.record( Call::Looping { key, looping } );
        }

        fn set_loop_count( &self, key: SoundKey, count: i32 ) {
            self.record( Call::LoopCount { key, count } );
        }

        fn set_speed( &self, key: SoundKey, speed: f32 ) {
            self.record( Call::Speed { key, speed } );
        }

        fn set_pitch( &self, key: SoundKey, pitch: f32 ) {
            self.record( Call::Pitch { key, pitch } );
        }

        fn current_position( &self, _key: SoundKey, done: PositionCallback ) {
            done( 1.25 );
        }

        fn seek_to( &self, key: SoundKey, seconds: f64 ) {
            self.record( Call::Seek { key, seconds } );
        }

        fn set_speakerphone_on( &self, key: SoundKey, on: bool ) {
            self.record( Call::SpeakerphoneOn { key, on } );
        }

        fn enable( &self, _enabled: bool ) {}

        fn enable_in_silence_mode( &self, _enabled: bool ) {}

        fn set_active( &self, _active: bool ) {}

        fn set_category( &self, _category: SessionCategory, _mix_with_others: bool ) {}

        fn set_mode( &self, _mode: SessionMode ) {}

        fn set_speaker_phone( &self, _on: bool ) {}

        fn system_volume( &self, done: VolumeCallback ) {
            done( 0.5 );
        }

        fn set_system_volume( &self, _volume: f32 ) {}

        fn directories( &self ) -> Directories {
            Directories::default()
        }

        fn play_changes( &self ) -> broadcast::Receiver<PlayChange> {
            self.play_changes.subscribe()
        }
    }


    fn sound_on( bridge: &Arc<RecordingBridge>, source: Source ) -> Sound {
        Sound::new(
            Arc::clone( bridge ) as Arc<dyn NativeBridge>,
            bridge.platform,
            Handle::current(),
            7,
            source,
            LoadOptions::default(),
            |_| {},
        )
    }


    /// Polls until the condition holds or two seconds pass.
    async fn wait_until( mut condition: impl FnMut() -> bool ) -> bool {
        for _ in 0..200 {
            if condition() {
                return true;
            }
            tokio::time::sleep( Duration::from_millis( 10 ) ).await;
        }
        false
    }


    #[test]
    fn test_relative_volume_rounds_to_one_decimal() {
        assert_eq!( relative_volume( 1.0, 0.5 ), 0.5 );
        assert_eq!( relative_volume( 1.0, -0.6 ), 0.4 );
        assert_eq!( relative_volume( 0.7, 0.25 ), 0.5 );
        assert_eq!( relative_volume( 0.0, 0.9 ), 0.0 );
        assert_eq!( relative_volume( 1.0, 1.0 ), 0.0 );
    }


    #[tokio::test]
    async fn test_load_success_caches_metadata() {
        let bridge = RecordingBridge::new( Platform::Ios, PrepareScript::Succeed );
        let sound = sound_on( &bridge, Source::file( "beep.mp3" ) );

        assert!( sound.is_loaded() );
        assert!( !sound.is_playing() );
        assert_eq!( sound.duration(), 2.5 );
        assert_eq!( sound.number_of_channels(), 2 );
        assert_eq!( sound.filename(), "beep.mp3" );
    }


    #[tokio::test]
    async fn test_load_failure_leaves_handle_permanently_unloaded() {
        let bridge = RecordingBridge::new( Platform::Ios, PrepareScript::Fail );
        let failure = Arc::new( AtomicBool::new( false ) );
        let failure_seen = Arc::clone( &failure );

        let sound = Sound::new(
            Arc::clone( &bridge ) as Arc<dyn NativeBridge>,
            Platform::Ios,
            Handle::current(),
            7,
            Source::file( "beep.mp3" ),
            LoadOptions::default(),
            move |result| failure_seen.store( result.is_err(), Ordering::Release ),
        );

        assert!( failure.load( Ordering::Acquire ) );
        assert!( !sound.is_loaded() );
        assert_eq!( sound.duration(), -1.0 );
        assert_eq!( sound.number_of_channels(), -1 );

        let ended = Arc::new( Mutex::new( None ) );
        let ended_seen = Arc::clone( &ended );
        sound.play( move |finished| *ended_seen.lock().unwrap() = Some( finished ) );
        assert_eq!( *ended.lock().unwrap(), Some( false ) );

        sound.pause();
        sound.stop();
        sound.set_current_time( 1.0 );
        let calls = bridge.calls();
        assert_eq!( calls.len(), 1 );
        assert!( matches!( calls[ 0 ], Call::Prepare { .. } ) );
    }


    #[tokio::test]
    async fn test_mutators_before_load_cache_without_forwarding() {
        let bridge = RecordingBridge::new( Platform::Android, PrepareScript::Defer );
        let sound = sound_on( &bridge, Source::file( "beep.mp3" ) );

        sound.set_volume( 0.3 );
        sound.set_pan( -0.5 ).unwrap();
        sound.set_number_of_loops( -1 );
        sound.set_speed( 1.5 );
        sound.set_pitch( 0.8 );

        assert_eq!( sound.volume(), 0.3 );
        assert_eq!( sound.pan(), -0.5 );
        assert_eq!( sound.number_of_loops(), -1 );
        assert_eq!( sound.speed(), 1.5 );
        assert_eq!( sound.pitch(), 0.8 );

        // Only the prepare request went out.
        let calls = bridge.calls();
        assert_eq!( calls.len(), 1 );
        assert!( matches!( calls[ 0 ], Call::Prepare { .. } ) );
    }


    #[tokio::test]
    async fn test_pan_before_load_never_errors_even_without_support() {
        let bridge = RecordingBridge::new( Platform::Windows, PrepareScript::Defer );
        let sound = sound_on( &bridge, Source::file( "beep.mp3" ) );

        assert_eq!( sound.set_pan( 0.4 ), Ok(()) );
        assert_eq!( sound.pan(), 0.4 );
    }


    #[tokio::test]
    async fn test_pan_forwards_split_volumes_where_engine_lacks_pan() {
        let bridge = RecordingBridge::new( Platform::Android, PrepareScript::Succeed );
        let sound = sound_on( &bridge, Source::asset( "asset:/beep" ) );

        sound.set_volume( 0.8 );
        sound.set_pan( -0.5 ).unwrap();
        sound.set_pan( 0.5 ).unwrap();

        let calls = bridge.calls();
        assert_eq!( calls[ 1 ], Call::ChannelVolumes { key: 7, left: 0.8, right: 0.8 } );
        assert_eq!( calls[ 2 ], Call::ChannelVolumes { key: 7, left: 0.8, right: 0.4 } );
        assert_eq!( calls[ 3 ], Call::ChannelVolumes { key: 7, left: 0.4, right: 0.8 } );
    }


    #[tokio::test]
    async fn test_centered_pan_sends_nominal_volume_to_both_channels() {
        let bridge = RecordingBridge::new( Platform::Android, PrepareScript::Succeed );
        let sound = sound_on( &bridge, Source::asset( "asset:/beep" ) );

        // 0.85 must not be rounded on the pan==0 path.
        sound.set_volume( 0.85 );

        let calls = bridge.calls();
        assert_eq!( calls[ 1 ], Call::ChannelVolumes { key: 7, left: 0.85, right: 0.85 } );
    }


    #[tokio::test]
    async fn test_pan_is_native_where_the_engine_has_it() {
        let bridge = RecordingBridge::new( Platform::Ios, PrepareScript::Succeed );
        let sound = sound_on( &bridge, Source::file( "beep.mp3" ) );

        sound.set_pan( -0.25 ).unwrap();
        sound.set_volume( 0.6 );

        let calls = bridge.calls();
        assert_eq!( calls[ 1 ], Call::Pan { key: 7, pan: -0.25 } );
        assert_eq!( calls[ 2 ], Call::Volume { key: 7, volume: 0.6 } );
    }


    #[tokio::test]
    async fn test_pan_errors_where_the_engine_has_no_substitute() {
        let bridge = RecordingBridge::new( Platform::Windows, PrepareScript::Succeed );
        let sound = sound_on( &bridge, Source::file( "beep.mp3" ) );

        assert_eq!( sound.set_pan( 0.3 ), Err( SoundError::PanUnsupported( Platform::Windows ) ) );
        // The cache is updated before the error surfaces.
        assert_eq!( sound.pan(), 0.3 );
    }


    #[tokio::test]
    async fn test_loop_count_degrades_to_boolean_looping() {
        let bridge = RecordingBridge::new( Platform::Android, PrepareScript::Succeed );
        let sound = sound_on( &bridge, Source::asset( "asset:/beep" ) );

        sound.set_number_of_loops( -1 );
        sound.set_number_of_loops( 0 );

        let calls = bridge.calls();
        assert_eq!( calls[ 1 ], Call::Looping { key: 7, looping: true } );
        assert_eq!( calls[ 2 ], Call::Looping { key: 7, looping: false } );
    }


    #[tokio::test]
    async fn test_loop_count_is_exact_where_supported() {
        let bridge = RecordingBridge::new( Platform::Ios, PrepareScript::Succeed );
        let sound = sound_on( &bridge, Source::file( "beep.mp3" ) );

        sound.set_number_of_loops( 3 );

        assert_eq!( bridge.calls()[ 1 ], Call::LoopCount { key: 7, count: 3 } );
    }


    #[tokio::test]
    async fn test_speed_is_cache_only_without_a_rate_control() {
        let bridge = RecordingBridge::new( Platform::Windows, PrepareScript::Succeed );
        let sound = sound_on( &bridge, Source::file( "beep.mp3" ) );

        sound.set_speed( 2.0 );
        sound.set_pitch( 1.2 );

        assert_eq!( sound.speed(), 2.0 );
        assert_eq!( sound.pitch(), 1.2 );
        assert_eq!( bridge.calls().len(), 1 );
    }


    #[tokio::test]
    async fn test_play_change_broadcast_is_filtered_by_key() {
        let bridge = RecordingBridge::new( Platform::Ios, PrepareScript::Succeed );
        let sound = sound_on( &bridge, Source::file( "beep.mp3" ) );

        bridge.emit( 99, true );
        tokio::time::sleep( Duration::from_millis( 50 ) ).await;
        assert!( !sound.is_playing() );

        bridge.emit( 7, true );
        assert!( wait_until( || sound.is_playing() ).await );

        bridge.emit( 7, false );
        assert!( wait_until( || !sound.is_playing() ).await );
    }


    #[tokio::test]
    async fn test_pause_clears_playing_synchronously() {
        let bridge = RecordingBridge::new( Platform::Ios, PrepareScript::Succeed );
        let sound = sound_on( &bridge, Source::file( "beep.mp3" ) );

        bridge.emit( 7, true );
        assert!( wait_until( || sound.is_playing() ).await );

        sound.pause();
        assert!( !sound.is_playing() );
        assert_eq!( bridge.calls()[ 1 ], Call::Pause( 7 ) );
    }


    #[tokio::test]
    async fn test_reset_only_exists_on_the_android_family() {
        let android = RecordingBridge::new( Platform::Android, PrepareScript::Succeed );
        let sound = sound_on( &android, Source::asset( "asset:/beep" ) );
        sound.reset();
        assert_eq!( android.calls()[ 1 ], Call::Reset( 7 ) );

        let ios = RecordingBridge::new( Platform::Ios, PrepareScript::Succeed );
        let sound = sound_on( &ios, Source::file( "beep.mp3" ) );
        sound.reset();
        assert_eq!( ios.calls().len(), 1 );
    }


    #[tokio::test]
    async fn test_release_detaches_and_silences_the_handle() {
        let bridge = RecordingBridge::new( Platform::Ios, PrepareScript::Succeed );
        let sound = sound_on( &bridge, Source::file( "beep.mp3" ) );

        sound.release();
        assert!( !sound.is_loaded() );

        // Nothing after the release reaches the engine.
        sound.pause();
        sound.stop();
        sound.set_volume( 0.1 );
        sound.set_current_time( 3.0 );
        let ended = Arc::new( Mutex::new( None ) );
        let ended_seen = Arc::clone( &ended );
        sound.play( move |finished| *ended_seen.lock().unwrap() = Some( finished ) );
        assert_eq!( *ended.lock().unwrap(), Some( false ) );

        let calls = bridge.calls();
        assert_eq!( calls.last(), Some( &Call::Release( 7 ) ) );
        assert_eq!( calls.len(), 2 );

        // Releasing twice does not issue a second native call.
        sound.release();
        assert_eq!( bridge.calls().len(), 2 );
    }


    #[tokio::test]
    async fn test_current_time_reaches_the_callback_once_loaded() {
        let bridge = RecordingBridge::new( Platform::Ios, PrepareScript::Succeed );
        let sound = sound_on( &bridge, Source::file( "beep.mp3" ) );

        let position = Arc::new( Mutex::new( None ) );
        let position_seen = Arc::clone( &position );
        sound.current_time( move |seconds| *position_seen.lock().unwrap() = Some( seconds ) );
        assert_eq!( *position.lock().unwrap(), Some( 1.25 ) );

        sound.set_current_time( 2.0 );
        assert_eq!( bridge.calls()[ 1 ], Call::Seek { key: 7, seconds: 2.0 } );
    }


    #[tokio::test]
    async fn test_speakerphone_routing_is_per_player_on_android_only() {
        let android = RecordingBridge::new( Platform::Android, PrepareScript::Succeed );
        let sound = sound_on( &android, Source::asset( "asset:/beep" ) );
        sound.set_speakerphone_on( true );
        assert_eq!( android.calls()[ 1 ], Call::SpeakerphoneOn { key: 7, on: true } );

        let ios = RecordingBridge::new( Platform::Ios, PrepareScript::Succeed );
        let sound = sound_on( &ios, Source::file( "beep.mp3" ) );
        sound.set_speakerphone_on( true );
        assert_eq!( ios.calls().len(), 1 );
    }
}
