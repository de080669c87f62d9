//! End-to-end checks of the facade against a scripted engine.

use std::sync::{ Arc, Mutex };
use std::sync::atomic::{ AtomicBool, Ordering };
use std::time::Duration;

use tokio::sync::broadcast;

use soundbridge::bridge::{
    Directories, EndCallback, LoadOptions, NativeBridge, PlayChange, PositionCallback,
    PrepareCallback, PreparedMetadata, SoundKey, VolumeCallback,
};
use soundbridge::{ BridgeError, Platform, SessionCategory, SessionConfig, SessionMode, SoundSystem, Source };
use soundbridge::session;


fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}


/// Engine double that records every call as a line and scripts prepare
/// outcomes by path: names containing "missing" fail, names containing
/// "slow" never complete.
struct ScriptedBridge {
    platform: Platform,
    calls: Mutex<Vec<String>>,
    play_changes: broadcast::Sender<PlayChange>,
}


impl ScriptedBridge {
    fn new( platform: Platform ) -> Arc<Self> {
        let ( play_changes, _ ) = broadcast::channel( 16 );
        Arc::new( Self {
            platform,
            calls: Mutex::new( Vec::new() ),
            play_changes,
        })
    }


    fn record( &self, line: String ) {
        self.calls.lock().unwrap().push( line );
    }


    fn calls( &self ) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }


    fn emit( &self, key: SoundKey, is_playing: bool ) {
        let _ = self.play_changes.send( PlayChange { key, is_playing } );
    }
}


impl NativeBridge for ScriptedBridge {
    fn platform( &self ) -> Platform {
        self.platform
    }

    fn prepare( &self, key: SoundKey, path: &str, _options: &LoadOptions, done: PrepareCallback ) {
        self.record( format!( "prepare {} {}", key, path ) );
        if path.contains( "missing" ) {
            done( Err( BridgeError::Load {
                path: path.to_string(),
                reason: "no such resource".into(),
            }));
        } else if path.contains( "slow" ) {
            drop( done );
        } else {
            done( Ok( PreparedMetadata {
                duration: Some( 12.0 ),
                channels: Some( 2 ),
            }));
        }
    }

    fn play( &self, key: SoundKey, on_end: EndCallback ) {
        self.record( format!( "play {}", key ) );
        drop( on_end );
    }

    fn pause( &self, key: SoundKey ) {
        self.record( format!( "pause {}", key ) );
    }

    fn stop( &self, key: SoundKey ) {
        self.record( format!( "stop {}", key ) );
    }

    fn reset( &self, key: SoundKey ) {
        self.record( format!( "reset {}", key ) );
    }

    fn release( &self, key: SoundKey ) {
        self.record( format!( "release {}", key ) );
    }

    fn set_volume( &self, key: SoundKey, volume: f32 ) {
        self.record( format!( "set_volume {} {}", key, volume ) );
    }

    fn set_channel_volumes( &self, key: SoundKey, left: f32, right: f32 ) {
        self.record( format!( "set_channel_volumes {} {} {}", key, left, right ) );
    }

    fn set_pan( &self, key: SoundKey, pan: f32 ) {
        self.record( format!( "set_pan {} {}", key, pan ) );
    }

    fn set_looping( &self, key: SoundKey, looping: bool ) {
        self.record( format!( "set_looping {} {}", key, looping ) );
    }

    fn set_loop_count( &self, key: SoundKey, count: i32 ) {
        self.record( format!( "set_loop_count {} {}", key, count ) );
    }

    fn set_speed( &self, key: SoundKey, speed: f32 ) {
        self.record( format!( "set_speed {} {}", key, speed ) );
    }

    fn set_pitch( &self, key: SoundKey, pitch: f32 ) {
        self.record( format!( "set_pitch {} {}", key, pitch ) );
    }

    fn current_position( &self, _key: SoundKey, done: PositionCallback ) {
        done( 3.5 );
    }

    fn seek_to( &self, key: SoundKey, seconds: f64 ) {
        self.record( format!( "seek_to {} {}", key, seconds ) );
    }

    fn set_speakerphone_on( &self, key: SoundKey, on: bool ) {
        self.record( format!( "set_speakerphone_on {} {}", key, on ) );
    }

    fn enable( &self, enabled: bool ) {
        self.record( format!( "enable {}", enabled ) );
    }

    fn enable_in_silence_mode( &self, enabled: bool ) {
        self.record( format!( "enable_in_silence_mode {}", enabled ) );
    }

    fn set_active( &self, active: bool ) {
        self.record( format!( "set_active {}", active ) );
    }

    fn set_category( &self, category: SessionCategory, mix_with_others: bool ) {
        self.record( format!( "set_category {:?} {}", category, mix_with_others ) );
    }

    fn set_mode( &self, mode: SessionMode ) {
        self.record( format!( "set_mode {:?}", mode ) );
    }

    fn set_speaker_phone( &self, on: bool ) {
        self.record( format!( "set_speaker_phone {}", on ) );
    }

    fn system_volume( &self, done: VolumeCallback ) {
        self.record( "system_volume".into() );
        done( 0.4 );
    }

    fn set_system_volume( &self, volume: f32 ) {
        self.record( format!( "set_system_volume {}", volume ) );
    }

    fn directories( &self ) -> Directories {
        Directories {
            main_bundle: Some( "/bundle".into() ),
            documents: Some( "/documents".into() ),
            library: None,
            caches: Some( "/caches".into() ),
        }
    }

    fn play_changes( &self ) -> broadcast::Receiver<PlayChange> {
        self.play_changes.subscribe()
    }
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


#[tokio::test]
async fn test_full_playback_lifecycle() {
    init_tracing();

    let bridge = ScriptedBridge::new( Platform::Ios );
    let system = SoundSystem::new( bridge.clone() ).unwrap();

    let loaded = Arc::new( AtomicBool::new( false ) );
    let loaded_seen = Arc::clone( &loaded );
    let sound = system.load(
        Source::file( "beep.mp3" ),
        LoadOptions::default(),
        move |result| loaded_seen.store( result.is_ok(), Ordering::Release ),
    );

    assert!( loaded.load( Ordering::Acquire ) );
    assert!( sound.is_loaded() );
    assert_eq!( sound.duration(), 12.0 );
    assert_eq!( sound.number_of_channels(), 2 );

    sound.play( |_| {} );
    bridge.emit( sound.key(), true );
    assert!( wait_until( || sound.is_playing() ).await );

    sound.pause();
    assert!( !sound.is_playing() );

    sound.release();
    assert!( !sound.is_loaded() );

    assert_eq!( bridge.calls(), vec![
        "prepare 0 beep.mp3".to_string(),
        "play 0".to_string(),
        "pause 0".to_string(),
        "release 0".to_string(),
    ]);
}


#[tokio::test]
async fn test_resolution_follows_platform_conventions() {
    let bridge = ScriptedBridge::new( Platform::Android );
    let system = SoundSystem::new( bridge.clone() ).unwrap();

    let bare = system.load( Source::file( "Beep.MP3" ), LoadOptions::default(), |_| {} );
    let based = system.load( Source::file_in( "beep.mp3", "sounds" ), LoadOptions::default(), |_| {} );
    let asset = system.load( Source::asset( "asset:/raw/Chime.WAV" ), LoadOptions::default(), |_| {} );

    assert_eq!( bare.filename(), "beep" );
    assert_eq!( based.filename(), "sounds/beep.mp3" );
    assert_eq!( asset.filename(), "asset:/raw/Chime.WAV" );

    assert_eq!( bridge.calls(), vec![
        "prepare 0 beep".to_string(),
        "prepare 1 sounds/beep.mp3".to_string(),
        "prepare 2 asset:/raw/Chime.WAV".to_string(),
    ]);
}


#[tokio::test]
async fn test_failed_load_surfaces_once_and_stays_dead() {
    init_tracing();

    let bridge = ScriptedBridge::new( Platform::Ios );
    let system = SoundSystem::new( bridge.clone() ).unwrap();

    let error = Arc::new( Mutex::new( None ) );
    let error_seen = Arc::clone( &error );
    let sound = system.load(
        Source::file( "missing.mp3" ),
        LoadOptions::default(),
        move |result| *error_seen.lock().unwrap() = result.err(),
    );

    assert!( matches!(
        *error.lock().unwrap(),
        Some( BridgeError::Load { .. } )
    ));
    assert!( !sound.is_loaded() );
    assert_eq!( sound.duration(), -1.0 );

    let ended = Arc::new( Mutex::new( None ) );
    let ended_seen = Arc::clone( &ended );
    sound.play( move |finished| *ended_seen.lock().unwrap() = Some( finished ) );
    assert_eq!( *ended.lock().unwrap(), Some( false ) );

    // Only the prepare request ever reached the engine.
    assert_eq!( bridge.calls(), vec![ "prepare 0 missing.mp3".to_string() ] );
}


#[tokio::test]
async fn test_never_playing_before_loaded() {
    let bridge = ScriptedBridge::new( Platform::Ios );
    let system = SoundSystem::new( bridge.clone() ).unwrap();

    let sound = system.load( Source::file( "slow.mp3" ), LoadOptions::default(), |_| {} );
    assert!( !sound.is_loaded() );

    // Broadcasts for this key are ignored while the load is in flight:
    // the watcher only attaches on a successful load.
    bridge.emit( sound.key(), true );
    tokio::time::sleep( Duration::from_millis( 50 ) ).await;
    assert!( !sound.is_playing() );
}


#[tokio::test]
async fn test_mutators_cache_while_load_is_in_flight() {
    let bridge = ScriptedBridge::new( Platform::Android );
    let system = SoundSystem::new( bridge.clone() ).unwrap();

    let sound = system.load( Source::file( "slow.mp3" ), LoadOptions::default(), |_| {} );
    sound.set_volume( 0.25 );
    sound.set_number_of_loops( -1 );

    assert_eq!( sound.volume(), 0.25 );
    assert_eq!( sound.number_of_loops(), -1 );
    assert_eq!( bridge.calls(), vec![ "prepare 0 slow".to_string() ] );
}


#[tokio::test]
async fn test_pan_approximation_reaches_the_engine_as_channel_levels() {
    let bridge = ScriptedBridge::new( Platform::Android );
    let system = SoundSystem::new( bridge.clone() ).unwrap();

    let sound = system.load( Source::file_in( "beep.mp3", "sounds" ), LoadOptions::default(), |_| {} );
    sound.set_volume( 1.0 );
    sound.set_pan( -0.6 ).unwrap();

    assert_eq!( bridge.calls(), vec![
        "prepare 0 sounds/beep.mp3".to_string(),
        "set_channel_volumes 0 1 1".to_string(),
        "set_channel_volumes 0 1 0.4".to_string(),
    ]);
}


#[tokio::test]
async fn test_session_calls_respect_platform_gates() {
    let windows = ScriptedBridge::new( Platform::Windows );
    let system = SoundSystem::new( windows.clone() ).unwrap();
    session::set_category( &system, SessionCategory::Playback, false );
    session::set_active( &system, true );
    session::set_system_volume( &system, 0.4 );
    session::system_volume( &system, Box::new( |_| {} ) );
    assert!( windows.calls().is_empty() );

    let ios = ScriptedBridge::new( Platform::Ios );
    let system = SoundSystem::new( ios.clone() ).unwrap();
    session::set_category( &system, SessionCategory::Playback, true );
    session::set_active( &system, true );
    session::set_system_volume( &system, 0.4 );
    assert_eq!( ios.calls(), vec![
        "set_category Playback true".to_string(),
        "set_active true".to_string(),
    ]);

    let android = ScriptedBridge::new( Platform::Android );
    let system = SoundSystem::new( android.clone() ).unwrap();
    session::set_mode( &system, SessionMode::SpokenAudio );
    session::set_system_volume( &system, 0.4 );
    assert_eq!( android.calls(), vec![ "set_system_volume 0.4".to_string() ] );
}


#[tokio::test]
async fn test_system_volume_read_reaches_the_callback() {
    let bridge = ScriptedBridge::new( Platform::Android );
    let system = SoundSystem::new( bridge.clone() ).unwrap();

    let level = Arc::new( Mutex::new( None ) );
    let level_seen = Arc::clone( &level );
    session::system_volume( &system, Box::new( move |v| *level_seen.lock().unwrap() = Some( v ) ) );

    assert_eq!( *level.lock().unwrap(), Some( 0.4 ) );
}


#[tokio::test]
async fn test_session_config_applies_its_defaults() {
    let bridge = ScriptedBridge::new( Platform::Ios );
    let system = SoundSystem::new( bridge.clone() ).unwrap();

    let config = SessionConfig {
        enabled: true,
        category: Some( SessionCategory::Ambient ),
        mix_with_others: true,
        mode: Some( SessionMode::MoviePlayback ),
        play_in_silence_mode: true,
        speaker_phone: false,
    };
    config.apply( &system );

    assert_eq!( bridge.calls(), vec![
        "enable true".to_string(),
        "set_category Ambient true".to_string(),
        "set_mode MoviePlayback".to_string(),
        "enable_in_silence_mode true".to_string(),
    ]);
}


#[tokio::test]
async fn test_directories_pass_through() {
    let bridge = ScriptedBridge::new( Platform::Ios );
    let system = SoundSystem::new( bridge.clone() ).unwrap();

    let dirs = system.directories();
    assert_eq!( dirs.main_bundle, Some( "/bundle".into() ) );
    assert_eq!( dirs.library, None );
}


#[tokio::test]
async fn test_handles_share_one_broadcast_without_crosstalk() {
    let bridge = ScriptedBridge::new( Platform::Ios );
    let system = SoundSystem::new( bridge.clone() ).unwrap();

    let first = system.load( Source::file( "a.mp3" ), LoadOptions::default(), |_| {} );
    let second = system.load( Source::file( "b.mp3" ), LoadOptions::default(), |_| {} );

    bridge.emit( first.key(), true );
    assert!( wait_until( || first.is_playing() ).await );
    assert!( !second.is_playing() );

    bridge.emit( second.key(), true );
    bridge.emit( first.key(), false );
    assert!( wait_until( || second.is_playing() ).await );
    assert!( wait_until( || !first.is_playing() ).await );
}
