//! Soundbridge - cross-platform audio playback facade
//!
//! This crate resolves sound sources to platform-appropriate paths,
//! forwards playback calls to a native engine behind the `NativeBridge`
//! trait, and mirrors engine state into lightweight `Sound` handles.
//! No audio is decoded or mixed here; everything real happens inside
//! the engine.

pub mod bridge;
pub mod platform;
pub mod resolve;
pub mod session;
pub mod sound;
pub mod system;

pub use bridge::{ BridgeError, Directories, LoadOptions, NativeBridge, NullBridge, PlayChange, PreparedMetadata, SoundKey };
pub use platform::Platform;
pub use resolve::Source;
pub use session::{ SessionCategory, SessionConfig, SessionMode };
pub use sound::{ Sound, SoundError };
pub use system::{ SoundSystem, SystemError };
