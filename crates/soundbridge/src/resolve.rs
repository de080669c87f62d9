//! Source resolution
//!
//! Turns the caller's notion of a sound (a file name with an optional
//! base path, or a pre-resolved bundled asset) into the final string
//! handed to the native engine.

use crate::platform::Platform;


/// Where a sound comes from.
#[derive( Debug, Clone, PartialEq, Eq )]
pub enum Source {
    /// A file name, optionally under a base path such as a bundle or
    /// documents directory.
    File {
        name: String,
        base_path: Option<String>,
    },

    /// A bundled asset already resolved to an engine-understood URI.
    /// Bypasses every path transformation.
    Asset {
        uri: String,
    },
}


impl Source {
    /// A bare file name or path.
    pub fn file( name: impl Into<String> ) -> Self {
        Source::File { name: name.into(), base_path: None }
    }


    /// A file name under a base path.
    pub fn file_in( name: impl Into<String>, base_path: impl Into<String> ) -> Self {
        Source::File { name: name.into(), base_path: Some( base_path.into() ) }
    }


    /// A pre-resolved bundled asset.
    pub fn asset( uri: impl Into<String> ) -> Self {
        Source::Asset { uri: uri.into() }
    }


    /// Resolves this source into the string handed to the engine.
    ///
    /// Bare relative names on the asset-name-lookup platform are
    /// lower-cased and stripped of their final extension; everything
    /// else passes through unchanged.
    pub fn resolve( &self, platform: Platform ) -> String {
        match self {
            Source::Asset { uri } => uri.clone(),
            Source::File { name, base_path } => {
                if let Some( base ) = base_path {
                    format!( "{}/{}", base, name )
                } else if platform.uses_asset_name_lookup() && is_relative_path( name ) {
                    asset_lookup_name( name )
                } else {
                    name.clone()
                }
            }
        }
    }
}


/// True for paths that are neither absolute nor carry a scheme the
/// engine resolves itself.
fn is_relative_path( path: &str ) -> bool {
    !( path.starts_with( '/' )
        || path.starts_with( "http" )
        || path.starts_with( "asset" )
        || path.starts_with( "file" ) )
}


/// Lower-cases a file name and drops its final extension, matching the
/// engine's resource-name lookup convention.
fn asset_lookup_name( name: &str ) -> String {
    let lowered = name.to_lowercase();
    match lowered.rfind( '.' ) {
        Some( dot ) if dot + 1 < lowered.len() => lowered[ ..dot ].to_string(),
        _ => lowered,
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_bare_name_stripped_and_lowered_for_asset_lookup() {
        let source = Source::file( "Beep.MP3" );
        assert_eq!( source.resolve( Platform::Android ), "beep" );
    }


    #[test]
    fn test_base_path_joins_verbatim() {
        let source = Source::file_in( "beep.mp3", "sounds" );
        assert_eq!( source.resolve( Platform::Android ), "sounds/beep.mp3" );
    }


    #[test]
    fn test_bare_name_passes_through_elsewhere() {
        let source = Source::file( "Beep.mp3" );
        assert_eq!( source.resolve( Platform::Ios ), "Beep.mp3" );
        assert_eq!( source.resolve( Platform::Windows ), "Beep.mp3" );
    }


    #[test]
    fn test_asset_bypasses_transforms() {
        let source = Source::asset( "asset:/raw/Chime.WAV" );
        assert_eq!( source.resolve( Platform::Android ), "asset:/raw/Chime.WAV" );
    }


    #[test]
    fn test_absolute_and_scheme_paths_pass_through() {
        for path in [
            "/sdcard/Music/Beep.mp3",
            "https://example.com/Beep.mp3",
            "file:///tmp/Beep.mp3",
            "asset:/raw/beep.mp3",
        ] {
            let source = Source::file( path );
            assert_eq!( source.resolve( Platform::Android ), path );
        }
    }


    #[test]
    fn test_only_final_extension_is_stripped() {
        let source = Source::file( "alarm.tone.ogg" );
        assert_eq!( source.resolve( Platform::Android ), "alarm.tone" );
    }


    #[test]
    fn test_trailing_dot_is_kept() {
        let source = Source::file( "beep." );
        assert_eq!( source.resolve( Platform::Android ), "beep." );
    }
}
