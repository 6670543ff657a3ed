//! # Asset Classification
//!
//! Maps a file path to a semantic asset category and the default zstd
//! compression level for that category. Classification is a total function of
//! the (case-insensitive) extension: every path classifies, unknown
//! extensions fall back to [`FileCategory::Other`] with a conservative level.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Semantic category of a game asset, derived from its file extension.
///
/// The set is closed on purpose: adding a category is a compile-time change
/// here and in [`FileCategory::default_level`], not a runtime string match.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum FileCategory {
    Texture = 0,
    Audio = 1,
    Model = 2,
    Script = 3,
    Binary = 4,
    Other = 5,
}

impl FileCategory {
    /// Default zstd level for this category.
    ///
    /// Scripts are small and highly redundant text, so they get a high level;
    /// audio is usually already compressed and barely shrinks, so it gets the
    /// cheapest one.
    pub fn default_level(self) -> i32 {
        match self {
            FileCategory::Texture => 5,
            FileCategory::Audio => 2,
            FileCategory::Model => 6,
            FileCategory::Script => 12,
            FileCategory::Binary => 4,
            FileCategory::Other => 3,
        }
    }

    /// Stable one-byte tag used in the container manifest.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Inverse of [`FileCategory::tag`]; `None` for tags written by a newer tool.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(FileCategory::Texture),
            1 => Some(FileCategory::Audio),
            2 => Some(FileCategory::Model),
            3 => Some(FileCategory::Script),
            4 => Some(FileCategory::Binary),
            5 => Some(FileCategory::Other),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Texture => "texture",
            FileCategory::Audio => "audio",
            FileCategory::Model => "model",
            FileCategory::Script => "script",
            FileCategory::Binary => "binary",
            FileCategory::Other => "other",
        }
    }

    /// All categories, in tag order. Handy for stats tables and CLI parsing.
    pub fn all() -> [FileCategory; 6] {
        [
            FileCategory::Texture,
            FileCategory::Audio,
            FileCategory::Model,
            FileCategory::Script,
            FileCategory::Binary,
            FileCategory::Other,
        ]
    }
}

impl std::str::FromStr for FileCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "texture" => Ok(FileCategory::Texture),
            "audio" => Ok(FileCategory::Audio),
            "model" => Ok(FileCategory::Model),
            "script" => Ok(FileCategory::Script),
            "binary" => Ok(FileCategory::Binary),
            "other" => Ok(FileCategory::Other),
            _ => Err(format!("unknown category '{s}'")),
        }
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a path by extension, returning the category and its default level.
///
/// Pure and infallible; paths without an extension land in `Other`.
pub fn classify(path: &Path) -> (FileCategory, i32) {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();

    let category = match ext.as_str() {
        "png" | "jpg" | "jpeg" | "tga" | "bmp" | "gif" | "tif" | "tiff" | "dds" | "ktx"
        | "psd" => FileCategory::Texture,
        "mp3" | "wav" | "ogg" | "flac" | "aac" | "wma" | "m4a" | "aiff" => FileCategory::Audio,
        "fbx" | "obj" | "3ds" | "blend" | "dae" | "gltf" | "glb" | "stl" | "ply" => {
            FileCategory::Model
        }
        "txt" | "json" | "xml" | "lua" | "py" | "js" | "cs" | "cpp" | "c" | "h" => {
            FileCategory::Script
        }
        "bin" | "dat" | "pak" | "dll" | "exe" | "so" | "dylib" => FileCategory::Binary,
        _ => FileCategory::Other,
    };

    (category, category.default_level())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_extensions() {
        assert_eq!(classify(Path::new("a.png")).0, FileCategory::Texture);
        assert_eq!(classify(Path::new("music/theme.OGG")).0, FileCategory::Audio);
        assert_eq!(classify(Path::new("mesh.glb")).0, FileCategory::Model);
        assert_eq!(classify(Path::new("ai/brain.lua")).0, FileCategory::Script);
        assert_eq!(classify(Path::new("core.bin")).0, FileCategory::Binary);
    }

    #[test]
    fn unknown_and_missing_extensions_are_other() {
        assert_eq!(classify(Path::new("save.xyzzy")).0, FileCategory::Other);
        assert_eq!(classify(Path::new("README")).0, FileCategory::Other);
        assert_eq!(classify(Path::new("README")).1, 3);
    }

    #[test]
    fn classification_is_idempotent() {
        let p = Path::new("levels/town/a.dds");
        assert_eq!(classify(p), classify(p));
    }

    #[test]
    fn tags_round_trip() {
        for cat in FileCategory::all() {
            assert_eq!(FileCategory::from_tag(cat.tag()), Some(cat));
        }
        assert_eq!(FileCategory::from_tag(42), None);
    }
}
