use crate::audio::format;
use crate::audio::AudioArtifact;
use crate::error::ImportError;

/// Largest accepted import, in MiB
pub const IMPORT_SIZE_LIMIT_MB: u64 = 50;

/// Object-name label for imported files
pub const IMPORT_LABEL: &str = "x";

const ACCEPTED_TYPES: [&str; 4] = ["audio/mp3", "audio/mpeg", "audio/mp4", "video/mp4"];
const ACCEPTED_EXTENSIONS: [&str; 4] = [".mp3", ".mp4", ".m4a", ".mpeg"];

/// Check an imported file by declared type or name, then size
pub fn validate_import(name: &str, mime_type: &str, size: u64) -> Result<(), ImportError> {
    let lower = name.to_ascii_lowercase();
    let accepted = ACCEPTED_TYPES.contains(&mime_type)
        || ACCEPTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext));

    if !accepted {
        return Err(ImportError::UnsupportedType);
    }

    if size > IMPORT_SIZE_LIMIT_MB * 1024 * 1024 {
        return Err(ImportError::TooLarge {
            limit_mb: IMPORT_SIZE_LIMIT_MB,
        });
    }

    Ok(())
}

/// An existing audio file selected for upload instead of a recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedAudio {
    pub name: String,
    pub file_extension: String,
    /// Payload tagged with the declared type, or `audio/<ext>` when none
    pub artifact: AudioArtifact,
}

impl ImportedAudio {
    pub fn new(name: impl Into<String>, mime_type: &str, payload: Vec<u8>) -> Result<Self, ImportError> {
        let name = name.into();
        validate_import(&name, mime_type, payload.len() as u64)?;

        // Case-sensitive substring match on the name; unknown names keep
        // the generic extension
        let file_extension = format::file_extension(&name).to_string();

        let content_type = if mime_type.is_empty() {
            format!("audio/{}", file_extension)
        } else {
            mime_type.to_string()
        };

        Ok(Self {
            name,
            file_extension,
            artifact: AudioArtifact::new(payload, content_type),
        })
    }

    pub fn payload(&self) -> &[u8] {
        self.artifact.payload()
    }

    pub fn content_type(&self) -> &str {
        self.artifact.mime_type()
    }

    pub fn len(&self) -> usize {
        self.artifact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifact.is_empty()
    }
}
