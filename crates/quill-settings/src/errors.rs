//! Settings errors. Every variant names the file it came from.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a settings file into [`QuillSettings`](crate::QuillSettings).
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file exists but could not be read.
    #[error("cannot read settings file {}: {source}", path.display())]
    Read {
        /// Settings file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not JSON.
    #[error("settings file {} is not valid JSON: {source}", path.display())]
    Parse {
        /// Settings file.
        path: PathBuf,
        /// Parser error with line and column.
        source: serde_json::Error,
    },
    /// Valid JSON whose fields have the wrong types once merged over defaults.
    #[error("settings file {} has an unexpected shape: {source}", path.display())]
    Shape {
        /// Settings file.
        path: PathBuf,
        /// Deserialization error naming the offending field.
        source: serde_json::Error,
    },
}

impl SettingsError {
    /// The settings file involved.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::Shape { path, .. } => path,
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_names_file() {
        let err = SettingsError::Read {
            path: PathBuf::from("/etc/quill.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "cannot read settings file /etc/quill.json: denied");
        assert_eq!(err.path(), std::path::Path::new("/etc/quill.json"));
    }

    #[test]
    fn parse_error_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let err = SettingsError::Parse {
            path: PathBuf::from("s.json"),
            source,
        };
        assert!(err.to_string().starts_with("settings file s.json is not valid JSON"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
