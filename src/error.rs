use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("no {fs_type} superblock found for device {device}")]
    NotFound { device: String, fs_type: String },

    #[error("cannot read mount table {}: {source}", .path.display())]
    MountTable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
