use std::fmt;

use crate::error::IntakeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    TorrentDescriptor,
    MagnetLink,
}

impl FileKind {
    pub fn label(&self) -> &'static str {
        match self {
            FileKind::TorrentDescriptor => "torrent",
            FileKind::MagnetLink => "magnet",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decides what to do with a file from its name alone.
///
/// Case-sensitive suffix match, `.magnet` checked before `.torrent`.
pub fn classify(name: &str) -> Result<FileKind, IntakeError> {
    if name.ends_with(".magnet") {
        Ok(FileKind::MagnetLink)
    } else if name.ends_with(".torrent") {
        Ok(FileKind::TorrentDescriptor)
    } else {
        Err(IntakeError::UnrecognizedFileKind { name: name.to_string() })
    }
}
