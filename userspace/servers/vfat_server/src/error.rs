use std::io;

use thiserror::Error;
use vfat_api_types::Errno;

pub type Result<T, E = VfatError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum VfatError {
    #[error("I/O error on backing device: {0}")]
    Io(#[from] io::Error),

    #[error("not a FAT32 volume: {field} = {value}, {expected}")]
    InvalidVolume {
        field: &'static str,
        value: u64,
        expected: &'static str,
    },

    #[error("{path}: no such file or directory")]
    NotFound { path: String },

    #[error("{path}: not a directory")]
    NotADirectory { path: String },

    #[error("unsupported extended attribute {attribute:?}")]
    OutOfRange { attribute: String },

    #[error("attribute value needs {needed} bytes")]
    BufferTooSmall { needed: usize },

    #[error("cluster chain starting at {start} exceeds {limit} links")]
    CorruptChain { start: u32, limit: usize },
}

impl VfatError {
    pub(crate) fn invalid(field: &'static str, value: impl Into<u64>, expected: &'static str) -> Self {
        VfatError::InvalidVolume { field, value: value.into(), expected }
    }

    /// Error code reported to the host layer for this failure.
    pub fn errno(&self) -> Errno {
        match self {
            VfatError::NotFound { .. } => Errno::ENOENT,
            VfatError::NotADirectory { .. } => Errno::ENOTDIR,
            VfatError::OutOfRange { .. } => Errno::ENODATA,
            VfatError::BufferTooSmall { .. } => Errno::ERANGE,
            VfatError::Io(_)
            | VfatError::InvalidVolume { .. }
            | VfatError::CorruptChain { .. } => Errno::EIO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_request_errors_map_to_posix_codes() {
        assert_eq!(VfatError::NotFound { path: "/x".into() }.errno(), Errno::ENOENT);
        assert_eq!(VfatError::NotADirectory { path: "/a/b".into() }.errno(), Errno::ENOTDIR);
        assert_eq!(VfatError::OutOfRange { attribute: "user.x".into() }.errno(), Errno::ENODATA);
        assert_eq!(VfatError::BufferTooSmall { needed: 3 }.errno(), Errno::ERANGE);
        assert_eq!(VfatError::CorruptChain { start: 2, limit: 8 }.errno(), Errno::EIO);
    }

    #[test]
    fn invalid_volume_names_the_field() {
        let err = VfatError::invalid("bytes_per_sector", 256u16, "must be 512, 1024, 2048 or 4096");
        let msg = err.to_string();
        assert!(msg.contains("bytes_per_sector"));
        assert!(msg.contains("256"));
    }
}
