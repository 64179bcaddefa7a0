use bitflags::bitflags;
use num_enum::IntoPrimitive;

/// Name of the only extended attribute the FAT32 server answers.
/// Its value is the decimal starting cluster of the path.
pub const DEBUG_CLUSTER_XATTR: &str = "debug.cluster";

/// Operations a VFS host layer may dispatch to the filesystem server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FsOp {
    GetAttr,
    ReadDir,
    Read,
    GetXattr,
}

impl FsOp {
    pub const ALL: [FsOp; 4] = [FsOp::GetAttr, FsOp::ReadDir, FsOp::Read, FsOp::GetXattr];

    /// Request verb used on the line protocol.
    pub fn verb(self) -> &'static str {
        match self {
            FsOp::GetAttr  => "getattr",
            FsOp::ReadDir  => "readdir",
            FsOp::Read     => "read",
            FsOp::GetXattr => "getxattr",
        }
    }
}

impl core::str::FromStr for FsOp {
    type Err = Errno;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FsOp::ALL.into_iter().find(|op| op.verb() == s).ok_or(Errno::EINVAL)
    }
}

/// POSIX error numbers handed back to the host layer (Linux values).
#[allow(clippy::upper_case_acronyms)]
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive)]
pub enum Errno {
    ENOENT  = 2,
    EIO     = 5,
    ENOTDIR = 20,
    EINVAL  = 22,
    ERANGE  = 34,
    ENODATA = 61,
}

impl Errno {
    pub fn name(self) -> &'static str {
        match self {
            Errno::ENOENT  => "ENOENT",
            Errno::EIO     => "EIO",
            Errno::ENOTDIR => "ENOTDIR",
            Errno::EINVAL  => "EINVAL",
            Errno::ERANGE  => "ERANGE",
            Errno::ENODATA => "ENODATA",
        }
    }
}

bitflags! {
    /// `st_mode` bits: file type in the high bits, permissions in the low nine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileMode: u32 {
        const IFDIR = 0o040000;
        const IFREG = 0o100000;

        const IRUSR = 0o400;
        const IWUSR = 0o200;
        const IXUSR = 0o100;
        const IRGRP = 0o040;
        const IWGRP = 0o020;
        const IXGRP = 0o010;
        const IROTH = 0o004;
        const IWOTH = 0o002;
        const IXOTH = 0o001;

        /// r-xr-xr-x, the only permission set a read-only mount hands out.
        const READ_ONLY = Self::IRUSR.bits() | Self::IXUSR.bits()
            | Self::IRGRP.bits() | Self::IXGRP.bits()
            | Self::IROTH.bits() | Self::IXOTH.bits();
    }
}

impl FileMode {
    pub fn directory() -> Self {
        FileMode::IFDIR | FileMode::READ_ONLY
    }

    pub fn regular() -> Self {
        FileMode::IFREG | FileMode::READ_ONLY
    }

    pub fn is_dir(self) -> bool {
        self.contains(FileMode::IFDIR)
    }
}
