use std::env;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;

use log::LevelFilter;
use vfat::MountOptions;

const USAGE: &str = "usage: vfat_server <device-or-image>";

/// Startup configuration: the device argument plus `VFAT_*` environment variables.
pub struct Config {
    pub device:        PathBuf,
    pub log_level:     LevelFilter,
    pub max_chain_len: Option<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let device = env::args_os().nth(1).map(PathBuf::from).ok_or(USAGE)?;

        let log_level = match env::var("VFAT_LOG") {
            Ok(s) => s.parse().map_err(|_| format!("VFAT_LOG: unknown level {s:?}"))?,
            Err(_) => LevelFilter::Info,
        };
        let max_chain_len = match env::var("VFAT_MAX_CHAIN") {
            Ok(s) => Some(s.parse().map_err(|_| format!("VFAT_MAX_CHAIN: not a number: {s:?}"))?),
            Err(_) => None,
        };
        Ok(Self { device, log_level, max_chain_len })
    }

    /// uid/gid reported for every entry: the user running the server, or the
    /// device's owner when that cannot be determined.
    fn owner(&self) -> Result<(u32, u32), std::io::Error> {
        if let Some(owner) = process_owner() {
            return Ok(owner);
        }
        let meta = fs::metadata(&self.device)?;
        Ok((meta.uid(), meta.gid()))
    }

    pub fn mount_options(&self) -> Result<MountOptions, std::io::Error> {
        let (uid, gid) = self.owner()?;
        let mut options = MountOptions::new().owner(uid, gid);
        if let Some(n) = self.max_chain_len {
            options = options.max_chain_len(n);
        }
        Ok(options)
    }
}

/// Effective uid/gid of this process, read from the owner of `/proc/self`.
fn process_owner() -> Option<(u32, u32)> {
    let meta = fs::metadata("/proc/self").ok()?;
    Some((meta.uid(), meta.gid()))
}
