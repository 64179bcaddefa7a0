//! Path resolution: walk `/`-separated components from the root directory.

use core::ops::ControlFlow;

use log::debug;

use crate::device::BlockDev;
use crate::dir::{DirDecoder, DirEntry, LongName};
use crate::error::{Result, VfatError};
use crate::metadata::Metadata;
use crate::mount::MountContext;

impl<D: BlockDev> MountContext<D> {
    /// Visit every live entry of the directory starting at `start`, cluster by
    /// cluster, until `visit` breaks or the directory ends.
    ///
    /// A long name split across a cluster boundary is carried into the next cluster.
    pub fn walk_dir<T>(
        &self,
        start: u32,
        mut visit: impl FnMut(DirEntry) -> ControlFlow<T>,
    ) -> Result<Option<T>> {
        let mut pending = LongName::default();
        for cluster in self.chain(start) {
            let (found, rest, ended) = self.with_cluster(cluster?, |bytes| {
                let mut decoder = DirDecoder::resume(bytes, self.owner(), pending);
                let found = decoder.by_ref().find_map(|entry| match visit(entry) {
                    ControlFlow::Break(t) => Some(t),
                    ControlFlow::Continue(()) => None,
                });
                let ended = decoder.reached_end();
                (found, decoder.into_pending(), ended)
            })?;
            if found.is_some() {
                return Ok(found);
            }
            if ended {
                break;
            }
            pending = rest;
        }
        Ok(None)
    }

    /// Look up `name` in the directory starting at `dir_cluster`.
    fn lookup(&self, dir_cluster: u32, name: &str) -> Result<Option<Metadata>> {
        self.walk_dir(dir_cluster, |entry| {
            if entry.name == name {
                ControlFlow::Break(entry.metadata)
            } else {
                ControlFlow::Continue(())
            }
        })
    }

    /// Attributes of the entry at absolute `path`.
    ///
    /// `/` is answered from the synthesised root inode. Empty components
    /// (`//`, trailing `/`) are ignored; a trailing `/` on a file still fails.
    pub fn resolve(&self, path: &str) -> Result<Metadata> {
        let mut current = self.root().clone();
        let mut walked = String::new();
        let trailing_slash = path.len() > 1 && path.ends_with('/');

        for component in path.split('/').filter(|c| !c.is_empty()) {
            if !current.is_dir() {
                return Err(VfatError::NotADirectory { path: walked });
            }
            walked.push('/');
            walked.push_str(component);

            let mut found = self
                .lookup(current.first_cluster(), component)?
                .ok_or_else(|| VfatError::NotFound { path: walked.clone() })?;
            // `..` of a first-level directory points at cluster 0.
            if found.is_dir() && found.ino == 0 {
                found = self.root().clone();
            }
            current = found;
        }

        if trailing_slash && !current.is_dir() {
            return Err(VfatError::NotADirectory { path: walked });
        }
        debug!("vfat: resolve {:?} -> ino {}", path, current.ino);
        Ok(current)
    }
}
