//! Disk space probing using sysinfo

use bridge_traits::{
    error::{BridgeError, Result},
    storage::{StorageProbe, StorageSpace},
};
use std::path::{Path, PathBuf};
use sysinfo::Disks;
use tracing::debug;

/// Measures the volume holding a path.
///
/// The volume is the mounted disk with the longest mount point that prefixes
/// the canonicalized path.
#[derive(Debug, Default)]
pub struct SysinfoStorageProbe;

impl SysinfoStorageProbe {
    pub fn new() -> Self {
        Self
    }
}

impl StorageProbe for SysinfoStorageProbe {
    fn measure(&self, path: &Path) -> Result<StorageSpace> {
        let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let disks = Disks::new_with_refreshed_list();
        let mounts = disks.list().iter().map(|disk| {
            (
                disk.mount_point().to_path_buf(),
                StorageSpace {
                    usable_bytes: disk.available_space(),
                    total_bytes: disk.total_space(),
                },
            )
        });

        let space = select_volume(&resolved, mounts).ok_or_else(|| {
            BridgeError::NotAvailable(format!("no mounted volume holds {}", resolved.display()))
        })?;
        debug!(
            path = %resolved.display(),
            usable_bytes = space.usable_bytes,
            total_bytes = space.total_bytes,
            "Measured storage"
        );
        Ok(space)
    }
}

fn select_volume(
    path: &Path,
    mounts: impl Iterator<Item = (PathBuf, StorageSpace)>,
) -> Option<StorageSpace> {
    mounts
        .filter(|(mount, _)| path.starts_with(mount))
        .max_by_key(|(mount, _)| mount.components().count())
        .map(|(_, space)| space)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space(usable: u64) -> StorageSpace {
        StorageSpace {
            usable_bytes: usable,
            total_bytes: usable * 2,
        }
    }

    #[test]
    fn test_longest_mount_point_wins() {
        let mounts = vec![
            (PathBuf::from("/"), space(10)),
            (PathBuf::from("/data"), space(20)),
            (PathBuf::from("/data/media"), space(30)),
            (PathBuf::from("/datamedia"), space(40)),
        ];
        let picked = select_volume(Path::new("/data/media/cache"), mounts.into_iter());
        assert_eq!(picked.map(|s| s.usable_bytes), Some(30));
    }

    #[test]
    fn test_no_matching_mount() {
        let mounts = vec![(PathBuf::from("/mnt/usb"), space(10))];
        assert!(select_volume(Path::new("/var/cache"), mounts.into_iter()).is_none());
    }
}
