use super::{MountRegistry, Mounts};
use crate::models::mount::{MountRef, NewMount, Superblock};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// In-process mount table.
///
/// Enumeration takes the shared lock, mount and unmount take the exclusive
/// one. Unmounting only detaches a record; memory is released when the last
/// outstanding `MountRef` is dropped.
#[derive(Debug, Default)]
pub struct HostRegistry {
    mounts:  RwLock<Vec<MountRef>>,
    next_id: AtomicU64,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new mount and returns a handle to it.
    pub fn mount(&self, mount: NewMount) -> MountRef {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let sb = MountRef::new(Superblock::new(id, mount));
        debug!("host: mounted #{} {} on {}", id, sb.fs_type(), sb.mount_point());
        self.mounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sb.clone());
        sb
    }

    /// Removes the mount with `id`. Returns the detached record, if any.
    pub fn unmount(&self, id: u64) -> Option<MountRef> {
        let mut mounts = self.mounts.write().unwrap_or_else(PoisonError::into_inner);
        let pos = mounts.iter().position(|m| m.id() == id)?;
        let sb = mounts.remove(pos);
        sb.detach();
        debug!("host: unmounted #{} {}", id, sb.mount_point());
        Some(sb)
    }

    pub fn len(&self) -> usize {
        self.mounts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl MountRegistry for HostRegistry {
    fn enumerate(&self) -> Mounts {
        let mounts = self.mounts.read().unwrap_or_else(PoisonError::into_inner);
        Mounts::new(mounts.iter().cloned().collect())
    }
}
