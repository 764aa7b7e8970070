//! Mount registry capability.
//!
//! The core never walks host structures directly. It asks a registry for the
//! set of active mounts and gets back pinned `MountRef`s, so a record cannot be
//! torn down while it is being compared or mutated.

mod host;

pub use host::HostRegistry;

use crate::models::mount::MountRef;

/// Anything that can list the currently active mounts.
///
/// Implementations must take whatever read-side lock their storage needs
/// while collecting the references; the references themselves keep each
/// record alive afterwards.
pub trait MountRegistry: Send + Sync {
    fn enumerate(&self) -> Mounts;
}

/// Iterator over pinned mount references, in host order.
#[derive(Debug)]
pub struct Mounts {
    inner: std::vec::IntoIter<MountRef>,
}

impl Mounts {
    pub fn new(refs: Vec<MountRef>) -> Self {
        Self { inner: refs.into_iter() }
    }
}

impl Iterator for Mounts {
    type Item = MountRef;

    fn next(&mut self) -> Option<MountRef> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
