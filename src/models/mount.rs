use crate::models::device::BackingDevice;
use bitflags::bitflags;
use serde::Serialize;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

bitflags! {
    /// Mount-state flags of a superblock. Bit values are the kernel's `MS_*`
    /// constants; bits without a name here are carried through untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MountFlags: u64 {
        const RDONLY      = libc::MS_RDONLY as u64;
        const NOSUID      = libc::MS_NOSUID as u64;
        const NODEV       = libc::MS_NODEV as u64;
        const NOEXEC      = libc::MS_NOEXEC as u64;
        const SYNCHRONOUS = libc::MS_SYNCHRONOUS as u64;
        const MANDLOCK    = libc::MS_MANDLOCK as u64;
        const DIRSYNC     = libc::MS_DIRSYNC as u64;
        const NOATIME     = libc::MS_NOATIME as u64;
        const NODIRATIME  = libc::MS_NODIRATIME as u64;
        const RELATIME    = libc::MS_RELATIME as u64;
        const LAZYTIME    = libc::MS_LAZYTIME as u64;

        const _ = !0;
    }
}

/// Mount option spelling of each named flag, in mountinfo order.
const OPTION_NAMES: &[(MountFlags, &str)] = &[
    (MountFlags::RDONLY,      "ro"),
    (MountFlags::NOSUID,      "nosuid"),
    (MountFlags::NODEV,       "nodev"),
    (MountFlags::NOEXEC,      "noexec"),
    (MountFlags::SYNCHRONOUS, "sync"),
    (MountFlags::MANDLOCK,    "mand"),
    (MountFlags::DIRSYNC,     "dirsync"),
    (MountFlags::NOATIME,     "noatime"),
    (MountFlags::NODIRATIME,  "nodiratime"),
    (MountFlags::RELATIME,    "relatime"),
    (MountFlags::LAZYTIME,    "lazytime"),
];

impl MountFlags {
    pub fn is_read_only(&self) -> bool {
        self.contains(Self::RDONLY)
    }

    /// Drops the read-only bit and nothing else.
    ///
    /// This is a raw state transition: it does not look at journal or error
    /// state of the filesystem, so the mount may become writable while its
    /// on-disk structures are inconsistent.
    pub fn clear_readonly(&mut self) {
        self.remove(Self::RDONLY);
    }

    /// Flag for a single mount option ("ro", "nosuid", ...).
    pub fn from_option(opt: &str) -> Option<Self> {
        OPTION_NAMES.iter().find(|(_, name)| *name == opt).map(|(f, _)| *f)
    }

    /// Option-string rendering: "ro,nosuid,noatime" or "rw,relatime".
    pub fn describe(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if !self.is_read_only() { parts.push("rw"); }
        for (flag, name) in OPTION_NAMES {
            if self.contains(*flag) { parts.push(name); }
        }
        let unknown = self.bits() & !Self::all_named().bits();
        let mut out = parts.join(",");
        if unknown != 0 {
            out.push_str(&format!(",0x{:x}", unknown));
        }
        out
    }

    fn all_named() -> Self {
        OPTION_NAMES.iter().fold(Self::empty(), |acc, (f, _)| acc | *f)
    }
}

/// Fields of a mount about to be registered with a host registry.
#[derive(Debug, Clone)]
pub struct NewMount {
    pub fs_type:     String,
    pub mount_point: String,
    pub device:      Option<BackingDevice>,
    pub flags:       MountFlags,
}

/// One live mount instance as the host sees it.
///
/// Everything but the flag set is fixed at mount time. The flag set sits
/// behind its own lock so inspecting and changing it is a single step.
#[derive(Debug)]
pub struct Superblock {
    id:          u64,
    fs_type:     String,
    mount_point: String,
    device:      Option<BackingDevice>,
    flags:       RwLock<MountFlags>,
    attached:    AtomicBool,
}

impl Superblock {
    pub fn new(id: u64, mount: NewMount) -> Self {
        Self {
            id,
            fs_type:     mount.fs_type,
            mount_point: mount.mount_point,
            device:      mount.device,
            flags:       RwLock::new(mount.flags),
            attached:    AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> u64 { self.id }
    pub fn fs_type(&self) -> &str { &self.fs_type }
    pub fn mount_point(&self) -> &str { &self.mount_point }
    pub fn device(&self) -> Option<&BackingDevice> { self.device.as_ref() }

    pub fn flags(&self) -> MountFlags {
        *self.flags.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with exclusive access to the flag set.
    pub fn update_flags<T>(&self, f: impl FnOnce(&mut MountFlags) -> T) -> T {
        let mut flags = self.flags.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut flags)
    }

    /// False once the host has unmounted this record. A pinned record stays
    /// readable and writable after that, it is just no longer enumerated.
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    pub(crate) fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    pub fn snapshot(&self) -> MountSnapshot {
        let flags = self.flags();
        MountSnapshot {
            id:          self.id,
            fs_type:     self.fs_type.clone(),
            mount_point: self.mount_point.clone(),
            device:      self.device.clone(),
            options:     flags.describe(),
            flag_bits:   flags.bits(),
            read_only:   flags.is_read_only(),
            attached:    self.is_attached(),
        }
    }
}

/// Pinned handle to a superblock.
///
/// Holding one keeps the record alive even if the host unmounts it
/// concurrently; the record is freed only when the last handle drops.
#[derive(Debug, Clone)]
pub struct MountRef(Arc<Superblock>);

impl MountRef {
    pub fn new(sb: Superblock) -> Self {
        Self(Arc::new(sb))
    }

    pub fn downgrade(this: &Self) -> Weak<Superblock> {
        Arc::downgrade(&this.0)
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Deref for MountRef {
    type Target = Superblock;

    fn deref(&self) -> &Superblock {
        &self.0
    }
}

/// Point-in-time copy of a superblock for listing and JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct MountSnapshot {
    pub id:          u64,
    pub fs_type:     String,
    pub mount_point: String,
    pub device:      Option<BackingDevice>,
    pub options:     String,
    pub flag_bits:   u64,
    pub read_only:   bool,
    pub attached:    bool,
}
