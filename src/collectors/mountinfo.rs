use crate::error::RecoveryError;
use crate::models::device::{short_device, BackingDevice};
use crate::models::mount::{MountFlags, NewMount};
use crate::registry::HostRegistry;
use anyhow::Result;
use log::debug;
use std::path::Path;

/// Build a host registry from a `/proc/<pid>/mountinfo` style table.
pub fn load(path: &Path) -> Result<HostRegistry> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| RecoveryError::MountTable { path: path.to_path_buf(), source })?;
    let registry = HostRegistry::new();
    for mount in parse(&content) {
        registry.mount(mount);
    }
    debug!("loaded {} mounts from {}", registry.len(), path.display());
    Ok(registry)
}

/// Parse every well-formed line. Malformed lines are skipped.
pub fn parse(content: &str) -> Vec<NewMount> {
    content.lines().filter_map(parse_line).collect()
}

/// One line:
/// `36 35 98:0 /mnt1 /mnt2 rw,noatime master:1 - ext3 /dev/root rw,errors=continue`
fn parse_line(line: &str) -> Option<NewMount> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let sep = fields.iter().position(|f| *f == "-")?;
    if sep < 6 || fields.len() < sep + 3 { return None; }

    let (major, minor) = fields[2].split_once(':')?;
    let major: u32 = major.parse().ok()?;
    let minor: u32 = minor.parse().ok()?;

    let mount_point = unescape(fields[4]);
    let fs_type     = fields[sep + 1].to_string();
    let source      = unescape(fields[sep + 2]);
    let super_opts  = fields.get(sep + 3).copied().unwrap_or("");

    // Read-only state of the superblock lives in the super options; the
    // per-mount "ro" only affects that one mount point.
    let mut flags = MountFlags::empty();
    for opt in fields[5].split(',') {
        if opt == "ro" { continue; }
        if let Some(f) = MountFlags::from_option(opt) { flags |= f; }
    }
    for opt in super_opts.split(',') {
        if let Some(f) = MountFlags::from_option(opt) { flags |= f; }
    }

    let device = (major != 0).then(|| BackingDevice::new(major, minor, short_device(&source)));

    Some(NewMount { fs_type, mount_point, device, flags })
}

/// Decode the kernel's octal escapes (`\040` for space, `\011` tab, ...).
fn unescape(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b)) {
            let code = (bytes[i + 1] - b'0') as u32 * 64
                     + (bytes[i + 2] - b'0') as u32 * 8
                     + (bytes[i + 3] - b'0') as u32;
            if let Ok(b) = u8::try_from(code) {
                out.push(b);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// VFS view of a mount point's read-only state, if it can be queried.
pub fn vfs_read_only(mount_point: &str) -> Option<bool> {
    use nix::sys::statvfs::{statvfs, FsFlags};
    let stat = statvfs(mount_point).ok()?;
    Some(stat.flags().contains(FsFlags::ST_RDONLY))
}
