use crate::models::mount::MountSnapshot;

/// Render superblocks as a text table.
///
/// `vfs` reports what the kernel currently says about each mount point
/// (`None` when it cannot be queried, e.g. for a table loaded from a file).
pub fn generate(fs_type: &str, mounts: &[MountSnapshot], vfs: impl Fn(&str) -> Option<bool>) -> String {
    let mut out = String::new();

    out.push_str(&format!("── {} superblocks ({}) ─────────────────────────\n", fs_type, mounts.len()));
    if mounts.is_empty() {
        out.push_str("  (none)\n");
        return out;
    }

    out.push_str(&format!("  {:<4} {:<16} {:<8} {:<5} {:<5} {:<28} {}\n",
        "ID", "DEVICE", "DEV", "SB", "VFS", "OPTIONS", "MOUNT"));
    for m in mounts {
        let (name, dev_t) = match &m.device {
            Some(d) => (d.name().unwrap_or("?").to_string(), d.dev_t()),
            None    => ("-".to_string(), "-".to_string()),
        };
        let sb = if m.read_only { "ro" } else { "rw" };
        let vfs = match vfs(&m.mount_point) {
            Some(true)  => "ro",
            Some(false) => "rw",
            None        => "?",
        };
        out.push_str(&format!("  {:<4} {:<16} {:<8} {:<5} {:<5} {:<28} {}\n",
            m.id, name, dev_t, sb, vfs, m.options, m.mount_point));
    }
    out
}
