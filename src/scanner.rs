use crate::models::mount::MountRef;
use crate::registry::MountRegistry;
use log::{debug, trace};

/// Finds the first active mount of `fs_type` whose backing device is named
/// exactly `device` (case-sensitive, short name such as "sda1").
///
/// Records without a backing device, or whose device name is not available,
/// are skipped. The returned handle pins the record until it is dropped.
pub fn find_mount<R>(registry: &R, fs_type: &str, device: &str) -> Option<MountRef>
where
    R: MountRegistry + ?Sized,
{
    for sb in registry.enumerate() {
        let Some(bdev) = sb.device() else {
            trace!("scan: #{} has no backing device", sb.id());
            continue;
        };
        if sb.fs_type() != fs_type { continue; }
        let Some(name) = bdev.name() else {
            debug!("scan: #{} {} on {} has no device name, skipping",
                sb.id(), sb.fs_type(), bdev.dev_t());
            continue;
        };
        if name == device {
            debug!("scan: matched #{} {} on {}", sb.id(), fs_type, sb.mount_point());
            return Some(sb);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::BackingDevice;
    use crate::models::mount::{MountFlags, NewMount};
    use crate::registry::HostRegistry;

    fn mount(reg: &HostRegistry, fs_type: &str, device: Option<BackingDevice>) -> MountRef {
        reg.mount(NewMount {
            fs_type:     fs_type.into(),
            mount_point: "/mnt".into(),
            device,
            flags:       MountFlags::RDONLY,
        })
    }

    #[test]
    fn finds_exact_device_of_matching_type() {
        let reg = HostRegistry::new();
        mount(&reg, "ext4", Some(BackingDevice::named("sda2")));
        let want = mount(&reg, "ext4", Some(BackingDevice::named("sda1")));
        let got = find_mount(&reg, "ext4", "sda1").expect("should match");
        assert!(MountRef::ptr_eq(&got, &want));
    }

    #[test]
    fn unknown_device_is_not_found() {
        let reg = HostRegistry::new();
        mount(&reg, "ext4", Some(BackingDevice::named("sda1")));
        assert!(find_mount(&reg, "ext4", "sdz9").is_none());
        assert!(find_mount(&reg, "ext4", "").is_none());
    }

    #[test]
    fn matching_is_exact_and_case_sensitive() {
        let reg = HostRegistry::new();
        mount(&reg, "ext4", Some(BackingDevice::named("sda1")));
        assert!(find_mount(&reg, "ext4", "SDA1").is_none());
        assert!(find_mount(&reg, "ext4", "sda").is_none());
        assert!(find_mount(&reg, "ext4", "sda10").is_none());
        assert!(find_mount(&reg, "ext4", "/dev/sda1").is_none());
    }

    #[test]
    fn other_filesystem_types_are_ignored() {
        let reg = HostRegistry::new();
        mount(&reg, "xfs", Some(BackingDevice::named("sdb1")));
        assert!(find_mount(&reg, "ext4", "sdb1").is_none());
        assert!(find_mount(&reg, "xfs", "sdb1").is_some());
    }

    #[test]
    fn records_without_device_or_name_are_skipped() {
        let reg = HostRegistry::new();
        mount(&reg, "ext4", None);
        mount(&reg, "ext4", Some(BackingDevice::new(8, 1, None)));
        let want = mount(&reg, "ext4", Some(BackingDevice::named("sda1")));
        let got = find_mount(&reg, "ext4", "sda1").expect("named one still matches");
        assert!(MountRef::ptr_eq(&got, &want));
    }

    #[test]
    fn first_match_wins() {
        let reg = HostRegistry::new();
        let first = mount(&reg, "ext4", Some(BackingDevice::named("sda1")));
        mount(&reg, "ext4", Some(BackingDevice::named("sda1")));
        let got = find_mount(&reg, "ext4", "sda1").unwrap();
        assert!(MountRef::ptr_eq(&got, &first));
    }

    #[test]
    fn lookup_does_not_mutate() {
        let reg = HostRegistry::new();
        let sb = mount(&reg, "ext4", Some(BackingDevice::named("sda1")));
        let _ = find_mount(&reg, "ext4", "sda1");
        let _ = find_mount(&reg, "ext4", "nope");
        assert_eq!(sb.flags(), MountFlags::RDONLY);
    }
}
