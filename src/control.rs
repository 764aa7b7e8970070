use crate::controller::{self, Status};
use crate::error::RecoveryError;
use crate::registry::MountRegistry;
use log::info;
use std::sync::{Arc, Mutex, PoisonError};

/// Default payload limit for a device identifier (a 64-byte buffer with its
/// terminator).
pub const MAX_DEVICE_LEN: usize = 63;

type Observer = Box<dyn Fn(&Status) + Send + Sync>;

/// The read/write "target device" attribute.
///
/// Owns the last requested identifier. The lock around it is held for the
/// whole lookup-and-clear, so requests are processed one at a time.
pub struct ControlSurface {
    registry: Arc<dyn MountRegistry>,
    fs_type:  String,
    max_len:  usize,
    target:   Mutex<String>,
    observer: Option<Observer>,
}

impl ControlSurface {
    pub fn new(registry: Arc<dyn MountRegistry>, fs_type: &str) -> Self {
        Self {
            registry,
            fs_type:  fs_type.to_string(),
            max_len:  MAX_DEVICE_LEN,
            target:   Mutex::new(String::new()),
            observer: None,
        }
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Called with every request's status, after logging. Runs while the
    /// target lock is held, so it must not call back into the surface.
    pub fn with_observer(mut self, f: impl Fn(&Status) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(f));
        self
    }

    pub fn fs_type(&self) -> &str { &self.fs_type }

    /// Stores a new target and runs lookup-and-clear against it.
    ///
    /// Always reports the whole input as consumed, including when no mount
    /// matched; the outcome only shows up in the log. Use [`Self::submit`]
    /// or [`Self::set_target_strict`] to see it.
    pub fn set_target(&self, raw: &[u8]) -> Result<usize, RecoveryError> {
        self.submit(raw);
        Ok(raw.len())
    }

    /// Like `set_target`, but a miss is an error.
    pub fn set_target_strict(&self, raw: &[u8]) -> Result<Status, RecoveryError> {
        self.submit(raw).into_result()
    }

    /// Stores a new target, runs lookup-and-clear and returns the outcome.
    pub fn submit(&self, raw: &[u8]) -> Status {
        let mut target = self.target.lock().unwrap_or_else(PoisonError::into_inner);
        *target = decode_target(raw, self.max_len);
        info!("requested device={}", target);

        let status = controller::recover(&*self.registry, &self.fs_type, &target);
        if let Some(observer) = &self.observer {
            observer(&status);
        }
        status
    }

    /// The last requested identifier, newline-terminated.
    pub fn get_target(&self) -> String {
        let target = self.target.lock().unwrap_or_else(PoisonError::into_inner);
        format!("{}\n", target)
    }
}

/// Turns raw attribute input into a device identifier: at most `max_len`
/// bytes, cut at the first NUL, trailing `\n`/`\r` removed.
pub fn decode_target(raw: &[u8], max_len: usize) -> String {
    let raw = &raw[..raw.len().min(max_len)];
    let raw = match raw.iter().position(|&b| b == 0) {
        Some(nul) => &raw[..nul],
        None      => raw,
    };
    let mut s = String::from_utf8_lossy(raw).into_owned();
    if s.len() > max_len {
        // Lossy replacement can widen invalid bytes.
        let mut end = max_len;
        while !s.is_char_boundary(end) { end -= 1; }
        s.truncate(end);
    }
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::BackingDevice;
    use crate::models::mount::{MountFlags, MountRef, NewMount};
    use crate::registry::HostRegistry;
    use std::thread;

    fn setup(dev: &str, flags: MountFlags) -> (Arc<HostRegistry>, MountRef, ControlSurface) {
        let reg = Arc::new(HostRegistry::new());
        let sb = reg.mount(NewMount {
            fs_type:     "ext4".into(),
            mount_point: "/data".into(),
            device:      Some(BackingDevice::named(dev)),
            flags,
        });
        let surface = ControlSurface::new(reg.clone(), "ext4");
        (reg, sb, surface)
    }

    #[test]
    fn decode_strips_line_endings() {
        assert_eq!(decode_target(b"sdb1\n", MAX_DEVICE_LEN), "sdb1");
        assert_eq!(decode_target(b"sdb1\r\n", MAX_DEVICE_LEN), "sdb1");
        assert_eq!(decode_target(b"sdb1\n\n\r", MAX_DEVICE_LEN), "sdb1");
        assert_eq!(decode_target(b" sdb1 ", MAX_DEVICE_LEN), " sdb1 ");
    }

    #[test]
    fn decode_truncates_and_stops_at_nul() {
        let long = [b'a'; 65];
        assert_eq!(decode_target(&long, MAX_DEVICE_LEN).len(), MAX_DEVICE_LEN);
        assert_eq!(decode_target(b"sda1\0junk", MAX_DEVICE_LEN), "sda1");
        assert_eq!(decode_target(b"", MAX_DEVICE_LEN), "");
    }

    #[test]
    fn decode_never_exceeds_limit_with_invalid_utf8() {
        let raw = [0xffu8; 10];
        assert!(decode_target(&raw, 8).len() <= 8);
        let mut split = vec![b'x'; 62];
        split.extend_from_slice("é".as_bytes());
        assert!(decode_target(&split, MAX_DEVICE_LEN).len() <= MAX_DEVICE_LEN);
    }

    #[test]
    fn get_target_echoes_stripped_value() {
        let (_reg, _sb, surface) = setup("sda1", MountFlags::empty());
        assert_eq!(surface.get_target(), "\n");
        surface.set_target(b"sdb1\n").unwrap();
        assert_eq!(surface.get_target(), "sdb1\n");
    }

    #[test]
    fn overlong_write_is_truncated() {
        let (_reg, _sb, surface) = setup("sda1", MountFlags::empty());
        let raw = [b'z'; 65];
        assert_eq!(surface.set_target(&raw).unwrap(), 65);
        let shown = surface.get_target();
        assert!(shown.trim_end_matches('\n').len() <= MAX_DEVICE_LEN);
        assert_ne!(shown.trim_end_matches('\n').as_bytes(), &raw[..]);
    }

    #[test]
    fn not_found_still_reports_success() {
        let (reg, sb, surface) = setup("sda1", MountFlags::RDONLY);
        assert_eq!(surface.set_target(b"sdx9\n").unwrap(), 5);
        assert_eq!(sb.flags(), MountFlags::RDONLY);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn write_clears_matching_mount() {
        let (_reg, sb, surface) = setup("sda1", MountFlags::RDONLY | MountFlags::NOSUID);
        surface.set_target(b"sda1\n").unwrap();
        assert_eq!(sb.flags(), MountFlags::NOSUID);
    }

    #[test]
    fn strict_write_fails_on_miss() {
        let (_reg, _sb, surface) = setup("sda1", MountFlags::RDONLY);
        assert!(matches!(surface.set_target_strict(b"sdb1"), Err(RecoveryError::NotFound { .. })));
        assert!(matches!(surface.set_target_strict(b"sda1"), Ok(Status::Cleared { .. })));
        assert!(matches!(surface.set_target_strict(b"sda1"), Ok(Status::AlreadyWritable { .. })));
    }

    #[test]
    fn observer_sees_every_request() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (_reg, _sb, surface) = setup("sda1", MountFlags::RDONLY);
        let surface = {
            let seen = seen.clone();
            surface.with_observer(move |s| seen.lock().unwrap().push(s.label()))
        };
        surface.set_target(b"sda1").unwrap();
        surface.set_target(b"sda1").unwrap();
        surface.set_target(b"nope").unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["CLEAR", "NOOP", "MISS"]);
    }

    #[test]
    fn custom_max_len_applies() {
        let (_reg, _sb, surface) = setup("sda1", MountFlags::empty());
        let surface = surface.with_max_len(3);
        surface.set_target(b"sda1").unwrap();
        assert_eq!(surface.get_target(), "sda\n");
    }

    #[test]
    fn concurrent_writers_leave_a_whole_value() {
        let (_reg, sb, surface) = setup("sda1", MountFlags::RDONLY);
        let surface = Arc::new(surface);
        let writers: Vec<_> = ["sda1", "sdb1", "sdc1", "sdd1"]
            .into_iter()
            .map(|dev| {
                let surface = surface.clone();
                thread::spawn(move || {
                    for _ in 0..20 {
                        surface.set_target(format!("{}\n", dev).as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for w in writers { w.join().unwrap(); }

        let last = surface.get_target();
        assert!(["sda1\n", "sdb1\n", "sdc1\n", "sdd1\n"].contains(&last.as_str()));
        assert!(!sb.flags().is_read_only());
    }
}
