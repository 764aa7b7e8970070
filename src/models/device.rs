use serde::Serialize;

/// The block device a mount record is attached to.
///
/// `disk_name` is `None` when the device object exists but its name could not
/// be resolved (e.g. a mountinfo source that is not a `/dev/...` node).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackingDevice {
    pub major:     u32,
    pub minor:     u32,
    pub disk_name: Option<String>,
}

impl BackingDevice {
    pub fn new(major: u32, minor: u32, disk_name: Option<String>) -> Self {
        Self { major, minor, disk_name }
    }

    /// A device whose name is known, with placeholder numbers.
    pub fn named(name: &str) -> Self {
        Self::new(8, 0, Some(name.to_string()))
    }

    pub fn name(&self) -> Option<&str> {
        self.disk_name.as_deref()
    }

    /// "8:1" style device number.
    pub fn dev_t(&self) -> String {
        format!("{}:{}", self.major, self.minor)
    }
}

/// Returns the short device name ("sda1" from "/dev/sda1").
///
/// Sources that are not device nodes ("tmpfs", "UUID=...", "/dev/") yield `None`.
pub fn short_device(source: &str) -> Option<String> {
    let name = source.strip_prefix("/dev/")?.trim_start_matches("mapper/");
    if name.is_empty() { return None; }
    Some(name.to_string())
}
