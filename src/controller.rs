use crate::error::RecoveryError;
use crate::models::mount::MountRef;
use crate::registry::MountRegistry;
use crate::scanner::find_mount;
use log::{info, warn};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    AlreadyWritable,
    Cleared,
}

/// Clears the read-only bit of a pinned superblock if it is set.
///
/// Check and clear run under the record's flag lock. No other flag bit is
/// touched. Nothing here verifies the journal or error state of the
/// filesystem: this is a last-resort recovery primitive, not a remount.
pub fn clear_if_readonly(handle: &MountRef) -> Outcome {
    let outcome = handle.update_flags(|flags| {
        if flags.is_read_only() {
            flags.clear_readonly();
            Outcome::Cleared
        } else {
            Outcome::AlreadyWritable
        }
    });
    if !handle.is_attached() {
        warn!("superblock #{} on {} was unmounted while pinned",
            handle.id(), handle.mount_point());
    }
    outcome
}

/// Result of one lookup-and-clear request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    NotFound        { device: String, fs_type: String },
    AlreadyWritable { device: String, mount_point: String },
    Cleared         { device: String, mount_point: String },
}

impl Status {
    pub fn device(&self) -> &str {
        match self {
            Status::NotFound { device, .. }
            | Status::AlreadyWritable { device, .. }
            | Status::Cleared { device, .. } => device,
        }
    }

    pub fn is_found(&self) -> bool {
        !matches!(self, Status::NotFound { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::NotFound { .. }        => "MISS",
            Status::AlreadyWritable { .. } => "NOOP",
            Status::Cleared { .. }         => "CLEAR",
        }
    }

    /// Turns a miss into an error for callers that want strict semantics.
    pub fn into_result(self) -> Result<Status, RecoveryError> {
        match self {
            Status::NotFound { device, fs_type } => Err(RecoveryError::NotFound { device, fs_type }),
            found => Ok(found),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NotFound { device, fs_type } =>
                write!(f, "no {} superblock found for device {}", fs_type, device),
            Status::AlreadyWritable { device, mount_point } =>
                write!(f, "{} ({}) superblock not marked read-only", device, mount_point),
            Status::Cleared { device, mount_point } =>
                write!(f, "{} ({}) read-only flag cleared; now try remounting read-write", device, mount_point),
        }
    }
}

/// Looks up `device` among mounts of `fs_type` and clears its read-only
/// flag. The handle stays pinned from lookup until the flag has been
/// written.
pub fn recover<R>(registry: &R, fs_type: &str, device: &str) -> Status
where
    R: MountRegistry + ?Sized,
{
    let Some(sb) = find_mount(registry, fs_type, device) else {
        let status = Status::NotFound { device: device.to_string(), fs_type: fs_type.to_string() };
        warn!("{}", status);
        return status;
    };

    let was_read_only = sb.flags().is_read_only();
    if was_read_only {
        info!("found {} sb on {}, currently read-only; clearing", fs_type, device);
    }

    let mount_point = sb.mount_point().to_string();
    let status = match clear_if_readonly(&sb) {
        Outcome::Cleared         => Status::Cleared { device: device.to_string(), mount_point },
        Outcome::AlreadyWritable => Status::AlreadyWritable { device: device.to_string(), mount_point },
    };
    info!("{}", status);
    status
}
