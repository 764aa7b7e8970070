use crate::controller::Status;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("sbrecover").join("status.log"))
}

/// Append one request outcome to the persistent status log (best-effort).
pub fn append(status: &Status) {
    if let Some(path) = log_path() {
        append_to(&path, status);
    }
}

/// Last `n` log lines, oldest first.
pub fn load_recent(n: usize) -> Vec<String> {
    log_path().map(|p| read_recent(&p, n)).unwrap_or_default()
}

fn append_to(path: &Path, status: &Status) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{} [{}] {}", now, status.label(), status);
    }
}

fn read_recent(path: &Path, n: usize) -> Vec<String> {
    let text = match fs::read_to_string(path) { Ok(t) => t, Err(_) => return Vec::new() };
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].iter().map(|l| l.to_string()).collect()
}
