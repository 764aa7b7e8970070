use crate::control::MAX_DEVICE_LEN;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub control: ControlConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Filesystem type whose superblocks are searched (e.g. "ext4")
    pub fs_type: String,
    /// Longest device identifier accepted; longer writes are truncated
    pub max_device_len: usize,
    /// mountinfo-format table the host registry is built from
    pub mount_table: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Treat "no matching superblock" as a failed write instead of a logged miss.
    pub strict: bool,
    /// Append every request outcome to the status log.
    pub status_log: bool,
}

// ── Defaults ─────────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            control: ControlConfig::default(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            fs_type:        "ext4".to_string(),
            max_device_len: MAX_DEVICE_LEN,
            mount_table:    PathBuf::from("/proc/self/mountinfo"),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self { strict: false, status_log: true }
    }
}

// ── Load / save ──────────────────────────────────────────────────────

impl Config {
    /// Load from ~/.config/sbrecover/sbrecover.toml, falling back to defaults.
    pub fn load() -> Self {
        match try_load() {
            Ok(cfg) => cfg,
            Err(_) => {
                // Write defaults on first run (best-effort)
                let _ = try_write_defaults();
                Config::default()
            }
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sbrecover").join("sbrecover.toml"))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

fn try_load() -> Result<Config> {
    let path = Config::config_path().ok_or_else(|| anyhow::anyhow!("no config dir"))?;
    let text = fs::read_to_string(path)?;
    Config::from_toml(&text)
}

fn try_write_defaults() -> Result<()> {
    let path = Config::config_path().ok_or_else(|| anyhow::anyhow!("no config dir"))?;
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(&Config::default())?;
    fs::write(path, format!("# sbrecover configuration\n# Generated on first run, edit freely\n\n{}", text))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.general.fs_type, "ext4");
        assert_eq!(cfg.general.max_device_len, 63);
        assert_eq!(cfg.general.mount_table, PathBuf::from("/proc/self/mountinfo"));
        assert!(!cfg.control.strict);
        assert!(cfg.control.status_log);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = Config::from_toml("[general]\nfs_type = \"ext3\"\n\n[control]\nstrict = true\n").unwrap();
        assert_eq!(cfg.general.fs_type, "ext3");
        assert_eq!(cfg.general.max_device_len, 63);
        assert!(cfg.control.strict);
        assert!(cfg.control.status_log);
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let cfg = Config::from_toml(&text).unwrap();
        assert_eq!(cfg.general.fs_type, "ext4");
        assert_eq!(cfg.general.mount_table, PathBuf::from("/proc/self/mountinfo"));
    }

    #[test]
    fn bad_types_are_rejected() {
        assert!(Config::from_toml("[general]\nmax_device_len = \"big\"\n").is_err());
    }
}
