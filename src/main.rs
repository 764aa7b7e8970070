use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use sbrecover::config::Config;
use sbrecover::control::ControlSurface;
use sbrecover::models::mount::MountSnapshot;
use sbrecover::registry::{HostRegistry, MountRegistry};
use sbrecover::{collectors, util};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "sbrecover",
    about = "Clear the read-only flag of a mounted filesystem's superblock, by device name",
    long_about = "Looks up the superblock whose backing device is DEVICE (short name, e.g. sda1) \
                  and clears its in-memory read-only flag.\n\n\
                  WARNING: no journal or error-state check is made. This is a last-resort \
                  recovery step, not a safe remount.",
    version = "0.1"
)]
struct Cli {
    /// Device to recover (short name such as "sda1"); one write to the target attribute
    device: Option<String>,

    /// Read one device per line from stdin; a line "?" prints the current target
    #[arg(long)]
    stdin: bool,

    /// List superblocks of the target filesystem type and exit
    #[arg(long)]
    list: bool,

    /// Print the superblock list as JSON and exit
    #[arg(long)]
    json: bool,

    /// Filesystem type to search (overrides config)
    #[arg(short = 't', long)]
    fs_type: Option<String>,

    /// mountinfo-format table to build the registry from (overrides config)
    #[arg(short = 'm', long)]
    mount_table: Option<PathBuf>,

    /// Fail when no superblock matches instead of only logging it
    #[arg(long)]
    strict: bool,

    /// Print the last N status log entries and exit
    #[arg(long, value_name = "N")]
    history: Option<usize>,

    /// Print config file path and current values, then exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if cli.print_config {
        return run_print_config();
    }
    if let Some(n) = cli.history {
        return run_history(n);
    }

    let mut cfg = Config::load();
    if let Some(t) = cli.fs_type { cfg.general.fs_type = t; }
    if let Some(p) = cli.mount_table { cfg.general.mount_table = p; }
    if cli.strict { cfg.control.strict = true; }

    let registry = Arc::new(
        collectors::mountinfo::load(&cfg.general.mount_table)
            .context("building mount registry")?,
    );

    if cli.json {
        return run_json(&registry, &cfg);
    }
    if cli.list {
        return run_list(&registry, &cfg);
    }

    let surface = build_surface(registry, &cfg);
    if cli.stdin {
        return run_session(&surface, cfg.control.strict);
    }
    match cli.device {
        Some(dev) => run_once(&surface, &dev, cfg.control.strict),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

fn build_surface(registry: Arc<HostRegistry>, cfg: &Config) -> ControlSurface {
    let keep_log = cfg.control.status_log;
    ControlSurface::new(registry, &cfg.general.fs_type)
        .with_max_len(cfg.general.max_device_len)
        .with_observer(move |status| {
            println!("[{}] {}", status.label(), status);
            if keep_log { util::status_log::append(status); }
        })
}

fn write_target(surface: &ControlSurface, raw: &[u8], strict: bool) -> Result<()> {
    if strict {
        surface.set_target_strict(raw)?;
    } else {
        surface.set_target(raw)?;
    }
    Ok(())
}

fn run_once(surface: &ControlSurface, device: &str, strict: bool) -> Result<()> {
    write_target(surface, device.as_bytes(), strict)
}

fn run_session(surface: &ControlSurface, strict: bool) -> Result<()> {
    let stdin = io::stdin();
    let mut failures = 0usize;
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim() == "?" {
            print!("{}", surface.get_target());
            io::stdout().flush()?;
            continue;
        }
        if let Err(e) = write_target(surface, line.as_bytes(), strict) {
            log::error!("{}", e);
            failures += 1;
        }
    }
    if failures > 0 {
        anyhow::bail!("{} request(s) found no {} superblock", failures, surface.fs_type());
    }
    Ok(())
}

fn matching_snapshots(registry: &HostRegistry, fs_type: &str) -> Vec<MountSnapshot> {
    registry.enumerate()
        .filter(|m| m.fs_type() == fs_type)
        .map(|m| m.snapshot())
        .collect()
}

fn run_list(registry: &HostRegistry, cfg: &Config) -> Result<()> {
    let mounts = matching_snapshots(registry, &cfg.general.fs_type);
    let live = cfg.general.mount_table.starts_with("/proc");
    print!("{}", util::report::generate(&cfg.general.fs_type, &mounts, |mp| {
        if live { collectors::mountinfo::vfs_read_only(mp) } else { None }
    }));
    Ok(())
}

fn run_json(registry: &HostRegistry, cfg: &Config) -> Result<()> {
    use serde_json::json;

    let mounts = matching_snapshots(registry, &cfg.general.fs_type);
    let snapshot = json!({
        "sbrecover_version": "0.1",
        "timestamp":   chrono::Local::now().to_rfc3339(),
        "fs_type":     cfg.general.fs_type,
        "mount_table": cfg.general.mount_table,
        "superblocks": mounts,
    });
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn run_history(n: usize) -> Result<()> {
    let entries = util::status_log::load_recent(n);
    if entries.is_empty() {
        println!("No requests in status log.");
        return Ok(());
    }
    for line in &entries {
        println!("{}", line);
    }
    Ok(())
}

fn run_print_config() -> Result<()> {
    let cfg = Config::load();
    let path = Config::config_path()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(unknown)".to_string());
    let log = util::status_log::log_path()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(unknown)".to_string());
    println!("Config: {}", path);
    println!();
    println!("[general]");
    println!("  fs_type        = {}", cfg.general.fs_type);
    println!("  max_device_len = {}", cfg.general.max_device_len);
    println!("  mount_table    = {}", cfg.general.mount_table.display());
    println!();
    println!("[control]");
    println!("  strict     = {}", cfg.control.strict);
    println!("  status_log = {} ({})", cfg.control.status_log, log);
    Ok(())
}
