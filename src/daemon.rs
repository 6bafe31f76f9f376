//! Background daemon for periodic catalog refreshes.
//!
//! Keeps the local cache warm without a system scheduler: an interval
//! loop hands refresh requests to the sync scheduler, which owns the
//! retry policy and the single-run admission control.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::time::interval;

use crate::app::{AppContext, LightboxError, Result};
use crate::scheduler::{spawn_scheduler, SyncHandle, SyncState};
use crate::store::CatalogStore;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Refresh interval in seconds (default: 3600 = 1 hour)
    pub update_interval_secs: u64,
    /// Whether to run a refresh immediately on start
    pub update_on_start: bool,
    /// Log file path (None = stdout)
    pub log_file: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 3600,
            update_on_start: true,
            log_file: None,
        }
    }
}

impl DaemonConfig {
    /// Parse an interval string like "1h", "30m", "6h", "1d"
    pub fn parse_interval(s: &str) -> Result<u64> {
        let s = s.trim().to_lowercase();

        let parsed = if let Some(hours) = s.strip_suffix('h') {
            hours.parse::<u64>().ok().map(|h| h * 3600)
        } else if let Some(minutes) = s.strip_suffix('m') {
            minutes.parse::<u64>().ok().map(|m| m * 60)
        } else if let Some(days) = s.strip_suffix('d') {
            days.parse::<u64>().ok().map(|d| d * 86400)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>().ok()
        } else {
            s.parse::<u64>().ok()
        };

        parsed.ok_or_else(|| {
            LightboxError::Config(format!(
                "Invalid interval: {}. Use a format like '1h', '30m', '1d'",
                s
            ))
        })
    }

    /// Format an interval for display
    pub fn format_interval(secs: u64) -> String {
        if secs >= 86400 && secs % 86400 == 0 {
            format!("{}d", secs / 86400)
        } else if secs >= 3600 && secs % 3600 == 0 {
            format!("{}h", secs / 3600)
        } else if secs >= 60 && secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }
}

pub struct Daemon {
    ctx: Arc<AppContext>,
    config: DaemonConfig,
    running: Arc<AtomicBool>,
}

impl Daemon {
    pub fn new(ctx: Arc<AppContext>, config: DaemonConfig) -> Self {
        Self {
            ctx,
            config,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn pid_file_path() -> Option<PathBuf> {
        dirs::runtime_dir()
            .or_else(dirs::cache_dir)
            .map(|d| d.join("lightbox").join("daemon.pid"))
    }

    /// Check if another daemon is already running
    pub fn is_running() -> bool {
        if let Some(pid_path) = Self::pid_file_path() {
            if pid_path.exists() {
                if let Ok(pid_str) = fs::read_to_string(&pid_path) {
                    if let Ok(pid) = pid_str.trim().parse::<u32>() {
                        return Self::process_exists(pid);
                    }
                }
            }
        }
        false
    }

    #[cfg(unix)]
    fn process_exists(pid: u32) -> bool {
        use std::process::Command;
        Command::new("kill")
            .args(["-0", &pid.to_string()])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[cfg(windows)]
    fn process_exists(pid: u32) -> bool {
        use std::process::Command;
        Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid)])
            .output()
            .map(|o| String::from_utf8_lossy(&o.stdout).contains(&pid.to_string()))
            .unwrap_or(false)
    }

    fn write_pid_file(&self) -> std::io::Result<()> {
        if let Some(pid_path) = Self::pid_file_path() {
            if let Some(parent) = pid_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(&pid_path)?;
            writeln!(file, "{}", std::process::id())?;
        }
        Ok(())
    }

    fn remove_pid_file(&self) {
        if let Some(pid_path) = Self::pid_file_path() {
            let _ = fs::remove_file(pid_path);
        }
    }

    fn log(&self, msg: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!("[{}] {}", timestamp, msg);

        if let Some(ref log_path) = self.config.log_file {
            if let Ok(mut file) = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)
            {
                let _ = writeln!(file, "{}", line);
            }
        } else {
            println!("{}", line);
        }
    }

    pub async fn run(&self) -> Result<()> {
        if Self::is_running() {
            return Err(LightboxError::Other(
                "Another daemon instance is already running".to_string(),
            ));
        }

        self.write_pid_file()
            .map_err(|e| LightboxError::Other(format!("Failed to write PID file: {}", e)))?;

        let running = self.running.clone();

        #[cfg(unix)]
        {
            let running_clone = running.clone();
            tokio::spawn(async move {
                let mut sigterm =
                    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                        .expect("Failed to set up SIGTERM handler");
                let mut sigint =
                    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
                        .expect("Failed to set up SIGINT handler");

                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = sigint.recv() => {},
                }
                running_clone.store(false, Ordering::SeqCst);
            });
        }

        #[cfg(windows)]
        {
            let running_clone = running.clone();
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                running_clone.store(false, Ordering::SeqCst);
            });
        }

        let scheduler = spawn_scheduler(self.ctx.mediator.clone());

        self.log(&format!(
            "Lightbox daemon started (refresh interval: {}, PID: {})",
            DaemonConfig::format_interval(self.config.update_interval_secs),
            std::process::id()
        ));

        if self.config.update_on_start {
            self.log("Running initial refresh...");
            self.run_update(&scheduler).await;
        }

        let mut timer = interval(Duration::from_secs(self.config.update_interval_secs));
        timer.tick().await; // Skip the first immediate tick

        while self.running.load(Ordering::SeqCst) {
            timer.tick().await;

            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            self.log("Running scheduled refresh...");
            self.run_update(&scheduler).await;
        }

        self.log("Daemon shutting down...");
        scheduler.shutdown().await;
        self.remove_pid_file();

        Ok(())
    }

    /// Hand one refresh to the scheduler and wait for it to settle.
    async fn run_update(&self, scheduler: &SyncHandle) {
        scheduler.request_sync().await;

        let mut state = scheduler.subscribe();
        let settled = state
            .wait_for(|s| matches!(s, SyncState::Idle | SyncState::Failed))
            .await
            .map(|s| *s);

        match settled {
            Ok(SyncState::Idle) => match self.ctx.store.photo_count() {
                Ok(count) => self.log(&format!("Refresh complete: {} photos cached", count)),
                Err(e) => self.log(&format!("Refresh complete, count unavailable: {}", e)),
            },
            Ok(SyncState::Failed) => {
                self.log("Refresh failed after all attempts; will try again next interval")
            }
            _ => self.log("Scheduler stopped unexpectedly"),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Stop a running daemon by reading the PID file and sending a signal
pub fn stop_daemon() -> Result<()> {
    let pid_path = Daemon::pid_file_path()
        .ok_or_else(|| LightboxError::Other("Could not determine PID file path".to_string()))?;

    if !pid_path.exists() {
        return Err(LightboxError::Other(
            "No daemon is running (PID file not found)".to_string(),
        ));
    }

    let pid_str = fs::read_to_string(&pid_path)
        .map_err(|e| LightboxError::Other(format!("Failed to read PID file: {}", e)))?;

    let pid: u32 = pid_str
        .trim()
        .parse()
        .map_err(|_| LightboxError::Other("Invalid PID in PID file".to_string()))?;

    #[cfg(unix)]
    {
        use std::process::Command;
        let status = Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .status()
            .map_err(|e| LightboxError::Other(format!("Failed to send signal: {}", e)))?;

        if status.success() {
            let _ = fs::remove_file(&pid_path);
            Ok(())
        } else {
            Err(LightboxError::Other(format!(
                "Failed to stop daemon (PID {})",
                pid
            )))
        }
    }

    #[cfg(windows)]
    {
        use std::process::Command;
        let status = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/F"])
            .status()
            .map_err(|e| LightboxError::Other(format!("Failed to stop process: {}", e)))?;

        if status.success() {
            let _ = fs::remove_file(&pid_path);
            Ok(())
        } else {
            Err(LightboxError::Other(format!(
                "Failed to stop daemon (PID {})",
                pid
            )))
        }
    }
}

/// Human-readable daemon status
pub fn daemon_status() -> String {
    if let Some(pid_path) = Daemon::pid_file_path() {
        if pid_path.exists() {
            if let Ok(pid_str) = fs::read_to_string(&pid_path) {
                if let Ok(pid) = pid_str.trim().parse::<u32>() {
                    if Daemon::process_exists(pid) {
                        return format!("Daemon is running (PID: {})", pid);
                    } else {
                        return "Daemon is not running (stale PID file)".to_string();
                    }
                }
            }
        }
    }
    "Daemon is not running".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        assert_eq!(DaemonConfig::parse_interval("1h").unwrap(), 3600);
        assert_eq!(DaemonConfig::parse_interval("30m").unwrap(), 1800);
        assert_eq!(DaemonConfig::parse_interval("1d").unwrap(), 86400);
        assert_eq!(DaemonConfig::parse_interval("60s").unwrap(), 60);
        assert_eq!(DaemonConfig::parse_interval("3600").unwrap(), 3600);
        assert!(DaemonConfig::parse_interval("soon").is_err());
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(DaemonConfig::format_interval(3600), "1h");
        assert_eq!(DaemonConfig::format_interval(1800), "30m");
        assert_eq!(DaemonConfig::format_interval(86400), "1d");
        assert_eq!(DaemonConfig::format_interval(90), "90s");
        assert_eq!(DaemonConfig::format_interval(7200), "2h");
    }
}
