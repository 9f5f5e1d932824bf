//! System-info collaborator: host statistics and per-command timings.

use std::collections::VecDeque;
use std::time::Duration;

use crate::utils::find_char_boundary;

/// Preformatted host/process report for the `stats` command. Live terminal
/// counts (connections, snippets) are appended by the command itself.
pub fn get_system_stats() -> String {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let mut report = format!(
        "System Statistics:\n\n\
         Host:\n\
         \x20 Hostname: {}\n\
         \x20 Platform: {} ({})\n\
         \x20 CPUs: {}\n\n\
         Memory:\n{}\n\
         Process:\n\
         \x20 PID: {}\n\
         \x20 Working Dir: {}",
        hostname,
        std::env::consts::OS,
        std::env::consts::ARCH,
        cpus,
        memory_report(),
        std::process::id(),
        cwd,
    );
    report.push('\n');
    report
}

#[cfg(target_os = "linux")]
fn memory_report() -> String {
    let meminfo = match std::fs::read_to_string("/proc/meminfo") {
        Ok(contents) => contents,
        Err(_) => return "  Memory stats not available".to_string(),
    };

    let field = |name: &str| -> Option<u64> {
        meminfo
            .lines()
            .find(|l| l.starts_with(name))
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|v| v.parse::<u64>().ok())
    };

    match (field("MemTotal:"), field("MemAvailable:")) {
        (Some(total_kb), Some(avail_kb)) => format!(
            "  Total: {:.2} MB\n  Used: {:.2} MB",
            total_kb as f64 / 1024.0,
            (total_kb - avail_kb) as f64 / 1024.0
        ),
        _ => "  Memory stats not available".to_string(),
    }
}

#[cfg(not(target_os = "linux"))]
fn memory_report() -> String {
    "  Memory stats not available".to_string()
}

/// Rolling window of command timings backing the `perf` command.
#[derive(Debug)]
pub struct PerfRecorder {
    window: usize,
    samples: VecDeque<(String, Duration)>,
}

impl PerfRecorder {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            samples: VecDeque::new(),
        }
    }

    pub fn record(&mut self, command: &str, elapsed: Duration) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back((command.to_string(), elapsed));
    }

    /// One padded line per recorded command, most recent last.
    pub fn render(&self) -> String {
        if self.samples.is_empty() {
            return "No commands recorded yet".to_string();
        }
        self.samples
            .iter()
            .map(|(name, elapsed)| {
                let shown = &name[..find_char_boundary(name, 40)];
                format!("{:<40} {:.2}ms", shown, elapsed.as_secs_f64() * 1000.0)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
