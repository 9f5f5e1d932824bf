use anyhow::Result;
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use crate::utils::find_char_boundary;

/// Session log writer. Cheap to clone — WebSocket reader tasks carry their
/// own handle so received frames land in the same file as command traffic.
#[derive(Clone)]
pub struct Logger {
    log_file: PathBuf,
}

#[derive(Debug)]
pub struct SessionMetrics {
    pub commands_executed: usize,
    pub failed_commands: usize,
    pub ws_messages_sent: usize,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            commands_executed: 0,
            failed_commands: 0,
            ws_messages_sent: 0,
        }
    }

    pub fn failure_rate(&self) -> f64 {
        if self.commands_executed == 0 {
            return 0.0;
        }
        (self.failed_commands as f64 / self.commands_executed as f64) * 100.0
    }

    pub fn display(&self) {
        use colored::Colorize;
        println!("\n{}", "━━━━━━━━━ Session Statistics ━━━━━━━━━".bright_cyan().bold());
        println!("Commands executed: {}", self.commands_executed);
        println!("Failed commands: {}", self.failed_commands.to_string().red());
        println!("WebSocket messages sent: {}", self.ws_messages_sent);
        println!("Failure rate: {:.1}%", self.failure_rate());
        println!("{}", "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".bright_cyan());
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    pub fn new(log_dir: &str) -> Result<Self> {
        let dir = PathBuf::from(log_dir);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_file = dir.join(format!("session_{}.log", timestamp));

        Ok(Self { log_file })
    }

    pub fn log(&self, message: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{}] {}", timestamp, message)?;
        Ok(())
    }

    pub fn log_command(&self, input: &str) -> Result<()> {
        self.log(&format!("COMMAND: {}", input))
    }

    pub fn log_output(&self, output: &str) -> Result<()> {
        let preview = if output.len() > 200 {
            let end = find_char_boundary(output, 200);
            format!("{}...", &output[..end])
        } else {
            output.to_string()
        };
        self.log(&format!("OUTPUT: {}", preview.replace('\n', " | ")))
    }

    pub fn log_ws_message(&self, connection: &str, data: &str) -> Result<()> {
        self.log(&format!("WS RECEIVED [{}]: {}", connection, data))
    }

    pub fn log_error(&self, error: &str) -> Result<()> {
        self.log(&format!("ERROR: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_session_metrics_new() {
        let metrics = SessionMetrics::new();
        assert_eq!(metrics.commands_executed, 0);
        assert_eq!(metrics.failed_commands, 0);
        assert_eq!(metrics.ws_messages_sent, 0);
    }

    #[test]
    fn test_failure_rate_zero_commands() {
        let metrics = SessionMetrics::new();
        assert_eq!(metrics.failure_rate(), 0.0);
    }

    #[test]
    fn test_failure_rate_calculation() {
        let mut metrics = SessionMetrics::new();
        metrics.commands_executed = 10;
        metrics.failed_commands = 2;
        assert_eq!(metrics.failure_rate(), 20.0);
    }

    #[test]
    fn test_logger_creation() {
        let test_log_dir = "test_logs_temp_adm1";
        let logger = Logger::new(test_log_dir);
        assert!(logger.is_ok());

        let logger = logger.unwrap();
        assert!(logger.log_file.parent().unwrap().exists());

        let _ = fs::remove_dir_all(test_log_dir);
    }

    #[test]
    fn test_logger_basic_log() {
        let test_log_dir = "test_logs_temp_adm2";
        let logger = Logger::new(test_log_dir).unwrap();

        let result = logger.log("Test message");
        assert!(result.is_ok());

        let content = fs::read_to_string(&logger.log_file).unwrap();
        assert!(content.contains("Test message"));

        let _ = fs::remove_dir_all(test_log_dir);
    }

    #[test]
    fn test_logger_command_and_output() {
        let test_log_dir = "test_logs_temp_adm3";
        let logger = Logger::new(test_log_dir).unwrap();

        logger.log_command("code list").unwrap();
        logger.log_output("No code snippets found").unwrap();

        let content = fs::read_to_string(&logger.log_file).unwrap();
        assert!(content.contains("COMMAND: code list"));
        assert!(content.contains("OUTPUT: No code snippets found"));

        let _ = fs::remove_dir_all(test_log_dir);
    }

    #[test]
    fn test_logger_ws_message() {
        let test_log_dir = "test_logs_temp_adm4";
        let logger = Logger::new(test_log_dir).unwrap();

        logger.log_ws_message("chat", "hello").unwrap();

        let content = fs::read_to_string(&logger.log_file).unwrap();
        assert!(content.contains("WS RECEIVED [chat]: hello"));

        let _ = fs::remove_dir_all(test_log_dir);
    }

    #[test]
    fn test_logger_clone_shares_file() {
        let test_log_dir = "test_logs_temp_adm5";
        let logger = Logger::new(test_log_dir).unwrap();
        let clone = logger.clone();

        logger.log("from original").unwrap();
        clone.log("from clone").unwrap();

        let content = fs::read_to_string(&logger.log_file).unwrap();
        assert!(content.contains("from original"));
        assert!(content.contains("from clone"));

        let _ = fs::remove_dir_all(test_log_dir);
    }
}
