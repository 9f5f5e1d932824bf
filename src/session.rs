//! The terminal session: all state plus the dispatch loop that turns one
//! input line into exactly one transcript output entry.
//!
//! Nothing here is global. Every store, connection, and counter hangs off
//! the `Session`, so two sessions in one process never share state.

use anyhow::{anyhow, Context};
use chrono::Local;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::connections::ConnectionRegistry;
use crate::errors::{CommandError, CommandResult};
use crate::files::FileStore;
use crate::logger::{Logger, SessionMetrics};
use crate::network::NetworkClient;
use crate::registry::CommandRegistry;
use crate::snippets::{highlight_source, Language, SnippetRunner, SnippetStore};
use crate::system::{get_system_stats, PerfRecorder};
use crate::transcript::Transcript;
use crate::utils::ensure_dir;
use crate::venice::{render_models, ModelCatalog, ModelChange};

const WELCOME: &str = "Welcome to Admin Terminal. Type \"help\" for available commands.";

/// Presentation mode. The terminal only tracks it; rendering colors is the
/// view layer's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

pub struct Session {
    config: AppConfig,
    theme: Theme,
    registry: CommandRegistry,
    transcript: Transcript,
    snippets: SnippetStore,
    connections: ConnectionRegistry,
    runner: SnippetRunner,
    network: NetworkClient,
    catalog: ModelCatalog,
    files: FileStore,
    logger: Logger,
    pub metrics: SessionMetrics,
    perf: PerfRecorder,
    model_tx: broadcast::Sender<ModelChange>,
}

impl Session {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let logger = Logger::new(&config.log_dir)?;
        let runner = SnippetRunner::new(
            &config.snippet_dir,
            config.allow_run,
            &config.node_executable,
            config.run_timeout_secs,
        )?;
        let network = NetworkClient::new(config.request_timeout_secs, &config.connectivity_probe)?;
        let catalog = ModelCatalog::new(&config.venice_api_url, config.request_timeout_secs)?;
        let files = FileStore::new(&config.write_root)?;
        let theme = if config.theme == "light" {
            Theme::Light
        } else {
            Theme::Dark
        };
        let (model_tx, _) = broadcast::channel(16);

        let mut transcript = Transcript::new();
        transcript.push_output(WELCOME);

        Ok(Self {
            config,
            theme,
            registry: CommandRegistry::new(),
            transcript,
            snippets: SnippetStore::new(),
            connections: ConnectionRegistry::new(),
            runner,
            network,
            catalog,
            files,
            logger,
            metrics: SessionMetrics::new(),
            perf: PerfRecorder::new(10),
            model_tx,
        })
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Subscribe to `venice set` events. The chat component holds one of
    /// these; the terminal never reaches into it directly.
    pub fn subscribe_model_changes(&self) -> broadcast::Receiver<ModelChange> {
        self.model_tx.subscribe()
    }

    /// Run one input line to completion. Every non-empty line appends one
    /// input entry and, except for `clear`, exactly one output entry —
    /// command failures are rendered, never propagated.
    pub async fn dispatch(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }

        self.transcript.push_input(trimmed);
        let _ = self.logger.log_command(trimmed);

        let lowered = trimmed.to_lowercase();
        let tokens: Vec<&str> = lowered.split(' ').filter(|t| !t.is_empty()).collect();
        let (name, args) = match tokens.split_first() {
            Some((name, args)) => (*name, args),
            None => return,
        };

        self.metrics.commands_executed += 1;
        let start = Instant::now();

        if name == "clear" {
            self.transcript.clear();
            self.perf.record(&tokens.join(" "), start.elapsed());
            return;
        }

        let result = if self.registry.contains(name) {
            self.execute(name, args).await
        } else {
            Ok(format!("Command not found: {}", name))
        };
        self.perf.record(&tokens.join(" "), start.elapsed());

        match result {
            Ok(output) => {
                let _ = self.logger.log_output(&output);
                self.transcript.push_output(output);
            }
            Err(err) => {
                let rendered = err.to_string();
                if err.is_external() {
                    self.metrics.failed_commands += 1;
                    let _ = self.logger.log_error(&rendered);
                } else {
                    let _ = self.logger.log_output(&rendered);
                }
                self.transcript.push_output(rendered);
            }
        }
    }

    async fn execute(&mut self, name: &str, args: &[&str]) -> CommandResult {
        match name {
            "help" => Ok(self.cmd_help(args)),
            "theme" => self.cmd_theme(args),
            "status" => Ok(self.cmd_status()),
            "languages" => Ok(Self::cmd_languages()),
            "code" => self.cmd_code(args),
            "preview" => self.cmd_preview(args),
            "sudo" => self.cmd_sudo(args),
            "backup" => self.cmd_backup(),
            "scrape" => self.cmd_scrape(args).await,
            "ws" => self.cmd_ws(args).await,
            "stats" => Ok(self.cmd_stats()),
            "perf" => Ok(self.cmd_perf()),
            "network" => self.network.check_connectivity().await,
            "ping" => self.cmd_ping(args).await,
            "curl" => self.cmd_curl(args).await,
            "venice" => self.cmd_venice(args).await,
            // `clear` is intercepted by dispatch; the registry has nothing else.
            other => Ok(format!("Command not found: {}", other)),
        }
    }

    fn cmd_help(&self, args: &[&str]) -> String {
        match args.first() {
            None => self.registry.render_command_list(),
            Some(topic) => self.registry.render_help_topic(topic),
        }
    }

    fn cmd_theme(&mut self, args: &[&str]) -> CommandResult {
        let mode = match args {
            ["dark"] => Theme::Dark,
            ["light"] => Theme::Light,
            _ => return Err(CommandError::Usage("theme <dark|light>")),
        };
        self.theme = mode;
        Ok(format!("Theme switched to {}", mode.as_str()))
    }

    fn cmd_status(&self) -> String {
        let names = self.connections.names();
        let mut out = format!(
            "System Status: Online\nVersion: {}\nLast Update: {}\nActive WebSocket Connections: {}",
            env!("CARGO_PKG_VERSION"),
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            names.len()
        );
        if !names.is_empty() {
            out.push_str(&format!("\nConnected to: {}", names.join(", ")));
        }
        out
    }

    fn cmd_languages() -> String {
        let list = Language::ALL
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        format!("Supported Languages:\n{}", list)
    }

    fn cmd_code(&mut self, args: &[&str]) -> CommandResult {
        let (action, rest) = match args.split_first() {
            Some((action, rest)) => (*action, rest),
            None => return Err(CommandError::Usage("code <create|list|show|run|delete> [args]")),
        };

        match action {
            "create" => {
                if rest.len() < 3 {
                    return Err(CommandError::Usage("code create <language> <id> <code...>"));
                }
                let language: Language = match rest[0].parse() {
                    Ok(lang) => lang,
                    Err(_) => {
                        return Ok(format!(
                            "Unsupported language. Use one of: {}",
                            Language::supported_list()
                        ))
                    }
                };
                let id = rest[1];
                let source = rest[2..].join(" ");
                self.snippets.create(id, language, source);
                Ok(format!("Created {} snippet '{}'", language, id))
            }
            "list" => {
                if self.snippets.is_empty() {
                    return Ok("No code snippets found".to_string());
                }
                Ok(self
                    .snippets
                    .iter()
                    .map(|s| format!("{} ({}): {}", s.id, s.language, s.description))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            "show" => {
                let [id] = rest else {
                    return Err(CommandError::Usage("code show <id>"));
                };
                let snippet = self
                    .snippets
                    .get(id)
                    .ok_or_else(|| CommandError::NotFound(format!("Snippet '{}' not found", id)))?;
                Ok(format!(
                    "Language: {}\nCode:\n{}",
                    snippet.language,
                    highlight_source(snippet.language, &snippet.source)
                ))
            }
            "run" => {
                let [id] = rest else {
                    return Err(CommandError::Usage("code run <id>"));
                };
                let snippet = self
                    .snippets
                    .get(id)
                    .ok_or_else(|| CommandError::NotFound(format!("Snippet '{}' not found", id)))?;
                self.runner.run(snippet)
            }
            "delete" => {
                let [id] = rest else {
                    return Err(CommandError::Usage("code delete <id>"));
                };
                if !self.snippets.delete(id) {
                    return Err(CommandError::NotFound(format!("Snippet '{}' not found", id)));
                }
                Ok(format!("Deleted snippet '{}'", id))
            }
            other => Ok(format!(
                "Unknown action '{}'. Use: create, list, show, run, or delete",
                other
            )),
        }
    }

    fn cmd_preview(&self, args: &[&str]) -> CommandResult {
        let [id] = args else {
            return Err(CommandError::Usage("preview <snippet_id>"));
        };
        let snippet = self
            .snippets
            .get(id)
            .ok_or_else(|| CommandError::NotFound(format!("Snippet '{}' not found", id)))?;
        if snippet.language != Language::Html {
            return Ok("Only HTML snippets can be previewed".to_string());
        }

        let dir = std::path::PathBuf::from(&self.config.snippet_dir);
        ensure_dir(&dir)?;
        let path = dir.join(format!("preview_{}.html", id));
        std::fs::write(&path, &snippet.source)
            .with_context(|| format!("Failed to write preview {:?}", path))?;
        Ok(format!(
            "Preview written to {}. Open it in a browser to view the snippet.",
            path.display()
        ))
    }

    fn cmd_sudo(&mut self, args: &[&str]) -> CommandResult {
        let [id, file_path] = args else {
            return Err(CommandError::Usage("sudo <snippet_id> <file_path>"));
        };
        let snippet = self
            .snippets
            .get(id)
            .ok_or_else(|| CommandError::NotFound(format!("Snippet '{}' not found", id)))?;
        self.files.write_file(file_path, &snippet.source)?;
        Ok(format!("Successfully implemented '{}' into {}", id, file_path))
    }

    fn cmd_backup(&self) -> CommandResult {
        let filename = self.files.create_backup()?;
        Ok(format!("Backup created: {}", filename))
    }

    async fn cmd_scrape(&self, args: &[&str]) -> CommandResult {
        let (url, selector) = match args {
            [url] => (*url, None),
            [url, selector, ..] => (*url, Some(*selector)),
            [] => return Err(CommandError::Usage("scrape <url> [css-selector]")),
        };
        let content = self.network.scrape(url, selector).await?;
        Ok(format!("Content from {}:\n{}", url, content))
    }

    async fn cmd_ws(&mut self, args: &[&str]) -> CommandResult {
        let (action, rest) = match args.split_first() {
            Some((action, rest)) => (*action, rest),
            None => return Err(CommandError::Usage("ws <connect|send|close> [args]")),
        };

        match action {
            "connect" => {
                let [name, url] = rest else {
                    return Err(CommandError::Usage("ws connect <name> <url>"));
                };
                let timeout = Duration::from_secs(self.config.request_timeout_secs);
                let logger = self.logger.clone();
                self.connections.connect(name, url, timeout, logger).await
            }
            "send" => {
                let (name, words) = match rest.split_first() {
                    Some((name, words)) if !words.is_empty() => (*name, words),
                    _ => return Err(CommandError::Usage("ws send <name> <message>")),
                };
                let out = self.connections.send(name, &words.join(" ")).await?;
                self.metrics.ws_messages_sent += 1;
                Ok(out)
            }
            "close" => {
                let [name] = rest else {
                    return Err(CommandError::Usage("ws close <name>"));
                };
                self.connections.close(name).await
            }
            _ => Ok("Unknown WebSocket action. Use: connect, send, or close".to_string()),
        }
    }

    fn cmd_stats(&self) -> String {
        format!(
            "{}\nWebSocket Connections: {}\nCode Snippets: {}",
            get_system_stats(),
            self.connections.len(),
            self.snippets.len()
        )
    }

    fn cmd_perf(&self) -> String {
        format!(
            "Resource Timing:\n{:<40} {}\n{}",
            "COMMAND",
            "DURATION",
            self.perf.render()
        )
    }

    async fn cmd_ping(&self, args: &[&str]) -> CommandResult {
        let [host] = args else {
            return Err(CommandError::Usage("ping <host>"));
        };
        self.network.ping(host).await
    }

    async fn cmd_curl(&self, args: &[&str]) -> CommandResult {
        let (url, rest) = match args.split_first() {
            Some((url, rest)) => (*url, rest),
            None => return Err(CommandError::Usage("curl <url> [method] [data]")),
        };
        let method = rest.first().copied().unwrap_or("get");
        let body = if rest.len() > 1 {
            let raw = rest[1..].join(" ");
            let value: Value = serde_json::from_str(&raw)
                .map_err(|e| anyhow!("Invalid JSON data: {}", e))?;
            Some(value)
        } else {
            None
        };
        self.network.curl(url, method, body).await
    }

    async fn cmd_venice(&mut self, args: &[&str]) -> CommandResult {
        let (action, rest) = match args.split_first() {
            Some((action, rest)) => (*action, rest),
            None => return Err(CommandError::Usage("venice <models|set> [model_id]")),
        };

        match action {
            "models" => {
                let models = self.catalog.text_models().await?;
                render_models(&models)
            }
            "set" => {
                let [model_id] = rest else {
                    return Err(CommandError::Usage("venice set <model_id>"));
                };
                // No subscriber yet is fine; the confirmation stands either way.
                let _ = self.model_tx.send(ModelChange {
                    model_id: model_id.to_string(),
                });
                Ok(format!("Venice AI model set to {}", model_id))
            }
            _ => Ok("Unknown Venice AI action. Use: models or set".to_string()),
        }
    }

    /// Tear down session resources: closes every WebSocket connection.
    pub async fn shutdown(&mut self) {
        self.connections.close_all().await;
        let _ = self.logger.log("SESSION CLOSED");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::EntryKind;

    fn test_config(dir: &std::path::Path) -> AppConfig {
        AppConfig {
            log_dir: dir.join("logs").to_string_lossy().into_owned(),
            snippet_dir: dir.join("snippets").to_string_lossy().into_owned(),
            write_root: dir.join("project").to_string_lossy().into_owned(),
            ..AppConfig::default()
        }
    }

    fn test_session() -> (Session, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(test_config(dir.path())).unwrap();
        (session, dir)
    }

    fn last_output(session: &Session) -> &str {
        let entry = session.transcript().entries().last().unwrap();
        assert_eq!(entry.kind, EntryKind::Output);
        &entry.text
    }

    #[tokio::test]
    async fn test_welcome_is_seeded() {
        let (session, _dir) = test_session();
        assert_eq!(session.transcript().len(), 1);
        assert!(last_output(&session).starts_with("Welcome to Admin Terminal"));
    }

    #[tokio::test]
    async fn test_empty_input_is_a_no_op() {
        let (mut session, _dir) = test_session();
        session.dispatch("   ").await;
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let (mut session, _dir) = test_session();
        session.dispatch("frobnicate").await;
        assert_eq!(last_output(&session), "Command not found: frobnicate");
    }

    #[tokio::test]
    async fn test_one_output_per_input() {
        let (mut session, _dir) = test_session();
        for line in ["help", "status", "languages", "nonsense", "code"] {
            session.dispatch(line).await;
        }
        // welcome + 5 * (input, output)
        assert_eq!(session.transcript().len(), 11);
        let kinds: Vec<EntryKind> = session
            .transcript()
            .entries()
            .iter()
            .skip(1)
            .map(|e| e.kind)
            .collect();
        for pair in kinds.chunks(2) {
            assert_eq!(pair, [EntryKind::Input, EntryKind::Output]);
        }
    }

    #[tokio::test]
    async fn test_clear_truncates_without_output() {
        let (mut session, _dir) = test_session();
        session.dispatch("help").await;
        session.dispatch("clear").await;
        assert!(session.transcript().is_empty());
        session.dispatch("clear").await;
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_theme_switch_and_usage() {
        let (mut session, _dir) = test_session();
        assert_eq!(session.theme(), Theme::Dark);

        session.dispatch("theme light").await;
        assert_eq!(last_output(&session), "Theme switched to light");
        assert_eq!(session.theme(), Theme::Light);

        session.dispatch("theme sideways").await;
        assert_eq!(last_output(&session), "Usage: theme <dark|light>");
        assert_eq!(session.theme(), Theme::Light);
    }

    #[tokio::test]
    async fn test_case_insensitive_dispatch() {
        let (mut session, _dir) = test_session();
        session.dispatch("THEME DARK").await;
        assert_eq!(last_output(&session), "Theme switched to dark");
    }

    #[tokio::test]
    async fn test_status_shape() {
        let (mut session, _dir) = test_session();
        session.dispatch("status").await;
        let out = last_output(&session);
        assert!(out.starts_with("System Status: Online"));
        assert!(out.contains(&format!("Version: {}", env!("CARGO_PKG_VERSION"))));
        assert!(out.contains("Active WebSocket Connections: 0"));
        assert!(!out.contains("Connected to:"));
    }

    #[tokio::test]
    async fn test_languages_lists_all() {
        let (mut session, _dir) = test_session();
        session.dispatch("languages").await;
        let out = last_output(&session);
        assert!(out.starts_with("Supported Languages:\n"));
        assert_eq!(out.lines().count(), 1 + Language::ALL.len());
        assert!(out.contains("javascript"));
        assert!(out.contains("sql"));
    }

    #[tokio::test]
    async fn test_code_lifecycle() {
        let (mut session, _dir) = test_session();

        session.dispatch("code list").await;
        assert_eq!(last_output(&session), "No code snippets found");

        session.dispatch("code create python hello x = 1").await;
        assert_eq!(last_output(&session), "Created python snippet 'hello'");

        session.dispatch("code list").await;
        assert_eq!(
            last_output(&session),
            "hello (python): Code snippet in python"
        );

        session.dispatch("code show hello").await;
        assert!(last_output(&session).starts_with("Language: python\nCode:\n"));

        session.dispatch("code delete hello").await;
        assert_eq!(last_output(&session), "Deleted snippet 'hello'");

        session.dispatch("code show hello").await;
        assert_eq!(last_output(&session), "Snippet 'hello' not found");
    }

    #[tokio::test]
    async fn test_code_unsupported_language() {
        let (mut session, _dir) = test_session();
        session.dispatch("code create brainfuck x +++").await;
        assert!(last_output(&session).starts_with("Unsupported language. Use one of: "));
    }

    #[tokio::test]
    async fn test_code_unknown_action() {
        let (mut session, _dir) = test_session();
        session.dispatch("code fold x").await;
        assert_eq!(
            last_output(&session),
            "Unknown action 'fold'. Use: create, list, show, run, or delete"
        );
    }

    #[tokio::test]
    async fn test_preview_requires_html() {
        let (mut session, _dir) = test_session();
        session.dispatch("code create python p x = 1").await;
        session.dispatch("preview p").await;
        assert_eq!(last_output(&session), "Only HTML snippets can be previewed");
    }

    #[tokio::test]
    async fn test_preview_writes_file() {
        let (mut session, dir) = test_session();
        session.dispatch("code create html page <h1>hi</h1>").await;
        session.dispatch("preview page").await;
        assert!(last_output(&session).starts_with("Preview written to "));
        assert!(dir.path().join("snippets/preview_page.html").exists());
    }

    #[tokio::test]
    async fn test_sudo_writes_snippet() {
        let (mut session, dir) = test_session();
        session.dispatch("code create javascript util return 1").await;
        session.dispatch("sudo util src/util.js").await;
        assert_eq!(
            last_output(&session),
            "Successfully implemented 'util' into src/util.js"
        );
        let written = dir.path().join("project/src/util.js");
        assert_eq!(std::fs::read_to_string(written).unwrap(), "return 1");
    }

    #[tokio::test]
    async fn test_sudo_rejects_escape() {
        let (mut session, _dir) = test_session();
        session.dispatch("code create javascript util return 1").await;
        session.dispatch("sudo util ../escape.js").await;
        assert!(last_output(&session).contains("refusing to write"));
    }

    #[tokio::test]
    async fn test_backup_reports_filename() {
        let (mut session, _dir) = test_session();
        session.dispatch("backup").await;
        let out = last_output(&session);
        assert!(out.starts_with("Backup created: project-backup-"));
        assert!(out.ends_with(".zip"));
    }

    #[tokio::test]
    async fn test_ws_send_without_connection() {
        let (mut session, _dir) = test_session();
        session.dispatch("ws send chat hello").await;
        assert_eq!(last_output(&session), "No connection named \"chat\"");
    }

    #[tokio::test]
    async fn test_ws_unknown_action() {
        let (mut session, _dir) = test_session();
        session.dispatch("ws dial chat").await;
        assert_eq!(
            last_output(&session),
            "Unknown WebSocket action. Use: connect, send, or close"
        );
    }

    #[tokio::test]
    async fn test_stats_includes_terminal_counts() {
        let (mut session, _dir) = test_session();
        session.dispatch("code create css s a{}").await;
        session.dispatch("stats").await;
        let out = last_output(&session);
        assert!(out.contains("System Statistics:"));
        assert!(out.contains("WebSocket Connections: 0"));
        assert!(out.contains("Code Snippets: 1"));
    }

    #[tokio::test]
    async fn test_perf_reports_recent_commands() {
        let (mut session, _dir) = test_session();
        session.dispatch("help").await;
        session.dispatch("perf").await;
        let out = last_output(&session);
        assert!(out.starts_with("Resource Timing:\nCOMMAND"));
        assert!(out.contains("help"));
    }

    #[tokio::test]
    async fn test_curl_rejects_bad_json() {
        let (mut session, _dir) = test_session();
        session.dispatch("curl http://127.0.0.1:9/x post {not json}").await;
        assert!(last_output(&session).contains("Invalid JSON data"));
    }

    #[tokio::test]
    async fn test_venice_set_broadcasts() {
        let (mut session, _dir) = test_session();
        let mut rx = session.subscribe_model_changes();

        session.dispatch("venice set llama-3.3-70b").await;
        assert_eq!(last_output(&session), "Venice AI model set to llama-3.3-70b");
        assert_eq!(
            rx.try_recv().unwrap(),
            ModelChange {
                model_id: "llama-3.3-70b".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_venice_unknown_action() {
        let (mut session, _dir) = test_session();
        session.dispatch("venice think").await;
        assert_eq!(last_output(&session), "Unknown Venice AI action. Use: models or set");
    }

    #[tokio::test]
    async fn test_help_is_stable() {
        let (mut session, _dir) = test_session();
        session.dispatch("help").await;
        let first = last_output(&session).to_string();
        session.dispatch("help").await;
        assert_eq!(last_output(&session), first);
        assert!(first.lines().count() >= 17);
    }

    #[tokio::test]
    async fn test_help_topic() {
        let (mut session, _dir) = test_session();
        session.dispatch("help curl").await;
        assert!(last_output(&session).starts_with("Command: curl"));
    }

    #[tokio::test]
    async fn test_metrics_counting() {
        let (mut session, _dir) = test_session();
        session.dispatch("help").await;
        session.dispatch("ping").await; // usage error, not an external failure
        assert_eq!(session.metrics.commands_executed, 2);
        assert_eq!(session.metrics.failed_commands, 0);
    }
}
