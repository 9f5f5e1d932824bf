//! Code snippet store, syntax highlighting, and the snippet execution policy.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::as_24_bit_terminal_escaped;
use wait_timeout::ChildExt;

use crate::errors::{CommandError, CommandResult};
use crate::utils::{ensure_dir, sanitize_text};

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Languages a snippet can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Javascript,
    Typescript,
    Jsx,
    Tsx,
    Html,
    Css,
    Python,
    Sql,
    Json,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Language::Javascript,
        Language::Typescript,
        Language::Jsx,
        Language::Tsx,
        Language::Html,
        Language::Css,
        Language::Python,
        Language::Sql,
        Language::Json,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Jsx => "jsx",
            Language::Tsx => "tsx",
            Language::Html => "html",
            Language::Css => "css",
            Language::Python => "python",
            Language::Sql => "sql",
            Language::Json => "json",
        }
    }

    /// Token used to look up the syntect grammar. `html` highlights under
    /// the generic markup grammar; jsx/tsx fall back to their base language.
    fn syntect_token(&self) -> &'static str {
        match self {
            Language::Javascript | Language::Jsx => "js",
            Language::Typescript | Language::Tsx => "ts",
            Language::Html => "html",
            Language::Css => "css",
            Language::Python => "py",
            Language::Sql => "sql",
            Language::Json => "json",
        }
    }

    /// The supported-language list as shown by the `languages` command.
    pub fn supported_list() -> String {
        Language::ALL
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "javascript" => Ok(Language::Javascript),
            "typescript" => Ok(Language::Typescript),
            "jsx" => Ok(Language::Jsx),
            "tsx" => Ok(Language::Tsx),
            "html" => Ok(Language::Html),
            "css" => Ok(Language::Css),
            "python" => Ok(Language::Python),
            "sql" => Ok(Language::Sql),
            "json" => Ok(Language::Json),
            other => Err(anyhow!("Unsupported language '{}'", other)),
        }
    }
}

/// A named, language-tagged source fragment held in memory.
#[derive(Debug, Clone)]
pub struct Snippet {
    pub id: String,
    pub language: Language,
    pub source: String,
    pub description: String,
}

/// In-memory snippet store. Insertion order is kept for `list`; recreating
/// an existing id overwrites it in place (no versioning).
#[derive(Debug, Default)]
pub struct SnippetStore {
    snippets: Vec<Snippet>,
}

impl SnippetStore {
    pub fn new() -> Self {
        Self { snippets: Vec::new() }
    }

    /// Store or overwrite a snippet. Returns true if an existing id was
    /// replaced.
    pub fn create(&mut self, id: &str, language: Language, source: String) -> bool {
        let snippet = Snippet {
            id: id.to_string(),
            language,
            source,
            description: format!("Code snippet in {}", language),
        };
        if let Some(existing) = self.snippets.iter_mut().find(|s| s.id == id) {
            *existing = snippet;
            true
        } else {
            self.snippets.push(snippet);
            false
        }
    }

    pub fn get(&self, id: &str) -> Option<&Snippet> {
        self.snippets.iter().find(|s| s.id == id)
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.snippets.len();
        self.snippets.retain(|s| s.id != id);
        self.snippets.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snippet> {
        self.snippets.iter()
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }
}

/// Highlight snippet source for terminal display. The source is sanitized
/// first; the escapes in the result all come from the highlighter.
pub fn highlight_source(language: Language, source: &str) -> String {
    let clean = sanitize_text(source);
    let syntax = SYNTAX_SET
        .find_syntax_by_token(language.syntect_token())
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
    let theme = &THEME_SET.themes["base16-ocean.dark"];
    let mut highlighter = HighlightLines::new(syntax, theme);

    let mut output = String::new();
    for line in clean.lines() {
        match highlighter.highlight_line(line, &SYNTAX_SET) {
            Ok(ranges) => {
                output.push_str(&as_24_bit_terminal_escaped(&ranges, false));
                output.push_str("\x1b[0m\n");
            }
            Err(_) => {
                output.push_str(line);
                output.push('\n');
            }
        }
    }
    output.truncate(output.trim_end_matches('\n').len());
    output
}

/// Executes snippets as isolated subprocesses under an explicit opt-in
/// policy. Only javascript snippets have a runner; html snippets are echoed
/// with a pointer to `preview`, everything else is unsupported.
pub struct SnippetRunner {
    base_dir: PathBuf,
    allow_run: bool,
    node_executable: String,
    timeout_secs: u64,
}

impl SnippetRunner {
    pub fn new(
        base_dir: &str,
        allow_run: bool,
        node_executable: &str,
        timeout_secs: u64,
    ) -> Result<Self> {
        let dir = PathBuf::from(base_dir);
        ensure_dir(&dir)?;
        Ok(Self {
            base_dir: dir,
            allow_run,
            node_executable: node_executable.to_string(),
            timeout_secs,
        })
    }

    /// Check whether the configured node executable is reachable.
    pub fn node_available(&self) -> bool {
        Command::new(&self.node_executable)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Wrap a snippet body as a function so `return` expressions yield a
    /// printable result, matching how the snippet was authored.
    fn wrap_source(source: &str) -> String {
        format!(
            "const __result = (function() {{\n{}\n}})();\n\
             if (__result !== undefined) {{ console.log(__result); }}\n",
            source
        )
    }

    fn write_script(&self, source: &str) -> Result<PathBuf> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S%3f");
        let path = self.base_dir.join(format!("run_{}.js", timestamp));
        std::fs::write(&path, source)
            .with_context(|| format!("Failed to write script {:?}", path))?;
        Ok(path)
    }

    pub fn run(&self, snippet: &Snippet) -> CommandResult {
        match snippet.language {
            Language::Javascript => self.run_javascript(snippet),
            Language::Html => Ok(format!(
                "HTML Preview:\n{}\n\nUse 'preview {}' to view it rendered",
                sanitize_text(&snippet.source),
                snippet.id
            )),
            other => Ok(format!("Running {} code is not supported yet", other)),
        }
    }

    fn run_javascript(&self, snippet: &Snippet) -> CommandResult {
        if !self.allow_run {
            return Ok(
                "Snippet execution is disabled. Set allow_run = true in adminterm.toml to opt in."
                    .to_string(),
            );
        }

        let script = self.write_script(&Self::wrap_source(&snippet.source))?;

        let mut child = Command::new(&self.node_executable)
            .arg(&script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn '{}'", self.node_executable))?;

        let timeout = Duration::from_secs(self.timeout_secs);
        let status = match child.wait_timeout(timeout).context("Failed to wait for snippet")? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CommandError::Timeout {
                    what: format!("code run {}", snippet.id),
                    secs: self.timeout_secs,
                });
            }
        };

        let mut stdout = String::new();
        let mut stderr = String::new();
        if let Some(mut out) = child.stdout.take() {
            let _ = out.read_to_string(&mut stdout);
        }
        if let Some(mut err) = child.stderr.take() {
            let _ = err.read_to_string(&mut stderr);
        }

        if status.success() {
            let result = sanitize_text(stdout.trim_end());
            if result.is_empty() {
                Ok("Executed successfully. Result: undefined".to_string())
            } else {
                Ok(format!("Executed successfully. Result: {}", result))
            }
        } else {
            // Execution errors are reported as a result, never as a failure
            // that could abort the session.
            let detail = sanitize_text(stderr.trim_end());
            Ok(format!("Error executing code: {}", detail))
        }
    }
}
