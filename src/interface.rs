use crate::config::AppConfig;
use crate::session::{Session, Theme};
use crate::transcript::EntryKind;
use colored::*;
use std::io::{self, Write};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::hint::Hinter;
use rustyline::{CompletionType, Config, Context, Editor, Helper, Highlighter, Validator};

/// Command names for tab-completion, plus the REPL-only exit words.
const COMMANDS: &[&str] = &[
    "help", "clear", "theme", "status", "languages", "code", "preview", "sudo", "backup",
    "scrape", "ws", "stats", "perf", "network", "ping", "curl", "venice", "exit", "quit",
];

/// Rustyline helper providing command tab-completion and inline hints.
#[derive(Helper, Validator, Highlighter)]
struct CommandCompleter;

impl Hinter for CommandCompleter {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        // Only hint the first word, with the cursor at the end of the line
        if line.is_empty() || pos != line.len() || line.contains(' ') {
            return None;
        }

        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && **cmd != line)
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Only complete the first word
        let prefix = &line[..pos];
        if prefix.contains(' ') {
            return Ok((0, vec![]));
        }

        let matches: Vec<Pair> = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

pub fn print_banner() {
    println!("{}", "====================================".bright_cyan());
    println!(
        "{}",
        format!("       ADMIN TERMINAL v{}        ", env!("CARGO_PKG_VERSION"))
            .bright_cyan()
            .bold()
    );
    println!("{}", "====================================".bright_cyan());
    println!("{}", " Dashboard command console".bright_white());
    println!("{}\n", " Type help for commands or exit to quit".dimmed());
}

fn prompt_for(theme: Theme) -> String {
    match theme {
        Theme::Dark => "❯ ".bright_cyan().bold().to_string(),
        Theme::Light => "❯ ".blue().bold().to_string(),
    }
}

/// Print the output entries appended since `mark`. Input entries are already
/// visible on the prompt line.
fn render_new_output(session: &Session, mark: usize) {
    for entry in session.transcript().since(mark) {
        if entry.kind == EntryKind::Output {
            println!("{}", entry.text);
        }
    }
}

// Interactive REPL entry point
pub async fn start_repl(config: AppConfig) {
    print_banner();

    let mut session = match Session::new(config) {
        Ok(s) => s,
        Err(e) => {
            println!("{} {}", "✗ Failed to start session:".red().bold(), e);
            return;
        }
    };

    // The seeded welcome line
    render_new_output(&session, 0);

    let rl_config = Config::builder()
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(100)
        .build();
    let mut rl = match Editor::with_config(rl_config) {
        Ok(editor) => editor,
        Err(e) => {
            println!("{} {}", "✗ Failed to create line editor:".red().bold(), e);
            return;
        }
    };
    rl.set_helper(Some(CommandCompleter));

    loop {
        let readline = rl.readline(&prompt_for(session.theme()));
        let line = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(e) => {
                println!("{} {}", "✗ Input error:".red(), e);
                continue;
            }
        };

        let trimmed = line.trim();
        if trimmed == "exit" || trimmed == "quit" {
            println!("Goodbye!");
            break;
        }

        let mark = session.transcript().len();
        session.dispatch(trimmed).await;

        // A shorter transcript means `clear` ran; wipe the screen to match.
        if session.transcript().len() < mark {
            print!("\x1b[2J\x1b[1;1H");
            let _ = io::stdout().flush();
            continue;
        }
        render_new_output(&session, mark);
    }

    session.shutdown().await;
    println!("\n{}", "Session ended.".bright_cyan());
    session.metrics.display();
}
