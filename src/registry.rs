//! The command registry: names, one-line descriptions, and long-form help.
//!
//! Dispatch iterates this table in registration order, so `help` lists
//! commands the way they were registered, not alphabetically.

/// One registered command. Execution lives in the session; the registry only
/// knows what exists and how to describe it.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// Long-form help shown by `help <command>`.
#[derive(Debug, Clone, Copy)]
struct HelpEntry {
    name: &'static str,
    description: &'static str,
    example: &'static str,
    explanation: &'static str,
}

const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "help",
        description: "Show available commands or get detailed help for a specific command",
    },
    CommandSpec {
        name: "clear",
        description: "Clear terminal history",
    },
    CommandSpec {
        name: "theme",
        description: "Toggle dark/light theme (usage: theme <dark|light>)",
    },
    CommandSpec {
        name: "status",
        description: "Show current system status",
    },
    CommandSpec {
        name: "languages",
        description: "List supported programming languages",
    },
    CommandSpec {
        name: "code",
        description: "Create or manage code snippets (usage: code <create|list|show|run|delete> [args])",
    },
    CommandSpec {
        name: "preview",
        description: "Preview HTML code snippet in a new window",
    },
    CommandSpec {
        name: "sudo",
        description: "Implement code snippet into production (usage: sudo <snippet_id> <file_path>)",
    },
    CommandSpec {
        name: "backup",
        description: "Create a backup of the current project state",
    },
    CommandSpec {
        name: "scrape",
        description: "Scrape content from a website (usage: scrape <url> [css-selector])",
    },
    CommandSpec {
        name: "ws",
        description: "WebSocket operations (usage: ws <connect|send|close> [args])",
    },
    CommandSpec {
        name: "stats",
        description: "Show detailed system statistics",
    },
    CommandSpec {
        name: "perf",
        description: "Show performance metrics for recent commands",
    },
    CommandSpec {
        name: "network",
        description: "Check network connectivity status",
    },
    CommandSpec {
        name: "ping",
        description: "Ping a host",
    },
    CommandSpec {
        name: "curl",
        description: "Make HTTP requests (usage: curl <url> [method] [data])",
    },
    CommandSpec {
        name: "venice",
        description: "Interact with Venice AI (usage: venice <models|set> [model_id])",
    },
];

const HELP_ENTRIES: &[HelpEntry] = &[
    HelpEntry {
        name: "help",
        description: "The help command shows you information about available commands or detailed information about a specific command. It's like having a built-in instruction manual for your terminal.",
        example: "help curl",
        explanation: "This command will show you detailed information about the 'curl' command, including what it does, how to use it, and a practical example.",
    },
    HelpEntry {
        name: "clear",
        description: "Clear removes all previous commands and outputs from your terminal screen, giving you a fresh, clean workspace. It's like erasing a whiteboard to start over.",
        example: "clear",
        explanation: "This command will erase all previous command history and output from your terminal view, making it easier to focus on new tasks.",
    },
    HelpEntry {
        name: "ping",
        description: "Ping is like sending a small message to a website or server to see if it's awake and how quickly it responds. It's like knocking on a door to see if anyone's home.",
        example: "ping google.com",
        explanation: "This command will try to reach Google's servers and tell you how long it took to get a response. It's useful for checking if a website is accessible and how fast your connection to it is.",
    },
    HelpEntry {
        name: "curl",
        description: "Curl is like a web browser for your terminal. It can fetch web pages, download files, or interact with web services. Think of it as sending a letter and getting a response back.",
        example: "curl https://api.example.com/data get",
        explanation: "This command will fetch data from the example API. You can use different methods like GET (fetch data) or POST (send data) to interact with web services.",
    },
    HelpEntry {
        name: "network",
        description: "This command checks your internet connection status and quality. It's like having a health check-up for your internet connection, showing you how strong and fast it is.",
        example: "network",
        explanation: "Running this will probe a known host and tell you whether you're online and how long the round trip took.",
    },
    HelpEntry {
        name: "stats",
        description: "Stats gives you a complete overview of your system's current state, including host information, memory usage, and process details. It's like getting a full health report for your computer.",
        example: "stats",
        explanation: "This command shows you detailed information about your system's performance, memory usage, and other important metrics that help you understand how your system is running.",
    },
    HelpEntry {
        name: "perf",
        description: "Performance metrics show you how quickly your recent commands executed. It's like having a stopwatch for each command you run.",
        example: "perf",
        explanation: "This will show you timing information for the most recent commands, helping you identify if anything is running slowly or causing performance issues.",
    },
    HelpEntry {
        name: "theme",
        description: "Theme lets you switch between light and dark mode for better visibility and comfort. It's like having a light switch for your dashboard.",
        example: "theme dark",
        explanation: "This command will switch the terminal to dark mode. You can use 'theme light' to switch back to light mode. This helps reduce eye strain in different lighting conditions.",
    },
    HelpEntry {
        name: "code",
        description: "The code command helps you manage code snippets - creating, viewing, and running them. It's like having a notebook where you can save and run pieces of code.",
        example: "code create javascript hello console.log('Hello, World!')",
        explanation: "This creates a new JavaScript code snippet named 'hello' that prints 'Hello, World!'. You can then view it with 'code show hello' or run it with 'code run hello'.",
    },
    HelpEntry {
        name: "scrape",
        description: "Scrape helps you extract information from websites. It's like having a helper that can read web pages and pull out specific information you're interested in.",
        example: "scrape https://example.com .main-content",
        explanation: "This command will fetch the content from example.com and extract text from elements matching the CSS selector '.main-content'. It's useful for gathering information from websites.",
    },
    HelpEntry {
        name: "status",
        description: "Status shows you the current state of the system, including version information and active connections. It's like checking the dashboard of your car to see how everything is running.",
        example: "status",
        explanation: "This command displays the current system status, version information, and any active WebSocket connections. It's useful for getting a quick overview of what's happening in your system.",
    },
    HelpEntry {
        name: "languages",
        description: "Languages shows you all the programming languages supported by the code command. It's like checking which languages a translator can work with before you start.",
        example: "languages",
        explanation: "This command lists all programming languages that you can use with the 'code' command. It helps you know which languages are available for creating and running code snippets.",
    },
    HelpEntry {
        name: "preview",
        description: "Preview renders HTML code snippets to a file so you can open them in a browser and see how they look. It's like trying on clothes before you buy them.",
        example: "preview my-html-snippet",
        explanation: "If you've created an HTML snippet called 'my-html-snippet', this command will write it out as an HTML file you can open in a browser. It's great for testing HTML designs.",
    },
    HelpEntry {
        name: "sudo",
        description: "Sudo implements a code snippet into a file in your project. It's like taking a draft and making it official by putting it in the right place.",
        example: "sudo my-snippet src/components/Button.tsx",
        explanation: "This command takes the code from the snippet 'my-snippet' and saves it to the file 'src/components/Button.tsx'. It's useful for moving code from experimental snippets into your actual project.",
    },
    HelpEntry {
        name: "backup",
        description: "Backup creates a copy of your current project state. It's like taking a snapshot of your work that you can save for later.",
        example: "backup",
        explanation: "This command creates a ZIP file containing your project files. It's a good way to save your work before making major changes.",
    },
    HelpEntry {
        name: "ws",
        description: "WS (WebSocket) lets you create real-time connections to servers. It's like opening a phone line that stays connected, allowing instant two-way communication.",
        example: "ws connect chat wss://chat.example.com",
        explanation: "This command opens a WebSocket connection to chat.example.com with the name 'chat'. You can then send messages with 'ws send chat hello' and close it with 'ws close chat'.",
    },
    HelpEntry {
        name: "venice",
        description: "Venice lets you interact with Venice AI models and change the active model for the chat interface.",
        example: "venice models",
        explanation: "This command shows all available Venice AI models. You can also use 'venice set llama-3.3-70b' to change the active model in the chat interface.",
    },
];

#[derive(Debug, Default)]
pub struct CommandRegistry;

impl CommandRegistry {
    pub fn new() -> Self {
        Self
    }

    pub fn commands(&self) -> &'static [CommandSpec] {
        COMMANDS
    }

    pub fn contains(&self, name: &str) -> bool {
        COMMANDS.iter().any(|c| c.name == name)
    }

    /// The `help` overview: one `name: description` line per command, in
    /// registration order.
    pub fn render_command_list(&self) -> String {
        COMMANDS
            .iter()
            .map(|c| format!("{}: {}", c.name, c.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Long-form help for one command, or a pointer back to the overview.
    pub fn render_help_topic(&self, name: &str) -> String {
        match HELP_ENTRIES.iter().find(|e| e.name == name) {
            Some(entry) => format!(
                "Command: {}\n\nDescription:\n{}\n\nExample:\n  {}\n\nWhat this does:\n{}",
                entry.name, entry.description, entry.example, entry.explanation
            ),
            None => format!(
                "No detailed help available for '{}'. Use 'help' to see all commands.",
                name
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_order() {
        let registry = CommandRegistry::new();
        let names: Vec<&str> = registry.commands().iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![
                "help", "clear", "theme", "status", "languages", "code", "preview", "sudo",
                "backup", "scrape", "ws", "stats", "perf", "network", "ping", "curl", "venice",
            ]
        );
    }

    #[test]
    fn test_command_list_one_line_per_command() {
        let registry = CommandRegistry::new();
        let list = registry.render_command_list();
        assert_eq!(list.lines().count(), COMMANDS.len());
        assert!(list.starts_with("help: "));
        assert!(list.lines().all(|l| l.contains(": ")));
    }

    #[test]
    fn test_every_command_has_help() {
        let registry = CommandRegistry::new();
        for command in registry.commands() {
            let topic = registry.render_help_topic(command.name);
            assert!(
                topic.starts_with(&format!("Command: {}", command.name)),
                "missing help for {}",
                command.name
            );
        }
    }

    #[test]
    fn test_help_topic_shape() {
        let registry = CommandRegistry::new();
        let topic = registry.render_help_topic("curl");
        assert!(topic.contains("Description:\n"));
        assert!(topic.contains("Example:\n  curl "));
        assert!(topic.contains("What this does:\n"));
    }

    #[test]
    fn test_unknown_help_topic() {
        let registry = CommandRegistry::new();
        let topic = registry.render_help_topic("frobnicate");
        assert_eq!(
            topic,
            "No detailed help available for 'frobnicate'. Use 'help' to see all commands."
        );
    }

    #[test]
    fn test_contains() {
        let registry = CommandRegistry::new();
        assert!(registry.contains("ws"));
        assert!(!registry.contains("rm"));
    }
}
