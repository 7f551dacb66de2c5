//! Host commands typed at the prompt, mirroring the extension's command palette.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Connect,
    Disconnect,
    Status,
    TestConnection,
    GenerateApiKey,
    ToggleMode,
    Chat { text: String },
    History,
    Help,
    Quit,
}

impl HostCommand {
    pub fn name(&self) -> &'static str {
        match self {
            HostCommand::Connect => "connect",
            HostCommand::Disconnect => "disconnect",
            HostCommand::Status => "status",
            HostCommand::TestConnection => "test",
            HostCommand::GenerateApiKey => "key",
            HostCommand::ToggleMode => "mode",
            HostCommand::Chat { .. } => "chat",
            HostCommand::History => "history",
            HostCommand::Help => "help",
            HostCommand::Quit => "quit",
        }
    }
}

pub const HELP: &str = "\
commands:
  connect       connect to the MCP service
  disconnect    drop the MCP connection
  status        show the status bar
  test          test the configured endpoint
  key           generate a new API key
  mode          switch between minimal and full status output
  chat <text>   send a chat message
  history       show the chat transcript
  quit          exit";

pub fn parse_command(line: &str) -> Result<HostCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "connect" => HostCommand::Connect,
        "disconnect" => HostCommand::Disconnect,
        "status" => HostCommand::Status,
        "test" | "test-connection" => HostCommand::TestConnection,
        "key" | "generate-api-key" => HostCommand::GenerateApiKey,
        "mode" | "toggle-mode" => HostCommand::ToggleMode,
        "chat" => {
            if rest.is_empty() {
                return Err("usage: chat <text>".to_string());
            }
            HostCommand::Chat {
                text: rest.to_string(),
            }
        }
        "history" => HostCommand::History,
        "help" | "?" => HostCommand::Help,
        "quit" | "exit" => HostCommand::Quit,
        "" => return Err("empty command".to_string()),
        other => return Err(format!("unknown command '{other}'; type 'help'")),
    };
    Ok(command)
}
