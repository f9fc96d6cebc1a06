//! Interactive session that drives a manifold from the terminal
//!
//! Free text is navigated and executed; lines starting with `/` are commands.

use anyhow::Result;
use rustyline::{error::ReadlineError, DefaultEditor};

use crate::workflow::Manifold;

/// Slash commands understood by the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    State,
    Regions,
    Exit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let cmd = line.split_whitespace().next().unwrap_or("");
        match cmd {
            "/status" => Command::Status,
            "/state" => Command::State,
            "/regions" => Command::Regions,
            "/exit" | "/quit" => Command::Exit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Interactive driver around one manifold
pub struct WorkflowSession {
    manifold: Manifold,
}

impl WorkflowSession {
    pub fn new(manifold: Manifold) -> Self {
        Self { manifold }
    }

    pub fn manifold(&self) -> &Manifold {
        &self.manifold
    }

    /// Start the interactive loop
    pub async fn run(&mut self) -> Result<()> {
        println!("Manifold workflow session");
        println!();
        println!("Commands:");
        println!("  /status     - Show current region and its neighbours");
        println!("  /state      - Show accumulated state as JSON");
        println!("  /regions    - List regions");
        println!("  /exit       - Exit session");
        println!();
        println!("Anything else is treated as a prompt.");
        println!();

        let mut rl = DefaultEditor::new()?;

        loop {
            match rl.readline("workflow> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    if trimmed.starts_with('/') {
                        match self.handle_command(Command::parse(trimmed)) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(e) => println!("✗ Error: {}", e),
                        }
                        continue;
                    }

                    println!("{}", self.handle_prompt(trimmed).await);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Interrupted. Use /exit to quit.");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    println!("Error: {:?}", err);
                    break;
                }
            }
        }

        println!("\nSession ended.");
        Ok(())
    }

    /// Navigate, then execute, and describe what happened
    pub async fn handle_prompt(&mut self, prompt: &str) -> String {
        let navigated = self.manifold.navigate(prompt).await;
        let executed = self.manifold.execute_workflow(prompt).await;
        let region = self.manifold.current_name().unwrap_or("-");
        format!(
            "{} navigate  {} execute  (region: {})",
            mark(navigated),
            mark(executed),
            region
        )
    }

    /// Returns true when the session should end
    fn handle_command(&self, command: Command) -> Result<bool> {
        match command {
            Command::Status => {
                println!("{}", self.status());
                Ok(false)
            }
            Command::State => {
                let json = serde_json::to_string_pretty(&self.manifold.state())?;
                println!("\n{}\n", json);
                Ok(false)
            }
            Command::Regions => {
                for region in self.manifold.regions() {
                    let marker = if self.manifold.current_name() == Some(region.name()) {
                        "*"
                    } else {
                        " "
                    };
                    let kind = if region.as_nested().is_some() { " (nested)" } else { "" };
                    println!("{} {}{}", marker, region.name(), kind);
                }
                Ok(false)
            }
            Command::Exit => Ok(true),
            Command::Unknown(cmd) => {
                println!("Unknown command: {}", cmd);
                println!("Available commands: /status, /state, /regions, /exit");
                Ok(false)
            }
        }
    }

    /// Current region, its operators and its neighbours
    pub fn status(&self) -> String {
        let Some(current) = self.manifold.current() else {
            return "No regions".to_string();
        };

        let operators: Vec<String> = current
            .operators()
            .iter()
            .map(|op| op.name().to_string())
            .collect();
        let adjacent: Vec<String> = current
            .adjacent()
            .iter()
            .map(|r| r.name().to_string())
            .collect();

        format!(
            "Region:     {}{}\nOperators:  {}\nAdjacent:   {}\nState keys: {}",
            current.name(),
            if current.as_nested().is_some() { " (nested)" } else { "" },
            operators.join(", "),
            adjacent.join(", "),
            self.manifold.state().len()
        )
    }
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✓"
    } else {
        "✗"
    }
}
