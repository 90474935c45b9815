use crate::config::FormatterConfig;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Post-processing step applied to each rendered document body.
pub trait Formatter {
    fn format(&self, file_name: &str, source: &str) -> Result<String>;
}

/// Runs an external formatter, feeding the source on stdin and reading the
/// formatted result from stdout. The command must exit with status 0.
/// `{file}` in the arguments is replaced with the document's file name.
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    command: String,
    args: Vec<String>,
}

impl CommandFormatter {
    pub fn new(config: &FormatterConfig) -> Self {
        CommandFormatter {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    fn program(&self) -> Result<PathBuf> {
        which::which(&self.command)
            .with_context(|| format!("formatter '{}' not found on PATH", self.command))
    }
}

impl Formatter for CommandFormatter {
    fn format(&self, file_name: &str, source: &str) -> Result<String> {
        let program = self.program()?;
        let mut child = Command::new(&program)
            .args(self.args.iter().map(|a| a.replace("{file}", file_name)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start formatter {}", program.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(source.as_bytes()) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            anyhow::bail!(
                "formatter exited with status {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8(output.stdout)?)
    }
}
