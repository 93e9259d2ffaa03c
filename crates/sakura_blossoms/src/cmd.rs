//! Shell command blossom.

use async_trait::async_trait;

use sakura_tree::blossom::{Blossom, BlossomSchema};
use sakura_tree::item::BlossomItem;
use sakura_values::Value;

/// Runs a shell command and produces its captured stdout as output.
///
/// Inputs: `command` (required string), `ignore_errors` (optional bool;
/// treats a non-zero exit as success). The exit code lands in the item's
/// `exec_state`.
pub struct CmdBlossom {
    schema: BlossomSchema,
    command: String,
    ignore_errors: bool,
}

impl Default for CmdBlossom {
    fn default() -> Self {
        Self::new()
    }
}

impl CmdBlossom {
    /// Creates the blossom.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: BlossomSchema::new()
                .required("command")
                .optional("ignore_errors")
                .with_output(),
            command: String::new(),
            ignore_errors: false,
        }
    }
}

#[async_trait]
impl Blossom for CmdBlossom {
    fn schema(&self) -> &BlossomSchema {
        &self.schema
    }

    async fn init(&mut self, item: &mut BlossomItem) {
        let Some(command) = item.input_str("command") else {
            item.fail("command is not a string");
            return;
        };
        self.command = command.to_string();
        item.success = true;

        if let Some(flag) = item.input_value("ignore_errors") {
            match flag.as_bool() {
                Some(ignore) => self.ignore_errors = ignore,
                None => item.fail("ignore_errors was set, but is not a bool-value"),
            }
        }
    }

    async fn run(&mut self, item: &mut BlossomItem) {
        tracing::debug!(command = %self.command, "running command");
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(error) => {
                item.fail(format!("failed to spawn command: {error}"));
                return;
            }
        };

        item.exec_state = output.status.code().unwrap_or(-1);
        item.success = output.status.success() || self.ignore_errors;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        item.message = if stderr.is_empty() {
            stdout.clone()
        } else {
            format!("{stdout}{stderr}")
        };
        item.output = Value::String(stdout);
    }
}
