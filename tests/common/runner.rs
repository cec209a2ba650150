//! A CommandRunner that answers from a script instead of spawning processes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use extsnmpd::extensible::{CommandLine, CommandOutput, CommandRunner};
use extsnmpd::mib::BoxFuture;

/// Replies keyed by the rendered command line. Unknown commands fail the
/// way a missing program would.
#[derive(Default)]
pub struct ScriptedRunner {
    replies: Mutex<HashMap<String, CommandOutput>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, command: &str, status: i32, stdout: &str) -> Self {
        self.set_reply(command, status, stdout);
        self
    }

    /// Change a reply while the agent is running.
    pub fn set_reply(&self, command: &str, status: i32, stdout: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(command.to_owned(), CommandOutput::new(status, stdout));
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls().iter().filter(|c| *c == command).count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run<'a>(
        &'a self,
        command: &'a CommandLine,
        _deadline: Duration,
    ) -> BoxFuture<'a, CommandOutput> {
        Box::pin(async move {
            let key = command.to_string();
            self.calls.lock().unwrap().push(key.clone());
            self.replies
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .unwrap_or_else(CommandOutput::failed)
        })
    }
}
