//! Scripted command-runner fake (testing only).
//!
//! `ScriptedRunner` satisfies [`CommandRunner`] without spawning any
//! subprocess: invocations are matched against substring rules on the
//! rendered command line, first rule wins, and anything unmatched gets
//! the default outcome (success unless overridden).

use std::sync::Mutex;

use async_trait::async_trait;

use crate::runner::{CommandOutcome, CommandRunner, CommandSpec};

struct Rule {
    needle: String,
    outcome: CommandOutcome,
}

/// In-memory fake runner with pre-programmed outcomes and a call log.
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<CommandSpec>>,
    default: CommandOutcome,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRunner {
    /// A runner where every command succeeds unless a rule says otherwise.
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            default: CommandOutcome::ok(),
        }
    }

    /// A runner where every unmatched command fails.
    pub fn failing() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            default: CommandOutcome::failed(1),
        }
    }

    /// Program an outcome for any command line containing `needle`.
    pub fn on(self, needle: impl Into<String>, outcome: CommandOutcome) -> Self {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.into(),
            outcome,
        });
        self
    }

    /// Rendered command lines of every invocation, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|s| s.display()).collect()
    }

    /// Number of invocations whose command line contains `needle`.
    pub fn count_matching(&self, needle: &str) -> usize {
        self.calls()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> CommandOutcome {
        self.calls.lock().unwrap().push(spec.clone());
        let line = spec.display();
        let rules = self.rules.lock().unwrap();
        rules
            .iter()
            .find(|rule| line.contains(&rule.needle))
            .map(|rule| rule.outcome.clone())
            .unwrap_or_else(|| self.default.clone())
    }
}
