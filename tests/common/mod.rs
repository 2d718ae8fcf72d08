//! Scripted test doubles for the command runner and the prompter.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use shipyard::{Command, CommandOutput, CommandRunner, DeployError, DeployResult, Prompter, SecretString, Target};

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub remote: bool,
    pub command: Command,
}

impl Call {
    /// Full text of the invocation, secrets included.
    pub fn text(&self) -> String {
        self.command.to_shell_string()
    }

    pub fn program(&self) -> &str {
        self.command.program()
    }
}

type Matcher = Box<dyn Fn(&Call) -> bool>;

/// Answers commands from a list of rules; the first matching rule
/// wins, anything unmatched succeeds with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<(Matcher, CommandOutput)>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `output` to any call whose text contains `needle`.
    pub fn on(mut self, needle: &str, output: CommandOutput) -> Self {
        let needle = needle.to_string();
        self.rules
            .push((Box::new(move |call: &Call| call.text().contains(&needle)), output));
        self
    }

    /// Same as [`Self::on`] but only for remote calls.
    pub fn on_remote(mut self, needle: &str, output: CommandOutput) -> Self {
        let needle = needle.to_string();
        self.rules.push((
            Box::new(move |call: &Call| call.remote && call.text().contains(&needle)),
            output,
        ));
        self
    }

    /// Same as [`Self::on`] but only for local calls.
    pub fn on_local(mut self, needle: &str, output: CommandOutput) -> Self {
        let needle = needle.to_string();
        self.rules.push((
            Box::new(move |call: &Call| !call.remote && call.text().contains(&needle)),
            output,
        ));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn remote_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.remote).collect()
    }

    pub fn ran(&self, needle: &str) -> bool {
        self.calls().iter().any(|c| c.text().contains(needle))
    }

    pub fn position(&self, needle: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.text().contains(needle))
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, target: Target<'_>, command: &Command) -> DeployResult<CommandOutput> {
        let call = Call {
            remote: matches!(target, Target::Remote(_)),
            command: command.clone(),
        };
        let output = self
            .rules
            .iter()
            .find(|(matches, _)| matches(&call))
            .map_or_else(|| CommandOutput::ok(""), |(_, output)| output.clone());
        self.calls.borrow_mut().push(call);
        Ok(output)
    }
}

/// Replays queued answers; runs dry with a prompt error.
#[derive(Default)]
pub struct ScriptedPrompter {
    inputs: RefCell<VecDeque<String>>,
    secrets: RefCell<VecDeque<String>>,
    confirms: RefCell<VecDeque<bool>>,
    asked: RefCell<Vec<String>>,
    errors: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, answer: &str) -> Self {
        self.inputs.borrow_mut().push_back(answer.to_string());
        self
    }

    pub fn token(self, answer: &str) -> Self {
        self.secrets.borrow_mut().push_back(answer.to_string());
        self
    }

    pub fn confirmation(self, answer: bool) -> Self {
        self.confirms.borrow_mut().push_back(answer);
        self
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&self, prompt: &str, default: Option<&str>) -> DeployResult<String> {
        self.asked.borrow_mut().push(prompt.to_string());
        let answer = self
            .inputs
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| DeployError::Prompt(format!("no answer for '{prompt}'")))?;
        match (answer.is_empty(), default) {
            (true, Some(default)) => Ok(default.to_string()),
            _ => Ok(answer),
        }
    }

    fn secret(&self, prompt: &str) -> DeployResult<SecretString> {
        self.asked.borrow_mut().push(prompt.to_string());
        self.secrets
            .borrow_mut()
            .pop_front()
            .map(SecretString::from)
            .ok_or_else(|| DeployError::Prompt(format!("no secret for '{prompt}'")))
    }

    fn confirm(&self, prompt: &str) -> DeployResult<bool> {
        self.asked.borrow_mut().push(prompt.to_string());
        self.confirms
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| DeployError::Prompt(format!("no confirmation for '{prompt}'")))
    }

    fn error(&self, message: &str) {
        self.errors.borrow_mut().push(message.to_string());
    }
}

/// A throwaway file standing in for an SSH private key.
pub fn key_file() -> tempfile::NamedTempFile {
    tempfile::NamedTempFile::new().expect("temp key file")
}
