use dialoguer::{Confirm, Input, Password};
use secrecy::SecretString;

use crate::error::DeployResult;

/// Operator interaction used by input collection.
pub trait Prompter {
    /// Ask for a line of text. An empty answer yields `default`
    /// when one is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read.
    fn input(&self, prompt: &str, default: Option<&str>) -> DeployResult<String>;

    /// Ask for a value without echoing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read.
    fn secret(&self, prompt: &str) -> DeployResult<SecretString>;

    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read.
    fn confirm(&self, prompt: &str) -> DeployResult<bool>;

    /// Report a rejected answer before asking again.
    fn error(&self, message: &str);
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Prompter for TerminalPrompter {
    fn input(&self, prompt: &str, default: Option<&str>) -> DeployResult<String> {
        let mut input = Input::<String>::new().with_prompt(prompt).allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn secret(&self, prompt: &str) -> DeployResult<SecretString> {
        let value = Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?;
        Ok(SecretString::from(value))
    }

    fn confirm(&self, prompt: &str) -> DeployResult<bool> {
        Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
    }

    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}
