//! One-shot deployment of a Git repository to a server.
//!
//! Shipyard clones (or fast-forwards) a repository locally, copies
//! it to a remote host over SSH, installs Docker, Docker Compose and
//! nginx there when missing, builds and runs the application
//! container, puts nginx in front of it and checks the result.
//!
//! # Overview
//!
//! A run is driven by a [`Pipeline`] built over two seams:
//!
//! - a [`CommandRunner`](cmd::CommandRunner) that executes every
//!   external program, locally or on the remote host
//!   ([`SystemRunner`] in production)
//! - a [`Prompter`](prompt::Prompter) for operator input
//!   ([`TerminalPrompter`] in production)
//!
//! Input is collected once into an immutable [`DeploymentConfig`]
//! and passed to each stage:
//!
//! 1. **Preflight** - `git`, `ssh` and `scp` must be on PATH
//! 2. **Input** - repository URL, token, branch, user, IP, key,
//!    port, confirmation
//! 3. **Repository** - clone or fast-forward `./<project>`
//! 4. **SSH** - one bounded connection attempt
//! 5. **Provision** - Docker, Compose, nginx, installed only if
//!    missing
//! 6. **Deploy** - copy the checkout, replace the container using
//!    `docker-compose.yml` or a `Dockerfile`
//! 7. **Proxy** - enable an nginx site for the app port
//! 8. **Verify** - container must run; HTTP checks only warn
//! 9. **Cleanup** - the token is wiped
//!
//! # Example
//!
//! ```rust,no_run
//! use shipyard::{
//!     DeploymentConfig, Pipeline, RemoteHost, SecretString, SystemRunner,
//!     TerminalPrompter,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let runner = SystemRunner::new();
//!     let prompter = TerminalPrompter::new();
//!
//!     let remote = RemoteHost::new("203.0.113.7", "ubuntu")
//!         .with_key("/home/me/.ssh/id_ed25519");
//!     let mut config =
//!         DeploymentConfig::new("https://github.com/acme/shop.git", remote)
//!             .branch("release")
//!             .port(8080)
//!             .token(SecretString::from(std::env::var("SHIPYARD_TOKEN")?));
//!
//!     Pipeline::new(&runner, &prompter).run(&mut config, true, false)?;
//!     Ok(())
//! }
//! ```

#![allow(
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cmd;
pub mod compose;
pub mod config;
pub mod deploy;
pub mod error;
pub mod input;
pub mod logging;
pub mod nginx;
pub mod pipeline;
pub mod preflight;
pub mod prompt;
pub mod provision;
pub mod proxy;
pub mod repo;
pub mod ssh;
pub mod validate;
pub mod verify;

pub use cmd::{Command, CommandOutput, CommandRunner, SystemRunner, Target};
pub use config::{DeploymentConfig, FileConfig};
pub use error::{DeployError, DeployResult};
pub use pipeline::{Cli, Outcome, Pipeline};
pub use prompt::{Prompter, TerminalPrompter};
pub use secrecy::SecretString;
pub use ssh::{HostKeyPolicy, RemoteHost, SshSession};
