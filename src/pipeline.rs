use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use tracing::{info, warn};

use crate::cmd::{self, CommandRunner};
use crate::config::{DeploymentConfig, FileConfig};
use crate::deploy;
use crate::error::DeployResult;
use crate::input::{self, Presets, RunOptions};
use crate::nginx::{self, NginxSite};
use crate::preflight;
use crate::prompt::Prompter;
use crate::provision;
use crate::proxy;
use crate::repo;
use crate::ssh::{HostKeyPolicy, RemoteHost, SshSession};
use crate::validate;
use crate::verify::{self, VerificationReport};

/// Environment variable read for the access token before prompting.
pub const TOKEN_ENV: &str = "SHIPYARD_TOKEN";

/// How a deployment run ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Deployed(VerificationReport),
    Declined,
    DryRun,
    Status,
}

/// Deployment pipeline running the stages in order: dependency
/// check, input, repository sync, SSH check, provisioning, deploy,
/// reverse proxy, verification, cleanup.
pub struct Pipeline<'a> {
    runner: &'a dyn CommandRunner,
    prompter: &'a dyn Prompter,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, prompter: &'a dyn Prompter) -> Self {
        Self { runner, prompter }
    }

    /// Dispatch a parsed command line.
    ///
    /// # Errors
    ///
    /// Returns the first error of the selected subcommand.
    pub fn dispatch(&self, cli: &Cli, file: &FileConfig) -> DeployResult<Outcome> {
        match &cli.command {
            Command::Deploy(args) => {
                let presets = args.presets(file, std::env::var(TOKEN_ENV).ok());
                let options = args.run_options(file);
                self.deploy(presets, &options, args.dry_run)
            }
            Command::Status(args) => {
                self.status(args)?;
                Ok(Outcome::Status)
            }
        }
    }

    /// Check dependencies, collect input, then run every remaining
    /// stage.
    ///
    /// # Errors
    ///
    /// Returns an error if a dependency is missing, input collection
    /// fails or any later stage fails.
    pub fn deploy(
        &self,
        presets: Presets,
        options: &RunOptions,
        dry_run: bool,
    ) -> DeployResult<Outcome> {
        preflight::check_dependencies(self.runner)?;
        let mut config = input::collect(self.prompter, presets, options)?;
        self.run(&mut config, options.assume_yes, dry_run)
    }

    /// Run the stages after input collection. The credential is
    /// cleared before returning, whatever the result.
    ///
    /// # Errors
    ///
    /// Returns the first fatal stage error: repository access, SSH,
    /// provisioning, container deployment, nginx configuration or a
    /// container that is not running afterwards.
    pub fn run(
        &self,
        config: &mut DeploymentConfig,
        assume_yes: bool,
        dry_run: bool,
    ) -> DeployResult<Outcome> {
        let result = self.stages(config, assume_yes, dry_run);
        config.clear_credential();
        info!("Credential cleared");
        result
    }

    fn stages(
        &self,
        config: &DeploymentConfig,
        assume_yes: bool,
        dry_run: bool,
    ) -> DeployResult<Outcome> {
        if dry_run {
            print_plan(config);
            return Ok(Outcome::DryRun);
        }

        if !input::confirm(self.prompter, config, assume_yes)? {
            info!("Deployment cancelled");
            return Ok(Outcome::Declined);
        }

        info!("[1/6] Syncing repository");
        repo::sync(self.runner, config)?;

        info!("[2/6] Checking SSH connection to {}", config.remote.destination());
        let session = SshSession::new(&config.remote, self.runner);
        session.check_connection()?;

        info!("[3/6] Provisioning remote environment");
        provision::provision(&session)?;

        info!("[4/6] Deploying {}", config.project);
        deploy::run(&session, config)?;

        info!("[5/6] Configuring nginx");
        proxy::configure(&session, config)?;

        info!("[6/6] Verifying deployment");
        let report = verify::verify(&session, self.runner, config)?;
        for warning in report.warnings() {
            warn!("{warning}");
        }

        info!("Deployment complete!");
        info!("Application available at: http://{}", config.remote.host);
        Ok(Outcome::Deployed(report))
    }

    fn status(&self, args: &StatusArgs) -> DeployResult<()> {
        let host = validate::ip_address(&args.host)?;
        let user = validate::username(&args.user)?;
        let mut remote = RemoteHost::new(&host, &user);
        if let Some(key) = &args.key {
            remote = remote.with_key(validate::key_path(key)?);
        }

        let session = SshSession::new(&remote, self.runner);
        let output = session.exec(&format!(
            "{}docker ps --all --filter name={}",
            remote.sudo(),
            cmd::quote(&args.name)
        ))?;
        println!("{output}");
        Ok(())
    }
}

fn print_plan(config: &DeploymentConfig) {
    let site = nginx::render(&NginxSite::for_app(&config.remote.host, config.port));

    eprintln!("=== Dry run: no changes will be made ===");
    eprintln!();
    eprintln!("--- nginx site ({}) ---", config.project);
    println!("{site}");
    eprintln!("--- Actions that would be performed ---");
    eprintln!(
        "1. Clone or update {} ({}) into {}",
        config.repo_url,
        config.branch,
        config.local_dir().display()
    );
    eprintln!("2. Check SSH access to {}", config.remote.destination());
    eprintln!("3. Install Docker, Docker Compose and Nginx if missing");
    eprintln!("4. Copy the checkout to {}", config.remote_dir());
    eprintln!(
        "5. Replace container {} (compose manifest or Dockerfile, port {})",
        config.container, config.port
    );
    eprintln!("6. Enable the nginx site and reload nginx");
    eprintln!("7. Check container, http://localhost:{} and http://{}", config.port, config.remote.host);
}

#[derive(Parser)]
#[command(name = "shipyard")]
#[command(about = "Deploy a Git repository to a server with Docker and nginx")]
pub struct Cli {
    /// YAML file with default answers
    #[arg(long, global = true, env = "SHIPYARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for the run's log file
    #[arg(long, global = true, env = "SHIPYARD_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Defaults from `--config`, or empty ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn file_config(&self) -> DeployResult<FileConfig> {
        self.config
            .as_deref()
            .map_or_else(|| Ok(FileConfig::default()), FileConfig::load)
    }

    #[must_use]
    pub fn log_dir(&self, file: &FileConfig) -> PathBuf {
        self.log_dir
            .clone()
            .or_else(|| file.log_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Clone, ship, build and expose the application
    Deploy(DeployArgs),

    /// Show the container on a remote server
    Status(StatusArgs),
}

#[derive(Args, Debug, Default)]
pub struct DeployArgs {
    /// HTTPS repository URL ending in .git
    #[arg(long)]
    pub repo: Option<String>,

    /// Branch to deploy (default: main)
    #[arg(long)]
    pub branch: Option<String>,

    /// Remote SSH user
    #[arg(long)]
    pub user: Option<String>,

    /// Remote server IPv4 address
    #[arg(long)]
    pub host: Option<String>,

    /// SSH private key
    #[arg(long)]
    pub key: Option<String>,

    /// Application port, published on the same host port
    #[arg(long)]
    pub port: Option<String>,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Parent directory of the local checkout
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Seconds to wait before checking the application
    #[arg(long)]
    pub grace_secs: Option<u64>,

    /// SSH connection timeout in seconds
    #[arg(long)]
    pub connect_timeout: Option<u64>,

    /// Do not verify the server's host key (exposes the connection
    /// to man-in-the-middle attacks)
    #[arg(long)]
    pub insecure_skip_host_key_check: bool,

    /// Preview the nginx site and actions without changing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl DeployArgs {
    /// Flags win over the config file; the token only ever comes
    /// from the environment or the prompt.
    #[must_use]
    pub fn presets(&self, file: &FileConfig, token: Option<String>) -> Presets {
        Presets {
            repo: self.repo.clone().or_else(|| file.repo.clone()),
            token: token.filter(|t| !t.is_empty()).map(SecretString::from),
            branch: self.branch.clone().or_else(|| file.branch.clone()),
            user: self.user.clone().or_else(|| file.user.clone()),
            host: self.host.clone().or_else(|| file.host.clone()),
            key: self.key.clone().or_else(|| file.key.clone()),
            port: self
                .port
                .clone()
                .or_else(|| file.port.map(|p| p.to_string())),
        }
    }

    #[must_use]
    pub fn run_options(&self, file: &FileConfig) -> RunOptions {
        let defaults = RunOptions::default();
        RunOptions {
            workdir: self.workdir.clone().unwrap_or(defaults.workdir),
            health_grace: self
                .grace_secs
                .or(file.health_grace_secs)
                .map_or(defaults.health_grace, Duration::from_secs),
            connect_timeout: self
                .connect_timeout
                .or(file.connect_timeout_secs)
                .map_or(defaults.connect_timeout, Duration::from_secs),
            host_key_policy: if self.insecure_skip_host_key_check {
                HostKeyPolicy::Disabled
            } else {
                defaults.host_key_policy
            },
            assume_yes: self.yes,
        }
    }
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Remote server IPv4 address
    #[arg(long)]
    pub host: String,

    /// Remote SSH user
    #[arg(long)]
    pub user: String,

    /// SSH private key
    #[arg(long)]
    pub key: Option<String>,

    /// Container name filter
    #[arg(long)]
    pub name: String,
}
