use tracing::info;

use crate::cmd::{self, CommandRunner};
use crate::error::{DeployError, DeployResult};

/// Local programs the deployment shells out to.
pub const REQUIRED: [&str; 3] = ["git", "ssh", "scp"];

/// Fail on the first required program missing from PATH.
///
/// # Errors
///
/// Returns [`DeployError::PrerequisiteMissing`] naming the program.
pub fn check_dependencies(runner: &dyn CommandRunner) -> DeployResult<()> {
    info!("Checking local dependencies...");

    for program in REQUIRED {
        if !cmd::command_exists(runner, program) {
            return Err(DeployError::PrerequisiteMissing(format!(
                "{program} is not installed or not on PATH"
            )));
        }
    }

    info!("Dependencies OK");
    Ok(())
}
