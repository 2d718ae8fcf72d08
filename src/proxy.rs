use std::io::Write;

use tracing::{debug, info};

use crate::cmd::quote;
use crate::config::DeploymentConfig;
use crate::error::{DeployError, DeployResult};
use crate::nginx::{self, NginxSite};
use crate::ssh::SshSession;

pub const SITES_AVAILABLE: &str = "/etc/nginx/sites-available";
pub const SITES_ENABLED: &str = "/etc/nginx/sites-enabled";

/// Install a server block for the application as the only enabled
/// site, test it, and reload nginx.
///
/// A configuration rejected by `nginx -t` is fatal and nginx is not
/// reloaded, so the previous configuration keeps serving.
///
/// # Errors
///
/// Returns [`DeployError::ProxyConfigInvalid`] when `nginx -t`
/// rejects the site, and a command error when the upload, install or
/// reload fails.
pub fn configure(session: &SshSession<'_>, config: &DeploymentConfig) -> DeployResult<()> {
    let site = NginxSite::for_app(&config.remote.host, config.port);
    let content = nginx::render(&site);
    debug!("nginx site:\n{content}");

    let staged = format!("/tmp/{}.nginx.conf", config.project);
    let mut local = tempfile::Builder::new()
        .prefix("shipyard-nginx-")
        .suffix(".conf")
        .tempfile()?;
    local.write_all(content.as_bytes())?;
    local.flush()?;

    info!("Uploading nginx configuration...");
    let upload = session.copy_to(local.path(), &staged);
    // The local copy goes away whether or not the upload worked.
    drop(local);
    upload?;

    session.exec(&install_script(session.host().sudo(), &staged, &config.project))?;

    let sudo = session.host().sudo();
    let test = session.status(&format!("{sudo}nginx -t"))?;
    if !test.success() {
        return Err(DeployError::ProxyConfigInvalid(test.stderr.trim().to_string()));
    }

    session.exec(&format!("{sudo}systemctl reload nginx"))?;
    info!("nginx now proxies http://{} to port {}", config.remote.host, config.port);
    Ok(())
}

/// Move the staged file into `sites-available`, enable it and
/// disable the default site.
#[must_use]
pub fn install_script(sudo: &str, staged: &str, project: &str) -> String {
    let staged = quote(staged);
    let available = quote(&format!("{SITES_AVAILABLE}/{project}"));
    let enabled = quote(&format!("{SITES_ENABLED}/{project}"));
    format!(
        "{sudo}mv {staged} {available} && \
         {sudo}ln -sf {available} {enabled} && \
         {sudo}rm -f {SITES_ENABLED}/default"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_replaces_default_site() {
        let script = install_script("sudo ", "/tmp/shop.nginx.conf", "shop");

        assert_eq!(
            script,
            "sudo mv /tmp/shop.nginx.conf /etc/nginx/sites-available/shop && \
             sudo ln -sf /etc/nginx/sites-available/shop /etc/nginx/sites-enabled/shop && \
             sudo rm -f /etc/nginx/sites-enabled/default"
        );
    }

    #[test]
    fn install_quotes_site_paths() {
        let script = install_script("", "/tmp/x;id.nginx.conf", "x;id");

        assert_eq!(
            script,
            "mv '/tmp/x;id.nginx.conf' '/etc/nginx/sites-available/x;id' && \
             ln -sf '/etc/nginx/sites-available/x;id' '/etc/nginx/sites-enabled/x;id' && \
             rm -f /etc/nginx/sites-enabled/default"
        );
    }
}
