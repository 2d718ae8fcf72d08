use std::fmt::Write;

/// A single nginx `server` block that reverse-proxies every path
/// to one upstream.
///
/// # Example
///
/// ```
/// use shipyard::nginx::{self, NginxSite};
///
/// let site = NginxSite::new("203.0.113.7")
///     .proxy_pass("http://localhost:3000")
///     .forwarded_headers();
///
/// let conf = nginx::render(&site);
/// assert!(conf.contains("server_name 203.0.113.7;"));
/// assert!(conf.contains("proxy_pass http://localhost:3000;"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NginxSite {
    pub server_name: String,
    pub listen: u16,
    pub proxy_pass: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl NginxSite {
    #[must_use]
    pub fn new(server_name: &str) -> Self {
        Self {
            server_name: server_name.to_string(),
            listen: 80,
            proxy_pass: None,
            headers: Vec::new(),
        }
    }

    /// The site in front of an application listening on
    /// `localhost:<port>`.
    #[must_use]
    pub fn for_app(server_name: &str, port: u16) -> Self {
        Self::new(server_name)
            .proxy_pass(&format!("http://localhost:{port}"))
            .forwarded_headers()
    }

    #[must_use]
    pub const fn listen(mut self, port: u16) -> Self {
        self.listen = port;
        self
    }

    #[must_use]
    pub fn proxy_pass(mut self, upstream: &str) -> Self {
        self.proxy_pass = Some(upstream.to_string());
        self
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Pass the original host, client address, forwarding chain
    /// and scheme to the upstream.
    #[must_use]
    pub fn forwarded_headers(self) -> Self {
        self.header("Host", "$host")
            .header("X-Real-IP", "$remote_addr")
            .header("X-Forwarded-For", "$proxy_add_x_forwarded_for")
            .header("X-Forwarded-Proto", "$scheme")
    }
}

/// Render the site as an nginx configuration file.
#[must_use]
pub fn render(site: &NginxSite) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "server {{");
    let _ = writeln!(out, "    listen {};", site.listen);
    let _ = writeln!(out, "    server_name {};", site.server_name);
    let _ = writeln!(out);
    let _ = writeln!(out, "    location / {{");
    if let Some(upstream) = &site.proxy_pass {
        let _ = writeln!(out, "        proxy_pass {upstream};");
    }
    for (name, value) in &site.headers {
        let _ = writeln!(out, "        proxy_set_header {name} {value};");
    }
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
    out
}
