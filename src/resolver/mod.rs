//! Download link resolution
//!
//! Stored download links point at hoster landing pages. Turning one into a
//! direct file URL either needs a host-specific rewrite or an external
//! helper that drives a browser. Every resolver reports one of three
//! outcomes and never blocks past its timeout.

use crate::config::ResolverConfig;
use crate::model::DownloadLink;
use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};
use url::Url;

/// Result of resolving one download link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Direct download URL
    Resolved(String),

    /// The resolver did not finish in time
    Timeout,

    /// The resolver finished without a usable URL
    Failed(String),
}

impl ResolveOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl fmt::Display for ResolveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(url) => write!(f, "{}", url),
            Self::Timeout => f.write_str("timed out"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Turns a hoster landing page into a direct download URL
#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn resolve(&self, link: &DownloadLink) -> ResolveOutcome;
}

/// Rewrites links for hosts with a predictable direct URL
#[derive(Debug, Default, Clone, Copy)]
pub struct HostRewriteResolver;

impl HostRewriteResolver {
    pub fn new() -> Self {
        Self
    }

    fn rewrite(url: &Url) -> Option<String> {
        let host = url.host_str()?.trim_start_matches("www.");
        if !host.eq_ignore_ascii_case("pixeldrain.com") {
            return None;
        }

        let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
        match (segments.next(), segments.next()) {
            (Some("u"), Some(file_id)) => Some(format!(
                "https://pixeldrain.com/api/file/{}?download",
                file_id
            )),
            _ => None,
        }
    }
}

#[async_trait]
impl LinkResolver for HostRewriteResolver {
    async fn resolve(&self, link: &DownloadLink) -> ResolveOutcome {
        let url = match Url::parse(&link.url) {
            Ok(url) => url,
            Err(e) => return ResolveOutcome::Failed(format!("invalid link: {}", e)),
        };

        match Self::rewrite(&url) {
            Some(direct) => ResolveOutcome::Resolved(direct),
            None => ResolveOutcome::Failed(format!("no rewrite rule for {}", link.host)),
        }
    }
}

/// Runs an external helper that prints the direct URL on stdout
///
/// The link URL is appended as the last argument. The helper is killed when
/// the timeout elapses.
#[derive(Debug, Clone)]
pub struct CommandResolver {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandResolver {
    /// Creates a resolver from a command line; `None` if `command` is empty
    pub fn new(command: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }

    pub fn from_config(config: &ResolverConfig) -> Option<Self> {
        Self::new(&config.command, config.timeout())
    }
}

/// First non-empty line of helper output that parses as an http(s) URL
fn first_url_line(stdout: &str) -> Option<String> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let url = Url::parse(line).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| line.to_string())
}

#[async_trait]
impl LinkResolver for CommandResolver {
    async fn resolve(&self, link: &DownloadLink) -> ResolveOutcome {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(&link.url)
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(program = %self.program, link = %link.url, "Running resolver helper");

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                warn!(link = %link.url, timeout = ?self.timeout, "Resolver helper timed out");
                return ResolveOutcome::Timeout;
            }
            Ok(Err(e)) => {
                return ResolveOutcome::Failed(format!("failed to run {}: {}", self.program, e))
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.lines().map(str::trim).find(|l| !l.is_empty());
            return ResolveOutcome::Failed(match reason {
                Some(reason) => format!("helper exited with {}: {}", output.status, reason),
                None => format!("helper exited with {}", output.status),
            });
        }

        match first_url_line(&String::from_utf8_lossy(&output.stdout)) {
            Some(url) => ResolveOutcome::Resolved(url),
            None => ResolveOutcome::Failed("helper printed no URL".to_string()),
        }
    }
}

/// Tries each resolver in order until one resolves the link
///
/// When none does, the last resolver's outcome is returned.
pub struct ChainResolver {
    resolvers: Vec<Box<dyn LinkResolver>>,
}

impl ChainResolver {
    pub fn new(resolvers: Vec<Box<dyn LinkResolver>>) -> Self {
        Self { resolvers }
    }

    /// Host rewrites first, then the configured helper if there is one
    pub fn from_config(config: Option<&ResolverConfig>) -> Self {
        let mut resolvers: Vec<Box<dyn LinkResolver>> = vec![Box::new(HostRewriteResolver)];
        if let Some(command) = config.and_then(CommandResolver::from_config) {
            resolvers.push(Box::new(command));
        }
        Self::new(resolvers)
    }
}

#[async_trait]
impl LinkResolver for ChainResolver {
    async fn resolve(&self, link: &DownloadLink) -> ResolveOutcome {
        let mut last = ResolveOutcome::Failed("no resolver configured".to_string());
        for resolver in &self.resolvers {
            last = resolver.resolve(link).await;
            if last.is_resolved() {
                break;
            }
            debug!(link = %link.url, outcome = %last, "Resolver did not resolve link");
        }
        last
    }
}
