use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::CurateError;

const USER_AGENT: &str = concat!("pubcurate/", env!("CARGO_PKG_VERSION"));

/// An HTTP client that only allows requests to approved hosts.
#[derive(Debug, Clone)]
///
/// Requests carry no timeout unless one is set with [`SandboxClient::with_timeout`].
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
    timeout: Option<Duration>,
}

impl SandboxClient {
    /// Creates a client allowing the NCBI services, the OpenAI API and loopback hosts.
    pub fn new() -> Result<Self, CurateError> {
        let domains = [
            "www.ncbi.nlm.nih.gov", // ID Converter, BioC
            "api.openai.com",       // Files + Batches
            "localhost",
            "127.0.0.1",
        ];
        let allowlist = domains.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CurateError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist, timeout: None })
    }

    /// Bounds every request made through this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Allows the host of `url`, used when an endpoint is overridden in config.
    pub fn allow_url(&mut self, url: &str) -> Result<(), CurateError> {
        let parsed = Url::parse(url)
            .map_err(|e| CurateError::Config(format!("invalid URL {url}: {e}")))?;
        match parsed.host_str() {
            Some(host) => {
                self.allow_domain(host);
                Ok(())
            }
            None => Err(CurateError::Config(format!("URL has no host: {url}"))),
        }
    }

    /// Validates if a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                return self
                    .allowlist
                    .iter()
                    .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)));
            }
        }
        false
    }

    fn check(&self, url: &str) -> Result<(), CurateError> {
        if self.is_allowed(url) {
            Ok(())
        } else {
            Err(CurateError::Security(format!("domain not in allowlist for URL {}", url)))
        }
    }

    fn bounded(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.timeout {
            Some(t) => req.timeout(t),
            None => req,
        }
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, CurateError> {
        self.check(url)?;
        Ok(self.bounded(self.client.get(url)))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, CurateError> {
        self.check(url)?;
        Ok(self.bounded(self.client.post(url)))
    }
}
