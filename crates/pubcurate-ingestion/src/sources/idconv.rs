//! NCBI PMC ID Converter client.
//!
//! Endpoint: https://www.ncbi.nlm.nih.gov/pmc/utils/idconv/v1.0/

use async_trait::async_trait;
use pubcurate_common::sandbox::SandboxClient as Client;
use tracing::{debug, instrument, warn};

use super::IdResolver;

pub const IDCONV_URL: &str = "https://www.ncbi.nlm.nih.gov/pmc/utils/idconv/v1.0/";
pub const DEFAULT_TOOL: &str = "my_tool";
pub const DEFAULT_EMAIL: &str = "nf-osi@sagebionetworks.org";

pub struct IdConverterClient {
    client: Client,
    url: String,
    tool: String,
    email: String,
}

impl IdConverterClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            url: IDCONV_URL.to_string(),
            tool: DEFAULT_TOOL.to_string(),
            email: DEFAULT_EMAIL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_contact(mut self, tool: impl Into<String>, email: impl Into<String>) -> Self {
        self.tool = tool.into();
        self.email = email.into();
        self
    }

    async fn lookup(&self, pmid: &str) -> anyhow::Result<Option<String>> {
        let resp = self.client
            .get(&self.url)?
            .query(&[
                ("tool", self.tool.as_str()),
                ("email", self.email.as_str()),
                ("ids", pmid),
                ("format", "json"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            debug!(status = %resp.status(), "ID converter returned non-success status");
            return Ok(None);
        }

        let body: serde_json::Value = resp.json().await?;
        Ok(first_pmcid(&body))
    }
}

#[async_trait]
impl IdResolver for IdConverterClient {
    #[instrument(skip(self))]
    async fn resolve(&self, pmid: &str) -> Option<String> {
        match self.lookup(pmid).await {
            Ok(pmcid) => pmcid,
            Err(e) => {
                warn!("ID converter request failed: {e}");
                None
            }
        }
    }
}

/// `records[0].pmcid`, when present.
fn first_pmcid(body: &serde_json::Value) -> Option<String> {
    body["records"]
        .as_array()?
        .first()?
        .get("pmcid")?
        .as_str()
        .map(String::from)
}
