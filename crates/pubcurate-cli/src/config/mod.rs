//! Configuration loading for pubcurate.
//! Reads pubcurate.toml from the path given on the command line; a missing
//! file means all defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use pubcurate_ingestion::record::DEFAULT_MODEL;
use pubcurate_ingestion::sources::bioc::{BIOC_BASE_URL, DEFAULT_XML_DIR};
use pubcurate_ingestion::sources::idconv::{DEFAULT_EMAIL, DEFAULT_TOOL, IDCONV_URL};
use pubcurate_llm::batch::OPENAI_BASE_URL;

pub const DEFAULT_CONFIG_PATH: &str = "pubcurate.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub ncbi: NcbiConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,
    #[serde(default = "default_schema")]
    pub schema: PathBuf,
    #[serde(default = "default_dataset")]
    pub dataset: PathBuf,
    #[serde(default = "default_audit_log")]
    pub audit_log: PathBuf,
    #[serde(default = "default_xml_dir")]
    pub xml_dir: PathBuf,
    #[serde(default = "default_batch_dir")]
    pub batch_dir: PathBuf,
}

fn default_manifest()  -> PathBuf { PathBuf::from("20250106_publicationsmanifestfinal.csv") }
fn default_schema()    -> PathBuf { PathBuf::from("pub_subschema.json") }
fn default_dataset()   -> PathBuf { PathBuf::from("datasets/publication_dataset.jsonl") }
fn default_audit_log() -> PathBuf { PathBuf::from("pmcid_token_log.csv") }
fn default_xml_dir()   -> PathBuf { PathBuf::from(DEFAULT_XML_DIR) }
fn default_batch_dir() -> PathBuf { PathBuf::from(".") }

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            manifest:  default_manifest(),
            schema:    default_schema(),
            dataset:   default_dataset(),
            audit_log: default_audit_log(),
            xml_dir:   default_xml_dir(),
            batch_dir: default_batch_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NcbiConfig {
    #[serde(default = "default_tool")]
    pub tool: String,
    #[serde(default = "default_email")]
    pub email: String,
    #[serde(default = "default_idconv_url")]
    pub idconv_url: String,
    #[serde(default = "default_bioc_url")]
    pub bioc_url: String,
}

fn default_tool()       -> String { DEFAULT_TOOL.to_string() }
fn default_email()      -> String { DEFAULT_EMAIL.to_string() }
fn default_idconv_url() -> String { IDCONV_URL.to_string() }
fn default_bioc_url()   -> String { BIOC_BASE_URL.to_string() }

impl Default for NcbiConfig {
    fn default() -> Self {
        Self {
            tool:       default_tool(),
            email:      default_email(),
            idconv_url: default_idconv_url(),
            bioc_url:   default_bioc_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_openai_base_url() -> String { OPENAI_BASE_URL.to_string() }
fn default_model()           -> String { DEFAULT_MODEL.to_string() }

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self { base_url: default_openai_base_url(), model: default_model() }
    }
}


impl Config {
    /// Load configuration from `path`, or defaults when the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
        Ok(config)
    }
}
