//! Data models for the dataset pipeline.

use serde::{Deserialize, Serialize};

/// Value written to the PMCID column when resolution fails.
pub const MISSING_PMCID: &str = "None";

/// One row of the publications manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetadataRow {
    #[serde(rename = "Pubmed Id")]
    pub pmid: String,
    #[serde(rename = "Publication Title")]
    pub title: String,
    #[serde(rename = "Publication Journal")]
    pub journal: String,
    #[serde(rename = "Publication Year")]
    pub year: String,
    #[serde(rename = "Publication Authors")]
    pub authors: String,
    #[serde(rename = "Publication Abstract")]
    pub abstract_text: String,
    #[serde(rename = "Publication Accessibility")]
    pub accessibility: String,
}

impl MetadataRow {
    pub fn is_open_access(&self) -> bool {
        self.accessibility == "Open Access"
    }
}

/// A BioC payload as returned by the content service.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub raw: Vec<u8>,
    /// Non-empty passage texts joined by single spaces.
    pub text: String,
}

/// Outcome recorded in the `Included` column of the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InclusionStatus {
    Yes,
    No,
    #[serde(rename = "Error-NoPMCID")]
    NoPmcid,
    #[serde(rename = "Error-NoText-or-XMLParseError")]
    NoText,
}

impl InclusionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InclusionStatus::Yes     => "Yes",
            InclusionStatus::No      => "No",
            InclusionStatus::NoPmcid => "Error-NoPMCID",
            InclusionStatus::NoText  => "Error-NoText-or-XMLParseError",
        }
    }
}

impl std::fmt::Display for InclusionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRow {
    #[serde(rename = "PMID")]
    pub pmid: String,
    #[serde(rename = "PMCID")]
    pub pmcid: String,
    #[serde(rename = "TokenCount")]
    pub token_count: usize,
    #[serde(rename = "Included")]
    pub status: InclusionStatus,
}

impl AuditRow {
    pub fn no_pmcid(pmid: &str) -> Self {
        Self {
            pmid: pmid.to_string(),
            pmcid: MISSING_PMCID.to_string(),
            token_count: 0,
            status: InclusionStatus::NoPmcid,
        }
    }

    pub fn no_text(pmid: &str, pmcid: &str) -> Self {
        Self {
            pmid: pmid.to_string(),
            pmcid: pmcid.to_string(),
            token_count: 0,
            status: InclusionStatus::NoText,
        }
    }

    pub fn counted(pmid: &str, pmcid: &str, token_count: usize, included: bool) -> Self {
        Self {
            pmid: pmid.to_string(),
            pmcid: pmcid.to_string(),
            token_count,
            status: if included { InclusionStatus::Yes } else { InclusionStatus::No },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String, // "system" | "user"
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskBody {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// One request line of a batch input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub custom_id: String,
    pub method: String,
    pub url: String,
    pub body: TaskBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_are_closed_set() {
        let all = [
            InclusionStatus::Yes,
            InclusionStatus::No,
            InclusionStatus::NoPmcid,
            InclusionStatus::NoText,
        ];
        let names: Vec<_> = all.iter().map(|s| s.to_string()).collect();
        assert_eq!(names, ["Yes", "No", "Error-NoPMCID", "Error-NoText-or-XMLParseError"]);
    }

    #[test]
    fn test_no_pmcid_row() {
        let row = AuditRow::no_pmcid("99999");
        assert_eq!(row.pmcid, "None");
        assert_eq!(row.token_count, 0);
        assert_eq!(row.status, InclusionStatus::NoPmcid);
    }

    #[test]
    fn test_open_access_is_exact_match() {
        let mut row = MetadataRow { accessibility: "Open Access".into(), ..Default::default() };
        assert!(row.is_open_access());
        row.accessibility = "open access".into();
        assert!(!row.is_open_access());
        row.accessibility = "Restricted Access".into();
        assert!(!row.is_open_access());
    }
}
