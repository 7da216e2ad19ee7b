//! Batch task record construction.
//!
//! Records are pure values; writing them is the job of [`crate::writer`].

use crate::models::{ChatMessage, MetadataRow, TaskBody, TaskRecord};
use crate::pyjson;

/// Documents at or above this many tokens are left out of the dataset.
pub const TOKEN_LIMIT: usize = 200_000;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const TASK_METHOD: &str = "POST";
pub const TASK_URL: &str = "/v1/chat/completions";

pub const SYSTEM_PROMPT: &str = "You are an expert curation assistant who reviews biomedical publications to extract and classify key metadata attributes.\x20

Your task is to:
1. Carefully read the publication content
2. Identify all relevant metadata elements defined in the schema
3. Select ONLY values from the provided controlled vocabularies in the schema
4. Format your response as valid JSON matching the required schema
5. For fields that allow multiple values, use comma-separated format if multiple values apply
6. If you're uncertain about a value, select the most appropriate option based on available evidence

Respond only with the completed JSON metadata, properly formatted according to the schema.";

/// Result of the size gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Included,
    Excluded,
}

pub struct RecordBuilder {
    schema_json: String,
    model: String,
}

impl RecordBuilder {
    /// Serializes `schema` once; every record embeds the same string.
    pub fn new(schema: &serde_json::Value, model: impl Into<String>) -> serde_json::Result<Self> {
        Ok(Self {
            schema_json: pyjson::to_string(schema)?,
            model: model.into(),
        })
    }

    pub fn schema_json(&self) -> &str {
        &self.schema_json
    }

    pub fn decide(&self, token_count: usize) -> Gate {
        if token_count < TOKEN_LIMIT { Gate::Included } else { Gate::Excluded }
    }

    pub fn build(&self, row: &MetadataRow, pmcid: &str, text: &str) -> TaskRecord {
        TaskRecord {
            custom_id: format!("pub-{}", row.pmid),
            method: TASK_METHOD.to_string(),
            url: TASK_URL.to_string(),
            body: TaskBody {
                model: self.model.clone(),
                messages: vec![
                    ChatMessage { role: "system".to_string(), content: SYSTEM_PROMPT.to_string() },
                    ChatMessage { role: "user".to_string(), content: self.user_content(row, pmcid, text) },
                ],
            },
        }
    }

    fn user_content(&self, row: &MetadataRow, pmcid: &str, text: &str) -> String {
        format!(
            "# Publication Metadata Extraction Task

## Instructions
Please review the publication content and extract the following metadata according to the provided schema:
1. Publication Assay - Select all applicable assays used in the research
2. Publication Tumor Type - Select all applicable tumor types studied
3. Publication Tissue - Select all applicable tissue types examined
4. Publication Dataset Alias - Extract any mentioned dataset identifiers (e.g., GSE12345, DOI)

## Schema
{schema}

## Publication Information
- Title: {title}
- Journal: {journal}
- Year: {year}
- Authors: {authors}
- PMID: {pmid}
- PMCID: {pmcid}

## Abstract
{abstract_text}

## Full Publication Content
{text}
",
            schema = self.schema_json,
            title = row.title,
            journal = row.journal,
            year = row.year,
            authors = row.authors,
            pmid = row.pmid,
            abstract_text = row.abstract_text,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> MetadataRow {
        MetadataRow {
            pmid: "12345".into(),
            title: "Cutaneous neurofibromas".into(),
            journal: "Nat Genet".into(),
            year: "2021".into(),
            authors: "Doe J, Roe R".into(),
            abstract_text: "We profile cNF.".into(),
            accessibility: "Open Access".into(),
        }
    }

    fn builder() -> RecordBuilder {
        RecordBuilder::new(&json!({"type": "object", "properties": {}}), DEFAULT_MODEL).unwrap()
    }

    #[test]
    fn test_gate_threshold() {
        let b = builder();
        assert_eq!(b.decide(0), Gate::Included);
        assert_eq!(b.decide(TOKEN_LIMIT - 1), Gate::Included);
        assert_eq!(b.decide(TOKEN_LIMIT), Gate::Excluded);
        assert_eq!(b.decide(TOKEN_LIMIT + 1), Gate::Excluded);
    }

    #[test]
    fn test_envelope() {
        let rec = builder().build(&row(), "PMC000001", "Full text.");
        assert_eq!(rec.custom_id, "pub-12345");
        assert_eq!(rec.method, "POST");
        assert_eq!(rec.url, "/v1/chat/completions");
        assert_eq!(rec.body.model, "gpt-4o-mini");
        assert_eq!(rec.body.messages.len(), 2);
        assert_eq!(rec.body.messages[0].role, "system");
        assert_eq!(rec.body.messages[0].content, SYSTEM_PROMPT);
        assert_eq!(rec.body.messages[1].role, "user");
    }

    #[test]
    fn test_user_content_order() {
        let rec = builder().build(&row(), "PMC000001", "Body of the article.");
        let user = &rec.body.messages[1].content;
        let pos = |needle: &str| user.find(needle).unwrap_or_else(|| panic!("missing {needle}"));

        assert!(pos("## Instructions") < pos("## Schema"));
        assert!(pos(r#"{"type": "object", "properties": {}}"#) > pos("## Schema"));
        assert!(pos("- Title: Cutaneous neurofibromas") > pos("## Publication Information"));
        assert!(pos("- Journal: Nat Genet") < pos("- Year: 2021"));
        assert!(pos("- Authors: Doe J, Roe R") < pos("- PMID: 12345"));
        assert!(pos("- PMCID: PMC000001") < pos("## Abstract"));
        assert!(pos("We profile cNF.") < pos("## Full Publication Content"));
        assert!(user.ends_with("## Full Publication Content\nBody of the article.\n"));
    }

    #[test]
    fn test_text_is_not_truncated() {
        let long = "word ".repeat(50_000);
        let rec = builder().build(&row(), "PMC1", &long);
        assert!(rec.body.messages[1].content.contains(&long));
    }

    #[test]
    fn test_system_prompt_is_constant() {
        let b = builder();
        let mut other = row();
        other.pmid = "1".into();
        let a = b.build(&row(), "PMC1", "a");
        let c = b.build(&other, "PMC2", "b");
        assert_eq!(a.body.messages[0], c.body.messages[0]);
    }
}
