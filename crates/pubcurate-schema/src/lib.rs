//! pubcurate-schema: JSON Schema generation from the publication data model CSV.
//!
//! The CSV follows the data-model layout
//! `Attribute, Validation Rules, Description, Valid Values, Required`; only the
//! attributes the curation task extracts are kept.

use std::io::Read;
use std::path::Path;

use pubcurate_common::{CurateError, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info};

pub const SCHEMA_DRAFT: &str = "http://json-schema.org/draft-07/schema#";
pub const SCHEMA_TITLE: &str = "Publication Metadata Schema";
pub const SCHEMA_DESCRIPTION: &str = "Schema for publication metadata with selected fields";

/// Validation rule marking a multi-valued attribute.
pub const LIST_RULE: &str = "list like";

pub const TARGET_ATTRIBUTES: [&str; 4] = [
    "Publication Assay",
    "Publication Tumor Type",
    "Publication Tissue",
    "Publication Dataset Alias",
];

const REQUIRED_COLUMNS: [&str; 5] = ["Attribute", "Validation Rules", "Description", "Valid Values", "Required"];

#[derive(Debug, Deserialize)]
struct SpecRow {
    #[serde(rename = "Attribute")]
    attribute: String,
    #[serde(rename = "Validation Rules")]
    validation_rules: Option<String>,
    #[serde(rename = "Description")]
    description: Option<String>,
    #[serde(rename = "Valid Values")]
    valid_values: Option<String>,
    #[serde(rename = "Required")]
    required: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Array,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSchema {
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaProperty {
    #[serde(rename = "type")]
    pub kind: PropertyType,
    pub title: String,
    pub description: String,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonSchema {
    #[serde(rename = "$schema")]
    pub draft: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    /// Kept in CSV row order.
    #[serde(serialize_with = "ordered_properties")]
    pub properties: Vec<(String, SchemaProperty)>,
    pub required: Vec<String>,
}

fn ordered_properties<S: Serializer>(
    props: &[(String, SchemaProperty)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(props.len()))?;
    for (key, prop) in props {
        map.serialize_entry(key, prop)?;
    }
    map.end()
}

impl JsonSchema {
    fn empty() -> Self {
        Self {
            draft: SCHEMA_DRAFT.to_string(),
            kind: "object".to_string(),
            title: SCHEMA_TITLE.to_string(),
            description: SCHEMA_DESCRIPTION.to_string(),
            properties: Vec::new(),
            required: Vec::new(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&SchemaProperty> {
        self.properties.iter().find(|(k, _)| k == key).map(|(_, p)| p)
    }
}

/// Property key for an attribute: the attribute name with spaces removed.
pub fn property_key(attribute: &str) -> String {
    attribute.replace(' ', "")
}

fn split_valid_values(cell: Option<&str>) -> Option<Vec<String>> {
    let cell = cell.filter(|c| !c.is_empty())?;
    Some(cell.split(',').map(|v| v.trim().to_string()).collect())
}

fn is_true(cell: Option<&str>) -> bool {
    cell.map(|c| c.trim().eq_ignore_ascii_case("true")).unwrap_or(false)
}

fn to_property(row: &SpecRow) -> SchemaProperty {
    let values = split_valid_values(row.valid_values.as_deref());
    let description = row.description.clone().unwrap_or_default();

    if row.validation_rules.as_deref() == Some(LIST_RULE) {
        SchemaProperty {
            kind: PropertyType::Array,
            title: row.attribute.clone(),
            description,
            values: None,
            items: Some(ItemSchema { kind: PropertyType::String, values }),
        }
    } else {
        SchemaProperty {
            kind: PropertyType::String,
            title: row.attribute.clone(),
            description,
            values,
            items: None,
        }
    }
}

/// Build the schema from a data-model CSV.
pub fn compile<R: Read>(reader: R) -> Result<JsonSchema> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(CurateError::Config(format!("schema CSV is missing column `{column}`")));
        }
    }

    let mut schema = JsonSchema::empty();
    for record in rdr.deserialize::<SpecRow>() {
        let row = record?;
        if !TARGET_ATTRIBUTES.contains(&row.attribute.as_str()) {
            continue;
        }
        let key = property_key(&row.attribute);
        debug!(attribute = %row.attribute, key = %key, "Schema property");
        if is_true(row.required.as_deref()) {
            schema.required.push(key.clone());
        }
        schema.properties.push((key, to_property(&row)));
    }
    Ok(schema)
}

/// Compile `csv_path` and write the schema to `output_path` as indented JSON.
pub fn generate_schema_file(csv_path: &Path, output_path: &Path) -> Result<JsonSchema> {
    let schema = compile(std::fs::File::open(csv_path)?)?;
    if let Some(dir) = output_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let pretty = serde_json::to_string_pretty(&schema)?;
    std::fs::write(output_path, pretty)?;
    info!(
        output = %output_path.display(),
        properties = schema.properties.len(),
        required = schema.required.len(),
        "JSON schema generated"
    );
    Ok(schema)
}
