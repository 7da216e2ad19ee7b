use pubcurate_schema::{compile, generate_schema_file, PropertyType, TARGET_ATTRIBUTES};

const DATA_MODEL: &str = "\
Attribute,Validation Rules,Description,Valid Values,Required,Parent
Pubmed Id,,PubMed identifier,,TRUE,Publication
Publication Assay,list like,Assays used,\"RNA-seq, whole genome sequencing\",TRUE,Publication
Publication Title,,Title,,TRUE,Publication
Publication Tumor Type,list like,Tumor types,\"Plexiform Neurofibroma,MPNST\",FALSE,Publication
Publication Tissue,,Tissue examined,,False,Publication
Publication Dataset Alias,list like,Dataset identifiers,,True,Publication
";

#[test]
fn test_only_allow_listed_properties_in_row_order() {
    let schema = compile(DATA_MODEL.as_bytes()).unwrap();
    let keys: Vec<_> = schema.properties.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(
        keys,
        ["PublicationAssay", "PublicationTumorType", "PublicationTissue", "PublicationDatasetAlias"]
    );
    assert_eq!(keys.len(), TARGET_ATTRIBUTES.len());
    assert_eq!(schema.required, ["PublicationAssay", "PublicationDatasetAlias"]);
}

#[test]
fn test_array_iff_list_like() {
    let schema = compile(DATA_MODEL.as_bytes()).unwrap();
    for (key, prop) in &schema.properties {
        let is_array = prop.kind == PropertyType::Array;
        assert_eq!(is_array, key != "PublicationTissue", "{key}");
        assert_eq!(prop.items.is_some(), is_array);
    }

    let assay = schema.property("PublicationAssay").unwrap();
    assert_eq!(assay.title, "Publication Assay");
    assert_eq!(assay.values, None);
    assert_eq!(
        assay.items.as_ref().unwrap().values.as_deref(),
        Some(&["RNA-seq".to_string(), "whole genome sequencing".to_string()][..])
    );

    let alias = schema.property("PublicationDatasetAlias").unwrap();
    assert_eq!(alias.items.as_ref().unwrap().values, None);
}

#[test]
fn test_missing_column_is_fatal() {
    let csv = "Attribute,Description,Valid Values,Required\nPublication Assay,x,,TRUE\n";
    assert!(compile(csv.as_bytes()).is_err());
}

#[test]
fn test_generate_schema_file_writes_pretty_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("data_model.csv");
    let output = dir.path().join("pub_subschema.json");
    std::fs::write(&input, DATA_MODEL).unwrap();

    generate_schema_file(&input, &output).unwrap();
    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("{\n  \"$schema\": \"http://json-schema.org/draft-07/schema#\",\n  \"type\": \"object\","));

    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["title"], "Publication Metadata Schema");
    assert_eq!(value["properties"]["PublicationTumorType"]["type"], "array");
    assert_eq!(value["properties"]["PublicationTumorType"]["items"]["enum"][1], "MPNST");
    assert_eq!(value["properties"]["PublicationTissue"]["type"], "string");
    assert!(value["properties"]["PublicationTissue"].get("enum").is_none());
    assert!(value["properties"].get("PubmedId").is_none());
}
