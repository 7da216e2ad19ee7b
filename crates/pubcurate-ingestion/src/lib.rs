//! pubcurate-ingestion: Publication dataset construction.
//! - PMID → PMCID resolution (NCBI ID Converter)
//! - BioC full-text retrieval and passage flattening
//! - Token gating and batch task record construction
//! - JSONL dataset + CSV audit log output

pub mod sources;
pub mod manifest;
pub mod models;
pub mod pipeline;
pub mod pyjson;
pub mod record;
pub mod tokens;
pub mod writer;
