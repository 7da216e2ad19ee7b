//! Publications manifest loading.

use std::io::Read;
use std::path::Path;

use pubcurate_common::Result;
use tracing::{debug, info};

use crate::models::MetadataRow;

/// Read every manifest row. A missing required column is fatal.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<MetadataRow>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut rows = Vec::new();
    for record in rdr.deserialize::<MetadataRow>() {
        let mut row = record?;
        row.pmid = row.pmid.trim().to_string();
        rows.push(row);
    }
    Ok(rows)
}

/// Load the manifest at `path`, keeping only Open Access rows in file order.
pub fn load_open_access(path: &Path) -> Result<Vec<MetadataRow>> {
    let file = std::fs::File::open(path)?;
    let rows = read_rows(file)?;
    let total = rows.len();
    let open: Vec<_> = rows.into_iter().filter(MetadataRow::is_open_access).collect();
    info!(path = %path.display(), total, open_access = open.len(), "Manifest loaded");
    debug!(skipped = total - open.len(), "Non open-access rows dropped");
    Ok(open)
}
