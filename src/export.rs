// 📤 Exporter - classified table as one JSON document
// Array of records, field names verbatim: GEOID, AREAMSQ, POPULATION, MEDYRBUILT, POPPERKMSQ, CAT

use std::fs;
use std::path::Path;
use tracing::info;

use crate::classify::ClassifiedZip;
use crate::error::ExportError;

/// Global the map page reads when the document is loaded as a script
pub const DEFAULT_JS_VARIABLE: &str = "vizObj";

/// Serialize the whole table, in table order
pub fn to_json(records: &[ClassifiedZip]) -> Result<String, ExportError> {
    Ok(serde_json::to_string(records)?)
}

/// Parse a document produced by `to_json`
pub fn parse_json(document: &str) -> Result<Vec<ClassifiedZip>, ExportError> {
    Ok(serde_json::from_str(document)?)
}

/// `window.<variable>=<document>;` for pages that load the data with a `<script>` tag
pub fn to_js_assignment(records: &[ClassifiedZip], variable: &str) -> Result<String, ExportError> {
    Ok(format!("window.{}={};", variable, to_json(records)?))
}

fn write(path: &Path, contents: &str) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| ExportError::Io {
            path: parent.display().to_string(),
            error,
        })?;
    }

    fs::write(path, contents).map_err(|error| ExportError::Io {
        path: path.display().to_string(),
        error,
    })
}

/// Write the JSON document to `path`, returning the bytes written
pub fn write_json<P: AsRef<Path>>(path: P, records: &[ClassifiedZip]) -> Result<usize, ExportError> {
    let document = to_json(records)?;
    write(path.as_ref(), &document)?;
    info!(path = %path.as_ref().display(), records = records.len(), "wrote JSON document");
    Ok(document.len())
}

/// Write the JS assignment form to `path`
pub fn write_js<P: AsRef<Path>>(
    path: P,
    records: &[ClassifiedZip],
    variable: &str,
) -> Result<usize, ExportError> {
    let script = to_js_assignment(records, variable)?;
    write(path.as_ref(), &script)?;
    info!(path = %path.as_ref().display(), variable, "wrote JS assignment");
    Ok(script.len())
}
