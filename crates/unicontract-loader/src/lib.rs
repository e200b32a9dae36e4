//! File and directory loading for unicontract.
//!
//! Reads YAML/JSON documents, inlines local references and normalizes them.
//! Batch loads collect failures next to the successfully loaded contracts
//! instead of stopping at the first bad document.

pub mod error;
pub mod options;

pub use error::LoadError;
pub use options::LoaderOptions;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use unicontract_model::UnifiedContract;
use unicontract_normalizer::{dereference, detect_spec_type_from_path, normalize_with_hint, Node};
use unicontract_telemetry::{log_contract_loaded, log_document_load_failed};

/// Outcome of loading several documents.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Contracts that loaded, in file-name order.
    pub contracts: Vec<UnifiedContract>,
    /// Documents that failed, each with its path.
    pub failures: Vec<LoadError>,
}

impl LoadReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: LoadReport) {
        self.contracts.extend(other.contracts);
        self.failures.extend(other.failures);
    }

    fn record(&mut self, result: Result<UnifiedContract, LoadError>) {
        match result {
            Ok(contract) => self.contracts.push(contract),
            Err(err) => {
                log_document_load_failed!(path = %err.path().display(), error = %err, "document skipped");
                self.failures.push(err);
            }
        }
    }
}

/// Parse and normalize document content.
///
/// `source` names the document in errors and serves as the protocol hint
/// when the content has no protocol marker.
pub fn parse_spec_str(
    content: &str,
    source: &Path,
    options: &LoaderOptions,
) -> Result<UnifiedContract, LoadError> {
    // YAML is a superset of JSON.
    let value: Value = serde_yaml::from_str(content).map_err(|e| LoadError::Parse {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;

    let hint = detect_spec_type_from_path(&source.to_string_lossy());
    let doc = Node::Plain(dereference(&value));
    normalize_with_hint(&doc, hint, &options.normalize).map_err(|e| LoadError::Normalize {
        path: source.to_path_buf(),
        source: e,
    })
}

/// Load one document from disk.
pub fn load_spec(path: &Path, options: &LoaderOptions) -> Result<UnifiedContract, LoadError> {
    let content = fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let contract = parse_spec_str(&content, path, options)?;
    log_contract_loaded!(
        path = %path.display(),
        contract = %contract.id,
        protocol = %contract.protocol,
        operations = contract.operations.len(),
        "contract loaded"
    );
    Ok(contract)
}

/// Document files directly inside `dir`, sorted by name.
fn document_files(dir: &Path, options: &LoaderOptions) -> Result<Vec<PathBuf>, LoadError> {
    let io_error = |e| LoadError::Io {
        path: dir.to_path_buf(),
        source: e,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && options.accepts(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every document directly inside `dir`.
///
/// An unreadable directory is an error; a failing document is recorded in
/// the report and its siblings still load.
pub fn load_specs_from_directory(
    dir: &Path,
    options: &LoaderOptions,
) -> Result<LoadReport, LoadError> {
    let mut report = LoadReport::default();
    for path in document_files(dir, options)? {
        report.record(load_spec(&path, options));
    }
    Ok(report)
}

/// Load every document under the protocol subdirectories of `base`
/// (`openapi/`, `asyncapi/` by default). Missing subdirectories are skipped.
pub fn load_all_specs(base: &Path, options: &LoaderOptions) -> LoadReport {
    let mut report = LoadReport::default();
    for dir in protocol_dirs(base, options) {
        match load_specs_from_directory(&dir, options) {
            Ok(loaded) => report.merge(loaded),
            Err(err) => {
                log_document_load_failed!(path = %dir.display(), error = %err, "directory skipped");
                report.failures.push(err);
            }
        }
    }
    tracing::info!(
        base = %base.display(),
        contracts = report.contracts.len(),
        failures = report.failures.len(),
        "specs loaded"
    );
    report
}

/// Paths of every document under the protocol subdirectories of `base`.
pub fn spec_file_paths(base: &Path, options: &LoaderOptions) -> Vec<PathBuf> {
    protocol_dirs(base, options)
        .iter()
        .filter_map(|dir| document_files(dir, options).ok())
        .flatten()
        .collect()
}

fn protocol_dirs(base: &Path, options: &LoaderOptions) -> Vec<PathBuf> {
    options
        .protocol_dirs
        .iter()
        .map(|name| base.join(name))
        .filter(|dir| {
            let exists = dir.is_dir();
            if !exists {
                tracing::debug!(dir = %dir.display(), "protocol directory not found");
            }
            exists
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use unicontract_model::Protocol;
    use unicontract_normalizer::NormalizeError;

    #[test]
    fn parses_json_and_yaml() {
        let options = LoaderOptions::default();
        let json = r#"{"openapi": "3.0.0", "info": {"title": "Json API", "version": "1"}, "paths": {}}"#;
        let contract = parse_spec_str(json, Path::new("api.json"), &options).unwrap();
        assert_eq!(contract.id, "openapi-json-api");

        let yaml = "asyncapi: 3.0.0\ninfo:\n  title: Yaml Events\n  version: '1'\n";
        let contract = parse_spec_str(yaml, Path::new("events.yaml"), &options).unwrap();
        assert_eq!(contract.protocol, Protocol::AsyncApi);
    }

    #[test]
    fn parse_errors_carry_the_path() {
        let err = parse_spec_str("key: [unclosed", Path::new("bad.yaml"), &LoaderOptions::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert_eq!(err.path(), Path::new("bad.yaml"));
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn path_hint_applies_without_marker() {
        let content = "info:\n  title: No Marker\n  version: '1'\n";
        let options = LoaderOptions::default();

        let err = parse_spec_str(content, Path::new("specs/asyncapi/x.yaml"), &options).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Normalize {
                source: NormalizeError::MissingVersionField {
                    protocol: Protocol::AsyncApi
                },
                ..
            }
        ));

        let err = parse_spec_str(content, Path::new("specs/x.yaml"), &options).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Normalize {
                source: NormalizeError::UnrecognizedSpecFormat,
                ..
            }
        ));
    }
}
