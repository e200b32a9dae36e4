//! Loader configuration.

use std::path::Path;

use unicontract_normalizer::NormalizeOptions;

/// Options for file and directory loading.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Accepted file extensions, compared case-insensitively (default: yaml, yml, json).
    pub extensions: Vec<String>,

    /// Subdirectories of a base directory holding documents (default: openapi, asyncapi).
    pub protocol_dirs: Vec<String>,

    /// Options passed to every normalization.
    pub normalize: NormalizeOptions,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["yaml".into(), "yml".into(), "json".into()],
            protocol_dirs: vec!["openapi".into(), "asyncapi".into()],
            normalize: NormalizeOptions::default(),
        }
    }
}

impl LoaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_protocol_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocol_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.normalize = options;
        self
    }

    /// Whether `path` has an accepted extension.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_extensions() {
        let options = LoaderOptions::default();
        assert!(options.accepts(Path::new("api.yaml")));
        assert!(options.accepts(Path::new("api.YML")));
        assert!(options.accepts(Path::new("dir/api.json")));
        assert!(!options.accepts(Path::new("README.md")));
        assert!(!options.accepts(Path::new("Makefile")));
    }

    #[test]
    fn builder() {
        let options = LoaderOptions::new()
            .with_extensions(["yaml"])
            .with_protocol_dirs(["rest"])
            .with_normalize_options(NormalizeOptions::default().with_original_document(false));
        assert!(!options.accepts(Path::new("api.json")));
        assert_eq!(options.protocol_dirs, vec!["rest"]);
        assert!(!options.normalize.include_original_document);
    }
}
