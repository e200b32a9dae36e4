//! Normalization options.

use crate::formats::FormatRegistry;

/// Default media type preferred when a body declares several.
pub const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// Transport assumed for event-style servers that declare none.
pub const DEFAULT_EVENT_TRANSPORT: &str = "kafka";

/// Key prefix of parser-internal metadata fields.
pub const PARSER_METADATA_PREFIX: &str = "x-parser-";

/// Options passed explicitly into every normalization call.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Media type picked first from `content` maps (default: "application/json").
    pub preferred_media_type: String,

    /// Server protocol used when an event-style server declares none (default: "kafka").
    pub default_event_transport: String,

    /// Fields whose name starts with this prefix are stripped from
    /// `originalSchema` (default: "x-parser-").
    pub parser_metadata_prefix: String,

    /// Keep the source document on `metadata.originalSpec` (default: true).
    pub include_original_document: bool,

    /// Schema-format handlers available to the event-style normalizer.
    pub formats: FormatRegistry,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            preferred_media_type: DEFAULT_MEDIA_TYPE.to_string(),
            default_event_transport: DEFAULT_EVENT_TRANSPORT.to_string(),
            parser_metadata_prefix: PARSER_METADATA_PREFIX.to_string(),
            include_original_document: true,
            formats: FormatRegistry::default(),
        }
    }
}

impl NormalizeOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the preferred media type.
    pub fn with_preferred_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.preferred_media_type = media_type.into();
        self
    }

    /// Set the fallback transport for event-style servers.
    pub fn with_default_event_transport(mut self, transport: impl Into<String>) -> Self {
        self.default_event_transport = transport.into();
        self
    }

    /// Set the parser-metadata prefix.
    pub fn with_parser_metadata_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.parser_metadata_prefix = prefix.into();
        self
    }

    /// Keep or drop the source document on the contract.
    pub fn with_original_document(mut self, include: bool) -> Self {
        self.include_original_document = include;
        self
    }

    /// Replace the schema-format registry.
    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = NormalizeOptions::default();
        assert_eq!(options.preferred_media_type, "application/json");
        assert_eq!(options.default_event_transport, "kafka");
        assert_eq!(options.parser_metadata_prefix, "x-parser-");
        assert!(options.include_original_document);
        assert!(options.formats.lookup("application/vnd.apache.avro;version=1.9.0").is_some());
    }

    #[test]
    fn builder() {
        let options = NormalizeOptions::new()
            .with_preferred_media_type("application/xml")
            .with_default_event_transport("mqtt")
            .with_parser_metadata_prefix("x-internal-")
            .with_original_document(false)
            .with_formats(FormatRegistry::empty());

        assert_eq!(options.preferred_media_type, "application/xml");
        assert_eq!(options.default_event_transport, "mqtt");
        assert_eq!(options.parser_metadata_prefix, "x-internal-");
        assert!(!options.include_original_document);
        assert!(options.formats.lookup("avro").is_none());
    }
}
