//! Unified API contract model.
//!
//! Protocol-agnostic value types describing any API contract (OpenAPI or
//! AsyncAPI) through shared concepts: contracts own operations, operations
//! carry input/output schemas and parameters. Every type serializes to plain
//! JSON with camelCase field names.

pub mod contract;
pub mod error;
pub mod operation;
pub mod query;
pub mod schema;

pub use contract::{
    CommunicationPattern, ContractMetadata, ContractTag, Protocol, SecurityScheme, ServerInfo,
    UnifiedContract,
};
pub use error::ModelError;
pub use operation::{
    ActionType, AsyncAction, AsyncMetadata, OperationMetadata, ParameterLocation, RestMetadata,
    UnifiedOperation, UnifiedParameter,
};
pub use schema::{
    PropertyMap, SchemaFormat, SchemaMetadata, SchemaProperty, SchemaShape, UnifiedDataSchema,
    Validation,
};
