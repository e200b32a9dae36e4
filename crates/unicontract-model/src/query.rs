//! Read-only queries over operations and contracts, used by navigation and
//! search.

use serde_json::json;
use std::collections::{BTreeMap, HashSet};

use crate::contract::{
    CommunicationPattern, ContractMetadata, ContractTag, Protocol, ServerInfo, UnifiedContract,
};
use crate::error::ModelError;
use crate::operation::{ActionType, UnifiedOperation};

/// Group name for operations without tags.
pub const UNTAGGED_GROUP: &str = "Other";

/// Case-insensitive search over name, description, location, tags and action.
///
/// A blank term matches everything.
pub fn search_operations<'a>(
    operations: &'a [UnifiedOperation],
    term: &str,
) -> Vec<&'a UnifiedOperation> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return operations.iter().collect();
    }

    operations
        .iter()
        .filter(|op| {
            op.name.to_lowercase().contains(&term)
                || op
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&term))
                || op.location.to_lowercase().contains(&term)
                || op.tags.iter().any(|t| t.to_lowercase().contains(&term))
                || op.action_type.as_str().to_lowercase().contains(&term)
        })
        .collect()
}

/// Group operations by tag. An operation appears under every tag it carries;
/// untagged ones go to [`UNTAGGED_GROUP`].
pub fn group_by_tag(operations: &[UnifiedOperation]) -> BTreeMap<String, Vec<&UnifiedOperation>> {
    let mut grouped: BTreeMap<String, Vec<&UnifiedOperation>> = BTreeMap::new();
    for op in operations {
        if op.tags.is_empty() {
            grouped.entry(UNTAGGED_GROUP.to_string()).or_default().push(op);
            continue;
        }
        for tag in &op.tags {
            grouped.entry(tag.clone()).or_default().push(op);
        }
    }
    grouped
}

pub fn group_by_pattern(
    operations: &[UnifiedOperation],
) -> BTreeMap<&'static str, Vec<&UnifiedOperation>> {
    let mut grouped: BTreeMap<&'static str, Vec<&UnifiedOperation>> = BTreeMap::new();
    grouped.insert(CommunicationPattern::RequestResponse.as_str(), Vec::new());
    grouped.insert(CommunicationPattern::PublishSubscribe.as_str(), Vec::new());
    for op in operations {
        grouped
            .entry(op.communication_pattern.as_str())
            .or_default()
            .push(op);
    }
    grouped
}

pub fn group_by_protocol(
    operations: &[UnifiedOperation],
) -> BTreeMap<Protocol, Vec<&UnifiedOperation>> {
    let mut grouped: BTreeMap<Protocol, Vec<&UnifiedOperation>> = BTreeMap::new();
    for op in operations {
        grouped.entry(op.metadata.protocol).or_default().push(op);
    }
    grouped
}

pub fn filter_by_action_type<'a>(
    operations: &'a [UnifiedOperation],
    action_types: &[ActionType],
) -> Vec<&'a UnifiedOperation> {
    operations
        .iter()
        .filter(|op| action_types.contains(&op.action_type))
        .collect()
}

pub fn filter_by_pattern(
    operations: &[UnifiedOperation],
    pattern: CommunicationPattern,
) -> Vec<&UnifiedOperation> {
    operations
        .iter()
        .filter(|op| op.communication_pattern == pattern)
        .collect()
}

pub fn filter_by_tag<'a>(operations: &'a [UnifiedOperation], tag: &str) -> Vec<&'a UnifiedOperation> {
    operations
        .iter()
        .filter(|op| op.tags.iter().any(|t| t == tag))
        .collect()
}

pub fn sort_by_name(operations: &[UnifiedOperation]) -> Vec<&UnifiedOperation> {
    let mut sorted: Vec<_> = operations.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted
}

pub fn sort_by_location(operations: &[UnifiedOperation]) -> Vec<&UnifiedOperation> {
    let mut sorted: Vec<_> = operations.iter().collect();
    sorted.sort_by(|a, b| a.location.cmp(&b.location));
    sorted
}

/// Distinct tag names, sorted.
pub fn unique_tags(operations: &[UnifiedOperation]) -> Vec<String> {
    let mut tags: Vec<String> = operations
        .iter()
        .flat_map(|op| op.tags.iter().cloned())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    tags.sort();
    tags
}

/// Distinct action types in first-seen order.
pub fn unique_action_types(operations: &[UnifiedOperation]) -> Vec<ActionType> {
    let mut seen = Vec::new();
    for op in operations {
        if !seen.contains(&op.action_type) {
            seen.push(op.action_type);
        }
    }
    seen
}

pub fn count_by_action_type(operations: &[UnifiedOperation]) -> BTreeMap<ActionType, usize> {
    let mut counts = BTreeMap::new();
    for op in operations {
        *counts.entry(op.action_type).or_insert(0) += 1;
    }
    counts
}

pub fn count_by_tag(operations: &[UnifiedOperation]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for op in operations {
        for tag in &op.tags {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }
    counts
}

pub fn find_operation_by_id<'a>(
    operations: &'a [UnifiedOperation],
    id: &str,
) -> Option<&'a UnifiedOperation> {
    operations.iter().find(|op| op.id == id)
}

/// URL-safe slug built from the operation id and name.
pub fn operation_slug(operation: &UnifiedOperation) -> String {
    let raw = format!("{}-{}", operation.id, operation.name).to_lowercase();
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Merge several contracts into one browsable contract.
///
/// Operations are concatenated, tags deduplicated by name and servers by url
/// (first occurrence wins). Protocol, version and security schemes come from
/// the first contract.
pub fn merge_contracts(contracts: &[UnifiedContract]) -> Result<UnifiedContract, ModelError> {
    let first = contracts.first().ok_or(ModelError::EmptyMerge)?;
    if contracts.len() == 1 {
        return Ok(first.clone());
    }

    let operations = contracts
        .iter()
        .flat_map(|c| c.operations.iter().cloned())
        .collect();

    let mut tags: Vec<ContractTag> = Vec::new();
    for tag in contracts.iter().flat_map(|c| c.tags.iter()) {
        if !tags.iter().any(|t| t.name == tag.name) {
            tags.push(tag.clone());
        }
    }

    let mut servers: Vec<ServerInfo> = Vec::new();
    for server in contracts.iter().flat_map(|c| c.servers.iter()) {
        if !servers.iter().any(|s| s.url == server.url) {
            servers.push(server.clone());
        }
    }

    let originals: Vec<_> = contracts
        .iter()
        .map(|c| c.metadata.original_spec.clone().unwrap_or_default())
        .collect();

    Ok(UnifiedContract {
        id: "merged-contract".to_string(),
        name: contracts
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(" + "),
        description: Some(format!(
            "Merged documentation from {} contracts",
            contracts.len()
        )),
        version: first.version.clone(),
        protocol: first.protocol,
        operations,
        tags,
        servers,
        security_schemes: first.security_schemes.clone(),
        metadata: ContractMetadata {
            source_protocol: first.protocol,
            original_spec: Some(json!({ "merged": originals })),
        },
    })
}
