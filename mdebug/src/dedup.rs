//! Cross-translation-unit merging of identically named types.

use crate::ast::{compare_nodes, CompareFailReason, Node, NodeData, TypeNameSource};
use crate::database::{DataTypeHandle, SymbolDatabase, SymbolKind};
use std::collections::HashMap;

/// Merges structurally identical types that share a name.
///
/// Candidates are compared against the surviving types of the same name in
/// creation order. A match folds the candidate into the survivor, pooling
/// their contributing files; a mismatch keeps the candidate as a sibling and
/// marks both types as conflicting, with a human-readable reason.
///
/// Unnamed types are left alone, except anonymous enums, which merge when
/// their constant lists match. Running the pass a second time is a no-op.
pub fn deduplicate_types(database: &mut SymbolDatabase) {
    // Group the types by name, preserving first-appearance order.
    let mut group_order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<DataTypeHandle>> = HashMap::new();
    for data_type in database.data_types.iter() {
        let name = data_type.name().to_string();
        if name.is_empty() {
            let is_anonymous_enum = matches!(
                data_type.node.as_ref().map(|node| &node.data),
                Some(NodeData::InlineEnum(_))
            );
            if !is_anonymous_enum {
                continue;
            }
        }
        let group = groups.entry(name.clone()).or_default();
        if group.is_empty() {
            group_order.push(name);
        }
        group.push(data_type.handle());
    }

    for name in group_order {
        let candidates = groups.remove(&name).unwrap();
        let anonymous = name.is_empty();
        let mut survivors: Vec<DataTypeHandle> = Vec::new();
        for candidate in candidates {
            deduplicate_one(database, &mut survivors, candidate, anonymous);
        }
    }
}

enum Outcome {
    KeepSurvivor(DataTypeHandle),
    ReplaceSurvivor(DataTypeHandle),
    Sibling(Vec<(DataTypeHandle, CompareFailReason)>),
}

fn deduplicate_one(
    database: &mut SymbolDatabase,
    survivors: &mut Vec<DataTypeHandle>,
    candidate: DataTypeHandle,
    anonymous: bool,
) {
    let outcome = {
        let candidate_node = database
            .data_types
            .symbol_from_handle(candidate)
            .and_then(|data_type| data_type.node.as_ref());
        let Some(candidate_node) = candidate_node else {
            survivors.push(candidate);
            return;
        };

        let mut failures = Vec::new();
        let mut outcome = None;
        for &survivor in survivors.iter() {
            let Some(survivor_node) = database
                .data_types
                .symbol_from_handle(survivor)
                .and_then(|data_type| data_type.node.as_ref())
            else {
                continue;
            };
            match compare_nodes(survivor_node, candidate_node, true) {
                None => {
                    outcome = Some(Outcome::KeepSurvivor(survivor));
                    break;
                }
                Some(reason) => {
                    // One side being a typedef of the type the other side
                    // spells out was a common reason deduplication used to
                    // fail, so resolve recorded type numbers and try again.
                    if resolves_to_equal(database, candidate_node, survivor_node) {
                        outcome = Some(Outcome::KeepSurvivor(survivor));
                        break;
                    }
                    if resolves_to_equal(database, survivor_node, candidate_node) {
                        outcome = Some(Outcome::ReplaceSurvivor(survivor));
                        break;
                    }
                    failures.push((survivor, reason));
                }
            }
        }
        outcome.unwrap_or(Outcome::Sibling(failures))
    };

    match outcome {
        Outcome::KeepSurvivor(survivor) => {
            merge_into(database, survivor, candidate);
        }
        Outcome::ReplaceSurvivor(survivor) => {
            // The candidate spells the type out while the survivor only
            // references it by name, so the candidate's node is better.
            let node = database
                .data_types
                .symbol_from_handle_mut(candidate)
                .and_then(|data_type| data_type.node.take());
            if let Some(data_type) = database.data_types.symbol_from_handle_mut(survivor) {
                data_type.node = node;
            }
            merge_into(database, survivor, candidate);
        }
        Outcome::Sibling(failures) => {
            if !anonymous {
                for (survivor, reason) in failures {
                    mark_conflict(database, survivor, reason);
                    mark_conflict(database, candidate, reason);
                }
            }
            survivors.push(candidate);
        }
    }
}

/// Checks whether `type_name_node` is a reference by name that resolves, via
/// the type number recorded on it, to a type structurally equal to `other`.
/// Intrusive fields are skipped at the top level so that a typedef matches
/// the plain type it names.
fn resolves_to_equal(database: &SymbolDatabase, type_name_node: &Node, other: &Node) -> bool {
    let NodeData::TypeName(type_name) = &type_name_node.data else {
        return false;
    };
    if type_name.source != TypeNameSource::StabsTypeNumber {
        return false;
    }
    let Some(file_handle) = type_name.referenced_file else {
        return false;
    };
    let Some(file) = database.source_files.symbol_from_handle(file_handle) else {
        return false;
    };
    let Some(&referenced) = file.type_number_to_handle.get(&type_name.referenced_number) else {
        return false;
    };
    let Some(referenced_node) = database
        .data_types
        .symbol_from_handle(referenced)
        .and_then(|data_type| data_type.node.as_ref())
    else {
        return false;
    };
    compare_nodes(referenced_node, other, false).is_none()
}

fn merge_into(database: &mut SymbolDatabase, survivor: DataTypeHandle, candidate: DataTypeHandle) {
    let Some(candidate_symbol) = database.data_types.symbol_from_handle(candidate) else {
        return;
    };
    let files = candidate_symbol.files.clone();

    // Redirect the candidate's contributing files at the survivor.
    for &file_handle in &files {
        let Some(file) = database.source_files.symbol_from_handle_mut(file_handle) else {
            continue;
        };
        for handle in file.type_number_to_handle.values_mut() {
            if *handle == candidate {
                *handle = survivor;
            }
        }
        file.data_types.retain(|&handle| handle != candidate);
        if !file.data_types.contains(&survivor) {
            file.data_types.push(survivor);
        }
    }

    if let Some(survivor_symbol) = database.data_types.symbol_from_handle_mut(survivor) {
        for file in files {
            if !survivor_symbol.files.contains(&file) {
                survivor_symbol.files.push(file);
            }
        }
    }

    database.data_types.destroy_symbol(candidate);
}

fn mark_conflict(database: &mut SymbolDatabase, handle: DataTypeHandle, reason: CompareFailReason) {
    let Some(data_type) = database.data_types.symbol_from_handle_mut(handle) else {
        return;
    };
    data_type.conflict = true;
    data_type.compare_fail_reason = Some(reason.to_str());
    if let Some(node) = &mut data_type.node {
        node.conflict = true;
        node.compare_fail_reason = Some(reason.to_str());
    }
}
