//! Serializes the symbol database as JSON.

use mdebug::ast::*;
use mdebug::database::{SymbolDatabase, SymbolKind};
use mdebug::registers::{map_dbx_register_index, register_name};
use serde_json::{json, Map, Value};

/// The schema version written into the top-level object. Bump this whenever
/// the shape of the output changes.
pub const JSON_FORMAT_VERSION: u32 = 8;

/// Builds the top-level JSON value for a database.
pub fn database_to_json(database: &SymbolDatabase) -> Value {
    json!({
        "version": JSON_FORMAT_VERSION,
        "files": database.source_files.iter().map(|file| {
            json!({
                "handle": file.handle().value(),
                "source": file.source().value(),
                "name": file.full_path(),
                "relative_path": file.relative_path,
                "text_address": file.text_address,
                "functions": file.functions.iter().map(|handle| handle.value()).collect::<Vec<_>>(),
                "global_variables": file.global_variables.iter().map(|handle| handle.value()).collect::<Vec<_>>(),
                "toolchain_version": file.toolchain_version_info.iter().collect::<Vec<_>>(),
            })
        }).collect::<Vec<_>>(),
        "data_types": database.data_types.iter().map(|data_type| {
            let mut value = Map::new();
            value.insert("handle".into(), data_type.handle().value().into());
            value.insert("source".into(), data_type.source().value().into());
            value.insert("name".into(), data_type.name().into());
            value.insert(
                "files".into(),
                data_type.files.iter().map(|handle| handle.value()).collect::<Vec<_>>().into(),
            );
            if data_type.conflict {
                value.insert("conflict".into(), true.into());
                if let Some(reason) = data_type.compare_fail_reason {
                    value.insert("compare_fail_reason".into(), reason.into());
                }
            }
            if let Some(node) = &data_type.node {
                value.insert("type".into(), node_to_json(node));
            }
            Value::Object(value)
        }).collect::<Vec<_>>(),
        "functions": database.functions.iter().map(|function| {
            let mut value = Map::new();
            value.insert("handle".into(), function.handle().value().into());
            value.insert("source".into(), function.source().value().into());
            value.insert("name".into(), function.name().into());
            value.insert("demangled_name".into(), function.demangled_name().into());
            if let Some(file) = function.source_file {
                value.insert("file".into(), file.value().into());
            }
            if let Some(range) = function.address_range() {
                value.insert("address".into(), range.low.into());
                value.insert("size".into(), (range.high - range.low).into());
            }
            value.insert(
                "parameters".into(),
                function.parameter_variables.iter().map(|handle| handle.value()).collect::<Vec<_>>().into(),
            );
            value.insert(
                "locals".into(),
                function.local_variables().iter().map(|handle| handle.value()).collect::<Vec<_>>().into(),
            );
            if !function.line_numbers.is_empty() {
                value.insert(
                    "line_numbers".into(),
                    function
                        .line_numbers
                        .iter()
                        .map(|(address, line)| json!([address.0, line]))
                        .collect::<Vec<_>>()
                        .into(),
                );
            }
            if let Some(node) = &function.node {
                value.insert("type".into(), node_to_json(node));
            }
            Value::Object(value)
        }).collect::<Vec<_>>(),
        "global_variables": database.global_variables.iter().map(|global| {
            let mut value = Map::new();
            value.insert("handle".into(), global.handle().value().into());
            value.insert("source".into(), global.source().value().into());
            value.insert("name".into(), global.name().into());
            value.insert("demangled_name".into(), global.demangled_name().into());
            if let Some(file) = global.source_file {
                value.insert("file".into(), file.value().into());
            }
            if let Some(node) = &global.node {
                value.insert("type".into(), node_to_json(node));
            }
            Value::Object(value)
        }).collect::<Vec<_>>(),
        "local_variables": database.local_variables.iter().map(|local| {
            let mut value = Map::new();
            value.insert("handle".into(), local.handle().value().into());
            value.insert("source".into(), local.source().value().into());
            value.insert("name".into(), local.name().into());
            if let Some(function) = local.function {
                value.insert("function".into(), function.value().into());
            }
            if let Some(live_range) = local.live_range {
                value.insert("live_range".into(), json!([live_range.low, live_range.high]));
            }
            if let Some(node) = &local.node {
                value.insert("type".into(), node_to_json(node));
            }
            Value::Object(value)
        }).collect::<Vec<_>>(),
        "parameter_variables": database.parameter_variables.iter().map(|parameter| {
            let mut value = Map::new();
            value.insert("handle".into(), parameter.handle().value().into());
            value.insert("source".into(), parameter.source().value().into());
            value.insert("name".into(), parameter.name().into());
            if let Some(function) = parameter.function {
                value.insert("function".into(), function.value().into());
            }
            if let Some(node) = &parameter.node {
                value.insert("type".into(), node_to_json(node));
            }
            Value::Object(value)
        }).collect::<Vec<_>>(),
        "labels": database.labels.iter().map(|label| {
            json!({
                "handle": label.handle().value(),
                "source": label.source().value(),
                "name": label.name(),
                "address": label.address.map(|address| address.0),
            })
        }).collect::<Vec<_>>(),
        "sections": database.sections.iter().map(|section| {
            json!({
                "handle": section.handle().value(),
                "source": section.source().value(),
                "name": section.name(),
                "address": section.address.map(|address| address.0),
                "size": section.size,
            })
        }).collect::<Vec<_>>(),
    })
}

/// Recursively serializes one AST node.
pub fn node_to_json(node: &Node) -> Value {
    let mut value = Map::new();
    value.insert("descriptor".into(), node.descriptor_name().into());
    if !node.name.is_empty() {
        value.insert("name".into(), node.name.as_str().into());
    }
    if node.storage_class != StorageClass::None {
        value.insert("storage_class".into(), node.storage_class.to_str().into());
    }
    if node.access_specifier != AccessSpecifier::Public {
        value.insert(
            "access_specifier".into(),
            node.access_specifier.to_str().into(),
        );
    }
    if node.is_const {
        value.insert("const".into(), true.into());
    }
    if node.is_volatile {
        value.insert("volatile".into(), true.into());
    }
    if node.relative_offset_bytes > -1 {
        value.insert(
            "relative_offset_bytes".into(),
            node.relative_offset_bytes.into(),
        );
    }
    if node.absolute_offset_bytes > -1 {
        value.insert(
            "absolute_offset_bytes".into(),
            node.absolute_offset_bytes.into(),
        );
    }
    if node.bitfield_offset_bits > -1 {
        value.insert(
            "bitfield_offset_bits".into(),
            node.bitfield_offset_bits.into(),
        );
    }
    if node.size_bits > -1 {
        value.insert("size_bits".into(), node.size_bits.into());
    }
    if node.conflict {
        value.insert("conflict".into(), true.into());
    }
    match &node.data {
        NodeData::Array(array) => {
            value.insert("element_type".into(), node_to_json(&array.element_type));
            value.insert("element_count".into(), array.element_count.into());
        }
        NodeData::BitField(bitfield) => {
            value.insert(
                "underlying_type".into(),
                node_to_json(&bitfield.underlying_type),
            );
        }
        NodeData::BuiltIn(builtin) => {
            value.insert("class".into(), builtin.bclass.to_str().into());
        }
        NodeData::Data => {}
        NodeData::Function(function) => {
            value.insert("return_type".into(), node_to_json(&function.return_type));
            if let Some(parameters) = &function.parameters {
                value.insert(
                    "parameters".into(),
                    parameters.iter().map(node_to_json).collect::<Vec<_>>().into(),
                );
            }
            if function.modifier != stabs::MemberFunctionModifier::None {
                value.insert("modifier".into(), function.modifier.to_str().into());
            }
            if function.is_constructor {
                value.insert("is_constructor".into(), true.into());
            }
            if let Some(vtable_index) = function.vtable_index {
                value.insert("vtable_index".into(), vtable_index.into());
            }
            if let Some(definition) = function.definition {
                value.insert("definition".into(), definition.value().into());
            }
        }
        NodeData::FunctionDefinition(definition) => {
            value.insert(
                "address_range".into(),
                json!([definition.address_range.low, definition.address_range.high]),
            );
            value.insert("type".into(), node_to_json(&definition.function_type));
            value.insert(
                "locals".into(),
                definition
                    .locals
                    .iter()
                    .map(|handle| handle.value())
                    .collect::<Vec<_>>()
                    .into(),
            );
            if definition.is_member_function_ish {
                value.insert("is_member_function_ish".into(), true.into());
            }
        }
        NodeData::InitializerList(list) => {
            value.insert(
                "children".into(),
                list.children.iter().map(node_to_json).collect::<Vec<_>>().into(),
            );
        }
        NodeData::InlineEnum(inline_enum) => {
            value.insert(
                "constants".into(),
                inline_enum
                    .constants
                    .iter()
                    .map(|(constant_value, constant_name)| json!([constant_value, constant_name]))
                    .collect::<Vec<_>>()
                    .into(),
            );
        }
        NodeData::InlineStructOrUnion(struct_or_union) => {
            value.insert("is_struct".into(), struct_or_union.is_struct.into());
            value.insert(
                "base_classes".into(),
                struct_or_union
                    .base_classes
                    .iter()
                    .map(|base_class| {
                        json!({
                            "visibility": base_class.visibility.to_str(),
                            "offset": base_class.offset,
                            "type_name": base_class.type_name,
                        })
                    })
                    .collect::<Vec<_>>()
                    .into(),
            );
            value.insert(
                "fields".into(),
                struct_or_union
                    .fields
                    .iter()
                    .map(node_to_json)
                    .collect::<Vec<_>>()
                    .into(),
            );
            value.insert(
                "member_functions".into(),
                struct_or_union
                    .member_functions
                    .iter()
                    .map(node_to_json)
                    .collect::<Vec<_>>()
                    .into(),
            );
        }
        NodeData::Pointer(pointer) => {
            value.insert("value_type".into(), node_to_json(&pointer.value_type));
        }
        NodeData::PointerToDataMember(member_pointer) => {
            value.insert("class_type".into(), node_to_json(&member_pointer.class_type));
            value.insert(
                "member_type".into(),
                node_to_json(&member_pointer.member_type),
            );
        }
        NodeData::Reference(reference) => {
            value.insert("value_type".into(), node_to_json(&reference.value_type));
        }
        NodeData::SourceFile(source_file) => {
            value.insert("relative_path".into(), source_file.relative_path.as_str().into());
            value.insert("text_address".into(), source_file.text_address.into());
        }
        NodeData::TypeName(type_name) => {
            value.insert("type_name".into(), type_name.type_name.as_str().into());
            value.insert("source".into(), type_name.source.to_str().into());
        }
        NodeData::Variable(variable) => {
            value.insert("class".into(), variable.variable_class.to_str().into());
            value.insert("storage".into(), storage_to_json(&variable.storage));
            value.insert("type".into(), node_to_json(&variable.variable_type));
            if let Some(data) = &variable.data {
                value.insert("data".into(), node_to_json(data));
            }
        }
    }
    Value::Object(value)
}

fn storage_to_json(storage: &VariableStorage) -> Value {
    match storage {
        VariableStorage::Global { location, address } => json!({
            "type": "global",
            "location": location.to_str(),
            "address": address.map(|address| address.0),
        }),
        VariableStorage::Register {
            dbx_register_number,
            is_by_reference,
        } => {
            let (register_class, index) = map_dbx_register_index(*dbx_register_number);
            json!({
                "type": "register",
                "register": register_name(register_class, index),
                "register_class": register_class.to_str(),
                "dbx_register_number": dbx_register_number,
                "register_index": index,
                "is_by_reference": is_by_reference,
            })
        }
        VariableStorage::Stack {
            stack_pointer_offset,
        } => json!({
            "type": "stack",
            "stack_pointer_offset": stack_pointer_offset,
        }),
    }
}
