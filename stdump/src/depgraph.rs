//! Emits a dependency graph of the recovered types in graphviz DOT format.

use mdebug::ast::{Node, NodeData};
use mdebug::database::{DataTypeHandle, SymbolDatabase, SymbolKind};
use std::collections::BTreeSet;
use std::io::{Result, Write};

/// Writes a `digraph` with one node per data type and an edge for each type
/// referenced by name from another type's definition.
pub fn print_type_dependency_graph<W: Write>(
    out: &mut W,
    database: &SymbolDatabase,
) -> Result<()> {
    writeln!(out, "digraph types {{")?;

    for data_type in database.data_types.iter() {
        if data_type.name().is_empty() {
            continue;
        }
        writeln!(
            out,
            "\tt{} [label=\"{}\"];",
            data_type.handle().value(),
            escape(data_type.name())
        )?;
    }

    for data_type in database.data_types.iter() {
        let Some(node) = &data_type.node else {
            continue;
        };
        let mut referenced_names = BTreeSet::new();
        collect_referenced_type_names(node, &mut referenced_names);
        let mut edges: BTreeSet<DataTypeHandle> = BTreeSet::new();
        for name in referenced_names {
            if name == data_type.name() {
                continue;
            }
            if let Some(target) = database.data_types.first_handle_from_name(&name) {
                edges.insert(target);
            }
        }
        for target in edges {
            writeln!(
                out,
                "\tt{} -> t{};",
                data_type.handle().value(),
                target.value()
            )?;
        }
    }

    writeln!(out, "}}")?;
    Ok(())
}

fn collect_referenced_type_names(node: &Node, out: &mut BTreeSet<String>) {
    match &node.data {
        NodeData::TypeName(type_name) => {
            out.insert(type_name.type_name.clone());
        }
        NodeData::Array(array) => collect_referenced_type_names(&array.element_type, out),
        NodeData::BitField(bitfield) => {
            collect_referenced_type_names(&bitfield.underlying_type, out)
        }
        NodeData::Function(function) => {
            collect_referenced_type_names(&function.return_type, out);
            if let Some(parameters) = &function.parameters {
                for parameter in parameters {
                    collect_referenced_type_names(parameter, out);
                }
            }
        }
        NodeData::FunctionDefinition(definition) => {
            collect_referenced_type_names(&definition.function_type, out)
        }
        NodeData::InitializerList(list) => {
            for child in &list.children {
                collect_referenced_type_names(child, out);
            }
        }
        NodeData::InlineStructOrUnion(struct_or_union) => {
            for base_class in &struct_or_union.base_classes {
                out.insert(base_class.type_name.clone());
            }
            for field in &struct_or_union.fields {
                collect_referenced_type_names(field, out);
            }
            for function in &struct_or_union.member_functions {
                collect_referenced_type_names(function, out);
            }
        }
        NodeData::Pointer(pointer) => collect_referenced_type_names(&pointer.value_type, out),
        NodeData::PointerToDataMember(member_pointer) => {
            collect_referenced_type_names(&member_pointer.class_type, out);
            collect_referenced_type_names(&member_pointer.member_type, out);
        }
        NodeData::Reference(reference) => {
            collect_referenced_type_names(&reference.value_type, out)
        }
        NodeData::Variable(variable) => {
            collect_referenced_type_names(&variable.variable_type, out)
        }
        NodeData::BuiltIn(_)
        | NodeData::Data
        | NodeData::InlineEnum(_)
        | NodeData::SourceFile(_) => {}
    }
}

fn escape(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}
