//! Lowers parsed STABS types into the AST.

use crate::ast::*;
use crate::database::SourceFileHandle;
use crate::index::TypeIndex;
use stabs::{StabsField, StabsSymbol, StabsSymbolDescriptor, StabsType, StabsTypeData};

/// Lowering gives up past this depth so that cyclic or pathological inputs
/// cannot blow the stack.
pub const MAX_DEPTH: i32 = 1000;

/// State shared by one translation unit's lowering calls.
pub struct LowerContext<'a> {
    /// The source file being imported, recorded on substituted type names so
    /// their type numbers can be resolved later.
    pub file: SourceFileHandle,
    /// The unit's type number index.
    pub types: &'a TypeIndex<'a>,
}

/// A lowering failure that should be materialized into the tree rather than
/// aborting the import. The message doubles as the placeholder type name.
pub(crate) struct LowerError(pub String);

impl LowerError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Lowers the top-level type of a symbol.
///
/// Returns `None` when the type carries no information worth keeping (ranges
/// and raw builtins at the top level describe fundamental types, which are
/// identified by name wherever they are used). Failures inside the type are
/// materialized as error type names so presentation keeps working.
pub fn stabs_symbol_to_ast(symbol: &StabsSymbol, context: &LowerContext) -> Option<Node> {
    let mut node = if !symbol.ty.has_body() {
        // The symbol just renames a numbered type.
        Node::new(NodeData::TypeName(TypeName {
            type_name: symbol.name.clone(),
            source: TypeNameSource::StabsTypeNumber,
            referenced_file: Some(context.file),
            referenced_number: symbol.ty.type_number,
        }))
    } else {
        match stabs_type_to_ast(&symbol.ty, context, 0, 0, false) {
            Ok(Some(node)) => *node,
            Ok(None) => return None,
            Err(error) => Node::type_name(error.0, TypeNameSource::Error),
        }
    };
    node.name = unsentinel(&symbol.name);
    if symbol.descriptor == StabsSymbolDescriptor::TypeName {
        node.storage_class = StorageClass::Typedef;
    }
    Some(node)
}

/// Lowers a type for a context that must produce a node, materializing
/// errors and discards as placeholder type names.
pub fn stabs_type_to_ast_or_error(ty: &StabsType, context: &LowerContext) -> Box<Node> {
    match stabs_type_to_ast(ty, context, 0, 0, true) {
        Ok(Some(node)) => node,
        Ok(None) => Box::new(Node::type_name("CCC_BADTYPEINFO", TypeNameSource::Error)),
        Err(error) => Box::new(Node::type_name(error.0, TypeNameSource::Error)),
    }
}

pub(crate) fn stabs_type_to_ast(
    ty: &StabsType,
    context: &LowerContext,
    absolute_parent_offset_bytes: i32,
    depth: i32,
    substitute_type_name: bool,
) -> Result<Option<Box<Node>>, LowerError> {
    if depth > MAX_DEPTH {
        return Err(LowerError::new("CCC_BADRECURSION"));
    }

    // Make sure that types referenced by name are replaced with their name
    // instead of their contents where that would be more appropriate. This is
    // also what makes recursive type graphs lower in finite space.
    if let Some(name) = &ty.name {
        let try_substitute = depth > 0
            && (ty.is_root
                || matches!(
                    ty.data,
                    Some(StabsTypeData::Range { .. }) | Some(StabsTypeData::Builtin { .. })
                ));
        let is_name_empty = name.is_empty() || name == " ";
        // A common case is that __builtin_va_list is indistinguishable from
        // void*, so it is never used as a substitute.
        let is_va_list = name == "__builtin_va_list";
        if (substitute_type_name || try_substitute) && !is_name_empty && !is_va_list {
            return Ok(Some(Box::new(Node::new(NodeData::TypeName(TypeName {
                type_name: name.clone(),
                source: if ty.type_number.valid() {
                    TypeNameSource::StabsTypeNumber
                } else {
                    TypeNameSource::User
                },
                referenced_file: Some(context.file),
                referenced_number: ty.type_number,
            })))));
        }
    }

    let Some(data) = &ty.data else {
        // The type was defined previously, so look it up by its number.
        if ty.anonymous {
            return Err(LowerError::new("CCC_BADTYPELOOKUP(anonymous)"));
        }
        let Some(resolved) = context.types.lookup(ty.type_number) else {
            log::warn!(
                "Failed to lookup STABS type by its type number {}.",
                ty.type_number
            );
            return Ok(Some(Box::new(Node::type_name(
                format!("CCC_BADTYPELOOKUP({})", ty.type_number),
                TypeNameSource::Error,
            ))));
        };
        return stabs_type_to_ast(
            resolved,
            context,
            absolute_parent_offset_bytes,
            depth + 1,
            substitute_type_name,
        );
    };

    let result = match data {
        StabsTypeData::TypeReference(inner) => {
            if ty.anonymous || inner.anonymous || inner.type_number != ty.type_number {
                let Some(node) = stabs_type_to_ast(
                    inner,
                    context,
                    absolute_parent_offset_bytes,
                    depth + 1,
                    substitute_type_name,
                )?
                else {
                    return Ok(None);
                };
                node
            } else {
                // In STABS, void is a reference to itself.
                Box::new(Node::new(NodeData::BuiltIn(BuiltIn {
                    bclass: BuiltInClass::Void,
                })))
            }
        }
        StabsTypeData::Array {
            index_type,
            element_type,
        } => {
            let Some(element) = stabs_type_to_ast(
                element_type,
                context,
                absolute_parent_offset_bytes,
                depth + 1,
                true,
            )?
            else {
                return Ok(None);
            };
            let Some(StabsTypeData::Range { low, high, .. }) = &index_type.data else {
                return Err(LowerError::new("CCC_BADTYPEINFO"));
            };
            let low: i64 = low
                .parse()
                .map_err(|_| LowerError::new("CCC_BADTYPEINFO"))?;
            let high: i64 = high
                .parse()
                .map_err(|_| LowerError::new("CCC_BADTYPEINFO"))?;
            if low != 0 {
                return Err(LowerError::new("CCC_BADTYPEINFO"));
            }
            // Some compilers wrote out a wrapped around value here for zero
            // length (or variable length?) arrays.
            let element_count = if high == 4294967295 { 0 } else { (high + 1) as i32 };
            Box::new(Node::new(NodeData::Array(Array {
                element_type: element,
                element_count,
            })))
        }
        StabsTypeData::Enum(fields) => Box::new(Node::new(NodeData::InlineEnum(InlineEnum {
            constants: fields.clone(),
        }))),
        StabsTypeData::Function { return_type } => {
            let Some(return_node) = stabs_type_to_ast(
                return_type,
                context,
                absolute_parent_offset_bytes,
                depth + 1,
                true,
            )?
            else {
                return Ok(None);
            };
            Box::new(Node::new(NodeData::Function(Function {
                return_type: return_node,
                parameters: None,
                modifier: Default::default(),
                is_constructor: false,
                vtable_index: None,
                definition: None,
            })))
        }
        StabsTypeData::VolatileQualifier(inner) => {
            let Some(mut node) = stabs_type_to_ast(
                inner,
                context,
                absolute_parent_offset_bytes,
                depth + 1,
                substitute_type_name,
            )?
            else {
                return Ok(None);
            };
            node.is_volatile = true;
            node
        }
        StabsTypeData::ConstQualifier(inner) => {
            let Some(mut node) = stabs_type_to_ast(
                inner,
                context,
                absolute_parent_offset_bytes,
                depth + 1,
                substitute_type_name,
            )?
            else {
                return Ok(None);
            };
            node.is_const = true;
            node
        }
        StabsTypeData::Range { .. } | StabsTypeData::Builtin { .. } => {
            // Fundamental types are only interesting by name. Deep in a tree
            // a placeholder keeps the structure printable; at the top the
            // whole symbol is discarded.
            if depth < 2 {
                return Ok(None);
            }
            let placeholder = match &ty.name {
                Some(name) if !name.is_empty() && name != " " => name.clone(),
                _ if matches!(data, StabsTypeData::Range { .. }) => "CCC_RANGE".to_string(),
                _ => "CCC_BUILTIN".to_string(),
            };
            Box::new(Node::type_name(placeholder, TypeNameSource::Error))
        }
        StabsTypeData::Struct { body, .. } | StabsTypeData::Union(body) => {
            let is_struct = matches!(data, StabsTypeData::Struct { .. });
            let mut struct_or_union = InlineStructOrUnion {
                is_struct,
                base_classes: Vec::new(),
                fields: Vec::new(),
                member_functions: Vec::new(),
            };

            for stabs_base_class in &body.base_classes {
                let Some(base_class) = stabs_type_to_ast(
                    &stabs_base_class.ty,
                    context,
                    absolute_parent_offset_bytes,
                    depth + 1,
                    true,
                )?
                else {
                    return Ok(None);
                };
                let NodeData::TypeName(type_name) = &base_class.data else {
                    return Err(LowerError::new("CCC_BADTYPEINFO"));
                };
                struct_or_union.base_classes.push(BaseClass {
                    visibility: AccessSpecifier::from_stabs_visibility(stabs_base_class.visibility),
                    offset: stabs_base_class.offset,
                    type_name: type_name.type_name.clone(),
                });
            }

            for field in &body.fields {
                let Some(node) =
                    stabs_field_to_ast(field, context, absolute_parent_offset_bytes, depth)?
                else {
                    return Ok(None);
                };
                struct_or_union.fields.push(*node);
            }

            let type_name_no_template_args = ty
                .name
                .as_ref()
                .map(|name| name.split('<').next().unwrap_or(name).to_string());
            for function_set in &body.member_functions {
                for overload in &function_set.overloads {
                    let Some(mut node) = stabs_type_to_ast(
                        &overload.ty,
                        context,
                        absolute_parent_offset_bytes,
                        depth + 1,
                        true,
                    )?
                    else {
                        return Ok(None);
                    };
                    if function_set.name == "__as" {
                        node.name = "operator=".to_string();
                    } else {
                        node.name = function_set.name.clone();
                    }
                    node.access_specifier =
                        AccessSpecifier::from_stabs_visibility(overload.visibility);
                    node.is_const = overload.is_const;
                    node.is_volatile = overload.is_volatile;
                    if let NodeData::Function(function) = &mut node.data {
                        function.modifier = overload.modifier;
                        function.vtable_index = overload.vtable_index;
                        function.is_constructor = ty.name.as_deref()
                            == Some(function_set.name.as_str())
                            || type_name_no_template_args.as_deref()
                                == Some(function_set.name.as_str());
                    }
                    struct_or_union.member_functions.push(*node);
                }
            }

            let mut node = Node::new(NodeData::InlineStructOrUnion(struct_or_union));
            node.size_bits = (body.size * 8) as i32;
            Box::new(node)
        }
        StabsTypeData::CrossReference { identifier, .. } => {
            Box::new(Node::new(NodeData::TypeName(TypeName {
                type_name: identifier.clone(),
                source: TypeNameSource::User,
                referenced_file: Some(context.file),
                referenced_number: ty.type_number,
            })))
        }
        StabsTypeData::FloatingPointBuiltin { bytes, .. } => {
            let bclass = match bytes {
                1 => BuiltInClass::Unsigned8,
                2 => BuiltInClass::Unsigned16,
                4 => BuiltInClass::Unsigned32,
                8 => BuiltInClass::Unsigned64,
                16 => BuiltInClass::Unsigned128,
                _ => BuiltInClass::Unsigned8,
            };
            Box::new(Node::new(NodeData::BuiltIn(BuiltIn { bclass })))
        }
        StabsTypeData::Method {
            return_type,
            parameter_types,
            ..
        } => {
            let Some(return_node) = stabs_type_to_ast(
                return_type,
                context,
                absolute_parent_offset_bytes,
                depth + 1,
                true,
            )?
            else {
                return Ok(None);
            };
            let mut parameters = Vec::new();
            for parameter_type in parameter_types {
                let Some(parameter) = stabs_type_to_ast(
                    parameter_type,
                    context,
                    absolute_parent_offset_bytes,
                    depth + 1,
                    true,
                )?
                else {
                    return Ok(None);
                };
                parameters.push(*parameter);
            }
            Box::new(Node::new(NodeData::Function(Function {
                return_type: return_node,
                parameters: Some(parameters),
                modifier: Default::default(),
                is_constructor: false,
                vtable_index: None,
                definition: None,
            })))
        }
        StabsTypeData::Pointer { value_type } => {
            let Some(value) = stabs_type_to_ast(
                value_type,
                context,
                absolute_parent_offset_bytes,
                depth + 1,
                true,
            )?
            else {
                return Ok(None);
            };
            Box::new(Node::new(NodeData::Pointer(Pointer { value_type: value })))
        }
        StabsTypeData::Reference { value_type } => {
            let Some(value) = stabs_type_to_ast(
                value_type,
                context,
                absolute_parent_offset_bytes,
                depth + 1,
                true,
            )?
            else {
                return Ok(None);
            };
            Box::new(Node::new(NodeData::Reference(Reference {
                value_type: value,
            })))
        }
        StabsTypeData::SizeTypeAttribute { size_bits, inner } => {
            let Some(mut node) = stabs_type_to_ast(
                inner,
                context,
                absolute_parent_offset_bytes,
                depth + 1,
                substitute_type_name,
            )?
            else {
                return Ok(None);
            };
            node.size_bits = *size_bits as i32;
            node
        }
        StabsTypeData::PointerToDataMember {
            class_type,
            member_type,
        } => {
            let Some(class_node) = stabs_type_to_ast(
                class_type,
                context,
                absolute_parent_offset_bytes,
                depth + 1,
                true,
            )?
            else {
                return Ok(None);
            };
            let Some(member_node) = stabs_type_to_ast(
                member_type,
                context,
                absolute_parent_offset_bytes,
                depth + 1,
                true,
            )?
            else {
                return Ok(None);
            };
            Box::new(Node::new(NodeData::PointerToDataMember(
                PointerToDataMember {
                    class_type: class_node,
                    member_type: member_node,
                },
            )))
        }
    };

    Ok(Some(result))
}

pub(crate) fn stabs_field_to_ast(
    field: &StabsField,
    context: &LowerContext,
    absolute_parent_offset_bytes: i32,
    depth: i32,
) -> Result<Option<Box<Node>>, LowerError> {
    let relative_offset_bytes = field.offset_bits / 8;
    let absolute_offset_bytes = absolute_parent_offset_bytes + relative_offset_bytes;

    if field.offset_bits % 8 != 0 || field.size_bits % 8 != 0 {
        // A bitfield.
        let Some(underlying_type) = stabs_type_to_ast(
            &field.ty,
            context,
            absolute_offset_bytes,
            depth + 1,
            true,
        )?
        else {
            return Ok(None);
        };
        let mut bitfield = Node::new(NodeData::BitField(BitField { underlying_type }));
        bitfield.name = unsentinel(&field.name);
        bitfield.relative_offset_bytes = relative_offset_bytes;
        bitfield.absolute_offset_bytes = absolute_offset_bytes;
        bitfield.size_bits = field.size_bits;
        bitfield.bitfield_offset_bits = field.offset_bits % 8;
        bitfield.access_specifier = AccessSpecifier::from_stabs_visibility(field.visibility);
        if field.is_static {
            bitfield.storage_class = StorageClass::Static;
        }
        return Ok(Some(Box::new(bitfield)));
    }

    let Some(mut node) = stabs_type_to_ast(
        &field.ty,
        context,
        absolute_offset_bytes,
        depth + 1,
        true,
    )?
    else {
        return Ok(None);
    };
    node.name = unsentinel(&field.name);
    node.relative_offset_bytes = relative_offset_bytes;
    node.absolute_offset_bytes = absolute_offset_bytes;
    node.size_bits = field.size_bits;
    node.access_specifier = AccessSpecifier::from_stabs_visibility(field.visibility);
    if field.is_static {
        node.storage_class = StorageClass::Static;
    }
    Ok(Some(node))
}

/// Unnamed entities use a single space as a sentinel in STABS; everything
/// downstream wants an empty string instead.
fn unsentinel(name: &str) -> String {
    if name == " " {
        String::new()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SymbolDatabase;
    use crate::index::TypeIndex;
    use crate::symbols::{parse_symbols, ParsedSymbol, StabsCode, Symbol, STABS_SYMBOL_BASE};
    use crate::ImporterFlags;

    fn stab(code: StabsCode, string: &str) -> Symbol {
        Symbol {
            index: STABS_SYMBOL_BASE + code.0 as u32,
            string: string.into(),
            ..Default::default()
        }
    }

    fn lower_all(strings: &[&str]) -> Vec<Option<Node>> {
        let mut database = SymbolDatabase::default();
        let file = database
            .source_files
            .create_symbol("test.c", Default::default());
        let symbols: Vec<Symbol> = strings
            .iter()
            .map(|string| stab(StabsCode::N_LSYM, string))
            .collect();
        let mut flags = ImporterFlags::empty();
        let parsed = parse_symbols(&symbols, &mut flags).unwrap();
        let index = TypeIndex::build(&parsed);
        let context = LowerContext {
            file,
            types: &index,
        };
        parsed
            .iter()
            .map(|symbol| match symbol {
                ParsedSymbol::NameColonType { symbol, .. } => {
                    stabs_symbol_to_ast(symbol, &context)
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_enum() {
        let nodes = lower_all(&["Enum:t(1,1)=e;"]);
        let node = nodes[0].as_ref().unwrap();
        assert_eq!(node.name, "Enum");
        assert_eq!(node.storage_class, StorageClass::Typedef);
        let NodeData::InlineEnum(inline_enum) = &node.data else {
            panic!("not an enum");
        };
        assert!(inline_enum.constants.is_empty());
    }

    #[test]
    fn builtin_typedef_is_discarded() {
        let nodes = lower_all(&["int:t(0,1)=r(0,1);-2147483648;2147483647;"]);
        assert!(nodes[0].is_none());
    }

    #[test]
    fn field_offsets_are_relative_and_absolute() {
        let nodes = lower_all(&[
            "Outer:T(1,1)=s8a:(0,1),0,32;inner:(1,2)=s4b:(0,1),0,32;;,32,32;;",
        ]);
        let node = nodes[0].as_ref().unwrap();
        let NodeData::InlineStructOrUnion(outer) = &node.data else {
            panic!("not a struct");
        };
        assert_eq!(outer.fields.len(), 2);
        let inner = &outer.fields[1];
        assert_eq!(inner.relative_offset_bytes, 4);
        assert_eq!(inner.absolute_offset_bytes, 4);
        let NodeData::InlineStructOrUnion(inner_struct) = &inner.data else {
            panic!("inner field is not an inline struct");
        };
        let b = &inner_struct.fields[0];
        assert_eq!(b.relative_offset_bytes, 0);
        assert_eq!(b.absolute_offset_bytes, 4);
    }

    #[test]
    fn bitfields_are_detected() {
        let nodes = lower_all(&["Flags:T(1,1)=s4a:(0,1),0,3;b:(0,1),3,5;c:(0,1),8,8;;"]);
        let node = nodes[0].as_ref().unwrap();
        let NodeData::InlineStructOrUnion(sou) = &node.data else {
            panic!("not a struct");
        };
        assert!(matches!(sou.fields[0].data, NodeData::BitField(_)));
        assert_eq!(sou.fields[0].bitfield_offset_bits, 0);
        assert!(matches!(sou.fields[1].data, NodeData::BitField(_)));
        assert_eq!(sou.fields[1].bitfield_offset_bits, 3);
        assert_eq!(sou.fields[1].size_bits, 5);
        // A byte-aligned byte-sized field is not a bitfield.
        assert!(!matches!(sou.fields[2].data, NodeData::BitField(_)));
    }

    #[test]
    fn unresolved_reference_is_materialized() {
        let nodes = lower_all(&["Wrapper:T(1,1)=s4field:(7,7),0,32;;"]);
        let node = nodes[0].as_ref().unwrap();
        let NodeData::InlineStructOrUnion(sou) = &node.data else {
            panic!("not a struct");
        };
        let NodeData::TypeName(type_name) = &sou.fields[0].data else {
            panic!("field is not a type name");
        };
        assert_eq!(type_name.type_name, "CCC_BADTYPELOOKUP((7,7))");
        assert_eq!(type_name.source, TypeNameSource::Error);
    }

    #[test]
    fn self_referential_struct() {
        let nodes = lower_all(&["Node:T(1,1)=s8value:(0,1),0,32;next:(1,2)=*(1,1),32,32;;"]);
        let node = nodes[0].as_ref().unwrap();
        let NodeData::InlineStructOrUnion(sou) = &node.data else {
            panic!("not a struct");
        };
        let NodeData::Pointer(pointer) = &sou.fields[1].data else {
            panic!("field is not a pointer");
        };
        let NodeData::TypeName(type_name) = &pointer.value_type.data else {
            panic!("pointee is not a type name");
        };
        assert_eq!(type_name.type_name, "Node");
    }

    #[test]
    fn named_types_are_substituted_in_fields() {
        let nodes = lower_all(&[
            "int:t(0,1)=r(0,1);-2147483648;2147483647;",
            "Wrapper:T(1,1)=s4field:(0,1),0,32;;",
        ]);
        assert!(nodes[0].is_none());
        let node = nodes[1].as_ref().unwrap();
        let NodeData::InlineStructOrUnion(sou) = &node.data else {
            panic!("not a struct");
        };
        let NodeData::TypeName(type_name) = &sou.fields[0].data else {
            panic!("field is not a type name");
        };
        assert_eq!(type_name.type_name, "int");
        assert_eq!(type_name.source, TypeNameSource::StabsTypeNumber);
    }

    #[test]
    fn member_functions_are_flattened() {
        let nodes = lower_all(&[
            "WithMethods:T(1,1)=s4value:(0,1),0,32;get::(1,2)=##(0,1);:_Zget1;2A.;set::(1,3)=##(0,23);:_Zset1;2A.(1,4)=##(0,23);:_Zset2;2A.;;",
        ]);
        let node = nodes[0].as_ref().unwrap();
        let NodeData::InlineStructOrUnion(sou) = &node.data else {
            panic!("not a struct");
        };
        assert_eq!(sou.member_functions.len(), 3);
        assert_eq!(sou.member_functions[0].name, "get");
        assert_eq!(sou.member_functions[1].name, "set");
        assert_eq!(sou.member_functions[2].name, "set");
    }

    #[test]
    fn assignment_operator_is_renamed() {
        let nodes = lower_all(&[
            "WithAs:T(1,1)=s4value:(0,1),0,32;__as::(1,2)=##(0,23);:_Zas;2A.;;",
        ]);
        let node = nodes[0].as_ref().unwrap();
        let NodeData::InlineStructOrUnion(sou) = &node.data else {
            panic!("not a struct");
        };
        assert_eq!(sou.member_functions[0].name, "operator=");
    }
}
