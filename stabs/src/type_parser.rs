//! Recursive descent parser for STABS type strings.

use crate::cursor::{Cursor, ParseError};
use crate::types::*;

/// Parses a type at the top level of a symbol, along with the suffixes that
/// can only appear there: a `~%type;` first-base-class annotation on structs,
/// and a `;l(#start,#end)` live range annotation which is validated and
/// dropped.
pub fn parse_top_level_stabs_type(cursor: &mut Cursor) -> Result<Box<StabsType>, ParseError> {
    let mut ty = parse_stabs_type(cursor)?;

    if matches!(ty.data, Some(StabsTypeData::Struct { .. })) && cursor.starts_with(b"~%") {
        cursor.skip(2);
        let base = parse_stabs_type(cursor)?;
        if let Some(StabsTypeData::Struct {
            first_base_class, ..
        }) = &mut ty.data
        {
            *first_base_class = Some(base);
        }
        cursor.expect_char(b';', "first base class suffix")?;
    }

    if cursor.starts_with(b";l") {
        cursor.skip(2);
        cursor.expect_char(b'(', "live range suffix")?;
        cursor.expect_char(b'#', "live range suffix")?;
        cursor
            .eat_s32_literal()
            .ok_or_else(|| cursor.error("Cannot parse live range start."))?;
        cursor.expect_char(b',', "live range suffix")?;
        cursor.expect_char(b'#', "live range suffix")?;
        cursor
            .eat_s32_literal()
            .ok_or_else(|| cursor.error("Cannot parse live range end."))?;
        cursor.expect_char(b')', "live range suffix")?;
    }

    Ok(ty)
}

/// Parses a single type, recursing into child types.
pub(crate) fn parse_stabs_type(cursor: &mut Cursor) -> Result<Box<StabsType>, ParseError> {
    let mut type_number = TypeNumber::default();
    let mut anonymous = false;

    match cursor.peek() {
        None => return Err(cursor.error("Unexpected end of input.")),
        Some(b'(') => {
            // Type numbers made up of two pieces: an include file index and a
            // type number.
            cursor.skip(1);
            type_number.file = cursor
                .eat_s32_literal()
                .ok_or_else(|| cursor.error("Cannot parse file number."))?;
            cursor.expect_char(b',', "type number")?;
            type_number.number = cursor
                .eat_s32_literal()
                .ok_or_else(|| cursor.error("Cannot parse type number."))?;
            cursor.expect_char(b')', "type number")?;
            if cursor.peek() != Some(b'=') {
                return Ok(Box::new(StabsType::shell(type_number)));
            }
            cursor.skip(1);
        }
        Some(byte) if byte.is_ascii_digit() => {
            // Type numbers which are just a single number. This is the more
            // common case for games.
            type_number.number = cursor
                .eat_s32_literal()
                .ok_or_else(|| cursor.error("Cannot parse type number."))?;
            if cursor.peek() != Some(b'=') {
                return Ok(Box::new(StabsType::shell(type_number)));
            }
            cursor.skip(1);
        }
        Some(_) => anonymous = true,
    }

    let peek = cursor
        .peek()
        .ok_or_else(|| cursor.error("Unexpected end of input."))?;

    let data = if peek.is_ascii_digit() || peek == b'(' {
        // An implicit type reference.
        StabsTypeData::TypeReference(parse_stabs_type(cursor)?)
    } else {
        let descriptor = cursor.eat_char().unwrap();
        match descriptor {
            b'a' => {
                let index_type = parse_stabs_type(cursor)?;
                let element_type = parse_stabs_type(cursor)?;
                StabsTypeData::Array {
                    index_type,
                    element_type,
                }
            }
            b'e' => {
                let mut fields = Vec::new();
                loop {
                    if cursor.peek() == Some(b';') {
                        cursor.skip(1);
                        break;
                    }
                    let name = cursor.eat_dodgy_stabs_identifier()?;
                    cursor.expect_char(b':', "enum")?;
                    let value = cursor
                        .eat_s32_literal()
                        .ok_or_else(|| cursor.error("Cannot parse enum value."))?;
                    fields.push((value, name));
                    cursor.expect_char(b',', "enum")?;
                }
                StabsTypeData::Enum(fields)
            }
            b'f' => StabsTypeData::Function {
                return_type: parse_stabs_type(cursor)?,
            },
            b'k' => StabsTypeData::VolatileQualifier(parse_stabs_type(cursor)?),
            b'K' => StabsTypeData::ConstQualifier(parse_stabs_type(cursor)?),
            b'r' => {
                let underlying_type = parse_stabs_type(cursor)?;
                cursor.expect_char(b';', "range type descriptor")?;
                let low = cursor.eat_dodgy_stabs_identifier()?;
                cursor.expect_char(b';', "low range value")?;
                let high = cursor.eat_dodgy_stabs_identifier()?;
                cursor.expect_char(b';', "high range value")?;
                StabsTypeData::Range {
                    underlying_type,
                    low,
                    high,
                }
            }
            b's' => {
                let mut body = StabsStructOrUnion {
                    size: cursor
                        .eat_s64_literal()
                        .ok_or_else(|| cursor.error("Cannot parse struct size."))?,
                    ..Default::default()
                };
                if cursor.peek() == Some(b'!') {
                    cursor.skip(1);
                    let base_class_count = cursor
                        .eat_s32_literal()
                        .ok_or_else(|| cursor.error("Cannot parse base class count."))?;
                    cursor.expect_char(b',', "base class section")?;
                    for _ in 0..base_class_count {
                        // The first character is the virtual inheritance flag.
                        let _ = cursor.eat_char();
                        let visibility_char = cursor
                            .eat_char()
                            .ok_or_else(|| cursor.error("Cannot parse base class visibility."))?;
                        let visibility = StabsVisibility::from_char(visibility_char)
                            .ok_or_else(|| cursor.error("Invalid base class visibility."))?;
                        let offset = cursor
                            .eat_s32_literal()
                            .ok_or_else(|| cursor.error("Cannot parse base class offset."))?;
                        cursor.expect_char(b',', "base class section")?;
                        let ty = parse_stabs_type(cursor)?;
                        cursor.expect_char(b';', "base class section")?;
                        body.base_classes.push(StabsBaseClass {
                            visibility,
                            offset,
                            ty: *ty,
                        });
                    }
                }
                body.fields = parse_field_list(cursor)?;
                body.member_functions = parse_member_functions(cursor)?;
                StabsTypeData::Struct {
                    body,
                    first_base_class: None,
                }
            }
            b'u' => {
                let mut body = StabsStructOrUnion {
                    size: cursor
                        .eat_s64_literal()
                        .ok_or_else(|| cursor.error("Cannot parse union size."))?,
                    ..Default::default()
                };
                body.fields = parse_field_list(cursor)?;
                body.member_functions = parse_member_functions(cursor)?;
                StabsTypeData::Union(body)
            }
            b'x' => {
                let kind = match cursor.eat_char() {
                    Some(b'e') => CrossReferenceKind::Enum,
                    Some(b's') => CrossReferenceKind::Struct,
                    Some(b'u') => CrossReferenceKind::Union,
                    _ => return Err(cursor.error("Invalid cross reference type.")),
                };
                let identifier = cursor.eat_dodgy_stabs_identifier()?;
                cursor.expect_char(b':', "cross reference")?;
                StabsTypeData::CrossReference { kind, identifier }
            }
            b'R' => {
                let fpclass = cursor
                    .eat_s32_literal()
                    .ok_or_else(|| cursor.error("Cannot parse floating point builtin class."))?;
                cursor.expect_char(b';', "floating point builtin")?;
                let bytes = cursor
                    .eat_s32_literal()
                    .ok_or_else(|| cursor.error("Cannot parse floating point builtin size."))?;
                cursor.expect_char(b';', "floating point builtin")?;
                cursor
                    .eat_s32_literal()
                    .ok_or_else(|| cursor.error("Cannot parse floating point builtin."))?;
                cursor.expect_char(b';', "floating point builtin")?;
                StabsTypeData::FloatingPointBuiltin { fpclass, bytes }
            }
            b'#' => {
                if cursor.peek() == Some(b'#') {
                    cursor.skip(1);
                    let return_type = parse_stabs_type(cursor)?;
                    if cursor.peek() == Some(b';') {
                        cursor.skip(1);
                    }
                    StabsTypeData::Method {
                        class_type: None,
                        return_type,
                        parameter_types: Vec::new(),
                    }
                } else {
                    let class_type = parse_stabs_type(cursor)?;
                    cursor.expect_char(b',', "method")?;
                    let return_type = parse_stabs_type(cursor)?;
                    let mut parameter_types = Vec::new();
                    loop {
                        match cursor.peek() {
                            None => break,
                            Some(b';') => {
                                cursor.skip(1);
                                break;
                            }
                            _ => {}
                        }
                        cursor.expect_char(b',', "method")?;
                        parameter_types.push(*parse_stabs_type(cursor)?);
                    }
                    StabsTypeData::Method {
                        class_type: Some(class_type),
                        return_type,
                        parameter_types,
                    }
                }
            }
            b'&' => StabsTypeData::Reference {
                value_type: parse_stabs_type(cursor)?,
            },
            b'*' => StabsTypeData::Pointer {
                value_type: parse_stabs_type(cursor)?,
            },
            b'@' => {
                let next = cursor
                    .peek()
                    .ok_or_else(|| cursor.error("Unexpected end of input."))?;
                if next.is_ascii_digit() || next == b'(' {
                    let class_type = parse_stabs_type(cursor)?;
                    cursor.expect_char(b',', "pointer to non-static data member")?;
                    let member_type = parse_stabs_type(cursor)?;
                    StabsTypeData::PointerToDataMember {
                        class_type,
                        member_type,
                    }
                } else {
                    cursor.expect_char(b's', "type attribute")?;
                    let size_bits = cursor
                        .eat_s64_literal()
                        .ok_or_else(|| cursor.error("Cannot parse type attribute."))?;
                    cursor.expect_char(b';', "type attribute")?;
                    let inner = parse_stabs_type(cursor)?;
                    StabsTypeData::SizeTypeAttribute { size_bits, inner }
                }
            }
            b'-' => {
                let type_id = cursor
                    .eat_s64_literal()
                    .ok_or_else(|| cursor.error("Cannot parse builtin."))?;
                cursor.expect_char(b';', "builtin")?;
                StabsTypeData::Builtin { type_id }
            }
            _ => {
                return Err(cursor.error(format!(
                    "Invalid type descriptor '{}' ({:#04x}).",
                    descriptor as char, descriptor
                )));
            }
        }
    };

    Ok(Box::new(StabsType {
        type_number,
        anonymous,
        name: match &data {
            StabsTypeData::CrossReference { identifier, .. } => Some(identifier.clone()),
            _ => None,
        },
        is_typedef: false,
        is_root: false,
        data: Some(data),
    }))
}

fn parse_field_list(cursor: &mut Cursor) -> Result<Vec<StabsField>, ParseError> {
    let mut fields = Vec::new();

    while !cursor.is_empty() {
        if cursor.peek() == Some(b';') {
            cursor.skip(1);
            break;
        }

        let before_field = cursor.offset();
        let mut field = StabsField {
            name: cursor.eat_dodgy_stabs_identifier()?,
            ..Default::default()
        };

        cursor.expect_char(b':', "identifier")?;
        if cursor.peek() == Some(b'/') {
            cursor.skip(1);
            let visibility_char = cursor
                .eat_char()
                .ok_or_else(|| cursor.error("Cannot parse field visibility."))?;
            field.visibility = StabsVisibility::from_char(visibility_char)
                .ok_or_else(|| cursor.error("Invalid field visibility."))?;
        }
        if cursor.peek() == Some(b':') {
            // The next element belongs to the enclosing member function list,
            // so unwind to the start of this would-be field.
            cursor.rewind(before_field);
            break;
        }
        field.ty = *parse_stabs_type(cursor)?;

        if field.name.starts_with('$') {
            // Virtual table pointers, which only carry an offset.
            cursor.expect_char(b',', "field type")?;
            field.offset_bits = cursor
                .eat_s32_literal()
                .ok_or_else(|| cursor.error("Cannot parse field offset."))?;
            cursor.expect_char(b';', "field offset")?;
        } else if cursor.peek() == Some(b':') {
            cursor.skip(1);
            field.is_static = true;
            field.type_name = Some(cursor.eat_dodgy_stabs_identifier()?);
            cursor.expect_char(b';', "identifier")?;
        } else if cursor.peek() == Some(b',') {
            cursor.skip(1);
            field.offset_bits = cursor
                .eat_s32_literal()
                .ok_or_else(|| cursor.error("Cannot parse field offset."))?;
            cursor.expect_char(b',', "field offset")?;
            field.size_bits = cursor
                .eat_s32_literal()
                .ok_or_else(|| cursor.error("Cannot parse field size."))?;
            cursor.expect_char(b';', "field size")?;
        } else {
            return Err(cursor.error("Expected ':' or ',' after field type."));
        }

        fields.push(field);
    }

    Ok(fields)
}

fn parse_member_functions(cursor: &mut Cursor) -> Result<Vec<StabsMemberFunctionSet>, ParseError> {
    // Check if the next character is from an enclosing field list. If so, the
    // next character will be ',' for normal fields and ':' for static fields.
    if let Some(b',') | Some(b':') = cursor.peek() {
        return Ok(Vec::new());
    }

    let mut member_functions = Vec::new();
    while !cursor.is_empty() {
        if cursor.peek() == Some(b';') {
            cursor.skip(1);
            break;
        }

        let mut set = StabsMemberFunctionSet {
            name: cursor
                .eat_stabs_identifier()
                .ok_or_else(|| cursor.error("Cannot parse member function name."))?,
            ..Default::default()
        };

        cursor.expect_char(b':', "member function")?;
        cursor.expect_char(b':', "member function")?;
        while !cursor.is_empty() {
            if cursor.peek() == Some(b';') {
                cursor.skip(1);
                break;
            }

            let mut function = StabsMemberFunction {
                ty: *parse_stabs_type(cursor)?,
                ..Default::default()
            };

            cursor.expect_char(b':', "member function")?;
            cursor.eat_dodgy_stabs_identifier()?;
            cursor.expect_char(b';', "member function")?;

            let visibility_char = cursor
                .eat_char()
                .ok_or_else(|| cursor.error("Cannot parse member function visibility."))?;
            function.visibility = StabsVisibility::from_char(visibility_char)
                .ok_or_else(|| cursor.error("Invalid member function visibility."))?;

            match cursor.eat_char() {
                Some(b'A') => {}
                Some(b'B') => function.is_const = true,
                Some(b'C') => function.is_volatile = true,
                Some(b'D') => {
                    function.is_const = true;
                    function.is_volatile = true;
                }
                Some(b'?') | Some(b'.') => {}
                _ => return Err(cursor.error("Invalid member function modifiers.")),
            }

            match cursor.eat_char() {
                Some(b'.') => function.modifier = MemberFunctionModifier::None,
                Some(b'?') => function.modifier = MemberFunctionModifier::Static,
                Some(b'*') => {
                    function.vtable_index = Some(
                        cursor
                            .eat_s32_literal()
                            .ok_or_else(|| cursor.error("Cannot parse vtable index."))?,
                    );
                    cursor.expect_char(b';', "virtual member function")?;
                    function.virtual_type = Some(*parse_stabs_type(cursor)?);
                    cursor.expect_char(b';', "virtual member function")?;
                    function.modifier = MemberFunctionModifier::Virtual;
                }
                _ => return Err(cursor.error("Invalid member function type.")),
            }

            set.overloads.push(function);
        }

        member_functions.push(set);
    }

    Ok(member_functions)
}
