//! Parser for whole `name:descriptor<type>` symbol strings.

use crate::cursor::{Cursor, ParseError};
use crate::type_parser::parse_top_level_stabs_type;
use crate::types::StabsType;

/// The symbol descriptor character, which determines what kind of entity a
/// symbol describes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StabsSymbolDescriptor {
    /// No descriptor; the type number follows the colon directly.
    LocalVariable,
    /// `a` - a parameter passed by reference.
    ReferenceParameterA,
    /// `f` - a file-local function.
    LocalFunction,
    /// `F` - a global function.
    GlobalFunction,
    /// `G` - a global variable.
    GlobalVariable,
    /// `P` or `R` - a parameter passed in a register.
    RegisterParameter,
    /// `p` - a parameter passed on the stack.
    ValueParameter,
    /// `r` - a variable held in a register.
    RegisterVariable,
    /// `S` - a file-local global variable.
    StaticGlobalVariable,
    /// `t` - a typedef.
    TypeName,
    /// `T` - an enum, struct or union tag.
    EnumStructOrTypeTag,
    /// `V` - a function-local static variable.
    StaticLocalVariable,
    /// `v` - a parameter passed by reference on the stack.
    ReferenceParameterV,
}

impl StabsSymbolDescriptor {
    fn from_char(c: u8) -> Option<Self> {
        match c {
            b'a' => Some(Self::ReferenceParameterA),
            b'f' => Some(Self::LocalFunction),
            b'F' => Some(Self::GlobalFunction),
            b'G' => Some(Self::GlobalVariable),
            b'P' | b'R' => Some(Self::RegisterParameter),
            b'p' => Some(Self::ValueParameter),
            b'r' => Some(Self::RegisterVariable),
            b'S' => Some(Self::StaticGlobalVariable),
            b't' => Some(Self::TypeName),
            b'T' => Some(Self::EnumStructOrTypeTag),
            b'V' => Some(Self::StaticLocalVariable),
            b'v' => Some(Self::ReferenceParameterV),
            _ => None,
        }
    }

    /// Whether the descriptor introduces a function.
    pub fn is_function(self) -> bool {
        matches!(self, Self::LocalFunction | Self::GlobalFunction)
    }

    /// Whether the descriptor introduces a data type rather than a value.
    pub fn is_data_type(self) -> bool {
        matches!(self, Self::TypeName | Self::EnumStructOrTypeTag)
    }
}

/// One parsed symbol string.
#[derive(Clone, Debug)]
pub struct StabsSymbol {
    /// The symbol name, to the left of the first colon.
    pub name: String,
    /// What kind of entity this symbol describes.
    pub descriptor: StabsSymbolDescriptor,
    /// The top-level type.
    pub ty: Box<StabsType>,
}

/// Parses one symbol string. The cursor is left after the last byte consumed;
/// the caller decides what to do about trailing data.
pub fn parse_stabs_symbol(cursor: &mut Cursor) -> Result<StabsSymbol, ParseError> {
    let name = cursor.eat_dodgy_stabs_identifier()?;
    cursor.expect_char(b':', "identifier")?;

    let peek = cursor
        .peek()
        .ok_or_else(|| cursor.error("Unexpected end of symbol."))?;
    let descriptor = if peek.is_ascii_digit() || peek == b'(' {
        StabsSymbolDescriptor::LocalVariable
    } else {
        let descriptor_char = cursor.eat_char().unwrap();
        StabsSymbolDescriptor::from_char(descriptor_char).ok_or_else(|| {
            cursor.error(format!(
                "Unknown symbol descriptor '{}'.",
                descriptor_char as char
            ))
        })?
    };

    // GCC emits a type-name marker after the descriptor for some symbols.
    if cursor.peek() == Some(b't') {
        cursor.skip(1);
    }

    let mut ty = parse_top_level_stabs_type(cursor)?;

    // Nested functions are annotated with `,enclosing,function` which we
    // don't care about.
    if descriptor.is_function() && cursor.peek() == Some(b',') {
        cursor.skip_to_end();
    }

    // Variable names must not be picked up as type names e.g. for
    // `somevar:P123=*456`, the type 123 can be referenced elsewhere by its
    // number, but its name is not "somevar".
    if descriptor.is_data_type() {
        ty.name = Some(name.clone());
    }
    ty.is_typedef = descriptor == StabsSymbolDescriptor::TypeName;
    ty.is_root = true;

    Ok(StabsSymbol {
        name,
        descriptor,
        ty,
    })
}
