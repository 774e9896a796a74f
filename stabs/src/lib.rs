//! Parser for STABS debugging symbols.
//!
//! STABS encodes C/C++ type information as terse text strings attached to
//! symbol table entries. The grammar is irregular and historically accreted:
//! there are two type-number encodings, field terminators depend on context,
//! identifiers may contain unescaped `::`, and some compilers truncated long
//! strings mid-identifier. This crate parses one symbol string at a time into
//! a tree of [`StabsType`] values; resolving type-number references across a
//! translation unit is the caller's job.
//!
//! # References
//! * <https://sourceware.org/gdb/onlinedocs/stabs.html>

#![forbid(unused_must_use)]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::match_like_matches_macro)]
#![allow(clippy::single_match)]

mod cursor;
mod symbol_parser;
mod type_parser;
mod types;

#[cfg(test)]
mod tests;

pub use cursor::{Cursor, ParseError, ParseErrorKind};
pub use symbol_parser::{parse_stabs_symbol, StabsSymbol, StabsSymbolDescriptor};
pub use type_parser::parse_top_level_stabs_type;
pub use types::{
    CrossReferenceKind, MemberFunctionModifier, StabsBaseClass, StabsField, StabsMemberFunction,
    StabsMemberFunctionSet, StabsStructOrUnion, StabsType, StabsTypeData, StabsVisibility,
    TypeNumber,
};
