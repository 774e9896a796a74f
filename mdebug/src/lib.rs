//! Recovers C/C++ type and symbol information from the `.mdebug` section of
//! PlayStation 2 era ELF executables.
//!
//! The `.mdebug` section is a MIPS ECOFF symbolic header wrapping per-file
//! symbol tables whose strings carry STABS type information. The import
//! pipeline here runs in stages:
//!
//! 1. [`reader`] decodes the section framing into flat [`symbols::Symbol`]
//!    records grouped by translation unit.
//! 2. [`symbols`] classifies the records, joins continuation strings, and
//!    parses the STABS strings using the `stabs` crate.
//! 3. [`lower`] converts the parsed types into a language-neutral AST
//!    ([`ast::Node`]) with explicit byte/bit offsets.
//! 4. [`import`] drives the above for every file, filling a
//!    [`database::SymbolDatabase`] with types, functions and variables.
//! 5. [`dedup`] merges structurally identical types observed in different
//!    translation units and records conflicts.

#![forbid(unused_must_use)]
#![forbid(unsafe_code)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::match_like_matches_macro)]
#![allow(clippy::single_match)]
#![allow(clippy::too_many_arguments)]

pub mod ast;
pub mod database;
pub mod dedup;
pub mod elf;
pub mod import;
pub mod index;
pub mod lower;
pub mod reader;
pub mod registers;
pub mod symbols;

use bitflags::bitflags;
use std::fmt;

pub use database::SymbolDatabase;
pub use import::{import_symbol_table, DemanglerFn};

bitflags! {
    /// Options controlling the import pipeline.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct ImporterFlags: u32 {
        /// Strip member functions from struct and union types.
        const NO_MEMBER_FUNCTIONS = 1 << 0;
        /// Strip member functions that were likely compiler-generated.
        const NO_GENERATED_MEMBER_FUNCTIONS = 1 << 1;
        /// Pretend every member is public.
        const NO_ACCESS_SPECIFIERS = 1 << 2;
        /// Keep a separate copy of each type per translation unit.
        const DONT_DEDUPLICATE_TYPES = 1 << 3;
        /// Treat recoverable oddities in the input as errors. Cleared
        /// automatically for the rest of an import when a truncated symbol
        /// string is detected.
        const STRICT_PARSING = 1 << 4;
    }
}

/// An address in the program being analyzed.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Address(pub u32);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A half-open range of addresses.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct AddressRange {
    /// The first address in the range.
    pub low: u32,
    /// One past the last address in the range.
    pub high: u32,
}

impl AddressRange {
    /// Whether an address falls within the range.
    pub fn contains(&self, address: u32) -> bool {
        address >= self.low && address < self.high
    }

    /// Whether two ranges share any addresses.
    pub fn overlaps(&self, other: &AddressRange) -> bool {
        self.low < other.high && other.low < self.high
    }
}
