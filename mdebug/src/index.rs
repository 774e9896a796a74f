//! The per-translation-unit index of numbered STABS types.

use crate::symbols::ParsedSymbol;
use stabs::{StabsType, TypeNumber};
use std::collections::BTreeMap;

/// Maps STABS type numbers to the types that define them, within a single
/// translation unit. Two type numbers refer to the same type iff they are
/// literally equal, so a flat map is all that resolution needs.
pub struct TypeIndex<'a> {
    types: BTreeMap<TypeNumber, &'a StabsType>,
}

impl<'a> TypeIndex<'a> {
    /// Walks the parsed symbol stream once and records every numbered type
    /// definition, including ones nested inside other types.
    pub fn build(symbols: &'a [ParsedSymbol]) -> Self {
        let mut types = BTreeMap::new();
        for symbol in symbols {
            if let ParsedSymbol::NameColonType { symbol, .. } = symbol {
                if !symbol.ty.anonymous {
                    symbol.ty.enumerate_numbered_types(&mut types);
                }
            }
        }
        Self { types }
    }

    /// Resolves a type number to its definition. Returns `None` both for
    /// unknown numbers and for entries that somehow have no body, so that
    /// callers have a single failure path.
    pub fn lookup(&self, number: TypeNumber) -> Option<&'a StabsType> {
        self.types
            .get(&number)
            .copied()
            .filter(|ty| ty.has_body())
    }

    /// The number of distinct type numbers defined in the translation unit.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the translation unit defines no numbered types at all.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
