//! Adapter around the GNU C++ demangler that gets injected into the
//! importer.

use cpp_demangle::{DemangleOptions, Symbol};

/// Demangles a GNU C++ symbol name. Returns `None` for names that are not
/// mangled or fail to parse, in which case callers fall back to the raw
/// name.
pub fn demangle(mangled: &str) -> Option<String> {
    let symbol = Symbol::new(mangled).ok()?;
    symbol.demangle(&DemangleOptions::default()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demangles_itanium_names() {
        assert_eq!(
            demangle("_Z14SimpleFunctionv").as_deref(),
            Some("SimpleFunction()")
        );
    }

    #[test]
    fn passes_through_plain_names() {
        assert_eq!(demangle("main"), None);
    }
}
