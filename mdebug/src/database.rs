//! Handle-indexed storage for every kind of symbol.
//!
//! Symbols reference each other by handle, never by pointer. Handles are
//! stable dense indices: destroying a symbol logically removes it but its
//! handle is never reused, so stale handles fail lookups instead of aliasing
//! a different symbol.

use crate::ast::{Node, NodeData, StorageClass, VariableStorage};
use crate::{Address, AddressRange};
use stabs::TypeNumber;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::marker::PhantomData;

/// A stable reference to a symbol of a particular kind.
pub struct Handle<T> {
    value: u32,
    marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub(crate) fn new(value: u32) -> Self {
        Self {
            value,
            marker: PhantomData,
        }
    }

    /// The raw index value, for presentation layers that serialize handles.
    pub fn value(self) -> u32 {
        self.value
    }
}

// The derives would put bounds on T, which is only a marker.
impl<T> Copy for Handle<T> {}
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl<T> Eq for Handle<T> {}
impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}
impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}
impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.value)
    }
}
impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::new(u32::MAX)
    }
}

macro_rules! handle_aliases {
    ($($(#[$doc:meta])* $alias:ident => $symbol:ident;)*) => {
        $(
            $(#[$doc])*
            pub type $alias = Handle<$symbol>;
        )*
    };
}

handle_aliases! {
    /// Handle to a [`DataType`].
    DataTypeHandle => DataType;
    /// Handle to a [`Function`].
    FunctionHandle => Function;
    /// Handle to a [`GlobalVariable`].
    GlobalVariableHandle => GlobalVariable;
    /// Handle to a [`Label`].
    LabelHandle => Label;
    /// Handle to a [`LocalVariable`].
    LocalVariableHandle => LocalVariable;
    /// Handle to a [`ParameterVariable`].
    ParameterVariableHandle => ParameterVariable;
    /// Handle to a [`Section`].
    SectionHandle => Section;
    /// Handle to a [`SourceFile`].
    SourceFileHandle => SourceFile;
    /// Handle to a [`SymbolSource`].
    SymbolSourceHandle => SymbolSource;
}

/// The fields and operations every symbol kind supports.
pub trait SymbolKind: Default {
    /// A human-readable name for the kind.
    const KIND_NAME: &'static str;

    /// This symbol's own handle.
    fn handle(&self) -> Handle<Self>;
    fn set_handle(&mut self, handle: Handle<Self>);
    /// The symbol source this symbol was imported from.
    fn source(&self) -> SymbolSourceHandle;
    fn set_source(&mut self, source: SymbolSourceHandle);
    /// The symbol's name.
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
}

macro_rules! symbol_kind {
    ($symbol:ident, $kind_name:literal) => {
        impl SymbolKind for $symbol {
            const KIND_NAME: &'static str = $kind_name;

            fn handle(&self) -> Handle<Self> {
                self.handle
            }
            fn set_handle(&mut self, handle: Handle<Self>) {
                self.handle = handle;
            }
            fn source(&self) -> SymbolSourceHandle {
                self.source
            }
            fn set_source(&mut self, source: SymbolSourceHandle) {
                self.source = source;
            }
            fn name(&self) -> &str {
                &self.name
            }
            fn set_name(&mut self, name: String) {
                self.name = name;
            }
        }
    };
}

/// A container for symbols of one kind that maintains a name index.
pub struct SymbolList<T> {
    symbols: Vec<T>,
    next_handle: u32,
    name_to_handle: HashMap<String, Vec<Handle<T>>>,
}

impl<T> Default for SymbolList<T> {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            next_handle: 0,
            name_to_handle: HashMap::new(),
        }
    }
}

impl<T: SymbolKind> SymbolList<T> {
    /// Creates a new symbol and returns its handle.
    pub fn create_symbol(
        &mut self,
        name: impl Into<String>,
        source: SymbolSourceHandle,
    ) -> Handle<T> {
        let handle = Handle::new(self.next_handle);
        self.next_handle += 1;
        let name = name.into();
        let mut symbol = T::default();
        symbol.set_handle(handle);
        symbol.set_source(source);
        symbol.set_name(name.clone());
        self.symbols.push(symbol);
        self.name_to_handle.entry(name).or_default().push(handle);
        handle
    }

    /// Looks up a symbol from its handle using binary search.
    pub fn symbol_from_handle(&self, handle: Handle<T>) -> Option<&T> {
        let index = self.index_from_handle(handle)?;
        Some(&self.symbols[index])
    }

    /// Mutable version of [`SymbolList::symbol_from_handle`].
    pub fn symbol_from_handle_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let index = self.index_from_handle(handle)?;
        Some(&mut self.symbols[index])
    }

    /// The position of a symbol within the list, which shifts when earlier
    /// symbols are destroyed.
    pub fn index_from_handle(&self, handle: Handle<T>) -> Option<usize> {
        self.symbols
            .binary_search_by_key(&handle.value(), |symbol| symbol.handle().value())
            .ok()
    }

    /// All the handles of symbols with a given name, in creation order.
    pub fn handles_from_name(&self, name: &str) -> &[Handle<T>] {
        self.name_to_handle
            .get(name)
            .map(|handles| handles.as_slice())
            .unwrap_or(&[])
    }

    /// The first symbol created with a given name.
    pub fn first_handle_from_name(&self, name: &str) -> Option<Handle<T>> {
        self.handles_from_name(name).first().copied()
    }

    /// Iterates over the symbols in handle order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.symbols.iter()
    }

    /// Mutable version of [`SymbolList::iter`].
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.symbols.iter_mut()
    }

    /// All the handles in the list, in handle order.
    pub fn handles(&self) -> Vec<Handle<T>> {
        self.symbols.iter().map(|symbol| symbol.handle()).collect()
    }

    /// The number of live symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the list contains no live symbols.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Destroys a single symbol. Its handle is not reused.
    pub fn destroy_symbol(&mut self, handle: Handle<T>) -> bool {
        let Some(index) = self.index_from_handle(handle) else {
            return false;
        };
        let symbol = self.symbols.remove(index);
        if let Some(handles) = self.name_to_handle.get_mut(symbol.name()) {
            handles.retain(|h| *h != handle);
            if handles.is_empty() {
                self.name_to_handle.remove(symbol.name());
            }
        }
        true
    }

    /// Destroys all the symbols from a given symbol source, e.g. to free one
    /// symbol table without touching user-defined symbols.
    pub fn destroy_symbols_from_source(&mut self, source: SymbolSourceHandle) {
        let condemned: Vec<Handle<T>> = self
            .symbols
            .iter()
            .filter(|symbol| symbol.source() == source)
            .map(|symbol| symbol.handle())
            .collect();
        for handle in condemned {
            self.destroy_symbol(handle);
        }
    }

    /// Destroys all symbols but keeps allocating fresh handles, so stale
    /// handles stay dangling instead of aliasing new symbols.
    pub fn clear(&mut self) {
        self.symbols.clear();
        self.name_to_handle.clear();
    }
}

impl<'a, T> IntoIterator for &'a SymbolList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.iter()
    }
}

/// Identifies where a batch of symbols came from, so they can be removed
/// together.
#[derive(Default)]
pub struct SymbolSource {
    handle: SymbolSourceHandle,
    source: SymbolSourceHandle,
    name: String,
}
symbol_kind!(SymbolSource, "symbol source");

/// An ELF section.
#[derive(Default)]
pub struct Section {
    handle: SectionHandle,
    source: SymbolSourceHandle,
    name: String,
    /// The section's address, if it is mapped.
    pub address: Option<Address>,
    /// The section's size in bytes.
    pub size: u32,
}
symbol_kind!(Section, "section");

impl Section {
    /// The address range the section occupies, if it is mapped.
    pub fn address_range(&self) -> Option<AddressRange> {
        self.address.map(|address| AddressRange {
            low: address.0,
            high: address.0 + self.size,
        })
    }
}

/// One translation unit from the symbol table. The name is the full path
/// recorded in the file descriptor.
#[derive(Default)]
pub struct SourceFile {
    handle: SourceFileHandle,
    source: SymbolSourceHandle,
    name: String,
    /// The path from the unit's `N_SO` symbol.
    pub relative_path: String,
    /// The address of the unit's text.
    pub text_address: u32,
    /// Maps STABS type numbers to the data types they produced, for
    /// resolving type name references after import.
    pub type_number_to_handle: BTreeMap<TypeNumber, DataTypeHandle>,
    /// Toolchain version strings from `INFO` symbols.
    pub toolchain_version_info: BTreeSet<String>,
    /// The functions defined in this unit.
    pub functions: Vec<FunctionHandle>,
    /// The global variables defined in this unit.
    pub global_variables: Vec<GlobalVariableHandle>,
    /// The data types contributed by this unit.
    pub data_types: Vec<DataTypeHandle>,
}
symbol_kind!(SourceFile, "source file");

impl SourceFile {
    /// The full path of the source file.
    pub fn full_path(&self) -> &str {
        &self.name
    }
}

/// A C/C++ data type, deduplicated across translation units unless the
/// importer is told otherwise.
#[derive(Default)]
pub struct DataType {
    handle: DataTypeHandle,
    source: SymbolSourceHandle,
    name: String,
    /// The type itself.
    pub node: Option<Node>,
    /// Every source file that contributed this type.
    pub files: Vec<SourceFileHandle>,
    /// Whether other types with the same name failed to merge with this one.
    pub conflict: bool,
    /// Why the last failed merge was rejected.
    pub compare_fail_reason: Option<&'static str>,
}
symbol_kind!(DataType, "data type");

/// A function.
#[derive(Default)]
pub struct Function {
    handle: FunctionHandle,
    source: SymbolSourceHandle,
    name: String,
    demangled_name: Option<String>,
    /// The translation unit the function was defined in.
    pub source_file: Option<SourceFileHandle>,
    /// The function's entry point.
    pub address: Option<Address>,
    /// The size of the function's code in bytes.
    pub size: u32,
    /// `static` for file-local functions.
    pub storage_class: StorageClass,
    /// The function definition node, holding its type and locals.
    pub node: Option<Node>,
    /// The function's parameters, in declaration order.
    pub parameter_variables: Vec<ParameterVariableHandle>,
    /// The path of the file the function's code came from, when it differs
    /// from the translation unit's own path.
    pub relative_path: Option<String>,
    /// `(address, line number)` pairs recovered from text labels.
    pub line_numbers: Vec<(Address, i32)>,
    /// Included files that contributed code to this function.
    pub sub_source_files: Vec<(Address, String)>,
}
symbol_kind!(Function, "function");

impl Function {
    /// The demangled name if one was recovered, otherwise the raw name.
    pub fn demangled_name(&self) -> &str {
        self.demangled_name.as_deref().unwrap_or(&self.name)
    }

    /// Records the demangled form of the function's name.
    pub fn set_demangled_name(&mut self, demangled: String) {
        self.demangled_name = Some(demangled);
    }

    /// The addresses the function's code occupies.
    pub fn address_range(&self) -> Option<AddressRange> {
        let address = self.address?;
        Some(AddressRange {
            low: address.0,
            high: address.0 + self.size,
        })
    }

    /// The function's local variables, in declaration order.
    pub fn local_variables(&self) -> &[LocalVariableHandle] {
        match &self.node {
            Some(node) => match &node.data {
                NodeData::FunctionDefinition(definition) => &definition.locals,
                _ => &[],
            },
            None => &[],
        }
    }
}

/// A global variable.
#[derive(Default)]
pub struct GlobalVariable {
    handle: GlobalVariableHandle,
    source: SymbolSourceHandle,
    name: String,
    demangled_name: Option<String>,
    /// The translation unit the variable was defined in.
    pub source_file: Option<SourceFileHandle>,
    /// `static` for file-local variables.
    pub storage_class: StorageClass,
    /// The variable node, holding its type and storage.
    pub node: Option<Node>,
}
symbol_kind!(GlobalVariable, "global variable");

impl GlobalVariable {
    /// The demangled name if one was recovered, otherwise the raw name.
    pub fn demangled_name(&self) -> &str {
        self.demangled_name.as_deref().unwrap_or(&self.name)
    }

    /// Records the demangled form of the variable's name.
    pub fn set_demangled_name(&mut self, demangled: String) {
        self.demangled_name = Some(demangled);
    }

    /// The variable's address, when its storage is known.
    pub fn address(&self) -> Option<Address> {
        match &self.node {
            Some(node) => match &node.data {
                NodeData::Variable(variable) => match &variable.storage {
                    VariableStorage::Global { address, .. } => *address,
                    _ => None,
                },
                _ => None,
            },
            None => None,
        }
    }
}

/// A text label.
#[derive(Default)]
pub struct Label {
    handle: LabelHandle,
    source: SymbolSourceHandle,
    name: String,
    /// The address of the label.
    pub address: Option<Address>,
}
symbol_kind!(Label, "label");

/// A function-local variable.
#[derive(Default)]
pub struct LocalVariable {
    handle: LocalVariableHandle,
    source: SymbolSourceHandle,
    name: String,
    /// The function the variable belongs to.
    pub function: Option<FunctionHandle>,
    /// The addresses where the variable is live, from the enclosing lexical
    /// block.
    pub live_range: Option<AddressRange>,
    /// The variable node, holding its type and storage.
    pub node: Option<Node>,
}
symbol_kind!(LocalVariable, "local variable");

/// A function parameter.
#[derive(Default)]
pub struct ParameterVariable {
    handle: ParameterVariableHandle,
    source: SymbolSourceHandle,
    name: String,
    /// The function the parameter belongs to.
    pub function: Option<FunctionHandle>,
    /// The variable node, holding its type and storage.
    pub node: Option<Node>,
}
symbol_kind!(ParameterVariable, "parameter variable");

/// The symbol database. Owns all the symbols.
#[derive(Default)]
pub struct SymbolDatabase {
    /// Deduplicated data types.
    pub data_types: SymbolList<DataType>,
    /// Functions.
    pub functions: SymbolList<Function>,
    /// Global variables.
    pub global_variables: SymbolList<GlobalVariable>,
    /// Text labels.
    pub labels: SymbolList<Label>,
    /// Function-local variables.
    pub local_variables: SymbolList<LocalVariable>,
    /// Function parameters.
    pub parameter_variables: SymbolList<ParameterVariable>,
    /// ELF sections.
    pub sections: SymbolList<Section>,
    /// Translation units.
    pub source_files: SymbolList<SourceFile>,
    /// Where batches of symbols came from.
    pub symbol_sources: SymbolList<SymbolSource>,
}

impl SymbolDatabase {
    /// Destroys every symbol in the database.
    pub fn clear(&mut self) {
        self.data_types.clear();
        self.functions.clear();
        self.global_variables.clear();
        self.labels.clear();
        self.local_variables.clear();
        self.parameter_variables.clear();
        self.sections.clear();
        self.source_files.clear();
        self.symbol_sources.clear();
    }

    /// Destroys every symbol from a given symbol source.
    pub fn destroy_symbols_from_source(&mut self, source: SymbolSourceHandle) {
        self.data_types.destroy_symbols_from_source(source);
        self.functions.destroy_symbols_from_source(source);
        self.global_variables.destroy_symbols_from_source(source);
        self.labels.destroy_symbols_from_source(source);
        self.local_variables.destroy_symbols_from_source(source);
        self.parameter_variables.destroy_symbols_from_source(source);
        self.sections.destroy_symbols_from_source(source);
        self.source_files.destroy_symbols_from_source(source);
        self.symbol_sources.destroy_symbols_from_source(source);
    }

    /// Destroys a function along with its parameters and locals.
    pub fn destroy_function(&mut self, handle: FunctionHandle) -> bool {
        let Some(function) = self.functions.symbol_from_handle(handle) else {
            return false;
        };
        let parameters = function.parameter_variables.clone();
        let locals = function.local_variables().to_vec();
        for parameter in parameters {
            self.parameter_variables.destroy_symbol(parameter);
        }
        for local in locals {
            self.local_variables.destroy_symbol(local);
        }
        self.functions.destroy_symbol(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_stable_across_destruction() {
        let mut list: SymbolList<DataType> = SymbolList::default();
        let a = list.create_symbol("a", SymbolSourceHandle::default());
        let b = list.create_symbol("b", SymbolSourceHandle::default());
        let c = list.create_symbol("c", SymbolSourceHandle::default());
        assert!(list.destroy_symbol(b));
        assert!(!list.destroy_symbol(b));
        assert_eq!(list.len(), 2);
        assert_eq!(list.symbol_from_handle(a).unwrap().name(), "a");
        assert!(list.symbol_from_handle(b).is_none());
        assert_eq!(list.symbol_from_handle(c).unwrap().name(), "c");

        // New symbols never reuse destroyed handles.
        let d = list.create_symbol("d", SymbolSourceHandle::default());
        assert!(d.value() > c.value());
    }

    #[test]
    fn name_index_is_a_multimap_in_creation_order() {
        let mut list: SymbolList<DataType> = SymbolList::default();
        let a = list.create_symbol("Foo", SymbolSourceHandle::default());
        let _ = list.create_symbol("Bar", SymbolSourceHandle::default());
        let c = list.create_symbol("Foo", SymbolSourceHandle::default());
        assert_eq!(list.handles_from_name("Foo"), &[a, c]);
        assert_eq!(list.first_handle_from_name("Foo"), Some(a));
        assert_eq!(list.first_handle_from_name("Baz"), None);
    }

    #[test]
    fn destroy_symbols_from_source() {
        let mut database = SymbolDatabase::default();
        let source_a = database.symbol_sources.create_symbol(".mdebug", SymbolSourceHandle::default());
        let source_b = database.symbol_sources.create_symbol("user", SymbolSourceHandle::default());
        database.data_types.create_symbol("FromA", source_a);
        database.data_types.create_symbol("FromB", source_b);
        database.destroy_symbols_from_source(source_a);
        assert_eq!(database.data_types.len(), 1);
        assert_eq!(database.data_types.iter().next().unwrap().name(), "FromB");
        assert_eq!(database.symbol_sources.len(), 1);
    }
}
