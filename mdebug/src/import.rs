//! Drives the whole import: classifies each translation unit's symbols,
//! lowers them, and fills the symbol database.

use crate::ast::*;
use crate::database::{
    Function, FunctionHandle, GlobalVariableHandle, LocalVariableHandle, ParameterVariableHandle,
    SourceFile, SymbolDatabase, SymbolKind, SymbolSourceHandle,
};
use crate::dedup::deduplicate_types;
use crate::index::TypeIndex;
use crate::lower::{
    stabs_symbol_to_ast, stabs_type_to_ast_or_error, LowerContext,
};
use crate::symbols::{parse_symbols, File, ParsedSymbol, Symbol, SymbolClass, SymbolTable, SymbolType};
use crate::{Address, AddressRange, ImporterFlags};
use anyhow::Result;
use bstr::ByteSlice;
use stabs::{StabsSymbol, StabsSymbolDescriptor, StabsType};
use std::collections::HashMap;

/// Demangles one GNU C++ symbol name, or gives up.
pub type DemanglerFn = fn(&str) -> Option<String>;

/// Imports a whole `.mdebug` symbol table into the database. Returns the
/// symbol source handle the imported symbols are tagged with.
pub fn import_symbol_table(
    database: &mut SymbolDatabase,
    table: &SymbolTable,
    flags: ImporterFlags,
    demangler: Option<DemanglerFn>,
) -> Result<SymbolSourceHandle> {
    let source = database
        .symbol_sources
        .create_symbol(".mdebug", SymbolSourceHandle::default());

    // The addresses of non-static global variables are only present in the
    // external symbol table, so gather those for the join below.
    let mut globals: HashMap<String, &Symbol> = HashMap::new();
    for external in &table.externals {
        if external.storage_type == SymbolType::Global
            && external.storage_class != SymbolClass::Undefined
        {
            globals.insert(external.string.to_str_lossy().into_owned(), external);
        }
    }

    let mut flags = flags;
    for file in &table.files {
        import_file(database, file, &mut flags, &globals, source, demangler)?;
    }

    if !flags.contains(ImporterFlags::DONT_DEDUPLICATE_TYPES) {
        deduplicate_types(database);
    }

    link_member_function_definitions(database);

    Ok(source)
}

fn import_file(
    database: &mut SymbolDatabase,
    file: &File,
    flags: &mut ImporterFlags,
    globals: &HashMap<String, &Symbol>,
    source: SymbolSourceHandle,
    demangler: Option<DemanglerFn>,
) -> Result<()> {
    let file_handle = database
        .source_files
        .create_symbol(file.full_path.clone(), source);

    // Some INFO symbols record what toolchain version was used.
    for symbol in &file.symbols {
        if symbol.storage_class == SymbolClass::Info && symbol.string != "@stabs" {
            database
                .source_files
                .symbol_from_handle_mut(file_handle)
                .unwrap()
                .toolchain_version_info
                .insert(symbol.string.to_str_lossy().into_owned());
        }
    }
    if let Some(source_file) = database.source_files.symbol_from_handle_mut(file_handle) {
        source_file.text_address = file.text_address;
    }

    // Parse the stab strings into a data structure that's vaguely one-to-one
    // with the text-based representation.
    let parsed = parse_symbols(&file.symbols, flags)?;

    // Types can be referenced by their number from other stabs, so build a
    // map of type numbers to the parsed types.
    let index = TypeIndex::build(&parsed);

    let mut importer = FileImporter {
        database,
        context: LowerContext {
            file: file_handle,
            types: &index,
        },
        flags: *flags,
        globals,
        source,
        demangler,
        state: ImportState::NotInFunction,
        current_function: None,
        current_parameters: Vec::new(),
        current_locals: Vec::new(),
        pending_locals: Vec::new(),
        block_stack: Vec::new(),
        functions: Vec::new(),
        global_variables: Vec::new(),
        next_relative_path: String::new(),
    };
    for symbol in &parsed {
        importer.process(symbol);
    }
    importer.finish();

    Ok(())
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum ImportState {
    NotInFunction,
    InFunctionBeginning,
    InFunctionEnd,
}

/// Walks one translation unit's parsed symbols in order, maintaining the
/// current-function state machine.
///
/// In most cases the symbols appear in the following order:
///   fun
///   ... parameters ...
///   proc
///   ... line number labels ...
///   end
///   ... locals and blocks ...
/// Some compiler versions emit proc/end before the fun symbol instead, so
/// function creation tolerates either order.
struct FileImporter<'a, 'b> {
    database: &'a mut SymbolDatabase,
    context: LowerContext<'a>,
    flags: ImporterFlags,
    globals: &'a HashMap<String, &'b Symbol>,
    source: SymbolSourceHandle,
    demangler: Option<DemanglerFn>,
    state: ImportState,
    current_function: Option<FunctionHandle>,
    current_parameters: Vec<ParameterVariableHandle>,
    current_locals: Vec<LocalVariableHandle>,
    pending_locals: Vec<LocalVariableHandle>,
    block_stack: Vec<Vec<LocalVariableHandle>>,
    functions: Vec<FunctionHandle>,
    global_variables: Vec<GlobalVariableHandle>,
    next_relative_path: String,
}

impl<'a, 'b> FileImporter<'a, 'b> {
    fn process(&mut self, parsed: &ParsedSymbol) {
        match parsed {
            ParsedSymbol::NameColonType { symbol, raw } => match symbol.descriptor {
                StabsSymbolDescriptor::LocalFunction | StabsSymbolDescriptor::GlobalFunction => {
                    self.function(symbol, raw.value);
                }
                StabsSymbolDescriptor::ReferenceParameterA
                | StabsSymbolDescriptor::RegisterParameter
                | StabsSymbolDescriptor::ValueParameter
                | StabsSymbolDescriptor::ReferenceParameterV => {
                    let is_stack_variable =
                        symbol.descriptor == StabsSymbolDescriptor::ValueParameter;
                    let is_by_reference = matches!(
                        symbol.descriptor,
                        StabsSymbolDescriptor::ReferenceParameterA
                            | StabsSymbolDescriptor::ReferenceParameterV
                    );
                    self.parameter(symbol, raw.value as i32, is_stack_variable, is_by_reference);
                }
                StabsSymbolDescriptor::RegisterVariable
                | StabsSymbolDescriptor::LocalVariable
                | StabsSymbolDescriptor::StaticLocalVariable => {
                    let (storage, is_static) = match symbol.descriptor {
                        StabsSymbolDescriptor::StaticLocalVariable => {
                            let location = global_variable_location(raw.storage_class)
                                .unwrap_or(GlobalStorageLocation::Nil);
                            (
                                VariableStorage::Global {
                                    location,
                                    address: Some(Address(raw.value)),
                                },
                                true,
                            )
                        }
                        StabsSymbolDescriptor::RegisterVariable => (
                            VariableStorage::Register {
                                dbx_register_number: raw.value as i32,
                                is_by_reference: false,
                            },
                            false,
                        ),
                        _ => (
                            VariableStorage::Stack {
                                stack_pointer_offset: raw.value as i32,
                            },
                            false,
                        ),
                    };
                    self.local_variable(symbol, storage, is_static);
                }
                StabsSymbolDescriptor::GlobalVariable
                | StabsSymbolDescriptor::StaticGlobalVariable => {
                    let is_static =
                        symbol.descriptor == StabsSymbolDescriptor::StaticGlobalVariable;
                    let mut location = global_variable_location(raw.storage_class);
                    let mut address = None;
                    if is_static {
                        // For static globals the address is stored in the
                        // local symbol table.
                        address = Some(Address(raw.value));
                    } else if let Some(external) = self.globals.get(&symbol.name) {
                        // For non-static globals it is only stored in the
                        // external symbol table, so pull it in from there.
                        address = Some(Address(external.value));
                        location = global_variable_location(external.storage_class);
                    }
                    self.global_variable(
                        symbol,
                        address,
                        location.unwrap_or(GlobalStorageLocation::Nil),
                        is_static,
                    );
                }
                StabsSymbolDescriptor::TypeName | StabsSymbolDescriptor::EnumStructOrTypeTag => {
                    self.data_type(symbol);
                }
            },
            ParsedSymbol::SourceFile(raw) => {
                self.source_file(&raw.string.to_str_lossy(), raw.value);
            }
            ParsedSymbol::SubSourceFile(raw) => {
                self.sub_source_file(&raw.string.to_str_lossy(), raw.value);
            }
            ParsedSymbol::LBrac(raw) => self.lbrac(raw.value),
            ParsedSymbol::RBrac(raw) => self.rbrac(raw.value),
            ParsedSymbol::FunctionEnd(_) => self.function_end(),
            ParsedSymbol::NonStabs(raw) => {
                if raw.storage_class == SymbolClass::Text {
                    let name = raw.string.to_str_lossy();
                    match raw.storage_type {
                        SymbolType::Proc => self.procedure(&name, raw.value, false),
                        SymbolType::StaticProc => self.procedure(&name, raw.value, true),
                        SymbolType::Label => self.label(&name, raw.value, raw.index as i32),
                        SymbolType::End => self.text_end(raw.value),
                        _ => {}
                    }
                }
            }
        }
    }

    fn source_file(&mut self, path: &str, text_address: u32) {
        let source_file = self.source_file_mut();
        source_file.relative_path = path.to_string();
        source_file.text_address = text_address;
        if self.next_relative_path.is_empty() {
            self.next_relative_path = path.to_string();
        }
    }

    fn sub_source_file(&mut self, path: &str, text_address: u32) {
        if self.state == ImportState::InFunctionBeginning {
            if let Some(function) = self.current_function_mut() {
                function
                    .sub_source_files
                    .push((Address(text_address), path.to_string()));
                return;
            }
        }
        self.next_relative_path = path.to_string();
    }

    fn data_type(&mut self, symbol: &StabsSymbol) {
        let Some(mut node) = stabs_symbol_to_ast(symbol, &self.context) else {
            return;
        };
        apply_importer_flags(&mut node, self.flags);

        let handle = self
            .database
            .data_types
            .create_symbol(node.name.clone(), self.source);
        let type_number = symbol.ty.type_number;
        if let Some(data_type) = self.database.data_types.symbol_from_handle_mut(handle) {
            data_type.files = vec![self.context.file];
            data_type.node = Some(node);
        }

        let source_file = self.source_file_mut();
        if type_number.valid() {
            source_file
                .type_number_to_handle
                .entry(type_number)
                .or_insert(handle);
        }
        source_file.data_types.push(handle);
    }

    fn function(&mut self, symbol: &StabsSymbol, address: u32) {
        if !self.is_current_function(&symbol.name, address) {
            self.create_function(&symbol.name, address);
        }

        let return_type = stabs_type_to_ast_or_error(&symbol.ty, &self.context);
        if let Some(function) = self.current_function_mut() {
            // The size is already known if the end symbol came first.
            let low = function.address.map(|a| a.0).unwrap_or(address);
            function.node = Some(Node::new(NodeData::FunctionDefinition(FunctionDefinition {
                address_range: AddressRange {
                    low,
                    high: low + function.size,
                },
                function_type: return_type,
                locals: Vec::new(),
                is_member_function_ish: false,
            })));
        }
    }

    fn procedure(&mut self, name: &str, address: u32, is_static: bool) {
        if !self.is_current_function(name, address) {
            self.create_function(name, address);
        }
        if is_static {
            if let Some(function) = self.current_function_mut() {
                function.storage_class = StorageClass::Static;
            }
        }
        self.pending_locals.clear();
        self.block_stack.clear();
    }

    fn is_current_function(&self, name: &str, address: u32) -> bool {
        let Some(handle) = self.current_function else {
            return false;
        };
        let Some(function) = self.database.functions.symbol_from_handle(handle) else {
            return false;
        };
        // The same function can be introduced by both a fun stab and a proc
        // symbol, sometimes with inconsistent underscore prefixes, so match
        // on the address as well as the name.
        function.name() == name || function.address == Some(Address(address))
    }

    fn create_function(&mut self, name: &str, address: u32) {
        self.flush_function();
        let handle = self.database.functions.create_symbol(name, self.source);
        self.current_function = Some(handle);
        self.functions.push(handle);
        self.state = ImportState::InFunctionBeginning;

        let demangled = self
            .demangler
            .and_then(|demangle| demangle(name));
        let file = self.context.file;
        let file_relative_path = self.source_file_mut().relative_path.clone();
        let next_relative_path = self.next_relative_path.clone();
        if let Some(function) = self.database.functions.symbol_from_handle_mut(handle) {
            function.address = Some(Address(address));
            function.source_file = Some(file);
            if let Some(demangled) = demangled {
                function.set_demangled_name(demangled);
            }
            if !next_relative_path.is_empty() && next_relative_path != file_relative_path {
                function.relative_path = Some(next_relative_path);
            }
        }
    }

    fn label(&mut self, label: &str, address: u32, line_number: i32) {
        if label.starts_with('$') {
            if let Some(function) = self.current_function_mut() {
                function.line_numbers.push((Address(address), line_number));
            }
        } else {
            let handle = self.database.labels.create_symbol(label, self.source);
            if let Some(symbol) = self.database.labels.symbol_from_handle_mut(handle) {
                symbol.address = Some(Address(address));
            }
        }
    }

    fn text_end(&mut self, function_size: u32) {
        if self.state != ImportState::InFunctionBeginning {
            return;
        }
        if let Some(function) = self.current_function_mut() {
            function.size = function_size;
            let address = function.address.map(|a| a.0).unwrap_or(0);
            if let Some(node) = &mut function.node {
                if let NodeData::FunctionDefinition(definition) = &mut node.data {
                    definition.address_range = AddressRange {
                        low: address,
                        high: address + function_size,
                    };
                }
            }
        }
        self.state = ImportState::InFunctionEnd;
    }

    fn function_end(&mut self) {
        self.flush_function();
        self.current_function = None;
        self.state = ImportState::NotInFunction;
    }

    fn flush_function(&mut self) {
        let Some(handle) = self.current_function else {
            return;
        };
        let parameters = std::mem::take(&mut self.current_parameters);
        let locals = std::mem::take(&mut self.current_locals);
        for &parameter in &parameters {
            if let Some(symbol) = self.database.parameter_variables.symbol_from_handle_mut(parameter)
            {
                symbol.function = Some(handle);
            }
        }
        for &local in &locals {
            if let Some(symbol) = self.database.local_variables.symbol_from_handle_mut(local) {
                symbol.function = Some(handle);
            }
        }
        if let Some(function) = self.database.functions.symbol_from_handle_mut(handle) {
            function.parameter_variables = parameters;
            if let Some(node) = &mut function.node {
                if let NodeData::FunctionDefinition(definition) = &mut node.data {
                    definition.locals = locals;
                }
            }
        }
        self.pending_locals.clear();
        self.block_stack.clear();
    }

    fn parameter(
        &mut self,
        symbol: &StabsSymbol,
        offset_or_register: i32,
        is_stack_variable: bool,
        is_by_reference: bool,
    ) {
        if self.current_function.is_none() {
            log::warn!("Parameter symbol before first fun/proc symbol.");
            return;
        }
        let storage = if is_stack_variable {
            VariableStorage::Stack {
                stack_pointer_offset: offset_or_register,
            }
        } else {
            VariableStorage::Register {
                dbx_register_number: offset_or_register,
                is_by_reference,
            }
        };
        let node = self.variable_node(&symbol.ty, VariableClass::Parameter, storage);
        let handle = self
            .database
            .parameter_variables
            .create_symbol(&symbol.name, self.source);
        if let Some(parameter) = self.database.parameter_variables.symbol_from_handle_mut(handle)
        {
            parameter.node = Some(node);
        }
        self.current_parameters.push(handle);
    }

    fn local_variable(&mut self, symbol: &StabsSymbol, storage: VariableStorage, is_static: bool) {
        if self.current_function.is_none() {
            return;
        }
        let mut node = self.variable_node(&symbol.ty, VariableClass::Local, storage);
        if is_static {
            node.storage_class = StorageClass::Static;
        }
        let handle = self
            .database
            .local_variables
            .create_symbol(&symbol.name, self.source);
        if let Some(local) = self.database.local_variables.symbol_from_handle_mut(handle) {
            local.node = Some(node);
        }
        self.pending_locals.push(handle);
        self.current_locals.push(handle);
    }

    fn global_variable(
        &mut self,
        symbol: &StabsSymbol,
        address: Option<Address>,
        location: GlobalStorageLocation,
        is_static: bool,
    ) {
        let storage = VariableStorage::Global { location, address };
        let mut node = self.variable_node(&symbol.ty, VariableClass::Global, storage);
        if is_static {
            node.storage_class = StorageClass::Static;
        }
        let handle = self
            .database
            .global_variables
            .create_symbol(&symbol.name, self.source);
        let demangled = self
            .demangler
            .and_then(|demangle| demangle(&symbol.name));
        let file = self.context.file;
        if let Some(global) = self.database.global_variables.symbol_from_handle_mut(handle) {
            global.node = Some(node);
            global.source_file = Some(file);
            if is_static {
                global.storage_class = StorageClass::Static;
            }
            if let Some(demangled) = demangled {
                global.set_demangled_name(demangled);
            }
        }
        self.global_variables.push(handle);
    }

    fn variable_node(
        &self,
        ty: &StabsType,
        variable_class: VariableClass,
        storage: VariableStorage,
    ) -> Node {
        let variable_type = stabs_type_to_ast_or_error(ty, &self.context);
        Node::new(NodeData::Variable(Variable {
            variable_class,
            storage,
            variable_type,
            data: None,
        }))
    }

    fn lbrac(&mut self, begin_offset: u32) {
        let text_address = self.source_file_mut().text_address;
        let low = text_address.wrapping_add(begin_offset);
        let pending = std::mem::take(&mut self.pending_locals);
        for &local in &pending {
            if let Some(symbol) = self.database.local_variables.symbol_from_handle_mut(local) {
                symbol.live_range = Some(AddressRange { low, high: low });
            }
        }
        self.block_stack.push(pending);
    }

    fn rbrac(&mut self, end_offset: u32) {
        let Some(block) = self.block_stack.pop() else {
            log::warn!("N_RBRAC symbol without a matching N_LBRAC symbol.");
            return;
        };
        let text_address = self.source_file_mut().text_address;
        let high = text_address.wrapping_add(end_offset);
        for local in block {
            if let Some(symbol) = self.database.local_variables.symbol_from_handle_mut(local) {
                if let Some(live_range) = &mut symbol.live_range {
                    live_range.high = high;
                }
            }
        }
    }

    fn finish(&mut self) {
        if self.state == ImportState::InFunctionBeginning {
            log::warn!("Unexpected end of symbol table for translation unit.");
        }
        self.flush_function();
        let functions = std::mem::take(&mut self.functions);
        let global_variables = std::mem::take(&mut self.global_variables);
        let source_file = self.source_file_mut();
        source_file.functions = functions;
        source_file.global_variables = global_variables;
    }

    fn source_file_mut(&mut self) -> &mut SourceFile {
        self.database
            .source_files
            .symbol_from_handle_mut(self.context.file)
            .unwrap()
    }

    fn current_function_mut(&mut self) -> Option<&mut Function> {
        let handle = self.current_function?;
        self.database.functions.symbol_from_handle_mut(handle)
    }
}

fn global_variable_location(symbol_class: SymbolClass) -> Option<GlobalStorageLocation> {
    Some(match symbol_class {
        SymbolClass::Nil => GlobalStorageLocation::Nil,
        SymbolClass::Data => GlobalStorageLocation::Data,
        SymbolClass::Bss => GlobalStorageLocation::Bss,
        SymbolClass::Abs => GlobalStorageLocation::Abs,
        SymbolClass::SData => GlobalStorageLocation::SData,
        SymbolClass::SBss => GlobalStorageLocation::SBss,
        SymbolClass::RData => GlobalStorageLocation::RData,
        SymbolClass::Common => GlobalStorageLocation::Common,
        SymbolClass::SCommon => GlobalStorageLocation::SCommon,
        SymbolClass::SUndefined => GlobalStorageLocation::SUndefined,
        _ => return None,
    })
}

/// Prunes a lowered type according to the importer flags, and renames
/// vtable pointer fields so classes with vtables still deduplicate.
fn apply_importer_flags(node: &mut Node, flags: ImporterFlags) {
    if flags.contains(ImporterFlags::NO_ACCESS_SPECIFIERS) {
        node.access_specifier = AccessSpecifier::Public;
    }
    match &mut node.data {
        NodeData::InlineStructOrUnion(struct_or_union) => {
            for field in &mut struct_or_union.fields {
                if field.name.starts_with("$vf") {
                    field.name = "CCC_VTABLE".to_string();
                }
                apply_importer_flags(field, flags);
            }
            if flags.contains(ImporterFlags::NO_ACCESS_SPECIFIERS) {
                for base_class in &mut struct_or_union.base_classes {
                    base_class.visibility = AccessSpecifier::Public;
                }
            }
            if flags.contains(ImporterFlags::NO_MEMBER_FUNCTIONS) {
                struct_or_union.member_functions.clear();
            } else {
                if flags.contains(ImporterFlags::NO_GENERATED_MEMBER_FUNCTIONS) {
                    strip_generated_member_functions(node.name.as_str(), struct_or_union);
                }
                for function in &mut struct_or_union.member_functions {
                    apply_importer_flags(function, flags);
                }
            }
        }
        NodeData::Array(array) => apply_importer_flags(&mut array.element_type, flags),
        NodeData::BitField(bitfield) => apply_importer_flags(&mut bitfield.underlying_type, flags),
        NodeData::Function(function) => {
            apply_importer_flags(&mut function.return_type, flags);
            if let Some(parameters) = &mut function.parameters {
                for parameter in parameters {
                    apply_importer_flags(parameter, flags);
                }
            }
        }
        NodeData::Pointer(pointer) => apply_importer_flags(&mut pointer.value_type, flags),
        NodeData::Reference(reference) => apply_importer_flags(&mut reference.value_type, flags),
        NodeData::PointerToDataMember(member_pointer) => {
            apply_importer_flags(&mut member_pointer.class_type, flags);
            apply_importer_flags(&mut member_pointer.member_type, flags);
        }
        _ => {}
    }
}

/// When a type's only member functions are ones the compiler would have
/// generated anyway (assignment operators, trivial constructors, `$`-internal
/// helpers), drop them.
fn strip_generated_member_functions(type_name: &str, struct_or_union: &mut InlineStructOrUnion) {
    let name_no_template_args = type_name.split('<').next().unwrap_or(type_name);
    let is_special = |function_node: &Node| {
        let NodeData::Function(function) = &function_node.data else {
            return false;
        };
        function_node.name == "operator="
            || function_node.name.starts_with('$')
            || (function_node.name == name_no_template_args
                && function
                    .parameters
                    .as_ref()
                    .map_or(true, |parameters| parameters.is_empty()))
    };

    let only_special_functions = struct_or_union
        .member_functions
        .iter()
        .all(|function_node| {
            !matches!(function_node.data, NodeData::Function(_)) || is_special(function_node)
        });
    if only_special_functions {
        struct_or_union
            .member_functions
            .retain(|function_node| {
                !matches!(function_node.data, NodeData::Function(_)) || !is_special(function_node)
            });
    }
}

/// Fills in pointers from member function declarations to the functions
/// defining them, by splitting demangled names of the form `Type::name`.
pub fn link_member_function_definitions(database: &mut SymbolDatabase) {
    struct Link {
        function: FunctionHandle,
        type_name: String,
        function_name: String,
    }

    let mut links = Vec::new();
    for function in database.functions.iter() {
        let demangled = function.demangled_name();
        // Strip the argument list, if there is one.
        let demangled = demangled.split('(').next().unwrap_or(demangled);
        let Some(separator) = demangled.rfind("::") else {
            continue;
        };
        if separator == 0 {
            continue;
        }
        let function_name = demangled[separator + 2..].to_string();
        let qualifier = &demangled[..separator];
        // This won't work for some template types, and that's okay.
        let type_name = match qualifier.rfind("::") {
            Some(previous) => qualifier[previous + 2..].to_string(),
            None => qualifier.to_string(),
        };
        links.push(Link {
            function: function.handle(),
            type_name,
            function_name,
        });
    }

    for link in links {
        let data_types = database.data_types.handles_from_name(&link.type_name).to_vec();
        let mut found = false;
        for data_type_handle in data_types {
            let Some(data_type) = database.data_types.symbol_from_handle_mut(data_type_handle)
            else {
                continue;
            };
            let Some(node) = &mut data_type.node else {
                continue;
            };
            let NodeData::InlineStructOrUnion(struct_or_union) = &mut node.data else {
                continue;
            };
            for declaration in &mut struct_or_union.member_functions {
                if declaration.name == link.function_name {
                    if let NodeData::Function(function) = &mut declaration.data {
                        function.definition = Some(link.function);
                        found = true;
                    }
                }
            }
        }
        if found {
            if let Some(function) = database.functions.symbol_from_handle_mut(link.function) {
                if let Some(node) = &mut function.node {
                    if let NodeData::FunctionDefinition(definition) = &mut node.data {
                        definition.is_member_function_ish = true;
                    }
                }
            }
        }
    }
}
