//! Prints recovered symbols back out as C++.

use mdebug::ast::*;
use mdebug::database::{DataType, Function, GlobalVariable, SymbolDatabase, SymbolKind};
use mdebug::registers::{map_dbx_register_index, register_name};
use std::io::{Result, Write};

/// Options for the C++ printer.
#[derive(Default)]
pub struct CppPrinterConfig {
    /// Prefix members with `/* offset size */` comments.
    pub print_offsets_and_sizes: bool,
    /// Prefix variables with comments describing where they live.
    pub print_storage_information: bool,
    /// Skip `public:`/`protected:`/`private:` lines.
    pub omit_access_specifiers: bool,
}

/// Prints AST nodes and symbols as C++ declarations.
pub struct CppPrinter<'a, W: Write> {
    out: &'a mut W,
    config: CppPrinterConfig,
}

impl<'a, W: Write> CppPrinter<'a, W> {
    /// Creates a printer writing to the given stream.
    pub fn new(out: &'a mut W, config: CppPrinterConfig) -> Self {
        Self { out, config }
    }

    /// Prints a top-level data type, with a comment naming the files it came
    /// from and any conflict recorded on it.
    pub fn data_type(&mut self, data_type: &DataType, database: &SymbolDatabase) -> Result<()> {
        let Some(node) = &data_type.node else {
            return Ok(());
        };
        if data_type.conflict {
            writeln!(
                self.out,
                "// warning: multiple differing types with the same name (diff'd {})",
                data_type.compare_fail_reason.unwrap_or("structure")
            )?;
        }
        if data_type.files.len() == 1 {
            let file = database
                .source_files
                .symbol_from_handle(data_type.files[0]);
            if let Some(file) = file {
                writeln!(self.out, "// {}", file.full_path())?;
            }
        }
        if node.storage_class == StorageClass::Typedef {
            write!(self.out, "typedef ")?;
            match &node.data {
                // The alias name goes after the body.
                NodeData::InlineEnum(_) | NodeData::InlineStructOrUnion(_) => {
                    self.node(node, "", 0)?;
                    write!(self.out, " {}", data_type.name())?;
                }
                _ => self.node(node, data_type.name(), 0)?,
            }
        } else {
            self.node(node, data_type.name(), 0)?;
        }
        writeln!(self.out, ";")?;
        Ok(())
    }

    /// Prints a function as a declaration, with its parameters and locals.
    pub fn function(&mut self, function: &Function, database: &SymbolDatabase) -> Result<()> {
        if self.config.print_storage_information {
            if let Some(range) = function.address_range() {
                write!(self.out, "/* {:#010x} {:#x} */ ", range.low, range.high - range.low)?;
            }
        }
        if function.storage_class == StorageClass::Static {
            write!(self.out, "static ")?;
        }
        let return_type = function.node.as_ref().and_then(|node| match &node.data {
            NodeData::FunctionDefinition(definition) => Some(&definition.function_type),
            _ => None,
        });
        match return_type {
            Some(return_type) => self.node(return_type, "", 0)?,
            None => write!(self.out, "void")?,
        }
        write!(self.out, " {}(", function.demangled_name())?;
        for (i, &parameter) in function.parameter_variables.iter().enumerate() {
            if i != 0 {
                write!(self.out, ", ")?;
            }
            let Some(parameter) = database.parameter_variables.symbol_from_handle(parameter)
            else {
                continue;
            };
            match parameter.node.as_ref().map(|node| &node.data) {
                Some(NodeData::Variable(variable)) => {
                    self.node(&variable.variable_type, parameter.name(), 0)?;
                }
                _ => write!(self.out, "{}", parameter.name())?,
            }
        }
        write!(self.out, ")")?;

        let locals = function.local_variables();
        if locals.is_empty() {
            writeln!(self.out, ";")?;
            return Ok(());
        }
        writeln!(self.out, " {{")?;
        for &local in locals {
            let Some(local) = database.local_variables.symbol_from_handle(local) else {
                continue;
            };
            let Some(NodeData::Variable(variable)) = local.node.as_ref().map(|node| &node.data)
            else {
                continue;
            };
            self.indent(1)?;
            if self.config.print_storage_information {
                self.storage_comment(&variable.storage)?;
            }
            if local
                .node
                .as_ref()
                .map(|node| node.storage_class == StorageClass::Static)
                .unwrap_or(false)
            {
                write!(self.out, "static ")?;
            }
            self.node(&variable.variable_type, local.name(), 1)?;
            writeln!(self.out, ";")?;
        }
        writeln!(self.out, "}}")?;
        Ok(())
    }

    /// Prints a global variable declaration.
    pub fn global_variable(&mut self, global: &GlobalVariable) -> Result<()> {
        let Some(NodeData::Variable(variable)) = global.node.as_ref().map(|node| &node.data)
        else {
            return Ok(());
        };
        if self.config.print_storage_information {
            self.storage_comment(&variable.storage)?;
        }
        if global.storage_class == StorageClass::Static {
            write!(self.out, "static ")?;
        }
        self.node(&variable.variable_type, global.demangled_name(), 0)?;
        writeln!(self.out, ";")?;
        Ok(())
    }

    fn storage_comment(&mut self, storage: &VariableStorage) -> Result<()> {
        match storage {
            VariableStorage::Global { location, address } => {
                write!(self.out, "/* {}", location.to_str())?;
                if let Some(address) = address {
                    write!(self.out, " {}", address)?;
                }
                write!(self.out, " */ ")?;
            }
            VariableStorage::Register {
                dbx_register_number,
                is_by_reference,
            } => {
                let (register_class, index) = map_dbx_register_index(*dbx_register_number);
                let name = register_name(register_class, index).unwrap_or("?");
                write!(self.out, "/* {} {}", name, dbx_register_number)?;
                if *is_by_reference {
                    write!(self.out, " by reference")?;
                }
                write!(self.out, " */ ")?;
            }
            VariableStorage::Stack {
                stack_pointer_offset,
            } => {
                if *stack_pointer_offset >= 0 {
                    write!(self.out, "/* {:#x}(sp) */ ", stack_pointer_offset)?;
                } else {
                    write!(self.out, "/* -{:#x}(sp) */ ", -stack_pointer_offset)?;
                }
            }
        }
        Ok(())
    }

    /// Prints one node as a declaration of `name`, without the trailing
    /// semicolon.
    fn node(&mut self, node: &Node, name: &str, indent: usize) -> Result<()> {
        if node.is_const {
            write!(self.out, "const ")?;
        }
        if node.is_volatile {
            write!(self.out, "volatile ")?;
        }
        match &node.data {
            NodeData::Array(array) => {
                let suffixed = format!("{}[{}]", name, array.element_count);
                self.node(&array.element_type, &suffixed, indent)?;
            }
            NodeData::BitField(bitfield) => {
                self.node(&bitfield.underlying_type, name, indent)?;
                write!(self.out, " : {}", node.size_bits)?;
            }
            NodeData::BuiltIn(builtin) => {
                self.write_named(builtin_keyword(builtin.bclass), name)?;
            }
            NodeData::Data | NodeData::InitializerList(_) => {
                self.write_named("/* data */", name)?;
            }
            NodeData::Function(function) => {
                self.node(&function.return_type, "", indent)?;
                write!(self.out, " {}(", name)?;
                if let Some(parameters) = &function.parameters {
                    for (i, parameter) in parameters.iter().enumerate() {
                        if i != 0 {
                            write!(self.out, ", ")?;
                        }
                        self.node(parameter, "", indent)?;
                    }
                } else {
                    write!(self.out, "/* parameters unknown */")?;
                }
                write!(self.out, ")")?;
            }
            NodeData::FunctionDefinition(definition) => {
                self.node(&definition.function_type, name, indent)?;
            }
            NodeData::InlineEnum(inline_enum) => {
                write!(self.out, "enum")?;
                if !name.is_empty() {
                    write!(self.out, " {}", name)?;
                }
                writeln!(self.out, " {{")?;
                for (i, (value, constant)) in inline_enum.constants.iter().enumerate() {
                    self.indent(indent + 1)?;
                    write!(self.out, "{} = {}", constant, value)?;
                    if i + 1 != inline_enum.constants.len() {
                        write!(self.out, ",")?;
                    }
                    writeln!(self.out)?;
                }
                self.indent(indent)?;
                write!(self.out, "}}")?;
            }
            NodeData::InlineStructOrUnion(struct_or_union) => {
                self.struct_or_union(struct_or_union, name, indent)?;
            }
            NodeData::Pointer(pointer) => {
                let pointed = format!("*{}", name);
                match pointer.value_type.data {
                    NodeData::Function(_) => {
                        let wrapped = format!("({})", pointed);
                        self.node(&pointer.value_type, &wrapped, indent)?;
                    }
                    _ => self.node(&pointer.value_type, &pointed, indent)?,
                }
            }
            NodeData::PointerToDataMember(member_pointer) => {
                self.node(&member_pointer.member_type, "", indent)?;
                write!(self.out, " ")?;
                self.node(&member_pointer.class_type, "", indent)?;
                write!(self.out, "::*{}", name)?;
            }
            NodeData::Reference(reference) => {
                let referenced = format!("&{}", name);
                self.node(&reference.value_type, &referenced, indent)?;
            }
            NodeData::SourceFile(source_file) => {
                write!(self.out, "/* {} */", source_file.relative_path)?;
            }
            NodeData::TypeName(type_name) => {
                self.write_named(&type_name.type_name, name)?;
            }
            NodeData::Variable(variable) => {
                self.node(&variable.variable_type, name, indent)?;
            }
        }
        Ok(())
    }

    fn struct_or_union(
        &mut self,
        struct_or_union: &InlineStructOrUnion,
        name: &str,
        indent: usize,
    ) -> Result<()> {
        write!(
            self.out,
            "{}",
            if struct_or_union.is_struct {
                "struct"
            } else {
                "union"
            }
        )?;
        if !name.is_empty() {
            write!(self.out, " {}", name)?;
        }
        for (i, base_class) in struct_or_union.base_classes.iter().enumerate() {
            write!(self.out, "{}", if i == 0 { " : " } else { ", " })?;
            if self.config.print_offsets_and_sizes {
                write!(self.out, "/* {:#x} */ ", base_class.offset)?;
            }
            if !self.config.omit_access_specifiers {
                write!(self.out, "{} ", base_class.visibility.to_str())?;
            }
            write!(self.out, "{}", base_class.type_name)?;
        }
        writeln!(self.out, " {{")?;

        let mut access = AccessSpecifier::Public;
        for field in &struct_or_union.fields {
            self.access_specifier(&mut access, field.access_specifier, indent)?;
            self.indent(indent + 1)?;
            self.member_comment(field)?;
            if field.storage_class == StorageClass::Static {
                write!(self.out, "static ")?;
            }
            self.node(field, &field.name, indent + 1)?;
            writeln!(self.out, ";")?;
        }
        for function in &struct_or_union.member_functions {
            self.access_specifier(&mut access, function.access_specifier, indent)?;
            self.indent(indent + 1)?;
            if let NodeData::Function(f) = &function.data {
                if f.modifier == stabs::MemberFunctionModifier::Static {
                    write!(self.out, "static ")?;
                }
                if f.modifier == stabs::MemberFunctionModifier::Virtual {
                    write!(self.out, "virtual ")?;
                }
            }
            self.node(function, &function.name, indent + 1)?;
            if function.is_const {
                write!(self.out, " const")?;
            }
            writeln!(self.out, ";")?;
        }
        self.indent(indent)?;
        write!(self.out, "}}")?;
        Ok(())
    }

    fn access_specifier(
        &mut self,
        current: &mut AccessSpecifier,
        wanted: AccessSpecifier,
        indent: usize,
    ) -> Result<()> {
        if self.config.omit_access_specifiers || *current == wanted {
            return Ok(());
        }
        self.indent(indent)?;
        writeln!(self.out, "{}:", wanted.to_str())?;
        *current = wanted;
        Ok(())
    }

    fn member_comment(&mut self, node: &Node) -> Result<()> {
        if !self.config.print_offsets_and_sizes {
            return Ok(());
        }
        if node.storage_class == StorageClass::Static || node.absolute_offset_bytes < 0 {
            return Ok(());
        }
        write!(self.out, "/* {:#x}", node.absolute_offset_bytes)?;
        if let NodeData::BitField(_) = node.data {
            write!(self.out, ":{}", node.bitfield_offset_bits)?;
        }
        write!(self.out, " */ ")?;
        Ok(())
    }

    fn write_named(&mut self, type_text: &str, name: &str) -> Result<()> {
        write!(self.out, "{}", type_text)?;
        if !name.is_empty() {
            write!(self.out, " {}", name)?;
        }
        Ok(())
    }

    fn indent(&mut self, level: usize) -> Result<()> {
        for _ in 0..level {
            write!(self.out, "\t")?;
        }
        Ok(())
    }
}

fn builtin_keyword(bclass: BuiltInClass) -> &'static str {
    match bclass {
        BuiltInClass::Void => "void",
        BuiltInClass::Unsigned8 => "unsigned char",
        BuiltInClass::Signed8 => "signed char",
        BuiltInClass::Unqualified8 => "char",
        BuiltInClass::Bool8 => "bool",
        BuiltInClass::Unsigned16 => "unsigned short",
        BuiltInClass::Signed16 => "short",
        BuiltInClass::Unsigned32 => "unsigned int",
        BuiltInClass::Signed32 => "int",
        BuiltInClass::Float32 => "float",
        BuiltInClass::Unsigned64 => "unsigned long",
        BuiltInClass::Signed64 => "long",
        BuiltInClass::Float64 => "double",
        BuiltInClass::Unsigned128 => "unsigned int128",
        BuiltInClass::Signed128 => "int128",
        BuiltInClass::Unqualified128 => "int128",
        BuiltInClass::Float128 => "float128",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdebug::ast::{InlineEnum, Node, NodeData};

    fn print_node(node: &Node, name: &str) -> String {
        let mut out = Vec::new();
        let mut printer = CppPrinter::new(&mut out, CppPrinterConfig::default());
        printer.node(node, name, 0).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn pointer_declaration() {
        let node = Node::new(NodeData::Pointer(Pointer {
            value_type: Box::new(Node::type_name("char", TypeNameSource::User)),
        }));
        assert_eq!(print_node(&node, "c"), "char *c");
    }

    #[test]
    fn array_declaration() {
        let node = Node::new(NodeData::Array(Array {
            element_type: Box::new(Node::type_name("int", TypeNameSource::User)),
            element_count: 4,
        }));
        assert_eq!(print_node(&node, "values"), "int values[4]");
    }

    #[test]
    fn enum_body() {
        let node = Node::new(NodeData::InlineEnum(InlineEnum {
            constants: vec![(0, "A".to_string()), (1, "B".to_string())],
        }));
        let printed = print_node(&node, "E");
        assert!(printed.starts_with("enum E {"));
        assert!(printed.contains("A = 0,"));
        assert!(printed.contains("B = 1"));
    }
}
