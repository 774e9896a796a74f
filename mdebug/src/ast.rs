//! The language-neutral AST that STABS types are lowered into.
//!
//! Nodes own their children outright, so the tree never aliases; recursive
//! and shared type topology is re-expressed with [`TypeName`] placeholders
//! that name the referenced type instead of embedding it.

use crate::database::{FunctionHandle, LocalVariableHandle, SourceFileHandle};
use crate::{Address, AddressRange};
use stabs::{MemberFunctionModifier, StabsVisibility, TypeNumber};

/// One AST node. The fields shared by all descriptors live here; descriptor
/// specific data lives in [`NodeData`].
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// The name of the entity the node describes, empty if it has none.
    pub name: String,
    /// Storage class, e.g. `typedef` for type names or `static` for static
    /// members.
    pub storage_class: StorageClass,
    /// C++ access specifier, for members of a class.
    pub access_specifier: AccessSpecifier,
    /// Whether the type is const qualified.
    pub is_const: bool,
    /// Whether the type is volatile qualified.
    pub is_volatile: bool,
    /// Byte offset of a field from the start of its directly enclosing type,
    /// or -1.
    pub relative_offset_bytes: i32,
    /// Byte offset of a field from the start of the outermost enclosing
    /// non-inline type, or -1.
    pub absolute_offset_bytes: i32,
    /// Bit offset of a bitfield within its storage unit, or -1.
    pub bitfield_offset_bits: i32,
    /// Size in bits, or -1 if unknown.
    pub size_bits: i32,
    /// Set by the deduplicator when differing types share this node's name.
    pub conflict: bool,
    /// Why the deduplicator considered this node different from its
    /// namesakes.
    pub compare_fail_reason: Option<&'static str>,
    /// Descriptor-specific data.
    pub data: NodeData,
}

impl Node {
    /// Creates a node with no name, offsets or qualifiers.
    pub fn new(data: NodeData) -> Self {
        Self {
            name: String::new(),
            storage_class: StorageClass::None,
            access_specifier: AccessSpecifier::Public,
            is_const: false,
            is_volatile: false,
            relative_offset_bytes: -1,
            absolute_offset_bytes: -1,
            bitfield_offset_bits: -1,
            size_bits: -1,
            conflict: false,
            compare_fail_reason: None,
            data,
        }
    }

    /// Creates a type name node referencing a type by name only.
    pub fn type_name(name: impl Into<String>, source: TypeNameSource) -> Self {
        Self::new(NodeData::TypeName(TypeName {
            type_name: name.into(),
            source,
            referenced_file: None,
            referenced_number: TypeNumber::default(),
        }))
    }

    /// The descriptor string used by the presentation layers.
    pub fn descriptor_name(&self) -> &'static str {
        match &self.data {
            NodeData::Array(_) => "array",
            NodeData::BitField(_) => "bitfield",
            NodeData::BuiltIn(_) => "builtin",
            NodeData::Data => "data",
            NodeData::Function(_) => "function",
            NodeData::FunctionDefinition(_) => "function_definition",
            NodeData::InitializerList(_) => "initializer_list",
            NodeData::InlineEnum(_) => "enum",
            NodeData::InlineStructOrUnion(sou) => {
                if sou.is_struct {
                    "struct"
                } else {
                    "union"
                }
            }
            NodeData::Pointer(_) => "pointer",
            NodeData::PointerToDataMember(_) => "pointer_to_data_member",
            NodeData::Reference(_) => "reference",
            NodeData::SourceFile(_) => "source_file",
            NodeData::TypeName(_) => "type_name",
            NodeData::Variable(_) => "variable",
        }
    }
}

/// Descriptor-specific node data. This is a closed set: adding a descriptor
/// requires coordinated changes to lowering, comparison and presentation.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeData {
    /// A fixed-length array.
    Array(Array),
    /// A field whose offset or size is not byte-aligned.
    BitField(BitField),
    /// A fundamental type.
    BuiltIn(BuiltIn),
    /// Raw bytes of an initialized value.
    Data,
    /// A function type.
    Function(Function),
    /// A function symbol's definition: its type, address range and locals.
    FunctionDefinition(FunctionDefinition),
    /// A brace-enclosed initializer.
    InitializerList(InitializerList),
    /// An enum defined in place.
    InlineEnum(InlineEnum),
    /// A struct, class or union defined in place.
    InlineStructOrUnion(InlineStructOrUnion),
    /// A pointer.
    Pointer(Pointer),
    /// A pointer to a non-static data member.
    PointerToDataMember(PointerToDataMember),
    /// A C++ reference.
    Reference(Reference),
    /// A source file, for presentation layers that emit per-file trees.
    SourceFile(SourceFileNode),
    /// A reference to a type by name.
    TypeName(TypeName),
    /// A global, local or parameter variable.
    Variable(Variable),
}

/// A fixed-length array.
#[derive(Clone, Debug, PartialEq)]
pub struct Array {
    /// The element type.
    pub element_type: Box<Node>,
    /// The number of elements.
    pub element_count: i32,
}

/// A field whose offset or size is not byte-aligned.
#[derive(Clone, Debug, PartialEq)]
pub struct BitField {
    /// The declared type of the bitfield.
    pub underlying_type: Box<Node>,
}

/// A fundamental type.
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltIn {
    /// Which fundamental type.
    pub bclass: BuiltInClass,
}

/// A function type.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    /// The return type.
    pub return_type: Box<Node>,
    /// Parameter types, absent when the source format did not encode them.
    pub parameters: Option<Vec<Node>>,
    /// Whether a member function is static or virtual.
    pub modifier: MemberFunctionModifier,
    /// Whether a member function is a constructor.
    pub is_constructor: bool,
    /// The vtable index of a virtual member function.
    pub vtable_index: Option<i32>,
    /// The function symbol defining this member function, filled in after
    /// import by matching demangled names.
    pub definition: Option<FunctionHandle>,
}

/// A function symbol's definition.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDefinition {
    /// The addresses the function's code occupies.
    pub address_range: AddressRange,
    /// The function's type. The return type is all the symbol table encodes.
    pub function_type: Box<Node>,
    /// The function's local variables.
    pub locals: Vec<LocalVariableHandle>,
    /// Whether a member function declaration was found that this function
    /// defines.
    pub is_member_function_ish: bool,
}

/// A brace-enclosed initializer.
#[derive(Clone, Debug, PartialEq)]
pub struct InitializerList {
    /// The elements of the initializer.
    pub children: Vec<Node>,
}

/// An enum defined in place.
#[derive(Clone, Debug, PartialEq)]
pub struct InlineEnum {
    /// `(value, name)` pairs in declaration order.
    pub constants: Vec<(i32, String)>,
}

/// A struct, class or union defined in place.
#[derive(Clone, Debug, PartialEq)]
pub struct InlineStructOrUnion {
    /// Whether this is a struct or class rather than a union.
    pub is_struct: bool,
    /// Base classes, each referenced by name.
    pub base_classes: Vec<BaseClass>,
    /// Data members in declaration order.
    pub fields: Vec<Node>,
    /// Member functions, with overload sets flattened into siblings.
    pub member_functions: Vec<Node>,
}

/// A base class reference.
#[derive(Clone, Debug, PartialEq)]
pub struct BaseClass {
    /// The access specifier of the inheritance.
    pub visibility: AccessSpecifier,
    /// Byte offset of the base class subobject.
    pub offset: i32,
    /// The name of the base class.
    pub type_name: String,
}

/// A pointer.
#[derive(Clone, Debug, PartialEq)]
pub struct Pointer {
    /// The pointed-to type.
    pub value_type: Box<Node>,
}

/// A pointer to a non-static data member.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerToDataMember {
    /// The class containing the member.
    pub class_type: Box<Node>,
    /// The type of the member.
    pub member_type: Box<Node>,
}

/// A C++ reference.
#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
    /// The referenced type.
    pub value_type: Box<Node>,
}

/// A source file, for presentation layers that emit per-file trees.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceFileNode {
    /// The path of the file as recorded in the symbol table.
    pub relative_path: String,
    /// The address of the file's text.
    pub text_address: u32,
}

/// A reference to a type by name.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeName {
    /// The name of the referenced type.
    pub type_name: String,
    /// Where the name came from.
    pub source: TypeNameSource,
    /// The file whose type numbers `referenced_number` is relative to, when
    /// the name was produced by type number substitution.
    pub referenced_file: Option<SourceFileHandle>,
    /// The number of the referenced type within `referenced_file`.
    pub referenced_number: TypeNumber,
}

/// Where a type name node came from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TypeNameSource {
    /// A name written in the source program, e.g. a cross reference.
    User,
    /// An error placeholder materialized into the tree so that presentation
    /// keeps working on partial data.
    Error,
    /// A name substituted for a type number reference.
    StabsTypeNumber,
}

impl TypeNameSource {
    /// The string used by the presentation layers.
    pub fn to_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Error => "error",
            Self::StabsTypeNumber => "stabs_type_number",
        }
    }
}

/// A global, local or parameter variable.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    /// What kind of variable this is.
    pub variable_class: VariableClass,
    /// Where the variable lives.
    pub storage: VariableStorage,
    /// The variable's type.
    pub variable_type: Box<Node>,
    /// The variable's initialized value, when it has been recovered.
    pub data: Option<Box<Node>>,
}

/// What kind of variable a [`Variable`] node describes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VariableClass {
    /// A global variable.
    Global,
    /// A function-local variable.
    Local,
    /// A function parameter.
    Parameter,
}

impl VariableClass {
    /// The string used by the presentation layers.
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Local => "local",
            Self::Parameter => "parameter",
        }
    }
}

/// Where a variable lives.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VariableStorage {
    /// A variable with a fixed address.
    Global {
        /// Which section or address space the variable is in.
        location: GlobalStorageLocation,
        /// The variable's address, when known.
        address: Option<Address>,
    },
    /// A variable held in a register.
    Register {
        /// The dbx register number, resolved through a fixed table to a
        /// register class and index.
        dbx_register_number: i32,
        /// Whether the register holds a pointer to the value.
        is_by_reference: bool,
    },
    /// A variable on the stack.
    Stack {
        /// Offset from the stack pointer, possibly negative.
        stack_pointer_offset: i32,
    },
}

/// Which section or address space a global variable is in.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GlobalStorageLocation {
    /// Unknown.
    Nil,
    /// `.data`
    Data,
    /// `.bss`
    Bss,
    /// An absolute value.
    Abs,
    /// `.sdata`
    SData,
    /// `.sbss`
    SBss,
    /// `.rodata`
    RData,
    /// A common block.
    Common,
    /// A small common block.
    SCommon,
    /// A small undefined symbol.
    SUndefined,
}

impl GlobalStorageLocation {
    /// The string used by the presentation layers.
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Data => "data",
            Self::Bss => "bss",
            Self::Abs => "abs",
            Self::SData => "sdata",
            Self::SBss => "sbss",
            Self::RData => "rdata",
            Self::Common => "common",
            Self::SCommon => "scommon",
            Self::SUndefined => "sundefined",
        }
    }
}

/// Storage classes a symbol can be declared with.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum StorageClass {
    /// No storage class.
    #[default]
    None,
    /// `typedef`
    Typedef,
    /// `extern`
    Extern,
    /// `static`
    Static,
    /// `auto`
    Auto,
    /// `register`
    Register,
}

impl StorageClass {
    /// The keyword, or an empty string for none.
    pub fn to_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Typedef => "typedef",
            Self::Extern => "extern",
            Self::Static => "static",
            Self::Auto => "auto",
            Self::Register => "register",
        }
    }
}

/// C++ access specifiers.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum AccessSpecifier {
    /// `public`
    #[default]
    Public,
    /// `protected`
    Protected,
    /// `private`
    Private,
}

impl AccessSpecifier {
    /// The keyword.
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }

    /// Maps a STABS visibility character to an access specifier. Members
    /// with no visibility and ones the compiler optimized out are treated as
    /// public.
    pub fn from_stabs_visibility(visibility: StabsVisibility) -> Self {
        match visibility {
            StabsVisibility::None => Self::Public,
            StabsVisibility::Private => Self::Private,
            StabsVisibility::Protected => Self::Protected,
            StabsVisibility::Public => Self::Public,
            StabsVisibility::PublicOptimizedOut => Self::Public,
        }
    }
}

/// The fundamental types.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum BuiltInClass {
    Void,
    Unsigned8,
    Signed8,
    Unqualified8,
    Bool8,
    Unsigned16,
    Signed16,
    Unsigned32,
    Signed32,
    Float32,
    Unsigned64,
    Signed64,
    Float64,
    Unsigned128,
    Signed128,
    Unqualified128,
    Float128,
}

impl BuiltInClass {
    /// A human-readable description.
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Unsigned8 => "8-bit unsigned integer",
            Self::Signed8 => "8-bit signed integer",
            Self::Unqualified8 => "8-bit integer",
            Self::Bool8 => "8-bit boolean",
            Self::Unsigned16 => "16-bit unsigned integer",
            Self::Signed16 => "16-bit signed integer",
            Self::Unsigned32 => "32-bit unsigned integer",
            Self::Signed32 => "32-bit signed integer",
            Self::Float32 => "32-bit floating point",
            Self::Unsigned64 => "64-bit unsigned integer",
            Self::Signed64 => "64-bit signed integer",
            Self::Float64 => "64-bit floating point",
            Self::Unsigned128 => "128-bit unsigned integer",
            Self::Signed128 => "128-bit signed integer",
            Self::Unqualified128 => "128-bit integer",
            Self::Float128 => "128-bit floating point",
        }
    }

    /// The size of the type in bytes.
    pub fn size_bytes(self) -> i32 {
        match self {
            Self::Void => 0,
            Self::Unsigned8 | Self::Signed8 | Self::Unqualified8 | Self::Bool8 => 1,
            Self::Unsigned16 | Self::Signed16 => 2,
            Self::Unsigned32 | Self::Signed32 | Self::Float32 => 4,
            Self::Unsigned64 | Self::Signed64 | Self::Float64 => 8,
            Self::Unsigned128 | Self::Signed128 | Self::Unqualified128 | Self::Float128 => 16,
        }
    }
}

/// Why two nodes with the same name failed structural comparison.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum CompareFailReason {
    Descriptor,
    StorageClass,
    Name,
    RelativeOffsetBytes,
    AbsoluteOffsetBytes,
    BitfieldOffsetBits,
    SizeBits,
    ArrayElementCount,
    BuiltinClass,
    FunctionParameterSize,
    FunctionParametersHasValue,
    FunctionModifier,
    FunctionIsConstructor,
    EnumConstants,
    BaseClassSize,
    BaseClassVisibility,
    BaseClassOffset,
    BaseClassTypeName,
    FieldsSize,
    MemberFunctionSize,
    TypeName,
}

impl CompareFailReason {
    /// The human-readable reason string recorded on conflicting types.
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Descriptor => "descriptors",
            Self::StorageClass => "storage classes",
            Self::Name => "names",
            Self::RelativeOffsetBytes => "relative offsets",
            Self::AbsoluteOffsetBytes => "absolute offsets",
            Self::BitfieldOffsetBits => "bitfield offsets",
            Self::SizeBits => "sizes",
            Self::ArrayElementCount => "array element counts",
            Self::BuiltinClass => "builtin class",
            Self::FunctionParameterSize => "function parameter sizes",
            Self::FunctionParametersHasValue => "function parameters",
            Self::FunctionModifier => "function modifier",
            Self::FunctionIsConstructor => "function is constructor",
            Self::EnumConstants => "enum constants",
            Self::BaseClassSize => "base class sizes",
            Self::BaseClassVisibility => "base class visibility values",
            Self::BaseClassOffset => "base class offsets",
            Self::BaseClassTypeName => "base class type names",
            Self::FieldsSize => "fields sizes",
            Self::MemberFunctionSize => "member function sizes",
            Self::TypeName => "type name",
        }
    }
}

/// Structurally compares two nodes, recursing through children in
/// declaration order. Returns `None` when the nodes match, or the first
/// reason they differ. Orderings are never canonicalized.
///
/// When `check_intrusive_fields` is false the fields that legitimately vary
/// between a typedef and the type it names (storage class, name, offsets)
/// are ignored at the top level; children are always compared fully.
pub fn compare_nodes(
    lhs: &Node,
    rhs: &Node,
    check_intrusive_fields: bool,
) -> Option<CompareFailReason> {
    macro_rules! check_child {
        ($lhs:expr, $rhs:expr) => {
            if let Some(reason) = compare_nodes($lhs, $rhs, true) {
                return Some(reason);
            }
        };
    }
    if std::mem::discriminant(&lhs.data) != std::mem::discriminant(&rhs.data) {
        return Some(CompareFailReason::Descriptor);
    }
    if check_intrusive_fields {
        if lhs.storage_class != rhs.storage_class {
            return Some(CompareFailReason::StorageClass);
        }
        if lhs.name != rhs.name {
            return Some(CompareFailReason::Name);
        }
        if lhs.relative_offset_bytes != rhs.relative_offset_bytes {
            return Some(CompareFailReason::RelativeOffsetBytes);
        }
        if lhs.absolute_offset_bytes != rhs.absolute_offset_bytes {
            return Some(CompareFailReason::AbsoluteOffsetBytes);
        }
        if lhs.bitfield_offset_bits != rhs.bitfield_offset_bits {
            return Some(CompareFailReason::BitfieldOffsetBits);
        }
        if lhs.size_bits != rhs.size_bits {
            return Some(CompareFailReason::SizeBits);
        }
    }
    // The conflict flag and fail reason are intentionally not compared.
    match (&lhs.data, &rhs.data) {
        (NodeData::Array(lhs), NodeData::Array(rhs)) => {
            check_child!(&lhs.element_type, &rhs.element_type);
            if lhs.element_count != rhs.element_count {
                return Some(CompareFailReason::ArrayElementCount);
            }
        }
        (NodeData::BitField(lhs), NodeData::BitField(rhs)) => {
            check_child!(&lhs.underlying_type, &rhs.underlying_type);
        }
        (NodeData::BuiltIn(lhs), NodeData::BuiltIn(rhs)) => {
            if lhs.bclass != rhs.bclass {
                return Some(CompareFailReason::BuiltinClass);
            }
        }
        (NodeData::Data, NodeData::Data) => {}
        (NodeData::Function(lhs), NodeData::Function(rhs)) => {
            check_child!(&lhs.return_type, &rhs.return_type);
            match (&lhs.parameters, &rhs.parameters) {
                (Some(lhs_params), Some(rhs_params)) => {
                    if lhs_params.len() != rhs_params.len() {
                        return Some(CompareFailReason::FunctionParameterSize);
                    }
                    for (lhs_param, rhs_param) in lhs_params.iter().zip(rhs_params) {
                        check_child!(lhs_param, rhs_param);
                    }
                }
                (None, None) => {}
                _ => return Some(CompareFailReason::FunctionParametersHasValue),
            }
            if lhs.modifier != rhs.modifier {
                return Some(CompareFailReason::FunctionModifier);
            }
            if lhs.is_constructor != rhs.is_constructor {
                return Some(CompareFailReason::FunctionIsConstructor);
            }
        }
        (NodeData::FunctionDefinition(lhs), NodeData::FunctionDefinition(rhs)) => {
            check_child!(&lhs.function_type, &rhs.function_type);
        }
        (NodeData::InitializerList(lhs), NodeData::InitializerList(rhs)) => {
            if lhs.children.len() != rhs.children.len() {
                return Some(CompareFailReason::FieldsSize);
            }
            for (lhs_child, rhs_child) in lhs.children.iter().zip(&rhs.children) {
                check_child!(lhs_child, rhs_child);
            }
        }
        (NodeData::InlineEnum(lhs), NodeData::InlineEnum(rhs)) => {
            if lhs.constants != rhs.constants {
                return Some(CompareFailReason::EnumConstants);
            }
        }
        (NodeData::InlineStructOrUnion(lhs), NodeData::InlineStructOrUnion(rhs)) => {
            if lhs.is_struct != rhs.is_struct {
                return Some(CompareFailReason::Descriptor);
            }
            if lhs.base_classes.len() != rhs.base_classes.len() {
                return Some(CompareFailReason::BaseClassSize);
            }
            for (lhs_base, rhs_base) in lhs.base_classes.iter().zip(&rhs.base_classes) {
                if lhs_base.visibility != rhs_base.visibility {
                    return Some(CompareFailReason::BaseClassVisibility);
                }
                if lhs_base.offset != rhs_base.offset {
                    return Some(CompareFailReason::BaseClassOffset);
                }
                if lhs_base.type_name != rhs_base.type_name {
                    return Some(CompareFailReason::BaseClassTypeName);
                }
            }
            if lhs.fields.len() != rhs.fields.len() {
                return Some(CompareFailReason::FieldsSize);
            }
            for (lhs_field, rhs_field) in lhs.fields.iter().zip(&rhs.fields) {
                check_child!(lhs_field, rhs_field);
            }
            if lhs.member_functions.len() != rhs.member_functions.len() {
                return Some(CompareFailReason::MemberFunctionSize);
            }
            for (lhs_func, rhs_func) in lhs.member_functions.iter().zip(&rhs.member_functions) {
                check_child!(lhs_func, rhs_func);
            }
        }
        (NodeData::Pointer(lhs), NodeData::Pointer(rhs)) => {
            check_child!(&lhs.value_type, &rhs.value_type);
        }
        (NodeData::PointerToDataMember(lhs), NodeData::PointerToDataMember(rhs)) => {
            check_child!(&lhs.class_type, &rhs.class_type);
            check_child!(&lhs.member_type, &rhs.member_type);
        }
        (NodeData::Reference(lhs), NodeData::Reference(rhs)) => {
            check_child!(&lhs.value_type, &rhs.value_type);
        }
        (NodeData::SourceFile(lhs), NodeData::SourceFile(rhs)) => {
            if lhs.relative_path != rhs.relative_path {
                return Some(CompareFailReason::Name);
            }
        }
        (NodeData::TypeName(lhs), NodeData::TypeName(rhs)) => {
            // The source, file and number are not compared: the whole point
            // of comparing nodes is to merge matching types from different
            // translation units, and those vary between files.
            if lhs.type_name != rhs.type_name {
                return Some(CompareFailReason::TypeName);
            }
        }
        (NodeData::Variable(lhs), NodeData::Variable(rhs)) => {
            if lhs.variable_class != rhs.variable_class || lhs.storage != rhs.storage {
                return Some(CompareFailReason::StorageClass);
            }
            check_child!(&lhs.variable_type, &rhs.variable_type);
        }
        _ => unreachable!("descriptor discriminants already compared"),
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, offset_bytes: i32, size_bits: i32) -> Node {
        let mut node = Node::type_name("int", TypeNameSource::StabsTypeNumber);
        node.name = name.to_string();
        node.relative_offset_bytes = offset_bytes;
        node.absolute_offset_bytes = offset_bytes;
        node.size_bits = size_bits;
        node
    }

    fn test_struct() -> Node {
        let mut node = Node::new(NodeData::InlineStructOrUnion(InlineStructOrUnion {
            is_struct: true,
            base_classes: Vec::new(),
            fields: vec![field("a", 0, 32), field("b", 4, 32)],
            member_functions: Vec::new(),
        }));
        node.name = "TestStruct".to_string();
        node.size_bits = 64;
        node
    }

    #[test]
    fn compare_node_with_itself() {
        let node = test_struct();
        assert_eq!(compare_nodes(&node, &node, true), None);
    }

    #[test]
    fn compare_detects_field_size_change() {
        let lhs = test_struct();
        let mut rhs = test_struct();
        if let NodeData::InlineStructOrUnion(sou) = &mut rhs.data {
            sou.fields[1].size_bits = 16;
        }
        assert_eq!(
            compare_nodes(&lhs, &rhs, true),
            Some(CompareFailReason::SizeBits)
        );
        assert_eq!(CompareFailReason::SizeBits.to_str(), "sizes");
    }

    #[test]
    fn compare_detects_missing_field() {
        let lhs = test_struct();
        let mut rhs = test_struct();
        if let NodeData::InlineStructOrUnion(sou) = &mut rhs.data {
            sou.fields.pop();
        }
        assert_eq!(
            compare_nodes(&lhs, &rhs, true),
            Some(CompareFailReason::FieldsSize)
        );
    }

    #[test]
    fn compare_detects_storage_class() {
        let lhs = test_struct();
        let mut rhs = test_struct();
        rhs.storage_class = StorageClass::Typedef;
        assert_eq!(
            compare_nodes(&lhs, &rhs, true),
            Some(CompareFailReason::StorageClass)
        );
        assert_eq!(compare_nodes(&lhs, &rhs, false), None);
    }

    #[test]
    fn compare_anonymous_enums_by_constants() {
        let lhs = Node::new(NodeData::InlineEnum(InlineEnum {
            constants: vec![(0, "A".to_string()), (1, "B".to_string())],
        }));
        let mut rhs = lhs.clone();
        assert_eq!(compare_nodes(&lhs, &rhs, true), None);
        if let NodeData::InlineEnum(e) = &mut rhs.data {
            e.constants[1].0 = 2;
        }
        assert_eq!(
            compare_nodes(&lhs, &rhs, true),
            Some(CompareFailReason::EnumConstants)
        );
    }
}
