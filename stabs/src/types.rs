//! The parsed form of STABS types.

use std::collections::BTreeMap;
use std::fmt;

/// Identifies a type within a translation unit.
///
/// Most games use a single bare number. The homebrew SDK toolchain emits
/// parenthesized pairs e.g. `(1,23)`, where the first number is the index of
/// an include file listed separately for each translation unit, and the
/// second is the type number within it.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TypeNumber {
    /// Include file index, or -1 for the bare encoding.
    pub file: i32,
    /// The type number itself, or -1 if absent.
    pub number: i32,
}

impl Default for TypeNumber {
    fn default() -> Self {
        Self { file: -1, number: -1 }
    }
}

impl TypeNumber {
    /// Whether a type number was actually parsed.
    pub fn valid(&self) -> bool {
        self.number > -1
    }
}

impl fmt::Display for TypeNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.file > -1 {
            write!(f, "({},{})", self.file, self.number)
        } else {
            write!(f, "{}", self.number)
        }
    }
}

impl fmt::Debug for TypeNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// One parsed STABS type.
///
/// For example in `123=*456`, the outer type has number 123 and a pointer
/// body, and its target is a shell with number 456 and no body. Shells are
/// resolved against a per-translation-unit index of numbered types.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StabsType {
    /// The type number, invalid if the type is anonymous.
    pub type_number: TypeNumber,
    /// True if no type number was present at all.
    pub anonymous: bool,
    /// Only populated for root types and cross references.
    pub name: Option<String>,
    /// True if this is the root type of a `t` typedef symbol.
    pub is_typedef: bool,
    /// True if this is the top-level type of a symbol.
    pub is_root: bool,
    /// The body, absent for reference-by-number shells.
    pub data: Option<StabsTypeData>,
}

impl StabsType {
    /// Creates a reference-by-number shell.
    pub fn shell(type_number: TypeNumber) -> Self {
        Self {
            type_number,
            ..Default::default()
        }
    }

    /// Whether the type carries a body, as opposed to being a reference by
    /// number that has to be resolved through the index.
    pub fn has_body(&self) -> bool {
        self.data.is_some()
    }

    /// Records this type and all of its numbered descendants, so that
    /// reference-by-number shells elsewhere in the translation unit can be
    /// resolved. The first definition of each number wins.
    pub fn enumerate_numbered_types<'a>(&'a self, out: &mut BTreeMap<TypeNumber, &'a StabsType>) {
        if !self.anonymous && self.has_body() && self.type_number.valid() {
            out.entry(self.type_number).or_insert(self);
        }
        let Some(data) = &self.data else {
            return;
        };
        match data {
            StabsTypeData::TypeReference(inner)
            | StabsTypeData::Function { return_type: inner }
            | StabsTypeData::VolatileQualifier(inner)
            | StabsTypeData::ConstQualifier(inner)
            | StabsTypeData::Reference { value_type: inner }
            | StabsTypeData::Pointer { value_type: inner } => {
                inner.enumerate_numbered_types(out);
            }
            StabsTypeData::Array {
                index_type,
                element_type,
            } => {
                index_type.enumerate_numbered_types(out);
                element_type.enumerate_numbered_types(out);
            }
            StabsTypeData::Enum(_) => {}
            StabsTypeData::Range {
                underlying_type, ..
            } => {
                underlying_type.enumerate_numbered_types(out);
            }
            StabsTypeData::Struct {
                body,
                first_base_class,
            } => {
                body.enumerate_numbered_types(out);
                if let Some(first_base_class) = first_base_class {
                    first_base_class.enumerate_numbered_types(out);
                }
            }
            StabsTypeData::Union(body) => body.enumerate_numbered_types(out),
            StabsTypeData::CrossReference { .. } => {}
            StabsTypeData::FloatingPointBuiltin { .. } => {}
            StabsTypeData::Method {
                class_type,
                return_type,
                parameter_types,
            } => {
                if let Some(class_type) = class_type {
                    class_type.enumerate_numbered_types(out);
                }
                return_type.enumerate_numbered_types(out);
                for parameter_type in parameter_types {
                    parameter_type.enumerate_numbered_types(out);
                }
            }
            StabsTypeData::SizeTypeAttribute { inner, .. } => {
                inner.enumerate_numbered_types(out);
            }
            StabsTypeData::PointerToDataMember {
                class_type,
                member_type,
            } => {
                class_type.enumerate_numbered_types(out);
                member_type.enumerate_numbered_types(out);
            }
            StabsTypeData::Builtin { .. } => {}
        }
    }
}

/// The body of a STABS type, tagged by the type descriptor character that
/// introduced it.
#[derive(Clone, Debug, PartialEq)]
pub enum StabsTypeData {
    /// `0`-`9` or `(` - an alias to another type.
    TypeReference(Box<StabsType>),
    /// `a` - an array. The index type must be a range with a low bound of
    /// zero; its high bound plus one is the element count.
    Array {
        /// The range type describing the valid indices.
        index_type: Box<StabsType>,
        /// The type of each element.
        element_type: Box<StabsType>,
    },
    /// `e` - an enum, as an ordered list of `(value, name)` pairs.
    Enum(Vec<(i32, String)>),
    /// `f` - a function type.
    Function {
        /// The return type. Parameters are not encoded.
        return_type: Box<StabsType>,
    },
    /// `k` - a volatile qualifier.
    VolatileQualifier(Box<StabsType>),
    /// `K` - a const qualifier.
    ConstQualifier(Box<StabsType>),
    /// `r` - a range, usually describing a builtin integer or float type.
    Range {
        /// The type the range is defined over, often a self reference.
        underlying_type: Box<StabsType>,
        /// Low bound. Kept as a string since 128-bit types use bounds that
        /// overflow an `i64`.
        low: String,
        /// High bound, same representation as the low bound.
        high: String,
    },
    /// `s` - a struct or class.
    Struct {
        /// The size, fields and member functions.
        body: StabsStructOrUnion,
        /// A `~%type;` suffix naming the first base class, if present.
        first_base_class: Option<Box<StabsType>>,
    },
    /// `u` - a union. No base classes.
    Union(StabsStructOrUnion),
    /// `x` - a forward declaration of a named type defined elsewhere.
    CrossReference {
        /// Whether the target is an enum, struct or union.
        kind: CrossReferenceKind,
        /// The name of the target type.
        identifier: String,
    },
    /// `R` - a floating point builtin.
    FloatingPointBuiltin {
        /// The floating point class.
        fpclass: i32,
        /// The size in bytes.
        bytes: i32,
    },
    /// `#` - a member function type.
    Method {
        /// The class the method belongs to, absent for the `##` form.
        class_type: Option<Box<StabsType>>,
        /// The return type.
        return_type: Box<StabsType>,
        /// Parameter types, only present for the non-`##` form.
        parameter_types: Vec<StabsType>,
    },
    /// `&` - a C++ reference.
    Reference {
        /// The referenced type.
        value_type: Box<StabsType>,
    },
    /// `*` - a pointer.
    Pointer {
        /// The pointed-to type.
        value_type: Box<StabsType>,
    },
    /// `@s<bits>;<type>` - a size attribute wrapping another type.
    SizeTypeAttribute {
        /// The size in bits.
        size_bits: i64,
        /// The wrapped type.
        inner: Box<StabsType>,
    },
    /// `@(class,member)` - a pointer to a non-static data member.
    PointerToDataMember {
        /// The class containing the member.
        class_type: Box<StabsType>,
        /// The type of the member pointed to.
        member_type: Box<StabsType>,
    },
    /// `-` - a builtin type referenced by a negative type id.
    Builtin {
        /// The builtin type id, e.g. 16 for `bool`.
        type_id: i64,
    },
}

/// The shared part of struct and union bodies.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StabsStructOrUnion {
    /// Size of the whole aggregate in bytes.
    pub size: i64,
    /// Base classes from the `!n,` prefix. Always empty for unions.
    pub base_classes: Vec<StabsBaseClass>,
    /// Data members in declaration order.
    pub fields: Vec<StabsField>,
    /// Member functions grouped into overload sets.
    pub member_functions: Vec<StabsMemberFunctionSet>,
}

impl StabsStructOrUnion {
    fn enumerate_numbered_types<'a>(&'a self, out: &mut BTreeMap<TypeNumber, &'a StabsType>) {
        for base_class in &self.base_classes {
            base_class.ty.enumerate_numbered_types(out);
        }
        for field in &self.fields {
            field.ty.enumerate_numbered_types(out);
        }
        for set in &self.member_functions {
            for overload in &set.overloads {
                overload.ty.enumerate_numbered_types(out);
                if let Some(virtual_type) = &overload.virtual_type {
                    virtual_type.enumerate_numbered_types(out);
                }
            }
        }
    }
}

/// A base class entry from a struct's `!n,` prefix.
#[derive(Clone, Debug, PartialEq)]
pub struct StabsBaseClass {
    /// The access specifier character.
    pub visibility: StabsVisibility,
    /// Offset of the base class subobject in bytes.
    pub offset: i32,
    /// The base class type.
    pub ty: StabsType,
}

/// A data member of a struct or union.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StabsField {
    /// The member name. A single space is used as a sentinel for unnamed
    /// members.
    pub name: String,
    /// The access specifier, if a `/` prefix was present.
    pub visibility: StabsVisibility,
    /// The member type.
    pub ty: StabsType,
    /// True for static members, which carry a type name instead of offsets.
    pub is_static: bool,
    /// Bit offset of the member from the start of the aggregate.
    pub offset_bits: i32,
    /// Size of the member in bits.
    pub size_bits: i32,
    /// The mangled type name, only present for static members.
    pub type_name: Option<String>,
}

/// The group of member function overloads sharing a name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StabsMemberFunctionSet {
    /// The function name. `__as` is the assignment operator.
    pub name: String,
    /// The overloads, in declaration order.
    pub overloads: Vec<StabsMemberFunction>,
}

/// One member function overload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StabsMemberFunction {
    /// The function type, usually a method descriptor.
    pub ty: StabsType,
    /// The access specifier.
    pub visibility: StabsVisibility,
    /// Whether the function is const qualified.
    pub is_const: bool,
    /// Whether the function is volatile qualified.
    pub is_volatile: bool,
    /// Whether the function is static or virtual.
    pub modifier: MemberFunctionModifier,
    /// The vtable index, for virtual functions.
    pub vtable_index: Option<i32>,
    /// The type through which virtual calls dispatch, for virtual functions.
    pub virtual_type: Option<StabsType>,
}

/// Access specifier characters used for fields, base classes and member
/// functions.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum StabsVisibility {
    /// No specifier present.
    #[default]
    None,
    /// `0`
    Private,
    /// `1`
    Protected,
    /// `2`
    Public,
    /// `9` - public, but the compiler optimized the member out.
    PublicOptimizedOut,
}

impl StabsVisibility {
    /// Maps a visibility character to its enum value.
    pub fn from_char(c: u8) -> Option<Self> {
        match c {
            b'0' => Some(Self::Private),
            b'1' => Some(Self::Protected),
            b'2' => Some(Self::Public),
            b'9' => Some(Self::PublicOptimizedOut),
            _ => None,
        }
    }
}

/// What kind of type a cross reference points at.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CrossReferenceKind {
    /// `xe`
    Enum,
    /// `xs`
    Struct,
    /// `xu`
    Union,
}

/// Whether a member function is static or virtual.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum MemberFunctionModifier {
    /// An ordinary member function.
    #[default]
    None,
    /// A static member function.
    Static,
    /// A virtual member function.
    Virtual,
}

impl MemberFunctionModifier {
    /// The name used when printing the modifier.
    pub fn to_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Static => "static",
            Self::Virtual => "virtual",
        }
    }
}
