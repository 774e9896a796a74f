//! MIPS register names and the dbx register numbering used by STABS.

/// The register files of the EE core.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RegisterClass {
    /// Not a known register.
    Invalid,
    /// General purpose registers.
    Gpr,
    /// Floating point registers.
    Fpr,
    /// Floating point control registers.
    SpecialFpu,
}

impl RegisterClass {
    /// The string used by the presentation layers.
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Gpr => "gpr",
            Self::Fpr => "fpr",
            Self::SpecialFpu => "special_fpu",
        }
    }
}

/// The conventional names of the general purpose registers.
pub const GPR_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3", "t4", "t5", "t6",
    "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1", "gp", "sp",
    "fp", "ra",
];

/// The names of the floating point registers.
pub const FPR_NAMES: [&str; 32] = [
    "f0", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12", "f13", "f14",
    "f15", "f16", "f17", "f18", "f19", "f20", "f21", "f22", "f23", "f24", "f25", "f26", "f27",
    "f28", "f29", "f30", "f31",
];

/// Resolves a dbx register number, as carried by `N_RSYM` symbols and
/// register parameters, to a register class and an index within it.
///
/// The numbering is the conventional MIPS one: 0-31 are the general purpose
/// registers, 38-69 the floating point registers, and 70 is the floating
/// point control and status register.
pub fn map_dbx_register_index(index: i32) -> (RegisterClass, i32) {
    match index {
        0..=31 => (RegisterClass::Gpr, index),
        38..=69 => (RegisterClass::Fpr, index - 38),
        70 => (RegisterClass::SpecialFpu, 0),
        _ => (RegisterClass::Invalid, 0),
    }
}

/// The name of a register given its class and index, or `None` for invalid
/// combinations.
pub fn register_name(register_class: RegisterClass, index: i32) -> Option<&'static str> {
    match register_class {
        RegisterClass::Gpr => GPR_NAMES.get(index as usize).copied(),
        RegisterClass::Fpr => FPR_NAMES.get(index as usize).copied(),
        RegisterClass::SpecialFpu => (index == 0).then_some("fcr31"),
        RegisterClass::Invalid => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dbx_numbering() {
        assert_eq!(map_dbx_register_index(4), (RegisterClass::Gpr, 4));
        assert_eq!(map_dbx_register_index(38), (RegisterClass::Fpr, 0));
        assert_eq!(map_dbx_register_index(69), (RegisterClass::Fpr, 31));
        assert_eq!(map_dbx_register_index(70), (RegisterClass::SpecialFpu, 0));
        assert_eq!(map_dbx_register_index(-1), (RegisterClass::Invalid, 0));
        assert_eq!(register_name(RegisterClass::Gpr, 4), Some("a0"));
        assert_eq!(register_name(RegisterClass::Fpr, 12), Some("f12"));
    }
}
