//! Shared operand types for instructions.
//!
//! An instruction operand is either a reference to another result id (`Id`)
//! or an immediate literal word (`Literal`). The tag is fixed when the
//! instruction is emitted; only the payload of a literal may be rewritten.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumTryAs};

/// Result identifier. Every type, constant, variable, label and value of a
/// module is named by exactly one `Id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Id(pub u32);

impl Id {
    /// Reserved "no id" value. Never a valid result id.
    pub const NONE: Id = Id(0);

    pub fn is_none(&self) -> bool {
        self == &Id::NONE
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl From<u32> for Id {
    fn from(value: u32) -> Self {
        Id(value)
    }
}

/// Instruction operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operand {
    /// Reference to a result id defined elsewhere in the module.
    Id(Id),
    /// Immediate literal word.
    Literal(u32),
}

impl From<Id> for Operand {
    fn from(value: Id) -> Self {
        Operand::Id(value)
    }
}

impl From<u32> for Operand {
    fn from(value: u32) -> Self {
        Operand::Literal(value)
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Id(id) => write!(f, "{}", id),
            Operand::Literal(word) => write!(f, "{}", word),
        }
    }
}
