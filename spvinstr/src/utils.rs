use strum::{EnumIs, EnumTryAs};
use thiserror::Error;

use crate::{modules::operand::Id, spirv::Op};

#[derive(Debug, PartialEq, Eq, Hash, EnumIs, EnumTryAs, Error)]
pub enum Error {
    /// An operand, type or decoration refers to an id that has no definition.
    #[error("The id `{id}` is referenced but never defined within the module.")]
    UndefinedId { id: Id },

    /// Two instructions declare the same result id.
    #[error("The id `{id}` is defined more than once within the module.")]
    DuplicateId { id: Id },

    /// An id used in type position is defined by a non-type instruction.
    #[error("The id `{id}` is used as a type but is defined by `{op}`.")]
    NotAType { id: Id, op: Op },

    /// An instruction was expected to carry a given opcode.
    #[error("Expected `{expected}` for `{id}`, found `{found}`.")]
    UnexpectedOpcode { id: Id, expected: Op, found: Op },

    /// An instruction has fewer operands than its opcode requires.
    #[error("`{op}` is missing operand #{index}.")]
    MissingOperand { op: Op, index: usize },

    /// The operand at `index` is a literal where an id was expected.
    #[error("Operand #{index} of `{op}` is a literal, expected an id.")]
    ExpectedIdOperand { op: Op, index: usize },

    /// The operand at `index` is an id where a literal was expected.
    #[error("Operand #{index} of `{op}` is an id, expected a literal.")]
    ExpectedLiteralOperand { op: Op, index: usize },

    /// A block label was used where an instruction result was expected.
    #[error("The id `{id}` names a basic block label, expected an instruction result.")]
    LabelNotValue { id: Id },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
