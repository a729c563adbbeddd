use spvinstr::Id;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinalizeError {
    /// The instruction graph violates one of its own invariants (unresolved
    /// id, wrong operand kind, ...).
    #[error(transparent)]
    Graph(#[from] spvinstr::Error),

    #[error(
        "`{instruction}` dereferences a physical storage buffer access chain but its memory operands (mask {mask:#x}) carry no alignment."
    )]
    MissingAlignedFlag { instruction: String, mask: u32 },

    #[error(
        "Access chain `{chain}` indexes struct `{struct_type}` with `{index}`, which is not an OpConstant."
    )]
    NonConstantMemberIndex { chain: Id, struct_type: Id, index: Id },

    #[error(
        "Access chain `{chain}` selects member {member} of struct `{struct_type}`, which has {count} members."
    )]
    MemberIndexOutOfRange {
        chain: Id,
        struct_type: Id,
        member: u32,
        count: usize,
    },

    #[error("The base `{base}` of access chain `{chain}` does not have a pointer type.")]
    NotAPointer { chain: Id, base: Id },

    #[error("`{instruction}` accesses memory through `{pointer}`, which has no pointer type.")]
    UntypedPointer { instruction: String, pointer: Id },

    #[error(
        "Finalize plan refers to instruction {instruction} of block {block} in function {function}, which the module does not have."
    )]
    StalePlan {
        function: usize,
        block: usize,
        instruction: usize,
    },

    #[error("Failed to parse finalize configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type FinalizeResult<T> = Result<T, FinalizeError>;
