//! Instruction graph
//!
//! A [`Module`] owns the module-scope sections (capabilities, extensions,
//! types, global declarations, decorations) and a list of [`Function`]s. Each
//! function owns its [`BasicBlock`]s; each block owns its local variables and
//! its instructions, the last of which is the block terminator.
//!
//! Control-flow edges are never stored. They are read from the terminator on
//! demand (see [`BasicBlock::successors`]), so blocks can be edited without
//! keeping an edge list in sync.
use std::collections::BTreeSet;

use auto_enums::auto_enum;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    modules::{
        decoration::{Decoration, DecorationStore},
        instruction::Instruction,
        operand::Id,
    },
    spirv::{Capability, Extension, Op, SpirvVersion},
    types::TypeTable,
};

pub mod decoration;
pub mod index;
pub mod instruction;
pub mod operand;

/// A basic block: a label, the local variables declared at its top and a
/// sequence of instructions ending with a terminator.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BasicBlock {
    pub label: Id,
    /// `OpVariable`s with `Function` storage class. Emitted before
    /// `instructions`.
    pub variables: Vec<Instruction>,
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(label: Id) -> Self {
        Self {
            label,
            variables: Vec::new(),
            instructions: Vec::new(),
        }
    }

    /// Last instruction, if it is a block terminator.
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions
            .last()
            .filter(|instr| instr.op().is_block_terminator())
    }

    /// `OpSelectionMerge`/`OpLoopMerge` immediately preceding the terminator.
    pub fn merge_instruction(&self) -> Option<&Instruction> {
        let count = self.instructions.len();
        if count < 2 {
            return None;
        }
        self.instructions
            .get(count - 2)
            .filter(|instr| instr.op().is_merge())
    }

    /// Labels this block may branch to, read from its terminator.
    ///
    /// Every id operand of a branch except the condition/selector is a
    /// target label; case literals of `OpSwitch` and branch weights are
    /// literals and thus skipped.
    #[auto_enum(Iterator)]
    pub fn successors(&self) -> impl Iterator<Item = Id> + '_ {
        match self.terminator() {
            Some(term) if term.op() == Op::Branch => term.id_operands(),
            Some(term) if matches!(term.op(), Op::BranchConditional | Op::Switch) => {
                term.id_operands().skip(1)
            }
            _ => std::iter::empty(),
        }
    }

    /// Merge block (and continue target for loops) declared by this block's
    /// structured control-flow header.
    pub fn merge_targets(&self) -> impl Iterator<Item = Id> + '_ {
        self.merge_instruction()
            .into_iter()
            .flat_map(|merge| merge.id_operands())
    }

    /// Branch successors followed by structural merge/continue targets.
    pub fn structured_successors(&self) -> impl Iterator<Item = Id> + '_ {
        self.successors().chain(self.merge_targets())
    }

    /// Ids defined by this block: its label, then local variables, then
    /// instruction results.
    pub fn definitions(&self) -> impl Iterator<Item = Id> + '_ {
        let results = self
            .variables
            .iter()
            .chain(self.instructions.iter())
            .filter_map(|instr| instr.result_id());
        std::iter::once(self.label).chain(results)
    }
}

/// A function: its `OpFunction` definition, parameters and basic blocks.
///
/// By convention the entry point is the first block.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Function {
    pub definition: Instruction,
    pub parameters: Vec<Instruction>,
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    /// Result id of the `OpFunction` instruction.
    pub fn id(&self) -> Id {
        self.definition.result_id().unwrap_or(Id::NONE)
    }
}

/// A SPIR-V module in its in-memory, pre-serialization form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Module {
    pub version: SpirvVersion,
    pub capabilities: BTreeSet<Capability>,
    pub extensions: BTreeSet<Extension>,
    pub types: TypeTable,
    /// Module-scope non-type declarations: constants, global variables,
    /// extended instruction set imports, `OpUndef`.
    pub globals: Vec<Instruction>,
    pub decorations: DecorationStore,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(version: SpirvVersion) -> Self {
        Self {
            version,
            ..Default::default()
        }
    }

    /// Declare `capability`. Returns `false` if it was already declared.
    pub fn add_capability(&mut self, capability: Capability) -> bool {
        self.capabilities.insert(capability)
    }

    /// Declare `extension`. Returns `false` if it was already declared.
    pub fn add_extension(&mut self, extension: Extension) -> bool {
        self.extensions.insert(extension)
    }

    pub fn add_decoration(&mut self, decoration: Decoration) {
        self.decorations.push(decoration);
    }

    /// Every instruction owned by a block, in function/block order.
    pub fn block_instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.functions
            .iter()
            .flat_map(|function| function.blocks.iter())
            .flat_map(|block| block.variables.iter().chain(block.instructions.iter()))
    }
}
