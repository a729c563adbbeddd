//! Instruction node.
//!
//! An [`Instruction`] is an opcode, an optional result id, an optional
//! result-type id and an ordered list of tagged operands. The opcode and the
//! operand count are fixed at construction; the only mutation exposed is
//! rewriting the payload of an existing literal operand.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
    modules::operand::{Id, Operand},
    spirv::Op,
    utils::{Error, Result},
};

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Instruction {
    op: Op,
    result_id: Option<Id>,
    result_type: Option<Id>,
    operands: SmallVec<[Operand; 4]>,
}

impl Instruction {
    pub fn new(
        op: Op,
        result_type: Option<Id>,
        result_id: Option<Id>,
        operands: impl IntoIterator<Item = Operand>,
    ) -> Self {
        Self {
            op,
            result_id,
            result_type,
            operands: operands.into_iter().collect(),
        }
    }

    #[inline]
    pub fn op(&self) -> Op {
        self.op
    }

    #[inline]
    pub fn result_id(&self) -> Option<Id> {
        self.result_id
    }

    #[inline]
    pub fn result_type(&self) -> Option<Id> {
        self.result_type
    }

    #[inline]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    #[inline]
    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }

    /// Operand at `index`, failing if the instruction is too short.
    pub fn operand(&self, index: usize) -> Result<Operand> {
        self.operands.get(index).copied().ok_or(Error::MissingOperand {
            op: self.op,
            index,
        })
    }

    /// Id operand at `index`.
    pub fn id_operand(&self, index: usize) -> Result<Id> {
        match self.operand(index)? {
            Operand::Id(id) => Ok(id),
            Operand::Literal(_) => Err(Error::ExpectedIdOperand { op: self.op, index }),
        }
    }

    /// Literal operand at `index`.
    pub fn literal_operand(&self, index: usize) -> Result<u32> {
        match self.operand(index)? {
            Operand::Literal(word) => Ok(word),
            Operand::Id(_) => Err(Error::ExpectedLiteralOperand { op: self.op, index }),
        }
    }

    /// Every id-reference operand, in operand order.
    pub fn id_operands(&self) -> impl Iterator<Item = Id> + '_ {
        self.operands.iter().filter_map(|op| match op {
            Operand::Id(id) => Some(*id),
            Operand::Literal(_) => None,
        })
    }

    /// Rewrite the literal at `index` in place.
    ///
    /// The operand must already be a literal: the tag of an operand never
    /// changes after emission.
    pub fn set_literal_operand(&mut self, index: usize, word: u32) -> Result<()> {
        let op = self.op;
        match self.operands.get_mut(index) {
            Some(Operand::Literal(slot)) => {
                *slot = word;
                Ok(())
            }
            Some(Operand::Id(_)) => Err(Error::ExpectedLiteralOperand { op, index }),
            None => Err(Error::MissingOperand { op, index }),
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(id) = self.result_id {
            write!(f, "{} = ", id)?;
        }
        write!(f, "{}", self.op)?;
        if let Some(ty) = self.result_type {
            write!(f, " {}", ty)?;
        }
        for operand in &self.operands {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}
