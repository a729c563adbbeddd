//! Type table
//!
//! Type declarations of a module (`OpType*`) in declaration order, addressable
//! by result id and grouped by opcode. The grouping lets passes visit e.g.
//! every `OpTypePointer` without scanning the rest of the module.
//!
//! Deduplication of structurally identical types is the builder's business;
//! the table stores what it is given.
use std::collections::BTreeMap;

use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
    modules::{instruction::Instruction, operand::Id},
    spirv::{Op, StorageClass},
    utils::{Error, Result},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TypeTable {
    declarations: Vec<Instruction>,
    by_id: BTreeMap<Id, usize>,
    grouped: BTreeMap<Op, SmallVec<[usize; 8]>>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a type declaration and return its result id.
    pub fn insert(&mut self, instr: Instruction) -> Result<Id> {
        let op = instr.op();
        let id = instr.result_id().ok_or(Error::MissingOperand { op, index: 0 })?;
        if !op.is_type_declaration() {
            return Err(Error::NotAType { id, op });
        }
        if self.by_id.contains_key(&id) {
            return Err(Error::DuplicateId { id });
        }

        debug!("New type declared {}", instr);
        let slot = self.declarations.len();
        self.declarations.push(instr);
        self.by_id.insert(id, slot);
        self.grouped.entry(op).or_default().push(slot);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Declaration of type `id`, if `id` names a type.
    pub fn get(&self, id: Id) -> Option<&Instruction> {
        self.by_id.get(&id).map(|&slot| &self.declarations[slot])
    }

    /// Declaration of type `id`, failing if it is not a declared type.
    pub fn resolve(&self, id: Id) -> Result<&Instruction> {
        self.get(id).ok_or(Error::UndefinedId { id })
    }

    /// All declarations, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.declarations.iter()
    }

    /// All declarations with opcode `op`, in declaration order.
    pub fn grouped(&self, op: Op) -> impl Iterator<Item = &Instruction> {
        self.grouped
            .get(&op)
            .into_iter()
            .flat_map(|slots| slots.iter())
            .map(|&slot| &self.declarations[slot])
    }

    /// Storage class and pointee type of the pointer type `id`.
    ///
    /// Storage classes outside [`StorageClass`] come back as `None`; they are
    /// valid SPIR-V but never physical nor exempt from anything.
    pub fn pointer_parts(&self, id: Id) -> Result<(Option<StorageClass>, Id)> {
        let ty = self.resolve(id)?;
        if ty.op() != Op::TypePointer {
            return Err(Error::UnexpectedOpcode {
                id,
                expected: Op::TypePointer,
                found: ty.op(),
            });
        }
        let storage_class = StorageClass::from_repr(ty.literal_operand(0)?);
        Ok((storage_class, ty.id_operand(1)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::operand::Operand;

    fn int(id: u32, width: u32) -> Instruction {
        Instruction::new(
            Op::TypeInt,
            None,
            Some(Id(id)),
            [Operand::Literal(width), Operand::Literal(0)],
        )
    }

    fn pointer(id: u32, class: StorageClass, pointee: u32) -> Instruction {
        Instruction::new(
            Op::TypePointer,
            None,
            Some(Id(id)),
            [Operand::Literal(class as u32), Operand::Id(Id(pointee))],
        )
    }

    #[test]
    fn grouping_follows_declaration_order() {
        let mut table = TypeTable::new();
        table.insert(int(1, 32)).unwrap();
        table.insert(pointer(2, StorageClass::Function, 1)).unwrap();
        table.insert(int(3, 8)).unwrap();
        table.insert(pointer(4, StorageClass::PhysicalStorageBuffer, 3)).unwrap();

        let pointers: Vec<_> = table
            .grouped(Op::TypePointer)
            .filter_map(|ty| ty.result_id())
            .collect();
        assert_eq!(pointers, vec![Id(2), Id(4)]);
        assert_eq!(table.grouped(Op::TypeStruct).count(), 0);
        assert_eq!(
            table.pointer_parts(Id(4)),
            Ok((Some(StorageClass::PhysicalStorageBuffer), Id(3)))
        );
    }

    #[test]
    fn unlisted_storage_classes_decode_to_none() {
        let mut table = TypeTable::new();
        table.insert(int(1, 32)).unwrap();
        // RayPayloadKHR
        let ray_payload = Instruction::new(
            Op::TypePointer,
            None,
            Some(Id(2)),
            [Operand::Literal(5338), Operand::Id(Id(1))],
        );
        table.insert(ray_payload).unwrap();
        assert_eq!(table.pointer_parts(Id(2)), Ok((None, Id(1))));
    }

    #[test]
    fn rejects_duplicates_and_non_types() {
        let mut table = TypeTable::new();
        table.insert(int(1, 32)).unwrap();
        assert_eq!(table.insert(int(1, 16)), Err(Error::DuplicateId { id: Id(1) }));

        let constant = Instruction::new(Op::Constant, Some(Id(1)), Some(Id(2)), [Operand::Literal(0)]);
        assert_eq!(
            table.insert(constant),
            Err(Error::NotAType { id: Id(2), op: Op::Constant })
        );
        assert!(table.pointer_parts(Id(1)).unwrap_err().is_unexpected_opcode());
    }
}
