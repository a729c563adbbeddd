//! Id resolution
//!
//! [`IdIndex`] maps every result id of a module to its definition. It is a
//! borrowed view built in one pass over the module; passes build it once and
//! query it as often as they need.
use std::collections::BTreeMap;

use crate::{
    modules::{Module, instruction::Instruction, operand::Id},
    types::TypeTable,
    utils::{Error, Result},
};

/// Where a result id comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Definition<'a> {
    /// Defined by an instruction (type, global, function, parameter, local
    /// variable or block instruction).
    Instruction(&'a Instruction),
    /// Names a basic block of function `function`.
    Label { function: Id },
}

pub struct IdIndex<'a> {
    types: &'a TypeTable,
    defs: BTreeMap<Id, Definition<'a>>,
}

impl<'a> IdIndex<'a> {
    /// Index `module`, failing if any result id is defined twice.
    pub fn build(module: &'a Module) -> Result<Self> {
        let mut defs = BTreeMap::new();
        let mut define = |id: Id, def: Definition<'a>| {
            if defs.insert(id, def).is_some() {
                Err(Error::DuplicateId { id })
            } else {
                Ok(())
            }
        };

        let module_scope = module.types.iter().chain(module.globals.iter());
        for instr in module_scope {
            if let Some(id) = instr.result_id() {
                define(id, Definition::Instruction(instr))?;
            }
        }

        for function in &module.functions {
            let header = std::iter::once(&function.definition).chain(function.parameters.iter());
            for instr in header {
                if let Some(id) = instr.result_id() {
                    define(id, Definition::Instruction(instr))?;
                }
            }

            for block in &function.blocks {
                define(
                    block.label,
                    Definition::Label {
                        function: function.id(),
                    },
                )?;
                for instr in block.variables.iter().chain(block.instructions.iter()) {
                    if let Some(id) = instr.result_id() {
                        define(id, Definition::Instruction(instr))?;
                    }
                }
            }
        }

        Ok(Self {
            types: &module.types,
            defs,
        })
    }

    #[inline]
    pub fn types(&self) -> &'a TypeTable {
        self.types
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn get(&self, id: Id) -> Option<Definition<'a>> {
        self.defs.get(&id).copied()
    }

    /// Defining instruction of `id`.
    pub fn instruction(&self, id: Id) -> Result<&'a Instruction> {
        match self.get(id) {
            Some(Definition::Instruction(instr)) => Ok(instr),
            Some(Definition::Label { .. }) => Err(Error::LabelNotValue { id }),
            None => Err(Error::UndefinedId { id }),
        }
    }

    /// Result type of the value named `id`; `None` for ids that carry no
    /// type (labels, types, extended instruction set imports, ...).
    pub fn type_of(&self, id: Id) -> Result<Option<Id>> {
        match self.get(id) {
            Some(Definition::Instruction(instr)) => Ok(instr.result_type()),
            Some(Definition::Label { .. }) => Ok(None),
            None => Err(Error::UndefinedId { id }),
        }
    }

    /// Type obtained by stripping one pointer level off the type of `id`.
    pub fn deref_type_of(&self, id: Id) -> Result<Option<Id>> {
        match self.type_of(id)? {
            Some(pointer) => Ok(Some(self.types().pointer_parts(pointer)?.1)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        modules::{BasicBlock, Function, operand::Operand},
        spirv::{Op, SpirvVersion, StorageClass},
    };

    fn sample() -> Module {
        let mut module = Module::new(SpirvVersion::V1_5);
        module
            .types
            .insert(Instruction::new(Op::TypeFloat, None, Some(Id(1)), [Operand::Literal(32)]))
            .unwrap();
        module
            .types
            .insert(Instruction::new(
                Op::TypePointer,
                None,
                Some(Id(2)),
                [
                    Operand::Literal(StorageClass::Function as u32),
                    Operand::Id(Id(1)),
                ],
            ))
            .unwrap();
        module
            .types
            .insert(Instruction::new(Op::TypeVoid, None, Some(Id(3)), []))
            .unwrap();

        let mut entry = BasicBlock::new(Id(11));
        entry.variables.push(Instruction::new(
            Op::Variable,
            Some(Id(2)),
            Some(Id(12)),
            [Operand::Literal(StorageClass::Function as u32)],
        ));
        entry.instructions.push(Instruction::new(
            Op::Load,
            Some(Id(1)),
            Some(Id(13)),
            [Operand::Id(Id(12))],
        ));
        entry
            .instructions
            .push(Instruction::new(Op::Return, None, None, []));

        module.functions.push(Function {
            definition: Instruction::new(Op::Function, Some(Id(3)), Some(Id(10)), [Operand::Literal(0)]),
            parameters: Vec::new(),
            blocks: vec![entry],
        });
        module
    }

    #[test]
    fn resolves_every_kind_of_definition() {
        let module = sample();
        let index = IdIndex::build(&module).unwrap();

        assert_eq!(index.len(), 7);
        assert_eq!(index.type_of(Id(13)), Ok(Some(Id(1))));
        assert_eq!(index.type_of(Id(11)), Ok(None));
        assert_eq!(index.type_of(Id(1)), Ok(None));
        assert_eq!(index.deref_type_of(Id(12)), Ok(Some(Id(1))));
        assert_eq!(index.instruction(Id(11)), Err(Error::LabelNotValue { id: Id(11) }));
        assert_eq!(index.type_of(Id(99)), Err(Error::UndefinedId { id: Id(99) }));
        assert_eq!(index.get(Id(11)), Some(Definition::Label { function: Id(10) }));
    }

    #[test]
    fn duplicate_result_ids_are_rejected() {
        let mut module = sample();
        module.globals.push(Instruction::new(
            Op::Constant,
            Some(Id(1)),
            Some(Id(13)),
            [Operand::Literal(0)],
        ));
        assert_eq!(IdIndex::build(&module).err(), Some(Error::DuplicateId { id: Id(13) }));
    }
}
