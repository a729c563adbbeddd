//! Minimal module builder for tests.
//!
//! Stands in for the front-end's builder: allocates ids, declares types and
//! constants, and appends instructions to the current block. It performs no
//! validation beyond what the underlying tables do and panics on misuse.
use crate::{
    modules::{
        BasicBlock, Function, Module,
        decoration::Decoration,
        instruction::Instruction,
        operand::{Id, Operand},
    },
    spirv::{DecorationKind, MemoryAccess, Op, SpirvVersion, StorageClass},
};

pub struct ModuleBuilder {
    module: Module,
    next_id: u32,
    uint32: Option<Id>,
}

impl ModuleBuilder {
    pub fn new(version: SpirvVersion) -> Self {
        Self {
            module: Module::new(version),
            next_id: 1,
            uint32: None,
        }
    }

    pub fn fresh_id(&mut self) -> Id {
        let id = Id(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    pub fn finish(self) -> Module {
        self.module
    }

    // ---------------------------------------------------------------- types

    fn declare(&mut self, op: Op, operands: Vec<Operand>) -> Id {
        let id = self.fresh_id();
        self.module
            .types
            .insert(Instruction::new(op, None, Some(id), operands))
            .expect("fresh ids never collide");
        id
    }

    pub fn type_void(&mut self) -> Id {
        self.declare(Op::TypeVoid, vec![])
    }

    pub fn type_bool(&mut self) -> Id {
        self.declare(Op::TypeBool, vec![])
    }

    pub fn type_int(&mut self, width: u32, signed: bool) -> Id {
        self.declare(
            Op::TypeInt,
            vec![Operand::Literal(width), Operand::Literal(signed as u32)],
        )
    }

    pub fn type_float(&mut self, width: u32) -> Id {
        self.declare(Op::TypeFloat, vec![Operand::Literal(width)])
    }

    pub fn type_vector(&mut self, component: Id, count: u32) -> Id {
        self.declare(Op::TypeVector, vec![component.into(), Operand::Literal(count)])
    }

    pub fn type_matrix(&mut self, column: Id, count: u32) -> Id {
        self.declare(Op::TypeMatrix, vec![column.into(), Operand::Literal(count)])
    }

    pub fn type_array(&mut self, element: Id, length: u32) -> Id {
        let length = self.constant_u32(length);
        self.declare(Op::TypeArray, vec![element.into(), length.into()])
    }

    pub fn type_runtime_array(&mut self, element: Id) -> Id {
        self.declare(Op::TypeRuntimeArray, vec![element.into()])
    }

    pub fn type_struct(&mut self, members: &[Id]) -> Id {
        self.declare(Op::TypeStruct, members.iter().map(|&m| m.into()).collect())
    }

    pub fn type_pointer(&mut self, class: StorageClass, pointee: Id) -> Id {
        self.declare(
            Op::TypePointer,
            vec![Operand::Literal(class as u32), pointee.into()],
        )
    }

    pub fn type_function(&mut self, return_type: Id, params: &[Id]) -> Id {
        let operands = std::iter::once(return_type)
            .chain(params.iter().copied())
            .map(Operand::from)
            .collect();
        self.declare(Op::TypeFunction, operands)
    }

    // ------------------------------------------------------------ globals

    pub fn constant(&mut self, ty: Id, value: u32) -> Id {
        let id = self.fresh_id();
        self.module.globals.push(Instruction::new(
            Op::Constant,
            Some(ty),
            Some(id),
            [Operand::Literal(value)],
        ));
        id
    }

    /// `OpConstant` of a shared 32-bit unsigned integer type.
    pub fn constant_u32(&mut self, value: u32) -> Id {
        let ty = match self.uint32 {
            Some(ty) => ty,
            None => {
                let ty = self.type_int(32, false);
                self.uint32 = Some(ty);
                ty
            }
        };
        self.constant(ty, value)
    }

    pub fn global_variable(&mut self, pointer_type: Id, class: StorageClass) -> Id {
        let id = self.fresh_id();
        self.module.globals.push(Instruction::new(
            Op::Variable,
            Some(pointer_type),
            Some(id),
            [Operand::Literal(class as u32)],
        ));
        id
    }

    pub fn ext_inst_import(&mut self) -> Id {
        let id = self.fresh_id();
        self.module
            .globals
            .push(Instruction::new(Op::ExtInstImport, None, Some(id), []));
        id
    }

    pub fn decorate(&mut self, target: Id, kind: DecorationKind, params: &[u32]) {
        self.module.add_decoration(Decoration {
            target: crate::modules::decoration::DecorationTarget::Id(target),
            kind,
            params: params.iter().copied().collect(),
        });
    }

    pub fn member_decorate(&mut self, struct_type: Id, member: u32, kind: DecorationKind, param: u32) {
        self.module
            .add_decoration(Decoration::member(struct_type, member, kind, param));
    }

    // ---------------------------------------------------------- functions

    /// Start a new function; subsequent blocks are appended to it.
    pub fn begin_function(&mut self, return_type: Id) -> Id {
        let id = self.fresh_id();
        let fn_type = self.type_function(return_type, &[]);
        self.module.functions.push(Function {
            definition: Instruction::new(
                Op::Function,
                Some(return_type),
                Some(id),
                [Operand::Literal(0), fn_type.into()],
            ),
            parameters: Vec::new(),
            blocks: Vec::new(),
        });
        id
    }

    pub fn parameter(&mut self, ty: Id) -> Id {
        let id = self.fresh_id();
        self.current_function()
            .parameters
            .push(Instruction::new(Op::FunctionParameter, Some(ty), Some(id), []));
        id
    }

    /// Start a new block with a fresh label.
    pub fn begin_block(&mut self) -> Id {
        let label = self.fresh_id();
        self.begin_block_labeled(label);
        label
    }

    /// Start a new block with a label reserved earlier through
    /// [`Self::fresh_id`] (for forward branches).
    pub fn begin_block_labeled(&mut self, label: Id) {
        self.current_function().blocks.push(BasicBlock::new(label));
    }

    fn current_function(&mut self) -> &mut Function {
        self.module
            .functions
            .last_mut()
            .expect("begin_function must be called first")
    }

    fn current_block(&mut self) -> &mut BasicBlock {
        self.current_function()
            .blocks
            .last_mut()
            .expect("begin_block must be called first")
    }

    pub fn local_variable(&mut self, pointer_type: Id) -> Id {
        let id = self.fresh_id();
        self.current_block().variables.push(Instruction::new(
            Op::Variable,
            Some(pointer_type),
            Some(id),
            [Operand::Literal(StorageClass::Function as u32)],
        ));
        id
    }

    /// Append an instruction with a result to the current block.
    pub fn emit_value(&mut self, op: Op, result_type: Id, operands: Vec<Operand>) -> Id {
        let id = self.fresh_id();
        self.current_block()
            .instructions
            .push(Instruction::new(op, Some(result_type), Some(id), operands));
        id
    }

    /// Append an instruction without result to the current block.
    pub fn emit(&mut self, op: Op, operands: Vec<Operand>) {
        self.current_block()
            .instructions
            .push(Instruction::new(op, None, None, operands));
    }

    pub fn load(&mut self, result_type: Id, pointer: Id, alignment: Option<u32>) -> Id {
        let mut operands = vec![pointer.into()];
        if let Some(alignment) = alignment {
            operands.push(Operand::Literal(MemoryAccess::ALIGNED.bits()));
            operands.push(Operand::Literal(alignment));
        }
        self.emit_value(Op::Load, result_type, operands)
    }

    pub fn store(&mut self, pointer: Id, value: Id, alignment: Option<u32>) {
        let mut operands = vec![pointer.into(), value.into()];
        if let Some(alignment) = alignment {
            operands.push(Operand::Literal(MemoryAccess::ALIGNED.bits()));
            operands.push(Operand::Literal(alignment));
        }
        self.emit(Op::Store, operands);
    }

    pub fn access_chain(&mut self, result_type: Id, base: Id, indices: &[Id]) -> Id {
        let operands = std::iter::once(base)
            .chain(indices.iter().copied())
            .map(Operand::from)
            .collect();
        self.emit_value(Op::AccessChain, result_type, operands)
    }

    pub fn branch(&mut self, target: Id) {
        self.emit(Op::Branch, vec![target.into()]);
    }

    pub fn branch_conditional(&mut self, cond: Id, on_true: Id, on_false: Id) {
        self.emit(
            Op::BranchConditional,
            vec![cond.into(), on_true.into(), on_false.into()],
        );
    }

    pub fn selection_merge(&mut self, merge: Id) {
        self.emit(Op::SelectionMerge, vec![merge.into(), Operand::Literal(0)]);
    }

    pub fn loop_merge(&mut self, merge: Id, continue_target: Id) {
        self.emit(
            Op::LoopMerge,
            vec![merge.into(), continue_target.into(), Operand::Literal(0)],
        );
    }

    pub fn ret(&mut self) {
        self.emit(Op::Return, vec![]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::index::IdIndex;

    #[test]
    fn builds_an_indexable_module() {
        let mut b = ModuleBuilder::new(SpirvVersion::V1_5);
        let void = b.type_void();
        let float = b.type_float(32);
        let ptr = b.type_pointer(StorageClass::Function, float);
        b.begin_function(void);
        b.begin_block();
        let var = b.local_variable(ptr);
        let value = b.load(float, var, Some(4));
        b.store(var, value, None);
        b.ret();
        let module = b.finish();

        let index = IdIndex::build(&module).unwrap();
        assert_eq!(index.type_of(value), Ok(Some(float)));
        assert_eq!(index.deref_type_of(var), Ok(Some(float)));
        assert_eq!(module.block_instructions().count(), 4);
    }
}
