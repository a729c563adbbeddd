//! Alignment refinement for physical storage buffer accesses
//!
//! The alignment a front-end attaches to a load or store through a physical
//! pointer only accounts for the base of the pointee type. When the pointer
//! comes out of an `OpAccessChain`, every struct member offset, matrix
//! stride and array stride crossed on the way may misalign it further.
//! ORing all of them together with the declared alignment and keeping the
//! lowest set bit yields the strongest alignment that still holds.
use spvinstr::{
    DecorationIndex, Id, IdIndex, Instruction,
    spirv::{DecorationKind, MemoryAccess, Op, StorageClass},
};

use crate::utils::error::{FinalizeError, FinalizeResult};

const MEMBER_LAYOUT: &[DecorationKind] = &[DecorationKind::Offset, DecorationKind::MatrixStride];
const ARRAY_LAYOUT: &[DecorationKind] = &[DecorationKind::ArrayStride];

/// New value of the alignment literal at `operand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentRewrite {
    pub operand: usize,
    pub alignment: u32,
}

/// Isolate the lowest set bit of `value`; `0` stays `0`.
#[inline]
pub fn lowest_set_bit(value: u32) -> u32 {
    value & !(value & value.wrapping_sub(1))
}

pub struct AlignmentRefiner<'a> {
    index: &'a IdIndex<'a>,
    decorations: &'a DecorationIndex<'a>,
}

impl<'a> AlignmentRefiner<'a> {
    pub fn new(index: &'a IdIndex<'a>, decorations: &'a DecorationIndex<'a>) -> Self {
        Self { index, decorations }
    }

    /// Tightened alignment for `instr`, if it is a load or store through a
    /// physical storage buffer access chain and its alignment changes.
    pub fn refine(&self, instr: &Instruction) -> FinalizeResult<Option<AlignmentRewrite>> {
        let mask_operand = match instr.op() {
            Op::Load => 1,
            Op::Store => 2,
            _ => return Ok(None),
        };

        let pointer = instr.id_operand(0)?;
        let chain = self.index.instruction(pointer)?;
        if chain.op() != Op::AccessChain {
            return Ok(None);
        }

        let Some(mut current) = self.physical_pointee(pointer, chain)? else {
            return Ok(None);
        };

        let types = self.index.types();
        let mut misalignment = 0u32;
        for element in chain.id_operands().skip(1) {
            let ty = types.resolve(current)?;
            match ty.op() {
                Op::TypeStruct => {
                    let member = self.member_index(pointer, current, element)?;
                    if member as usize >= ty.num_operands() {
                        return Err(FinalizeError::MemberIndexOutOfRange {
                            chain: pointer,
                            struct_type: current,
                            member,
                            count: ty.num_operands(),
                        });
                    }
                    for decoration in self.decorations.on_member(current, member, MEMBER_LAYOUT) {
                        misalignment |= decoration.first_param();
                    }
                    current = ty.id_operand(member as usize)?;
                }
                Op::TypeArray | Op::TypeRuntimeArray => {
                    for decoration in self.decorations.on_id(current, ARRAY_LAYOUT) {
                        misalignment |= decoration.first_param();
                    }
                    current = ty.id_operand(0)?;
                }
                _ => break,
            }
        }

        let mask = instr.literal_operand(mask_operand).unwrap_or(0);
        if !MemoryAccess::from_bits_retain(mask).contains(MemoryAccess::ALIGNED) {
            return Err(FinalizeError::MissingAlignedFlag {
                instruction: instr.to_string(),
                mask,
            });
        }

        let operand = mask_operand + 1;
        let declared = instr.literal_operand(operand)?;
        let alignment = lowest_set_bit(misalignment | declared);
        if alignment == declared {
            return Ok(None);
        }
        Ok(Some(AlignmentRewrite { operand, alignment }))
    }

    /// Pointee type of the chain's base, when the base points into the
    /// physical storage buffer.
    fn physical_pointee(&self, chain_id: Id, chain: &Instruction) -> FinalizeResult<Option<Id>> {
        let base = chain.id_operand(0)?;
        let not_a_pointer = || FinalizeError::NotAPointer { chain: chain_id, base };

        let base_type = self.index.type_of(base)?.ok_or_else(not_a_pointer)?;
        if self.index.types().resolve(base_type)?.op() != Op::TypePointer {
            return Err(not_a_pointer());
        }

        let (storage_class, pointee) = self.index.types().pointer_parts(base_type)?;
        Ok((storage_class == Some(StorageClass::PhysicalStorageBuffer)).then_some(pointee))
    }

    /// Member selected by the struct index `element` of access chain `chain`.
    fn member_index(&self, chain: Id, struct_type: Id, element: Id) -> FinalizeResult<u32> {
        let constant = self.index.instruction(element)?;
        if constant.op() != Op::Constant {
            return Err(FinalizeError::NonConstantMemberIndex {
                chain,
                struct_type,
                index: element,
            });
        }
        Ok(constant.literal_operand(0)?)
    }
}

#[cfg(test)]
mod tests {
    use spvinstr::{Module, spirv::SpirvVersion, tests_utils::ModuleBuilder};

    use super::*;

    #[test]
    fn lowest_set_bit_isolates_strictest_alignment() {
        assert_eq!(lowest_set_bit(0), 0);
        assert_eq!(lowest_set_bit(1), 1);
        assert_eq!(lowest_set_bit(4 | 8 | 16), 4);
        assert_eq!(lowest_set_bit(24), 8);
        assert_eq!(lowest_set_bit(0x8000_0000), 0x8000_0000);
        assert_eq!(lowest_set_bit(u32::MAX), 1);
    }

    struct Fixture {
        module: Module,
        load: Id,
    }

    /// `load float (chain %buf 0 1 k)` with `%buf` a pointer to
    /// `{ { float @0, float[4] @8 stride 16 } @4 }`.
    fn fixture(class: StorageClass, declared: u32) -> Fixture {
        let mut b = ModuleBuilder::new(SpirvVersion::V1_5);
        let void = b.type_void();
        let float = b.type_float(32);
        let arr = b.type_array(float, 4);
        let inner = b.type_struct(&[float, arr]);
        let outer = b.type_struct(&[inner]);
        let outer_ptr = b.type_pointer(class, outer);
        let elem_ptr = b.type_pointer(class, float);
        b.decorate(arr, DecorationKind::ArrayStride, &[16]);
        b.member_decorate(inner, 0, DecorationKind::Offset, 0);
        b.member_decorate(inner, 1, DecorationKind::Offset, 8);
        b.member_decorate(outer, 0, DecorationKind::Offset, 4);
        let zero = b.constant_u32(0);
        let one = b.constant_u32(1);
        let two = b.constant_u32(2);

        b.begin_function(void);
        let buf = b.parameter(outer_ptr);
        b.begin_block();
        let chain = b.access_chain(elem_ptr, buf, &[zero, one, two]);
        let load = b.load(float, chain, Some(declared));
        b.ret();
        Fixture {
            module: b.finish(),
            load,
        }
    }

    fn refine(module: &Module, target: Id) -> FinalizeResult<Option<AlignmentRewrite>> {
        let index = IdIndex::build(module).unwrap();
        let decorations = DecorationIndex::new(&module.decorations);
        let refiner = AlignmentRefiner::new(&index, &decorations);
        refiner.refine(index.instruction(target).unwrap())
    }

    #[test]
    fn offsets_and_strides_are_combined() {
        let fixture = fixture(StorageClass::PhysicalStorageBuffer, 16);
        assert_eq!(
            refine(&fixture.module, fixture.load).unwrap(),
            Some(AlignmentRewrite {
                operand: 2,
                alignment: 4
            })
        );
    }

    #[test]
    fn non_physical_chains_are_ignored() {
        let fixture = fixture(StorageClass::StorageBuffer, 16);
        assert_eq!(refine(&fixture.module, fixture.load).unwrap(), None);
    }

    #[test]
    fn already_tight_alignment_is_left_alone() {
        let fixture = fixture(StorageClass::PhysicalStorageBuffer, 2);
        assert_eq!(refine(&fixture.module, fixture.load).unwrap(), None);
    }

    #[test]
    fn missing_aligned_flag_is_reported() {
        let mut b = ModuleBuilder::new(SpirvVersion::V1_5);
        let void = b.type_void();
        let float = b.type_float(32);
        let s = b.type_struct(&[float]);
        let s_ptr = b.type_pointer(StorageClass::PhysicalStorageBuffer, s);
        let f_ptr = b.type_pointer(StorageClass::PhysicalStorageBuffer, float);
        let zero = b.constant_u32(0);
        b.begin_function(void);
        let buf = b.parameter(s_ptr);
        b.begin_block();
        let chain = b.access_chain(f_ptr, buf, &[zero]);
        let load = b.load(float, chain, None);
        b.ret();
        let module = b.finish();

        assert!(matches!(
            refine(&module, load),
            Err(FinalizeError::MissingAlignedFlag { mask: 0, .. })
        ));
    }

    #[test]
    fn struct_index_must_be_constant() {
        let mut b = ModuleBuilder::new(SpirvVersion::V1_5);
        let void = b.type_void();
        let uint = b.type_int(32, false);
        let s = b.type_struct(&[uint, uint]);
        let s_ptr = b.type_pointer(StorageClass::PhysicalStorageBuffer, s);
        let u_ptr = b.type_pointer(StorageClass::PhysicalStorageBuffer, uint);
        b.begin_function(void);
        let buf = b.parameter(s_ptr);
        let dynamic = b.parameter(uint);
        b.begin_block();
        let chain = b.access_chain(u_ptr, buf, &[dynamic]);
        let load = b.load(uint, chain, Some(4));
        b.ret();
        let module = b.finish();

        assert!(matches!(
            refine(&module, load),
            Err(FinalizeError::NonConstantMemberIndex { index, .. }) if index == dynamic
        ));
    }
}
