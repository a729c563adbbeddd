//! 8/16-bit storage requirements of physical storage buffer pointers.
//!
//! Physical pointers may be created out of integers and never be backed by a
//! variable, so the pointer type table is scanned directly instead of
//! relying on the per-instruction rules.
use spvinstr::{
    spirv::{Capability, Extension, Op, StorageClass},
    types::TypeTable,
};

use crate::{
    analysis::classify::{ScalarKind, TypeClassifier},
    passes::capabilities::Requirements,
    utils::error::FinalizeResult,
};

pub fn scan_physical_pointers(types: &TypeTable, requirements: &mut Requirements) -> FinalizeResult<()> {
    let classifier = TypeClassifier::new(types);
    for pointer in types.grouped(Op::TypePointer) {
        let Some(id) = pointer.result_id() else {
            continue;
        };
        let (storage_class, pointee) = types.pointer_parts(id)?;
        if storage_class != Some(StorageClass::PhysicalStorageBuffer) {
            continue;
        }

        if classifier.contains_scalar(pointee, ScalarKind::Int, 8)? {
            requirements.require_extension(Extension::Khr8BitStorage);
            requirements.require_capability(Capability::StorageBuffer8BitAccess);
        }
        if classifier.contains_scalar(pointee, ScalarKind::Int, 16)?
            || classifier.contains_scalar(pointee, ScalarKind::Float, 16)?
        {
            requirements.require_extension(Extension::Khr16BitStorage);
            requirements.require_capability(Capability::StorageBuffer16BitAccess);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use spvinstr::{spirv::SpirvVersion, tests_utils::ModuleBuilder};

    use super::*;

    #[test]
    fn only_physical_pointees_count() {
        let mut b = ModuleBuilder::new(SpirvVersion::V1_5);
        let byte = b.type_int(8, false);
        let half = b.type_float(16);
        let float = b.type_float(32);
        let with_byte = b.type_struct(&[float, byte]);
        b.type_pointer(StorageClass::PhysicalStorageBuffer, with_byte);
        b.type_pointer(StorageClass::Function, half);
        let module = b.finish();

        let mut requirements = Requirements::new();
        scan_physical_pointers(&module.types, &mut requirements).unwrap();
        assert_eq!(requirements.extensions, BTreeSet::from([Extension::Khr8BitStorage]));
        assert_eq!(
            requirements.capabilities,
            BTreeSet::from([Capability::StorageBuffer8BitAccess])
        );
    }

    #[test]
    fn half_floats_need_sixteen_bit_storage() {
        let mut b = ModuleBuilder::new(SpirvVersion::V1_5);
        let half = b.type_float(16);
        let vec4 = b.type_vector(half, 4);
        b.type_pointer(StorageClass::PhysicalStorageBuffer, vec4);
        let module = b.finish();

        let mut requirements = Requirements::new();
        scan_physical_pointers(&module.types, &mut requirements).unwrap();
        assert_eq!(requirements.extensions, BTreeSet::from([Extension::Khr16BitStorage]));
        assert_eq!(
            requirements.capabilities,
            BTreeSet::from([Capability::StorageBuffer16BitAccess])
        );
    }
}
