//! Default aliasing for local variables holding physical pointers.
use spvinstr::{Decoration, DecorationIndex, Id, IdIndex, spirv::DecorationKind};

use crate::{analysis::classify::TypeClassifier, utils::error::FinalizeResult};

const ALIASING: &[DecorationKind] = &[DecorationKind::AliasedPointer, DecorationKind::RestrictPointer];

/// `AliasedPointer` decoration for `variable` if it stores a physical
/// pointer (directly, in an array or in a struct) and carries neither
/// `AliasedPointer` nor `RestrictPointer` yet.
pub fn default_aliasing(
    index: &IdIndex<'_>,
    decorations: &DecorationIndex<'_>,
    variable: Id,
) -> FinalizeResult<Option<Decoration>> {
    let Some(stored) = index.deref_type_of(variable)? else {
        return Ok(None);
    };
    if !TypeClassifier::new(index.types()).contains_physical_pointer_or_array(stored)? {
        return Ok(None);
    }
    if decorations.on_id(variable, ALIASING).next().is_some() {
        return Ok(None);
    }
    Ok(Some(Decoration::new(variable, DecorationKind::AliasedPointer)))
}

#[cfg(test)]
mod tests {
    use spvinstr::{
        Module,
        spirv::{SpirvVersion, StorageClass},
        tests_utils::ModuleBuilder,
    };

    use super::*;

    /// A function with one local variable of type `*Function *PhysicalStorageBuffer float`
    /// and one of type `*Function float`.
    fn locals() -> (Module, Id, Id) {
        let mut b = ModuleBuilder::new(SpirvVersion::V1_5);
        let void = b.type_void();
        let float = b.type_float(32);
        let psb = b.type_pointer(StorageClass::PhysicalStorageBuffer, float);
        let local_psb = b.type_pointer(StorageClass::Function, psb);
        let local_float = b.type_pointer(StorageClass::Function, float);
        b.begin_function(void);
        b.begin_block();
        let holder = b.local_variable(local_psb);
        let plain = b.local_variable(local_float);
        b.ret();
        (b.finish(), holder, plain)
    }

    #[test]
    fn physical_pointer_holders_get_a_default() {
        let (module, holder, plain) = locals();
        let index = IdIndex::build(&module).unwrap();
        let decorations = DecorationIndex::new(&module.decorations);

        assert_eq!(
            default_aliasing(&index, &decorations, holder).unwrap(),
            Some(Decoration::new(holder, DecorationKind::AliasedPointer))
        );
        assert_eq!(default_aliasing(&index, &decorations, plain).unwrap(), None);
    }

    #[test]
    fn explicit_restrict_is_kept() {
        let (mut module, holder, _) = locals();
        module.add_decoration(Decoration::new(holder, DecorationKind::RestrictPointer));
        let index = IdIndex::build(&module).unwrap();
        let decorations = DecorationIndex::new(&module.decorations);

        assert_eq!(default_aliasing(&index, &decorations, holder).unwrap(), None);
    }
}
