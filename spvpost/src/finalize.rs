//! Finalize orchestration
//!
//! [`finalize`] runs in two phases. [`FinalizePlan::compute`] runs every
//! analysis over an immutable view of the module and collects the changes:
//! decorations to prune, alignment literals to rewrite, decorations to add
//! and capabilities/extensions to declare. [`FinalizePlan::apply`] then
//! performs them. A module that violates a precondition fails during the
//! first phase and is left exactly as it was.
use std::collections::BTreeSet;

use log::{debug, info};
use spvinstr::{
    Decoration, DecorationIndex, Id, IdIndex, Instruction, Module,
    spirv::{Capability, Extension},
};

use crate::{
    analysis::reachability::Reachability,
    passes::{
        aliasing::default_aliasing,
        alignment::{AlignmentRefiner, AlignmentRewrite},
        capabilities::{CapabilityInferencer, Requirements},
        prune::{is_unreachable_target, prune_decorations},
        storage::scan_physical_pointers,
    },
    utils::{
        conf::FinalizeConfig,
        error::{FinalizeError, FinalizeResult},
    },
};

/// Position of a block instruction: function, block and instruction
/// indices, in module order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstructionLocation {
    pub function: usize,
    pub block: usize,
    pub instruction: usize,
}

impl InstructionLocation {
    fn resolve_mut<'m>(&self, module: &'m mut Module) -> FinalizeResult<&'m mut Instruction> {
        module
            .functions
            .get_mut(self.function)
            .and_then(|function| function.blocks.get_mut(self.block))
            .and_then(|block| block.instructions.get_mut(self.instruction))
            .ok_or_else(|| self.stale())
    }

    fn resolve<'m>(&self, module: &'m Module) -> FinalizeResult<&'m Instruction> {
        module
            .functions
            .get(self.function)
            .and_then(|function| function.blocks.get(self.block))
            .and_then(|block| block.instructions.get(self.instruction))
            .ok_or_else(|| self.stale())
    }

    fn stale(&self) -> FinalizeError {
        FinalizeError::StalePlan {
            function: self.function,
            block: self.block,
            instruction: self.instruction,
        }
    }
}

/// What [`finalize`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeReport {
    pub decorations_pruned: usize,
    pub decorations_added: usize,
    pub alignments_rewritten: usize,
    /// Capabilities the module did not declare before, in enum order.
    pub capabilities_added: Vec<Capability>,
    /// Extensions the module did not declare before, in enum order.
    pub extensions_added: Vec<Extension>,
}

impl FinalizeReport {
    /// Whether the module came out unchanged.
    pub fn is_noop(&self) -> bool {
        self.decorations_pruned == 0
            && self.decorations_added == 0
            && self.alignments_rewritten == 0
            && self.capabilities_added.is_empty()
            && self.extensions_added.is_empty()
    }
}

/// Every change [`finalize`] is about to make to a module.
#[derive(Debug, Clone, Default)]
pub struct FinalizePlan {
    pub unreachable_definitions: BTreeSet<Id>,
    pub rewrites: Vec<(InstructionLocation, AlignmentRewrite)>,
    pub decorations: Vec<Decoration>,
    pub requirements: Requirements,
}

impl FinalizePlan {
    pub fn compute(module: &Module, config: &FinalizeConfig) -> FinalizeResult<Self> {
        let reachability = Reachability::analyze(module);
        let index = IdIndex::build(module)?;
        // Later queries must see the decorations as they are after pruning.
        let decorations = DecorationIndex::new_filtered(&module.decorations, |decoration| {
            !is_unreachable_target(decoration, &reachability.unreachable_definitions)
        });

        let inferencer =
            CapabilityInferencer::new(&index, config.vendor_features, config.effective_version(module));
        let refiner = AlignmentRefiner::new(&index, &decorations);

        let mut plan = FinalizePlan {
            unreachable_definitions: reachability.unreachable_definitions.clone(),
            ..Default::default()
        };

        for (f, function) in module.functions.iter().enumerate() {
            for (b, block) in function.blocks.iter().enumerate() {
                for (i, instr) in block.instructions.iter().enumerate() {
                    inferencer.infer(instr, &mut plan.requirements)?;
                    if let Some(rewrite) = refiner.refine(instr)? {
                        let location = InstructionLocation {
                            function: f,
                            block: b,
                            instruction: i,
                        };
                        plan.rewrites.push((location, rewrite));
                    }
                }

                for variable in block.variables.iter().filter_map(|v| v.result_id()) {
                    if let Some(decoration) = default_aliasing(&index, &decorations, variable)? {
                        plan.decorations.push(decoration);
                    }
                }
            }
        }

        scan_physical_pointers(&module.types, &mut plan.requirements)?;
        Ok(plan)
    }

    /// Apply the plan to the module it was computed from.
    pub fn apply(self, module: &mut Module) -> FinalizeResult<FinalizeReport> {
        // Nothing is touched until every rewrite is known to land.
        for (location, rewrite) in &self.rewrites {
            location.resolve(module)?.literal_operand(rewrite.operand)?;
        }

        let mut report = FinalizeReport {
            decorations_pruned: prune_decorations(&mut module.decorations, &self.unreachable_definitions),
            ..Default::default()
        };

        for (location, rewrite) in &self.rewrites {
            let instr = location.resolve_mut(module)?;
            instr.set_literal_operand(rewrite.operand, rewrite.alignment)?;
            debug!("Tightened alignment of `{}` to {}", instr, rewrite.alignment);
            report.alignments_rewritten += 1;
        }

        for decoration in self.decorations {
            debug!("Added default `{}`", decoration);
            module.add_decoration(decoration);
            report.decorations_added += 1;
        }

        let (capabilities, extensions) = self.requirements.declare(module);
        report.capabilities_added = capabilities;
        report.extensions_added = extensions;
        Ok(report)
    }
}

/// Run the final legalization sweep over `module`.
///
/// On success the module declares every capability and extension its types
/// and opcodes require, carries no decoration on ids defined in unreachable
/// blocks, has tightened alignments on physical storage buffer accesses and
/// has a default `AliasedPointer` on local variables holding physical
/// pointers. On error it is left untouched.
pub fn finalize(module: &mut Module, config: &FinalizeConfig) -> FinalizeResult<FinalizeReport> {
    let plan = FinalizePlan::compute(module, config)?;
    let report = plan.apply(module)?;
    info!(
        "Finalized module: {} decoration(s) pruned, {} added, {} alignment(s) tightened, {} new capabilities, {} new extensions",
        report.decorations_pruned,
        report.decorations_added,
        report.alignments_rewritten,
        report.capabilities_added.len(),
        report.extensions_added.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use spvinstr::{
        spirv::{DecorationKind, SpirvVersion, StorageClass},
        tests_utils::ModuleBuilder,
    };

    use super::*;

    #[test]
    fn empty_module_is_a_noop() {
        let mut module = Module::new(SpirvVersion::V1_5);
        let report = finalize(&mut module, &FinalizeConfig::default()).unwrap();
        assert!(report.is_noop());
        assert_eq!(module, Module::new(SpirvVersion::V1_5));
    }

    #[test]
    fn plan_sees_decorations_after_pruning() {
        let mut b = ModuleBuilder::new(SpirvVersion::V1_5);
        let void = b.type_void();
        let float = b.type_float(32);
        let psb = b.type_pointer(StorageClass::PhysicalStorageBuffer, float);
        let local = b.type_pointer(StorageClass::Function, psb);
        b.begin_function(void);
        b.begin_block();
        let holder = b.local_variable(local);
        b.ret();
        b.begin_block();
        let dead = b.local_variable(local);
        b.ret();
        b.decorate(dead, DecorationKind::RestrictPointer, &[]);
        let module = b.finish();

        let plan = FinalizePlan::compute(&module, &FinalizeConfig::default()).unwrap();
        assert_eq!(plan.unreachable_definitions, BTreeSet::from([dead]));
        // The restrict on `dead` is pruned, so it gets the default again.
        assert_eq!(
            plan.decorations,
            vec![
                Decoration::new(holder, DecorationKind::AliasedPointer),
                Decoration::new(dead, DecorationKind::AliasedPointer),
            ]
        );
    }

    #[test]
    fn stale_plans_are_rejected_before_mutation() {
        let mut module = Module::new(SpirvVersion::V1_5);
        module.add_decoration(Decoration::new(Id(7), DecorationKind::RelaxedPrecision));
        let plan = FinalizePlan {
            unreachable_definitions: BTreeSet::from([Id(7)]),
            rewrites: vec![(
                InstructionLocation {
                    function: 0,
                    block: 0,
                    instruction: 0,
                },
                AlignmentRewrite {
                    operand: 2,
                    alignment: 4,
                },
            )],
            ..Default::default()
        };

        let before = module.clone();
        assert!(matches!(
            plan.apply(&mut module),
            Err(FinalizeError::StalePlan { function: 0, .. })
        ));
        assert_eq!(module, before);
    }
}
