//! Capability and extension inference
//!
//! Every block instruction is inspected twice:
//!
//! - by opcode, against [`OPCODE_RULES`] (derivative control, image queries,
//!   interpolation, vendor opcodes);
//! - by type, once for its result type and once for the type of each typed
//!   id operand. Loads and stores honour the storage class exemptions of the
//!   8/16-bit storage extensions, a handful of opcodes are skipped, extended
//!   instructions only go through [`EXT_INST_TYPE_RULES`] and everything else
//!   requires `Int8`/`Int16`/`Float16` for a bare small scalar.
//!
//! Vendor rules are plain table entries tagged with a [`VendorFeatures`]
//! family; a disabled family makes the entry invisible.
use std::collections::BTreeSet;

use log::debug;
use smallvec::SmallVec;
use spvinstr::{
    Id, IdIndex, Instruction, Module,
    spirv::{Capability, Extension, GlslStd450, Op, SpirvVersion, StorageClass},
};

use crate::{
    analysis::classify::{ScalarKind, TypeClass, TypeClassifier},
    utils::{
        conf::VendorFeatures,
        error::{FinalizeError, FinalizeResult},
    },
};

/// Capabilities and extensions a module needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    pub capabilities: BTreeSet<Capability>,
    pub extensions: BTreeSet<Extension>,
}

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_capability(&mut self, capability: Capability) {
        self.capabilities.insert(capability);
    }

    pub fn require_extension(&mut self, extension: Extension) {
        self.extensions.insert(extension);
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty() && self.extensions.is_empty()
    }

    /// Declare every requirement in `module`, returning those that were not
    /// declared yet.
    pub fn declare(&self, module: &mut Module) -> (Vec<Capability>, Vec<Extension>) {
        let mut capabilities = Vec::new();
        for &capability in &self.capabilities {
            if module.add_capability(capability) {
                debug!("Declared capability {}", capability);
                capabilities.push(capability);
            }
        }

        let mut extensions = Vec::new();
        for &extension in &self.extensions {
            if module.add_extension(extension) {
                debug!("Declared extension {}", extension);
                extensions.push(extension);
            }
        }

        (capabilities, extensions)
    }
}

/// Requirement triggered by an opcode alone.
pub struct OpcodeRule {
    pub ops: &'static [Op],
    /// For `OpExtInst`: the `GLSL.std.450` selectors the rule applies to.
    /// Empty for every other opcode.
    pub selectors: &'static [GlslStd450],
    /// Vendor family the rule belongs to, empty for core rules.
    pub vendor: VendorFeatures,
    pub capabilities: &'static [Capability],
    pub extensions: &'static [Extension],
}

/// Requirement triggered by an extended instruction touching a small scalar.
pub struct ExtInstTypeRule {
    pub selectors: &'static [GlslStd450],
    pub kind: ScalarKind,
    pub width: u32,
    pub vendor: VendorFeatures,
    /// The rule only applies when targeting a version strictly older.
    pub before: SpirvVersion,
    pub extension: Extension,
}

const INTERPOLATION: &[GlslStd450] = &[
    GlslStd450::InterpolateAtCentroid,
    GlslStd450::InterpolateAtSample,
    GlslStd450::InterpolateAtOffset,
];

const FREXP: &[GlslStd450] = &[GlslStd450::Frexp, GlslStd450::FrexpStruct];

pub const OPCODE_RULES: &[OpcodeRule] = &[
    OpcodeRule {
        ops: &[
            Op::DPdxFine,
            Op::DPdyFine,
            Op::FwidthFine,
            Op::DPdxCoarse,
            Op::DPdyCoarse,
            Op::FwidthCoarse,
        ],
        selectors: &[],
        vendor: VendorFeatures::empty(),
        capabilities: &[Capability::DerivativeControl],
        extensions: &[],
    },
    OpcodeRule {
        ops: &[
            Op::ImageQueryLod,
            Op::ImageQuerySize,
            Op::ImageQuerySizeLod,
            Op::ImageQuerySamples,
            Op::ImageQueryLevels,
        ],
        selectors: &[],
        vendor: VendorFeatures::empty(),
        capabilities: &[Capability::ImageQuery],
        extensions: &[],
    },
    OpcodeRule {
        ops: &[Op::ExtInst],
        selectors: INTERPOLATION,
        vendor: VendorFeatures::empty(),
        capabilities: &[Capability::InterpolationFunction],
        extensions: &[],
    },
    OpcodeRule {
        ops: &[Op::GroupNonUniformPartitionNV],
        selectors: &[],
        vendor: VendorFeatures::NV,
        capabilities: &[Capability::GroupNonUniformPartitionedNV],
        extensions: &[Extension::NvShaderSubgroupPartitioned],
    },
];

pub const EXT_INST_TYPE_RULES: &[ExtInstTypeRule] = &[
    ExtInstTypeRule {
        selectors: FREXP,
        kind: ScalarKind::Int,
        width: 16,
        vendor: VendorFeatures::AMD,
        before: SpirvVersion::V1_3,
        extension: Extension::AmdGpuShaderInt16,
    },
    ExtInstTypeRule {
        selectors: INTERPOLATION,
        kind: ScalarKind::Float,
        width: 16,
        vendor: VendorFeatures::AMD,
        before: SpirvVersion::V1_3,
        extension: Extension::AmdGpuShaderHalfFloat,
    },
];

/// Small scalars and the capability their arithmetic needs.
const SMALL_SCALARS: &[(ScalarKind, u32, Capability)] = &[
    (ScalarKind::Int, 8, Capability::Int8),
    (ScalarKind::Int, 16, Capability::Int16),
    (ScalarKind::Float, 16, Capability::Float16),
];

/// Storage classes covered by the 8-bit storage extension.
const EXEMPT_8BIT: &[StorageClass] = &[
    StorageClass::PhysicalStorageBuffer,
    StorageClass::Uniform,
    StorageClass::StorageBuffer,
    StorageClass::PushConstant,
];

/// Storage classes covered by the 16-bit storage extension.
const EXEMPT_16BIT: &[StorageClass] = &[
    StorageClass::PhysicalStorageBuffer,
    StorageClass::Uniform,
    StorageClass::StorageBuffer,
    StorageClass::PushConstant,
    StorageClass::Input,
    StorageClass::Output,
];

fn is_exempt(exempt: &[StorageClass], class: Option<StorageClass>) -> bool {
    class.is_some_and(|class| exempt.contains(&class))
}

pub struct CapabilityInferencer<'a> {
    index: &'a IdIndex<'a>,
    classifier: TypeClassifier<'a>,
    features: VendorFeatures,
    version: SpirvVersion,
}

impl<'a> CapabilityInferencer<'a> {
    pub fn new(index: &'a IdIndex<'a>, features: VendorFeatures, version: SpirvVersion) -> Self {
        Self {
            index,
            classifier: TypeClassifier::new(index.types()),
            features,
            version,
        }
    }

    #[inline]
    fn enabled(&self, vendor: VendorFeatures) -> bool {
        self.features.contains(vendor)
    }

    /// `GLSL.std.450` selector of an `OpExtInst`, `None` for any other
    /// opcode or for selectors without requirements.
    fn selector(instr: &Instruction) -> FinalizeResult<Option<GlslStd450>> {
        if instr.op() != Op::ExtInst {
            return Ok(None);
        }
        Ok(GlslStd450::from_repr(instr.literal_operand(1)?))
    }

    /// Record everything `instr` requires into `requirements`.
    pub fn infer(&self, instr: &Instruction, requirements: &mut Requirements) -> FinalizeResult<()> {
        let selector = Self::selector(instr)?;
        self.apply_opcode_rules(instr.op(), selector, requirements);

        let mut typed: SmallVec<[Id; 4]> = instr.result_type().into_iter().collect();
        for operand in instr.id_operands() {
            if let Some(ty) = self.index.type_of(operand)? {
                typed.push(ty);
            }
        }

        for ty in typed {
            self.apply_type_rules(instr, selector, ty, requirements)?;
        }
        Ok(())
    }

    fn apply_opcode_rules(&self, op: Op, selector: Option<GlslStd450>, requirements: &mut Requirements) {
        let matching = OPCODE_RULES.iter().filter(|rule| {
            self.enabled(rule.vendor)
                && rule.ops.contains(&op)
                && (rule.selectors.is_empty() || selector.is_some_and(|s| rule.selectors.contains(&s)))
        });
        for rule in matching {
            rule.capabilities
                .iter()
                .for_each(|&c| requirements.require_capability(c));
            rule.extensions
                .iter()
                .for_each(|&e| requirements.require_extension(e));
        }
    }

    fn apply_type_rules(
        &self,
        instr: &Instruction,
        selector: Option<GlslStd450>,
        ty: Id,
        requirements: &mut Requirements,
    ) -> FinalizeResult<()> {
        let basic = self.classifier.characterize(ty)?;

        match instr.op() {
            Op::Load | Op::Store => {
                if basic.class == TypeClass::Struct {
                    for &(kind, width, capability) in SMALL_SCALARS {
                        if self.classifier.contains_scalar(ty, kind, width)? {
                            requirements.require_capability(capability);
                        }
                    }
                } else if basic.width == 8 {
                    if !is_exempt(EXEMPT_8BIT, self.storage_class(instr)?) {
                        requirements.require_capability(Capability::Int8);
                    }
                } else if basic.width == 16 && !is_exempt(EXEMPT_16BIT, self.storage_class(instr)?) {
                    match basic.class {
                        TypeClass::Int => requirements.require_capability(Capability::Int16),
                        TypeClass::Float => requirements.require_capability(Capability::Float16),
                        _ => {}
                    }
                }
            }
            Op::AccessChain
            | Op::PtrAccessChain
            | Op::CopyObject
            | Op::FConvert
            | Op::SConvert
            | Op::UConvert => {}
            Op::ExtInst => {
                let Some(selector) = selector else {
                    return Ok(());
                };
                for rule in EXT_INST_TYPE_RULES {
                    if self.enabled(rule.vendor)
                        && self.version < rule.before
                        && rule.selectors.contains(&selector)
                        && self.classifier.contains_scalar(ty, rule.kind, rule.width)?
                    {
                        requirements.require_extension(rule.extension);
                    }
                }
            }
            _ => {
                for &(kind, width, capability) in SMALL_SCALARS {
                    if basic.is_scalar(kind, width) {
                        requirements.require_capability(capability);
                    }
                }
            }
        }
        Ok(())
    }

    /// Storage class of the pointer a load or store goes through.
    fn storage_class(&self, instr: &Instruction) -> FinalizeResult<Option<StorageClass>> {
        let pointer = instr.id_operand(0)?;
        let ty = self
            .index
            .type_of(pointer)?
            .ok_or_else(|| FinalizeError::UntypedPointer {
                instruction: instr.to_string(),
                pointer,
            })?;
        Ok(self.index.types().pointer_parts(ty)?.0)
    }
}
