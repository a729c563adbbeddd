//! Closed SPIR-V enumerations
//!
//! Only the enumerants that the instruction graph and its passes reason about
//! are listed. Discriminants match the SPIR-V unified specification, which
//! lets literal operand words be decoded with `from_repr`.
use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, FromRepr, IntoStaticStr};

pub mod op;

pub use op::Op;

/// Optional features a module must declare through `OpCapability`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, FromRepr, IntoStaticStr, Display,
)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u32)]
pub enum Capability {
    Matrix = 0,
    Shader = 1,
    Geometry = 2,
    Tessellation = 3,
    Addresses = 4,
    Linkage = 5,
    Kernel = 6,
    Float16 = 9,
    Float64 = 10,
    Int64 = 11,
    Int16 = 22,
    ImageGatherExtended = 25,
    SampledRect = 37,
    Int8 = 39,
    ImageQuery = 50,
    DerivativeControl = 51,
    InterpolationFunction = 52,
    GroupNonUniform = 61,
    GroupNonUniformBallot = 64,
    StorageBuffer16BitAccess = 4433,
    UniformAndStorageBuffer16BitAccess = 4434,
    StoragePushConstant16 = 4435,
    StorageInputOutput16 = 4436,
    StorageBuffer8BitAccess = 4448,
    UniformAndStorageBuffer8BitAccess = 4449,
    StoragePushConstant8 = 4450,
    GroupNonUniformPartitionedNV = 5297,
    PhysicalStorageBufferAddresses = 5347,
}

/// Extensions a module must declare through `OpExtension`.
///
/// The string form (via `Display`/`EnumString`) is the exact extension name
/// that appears in the binary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, EnumString, IntoStaticStr, Display,
)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Extension {
    #[strum(serialize = "SPV_KHR_8bit_storage")]
    Khr8BitStorage,
    #[strum(serialize = "SPV_KHR_16bit_storage")]
    Khr16BitStorage,
    #[strum(serialize = "SPV_KHR_storage_buffer_storage_class")]
    KhrStorageBufferStorageClass,
    #[strum(serialize = "SPV_KHR_physical_storage_buffer")]
    KhrPhysicalStorageBuffer,
    #[strum(serialize = "SPV_EXT_physical_storage_buffer")]
    ExtPhysicalStorageBuffer,
    #[strum(serialize = "SPV_AMD_gpu_shader_int16")]
    AmdGpuShaderInt16,
    #[strum(serialize = "SPV_AMD_gpu_shader_half_float")]
    AmdGpuShaderHalfFloat,
    #[strum(serialize = "SPV_NV_shader_subgroup_partitioned")]
    NvShaderSubgroupPartitioned,
}

/// Storage class literal carried by `OpTypePointer` and `OpVariable`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, FromRepr, IntoStaticStr, Display,
)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u32)]
pub enum StorageClass {
    UniformConstant = 0,
    Input = 1,
    Uniform = 2,
    Output = 3,
    Workgroup = 4,
    CrossWorkgroup = 5,
    Private = 6,
    Function = 7,
    Generic = 8,
    PushConstant = 9,
    AtomicCounter = 10,
    Image = 11,
    StorageBuffer = 12,
    /// Raw/physical pointers (`SPV_KHR_physical_storage_buffer`, formerly the
    /// `EXT` flavour with the same value).
    PhysicalStorageBuffer = 5349,
}

/// Decoration kinds carried by `OpDecorate` / `OpMemberDecorate`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, FromRepr, IntoStaticStr, Display,
)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u32)]
pub enum DecorationKind {
    RelaxedPrecision = 0,
    SpecId = 1,
    Block = 2,
    BufferBlock = 3,
    RowMajor = 4,
    ColMajor = 5,
    ArrayStride = 6,
    MatrixStride = 7,
    GLSLShared = 8,
    GLSLPacked = 9,
    BuiltIn = 11,
    NoPerspective = 13,
    Flat = 14,
    Centroid = 16,
    Sample = 17,
    Invariant = 18,
    Restrict = 19,
    Aliased = 20,
    Volatile = 21,
    Coherent = 23,
    NonWritable = 24,
    NonReadable = 25,
    Location = 30,
    Component = 31,
    Index = 32,
    Binding = 33,
    DescriptorSet = 34,
    Offset = 35,
    NoContraction = 42,
    NonUniform = 5300,
    RestrictPointer = 5355,
    AliasedPointer = 5356,
}

bitflags! {
    /// Memory operand mask of `OpLoad`, `OpStore` and the copy instructions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct MemoryAccess: u32 {
        const VOLATILE = 1 << 0;
        /// An alignment literal follows the mask.
        const ALIGNED = 1 << 1;
        const NONTEMPORAL = 1 << 2;
        const MAKE_POINTER_AVAILABLE = 1 << 3;
        const MAKE_POINTER_VISIBLE = 1 << 4;
        const NON_PRIVATE_POINTER = 1 << 5;
    }
}

/// Instruction selectors of the `GLSL.std.450` extended instruction set that
/// carry feature requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, FromRepr)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u32)]
pub enum GlslStd450 {
    Frexp = 51,
    FrexpStruct = 52,
    InterpolateAtCentroid = 76,
    InterpolateAtSample = 77,
    InterpolateAtOffset = 78,
}

/// SPIR-V version as stored in the module header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpirvVersion {
    pub major: u8,
    pub minor: u8,
}

impl SpirvVersion {
    pub const V1_0: Self = Self::new(1, 0);
    pub const V1_1: Self = Self::new(1, 1);
    pub const V1_2: Self = Self::new(1, 2);
    pub const V1_3: Self = Self::new(1, 3);
    pub const V1_4: Self = Self::new(1, 4);
    pub const V1_5: Self = Self::new(1, 5);
    pub const V1_6: Self = Self::new(1, 6);

    #[inline]
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Header word encoding: `0 | major | minor | 0`.
    #[inline]
    pub const fn word(&self) -> u32 {
        ((self.major as u32) << 16) | ((self.minor as u32) << 8)
    }

    #[inline]
    pub const fn from_word(word: u32) -> Self {
        Self {
            major: ((word >> 16) & 0xff) as u8,
            minor: ((word >> 8) & 0xff) as u8,
        }
    }
}

impl Default for SpirvVersion {
    fn default() -> Self {
        Self::V1_0
    }
}

impl std::fmt::Display for SpirvVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
