//! Final legalization pass of the SPIR-V backend.
//!
//! Runs once the instruction graph of a shader is complete and before it is
//! serialized. [`finalize`] infers the capabilities and extensions the module
//! needs, drops decorations on code that can never execute, tightens the
//! alignment of physical storage buffer accesses and gives local variables
//! holding physical pointers a default aliasing decoration.
//!
//! ```rust
//! # use spvinstr::{Module, spirv::SpirvVersion};
//! # use spvpost::{FinalizeConfig, finalize};
//! let mut module = Module::new(SpirvVersion::V1_5);
//! let report = finalize(&mut module, &FinalizeConfig::default()).unwrap();
//! assert!(report.is_noop());
//! ```

pub mod analysis;
pub mod finalize;
pub mod passes;
pub mod utils;

pub use finalize::{FinalizePlan, FinalizeReport, InstructionLocation, finalize};
pub use utils::{
    conf::{FinalizeConfig, VendorFeatures},
    error::{FinalizeError, FinalizeResult},
};
