use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use spvinstr::{Module, spirv::SpirvVersion};

use crate::utils::error::FinalizeResult;

bitflags! {
    /// Vendor extension families whose opcode and type rules are enabled.
    ///
    /// Rules tagged with a family are ignored unless the family is part of
    /// the configured set; the instruction then falls through to the
    /// generic handling.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct VendorFeatures: u32 {
        const AMD = 1 << 0;
        const NV = 1 << 1;
    }
}

impl Default for VendorFeatures {
    fn default() -> Self {
        Self::empty()
    }
}

/// Options of the finalize pass.
///
/// ```rust
/// # use spvpost::utils::conf::{FinalizeConfig, VendorFeatures};
/// let config = FinalizeConfig::from_toml_str(r#"vendor_features = "AMD | NV""#).unwrap();
/// assert_eq!(config.vendor_features, VendorFeatures::AMD | VendorFeatures::NV);
/// assert_eq!(config.target_version, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FinalizeConfig {
    pub vendor_features: VendorFeatures,
    /// Version the version-gated rules compare against. Falls back to the
    /// module header when unset.
    pub target_version: Option<SpirvVersion>,
}

impl FinalizeConfig {
    pub fn from_toml_str(source: &str) -> FinalizeResult<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn with_vendor_features(mut self, features: VendorFeatures) -> Self {
        self.vendor_features = features;
        self
    }

    pub fn with_target_version(mut self, version: SpirvVersion) -> Self {
        self.target_version = Some(version);
        self
    }

    pub fn effective_version(&self, module: &Module) -> SpirvVersion {
        self.target_version.unwrap_or(module.version)
    }
}
