//! Shader-model capability table.
//!
//! Each band (`sm2`..`sm5`) maps to a [`CapabilityProfile`] describing the
//! feature flags and numeric ceilings of that hardware generation. The table
//! is plain static data: adding a band means adding a row to [`PROFILES`],
//! not touching the validator or rewriter.

use std::fmt;

/// Sampler model supported by a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerTypes {
    LegacyOnly,
    Modern,
}

impl SamplerTypes {
    pub fn as_str(self) -> &'static str {
        match self {
            SamplerTypes::LegacyOnly => "legacy-only",
            SamplerTypes::Modern => "modern",
        }
    }
}

impl fmt::Display for SamplerTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability envelope of one shader-model band. `None` limits are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityProfile {
    pub band: &'static str,
    pub dynamic_branching: bool,
    pub loops: bool,
    pub predication: bool,
    pub texture_instruction_limit: Option<u32>,
    pub gradient_ops: bool,
    pub vertex_texture_fetch: bool,
    pub temp_registers: Option<u32>,
    pub instruction_slots: Option<u32>,
    pub mrt_limit: Option<u32>,
    pub sv_semantics: bool,
    pub sampler_types: SamplerTypes,
    pub typed_uavs: bool,
}

/// Registered bands, most restrictive first.
pub static PROFILES: [CapabilityProfile; 4] = [
    CapabilityProfile {
        band: "sm2",
        dynamic_branching: false,
        loops: false,
        predication: false,
        texture_instruction_limit: Some(32),
        gradient_ops: false,
        vertex_texture_fetch: false,
        temp_registers: Some(12),
        instruction_slots: Some(64),
        mrt_limit: Some(0),
        sv_semantics: false,
        sampler_types: SamplerTypes::LegacyOnly,
        typed_uavs: false,
    },
    CapabilityProfile {
        band: "sm3",
        dynamic_branching: true,
        loops: true,
        predication: true,
        texture_instruction_limit: None,
        // pixel only; stage restriction is not enforced by this table
        gradient_ops: true,
        vertex_texture_fetch: true,
        temp_registers: Some(32),
        instruction_slots: Some(512),
        mrt_limit: Some(4),
        sv_semantics: false,
        sampler_types: SamplerTypes::LegacyOnly,
        typed_uavs: false,
    },
    CapabilityProfile {
        band: "sm4",
        dynamic_branching: true,
        loops: true,
        predication: true,
        texture_instruction_limit: None,
        gradient_ops: true,
        vertex_texture_fetch: true,
        temp_registers: None,
        instruction_slots: None,
        mrt_limit: Some(8),
        sv_semantics: true,
        sampler_types: SamplerTypes::Modern,
        typed_uavs: true,
    },
    CapabilityProfile {
        band: "sm5",
        dynamic_branching: true,
        loops: true,
        predication: true,
        texture_instruction_limit: None,
        gradient_ops: true,
        vertex_texture_fetch: true,
        temp_registers: None,
        instruction_slots: None,
        mrt_limit: Some(8),
        sv_semantics: true,
        sampler_types: SamplerTypes::Modern,
        typed_uavs: true,
    },
];

/// The whole registry, in band order.
pub fn profiles() -> &'static [CapabilityProfile] {
    &PROFILES
}

/// Map a free-form profile string (`ps_3_0`, `SM5`, ...) to a band key.
///
/// Bands are tried in order; a band matches when the trimmed, lowercased
/// input starts with `smN` or contains `_N_`.
pub fn normalize_profile(raw: &str) -> Option<&'static str> {
    let p = raw.trim().to_ascii_lowercase();
    if p.is_empty() {
        return None;
    }

    const PATTERNS: [(&str, &str, &str); 4] = [
        ("sm2", "_2_", "sm2"),
        ("sm3", "_3_", "sm3"),
        ("sm4", "_4_", "sm4"),
        ("sm5", "_5_", "sm5"),
    ];

    PATTERNS
        .iter()
        .find(|(prefix, infix, _)| p.starts_with(prefix) || p.contains(infix))
        .map(|&(_, _, band)| band)
}

/// Case-insensitive exact lookup of a band key.
pub fn resolve_profile(band: &str) -> Option<&'static CapabilityProfile> {
    let band = band.trim();
    if band.is_empty() {
        return None;
    }
    PROFILES.iter().find(|p| p.band.eq_ignore_ascii_case(band))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_conventional_names() {
        assert_eq!(normalize_profile("vs_2_0"), Some("sm2"));
        assert_eq!(normalize_profile("ps_3_0"), Some("sm3"));
        assert_eq!(normalize_profile("vs_4_0"), Some("sm4"));
        assert_eq!(normalize_profile("cs_5_0"), Some("sm5"));
        assert_eq!(normalize_profile("ps_4_0_level_9_3"), Some("sm4"));
    }

    #[test]
    fn test_normalize_case_and_whitespace() {
        assert_eq!(normalize_profile("  PS_2_0 "), Some("sm2"));
        assert_eq!(normalize_profile("SM5"), Some("sm5"));
        assert_eq!(normalize_profile("sm3_custom"), Some("sm3"));
        assert_eq!(normalize_profile("\tHs_5_0\n"), Some("sm5"));
    }

    #[test]
    fn test_normalize_rejects_blank_and_unknown() {
        assert_eq!(normalize_profile(""), None);
        assert_eq!(normalize_profile("   "), None);
        assert_eq!(normalize_profile("ps_1_1"), None);
        assert_eq!(normalize_profile("glsl450"), None);
    }

    #[test]
    fn test_resolve_profile() {
        assert_eq!(resolve_profile("SM2").map(|p| p.band), Some("sm2"));
        assert_eq!(resolve_profile("sm5").map(|p| p.band), Some("sm5"));
        assert!(resolve_profile("sm6").is_none());
        assert!(resolve_profile("").is_none());
        // exact lookup, not normalization
        assert!(resolve_profile("ps_3_0").is_none());
    }

    #[test]
    fn test_table_shape() {
        let sm2 = resolve_profile("sm2").unwrap();
        assert!(!sm2.dynamic_branching && !sm2.loops && !sm2.gradient_ops);
        assert_eq!(sm2.instruction_slots, Some(64));
        assert_eq!(sm2.mrt_limit, Some(0));
        assert_eq!(sm2.sampler_types, SamplerTypes::LegacyOnly);

        let sm3 = resolve_profile("sm3").unwrap();
        assert!(sm3.dynamic_branching && sm3.loops && sm3.predication);
        assert!(!sm3.sv_semantics);
        assert_eq!(sm3.texture_instruction_limit, None);

        for band in ["sm4", "sm5"] {
            let p = resolve_profile(band).unwrap();
            assert_eq!(p.instruction_slots, None);
            assert_eq!(p.temp_registers, None);
            assert_eq!(p.mrt_limit, Some(8));
            assert!(p.sv_semantics && p.typed_uavs);
            assert_eq!(p.sampler_types.to_string(), "modern");
        }
        assert_eq!(profiles().len(), 4);
    }
}
