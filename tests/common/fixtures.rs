//! Registry fixtures

use hep_featurespec::registry::{BranchRegistry, DerivedFeatureCatalog, RawIndex};

/// Small index used where the packaged one would hide what a test checks
pub const SMALL_INDEX: &str = r#"{
    "generation_info": {"source": "fixture"},
    "branches": {
        "EventInfoAuxDyn": {
            "eventNumber": {"shape": "()", "dtype": "uint64", "status": "success"},
            "runNumber": {"shape": "()", "dtype": "uint32", "status": "success"},
            "retired": {"shape": "()", "dtype": "uint32", "status": "error: removed"}
        },
        "InDetTrackParticlesAuxDyn": {
            "d0": {"shape": "(-1,)", "dtype": "float32", "status": "success"},
            "z0": {"shape": [-1], "dtype": "float32", "status": "success"},
            "covDiag": {"shape": "(-1, 5)", "dtype": "float32", "status": "success"}
        }
    }
}"#;

/// Registry over the packaged index and derived features
pub fn packaged_registry() -> BranchRegistry {
    BranchRegistry::new(
        Some(RawIndex::builtin().unwrap()),
        Box::new(DerivedFeatureCatalog::builtin().unwrap()),
    )
}

/// Registry over [`SMALL_INDEX`] with no derived features
pub fn small_registry() -> BranchRegistry {
    BranchRegistry::from_json_str(SMALL_INDEX).unwrap()
}

/// Registry with no raw index, only the packaged derived features
pub fn derived_only_registry() -> BranchRegistry {
    BranchRegistry::empty().with_derived(DerivedFeatureCatalog::builtin().unwrap())
}
