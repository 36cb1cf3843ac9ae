//! Shared test helpers for unit tests, integration tests, and downstream
//! crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests and, via the `test-utils` feature, in other
//! crates' tests.

use crate::biome::{Biome, BiomeCatalog, Body, MiniBiome, SituationMultipliers};
use crate::experiment::{ExperimentCatalog, ResultTable, ScienceExperiment};
use crate::id::*;
use crate::parts::{AvailablePart, PartCatalog};
use crate::situation::{Situation, SituationMask};
use crate::subject::ScienceSubject;

// ===========================================================================
// Bodies
// ===========================================================================

fn biome(name: &str) -> Biome {
    Biome {
        name: name.to_string(),
        display_name: name.to_string(),
    }
}

/// Kerbin with unit difficulty on the surface.
pub fn kerbin() -> Body {
    Body {
        id: BodyId::from("Kerbin"),
        title: "Kerbin".to_string(),
        biomes: vec![
            biome("Water"),
            biome("Shores"),
            biome("Grasslands"),
            biome("Northern Ice Shelf"),
        ],
        mini_biomes: vec![
            MiniBiome {
                tag: "LaunchPad".to_string(),
                unity_tag: "KSC_LaunchPad_Platform".to_string(),
                display_name: "Launch Pad".to_string(),
            },
            MiniBiome {
                tag: "Runway".to_string(),
                unity_tag: "KSC_Runway".to_string(),
                display_name: "Runway".to_string(),
            },
        ],
        multipliers: SituationMultipliers {
            landed: 1.0,
            splashed: 1.0,
            flying_low: 0.7,
            flying_high: 0.9,
            in_space_low: 1.0,
            in_space_high: 1.5,
        },
        has_atmosphere: true,
        has_ocean: true,
    }
}

/// The Mun: no atmosphere, no ocean, no mini-biomes.
pub fn mun() -> Body {
    Body {
        id: BodyId::from("Mun"),
        title: "Mun".to_string(),
        biomes: vec![biome("Midlands"), biome("Highlands"), biome("Canyons")],
        mini_biomes: Vec::new(),
        multipliers: SituationMultipliers {
            landed: 4.0,
            in_space_low: 3.0,
            in_space_high: 2.0,
            ..SituationMultipliers::UNIT
        },
        has_atmosphere: false,
        has_ocean: false,
    }
}

pub fn biome_catalog() -> BiomeCatalog {
    let mut catalog = BiomeCatalog::new();
    catalog.register(kerbin()).expect("kerbin registers");
    catalog.register(mun()).expect("mun registers");
    catalog
}

// ===========================================================================
// Experiments
// ===========================================================================

/// EVA report: worth 5.0, capped at 5.0, biome-specific near the surface.
pub fn eva_report() -> ScienceExperiment {
    let mut results = ResultTable::new("You record the view.");
    results.add("KerbinSrfLandedShores", "The waves lap gently at your boots.");
    ScienceExperiment {
        id: ExperimentId::from("evaReport"),
        title: "EVA Report".to_string(),
        base_value: 5.0,
        science_cap: 5.0,
        data_scale: 1.0,
        situation_mask: SituationMask::ALL,
        biome_mask: [Situation::SrfLanded, Situation::SrfSplashed, Situation::FlyingLow]
            .into_iter()
            .collect(),
        results,
    }
}

/// Crew report: worth 5.0, capped at 5.0, biome-specific on the surface.
pub fn crew_report() -> ScienceExperiment {
    ScienceExperiment {
        id: ExperimentId::from("crewReport"),
        title: "Crew Report".to_string(),
        base_value: 5.0,
        science_cap: 5.0,
        data_scale: 1.0,
        situation_mask: SituationMask::ALL,
        biome_mask: [Situation::SrfLanded, Situation::SrfSplashed]
            .into_iter()
            .collect(),
        results: ResultTable::new("The crew reports in."),
    }
}

pub fn experiment_catalog() -> ExperimentCatalog {
    let mut catalog = ExperimentCatalog::new();
    catalog.register(eva_report()).expect("evaReport registers");
    catalog.register(crew_report()).expect("crewReport registers");
    catalog
}

// ===========================================================================
// Subjects
// ===========================================================================

/// A fresh subject with the given economics and nothing collected.
pub fn subject_with(base_value: f64, cap: f64, difficulty: f64, data_scale: f64) -> ScienceSubject {
    ScienceSubject {
        id: SubjectId::from("test@KerbinSrfLandedShores"),
        title: "Test subject".to_string(),
        experiment: ExperimentId::from("test"),
        body: BodyId::from("Kerbin"),
        situation: Situation::SrfLanded,
        biome: "Shores".to_string(),
        collected: 0.0,
        science_cap: cap,
        difficulty,
        base_value,
        data_scale,
    }
}

// ===========================================================================
// Parts
// ===========================================================================

pub fn mk1pod() -> PartId {
    PartId::from("mk1pod")
}

pub fn mk1pod_part() -> AvailablePart {
    AvailablePart {
        id: mk1pod(),
        title: "Mk1 Command Pod".to_string(),
        tech_required: Some(TechId::from("start")),
        entry_cost: 0,
        contract_objectives: vec!["CommandPod".to_string()],
    }
}

pub fn part(id: &str, tech: Option<&str>, objectives: &[&str]) -> AvailablePart {
    AvailablePart {
        id: PartId::from(id),
        title: id.to_string(),
        tech_required: tech.map(TechId::from),
        entry_cost: 100,
        contract_objectives: objectives.iter().map(|o| o.to_string()).collect(),
    }
}

pub fn part_catalog() -> PartCatalog {
    let mut catalog = PartCatalog::new();
    catalog.register(mk1pod_part()).expect("mk1pod registers");
    catalog
        .register(part("solarPanels5", Some("basicScience"), &["Generator"]))
        .expect("solar panel registers");
    catalog
        .register(part("longAntenna", Some("engineering101"), &["Antenna"]))
        .expect("antenna registers");
    catalog
}
