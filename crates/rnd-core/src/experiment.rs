//! Experiment definitions and their result text.

use crate::error::CatalogError;
use crate::id::ExperimentId;
use crate::rng::SimRng;
use crate::situation::{Situation, SituationMask};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result strings for an experiment. Variants are keyed by
/// `{body}{situation}{biome}`, `{body}{situation}` or `{body}`; several
/// strings may share one key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub default: String,
    #[serde(default)]
    pub variants: HashMap<String, Vec<String>>,
}

impl ResultTable {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            variants: HashMap::new(),
        }
    }

    pub fn add(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.variants.entry(key.into()).or_default().push(text.into());
    }

    /// Resolve a result string for the given location. The most specific
    /// key with candidates wins; among its candidates one is chosen
    /// uniformly. Falls back to the default string.
    pub fn resolve(
        &self,
        body: &str,
        situation: Situation,
        biome: &str,
        rng: &mut SimRng,
    ) -> String {
        let keys = [
            format!("{body}{}{biome}", situation.tag()),
            format!("{body}{}", situation.tag()),
            body.to_string(),
        ];
        keys.iter()
            .filter_map(|key| self.variants.get(key))
            .find(|candidates| !candidates.is_empty())
            .and_then(|candidates| rng.next_index(candidates.len()).map(|i| candidates[i].clone()))
            .unwrap_or_else(|| self.default.clone())
    }
}

/// A measurable action definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScienceExperiment {
    pub id: ExperimentId,
    pub title: String,
    /// Currency worth of one reference unit of data, before multipliers.
    pub base_value: f64,
    /// Maximum currency a single subject of this experiment can yield.
    pub science_cap: f64,
    /// Data units per reference unit.
    pub data_scale: f64,
    /// Situations the experiment can be performed in.
    pub situation_mask: SituationMask,
    /// Situations in which the biome is part of the subject key.
    pub biome_mask: SituationMask,
    pub results: ResultTable,
}

impl ScienceExperiment {
    pub fn is_available_while(&self, situation: Situation) -> bool {
        self.situation_mask.contains(situation)
    }

    pub fn biome_is_relevant_while(&self, situation: Situation) -> bool {
        self.biome_mask.contains(situation)
    }
}

/// All experiment definitions, frozen after loading.
#[derive(Debug, Clone, Default)]
pub struct ExperimentCatalog {
    experiments: HashMap<ExperimentId, ScienceExperiment>,
    order: Vec<ExperimentId>,
}

impl ExperimentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, experiment: ScienceExperiment) -> Result<(), CatalogError> {
        if self.experiments.contains_key(&experiment.id) {
            return Err(CatalogError::DuplicateExperiment(experiment.id));
        }
        if !(experiment.science_cap > 0.0 && experiment.science_cap.is_finite()) {
            return Err(CatalogError::InvalidCap {
                id: experiment.id,
                cap: experiment.science_cap,
            });
        }
        if !(experiment.data_scale > 0.0 && experiment.data_scale.is_finite()) {
            return Err(CatalogError::InvalidDataScale {
                id: experiment.id,
                scale: experiment.data_scale,
            });
        }
        self.order.push(experiment.id.clone());
        self.experiments.insert(experiment.id.clone(), experiment);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ScienceExperiment> {
        self.experiments.get(id)
    }

    /// Experiment ids in registration order.
    pub fn ids(&self) -> &[ExperimentId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScienceExperiment> {
        self.order.iter().filter_map(|id| self.experiments.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{crew_report, eva_report};

    #[test]
    fn exact_key_beats_fallbacks() {
        let mut table = ResultTable::new("Nothing happens.");
        table.add("KerbinSrfLandedShores", "Waves lap at your boots.");
        table.add("KerbinSrfLanded", "You stand on Kerbin.");
        let mut rng = SimRng::new(7);

        let text = table.resolve("Kerbin", Situation::SrfLanded, "Shores", &mut rng);
        assert_eq!(text, "Waves lap at your boots.");

        let text = table.resolve("Kerbin", Situation::SrfLanded, "Grasslands", &mut rng);
        assert_eq!(text, "You stand on Kerbin.");

        let text = table.resolve("Mun", Situation::SrfLanded, "Midlands", &mut rng);
        assert_eq!(text, "Nothing happens.");
    }

    #[test]
    fn multiple_candidates_are_all_reachable() {
        let mut table = ResultTable::new("default");
        for text in ["a", "b", "c"] {
            table.add("Kerbin", text);
        }
        let mut rng = SimRng::new(99);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(table.resolve("Kerbin", Situation::InSpaceHigh, "", &mut rng));
        }
        assert_eq!(seen.len(), 3);
        assert!(!seen.contains("default"));
    }

    #[test]
    fn empty_candidate_list_falls_back() {
        let mut table = ResultTable::new("default");
        table.variants.insert("Kerbin".to_string(), Vec::new());
        let mut rng = SimRng::new(1);
        assert_eq!(table.resolve("Kerbin", Situation::SrfLanded, "Shores", &mut rng), "default");
    }

    #[test]
    fn catalog_keeps_registration_order() {
        let mut catalog = ExperimentCatalog::new();
        catalog.register(eva_report()).unwrap();
        catalog.register(crew_report()).unwrap();
        let ids: Vec<&str> = catalog.ids().iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["evaReport", "crewReport"]);
        assert!(catalog.get("evaReport").is_some());
        assert!(catalog.get("seismicScan").is_none());
    }

    #[test]
    fn invalid_definitions_rejected() {
        let mut catalog = ExperimentCatalog::new();
        let mut bad = eva_report();
        bad.science_cap = -1.0;
        assert!(matches!(catalog.register(bad), Err(CatalogError::InvalidCap { .. })));

        let mut bad = eva_report();
        bad.data_scale = 0.0;
        assert!(matches!(catalog.register(bad), Err(CatalogError::InvalidDataScale { .. })));

        catalog.register(eva_report()).unwrap();
        assert!(matches!(
            catalog.register(eva_report()),
            Err(CatalogError::DuplicateExperiment(_))
        ));
    }

    #[test]
    fn availability_masks() {
        let eva = eva_report();
        assert!(eva.is_available_while(Situation::SrfLanded));
        assert!(eva.biome_is_relevant_while(Situation::SrfLanded));
        assert!(!eva.biome_is_relevant_while(Situation::InSpaceHigh));
    }
}
