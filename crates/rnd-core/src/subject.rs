//! Science subjects: one (experiment, situation, body, biome) tuple each,
//! tracking how much currency has already been collected from it.
//!
//! Subjects are created lazily the first time a measurement references
//! them and live until the session resets. Collected totals restored from a
//! save are held until the matching subject is created or looked up.

use crate::biome::BiomeCatalog;
use crate::experiment::{ExperimentCatalog, ScienceExperiment};
use crate::id::{BodyId, ExperimentId, SubjectId};
use crate::situation::Situation;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ---------------------------------------------------------------------------
// Subject keys
// ---------------------------------------------------------------------------

/// A source-specific subject (an asteroid sample, for instance).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectSource {
    pub uid: String,
    pub title: String,
}

/// The fields a subject id is composed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKey {
    pub experiment: ExperimentId,
    pub body: BodyId,
    pub situation: Situation,
    /// Empty when the experiment ignores biomes in this situation.
    pub biome: String,
    pub source_uid: Option<String>,
}

impl SubjectKey {
    /// `"{experiment}@{body}{situation}{biome}"`, plus `"_{uid}"` for
    /// source-specific subjects.
    pub fn id(&self) -> SubjectId {
        let mut id = format!(
            "{}@{}{}{}",
            self.experiment,
            self.body,
            self.situation.tag(),
            self.biome
        );
        if let Some(uid) = &self.source_uid {
            id.push('_');
            id.push_str(uid);
        }
        SubjectId(id)
    }

    /// Split a subject id back into its fields. The body is the longest
    /// catalog body matching the text after `@`.
    pub fn parse(id: &str, biomes: &BiomeCatalog) -> Option<SubjectKey> {
        let (experiment, rest) = id.split_once('@')?;
        let body = biomes
            .bodies()
            .iter()
            .map(|b| b.id.as_str())
            .filter(|b| rest.starts_with(b))
            .max_by_key(|b| b.len())?;
        let rest = &rest[body.len()..];
        let situation = Situation::ALL
            .into_iter()
            .find(|s| rest.starts_with(s.tag()))?;
        let rest = &rest[situation.tag().len()..];
        let (biome, source_uid) = match rest.split_once('_') {
            Some((biome, uid)) => (biome, Some(uid.to_string())),
            None => (rest, None),
        };
        Some(SubjectKey {
            experiment: ExperimentId::from(experiment),
            body: BodyId::from(body),
            situation,
            biome: biome.to_string(),
            source_uid,
        })
    }
}

// ---------------------------------------------------------------------------
// ScienceSubject
// ---------------------------------------------------------------------------

/// A subject eligible for currency awards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScienceSubject {
    pub id: SubjectId,
    pub title: String,
    pub experiment: ExperimentId,
    pub body: BodyId,
    pub situation: Situation,
    pub biome: String,
    /// Currency already collected. Only grows, except on session reset.
    pub collected: f64,
    /// Most currency this subject can ever yield.
    pub science_cap: f64,
    /// Situation difficulty multiplier. Always positive.
    pub difficulty: f64,
    /// Copied from the experiment at creation.
    pub base_value: f64,
    pub data_scale: f64,
}

impl ScienceSubject {
    /// Build a fresh subject with nothing collected.
    pub fn new(experiment: &ScienceExperiment, key: &SubjectKey, biomes: &BiomeCatalog) -> Self {
        let difficulty = biomes.situation_multiplier(key.body.as_str(), key.situation);
        Self {
            id: key.id(),
            title: String::new(),
            experiment: experiment.id.clone(),
            body: key.body.clone(),
            situation: key.situation,
            biome: key.biome.clone(),
            collected: 0.0,
            science_cap: experiment.science_cap * difficulty,
            difficulty,
            base_value: experiment.base_value,
            data_scale: experiment.data_scale,
        }
    }

    /// Fraction of the cap still available, in [0, 1].
    pub fn remaining_fraction(&self) -> f64 {
        if self.science_cap <= 0.0 {
            return 0.0;
        }
        (1.0 - self.collected / self.science_cap).clamp(0.0, 1.0)
    }
}

fn subject_title(
    experiment: &ScienceExperiment,
    key: &SubjectKey,
    biomes: &BiomeCatalog,
    display_biome: &str,
    source_title: Option<&str>,
) -> String {
    let body_title = biomes
        .body(key.body.as_str())
        .map(|b| b.title.clone())
        .unwrap_or_else(|| key.body.to_string());
    let mut title = format!(
        "{} while {} {}",
        experiment.title,
        key.situation.description().to_lowercase(),
        body_title
    );
    if !key.biome.is_empty() {
        let biome = if display_biome.is_empty() {
            biomes.biome_display_name(key.body.as_str(), &key.biome)
        } else {
            display_biome.to_string()
        };
        title.push_str("'s ");
        title.push_str(&biome);
    }
    if let Some(source) = source_title {
        title.push_str(" from ");
        title.push_str(source);
    }
    title
}

// ---------------------------------------------------------------------------
// SubjectLedger
// ---------------------------------------------------------------------------

/// Owns every subject of the session.
#[derive(Debug, Clone, Default)]
pub struct SubjectLedger {
    subjects: HashMap<SubjectId, ScienceSubject>,
    order: Vec<SubjectId>,
    /// Collected totals restored from a save for subjects not yet created.
    restored: HashMap<SubjectId, f64>,
}

impl SubjectLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or lazily create the subject for a measurement. `None` when the
    /// experiment is unknown.
    #[allow(clippy::too_many_arguments)]
    pub fn get_or_create(
        &mut self,
        experiments: &ExperimentCatalog,
        biomes: &BiomeCatalog,
        experiment: &str,
        situation: Situation,
        body: &str,
        biome: &str,
        display_biome: &str,
        source: Option<&SubjectSource>,
    ) -> Option<&ScienceSubject> {
        let definition = experiments.get(experiment)?;
        let key = SubjectKey {
            experiment: definition.id.clone(),
            body: BodyId::from(body),
            situation,
            biome: if definition.biome_is_relevant_while(situation) {
                biome.to_string()
            } else {
                String::new()
            },
            source_uid: source.map(|s| s.uid.clone()),
        };
        let id = key.id();
        if !self.subjects.contains_key(&id) {
            let title = subject_title(
                definition,
                &key,
                biomes,
                display_biome,
                source.map(|s| s.title.as_str()),
            );
            self.insert(definition, &key, biomes, title);
        }
        self.subjects.get(&id)
    }

    /// Look up a subject by id. Subjects known only from a restored save are
    /// rebuilt from their id on first lookup.
    pub fn resolve(
        &mut self,
        id: &str,
        experiments: &ExperimentCatalog,
        biomes: &BiomeCatalog,
    ) -> Option<&ScienceSubject> {
        if !self.subjects.contains_key(id) && self.restored.contains_key(id) {
            let key = SubjectKey::parse(id, biomes)?;
            let definition = experiments.get(key.experiment.as_str())?;
            let title = subject_title(definition, &key, biomes, "", key.source_uid.as_deref());
            self.insert(definition, &key, biomes, title);
        }
        self.subjects.get(id)
    }

    pub fn get(&self, id: &str) -> Option<&ScienceSubject> {
        self.subjects.get(id)
    }

    /// Mutable access for the value engine's commit step.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut ScienceSubject> {
        self.subjects.get_mut(id)
    }

    /// All created subjects, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &ScienceSubject> {
        self.order.iter().filter_map(|id| self.subjects.get(id))
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Collected totals keyed by subject id, including restored totals for
    /// subjects that were never touched this session.
    pub fn collected_records(&self) -> BTreeMap<String, f64> {
        let mut records: BTreeMap<String, f64> = self
            .restored
            .iter()
            .map(|(id, v)| (id.to_string(), *v))
            .collect();
        for subject in self.subjects.values() {
            records.insert(subject.id.to_string(), subject.collected);
        }
        records
    }

    /// Replace all state with the given collected totals.
    pub fn restore(&mut self, records: &BTreeMap<String, f64>) {
        self.reset();
        for (id, collected) in records {
            if !collected.is_finite() || *collected < 0.0 {
                tracing::warn!(target: "rnd", subject = %id, collected, "dropping invalid collected total");
                continue;
            }
            self.restored.insert(SubjectId::from(id.as_str()), *collected);
        }
    }

    /// Forget every subject. Only used at session reset.
    pub fn reset(&mut self) {
        self.subjects.clear();
        self.order.clear();
        self.restored.clear();
    }

    fn insert(
        &mut self,
        definition: &ScienceExperiment,
        key: &SubjectKey,
        biomes: &BiomeCatalog,
        title: String,
    ) {
        let mut subject = ScienceSubject::new(definition, key, biomes);
        subject.title = title;
        if let Some(collected) = self.restored.remove(&subject.id) {
            subject.collected = collected;
        }
        tracing::debug!(target: "rnd", subject = %subject.id, cap = subject.science_cap, "subject created");
        self.order.push(subject.id.clone());
        self.subjects.insert(subject.id.clone(), subject);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn catalogs() -> (ExperimentCatalog, BiomeCatalog) {
        (experiment_catalog(), biome_catalog())
    }

    #[test]
    fn subject_id_composition() {
        let key = SubjectKey {
            experiment: ExperimentId::from("evaReport"),
            body: BodyId::from("Kerbin"),
            situation: Situation::SrfLanded,
            biome: "Shores".to_string(),
            source_uid: None,
        };
        assert_eq!(key.id().as_str(), "evaReport@KerbinSrfLandedShores");
    }

    #[test]
    fn parse_recovers_fields() {
        let (_, biomes) = catalogs();
        let key = SubjectKey::parse("evaReport@KerbinSrfLandedShores", &biomes).unwrap();
        assert_eq!(key.experiment.as_str(), "evaReport");
        assert_eq!(key.body.as_str(), "Kerbin");
        assert_eq!(key.situation, Situation::SrfLanded);
        assert_eq!(key.biome, "Shores");
        assert_eq!(key.source_uid, None);

        let key = SubjectKey::parse("crewReport@MunInSpaceHigh_Rock42", &biomes).unwrap();
        assert_eq!(key.biome, "");
        assert_eq!(key.source_uid.as_deref(), Some("Rock42"));

        assert!(SubjectKey::parse("no-at-sign", &biomes).is_none());
        assert!(SubjectKey::parse("evaReport@EelooSrfLanded", &biomes).is_none());
    }

    #[test]
    fn subjects_created_lazily_once() {
        let (experiments, biomes) = catalogs();
        let mut ledger = SubjectLedger::new();
        assert!(ledger.is_empty());

        let id = ledger
            .get_or_create(&experiments, &biomes, "evaReport", Situation::SrfLanded, "Kerbin", "Shores", "", None)
            .unwrap()
            .id
            .clone();
        ledger
            .get_or_create(&experiments, &biomes, "evaReport", Situation::SrfLanded, "Kerbin", "Shores", "", None)
            .unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get(id.as_str()).unwrap().collected, 0.0);
    }

    #[test]
    fn unknown_experiment_creates_nothing() {
        let (experiments, biomes) = catalogs();
        let mut ledger = SubjectLedger::new();
        let subject = ledger.get_or_create(
            &experiments, &biomes, "seismicScan", Situation::SrfLanded, "Kerbin", "Shores", "", None,
        );
        assert!(subject.is_none());
        assert!(ledger.is_empty());
    }

    #[test]
    fn biome_dropped_when_irrelevant() {
        let (experiments, biomes) = catalogs();
        let mut ledger = SubjectLedger::new();
        let subject = ledger
            .get_or_create(&experiments, &biomes, "evaReport", Situation::InSpaceHigh, "Kerbin", "Shores", "", None)
            .unwrap();
        assert_eq!(subject.id.as_str(), "evaReport@KerbinInSpaceHigh");
        assert_eq!(subject.biome, "");
    }

    #[test]
    fn cap_and_difficulty_follow_body_multiplier() {
        let (experiments, biomes) = catalogs();
        let mut ledger = SubjectLedger::new();
        let subject = ledger
            .get_or_create(&experiments, &biomes, "crewReport", Situation::SrfLanded, "Mun", "Midlands", "", None)
            .unwrap();
        assert_eq!(subject.difficulty, 4.0);
        assert_eq!(subject.science_cap, 5.0 * 4.0);
        assert_eq!(subject.title, "Crew Report while landed at Mun's Midlands");
    }

    #[test]
    fn source_subjects_get_suffix_and_title() {
        let (experiments, biomes) = catalogs();
        let mut ledger = SubjectLedger::new();
        let source = SubjectSource {
            uid: "Rock42".to_string(),
            title: "Asteroid XKL-210".to_string(),
        };
        let subject = ledger
            .get_or_create(&experiments, &biomes, "crewReport", Situation::InSpaceLow, "Kerbin", "", "", Some(&source))
            .unwrap();
        assert_eq!(subject.id.as_str(), "crewReport@KerbinInSpaceLow_Rock42");
        assert!(subject.title.ends_with("from Asteroid XKL-210"));
    }

    #[test]
    fn restored_totals_apply_on_creation_and_lookup() {
        let (experiments, biomes) = catalogs();
        let mut ledger = SubjectLedger::new();
        let mut records = BTreeMap::new();
        records.insert("evaReport@KerbinSrfLandedShores".to_string(), 2.5);
        records.insert("crewReport@MunSrfLandedMidlands".to_string(), 1.0);
        records.insert("crewReport@MunSrfLandedCanyons".to_string(), -3.0);
        ledger.restore(&records);

        let subject = ledger
            .get_or_create(&experiments, &biomes, "evaReport", Situation::SrfLanded, "Kerbin", "Shores", "", None)
            .unwrap();
        assert_eq!(subject.collected, 2.5);

        let subject = ledger
            .resolve("crewReport@MunSrfLandedMidlands", &experiments, &biomes)
            .unwrap();
        assert_eq!(subject.collected, 1.0);

        assert!(ledger.resolve("crewReport@MunSrfLandedCanyons", &experiments, &biomes).is_none());
        assert!(ledger.resolve("evaReport@KerbinSrfLandedWater", &experiments, &biomes).is_none());
    }

    #[test]
    fn collected_records_include_untouched_restores() {
        let mut ledger = SubjectLedger::new();
        let mut records = BTreeMap::new();
        records.insert("evaReport@KerbinSrfLandedShores".to_string(), 2.5);
        ledger.restore(&records);
        assert_eq!(ledger.collected_records(), records);
    }
}
