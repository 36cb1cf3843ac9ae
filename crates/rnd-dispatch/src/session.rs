//! The research session: every piece of research state, owned in one place.
//!
//! A session is created when a save is loaded and dropped when it is
//! unloaded. Every override point reaches the engine through a session
//! handed to it explicitly; there is no process-wide instance.

use rnd_core::biome::BiomeCatalog;
use rnd_core::experiment::{ExperimentCatalog, ScienceExperiment};
use rnd_core::ledger::{CurrencyLedger, ScienceLedger, TransactionReason, can_afford};
use rnd_core::mode::GameParameters;
use rnd_core::parts::{ExperimentalParts, PartCatalog, PurchasedParts};
use rnd_core::rng::SimRng;
use rnd_core::id::PartId;
use rnd_core::situation::Situation;
use rnd_core::subject::{ScienceSubject, SubjectLedger, SubjectSource};
use rnd_core::value::ValueEngine;
use rnd_data::ResearchData;
use rnd_tech_tree::{TechEvent, TechState, TechTree, UnlockError, Unlocked};

use crate::debug;
use crate::persist::SaveRecords;

/// The location a measurement was taken at, as the host reports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectRequest<'a> {
    pub experiment: &'a str,
    pub situation: Situation,
    pub body: &'a str,
    pub biome: &'a str,
    /// Localized biome name for the subject title. Empty to use the
    /// catalog's display name.
    pub display_biome: &'a str,
}

/// All research state for one loaded save.
#[derive(Debug, Clone)]
pub struct ResearchSession<L: CurrencyLedger = ScienceLedger> {
    biomes: BiomeCatalog,
    experiments: ExperimentCatalog,
    parts: PartCatalog,
    subjects: SubjectLedger,
    tech_tree: TechTree,
    experimental: ExperimentalParts,
    purchased: PurchasedParts,
    ledger: L,
    params: GameParameters,
    engine: ValueEngine,
    rng: SimRng,
}

impl<L: CurrencyLedger> ResearchSession<L> {
    /// Start a session from loaded data and the host's ledger.
    pub fn new(data: ResearchData, ledger: L) -> Self {
        let params = GameParameters::from(&data.session);
        tracing::info!(
            target: "rnd",
            mode = ?params.mode,
            gain = params.science_gain_multiplier,
            "research session started"
        );
        Self {
            biomes: data.bodies,
            experiments: data.experiments,
            parts: data.parts,
            subjects: SubjectLedger::new(),
            tech_tree: data.tech_tree,
            experimental: ExperimentalParts::new(),
            purchased: PurchasedParts::new(),
            ledger,
            engine: ValueEngine::new(params.science_gain_multiplier),
            params,
            rng: SimRng::new(data.session.rng_seed),
        }
    }

    // -- Accessors --

    pub fn biomes(&self) -> &BiomeCatalog {
        &self.biomes
    }

    pub fn experiments(&self) -> &ExperimentCatalog {
        &self.experiments
    }

    pub fn parts(&self) -> &PartCatalog {
        &self.parts
    }

    pub fn tech_tree(&self) -> &TechTree {
        &self.tech_tree
    }

    pub fn subject_ledger(&self) -> &SubjectLedger {
        &self.subjects
    }

    pub fn experimental_parts(&self) -> &ExperimentalParts {
        &self.experimental
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn params(&self) -> GameParameters {
        self.params
    }

    pub fn value_engine(&self) -> ValueEngine {
        self.engine
    }

    // -- Experimental parts and purchases --

    pub fn add_experimental_part(&mut self, part: &str) {
        self.experimental.mark(&PartId::from(part));
    }

    pub fn remove_experimental_part(&mut self, part: &str) {
        self.experimental.unmark(&PartId::from(part));
    }

    pub fn part_experimental(&self, part: &str) -> bool {
        self.experimental.is_experimental(part)
    }

    pub fn purchase_part(&mut self, part: &str) {
        self.purchased.purchase(&PartId::from(part));
    }

    pub fn part_model_purchased(&self, part: &str) -> bool {
        self.purchased.is_purchased(part, self.params.mode)
    }

    /// Unknown parts are never available.
    pub fn part_tech_available(&self, part: &str) -> bool {
        self.parts
            .get(part)
            .is_some_and(|p| self.tech_tree.part_tech_available(p))
    }

    pub fn researched_valid_contract_objectives(&self, objectives: &[String]) -> bool {
        self.tech_tree
            .researched_valid_contract_objectives(objectives, &self.parts)
    }

    // -- Tech tree --

    pub fn can_afford(&self, amount: f64) -> bool {
        can_afford(self.ledger.balance(), amount, self.params.mode)
    }

    pub fn technology_state(&self, node: &str) -> TechState {
        self.tech_tree.state(node)
    }

    pub fn technology_title(&self, node: &str) -> String {
        self.tech_tree.title(node).to_string()
    }

    pub fn unlock_technology(&mut self, node: &str) -> Result<Unlocked, UnlockError> {
        let result = self
            .tech_tree
            .unlock(node, &mut self.ledger, self.params.mode);
        if let Err(err) = &result {
            tracing::debug!(target: "rnd", node, %err, "unlock rejected");
        }
        result
    }

    pub fn reset_technology(&mut self, node: &str) -> Vec<rnd_core::id::TechId> {
        self.tech_tree.reset_node(node)
    }

    pub fn refresh_tech_tree_ui(&mut self) {
        self.tech_tree.request_refresh();
    }

    /// Tech events since the last drain, for the host's UI.
    pub fn drain_tech_events(&mut self) -> Vec<TechEvent> {
        self.tech_tree.drain_events()
    }

    // -- Biomes and situations --

    pub fn biome_tags(&self, body: &str, include_mini_biomes: bool) -> Vec<String> {
        self.biomes.biome_tags(body, include_mini_biomes)
    }

    pub fn biome_tags_localized(&self, body: &str, include_mini_biomes: bool) -> Vec<String> {
        self.biomes.biome_tags_localized(body, include_mini_biomes)
    }

    pub fn mini_biome_tags(&self, body: &str) -> Vec<String> {
        self.biomes.mini_biome_tags(body)
    }

    pub fn mini_biome_tags_localized(&self, body: &str) -> Vec<String> {
        self.biomes.mini_biome_tags_localized(body)
    }

    pub fn mini_biome_name_by_science_id(&self, tag: &str, formatted: bool) -> String {
        self.biomes.mini_biome_display_name_by_science_id(tag, formatted)
    }

    pub fn mini_biome_name_by_unity_tag(&self, unity_tag: &str, formatted: bool) -> String {
        self.biomes.mini_biome_display_name_by_unity_tag(unity_tag, formatted)
    }

    // -- Experiments and subjects --

    pub fn experiment(&self, id: &str) -> Option<&ScienceExperiment> {
        self.experiments.get(id)
    }

    pub fn experiment_ids(&self) -> Vec<String> {
        self.experiments.ids().iter().map(|id| id.to_string()).collect()
    }

    /// The subject for a measurement, created on first use.
    pub fn experiment_subject(&mut self, request: &SubjectRequest<'_>) -> Option<&ScienceSubject> {
        self.subjects.get_or_create(
            &self.experiments,
            &self.biomes,
            request.experiment,
            request.situation,
            request.body,
            request.biome,
            request.display_biome,
            None,
        )
    }

    /// As [`Self::experiment_subject`], for a measurement of a specific
    /// source object such as an asteroid.
    pub fn experiment_subject_with_source(
        &mut self,
        request: &SubjectRequest<'_>,
        source: &SubjectSource,
    ) -> Option<&ScienceSubject> {
        self.subjects.get_or_create(
            &self.experiments,
            &self.biomes,
            request.experiment,
            request.situation,
            request.body,
            request.biome,
            request.display_biome,
            Some(source),
        )
    }

    pub fn subject_by_id(&mut self, id: &str) -> Option<&ScienceSubject> {
        self.subjects.resolve(id, &self.experiments, &self.biomes)
    }

    pub fn subjects(&self) -> impl Iterator<Item = &ScienceSubject> {
        self.subjects.iter()
    }

    /// Result text for a subject; empty for unknown subjects.
    pub fn results(&mut self, subject_id: &str) -> String {
        let Some(subject) = self
            .subjects
            .resolve(subject_id, &self.experiments, &self.biomes)
        else {
            return String::new();
        };
        match self.experiments.get(subject.experiment.as_str()) {
            Some(experiment) => experiment.results.resolve(
                subject.body.as_str(),
                subject.situation,
                &subject.biome,
                &mut self.rng,
            ),
            None => String::new(),
        }
    }

    // -- Value computation --

    /// Unknown subjects are worth nothing.
    pub fn reference_data_value(&mut self, amount: f64, subject_id: &str) -> f64 {
        let engine = self.engine;
        self.with_subject(subject_id, |s| engine.reference_multiplier(amount, s))
    }

    /// Currency values are 0 whenever the mode disables science, so a
    /// preview never promises more than a submit credits.
    pub fn science_value(&mut self, amount: f64, subject_id: &str, transmission: f64) -> f64 {
        let engine = self.engine;
        self.with_currency(subject_id, |s| engine.currency_value(amount, s, transmission))
    }

    pub fn next_science_value(&mut self, amount: f64, subject_id: &str, transmission: f64) -> f64 {
        let engine = self.engine;
        self.with_currency(subject_id, |s| {
            engine.next_currency_value(amount, s, transmission)
        })
    }

    pub fn subject_value(&mut self, raw: f64, subject_id: &str) -> f64 {
        let engine = self.engine;
        self.with_currency(subject_id, |s| engine.subject_value(raw, s))
    }

    /// Commit a measurement and credit the ledger. Returns the amount
    /// credited. Nothing is tracked when the mode disables science.
    pub fn submit_science_data(&mut self, amount: f64, subject_id: &str, transmission: f64) -> f64 {
        if !self.params.mode.science_enabled() {
            return 0.0;
        }
        let engine = self.engine;
        if self
            .subjects
            .resolve(subject_id, &self.experiments, &self.biomes)
            .is_none()
        {
            tracing::debug!(target: "rnd", subject = subject_id, "science submitted for unknown subject");
            return 0.0;
        }
        let Some(subject) = self.subjects.get_mut(subject_id) else {
            return 0.0;
        };
        let credited = engine.commit(amount, subject, transmission);
        if credited > 0.0 {
            self.ledger
                .credit(credited, TransactionReason::ScienceTransmission);
        }
        credited
    }

    fn with_currency(&mut self, subject_id: &str, f: impl FnOnce(&ScienceSubject) -> f64) -> f64 {
        if !self.params.mode.science_enabled() {
            return 0.0;
        }
        self.with_subject(subject_id, f)
    }

    fn with_subject(&mut self, subject_id: &str, f: impl FnOnce(&ScienceSubject) -> f64) -> f64 {
        match self
            .subjects
            .resolve(subject_id, &self.experiments, &self.biomes)
        {
            Some(subject) => f(subject),
            None => 0.0,
        }
    }

    // -- Reports --

    pub fn count_universal_science(&self) -> String {
        debug::count_universal_science(&self.biomes, &self.experiments)
    }

    pub fn check_for_missing_parts(&self) -> String {
        debug::check_for_missing_parts(&self.parts, &self.tech_tree)
    }

    pub fn part_assignment_summary(&self) -> String {
        debug::part_assignment_summary(&self.tech_tree, &self.parts)
    }

    // -- Persistence --

    /// Snapshot of every keyed record the host persists.
    pub fn save_records(&self) -> SaveRecords {
        SaveRecords {
            subjects: self.subjects.collected_records(),
            tech: self.tech_tree.records(),
            experimental_parts: self.experimental.records(),
            purchased_parts: self.purchased.records(),
        }
    }

    /// Restore records verbatim. Missing keys take their defaults.
    pub fn restore_records(&mut self, records: &SaveRecords) {
        self.subjects.restore(&records.subjects);
        self.tech_tree.restore(&records.tech);
        self.experimental.restore(&records.experimental_parts);
        self.purchased.restore(&records.purchased_parts);
        tracing::info!(
            target: "rnd",
            subjects = records.subjects.len(),
            nodes = records.tech.len(),
            experimental = records.experimental_parts.len(),
            "research records restored"
        );
    }

    /// Forget all progress: subjects, research, flags and purchases.
    pub fn reset(&mut self) {
        self.subjects.reset();
        self.tech_tree.reset_all();
        self.experimental.clear();
        self.purchased.clear();
        tracing::info!(target: "rnd", "research session reset");
    }
}
