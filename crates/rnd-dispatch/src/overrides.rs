//! The override points the host's call sites are redirected through.
//!
//! [`ResearchOverrides`] has one method per override point. Each method
//! defaults to [`Dispatch::Fallthrough`], so an implementor replaces only
//! the points it cares about and the host's own logic runs for the rest.
//! [`Passthrough`] replaces nothing; [`ResearchSession`] replaces
//! everything.
//!
//! Results are owned values: a caller keeps the replacement after the
//! override point returns, and may re-enter any other point while holding
//! it.

use rnd_core::experiment::ScienceExperiment;
use rnd_core::ledger::{CurrencyLedger, TransactionReason};
use rnd_core::situation;
use rnd_core::subject::{ScienceSubject, SubjectSource};
use rnd_tech_tree::{TechState, UnlockError, Unlocked};

use crate::debug;
use crate::dispatch::Dispatch;
use crate::session::{ResearchSession, SubjectRequest};

pub trait ResearchOverrides {
    // -- Experimental parts --

    fn add_experimental_part(&mut self, _part: &str) -> Dispatch<()> {
        Dispatch::Fallthrough
    }

    fn remove_experimental_part(&mut self, _part: &str) -> Dispatch<()> {
        Dispatch::Fallthrough
    }

    fn part_experimental(&mut self, _part: &str) -> Dispatch<bool> {
        Dispatch::Fallthrough
    }

    fn part_model_purchased(&mut self, _part: &str) -> Dispatch<bool> {
        Dispatch::Fallthrough
    }

    // -- Tech tree --

    fn part_tech_available(&mut self, _part: &str) -> Dispatch<bool> {
        Dispatch::Fallthrough
    }

    fn researched_valid_contract_objectives(&mut self, _objectives: &[String]) -> Dispatch<bool> {
        Dispatch::Fallthrough
    }

    fn can_afford(&mut self, _amount: f64) -> Dispatch<bool> {
        Dispatch::Fallthrough
    }

    fn technology_state(&mut self, _node: &str) -> Dispatch<TechState> {
        Dispatch::Fallthrough
    }

    fn technology_title(&mut self, _node: &str) -> Dispatch<String> {
        Dispatch::Fallthrough
    }

    fn unlock_technology(&mut self, _node: &str) -> Dispatch<Result<Unlocked, UnlockError>> {
        Dispatch::Fallthrough
    }

    fn refresh_tech_tree_ui(&mut self) -> Dispatch<()> {
        Dispatch::Fallthrough
    }

    // -- Biomes and situations --

    fn biome_tags(&mut self, _body: &str, _include_mini_biomes: bool) -> Dispatch<Vec<String>> {
        Dispatch::Fallthrough
    }

    fn biome_tags_localized(
        &mut self,
        _body: &str,
        _include_mini_biomes: bool,
    ) -> Dispatch<Vec<String>> {
        Dispatch::Fallthrough
    }

    fn mini_biome_tags(&mut self, _body: &str) -> Dispatch<Vec<String>> {
        Dispatch::Fallthrough
    }

    fn mini_biome_tags_localized(&mut self, _body: &str) -> Dispatch<Vec<String>> {
        Dispatch::Fallthrough
    }

    fn mini_biome_name_by_science_id(&mut self, _tag: &str, _formatted: bool) -> Dispatch<String> {
        Dispatch::Fallthrough
    }

    fn mini_biome_name_by_unity_tag(
        &mut self,
        _unity_tag: &str,
        _formatted: bool,
    ) -> Dispatch<String> {
        Dispatch::Fallthrough
    }

    fn situation_tags(&mut self) -> Dispatch<Vec<String>> {
        Dispatch::Fallthrough
    }

    fn situation_tag_descriptions(&mut self) -> Dispatch<Vec<String>> {
        Dispatch::Fallthrough
    }

    // -- Experiments and subjects --

    fn experiment(&mut self, _id: &str) -> Dispatch<Option<ScienceExperiment>> {
        Dispatch::Fallthrough
    }

    fn experiment_ids(&mut self) -> Dispatch<Vec<String>> {
        Dispatch::Fallthrough
    }

    fn experiment_subject(
        &mut self,
        _request: &SubjectRequest<'_>,
    ) -> Dispatch<Option<ScienceSubject>> {
        Dispatch::Fallthrough
    }

    fn experiment_subject_with_source(
        &mut self,
        _request: &SubjectRequest<'_>,
        _source: &SubjectSource,
    ) -> Dispatch<Option<ScienceSubject>> {
        Dispatch::Fallthrough
    }

    fn subject_by_id(&mut self, _id: &str) -> Dispatch<Option<ScienceSubject>> {
        Dispatch::Fallthrough
    }

    fn subjects(&mut self) -> Dispatch<Vec<ScienceSubject>> {
        Dispatch::Fallthrough
    }

    fn results(&mut self, _subject_id: &str) -> Dispatch<String> {
        Dispatch::Fallthrough
    }

    // -- Values --

    fn reference_data_value(&mut self, _amount: f64, _subject_id: &str) -> Dispatch<f64> {
        Dispatch::Fallthrough
    }

    fn science_value(
        &mut self,
        _amount: f64,
        _subject_id: &str,
        _transmission: f64,
    ) -> Dispatch<f64> {
        Dispatch::Fallthrough
    }

    fn next_science_value(
        &mut self,
        _amount: f64,
        _subject_id: &str,
        _transmission: f64,
    ) -> Dispatch<f64> {
        Dispatch::Fallthrough
    }

    fn subject_value(&mut self, _raw: f64, _subject_id: &str) -> Dispatch<f64> {
        Dispatch::Fallthrough
    }

    fn submit_science_data(
        &mut self,
        _amount: f64,
        _subject_id: &str,
        _transmission: f64,
    ) -> Dispatch<f64> {
        Dispatch::Fallthrough
    }

    // -- Reports --

    fn count_universal_science(&mut self) -> Dispatch<String> {
        Dispatch::Fallthrough
    }

    fn check_for_missing_parts(&mut self) -> Dispatch<String> {
        Dispatch::Fallthrough
    }

    fn part_assignment_summary(&mut self) -> Dispatch<String> {
        Dispatch::Fallthrough
    }

    fn science_transmission_reward_string(
        &mut self,
        _amount: f64,
        _reason: TransactionReason,
    ) -> Dispatch<String> {
        Dispatch::Fallthrough
    }
}

/// Falls through at every override point.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl ResearchOverrides for Passthrough {}

// Inherent methods are reached through `Self::` paths: a plain method call on
// `self` here would pick the trait method and recurse.
impl<L: CurrencyLedger> ResearchOverrides for ResearchSession<L> {
    fn add_experimental_part(&mut self, part: &str) -> Dispatch<()> {
        Dispatch::Override(Self::add_experimental_part(self, part))
    }

    fn remove_experimental_part(&mut self, part: &str) -> Dispatch<()> {
        Dispatch::Override(Self::remove_experimental_part(self, part))
    }

    fn part_experimental(&mut self, part: &str) -> Dispatch<bool> {
        Dispatch::Override(Self::part_experimental(self, part))
    }

    fn part_model_purchased(&mut self, part: &str) -> Dispatch<bool> {
        Dispatch::Override(Self::part_model_purchased(self, part))
    }

    fn part_tech_available(&mut self, part: &str) -> Dispatch<bool> {
        Dispatch::Override(Self::part_tech_available(self, part))
    }

    fn researched_valid_contract_objectives(&mut self, objectives: &[String]) -> Dispatch<bool> {
        Dispatch::Override(Self::researched_valid_contract_objectives(self, objectives))
    }

    fn can_afford(&mut self, amount: f64) -> Dispatch<bool> {
        Dispatch::Override(Self::can_afford(self, amount))
    }

    fn technology_state(&mut self, node: &str) -> Dispatch<TechState> {
        Dispatch::Override(Self::technology_state(self, node))
    }

    fn technology_title(&mut self, node: &str) -> Dispatch<String> {
        Dispatch::Override(Self::technology_title(self, node))
    }

    fn unlock_technology(&mut self, node: &str) -> Dispatch<Result<Unlocked, UnlockError>> {
        Dispatch::Override(Self::unlock_technology(self, node))
    }

    fn refresh_tech_tree_ui(&mut self) -> Dispatch<()> {
        Dispatch::Override(Self::refresh_tech_tree_ui(self))
    }

    fn biome_tags(&mut self, body: &str, include_mini_biomes: bool) -> Dispatch<Vec<String>> {
        Dispatch::Override(Self::biome_tags(self, body, include_mini_biomes))
    }

    fn biome_tags_localized(
        &mut self,
        body: &str,
        include_mini_biomes: bool,
    ) -> Dispatch<Vec<String>> {
        Dispatch::Override(Self::biome_tags_localized(self, body, include_mini_biomes))
    }

    fn mini_biome_tags(&mut self, body: &str) -> Dispatch<Vec<String>> {
        Dispatch::Override(Self::mini_biome_tags(self, body))
    }

    fn mini_biome_tags_localized(&mut self, body: &str) -> Dispatch<Vec<String>> {
        Dispatch::Override(Self::mini_biome_tags_localized(self, body))
    }

    fn mini_biome_name_by_science_id(&mut self, tag: &str, formatted: bool) -> Dispatch<String> {
        Dispatch::Override(Self::mini_biome_name_by_science_id(self, tag, formatted))
    }

    fn mini_biome_name_by_unity_tag(
        &mut self,
        unity_tag: &str,
        formatted: bool,
    ) -> Dispatch<String> {
        Dispatch::Override(Self::mini_biome_name_by_unity_tag(
            self, unity_tag, formatted,
        ))
    }

    fn situation_tags(&mut self) -> Dispatch<Vec<String>> {
        Dispatch::Override(situation::situation_tags())
    }

    fn situation_tag_descriptions(&mut self) -> Dispatch<Vec<String>> {
        Dispatch::Override(situation::situation_tag_descriptions())
    }

    fn experiment(&mut self, id: &str) -> Dispatch<Option<ScienceExperiment>> {
        Dispatch::Override(Self::experiment(self, id).cloned())
    }

    fn experiment_ids(&mut self) -> Dispatch<Vec<String>> {
        Dispatch::Override(Self::experiment_ids(self))
    }

    fn experiment_subject(
        &mut self,
        request: &SubjectRequest<'_>,
    ) -> Dispatch<Option<ScienceSubject>> {
        Dispatch::Override(Self::experiment_subject(self, request).cloned())
    }

    fn experiment_subject_with_source(
        &mut self,
        request: &SubjectRequest<'_>,
        source: &SubjectSource,
    ) -> Dispatch<Option<ScienceSubject>> {
        Dispatch::Override(Self::experiment_subject_with_source(self, request, source).cloned())
    }

    fn subject_by_id(&mut self, id: &str) -> Dispatch<Option<ScienceSubject>> {
        Dispatch::Override(Self::subject_by_id(self, id).cloned())
    }

    fn subjects(&mut self) -> Dispatch<Vec<ScienceSubject>> {
        Dispatch::Override(Self::subjects(self).cloned().collect())
    }

    fn results(&mut self, subject_id: &str) -> Dispatch<String> {
        Dispatch::Override(Self::results(self, subject_id))
    }

    fn reference_data_value(&mut self, amount: f64, subject_id: &str) -> Dispatch<f64> {
        Dispatch::Override(Self::reference_data_value(self, amount, subject_id))
    }

    fn science_value(&mut self, amount: f64, subject_id: &str, transmission: f64) -> Dispatch<f64> {
        Dispatch::Override(Self::science_value(self, amount, subject_id, transmission))
    }

    fn next_science_value(
        &mut self,
        amount: f64,
        subject_id: &str,
        transmission: f64,
    ) -> Dispatch<f64> {
        Dispatch::Override(Self::next_science_value(
            self,
            amount,
            subject_id,
            transmission,
        ))
    }

    fn subject_value(&mut self, raw: f64, subject_id: &str) -> Dispatch<f64> {
        Dispatch::Override(Self::subject_value(self, raw, subject_id))
    }

    fn submit_science_data(
        &mut self,
        amount: f64,
        subject_id: &str,
        transmission: f64,
    ) -> Dispatch<f64> {
        Dispatch::Override(Self::submit_science_data(
            self,
            amount,
            subject_id,
            transmission,
        ))
    }

    fn count_universal_science(&mut self) -> Dispatch<String> {
        Dispatch::Override(Self::count_universal_science(self))
    }

    fn check_for_missing_parts(&mut self) -> Dispatch<String> {
        Dispatch::Override(Self::check_for_missing_parts(self))
    }

    fn part_assignment_summary(&mut self) -> Dispatch<String> {
        Dispatch::Override(Self::part_assignment_summary(self))
    }

    fn science_transmission_reward_string(
        &mut self,
        amount: f64,
        reason: TransactionReason,
    ) -> Dispatch<String> {
        Dispatch::Override(debug::science_transmission_reward_string(amount, reason))
    }
}
