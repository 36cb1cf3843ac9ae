//! End-to-end research scenarios driven through the override surface.
//!
//! Every call goes through `ResearchOverrides`, the way the host's
//! redirected call sites reach the engine.

use rnd_core::id::TechId;
use rnd_core::ledger::{CurrencyLedger, ScienceLedger};
use rnd_core::mode::GameMode;
use rnd_core::situation::Situation;
use rnd_core::test_utils::*;
use rnd_data::{ResearchData, SessionConfig};
use rnd_dispatch::{Dispatch, ResearchOverrides, ResearchSession, SubjectRequest};
use rnd_tech_tree::{TechNode, TechState, TechTree, UnlockError};

fn node(id: &str, cost: f64, prerequisites: &[&str]) -> TechNode {
    TechNode {
        id: TechId::from(id),
        title: id.to_string(),
        description: String::new(),
        cost,
        prerequisites: prerequisites.iter().map(|p| TechId::from(*p)).collect(),
    }
}

/// start -> nodeA -> nodeB
fn chain_tree() -> TechTree {
    let mut tree = TechTree::new();
    tree.register(node("start", 0.0, &[])).unwrap();
    tree.register(node("nodeA", 5.0, &["start"])).unwrap();
    tree.register(node("nodeB", 5.0, &["nodeA"])).unwrap();
    tree
}

fn session(mode: GameMode, balance: f64) -> ResearchSession {
    let data = ResearchData {
        bodies: biome_catalog(),
        experiments: experiment_catalog(),
        parts: part_catalog(),
        tech_tree: chain_tree(),
        session: SessionConfig {
            mode,
            ..SessionConfig::default()
        },
    };
    ResearchSession::new(data, ScienceLedger::new(balance))
}

fn value<T>(dispatch: Dispatch<T>) -> T {
    dispatch
        .into_option()
        .expect("session overrides every point")
}

const EVA_SHORES: SubjectRequest<'static> = SubjectRequest {
    experiment: "evaReport",
    situation: Situation::SrfLanded,
    body: "Kerbin",
    biome: "Shores",
    display_biome: "",
};

#[test]
fn eva_report_credits_full_value_then_nothing() {
    let mut s = session(GameMode::Career, 0.0);
    let o: &mut dyn ResearchOverrides = &mut s;

    let subject = value(o.experiment_subject(&EVA_SHORES)).unwrap();
    assert_eq!(subject.id.as_str(), "evaReport@KerbinSrfLandedShores");
    assert_eq!(subject.science_cap, 5.0);
    assert_eq!(subject.collected, 0.0);
    let id = subject.id.to_string();

    assert_eq!(value(o.submit_science_data(1.0, &id, 1.0)), 5.0);
    assert_eq!(value(o.submit_science_data(1.0, &id, 1.0)), 0.0);
    assert_eq!(value(o.next_science_value(1.0, &id, 1.0)), 0.0);
    assert_eq!(value(o.subject_value(5.0, &id)), 0.0);
    assert_eq!(value(o.subject_by_id(&id)).unwrap().collected, 5.0);

    assert_eq!(s.ledger().balance(), 5.0);
}

#[test]
fn mk1pod_marked_twice_unmarked_three_times() {
    let mut s = session(GameMode::Career, 0.0);
    let o: &mut dyn ResearchOverrides = &mut s;

    o.add_experimental_part("mk1pod");
    o.add_experimental_part("mk1pod");
    assert!(value(o.part_experimental("mk1pod")));

    o.remove_experimental_part("mk1pod");
    assert!(value(o.part_experimental("mk1pod")));
    o.remove_experimental_part("mk1pod");
    assert!(!value(o.part_experimental("mk1pod")));
    o.remove_experimental_part("mk1pod");
    assert!(!value(o.part_experimental("mk1pod")));

    // The unmatched unmark leaves no debt behind.
    o.add_experimental_part("mk1pod");
    assert!(value(o.part_experimental("mk1pod")));
}

#[test]
fn dependent_becomes_available_when_prerequisite_is_researched() {
    let mut s = session(GameMode::Career, 20.0);
    let o: &mut dyn ResearchOverrides = &mut s;

    assert_eq!(value(o.technology_state("nodeA")), TechState::Locked);
    let before = s.save_records();

    let o: &mut dyn ResearchOverrides = &mut s;
    match value(o.unlock_technology("nodeB")) {
        Err(UnlockError::PrereqsUnmet { node, missing }) => {
            assert_eq!(node.as_str(), "nodeB");
            assert_eq!(missing, vec![TechId::from("nodeA")]);
        }
        other => panic!("expected PrereqsUnmet, got {other:?}"),
    }
    assert_eq!(s.save_records(), before);
    assert_eq!(s.ledger().balance(), 20.0);

    let o: &mut dyn ResearchOverrides = &mut s;
    value(o.unlock_technology("start")).unwrap();
    let unlocked = value(o.unlock_technology("nodeA")).unwrap();
    assert_eq!(unlocked.cost_paid, 5.0);
    assert_eq!(unlocked.newly_available, vec![TechId::from("nodeB")]);
    assert_eq!(value(o.technology_state("nodeB")), TechState::Available);
    assert_eq!(s.ledger().balance(), 15.0);
}

#[test]
fn insufficient_funds_leaves_state_unchanged() {
    let mut s = session(GameMode::Career, 4.0);
    let o: &mut dyn ResearchOverrides = &mut s;
    value(o.unlock_technology("start")).unwrap();
    assert!(matches!(
        value(o.unlock_technology("nodeA")),
        Err(UnlockError::InsufficientFunds { .. })
    ));
    assert_eq!(value(o.technology_state("nodeA")), TechState::Available);
    assert!(!value(o.can_afford(5.0)));
    assert!(value(o.can_afford(4.0)));
}

#[test]
fn sandbox_unlocks_for_free_and_tracks_no_science() {
    let mut s = session(GameMode::Sandbox, 0.0);
    let o: &mut dyn ResearchOverrides = &mut s;
    value(o.unlock_technology("start")).unwrap();
    let unlocked = value(o.unlock_technology("nodeA")).unwrap();
    assert_eq!(unlocked.cost_paid, 0.0);

    let id = value(o.experiment_subject(&EVA_SHORES)).unwrap().id.to_string();
    let preview = value(o.next_science_value(1.0, &id, 1.0));
    assert_eq!(value(o.science_value(1.0, &id, 1.0)), 0.0);
    assert_eq!(value(o.submit_science_data(1.0, &id, 1.0)), 0.0);
    assert_eq!(value(o.science_value(1.0, &id, 1.0)), preview);
    assert!(value(o.part_model_purchased("longAntenna")));
    assert_eq!(s.ledger().balance(), 0.0);
}

#[test]
fn unknown_lookups_take_safe_defaults() {
    let mut s = session(GameMode::Career, 0.0);
    let o: &mut dyn ResearchOverrides = &mut s;
    assert_eq!(value(o.technology_state("ghost")), TechState::Locked);
    assert_eq!(value(o.technology_title("ghost")), "");
    assert!(!value(o.part_tech_available("ghostPart")));
    assert!(!value(o.part_experimental("ghostPart")));
    assert!(value(o.subject_by_id("nope")).is_none());
    assert_eq!(value(o.science_value(1.0, "nope", 1.0)), 0.0);
    assert_eq!(value(o.results("nope")), "");
    assert!(value(o.biome_tags("Eeloo", true)).is_empty());
    assert!(value(o.experiment("ghost")).is_none());
}

#[test]
fn session_restores_from_encoded_records() {
    let mut s = session(GameMode::Career, 10.0);
    let o: &mut dyn ResearchOverrides = &mut s;
    let id = value(o.experiment_subject(&EVA_SHORES)).unwrap().id.to_string();
    value(o.submit_science_data(0.4, &id, 1.0));
    value(o.unlock_technology("start")).unwrap();
    o.add_experimental_part("mk1pod");
    let bytes = s.save_records().encode().unwrap();

    let mut restored = session(GameMode::Career, 0.0);
    restored.restore_records(&rnd_dispatch::SaveRecords::decode(&bytes).unwrap());
    let o: &mut dyn ResearchOverrides = &mut restored;
    let subject = value(o.subject_by_id(&id)).unwrap();
    assert!((subject.collected - 2.0).abs() < 1e-9);
    assert_eq!(value(o.technology_state("start")), TechState::Researched);
    assert_eq!(value(o.technology_state("nodeA")), TechState::Available);
    assert!(value(o.part_experimental("mk1pod")));
}
