//! A career run over the stock data set shipped with `rnd-data`.

use rnd_core::ledger::{CurrencyLedger, ScienceLedger};
use rnd_core::situation::Situation;
use rnd_data::{load_research_data, stock_data_dir};
use rnd_dispatch::{ResearchSession, SaveRecords, SubjectRequest};
use rnd_tech_tree::TechState;

fn stock_session(balance: f64) -> ResearchSession {
    let data = load_research_data(&stock_data_dir()).expect("stock data loads");
    ResearchSession::new(data, ScienceLedger::new(balance))
}

#[test]
fn stock_tree_is_fully_assigned() {
    let s = stock_session(0.0);
    assert_eq!(s.check_for_missing_parts(), "No missing parts");
    let summary = s.part_assignment_summary();
    assert!(summary.lines().any(|l| l == "Start: 2 parts"));
    assert!(summary.ends_with("Unassigned: 0 parts"));
}

#[test]
fn career_progression_from_launch_pad_science() {
    let mut s = stock_session(0.0);
    s.unlock_technology("start").unwrap();
    assert!(s.part_tech_available("mk1pod"));
    assert!(!s.part_tech_available("liquidEngine"));

    // Gather science from several Kerbin biomes until basic rocketry is
    // affordable.
    let mut gathered = 0.0;
    for biome in ["Shores", "Grasslands", "Highlands", "Mountains", "Deserts"] {
        for experiment in ["crewReport", "evaReport", "mysteryGoo"] {
            let request = SubjectRequest {
                experiment,
                situation: Situation::SrfLanded,
                body: "Kerbin",
                biome,
                display_biome: "",
            };
            let id = s.experiment_subject(&request).unwrap().id.to_string();
            let preview = s.next_science_value(1.0, &id, 1.0);
            let now = s.science_value(1.0, &id, 1.0);
            let credited = s.submit_science_data(1.0, &id, 1.0);
            assert_eq!(credited, now);
            assert!((s.science_value(1.0, &id, 1.0) - preview).abs() < 1e-9);
            gathered += credited;
        }
    }
    assert!((s.ledger().balance() - gathered).abs() < 1e-9);
    assert!(gathered >= 5.0, "gathered {gathered}");

    let unlocked = s.unlock_technology("basicRocketry").unwrap();
    assert!(unlocked.newly_available.iter().any(|n| n.as_str() == "generalRocketry"));
    assert_eq!(s.technology_state("stability"), TechState::Available);
    // basicScience still waits on survivability.
    assert_eq!(s.technology_state("basicScience"), TechState::Locked);
}

#[test]
fn stock_biomes_and_mini_biomes() {
    let s = stock_session(0.0);
    let tags = s.biome_tags("Kerbin", true);
    assert_eq!(tags.first().map(String::as_str), Some("Water"));
    assert!(tags.iter().any(|t| t == "LaunchPad"));
    assert_eq!(s.mini_biome_name_by_unity_tag("KSC_LaunchPad_Platform", true), "Launch Pad");
    assert!(s.biome_tags("Kerbin", false).iter().all(|t| t != "LaunchPad"));
}

#[test]
fn result_text_prefers_most_specific_variant() {
    let mut s = stock_session(0.0);
    let request = SubjectRequest {
        experiment: "crewReport",
        situation: Situation::SrfLanded,
        body: "Kerbin",
        biome: "LaunchPad",
        display_biome: "",
    };
    let id = s.experiment_subject(&request).unwrap().id.to_string();
    assert_eq!(s.results(&id), "Ready for launch. The crew looks eager.");

    let orbit = SubjectRequest {
        situation: Situation::InSpaceLow,
        biome: "",
        ..request
    };
    let id = s.experiment_subject(&orbit).unwrap().id.to_string();
    let text = s.results(&id);
    assert!(
        text == "Kerbin looks very small from up here."
            || text == "The crew reports they can see their houses from here.",
        "unexpected text {text}"
    );
}

#[test]
fn save_records_survive_encoding() {
    let mut s = stock_session(100.0);
    s.unlock_technology("start").unwrap();
    s.unlock_technology("engineering101").unwrap();
    s.purchase_part("longAntenna");
    s.add_experimental_part("liquidEngine");

    let bytes = s.save_records().encode().unwrap();
    let records = SaveRecords::decode(&bytes).unwrap();

    let mut fresh = stock_session(0.0);
    fresh.restore_records(&records);
    assert_eq!(fresh.save_records(), s.save_records());
    assert!(fresh.part_model_purchased("longAntenna"));
    assert!(!fresh.part_model_purchased("GooExperiment"));
    assert!(fresh.part_experimental("liquidEngine"));
    assert!(fresh.researched_valid_contract_objectives(&["Antenna".to_string()]));
}

#[test]
fn universal_science_is_positive() {
    let s = stock_session(0.0);
    let total: f64 = s.count_universal_science().parse().unwrap();
    assert!(total > 0.0);
}
