//! Report strings for the host's research debug page and transmission
//! messages.

use rnd_core::biome::BiomeCatalog;
use rnd_core::experiment::ExperimentCatalog;
use rnd_core::id::PartId;
use rnd_core::ledger::TransactionReason;
use rnd_core::parts::PartCatalog;
use rnd_tech_tree::{TechTree, parts_by_node};

/// Total currency every subject in the catalog could ever yield: each
/// experiment on each body, in every situation the experiment and the body
/// both allow, once per biome where the biome matters.
pub fn universal_science(bodies: &BiomeCatalog, experiments: &ExperimentCatalog) -> f64 {
    let mut total = 0.0;
    for experiment in experiments.iter() {
        for body in bodies.bodies() {
            for situation in experiment.situation_mask.iter() {
                if !body.supports(situation) {
                    continue;
                }
                let regions = if experiment.biome_is_relevant_while(situation) {
                    body.biomes.len().max(1)
                } else {
                    1
                };
                total += experiment.science_cap * body.multipliers.get(situation) * regions as f64;
            }
        }
    }
    total
}

pub fn count_universal_science(bodies: &BiomeCatalog, experiments: &ExperimentCatalog) -> String {
    format!("{:.1}", universal_science(bodies, experiments))
}

/// Parts with no tech node, or one the tree does not know.
pub fn missing_parts<'a>(parts: &'a PartCatalog, tree: &TechTree) -> Vec<&'a PartId> {
    parts_by_node(tree, parts).1
}

/// Space separated ids of [`missing_parts`], or a fixed message when every
/// part is assigned.
pub fn check_for_missing_parts(parts: &PartCatalog, tree: &TechTree) -> String {
    let missing = missing_parts(parts, tree);
    if missing.is_empty() {
        return "No missing parts".to_string();
    }
    missing
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// One line per tech node with the number of parts it unlocks, in tree
/// order, followed by the unassigned count.
pub fn part_assignment_summary(tree: &TechTree, parts: &PartCatalog) -> String {
    let (assigned, unassigned) = parts_by_node(tree, parts);
    let mut lines: Vec<String> = assigned
        .iter()
        .map(|(node, parts)| format!("{}: {} parts", tree.title(node.as_str()), parts.len()))
        .collect();
    lines.push(format!("Unassigned: {} parts", unassigned.len()));
    lines.join("\n")
}

/// The message shown when a transmission completes, e.g.
/// `"+5.0 Science (Science Transmission)"`.
pub fn science_transmission_reward_string(amount: f64, reason: TransactionReason) -> String {
    format!("{amount:+.1} Science ({})", reason.label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rnd_core::test_utils::*;
    use crate::test_support::tech_tree;

    #[test]
    fn universal_science_sums_every_subject() {
        let mut experiments = ExperimentCatalog::new();
        experiments.register(crew_report()).unwrap();
        let mut bodies = BiomeCatalog::new();
        bodies.register(mun()).unwrap();

        // Mun has no ocean or atmosphere: landed (3 biomes, x4), space low
        // (x3) and space high (x2) remain.
        let expected = 5.0 * 4.0 * 3.0 + 5.0 * 3.0 + 5.0 * 2.0;
        assert_eq!(universal_science(&bodies, &experiments), expected);
        assert_eq!(count_universal_science(&bodies, &experiments), "85.0");
    }

    #[test]
    fn missing_parts_lists_unassigned() {
        let tree = tech_tree();
        let parts = part_catalog();
        assert_eq!(check_for_missing_parts(&parts, &tree), "solarPanels5");

        let mut assigned = PartCatalog::new();
        assigned.register(mk1pod_part()).unwrap();
        assert_eq!(check_for_missing_parts(&assigned, &tree), "No missing parts");
    }

    #[test]
    fn assignment_summary_counts_per_node() {
        let summary = part_assignment_summary(&tech_tree(), &part_catalog());
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "Start: 1 parts");
        assert!(lines.contains(&"Engineering 101: 1 parts"));
        assert_eq!(lines.last(), Some(&"Unassigned: 1 parts"));
    }

    #[test]
    fn reward_string_format() {
        assert_eq!(
            science_transmission_reward_string(5.0, TransactionReason::ScienceTransmission),
            "+5.0 Science (Science Transmission)"
        );
        assert_eq!(
            science_transmission_reward_string(-2.0, TransactionReason::Other),
            "-2.0 Science (Other)"
        );
    }
}
