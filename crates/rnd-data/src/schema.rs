//! Serde data file structs for research content definitions.
//!
//! These structs define the on-disk format for bodies, experiments, tech
//! nodes, parts and the session configuration. They are deserialized from
//! RON, JSON, or TOML data files and then resolved into engine types by the
//! loader.

use rnd_core::mode::{GameMode, GameParameters};
use serde::Deserialize;
use std::collections::HashMap;

// ===========================================================================
// Bodies
// ===========================================================================

/// A celestial body definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct BodyData {
    pub name: String,
    /// Display title. Defaults to the name.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub biomes: Vec<BiomeData>,
    #[serde(default)]
    pub mini_biomes: Vec<MiniBiomeData>,
    #[serde(default)]
    pub multipliers: MultipliersData,
    #[serde(default = "default_true")]
    pub atmosphere: bool,
    #[serde(default = "default_true")]
    pub ocean: bool,
}

/// A biome entry. The display name defaults to the name.
#[derive(Debug, Clone, Deserialize)]
pub struct BiomeData {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A mini-biome entry.
#[derive(Debug, Clone, Deserialize)]
pub struct MiniBiomeData {
    pub tag: String,
    pub unity_tag: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Per-situation multipliers. Omitted situations default to 1.0.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MultipliersData {
    #[serde(default = "default_one")]
    pub landed: f64,
    #[serde(default = "default_one")]
    pub splashed: f64,
    #[serde(default = "default_one")]
    pub flying_low: f64,
    #[serde(default = "default_one")]
    pub flying_high: f64,
    #[serde(default = "default_one")]
    pub in_space_low: f64,
    #[serde(default = "default_one")]
    pub in_space_high: f64,
}

impl Default for MultipliersData {
    fn default() -> Self {
        Self {
            landed: 1.0,
            splashed: 1.0,
            flying_low: 1.0,
            flying_high: 1.0,
            in_space_low: 1.0,
            in_space_high: 1.0,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

// ===========================================================================
// Experiments
// ===========================================================================

/// An experiment definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentData {
    pub name: String,
    pub title: String,
    pub science_cap: f64,
    /// Worth of one reference unit. Defaults to the science cap.
    #[serde(default)]
    pub base_value: Option<f64>,
    #[serde(default = "default_one")]
    pub data_scale: f64,
    /// Situation tags the experiment works in. Empty means all.
    #[serde(default)]
    pub situations: Vec<String>,
    /// Situation tags in which the biome is part of the subject.
    #[serde(default)]
    pub biome_situations: Vec<String>,
    #[serde(default)]
    pub results: ResultsData,
}

/// Result text: a default plus variants keyed by `{body}{situation}{biome}`,
/// `{body}{situation}` or `{body}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsData {
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub variants: HashMap<String, Vec<String>>,
}

// ===========================================================================
// Tech tree
// ===========================================================================

/// A tech node definition in a data file. Nodes may be listed in any order.
#[derive(Debug, Clone, Deserialize)]
pub struct TechNodeData {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    pub cost: f64,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

// ===========================================================================
// Parts
// ===========================================================================

/// A part definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct PartData {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Tech node that unlocks the part. Unknown nodes are kept and reported
    /// by the missing-parts check rather than rejected.
    #[serde(default)]
    pub tech_required: Option<String>,
    #[serde(default)]
    pub entry_cost: u32,
    #[serde(default)]
    pub contract_objectives: Vec<String>,
}

// ===========================================================================
// Session
// ===========================================================================

/// Game parameters for a session.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub mode: GameMode,
    #[serde(default = "default_one")]
    pub science_gain_multiplier: f64,
    /// Seed for result text selection.
    #[serde(default = "default_seed")]
    pub rng_seed: u64,
}

fn default_seed() -> u64 {
    0x5EED
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::default(),
            science_gain_multiplier: 1.0,
            rng_seed: default_seed(),
        }
    }
}

impl From<&SessionConfig> for GameParameters {
    fn from(config: &SessionConfig) -> Self {
        Self {
            mode: config.mode,
            science_gain_multiplier: config.science_gain_multiplier,
        }
    }
}

// ===========================================================================
// TOML wrappers (TOML does not support top-level arrays)
// ===========================================================================

/// Wrapper for a list of bodies in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlBodies {
    pub bodies: Vec<BodyData>,
}

/// Wrapper for a list of experiments in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlExperiments {
    pub experiments: Vec<ExperimentData>,
}

/// Wrapper for a list of tech nodes in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlTechTree {
    pub nodes: Vec<TechNodeData>,
}

/// Wrapper for a list of parts in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlParts {
    pub parts: Vec<PartData>,
}

// ===========================================================================
// Tests
// ===========================================================================
