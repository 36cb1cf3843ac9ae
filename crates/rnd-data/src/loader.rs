//! Resolution pipeline: reads data files, resolves cross-references, builds
//! the catalogs and the tech tree.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers, plus [`load_research_data`] which runs the whole
//! pipeline over a data directory.

use rnd_core::biome::{Biome, BiomeCatalog, Body, MiniBiome, SituationMultipliers};
use rnd_core::experiment::{ExperimentCatalog, ResultTable, ScienceExperiment};
use rnd_core::id::{BodyId, ExperimentId, PartId, TechId};
use rnd_core::parts::{AvailablePart, PartCatalog};
use rnd_core::situation::{Situation, SituationMask};
use rnd_tech_tree::{TechNode, TechTree};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use crate::schema::*;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The prerequisite graph has a cycle through the listed nodes.
    #[error("cyclic prerequisites in {file}: {nodes:?}")]
    CyclicPrerequisites { file: PathBuf, nodes: Vec<String> },

    /// A definition was rejected when registered (bad cap, bad multiplier).
    #[error("invalid definition in {file}: {detail}")]
    Invalid { file: PathBuf, detail: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let extensions = ["ron", "toml", "json"];
    let mut found: Option<PathBuf> = None;

    for ext in &extensions {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(ref existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing.clone(),
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => {
            let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .get(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
                .clone();
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

fn invalid(path: &Path, err: impl ToString) -> DataLoadError {
    DataLoadError::Invalid {
        file: path.to_path_buf(),
        detail: err.to_string(),
    }
}

// ===========================================================================
// Research data pipeline
// ===========================================================================

/// Everything a research session is built from.
#[derive(Debug, Clone)]
pub struct ResearchData {
    pub bodies: BiomeCatalog,
    pub experiments: ExperimentCatalog,
    pub parts: PartCatalog,
    pub tech_tree: TechTree,
    pub session: SessionConfig,
}

/// Directory of the stock data set shipped with this crate.
pub fn stock_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join("stock")
}

/// Load a data directory.
///
/// Requires `bodies`, `experiments` and `tech_tree`; `parts` and `session`
/// are optional. Tech nodes may be listed in any order; they are registered
/// in dependency order, and a cyclic prerequisite graph is rejected.
pub fn load_research_data(dir: &Path) -> Result<ResearchData, DataLoadError> {
    let bodies_path = require_data_file(dir, "bodies")?;
    let bodies = load_bodies(&bodies_path)?;

    let experiments_path = require_data_file(dir, "experiments")?;
    let experiments = load_experiments(&experiments_path)?;

    let tech_path = require_data_file(dir, "tech_tree")?;
    let tech_tree = load_tech_tree(&tech_path)?;

    let parts = match find_data_file(dir, "parts")? {
        Some(path) => load_parts(&path, &tech_tree)?,
        None => PartCatalog::new(),
    };

    let session = match find_data_file(dir, "session")? {
        Some(path) => deserialize_file::<SessionConfig>(&path)?,
        None => SessionConfig::default(),
    };

    tracing::info!(
        target: "rnd",
        dir = %dir.display(),
        bodies = bodies.bodies().len(),
        experiments = experiments.len(),
        nodes = tech_tree.len(),
        parts = parts.len(),
        "research data loaded"
    );

    Ok(ResearchData {
        bodies,
        experiments,
        parts,
        tech_tree,
        session,
    })
}

fn load_bodies(path: &Path) -> Result<BiomeCatalog, DataLoadError> {
    let data: Vec<BodyData> = deserialize_list(path, "bodies")?;
    let mut catalog = BiomeCatalog::new();
    let mut seen: HashMap<String, ()> = HashMap::new();

    for body in data {
        check_duplicate(&seen, &body.name, path)?;
        seen.insert(body.name.clone(), ());

        let m = body.multipliers;
        let resolved = Body {
            id: BodyId::from(body.name.as_str()),
            title: body.title.unwrap_or_else(|| body.name.clone()),
            biomes: body
                .biomes
                .into_iter()
                .map(|b| Biome {
                    display_name: b.display_name.unwrap_or_else(|| b.name.clone()),
                    name: b.name,
                })
                .collect(),
            mini_biomes: body
                .mini_biomes
                .into_iter()
                .map(|mb| MiniBiome {
                    display_name: mb.display_name.unwrap_or_else(|| mb.tag.clone()),
                    tag: mb.tag,
                    unity_tag: mb.unity_tag,
                })
                .collect(),
            multipliers: SituationMultipliers {
                landed: m.landed,
                splashed: m.splashed,
                flying_low: m.flying_low,
                flying_high: m.flying_high,
                in_space_low: m.in_space_low,
                in_space_high: m.in_space_high,
            },
            has_atmosphere: body.atmosphere,
            has_ocean: body.ocean,
        };
        catalog.register(resolved).map_err(|e| invalid(path, e))?;
    }
    Ok(catalog)
}

fn parse_situations(tags: &[String], path: &Path) -> Result<SituationMask, DataLoadError> {
    tags.iter()
        .map(|tag| {
            Situation::from_tag(tag).ok_or_else(|| DataLoadError::UnresolvedRef {
                file: path.to_path_buf(),
                name: tag.clone(),
                expected_kind: "situation",
            })
        })
        .collect()
}

fn load_experiments(path: &Path) -> Result<ExperimentCatalog, DataLoadError> {
    let data: Vec<ExperimentData> = deserialize_list(path, "experiments")?;
    let mut catalog = ExperimentCatalog::new();
    let mut seen: HashMap<String, ()> = HashMap::new();

    for exp in data {
        check_duplicate(&seen, &exp.name, path)?;
        seen.insert(exp.name.clone(), ());

        let situation_mask = if exp.situations.is_empty() {
            SituationMask::ALL
        } else {
            parse_situations(&exp.situations, path)?
        };
        let biome_mask = parse_situations(&exp.biome_situations, path)?;

        let mut results = ResultTable::new(exp.results.default);
        for (key, texts) in exp.results.variants {
            for text in texts {
                results.add(key.clone(), text);
            }
        }

        let resolved = ScienceExperiment {
            id: ExperimentId::from(exp.name.as_str()),
            title: exp.title,
            base_value: exp.base_value.unwrap_or(exp.science_cap),
            science_cap: exp.science_cap,
            data_scale: exp.data_scale,
            situation_mask,
            biome_mask,
            results,
        };
        catalog.register(resolved).map_err(|e| invalid(path, e))?;
    }
    Ok(catalog)
}

/// Order nodes so every prerequisite precedes its dependents, keeping file
/// order among nodes that are ready at the same time.
fn order_tech_nodes(
    nodes: Vec<TechNodeData>,
    path: &Path,
) -> Result<Vec<TechNodeData>, DataLoadError> {
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, node) in nodes.iter().enumerate() {
        check_duplicate(&index, &node.name, path)?;
        index.insert(node.name.clone(), i);
    }

    let mut unmet = vec![0usize; nodes.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        for prereq in &node.prerequisites {
            let p = *resolve_name(&index, prereq, path, "tech node")?;
            unmet[i] += 1;
            dependents[p].push(i);
        }
    }

    let mut ready: VecDeque<usize> = (0..nodes.len()).filter(|&i| unmet[i] == 0).collect();
    let mut sorted = Vec::with_capacity(nodes.len());
    while let Some(i) = ready.pop_front() {
        sorted.push(i);
        for &d in &dependents[i] {
            unmet[d] -= 1;
            if unmet[d] == 0 {
                ready.push_back(d);
            }
        }
    }

    if sorted.len() < nodes.len() {
        let cyclic: Vec<String> = nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| unmet[*i] > 0)
            .map(|(_, n)| n.name.clone())
            .collect();
        tracing::warn!(target: "rnd", file = %path.display(), ?cyclic, "rejecting cyclic tech tree");
        return Err(DataLoadError::CyclicPrerequisites {
            file: path.to_path_buf(),
            nodes: cyclic,
        });
    }

    let mut slots: Vec<Option<TechNodeData>> = nodes.into_iter().map(Some).collect();
    Ok(sorted.into_iter().filter_map(|i| slots[i].take()).collect())
}

fn load_tech_tree(path: &Path) -> Result<TechTree, DataLoadError> {
    let data: Vec<TechNodeData> = deserialize_list(path, "nodes")?;
    let mut tree = TechTree::new();

    for node in order_tech_nodes(data, path)? {
        let resolved = TechNode {
            id: TechId::from(node.name.as_str()),
            title: node.title.unwrap_or_else(|| node.name.clone()),
            description: node.description,
            cost: node.cost,
            prerequisites: node
                .prerequisites
                .iter()
                .map(|p| TechId::from(p.as_str()))
                .collect(),
        };
        tree.register(resolved).map_err(|e| invalid(path, e))?;
    }
    Ok(tree)
}

fn load_parts(path: &Path, tree: &TechTree) -> Result<PartCatalog, DataLoadError> {
    let data: Vec<PartData> = deserialize_list(path, "parts")?;
    let mut catalog = PartCatalog::new();
    let mut seen: HashMap<String, ()> = HashMap::new();

    for part in data {
        check_duplicate(&seen, &part.name, path)?;
        seen.insert(part.name.clone(), ());

        if let Some(tech) = &part.tech_required {
            if tree.node(tech).is_none() {
                tracing::warn!(target: "rnd", part = %part.name, tech = %tech, "part assigned to unknown tech node");
            }
        }
        let resolved = AvailablePart {
            id: PartId::from(part.name.as_str()),
            title: part.title.unwrap_or_else(|| part.name.clone()),
            tech_required: part.tech_required.as_deref().map(TechId::from),
            entry_cost: part.entry_cost,
            contract_objectives: part.contract_objectives,
        };
        catalog.register(resolved).map_err(|e| invalid(path, e))?;
    }
    Ok(catalog)
}

// ===========================================================================
// Tests
// ===========================================================================
