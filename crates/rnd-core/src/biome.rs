//! Static lookup of location tags per celestial body.
//!
//! Biomes are kept in the body's canonical order; every tag list reported by
//! the catalog follows that order, with mini-biomes appended after the
//! regular biomes when they are requested.

use crate::error::CatalogError;
use crate::id::BodyId;
use crate::situation::Situation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// A named region of a body's biome map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biome {
    /// Canonical name, may contain spaces ("Northern Ice Shelf").
    pub name: String,
    /// Localized name shown to the player.
    pub display_name: String,
}

impl Biome {
    /// The biome's science tag: its name with spaces removed.
    pub fn tag(&self) -> String {
        strip_spaces(&self.name)
    }
}

/// A small hand-placed region (launch pad, runway) layered over the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiniBiome {
    /// Science tag used in subject ids ("LaunchPad").
    pub tag: String,
    /// Tag of the collider the host attaches to the region.
    pub unity_tag: String,
    pub display_name: String,
}

/// Per-situation difficulty multipliers for one body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SituationMultipliers {
    pub landed: f64,
    pub splashed: f64,
    pub flying_low: f64,
    pub flying_high: f64,
    pub in_space_low: f64,
    pub in_space_high: f64,
}

impl SituationMultipliers {
    pub const UNIT: SituationMultipliers = SituationMultipliers {
        landed: 1.0,
        splashed: 1.0,
        flying_low: 1.0,
        flying_high: 1.0,
        in_space_low: 1.0,
        in_space_high: 1.0,
    };

    pub fn get(&self, situation: Situation) -> f64 {
        match situation {
            Situation::SrfLanded => self.landed,
            Situation::SrfSplashed => self.splashed,
            Situation::FlyingLow => self.flying_low,
            Situation::FlyingHigh => self.flying_high,
            Situation::InSpaceLow => self.in_space_low,
            Situation::InSpaceHigh => self.in_space_high,
        }
    }
}

impl Default for SituationMultipliers {
    fn default() -> Self {
        Self::UNIT
    }
}

/// A celestial body and its canonical biome list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: BodyId,
    pub title: String,
    pub biomes: Vec<Biome>,
    pub mini_biomes: Vec<MiniBiome>,
    pub multipliers: SituationMultipliers,
    pub has_atmosphere: bool,
    pub has_ocean: bool,
}

impl Body {
    /// Whether a measurement in `situation` is physically possible here.
    pub fn supports(&self, situation: Situation) -> bool {
        match situation {
            Situation::SrfSplashed => self.has_ocean,
            Situation::FlyingLow | Situation::FlyingHigh => self.has_atmosphere,
            _ => true,
        }
    }
}

// ---------------------------------------------------------------------------
// BiomeCatalog
// ---------------------------------------------------------------------------

/// Read-only catalog of bodies, frozen after loading.
#[derive(Debug, Clone, Default)]
pub struct BiomeCatalog {
    bodies: Vec<Body>,
    index: HashMap<BodyId, usize>,
}

impl BiomeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a body. Bodies are reported in registration order.
    pub fn register(&mut self, body: Body) -> Result<(), CatalogError> {
        if self.index.contains_key(&body.id) {
            return Err(CatalogError::DuplicateBody(body.id));
        }
        for situation in Situation::ALL {
            let value = body.multipliers.get(situation);
            if !(value > 0.0 && value.is_finite()) {
                return Err(CatalogError::InvalidMultiplier {
                    body: body.id,
                    situation: situation.tag(),
                    value,
                });
            }
        }
        self.index.insert(body.id.clone(), self.bodies.len());
        self.bodies.push(body);
        Ok(())
    }

    pub fn body(&self, id: &str) -> Option<&Body> {
        self.index.get(id).map(|&i| &self.bodies[i])
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Biome tags for a body, spaces removed, followed by mini-biome tags
    /// when `include_mini_biomes` is set. Unknown bodies have no biomes.
    pub fn biome_tags(&self, body: &str, include_mini_biomes: bool) -> Vec<String> {
        let Some(body) = self.body(body) else {
            return Vec::new();
        };
        let mut tags: Vec<String> = body.biomes.iter().map(Biome::tag).collect();
        if include_mini_biomes {
            tags.extend(body.mini_biomes.iter().map(|m| m.tag.clone()));
        }
        tags
    }

    /// Same ordering as [`biome_tags`](Self::biome_tags), with display names.
    pub fn biome_tags_localized(&self, body: &str, include_mini_biomes: bool) -> Vec<String> {
        let Some(body) = self.body(body) else {
            return Vec::new();
        };
        let mut names: Vec<String> = body.biomes.iter().map(|b| b.display_name.clone()).collect();
        if include_mini_biomes {
            names.extend(body.mini_biomes.iter().map(|m| m.display_name.clone()));
        }
        names
    }

    pub fn mini_biome_tags(&self, body: &str) -> Vec<String> {
        self.body(body)
            .map(|b| b.mini_biomes.iter().map(|m| m.tag.clone()).collect())
            .unwrap_or_default()
    }

    pub fn mini_biome_tags_localized(&self, body: &str) -> Vec<String> {
        self.body(body)
            .map(|b| b.mini_biomes.iter().map(|m| m.display_name.clone()).collect())
            .unwrap_or_default()
    }

    /// Name of the mini-biome whose science tag is `tag`. `formatted`
    /// selects the display name; otherwise the tag itself is returned.
    /// Empty when no body has such a mini-biome.
    pub fn mini_biome_display_name_by_science_id(&self, tag: &str, formatted: bool) -> String {
        self.find_mini_biome(|m| m.tag == tag)
            .map(|m| mini_biome_name(m, formatted))
            .unwrap_or_default()
    }

    /// Like [`mini_biome_display_name_by_science_id`](Self::mini_biome_display_name_by_science_id),
    /// keyed by the host collider tag.
    pub fn mini_biome_display_name_by_unity_tag(&self, unity_tag: &str, formatted: bool) -> String {
        self.find_mini_biome(|m| m.unity_tag == unity_tag)
            .map(|m| mini_biome_name(m, formatted))
            .unwrap_or_default()
    }

    /// Display name for a biome or mini-biome tag on a body, falling back
    /// to the tag itself.
    pub fn biome_display_name(&self, body: &str, tag: &str) -> String {
        let Some(body) = self.body(body) else {
            return tag.to_string();
        };
        body.biomes
            .iter()
            .find(|b| b.tag() == tag)
            .map(|b| b.display_name.clone())
            .or_else(|| {
                body.mini_biomes
                    .iter()
                    .find(|m| m.tag == tag)
                    .map(|m| m.display_name.clone())
            })
            .unwrap_or_else(|| tag.to_string())
    }

    /// Difficulty multiplier for measuring in `situation` at `body`.
    /// Unknown bodies use 1.0.
    pub fn situation_multiplier(&self, body: &str, situation: Situation) -> f64 {
        self.body(body)
            .map(|b| b.multipliers.get(situation))
            .unwrap_or(1.0)
    }

    fn find_mini_biome(&self, pred: impl Fn(&MiniBiome) -> bool) -> Option<&MiniBiome> {
        self.bodies
            .iter()
            .flat_map(|b| b.mini_biomes.iter())
            .find(|m| pred(m))
    }
}

fn mini_biome_name(mini: &MiniBiome, formatted: bool) -> String {
    if formatted {
        mini.display_name.clone()
    } else {
        mini.tag.clone()
    }
}

fn strip_spaces(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}
