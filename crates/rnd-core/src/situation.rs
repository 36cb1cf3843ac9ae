//! Experiment situations: the contextual state a measurement is taken in.

use serde::{Deserialize, Serialize};

/// Where a vessel is relative to a body when it takes a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Situation {
    SrfLanded,
    SrfSplashed,
    FlyingLow,
    FlyingHigh,
    InSpaceLow,
    InSpaceHigh,
}

impl Situation {
    /// Every situation, in canonical order. Tags and descriptions are
    /// reported in this order.
    pub const ALL: [Situation; 6] = [
        Situation::SrfLanded,
        Situation::SrfSplashed,
        Situation::FlyingLow,
        Situation::FlyingHigh,
        Situation::InSpaceLow,
        Situation::InSpaceHigh,
    ];

    /// The tag embedded in subject ids.
    pub fn tag(self) -> &'static str {
        match self {
            Situation::SrfLanded => "SrfLanded",
            Situation::SrfSplashed => "SrfSplashed",
            Situation::FlyingLow => "FlyingLow",
            Situation::FlyingHigh => "FlyingHigh",
            Situation::InSpaceLow => "InSpaceLow",
            Situation::InSpaceHigh => "InSpaceHigh",
        }
    }

    /// Human-readable prefix used in subject titles ("Landed at Kerbin").
    pub fn description(self) -> &'static str {
        match self {
            Situation::SrfLanded => "Landed at",
            Situation::SrfSplashed => "Splashed down at",
            Situation::FlyingLow => "Flying low over",
            Situation::FlyingHigh => "Flying high over",
            Situation::InSpaceLow => "In space near",
            Situation::InSpaceHigh => "In space high over",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Situation> {
        Situation::ALL.into_iter().find(|s| s.tag() == tag)
    }

    fn bit(self) -> u8 {
        match self {
            Situation::SrfLanded => 1,
            Situation::SrfSplashed => 1 << 1,
            Situation::FlyingLow => 1 << 2,
            Situation::FlyingHigh => 1 << 3,
            Situation::InSpaceLow => 1 << 4,
            Situation::InSpaceHigh => 1 << 5,
        }
    }
}

/// A set of situations, stored as a bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SituationMask(pub u8);

impl SituationMask {
    pub const NONE: SituationMask = SituationMask(0);
    pub const ALL: SituationMask = SituationMask(0b11_1111);

    pub fn contains(self, situation: Situation) -> bool {
        self.0 & situation.bit() != 0
    }

    pub fn with(self, situation: Situation) -> SituationMask {
        SituationMask(self.0 | situation.bit())
    }

    pub fn iter(self) -> impl Iterator<Item = Situation> {
        Situation::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl FromIterator<Situation> for SituationMask {
    fn from_iter<I: IntoIterator<Item = Situation>>(iter: I) -> Self {
        iter.into_iter().fold(SituationMask::NONE, SituationMask::with)
    }
}

/// Situation tags in canonical order.
pub fn situation_tags() -> Vec<String> {
    Situation::ALL.iter().map(|s| s.tag().to_string()).collect()
}

/// Situation descriptions, index-aligned with [`situation_tags`].
pub fn situation_tag_descriptions() -> Vec<String> {
    Situation::ALL
        .iter()
        .map(|s| s.description().to_string())
        .collect()
}
