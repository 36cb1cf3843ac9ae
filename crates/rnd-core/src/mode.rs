use serde::{Deserialize, Serialize};

/// The kind of game the session runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameMode {
    /// Science and funds; parts must be purchased after research.
    #[default]
    Career,
    /// Science only; researched parts are free.
    Science,
    /// Everything unlocked; science is not tracked.
    Sandbox,
}

impl GameMode {
    /// Whether currency requirements apply at all.
    pub fn science_enabled(self) -> bool {
        !matches!(self, GameMode::Sandbox)
    }

    /// Whether researched parts still need to be purchased.
    pub fn tracks_purchases(self) -> bool {
        matches!(self, GameMode::Career)
    }
}

/// Game-wide knobs the value computation depends on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameParameters {
    #[serde(default)]
    pub mode: GameMode,
    /// Difficulty setting applied to every award.
    #[serde(default = "default_gain")]
    pub science_gain_multiplier: f64,
}

fn default_gain() -> f64 {
    1.0
}

impl Default for GameParameters {
    fn default() -> Self {
        Self {
            mode: GameMode::default(),
            science_gain_multiplier: default_gain(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_disables_science_and_purchases() {
        assert!(!GameMode::Sandbox.science_enabled());
        assert!(!GameMode::Sandbox.tracks_purchases());
        assert!(GameMode::Science.science_enabled());
        assert!(!GameMode::Science.tracks_purchases());
        assert!(GameMode::Career.tracks_purchases());
    }

    #[test]
    fn parameters_default_from_empty_json() {
        let params: GameParameters = serde_json::from_str("{}").unwrap();
        assert_eq!(params, GameParameters::default());
        assert_eq!(params.science_gain_multiplier, 1.0);
    }
}
