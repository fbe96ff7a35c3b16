//! Field settings and preferences
//!
//! Persisted in LocalStorage. Simulation state never is.

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_BALLOON_COUNT;
use crate::sim::Entitlement;

/// Host-supplied device capability level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PerformanceTier {
    Low,
    #[default]
    Medium,
    High,
}

impl PerformanceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceTier::Low => "Low",
            PerformanceTier::Medium => "Medium",
            PerformanceTier::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(PerformanceTier::Low),
            "medium" | "med" => Some(PerformanceTier::Medium),
            "high" => Some(PerformanceTier::High),
            _ => None,
        }
    }

    /// Share of the chunk layer spawned per burst
    pub fn chunk_scale(&self) -> f32 {
        match self {
            PerformanceTier::Low => 0.34,
            PerformanceTier::Medium => 0.67,
            PerformanceTier::High => 1.0,
        }
    }

    /// Maximum fragments drawn per frame
    pub fn max_fragments(&self) -> usize {
        match self {
            PerformanceTier::Low => 60,
            PerformanceTier::Medium => 150,
            PerformanceTier::High => 400,
        }
    }

    /// Fragments integrated per tick; the rest are deferred
    pub fn particle_budget(&self) -> usize {
        match self {
            PerformanceTier::Low => 40,
            PerformanceTier::Medium => 120,
            PerformanceTier::High => 400,
        }
    }
}

/// Phoneme labels used when none are configured
pub fn default_labels() -> Vec<String> {
    [
        "p", "b", "m", "t", "d", "n", "k", "g", "f", "v", "s", "z", "sh", "ch", "j", "l", "r",
        "th", "w", "y",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Field settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Device capability tier
    pub tier: PerformanceTier,
    /// Pop bursts
    pub particles: bool,
    /// Balloons in the field (split across both anchors)
    pub balloon_count: usize,
    /// Labels assigned round-robin
    pub labels: Vec<String>,

    // === Entitlement ===
    /// Only label poppable without an entitlement
    pub free_sample_label: Option<String>,
    pub entitled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tier: PerformanceTier::Medium,
            particles: true,
            balloon_count: DEFAULT_BALLOON_COUNT,
            labels: default_labels(),
            free_sample_label: None,
            entitled: false,
        }
    }
}

impl Settings {
    /// Create settings for a performance tier
    pub fn from_tier(tier: PerformanceTier) -> Self {
        Self {
            tier,
            ..Self::default()
        }
    }

    /// Fragments drawn per frame; zero when particles are off
    pub fn max_fragments(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.tier.max_fragments()
        }
    }

    pub fn particle_budget(&self) -> usize {
        self.tier.particle_budget()
    }

    pub fn entitlement(&self) -> Entitlement {
        Entitlement {
            free_sample_label: self.free_sample_label.clone(),
            entitled: self.entitled,
        }
    }

    /// LocalStorage key
    const STORAGE_KEY: &'static str = "phoneme_balloons_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match serde_json::from_str(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        log::debug!("No settings store on native, using defaults ({})", Self::STORAGE_KEY);
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_from_str() {
        assert_eq!(PerformanceTier::from_str("LOW"), Some(PerformanceTier::Low));
        assert_eq!(PerformanceTier::from_str("med"), Some(PerformanceTier::Medium));
        assert_eq!(PerformanceTier::from_str("High"), Some(PerformanceTier::High));
        assert_eq!(PerformanceTier::from_str("ultra"), None);
    }

    #[test]
    fn test_tiers_scale_up() {
        let tiers = [PerformanceTier::Low, PerformanceTier::Medium, PerformanceTier::High];
        for pair in tiers.windows(2) {
            assert!(pair[0].chunk_scale() < pair[1].chunk_scale());
            assert!(pair[0].max_fragments() < pair[1].max_fragments());
            assert!(pair[0].particle_budget() <= pair[1].particle_budget());
        }
    }

    #[test]
    fn test_particles_off_disables_fragments() {
        let settings = Settings {
            particles: false,
            ..Settings::from_tier(PerformanceTier::High)
        };
        assert_eq!(settings.max_fragments(), 0);
    }

    #[test]
    fn test_json_round_trip_keeps_tier() {
        let settings = Settings {
            free_sample_label: Some("s".into()),
            ..Settings::from_tier(PerformanceTier::Low)
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let back: Settings = serde_json::from_str(r#"{"tier": "High"}"#).unwrap();
        assert_eq!(back.tier, PerformanceTier::High);
        assert_eq!(back.balloon_count, DEFAULT_BALLOON_COUNT);
        assert_eq!(back.labels, default_labels());
    }

    #[test]
    fn test_entitlement_from_settings() {
        let settings = Settings {
            free_sample_label: Some("k".into()),
            ..Settings::default()
        };
        let gate = settings.entitlement();
        assert!(gate.allows("k"));
        assert!(!gate.allows("g"));
    }
}
