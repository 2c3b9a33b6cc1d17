//! Scenario catalog: the immutable patient/family context a conversation is
//! seeded from.

use crate::emotion::EmotionalState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub patient_age: Option<u32>,
    pub patient_condition: String,
    pub family_relationship: String,
    pub family_background: String,
    #[serde(default)]
    pub initial_emotional_state: EmotionalState,
}

/// Listing view of a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub patient_age: Option<u32>,
    pub patient_condition: String,
}

impl From<&Scenario> for ScenarioSummary {
    fn from(s: &Scenario) -> Self {
        Self {
            id: s.id,
            title: s.title.clone(),
            description: s.description.clone(),
            difficulty: s.difficulty,
            patient_age: s.patient_age,
            patient_condition: s.patient_condition.clone(),
        }
    }
}

/// Read-only scenario lookup.
pub trait ScenarioProvider: Send + Sync {
    /// Exact lookup.
    fn get(&self, id: u32) -> Option<Scenario>;

    /// Lookup that never fails: unknown ids resolve to the default scenario.
    fn get_or_default(&self, id: u32) -> Scenario;

    fn list(&self) -> Vec<ScenarioSummary>;
}

/// In-process catalog. The first entry is the default.
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    scenarios: Vec<Scenario>,
}

impl ScenarioCatalog {
    /// Panics if `scenarios` is empty, since there would be no default.
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        assert!(!scenarios.is_empty(), "scenario catalog needs a default entry");
        Self { scenarios }
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            Scenario {
                id: 1,
                title: "Terminal Cancer - Family in Denial".into(),
                description: "75-year-old patient with stage 4 lung cancer. Adult daughter is in denial about prognosis.".into(),
                difficulty: Difficulty::Intermediate,
                patient_age: Some(75),
                patient_condition: "Stage 4 lung cancer with weeks to live".into(),
                family_relationship: "Adult daughter".into(),
                family_background: "Only child who has been very close to parent. Works as a nurse.".into(),
                initial_emotional_state: EmotionalState::Denial,
            },
            Scenario {
                id: 2,
                title: "Sudden Cardiac Arrest - Spouse in Shock".into(),
                description: "58-year-old patient after cardiac arrest. Spouse is experiencing shock and anger.".into(),
                difficulty: Difficulty::Beginner,
                patient_age: Some(58),
                patient_condition: "Post-cardiac arrest, severe brain damage".into(),
                family_relationship: "Spouse".into(),
                family_background: "Married 30 years. No other family nearby.".into(),
                initial_emotional_state: EmotionalState::Anger,
            },
            Scenario {
                id: 3,
                title: "Advanced Dementia - Family Disagreement".into(),
                description: "82-year-old with advanced dementia. Family members disagree on care approach.".into(),
                difficulty: Difficulty::Advanced,
                patient_age: Some(82),
                patient_condition: "Advanced dementia, recurrent aspiration pneumonia".into(),
                family_relationship: "Adult children (multiple)".into(),
                family_background: "Three adult children with different opinions on care.".into(),
                initial_emotional_state: EmotionalState::Bargaining,
            },
        ])
    }
}

impl Default for ScenarioCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ScenarioProvider for ScenarioCatalog {
    fn get(&self, id: u32) -> Option<Scenario> {
        self.scenarios.iter().find(|s| s.id == id).cloned()
    }

    fn get_or_default(&self, id: u32) -> Scenario {
        self.get(id).unwrap_or_else(|| {
            tracing::debug!("Scenario {} not found, using default", id);
            self.scenarios[0].clone()
        })
    }

    fn list(&self) -> Vec<ScenarioSummary> {
        self.scenarios.iter().map(ScenarioSummary::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = ScenarioCatalog::builtin();
        assert_eq!(catalog.list().len(), 3);
        assert_eq!(
            catalog.get(2).unwrap().initial_emotional_state,
            EmotionalState::Anger
        );
    }

    #[test]
    fn test_unknown_id_falls_back_to_default() {
        let catalog = ScenarioCatalog::builtin();
        assert!(catalog.get(99).is_none());
        assert_eq!(catalog.get_or_default(99).id, 1);
    }

    #[test]
    fn test_missing_initial_state_is_neutral() {
        let json = r#"{
            "id": 7, "title": "t", "description": "d", "difficulty": "expert",
            "patient_age": null, "patient_condition": "c",
            "family_relationship": "r", "family_background": "b"
        }"#;
        let scenario: Scenario = serde_json::from_str(json).unwrap();
        assert_eq!(scenario.initial_emotional_state, EmotionalState::Neutral);
    }
}
