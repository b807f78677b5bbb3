//! Caller-supplied generation context: the request, the user's profile, and
//! their secondary preferences.
//!
//! These records are read-only inputs. Every field that the upstream
//! profile/preferences storage may omit is modeled as an `Option` (or a
//! defaulted collection) so that normalization and prompt sections never
//! need ad hoc null checks.

use super::lenient;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Current schema version of [`Preferences`].
pub const CURRENT_PREFERENCES_VERSION: u32 = 1;

/// A single recipe-generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Free-form request text, e.g. "quick breakfast with eggs".
    pub prompt_text: String,
    /// Requesting user, if known. Not part of the fingerprint.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt_text: impl Into<String>) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Profile-level cooking facts about the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    /// Skill level identifier, e.g. `"basic_skills"`.
    #[serde(deserialize_with = "lenient::scalar")]
    pub skill_level: Option<String>,
    /// Hard dietary restrictions, e.g. `"vegetarian"`, `"halal"`.
    #[serde(deserialize_with = "lenient::list")]
    pub dietary_restrictions: Option<Vec<String>>,
    /// Declared allergies.
    #[serde(deserialize_with = "lenient::list")]
    pub allergies: Option<Vec<String>>,
    /// Kitchen tools the user owns.
    #[serde(deserialize_with = "lenient::list")]
    pub kitchen_tools: Option<Vec<String>>,
}

impl UserProfile {
    pub fn with_skill_level(mut self, level: impl Into<String>) -> Self {
        self.skill_level = Some(level.into());
        self
    }

    pub fn with_allergies<S: Into<String>>(mut self, items: impl IntoIterator<Item = S>) -> Self {
        self.allergies = Some(items.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_dietary_restrictions<S: Into<String>>(
        mut self,
        items: impl IntoIterator<Item = S>,
    ) -> Self {
        self.dietary_restrictions = Some(items.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_kitchen_tools<S: Into<String>>(
        mut self,
        items: impl IntoIterator<Item = S>,
    ) -> Self {
        self.kitchen_tools = Some(items.into_iter().map(Into::into).collect());
        self
    }

    /// Load a profile from a JSON file. A missing file yields the empty profile.
    pub fn load_or_default(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            debug!("No profile at {}, using empty profile", path.display());
            return Ok(Self::default());
        }
        let data =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read profile: {e}"))?;
        serde_json::from_str(&data).map_err(|e| format!("failed to parse profile: {e}"))
    }
}

/// Safety-relevant and taste-relevant dietary preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DietaryPreferences {
    /// Allergies declared on the preferences screen (in addition to the profile).
    #[serde(deserialize_with = "lenient::list")]
    pub allergies: Option<Vec<String>>,
    /// Intolerances, e.g. `"lactose"`.
    #[serde(deserialize_with = "lenient::list")]
    pub intolerances: Option<Vec<String>>,
    /// Free-text restrictions the user added themselves.
    #[serde(deserialize_with = "lenient::list")]
    pub custom_restrictions: Option<Vec<String>>,
    /// Diet styles the user follows, e.g. `"mediterranean"`, `"keto"`.
    #[serde(deserialize_with = "lenient::list")]
    pub diet_types: Option<Vec<String>>,
    /// Ingredients the user would rather avoid (taste, not safety).
    #[serde(deserialize_with = "lenient::list")]
    pub disliked_ingredients: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient::list")]
    pub favorite_cuisines: Option<Vec<String>>,
}

/// What the user's kitchen can and cannot do.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KitchenPreferences {
    /// Appliances beyond the profile tool list, e.g. `"air fryer"`.
    #[serde(deserialize_with = "lenient::list")]
    pub appliances: Option<Vec<String>>,
    /// Typical weeknight time budget in minutes.
    #[serde(deserialize_with = "lenient::scalar")]
    pub max_cooking_time_minutes: Option<u32>,
    /// Budget per serving in the user's currency.
    #[serde(deserialize_with = "lenient::scalar")]
    pub budget_per_serving: Option<f64>,
    #[serde(deserialize_with = "lenient::scalar")]
    pub storage_space: Option<String>,
}

/// How the user likes to cook and eat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CookingPreferences {
    #[serde(deserialize_with = "lenient::scalar")]
    pub cooking_style: Option<String>,
    #[serde(deserialize_with = "lenient::scalar")]
    pub spice_tolerance: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub flavor_profiles: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient::scalar")]
    pub household_size: Option<u32>,
    #[serde(deserialize_with = "lenient::scalar")]
    pub meal_prep: Option<bool>,
}

/// Versioned secondary preferences record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub version: u32,
    pub dietary: DietaryPreferences,
    pub kitchen: KitchenPreferences,
    pub cooking: CookingPreferences,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: CURRENT_PREFERENCES_VERSION,
            dietary: DietaryPreferences::default(),
            kitchen: KitchenPreferences::default(),
            cooking: CookingPreferences::default(),
        }
    }
}

impl Preferences {
    /// Build preferences from loosely-typed JSON.
    ///
    /// Each field is parsed independently: a malformed field degrades to
    /// `None` without touching its neighbours, and lists keep every string
    /// member. A section that is not an object degrades to its default, and
    /// a non-object input yields the default preferences.
    pub fn from_value_lenient(value: &serde_json::Value) -> Self {
        let Some(obj) = value.as_object() else {
            if !value.is_null() {
                warn!("Preferences are not a JSON object, using defaults");
            }
            return Self::default();
        };

        let version = obj
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(CURRENT_PREFERENCES_VERSION);
        if version > CURRENT_PREFERENCES_VERSION {
            warn!(
                "Preferences version {version} is newer than supported \
                 {CURRENT_PREFERENCES_VERSION}; unknown fields are ignored"
            );
        }

        Self {
            version,
            dietary: section(obj, "dietary"),
            kitchen: section(obj, "kitchen"),
            cooking: section(obj, "cooking"),
        }
    }

    /// Load preferences from a JSON file, leniently. A missing or unreadable
    /// file yields the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) => {
                debug!("No preferences at {} ({e}), using defaults", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str::<serde_json::Value>(&data) {
            Ok(value) => Self::from_value_lenient(&value),
            Err(e) => {
                warn!("Failed to parse preferences at {}: {e}", path.display());
                Self::default()
            }
        }
    }
}

fn section<T>(obj: &serde_json::Map<String, serde_json::Value>, name: &str) -> T
where
    T: Default + serde::de::DeserializeOwned,
{
    match obj.get(name) {
        None | Some(serde_json::Value::Null) => T::default(),
        Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|e| {
            warn!("Malformed preferences section '{name}': {e}; using defaults");
            T::default()
        }),
    }
}

/// Nutrition still available for the day, passed through to the prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MacroTargets {
    pub calories: Option<f64>,
    pub protein_grams: Option<f64>,
    pub carbs_grams: Option<f64>,
    pub fat_grams: Option<f64>,
}

impl MacroTargets {
    pub fn is_empty(&self) -> bool {
        self.calories.is_none()
            && self.protein_grams.is_none()
            && self.carbs_grams.is_none()
            && self.fat_grams.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_field_degrades_alone() {
        let value = json!({
            "version": 1,
            "dietary": { "allergies": ["Peanuts"], "intolerances": ["lactose"] },
            "kitchen": { "maxCookingTimeMinutes": "not a number", "storageSpace": "small" },
            "cooking": { "cookingStyle": "rustic", "householdSize": -2 }
        });
        let prefs = Preferences::from_value_lenient(&value);
        assert_eq!(
            prefs.dietary.allergies.as_deref(),
            Some(&["Peanuts".to_string()][..])
        );
        assert!(prefs.kitchen.max_cooking_time_minutes.is_none());
        assert_eq!(prefs.kitchen.storage_space.as_deref(), Some("small"));
        assert_eq!(prefs.cooking.cooking_style.as_deref(), Some("rustic"));
        assert!(prefs.cooking.household_size.is_none());
    }

    #[test]
    fn malformed_taste_field_keeps_allergies() {
        let prefs = Preferences::from_value_lenient(&json!({
            "dietary": {
                "allergies": ["peanuts"],
                "favoriteCuisines": "thai",
                "dislikedIngredients": 7,
                "intolerances": ["lactose", 3]
            }
        }));
        assert_eq!(prefs.dietary.allergies, Some(vec!["peanuts".to_string()]));
        assert_eq!(prefs.dietary.intolerances, Some(vec!["lactose".to_string()]));
        assert_eq!(prefs.dietary.favorite_cuisines, Some(vec!["thai".to_string()]));
        assert!(prefs.dietary.disliked_ingredients.is_none());
    }

    #[test]
    fn non_object_section_is_default() {
        let prefs = Preferences::from_value_lenient(&json!({
            "dietary": ["peanuts"],
            "cooking": { "cookingStyle": "rustic" }
        }));
        assert_eq!(prefs.dietary, DietaryPreferences::default());
        assert_eq!(prefs.cooking.cooking_style.as_deref(), Some("rustic"));
    }

    #[test]
    fn profile_malformed_field_keeps_allergies() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"skillLevel": 3, "kitchenTools": {"stove": true}, "allergies": ["shellfish"]}"#,
        )
        .unwrap();
        assert!(profile.skill_level.is_none());
        assert!(profile.kitchen_tools.is_none());
        assert_eq!(profile.allergies, Some(vec!["shellfish".to_string()]));
    }

    #[test]
    fn lenient_parse_non_object_is_default() {
        assert_eq!(
            Preferences::from_value_lenient(&json!("garbage")),
            Preferences::default()
        );
        assert_eq!(
            Preferences::from_value_lenient(&serde_json::Value::Null),
            Preferences::default()
        );
    }

    #[test]
    fn missing_version_defaults_to_current() {
        let prefs = Preferences::from_value_lenient(&json!({}));
        assert_eq!(prefs.version, CURRENT_PREFERENCES_VERSION);
    }

    #[test]
    fn profile_deserializes_partial_json() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"skillLevel":"basic_skills","kitchenTools":["stove"]}"#)
                .unwrap();
        assert_eq!(profile.skill_level.as_deref(), Some("basic_skills"));
        assert!(profile.allergies.is_none());
    }

    #[test]
    fn load_profile_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let profile = UserProfile::load_or_default(&dir.path().join("nope.json")).unwrap();
        assert!(profile.skill_level.is_none());
    }

    #[test]
    fn load_preferences_invalid_json_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(Preferences::load_or_default(&path), Preferences::default());
    }

    #[test]
    fn macro_targets_empty() {
        assert!(MacroTargets::default().is_empty());
        let m = MacroTargets {
            protein_grams: Some(40.0),
            ..Default::default()
        };
        assert!(!m.is_empty());
    }
}
