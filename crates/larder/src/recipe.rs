//! The fixed recipe schema and validation of generator output.
//!
//! Nothing reaches the cache without passing [`validate_artifact`]: the text
//! must parse as a JSON object, must not be an error report, must satisfy
//! the JSON Schema derived from [`Recipe`], and must deserialize into it.

use crate::json_schema_for;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// A generated recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    /// Display name of the dish.
    #[schemars(length(min = 1))]
    pub name: String,
    /// 1 (trivial) to 5 (demanding).
    #[schemars(range(min = 1, max = 5))]
    pub difficulty: u8,
    /// Total time from start to plate, in minutes.
    pub total_time_minutes: u32,
    #[schemars(length(min = 1))]
    pub ingredients: Vec<Ingredient>,
    /// Steps in the order they are performed.
    #[schemars(length(min = 1))]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
    /// Estimated cost per serving.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    /// Nutrition per serving.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macros: Option<RecipeMacros>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    #[schemars(length(min = 1))]
    pub name: String,
    /// Amount as written, e.g. "2" or "1/2".
    pub quantity: String,
    /// Unit of `quantity`, e.g. "cup". Omitted for countable items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeMacros {
    pub calories: f64,
    pub protein_grams: f64,
    pub carbs_grams: f64,
    pub fat_grams: f64,
}

impl Recipe {
    /// Decode a stored artifact.
    pub fn from_artifact(artifact: &serde_json::Value) -> Result<Self, ValidationError> {
        serde_json::from_value(artifact.clone()).map_err(ValidationError::Decode)
    }
}

/// JSON Schema every artifact must satisfy.
pub fn recipe_schema() -> serde_json::Value {
    json_schema_for::<Recipe>()
}

/// Why generator output was rejected.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("output is not valid JSON: {0}")]
    NotJson(#[source] serde_json::Error),
    #[error("output is not a JSON object")]
    NotAnObject,
    /// The generator answered with `{"error": ...}` instead of a recipe.
    #[error("generator reported an error: {0}")]
    ErrorFlagged(String),
    #[error("output does not match the recipe schema:\n{}", .0.join("\n"))]
    Schema(Vec<String>),
    #[error("output could not be decoded as a recipe: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Validate raw generator text. Returns the decoded recipe and the JSON
/// artifact to cache.
pub fn validate_artifact(raw: &str) -> Result<(Recipe, serde_json::Value), ValidationError> {
    let body = strip_code_fence(raw);
    let value: serde_json::Value = serde_json::from_str(body).map_err(ValidationError::NotJson)?;
    let Some(obj) = value.as_object() else {
        return Err(ValidationError::NotAnObject);
    };
    if let Some(err) = obj.get("error") {
        let message = err
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(ValidationError::ErrorFlagged(message));
    }

    let schema = recipe_schema();
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| ValidationError::Schema(vec![format!("invalid recipe schema: {e}")]))?;
    let errors: Vec<String> = validator
        .iter_errors(&value)
        .map(|e| format!("  - {}: {e}", e.instance_path()))
        .collect();
    if !errors.is_empty() {
        debug!("Rejected generator output with {} schema errors", errors.len());
        return Err(ValidationError::Schema(errors));
    }

    let recipe = Recipe::from_artifact(&value)?;
    Ok((recipe, value))
}

/// Remove a surrounding Markdown code fence (with or without a language
/// tag), if present.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some((_lang, body)) = after_open.split_once('\n') else {
        return trimmed;
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn omelette() -> serde_json::Value {
        json!({
            "name": "Herb Omelette",
            "difficulty": 2,
            "totalTimeMinutes": 10,
            "ingredients": [
                {"name": "eggs", "quantity": "3"},
                {"name": "chives", "quantity": "1", "unit": "tbsp"}
            ],
            "instructions": ["Whisk the eggs.", "Cook in a hot pan.", "Fold and serve."],
            "tips": ["Keep the heat moderate."]
        })
    }

    #[test]
    fn accepts_valid_recipe() {
        let (recipe, artifact) = validate_artifact(&omelette().to_string()).unwrap();
        assert_eq!(recipe.name, "Herb Omelette");
        assert_eq!(recipe.ingredients[1].unit.as_deref(), Some("tbsp"));
        assert_eq!(artifact, omelette());
    }

    #[test]
    fn accepts_fenced_output() {
        let raw = format!("```json\n{}\n```\n", omelette());
        assert!(validate_artifact(&raw).is_ok());
        let raw = format!("```\n{}\n```", omelette());
        assert!(validate_artifact(&raw).is_ok());
    }

    #[test]
    fn optional_fields_may_be_present() {
        let mut value = omelette();
        value["estimatedCost"] = json!(2.5);
        value["macros"] = json!({
            "calories": 320.0, "proteinGrams": 21.0, "carbsGrams": 2.0, "fatGrams": 24.0
        });
        let (recipe, _) = validate_artifact(&value.to_string()).unwrap();
        assert_eq!(recipe.estimated_cost, Some(2.5));
        assert!(recipe.macros.is_some());
    }

    #[test]
    fn rejects_error_flagged_output() {
        let err = validate_artifact(r#"{"error": "cannot satisfy constraints"}"#).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ErrorFlagged(m) if m == "cannot satisfy constraints"
        ));
    }

    #[test]
    fn rejects_non_json_and_non_objects() {
        assert!(matches!(
            validate_artifact("Here is your recipe!"),
            Err(ValidationError::NotJson(_))
        ));
        assert!(matches!(
            validate_artifact("[1, 2]"),
            Err(ValidationError::NotAnObject)
        ));
    }

    #[test]
    fn rejects_schema_violations() {
        let mut out_of_range = omelette();
        out_of_range["difficulty"] = json!(7);
        let mut no_steps = omelette();
        no_steps["instructions"] = json!([]);
        let mut wrong_type = omelette();
        wrong_type["totalTimeMinutes"] = json!("ten");
        let mut missing = omelette();
        missing.as_object_mut().unwrap().remove("ingredients");

        for bad in [out_of_range, no_steps, wrong_type, missing] {
            let err = validate_artifact(&bad.to_string()).unwrap_err();
            assert!(matches!(err, ValidationError::Schema(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn schema_lists_required_fields() {
        let schema = recipe_schema();
        let required = schema["required"].as_array().unwrap();
        for field in ["name", "difficulty", "totalTimeMinutes", "ingredients", "instructions"] {
            assert!(required.contains(&json!(field)), "{field} not required");
        }
        assert!(!required.contains(&json!("tips")));
    }

    #[test]
    fn strip_fence_leaves_plain_text() {
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
    }
}
