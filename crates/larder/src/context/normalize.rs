//! Context normalization: raw request + profile + preferences into a
//! canonical [`FingerprintInput`].
//!
//! Normalization is pure and infallible. Missing context widens cache reuse
//! rather than blocking it, so absent lists become empty sets and absent
//! scalars become empty strings.
//!
//! [`safety_constraints`] is the single definition of the safety set. Both
//! the fingerprint's `allergies` field (which drives the similarity safety
//! gate) and the prompt's safety section call it, so the constraints the
//! generator is told about and the constraints the cache compares can never
//! drift apart.

use super::fingerprint::FingerprintInput;
use super::profile::{GenerationRequest, Preferences, UserProfile};
use std::collections::BTreeSet;

/// Builds [`FingerprintInput`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextNormalizer;

impl ContextNormalizer {
    pub fn normalize(
        request: &GenerationRequest,
        profile: &UserProfile,
        preferences: &Preferences,
    ) -> FingerprintInput {
        let mut dietary = normalize_set(profile.dietary_restrictions.as_deref());
        dietary.extend(normalize_set(preferences.dietary.diet_types.as_deref()));

        let mut tools = normalize_set(profile.kitchen_tools.as_deref());
        tools.extend(normalize_set(preferences.kitchen.appliances.as_deref()));

        FingerprintInput {
            prompt_text: normalize_text(&request.prompt_text),
            skill_level: profile
                .skill_level
                .as_deref()
                .map(normalize_text)
                .unwrap_or_default(),
            dietary_restrictions: dietary,
            allergies: safety_constraints(profile, preferences),
            kitchen_tools: tools,
            preferences_blob: preferences_blob(preferences),
        }
    }
}

/// The deduplicated union of every safety-relevant source: profile allergies,
/// profile dietary restrictions, and preference-level allergies, intolerances
/// and custom restrictions.
pub fn safety_constraints(profile: &UserProfile, preferences: &Preferences) -> BTreeSet<String> {
    let dietary = &preferences.dietary;
    [
        profile.allergies.as_deref(),
        profile.dietary_restrictions.as_deref(),
        dietary.allergies.as_deref(),
        dietary.intolerances.as_deref(),
        dietary.custom_restrictions.as_deref(),
    ]
    .into_iter()
    .flat_map(normalize_set)
    .collect()
}

/// Trim, lower-case, and collapse internal whitespace.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize each member, dropping blanks. `None` becomes the empty set.
pub fn normalize_set(items: Option<&[String]>) -> BTreeSet<String> {
    items
        .unwrap_or_default()
        .iter()
        .map(|s| normalize_text(s))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Segment separator inside the preferences blob.
pub const BLOB_SEPARATOR: char = ';';

/// Render secondary preferences as `field=value` segments in a fixed field
/// order, joined by [`BLOB_SEPARATOR`]. Absent fields are omitted. Values
/// have the framing characters `;`, `,` and `=` replaced by spaces so a
/// segment can always be recovered by splitting.
pub fn preferences_blob(preferences: &Preferences) -> String {
    let d = &preferences.dietary;
    let k = &preferences.kitchen;
    let c = &preferences.cooking;

    let mut segments: Vec<String> = Vec::new();
    push_list(&mut segments, "disliked", d.disliked_ingredients.as_deref());
    push_list(&mut segments, "cuisines", d.favorite_cuisines.as_deref());
    push_scalar(
        &mut segments,
        "max_minutes",
        k.max_cooking_time_minutes.map(|m| m.to_string()),
    );
    push_scalar(
        &mut segments,
        "budget",
        k.budget_per_serving.map(|b| format!("{b:.2}")),
    );
    push_scalar(&mut segments, "storage", k.storage_space.clone());
    push_scalar(&mut segments, "style", c.cooking_style.clone());
    push_scalar(&mut segments, "spice", c.spice_tolerance.clone());
    push_list(&mut segments, "flavors", c.flavor_profiles.as_deref());
    push_scalar(
        &mut segments,
        "household",
        c.household_size.map(|n| n.to_string()),
    );
    push_scalar(&mut segments, "meal_prep", c.meal_prep.map(|b| b.to_string()));

    segments.join(&BLOB_SEPARATOR.to_string())
}

fn clean_value(raw: &str) -> String {
    normalize_text(&raw.replace([';', ',', '='], " "))
}

fn push_scalar(segments: &mut Vec<String>, field: &str, value: Option<String>) {
    if let Some(v) = value.map(|v| clean_value(&v)).filter(|v| !v.is_empty()) {
        segments.push(format!("{field}={v}"));
    }
}

fn push_list(segments: &mut Vec<String>, field: &str, values: Option<&[String]>) {
    let cleaned: BTreeSet<String> = values
        .unwrap_or_default()
        .iter()
        .map(|v| clean_value(v))
        .filter(|v| !v.is_empty())
        .collect();
    if !cleaned.is_empty() {
        let joined: Vec<&str> = cleaned.iter().map(String::as_str).collect();
        segments.push(format!("{field}={}", joined.join(",")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fingerprint::FingerprintHasher;
    use crate::context::profile::{CookingPreferences, DietaryPreferences};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn prompt_is_trimmed_and_lowercased() {
        let fp = ContextNormalizer::normalize(
            &GenerationRequest::new("  Quick   Breakfast with EGGS \n"),
            &UserProfile::default(),
            &Preferences::default(),
        );
        assert_eq!(fp.prompt_text, "quick breakfast with eggs");
    }

    #[test]
    fn missing_context_degrades_to_empty() {
        let fp = ContextNormalizer::normalize(
            &GenerationRequest::new("soup"),
            &UserProfile::default(),
            &Preferences::default(),
        );
        assert_eq!(fp.skill_level, "");
        assert!(fp.allergies.is_empty());
        assert!(fp.dietary_restrictions.is_empty());
        assert!(fp.kitchen_tools.is_empty());
        assert_eq!(fp.preferences_blob, "");
    }

    #[test]
    fn set_order_does_not_affect_key() {
        let request = GenerationRequest::new("pasta");
        let a = UserProfile::default()
            .with_allergies(["Peanuts", "shellfish"])
            .with_kitchen_tools(["stove", "Oven", "pan"]);
        let b = UserProfile::default()
            .with_allergies(["shellfish", " peanuts "])
            .with_kitchen_tools(["pan", "oven", "stove", "stove"]);
        let prefs = Preferences::default();
        let fa = ContextNormalizer::normalize(&request, &a, &prefs);
        let fb = ContextNormalizer::normalize(&request, &b, &prefs);
        assert_eq!(fa, fb);
        assert_eq!(FingerprintHasher::key(&fa), FingerprintHasher::key(&fb));
    }

    #[test]
    fn safety_set_is_union_of_all_sources() {
        let profile = UserProfile::default()
            .with_allergies(["peanuts"])
            .with_dietary_restrictions(["vegetarian"]);
        let prefs = Preferences {
            dietary: DietaryPreferences {
                allergies: Some(strings(&["Peanuts", "sesame"])),
                intolerances: Some(strings(&["lactose"])),
                custom_restrictions: Some(strings(&["no pork", ""])),
                ..Default::default()
            },
            ..Default::default()
        };
        let set = safety_constraints(&profile, &prefs);
        let expected: BTreeSet<String> = ["lactose", "no pork", "peanuts", "sesame", "vegetarian"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(set, expected);

        let fp = ContextNormalizer::normalize(&GenerationRequest::new("x"), &profile, &prefs);
        assert_eq!(fp.allergies, expected);
    }

    #[test]
    fn diet_types_and_appliances_join_their_sets() {
        let profile = UserProfile::default()
            .with_dietary_restrictions(["vegetarian"])
            .with_kitchen_tools(["stove"]);
        let mut prefs = Preferences::default();
        prefs.dietary.diet_types = Some(strings(&["Mediterranean"]));
        prefs.kitchen.appliances = Some(strings(&["Air Fryer"]));
        let fp = ContextNormalizer::normalize(&GenerationRequest::new("x"), &profile, &prefs);
        assert!(fp.dietary_restrictions.contains("mediterranean"));
        assert!(fp.dietary_restrictions.contains("vegetarian"));
        assert!(fp.kitchen_tools.contains("air fryer"));
    }

    #[test]
    fn blob_is_field_ordered_and_sanitized() {
        let prefs = Preferences {
            cooking: CookingPreferences {
                cooking_style: Some("One-Pot; quick".into()),
                household_size: Some(2),
                ..Default::default()
            },
            dietary: DietaryPreferences {
                favorite_cuisines: Some(strings(&["thai", "Italian"])),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            preferences_blob(&prefs),
            "cuisines=italian,thai;style=one-pot quick;household=2"
        );
    }
}
