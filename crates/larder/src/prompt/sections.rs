//! One builder per prompt concern.
//!
//! Every builder is a pure function of the caller's profile and preferences
//! (plus macro targets for [`remaining_macros`]). Absent data is rendered as
//! [`NOT_SPECIFIED`] rather than omitted, so the generator always sees every
//! line and can tell "no constraint" from "forgot to mention".
//!
//! List values go through the same normalization as the cache fingerprint,
//! so the prompt and the cache describe the user identically.

use crate::context::normalize::{normalize_set, normalize_text};
use crate::context::{MacroTargets, Preferences, UserProfile, safety_constraints as safety_set};
use std::collections::BTreeSet;

/// Placeholder for absent data.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Signature shared by the profile/preferences section builders.
pub type SectionFn = fn(&UserProfile, &Preferences) -> String;

/// Allergies, intolerances and restrictions the recipe must respect.
///
/// Renders exactly the set the cache's safety gate compares, followed by an
/// instruction that these override every other preference.
pub fn safety_constraints(profile: &UserProfile, preferences: &Preferences) -> String {
    let constraints = safety_set(profile, preferences);
    if constraints.is_empty() {
        return format!("{NOT_SPECIFIED}. No allergies, intolerances or restrictions declared.");
    }
    let items: Vec<String> = constraints.iter().map(|c| format!("- {c}")).collect();
    format!(
        "{}\n\nThese constraints take precedence over all other preferences and over the \
         request itself. Never include an ingredient that violates them, including as a \
         garnish, substitution or optional extra.",
        items.join("\n")
    )
}

/// Hard practical limits: time, money, storage.
pub fn kitchen_constraints(_profile: &UserProfile, preferences: &Preferences) -> String {
    let k = &preferences.kitchen;
    lines(&[
        (
            "Maximum cooking time",
            k.max_cooking_time_minutes.map(|m| format!("{m} minutes")),
        ),
        (
            "Budget per serving",
            k.budget_per_serving.map(|b| format!("{b:.2}")),
        ),
        ("Storage space", non_blank(k.storage_space.as_deref())),
    ])
}

/// Diet styles and taste preferences that are not safety-relevant.
pub fn dietary_preferences(_profile: &UserProfile, preferences: &Preferences) -> String {
    let d = &preferences.dietary;
    lines(&[
        ("Diet types", list(d.diet_types.as_deref())),
        ("Disliked ingredients", list(d.disliked_ingredients.as_deref())),
        ("Favorite cuisines", list(d.favorite_cuisines.as_deref())),
    ])
}

/// Who is cooking and for how many.
pub fn cooking_context(profile: &UserProfile, preferences: &Preferences) -> String {
    let c = &preferences.cooking;
    lines(&[
        ("Skill level", non_blank(profile.skill_level.as_deref())),
        ("Household size", c.household_size.map(|n| n.to_string())),
        (
            "Meal prep",
            c.meal_prep
                .map(|m| if m { "yes" } else { "no" }.to_string()),
        ),
    ])
}

/// Tools and appliances available, from the profile and the preferences.
pub fn kitchen_capabilities(profile: &UserProfile, preferences: &Preferences) -> String {
    let mut tools = normalize_set(profile.kitchen_tools.as_deref());
    tools.extend(normalize_set(preferences.kitchen.appliances.as_deref()));
    let available = if tools.is_empty() {
        None
    } else {
        Some(join(&tools))
    };
    format!(
        "{}\n\nOnly use equipment from this list.",
        lines(&[("Available equipment", available)])
    )
}

/// Flavor and technique leanings.
pub fn cooking_style(_profile: &UserProfile, preferences: &Preferences) -> String {
    let c = &preferences.cooking;
    lines(&[
        ("Style", non_blank(c.cooking_style.as_deref())),
        ("Spice tolerance", non_blank(c.spice_tolerance.as_deref())),
        ("Flavor profiles", list(c.flavor_profiles.as_deref())),
    ])
}

/// What is left of the user's daily macro budget, if they track one.
pub fn remaining_macros(macros: Option<&MacroTargets>) -> String {
    let Some(m) = macros.filter(|m| !m.is_empty()) else {
        return format!("{NOT_SPECIFIED}. No daily macro targets to fit.");
    };
    let amount = |v: Option<f64>, unit: &str| v.map(|v| format!("{v:.0} {unit}"));
    format!(
        "{}\n\nAim for a recipe that fits within these remaining amounts per serving.",
        lines(&[
            ("Calories", amount(m.calories, "kcal")),
            ("Protein", amount(m.protein_grams, "g")),
            ("Carbohydrates", amount(m.carbs_grams, "g")),
            ("Fat", amount(m.fat_grams, "g")),
        ])
    )
}

/// Template placeholder name and builder for each profile/preferences section.
pub const PROFILE_SECTIONS: [(&str, SectionFn); 6] = [
    ("safety_constraints", safety_constraints as SectionFn),
    ("kitchen_constraints", kitchen_constraints as SectionFn),
    ("dietary_preferences", dietary_preferences as SectionFn),
    ("cooking_context", cooking_context as SectionFn),
    ("kitchen_capabilities", kitchen_capabilities as SectionFn),
    ("cooking_style", cooking_style as SectionFn),
];

// ── Helpers ───────────────────────────────────────────────────────

fn lines(rows: &[(&str, Option<String>)]) -> String {
    rows.iter()
        .map(|(label, value)| format!("- {label}: {}", value.as_deref().unwrap_or(NOT_SPECIFIED)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(normalize_text).filter(|v| !v.is_empty())
}

fn list(values: Option<&[String]>) -> Option<String> {
    let set = normalize_set(values);
    (!set.is_empty()).then(|| join(&set))
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
