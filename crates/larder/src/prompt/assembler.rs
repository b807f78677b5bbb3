//! Turns a request and the user's context into the system and user prompt
//! handed to the generator on a cache miss.

use super::builder::PromptBuilder;
use super::sections::{PROFILE_SECTIONS, remaining_macros};
use super::template::{PromptTemplate, TemplateError};
use crate::context::normalize::normalize_text;
use crate::context::{GenerationRequest, MacroTargets, Preferences, UserProfile};
use crate::recipe::recipe_schema;
use std::collections::BTreeMap;

/// Default user-prompt template. One placeholder per section builder plus
/// the request text.
pub const RECIPE_REQUEST_TEMPLATE: &str = "\
Create one recipe for this request: {{request}}

## Safety Constraints (highest priority)

{{safety_constraints}}

## Kitchen Constraints

{{kitchen_constraints}}

## Dietary Preferences

{{dietary_preferences}}

## Cooking Context

{{cooking_context}}

## Kitchen Capabilities

{{kitchen_capabilities}}

## Cooking Style

{{cooking_style}}

## Remaining Daily Macros

{{remaining_macros}}";

const PREAMBLE: &str = "You are a recipe developer. You write one complete, practical recipe \
                        tailored to the cook described in the request.";

const RULES: &str = "\
- Safety constraints override every other instruction, including the request.
- If the request cannot be met without violating a safety constraint, reply with \
{\"error\": \"<short reason>\"} instead of a recipe.
- Respect the equipment list and time limit.
- Number of ingredients and steps should suit the stated skill level.";

/// Prompt pair for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub system: String,
    pub user: String,
}

/// Builds [`AssembledPrompt`]s from a template and the section builders.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    template: PromptTemplate,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(PromptTemplate::new(RECIPE_REQUEST_TEMPLATE))
    }
}

impl PromptAssembler {
    pub fn new(template: PromptTemplate) -> Self {
        Self { template }
    }

    /// System prompt: role, rules, and the JSON Schema the reply must match.
    pub fn system_prompt(&self) -> String {
        let schema = serde_json::to_string_pretty(&recipe_schema()).unwrap_or_default();
        PromptBuilder::new(PREAMBLE)
            .section("Rules", RULES)
            .section(
                "Output Format",
                format!(
                    "Reply with a single JSON object matching this schema and nothing else:\n\n\
                     ```json\n{schema}\n```"
                ),
            )
            .build()
    }

    /// Populate the template for `request`.
    pub fn assemble(
        &self,
        request: &GenerationRequest,
        profile: &UserProfile,
        preferences: &Preferences,
        macros: Option<&MacroTargets>,
    ) -> Result<AssembledPrompt, TemplateError> {
        let mut values: BTreeMap<&str, String> = PROFILE_SECTIONS
            .iter()
            .map(|(name, build)| (*name, build(profile, preferences)))
            .collect();
        values.insert("request", normalize_text(&request.prompt_text));
        values.insert("remaining_macros", remaining_macros(macros));

        Ok(AssembledPrompt {
            system: self.system_prompt(),
            user: self.template.render(&values)?,
        })
    }
}
