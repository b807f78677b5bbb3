//! Prompt assembly for cache misses.
//!
//! 1. **[`sections`]**: one pure builder per concern (safety constraints,
//!    kitchen constraints, dietary preferences, cooking context, kitchen
//!    capabilities, cooking style, remaining macros).
//!
//! 2. **[`template`]**: strict `{{name}}` population.
//!
//! 3. **[`builder`]**: `## Section` layout for the system prompt.
//!
//! 4. **[`assembler`]**: [`PromptAssembler`] wires the three together and
//!    embeds the recipe JSON Schema.

pub mod assembler;
pub mod builder;
pub mod sections;
pub mod template;

pub use assembler::{AssembledPrompt, PromptAssembler, RECIPE_REQUEST_TEMPLATE};
pub use builder::PromptBuilder;
pub use sections::NOT_SPECIFIED;
pub use template::{PromptTemplate, TemplateError};
