//! Multi-section prompt builder.

/// Builder for prompts made of a preamble and `## Heading` sections.
///
/// Sections are joined with double newlines. A section whose content is
/// empty is skipped.
///
/// # Example
///
/// ```
/// use larder::prompt::PromptBuilder;
///
/// let prompt = PromptBuilder::new("You are a recipe writer.")
///     .section("Output Format", "Reply with JSON.")
///     .section("Empty", "")
///     .build();
///
/// assert_eq!(prompt, "You are a recipe writer.\n\n## Output Format\n\nReply with JSON.");
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    blocks: Vec<String>,
}

impl PromptBuilder {
    /// Start with a preamble, included without a heading.
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            blocks: vec![preamble.into()],
        }
    }

    /// Append a headed section. Skipped if `content` is empty.
    pub fn section(mut self, heading: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.blocks.push(format!("## {heading}\n\n{content}"));
        }
        self
    }

    pub fn build(self) -> String {
        self.blocks.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preamble_only() {
        assert_eq!(PromptBuilder::new("Hello.").build(), "Hello.");
    }

    #[test]
    fn sections_in_order_and_empty_skipped() {
        let prompt = PromptBuilder::new("Preamble")
            .section("First", "one")
            .section("Skipped", "")
            .section("Second", "two")
            .build();
        assert_eq!(prompt, "Preamble\n\n## First\n\none\n\n## Second\n\ntwo");
    }
}
