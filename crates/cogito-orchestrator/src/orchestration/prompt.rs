// System prompt construction
//
// The prompt has two parts: a base describing the assistant's working style,
// which callers may replace, and an appendix listing tools, date and budget,
// which is always present.

use chrono::NaiveDate;

use super::catalog::ToolDescriptor;

const BASE_PROMPT: &str = "You are Deep Thought, a careful research assistant. Work through the \
user's request step by step across several turns. Search for current facts instead of guessing, \
read pages when a search answer is not specific enough, and record intermediate findings with \
save_thought so they are not lost. When you have enough information, write a complete, \
well-structured final answer.";

/// Inputs for the per-run system prompt
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    /// Tools offered this run
    pub tools: &'a [ToolDescriptor],
    /// Turn budget after clamping
    pub max_turns: u32,
    /// Whether the `finish` function is offered
    pub finish_tool: bool,
    /// Date the run starts
    pub today: NaiveDate,
}

/// Build the system prompt, replacing the base text when `override_base` is set
pub fn build_system_prompt(ctx: &PromptContext<'_>, override_base: Option<&str>) -> String {
    let base = override_base.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(BASE_PROMPT);
    format!("{}\n\n{}", base, appendix(ctx))
}

fn appendix(ctx: &PromptContext<'_>) -> String {
    let mut lines = vec![format!("Today's date is {}.", ctx.today.format("%A, %B %-d, %Y"))];

    lines.push(format!(
        "You have at most {} turns. Each reply you send uses one turn.",
        ctx.max_turns
    ));

    if ctx.tools.is_empty() {
        lines.push("No tools are available in this session.".to_string());
    } else {
        lines.push("Available tools:".to_string());
        lines.extend(ctx.tools.iter().map(|t| format!("- {}: {}", t.name, t.description)));
    }

    if ctx.finish_tool {
        lines.push(
            "When your answer is ready, call the finish function with the complete answer. \
             Replying with plain text that starts with a summary also ends the session."
                .to_string(),
        );
    } else {
        lines.push(
            "When your answer is ready, reply with the complete answer as plain text.".to_string(),
        );
    }
    lines.join("\n")
}
