//! Terminal rendering of progress and results.
//!
//! Progress and summaries go to stderr so stdout carries only the answer
//! (or the JSON document).

use colored::{ColoredString, Colorize};
use cogito_orchestrator::{ProgressUpdate, RunResult, TurnPhase};

fn phase_label(phase: TurnPhase) -> ColoredString {
    let label = format!("{:<5}", phase.to_string());
    match phase {
        TurnPhase::Ack => label.cyan(),
        TurnPhase::Work => label.yellow(),
        TurnPhase::Think => label.purple(),
        TurnPhase::Final => label.green(),
    }
}

/// One progress line, plus the intermediate text when present
pub fn render_progress(update: &ProgressUpdate) -> String {
    let mut line = format!(
        "{} {} {}",
        format!("[{}/{}]", update.current_turn, update.max_turns).dimmed(),
        phase_label(update.phase),
        update.status
    );
    if let Some(text) = update.intermediate.as_deref().filter(|t| !t.trim().is_empty()) {
        line.push('\n');
        line.push_str(&format!("      {}", text.trim().italic()));
    }
    line
}

/// Print a progress update to stderr
pub fn print_progress(update: &ProgressUpdate) {
    eprintln!("{}", render_progress(update));
}

/// Run statistics shown after the answer
pub fn render_summary(result: &RunResult) -> String {
    let failed = result.failed_tool_calls();
    let tools = if failed == 0 {
        format!("{} tool call(s)", result.tool_results.len())
    } else {
        format!("{} tool call(s), {} failed", result.tool_results.len(), failed)
    };
    format!(
        "{} turn(s), {}, {} token(s), ended by {}",
        result.turns_used, tools, result.usage.total_tokens, result.finish_reason
    )
}

/// Print the run outcome
pub fn print_result(result: &RunResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if result.success {
        println!("{}", result.final_response);
        if !result.thinking_process.is_empty() {
            eprintln!();
            eprintln!("{}", "Notes".bold());
            for note in result.thinking_process.lines() {
                eprintln!("  {} {}", "-".dimmed(), note);
            }
        }
    }
    eprintln!();
    eprintln!("{}", render_summary(result).dimmed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogito_abstraction::ModelUsage;
    use cogito_orchestrator::FinishReason;

    fn result(tool_results: usize) -> RunResult {
        RunResult {
            final_response: "42".to_string(),
            thinking_process: String::new(),
            tool_results: Vec::with_capacity(tool_results),
            turns_used: 3,
            success: true,
            error: None,
            finish_reason: FinishReason::FinishTool,
            transcript: Vec::new(),
            usage: ModelUsage { prompt_tokens: 100, completion_tokens: 20, total_tokens: 120 },
        }
    }

    #[test]
    fn test_render_progress_with_intermediate() {
        colored::control::set_override(false);
        let update = ProgressUpdate {
            current_turn: 1,
            max_turns: 5,
            phase: TurnPhase::Ack,
            status: "Acknowledged".to_string(),
            intermediate: Some("On it.".to_string()),
        };
        let line = render_progress(&update);
        assert!(line.starts_with("[1/5] ACK   Acknowledged"));
        assert!(line.ends_with("On it."));
    }

    #[test]
    fn test_render_summary() {
        colored::control::set_override(false);
        let summary = render_summary(&result(0));
        assert_eq!(summary, "3 turn(s), 0 tool call(s), 120 token(s), ended by finish_tool");
    }
}
