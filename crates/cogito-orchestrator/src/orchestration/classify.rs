// Reply classification
//
// Maps one model reply onto the phase that decides what the engine does next.

use serde::{Deserialize, Serialize};

use super::config::TurnHeuristics;

/// What a model reply means for the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Short opening acknowledgement on turn 1
    Ack,
    /// Reply requested tool calls
    Work,
    /// Intermediate reasoning without tool calls
    Think,
    /// The answer
    Final,
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ack => write!(f, "ACK"),
            Self::Work => write!(f, "WORK"),
            Self::Think => write!(f, "THINK"),
            Self::Final => write!(f, "FINAL"),
        }
    }
}

/// Classify a non-empty reply
///
/// Precedence: tool calls, then the last turn, then a short turn-1
/// acknowledgement, then length or a closing phrase. Lengths count characters
/// of the trimmed content.
pub fn classify(
    content: &str,
    has_tool_calls: bool,
    turn: u32,
    max_turns: u32,
    heuristics: &TurnHeuristics,
) -> TurnPhase {
    if has_tool_calls {
        return TurnPhase::Work;
    }
    if turn >= max_turns {
        return TurnPhase::Final;
    }

    let content = content.trim();
    let length = content.chars().count();
    if turn == 1 && length < heuristics.ack_max_chars {
        return TurnPhase::Ack;
    }
    if length > heuristics.final_min_chars || has_closing_phrase(content, &heuristics.closing_phrases) {
        return TurnPhase::Final;
    }
    TurnPhase::Think
}

fn has_closing_phrase(content: &str, phrases: &[String]) -> bool {
    let lowered = content.to_lowercase();
    phrases
        .iter()
        .filter(|p| !p.trim().is_empty())
        .any(|p| lowered.contains(&p.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heuristics() -> TurnHeuristics {
        TurnHeuristics::default()
    }

    #[test]
    fn test_tool_calls_always_work() {
        let h = heuristics();
        assert_eq!(classify("", true, 1, 3, &h), TurnPhase::Work);
        assert_eq!(classify(&"x".repeat(500), true, 3, 3, &h), TurnPhase::Work);
    }

    #[test]
    fn test_short_first_reply_is_ack() {
        assert_eq!(classify("On it, checking now.", false, 1, 3, &heuristics()), TurnPhase::Ack);
    }

    #[test]
    fn test_last_turn_is_final() {
        let h = heuristics();
        assert_eq!(classify("Still thinking.", false, 3, 3, &h), TurnPhase::Final);
        assert_eq!(classify("Ok.", false, 1, 1, &h), TurnPhase::Final);
    }

    #[test]
    fn test_long_reply_is_final() {
        assert_eq!(classify(&"a".repeat(301), false, 2, 5, &heuristics()), TurnPhase::Final);
        assert_eq!(classify(&"a".repeat(300), false, 2, 5, &heuristics()), TurnPhase::Think);
    }

    #[test]
    fn test_closing_phrase_is_final() {
        let reply = "Based on my research, it is 18C and sunny.";
        assert_eq!(classify(reply, false, 2, 5, &heuristics()), TurnPhase::Final);
        assert_eq!(classify("IN CONCLUSION: yes.", false, 2, 5, &heuristics()), TurnPhase::Final);
    }

    #[test]
    fn test_middle_reply_is_think() {
        let reply = "I should compare two sources before answering.";
        assert_eq!(classify(reply, false, 2, 5, &heuristics()), TurnPhase::Think);
    }

    #[test]
    fn test_first_turn_boundary_uses_characters() {
        let h = TurnHeuristics { ack_max_chars: 5, ..heuristics() };
        assert_eq!(classify("éééé", false, 1, 3, &h), TurnPhase::Ack);
        assert_eq!(classify("ééééé", false, 1, 3, &h), TurnPhase::Think);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(TurnPhase::Ack.to_string(), "ACK");
        assert_eq!(TurnPhase::Final.to_string(), "FINAL");
    }
}
