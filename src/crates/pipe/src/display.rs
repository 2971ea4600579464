//! Text fragments shown to the user around the model's answer.

use crate::conversation::ConversationAccount;
use crate::response::Usage;

/// Shown when no extraction method produced text.
pub const NO_RESPONSE_TEXT: &str = "No response text found in the API response.";

/// Shown when stats are enabled but the response carried no usage block.
pub const USAGE_UNAVAILABLE: &str = "\n\n---\n📊 **Token Usage**: Not available in response\n---";

/// Notice emitted before the remote call.
pub fn progress_notice(model_id: &str, message_number: u64) -> String {
    format!(
        "🔄 Processing with {} (Message #{} in conversation)...\n\n",
        model_id, message_number
    )
}

/// Note emitted when the API truncated the response.
pub fn truncation_note(reason: &str) -> String {
    format!("\n\n⚠️ **Note**: Response was truncated due to: {}", reason)
}

/// Hint emitted when the truncation came from the output token limit.
pub fn max_tokens_hint(max_output_tokens: i64) -> String {
    format!(
        "\nConsider increasing MAX_OUTPUT_TOKENS (currently set to {})",
        max_output_tokens
    )
}

/// Annotation listing the tools the model used.
pub fn tools_used_note(tools: &[String]) -> String {
    format!("\n\n🔧 **Tools used**: {}", tools.join(", "))
}

/// Inputs for the usage statistics block.
#[derive(Debug, Clone, Copy)]
pub struct TokenStats<'a> {
    pub usage: &'a Usage,
    pub current_cost: f64,
    /// Conversation totals, already including this message. `None` hides them.
    pub totals: Option<&'a ConversationAccount>,
    /// Set only for incomplete responses.
    pub incomplete_reason: Option<&'a str>,
}

/// Format token usage and cost for display.
pub fn format_token_stats(stats: &TokenStats<'_>) -> String {
    let usage = stats.usage;
    let reasoning_tokens = usage.reasoning_tokens();

    let mut out = String::from("\n\n---\n📊 **Token Usage (This Message)**:\n");
    out.push_str(&format!("- Input: {} tokens\n", group_thousands(usage.input_tokens)));
    if reasoning_tokens > 0 {
        out.push_str(&format!("- Reasoning: {} tokens\n", group_thousands(reasoning_tokens)));
    }
    out.push_str(&format!("- Output: {} tokens\n", group_thousands(usage.output_tokens)));
    out.push_str(&format!("- Total: {} tokens\n", group_thousands(usage.total_tokens)));
    out.push_str(&format!("- **Cost for this message**: ${:.4}\n", stats.current_cost));

    if let Some(totals) = stats.totals {
        out.push_str("\n💰 **Conversation Totals**:\n");
        out.push_str(&format!("- Messages: {}\n", totals.message_count));
        out.push_str(&format!(
            "- Total Input: {} tokens\n",
            group_thousands(totals.total_input_tokens)
        ));
        if totals.total_reasoning_tokens > 0 {
            out.push_str(&format!(
                "- Total Reasoning: {} tokens\n",
                group_thousands(totals.total_reasoning_tokens)
            ));
        }
        out.push_str(&format!(
            "- Total Output: {} tokens\n",
            group_thousands(totals.total_output_tokens)
        ));
        out.push_str(&format!("- **Total Cost**: ${:.4}\n", totals.total_cost));
    }

    if let Some(reason) = stats.incomplete_reason {
        out.push_str(&format!(
            "\n⚠️ **Response Status**: Incomplete (Reason: {})\n",
            reason
        ));
    }

    out.push_str("---");
    out
}

/// Render an integer with `,` thousands separators.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::OutputTokensDetails;

    fn usage(input: u64, output: u64, reasoning: Option<u64>) -> Usage {
        Usage {
            input_tokens: input,
            output_tokens: output,
            total_tokens: input + output,
            output_tokens_details: reasoning.map(|r| OutputTokensDetails {
                reasoning_tokens: Some(r),
            }),
        }
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
        assert_eq!(group_thousands(100000), "100,000");
    }

    #[test]
    fn test_stats_without_totals() {
        let usage = usage(1200, 3400, None);
        let text = format_token_stats(&TokenStats {
            usage: &usage,
            current_cost: 0.296,
            totals: None,
            incomplete_reason: None,
        });

        assert_eq!(
            text,
            "\n\n---\n📊 **Token Usage (This Message)**:\n\
             - Input: 1,200 tokens\n\
             - Output: 3,400 tokens\n\
             - Total: 4,600 tokens\n\
             - **Cost for this message**: $0.2960\n\
             ---"
        );
    }

    #[test]
    fn test_stats_with_reasoning_and_totals() {
        let usage = usage(10, 500, Some(450));
        let totals = ConversationAccount {
            total_cost: 1.5,
            total_input_tokens: 2_010,
            total_output_tokens: 9_500,
            total_reasoning_tokens: 8_450,
            message_count: 3,
        };
        let text = format_token_stats(&TokenStats {
            usage: &usage,
            current_cost: 0.0762,
            totals: Some(&totals),
            incomplete_reason: None,
        });

        assert!(text.contains("- Reasoning: 450 tokens\n"));
        assert!(text.contains("💰 **Conversation Totals**:\n- Messages: 3\n"));
        assert!(text.contains("- Total Input: 2,010 tokens\n"));
        assert!(text.contains("- Total Reasoning: 8,450 tokens\n"));
        assert!(text.contains("- Total Output: 9,500 tokens\n"));
        assert!(text.contains("- **Total Cost**: $1.5000\n"));
        assert!(text.ends_with("---"));
    }

    #[test]
    fn test_stats_incomplete_status() {
        let usage = usage(1, 2, None);
        let text = format_token_stats(&TokenStats {
            usage: &usage,
            current_cost: 0.0,
            totals: None,
            incomplete_reason: Some("max_output_tokens"),
        });
        assert!(text.ends_with(
            "\n⚠️ **Response Status**: Incomplete (Reason: max_output_tokens)\n---"
        ));
    }

    #[test]
    fn test_notices() {
        assert_eq!(
            progress_notice("o3-pro", 2),
            "🔄 Processing with o3-pro (Message #2 in conversation)...\n\n"
        );
        assert_eq!(
            truncation_note("max_output_tokens"),
            "\n\n⚠️ **Note**: Response was truncated due to: max_output_tokens"
        );
        assert_eq!(
            max_tokens_hint(3200),
            "\nConsider increasing MAX_OUTPUT_TOKENS (currently set to 3200)"
        );
        assert_eq!(
            tools_used_note(&["file_search".to_string(), "function".to_string()]),
            "\n\n🔧 **Tools used**: file_search, function"
        );
    }
}
