//! Response parsing for the executive-summary shape (§4.4).

/// Extract the formatted response from the model's final text.
///
/// The prompt asks for a literal `EXECUTIVE SUMMARY:` tag; if the model
/// complies, everything after the tag (trimmed) is the formatted
/// response. If it doesn't — a model that answers in plain prose
/// despite the instruction — the whole response is used as-is rather
/// than discarded, since unlike the generate/execute steps a format
/// failure has no safe terminal-error fallback: the saga has already
/// produced real results, and refusing to hand them back would waste
/// all of the work already done upstream.
pub fn extract_formatted_response(text: &str) -> String {
    match text.find("EXECUTIVE SUMMARY:") {
        Some(idx) => text[idx + "EXECUTIVE SUMMARY:".len()..].trim().to_string(),
        None => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_after_the_tag() {
        let text = "Let me think.\n\nEXECUTIVE SUMMARY: Revenue grew 12% quarter over quarter.";
        assert_eq!(
            extract_formatted_response(text),
            "Revenue grew 12% quarter over quarter."
        );
    }

    #[test]
    fn falls_back_to_the_whole_response_when_untagged() {
        let text = "Revenue grew 12% quarter over quarter.";
        assert_eq!(extract_formatted_response(text), text);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let text = "EXECUTIVE SUMMARY:   \n  Orders are up.  \n";
        assert_eq!(extract_formatted_response(text), "Orders are up.");
    }
}
