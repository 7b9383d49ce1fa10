use quotecraft_core::{QuoteData, QuoteEntry};
use serde::Deserialize;

use crate::llm::LlmError;

pub const SYSTEM_INSTRUCTION: &str = "You write short, original, quotable sentences. \
Respond with JSON only, no commentary and no Markdown.";

/// Builds the user prompt for `quote_count` quotes inspired by `keywords`.
pub fn build_prompt(keywords: &str, quote_count: u32) -> String {
    let keywords = keywords.trim();
    format!(
        "Generate {quote_count} inspiring, original quotes about the following keywords: \
\"{keywords}\".\n\
Each quote should be concise and memorable. Attribute each one to a fitting, \
plausible author, or leave the author empty.\n\
Return a JSON object with a \"quotes\" array, where every element has the form \
{{\"text\": \"...\", \"author\": \"...\"}}."
    )
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuotePayload {
    List(Vec<RawQuote>),
    Wrapped { quotes: Vec<RawQuote> },
}

#[derive(Deserialize)]
struct RawQuote {
    #[serde(alias = "quote")]
    text: String,
    #[serde(default)]
    author: Option<String>,
}

/// Parses a model reply into quotes.
///
/// Accepts a bare JSON array or an object with a `quotes` array, optionally
/// wrapped in a Markdown code fence. Entries with blank text are dropped; a
/// reply that yields no quotes at all is malformed.
pub fn parse_quotes(raw: &str) -> Result<QuoteData, LlmError> {
    let payload = strip_code_fence(raw);
    if payload.is_empty() {
        return Err(LlmError::MalformedResponse("model returned an empty response".to_string()));
    }

    let parsed: QuotePayload = serde_json::from_str(payload).map_err(|err| {
        LlmError::MalformedResponse(format!("model response was not a quote list: {err}"))
    })?;
    let raw_quotes = match parsed {
        QuotePayload::List(quotes) | QuotePayload::Wrapped { quotes } => quotes,
    };

    let quotes: QuoteData = raw_quotes
        .into_iter()
        .filter_map(|quote| {
            let text = quote.text.trim();
            if text.is_empty() {
                return None;
            }
            let entry = QuoteEntry::new(text);
            Some(match quote.author.as_deref().map(str::trim) {
                Some(author) if !author.is_empty() => entry.with_author(author),
                _ => entry,
            })
        })
        .collect();

    if quotes.is_empty() {
        return Err(LlmError::MalformedResponse("model response contained no quotes".to_string()));
    }

    Ok(quotes)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (```json) along with the opening fence line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or_default();
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::{build_prompt, parse_quotes};
    use crate::llm::LlmError;

    #[test]
    fn prompt_embeds_trimmed_keywords_and_count() {
        let prompt = build_prompt("  stoicism, courage  ", 4);
        assert!(prompt.contains("\"stoicism, courage\""));
        assert!(prompt.starts_with("Generate 4 "));
        assert!(prompt.contains("\"quotes\""));
    }

    #[test]
    fn parses_bare_array() {
        let quotes = parse_quotes(r#"[{"text":"Endure, and be brave.","author":"Anon"}]"#)
            .expect("bare array parses");
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes.entries()[0].text, "Endure, and be brave.");
        assert_eq!(quotes.entries()[0].author.as_deref(), Some("Anon"));
    }

    #[test]
    fn parses_wrapped_object_inside_code_fence() {
        let raw = "```json\n{\"quotes\": [{\"text\": \"Rain writes on every roof.\"}, {\"quote\": \"Storms pass.\", \"author\": \" \"}]}\n```";
        let quotes = parse_quotes(raw).expect("fenced object parses");
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes.entries()[0].author, None);
        assert_eq!(quotes.entries()[1].text, "Storms pass.");
        assert_eq!(quotes.entries()[1].author, None);
    }

    #[test]
    fn blank_entries_are_dropped() {
        let quotes = parse_quotes(r#"[{"text":"  "},{"text":" Keep going. "}]"#)
            .expect("one usable quote");
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes.entries()[0].text, "Keep going.");
    }

    #[test]
    fn empty_or_unusable_replies_are_malformed() {
        assert!(matches!(parse_quotes("   "), Err(LlmError::MalformedResponse(_))));
        assert!(matches!(parse_quotes("[]"), Err(LlmError::MalformedResponse(_))));
        assert!(matches!(parse_quotes(r#"[{"text":""}]"#), Err(LlmError::MalformedResponse(_))));
        assert!(matches!(parse_quotes("Here are some quotes!"), Err(LlmError::MalformedResponse(_))));
        assert!(matches!(parse_quotes(r#"{"items":[]}"#), Err(LlmError::MalformedResponse(_))));
    }
}
