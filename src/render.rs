use crate::api::QueryResponse;

/// Number of characters of retrieved context shown under "Source:"
pub const CONTEXT_PREVIEW_CHARS: usize = 150;

pub const ERROR_NOTICE: &str = "Error: Could not connect to Pilot. Is the API running?";

pub const CLEARED_NOTICE: &str = "Chat cleared. How can I help you now?";

/// Build the markdown for one AI transcript entry from a query reply.
pub fn format_reply(response: &QueryResponse) -> String {
    let mut markup = response.answer.trim_end().to_string();

    if let Some(sql) = non_empty(&response.sql) {
        push_block(&mut markup, "Generated SQL:", "sql", sql.trim_end());
    }

    // Retrieved context only matters for answers that came from the RAG path
    if response.intent.as_deref() == Some("rag") {
        if let Some(context) = non_empty(&response.context) {
            let preview = format!("{}...", truncate_chars(context, CONTEXT_PREVIEW_CHARS));
            push_block(&mut markup, "Source:", "text", &preview);
        }
    }

    markup
}

/// First `max` characters of `text`, never splitting a UTF-8 sequence
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn push_block(markup: &mut String, label: &str, lang: &str, body: &str) {
    markup.push_str("\n\n");
    markup.push_str(label);
    markup.push_str("\n```");
    markup.push_str(lang);
    markup.push('\n');
    markup.push_str(body);
    markup.push_str("\n```");
}
