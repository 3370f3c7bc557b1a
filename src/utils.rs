/// Placeholder replaced by the user's question in prompt templates.
pub const QUESTION_PLACEHOLDER: &str = "{question}";

/// Substitutes the question into a prompt template. A template without the
/// placeholder gets the question appended after a space.
pub fn fill_prompt(template: &str, question: &str) -> String {
    if template.contains(QUESTION_PLACEHOLDER) {
        template.replace(QUESTION_PLACEHOLDER, question)
    } else {
        format!("{template} {question}")
    }
}

/// Shortens an upstream response body for logs and error messages,
/// cutting at a char boundary.
pub fn make_snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
