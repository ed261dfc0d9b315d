//! Combines an assembled knowledge block with the user's message.

/// Prefix `user_query` with `knowledge`, or return the query alone when there
/// is no knowledge to add.
pub fn inject_context(knowledge: &str, user_query: &str) -> String {
    let knowledge = knowledge.trim_end();
    if knowledge.trim().is_empty() {
        user_query.to_string()
    } else {
        format!("{}\n\nUser Query: {}", knowledge, user_query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_with_knowledge() {
        let prompt = inject_context("Concepts related to the query: mood.\n", "I am feeling happy today.");
        assert_eq!(
            prompt,
            "Concepts related to the query: mood.\n\nUser Query: I am feeling happy today."
        );
    }

    #[test]
    fn test_inject_without_knowledge() {
        assert_eq!(inject_context("", "hello"), "hello");
        assert_eq!(inject_context("  \n", "hello"), "hello");
    }
}
