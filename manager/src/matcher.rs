use crate::models::KnowledgeBaseEntry;

/// Strategy for answering an inbound question from stored knowledge.
pub trait AnswerMatcher: Send + Sync {
    /// Returns the stored answer to use, or `None` when the question should
    /// be escalated to a human.
    fn find_answer(&self, entries: &[KnowledgeBaseEntry], question: &str) -> Option<String>;
}

/// Case-insensitive substring containment in either direction. Entries are
/// scanned in the order given and the first hit wins, so callers decide
/// preference by how they sort the slice.
pub struct SubstringMatcher;

impl AnswerMatcher for SubstringMatcher {
    fn find_answer(&self, entries: &[KnowledgeBaseEntry], question: &str) -> Option<String> {
        let incoming = question.to_lowercase();
        for entry in entries {
            let stored = entry.question.to_lowercase();
            if stored.contains(&incoming) || incoming.contains(&stored) {
                return Some(entry.answer.clone());
            }
        }
        None
    }
}
