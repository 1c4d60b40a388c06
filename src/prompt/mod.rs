
use crate::index::SearchHit;

/// Assemble the generation prompt: instruction, retrieved context joined
/// with a separator, then the question.
#[inline]
pub fn build_prompt(question: &str, hits: &[SearchHit], lang: &str) -> String {
    let context = hits
        .iter()
        .map(|hit| hit.payload.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n---\n");

    format!(
        "You are a helpful support assistant. Answer concisely in {lang}.\n\n\
         Context:\n{context}\n\n\
         User question:\n{question}\n\n\
         Answer:"
    )
}
