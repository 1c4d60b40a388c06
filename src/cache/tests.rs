use super::*;

fn payload(module: &str) -> ChunkPayload {
    ChunkPayload {
        module: module.to_string(),
        filename: "doc.txt".to_string(),
        lang: "en".to_string(),
        chunk_index: 0,
        text: "some chunk".to_string(),
    }
}

#[test]
fn normalization_folds_case_and_whitespace() {
    assert_eq!(
        normalize_question("  How  Do I\tPay? "),
        "how do i pay?"
    );
    assert_eq!(normalize_question(""), "");
}

#[test]
fn equivalent_questions_share_a_key() {
    let a = cache_key("How do I pay?", "en", "billing");
    let b = cache_key("  how   do i PAY? ", "en", "billing");
    assert_eq!(a, b);
}

#[test]
fn different_modules_never_share_a_key() {
    let a = cache_key("how do i pay?", "en", "billing");
    let b = cache_key("how do i pay?", "en", "shipping");
    assert_ne!(a, b);
}

#[test]
fn different_langs_never_share_a_key() {
    let a = cache_key("how do i pay?", "en", "billing");
    let b = cache_key("how do i pay?", "ja", "billing");
    assert_ne!(a, b);
}

#[test]
fn field_boundaries_cannot_collide() {
    // Without length prefixes these two would hash identical bytes.
    let a = cache_key("question", "ab", "c");
    let b = cache_key("question", "a", "bc");
    assert_ne!(a, b);
}

#[test]
fn put_then_get_round_trips() {
    let cache = AnswerCache::new(60);
    cache.put(
        "How do I pay?",
        "en",
        "billing",
        "Use the portal.",
        vec![payload("billing")],
    );

    let cached = cache
        .get("how do i   pay?", "en", "billing")
        .expect("expected a cache hit");
    assert_eq!(cached.answer, "Use the portal.");
    assert_eq!(cached.sources.len(), 1);
}

#[test]
fn module_mismatch_is_a_miss() {
    let cache = AnswerCache::new(60);
    cache.put("how do i pay?", "en", "billing", "answer", Vec::new());

    assert!(cache.get("how do i pay?", "en", "shipping").is_none());
}

#[test]
fn expired_entry_is_absent_and_removed() {
    let cache = AnswerCache::new(0);
    cache.put("how do i pay?", "en", "billing", "answer", Vec::new());

    std::thread::sleep(std::time::Duration::from_millis(5));
    assert!(cache.get("how do i pay?", "en", "billing").is_none());
    assert!(cache.is_empty());
}

#[test]
fn invalidate_module_drops_only_that_module() {
    let cache = AnswerCache::new(60);
    cache.put("q one", "en", "billing", "a1", Vec::new());
    cache.put("q two", "en", "billing", "a2", Vec::new());
    cache.put("q three", "en", "shipping", "a3", Vec::new());

    cache.invalidate_module("billing");

    assert!(cache.get("q one", "en", "billing").is_none());
    assert!(cache.get("q two", "en", "billing").is_none());
    assert!(cache.get("q three", "en", "shipping").is_some());
    assert_eq!(cache.len(), 1);
}
