/// Token estimation for English business prose.
/// Word-based: roughly 1.3 tokens per word plus a small formatting overhead.
pub fn estimate_tokens(text: &str) -> usize {
    if text.trim().is_empty() {
        return 0;
    }

    let words = text.split_whitespace().count();
    ((words as f64 * 1.3) + 5.0).ceil() as usize
}

/// Check if adding text would exceed limit
pub fn would_exceed_limit(current_tokens: usize, new_text: &str, max_tokens: usize) -> bool {
    current_tokens + estimate_tokens(new_text) > max_tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_estimation() {
        // 7 words * 1.3 + 5 = 14.1
        let text = "Our migration plan covers three application tiers";
        let tokens = estimate_tokens(text);
        assert!(tokens >= 13 && tokens <= 16);
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   \n"), 0);
    }

    #[test]
    fn test_would_exceed() {
        let text = "word ".repeat(500);
        assert!(would_exceed_limit(1000, &text, 1500));
        assert!(!would_exceed_limit(1000, &text, 2000));
    }
}
