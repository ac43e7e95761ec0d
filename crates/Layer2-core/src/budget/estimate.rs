//! Character-count token estimate

const CODE_INDICATORS: &[&str] = &["{", "}", "()", "=>", "function", "class", "def", "import"];

/// 코드로 판정하는 최소 지표 수
const CODE_INDICATOR_THRESHOLD: usize = 3;

/// Rough token count: code ≈ 3 chars/token, prose ≈ 4 chars/token
pub fn estimate_tokens(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    if looks_like_code(text) {
        chars / 3
    } else {
        chars / 4
    }
}

pub fn looks_like_code(text: &str) -> bool {
    CODE_INDICATORS
        .iter()
        .filter(|indicator| text.contains(*indicator))
        .count()
        >= CODE_INDICATOR_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prose_divides_by_four() {
        let text = "a".repeat(400);
        assert!(!looks_like_code(&text));
        assert_eq!(estimate_tokens(&text), 100);
    }

    #[test]
    fn test_code_divides_by_three() {
        let text = "import os\ndef main() {\n}\n";
        assert!(looks_like_code(text));
        assert_eq!(estimate_tokens(text), text.chars().count() as u64 / 3);
    }

    #[test]
    fn test_two_indicators_is_prose() {
        assert!(!looks_like_code("a class of {things"));
    }

    #[test]
    fn test_empty() {
        assert_eq!(estimate_tokens(""), 0);
    }
}
