//! Term tokenizer shared by the lexical index and the keyword assessor.
//!
//! Terms are maximal runs of alphanumeric characters or `_`, case-folded.
//! Everything else (whitespace, punctuation, symbols) is a delimiter.
//! No stop-word removal.

use std::collections::BTreeSet;

/// Splits text into case-folded terms, preserving order and repeats.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !is_term_char(c))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Distinct terms of `text`, sorted.
pub fn distinct_terms(text: &str) -> BTreeSet<String> {
    tokenize(text).into_iter().collect()
}

fn is_term_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_case_folds_and_splits_punctuation() {
        let tokens = tokenize("Senior Rust/Go engineer, (PostgreSQL; AWS-S3)");
        assert_eq!(
            tokens,
            vec!["senior", "rust", "go", "engineer", "postgresql", "aws", "s3"]
        );
    }

    #[test]
    fn test_tokenize_keeps_repeats() {
        assert_eq!(tokenize("rust rust RUST"), vec!["rust", "rust", "rust"]);
    }

    #[test]
    fn test_tokenize_keeps_underscores_and_digits() {
        assert_eq!(tokenize("snake_case k8s"), vec!["snake_case", "k8s"]);
    }

    #[test]
    fn test_tokenize_punctuation_only_is_empty() {
        assert!(tokenize("--- ... !!!").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_distinct_terms() {
        let terms = distinct_terms("Python python FastAPI");
        assert_eq!(terms.len(), 2);
        assert!(terms.contains("python"));
        assert!(terms.contains("fastapi"));
    }
}
