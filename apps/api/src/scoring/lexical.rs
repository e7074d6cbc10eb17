//! Lexical Scorer — TF-IDF cosine similarity between a resume and a job
//! description, scaled to 0–100.
//!
//! Pure and deterministic, no LLM call. Terms are weighted by smoothed
//! inverse document frequency over the two documents
//! (`ln((1+n)/(1+df)) + 1`), vectors are L2-normalized, and the cosine is
//! floored to an integer after scaling x100.

use std::collections::{HashMap, HashSet};

/// Common English stop words excluded from term vectors. Resume/JD text is
/// dominated by these otherwise and every pair scores artificially high.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "am", "an", "and", "any", "are", "as", "at",
    "be", "because", "been", "being", "below", "between", "both", "but", "by", "can", "did", "do",
    "does", "doing", "down", "during", "each", "few", "for", "from", "further", "had", "has",
    "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if", "in", "into",
    "is", "it", "its", "just", "me", "more", "most", "my", "no", "nor", "not", "now", "of", "off",
    "on", "once", "only", "or", "other", "our", "ours", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them", "then",
    "there", "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
    "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why",
    "will", "with", "would", "you", "your", "yours",
];

/// Computes the lexical similarity score between a resume and a job
/// description. Empty or stop-word-only input scores 0.
pub fn lexical_score(resume_text: &str, job_description: &str) -> i32 {
    let resume_terms = term_counts(resume_text);
    let jd_terms = term_counts(job_description);

    if resume_terms.is_empty() || jd_terms.is_empty() {
        return 0;
    }

    let vocabulary: HashSet<&String> = resume_terms.keys().chain(jd_terms.keys()).collect();

    // Smoothed idf over the two-document corpus: ln((1+n)/(1+df)) + 1
    let n = 2.0_f64;
    let mut resume_vec = Vec::with_capacity(vocabulary.len());
    let mut jd_vec = Vec::with_capacity(vocabulary.len());

    for term in vocabulary {
        let in_resume = resume_terms.get(term).copied().unwrap_or(0);
        let in_jd = jd_terms.get(term).copied().unwrap_or(0);
        let df = (in_resume > 0) as u32 + (in_jd > 0) as u32;
        let idf = ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0;
        resume_vec.push(in_resume as f64 * idf);
        jd_vec.push(in_jd as f64 * idf);
    }

    let similarity = cosine(&resume_vec, &jd_vec);
    (similarity * 100.0) as i32
}

fn term_counts(text: &str) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2 && !STOP_WORDS.contains(t))
    {
        *counts.entry(token.to_string()).or_insert(0) += 1;
    }
    counts
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_documents_score_max() {
        let text = "senior rust engineer building distributed systems with tokio and postgres";
        let score = lexical_score(text, text);
        // Cosine of a vector with itself is 1.0 up to float rounding.
        assert!(score >= 99, "score was {score}");
        assert!(score <= 100, "score was {score}");
    }

    #[test]
    fn test_disjoint_documents_score_0() {
        let resume = "pastry chef croissant baking sourdough";
        let jd = "kubernetes golang microservices terraform";
        assert_eq!(lexical_score(resume, jd), 0);
    }

    #[test]
    fn test_empty_input_scores_0() {
        assert_eq!(lexical_score("", "rust engineer"), 0);
        assert_eq!(lexical_score("rust engineer", ""), 0);
        assert_eq!(lexical_score("", ""), 0);
    }

    #[test]
    fn test_stop_words_only_scores_0() {
        assert_eq!(lexical_score("the and of with", "rust engineer"), 0);
    }

    #[test]
    fn test_partial_overlap_is_between_bounds() {
        let resume = "rust engineer with tokio experience and sqlx postgres background";
        let jd = "rust engineer wanted, kubernetes and aws required, postgres preferred";
        let score = lexical_score(resume, jd);
        assert!(score > 0, "score was {score}");
        assert!(score < 100, "score was {score}");
    }

    #[test]
    fn test_deterministic() {
        let resume = "rust tokio axum sqlx postgres tracing";
        let jd = "rust axum service, postgres storage, tracing required";
        assert_eq!(lexical_score(resume, jd), lexical_score(resume, jd));
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let a = lexical_score("Rust, Tokio; Postgres!", "rust tokio postgres");
        let b = lexical_score("rust tokio postgres", "rust tokio postgres");
        assert_eq!(a, b);
    }
}
