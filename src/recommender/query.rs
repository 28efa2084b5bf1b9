use fancy_regex::Regex;

use crate::{RecommenderError, Result};

/// Ordered shorthand expansions; earlier rules see the raw query first
const SYNONYMS: &[(&str, &str)] = &[
    (r"\bjs\b", "javascript"),
    (r"\bnode\s*js\b", "nodejs"),
    (r"\breact\s*js\b", "react"),
    (r"\bts\b", "typescript"),
    (r"\bcsharp\b", "c#"),
    (r"\bpgsql\b", "postgresql"),
    (r"\bpostgres\b", "postgresql"),
    (r"\bml\b", "machine learning"),
    (r"\bdl\b", "deep learning"),
    (r"\bnlp\b", "natural language processing"),
    (r"\bllm(s)?\b", "large language model"),
    (r"\bcommunication\b", "collaboration"),
    (r"\bstakeholder mgmt\b", "stakeholder management"),
    (r"\bstakeholders?\b(?!\s+management)", "stakeholder management"),
    (r"\bproblem\s*solving\b", "cognitive"),
];

/// Rewrites common shorthand in queries before they are embedded
#[derive(Debug, Clone)]
pub struct QueryNormalizer {
    rules: Vec<(Regex, &'static str)>,
}

impl QueryNormalizer {
    #[inline]
    pub fn new() -> Result<Self> {
        let rules = SYNONYMS
            .iter()
            .map(|(pattern, replacement)| {
                Regex::new(&format!("(?i){pattern}"))
                    .map(|regex| (regex, *replacement))
                    .map_err(|e| {
                        RecommenderError::Config(format!("Invalid synonym pattern {pattern}: {e}"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// Trim, lowercase and expand shorthand
    #[inline]
    pub fn normalize(&self, query: &str) -> String {
        self.rules
            .iter()
            .fold(query.trim().to_lowercase(), |text, (regex, replacement)| {
                regex.replace_all(&text, *replacement).into_owned()
            })
    }
}
