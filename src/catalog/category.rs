use std::fmt;

/// Personality/behaviour signals; checked before the skill list so they win ties.
const PERSONALITY_KEYWORDS: &[&str] = &[
    "personality",
    "behaviour",
    "behavior",
    "collaboration",
    "teamwork",
    "leadership",
    "work style",
    "communication",
    "motivation",
    "judgement",
    "judgment",
    "resilience",
    "culture",
    "sjt",
];

const SKILL_KEYWORDS: &[&str] = &[
    "java",
    ".net",
    "python",
    "sql",
    "javascript",
    "angular",
    "react",
    "aws",
    "hadoop",
    "data",
    "coding",
    "test",
    "analysis",
    "numerical",
    "verbal",
    "aptitude",
    "reasoning",
    "mvc",
    "wpf",
    "xaml",
    "android",
];

/// Coarse assessment classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Knowledge / skills
    Knowledge,
    /// Personality / behaviour
    Personality,
}

impl Category {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Knowledge => "K",
            Self::Personality => "P",
        }
    }
}

impl fmt::Display for Category {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered rules: the first keyword list with a hit decides the category.
const RULES: &[(Category, &[&str])] = &[
    (Category::Personality, PERSONALITY_KEYWORDS),
    (Category::Knowledge, SKILL_KEYWORDS),
];

/// Best-effort category guess for rows without a `Test Type`.
///
/// Matching is substring containment over the lowercased
/// `name url description` text. Personality keywords are checked first, so
/// text carrying both kinds of signal is classified as
/// [`Category::Personality`]. Defaults to [`Category::Knowledge`].
#[inline]
pub fn guess_category(name: &str, url: &str, description: &str) -> Category {
    let text = format!("{name} {url} {description}").to_lowercase();

    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map_or(Category::Knowledge, |(category, _)| *category)
}
