//! Fuzzy Name Matcher
//!
//! Standard-mode name search. A query is either a quoted phrase (substring
//! match) or a whitespace-separated token list classified into a
//! [`MatchKind`]. Ranking for the suggestion dropdown layers nucleo's
//! fuzzy score on top of the match kind.

use nucleo::{
    pattern::{Atom, AtomKind, CaseMatching, Normalization},
    Matcher, Utf32Str,
};

use super::record::SpellRecord;

/// How strongly a name matched, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchKind {
    /// At least one token is a substring. Used for ranking only.
    AnyToken,
    /// Every token is a substring.
    AllTokens,
    Substring,
    Prefix,
    Exact,
}

impl MatchKind {
    /// Whether the pipeline keeps a record matched this way.
    pub fn is_accepted(self) -> bool {
        self >= MatchKind::AllTokens
    }
}

/// A parsed, case-folded name query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameQuery {
    /// Empty unquoted query; matches everything.
    Everything,
    /// Quoted phrase; substring containment. An empty phrase matches nothing.
    Phrase(String),
    /// Unquoted text with its whitespace-split tokens.
    Tokens { whole: String, tokens: Vec<String> },
}

impl NameQuery {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(phrase) = unquote(trimmed) {
            return Self::Phrase(phrase.trim().to_lowercase());
        }
        if trimmed.is_empty() {
            return Self::Everything;
        }
        let whole = trimmed.to_lowercase();
        let tokens = whole.split_whitespace().map(str::to_string).collect();
        Self::Tokens { whole, tokens }
    }

    /// Text handed to the fuzzy scorer.
    pub fn pattern(&self) -> &str {
        match self {
            Self::Everything => "",
            Self::Phrase(phrase) => phrase,
            Self::Tokens { whole, .. } => whole,
        }
    }

    /// Classify `name` against this query.
    pub fn classify(&self, name: &str) -> Option<MatchKind> {
        let name = name.trim().to_lowercase();
        match self {
            Self::Everything => Some(MatchKind::Exact),
            Self::Phrase(phrase) if phrase.is_empty() => None,
            Self::Phrase(phrase) => {
                if name == *phrase {
                    Some(MatchKind::Exact)
                } else if name.contains(phrase.as_str()) {
                    Some(MatchKind::Substring)
                } else {
                    None
                }
            }
            Self::Tokens { whole, tokens } => {
                if name == *whole {
                    Some(MatchKind::Exact)
                } else if name.starts_with(whole.as_str()) {
                    Some(MatchKind::Prefix)
                } else if name.contains(whole.as_str()) {
                    Some(MatchKind::Substring)
                } else if tokens.iter().all(|t| name.contains(t.as_str())) {
                    Some(MatchKind::AllTokens)
                } else if tokens.iter().any(|t| name.contains(t.as_str())) {
                    Some(MatchKind::AnyToken)
                } else {
                    None
                }
            }
        }
    }

    /// Boolean match used by the filter pipeline.
    pub fn matches(&self, name: &str) -> bool {
        self.classify(name).is_some_and(MatchKind::is_accepted)
    }
}

fn unquote(text: &str) -> Option<&str> {
    ['"', '\''].into_iter().find_map(|quote| {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            Some(&text[1..text.len() - 1])
        } else {
            None
        }
    })
}

/// Convenience wrapper for one-off matches.
pub fn name_matches(query: &str, name: &str) -> bool {
    NameQuery::parse(query).matches(name)
}

// ============================================================================
// Ranking
// ============================================================================

/// A ranked name suggestion.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedName<'a> {
    pub record: &'a SpellRecord,
    pub kind: MatchKind,
    pub score: u16,
}

/// Ranks corpus names for the suggestion dropdown.
pub struct NameRanker {
    matcher: Matcher,
}

impl Default for NameRanker {
    fn default() -> Self {
        Self::new()
    }
}

impl NameRanker {
    pub fn new() -> Self {
        Self {
            matcher: Matcher::default(),
        }
    }

    /// Up to `limit` matches, accepted kinds first, then any-token fillers.
    ///
    /// Ties break on nucleo score, then name.
    pub fn rank<'a>(
        &mut self,
        query: &NameQuery,
        corpus: &'a [SpellRecord],
        limit: usize,
    ) -> Vec<RankedName<'a>> {
        let atom = Atom::new(
            query.pattern(),
            CaseMatching::Ignore,
            Normalization::Smart,
            AtomKind::Fuzzy,
            false,
        );

        let mut buf = Vec::new();
        let mut ranked: Vec<RankedName<'a>> = corpus
            .iter()
            .filter_map(|record| {
                let kind = query.classify(&record.name)?;
                let haystack = Utf32Str::new(&record.name, &mut buf);
                let score = atom.score(haystack, &mut self.matcher).unwrap_or(0);
                Some(RankedName {
                    record,
                    kind,
                    score,
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.kind
                .cmp(&a.kind)
                .then_with(|| b.score.cmp(&a.score))
                .then_with(|| a.record.name.cmp(&b.record.name))
        });
        ranked.truncate(limit);
        ranked
    }
}
