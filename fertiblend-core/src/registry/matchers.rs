use super::RegistryEntry;
use std::fmt;

/// Minimum query length for reverse containment (pattern contains query).
const MIN_REVERSE_LEN: usize = 4;

/// A normalized lookup request.
#[derive(Debug, Clone)]
pub struct Query {
    /// Lowercased, trimmed name.
    pub name: String,
    /// Name split on anything that is not alphanumeric.
    pub tokens: Vec<String>,
    /// Normalized formula, see [`normalize_formula`].
    pub formula: Option<String>,
}

impl Query {
    pub fn new(name: &str, formula_hint: Option<&str>) -> Self {
        let name = name.trim().to_lowercase();
        let tokens = name
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        let formula = formula_hint.map(normalize_formula).filter(|f| !f.is_empty());
        Self { name, tokens, formula }
    }
}

/// Uppercases, drops whitespace and strips a hydration suffix
/// (`Ca(NO3)2·4H2O` → `CA(NO3)2`).
pub fn normalize_formula(formula: &str) -> String {
    let compact: String = formula
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    let anhydrous = compact
        .split(['.', '·', '*', '•'])
        .next()
        .unwrap_or_default();
    anhydrous.to_string()
}

/// One lookup strategy in the registry's ordered chain.
pub trait CompositionMatcher: Send + Sync + fmt::Debug {
    fn strategy(&self) -> &'static str;

    fn find<'r>(&self, query: &Query, entries: &'r [RegistryEntry]) -> Option<&'r RegistryEntry>;
}

/// Picks the entry whose pattern matches exactly, else the one with the longest pattern
/// that contains, or is contained by, the needle. Earlier entries win ties.
fn best_pattern_match<'r, F>(needle: &str, entries: &'r [RegistryEntry], patterns: F) -> Option<&'r RegistryEntry>
where
    F: Fn(&RegistryEntry) -> &[String],
{
    if needle.is_empty() {
        return None;
    }
    if let Some(exact) = entries
        .iter()
        .find(|entry| patterns(entry).iter().any(|p| p == needle))
    {
        return Some(exact);
    }

    let mut best: Option<(&RegistryEntry, usize)> = None;
    for entry in entries {
        for pattern in patterns(entry) {
            let hit = needle.contains(pattern.as_str())
                || (needle.len() >= MIN_REVERSE_LEN && pattern.contains(needle));
            if hit && best.map_or(true, |(_, len)| pattern.len() > len) {
                best = Some((entry, pattern.len()));
            }
        }
    }
    best.map(|(entry, _)| entry)
}

/// Canonical-name and synonym match.
#[derive(Debug, Default)]
pub struct SynonymMatcher;

impl CompositionMatcher for SynonymMatcher {
    fn strategy(&self) -> &'static str {
        "synonym"
    }

    fn find<'r>(&self, query: &Query, entries: &'r [RegistryEntry]) -> Option<&'r RegistryEntry> {
        best_pattern_match(&query.name, entries, |entry| entry.synonyms.as_slice())
    }
}

/// Formula-variant match, case-insensitive and ignoring water of hydration.
#[derive(Debug, Default)]
pub struct FormulaMatcher;

impl CompositionMatcher for FormulaMatcher {
    fn strategy(&self) -> &'static str {
        "formula"
    }

    fn find<'r>(&self, query: &Query, entries: &'r [RegistryEntry]) -> Option<&'r RegistryEntry> {
        let formula = query.formula.as_deref()?;
        best_pattern_match(formula, entries, |entry| entry.formula_variants.as_slice())
    }
}

/// Last resort: first keyword found in the name selects that element's default salt.
#[derive(Debug)]
pub struct KeywordMatcher {
    keywords: Vec<(String, String)>,
}

impl KeywordMatcher {
    pub fn new<I, K, V>(keywords: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v.into()))
                .collect(),
        }
    }

    fn keyword_hits(query: &Query, keyword: &str) -> bool {
        if keyword.chars().count() <= 2 {
            query.tokens.iter().any(|token| token == keyword)
        } else {
            query.name.contains(keyword)
        }
    }
}

impl CompositionMatcher for KeywordMatcher {
    fn strategy(&self) -> &'static str {
        "keyword"
    }

    fn find<'r>(&self, query: &Query, entries: &'r [RegistryEntry]) -> Option<&'r RegistryEntry> {
        self.keywords
            .iter()
            .find(|(keyword, _)| Self::keyword_hits(query, keyword))
            .and_then(|(_, key)| entries.iter().find(|entry| &entry.key == key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_hydration_and_case() {
        assert_eq!(normalize_formula("Ca(NO3)2·4H2O"), "CA(NO3)2");
        assert_eq!(normalize_formula("mgso4.7h2o"), "MGSO4");
        assert_eq!(normalize_formula(" K NO3 "), "KNO3");
    }

    #[test]
    fn query_tokens_split_on_punctuation() {
        let query = Query::new("Quelato Fe-EDTA 13%", None);
        assert_eq!(query.tokens, vec!["quelato", "fe", "edta", "13"]);
    }

    #[test]
    fn short_keywords_need_whole_words() {
        let matcher = KeywordMatcher::new([("b", "boric_acid")]);
        assert!(KeywordMatcher::keyword_hits(&Query::new("Solution B", None), "b"));
        assert!(!KeywordMatcher::keyword_hits(&Query::new("Nitrabor", None), "b"));
        assert_eq!(matcher.strategy(), "keyword");
    }
}
