//! Mapping from request paths to caching policies.
//!
//! Policies come in two shapes:
//!
//! - **subtree** policies apply to everything below the first path segment
//!   (`dev` covers `/dev/index.html`, `/dev/js/app.js`, ...);
//! - **pattern** policies apply to paths of a subtree matching a regular
//!   expression. The pseudo subtree [`ROOT`] holds patterns for root-level
//!   resources such as `/index.html`.
//!
//! ```
//! use stash_http::{CacheConfig, CacheRules};
//!
//! let rules = CacheRules::new()
//!     .with_config(CacheConfig::subtree("dev", 900))
//!     .with_config(CacheConfig::pattern("root", r".*(js|css)$", 300).unwrap());
//!
//! assert_eq!(rules.resolve("/dev/index.html").map(|c| c.max_age()), Some(900));
//! assert_eq!(rules.resolve("/app.js").map(|c| c.max_age()), Some(300));
//! assert!(rules.resolve("/index.html").is_none());
//! ```

use std::fmt;

use indexmap::IndexMap;
use regex::Regex;
use smol_str::SmolStr;

/// Subtree name of the patterns applied to root-level resources.
pub const ROOT: &str = "root";

/// A single caching policy.
#[derive(Clone)]
pub struct CacheConfig {
    max_age: u32,
    subtree: SmolStr,
    pattern: Option<Pattern>,
}

#[derive(Clone)]
struct Pattern {
    source: SmolStr,
    regex: Regex,
}

impl CacheConfig {
    /// Policy covering a whole subtree.
    pub fn subtree(subtree: impl Into<SmolStr>, max_age: u32) -> Self {
        Self {
            max_age,
            subtree: subtree.into(),
            pattern: None,
        }
    }

    /// Policy covering the paths of `subtree` that fully match `pattern`.
    ///
    /// The pattern is anchored on both ends, so `.*html$` and `^.*html$`
    /// behave the same.
    pub fn pattern(
        subtree: impl Into<SmolStr>,
        pattern: &str,
        max_age: u32,
    ) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self {
            max_age,
            subtree: subtree.into(),
            pattern: Some(Pattern {
                source: SmolStr::new(pattern),
                regex,
            }),
        })
    }

    /// Lifetime of cached responses in seconds. `0` disables caching.
    pub fn max_age(&self) -> u32 {
        self.max_age
    }

    pub fn subtree_name(&self) -> &str {
        &self.subtree
    }

    /// The pattern as configured, if this is a pattern policy.
    pub fn pattern_source(&self) -> Option<&str> {
        self.pattern.as_ref().map(|p| p.source.as_str())
    }

    fn matches(&self, path: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|pattern| pattern.regex.is_match(path))
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("max_age", &self.max_age)
            .field("subtree", &self.subtree)
            .field("pattern", &self.pattern_source())
            .finish()
    }
}

impl PartialEq for CacheConfig {
    fn eq(&self, other: &Self) -> bool {
        self.max_age == other.max_age
            && self.subtree == other.subtree
            && self.pattern_source() == other.pattern_source()
    }
}

impl Eq for CacheConfig {}

/// The full set of caching policies, immutable once built.
#[derive(Clone, Debug, Default)]
pub struct CacheRules {
    subtrees: IndexMap<SmolStr, CacheConfig>,
    patterns: IndexMap<SmolStr, Vec<CacheConfig>>,
}

impl CacheRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a policy.
    ///
    /// A later subtree policy for the same subtree replaces the earlier one.
    /// Pattern policies accumulate and are tried in the order they were added.
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.insert(config);
        self
    }

    pub fn insert(&mut self, config: CacheConfig) {
        if config.pattern.is_some() {
            self.patterns
                .entry(config.subtree.clone())
                .or_default()
                .push(config);
        } else {
            self.subtrees.insert(config.subtree.clone(), config);
        }
    }

    /// Finds the policy for `path`.
    ///
    /// Root-level paths (`/index.html`) are tested against the [`ROOT`]
    /// patterns. Deeper paths use the subtree policy of their first segment
    /// if there is one, and that subtree's patterns otherwise. Patterns are
    /// matched against the full path, first match wins.
    pub fn resolve(&self, path: &str) -> Option<&CacheConfig> {
        let trimmed = path.trim_start_matches('/');
        if trimmed.is_empty() {
            return None;
        }

        let (first, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));
        if rest.trim_matches('/').is_empty() {
            return self.first_match(ROOT, path);
        }

        self.subtrees
            .get(first)
            .or_else(|| self.first_match(first, path))
    }

    fn first_match(&self, subtree: &str, path: &str) -> Option<&CacheConfig> {
        self.patterns
            .get(subtree)?
            .iter()
            .find(|config| config.matches(path))
    }

    /// All policies: subtree policies first, then patterns grouped by subtree.
    ///
    /// Both follow the order in which their subtree was first configured, and
    /// patterns of one subtree keep the order they were added in.
    pub fn iter(&self) -> impl Iterator<Item = &CacheConfig> {
        self.subtrees
            .values()
            .chain(self.patterns.values().flatten())
    }

    pub fn len(&self) -> usize {
        self.subtrees.len() + self.patterns.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> CacheRules {
        CacheRules::new()
            .with_config(CacheConfig::subtree("dev", 900))
            .with_config(CacheConfig::subtree("devwidgets", 600))
            .with_config(CacheConfig::pattern(ROOT, r".*(js|css)$", 100).unwrap())
            .with_config(CacheConfig::pattern(ROOT, r".*html$", 200).unwrap())
            .with_config(CacheConfig::pattern("var", r"^/var/search/public/.*$", 300).unwrap())
            .with_config(CacheConfig::pattern("var", r"^/var/widgets.json$", 400).unwrap())
    }

    #[test]
    fn subtree_policy_covers_everything_below() {
        let rules = rules();
        assert_eq!(rules.resolve("/dev/index.html").unwrap().max_age(), 900);
        assert_eq!(rules.resolve("/dev/js/deep/app.js").unwrap().max_age(), 900);
        assert_eq!(rules.resolve("/devwidgets/a.html").unwrap().max_age(), 600);
    }

    #[test]
    fn root_patterns_apply_to_single_segment_paths() {
        let rules = rules();
        assert_eq!(rules.resolve("/index.html").unwrap().max_age(), 200);
        assert_eq!(rules.resolve("/app.css").unwrap().max_age(), 100);
        assert!(rules.resolve("/favicon.ico").is_none());
        // root patterns are not consulted for deeper paths
        assert!(rules.resolve("/other/app.css").is_none());
    }

    #[test]
    fn first_configured_root_pattern_wins() {
        let rules = CacheRules::new()
            .with_config(CacheConfig::pattern(ROOT, r".*\.js$", 1).unwrap())
            .with_config(CacheConfig::pattern(ROOT, r".*", 2).unwrap());
        assert_eq!(rules.resolve("/a.js").unwrap().max_age(), 1);
        assert_eq!(rules.resolve("/a.txt").unwrap().max_age(), 2);
    }

    #[test]
    fn subtree_patterns_must_match_the_full_path() {
        let rules = rules();
        assert_eq!(rules.resolve("/var/widgets.json").unwrap().max_age(), 400);
        assert_eq!(
            rules.resolve("/var/search/public/all.json").unwrap().max_age(),
            300
        );
        assert!(rules.resolve("/var/widgets.json.bak").is_none());
        assert!(rules.resolve("/var/search/private/x").is_none());
    }

    #[test]
    fn unanchored_patterns_are_anchored() {
        let rules =
            CacheRules::new().with_config(CacheConfig::pattern("p", r"/p/[a-z]+", 60).unwrap());
        assert!(rules.resolve("/p/abc").is_some());
        assert!(rules.resolve("/p/abc/def").is_none());
        assert!(rules.resolve("/x/p/abc").is_none());
    }

    #[test]
    fn exact_subtree_wins_over_its_patterns() {
        let rules = CacheRules::new()
            .with_config(CacheConfig::pattern("var", r".*", 5).unwrap())
            .with_config(CacheConfig::subtree("var", 0));
        let config = rules.resolve("/var/widgets.json").unwrap();
        assert_eq!(config.max_age(), 0);
        assert_eq!(config.pattern_source(), None);
    }

    #[test]
    fn empty_and_slash_only_paths_resolve_to_nothing() {
        let rules = rules();
        assert!(rules.resolve("").is_none());
        assert!(rules.resolve("/").is_none());
        assert!(rules.resolve("//").is_none());
    }

    #[test]
    fn trailing_slash_keeps_a_path_at_root_level() {
        let rules = CacheRules::new()
            .with_config(CacheConfig::subtree("dev", 900))
            .with_config(CacheConfig::pattern(ROOT, r"/dev/?", 7).unwrap());
        assert_eq!(rules.resolve("/dev/").unwrap().max_age(), 7);
    }

    #[test]
    fn unknown_subtree_has_no_policy() {
        assert!(rules().resolve("/system/me").is_none());
    }

    #[test]
    fn later_subtree_policy_replaces_earlier_one() {
        let rules = CacheRules::new()
            .with_config(CacheConfig::subtree("dev", 1))
            .with_config(CacheConfig::subtree("dev", 2));
        assert_eq!(rules.resolve("/dev/a").unwrap().max_age(), 2);
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn iteration_follows_configuration_order() {
        let rules = CacheRules::new()
            .with_config(CacheConfig::subtree("zeta", 1))
            .with_config(CacheConfig::pattern(ROOT, r".*\.js", 2).unwrap())
            .with_config(CacheConfig::subtree("alpha", 3))
            .with_config(CacheConfig::pattern("var", "/var/a", 4).unwrap())
            .with_config(CacheConfig::subtree("mid", 5))
            .with_config(CacheConfig::pattern(ROOT, r".*\.css", 6).unwrap())
            .with_config(CacheConfig::subtree("zeta", 7));

        let order: Vec<_> = rules
            .iter()
            .map(|config| (config.subtree_name(), config.max_age()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("zeta", 7),
                ("alpha", 3),
                ("mid", 5),
                (ROOT, 2),
                (ROOT, 6),
                ("var", 4),
            ]
        );
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(CacheConfig::pattern("var", "(unclosed", 1).is_err());
    }
}
