//! Name Resolution
//!
//! Turns schema titles, property keys and enum literals into identifiers:
//! - Sanitization (word splitting, casing, acronyms, reserved words)
//! - Per-scope uniqueness with the lowest free integer suffix
//!
//! Names are claimed in generation order, so the same input always produces
//! the same identifiers. Language-specific rendering (raw identifiers, module
//! paths) is left to the sink.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::config::{Casing, NamingConfig};
use crate::error::{Result, TypegenError};

/// Anything that is neither a letter nor a digit separates words
static WORD_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{Alphabetic}\p{Nd}]+").expect("static regex is valid"));

/// Which kind of identifier is being produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierStyle {
    Type,
    Field,
    Constant,
}

// =============================================================================
// Naming Scope
// =============================================================================

/// Identifiers already claimed at one nesting level
#[derive(Debug, Clone, Default)]
pub struct NamingScope {
    claimed: HashSet<String>,
    attempt_limit: Option<usize>,
    disambiguated: usize,
}

impl NamingScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope that gives up after `limit` candidate identifiers for one name
    pub fn with_attempt_limit(limit: usize) -> Self {
        Self {
            attempt_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.claimed.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }

    /// How many claims needed a numeric suffix
    pub fn disambiguated(&self) -> usize {
        self.disambiguated
    }

    /// Claim `base`, or `base2`, `base3`, ... whichever is free first
    pub fn claim(&mut self, base: &str) -> Result<String> {
        if self.claimed.insert(base.to_string()) {
            return Ok(base.to_string());
        }

        let mut attempts = 1;
        let mut suffix = 2usize;
        loop {
            if let Some(limit) = self.attempt_limit {
                if attempts >= limit {
                    return Err(TypegenError::NameResolutionExhausted {
                        candidate: base.to_string(),
                        attempts,
                    });
                }
            }
            let candidate = format!("{base}{suffix}");
            if self.claimed.insert(candidate.clone()) {
                self.disambiguated += 1;
                return Ok(candidate);
            }
            attempts += 1;
            suffix += 1;
        }
    }
}

// =============================================================================
// Name Resolver
// =============================================================================

/// Sanitizes candidate names and claims them in a scope
#[derive(Debug, Clone)]
pub struct NameResolver {
    config: NamingConfig,
}

impl NameResolver {
    pub fn new(config: NamingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NamingConfig {
        &self.config
    }

    /// Fresh scope honouring the configured attempt cap
    pub fn scope(&self) -> NamingScope {
        match self.config.max_suffix_attempts {
            Some(limit) => NamingScope::with_attempt_limit(limit),
            None => NamingScope::new(),
        }
    }

    /// Sanitize `candidate` and claim a unique identifier for it in `scope`
    pub fn resolve(&self, candidate: &str, style: IdentifierStyle, scope: &mut NamingScope) -> Result<String> {
        let base = self.sanitize(candidate, style);
        scope.claim(&base)
    }

    /// Turn an arbitrary string into a valid identifier of the given style
    pub fn sanitize(&self, candidate: &str, style: IdentifierStyle) -> String {
        let words = split_words(candidate);
        let casing = match style {
            IdentifierStyle::Type => Casing::PascalCase,
            IdentifierStyle::Field => self.config.field_casing,
            IdentifierStyle::Constant => self.config.constant_casing,
        };

        let mut ident = self.join_words(&words, casing);
        if ident.is_empty() {
            ident = match style {
                IdentifierStyle::Type => self.config.fallback_type_name.clone(),
                IdentifierStyle::Field => self.config.fallback_field_name.clone(),
                IdentifierStyle::Constant => self.config.fallback_constant_name.clone(),
            };
        }

        if ident.chars().next().is_some_and(|c| c.is_numeric()) {
            ident.insert(0, '_');
        }

        let reserved = self.config.reserved_words.contains(&ident)
            || (style == IdentifierStyle::Type && self.config.reserved_type_names.contains(&ident));
        if reserved {
            ident.push_str(&self.config.keyword_suffix);
        }

        ident
    }

    fn join_words(&self, words: &[String], casing: Casing) -> String {
        match casing {
            Casing::PascalCase => words.iter().map(|w| self.case_word(w)).collect(),
            Casing::CamelCase => words
                .iter()
                .enumerate()
                .map(|(i, w)| if i == 0 { w.to_lowercase() } else { self.case_word(w) })
                .collect(),
            Casing::SnakeCase => words.iter().map(|w| w.to_lowercase()).collect::<Vec<_>>().join("_"),
            Casing::ScreamingSnakeCase => {
                words.iter().map(|w| w.to_uppercase()).collect::<Vec<_>>().join("_")
            }
        }
    }

    /// Apply PascalCase to a word, preserving acronyms
    fn case_word(&self, word: &str) -> String {
        let upper = word.to_uppercase();

        if self.config.acronyms.contains(&upper) {
            return upper;
        }

        if self.config.preserve_screaming_case && word.chars().count() > 1 && word == upper {
            return word.to_string();
        }

        let mut chars = word.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        }
    }
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new(NamingConfig::default())
    }
}

/// Split on separators and on lower/upper case boundaries
///
/// `"userId"` → `["user", "Id"]`, `"HTTPServer"` → `["HTTP", "Server"]`
fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();

    for chunk in WORD_SEPARATOR.split(input).filter(|c| !c.is_empty()) {
        let chars: Vec<char> = chunk.chars().collect();
        let mut current = String::new();

        for (i, &c) in chars.iter().enumerate() {
            if i > 0 && c.is_uppercase() {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                let boundary = prev.is_lowercase()
                    || prev.is_numeric()
                    || (prev.is_uppercase() && next_is_lower);
                if boundary && !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            current.push(c);
        }

        if !current.is_empty() {
            words.push(current);
        }
    }

    words
}

/// Singular form of an English plural, used to name array element types
pub fn singularize(word: &str) -> String {
    let lower = word.to_lowercase();
    let irregular = match lower.as_str() {
        "children" => Some("child"),
        "people" => Some("person"),
        "men" => Some("man"),
        "women" => Some("woman"),
        "feet" => Some("foot"),
        "teeth" => Some("tooth"),
        "mice" => Some("mouse"),
        _ => None,
    };
    if let Some(singular) = irregular {
        // keep the original's leading capitalization
        let mut out = singular.to_string();
        if word.chars().next().is_some_and(char::is_uppercase) {
            out = capitalize(&out);
        }
        return out;
    }

    let strip = |n: usize| word[..word.len() - n].to_string();
    if lower.ends_with("ies") && word.len() > 3 {
        format!("{}y", strip(3))
    } else if ["sses", "xes", "ches", "shes", "zes"].iter().any(|s| lower.ends_with(s)) {
        strip(2)
    } else if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
        word.to_string()
    } else if lower.ends_with('s') && word.len() > 1 {
        strip(1)
    } else {
        word.to_string()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> NameResolver {
        NameResolver::default()
    }

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("userId"), vec!["user", "Id"]);
        assert_eq!(split_words("HTTPServer"), vec!["HTTP", "Server"]);
        assert_eq!(split_words("home-address_line 1"), vec!["home", "address", "line", "1"]);
        assert!(split_words("$%^").is_empty());
    }

    #[test]
    fn test_type_names() {
        let r = resolver();
        assert_eq!(r.sanitize("home_address", IdentifierStyle::Type), "HomeAddress");
        assert_eq!(r.sanitize("Info", IdentifierStyle::Type), "Info");
        assert_eq!(r.sanitize("user_id", IdentifierStyle::Type), "UserID");
        assert_eq!(r.sanitize("3d point", IdentifierStyle::Type), "_3dPoint");
        assert_eq!(r.sanitize("option", IdentifierStyle::Type), "Option_");
        assert_eq!(r.sanitize("???", IdentifierStyle::Type), "Anonymous");
    }

    #[test]
    fn test_field_names() {
        let r = resolver();
        assert_eq!(r.sanitize("firstName", IdentifierStyle::Field), "first_name");
        assert_eq!(r.sanitize("type", IdentifierStyle::Field), "type_");
        assert_eq!(r.sanitize("@id", IdentifierStyle::Field), "id");
        assert_eq!(r.sanitize("", IdentifierStyle::Field), "field");
    }

    #[test]
    fn test_constant_names() {
        let r = resolver();
        assert_eq!(r.sanitize("ACTIVE_USER", IdentifierStyle::Constant), "ActiveUser");
        assert_eq!(r.sanitize("in-progress", IdentifierStyle::Constant), "InProgress");
        assert_eq!(r.sanitize("42", IdentifierStyle::Constant), "_42");

        let screaming = NameResolver::new(NamingConfig {
            constant_casing: Casing::ScreamingSnakeCase,
            ..NamingConfig::default()
        });
        assert_eq!(screaming.sanitize("in progress", IdentifierStyle::Constant), "IN_PROGRESS");
    }

    #[test]
    fn test_collisions_take_lowest_suffix() {
        let r = resolver();
        let mut scope = r.scope();
        assert_eq!(r.resolve("Info", IdentifierStyle::Type, &mut scope).unwrap(), "Info");
        assert_eq!(r.resolve("info", IdentifierStyle::Type, &mut scope).unwrap(), "Info2");
        assert_eq!(r.resolve("Info2", IdentifierStyle::Type, &mut scope).unwrap(), "Info22");
        assert_eq!(r.resolve("INFO", IdentifierStyle::Type, &mut scope).unwrap(), "Info3");
        assert_eq!(scope.len(), 4);
        assert_eq!(scope.disambiguated(), 3);
    }

    #[test]
    fn test_attempt_limit_is_exhausted() {
        let mut scope = NamingScope::with_attempt_limit(2);
        scope.claim("Info").unwrap();
        scope.claim("Info").unwrap();
        let err = scope.claim("Info").unwrap_err();
        assert!(matches!(err, TypegenError::NameResolutionExhausted { attempts: 2, .. }));
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("children"), "child");
        assert_eq!(singularize("Tags"), "Tag");
        assert_eq!(singularize("status"), "status");
        assert_eq!(singularize("data"), "data");
    }
}
