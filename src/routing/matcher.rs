//! Routing key matching logic.
//!
//! # Responsibilities
//! - Parse topic patterns into tokens (literal, `*`, `#`)
//! - Match routing keys against compiled topic patterns
//! - Detect wildcard syntax in patterns bound to non-topic exchanges
//!
//! # Design Decisions
//! - Keys and patterns split on `.`; empty tokens are kept (`"a..b"` has three tokens)
//! - An empty literal token never matches; only `*` and `#` match empty tokens
//! - `#` elasticity resolved with a DP over (pattern index, key index), O(m * n)
//! - Runs of `#` collapse to one at compile time (`a.#.#.b` == `a.#.b`)

use crate::routing::error::RoutingError;

const SEPARATOR: char = '.';
const STAR: &str = "*";
const HASH: &str = "#";

/// One token of a compiled topic pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Matches exactly the same text.
    Literal(String),
    /// `*`: exactly one token.
    Star,
    /// `#`: zero or more tokens.
    Hash,
}

/// A compiled topic binding pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPattern {
    source: String,
    tokens: Vec<Token>,
    has_hash: bool,
}

impl TopicPattern {
    /// Compile a topic pattern.
    ///
    /// Wildcards must occupy a whole token: `a.*.c` is valid, `a*b` is not.
    pub fn parse(pattern: &str) -> Result<Self, RoutingError> {
        let mut tokens: Vec<Token> = Vec::new();

        for raw in pattern.split(SEPARATOR) {
            let token = match raw {
                STAR => Token::Star,
                HASH => Token::Hash,
                lit if lit.contains(['*', '#']) => {
                    return Err(RoutingError::InvalidPattern {
                        pattern: pattern.to_string(),
                        token: lit.to_string(),
                    });
                }
                lit => Token::Literal(lit.to_string()),
            };

            if token == Token::Hash && tokens.last() == Some(&Token::Hash) {
                continue;
            }
            tokens.push(token);
        }

        let has_hash = tokens.contains(&Token::Hash);
        Ok(Self {
            source: pattern.to_string(),
            tokens,
            has_hash,
        })
    }

    /// The pattern text as it was bound.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Returns true if the routing key matches this pattern.
    pub fn matches(&self, routing_key: &str) -> bool {
        self.matches_tokens(&split_key(routing_key))
    }

    /// Match a routing key already split with [`split_key`].
    pub fn matches_tokens(&self, key: &[&str]) -> bool {
        // Without `#` the token counts must agree exactly.
        if !self.has_hash {
            return self.tokens.len() == key.len()
                && self
                    .tokens
                    .iter()
                    .zip(key)
                    .all(|(token, part)| token_matches(token, part));
        }

        // next[j]: tokens[i + 1..] matches key[j..]
        let n = key.len();
        let mut next = vec![false; n + 1];
        next[n] = true;
        let mut current = vec![false; n + 1];

        for token in self.tokens.iter().rev() {
            for j in (0..=n).rev() {
                current[j] = match token {
                    Token::Hash => next[j] || (j < n && current[j + 1]),
                    _ => j < n && token_matches(token, key[j]) && next[j + 1],
                };
            }
            std::mem::swap(&mut next, &mut current);
        }

        next[0]
    }
}

/// Split a routing key into its `.`-separated tokens.
pub fn split_key(routing_key: &str) -> Vec<&str> {
    routing_key.split(SEPARATOR).collect()
}

fn token_matches(token: &Token, part: &str) -> bool {
    match token {
        Token::Star | Token::Hash => true,
        Token::Literal(lit) => !lit.is_empty() && lit == part,
    }
}

/// Returns true if any whole token of the pattern is `*` or `#`.
///
/// Such patterns are only meaningful on topic exchanges.
pub fn has_wildcard(pattern: &str) -> bool {
    pattern
        .split(SEPARATOR)
        .any(|token| token == STAR || token == HASH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, key: &str) -> bool {
        TopicPattern::parse(pattern).unwrap().matches(key)
    }

    #[test]
    fn test_literal_pattern() {
        assert!(matches("a.b.c", "a.b.c"));
        assert!(!matches("a.b.c", "a.b"));
        assert!(!matches("a.b.c", "a.b.c.d"));
        assert!(!matches("a.b.c", "A.b.c")); // Case sensitive
    }

    #[test]
    fn test_star_matches_exactly_one_token() {
        assert!(matches("*.error.*", "auth.error.database"));
        assert!(!matches("*.error.*", "error.database"));
        assert!(!matches("*.error.*", "auth.error"));
        assert!(!matches("auth.*", "auth.error.database"));
        assert!(matches("auth.*", "auth.login"));
        assert!(matches("*", ""));
    }

    #[test]
    fn test_hash_elasticity() {
        assert!(matches("#", ""));
        assert!(matches("#", "a"));
        assert!(matches("#", "a.b.c"));

        assert!(matches("a.#", "a"));
        assert!(matches("a.#", "a.b"));
        assert!(matches("a.#", "a.b.c"));
        assert!(!matches("a.#", "b"));

        assert!(matches("a.#.c", "a.b.c"));
        assert!(matches("a.#.c", "a.c"));
        assert!(matches("a.#.c", "a.x.y.z.c"));
        assert!(!matches("a.#.c", "a.b.c.d"));
    }

    #[test]
    fn test_multiple_hashes_backtrack() {
        assert!(matches("#.b.#", "b"));
        assert!(matches("#.b.#", "a.b.c"));
        assert!(matches("#.b.#.d", "a.b.x.b.d"));
        assert!(!matches("#.b.#.d", "a.x.d"));
        assert!(matches("*.#.*", "a.b"));
        assert!(!matches("*.#.*", "a"));
    }

    #[test]
    fn test_empty_tokens() {
        assert!(matches("a.*.b", "a..b"));
        assert!(matches("a.#", "a."));
        assert!(!matches("a..b", "a..b")); // Empty literal never matches
        assert!(!matches("", ""));
    }

    #[test]
    fn test_consecutive_hashes_collapse() {
        let pattern = TopicPattern::parse("a.#.#.b").unwrap();
        assert_eq!(
            pattern.tokens(),
            &[
                Token::Literal("a".into()),
                Token::Hash,
                Token::Literal("b".into())
            ]
        );
        assert_eq!(pattern.as_str(), "a.#.#.b");
        assert!(pattern.matches("a.b"));
    }

    #[test]
    fn test_invalid_tokens_rejected() {
        for bad in ["a*b", "a.b#", "##", "**.a", "a.*x"] {
            let err = TopicPattern::parse(bad).unwrap_err();
            assert!(matches!(err, RoutingError::InvalidPattern { .. }), "{bad}");
        }
    }

    #[test]
    fn test_pre_split_key_matches_like_raw_key() {
        let patterns: Vec<TopicPattern> = ["*.error.*", "auth.#", "#.database", "a..b", "#"]
            .iter()
            .map(|p| TopicPattern::parse(p).unwrap())
            .collect();

        for key in ["auth.error.database", "auth", "", "a..b", "order.critical.inventory"] {
            let tokens = split_key(key);
            for pattern in &patterns {
                assert_eq!(
                    pattern.matches_tokens(&tokens),
                    pattern.matches(key),
                    "{} vs {}",
                    pattern.as_str(),
                    key
                );
            }
        }
        assert_eq!(split_key("a..b"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_has_wildcard() {
        assert!(has_wildcard("#"));
        assert!(has_wildcard("a.*"));
        assert!(!has_wildcard("a*b"));
        assert!(!has_wildcard("error"));
        assert!(!has_wildcard(""));
    }
}
