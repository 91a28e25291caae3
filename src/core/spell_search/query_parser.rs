//! Query Parser Module
//!
//! Parses prefix-marked advanced queries such as
//! `^level:3 AND damage:fire AND range:30-*` into a validated AST.
//!
//! Grammar (case-insensitive):
//!
//! ```text
//! query     := ε | fieldExpr ( WS "AND" WS fieldExpr )*
//! fieldExpr := alias ":" value
//! ```
//!
//! Parses are memoized per session; identical typed prefixes are answered
//! from an LRU cache, failures included.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::error::ParseError;
use super::fields::{FieldId, FieldRegistry, Op, Value};

/// Default advanced-search prefix.
pub const DEFAULT_ADVANCED_PREFIX: char = '^';

/// Default number of memoized parses.
pub const DEFAULT_PARSE_CACHE_CAPACITY: usize = 1024;

// ============================================================================
// AST
// ============================================================================

/// One `field op value` leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldExpr {
    pub field: FieldId,
    pub op: Op,
    pub value: Value,
}

impl FieldExpr {
    pub fn new(field: FieldId, value: Value) -> Self {
        Self {
            field,
            op: field.op(),
            value,
        }
    }
}

/// Parsed advanced query. Only a top-level conjunction is supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "children", rename_all = "camelCase")]
pub enum QueryAst {
    Field(FieldExpr),
    Conjunction(Vec<FieldExpr>),
}

impl QueryAst {
    /// Leaves in evaluation order.
    pub fn leaves(&self) -> &[FieldExpr] {
        match self {
            Self::Field(expr) => std::slice::from_ref(expr),
            Self::Conjunction(children) => children,
        }
    }

    /// An empty conjunction matches everything.
    pub fn is_empty(&self) -> bool {
        self.leaves().is_empty()
    }

    /// Whether any leaf constrains `field`.
    pub fn mentions(&self, field: FieldId) -> bool {
        self.leaves().iter().any(|leaf| leaf.field == field)
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    And,
    Expr(&'a str),
}

fn tokenize(body: &str) -> Vec<Token<'_>> {
    body.split_whitespace()
        .map(|word| {
            if word.eq_ignore_ascii_case("AND") {
                Token::And
            } else {
                Token::Expr(word)
            }
        })
        .collect()
}

// ============================================================================
// Parser
// ============================================================================

/// Strip the advanced prefix, returning the query body.
pub fn advanced_body(raw: &str, prefix: char) -> Option<&str> {
    raw.strip_prefix(prefix)
}

/// Parse a query body (prefix already removed). Pure and uncached.
pub fn parse_body(registry: &FieldRegistry, body: &str) -> Result<QueryAst, ParseError> {
    let tokens = tokenize(body);
    let mut children = Vec::new();
    let mut expect_expr = true;

    for token in tokens {
        match (token, expect_expr) {
            (Token::Expr(word), true) => {
                let expr = parse_field_expr(registry, word)?;
                // A conjunction holds one leaf per field.
                if children.iter().any(|c: &FieldExpr| c.field == expr.field) {
                    return Err(ParseError::Malformed(format!(
                        "field '{}' appears more than once",
                        expr.field.as_str()
                    )));
                }
                children.push(expr);
                expect_expr = false;
            }
            (Token::And, false) => expect_expr = true,
            (Token::And, true) => {
                return Err(ParseError::Malformed(if children.is_empty() {
                    "query cannot start with AND".to_string()
                } else {
                    "AND must be followed by a field expression".to_string()
                }));
            }
            (Token::Expr(word), false) => {
                return Err(ParseError::Malformed(format!(
                    "expected AND before '{word}'"
                )));
            }
        }
    }

    if expect_expr && !children.is_empty() {
        return Err(ParseError::Malformed(
            "query cannot end with AND".to_string(),
        ));
    }

    Ok(QueryAst::Conjunction(children))
}

fn parse_field_expr(registry: &FieldRegistry, word: &str) -> Result<FieldExpr, ParseError> {
    let (alias, raw_value) = word
        .split_once(':')
        .ok_or_else(|| ParseError::Malformed(format!("expected field:value, found '{word}'")))?;

    let field = registry
        .field_id(alias)
        .ok_or_else(|| ParseError::UnknownField(alias.to_string()))?;

    let value = registry.coerce(field, raw_value)?;
    Ok(FieldExpr::new(field, value))
}

/// Memoizing advanced query parser.
pub struct QueryParser {
    registry: Arc<FieldRegistry>,
    prefix: char,
    cache: LruCache<String, Result<QueryAst, ParseError>>,
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new(FieldRegistry::shared())
    }
}

impl QueryParser {
    /// Parser with the default `^` prefix and cache capacity.
    pub fn new(registry: Arc<FieldRegistry>) -> Self {
        Self::with_options(registry, DEFAULT_ADVANCED_PREFIX, DEFAULT_PARSE_CACHE_CAPACITY)
    }

    pub fn with_options(registry: Arc<FieldRegistry>, prefix: char, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            registry,
            prefix,
            cache: LruCache::new(capacity),
        }
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    pub fn registry(&self) -> &Arc<FieldRegistry> {
        &self.registry
    }

    /// Whether `raw` is an advanced query.
    pub fn is_advanced(&self, raw: &str) -> bool {
        raw.starts_with(self.prefix)
    }

    /// Parse a raw query including its prefix.
    pub fn parse(&mut self, raw: &str) -> Result<QueryAst, ParseError> {
        if let Some(cached) = self.cache.get(raw) {
            return cached.clone();
        }

        let result = match advanced_body(raw, self.prefix) {
            Some(body) => parse_body(&self.registry, body),
            None => Err(ParseError::NotAdvanced {
                prefix: self.prefix,
            }),
        };

        trace!(query = raw, ok = result.is_ok(), "Parsed advanced query");
        self.cache.put(raw.to_string(), result.clone());
        result
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
