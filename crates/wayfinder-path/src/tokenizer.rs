/// Rule-table tokenizer for path templates
///
/// Turns a template string like `/users/:id<\d+>` into a flat token
/// sequence. The seven lexical rules live in a process-wide, ordered,
/// immutable table; the first rule whose prefix-anchored pattern matches
/// the unconsumed suffix wins and emits one token.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::PathError;

/// Default character class for unconstrained positional and matrix params.
///
/// Anything that is safe inside a path segment: alphanumerics plus the
/// sub-delimiters the default encoding mode leaves unencoded.
pub const DEFAULT_PARAM_CLASS: &str = "[a-zA-Z0-9\\-_.~%':|=+*@$,;]+";

/// Kind of a single template token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `:name` or `:name<constraint>` - one decoded path value
    UrlParam,
    /// `*name` - greedy capture up to the query delimiter
    SplatParam,
    /// `;name` or `;name<constraint>` - matrix-style `;name=value`
    MatrixParam,
    /// `?name` / `&name` - declared query key, no URL source
    QueryParam,
    /// `/` or `?`
    Delimiter,
    /// One of `! & - _ . ;`
    SubDelimiter,
    /// One or more alphanumerics
    Fragment,
}

/// One token produced by the tokenizer; immutable after creation
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The exact template text this token consumed
    pub matched: String,
    /// Parameter name for param-like tokens
    pub param_name: Option<String>,
    /// Raw constraint text between `<` and `>`, if any
    pub constraint: Option<String>,
    /// Sub-expression this token contributes to the URL-matching source
    pub regex_source: Option<String>,
}

/// A single lexical rule: prefix pattern plus a source factory
struct Rule {
    kind: TokenKind,
    pattern: &'static Lazy<Regex>,
    make_source: fn(&Token) -> Option<String>,
}

static URL_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:([a-zA-Z0-9_-]*[a-zA-Z0-9])(?:<(.+?)>)?").unwrap());
static SPLAT_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\*([a-zA-Z0-9_-]*[a-zA-Z0-9])").unwrap());
static MATRIX_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^;([a-zA-Z0-9_-]*[a-zA-Z0-9])(?:<(.+?)>)?").unwrap());
static QUERY_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\?|&):?([a-zA-Z0-9_-]*[a-zA-Z0-9])").unwrap());
static DELIMITER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([/?])").unwrap());
static SUB_DELIMITER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([!&\-_.;])").unwrap());
static FRAGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9a-zA-Z]+)").unwrap());

fn constrained_source(token: &Token) -> Option<String> {
    let class = token
        .constraint
        .as_deref()
        .unwrap_or(DEFAULT_PARAM_CLASS)
        .to_string();
    Some(format!("({class})"))
}

fn splat_source(_token: &Token) -> Option<String> {
    Some("([^?]*)".to_string())
}

fn matrix_source(token: &Token) -> Option<String> {
    let class = token.constraint.as_deref().unwrap_or(DEFAULT_PARAM_CLASS);
    let name = token.param_name.as_deref().unwrap_or_default();
    Some(format!(";{}=({class})", regex::escape(name)))
}

fn no_source(_token: &Token) -> Option<String> {
    None
}

fn literal_source(token: &Token) -> Option<String> {
    Some(regex::escape(&token.matched))
}

/// The seven rules in priority order. Loaded once, never mutated.
static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule {
            kind: TokenKind::UrlParam,
            pattern: &URL_PARAM,
            make_source: constrained_source,
        },
        Rule {
            kind: TokenKind::SplatParam,
            pattern: &SPLAT_PARAM,
            make_source: splat_source,
        },
        Rule {
            kind: TokenKind::MatrixParam,
            pattern: &MATRIX_PARAM,
            make_source: matrix_source,
        },
        Rule {
            kind: TokenKind::QueryParam,
            pattern: &QUERY_PARAM,
            make_source: no_source,
        },
        Rule {
            kind: TokenKind::Delimiter,
            pattern: &DELIMITER,
            make_source: literal_source,
        },
        Rule {
            kind: TokenKind::SubDelimiter,
            pattern: &SUB_DELIMITER,
            make_source: literal_source,
        },
        Rule {
            kind: TokenKind::Fragment,
            pattern: &FRAGMENT,
            make_source: literal_source,
        },
    ]
});

/// Tokenizes the URL part of a template (query block already split off)
///
/// Tries each rule in priority order against the unconsumed suffix; the
/// first hit emits one token and consumes its match. A suffix no rule can
/// consume is a malformed template and fails the whole compile.
pub fn tokenize(template: &str) -> Result<Vec<Token>, PathError> {
    let mut tokens = Vec::new();
    let mut rest = template;

    'consume: while !rest.is_empty() {
        for rule in RULES.iter() {
            if let Some(caps) = rule.pattern.captures(rest) {
                let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                let mut token = Token {
                    kind: rule.kind,
                    matched: whole.to_string(),
                    param_name: caps.get(1).map(|m| m.as_str().to_string()),
                    constraint: caps.get(2).map(|m| m.as_str().to_string()),
                    regex_source: None,
                };
                // Literal rules capture their text, not a param name
                if matches!(
                    token.kind,
                    TokenKind::Delimiter | TokenKind::SubDelimiter | TokenKind::Fragment
                ) {
                    token.param_name = None;
                }
                token.regex_source = (rule.make_source)(&token);
                rest = &rest[whole.len()..];
                tokens.push(token);
                continue 'consume;
            }
        }
        return Err(PathError::CouldNotParse {
            path: template.to_string(),
        });
    }

    Ok(tokens)
}

/// Parses a query declaration block (`?offset&limit`) into declared names
pub fn parse_query_block(block: &str) -> Result<Vec<String>, PathError> {
    let mut names = Vec::new();
    let mut rest = block;

    while !rest.is_empty() {
        match QUERY_PARAM.captures(rest) {
            Some(caps) => {
                let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                if let Some(name) = caps.get(1) {
                    names.push(name.as_str().to_string());
                }
                rest = &rest[whole.len()..];
            }
            None => {
                return Err(PathError::CouldNotParse {
                    path: block.to_string(),
                })
            }
        }
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokenize_literal_path() {
        let tokens = tokenize("/users/profile").unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Delimiter,
                TokenKind::Fragment,
                TokenKind::Delimiter,
                TokenKind::Fragment,
            ]
        );
    }

    #[test]
    fn test_tokenize_url_param() {
        let tokens = tokenize("/users/:id").unwrap();
        let param = tokens.last().unwrap();
        assert_eq!(param.kind, TokenKind::UrlParam);
        assert_eq!(param.param_name.as_deref(), Some("id"));
        assert_eq!(param.constraint, None);
        assert_eq!(
            param.regex_source.as_deref(),
            Some("([a-zA-Z0-9\\-_.~%':|=+*@$,;]+)")
        );
    }

    #[test]
    fn test_tokenize_url_param_with_constraint() {
        let tokens = tokenize(r"/users/:id<\d+>").unwrap();
        let param = tokens.last().unwrap();
        assert_eq!(param.constraint.as_deref(), Some(r"\d+"));
        assert_eq!(param.regex_source.as_deref(), Some(r"(\d+)"));
    }

    #[test]
    fn test_tokenize_splat() {
        let tokens = tokenize("/*rest").unwrap();
        let splat = tokens.last().unwrap();
        assert_eq!(splat.kind, TokenKind::SplatParam);
        assert_eq!(splat.param_name.as_deref(), Some("rest"));
        assert_eq!(splat.regex_source.as_deref(), Some("([^?]*)"));
    }

    #[test]
    fn test_tokenize_matrix_param() {
        let tokens = tokenize(r"/users;sort<asc|desc>").unwrap();
        let matrix = tokens.last().unwrap();
        assert_eq!(matrix.kind, TokenKind::MatrixParam);
        assert_eq!(matrix.param_name.as_deref(), Some("sort"));
        assert_eq!(matrix.regex_source.as_deref(), Some(";sort=(asc|desc)"));
    }

    #[test]
    fn test_tokenize_sub_delimiters() {
        let tokens = tokenize("/a-b_c.d").unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Delimiter,
                TokenKind::Fragment,
                TokenKind::SubDelimiter,
                TokenKind::Fragment,
                TokenKind::SubDelimiter,
                TokenKind::Fragment,
                TokenKind::SubDelimiter,
                TokenKind::Fragment,
            ]
        );
    }

    #[test]
    fn test_tokenize_rejects_unparsable() {
        let err = tokenize("/users/<oops").unwrap_err();
        assert!(matches!(err, PathError::CouldNotParse { .. }));
    }

    #[test]
    fn test_parse_query_block() {
        let names = parse_query_block("?offset&limit&q").unwrap();
        assert_eq!(names, vec!["offset", "limit", "q"]);
    }

    #[test]
    fn test_parse_query_block_rejects_garbage() {
        assert!(parse_query_block("?offset&<bad>").is_err());
    }
}
