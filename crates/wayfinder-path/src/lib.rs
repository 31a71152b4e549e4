//! # Wayfinder Path
//!
//! Path template compiler, matcher and builder. A template like
//! `/users/:id<\d+>?tab` compiles into a [`PathPattern`] that can:
//! - strictly match a full candidate path (`strict_parse`)
//! - partially match a delimiter-bounded prefix (`parse`)
//! - build a concrete path back from parameter values (`build`)
//!
//! Supported grammar:
//! - Positional params (`:id`, `:id<\d+>`)
//! - Splat params (`*rest`, greedy up to the query delimiter)
//! - Matrix params (`;sort`, rendered as `;sort=value`)
//! - Declared query params (`?offset&limit`)
//! - Literal fragments and the `! & - _ . ;` sub-delimiters
//!
//! ## Example
//!
//! ```
//! use wayfinder_path::{params, MatchOptions, PathPattern};
//!
//! let pattern = PathPattern::new(r"/users/:id<\d+>?tab").unwrap();
//!
//! let m = pattern
//!     .strict_parse("/users/42?tab=posts", &MatchOptions::default())
//!     .unwrap();
//! assert_eq!(m.params["id"].as_string(), "42");
//! assert_eq!(m.params["tab"].as_string(), "posts");
//!
//! let built = pattern
//!     .build(&params([("id", "42")]), &Default::default())
//!     .unwrap();
//! assert_eq!(built.base, "/users/42");
//! ```

use regex::{Regex, RegexBuilder};
use thiserror::Error;

// ============================================================================
// Module Declarations
// ============================================================================

pub mod encoding;
pub mod params;
pub mod search;
pub mod tokenizer;

pub use encoding::UrlParamsEncoding;
pub use params::{params, ParamValue, Params};
pub use tokenizer::{Token, TokenKind};

use encoding::{decode_param, encode_param, encode_splat};
use search::{build_search, parse_search, split_search};

// ============================================================================
// Errors
// ============================================================================

/// Template compilation errors; always fatal to the call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("could not parse path '{path}'")]
    CouldNotParse { path: String },
    #[error("path templates may not be empty")]
    Empty,
}

/// Path construction errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("cannot build path '{path}': missing parameters {missing:?}")]
    MissingParams { path: String, missing: Vec<String> },
    #[error("cannot build path '{path}': some parameters are of invalid format")]
    InvalidParamFormat { path: String },
}

// ============================================================================
// Options & results
// ============================================================================

/// Options for partial (delimiter-bounded) matching
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub case_sensitive: bool,
}

/// Options for strict (full) matching
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOptions {
    pub case_sensitive: bool,
    pub strict_trailing_slash: bool,
    pub strict_query_params: bool,
}

/// Options for path construction
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub ignore_constraints: bool,
    pub ignore_search: bool,
}

/// A successful match against a compiled pattern
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    /// Positional/splat/matrix values plus declared query values
    pub params: Params,
    /// Query keys the pattern does not declare
    pub remains: Params,
}

/// Result of building a path from parameter values
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltPath {
    /// The URL part, trailing slash included when the template carried one
    pub base: String,
    /// Serialized declared query params, without the leading `?`
    pub query: String,
    /// Input params this pattern did not consume
    pub remaining: Params,
}

impl BuiltPath {
    /// Base and query joined into a full path
    pub fn full(&self) -> String {
        if self.query.is_empty() {
            self.base.clone()
        } else {
            format!("{}?{}", self.base, self.query)
        }
    }
}

// ============================================================================
// PathPattern
// ============================================================================

/// A compiled path template
///
/// Immutable after compilation; matching and building are pure functions
/// of the pattern and their arguments.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// Normalized template (leading slash enforced, trailing slash stripped)
    path: String,
    tokens: Vec<Token>,
    /// Concatenated URL-matching sub-expressions of all tokens
    source: String,
    url_params: Vec<String>,
    splat_params: Vec<String>,
    matrix_params: Vec<String>,
    query_params: Vec<String>,
    /// Capturing params in token order (positional, splat and matrix)
    capture_params: Vec<String>,
    has_trailing_slash: bool,
    encoding: UrlParamsEncoding,
}

impl PathPattern {
    /// Compiles a template with the default encoding mode
    pub fn new(template: &str) -> Result<Self, PathError> {
        Self::with_encoding(template, UrlParamsEncoding::Default)
    }

    /// Compiles a template with an explicit param encoding mode
    pub fn with_encoding(
        template: &str,
        encoding: UrlParamsEncoding,
    ) -> Result<Self, PathError> {
        if template.is_empty() {
            return Err(PathError::Empty);
        }

        let mut template = template.to_string();
        if !template.starts_with('/') {
            tracing::warn!(path = %template, "path template should start with '/', correcting");
            template.insert(0, '/');
        }

        // Query declaration block is split off before tokenizing the URL part
        let (url_part, query_block) = split_query_block(&template);
        let query_params = if query_block.is_empty() {
            Vec::new()
        } else {
            tokenizer::parse_query_block(query_block)?
        };

        // Trailing slash is a pattern flag, not a token
        let (url_part, has_trailing_slash) = if url_part.len() > 1 && url_part.ends_with('/') {
            (&url_part[..url_part.len() - 1], true)
        } else {
            (url_part, false)
        };

        let tokens = tokenizer::tokenize(url_part)?;

        let mut url_params = Vec::new();
        let mut splat_params = Vec::new();
        let mut matrix_params = Vec::new();
        let mut capture_params = Vec::new();
        for token in &tokens {
            let Some(name) = token.param_name.clone() else {
                continue;
            };
            match token.kind {
                TokenKind::UrlParam => url_params.push(name.clone()),
                TokenKind::SplatParam => splat_params.push(name.clone()),
                TokenKind::MatrixParam => matrix_params.push(name.clone()),
                _ => continue,
            }
            capture_params.push(name);
        }

        let source: String = tokens
            .iter()
            .filter_map(|t| t.regex_source.as_deref())
            .collect();

        let pattern = Self {
            path: template,
            tokens,
            source,
            url_params,
            splat_params,
            matrix_params,
            query_params,
            capture_params,
            has_trailing_slash,
            encoding,
        };

        // Surface invalid user constraints at compile time
        if compile_regex(&format!("^{}$", pattern.source), true).is_none() {
            return Err(PathError::CouldNotParse {
                path: pattern.path.clone(),
            });
        }

        Ok(pattern)
    }

    /// The normalized template this pattern was compiled from
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Concatenated URL-matching source; unique per sibling in a route tree
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn url_params(&self) -> &[String] {
        &self.url_params
    }

    pub fn splat_params(&self) -> &[String] {
        &self.splat_params
    }

    pub fn matrix_params(&self) -> &[String] {
        &self.matrix_params
    }

    pub fn query_params(&self) -> &[String] {
        &self.query_params
    }

    pub fn has_trailing_slash(&self) -> bool {
        self.has_trailing_slash
    }

    pub fn has_splat(&self) -> bool {
        !self.splat_params.is_empty()
    }

    pub fn is_query_param(&self, name: &str) -> bool {
        self.query_params.iter().any(|q| q == name)
    }

    /// Strict parse: the whole candidate must be consumed
    ///
    /// Fails unless the leftover path portion is exactly empty, or a lone
    /// `/` tolerated by the trailing-slash rules. In strict query mode any
    /// undeclared leftover query key also fails the match.
    pub fn strict_parse(&self, candidate: &str, options: &MatchOptions) -> Option<PatternMatch> {
        let (url_part, search) = split_search(candidate);

        let mut source = format!("^{}", self.source);
        if options.strict_trailing_slash {
            if self.has_trailing_slash {
                source.push_str("/$");
            } else {
                source.push('$');
            }
        } else {
            source.push_str("/?$");
        }

        let regex = compile_regex(&source, options.case_sensitive)?;
        let mut result = self.capture(&regex, url_part)?;
        self.classify_search(search, &mut result);

        if options.strict_query_params && !result.remains.is_empty() {
            return None;
        }

        Some(result)
    }

    /// Partial parse: matches a delimiter-bounded prefix of the candidate
    ///
    /// The matcher is anchored at the start and extended to a natural
    /// delimiter boundary (`/`, `?`, `.`, `;` or end) unless the pattern's
    /// own source already ends in one. This keeps a literal `/user` from
    /// prefix-matching `/username`.
    pub fn parse(&self, candidate: &str, options: &ParseOptions) -> Option<PatternMatch> {
        let (url_part, search) = split_search(candidate);

        let mut source = format!("^{}", self.source);
        if !self.ends_with_delimiter() {
            source.push_str(r"(?:/|\?|\.|;|$)");
        }

        let regex = compile_regex(&source, options.case_sensitive)?;
        let mut result = self.capture(&regex, url_part)?;
        self.classify_search(search, &mut result);

        Some(result)
    }

    /// Builds a concrete path from parameter values
    pub fn build(&self, params: &Params, options: &BuildOptions) -> Result<BuiltPath, BuildError> {
        // 1. Encode every non-query param value
        let mut encoded: std::collections::HashMap<&str, String> = Default::default();
        for (name, value) in params {
            if self.is_query_param(name) {
                continue;
            }
            let raw = value.as_string();
            let enc = if self.splat_params.iter().any(|s| s == name) {
                encode_splat(&raw, self.encoding)
            } else {
                encode_param(&raw, self.encoding)
            };
            encoded.insert(name.as_str(), enc);
        }

        // 2. Every positional and splat param must be provided
        let missing: Vec<String> = self
            .url_params
            .iter()
            .chain(self.splat_params.iter())
            .filter(|name| !params.contains_key(*name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingParams {
                path: self.path.clone(),
                missing,
            });
        }

        // 3. Constraint validation on positional params, anchored full-match
        if !options.ignore_constraints {
            for token in &self.tokens {
                if token.kind != TokenKind::UrlParam {
                    continue;
                }
                let name = token.param_name.as_deref().unwrap_or_default();
                let Some(value) = encoded.get(name) else {
                    continue;
                };
                let class = token
                    .constraint
                    .as_deref()
                    .unwrap_or(tokenizer::DEFAULT_PARAM_CLASS);
                let constraint = compile_regex(&format!("^(?:{class})$"), true);
                let passed = constraint.map(|re| re.is_match(value)).unwrap_or(false);
                if !passed {
                    return Err(BuildError::InvalidParamFormat {
                        path: self.path.clone(),
                    });
                }
            }
        }

        // 4. Token-ordered substitution
        let mut base = String::new();
        for token in &self.tokens {
            match token.kind {
                TokenKind::QueryParam => {}
                TokenKind::MatrixParam => {
                    let name = token.param_name.as_deref().unwrap_or_default();
                    let value = encoded.get(name).map(String::as_str).unwrap_or_default();
                    base.push_str(&format!(";{name}={value}"));
                }
                TokenKind::UrlParam | TokenKind::SplatParam => {
                    let name = token.param_name.as_deref().unwrap_or_default();
                    base.push_str(encoded.get(name).map(String::as_str).unwrap_or_default());
                }
                _ => base.push_str(&token.matched),
            }
        }
        if self.has_trailing_slash {
            base.push('/');
        }

        // 5. Declared-and-present query params
        let query = if options.ignore_search {
            String::new()
        } else {
            build_search(
                self.query_params
                    .iter()
                    .filter_map(|name| params.get_key_value(name))
                    .map(|(k, v)| (k.as_str(), v)),
                self.encoding,
            )
        };

        // 6. Leftovers flow down to the next pattern in a chain
        let mut remaining = params.clone();
        for name in &self.capture_params {
            remaining.remove(name);
        }
        if !options.ignore_search {
            for name in &self.query_params {
                remaining.remove(name);
            }
        }

        Ok(BuiltPath {
            base,
            query,
            remaining,
        })
    }

    fn ends_with_delimiter(&self) -> bool {
        matches!(
            self.tokens.last().map(|t| t.kind),
            Some(TokenKind::Delimiter) | Some(TokenKind::SubDelimiter)
        )
    }

    /// Runs the regex and decodes captures into params, in declared order
    fn capture(&self, regex: &Regex, url_part: &str) -> Option<PatternMatch> {
        let caps = regex.captures(url_part)?;
        let mut params = Params::new();
        for (index, name) in self.capture_params.iter().enumerate() {
            let value = caps.get(index + 1).map(|m| m.as_str()).unwrap_or_default();
            params.insert(
                name.clone(),
                ParamValue::Str(decode_param(value, self.encoding)),
            );
        }
        Some(PatternMatch {
            params,
            remains: Params::new(),
        })
    }

    /// Splits query keys into declared (merged into params) vs undeclared
    fn classify_search(&self, search: &str, result: &mut PatternMatch) {
        for (key, value) in parse_search(search, self.encoding) {
            if self.is_query_param(&key) {
                result.params.insert(key, value);
            } else {
                result.remains.insert(key, value);
            }
        }
    }
}

/// Splits a template at the start of its query declaration block
///
/// The first `?` outside a `<...>` constraint starts the block.
fn split_query_block(template: &str) -> (&str, &str) {
    let mut depth = 0usize;
    for (index, c) in template.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            '?' if depth == 0 => return (&template[..index], &template[index..]),
            _ => {}
        }
    }
    (template, "")
}

fn compile_regex(source: &str, case_sensitive: bool) -> Option<Regex> {
    RegexBuilder::new(source)
        .case_insensitive(!case_sensitive)
        .build()
        .ok()
}
