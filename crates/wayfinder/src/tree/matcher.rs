//! Top-down path matching against the route tree
//!
//! Walks one sibling set at a time in priority order. Each node consumes
//! a delimiter-bounded prefix of the candidate; the consumed prefix is
//! recomputed by building the node's pattern back from the extracted
//! params rather than trusting raw match lengths. Once a node has
//! consumed part of the path the walk commits to its subtree; there is
//! no backtracking across siblings.

use wayfinder_path::search::{omit_keys, parse_search, split_search};
use wayfinder_path::{BuildOptions, Params, ParseOptions};

use super::{NodeId, QueryParamsMode, RouteTree};

/// Options for matching a full path against the tree
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeMatchOptions {
    pub case_sensitive: bool,
    pub strict_trailing_slash: bool,
    pub query_params_mode: QueryParamsMode,
}

/// A successful tree match
#[derive(Debug, Clone)]
pub struct TreeMatch {
    /// Matched nodes, root to leaf
    pub chain: Vec<NodeId>,
    /// Params accumulated along the chain, query params included
    pub params: Params,
}

/// Matches a candidate path against the tree, deepest node wins
pub fn match_path(tree: &RouteTree, path: &str, options: &TreeMatchOptions) -> Option<TreeMatch> {
    let (path_part, search) = split_search(path);
    let path_part = if path_part.is_empty() {
        if options.strict_trailing_slash {
            return None;
        }
        "/"
    } else {
        path_part
    };

    let mut chain: Vec<NodeId> = Vec::new();
    let mut params = Params::new();
    let mut remaining_path = path_part.to_string();
    let mut remaining_search = search.to_string();
    let mut candidates = tree.node(RouteTree::ROOT).children.clone();

    'walk: while !candidates.is_empty() {
        let current = std::mem::take(&mut candidates);
        for id in current {
            let node = tree.node(id);
            let Some(pattern) = &node.pattern else {
                continue;
            };

            let candidate = if remaining_search.is_empty() {
                remaining_path.clone()
            } else {
                format!("{remaining_path}?{remaining_search}")
            };
            let Some(m) = pattern.parse(
                &candidate,
                &ParseOptions {
                    case_sensitive: options.case_sensitive,
                },
            ) else {
                continue;
            };

            // Consumed prefix, recomputed from the extracted params
            let Ok(built) = pattern.build(
                &m.params,
                &BuildOptions {
                    ignore_search: true,
                    ignore_constraints: true,
                },
            ) else {
                continue;
            };
            let mut consumed = built.base;
            if !options.strict_trailing_slash
                && !pattern.has_splat()
                && consumed.len() > 1
                && consumed.ends_with('/')
            {
                consumed.pop();
            }
            if !consumed_matches(&remaining_path, &consumed, options.case_sensitive) {
                continue;
            }

            // Commit to this node
            chain.push(id);
            params.extend(m.params);
            let mut rest = remaining_path
                .get(consumed.len()..)
                .unwrap_or_default()
                .to_string();
            remaining_search =
                omit_keys(&remaining_search, pattern.query_params(), tree.encoding());

            // A lone leftover slash is the candidate's trailing slash
            if !options.strict_trailing_slash && rest == "/" && !consumed.ends_with('/') {
                rest.clear();
            }

            if rest.is_empty() {
                if remaining_search.is_empty() {
                    return Some(TreeMatch { chain, params });
                }
                if options.query_params_mode != QueryParamsMode::Strict {
                    params.extend(parse_search(&remaining_search, tree.encoding()));
                    return Some(TreeMatch { chain, params });
                }
                // Strict mode: leftover keys may still be declared deeper down
            }

            if node.children.is_empty() {
                return None;
            }
            if rest.is_empty() {
                // Children all start with a slash; restore it for descent
                rest.push('/');
            }
            remaining_path = rest;
            candidates = node.children.clone();
            continue 'walk;
        }
        return None;
    }

    None
}

/// Case-aware prefix check of the candidate against the rebuilt segment
fn consumed_matches(path: &str, consumed: &str, case_sensitive: bool) -> bool {
    let Some(prefix) = path.get(..consumed.len()) else {
        return false;
    };
    if case_sensitive {
        prefix == consumed
    } else {
        prefix.eq_ignore_ascii_case(consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::RouteDefinition;
    use pretty_assertions::assert_eq;
    use wayfinder_path::ParamValue;

    fn demo_tree() -> RouteTree {
        let mut tree = RouteTree::new();
        tree.add_all(vec![
            RouteDefinition::new("home", "/"),
            RouteDefinition::new("users", "/users")
                .with_child(RouteDefinition::new("view", "/:id<\\d+>"))
                .with_child(RouteDefinition::new("list", "/list")),
            RouteDefinition::new("docs", "/docs/*slug"),
            RouteDefinition::new("search", "/search?q&page"),
        ])
        .unwrap();
        tree
    }

    fn matched_name(tree: &RouteTree, path: &str) -> Option<String> {
        match_path(tree, path, &TreeMatchOptions::default())
            .map(|m| tree.full_name(*m.chain.last().unwrap()))
    }

    #[test]
    fn test_match_root() {
        let tree = demo_tree();
        assert_eq!(matched_name(&tree, "/"), Some("home".to_string()));
    }

    #[test]
    fn test_match_nested_chain() {
        let tree = demo_tree();
        let m = match_path(&tree, "/users/42", &TreeMatchOptions::default()).unwrap();
        assert_eq!(tree.full_name(*m.chain.last().unwrap()), "users.view");
        assert_eq!(m.params["id"], ParamValue::from("42"));
    }

    #[test]
    fn test_parent_matches_without_descending() {
        let tree = demo_tree();
        assert_eq!(matched_name(&tree, "/users"), Some("users".to_string()));
    }

    #[test]
    fn test_literal_sibling_beats_param_sibling() {
        let tree = demo_tree();
        assert_eq!(matched_name(&tree, "/users/list"), Some("users.list".to_string()));
    }

    #[test]
    fn test_constraint_rejects_candidate() {
        let tree = demo_tree();
        assert_eq!(matched_name(&tree, "/users/thomas"), None);
    }

    #[test]
    fn test_splat_consumes_across_segments() {
        let tree = demo_tree();
        let m = match_path(&tree, "/docs/guide/intro", &TreeMatchOptions::default()).unwrap();
        assert_eq!(m.params["slug"], ParamValue::from("guide/intro"));
    }

    #[test]
    fn test_trailing_slash_tolerated_by_default() {
        let tree = demo_tree();
        assert_eq!(matched_name(&tree, "/users/"), Some("users".to_string()));
        assert_eq!(matched_name(&tree, "/users/42/"), Some("users.view".to_string()));
    }

    #[test]
    fn test_trailing_slash_strict() {
        let tree = demo_tree();
        let strict = TreeMatchOptions {
            strict_trailing_slash: true,
            ..Default::default()
        };
        assert!(match_path(&tree, "/users", &strict).is_some());
        assert!(match_path(&tree, "/users/", &strict).is_none());
    }

    #[test]
    fn test_declared_query_params_captured() {
        let tree = demo_tree();
        let m = match_path(&tree, "/search?q=rust&page=2", &TreeMatchOptions::default()).unwrap();
        assert_eq!(m.params["q"], ParamValue::from("rust"));
        assert_eq!(m.params["page"], ParamValue::from("2"));
    }

    #[test]
    fn test_undeclared_query_params_default_mode() {
        let tree = demo_tree();
        let m = match_path(&tree, "/search?q=rust&debug=1", &TreeMatchOptions::default()).unwrap();
        assert_eq!(m.params["debug"], ParamValue::from("1"));
    }

    #[test]
    fn test_undeclared_query_params_strict_mode() {
        let tree = demo_tree();
        let strict = TreeMatchOptions {
            query_params_mode: QueryParamsMode::Strict,
            ..Default::default()
        };
        assert!(match_path(&tree, "/search?q=rust", &strict).is_some());
        assert!(match_path(&tree, "/search?q=rust&debug=1", &strict).is_none());
    }

    #[test]
    fn test_no_prefix_bleed_into_longer_literal() {
        let mut tree = RouteTree::new();
        tree.add(RouteDefinition::new("user", "/user")).unwrap();
        assert_eq!(matched_name(&tree, "/username"), None);
    }

    #[test]
    fn test_case_sensitivity() {
        let tree = demo_tree();
        assert_eq!(matched_name(&tree, "/Users"), Some("users".to_string()));

        let sensitive = TreeMatchOptions {
            case_sensitive: true,
            ..Default::default()
        };
        assert!(match_path(&tree, "/Users", &sensitive).is_none());
    }

    #[test]
    fn test_absolute_route_matches_from_root() {
        let mut tree = RouteTree::new();
        tree.add(
            RouteDefinition::new("admin", "/admin")
                .with_child(RouteDefinition::new("login", "/login").absolute()),
        )
        .unwrap();

        assert_eq!(matched_name(&tree, "/login"), Some("login".to_string()));
    }

    #[test]
    fn test_no_backtracking_once_committed() {
        let mut tree = RouteTree::new();
        tree.add(RouteDefinition::new("users", "/users")
            .with_child(RouteDefinition::new("view", "/:id<\\d+>")))
            .unwrap();
        tree.add(RouteDefinition::new("fallback", "/*rest")).unwrap();

        // `/users/abc` commits to `users`, fails its children and does not
        // fall back to the splat sibling
        assert_eq!(matched_name(&tree, "/users/abc"), None);
        assert_eq!(matched_name(&tree, "/other/abc"), Some("fallback".to_string()));
    }

    #[test]
    fn test_matrix_param_in_tree() {
        let mut tree = RouteTree::new();
        tree.add(RouteDefinition::new("items", "/items;sort")).unwrap();

        let m = match_path(&tree, "/items;sort=asc", &TreeMatchOptions::default()).unwrap();
        assert_eq!(m.params["sort"], ParamValue::from("asc"));
    }
}
