/// Query-string parsing and serialization
///
/// Repeated keys fold into a list value, a bare key becomes a `true`
/// flag, and `false` flags are omitted when serializing.
use crate::encoding::{decode_param, encode_param, UrlParamsEncoding};
use crate::params::{ParamValue, Params};

/// Splits a candidate string into its path part and its search part
///
/// The search part excludes the leading `?` and is empty when absent.
pub fn split_search(candidate: &str) -> (&str, &str) {
    match candidate.split_once('?') {
        Some((path, search)) => (path, search),
        None => (candidate, ""),
    }
}

/// Parses a search string (`a=1&b&c=2&c=3`) into params
pub fn parse_search(search: &str, encoding: UrlParamsEncoding) -> Params {
    let mut params = Params::new();

    for chunk in search.split('&').filter(|c| !c.is_empty()) {
        let (raw_key, value) = match chunk.split_once('=') {
            Some((k, v)) => (k, Some(decode_param(v, encoding))),
            None => (chunk, None),
        };
        let key = decode_param(raw_key, encoding);

        match value {
            None => {
                params.insert(key, ParamValue::Bool(true));
            }
            Some(value) => match params.remove(&key) {
                Some(ParamValue::List(mut items)) => {
                    items.push(value);
                    params.insert(key, ParamValue::List(items));
                }
                Some(ParamValue::Str(prev)) => {
                    params.insert(key, ParamValue::List(vec![prev, value]));
                }
                _ => {
                    params.insert(key, ParamValue::Str(value));
                }
            },
        }
    }

    params
}

/// Serializes `(name, value)` pairs into a search string, in input order
pub fn build_search<'a, I>(pairs: I, encoding: UrlParamsEncoding) -> String
where
    I: IntoIterator<Item = (&'a str, &'a ParamValue)>,
{
    let mut parts = Vec::new();

    for (name, value) in pairs {
        let key = encode_param(name, encoding);
        match value {
            ParamValue::Bool(true) => parts.push(key),
            ParamValue::Bool(false) => {}
            ParamValue::Str(s) => parts.push(format!("{key}={}", encode_param(s, encoding))),
            ParamValue::List(items) => {
                for item in items {
                    parts.push(format!("{key}={}", encode_param(item, encoding)));
                }
            }
        }
    }

    parts.join("&")
}

/// Removes the given keys from a raw search string, preserving the rest
///
/// Operates on the undecoded chunks so unrelated keys keep their exact
/// original spelling.
pub fn omit_keys(search: &str, keys: &[String], encoding: UrlParamsEncoding) -> String {
    search
        .split('&')
        .filter(|chunk| !chunk.is_empty())
        .filter(|chunk| {
            let raw_key = chunk.split_once('=').map(|(k, _)| k).unwrap_or(chunk);
            let key = decode_param(raw_key, encoding);
            !keys.contains(&key)
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_search() {
        assert_eq!(split_search("/users?limit=5"), ("/users", "limit=5"));
        assert_eq!(split_search("/users"), ("/users", ""));
    }

    #[test]
    fn test_parse_search_scalars_and_flags() {
        let params = parse_search("q=rust&draft", UrlParamsEncoding::Default);
        assert_eq!(params["q"], ParamValue::from("rust"));
        assert_eq!(params["draft"], ParamValue::Bool(true));
    }

    #[test]
    fn test_parse_search_repeated_keys_fold_into_list() {
        let params = parse_search("tag=a&tag=b&tag=c", UrlParamsEncoding::Default);
        assert_eq!(
            params["tag"],
            ParamValue::List(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn test_build_search_order_and_lists() {
        let tags = ParamValue::List(vec!["a".into(), "b".into()]);
        let flag = ParamValue::Bool(true);
        let off = ParamValue::Bool(false);
        let built = build_search(
            [("tag", &tags), ("draft", &flag), ("hidden", &off)],
            UrlParamsEncoding::Default,
        );
        assert_eq!(built, "tag=a&tag=b&draft");
    }

    #[test]
    fn test_omit_keys() {
        let remaining = omit_keys(
            "limit=5&offset=2&q=x",
            &["limit".to_string(), "q".to_string()],
            UrlParamsEncoding::Default,
        );
        assert_eq!(remaining, "offset=2");
    }
}
