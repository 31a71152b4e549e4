/// Percent-encoding of parameter values
///
/// Three selectable modes, fixed per compiled pattern:
/// - `Default` percent-encodes but preserves `$ + , ; | :` so common
///   in-segment punctuation survives a build/parse round trip.
/// - `UriComponent` encodes everything outside the RFC 3986 unreserved set.
/// - `None` leaves values untouched both ways.
use serde::{Deserialize, Serialize};

/// Encoding mode for positional/splat/matrix param values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UrlParamsEncoding {
    #[default]
    Default,
    UriComponent,
    None,
}

/// Characters the `Default` mode keeps unencoded on top of the
/// unreserved set
const DEFAULT_PRESERVED: &[char] = &['$', '+', ',', ';', '|', ':'];

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')
}

/// Encodes one param value according to the selected mode
pub fn encode_param(value: &str, encoding: UrlParamsEncoding) -> String {
    match encoding {
        UrlParamsEncoding::None => value.to_string(),
        UrlParamsEncoding::UriComponent => urlencoding::encode(value).into_owned(),
        UrlParamsEncoding::Default => {
            let mut out = String::with_capacity(value.len());
            let mut buf = [0u8; 4];
            for c in value.chars() {
                if is_unreserved(c) || DEFAULT_PRESERVED.contains(&c) {
                    out.push(c);
                } else {
                    out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
                }
            }
            out
        }
    }
}

/// Encodes a splat value per `/`-segment, keeping the separators
pub fn encode_splat(value: &str, encoding: UrlParamsEncoding) -> String {
    value
        .split('/')
        .map(|segment| encode_param(segment, encoding))
        .collect::<Vec<_>>()
        .join("/")
}

/// Decodes a captured param value according to the selected mode
///
/// Malformed percent sequences are left as-is rather than failing the
/// whole match.
pub fn decode_param(value: &str, encoding: UrlParamsEncoding) -> String {
    match encoding {
        UrlParamsEncoding::None => value.to_string(),
        _ => urlencoding::decode(value)
            .map(|cow| cow.into_owned())
            .unwrap_or_else(|_| value.to_string()),
    }
}
