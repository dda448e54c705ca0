//! `Vary` header accumulation.

use http::header::{self, HeaderMap, HeaderValue};

/// Merge `value` into the response's `Vary` header.
///
/// Unlike every other CORS header, `Vary` is combined with whatever is
/// already on the response: tokens are comma-joined and de-duplicated
/// case-insensitively, and an existing `*` swallows everything else.
pub(crate) fn append_vary(headers: &mut HeaderMap, value: HeaderValue) {
    if headers.get(header::VARY).is_none() {
        headers.insert(header::VARY, value);
        return;
    }

    let mut merged = String::new();
    for existing in headers.get_all(header::VARY) {
        match existing.to_str() {
            Ok(existing) => {
                if !merged.is_empty() {
                    merged.push_str(", ");
                }
                merged.push_str(existing);
            }
            Err(_) => {
                // Opaque bytes can't be token-merged; keep them and add a
                // separate entry.
                headers.append(header::VARY, value);
                return;
            }
        }
    }

    let token = match value.to_str() {
        Ok(token) => token.trim(),
        Err(_) => {
            headers.append(header::VARY, value);
            return;
        }
    };

    if merged.split(',').any(|existing| existing.trim() == "*") {
        return;
    }
    if token == "*" {
        headers.insert(header::VARY, HeaderValue::from_static("*"));
        return;
    }
    if merged
        .split(',')
        .any(|existing| existing.trim().eq_ignore_ascii_case(token))
    {
        return;
    }

    merged.push_str(", ");
    merged.push_str(token);
    if let Ok(merged) = HeaderValue::from_str(&merged) {
        headers.insert(header::VARY, merged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vary_of(headers: &HeaderMap) -> &str {
        headers.get(header::VARY).unwrap().to_str().unwrap()
    }

    #[test]
    fn inserts_when_absent() {
        let mut headers = HeaderMap::new();
        append_vary(&mut headers, HeaderValue::from_static("Origin"));
        assert_eq!(vary_of(&headers), "Origin");
    }

    #[test]
    fn appends_to_existing_value() {
        let mut headers = HeaderMap::new();
        headers.insert(header::VARY, HeaderValue::from_static("Foo"));
        append_vary(&mut headers, HeaderValue::from_static("Origin"));
        assert_eq!(vary_of(&headers), "Foo, Origin");
    }

    #[test]
    fn deduplicates_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert(header::VARY, HeaderValue::from_static("origin"));
        append_vary(&mut headers, HeaderValue::from_static("Origin"));
        assert_eq!(vary_of(&headers), "origin");
    }

    #[test]
    fn existing_star_swallows_everything() {
        let mut headers = HeaderMap::new();
        headers.insert(header::VARY, HeaderValue::from_static("*"));
        append_vary(&mut headers, HeaderValue::from_static("Origin"));
        assert_eq!(vary_of(&headers), "*");
    }

    #[test]
    fn star_replaces_existing_tokens() {
        let mut headers = HeaderMap::new();
        headers.insert(header::VARY, HeaderValue::from_static("Foo"));
        append_vary(&mut headers, HeaderValue::from_static("*"));
        assert_eq!(vary_of(&headers), "*");
    }

    #[test]
    fn merges_across_multiple_entries() {
        let mut headers = HeaderMap::new();
        headers.append(header::VARY, HeaderValue::from_static("Foo"));
        headers.append(header::VARY, HeaderValue::from_static("Bar"));
        append_vary(&mut headers, HeaderValue::from_static("Origin"));
        assert_eq!(vary_of(&headers), "Foo, Bar, Origin");
        assert_eq!(headers.get_all(header::VARY).iter().count(), 1);
    }
}
