//! Translation of GraphQL field requests into OData URLs.
//!
//! GraphQL names cannot carry `$`, so every name with a leading underscore stands for the OData
//! name with a leading `$`: `_top` is `$top`, `_value` is `$value`. Arguments named that way are
//! system query options and go into the query string; other arguments are passed in function
//! call syntax, `Name(key='value',other=1)`.

use indexmap::IndexMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything but the unreserved characters, and the quotes of OData string literals, is
/// percent-encoded.
const ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'\'');

/// Whether a segment is called like a function even without arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStyle {
    /// Parentheses only when there are function-style arguments.
    Segment,
    /// Always parentheses, e.g. `GetFavoriteAirline()`.
    Function,
}

/// The URL of `key` under `resource`.
///
/// `select` lists the properties to request with `$select`; it is appended after the other
/// query options, together with `id`.
pub fn translate(
    resource: &str,
    key: &str,
    parameters: &IndexMap<String, serde_json::Value>,
    call: CallStyle,
    select: Option<&[String]>,
) -> String {
    let mut url = format!("{}/{}", resource.trim_end_matches('/'), odata_name(key));

    let (system, named): (Vec<_>, Vec<_>) = parameters
        .iter()
        .filter(|(_, value)| !value.is_null())
        .partition(|(name, _)| name.starts_with('_'));

    if call == CallStyle::Function || !named.is_empty() {
        let arguments: Vec<String> = named
            .iter()
            .map(|(name, value)| format!("{}={}", encode(name), function_literal(value)))
            .collect();
        url.push('(');
        url.push_str(&arguments.join(","));
        url.push(')');
    }

    let mut options: Vec<String> = system
        .iter()
        .map(|(name, value)| format!("{}={}", odata_name(name), option_value(value)))
        .collect();
    if let Some(select) = select {
        let mut properties: Vec<&str> = Vec::with_capacity(select.len() + 1);
        for property in select.iter().map(String::as_str).chain(["id"]) {
            if !properties.contains(&property) {
                properties.push(property);
            }
        }
        let properties: Vec<String> = properties.into_iter().map(encode).collect();
        options.push(format!("$select={}", properties.join(",")));
    }
    if !options.is_empty() {
        url.push('?');
        url.push_str(&options.join("&"));
    }
    url
}

/// `_name` → `$name`, encoded.
fn odata_name(name: &str) -> String {
    match name.strip_prefix('_') {
        Some(system) => format!("${}", encode(system)),
        None => encode(name),
    }
}

fn encode(text: &str) -> String {
    utf8_percent_encode(text, ENCODE).to_string()
}

/// A system query option value: strings as they are, everything else as JSON.
fn option_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => encode(text),
        other => encode(&other.to_string()),
    }
}

/// A function argument literal: strings single-quoted, with quotes doubled.
fn function_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => format!("'{}'", encode(&text.replace('\'', "''"))),
        other => encode(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parameters(value: serde_json::Value) -> IndexMap<String, serde_json::Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn system_options_become_the_query_string() {
        let url = translate(
            "http://localhost/odata/",
            "People",
            &parameters(serde_json::json!({"_top": 5, "_filter": "Name eq 'A'", "_count": true})),
            CallStyle::Segment,
            None,
        );
        assert_eq!(
            url,
            "http://localhost/odata/People?$top=5&$filter=Name%20eq%20'A'&$count=true"
        );
    }

    #[test]
    fn select_comes_last_and_includes_id() {
        let select = vec!["Name".to_string(), "id".to_string(), "Breed".to_string()];
        let url = translate(
            "http://localhost",
            "Animals",
            &parameters(serde_json::json!({"_orderby": "Name desc"})),
            CallStyle::Segment,
            Some(&select),
        );
        assert_eq!(
            url,
            "http://localhost/Animals?$orderby=Name%20desc&$select=Name,id,Breed"
        );
    }

    #[test]
    fn named_arguments_use_function_syntax() {
        let url = translate(
            "http://localhost/People('russell')",
            "GetFriendsTrips",
            &parameters(serde_json::json!({"userName": "O'Brien", "limit": 3, "_top": 1})),
            CallStyle::Function,
            None,
        );
        assert_eq!(
            url,
            "http://localhost/People('russell')/GetFriendsTrips(userName='O''Brien',limit=3)?$top=1"
        );

        let url = translate(
            "http://localhost/Me",
            "GetFavoriteAirline",
            &IndexMap::new(),
            CallStyle::Function,
            None,
        );
        assert_eq!(url, "http://localhost/Me/GetFavoriteAirline()");
    }

    #[test]
    fn raw_value_and_null_arguments() {
        let url = translate(
            "http://localhost/Photos/1",
            "_value",
            &parameters(serde_json::json!({"_skip": null})),
            CallStyle::Segment,
            None,
        );
        assert_eq!(url, "http://localhost/Photos/1/$value");
    }
}
