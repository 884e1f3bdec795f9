use serde::Serializer;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// `****` followed by the last four characters of `value`. The length of the original is not revealed.
pub fn mask_tail(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let hidden = chars.len().saturating_sub(4);
    let tail: String = chars[hidden..].iter().collect();
    format!("****{tail}")
}

/// serde helper for account numbers and other identifiers that should only ever leave the server masked.
pub fn serialize_masked<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where S: Serializer {
    match value {
        Some(v) => serializer.serialize_some(&mask_tail(v)),
        None => serializer.serialize_none(),
    }
}
