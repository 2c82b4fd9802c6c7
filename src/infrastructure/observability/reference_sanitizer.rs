const MAX_VISIBLE_LENGTH: usize = 120;

const SECRET_PARAMS: [&str; 6] = [
    "signature=",
    "sig=",
    "token=",
    "api_key=",
    "key=",
    "X-Amz-Signature=",
];

/// Sanitizes a source reference (URL or stored path) for logging. Query
/// parameters that carry credentials are redacted and long references are
/// truncated on a char boundary.
pub fn sanitize_reference(reference: &str) -> String {
    let trimmed = reference.trim();

    if trimmed.is_empty() {
        return String::from("[EMPTY]");
    }

    let redacted = redact_secret_params(trimmed);
    let total = redacted.chars().count();
    if total > MAX_VISIBLE_LENGTH {
        let visible: String = redacted.chars().take(MAX_VISIBLE_LENGTH).collect();
        format!("{}... ({} chars total)", visible, total)
    } else {
        redacted
    }
}

fn redact_secret_params(text: &str) -> String {
    let Some((base, query)) = text.split_once('?') else {
        return text.to_string();
    };
    let params: Vec<String> = query
        .split('&')
        .map(|param| {
            match SECRET_PARAMS
                .iter()
                .find(|p| param.to_ascii_lowercase().starts_with(&p.to_ascii_lowercase()))
            {
                Some(prefix) => format!("{}[REDACTED]", &param[..prefix.len()]),
                None => param.to_string(),
            }
        })
        .collect();
    format!("{}?{}", base, params.join("&"))
}
