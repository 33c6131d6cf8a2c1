//! Invite code generation and validation.
//!
//! Codes are always 9 uppercase alphanumeric characters: a 1-6 char
//! prefix (default `INV`) plus enough random characters to pad the
//! total to 9. Generation is pure; persistence and collision handling
//! belong to the caller.

use rand::Rng;

/// Total length of every invite code.
pub const CODE_LEN: usize = 9;

/// Prefix used when no custom prefix is supplied.
pub const DEFAULT_PREFIX: &str = "INV";

/// Maximum length of a custom prefix.
pub const MAX_PREFIX_LEN: usize = 6;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate an invite code from an optional custom prefix.
///
/// The prefix is uppercased and truncated to [`MAX_PREFIX_LEN`]
/// characters (not bytes, so multi-byte input cannot split a char);
/// the random suffix pads the code to [`CODE_LEN`] characters. Uses a
/// real RNG per call so concurrent requests cannot replay one
/// another's suffixes.
pub fn generate(custom_prefix: &str) -> String {
    let prefix: String = if custom_prefix.is_empty() {
        DEFAULT_PREFIX.to_string()
    } else {
        // Uppercase first: case mapping can expand one char into two
        // ("ß" -> "SS"), and the truncation has to bound the result.
        custom_prefix
            .to_uppercase()
            .chars()
            .take(MAX_PREFIX_LEN)
            .collect()
    };

    let random_chars = CODE_LEN - prefix.chars().count();
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(CODE_LEN);
    code.push_str(&prefix);
    for _ in 0..random_chars {
        code.push(CHARSET[rng.gen_range(0..CHARSET.len())] as char);
    }

    code
}

/// Validate an admin-supplied custom prefix.
///
/// Returns the itemized list of violated rules so the caller can
/// surface every problem at once instead of one per round trip.
pub fn validate_prefix(prefix: &str) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if prefix.is_empty() {
        errors.push("Invite code is required".to_string());
        return Err(errors);
    }

    if prefix.len() > MAX_PREFIX_LEN {
        errors.push(format!(
            "Custom invite code must be between 1 and {MAX_PREFIX_LEN} characters long"
        ));
    }

    if !prefix
        .bytes()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    {
        errors.push("Invite code can only contain uppercase letters and numbers".to_string());
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Parse a user-entered invite code: uppercase it and require the full
/// 9-character grammar.
pub fn parse_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_uppercase();
    if code.len() != CODE_LEN {
        return None;
    }
    if !code
        .bytes()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    {
        return None;
    }
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid_code(code: &str, prefix: &str) {
        assert_eq!(code.len(), CODE_LEN, "code {code} has wrong length");
        assert!(code.starts_with(prefix), "code {code} missing prefix {prefix}");
        assert!(
            code.bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()),
            "code {code} outside charset"
        );
    }

    #[test]
    fn test_default_prefix() {
        for _ in 0..50 {
            assert_valid_code(&generate(""), DEFAULT_PREFIX);
        }
    }

    #[test]
    fn test_custom_prefix_lengths() {
        assert_valid_code(&generate("ABC"), "ABC");
        assert_valid_code(&generate("ABCDEF"), "ABCDEF");
        // Longer prefixes are truncated to 6
        assert_valid_code(&generate("ABCDEFGH"), "ABCDEF");
        // Lowercase input is normalized
        assert_valid_code(&generate("abc"), "ABC");
    }

    #[test]
    fn test_multibyte_prefix_truncates_by_characters() {
        // Byte index 6 falls inside the two-byte 'É'; truncation must
        // count characters, not bytes.
        let code = generate("ABCDEÉXY");
        assert_eq!(code.chars().count(), CODE_LEN);
        assert!(code.starts_with("ABCDEÉ"));

        let code = generate("ééééééé");
        assert_eq!(code.chars().count(), CODE_LEN);
        assert!(code.starts_with("ÉÉÉÉÉÉ"));

        // Case-expanding input stays bounded by the character cap.
        let code = generate("ßßßßßßß");
        assert_eq!(code.chars().count(), CODE_LEN);
        assert!(code.starts_with("SSSSSS"));
    }

    #[test]
    fn test_codes_vary_between_calls() {
        let codes: std::collections::HashSet<String> = (0..20).map(|_| generate("")).collect();
        assert!(codes.len() > 1, "generator returned a constant code");
    }

    #[test]
    fn test_validate_prefix_itemizes_errors() {
        assert!(validate_prefix("ABC123").is_ok());

        let errors = validate_prefix("").unwrap_err();
        assert_eq!(errors, vec!["Invite code is required".to_string()]);

        // Too long AND bad charset reports both rules
        let errors = validate_prefix("abcdefgh").unwrap_err();
        assert_eq!(errors.len(), 2);

        let errors = validate_prefix("ab").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("uppercase"));
    }

    #[test]
    fn test_parse_code() {
        assert_eq!(parse_code(" invabc123 "), Some("INVABC123".to_string()));
        assert_eq!(parse_code("SHORT"), None);
        assert_eq!(parse_code("INV-BC123"), None);
        assert_eq!(parse_code("INVABC1234"), None);
    }
}
