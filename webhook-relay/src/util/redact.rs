//! Log-safe renderings of customer data and request bodies.

/// Mask an email for logging: keep the first character of the local part and
/// the full domain.
///
/// "ada@example.com" becomes "a***@example.com".
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, domain)
        }
        None => "***".to_string(),
    }
}

/// Lossy UTF-8 preview of at most `max_chars` characters.
pub fn preview(bytes: &[u8], max_chars: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("ada@example.com"), "a***@example.com");
        assert_eq!(mask_email("@example.com"), "***@example.com");
        assert_eq!(mask_email("no-at-sign"), "***");
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview(b"hello world", 5), "hello...");
        assert_eq!(preview(b"short", 10), "short");
    }

    #[test]
    fn test_preview_multibyte_boundary() {
        let text = "héllo".as_bytes();
        assert_eq!(preview(text, 2), "hé...");
    }

    #[test]
    fn test_preview_invalid_utf8() {
        let out = preview(&[0x66, 0xff, 0x6f], 10);
        assert!(out.starts_with('f'));
        assert!(out.ends_with('o'));
    }
}
