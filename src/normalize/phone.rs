//! Colombian phone number normalization and WhatsApp deep links.
//!
//! Colombian numbers since the 2021 numbering plan are ten national digits:
//! mobiles start with `3`, landlines with `60` followed by the area digit
//! (`604` Medellín, `601` Bogotá, `605` Caribbean coast, `602` Cali).

/// Country calling code for Colombia.
const COUNTRY_CODE: &str = "57";

/// Normalizes a raw phone string into E.164 (`+57XXXXXXXXXX`).
///
/// Returns `None` for numbers that cannot be dialled from abroad without
/// guessing an area code (legacy seven-digit landlines) or that are not
/// Colombian.
///
/// ```
/// use leadscout_core::normalize::phone::normalize_colombian_phone;
///
/// assert_eq!(normalize_colombian_phone("300 123 4567").as_deref(), Some("+573001234567"));
/// assert_eq!(normalize_colombian_phone("+57 (604) 444-5566").as_deref(), Some("+576044445566"));
/// assert_eq!(normalize_colombian_phone("444 5566"), None);
/// ```
#[must_use]
pub fn normalize_colombian_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    let national = if let Some(rest) = digits.strip_prefix("0057") {
        rest
    } else if digits.len() == 12 && digits.starts_with(COUNTRY_CODE) {
        &digits[2..]
    } else {
        digits.as_str()
    };

    if national.len() != 10 {
        return None;
    }

    let valid = national.starts_with('3') || national.starts_with("60");
    valid.then(|| format!("+{COUNTRY_CODE}{national}"))
}

/// Returns true for normalized Colombian mobile numbers (WhatsApp-capable).
#[must_use]
pub fn is_mobile(e164: &str) -> bool {
    e164.strip_prefix("+57")
        .is_some_and(|national| national.len() == 10 && national.starts_with('3'))
}

/// Builds a `wa.me` link for a normalized mobile number.
///
/// `text` pre-fills the chat message. Landlines return `None` since they
/// cannot receive WhatsApp messages.
#[must_use]
pub fn whatsapp_url(e164: &str, text: Option<&str>) -> Option<String> {
    if !is_mobile(e164) {
        return None;
    }
    let number = e164.trim_start_matches('+');
    Some(match text {
        Some(text) if !text.trim().is_empty() => {
            format!("https://wa.me/{number}?text={}", urlencoding::encode(text))
        }
        _ => format!("https://wa.me/{number}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mobile_formats() {
        for raw in [
            "3001234567",
            "300 123 4567",
            "+57 300 123 4567",
            "57 3001234567",
            "0057 300-123-4567",
            "(+57) 300.123.4567",
        ] {
            assert_eq!(
                normalize_colombian_phone(raw).as_deref(),
                Some("+573001234567"),
                "input {raw}"
            );
        }
    }

    #[test]
    fn test_landline_with_area_code() {
        assert_eq!(
            normalize_colombian_phone("(604) 444 5566").as_deref(),
            Some("+576044445566")
        );
        assert_eq!(
            normalize_colombian_phone("601 7654321").as_deref(),
            Some("+576017654321")
        );
    }

    #[test]
    fn test_rejects_unusable_numbers() {
        assert_eq!(normalize_colombian_phone(""), None);
        assert_eq!(normalize_colombian_phone("444 5566"), None);
        assert_eq!(normalize_colombian_phone("+1 415 555 0100"), None);
        assert_eq!(normalize_colombian_phone("1234567890"), None);
        assert_eq!(normalize_colombian_phone("call us!"), None);
    }

    #[test]
    fn test_is_mobile() {
        assert!(is_mobile("+573001234567"));
        assert!(!is_mobile("+576044445566"));
        assert!(!is_mobile("3001234567"));
    }

    #[test]
    fn test_whatsapp_url_for_mobile_with_text() {
        let url = whatsapp_url("+573001234567", Some("Hola, ¿cómo están?")).unwrap();
        assert!(url.starts_with("https://wa.me/573001234567?text="));
        assert!(!url.contains(' '));
    }

    #[test]
    fn test_whatsapp_url_without_text() {
        assert_eq!(
            whatsapp_url("+573001234567", None).as_deref(),
            Some("https://wa.me/573001234567")
        );
        assert_eq!(
            whatsapp_url("+573001234567", Some("  ")).as_deref(),
            Some("https://wa.me/573001234567")
        );
    }

    #[test]
    fn test_whatsapp_url_rejects_landline() {
        assert_eq!(whatsapp_url("+576044445566", Some("hola")), None);
    }
}
