//! Hardware address recognition.
//!
//! An identifier is address-form when it is 12 hex digits, either packed or
//! grouped in pairs with a consistent `:` or `-` separator. Anything else is
//! treated as an exact device name.

use once_cell::sync::Lazy;
use regex::Regex;

static ADDRESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{2}([0-9A-Fa-f]{10}|(-[0-9A-Fa-f]{2}){5}|(:[0-9A-Fa-f]{2}){5})$")
        .expect("address pattern is valid")
});

/// Whether `identifier` looks like a hardware address
pub fn is_address(identifier: &str) -> bool {
    ADDRESS_PATTERN.is_match(identifier)
}

/// Drop `:` and `-` separators
pub fn strip_separators(address: &str) -> String {
    address.chars().filter(|c| *c != ':' && *c != '-').collect()
}

/// Uppercase, colon-separated form used to compare addresses.
/// Returns `None` when the input is not address-form.
pub fn canonical(address: &str) -> Option<String> {
    if !is_address(address) {
        return None;
    }

    let packed = strip_separators(address).to_ascii_uppercase();
    let pairs: Vec<&str> = packed
        .as_bytes()
        .chunks(2)
        .filter_map(|pair| std::str::from_utf8(pair).ok())
        .collect();
    Some(pairs.join(":"))
}

/// Two address strings refer to the same hardware address
pub fn same_address(a: &str, b: &str) -> bool {
    match (canonical(a), canonical(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_forms() {
        assert!(is_address("AA:BB:CC:DD:EE:FF"));
        assert!(is_address("aa-bb-cc-dd-ee-ff"));
        assert!(is_address("AABBCCDDEEFF"));
        assert!(is_address("0a1B2c3D4e5F"));
    }

    #[test]
    fn test_names_are_not_addresses() {
        assert!(!is_address("AirPods Pro"));
        assert!(!is_address("AA:BB:CC:DD:EE"));
        assert!(!is_address("AA:BB-CC:DD:EE:FF"));
        assert!(!is_address("AABBCCDDEEFF00"));
        assert!(!is_address("GG:BB:CC:DD:EE:FF"));
        assert!(!is_address(""));
    }

    #[test]
    fn test_canonical_form() {
        assert_eq!(
            canonical("aa-bb-cc-dd-ee-ff").as_deref(),
            Some("AA:BB:CC:DD:EE:FF")
        );
        assert_eq!(canonical("AABBCCDDEEFF").as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(canonical("Speaker"), None);
        assert!(same_address("AA:BB:CC:DD:EE:FF", "aabbccddeeff"));
        assert!(!same_address("AA:BB:CC:DD:EE:FF", "AA:BB:CC:DD:EE:00"));
    }

    #[test]
    fn test_strip_separators() {
        assert_eq!(strip_separators("AA:BB:CC:DD:EE:FF"), "AABBCCDDEEFF");
        assert_eq!(strip_separators("aa-bb-cc-dd-ee-ff"), "aabbccddeeff");
    }
}
