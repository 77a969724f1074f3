//! Parsing of workshop item references (detail page URLs or bare ids)

use crate::error::{Error, Result};
use crate::types::ItemId;
use regex::Regex;
use std::sync::LazyLock;

// Optional ".../filedetails/?id=" prefix followed by the digit run that is the id
#[allow(clippy::expect_used)]
static ITEM_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:https?://[^\s?#]*/filedetails/\?(?:[^\s#]*&(?:amp;)?)?id=)?(\d+)")
        .expect("item reference pattern is valid")
});

/// Parse an item id out of a detail page URL or a bare id
///
/// Accepts `https://steamcommunity.com/sharedfiles/filedetails/?id=123`,
/// `https://steamcommunity.com/workshop/filedetails/?id=123` or `123`.
///
/// # Examples
///
/// ```
/// use workshop_deps::workshop::parse_item_reference;
/// use workshop_deps::ItemId;
///
/// let id = parse_item_reference("https://steamcommunity.com/sharedfiles/filedetails/?id=2503622437")?;
/// assert_eq!(id, ItemId(2503622437));
/// assert_eq!(parse_item_reference(" 42 ")?, ItemId(42));
/// assert!(parse_item_reference("not an item").is_err());
/// # Ok::<(), workshop_deps::Error>(())
/// ```
pub fn parse_item_reference(reference: &str) -> Result<ItemId> {
    let captures = ITEM_REFERENCE
        .captures(reference.trim())
        .ok_or_else(|| Error::MalformedDependencyLink {
            reference: reference.to_string(),
            reason: "no item id found".to_string(),
        })?;

    let digits = &captures[1];
    digits
        .parse::<u64>()
        .map(ItemId)
        .map_err(|e| Error::MalformedDependencyLink {
            reference: reference.to_string(),
            reason: format!("item id {digits} out of range: {e}"),
        })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sharedfiles_url() {
        let id = parse_item_reference(
            "https://steamcommunity.com/sharedfiles/filedetails/?id=1234567890",
        )
        .unwrap();
        assert_eq!(id, ItemId(1234567890));
    }

    #[test]
    fn test_workshop_url_with_extra_query() {
        let id = parse_item_reference(
            "https://steamcommunity.com/workshop/filedetails/?searchtext=&amp;id=555",
        )
        .unwrap();
        assert_eq!(id, ItemId(555));
    }

    #[test]
    fn test_bare_id() {
        assert_eq!(parse_item_reference("987").unwrap(), ItemId(987));
    }

    #[test]
    fn test_no_digits_is_malformed() {
        let err = parse_item_reference("https://steamcommunity.com/sharedfiles/filedetails/?id=")
            .unwrap_err();
        match err {
            Error::MalformedDependencyLink { reference, .. } => {
                assert!(reference.ends_with("?id="));
            }
            other => panic!("expected MalformedDependencyLink, got {other:?}"),
        }
    }

    #[test]
    fn test_overflowing_id_is_malformed() {
        let err = parse_item_reference("99999999999999999999999").unwrap_err();
        assert!(matches!(err, Error::MalformedDependencyLink { .. }));
    }
}
