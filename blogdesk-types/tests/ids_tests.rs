use blogdesk_types::{EntryId, EntryKey};
use pretty_assertions::assert_eq;

#[test]
fn identified_key_displays_as_bare_id() {
    let key = EntryKey::Identified(EntryId::new(42));
    assert_eq!(key.to_string(), "42");
}

#[test]
fn pending_key_displays_with_new_prefix() {
    let key = EntryKey::Pending(1_700_000_000);
    assert_eq!(key.to_string(), "new-1700000000");
}

#[test]
fn keys_parse_back_from_route_form() {
    assert_eq!("42".parse::<EntryKey>().unwrap(), EntryKey::Identified(EntryId::new(42)));
    assert_eq!(
        "new-1700000000".parse::<EntryKey>().unwrap(),
        EntryKey::Pending(1_700_000_000)
    );
}

#[test]
fn invalid_keys_are_rejected() {
    assert!("".parse::<EntryKey>().is_err());
    assert!("0".parse::<EntryKey>().is_err());
    assert!("-3".parse::<EntryKey>().is_err());
    assert!("new-".parse::<EntryKey>().is_err());
    assert!("new-abc".parse::<EntryKey>().is_err());
    assert!("abc".parse::<EntryKey>().is_err());
}

#[test]
fn entry_id_accessor() {
    assert_eq!(EntryKey::Identified(EntryId::new(7)).entry_id(), Some(EntryId::new(7)));
    assert_eq!(EntryKey::Pending(10).entry_id(), None);
    assert!(EntryKey::Pending(10).is_pending());
    assert!(!EntryKey::from(EntryId::new(7)).is_pending());
}

#[test]
fn key_serde_is_tagged() {
    let json = serde_json::to_string(&EntryKey::Pending(5)).unwrap();
    assert_eq!(json, r#"{"pending":5}"#);
    let json = serde_json::to_string(&EntryKey::Identified(EntryId::new(9))).unwrap();
    assert_eq!(json, r#"{"identified":9}"#);
}

mod key_properties {
    use super::*;
    use proptest::prelude::*;

    fn key_strategy() -> impl Strategy<Value = EntryKey> {
        prop_oneof![
            (1i64..i64::MAX).prop_map(|id| EntryKey::Identified(EntryId::new(id))),
            (0i64..i64::MAX).prop_map(EntryKey::Pending),
        ]
    }

    proptest! {
        /// Drafts and lock entries are keyed by the string form.
        #[test]
        fn string_form_identifies_the_key(a in key_strategy(), b in key_strategy()) {
            prop_assert_eq!(a.to_string().parse::<EntryKey>().unwrap(), a);
            prop_assert_eq!(a == b, a.to_string() == b.to_string());
        }
    }
}
