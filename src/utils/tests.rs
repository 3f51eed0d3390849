use super::*;

#[test]
fn test_encode_name_keeps_alnum_and_allowed_punct() {
    let raw = format!("Gene42{}", NAME_ALLOWED_PUNCT);
    assert_eq!(encode_name(&raw), raw);
    assert_eq!(decode_name(&encode_name(&raw)), raw);
}

#[test]
fn test_encode_name_spaces_become_underscores() {
    assert_eq!(encode_name("my region 1"), "my_region_1");
}

#[test]
fn test_encode_name_escapes_tabs_and_percent() {
    let encoded = encode_name("a\tb%c");
    assert_eq!(encoded, "a%09b%25c");
    assert!(!encoded.contains('\t'));
    assert_eq!(decode_name(&encoded), "a\tb%c");
}

#[test]
fn test_name_roundtrip_control_and_non_ascii() {
    for raw in ["\u{0}\u{1}\u{7f}", "Größe", "区域", "a\"b<c>\\d", "\n\r"] {
        let encoded = encode_name(raw);
        assert!(encoded.is_ascii());
        assert!(!encoded.contains(['\t', '\n', ' ']));
        assert_eq!(decode_name(&encoded), raw);
    }
}

#[test]
fn test_decode_name_tolerates_broken_escapes() {
    assert_eq!(decode_name("abc%"), "abc%");
    assert_eq!(decode_name("%ZZ"), "%ZZ");
    // lone continuation byte
    assert_eq!(decode_name("x%80"), "x\u{FFFD}");
}

#[test]
fn test_value_encoding_accepts_plus_as_space() {
    assert_eq!(decode_value("hello+world"), "hello world");
    assert_eq!(decode_value(&encode_value("a+b c")), "a+b c");
    assert_eq!(encode_value("x\ty"), "x%09y");
}

#[test]
fn test_file_component_is_path_safe() {
    let enc = encode_file_component("my/data set:1");
    assert!(!enc.contains(['/', ' ', ':']));
}
