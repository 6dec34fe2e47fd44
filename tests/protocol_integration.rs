//! Integration tests for the bit cursor and the grammar engine.

use blizzard_replay::bits::BitCursor;
use blizzard_replay::error::ParserError;
use blizzard_replay::limits::DecodeLimits;
use blizzard_replay::protocol::{decode, decode_with_limits, Decoded, TypeDescriptor};

#[test]
fn test_bit_cursor_reference_fixture() {
    let mut cursor = BitCursor::new(&[0x7C, 0x7C][..]);
    assert_eq!(cursor.read_bits(3).unwrap(), 0x4);
    assert_eq!(cursor.read_bits(4).unwrap(), 0xF);
    assert_eq!(cursor.read_bits(4).unwrap(), 0x4);
    assert_eq!(cursor.read_bits(5).unwrap(), 0xF);
}

#[test]
fn test_optional_over_reference_bits() {
    let descriptor = TypeDescriptor::optional(TypeDescriptor::uint(8));

    // Presence bit 1, then 00000001.
    let mut cursor = BitCursor::new(&[0x01, 0x01][..]);
    assert_eq!(
        decode(&mut cursor, &descriptor).unwrap(),
        Decoded::Optional(Some(Box::new(Decoded::Int(1))))
    );

    // Presence bit 0; the remaining seven bits stay unread.
    let mut cursor = BitCursor::new(&[0xFE][..]);
    assert_eq!(decode(&mut cursor, &descriptor).unwrap(), Decoded::Optional(None));
    assert_eq!(cursor.read_bits(7).unwrap(), 0x7F);
}

#[test]
fn test_nested_grammar_depth_limit() {
    let mut descriptor = TypeDescriptor::uint(1);
    for _ in 0..16 {
        descriptor = TypeDescriptor::structure([("inner", descriptor)]);
    }
    let mut cursor = BitCursor::new(&[0x00][..]);
    assert!(matches!(
        decode_with_limits(&mut cursor, &descriptor, &DecodeLimits::for_testing()),
        Err(ParserError::LimitExceeded { what: "nesting depth", .. })
    ));
}

#[test]
fn test_array_of_choices() {
    let element = TypeDescriptor::choice(
        1,
        [
            (0, "m_count", TypeDescriptor::uint(4)),
            (1, "m_flag", TypeDescriptor::Bool),
        ],
    );
    let descriptor = TypeDescriptor::array(element, 3);

    // Count 2; branch 0 holding 9; branch 1 holding true.
    let mut cursor = BitCursor::new(&[0x92, 0x03][..]);
    let value = decode(&mut cursor, &descriptor).unwrap();

    let Decoded::Array(items) = value else {
        panic!("Expected array, got {value:?}");
    };
    assert_eq!(items.len(), 2);
    assert!(matches!(
        &items[0],
        Decoded::Choice { tag: 0, name, value } if name == "m_count" && **value == Decoded::Int(9)
    ));
    assert!(matches!(
        &items[1],
        Decoded::Choice { tag: 1, value, .. } if **value == Decoded::Bool(true)
    ));
}

#[test]
fn test_unknown_choice_tag() {
    let descriptor = TypeDescriptor::choice(2, [(0, "m_only", TypeDescriptor::Null)]);
    let mut cursor = BitCursor::new(&[0x03][..]);
    assert!(matches!(
        decode(&mut cursor, &descriptor),
        Err(ParserError::UnknownChoiceTag { tag: 3, width: 2 })
    ));
}
