// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Comparison of record cells against a sub table's bound tag values.

use crate::record::Cell;
use crate::schema::TagValue;

/// Check if `cell` equals the tag value a sub table is bound to.
///
/// `bound == None` is the NULL binding and only matches [`Cell::Null`].
/// Numeric and boolean cells compare against the bound value parsed at the
/// cell's width; a bound value that does not parse never matches.
pub fn tag_matches(cell: &Cell, bound: Option<&TagValue>) -> bool {
    let bound = match (cell, bound) {
        (Cell::Null, None) => return true,
        (Cell::Null, Some(_)) | (_, None) => return false,
        (_, Some(bound)) => bound,
    };

    match cell {
        Cell::Null => false,
        Cell::Bool(v) => bound.to_string().parse::<bool>().is_ok_and(|b| b == *v),
        Cell::Int(v) | Cell::Long(v) => match bound {
            TagValue::Int(b) => b == v,
            other => other.to_string().parse::<i64>().is_ok_and(|b| b == *v),
        },
        Cell::Double(v) => bound.to_string().parse::<f64>().is_ok_and(|b| b == *v),
        Cell::Date(ms) => matches!(bound, TagValue::Timestamp { timestamp_ms } if timestamp_ms == ms),
        Cell::Bytes(bytes) => bytes_match(bytes, bound),
        Cell::Bad(raw) => bytes_match(raw.as_bytes(), bound),
        Cell::String(text) => *text == bound.to_string(),
    }
}

fn bytes_match(bytes: &[u8], bound: &TagValue) -> bool {
    match bound {
        TagValue::Bytes { bytes: b } => b.as_slice() == bytes,
        TagValue::Text(text) => text.as_bytes() == bytes,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> TagValue {
        TagValue::Text(s.to_string())
    }

    #[test]
    fn test_null_binding() {
        assert!(tag_matches(&Cell::Null, None));
        assert!(!tag_matches(&Cell::Null, Some(&text("A"))));
        assert!(!tag_matches(&Cell::text("A"), None));
    }

    #[test]
    fn test_string_equality() {
        assert!(tag_matches(&Cell::text("A"), Some(&text("A"))));
        assert!(!tag_matches(&Cell::text("B"), Some(&text("A"))));
        assert!(tag_matches(&Cell::text("7"), Some(&TagValue::Int(7))));
    }

    #[test]
    fn test_numeric_and_bool_widening() {
        assert!(tag_matches(&Cell::Int(7), Some(&TagValue::Int(7))));
        assert!(tag_matches(&Cell::Long(7), Some(&text("7"))));
        assert!(!tag_matches(&Cell::Long(7), Some(&text("seven"))));
        assert!(tag_matches(&Cell::Double(1.5), Some(&TagValue::Float(1.5))));
        assert!(tag_matches(&Cell::Double(2.0), Some(&TagValue::Int(2))));
        assert!(tag_matches(&Cell::Bool(true), Some(&TagValue::Bool(true))));
        assert!(tag_matches(&Cell::Bool(false), Some(&text("false"))));
        assert!(!tag_matches(&Cell::Bool(true), Some(&TagValue::Int(1))));
    }

    #[test]
    fn test_timestamp_and_bytes() {
        let ts = TagValue::Timestamp { timestamp_ms: 1_000 };
        assert!(tag_matches(&Cell::Date(1_000), Some(&ts)));
        assert!(!tag_matches(&Cell::Date(1_001), Some(&ts)));
        assert!(!tag_matches(&Cell::Date(1_000), Some(&TagValue::Int(1_000))));

        let bytes = TagValue::Bytes {
            bytes: vec![0x01, 0x02],
        };
        assert!(tag_matches(&Cell::Bytes(vec![0x01, 0x02]), Some(&bytes)));
        assert!(!tag_matches(&Cell::Bytes(vec![0x01]), Some(&bytes)));
        assert!(tag_matches(&Cell::Bytes(b"A".to_vec()), Some(&text("A"))));
        assert!(tag_matches(&Cell::Bad("A".to_string()), Some(&text("A"))));
    }
}
