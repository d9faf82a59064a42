//! Url-encoded form bodies.

use bytes::{BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::path::PathBuf;

/// Form fields: name to values. A name may carry several values.
pub type FormFields = HashMap<String, Vec<String>>;

/// Upload files: form field name to source file path.
pub type FormFiles = HashMap<String, PathBuf>;

/// Serialize fields as `name=value&name=value2`.
///
/// Every value yields one `name=value&` segment and a name without values
/// yields `name=&`; exactly one trailing `&` is stripped from the result.
/// Values are written as given, without percent-encoding.
pub fn encode_fields(fields: &FormFields) -> Bytes {
    let mut buf = BytesMut::new();
    for (name, values) in fields {
        if values.is_empty() {
            write_pair(&mut buf, name, "");
            continue;
        }
        for value in values {
            write_pair(&mut buf, name, value);
        }
    }
    if buf.last() == Some(&b'&') {
        buf.truncate(buf.len() - 1);
    }
    buf.freeze()
}

fn write_pair(buf: &mut BytesMut, name: &str, value: &str) {
    buf.put_slice(name.as_bytes());
    buf.put_u8(b'=');
    buf.put_slice(value.as_bytes());
    buf.put_u8(b'&');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &[&str])]) -> FormFields {
        pairs
            .iter()
            .map(|(name, values)| {
                (
                    name.to_string(),
                    values.iter().map(|v| v.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn empty_map_encodes_to_nothing() {
        assert!(encode_fields(&FormFields::new()).is_empty());
    }

    #[test]
    fn two_fields_have_one_separator() {
        let encoded = encode_fields(&fields(&[("name", &["abeir"]), ("age", &["23"])]));
        let text = std::str::from_utf8(&encoded).unwrap();
        assert!(text == "name=abeir&age=23" || text == "age=23&name=abeir", "{text}");
        assert_eq!(text.matches('&').count(), 1);
    }

    #[test]
    fn repeated_values_each_appear_once() {
        let encoded = encode_fields(&fields(&[("tag", &["a", "b", "c"])]));
        assert_eq!(&encoded[..], b"tag=a&tag=b&tag=c");
    }

    #[test]
    fn field_without_values_is_name_equals() {
        assert_eq!(&encode_fields(&fields(&[("flag", &[])]))[..], b"flag=");

        let encoded = encode_fields(&fields(&[("flag", &[]), ("x", &["1"])]));
        let text = std::str::from_utf8(&encoded).unwrap();
        assert!(text == "flag=&x=1" || text == "x=1&flag=", "{text}");
    }

    #[test]
    fn no_leading_or_trailing_separator() {
        let encoded = encode_fields(&fields(&[("a", &["1"]), ("b", &["2", "3"]), ("c", &[])]));
        assert!(!encoded.starts_with(b"&"));
        assert!(!encoded.ends_with(b"&"));
        assert_eq!(encoded.iter().filter(|&&b| b == b'&').count(), 3);
    }

    #[test]
    fn values_are_not_percent_encoded() {
        assert_eq!(&encode_fields(&fields(&[("q", &["a b&c"])]))[..], b"q=a b&c");
    }
}
