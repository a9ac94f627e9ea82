//! Borrowing RLP item reader for untrusted nested structures (trie nodes,
//! seal lists, Istanbul extra-data).
//!
//! Headers are decoded through `alloy_rlp::Decodable`; this reader covers
//! the places where the shape is only known after looking at the item.

use super::CodecError;
use alloy_primitives::Address;
use alloy_rlp::{Decodable, Header};

/// One RLP item borrowed from its enclosing buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RlpItem<'a> {
    /// The full encoding, header included.
    pub raw: &'a [u8],
    /// The payload: string bytes, or the concatenated encodings of list items.
    pub payload: &'a [u8],
    pub is_list: bool,
}

impl<'a> RlpItem<'a> {
    /// Decode this item's payload as a list of items.
    pub fn items(&self) -> Result<Vec<RlpItem<'a>>, CodecError> {
        if !self.is_list {
            return Err(CodecError::ExpectedList);
        }
        let mut rest = self.payload;
        let mut items = Vec::new();
        while !rest.is_empty() {
            items.push(decode_item(&mut rest)?);
        }
        Ok(items)
    }

    /// The string payload. Fails on lists.
    pub fn bytes(&self) -> Result<&'a [u8], CodecError> {
        if self.is_list {
            return Err(CodecError::ExpectedString);
        }
        Ok(self.payload)
    }

    /// The string payload, which must be exactly `N` bytes.
    pub fn fixed<const N: usize>(&self, field: &'static str) -> Result<[u8; N], CodecError> {
        let bytes = self.bytes()?;
        bytes.try_into().map_err(|_| CodecError::InvalidLength {
            field,
            expected: N,
            got: bytes.len(),
        })
    }

    pub fn address(&self, field: &'static str) -> Result<Address, CodecError> {
        self.fixed::<20>(field).map(Address::from)
    }

    /// Decode the item with `alloy_rlp`, requiring the whole item be consumed.
    pub fn decode<T: Decodable>(&self) -> Result<T, CodecError> {
        let mut buf = self.raw;
        let value = T::decode(&mut buf)?;
        if !buf.is_empty() {
            return Err(CodecError::TrailingBytes { extra: buf.len() });
        }
        Ok(value)
    }
}

/// Decode the next item from `buf`, advancing it past the item.
pub fn decode_item<'a>(buf: &mut &'a [u8]) -> Result<RlpItem<'a>, CodecError> {
    let start: &'a [u8] = *buf;
    let mut cursor: &'a [u8] = *buf;
    let header = Header::decode(&mut cursor)?;
    if cursor.len() < header.payload_length {
        return Err(CodecError::Truncated {
            needed: header.payload_length,
            available: cursor.len(),
        });
    }
    let header_len = start.len() - cursor.len();
    let total = header_len + header.payload_length;
    let item = RlpItem {
        raw: &start[..total],
        payload: &cursor[..header.payload_length],
        is_list: header.list,
    };
    *buf = &start[total..];
    Ok(item)
}

/// Decode `data` as exactly one RLP item with nothing after it.
pub fn decode_exact(data: &[u8]) -> Result<RlpItem<'_>, CodecError> {
    let mut rest = data;
    let item = decode_item(&mut rest)?;
    if !rest.is_empty() {
        return Err(CodecError::TrailingBytes { extra: rest.len() });
    }
    Ok(item)
}

/// Decode `data` as exactly one RLP list and return its items.
pub fn decode_list(data: &[u8]) -> Result<Vec<RlpItem<'_>>, CodecError> {
    decode_exact(data)?.items()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_decode_single_byte() {
        let item = decode_exact(&[0x42]).unwrap();
        assert!(!item.is_list);
        assert_eq!(item.payload, &[0x42]);
        assert_eq!(item.raw, &[0x42]);
    }

    #[test]
    fn test_decode_empty_string() {
        let item = decode_exact(&[0x80]).unwrap();
        assert_eq!(item.bytes().unwrap(), &[] as &[u8]);
    }

    #[test]
    fn test_decode_short_string() {
        // 0x83 means 3-byte string
        let item = decode_exact(&[0x83, 0x61, 0x62, 0x63]).unwrap();
        assert_eq!(item.bytes().unwrap(), b"abc");
    }

    #[test]
    fn test_decode_list_items_keep_raw_encoding() {
        // [0x01, "abc", []]
        let data = hex!("c70183616263c0");
        let items = decode_list(&data).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].payload, &[0x01]);
        assert_eq!(items[1].raw, &hex!("83616263"));
        assert!(items[2].is_list);
        assert!(items[2].items().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        assert!(matches!(
            decode_exact(&[0x01, 0x02]),
            Err(CodecError::TrailingBytes { extra: 1 })
        ));
    }

    #[test]
    fn test_rejects_truncated_string() {
        assert!(decode_exact(&[0x83, 0x61]).is_err());
        assert!(decode_list(&hex!("c3018283")).is_err());
    }

    #[test]
    fn test_list_of_string_is_error() {
        assert!(matches!(decode_list(&[0x83, 1, 2, 3]), Err(CodecError::ExpectedList)));
    }

    #[test]
    fn test_fixed_width_field() {
        let item = decode_exact(&hex!("820102")).unwrap();
        assert_eq!(item.fixed::<2>("pair").unwrap(), [1, 2]);
        assert!(matches!(
            item.fixed::<3>("pair"),
            Err(CodecError::InvalidLength { expected: 3, got: 2, .. })
        ));
    }

    #[test]
    fn test_decode_with_alloy() {
        let item = decode_exact(&hex!("820400")).unwrap();
        assert_eq!(item.decode::<u64>().unwrap(), 1024);
        // Leading zero is not canonical
        let item = decode_exact(&hex!("820004")).unwrap();
        assert!(item.decode::<u64>().is_err());
    }
}
