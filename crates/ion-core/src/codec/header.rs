use super::extra::ExtraLayout;
use super::rlp::decode_list;
use super::CodecError;
use crate::types::header::BlockHeader;
use alloy_primitives::B256;
use alloy_rlp::{BufMut, Encodable, Header};

impl BlockHeader {
    fn payload_length(&self) -> usize {
        self.parent_hash.length()
            + self.ommers_hash.length()
            + self.beneficiary.length()
            + self.state_root.length()
            + self.transactions_root.length()
            + self.receipts_root.length()
            + self.logs_bloom.length()
            + self.difficulty.length()
            + self.number.length()
            + self.gas_limit.length()
            + self.gas_used.length()
            + self.timestamp.length()
            + self.extra_data.length()
            + self.mix_hash.length()
            + self.nonce.length()
    }

    /// keccak256 of the header encoded as-is.
    pub fn hash(&self) -> B256 {
        super::keccak256(&encode_header(self))
    }
}

impl Encodable for BlockHeader {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.parent_hash.encode(out);
        self.ommers_hash.encode(out);
        self.beneficiary.encode(out);
        self.state_root.encode(out);
        self.transactions_root.encode(out);
        self.receipts_root.encode(out);
        self.logs_bloom.encode(out);
        self.difficulty.encode(out);
        self.number.encode(out);
        self.gas_limit.encode(out);
        self.gas_used.encode(out);
        self.timestamp.encode(out);
        self.extra_data.encode(out);
        self.mix_hash.encode(out);
        self.nonce.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

/// Encode a header exactly as given.
pub fn encode_header(header: &BlockHeader) -> Vec<u8> {
    let mut out = Vec::with_capacity(header.length());
    header.encode(&mut out);
    out
}

/// Encode the signed or unsigned form of a header under the given
/// extra-data layout. Only `extra_data` differs between the two forms.
pub fn encode_header_form(
    header: &BlockHeader,
    signed: bool,
    layout: ExtraLayout,
) -> Result<Vec<u8>, CodecError> {
    let extra = if signed {
        layout.signed_extra(&header.extra_data)?
    } else {
        layout.unsigned_extra(&header.extra_data)?
    };
    Ok(encode_header(&header.with_extra(extra)))
}

/// Decode a header, rejecting anything but a single canonical
/// fifteen-field list with correctly sized fields.
pub fn decode_header(data: &[u8]) -> Result<BlockHeader, CodecError> {
    let items = decode_list(data)?;
    if items.len() != BlockHeader::FIELD_COUNT {
        return Err(CodecError::ItemCount {
            expected: BlockHeader::FIELD_COUNT,
            got: items.len(),
        });
    }

    Ok(BlockHeader {
        parent_hash: items[0].decode()?,
        ommers_hash: items[1].decode()?,
        beneficiary: items[2].decode()?,
        state_root: items[3].decode()?,
        transactions_root: items[4].decode()?,
        receipts_root: items[5].decode()?,
        logs_bloom: items[6].decode()?,
        difficulty: items[7].decode()?,
        number: items[8].decode()?,
        gas_limit: items[9].decode()?,
        gas_used: items[10].decode()?,
        timestamp: items[11].decode()?,
        extra_data: items[12].decode()?,
        mix_hash: items[13].decode()?,
        nonce: items[14].decode()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::extra::{build_trailing_extra, IstanbulExtra};
    use crate::codec::keccak256;
    use crate::test_utils::IBFT_BLOCK_1_RLP;
    use alloy_primitives::{Address, Bytes, B64, U256};
    use hex_literal::hex;

    fn sample_header() -> BlockHeader {
        BlockHeader {
            parent_hash: B256::repeat_byte(0x11),
            ommers_hash: B256::repeat_byte(0x22),
            beneficiary: Address::repeat_byte(0x33),
            state_root: B256::repeat_byte(0x44),
            transactions_root: B256::repeat_byte(0x55),
            receipts_root: B256::repeat_byte(0x66),
            difficulty: U256::from(2u64),
            number: 42,
            gas_limit: 8_000_000,
            gas_used: 21_000,
            timestamp: 1_549_556_108,
            extra_data: build_trailing_extra(&[0xaa; 32], &[], &[0xbb; 65]),
            mix_hash: B256::ZERO,
            nonce: B64::ZERO,
            ..Default::default()
        }
    }

    #[test]
    fn test_header_roundtrip() {
        let header = sample_header();
        let encoded = encode_header(&header);
        assert_eq!(decode_header(&encoded).unwrap(), header);
    }

    #[test]
    fn test_unsigned_form_differs_only_in_extra() {
        let header = sample_header();
        let signed = encode_header_form(&header, true, ExtraLayout::Trailing).unwrap();
        let unsigned = encode_header_form(&header, false, ExtraLayout::Trailing).unwrap();
        assert_eq!(signed, encode_header(&header));
        assert_ne!(keccak256(&signed), keccak256(&unsigned));

        let decoded = decode_header(&unsigned).unwrap();
        assert_eq!(decoded.extra_data.len(), 32);
        assert_eq!(decoded.with_extra(header.extra_data.clone()), header);
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut encoded = encode_header(&sample_header());
        encoded.push(0x00);
        assert!(matches!(
            decode_header(&encoded),
            Err(CodecError::TrailingBytes { extra: 1 })
        ));
    }

    #[test]
    fn test_rejects_truncated_input() {
        let encoded = encode_header(&sample_header());
        assert!(decode_header(&encoded[..encoded.len() - 1]).is_err());
    }

    #[test]
    fn test_rejects_wrong_field_count() {
        // A list of 14 empty strings
        let mut data = vec![0xce];
        data.extend_from_slice(&[0x80; 14]);
        assert!(matches!(
            decode_header(&data),
            Err(CodecError::ItemCount { expected: 15, got: 14 })
        ));
    }

    #[test]
    fn test_rejects_short_hash_field() {
        let encoded = encode_header(&sample_header());
        let items = decode_list(&encoded).unwrap();
        // Parent hash one byte short
        let mut payload = Vec::new();
        Bytes::copy_from_slice(&[0x11u8; 31]).encode(&mut payload);
        for item in &items[1..] {
            payload.extend_from_slice(item.raw);
        }
        let mut data = Vec::new();
        Header {
            list: true,
            payload_length: payload.len(),
        }
        .encode(&mut data);
        data.extend_from_slice(&payload);
        assert!(matches!(decode_header(&data), Err(CodecError::Rlp(_))));
    }

    #[test]
    fn test_real_istanbul_block_hash() {
        let data = hex::decode(IBFT_BLOCK_1_RLP).unwrap();
        let header = decode_header(&data).unwrap();
        assert_eq!(header.number, 1);
        assert_eq!(header.gas_limit, 4_704_588);
        assert_eq!(header.timestamp, 1_549_556_108);
        assert_eq!(
            header.beneficiary,
            Address::from(hex!("13ef33419a28f3d7fdc922b8a8696b4a5002050b"))
        );
        assert_eq!(
            keccak256(&data),
            B256::from(hex!(
                "755a0a1145e70191c42bf9a8154e7932384e4a5e05f8eb4f9113dd9c6a0c7647"
            ))
        );
        // Re-encoding reproduces the exact bytes
        assert_eq!(encode_header(&header), data);
        assert_eq!(
            encode_header_form(&header, true, ExtraLayout::Istanbul).unwrap(),
            data
        );

        let extra = IstanbulExtra::parse(&header.extra_data).unwrap();
        assert_eq!(extra.validators.len(), 4);
        assert_eq!(extra.seal.len(), 65);
        assert!(extra.committed_seals.is_empty());

        let unsigned = encode_header_form(&header, false, ExtraLayout::Istanbul).unwrap();
        assert_eq!(
            keccak256(&unsigned),
            B256::from(hex!(
                "c1b75da5f66996f3f3370142cba5b74fc0d1aeb3a2610ac7a7c1a1d3fc80983f"
            ))
        );
    }

    #[test]
    fn test_istanbul_signed_form_drops_committed_seals() {
        let mut extra = IstanbulExtra::parse(
            &decode_header(&hex::decode(IBFT_BLOCK_1_RLP).unwrap())
                .unwrap()
                .extra_data,
        )
        .unwrap();
        extra.committed_seals.push(Bytes::from(vec![1u8; 65]));
        let header = sample_header().with_extra(extra.to_bytes());
        let signed = decode_header(&encode_header_form(&header, true, ExtraLayout::Istanbul).unwrap())
            .unwrap();
        let parsed = IstanbulExtra::parse(&signed.extra_data).unwrap();
        assert!(parsed.committed_seals.is_empty());
        assert_eq!(parsed.seal, extra.seal);
    }
}
