//! # Payload Codec
//!
//! Fixed-width, big-endian, versioned encoding of the two payloads that cross
//! the channel.
//!
//! ```text
//! Request      : version(1) | kind=0x01(1) | id(32) | requester(20)
//! Fulfillment  : version(1) | kind=0x02(1) | id(32) | requester(20)
//!                | random_value(32) | proof_len(2) | proof(proof_len)
//! ```
//!
//! Decoding is strict: truncated input, unknown versions, a wrong kind byte,
//! oversized proofs and trailing bytes are all rejected.

use crate::entities::{Address, RequestId, U256};
use crate::errors::CodecError;
use serde::{Deserialize, Serialize};

/// Current wire version.
pub const WIRE_VERSION: u8 = 1;

/// Maximum proof length accepted on the wire.
pub const MAX_PROOF_LEN: usize = 1024;

/// Encoded size of a request payload.
pub const REQUEST_PAYLOAD_LEN: usize = 2 + 32 + 20;

/// Encoded size of a fulfillment payload without its proof bytes.
pub const FULFILLMENT_HEADER_LEN: usize = 2 + 32 + 20 + 32 + 2;

/// Discriminator byte following the version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadKind {
    /// Destination -> source: please produce randomness.
    Request = 0x01,
    /// Source -> destination: here is the randomness.
    Fulfillment = 0x02,
}

impl PayloadKind {
    /// Peek at the kind of an encoded payload without decoding it.
    pub fn of(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < 2 {
            return Err(CodecError::Truncated {
                expected: 2,
                actual: bytes.len(),
            });
        }
        check_version(bytes[0])?;
        match bytes[1] {
            0x01 => Ok(Self::Request),
            0x02 => Ok(Self::Fulfillment),
            other => Err(CodecError::UnexpectedKind {
                expected: Self::Request as u8,
                actual: other,
            }),
        }
    }
}

/// Destination -> source request for randomness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    /// Correlation id assigned by the ledger.
    pub id: RequestId,
    /// Requester recorded by the ledger, echoed back on fulfillment.
    pub requester: Address,
}

/// Source -> destination delivery of randomness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentPayload {
    /// Correlation id of the original request.
    pub id: RequestId,
    /// Requester echoed from the request payload.
    pub requester: Address,
    /// The random value.
    pub random_value: U256,
    /// Opaque authenticity proof.
    pub proof: Vec<u8>,
}

impl RequestPayload {
    /// Encode to the fixed-width wire layout.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(REQUEST_PAYLOAD_LEN);
        out.push(WIRE_VERSION);
        out.push(PayloadKind::Request as u8);
        put_u256(&mut out, self.id);
        out.extend_from_slice(&self.requester);
        out
    }

    /// Decode from the wire layout.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes);
        r.header(PayloadKind::Request, REQUEST_PAYLOAD_LEN)?;
        let id = r.u256()?;
        let requester = r.address()?;
        r.finish()?;
        Ok(Self { id, requester })
    }
}

impl FulfillmentPayload {
    /// Encode to the wire layout. Fails if the proof exceeds `MAX_PROOF_LEN`.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        if self.proof.len() > MAX_PROOF_LEN {
            return Err(CodecError::ProofTooLarge {
                len: self.proof.len(),
                max: MAX_PROOF_LEN,
            });
        }
        let mut out = Vec::with_capacity(FULFILLMENT_HEADER_LEN + self.proof.len());
        out.push(WIRE_VERSION);
        out.push(PayloadKind::Fulfillment as u8);
        put_u256(&mut out, self.id);
        out.extend_from_slice(&self.requester);
        put_u256(&mut out, self.random_value);
        // MAX_PROOF_LEN fits in u16
        out.extend_from_slice(&(self.proof.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.proof);
        Ok(out)
    }

    /// Decode from the wire layout.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes);
        r.header(PayloadKind::Fulfillment, FULFILLMENT_HEADER_LEN)?;
        let id = r.u256()?;
        let requester = r.address()?;
        let random_value = r.u256()?;
        let proof_len = r.u16()? as usize;
        if proof_len > MAX_PROOF_LEN {
            return Err(CodecError::ProofTooLarge {
                len: proof_len,
                max: MAX_PROOF_LEN,
            });
        }
        let proof = r.take(proof_len)?.to_vec();
        r.finish()?;
        Ok(Self {
            id,
            requester,
            random_value,
            proof,
        })
    }
}

fn check_version(version: u8) -> Result<(), CodecError> {
    if version != WIRE_VERSION {
        return Err(CodecError::UnsupportedVersion {
            received: version,
            supported: WIRE_VERSION,
        });
    }
    Ok(())
}

fn put_u256(out: &mut Vec<u8>, value: U256) {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    out.extend_from_slice(&buf);
}

/// Bounds-checked cursor over an input buffer.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Checks minimum length, version and kind, in that order.
    fn header(&mut self, kind: PayloadKind, min_len: usize) -> Result<(), CodecError> {
        if self.bytes.len() < min_len {
            // Still report a version mismatch when we can read the version byte
            if let Some(&v) = self.bytes.first() {
                check_version(v)?;
            }
            return Err(CodecError::Truncated {
                expected: min_len,
                actual: self.bytes.len(),
            });
        }
        let version = self.take(1)?[0];
        check_version(version)?;
        let actual = self.take(1)?[0];
        if actual != kind as u8 {
            return Err(CodecError::UnexpectedKind {
                expected: kind as u8,
                actual,
            });
        }
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos + n;
        if end > self.bytes.len() {
            return Err(CodecError::Truncated {
                expected: end,
                actual: self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u256(&mut self) -> Result<U256, CodecError> {
        Ok(U256::from_big_endian(self.take(32)?))
    }

    fn address(&mut self) -> Result<Address, CodecError> {
        let mut out = [0u8; 20];
        out.copy_from_slice(self.take(20)?);
        Ok(out)
    }

    fn finish(&self) -> Result<(), CodecError> {
        let rest = self.bytes.len() - self.pos;
        if rest != 0 {
            return Err(CodecError::TrailingBytes(rest));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_fulfillment() -> FulfillmentPayload {
        FulfillmentPayload {
            id: U256::from(7u64),
            requester: [0x11; 20],
            random_value: U256::MAX - U256::from(1u64),
            proof: vec![0xAA; 32],
        }
    }

    #[test]
    fn test_request_layout() {
        let payload = RequestPayload {
            id: U256::from(0x0102u64),
            requester: [0x22; 20],
        };
        let bytes = payload.encode();
        assert_eq!(bytes.len(), REQUEST_PAYLOAD_LEN);
        assert_eq!(bytes[0], WIRE_VERSION);
        assert_eq!(bytes[1], 0x01);
        // id is big-endian in the last bytes of its 32-byte slot
        assert_eq!(bytes[32], 0x01);
        assert_eq!(bytes[33], 0x02);
        assert_eq!(&bytes[34..54], &[0x22; 20]);
        assert_eq!(RequestPayload::decode(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_fulfillment_layout() {
        let payload = sample_fulfillment();
        let bytes = payload.encode().unwrap();
        assert_eq!(bytes.len(), FULFILLMENT_HEADER_LEN + 32);
        assert_eq!(bytes[1], 0x02);
        assert_eq!(&bytes[86..88], &[0x00, 0x20]);
        assert_eq!(FulfillmentPayload::decode(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_empty_proof_allowed() {
        let payload = FulfillmentPayload {
            proof: Vec::new(),
            ..sample_fulfillment()
        };
        let bytes = payload.encode().unwrap();
        assert_eq!(bytes.len(), FULFILLMENT_HEADER_LEN);
        assert_eq!(FulfillmentPayload::decode(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_truncated_rejected() {
        let bytes = sample_fulfillment().encode().unwrap();
        let err = FulfillmentPayload::decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { .. }));

        let err = RequestPayload::decode(&[]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { expected: 54, actual: 0 }));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut bytes = RequestPayload {
            id: U256::one(),
            requester: [1; 20],
        }
        .encode();
        bytes[0] = 9;
        assert_eq!(
            RequestPayload::decode(&bytes).unwrap_err(),
            CodecError::UnsupportedVersion {
                received: 9,
                supported: WIRE_VERSION
            }
        );
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let bytes = RequestPayload {
            id: U256::one(),
            requester: [1; 20],
        }
        .encode();
        // A request is long enough to pass the header length check only for itself
        let mut padded = bytes.clone();
        padded.extend_from_slice(&[0u8; 34]);
        assert!(matches!(
            FulfillmentPayload::decode(&padded).unwrap_err(),
            CodecError::UnexpectedKind {
                expected: 0x02,
                actual: 0x01
            }
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = RequestPayload {
            id: U256::one(),
            requester: [1; 20],
        }
        .encode();
        bytes.push(0);
        assert_eq!(
            RequestPayload::decode(&bytes).unwrap_err(),
            CodecError::TrailingBytes(1)
        );
    }

    #[test]
    fn test_oversized_proof_rejected() {
        let payload = FulfillmentPayload {
            proof: vec![0u8; MAX_PROOF_LEN + 1],
            ..sample_fulfillment()
        };
        assert!(matches!(
            payload.encode().unwrap_err(),
            CodecError::ProofTooLarge { .. }
        ));

        // Hand-craft a header that declares an oversized proof
        let mut bytes = sample_fulfillment().encode().unwrap();
        bytes[86..88].copy_from_slice(&((MAX_PROOF_LEN + 1) as u16).to_be_bytes());
        assert!(matches!(
            FulfillmentPayload::decode(&bytes).unwrap_err(),
            CodecError::ProofTooLarge { .. }
        ));
    }

    #[test]
    fn test_payload_kind_peek() {
        let req = RequestPayload {
            id: U256::one(),
            requester: [1; 20],
        }
        .encode();
        assert_eq!(PayloadKind::of(&req).unwrap(), PayloadKind::Request);
        let ful = sample_fulfillment().encode().unwrap();
        assert_eq!(PayloadKind::of(&ful).unwrap(), PayloadKind::Fulfillment);
        assert!(PayloadKind::of(&[WIRE_VERSION, 0x7F]).is_err());
    }

    fn arb_u256() -> impl Strategy<Value = U256> {
        any::<[u8; 32]>().prop_map(|b| U256::from_big_endian(&b))
    }

    proptest! {
        #[test]
        fn prop_fulfillment_roundtrip(
            id in arb_u256(),
            requester in any::<[u8; 20]>(),
            random_value in arb_u256(),
            proof in proptest::collection::vec(any::<u8>(), 0..=MAX_PROOF_LEN),
        ) {
            let payload = FulfillmentPayload { id, requester, random_value, proof };
            let bytes = payload.encode().unwrap();
            prop_assert_eq!(FulfillmentPayload::decode(&bytes).unwrap(), payload);
        }

        #[test]
        fn prop_request_roundtrip(id in arb_u256(), requester in any::<[u8; 20]>()) {
            let payload = RequestPayload { id, requester };
            prop_assert_eq!(RequestPayload::decode(&payload.encode()).unwrap(), payload);
        }

        #[test]
        fn prop_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = RequestPayload::decode(&bytes);
            let _ = FulfillmentPayload::decode(&bytes);
        }
    }
}
