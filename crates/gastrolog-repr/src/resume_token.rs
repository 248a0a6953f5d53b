//! The 24-byte resume token cursor (design §3, §6).

use uuid::Uuid;

use crate::error::FrontendError;

/// A forward-only cursor position within a chunk: the chunk it points into,
/// plus an intra-chunk record position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordRef {
    pub chunk_id: Uuid,
    pub position: u64,
}

/// The 24-byte wire form of a [`RecordRef`]: `chunk_id[16] || pos_le[8]`.
///
/// The length invariant is enforced at decode time: anything other than 24
/// bytes is rejected as `InvalidArgument`, never panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeToken([u8; 24]);

const TOKEN_LEN: usize = 24;

impl ResumeToken {
    pub fn encode(chunk_id: Uuid, position: u64) -> ResumeToken {
        let mut bytes = [0u8; TOKEN_LEN];
        bytes[..16].copy_from_slice(chunk_id.as_bytes());
        bytes[16..].copy_from_slice(&position.to_le_bytes());
        ResumeToken(bytes)
    }

    pub fn from_record_ref(r: RecordRef) -> ResumeToken {
        ResumeToken::encode(r.chunk_id, r.position)
    }

    pub fn decode(bytes: &[u8]) -> Result<RecordRef, FrontendError> {
        if bytes.len() != TOKEN_LEN {
            return Err(FrontendError::InvalidArgument(format!(
                "resume token must be exactly {TOKEN_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let chunk_id = Uuid::from_slice(&bytes[..16])
            .map_err(|e| FrontendError::InvalidArgument(e.to_string()))?;
        let mut pos_bytes = [0u8; 8];
        pos_bytes.copy_from_slice(&bytes[16..]);
        let position = u64::from_le_bytes(pos_bytes);
        Ok(RecordRef { chunk_id, position })
    }

    pub fn as_bytes(&self) -> &[u8; 24] {
        &self.0
    }

    pub fn into_record_ref(self) -> RecordRef {
        // `self.0` was only ever produced by `encode`, so decoding it back
        // out cannot fail; unwrap rather than thread a Result through every
        // caller that already holds a validated token.
        ResumeToken::decode(&self.0).expect("ResumeToken always encodes a valid RecordRef")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_chunk_and_position() {
        let cases = [
            (Uuid::nil(), 0u64),
            (Uuid::from_u128(1), 1),
            (Uuid::from_u128(u128::MAX), u64::MAX),
            (Uuid::new_v4(), 42),
        ];
        for (chunk_id, position) in cases {
            let token = ResumeToken::encode(chunk_id, position);
            let decoded = ResumeToken::decode(token.as_bytes()).unwrap();
            assert_eq!(decoded, RecordRef { chunk_id, position });
        }
    }

    #[test]
    fn rejects_any_length_other_than_24() {
        for len in [0, 1, 16, 23, 25, 32, 100] {
            let buf = vec![0u8; len];
            let err = ResumeToken::decode(&buf).unwrap_err();
            assert!(matches!(err, FrontendError::InvalidArgument(_)));
        }
    }

    #[test]
    fn any_24_byte_payload_decodes() {
        let buf = [0xAB_u8; 24];
        assert!(ResumeToken::decode(&buf).is_ok());
    }
}
