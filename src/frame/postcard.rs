#![cfg(feature = "postcard")]

use crate::GateError;
use crate::snapshot::{AttrRecord, RecordCodec};

/// Compact varint encoding of snapshot records.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostcardCodec;

impl RecordCodec for PostcardCodec {
    fn encode(&self, record: &AttrRecord, out: Vec<u8>) -> Result<Vec<u8>, GateError> {
        postcard::to_extend(record, out).map_err(GateError::postcard_encode)
    }

    fn decode(&self, bytes: &[u8]) -> Result<AttrRecord, GateError> {
        postcard::from_bytes(bytes).map_err(GateError::postcard_decode)
    }
}
