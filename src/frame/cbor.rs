#![cfg(feature = "cbor")]

use crate::GateError;
use crate::snapshot::{AttrRecord, RecordCodec};

/// Self-describing CBOR encoding of snapshot records, readable by other tooling.
#[derive(Debug, Default, Clone, Copy)]
pub struct CborCodec;

impl RecordCodec for CborCodec {
    fn encode(&self, record: &AttrRecord, mut out: Vec<u8>) -> Result<Vec<u8>, GateError> {
        serde_cbor::to_writer(&mut out, record).map_err(GateError::cbor_encode)?;
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<AttrRecord, GateError> {
        serde_cbor::from_slice(bytes).map_err(GateError::cbor_decode)
    }
}
