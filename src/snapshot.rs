//! Attribute table snapshots.
//!
//! A snapshot is a count frame (`u32` LE) followed by one encoded
//! [`AttrRecord`] per attribute. Object-valued attributes are skipped.

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::frame::{FramedReader, FramedWriter};
use crate::store::MemoryObject;
use crate::{AttrType, AttributeStore, GateCode, GateError};

#[cfg(feature = "cbor")]
pub use crate::frame::cbor::CborCodec;
#[cfg(feature = "postcard")]
pub use crate::frame::postcard::PostcardCodec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrRecord {
    pub name: String,
    pub ty: AttrType,
    pub values: Vec<Vec<u8>>,
}

pub trait RecordCodec {
    /// Appends the encoded record to `out` and returns it.
    fn encode(&self, record: &AttrRecord, out: Vec<u8>) -> Result<Vec<u8>, GateError>;
    fn decode(&self, bytes: &[u8]) -> Result<AttrRecord, GateError>;
}

impl MemoryObject {
    pub fn export_records(&self) -> Result<Vec<AttrRecord>, GateError> {
        let mut records = Vec::new();
        for name in self.attr_names() {
            let Some(id) = self.attr_id(&name) else { continue };
            let Some(ty) = self.attr_type(id) else { continue };
            if ty == AttrType::Object {
                continue;
            }
            let values = (0..self.num_values(id))
                .map(|i| self.read_value_vec(id, i))
                .collect::<Result<Vec<_>, _>>()?;
            records.push(AttrRecord { name, ty, values });
        }
        Ok(records)
    }

    /// Recreates each record's attribute; existing names must have the same type.
    /// Every record is checked before the first write, so a rejected batch
    /// leaves the object as it was.
    pub fn import_records(&self, records: &[AttrRecord]) -> Result<(), GateError> {
        let mut seen = HashMap::new();
        for record in records {
            check_record(record)?;
            let existing = self.attr_id(&record.name).and_then(|id| self.attr_type(id));
            let prior = seen.insert(record.name.as_str(), record.ty).or(existing);
            if prior.is_some_and(|ty| ty != record.ty) {
                return Err(GateError::new(GateCode::TypeMismatch).ctx(&record.name));
            }
        }

        for record in records {
            let id = match self.add_attribute(&record.name, record.ty) {
                Ok(id) => id,
                Err(e) if e.is(GateCode::AttrNameExists) => self.attr_id(&record.name).ok_or(e)?,
                Err(e) => return Err(e),
            };
            for (i, value) in record.values.iter().enumerate() {
                self.set_value(id, i as u32, value)?;
            }
        }
        Ok(())
    }
}

fn check_record(record: &AttrRecord) -> Result<(), GateError> {
    if record.ty == AttrType::Object && !record.values.is_empty() {
        return Err(GateError::new(GateCode::WrongObjectType).ctx(&record.name));
    }
    if let Some(len) = record.ty.fixed_len() {
        if let Some(bad) = record.values.iter().find(|v| v.len() != len) {
            return Err(GateError::new(GateCode::BadArgument)
                .ctx(format_args!("{}: {} is {} bytes, got {}", record.name, record.ty, len, bad.len())));
        }
    }
    Ok(())
}

pub fn write_snapshot<W: Write, C: RecordCodec>(writer: W, object: &MemoryObject, codec: &C) -> Result<W, GateError> {
    let records = object.export_records()?;
    let mut framed = FramedWriter::new(writer);

    let count = u32::try_from(records.len())
        .map_err(|_| GateError::new(GateCode::BadArgument).ctx("too many attributes"))?;
    framed.write_frame(&count.to_le_bytes())?;

    let mut buf = Vec::new();
    for record in &records {
        buf.clear();
        buf = codec.encode(record, std::mem::take(&mut buf))?;
        framed.write_frame(&buf)?;
    }
    framed.flush()?;
    Ok(framed.into_inner())
}

/// Reads a snapshot into `object`, returning how many attributes were restored.
pub fn read_snapshot<R: Read, C: RecordCodec>(reader: R, object: &MemoryObject, codec: &C) -> Result<usize, GateError> {
    let mut framed = FramedReader::new(reader);

    let mut count = [0u8; 4];
    let n = framed.read_frame(&mut count)?;
    if n != count.len() {
        return Err(GateError::new(GateCode::BadArgument).ctx("bad snapshot header"));
    }
    let count = u32::from_le_bytes(count) as usize;

    let mut records = Vec::new();
    let mut buf = Vec::new();
    for _ in 0..count {
        framed.recv_into(&mut buf)?;
        records.push(codec.decode(&buf)?);
    }
    object.import_records(&records)?;
    Ok(count)
}
