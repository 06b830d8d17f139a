use std::sync::Arc;

use crate::{AttrId, AttrType, GateCode, GateError, Verbosity};

/// Shared handle to a server-managed object.
pub type ObjectRef = Arc<dyn AttributeStore>;

/// A dynamically typed, name/id keyed attribute table owned by the server core.
///
/// Implementations provide their own synchronization; every method takes `&self`.
/// Ids handed out for a name stay valid for the object's lifetime, and an
/// attribute's type never changes once created.
pub trait AttributeStore: Send + Sync {
    fn attr_id(&self, name: &str) -> Option<AttrId>;
    fn attr_name(&self, id: AttrId) -> Option<String>;
    fn attr_type(&self, id: AttrId) -> Option<AttrType>;

    /// Number of values held by an indexed attribute; 0 when absent.
    fn num_values(&self, id: AttrId) -> u32;

    /// Copies value `index` into `dst` and returns its length.
    ///
    /// A short `dst` yields `BufferTooSmall` carrying the needed length and is left untouched.
    fn read_value(&self, id: AttrId, index: u32, dst: &mut [u8]) -> Result<usize, GateError>;

    fn object_value(&self, id: AttrId, index: u32) -> Result<ObjectRef, GateError>;

    /// Replaces value `index`, or appends when `index` equals the current count.
    fn set_value(&self, id: AttrId, index: u32, bytes: &[u8]) -> Result<(), GateError>;

    /// Fails with `AttrNameExists` when the name is taken.
    fn add_attribute(&self, name: &str, ty: AttrType) -> Result<AttrId, GateError>;

    fn remove_attribute(&self, id: AttrId) -> Result<(), GateError>;

    /// Reads value `index` into a freshly allocated, exactly sized buffer.
    fn read_value_vec(&self, id: AttrId, index: u32) -> Result<Vec<u8>, GateError> {
        let mut buf = Vec::new();
        loop {
            match self.read_value(id, index, &mut buf) {
                Ok(len) => {
                    buf.truncate(len);
                    return Ok(buf);
                }
                Err(e) => {
                    // the value may grow between the probe and the copy, so go around again
                    let needed = e.needed().ok_or(e)?;
                    buf.clear();
                    buf.try_reserve_exact(needed).map_err(|_| GateError::alloc(needed))?;
                    buf.resize(needed, 0);
                }
            }
        }
    }

    /// Formats value `index` as text, whatever its type.
    fn value_as_string(&self, id: AttrId, index: u32) -> Result<String, GateError> {
        let ty = self.attr_type(id).ok_or_else(|| GateError::attr_missing(id.0))?;
        if ty == AttrType::Object {
            return Err(GateError::new(GateCode::WrongObjectType).ctx("object values have no text form"));
        }
        let bytes = self.read_value_vec(id, index)?;
        Ok(ty.format_bytes(&bytes))
    }
}

/// Destination for pre-formatted error log lines.
pub trait LogSink: Send + Sync {
    fn log(&self, verbosity: Verbosity, text: &str);
}
