//! In-process attribute store.
//!
//! `MemoryObject` is the reference [`AttributeStore`]: a slot table behind a
//! `parking_lot::RwLock`. Hosts that embed the server core supply their own
//! store; this one backs tests, tools and module-local attribute tables.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

use crate::{AttrId, AttrType, AttrValue, AttributeStore, GateCode, GateError, ObjectRef};

enum Stored {
    Bytes(Vec<u8>),
    Object(ObjectRef),
}

struct Slot {
    name: String,
    ty: AttrType,
    values: Vec<Stored>,
}

#[derive(Default)]
struct Table {
    // removed slots stay `None` so ids are never reused
    slots: Vec<Option<Slot>>,
    by_name: HashMap<String, AttrId>,
}

impl Table {
    fn slot(&self, id: AttrId) -> Result<&Slot, GateError> {
        self.slots
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| GateError::attr_missing(format_args!("id {}", id.0)))
    }

    fn slot_mut(&mut self, id: AttrId) -> Result<&mut Slot, GateError> {
        self.slots
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or_else(|| GateError::attr_missing(format_args!("id {}", id.0)))
    }
}

#[derive(Default)]
pub struct MemoryObject {
    table: RwLock<Table>,
}

impl fmt::Debug for MemoryObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.read();
        let mut map = f.debug_map();
        for slot in table.slots.iter().flatten() {
            map.entry(&slot.name, &(slot.ty, slot.values.len()));
        }
        map.finish()
    }
}

impl MemoryObject {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Creates (or reuses) `name` with the value's type and appends the value.
    pub fn insert(&self, name: &str, value: AttrValue) -> Result<AttrId, GateError> {
        let id = self.ensure(name, value.attr_type())?;
        let count = self.num_values(id);
        self.set_value(id, count, &value.to_bytes())?;
        Ok(id)
    }

    /// Creates `name` as a multi-valued attribute holding `values` in order.
    pub fn insert_list<I, V>(&self, name: &str, ty: AttrType, values: I) -> Result<AttrId, GateError>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>,
    {
        let id = self.ensure(name, ty)?;
        for value in values {
            let count = self.num_values(id);
            self.set_value(id, count, value.as_ref())?;
        }
        Ok(id)
    }

    /// Stores an object reference at `index` of an object-typed attribute.
    pub fn set_object(&self, id: AttrId, index: u32, object: ObjectRef) -> Result<(), GateError> {
        let mut table = self.table.write();
        let slot = table.slot_mut(id)?;
        if slot.ty != AttrType::Object {
            return Err(GateError::new(GateCode::WrongObjectType).ctx(&slot.name));
        }
        place(&mut slot.values, index, Stored::Object(object))
    }

    /// Names of live attributes in creation order.
    pub fn attr_names(&self) -> Vec<String> {
        self.table.read().slots.iter().flatten().map(|s| s.name.clone()).collect()
    }

    fn ensure(&self, name: &str, ty: AttrType) -> Result<AttrId, GateError> {
        match self.add_attribute(name, ty) {
            Err(e) if e.is(GateCode::AttrNameExists) => {
                let id = self.attr_id(name).ok_or(e)?;
                match self.attr_type(id) {
                    Some(t) if t == ty => Ok(id),
                    _ => Err(GateError::new(GateCode::TypeMismatch).ctx(name)),
                }
            }
            other => other,
        }
    }
}

fn place(values: &mut Vec<Stored>, index: u32, value: Stored) -> Result<(), GateError> {
    let count = values.len() as u32;
    match index {
        i if i < count => values[i as usize] = value,
        i if i == count => values.push(value),
        i => return Err(GateError::bad_index(i, count)),
    }
    Ok(())
}

impl AttributeStore for MemoryObject {
    fn attr_id(&self, name: &str) -> Option<AttrId> {
        self.table.read().by_name.get(name).copied()
    }

    fn attr_name(&self, id: AttrId) -> Option<String> {
        self.table.read().slot(id).ok().map(|s| s.name.clone())
    }

    fn attr_type(&self, id: AttrId) -> Option<AttrType> {
        self.table.read().slot(id).ok().map(|s| s.ty)
    }

    fn num_values(&self, id: AttrId) -> u32 {
        self.table.read().slot(id).map(|s| s.values.len() as u32).unwrap_or(0)
    }

    fn read_value(&self, id: AttrId, index: u32, dst: &mut [u8]) -> Result<usize, GateError> {
        let table = self.table.read();
        let slot = table.slot(id)?;
        let count = slot.values.len() as u32;
        match slot.values.get(index as usize) {
            Some(Stored::Bytes(bytes)) => {
                if dst.len() < bytes.len() {
                    return Err(GateError::buffer_too_small(bytes.len()));
                }
                dst[..bytes.len()].copy_from_slice(bytes);
                Ok(bytes.len())
            }
            Some(Stored::Object(_)) => Err(GateError::new(GateCode::WrongObjectType).ctx(&slot.name)),
            None => Err(GateError::bad_index(index, count)),
        }
    }

    fn object_value(&self, id: AttrId, index: u32) -> Result<ObjectRef, GateError> {
        let table = self.table.read();
        let slot = table.slot(id)?;
        match slot.values.get(index as usize) {
            Some(Stored::Object(obj)) => Ok(ObjectRef::clone(obj)),
            Some(Stored::Bytes(_)) => Err(GateError::new(GateCode::WrongObjectType).ctx(&slot.name)),
            None => Err(GateError::bad_index(index, slot.values.len() as u32)),
        }
    }

    fn set_value(&self, id: AttrId, index: u32, bytes: &[u8]) -> Result<(), GateError> {
        let mut table = self.table.write();
        let slot = table.slot_mut(id)?;

        if slot.ty == AttrType::Object {
            return Err(GateError::new(GateCode::WrongObjectType).ctx(&slot.name));
        }
        if let Some(len) = slot.ty.fixed_len() {
            if bytes.len() != len {
                return Err(GateError::new(GateCode::BadArgument)
                    .ctx(format_args!("{} is {} bytes, got {}", slot.ty, len, bytes.len())));
            }
        }
        place(&mut slot.values, index, Stored::Bytes(bytes.to_vec()))
    }

    fn add_attribute(&self, name: &str, ty: AttrType) -> Result<AttrId, GateError> {
        let mut table = self.table.write();
        if table.by_name.contains_key(name) {
            return Err(GateError::new(GateCode::AttrNameExists).ctx(name));
        }
        let id = AttrId(table.slots.len() as u32);
        table.slots.push(Some(Slot { name: name.to_string(), ty, values: Vec::new() }));
        table.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    fn remove_attribute(&self, id: AttrId) -> Result<(), GateError> {
        let mut table = self.table.write();
        let name = table.slot(id)?.name.clone();
        table.slots[id.0 as usize] = None;
        table.by_name.remove(&name);
        Ok(())
    }
}
