use super::{ModuleUtils, names};
use crate::{AttrId, AttrScalar, AttrType, AttributeStore, GateCode, GateError};

const PREF_MISSING: &str = "preference \"%s\" not found, using default \"%s\"";
const PREF_WRONG_TYPE: &str = "preference \"%s\" stored as %s \"%s\", using default \"%s\"";
const PREF_WRONG_TYPE_UNSET: &str = "preference \"%s\" stored as %s \"%s\", left unset";

/// Where the bytes in the caller's buffer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The stored value, this many bytes.
    Stored(usize),
    /// The default, this many bytes; the default was also written back.
    Defaulted(usize),
    /// Nothing was written to the buffer.
    Unset,
}

impl Fill {
    pub fn len(self) -> Option<usize> {
        match self {
            Self::Stored(n) | Self::Defaulted(n) => Some(n),
            Self::Unset => None,
        }
    }
}

/// State of the slot after type checking.
enum Found {
    Present,
    Created,
    Retyped { was: AttrType, value: String },
}

impl ModuleUtils {
    /// Reads `name` from `object` into `buf`.
    ///
    /// A stored value of type `ty` that fits `buf` is copied as is. Otherwise the
    /// attribute is treated as absent: with a (non-empty) default, the default is
    /// written back to the object, copied into `buf` when it fits, and a line is
    /// logged at the missing-preference verbosity; without one the slot is still
    /// created (empty, typed) and `buf` is left alone.
    pub fn get_attribute(
        &self,
        object: &dyn AttributeStore,
        name: &str,
        ty: AttrType,
        buf: &mut [u8],
        default: Option<&[u8]>,
    ) -> Fill {
        let default = default.filter(|d| !d.is_empty());
        let checked = self.check_attribute_data_type(object, name, ty);

        if let Ok((id, Found::Present)) = &checked {
            if let Ok(len) = object.read_value(*id, 0, buf) {
                return Fill::Stored(len);
            }
        }

        let Some(default) = default else {
            self.report_unusable(name, checked);
            return Fill::Unset;
        };
        self.apply_default(object, name, ty, checked, default);

        if default.len() > buf.len() {
            return Fill::Unset;
        }
        buf[..default.len()].copy_from_slice(default);
        Fill::Defaulted(default.len())
    }

    /// Like [`ModuleUtils::get_attribute`], with `io` holding the default on
    /// entry and the result on return.
    pub fn get_io_attribute(&self, object: &dyn AttributeStore, name: &str, ty: AttrType, io: &mut [u8]) -> Fill {
        let default = io.to_vec();
        self.get_attribute(object, name, ty, io, Some(&default))
    }

    /// Typed read with a default, over [`ModuleUtils::get_attribute`].
    pub fn get_value<T: AttrScalar>(&self, object: &dyn AttributeStore, name: &str, default: T) -> T {
        let encoded = default.encode();
        let mut buf = [0u8; 8];
        match self.get_attribute(object, name, T::TYPE, &mut buf[..T::LEN], Some(&encoded[..T::LEN])) {
            Fill::Stored(len) | Fill::Defaulted(len) => T::decode(&buf[..len]).unwrap_or(default),
            Fill::Unset => default,
        }
    }

    /// String read with a default. An absent value with no (or an empty)
    /// default yields `""`. Only a failed allocation is returned as an error;
    /// the stored value is left in place when that happens.
    pub fn get_string_attribute(
        &self,
        object: &dyn AttributeStore,
        name: &str,
        default: Option<&str>,
    ) -> Result<String, GateError> {
        let default = default.filter(|d| !d.is_empty());
        let checked = self.check_attribute_data_type(object, name, AttrType::CharArray);

        if let Ok((id, Found::Present)) = &checked {
            match object.read_value_vec(*id, 0) {
                Ok(bytes) => return Ok(String::from_utf8_lossy(&bytes).into_owned()),
                Err(e) if e.is(GateCode::Alloc) => return Err(e),
                Err(_) => {}
            }
        }

        let Some(default) = default else {
            self.report_unusable(name, checked);
            return Ok(String::new());
        };
        self.apply_default(object, name, AttrType::CharArray, checked, default.as_bytes());

        let mut out = String::new();
        out.try_reserve_exact(default.len()).map_err(|_| GateError::alloc(default.len()))?;
        out.push_str(default);
        Ok(out)
    }

    pub fn get_attr_id(&self, object: &dyn AttributeStore, name: &str) -> AttrId {
        object.attr_id(name).unwrap_or(AttrId::ILLEGAL)
    }

    /// Creates `name` with type `ty`, or returns the existing id when it already
    /// has that type. An existing attribute of another type is a `TypeMismatch`.
    /// The default is stored only when the attribute holds no value yet.
    pub fn create_attribute(
        &self,
        object: &dyn AttributeStore,
        name: &str,
        ty: AttrType,
        default: Option<&[u8]>,
    ) -> Result<AttrId, GateError> {
        let id = match object.add_attribute(name, ty) {
            Ok(id) => id,
            Err(e) if e.is(GateCode::AttrNameExists) => {
                let id = object.attr_id(name).ok_or(e)?;
                match object.attr_type(id) {
                    Some(existing) if existing == ty => id,
                    existing => {
                        return Err(GateError::new(GateCode::TypeMismatch).ctx(format_args!(
                            "{name}: stored {}, requested {ty}",
                            existing.unwrap_or(AttrType::Unknown)
                        )));
                    }
                }
            }
            Err(e) => return Err(e),
        };

        if let Some(default) = default {
            if object.num_values(id) == 0 {
                object.set_value(id, 0, default)?;
            }
        }
        Ok(id)
    }

    /// Makes sure `name` exists with type `ty`. A wrong-typed attribute is
    /// removed and recreated, so type mismatch and absence end up the same.
    fn check_attribute_data_type(
        &self,
        object: &dyn AttributeStore,
        name: &str,
        ty: AttrType,
    ) -> Result<(AttrId, Found), GateError> {
        let existing = object.attr_id(name).and_then(|id| Some((id, object.attr_type(id)?)));

        match existing {
            Some((id, stored)) if stored == ty => Ok((id, Found::Present)),
            Some((id, stored)) => {
                let value = object.value_as_string(id, 0).unwrap_or_default();
                object.remove_attribute(id)?;
                let id = self.create_attribute(object, name, ty, None)?;
                Ok((id, Found::Retyped { was: stored, value }))
            }
            None => Ok((self.create_attribute(object, name, ty, None)?, Found::Created)),
        }
    }

    /// Logs why a read with no default found nothing usable. A plain absence is silent.
    fn report_unusable(&self, name: &str, checked: Result<(AttrId, Found), GateError>) {
        let verbosity = self.missing_pref_log_verbosity();
        match checked {
            Err(e) => self.log_pref_error_str(verbosity, name, &format!("could not be created: {e}")),
            Ok((_, Found::Retyped { was, value })) => self.log_named(
                verbosity,
                names::MSG_PREF_WRONG_TYPE,
                PREF_WRONG_TYPE_UNSET,
                &[name, was.name(), &value, ""],
            ),
            Ok(_) => {}
        }
    }

    fn apply_default(
        &self,
        object: &dyn AttributeStore,
        name: &str,
        ty: AttrType,
        checked: Result<(AttrId, Found), GateError>,
        default: &[u8],
    ) {
        let verbosity = self.missing_pref_log_verbosity();
        let shown = ty.format_bytes(default);

        let found = match checked {
            Ok((id, found)) => match object.set_value(id, 0, default) {
                Ok(()) => found,
                Err(e) => {
                    self.log_pref_error_str(verbosity, name, &format!("could not store default: {e}"));
                    found
                }
            },
            Err(e) => {
                self.log_pref_error_str(verbosity, name, &format!("could not be created: {e}"));
                Found::Created
            }
        };

        match found {
            Found::Retyped { was, value } => self.log_named(
                verbosity,
                names::MSG_PREF_WRONG_TYPE,
                PREF_WRONG_TYPE,
                &[name, was.name(), &value, &shown],
            ),
            Found::Present | Found::Created => {
                self.log_named(verbosity, names::MSG_PREF_MISSING, PREF_MISSING, &[name, &shown])
            }
        }
    }
}
