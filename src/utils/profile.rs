use super::{ModuleUtils, names};
use crate::ipcomp::IpComponents;
use crate::{AttrId, AttrType, AttributeStore, ObjectRef, Rights};

impl ModuleUtils {
    /// Rights granted to a user profile; empty on any failure to read them.
    pub fn get_rights(&self, profile: &dyn AttributeStore) -> Rights {
        let Some(id) = profile.attr_id(names::USER_RIGHTS) else {
            return Rights::empty();
        };
        if profile.attr_type(id) != Some(AttrType::UInt32) {
            return Rights::empty();
        }
        let mut buf = [0u8; 4];
        match profile.read_value(id, 0, &mut buf) {
            Ok(4) => Rights::from_bits_retain(u32::from_ne_bytes(buf)),
            _ => Rights::empty(),
        }
    }

    pub fn get_extended_rights(&self, profile: &dyn AttributeStore, index: u32) -> Option<String> {
        let id = profile.attr_id(names::USER_EXTENDED_RIGHTS)?;
        profile.value_as_string(id, index).ok()
    }

    pub fn get_user_name(&self, profile: &dyn AttributeStore) -> Option<String> {
        let id = profile.attr_id(names::USER_NAME)?;
        profile.value_as_string(id, 0).ok()
    }

    /// Every group the profile belongs to, in stored order.
    pub fn get_groups(&self, profile: &dyn AttributeStore) -> Vec<String> {
        let Some(id) = profile.attr_id(names::USER_GROUPS) else {
            return Vec::new();
        };
        (0..profile.num_values(id))
            .filter_map(|i| profile.value_as_string(id, i).ok())
            .collect()
    }

    /// Case-sensitive membership test. A profile without a user name is in no group.
    pub fn user_in_group(&self, profile: &dyn AttributeStore, group: &[u8]) -> bool {
        if group.is_empty() {
            return false;
        }
        match self.get_user_name(profile) {
            Some(user) if !user.is_empty() => {}
            _ => return false,
        }
        let Some(id) = profile.attr_id(names::USER_GROUPS) else {
            return false;
        };
        (0..profile.num_values(id)).any(|i| entry_bytes(profile, id, i).is_some_and(|g| g == group))
    }

    /// True when any entry of the list attribute matches `address` component-wise.
    pub fn address_in_list(&self, object: &dyn AttributeStore, list: AttrId, address: &str) -> bool {
        let target = IpComponents::parse(address);
        if !target.valid() {
            return false;
        }
        (0..object.num_values(list)).any(|i| {
            object
                .value_as_string(list, i)
                .is_ok_and(|entry| IpComponents::parse(&entry).equal(&target))
        })
    }

    /// True when any entry of the list attribute equals `needle` byte for byte.
    pub fn find_string_in_attribute_list(&self, object: &dyn AttributeStore, list: AttrId, needle: &[u8]) -> bool {
        if needle.is_empty() {
            return false;
        }
        (0..object.num_values(list)).any(|i| entry_bytes(object, list, i).is_some_and(|e| e == needle))
    }

    /// Searches the server's module list for a module named `name`.
    pub fn find_module_by_name(&self, name: &str) -> Option<ObjectRef> {
        let server = self.server.as_ref()?;
        let list = server.attr_id(names::SERVER_MODULE_OBJECTS)?;
        (0..server.num_values(list))
            .filter_map(|i| server.object_value(list, i).ok())
            .find(|module| {
                module
                    .attr_id(names::MODULE_NAME)
                    .and_then(|id| entry_bytes(module.as_ref(), id, 0))
                    .is_some_and(|n| n == name.as_bytes())
            })
    }

    pub fn module_prefs_object(&self, module: &dyn AttributeStore) -> Option<ObjectRef> {
        let id = module.attr_id(names::MODULE_PREFS)?;
        module.object_value(id, 0).ok()
    }

    pub fn module_attributes_object(&self, module: &dyn AttributeStore) -> Option<ObjectRef> {
        let id = module.attr_id(names::MODULE_ATTRIBUTES)?;
        module.object_value(id, 0).ok()
    }
}

/// Raw bytes for text-like values, formatted text for everything else.
fn entry_bytes(object: &dyn AttributeStore, id: AttrId, index: u32) -> Option<Vec<u8>> {
    match object.attr_type(id)? {
        AttrType::CharArray | AttrType::Bytes => object.read_value_vec(id, index).ok(),
        _ => object.value_as_string(id, index).ok().map(String::into_bytes),
    }
}
