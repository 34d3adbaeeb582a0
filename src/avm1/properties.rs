//! Property protocol: reads, writes, deletes and enumeration with accessors,
//! watchers, case normalization and the movie clip virtual properties.

use rustc_hash::FxHashSet;

use super::Avm1;
use super::object::{ObjectKind, PropertyDescriptor, PropertyFlags, Watcher};
use crate::error::AvmResult;
use crate::value::{AvmString, CheapClone, ObjectId, Value};

const PROTO_KEY: &str = "__proto__";

impl Avm1 {
    /// Lower-case `name` unless the movie is case sensitive (SWF 7+).
    pub fn normalize_name(&self, name: &str) -> AvmString {
        if self.is_property_case_sensitive() {
            AvmString::from(name)
        } else {
            AvmString::from(name).to_ascii_lowercase()
        }
    }

    /// Own descriptor of `obj` for an already normalized key, including the
    /// synthesized movie clip properties.
    fn own_descriptor(&self, obj: ObjectId, key: &str) -> Option<PropertyDescriptor> {
        let object = self.heap.get(obj);
        if let Some(desc) = object.own_property(key) {
            return Some(desc.clone());
        }
        let clip = object.as_movie_clip()?;
        let virtual_value = match key {
            "_parent" => clip.parent.map(Value::Object),
            "_root" => Some(Value::Object(self.heap.clip_root(obj))),
            "_name" => Some(Value::String(clip.name.cheap_clone())),
            "_target" => self.heap.clip_target_path(obj).map(Value::from),
            _ => clip.children.get(key).copied().map(Value::Object),
        }?;
        Some(PropertyDescriptor::data(
            AvmString::from(key),
            virtual_value,
            PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE | PropertyFlags::READ_ONLY,
        ))
    }

    /// First descriptor for `name` on `obj` or its prototype chain.
    pub fn get_property(&self, obj: ObjectId, name: &str) -> Option<PropertyDescriptor> {
        let key = self.normalize_name(name);
        self.find_descriptor(obj, &key)
    }

    fn find_descriptor(&self, obj: ObjectId, key: &str) -> Option<PropertyDescriptor> {
        self.heap
            .chain(obj)
            .find_map(|owner| self.own_descriptor(owner, key))
    }

    pub fn get_own_property(&self, obj: ObjectId, name: &str) -> Option<PropertyDescriptor> {
        let key = self.normalize_name(name);
        self.own_descriptor(obj, &key)
    }

    pub fn has_property(&self, obj: ObjectId, name: &str) -> bool {
        let key = self.normalize_name(name);
        key.as_str() == PROTO_KEY || self.find_descriptor(obj, &key).is_some()
    }

    pub fn has_own_property(&self, obj: ObjectId, name: &str) -> bool {
        let key = self.normalize_name(name);
        key.as_str() == PROTO_KEY || self.own_descriptor(obj, &key).is_some()
    }

    /// Define or replace an own property without running setters or watchers.
    pub fn set_own_property(&mut self, obj: ObjectId, name: &str, desc: PropertyDescriptor) {
        let key = self.normalize_name(name);
        self.heap.get_mut(obj).set_own_property(key, desc);
    }

    /// Define an own data property with the given attributes.
    pub fn define_value(&mut self, obj: ObjectId, name: &str, value: Value, attributes: PropertyFlags) {
        let desc = PropertyDescriptor::data(AvmString::from(name), value, attributes);
        self.set_own_property(obj, name, desc);
    }

    /// Whether a write would be accepted by the first descriptor on the chain.
    pub fn can_put(&self, obj: ObjectId, name: &str) -> bool {
        let key = self.normalize_name(name);
        self.find_descriptor(obj, &key)
            .is_none_or(|desc| desc.can_write())
    }

    /// Read a property: data value, getter result, or undefined.
    pub fn get(&mut self, obj: ObjectId, name: &str) -> AvmResult<Value> {
        let key = self.normalize_name(name);
        if key.as_str() == PROTO_KEY {
            return Ok(self.heap.prototype_of(obj).into());
        }
        match self.find_descriptor(obj, &key) {
            None => Ok(Value::Undefined),
            Some(desc) if desc.is_data() => Ok(desc.value),
            Some(desc) => match desc.getter {
                Some(getter) => self.call_function(getter, Value::Object(obj), &[]),
                None => Ok(Value::Undefined),
            },
        }
    }

    /// Write a property, running watchers and inherited setters.
    pub fn put(&mut self, obj: ObjectId, name: &str, value: Value) -> AvmResult<()> {
        let key = self.normalize_name(name);
        if key.as_str() == PROTO_KEY {
            self.heap.set_prototype(obj, value.as_object());
            return Ok(());
        }
        if !self.can_put(obj, &key) {
            return Ok(());
        }

        let own = self
            .heap
            .get(obj)
            .own_property(&key)
            .filter(|desc| desc.is_data())
            .map(|desc| (desc.value.cheap_clone(), desc.watcher.clone(), desc.flags));
        if let Some((old_value, watcher, flags)) = own {
            let value = match watcher {
                Some(watcher) => self.call_watcher(obj, &watcher, old_value, value)?,
                None => value,
            };
            // The watcher may have deleted or redefined the property.
            match self.heap.get_mut(obj).own_property_mut(&key) {
                Some(desc) if desc.is_data() => desc.value = value,
                _ => {
                    let desc = PropertyDescriptor::data(AvmString::from(name), value, flags);
                    self.heap.get_mut(obj).set_own_property(key, desc);
                }
            }
            return Ok(());
        }

        match self.find_descriptor(obj, &key) {
            Some(desc) if desc.is_accessor() => {
                let mut value = value;
                if let Some(watcher) = &desc.watcher {
                    let old_value = match desc.getter {
                        Some(getter) => self.call_function(getter, Value::Object(obj), &[])?,
                        None => Value::Undefined,
                    };
                    value = self.call_watcher(obj, watcher, old_value, value)?;
                }
                if let Some(setter) = desc.setter {
                    self.call_function(setter, Value::Object(obj), &[value])?;
                }
            }
            inherited => {
                let mut value = value;
                let mut flags = PropertyFlags::DATA;
                if let Some(desc) = inherited {
                    if let Some(watcher) = &desc.watcher {
                        value = self.call_watcher(obj, watcher, desc.value.cheap_clone(), value)?;
                    }
                    flags = desc.flags;
                }
                let desc = PropertyDescriptor {
                    flags,
                    value,
                    getter: None,
                    setter: None,
                    watcher: None,
                    original_name: AvmString::from(name),
                };
                self.heap.get_mut(obj).set_own_property(key, desc);
            }
        }
        Ok(())
    }

    fn call_watcher(
        &mut self,
        obj: ObjectId,
        watcher: &Watcher,
        old_value: Value,
        new_value: Value,
    ) -> AvmResult<Value> {
        let args = [
            Value::String(watcher.name.cheap_clone()),
            old_value,
            new_value,
            watcher.user_data.cheap_clone(),
        ];
        self.call_function(watcher.callback, Value::Object(obj), &args)
    }

    /// Remove an own property. Missing properties count as deleted,
    /// `DONT_DELETE` ones are kept and reported as failure.
    pub fn delete_property(&mut self, obj: ObjectId, name: &str) -> bool {
        let key = self.normalize_name(name);
        if key.as_str() == PROTO_KEY {
            return false;
        }
        let object = self.heap.get_mut(obj);
        match object.own_property(&key) {
            None => true,
            Some(desc) if desc.flags.contains(PropertyFlags::DONT_DELETE) => false,
            Some(_) => {
                object.remove_own_property(&key);
                true
            }
        }
    }

    /// Enumerable keys of `obj` and its prototypes, own keys first.
    ///
    /// A key seen once (enumerable or not) hides every later key normalizing
    /// to the same name, so the first-seen casing is the one reported.
    pub fn keys(&self, obj: ObjectId) -> Vec<AvmString> {
        let mut seen: FxHashSet<AvmString> = FxHashSet::default();
        let mut keys = Vec::new();
        for owner in self.heap.chain(obj) {
            let object = self.heap.get(owner);
            for (key, desc) in object.properties() {
                if seen.insert(key.cheap_clone()) && desc.is_enumerable() {
                    keys.push(desc.original_name.cheap_clone());
                }
            }
            if let ObjectKind::MovieClip(clip) = &object.kind {
                for (key, child) in &clip.children {
                    if seen.insert(key.cheap_clone()) {
                        if let ObjectKind::MovieClip(child) = &self.heap.get(*child).kind {
                            keys.push(child.name.cheap_clone());
                        }
                    }
                }
            }
        }
        keys
    }

    /// Install a write watcher on `name`, defining the property as undefined
    /// when it does not exist yet. Replaces any previous watcher.
    pub fn add_watcher(
        &mut self,
        obj: ObjectId,
        name: &str,
        callback: ObjectId,
        user_data: Value,
    ) -> bool {
        let key = self.normalize_name(name);
        if key.as_str() == PROTO_KEY {
            return false;
        }
        let watcher = Watcher {
            name: AvmString::from(name),
            callback,
            user_data,
        };
        let owner = self
            .heap
            .chain(obj)
            .find(|owner| self.heap.get(*owner).has_own_property(&key));
        match owner.and_then(|owner| self.heap.get_mut(owner).own_property_mut(&key)) {
            Some(desc) => desc.watcher = Some(watcher),
            None => {
                let mut desc =
                    PropertyDescriptor::data(AvmString::from(name), Value::Undefined, PropertyFlags::empty());
                desc.watcher = Some(watcher);
                self.heap.get_mut(obj).set_own_property(key, desc);
            }
        }
        true
    }

    /// Remove the watcher from the first descriptor on the chain; false when
    /// there was none.
    pub fn remove_watcher(&mut self, obj: ObjectId, name: &str) -> bool {
        let key = self.normalize_name(name);
        let owner = self
            .heap
            .chain(obj)
            .find(|owner| self.heap.get(*owner).has_own_property(&key));
        match owner.and_then(|owner| self.heap.get_mut(owner).own_property_mut(&key)) {
            Some(desc) if desc.watcher.is_some() => {
                desc.watcher = None;
                true
            }
            _ => false,
        }
    }

    /// Change the attribute bits of own properties; `names == None` applies
    /// to every own property.
    pub fn set_property_flags(
        &mut self,
        obj: ObjectId,
        names: Option<&[&str]>,
        set: PropertyFlags,
        clear: PropertyFlags,
    ) {
        let keys: Vec<AvmString> = match names {
            Some(names) => names.iter().map(|n| self.normalize_name(n)).collect(),
            None => self
                .heap
                .get(obj)
                .properties()
                .map(|(k, _)| k.cheap_clone())
                .collect(),
        };
        let object = self.heap.get_mut(obj);
        for key in keys {
            if let Some(desc) = object.own_property_mut(&key) {
                let kind = desc.flags & (PropertyFlags::DATA | PropertyFlags::ACCESSOR);
                let attributes = ((desc.flags & PropertyFlags::ATTRIBUTES) | set) - clear;
                desc.flags = kind | (attributes & PropertyFlags::ATTRIBUTES);
            }
        }
    }
}
