//! Scope lists and the variable/target resolution protocol

use std::cell::Cell;
use std::rc::Rc;

use bitflags::bitflags;

use super::object::Traceable;
use super::{Avm1, avm1_warn};
use crate::error::AvmResult;
use crate::value::{AvmString, ObjectId, Value};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ScopeFlags: u8 {
        /// The scope object is the movie clip the actions run on
        const TARGET = 1;
        /// A `setTarget` override is active at this node
        const REPLACE_TARGET = 2;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResolveFlags: u8 {
        const READ = 1;
        const WRITE = 2;
        const DELETE = Self::READ.bits();
        const GET_VALUE = 32;
        const DISALLOW_TARGET_OVERRIDE = 64;
        const ONLY_TARGETS = 128;
    }
}

/// One node of a scope chain, innermost first.
#[derive(Debug)]
pub struct ScopeListItem {
    pub scope: ObjectId,
    pub previous: Option<Rc<ScopeListItem>>,
    flags: Cell<ScopeFlags>,
    replace_target_by: Cell<Option<ObjectId>>,
}

impl ScopeListItem {
    pub fn new(scope: ObjectId, previous: Option<Rc<ScopeListItem>>) -> Self {
        Self {
            scope,
            previous,
            flags: Cell::new(ScopeFlags::empty()),
            replace_target_by: Cell::new(None),
        }
    }

    pub fn new_target(scope: ObjectId, previous: Option<Rc<ScopeListItem>>) -> Self {
        let item = Self::new(scope, previous);
        item.flags.set(ScopeFlags::TARGET);
        item
    }

    pub fn flags(&self) -> ScopeFlags {
        self.flags.get()
    }

    pub fn replace_target_by(&self) -> Option<ObjectId> {
        self.replace_target_by.get()
    }

    fn set_replace_target(&self, target: Option<ObjectId>) {
        let mut flags = self.flags.get();
        flags.set(ScopeFlags::REPLACE_TARGET, target.is_some());
        self.flags.set(flags);
        self.replace_target_by.set(target);
    }

    /// This node followed by every outer node.
    pub fn iter(&self) -> impl Iterator<Item = &ScopeListItem> {
        std::iter::successors(Some(self), |item| item.previous.as_deref())
    }
}

impl Traceable for ScopeListItem {
    fn trace<F: FnMut(ObjectId)>(&self, visitor: &mut F) {
        for item in self.iter() {
            visitor(item.scope);
            if let Some(target) = item.replace_target_by() {
                visitor(target);
            }
        }
    }
}

/// Where a variable name landed: the object holding it, the name to use on
/// that object and, with `GET_VALUE`, its current value.
#[derive(Debug, Clone)]
pub struct ResolvedVariable {
    pub scope: ObjectId,
    pub property_name: AvmString,
    pub value: Value,
}

fn has_path(name: &str) -> bool {
    name.contains(['.', ':', '/'])
}

fn is_path_delimiter(b: u8) -> bool {
    matches!(b, b'/' | b'.' | b':')
}

/// `_levelN` -> N
fn parse_level(name: &str) -> Option<u32> {
    name.strip_prefix("_level")
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
}

impl Avm1 {
    /// Whether `value` is a live display hierarchy object.
    pub fn is_target(&self, value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|id| self.heap.get(id).is_movie_clip())
    }

    fn resolved_at(
        &mut self,
        scope: ObjectId,
        name: &AvmString,
        flags: ResolveFlags,
    ) -> AvmResult<Option<ResolvedVariable>> {
        let value = if flags.contains(ResolveFlags::GET_VALUE) {
            self.get(scope, name.as_str())?
        } else {
            Value::Undefined
        };
        Ok(Some(ResolvedVariable {
            scope,
            property_name: name.clone(),
            value,
        }))
    }

    /// Resolve a name without path separators against the scope chain.
    ///
    /// Writes never go past the first TARGET node: the active target (or its
    /// `setTarget` replacement) receives them. Reads with an active override
    /// consult only the override at that node.
    pub fn resolve_simple_variable(
        &mut self,
        scope_list: &ScopeListItem,
        name: &AvmString,
        flags: ResolveFlags,
    ) -> AvmResult<Option<ResolvedVariable>> {
        let mut current_target: Option<ObjectId> = None;
        let mut p = Some(scope_list);
        while let Some(item) = p {
            p = item.previous.as_deref();
            let item_flags = item.flags();
            if item_flags.contains(ScopeFlags::REPLACE_TARGET)
                && !flags.contains(ResolveFlags::DISALLOW_TARGET_OVERRIDE)
                && current_target.is_none()
            {
                current_target = item.replace_target_by();
            }
            if item_flags.contains(ScopeFlags::TARGET) {
                if flags.contains(ResolveFlags::WRITE) {
                    let scope = current_target.unwrap_or(item.scope);
                    return self.resolved_at(scope, name, flags);
                }
                if flags.contains(ResolveFlags::READ) {
                    if let Some(target) = current_target {
                        if self.has_property(target, name.as_str()) {
                            return self.resolved_at(target, name, flags);
                        }
                        continue;
                    }
                }
            }
            if self.has_property(item.scope, name.as_str()) {
                return self.resolved_at(item.scope, name, flags);
            }
        }
        Ok(None)
    }

    fn lookup_child_by_name(&self, obj: &Value, name: &str) -> Option<ObjectId> {
        let clip = self.heap.get(obj.as_object()?).as_movie_clip()?;
        clip.children.get(name).copied()
    }

    /// Resolve a variable name that may be a path (`a.b`, `/a/b:c`, `../x`).
    pub fn resolve_variable(
        &mut self,
        scope_list: &ScopeListItem,
        variable_name: &str,
        flags: ResolveFlags,
    ) -> AvmResult<Option<ResolvedVariable>> {
        let normalized = self.normalize_name(variable_name);
        if !has_path(normalized.as_str()) {
            return self.resolve_simple_variable(scope_list, &normalized, flags);
        }

        // ASCII lower-casing keeps byte offsets identical in both spellings.
        let name = normalized.as_str();
        let b = name.as_bytes();
        let j = b.len();
        let mut i = 0;
        let mut marked_as_target = true;
        let mut needs_scope_resolution = true;
        let mut resolved = None;
        let mut scope: Option<ObjectId> = None;
        let mut obj = Value::Undefined;

        if b.first() == Some(&b'/') {
            let root = AvmString::from("_root");
            resolved = self.resolve_simple_variable(
                scope_list,
                &root,
                ResolveFlags::READ | ResolveFlags::GET_VALUE,
            )?;
            if let Some(r) = &resolved {
                scope = Some(r.scope);
                obj = r.value.clone();
            }
            i += 1;
            needs_scope_resolution = false;
        }
        if i >= j {
            return Ok(resolved);
        }

        let mut q = i;
        while i < j {
            if !needs_scope_resolution && !obj.is_object() {
                avm1_warn!(
                    self,
                    "Unable to resolve variable on invalid object {} (expr {})",
                    name.get(q..i.saturating_sub(1)).unwrap_or(""),
                    name
                );
                return Ok(None);
            }

            q = i;
            let mut property_name;
            if b.get(i) == Some(&b'.') && b.get(i + 1) == Some(&b'.') {
                i += 2;
                property_name = AvmString::from("_parent");
            } else {
                while i < j && !b.get(i).copied().is_some_and(is_path_delimiter) {
                    i += 1;
                }
                property_name = AvmString::from(name.get(q..i).unwrap_or(""));
            }
            if property_name.is_empty() && i < j {
                // Double delimiters in the middle of a path are ignored.
                i += 1;
                continue;
            }

            scope = obj.as_object();
            let mut value_found = false;

            if marked_as_target {
                if let Some(child) = self.lookup_child_by_name(&obj, property_name.as_str()) {
                    value_found = true;
                    obj = Value::Object(child);
                }
            }
            if !value_found {
                if needs_scope_resolution {
                    // Intermediate segments are containers; they are always
                    // looked up as reads with their value.
                    let segment_flags = if i < j {
                        (flags - ResolveFlags::WRITE) | ResolveFlags::READ | ResolveFlags::GET_VALUE
                    } else {
                        flags
                    };
                    if let Some(r) =
                        self.resolve_simple_variable(scope_list, &property_name, segment_flags)?
                    {
                        value_found = true;
                        property_name = r.property_name;
                        scope = Some(r.scope);
                        obj = r.value;
                    }
                    needs_scope_resolution = false;
                } else if let Some(container) = obj.as_object() {
                    if self.has_property(container, property_name.as_str()) {
                        obj = self.get(container, property_name.as_str())?;
                        value_found = true;
                    }
                }
            }
            if !value_found && property_name.as_str().starts_with('_') {
                if let Some(level) = parse_level(property_name.as_str()) {
                    if let Some(clip) = self.resolve_level(level) {
                        obj = Value::Object(clip);
                        value_found = true;
                    }
                } else if property_name.as_str() == "_root" {
                    if let Some(root) = self.resolve_root(scope_list) {
                        obj = Value::Object(root);
                        value_found = true;
                    }
                }
            }

            if !value_found && !flags.contains(ResolveFlags::WRITE) {
                avm1_warn!(
                    self,
                    "Unable to resolve {} on {} (expr {})",
                    property_name,
                    name.get(q..i.saturating_sub(1)).unwrap_or(""),
                    name
                );
                return Ok(None);
            }

            if i >= j {
                break;
            }

            let mut delimiter = b.get(i).copied().unwrap_or(b'.');
            i += 1;
            if delimiter == b'/' {
                if let Some(next @ (b':' | b'.')) = b.get(i).copied() {
                    delimiter = next;
                    i += 1;
                }
            }
            marked_as_target = delimiter == b'/';
        }

        let Some(scope) = scope else {
            return Ok(None);
        };
        let value = if flags.contains(ResolveFlags::GET_VALUE) {
            obj
        } else {
            Value::Undefined
        };
        Ok(Some(ResolvedVariable {
            scope,
            property_name: AvmString::from(variable_name.get(q..i).unwrap_or("")),
            value,
        }))
    }

    /// Current target: the nearest `setTarget` replacement (when allowed) or
    /// the nearest TARGET node's scope.
    pub fn get_target(&self, scope_list: &ScopeListItem, allow_override: bool) -> Option<ObjectId> {
        scope_list.iter().find_map(|item| {
            let flags = item.flags();
            if flags.contains(ScopeFlags::REPLACE_TARGET) && allow_override {
                item.replace_target_by()
            } else if flags.contains(ScopeFlags::TARGET) {
                Some(item.scope)
            } else {
                None
            }
        })
    }

    /// Root of the display hierarchy of the current target.
    pub fn resolve_root(&self, scope_list: &ScopeListItem) -> Option<ObjectId> {
        match self.get_target(scope_list, true) {
            Some(target) if self.heap.get(target).is_movie_clip() => Some(self.heap.clip_root(target)),
            _ => self.resolve_level(0),
        }
    }

    /// Turn a target argument (clip, path string, or empty for "current")
    /// into a display hierarchy object.
    pub fn resolve_target(
        &mut self,
        scope_list: &ScopeListItem,
        target: &Value,
        from_current_target: bool,
    ) -> AvmResult<Option<ObjectId>> {
        if self.is_target(target) {
            return Ok(target.as_object());
        }
        let path = if target.is_null_or_undefined() {
            AvmString::from("")
        } else {
            self.to_avm_string(target)?
        };
        if path.is_empty() {
            return Ok(self.get_target(scope_list, true));
        }
        let mut flags = ResolveFlags::READ | ResolveFlags::ONLY_TARGETS | ResolveFlags::GET_VALUE;
        if !from_current_target {
            flags |= ResolveFlags::DISALLOW_TARGET_OVERRIDE;
        }
        match self.resolve_variable(scope_list, path.as_str(), flags)? {
            Some(resolved) if self.is_target(&resolved.value) => Ok(resolved.value.as_object()),
            _ => {
                avm1_warn!(self, "Invalid AVM1 target object: {}", path);
                Ok(None)
            }
        }
    }

    /// `setTarget`: install or clear the override on the innermost TARGET node.
    pub fn set_target(&mut self, scope_list: &ScopeListItem, target: &Value) -> AvmResult<()> {
        let mut new_target = None;
        let has_target = match target {
            Value::String(s) => !s.is_empty(),
            other => !other.is_null_or_undefined(),
        };
        if has_target {
            match self.resolve_target(scope_list, target, false) {
                Ok(resolved) => new_target = resolved,
                Err(err) if err.is_critical() => return Err(err),
                Err(err) => avm1_warn!(self, "Unable to set target: {}", err),
            }
        }
        if let Some(node) = scope_list
            .iter()
            .find(|item| item.flags().contains(ScopeFlags::TARGET))
        {
            node.set_replace_target(new_target);
        }
        Ok(())
    }
}
