//! Object heap and property descriptor tables
//!
//! Objects are stored in an arena owned by the context and referenced through
//! `ObjectId` handles. Prototype links are plain handles; the only invariant the
//! heap enforces on them is acyclicity (see `Heap::set_prototype`).
//!
//! This module is purely structural: names passed in are already normalized
//! and nothing here can call back into script. Accessors and watchers are run
//! by the property protocol in `properties.rs`.

use std::rc::Rc;

use bitflags::bitflags;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use super::frame::CallFrame;
use super::function::FunctionKind;
use crate::settings::DEFAULT_GC_THRESHOLD;
use crate::value::{AvmString, CheapClone, ObjectId, Value};

bitflags! {
    /// Attribute bits of a property. Exactly one of `DATA` / `ACCESSOR` is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyFlags: u8 {
        const DONT_ENUM = 1;
        const DONT_DELETE = 2;
        const READ_ONLY = 4;
        const DATA = 64;
        const ACCESSOR = 128;
        /// Bits a script may toggle through `ASSetPropFlags`-style APIs.
        const ATTRIBUTES = Self::DONT_ENUM.bits() | Self::DONT_DELETE.bits() | Self::READ_ONLY.bits();
    }
}

/// Write interceptor installed with `Object.prototype.watch`.
#[derive(Debug, Clone)]
pub struct Watcher {
    pub name: AvmString,
    pub callback: ObjectId,
    pub user_data: Value,
}

/// Metadata and value backing one property of one object.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub flags: PropertyFlags,
    pub value: Value,
    pub getter: Option<ObjectId>,
    pub setter: Option<ObjectId>,
    pub watcher: Option<Watcher>,
    /// Name as first written, before case normalization
    pub original_name: AvmString,
}

impl PropertyDescriptor {
    pub fn data(original_name: AvmString, value: Value, attributes: PropertyFlags) -> Self {
        Self {
            flags: (attributes & PropertyFlags::ATTRIBUTES) | PropertyFlags::DATA,
            value,
            getter: None,
            setter: None,
            watcher: None,
            original_name,
        }
    }

    pub fn accessor(
        original_name: AvmString,
        getter: Option<ObjectId>,
        setter: Option<ObjectId>,
        attributes: PropertyFlags,
    ) -> Self {
        Self {
            flags: (attributes & PropertyFlags::ATTRIBUTES) | PropertyFlags::ACCESSOR,
            value: Value::Undefined,
            getter,
            setter,
            watcher: None,
            original_name,
        }
    }

    pub fn is_data(&self) -> bool {
        self.flags.contains(PropertyFlags::DATA)
    }

    pub fn is_accessor(&self) -> bool {
        self.flags.contains(PropertyFlags::ACCESSOR)
    }

    pub fn is_enumerable(&self) -> bool {
        !self.flags.contains(PropertyFlags::DONT_ENUM)
    }

    /// Accessors need a setter, data properties must not be read-only.
    pub fn can_write(&self) -> bool {
        if self.is_accessor() {
            self.setter.is_some()
        } else {
            !self.flags.contains(PropertyFlags::READ_ONLY)
        }
    }
}

pub type PropertyMap = IndexMap<AvmString, PropertyDescriptor, FxBuildHasher>;

/// A node of the display hierarchy as seen by scripts.
#[derive(Debug, Clone, Default)]
pub struct MovieClip {
    pub name: AvmString,
    pub parent: Option<ObjectId>,
    /// Named children keyed by normalized instance name, in depth order.
    pub children: IndexMap<AvmString, ObjectId, FxBuildHasher>,
    /// `_levelN` number when this clip is a level root.
    pub level: Option<u32>,
}

/// What an object is beyond its property table.
#[derive(Debug, Clone, Default)]
pub enum ObjectKind {
    #[default]
    Ordinary,
    /// Per-activation variable object of an interpreted function
    Activation,
    Function(FunctionKind),
    Array,
    /// `arguments` object; array-like with `callee`/`caller`
    Arguments,
    Boolean(bool),
    Number(f64),
    String(AvmString),
    MovieClip(MovieClip),
    /// `super` proxy bound to the call frame it was created for
    SuperWrapper(Rc<CallFrame>),
}

#[derive(Debug, Clone, Default)]
pub struct Object {
    properties: PropertyMap,
    prototype: Option<ObjectId>,
    pub kind: ObjectKind,
    /// Interfaces recorded by `ImplementsOp` on a constructor
    pub interfaces: Vec<Value>,
}

impl Object {
    pub fn new(kind: ObjectKind, prototype: Option<ObjectId>) -> Self {
        Self {
            properties: PropertyMap::default(),
            prototype,
            kind,
            interfaces: Vec::new(),
        }
    }

    pub fn prototype(&self) -> Option<ObjectId> {
        self.prototype
    }

    pub fn own_property(&self, key: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(key)
    }

    pub fn own_property_mut(&mut self, key: &str) -> Option<&mut PropertyDescriptor> {
        self.properties.get_mut(key)
    }

    pub fn has_own_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Insert or replace. Replacing keeps the slot's enumeration position.
    pub fn set_own_property(&mut self, key: AvmString, desc: PropertyDescriptor) {
        self.properties.insert(key, desc);
    }

    /// Remove unconditionally, preserving the order of the remaining keys.
    pub fn remove_own_property(&mut self, key: &str) -> Option<PropertyDescriptor> {
        self.properties.shift_remove(key)
    }

    /// Normalized keys paired with their descriptors, in insertion order.
    pub fn properties(&self) -> impl Iterator<Item = (&AvmString, &PropertyDescriptor)> {
        self.properties.iter()
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_))
    }

    pub fn is_movie_clip(&self) -> bool {
        matches!(self.kind, ObjectKind::MovieClip(_))
    }

    pub fn as_movie_clip(&self) -> Option<&MovieClip> {
        match &self.kind {
            ObjectKind::MovieClip(clip) => Some(clip),
            _ => None,
        }
    }

    pub fn as_movie_clip_mut(&mut self) -> Option<&mut MovieClip> {
        match &mut self.kind {
            ObjectKind::MovieClip(clip) => Some(clip),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionKind> {
        match &self.kind {
            ObjectKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Primitive wrapped by a Boolean/Number/String object.
    pub fn boxed_primitive(&self) -> Option<Value> {
        match &self.kind {
            ObjectKind::Boolean(b) => Some(Value::Boolean(*b)),
            ObjectKind::Number(n) => Some(Value::Number(*n)),
            ObjectKind::String(s) => Some(Value::String(s.cheap_clone())),
            _ => None,
        }
    }
}

/// Visits every object handle a value holds, for the mark phase.
pub trait Traceable {
    fn trace<F: FnMut(ObjectId)>(&self, visitor: &mut F);
}

impl Traceable for Value {
    fn trace<F: FnMut(ObjectId)>(&self, visitor: &mut F) {
        if let Value::Object(id) = self {
            visitor(*id);
        }
    }
}

impl Traceable for PropertyDescriptor {
    fn trace<F: FnMut(ObjectId)>(&self, visitor: &mut F) {
        self.value.trace(visitor);
        self.getter.into_iter().chain(self.setter).for_each(&mut *visitor);
        if let Some(watcher) = &self.watcher {
            visitor(watcher.callback);
            watcher.user_data.trace(visitor);
        }
    }
}

impl Traceable for Object {
    fn trace<F: FnMut(ObjectId)>(&self, visitor: &mut F) {
        if let Some(prototype) = self.prototype {
            visitor(prototype);
        }
        for desc in self.properties.values() {
            desc.trace(visitor);
        }
        for interface in &self.interfaces {
            interface.trace(visitor);
        }
        match &self.kind {
            ObjectKind::Function(function) => function.trace(visitor),
            ObjectKind::MovieClip(clip) => {
                clip.parent.into_iter().chain(clip.children.values().copied()).for_each(&mut *visitor);
            }
            ObjectKind::SuperWrapper(frame) => frame.trace(visitor),
            _ => {}
        }
    }
}

/// Object counts reported by `Heap::stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    pub total_objects: usize,
    pub pooled_objects: usize,
    pub live_objects: usize,
}

/// Arena of every object created by one context.
///
/// Objects are referenced by plain `ObjectId` handles. Collection is a
/// mark-and-sweep over the handles reachable from the roots the caller
/// passes to `collect`; unreachable slots are reset and reused by later
/// allocations. A handle to a collected object reads as an empty ordinary
/// object until its slot is reused.
#[derive(Debug)]
pub struct Heap {
    objects: Vec<Object>,
    /// `true` for slots on the free list
    pooled: Vec<bool>,
    free_list: Vec<ObjectId>,
    /// Mark bits, sized to `objects` during a collection
    marks: Vec<bool>,
    /// Kept between collections to reuse its capacity
    mark_stack: Vec<ObjectId>,
    /// Allocations since the last collection
    net_allocs: usize,
    /// 0 disables `should_collect`
    gc_threshold: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            pooled: Vec::new(),
            free_list: Vec::new(),
            marks: Vec::new(),
            mark_stack: Vec::new(),
            net_allocs: 0,
            gc_threshold: DEFAULT_GC_THRESHOLD,
        }
    }
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, object: Object) -> ObjectId {
        self.net_allocs += 1;
        if let Some(id) = self.free_list.pop() {
            if let (Some(slot), Some(pooled)) = (self.objects.get_mut(id.index()), self.pooled.get_mut(id.index())) {
                *slot = object;
                *pooled = false;
                return id;
            }
        }
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(object);
        self.pooled.push(false);
        id
    }

    /// Live objects.
    pub fn len(&self) -> usize {
        self.objects.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Ids are only minted by `alloc` and slots are never removed.
    #[allow(clippy::indexing_slicing)]
    pub fn get(&self, id: ObjectId) -> &Object {
        &self.objects[id.index()]
    }

    #[allow(clippy::indexing_slicing)]
    pub fn get_mut(&mut self, id: ObjectId) -> &mut Object {
        &mut self.objects[id.index()]
    }

    /// Whether `id` names an allocated, uncollected object.
    pub fn is_live(&self, id: ObjectId) -> bool {
        self.pooled.get(id.index()).is_some_and(|pooled| !pooled)
    }

    pub fn stats(&self) -> GcStats {
        GcStats {
            total_objects: self.objects.len(),
            pooled_objects: self.free_list.len(),
            live_objects: self.len(),
        }
    }

    pub fn set_gc_threshold(&mut self, threshold: usize) {
        self.gc_threshold = threshold;
    }

    /// Whether enough has been allocated since the last collection.
    pub fn should_collect(&self) -> bool {
        self.gc_threshold > 0 && self.net_allocs >= self.gc_threshold
    }

    /// Mark everything reachable from `roots`, then reset and pool every
    /// other slot. Returns the number of objects collected.
    pub fn collect(&mut self, roots: impl IntoIterator<Item = ObjectId>) -> usize {
        self.mark(roots);
        let collected = self.sweep();
        self.net_allocs = 0;
        collected
    }

    fn mark(&mut self, roots: impl IntoIterator<Item = ObjectId>) {
        self.marks.clear();
        self.marks.resize(self.objects.len(), false);

        let mut stack = std::mem::take(&mut self.mark_stack);
        stack.clear();
        stack.extend(roots);

        while let Some(id) = stack.pop() {
            let Some(mark) = self.marks.get_mut(id.index()) else {
                continue;
            };
            if *mark || self.pooled.get(id.index()).copied().unwrap_or(true) {
                continue;
            }
            *mark = true;
            if let Some(object) = self.objects.get(id.index()) {
                object.trace(&mut |child| stack.push(child));
            }
        }

        self.mark_stack = stack;
    }

    fn sweep(&mut self) -> usize {
        let mut collected = 0;
        let slots = self.objects.iter_mut().zip(self.pooled.iter_mut()).zip(&self.marks);
        for (index, ((object, pooled), marked)) in slots.enumerate() {
            if *pooled || *marked {
                continue;
            }
            *object = Object::default();
            *pooled = true;
            self.free_list.push(ObjectId(index as u32));
            collected += 1;
        }
        collected
    }

    pub fn prototype_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.get(id).prototype
    }

    /// Assign a prototype link. A link that would make `id` reachable from its
    /// own chain is refused and the previous link kept; returns whether the
    /// assignment happened.
    pub fn set_prototype(&mut self, id: ObjectId, prototype: Option<ObjectId>) -> bool {
        let mut p = prototype;
        while let Some(current) = p {
            if current == id {
                return false;
            }
            p = self.prototype_of(current);
        }
        self.get_mut(id).prototype = prototype;
        true
    }

    /// `id` followed by every object on its prototype chain.
    pub fn chain(&self, id: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        std::iter::successors(Some(id), move |current| self.prototype_of(*current))
    }

    /// Root of the display hierarchy containing `clip`.
    pub fn clip_root(&self, clip: ObjectId) -> ObjectId {
        let mut current = clip;
        while let Some(parent) = self.get(current).as_movie_clip().and_then(|c| c.parent) {
            current = parent;
        }
        current
    }

    /// Slash path of a clip: "/" for a root, "/a/b" below it, "_levelN" for
    /// a non-zero level root.
    pub fn clip_target_path(&self, clip: ObjectId) -> Option<String> {
        let mut names = Vec::new();
        let mut current = clip;
        loop {
            let mc = self.get(current).as_movie_clip()?;
            match mc.parent {
                Some(parent) => {
                    names.push(mc.name.cheap_clone());
                    current = parent;
                }
                None => {
                    let prefix = match mc.level {
                        Some(level) if level > 0 => format!("_level{}", level),
                        _ => String::new(),
                    };
                    if names.is_empty() {
                        return Some(if prefix.is_empty() { "/".to_string() } else { prefix });
                    }
                    let mut path = prefix;
                    for name in names.iter().rev() {
                        path.push('/');
                        path.push_str(name.as_str());
                    }
                    return Some(path);
                }
            }
        }
    }
}
