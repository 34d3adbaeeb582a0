//! Built-in constructors and prototypes
//!
//! Only what the execution engine itself relies on: the boxing constructors
//! used by coercions and `instanceof`, `Object`/`Function`/`Array` for
//! construction and `call`/`apply`, and the movie clip prototype.

pub mod array;
pub mod function;
pub mod global;
pub mod movie_clip;
pub mod object;
pub mod primitives;

use super::function::{FunctionKind, NativeFn, NativeFunction};
use super::object::{Heap, Object, ObjectKind, PropertyFlags};
use super::Avm1;
use crate::error::AvmResult;
use crate::value::{AvmString, ObjectId, Value};

/// Handles of the built-in constructors and their prototypes.
#[derive(Debug, Clone)]
pub struct Builtins {
    pub object: ObjectId,
    pub object_prototype: ObjectId,
    pub function: ObjectId,
    pub function_prototype: ObjectId,
    pub array: ObjectId,
    pub array_prototype: ObjectId,
    pub boolean: ObjectId,
    pub boolean_prototype: ObjectId,
    pub number: ObjectId,
    pub number_prototype: ObjectId,
    pub string: ObjectId,
    pub string_prototype: ObjectId,
    pub movie_clip: ObjectId,
    pub movie_clip_prototype: ObjectId,
    /// Shared prototype of function activation objects
    pub activation_prototype: ObjectId,
}

fn native_constructor(
    heap: &mut Heap,
    function_prototype: ObjectId,
    name: &str,
    invoke: NativeFn,
    construct: Option<NativeFn>,
) -> ObjectId {
    let kind = FunctionKind::Native(NativeFunction {
        name: AvmString::from(name),
        invoke: Some(invoke),
        construct,
    });
    heap.alloc(Object::new(ObjectKind::Function(kind), Some(function_prototype)))
}

impl Builtins {
    /// Allocate the prototype objects and constructors. Properties are
    /// installed later by `Avm1::init_builtins`, once a context exists to
    /// normalize names.
    pub fn bootstrap(heap: &mut Heap) -> Self {
        let object_prototype = heap.alloc(Object::new(ObjectKind::Ordinary, None));
        let function_prototype = heap.alloc(Object::new(
            ObjectKind::Function(FunctionKind::Native(NativeFunction {
                name: AvmString::from("Function.prototype"),
                invoke: Some(function::empty_function),
                construct: None,
            })),
            Some(object_prototype),
        ));
        let mut prototype = |kind: ObjectKind| heap.alloc(Object::new(kind, Some(object_prototype)));
        let array_prototype = prototype(ObjectKind::Array);
        let boolean_prototype = prototype(ObjectKind::Boolean(false));
        let number_prototype = prototype(ObjectKind::Number(0.0));
        let string_prototype = prototype(ObjectKind::String(AvmString::from("")));
        let movie_clip_prototype = prototype(ObjectKind::Ordinary);
        let activation_prototype = heap.alloc(Object::new(ObjectKind::Ordinary, None));

        let fp = function_prototype;
        Self {
            object: native_constructor(heap, fp, "Object", object::object_call, Some(object::object_construct)),
            object_prototype,
            function: native_constructor(
                heap,
                fp,
                "Function",
                function::function_call,
                Some(function::function_construct),
            ),
            function_prototype,
            array: native_constructor(heap, fp, "Array", array::array_call, Some(array::array_call)),
            array_prototype,
            boolean: native_constructor(
                heap,
                fp,
                "Boolean",
                primitives::boolean_call,
                Some(primitives::boolean_construct),
            ),
            boolean_prototype,
            number: native_constructor(
                heap,
                fp,
                "Number",
                primitives::number_call,
                Some(primitives::number_construct),
            ),
            number_prototype,
            string: native_constructor(
                heap,
                fp,
                "String",
                primitives::string_call,
                Some(primitives::string_construct),
            ),
            string_prototype,
            movie_clip: native_constructor(heap, fp, "MovieClip", movie_clip::movie_clip_call, None),
            movie_clip_prototype,
            activation_prototype,
        }
    }

    /// Every handle, as garbage collection roots.
    pub fn ids(&self) -> [ObjectId; 15] {
        [
            self.object,
            self.object_prototype,
            self.function,
            self.function_prototype,
            self.array,
            self.array_prototype,
            self.boolean,
            self.boolean_prototype,
            self.number,
            self.number_prototype,
            self.string,
            self.string_prototype,
            self.movie_clip,
            self.movie_clip_prototype,
            self.activation_prototype,
        ]
    }
}

impl Avm1 {
    /// Link constructors to prototypes, install methods and publish the
    /// constructors on the global object.
    pub(crate) fn init_builtins(&mut self) {
        let b = self.builtins.clone();
        let pairs = [
            ("Object", b.object, b.object_prototype),
            ("Function", b.function, b.function_prototype),
            ("Array", b.array, b.array_prototype),
            ("Boolean", b.boolean, b.boolean_prototype),
            ("Number", b.number, b.number_prototype),
            ("String", b.string, b.string_prototype),
            ("MovieClip", b.movie_clip, b.movie_clip_prototype),
        ];
        let hidden = PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE;
        for (name, constructor, prototype) in pairs {
            self.define_value(constructor, "prototype", Value::Object(prototype), hidden);
            self.define_value(prototype, "constructor", Value::Object(constructor), hidden);
            self.define_value(self.globals(), name, Value::Object(constructor), PropertyFlags::DONT_ENUM);
        }

        object::init_object_prototype(self);
        function::init_function_prototype(self);
        array::init_array_prototype(self);
        primitives::init_primitive_prototypes(self);
        movie_clip::init_movie_clip_prototype(self);
        global::init_global_functions(self);
        self.register_method(b.activation_prototype, "toString", super::function::activation_to_string);
    }

    /// `new` on one of the built-in types, as done by NewObject: the result
    /// records its constructor in `__constructor__`, and `Boolean`/`Number`
    /// yield the unboxed primitive. `None` for any other constructor.
    pub(crate) fn create_builtin_type(&mut self, constructor: ObjectId, args: &[Value]) -> AvmResult<Option<Value>> {
        let b = &self.builtins;
        let result = if [b.array, b.object, b.string, b.function].contains(&constructor) {
            self.construct(constructor, args)?
        } else if constructor == b.boolean || constructor == b.number {
            let boxed = self.construct(constructor, args)?;
            match boxed.as_object() {
                Some(obj) => self.heap.get(obj).boxed_primitive().unwrap_or_default(),
                None => boxed,
            }
        } else {
            return Ok(None);
        };
        if let Some(obj) = result.as_object() {
            self.define_value(obj, "__constructor__", Value::Object(constructor), PropertyFlags::DONT_ENUM);
        }
        Ok(Some(result))
    }
}

/// First argument or undefined.
pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}
