use std::fmt;
use std::sync::Arc;

use crate::ifds::access_path::{AccessPath, Accessor};

/// A literal of the reference IR.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Null,
    Int(i64),
    Bool(bool),
    Str(Arc<str>),
}

/// A value of the reference IR: locals, the receiver, field and element
/// references, and constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimpleValue {
    Local(Arc<str>),
    This,
    /// Field access; a `None` instance is a static field.
    FieldRef {
        instance: Option<Box<SimpleValue>>,
        field: Arc<str>,
    },
    ArrayAccess {
        array: Box<SimpleValue>,
    },
    Const(Constant),
}

impl fmt::Display for SimpleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimpleValue::Local(name) => write!(f, "{name}"),
            SimpleValue::This => write!(f, "this"),
            SimpleValue::FieldRef {
                instance: Some(instance),
                field,
            } => write!(f, "{instance}.{field}"),
            SimpleValue::FieldRef {
                instance: None,
                field,
            } => write!(f, "<static>.{field}"),
            SimpleValue::ArrayAccess { array } => write!(f, "{array}[*]"),
            SimpleValue::Const(Constant::Null) => write!(f, "null"),
            SimpleValue::Const(Constant::Int(value)) => write!(f, "{value}"),
            SimpleValue::Const(Constant::Bool(value)) => write!(f, "{value}"),
            SimpleValue::Const(Constant::Str(value)) => write!(f, "{value:?}"),
        }
    }
}

/// Access path of a value, rooted at its innermost local or receiver.
/// Constants have no path.
pub(crate) fn value_path(value: &SimpleValue) -> Option<AccessPath<SimpleValue>> {
    match value {
        SimpleValue::Local(_) | SimpleValue::This => Some(AccessPath::from_base(value.clone())),
        SimpleValue::FieldRef {
            instance: Some(instance),
            field,
        } => Some(value_path(instance)?.appended(Accessor::field(field.as_ref()))),
        SimpleValue::FieldRef {
            instance: None,
            field,
        } => Some(AccessPath::from_static_field(field.as_ref())),
        SimpleValue::ArrayAccess { array } => Some(value_path(array)?.appended(Accessor::Element)),
        SimpleValue::Const(_) => None,
    }
}

/// Collects the paths a value dereferences when evaluated: the instance
/// of every field access and the array of every element access. The value
/// itself is only read, never dereferenced.
pub(crate) fn collect_deref_bases(
    value: &SimpleValue,
    out: &mut Vec<AccessPath<SimpleValue>>,
) {
    match value {
        SimpleValue::FieldRef {
            instance: Some(instance),
            ..
        } => {
            if let Some(path) = value_path(instance) {
                out.push(path);
            }
            collect_deref_bases(instance, out);
        }
        SimpleValue::ArrayAccess { array } => {
            if let Some(path) = value_path(array) {
                out.push(path);
            }
            collect_deref_bases(array, out);
        }
        _ => {}
    }
}

pub fn local(name: &str) -> SimpleValue {
    SimpleValue::Local(Arc::from(name))
}

pub fn this() -> SimpleValue {
    SimpleValue::This
}

pub fn field(instance: SimpleValue, name: &str) -> SimpleValue {
    SimpleValue::FieldRef {
        instance: Some(Box::new(instance)),
        field: Arc::from(name),
    }
}

pub fn static_field(name: &str) -> SimpleValue {
    SimpleValue::FieldRef {
        instance: None,
        field: Arc::from(name),
    }
}

pub fn elem(array: SimpleValue) -> SimpleValue {
    SimpleValue::ArrayAccess {
        array: Box::new(array),
    }
}

pub fn null() -> SimpleValue {
    SimpleValue::Const(Constant::Null)
}

pub fn int(value: i64) -> SimpleValue {
    SimpleValue::Const(Constant::Int(value))
}

pub fn boolean(value: bool) -> SimpleValue {
    SimpleValue::Const(Constant::Bool(value))
}

pub fn string(value: &str) -> SimpleValue {
    SimpleValue::Const(Constant::Str(Arc::from(value)))
}
