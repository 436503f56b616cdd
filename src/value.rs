use std::fmt;

/// Numeric identity of a static type. Builtins occupy the low ordinals and user types
/// are numbered from [`FIRST_USER_TYPE_ID`] upward.
pub type TypeId = u32;

pub const FIRST_USER_TYPE_ID: TypeId = ValueType::Function.id() + 1;

/// Static types: the fixed builtin kinds plus an open range of user-defined ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    None,
    Bool,
    Int,
    Float,
    Vector,
    Tuple,
    Function,
    User(TypeId),
}

impl ValueType {
    pub const fn id(self) -> TypeId {
        match self {
            ValueType::None => 0,
            ValueType::Bool => 1,
            ValueType::Int => 2,
            ValueType::Float => 3,
            ValueType::Vector => 4,
            ValueType::Tuple => 5,
            ValueType::Function => 6,
            ValueType::User(id) => id,
        }
    }

    pub fn is_builtin(self) -> bool {
        !matches!(self, ValueType::User(_))
    }

    /// Maps a builtin type keyword to its type. `string` is a keyword without a
    /// runtime representation and resolves to nothing.
    pub fn from_builtin_name(name: &str) -> Option<Self> {
        let ty = match name {
            "bool" => ValueType::Bool,
            "int" => ValueType::Int,
            "float" => ValueType::Float,
            "tuple" => ValueType::Tuple,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::None => write!(f, "none"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Vector => write!(f, "vector"),
            ValueType::Tuple => write!(f, "tuple"),
            ValueType::Function => write!(f, "function"),
            ValueType::User(id) => write!(f, "user type #{id}"),
        }
    }
}

/// Text used for a tuple slot that holds no value.
pub const ABSENT: &str = "nil";

/// Runtime values. A tuple slot may be absent when it was read from a variable that was
/// declared but never assigned.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Tuple(Vec<Option<Value>>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Tuple(_) => ValueType::Tuple,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Space separated element text, used by `print` for tuples.
    pub fn tuple_text(values: &[Option<Value>]) -> String {
        values
            .iter()
            .map(|value| match value {
                Some(value) => value.to_string(),
                None => ABSENT.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Tuple(values) => write!(f, "({})", Value::tuple_text(values)),
        }
    }
}
