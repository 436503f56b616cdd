use crate::{operators::OperatorTable, value::ValueType};

/// Executable tree nodes. Top-level statements and expressions share one family; the
/// runtime matches on it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Introduces `name` in the current scope without a value.
    Declare { name: String, ty: ValueType },
    /// Evaluates `value` and binds the result to `name`.
    Set {
        name: String,
        ty: ValueType,
        value: Box<Node>,
    },
    Get { name: String, ty: ValueType },
    Bool(bool),
    Int(i64),
    Float(f64),
    Tuple(Vec<Node>),
    AddInt { left: Box<Node>, right: Box<Node> },
    SubInt { left: Box<Node>, right: Box<Node> },
    /// Addition resolved through the operator-overload table.
    AddAny { left: Box<Node>, right: Box<Node> },
    Print(Box<Node>),
    Block(Vec<Node>),
}

impl Node {
    pub fn declare(name: impl Into<String>, ty: ValueType) -> Self {
        Node::Declare {
            name: name.into(),
            ty,
        }
    }

    pub fn set(name: impl Into<String>, ty: ValueType, value: Node) -> Self {
        Node::Set {
            name: name.into(),
            ty,
            value: Box::new(value),
        }
    }

    pub fn get(name: impl Into<String>, ty: ValueType) -> Self {
        Node::Get {
            name: name.into(),
            ty,
        }
    }

    /// The type this node produces, known without running it.
    pub fn static_type(&self, operators: &OperatorTable) -> ValueType {
        match self {
            Node::Declare { ty, .. } | Node::Get { ty, .. } => *ty,
            Node::Set { value, .. } => value.static_type(operators),
            Node::Bool(_) => ValueType::Bool,
            Node::Int(_) | Node::AddInt { .. } | Node::SubInt { .. } => ValueType::Int,
            Node::Float(_) => ValueType::Float,
            Node::Tuple(_) => ValueType::Tuple,
            Node::AddAny { left, right } => operators
                .lookup(left.static_type(operators), right.static_type(operators))
                .map(|operation| operation.result)
                .unwrap_or(ValueType::None),
            Node::Print(_) | Node::Block(_) => ValueType::None,
        }
    }
}
