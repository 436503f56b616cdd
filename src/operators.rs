use std::collections::HashMap;

use crate::value::{Value, ValueType};

pub type Combine = fn(&Value, &Value) -> Value;

/// Result type and combining function for one operand-type pair.
#[derive(Debug, Clone, Copy)]
pub struct BinaryOperation {
    pub result: ValueType,
    pub apply: Combine,
}

/// Overloads used by the generic addition node, keyed by (left, right) static types.
#[derive(Debug, Clone, Default)]
pub struct OperatorTable {
    entries: HashMap<(ValueType, ValueType), BinaryOperation>,
}

impl OperatorTable {
    /// A table with no overloads at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The overloads every program starts with.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register(ValueType::Int, ValueType::Float, ValueType::Float, add_float);
        table.register(ValueType::Float, ValueType::Int, ValueType::Float, add_float);
        table.register(ValueType::Float, ValueType::Float, ValueType::Float, add_float);
        table.register(ValueType::Tuple, ValueType::Tuple, ValueType::Tuple, concat_tuples);
        table
    }

    /// Adds or replaces the overload for `(left, right)`.
    pub fn register(
        &mut self,
        left: ValueType,
        right: ValueType,
        result: ValueType,
        apply: Combine,
    ) {
        self.entries
            .insert((left, right), BinaryOperation { result, apply });
    }

    pub fn lookup(&self, left: ValueType, right: ValueType) -> Option<&BinaryOperation> {
        self.entries.get(&(left, right))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn add_float(left: &Value, right: &Value) -> Value {
    let lhs = left.as_float().unwrap_or(0.0);
    let rhs = right.as_float().unwrap_or(0.0);
    Value::Float(lhs + rhs)
}

fn concat_tuples(left: &Value, right: &Value) -> Value {
    let mut values = Vec::new();
    for side in [left, right] {
        if let Value::Tuple(items) = side {
            values.extend(items.iter().cloned());
        }
    }
    Value::Tuple(values)
}
