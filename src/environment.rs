use std::fmt;

use indexmap::IndexMap;

use crate::value::{ABSENT, Value};

/// One nesting level of variables. A binding of `None` is declared but not yet assigned.
///
/// Scopes hold copies, not references to their enclosing frames: a frame built with
/// [`Scope::merge`] sees the donor's bindings as they were at merge time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    bindings: IndexMap<String, Option<Value>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, replacing any earlier binding in this scope.
    pub fn define(&mut self, name: impl Into<String>, value: Option<Value>) {
        self.bindings.insert(name.into(), value);
    }

    /// `None` when the name is unknown, `Some(None)` when it is declared but unassigned.
    pub fn get(&self, name: &str) -> Option<Option<&Value>> {
        self.bindings.get(name).map(Option::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Copies every binding of `donor` whose name this scope does not define yet.
    /// Local bindings always win.
    pub fn merge(&mut self, donor: &Scope) {
        for (name, value) in &donor.bindings {
            if !self.bindings.contains_key(name) {
                self.bindings.insert(name.clone(), value.clone());
            }
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.bindings.keys().collect();
        names.sort();
        writeln!(f, "{{")?;
        for name in names {
            match &self.bindings[name.as_str()] {
                Some(value) => writeln!(f, "{name}: {value}")?,
                None => writeln!(f, "{name}: {ABSENT}")?,
            }
        }
        write!(f, "}}")
    }
}
