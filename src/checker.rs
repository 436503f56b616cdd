//! Type registry and the ledger of deferred "type must be declared" checks.
//!
//! A declaration such as `var a structA` may name a type whose `type structA` statement
//! only appears further down the unit. The parser allocates an id for the name right away
//! and leaves a [`DeferredCheck`] behind; checks whose type is still undeclared when
//! analysis finishes turn into diagnostics.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::{
    diagnostics::Diagnostic,
    value::{FIRST_USER_TYPE_ID, TypeId, ValueType},
};

/// A pending obligation: `type_name` must be declared, otherwise `diagnostic` fires.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredCheck {
    pub type_name: String,
    pub diagnostic: Diagnostic,
}

impl DeferredCheck {
    pub fn new(type_name: impl Into<String>, diagnostic: Diagnostic) -> Self {
        Self {
            type_name: type_name.into(),
            diagnostic,
        }
    }
}

/// Returned by [`TypeRegistry::declare`] when the name was declared before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyDeclared(pub ValueType);

/// Append-only table of user type names for one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    ids: IndexMap<String, TypeId>,
    declared: HashSet<String>,
    pending: BTreeMap<String, Vec<DeferredCheck>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `name`, allocating the next one on first sight.
    pub fn type_of(&mut self, name: &str) -> ValueType {
        if let Some(id) = self.ids.get(name) {
            return ValueType::User(*id);
        }
        let id = FIRST_USER_TYPE_ID + self.ids.len() as TypeId;
        self.ids.insert(name.to_string(), id);
        debug!(name, id, "allocated user type id");
        ValueType::User(id)
    }

    /// Looks a name up without allocating.
    pub fn lookup(&self, name: &str) -> Option<ValueType> {
        self.ids.get(name).map(|id| ValueType::User(*id))
    }

    pub fn name_of(&self, ty: ValueType) -> Option<&str> {
        match ty {
            ValueType::User(id) => {
                let index = id.checked_sub(FIRST_USER_TYPE_ID)? as usize;
                self.ids.get_index(index).map(|(name, _)| name.as_str())
            }
            _ => None,
        }
    }

    /// Human readable name: builtins by keyword, user types by their declared name.
    pub fn describe(&self, ty: ValueType) -> String {
        self.name_of(ty)
            .map(str::to_string)
            .unwrap_or_else(|| ty.to_string())
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.declared.contains(name)
    }

    /// Marks `name` as declared and discards every watcher attached to it.
    pub fn declare(&mut self, name: &str) -> Result<ValueType, AlreadyDeclared> {
        let ty = self.type_of(name);
        if !self.declared.insert(name.to_string()) {
            return Err(AlreadyDeclared(ty));
        }
        if let Some(satisfied) = self.pending.remove(name) {
            debug!(name, count = satisfied.len(), "deferred type checks satisfied");
        }
        Ok(ty)
    }

    /// Attaches a watcher unless the type is already declared.
    pub fn ensure_declared(&mut self, check: DeferredCheck) {
        if self.is_declared(&check.type_name) {
            trace!(name = %check.type_name, "type already declared, no watcher");
            return;
        }
        debug!(name = %check.type_name, "watching for type declaration");
        self.pending
            .entry(check.type_name.clone())
            .or_default()
            .push(check);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Drains the ledger: one diagnostic per unsatisfied watcher, type names in
    /// lexicographic order and watchers in registration order within a name.
    pub fn take_unresolved(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.pending)
            .into_values()
            .flatten()
            .map(|check| check.diagnostic)
            .collect()
    }
}
