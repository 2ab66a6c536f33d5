//! Symbol table with a scope-depth chain
//!
//! Every declaration is appended in source order and tagged with the scope
//! depth it was made at. Closing a scope only marks its symbols invalid, so
//! the full history stays available for the final dump. Lookup resolves to
//! the innermost valid binding at or above the current depth.
//!
//! Handles (`SymbolId`) stay stable until `cleanup`, which physically drops
//! entries and is only run once the program has been reduced.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::types::{DataType, Value};
use crate::utils::{Error, Result};

/// Unique identifier for a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

/// What introduced the symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolRole {
    Identifier,
    Param,
    Function,
}

impl SymbolRole {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Param => "param",
            Self::Function => "function",
        }
    }
}

/// Symbol information
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: DataType,
    pub role: SymbolRole,
    pub depth: u32,
    pub valid: bool,
    pub line: u32,
    pub value: Value,
}

impl Symbol {
    fn placeholder(name: &str, depth: u32, line: u32) -> Self {
        Self {
            name: name.to_string(),
            ty: DataType::Untyped,
            role: SymbolRole::Identifier,
            depth,
            valid: true,
            line,
            value: Value::Undefined,
        }
    }
}

/// Outcome of a declaring lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declaration {
    /// The name is now bound to this symbol
    Bound(SymbolId),
    /// Already declared at this depth; the original binding is kept
    Redefinition(SymbolId),
}

/// Outcome of a referencing lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub id: SymbolId,
    /// No typed binding is visible; `id` is an untyped placeholder
    pub undeclared: bool,
}

/// One row of the symbol table dump
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub role: SymbolRole,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: DataType,
    pub scope: u32,
    pub line: u32,
    /// Statically known value, if any
    pub value: Option<Value>,
}

/// Symbol table ordered by insertion
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: Vec<Symbol>,
    depth: u32,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scope depth (0 = top level)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Enter a new scope
    pub fn open_scope(&mut self) -> u32 {
        self.depth += 1;
        debug!("open scope -> depth {}", self.depth);
        self.depth
    }

    /// Exit the current scope, invalidating everything declared in it.
    /// Returns how many symbols went out of scope.
    pub fn close_scope(&mut self, line: u32) -> Result<usize> {
        if self.depth == 0 {
            return Err(Error::NegativeScopeDepth { line });
        }
        let depth = self.depth;
        let mut closed = 0;
        for symbol in self.entries.iter_mut().filter(|s| s.valid && s.depth == depth) {
            symbol.valid = false;
            closed += 1;
        }
        self.depth -= 1;
        debug!("close scope {} ({} symbol(s) invalidated) -> depth {}", depth, closed, self.depth);
        Ok(closed)
    }

    /// Exit a function scope; parameters are invalidated wherever they sit
    pub fn close_function_scope(&mut self, line: u32) -> Result<usize> {
        let mut closed = 0;
        for symbol in self
            .entries
            .iter_mut()
            .filter(|s| s.valid && s.role == SymbolRole::Param)
        {
            symbol.valid = false;
            closed += 1;
        }
        Ok(closed + self.close_scope(line)?)
    }

    /// Innermost valid binding visible at the current depth
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, s)| s.valid && s.depth <= self.depth && s.name == name)
            .max_by_key(|(_, s)| s.depth)
            .map(|(i, _)| SymbolId(i))
    }

    /// Resolve `name`, appending an untyped symbol at the current depth when
    /// nothing is visible
    pub fn lookup_or_declare(&mut self, name: &str, line: u32) -> SymbolId {
        match self.lookup(name) {
            Some(id) => id,
            None => self.append(Symbol::placeholder(name, self.depth, line)),
        }
    }

    /// Declare `name` at the current depth with a concrete type.
    ///
    /// A typed, still valid binding at the same depth is a redefinition and
    /// leaves the table untouched. An untyped binding at the same depth (left
    /// behind by an earlier undeclared use) is adopted. Anything else,
    /// including an outer binding, gets a fresh symbol that shadows it.
    pub fn declare(
        &mut self,
        name: &str,
        ty: DataType,
        role: SymbolRole,
        value: Value,
        line: u32,
    ) -> Declaration {
        if let Some(id) = self.lookup(name) {
            let existing = &self.entries[id.0];
            if existing.depth == self.depth {
                if existing.ty.is_typed() {
                    return Declaration::Redefinition(id);
                }
                self.bind_type(id, ty, value);
                let symbol = &mut self.entries[id.0];
                symbol.role = role;
                symbol.line = line;
                return Declaration::Bound(id);
            }
            trace!("'{}' shadows binding at depth {}", name, existing.depth);
        }
        let mut symbol = Symbol::placeholder(name, self.depth, line);
        symbol.role = role;
        let id = self.append(symbol);
        self.bind_type(id, ty, value);
        Declaration::Bound(id)
    }

    /// Resolve a use of `name`. An unresolved or untyped name yields an
    /// untyped placeholder so the caller still has an operand.
    pub fn reference(&mut self, name: &str, line: u32) -> Reference {
        let id = self.lookup_or_declare(name, line);
        Reference {
            id,
            undeclared: !self.entries[id.0].ty.is_typed(),
        }
    }

    /// Attach a type and initial value to a symbol
    pub fn bind_type(&mut self, id: SymbolId, ty: DataType, value: Value) {
        let symbol = &mut self.entries[id.0];
        symbol.ty = ty;
        symbol.value = value.convert_to(ty);
    }

    /// Record a newly assigned value
    pub fn set_value(&mut self, id: SymbolId, value: Value) {
        let symbol = &mut self.entries[id.0];
        symbol.value = value.convert_to(symbol.ty);
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.entries[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop never-typed symbols and the `main` function entry.
    /// Invalidates every outstanding `SymbolId`.
    pub fn cleanup(&mut self) {
        let before = self.entries.len();
        self.entries.retain(|s| {
            s.ty.is_typed() && !(s.role == SymbolRole::Function && s.name == "main")
        });
        debug!("symbol cleanup removed {} entr(ies)", before - self.entries.len());
    }

    /// Surviving typed symbols in declaration order
    pub fn dump(&self) -> Vec<SymbolRecord> {
        self.entries
            .iter()
            .filter(|s| s.ty.is_typed())
            .map(|s| SymbolRecord {
                role: s.role,
                name: s.name.clone(),
                ty: s.ty,
                scope: s.depth,
                line: s.line,
                value: Some(s.value).filter(Value::is_defined),
            })
            .collect()
    }

    fn append(&mut self, symbol: Symbol) -> SymbolId {
        trace!("new symbol '{}' at depth {}", symbol.name, symbol.depth);
        let id = SymbolId(self.entries.len());
        self.entries.push(symbol);
        id
    }
}
