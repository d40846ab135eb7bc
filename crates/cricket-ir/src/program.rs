//! Program, function and variable definitions.
//!
//! A [`Program`] owns a single variable arena and a function arena.
//! Cross-references (`VarName` → declaration, call → callee) are arena
//! indices resolved through the owning program, so the ownership graph is a
//! strict tree.

use crate::error::ValidationError;
use crate::stmt::Stmt;
use crate::types::Ty;

/// Index of a variable definition in [`Program::vars`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

/// Index of a function definition in [`Program::funs`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunId(pub usize);

/// Where a variable is declared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Global,
    Local(FunId),
}

/// A variable declaration.
#[derive(Clone, Debug)]
pub struct VarDef {
    pub name: String,
    pub ty: Ty,
    pub scope: Scope,
}

impl VarDef {
    pub fn is_global(&self) -> bool {
        matches!(self.scope, Scope::Global)
    }

    pub fn is_local(&self) -> bool {
        matches!(self.scope, Scope::Local(_))
    }

    /// The owning function for locals, `None` for globals.
    pub fn function(&self) -> Option<FunId> {
        match self.scope {
            Scope::Global => None,
            Scope::Local(f) => Some(f),
        }
    }
}

/// A parameterless procedure definition.
#[derive(Clone, Debug)]
pub struct FunDef {
    pub name: String,
    /// Ordered local variables, indices into the program's variable arena.
    pub locals: Vec<VarId>,
    pub body: Vec<Stmt>,
}

/// Top-level IR node: ordered globals and functions.
///
/// Construction allocates globals first and then each function's locals in
/// declaration order, so the arena index order is exactly the
/// globals-then-locals layout the control-flow graph assigns to decision
/// diagram variables.
#[derive(Clone, Debug, Default)]
pub struct Program {
    pub vars: Vec<VarDef>,
    pub funs: Vec<FunDef>,
}

impl Program {
    /// Assemble a program from parsed pieces.
    ///
    /// `funs` carries `(name, locals, body)` triples; local declarations are
    /// moved into the shared arena.
    pub fn new(globals: Vec<(String, Ty)>, funs: Vec<(String, Vec<(String, Ty)>, Vec<Stmt>)>) -> Self {
        let mut vars: Vec<VarDef> = globals
            .into_iter()
            .map(|(name, ty)| VarDef {
                name,
                ty,
                scope: Scope::Global,
            })
            .collect();

        let mut fun_defs = Vec::new();
        for (fid, (name, locals, body)) in funs.into_iter().enumerate() {
            let mut local_ids = Vec::new();
            for (lname, lty) in locals {
                local_ids.push(VarId(vars.len()));
                vars.push(VarDef {
                    name: lname,
                    ty: lty,
                    scope: Scope::Local(FunId(fid)),
                });
            }
            fun_defs.push(FunDef {
                name,
                locals: local_ids,
                body,
            });
        }

        Program {
            vars,
            funs: fun_defs,
        }
    }

    pub fn var(&self, id: VarId) -> &VarDef {
        &self.vars[id.0]
    }

    pub fn fun(&self, id: FunId) -> &FunDef {
        &self.funs[id.0]
    }

    /// Ids of all global variables, in declaration order.
    pub fn globals(&self) -> impl Iterator<Item = VarId> + '_ {
        self.vars
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_global())
            .map(|(i, _)| VarId(i))
    }

    pub fn num_globals(&self) -> usize {
        self.vars.iter().filter(|v| v.is_global()).count()
    }

    pub fn num_locals(&self) -> usize {
        self.vars.len() - self.num_globals()
    }

    /// Look up a global variable by name.
    pub fn global_by_name(&self, name: &str) -> Option<VarId> {
        self.vars
            .iter()
            .position(|v| v.is_global() && v.name == name)
            .map(VarId)
    }

    /// Look up a function by name.
    pub fn fun_by_name(&self, name: &str) -> Option<FunId> {
        self.funs.iter().position(|f| f.name == name).map(FunId)
    }

    /// Look up a local of `fun` by name.
    pub fn local_by_name(&self, fun: FunId, name: &str) -> Option<VarId> {
        self.fun(fun)
            .locals
            .iter()
            .copied()
            .find(|&id| self.var(id).name == name)
    }

    /// Resolve a name in the scope of `fun`: the function's locals shadow
    /// globals.
    pub fn resolve(&self, fun: Option<FunId>, name: &str) -> Option<VarId> {
        if let Some(f) = fun {
            if let Some(id) = self.local_by_name(f, name) {
                return Some(id);
            }
        }
        self.global_by_name(name)
    }

    /// The unique entry function.
    pub fn main(&self) -> Result<FunId, ValidationError> {
        self.fun_by_name("main").ok_or(ValidationError::MissingMain)
    }

    /// Map a procedure index (assigned in function order by the CFG builder)
    /// back to its function.
    pub fn fun_of_procedure(&self, proc_id: usize) -> Option<FunId> {
        if proc_id < self.funs.len() {
            Some(FunId(proc_id))
        } else {
            None
        }
    }
}
