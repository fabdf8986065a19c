//! First pass: decide every hook without touching the tree.
//!
//! The planner walks the original members of every named type (top-level and
//! nested member types), tracks which names are declared in each lexical scope
//! and records hooks keyed by statement id. Lambda bodies, anonymous class
//! bodies, local class bodies and `for` headers are not entered.

use super::InstrumentOptions;
use crate::syntax::ast::*;
use log::debug;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Location of a method: dotted type path plus member index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub type_path: String,
    pub member: usize,
}

/// Entry hook for one method
#[derive(Debug, Clone, PartialEq)]
pub struct EntryHook {
    pub method: String,
    pub params: Vec<String>,
}

/// Return hook for one `return <expr>;`
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnHook {
    pub method: String,
    /// Primitive the traced value is cast back to; a boxed `int` does not
    /// narrow to `byte`, `short` or `char`
    pub cast: Option<String>,
}

/// Primitive return types that need an explicit cast around the hook argument
const NARROW_RETURN_TYPES: &[&str] = &["byte", "short", "char"];

/// Everything the apply pass inserts
///
/// **Public** - immutable output of `build_plan`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstrumentationPlan {
    /// Methods that receive an entry hook at position 0
    pub entry: HashMap<MethodKey, EntryHook>,

    /// Variable names to report right after a statement, in order
    pub after: HashMap<NodeId, Vec<String>>,

    /// `return <expr>;` statements to wrap
    pub returns: HashMap<NodeId, ReturnHook>,
}

/// Hook counts reported alongside the instrumented source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub entry_hooks: usize,
    pub variable_hooks: usize,
    pub return_hooks: usize,
}

impl InstrumentationPlan {
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            entry_hooks: self.entry.len(),
            variable_hooks: self.after.values().map(Vec::len).sum(),
            return_hooks: self.returns.len(),
        }
    }

    pub fn hooks_after(&self, id: NodeId) -> &[String] {
        self.after.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Build the plan for a parsed unit
///
/// **Public** - read-only pass over the tree
pub fn build_plan(unit: &CompilationUnit, options: &InstrumentOptions) -> InstrumentationPlan {
    let mut planner = Planner {
        options,
        scopes: Vec::new(),
        in_entry: None,
        plan: InstrumentationPlan::default(),
    };
    for decl in &unit.types {
        planner.plan_type(decl, &decl.name);
    }

    let summary = planner.plan.summary();
    debug!(
        "Planned {} entry, {} variable and {} return hooks",
        summary.entry_hooks, summary.variable_hooks, summary.return_hooks
    );
    planner.plan
}

struct Planner<'a> {
    options: &'a InstrumentOptions,
    scopes: Vec<HashSet<String>>,
    /// Return hook template of the enclosing entry method, if any
    in_entry: Option<ReturnHook>,
    plan: InstrumentationPlan,
}

impl Planner<'_> {
    fn is_declared(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains(name))
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn with_scope<'n>(&mut self, names: impl IntoIterator<Item = &'n str>, f: impl FnOnce(&mut Self)) {
        self.scopes.push(names.into_iter().map(str::to_string).collect());
        f(self);
        self.scopes.pop();
    }

    fn hook_after(&mut self, id: NodeId, name: &str) {
        self.plan.after.entry(id).or_default().push(name.to_string());
    }

    fn plan_type(&mut self, decl: &TypeDecl, path: &str) {
        // Fields and record components are assignment targets too
        let fields: Vec<&str> = decl
            .record_components
            .iter()
            .map(|component| component.name.as_str())
            .chain(
                decl.members
                    .iter()
                    .filter_map(|member| match member {
                        Member::Field(field) => Some(field.declarators.iter().map(|d| d.name.as_str())),
                        _ => None,
                    })
                    .flatten(),
            )
            .collect();

        self.with_scope(fields, |p| {
            for (index, member) in decl.members.iter().enumerate() {
                match member {
                    Member::Method(method) => p.plan_method(method, path, index),
                    Member::Constructor(ctor) => {
                        let params = ctor.params.iter().map(|param| param.name.as_str());
                        p.with_scope(params, |p| p.plan_block(&ctor.body));
                    }
                    Member::Initializer(init) => p.plan_block(&init.body),
                    Member::Type(nested) => p.plan_type(nested, &format!("{}.{}", path, nested.name)),
                    Member::Field(_) => {}
                }
            }
        });
    }

    fn plan_method(&mut self, method: &MethodDecl, path: &str, index: usize) {
        let Some(body) = &method.body else {
            return;
        };

        let is_entry = method.name == self.options.entry_method;
        if is_entry {
            self.plan.entry.insert(
                MethodKey {
                    type_path: path.to_string(),
                    member: index,
                },
                EntryHook {
                    method: method.name.clone(),
                    params: method.params.iter().map(|param| param.name.clone()).collect(),
                },
            );
        }

        let template = is_entry.then(|| ReturnHook {
            method: method.name.clone(),
            cast: (method.return_type.is_primitive()
                && NARROW_RETURN_TYPES.contains(&method.return_type.segments[0].name.as_str()))
            .then(|| method.return_type.to_string()),
        });
        let saved = std::mem::replace(&mut self.in_entry, template);
        let params = method.params.iter().map(|param| param.name.as_str());
        self.with_scope(params, |p| p.plan_block(body));
        self.in_entry = saved;
    }

    fn plan_block(&mut self, block: &Block) {
        self.with_scope([], |p| p.plan_stmts(&block.stmts));
    }

    /// Statements sharing the current scope
    fn plan_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.plan_stmt(stmt);
        }
    }

    fn plan_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.plan_block(block),
            StmtKind::LocalVar(local) => {
                for declarator in &local.declarators {
                    self.declare(&declarator.name);
                    if declarator.init.is_some() {
                        self.hook_after(stmt.id, &declarator.name);
                    }
                }
            }
            StmtKind::Expr(expr) => {
                if let Some(name) = self.assigned_name(expr) {
                    self.hook_after(stmt.id, &name);
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let bindings = pattern_bindings(cond);
                self.with_scope(bindings.iter().map(String::as_str), |p| {
                    p.plan_stmt(then_branch);
                    if let Some(else_branch) = else_branch {
                        p.plan_stmt(else_branch);
                    }
                });
            }
            StmtKind::While { cond, body } => {
                let bindings = pattern_bindings(cond);
                self.with_scope(bindings.iter().map(String::as_str), |p| p.plan_stmt(body));
            }
            StmtKind::DoWhile { body, .. } => self.plan_stmt(body),
            StmtKind::For { init, body, .. } => {
                let names: Vec<&str> = match init {
                    ForInit::Decl(local) => local.declarators.iter().map(|d| d.name.as_str()).collect(),
                    _ => Vec::new(),
                };
                self.with_scope(names, |p| p.plan_stmt(body));
            }
            StmtKind::ForEach { name, body, .. } => {
                self.with_scope([name.as_str()], |p| p.plan_stmt(body));
            }
            StmtKind::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                let names = resources.iter().filter_map(|resource| match resource {
                    Resource::Decl { name, .. } => Some(name.as_str()),
                    Resource::Expr(_) => None,
                });
                self.with_scope(names, |p| p.plan_block(body));
                for catch in catches {
                    self.with_scope([catch.name.as_str()], |p| p.plan_block(&catch.body));
                }
                if let Some(finally) = finally {
                    self.plan_block(finally);
                }
            }
            StmtKind::Switch { cases, .. } => {
                // Colon groups share one scope, arrow bodies each get their own
                self.with_scope([], |p| {
                    for case in cases {
                        if case.arrow {
                            p.with_scope([], |p| p.plan_stmts(&case.body));
                        } else {
                            p.plan_stmts(&case.body);
                        }
                    }
                });
            }
            StmtKind::Labeled { body, .. } => self.plan_stmt(body),
            StmtKind::Synchronized { body, .. } => self.plan_block(body),
            StmtKind::Return(Some(_)) if self.options.trace_returns => {
                if let Some(hook) = &self.in_entry {
                    self.plan.returns.insert(stmt.id, hook.clone());
                }
            }
            StmtKind::Return(_)
            | StmtKind::LocalClass(_)
            | StmtKind::Break(_)
            | StmtKind::Continue(_)
            | StmtKind::Throw(_)
            | StmtKind::Yield(_)
            | StmtKind::Assert { .. }
            | StmtKind::Empty => {}
        }
    }

    /// Declared variable written by an expression statement
    fn assigned_name(&self, expr: &Expr) -> Option<String> {
        let target = match expr {
            Expr::Assign { target, .. } => &**target,
            Expr::Unary { op, operand } | Expr::Postfix { op, operand } if op == "++" || op == "--" => {
                &**operand
            }
            _ => return None,
        };
        let name = target.base_name()?;
        self.is_declared(name).then(|| name.to_string())
    }
}

/// `instanceof` pattern variables introduced by a condition
fn pattern_bindings(expr: &Expr) -> Vec<String> {
    let mut names = Vec::new();
    collect_bindings(expr, &mut names);
    names
}

fn collect_bindings(expr: &Expr, names: &mut Vec<String>) {
    match expr {
        Expr::InstanceOf { expr, binding, .. } => {
            if let Some(binding) = binding {
                names.push(binding.clone());
            }
            collect_bindings(expr, names);
        }
        Expr::Binary { lhs, rhs, .. } => {
            collect_bindings(lhs, names);
            collect_bindings(rhs, names);
        }
        Expr::Unary { operand, .. } => collect_bindings(operand, names),
        Expr::Paren(inner) => collect_bindings(inner, names),
        _ => {}
    }
}
