//! Second pass: apply a plan to the tree, then attach the runtime.

use super::plan::{build_plan, InstrumentationPlan, MethodKey};
use super::shim::{self, ENTRY_HOOK, RETURN_HOOK, VARIABLE_HOOK};
use super::{InstrumentOptions, Instrumented};
use crate::syntax::ast::*;
use crate::syntax::print_compilation_unit;
use crate::utils::config::SHIM_PREFIX;
use crate::utils::error::InstrumentError;
use log::{debug, info};

/// Instrument a parsed unit
///
/// **Public** - entry point of the instrumenter
///
/// # Arguments
/// * `unit` - Parsed source, consumed and returned inside `Instrumented`
/// * `options` - Designated class, entry method and runtime options
///
/// # Errors
/// * `ClassNotFound` - designated class is not declared in the unit
/// * `ReservedName` - designated class already declares a `__trace*` member
/// * `EntryMethodNotFound` - no method with a body has the entry name
pub fn instrument(
    mut unit: CompilationUnit,
    options: &InstrumentOptions,
) -> Result<Instrumented, InstrumentError> {
    let qualifier = type_path(&unit.types, &options.class_name)
        .ok_or_else(|| InstrumentError::ClassNotFound(options.class_name.clone()))?;

    if let Some(designated) = unit.find_type(&options.class_name) {
        if let Some(name) = designated
            .member_names()
            .into_iter()
            .find(|name| name.starts_with(SHIM_PREFIX))
        {
            return Err(InstrumentError::ReservedName(name.to_string()));
        }
    }

    let plan = build_plan(&unit, options);
    if plan.entry.is_empty() {
        return Err(InstrumentError::EntryMethodNotFound {
            class: options.class_name.clone(),
            method: options.entry_method.clone(),
        });
    }

    let mut applier = Applier {
        plan: &plan,
        qualifier: &qualifier,
        next_id: unit.next_id,
    };
    for decl in unit.types.iter_mut() {
        let path = decl.name.clone();
        applier.apply_type(decl, &path);
    }
    let mut next_id = applier.next_id;

    // Attached last so the runtime is never subject to the hook rules
    let designated = unit
        .find_type_mut(&options.class_name)
        .ok_or_else(|| InstrumentError::ClassNotFound(options.class_name.clone()))?;
    shim::attach(designated, options.value_policy, &mut next_id).map_err(InstrumentError::Shim)?;
    unit.next_id = next_id;

    let plan_summary = plan.summary();
    info!(
        "Instrumented {}: {} entry, {} variable, {} return hooks",
        qualifier, plan_summary.entry_hooks, plan_summary.variable_hooks, plan_summary.return_hooks
    );

    let source = print_compilation_unit(&unit);
    debug!("Instrumented source is {} bytes", source.len());

    Ok(Instrumented {
        unit,
        source,
        plan_summary,
        qualifier,
    })
}

/// Dotted path from a top-level type down to `name`
fn type_path(types: &[TypeDecl], name: &str) -> Option<String> {
    types.iter().find_map(|decl| path_within(decl, name))
}

fn path_within(decl: &TypeDecl, name: &str) -> Option<String> {
    if decl.name == name {
        return Some(decl.name.clone());
    }
    decl.members.iter().find_map(|member| match member {
        Member::Type(nested) => path_within(nested, name).map(|rest| format!("{}.{}", decl.name, rest)),
        _ => None,
    })
}

struct Applier<'a> {
    plan: &'a InstrumentationPlan,
    qualifier: &'a str,
    next_id: u32,
}

impl Applier<'_> {
    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn hook(&mut self, routine: &str, args: Vec<Expr>) -> Stmt {
        Stmt {
            id: self.fresh_id(),
            kind: StmtKind::Expr(Expr::static_call(self.qualifier, routine, args)),
        }
    }

    fn variable_hook(&mut self, name: &str) -> Stmt {
        self.hook(VARIABLE_HOOK, vec![Expr::string(name), Expr::name(name)])
    }

    fn hooks_after(&mut self, id: NodeId) -> Vec<Stmt> {
        let plan = self.plan;
        plan.hooks_after(id)
            .iter()
            .map(|name| self.variable_hook(name))
            .collect()
    }

    fn apply_type(&mut self, decl: &mut TypeDecl, path: &str) {
        let plan = self.plan;
        for (index, member) in decl.members.iter_mut().enumerate() {
            match member {
                Member::Method(method) => {
                    let Some(body) = method.body.as_mut() else {
                        continue;
                    };
                    self.apply_block(body);

                    let key = MethodKey {
                        type_path: path.to_string(),
                        member: index,
                    };
                    if let Some(entry) = plan.entry.get(&key) {
                        let mut args = vec![Expr::string(&entry.method)];
                        for param in &entry.params {
                            args.push(Expr::string(param));
                            args.push(Expr::name(param.as_str()));
                        }
                        let hook = self.hook(ENTRY_HOOK, args);
                        body.insert(0, hook);
                    }
                }
                Member::Constructor(ctor) => self.apply_block(&mut ctor.body),
                Member::Initializer(init) => self.apply_block(&mut init.body),
                Member::Type(nested) => {
                    let nested_path = format!("{}.{}", path, nested.name);
                    self.apply_type(nested, &nested_path);
                }
                Member::Field(_) => {}
            }
        }
    }

    fn apply_block(&mut self, block: &mut Block) {
        self.apply_stmts(&mut block.stmts);
    }

    /// Rebuild a statement list with planned hooks after their statements
    fn apply_stmts(&mut self, stmts: &mut Vec<Stmt>) {
        let original = std::mem::take(stmts);
        for mut stmt in original {
            self.apply_stmt(&mut stmt);
            let hooks = self.hooks_after(stmt.id);
            stmts.push(stmt);
            stmts.extend(hooks);
        }
    }

    /// Body of a control statement; wrapped in a block when it gains hooks
    fn apply_body(&mut self, body: &mut Stmt) {
        if let StmtKind::Block(block) = &mut body.kind {
            self.apply_block(block);
            return;
        }
        self.apply_stmt(body);
        let hooks = self.hooks_after(body.id);
        if hooks.is_empty() {
            return;
        }
        let placeholder = Stmt {
            id: self.fresh_id(),
            kind: StmtKind::Empty,
        };
        let original = std::mem::replace(body, placeholder);
        let mut stmts = vec![original];
        stmts.extend(hooks);
        body.kind = StmtKind::Block(Block::new(stmts));
    }

    /// Arrow case bodies are a single statement; wrap when hooks are added
    fn apply_arrow_body(&mut self, body: &mut Vec<Stmt>) {
        let before = body.len();
        self.apply_stmts(body);
        if body.len() > before {
            let stmts = std::mem::take(body);
            let id = self.fresh_id();
            body.push(Stmt {
                id,
                kind: StmtKind::Block(Block::new(stmts)),
            });
        }
    }

    fn apply_stmt(&mut self, stmt: &mut Stmt) {
        let (plan, qualifier) = (self.plan, self.qualifier);
        let id = stmt.id;
        match &mut stmt.kind {
            StmtKind::Block(block) => self.apply_block(block),
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.apply_body(then_branch);
                if let Some(else_branch) = else_branch {
                    self.apply_body(else_branch);
                }
            }
            StmtKind::While { body, .. }
            | StmtKind::DoWhile { body, .. }
            | StmtKind::For { body, .. }
            | StmtKind::ForEach { body, .. }
            | StmtKind::Labeled { body, .. } => self.apply_body(body),
            StmtKind::Try {
                body,
                catches,
                finally,
                ..
            } => {
                self.apply_block(body);
                for catch in catches {
                    self.apply_block(&mut catch.body);
                }
                if let Some(finally) = finally {
                    self.apply_block(finally);
                }
            }
            StmtKind::Switch { cases, .. } => {
                for case in cases {
                    if case.arrow {
                        self.apply_arrow_body(&mut case.body);
                    } else {
                        self.apply_stmts(&mut case.body);
                    }
                }
            }
            StmtKind::Synchronized { body, .. } => self.apply_block(body),
            StmtKind::Return(Some(value)) => {
                if let Some(hook) = plan.returns.get(&id) {
                    let mut inner = std::mem::replace(value, Expr::This);
                    if let Some(cast) = &hook.cast {
                        inner = Expr::Cast {
                            ty: TypeRef::simple(cast.as_str()),
                            expr: Box::new(Expr::Paren(Box::new(inner))),
                        };
                    }
                    *value = Expr::static_call(qualifier, RETURN_HOOK, vec![Expr::string(&hook.method), inner]);
                }
            }
            _ => {}
        }
    }
}
