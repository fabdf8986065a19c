//! Renders a syntax tree back to compilable Java source.
//!
//! Formatting is normalized (4-space indentation, one statement per line).
//! Comments are not preserved. Parenthesized expressions are kept as written,
//! so no precedence analysis is needed when printing.

use super::ast::*;

const INDENT: &str = "    ";

/// Render a whole compilation unit
///
/// **Public** - used by the instrumenter to produce the final source
pub fn print_compilation_unit(unit: &CompilationUnit) -> String {
    let mut printer = Printer::default();
    printer.unit(unit);
    printer.out
}

/// Render a single statement at zero indentation
pub fn print_stmt(stmt: &Stmt) -> String {
    let mut printer = Printer::default();
    printer.stmt(stmt);
    printer.out
}

/// Render a single expression
pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::default();
    printer.expr(expr);
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn newline(&mut self) {
        self.out.push('\n');
    }

    fn pad(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
    }

    fn comma_list<T>(&mut self, items: &[T], mut each: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            each(self, item);
        }
    }

    // ─── Declarations ───────────────────────────────────────────────────

    fn unit(&mut self, unit: &CompilationUnit) {
        if let Some(package) = &unit.package {
            self.write(&format!("package {};\n\n", package));
        }
        if !unit.imports.is_empty() {
            for import in &unit.imports {
                self.write("import ");
                if import.is_static {
                    self.write("static ");
                }
                self.write(&import.path);
                if import.wildcard {
                    self.write(".*");
                }
                self.write(";\n");
            }
            self.newline();
        }
        for (i, decl) in unit.types.iter().enumerate() {
            if i > 0 {
                self.newline();
            }
            self.type_decl(decl);
            self.newline();
        }
    }

    fn annotation(&mut self, annotation: &Annotation) {
        self.write("@");
        self.write(&annotation.name);
        if let Some(args) = &annotation.args {
            self.write("(");
            self.comma_list(args, |p, arg| p.expr(arg));
            self.write(")");
        }
    }

    /// Annotations on their own lines, keywords inline
    fn declaration_modifiers(&mut self, modifiers: &Modifiers) {
        for annotation in &modifiers.annotations {
            self.annotation(annotation);
            self.newline();
            self.pad();
        }
        for keyword in &modifiers.keywords {
            self.write(keyword);
            self.write(" ");
        }
    }

    fn inline_modifiers(&mut self, modifiers: &Modifiers) {
        for annotation in &modifiers.annotations {
            self.annotation(annotation);
            self.write(" ");
        }
        for keyword in &modifiers.keywords {
            self.write(keyword);
            self.write(" ");
        }
    }

    fn type_ref(&mut self, ty: &TypeRef) {
        self.write(&ty.to_string());
    }

    fn type_list(&mut self, types: &[TypeRef]) {
        self.comma_list(types, |p, ty| p.type_ref(ty));
    }

    fn type_params(&mut self, params: &[TypeParam]) {
        if params.is_empty() {
            return;
        }
        self.write("<");
        self.comma_list(params, |p, param| {
            p.write(&param.name);
            for (i, bound) in param.bounds.iter().enumerate() {
                p.write(if i == 0 { " extends " } else { " & " });
                p.type_ref(bound);
            }
        });
        self.write(">");
    }

    fn type_decl(&mut self, decl: &TypeDecl) {
        self.declaration_modifiers(&decl.modifiers);
        self.write(match decl.kind {
            TypeKind::Class => "class ",
            TypeKind::Interface => "interface ",
            TypeKind::Enum => "enum ",
            TypeKind::Record => "record ",
        });
        self.write(&decl.name);
        self.type_params(&decl.type_params);
        if decl.kind == TypeKind::Record {
            self.params(&decl.record_components);
        }
        if !decl.extends.is_empty() {
            self.write(" extends ");
            self.type_list(&decl.extends);
        }
        if !decl.implements.is_empty() {
            self.write(" implements ");
            self.type_list(&decl.implements);
        }
        if !decl.permits.is_empty() {
            self.write(" permits ");
            self.type_list(&decl.permits);
        }
        self.write(" ");
        self.class_body(&decl.enum_constants, &decl.members, decl.kind == TypeKind::Enum);
    }

    fn class_body(&mut self, constants: &[EnumConstant], members: &[Member], is_enum: bool) {
        self.write("{");
        if constants.is_empty() && members.is_empty() {
            self.write("}");
            return;
        }
        self.indent += 1;

        if is_enum {
            self.newline();
            self.pad();
            self.comma_list(constants, |p, constant| {
                p.write(&constant.name);
                if let Some(args) = &constant.args {
                    p.write("(");
                    p.comma_list(args, |p, arg| p.expr(arg));
                    p.write(")");
                }
                if let Some(body) = &constant.body {
                    p.write(" ");
                    p.class_body(&[], body, false);
                }
            });
            self.write(";");
            if !members.is_empty() {
                self.newline();
            }
        }

        let mut prev_was_field = false;
        for (i, member) in members.iter().enumerate() {
            let is_field = matches!(member, Member::Field(_));
            if i > 0 && !(is_field && prev_was_field) {
                self.newline();
            }
            self.newline();
            self.pad();
            self.member(member);
            prev_was_field = is_field;
        }

        self.indent -= 1;
        self.newline();
        self.pad();
        self.write("}");
    }

    fn member(&mut self, member: &Member) {
        match member {
            Member::Field(field) => {
                self.declaration_modifiers(&field.modifiers);
                self.type_ref(&field.ty);
                self.write(" ");
                self.declarators(&field.declarators);
                self.write(";");
            }
            Member::Method(method) => {
                self.declaration_modifiers(&method.modifiers);
                if !method.type_params.is_empty() {
                    self.type_params(&method.type_params);
                    self.write(" ");
                }
                self.type_ref(&method.return_type);
                self.write(" ");
                self.write(&method.name);
                self.params(&method.params);
                self.throws(&method.throws);
                match &method.body {
                    Some(body) => {
                        self.write(" ");
                        self.block(body);
                    }
                    None => self.write(";"),
                }
            }
            Member::Constructor(ctor) => {
                self.declaration_modifiers(&ctor.modifiers);
                if !ctor.type_params.is_empty() {
                    self.type_params(&ctor.type_params);
                    self.write(" ");
                }
                self.write(&ctor.name);
                if !ctor.compact {
                    self.params(&ctor.params);
                }
                self.throws(&ctor.throws);
                self.write(" ");
                self.block(&ctor.body);
            }
            Member::Initializer(init) => {
                if init.is_static {
                    self.write("static ");
                }
                self.block(&init.body);
            }
            Member::Type(decl) => self.type_decl(decl),
        }
    }

    fn params(&mut self, params: &[Param]) {
        self.write("(");
        self.comma_list(params, |p, param| {
            p.inline_modifiers(&param.modifiers);
            p.type_ref(&param.ty);
            if param.varargs {
                p.write("...");
            }
            p.write(" ");
            p.write(&param.name);
            for _ in 0..param.dims {
                p.write("[]");
            }
        });
        self.write(")");
    }

    fn throws(&mut self, throws: &[TypeRef]) {
        if !throws.is_empty() {
            self.write(" throws ");
            self.type_list(throws);
        }
    }

    fn declarators(&mut self, declarators: &[Declarator]) {
        self.comma_list(declarators, |p, declarator| {
            p.write(&declarator.name);
            for _ in 0..declarator.dims {
                p.write("[]");
            }
            if let Some(init) = &declarator.init {
                p.write(" = ");
                p.expr(init);
            }
        });
    }

    fn local_var(&mut self, local: &LocalVar) {
        self.inline_modifiers(&local.modifiers);
        self.type_ref(&local.ty);
        self.write(" ");
        self.declarators(&local.declarators);
    }

    // ─── Statements ─────────────────────────────────────────────────────

    fn block(&mut self, block: &Block) {
        self.write("{");
        if block.is_empty() {
            self.write("}");
            return;
        }
        self.indent += 1;
        for stmt in &block.stmts {
            self.newline();
            self.pad();
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.newline();
        self.pad();
        self.write("}");
    }

    /// Body of `if`/`while`/`for`: braces stay on the header line
    fn branch(&mut self, stmt: &Stmt) {
        if let StmtKind::Block(block) = &stmt.kind {
            self.write(" ");
            self.block(block);
        } else {
            self.indent += 1;
            self.newline();
            self.pad();
            self.stmt(stmt);
            self.indent -= 1;
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.block(block),
            StmtKind::LocalVar(local) => {
                self.local_var(local);
                self.write(";");
            }
            StmtKind::LocalClass(decl) => self.type_decl(decl),
            StmtKind::Expr(expr) => {
                self.expr(expr);
                self.write(";");
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.write("if (");
                self.expr(cond);
                self.write(")");
                self.branch(then_branch);
                if let Some(else_branch) = else_branch {
                    if matches!(then_branch.kind, StmtKind::Block(_)) {
                        self.write(" ");
                    } else {
                        self.newline();
                        self.pad();
                    }
                    self.write("else");
                    if matches!(else_branch.kind, StmtKind::If { .. }) {
                        self.write(" ");
                        self.stmt(else_branch);
                    } else {
                        self.branch(else_branch);
                    }
                }
            }
            StmtKind::While { cond, body } => {
                self.write("while (");
                self.expr(cond);
                self.write(")");
                self.branch(body);
            }
            StmtKind::DoWhile { body, cond } => {
                self.write("do");
                self.branch(body);
                if matches!(body.kind, StmtKind::Block(_)) {
                    self.write(" ");
                } else {
                    self.newline();
                    self.pad();
                }
                self.write("while (");
                self.expr(cond);
                self.write(");");
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.write("for (");
                match init {
                    ForInit::Empty => {}
                    ForInit::Decl(local) => self.local_var(local),
                    ForInit::Exprs(exprs) => self.comma_list(exprs, |p, e| p.expr(e)),
                }
                self.write(";");
                if let Some(cond) = cond {
                    self.write(" ");
                    self.expr(cond);
                }
                self.write(";");
                if !update.is_empty() {
                    self.write(" ");
                    self.comma_list(update, |p, e| p.expr(e));
                }
                self.write(")");
                self.branch(body);
            }
            StmtKind::ForEach {
                modifiers,
                ty,
                name,
                iterable,
                body,
            } => {
                self.write("for (");
                self.inline_modifiers(modifiers);
                self.type_ref(ty);
                self.write(" ");
                self.write(name);
                self.write(" : ");
                self.expr(iterable);
                self.write(")");
                self.branch(body);
            }
            StmtKind::Return(value) => {
                self.write("return");
                if let Some(value) = value {
                    self.write(" ");
                    self.expr(value);
                }
                self.write(";");
            }
            StmtKind::Break(label) | StmtKind::Continue(label) => {
                self.write(if matches!(stmt.kind, StmtKind::Break(_)) {
                    "break"
                } else {
                    "continue"
                });
                if let Some(label) = label {
                    self.write(" ");
                    self.write(label);
                }
                self.write(";");
            }
            StmtKind::Throw(value) => {
                self.write("throw ");
                self.expr(value);
                self.write(";");
            }
            StmtKind::Yield(value) => {
                self.write("yield ");
                self.expr(value);
                self.write(";");
            }
            StmtKind::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                self.write("try ");
                if !resources.is_empty() {
                    self.write("(");
                    for (i, resource) in resources.iter().enumerate() {
                        if i > 0 {
                            self.write("; ");
                        }
                        match resource {
                            Resource::Decl {
                                modifiers,
                                ty,
                                name,
                                init,
                            } => {
                                self.inline_modifiers(modifiers);
                                self.type_ref(ty);
                                self.write(" ");
                                self.write(name);
                                self.write(" = ");
                                self.expr(init);
                            }
                            Resource::Expr(expr) => self.expr(expr),
                        }
                    }
                    self.write(") ");
                }
                self.block(body);
                for catch in catches {
                    self.write(" catch (");
                    self.inline_modifiers(&catch.modifiers);
                    for (i, ty) in catch.types.iter().enumerate() {
                        if i > 0 {
                            self.write(" | ");
                        }
                        self.type_ref(ty);
                    }
                    self.write(" ");
                    self.write(&catch.name);
                    self.write(") ");
                    self.block(&catch.body);
                }
                if let Some(finally) = finally {
                    self.write(" finally ");
                    self.block(finally);
                }
            }
            StmtKind::Switch { selector, cases } => {
                self.write("switch (");
                self.expr(selector);
                self.write(") ");
                self.switch_body(cases);
            }
            StmtKind::Labeled { label, body } => {
                self.write(label);
                self.write(": ");
                self.stmt(body);
            }
            StmtKind::Synchronized { lock, body } => {
                self.write("synchronized (");
                self.expr(lock);
                self.write(") ");
                self.block(body);
            }
            StmtKind::Assert { cond, message } => {
                self.write("assert ");
                self.expr(cond);
                if let Some(message) = message {
                    self.write(" : ");
                    self.expr(message);
                }
                self.write(";");
            }
            StmtKind::Empty => self.write(";"),
        }
    }

    fn switch_body(&mut self, cases: &[SwitchCase]) {
        self.write("{");
        if cases.is_empty() {
            self.write("}");
            return;
        }
        self.indent += 1;
        for case in cases {
            self.newline();
            self.pad();
            match &case.label {
                CaseLabel::Case(exprs) => {
                    self.write("case ");
                    self.comma_list(exprs, |p, e| p.expr(e));
                }
                CaseLabel::Default => self.write("default"),
            }
            if case.arrow {
                self.write(" -> ");
                match case.body.as_slice() {
                    [single] => self.stmt(single),
                    stmts => self.block(&Block::new(stmts.to_vec())),
                }
            } else {
                self.write(":");
                self.indent += 1;
                for stmt in &case.body {
                    self.newline();
                    self.pad();
                    self.stmt(stmt);
                }
                self.indent -= 1;
            }
        }
        self.indent -= 1;
        self.newline();
        self.pad();
        self.write("}");
    }

    // ─── Expressions ────────────────────────────────────────────────────

    fn args(&mut self, args: &[Expr]) {
        self.write("(");
        self.comma_list(args, |p, arg| p.expr(arg));
        self.write(")");
    }

    fn array_init(&mut self, elements: &[Expr]) {
        self.write("{");
        self.comma_list(elements, |p, e| p.expr(e));
        self.write("}");
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(literal) => self.write(&literal.text),
            Expr::Name(name) => self.write(name),
            Expr::This => self.write("this"),
            Expr::Super => self.write("super"),
            Expr::Type(ty) => self.type_ref(ty),
            Expr::FieldAccess { target, name } => {
                self.expr(target);
                self.write(".");
                self.write(name);
            }
            Expr::MethodCall {
                target,
                type_args,
                name,
                args,
            } => {
                if let Some(target) = target {
                    self.expr(target);
                    self.write(".");
                }
                if !type_args.is_empty() {
                    self.write("<");
                    self.comma_list(type_args, |p, arg| p.write(&arg.to_string()));
                    self.write(">");
                }
                self.write(name);
                self.args(args);
            }
            Expr::Index { target, index } => {
                self.expr(target);
                self.write("[");
                self.expr(index);
                self.write("]");
            }
            Expr::New { ty, args, body } => {
                self.write("new ");
                self.type_ref(ty);
                self.args(args);
                if let Some(members) = body {
                    self.write(" ");
                    self.class_body(&[], members, false);
                }
            }
            Expr::NewArray {
                element,
                dims,
                extra_dims,
                init,
            } => {
                self.write("new ");
                self.type_ref(element);
                for dim in dims {
                    self.write("[");
                    self.expr(dim);
                    self.write("]");
                }
                for _ in 0..*extra_dims {
                    self.write("[]");
                }
                if let Some(init) = init {
                    self.write(" ");
                    self.array_init(init);
                }
            }
            Expr::ArrayInit(elements) => self.array_init(elements),
            Expr::Unary { op, operand } => {
                self.write(op);
                let start = self.out.len();
                self.expr(operand);
                let sign = &op[op.len() - 1..];
                if (sign == "+" || sign == "-") && self.out[start..].starts_with(sign) {
                    self.out.insert(start, ' ');
                }
            }
            Expr::Postfix { op, operand } => {
                self.expr(operand);
                self.write(op);
            }
            Expr::Binary { op, lhs, rhs } => {
                self.expr(lhs);
                self.write(" ");
                self.write(op);
                self.write(" ");
                self.expr(rhs);
            }
            Expr::Assign { op, target, value } => {
                self.expr(target);
                self.write(" ");
                self.write(op);
                self.write(" ");
                self.expr(value);
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expr(cond);
                self.write(" ? ");
                self.expr(then_expr);
                self.write(" : ");
                self.expr(else_expr);
            }
            Expr::Cast { ty, expr } => {
                self.write("(");
                self.type_ref(ty);
                self.write(") ");
                self.expr(expr);
            }
            Expr::InstanceOf { expr, ty, binding } => {
                self.expr(expr);
                self.write(" instanceof ");
                self.type_ref(ty);
                if let Some(binding) = binding {
                    self.write(" ");
                    self.write(binding);
                }
            }
            Expr::Lambda {
                params,
                parenthesized,
                body,
            } => {
                if *parenthesized {
                    self.write("(");
                    self.comma_list(params, |p, param| {
                        if let Some(ty) = &param.ty {
                            p.type_ref(ty);
                            p.write(" ");
                        }
                        p.write(&param.name);
                    });
                    self.write(")");
                } else if let Some(param) = params.first() {
                    self.write(&param.name);
                }
                self.write(" -> ");
                match body {
                    LambdaBody::Expr(expr) => self.expr(expr),
                    LambdaBody::Block(block) => self.block(block),
                }
            }
            Expr::MethodRef { target, name } => {
                self.expr(target);
                self.write("::");
                self.write(name);
            }
            Expr::ClassLit(ty) => {
                self.type_ref(ty);
                self.write(".class");
            }
            Expr::Paren(inner) => {
                self.write("(");
                self.expr(inner);
                self.write(")");
            }
            Expr::Switch { selector, cases } => {
                self.write("switch (");
                self.expr(selector);
                self.write(") ");
                self.switch_body(cases);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parser::parse_compilation_unit;
    use pretty_assertions::assert_eq;

    fn reprint(source: &str) -> String {
        print_compilation_unit(&parse_compilation_unit(source).unwrap())
    }

    #[test]
    fn test_normalized_layout() {
        let printed = reprint("class A { int x; void m(int a) { if (a > 0) { x = a; } else x = 0; } }");
        assert_eq!(
            printed,
            "class A {\n    int x;\n\n    void m(int a) {\n        if (a > 0) {\n            x = a;\n        } else\n            x = 0;\n    }\n}\n"
        );
    }

    #[test]
    fn test_package_and_imports() {
        let printed = reprint("package p; import java.util.*; import static java.lang.Math.max; class A {}");
        assert_eq!(
            printed,
            "package p;\n\nimport java.util.*;\nimport static java.lang.Math.max;\n\nclass A {}\n"
        );
    }

    #[test]
    fn test_reprint_is_stable() {
        let source = r#"
            public class Main {
                static int[] data = {3, 1, 2};
                public static void main(String[] args) throws Exception {
                    int total = 0;
                    for (int i = 0; i < data.length; i++) total += data[i];
                    for (int v : data) { total -= v; }
                    String label = total > 0 ? "pos" : (total < 0 ? "neg" : "zero");
                    Runnable r = () -> { System.out.println(label); };
                    java.util.function.IntUnaryOperator f = v -> -(-v);
                    switch (total) {
                        case 0: break;
                        default: total = 1;
                    }
                    int kind = switch (label) { case "pos" -> 1; default -> { yield 0; } };
                    try { r.run(); } catch (RuntimeException | Error e) { throw e; } finally { total++; }
                    outer: while (true) { break outer; }
                    Object o = new Object() { public String toString() { return "x"; } };
                    long mask = (long) total << 3 >>> 1;
                }
            }
        "#;
        let once = reprint(source);
        let twice = reprint(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_records_sealed_and_enum_bodies_reprint() {
        let source = "sealed interface Shape permits Circle, Square {}\n\
            record Circle(double r) implements Shape { Circle { if (r < 0) { throw new IllegalArgumentException(); } } }\n\
            non-sealed class Square implements Shape {}\n\
            enum Op { PLUS { int apply(int a) { return a; } }, MINUS; int apply(int a) { return -a; } }";
        let once = reprint(source);
        assert!(once.contains("sealed interface Shape permits Circle, Square {}"));
        assert!(once.contains("record Circle(double r) implements Shape {\n    Circle {\n"));
        assert!(once.contains("non-sealed class Square implements Shape {}"));
        assert!(once.contains("    PLUS {\n        int apply(int a) {\n"));
        assert_eq!(once, reprint(&once));
    }

    #[test]
    fn test_unary_sign_spacing() {
        let unit = parse_compilation_unit("class A { void m() { x = - -y; z = -(-y); w = !done; } }").unwrap();
        let printed = print_compilation_unit(&unit);
        assert!(printed.contains("x = - -y;"));
        assert!(printed.contains("z = -(-y);"));
        assert!(printed.contains("w = !done;"));
    }

    #[test]
    fn test_print_single_nodes() {
        let call = Expr::static_call("Main", "__traceVariable", vec![Expr::string("x"), Expr::name("x")]);
        assert_eq!(print_expr(&call), "Main.__traceVariable(\"x\", x)");

        let stmt = Stmt {
            id: NodeId(0),
            kind: StmtKind::Expr(call),
        };
        assert_eq!(print_stmt(&stmt), "Main.__traceVariable(\"x\", x);");
    }
}
