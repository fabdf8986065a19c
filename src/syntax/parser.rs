//! Recursive-descent parser for the supported Java subset.
//!
//! Two ambiguities need backtracking: a statement that starts with a type
//! (local variable declaration vs expression statement) and an opening
//! parenthesis (cast vs lambda vs parenthesized expression). Both are settled
//! by speculative parsing that restores the cursor on failure.

use super::ast::*;
use super::lexer::{tokenize, Token, TokenKind};
use crate::utils::error::SyntaxError;
use log::debug;

type PResult<T> = Result<T, SyntaxError>;

const MODIFIER_KEYWORDS: &[&str] = &[
    "public", "protected", "private", "static", "final", "abstract", "native", "synchronized",
    "transient", "volatile", "strictfp", "default",
];

const ASSIGN_OPS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=", ">>>=",
];

const SIMPLE_BINARY_OPS: &[&str] = &[
    "||", "&&", "|", "^", "&", "==", "!=", "<", "<=", ">=", "<<", "+", "-", "*", "/", "%",
];

const RELATIONAL_PREC: u8 = 7;

/// Parse a complete Java source file
///
/// **Public** - main entry point of the syntax model
///
/// # Errors
/// * `SyntaxError` with the position of the first token that does not fit
pub fn parse_compilation_unit(source: &str) -> Result<CompilationUnit, SyntaxError> {
    let tokens = tokenize(source)?;
    debug!("Parsing compilation unit ({} tokens)", tokens.len());

    let mut parser = Parser::new(tokens, 0);
    parser.compilation_unit()
}

/// Parse a class-body fragment into members
///
/// Statement ids continue from `next_id`, which is advanced past the last id
/// used, so the members can be attached to an existing unit.
pub fn parse_members(source: &str, next_id: &mut u32) -> Result<Vec<Member>, SyntaxError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(tokens, *next_id);

    let mut members = Vec::new();
    while parser.peek().kind != TokenKind::Eof {
        if let Some(member) = parser.member()? {
            members.push(member);
        }
    }
    *next_id = parser.next_id;
    Ok(members)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_id: u32,
    /// Set while parsing `case` labels, where `x ->` is not a lambda
    no_lambda: bool,
}

impl Parser {
    fn new(tokens: Vec<Token>, next_id: u32) -> Self {
        Self {
            tokens,
            pos: 0,
            next_id,
            no_lambda: false,
        }
    }

    // ─── Cursor helpers ─────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&self, punct: &str) -> bool {
        self.peek().is_punct(punct)
    }

    fn check_kw(&self, keyword: &str) -> bool {
        self.peek().is_keyword(keyword)
    }

    fn eat(&mut self, punct: &str) -> bool {
        if self.check(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, keyword: &str) -> bool {
        if self.check_kw(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> PResult<Token> {
        if self.check(punct) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!("expected '{}'", punct)))
        }
    }

    fn expect_kw(&mut self, keyword: &str) -> PResult<Token> {
        if self.check_kw(keyword) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!("expected '{}'", keyword)))
        }
    }

    /// Contextual keyword such as `record` or `permits`, lexed as an identifier
    fn check_ident(&self, text: &str) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Ident && token.text == text
    }

    fn ident(&mut self) -> PResult<String> {
        if self.peek().kind == TokenKind::Ident {
            Ok(self.advance().text)
        } else {
            Err(self.error_here("expected identifier"))
        }
    }

    fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        let token = self.peek();
        let found = if token.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            format!("'{}'", token.text)
        };
        SyntaxError::new(
            token.line,
            token.column,
            format!("{}, found {}", message.into(), found),
        )
    }

    fn stmt(&mut self, kind: StmtKind) -> Stmt {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Stmt { id, kind }
    }

    /// Run `f`; on failure rewind and return `None`
    fn speculate<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> Option<T> {
        let (pos, next_id) = (self.pos, self.next_id);
        match f(self) {
            Ok(value) => Some(value),
            Err(_) => {
                self.pos = pos;
                self.next_id = next_id;
                None
            }
        }
    }

    /// Run `f` and always rewind
    fn lookahead(&mut self, f: impl FnOnce(&mut Self) -> bool) -> bool {
        let (pos, next_id) = (self.pos, self.next_id);
        let result = f(self);
        self.pos = pos;
        self.next_id = next_id;
        result
    }

    fn matching_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(open) {
            if token.is_punct("(") {
                depth += 1;
            } else if token.is_punct(")") {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            } else if token.kind == TokenKind::Eof {
                return None;
            }
        }
        None
    }

    // ─── Declarations ───────────────────────────────────────────────────

    fn compilation_unit(&mut self) -> PResult<CompilationUnit> {
        let mut package = None;
        if self.eat_kw("package") {
            package = Some(self.qualified_name()?);
            self.expect(";")?;
        }

        let mut imports = Vec::new();
        while self.eat_kw("import") {
            let is_static = self.eat_kw("static");
            let mut path = self.ident()?;
            let mut wildcard = false;
            while self.eat(".") {
                if self.eat("*") {
                    wildcard = true;
                    break;
                }
                path.push('.');
                path.push_str(&self.ident()?);
            }
            self.expect(";")?;
            imports.push(Import {
                is_static,
                path,
                wildcard,
            });
        }

        let mut types = Vec::new();
        while self.peek().kind != TokenKind::Eof {
            if self.eat(";") {
                continue;
            }
            let modifiers = self.modifiers()?;
            types.push(self.type_decl(modifiers)?);
        }

        Ok(CompilationUnit {
            package,
            imports,
            types,
            next_id: self.next_id,
        })
    }

    fn qualified_name(&mut self) -> PResult<String> {
        let mut name = self.ident()?;
        while self.check(".") && self.peek_at(1).kind == TokenKind::Ident {
            self.advance();
            name.push('.');
            name.push_str(&self.ident()?);
        }
        Ok(name)
    }

    fn modifiers(&mut self) -> PResult<Modifiers> {
        let mut modifiers = Modifiers::default();
        loop {
            let token = self.peek();
            if token.is_punct("@") && !self.peek_at(1).is_keyword("interface") {
                modifiers.annotations.push(self.annotation()?);
            } else if self.check_ident("sealed") && self.modifier_follows(1) {
                self.advance();
                modifiers.keywords.push("sealed".to_string());
            } else if self.check_ident("non")
                && self.peek_at(1).is_punct("-")
                && self.peek_at(2).kind == TokenKind::Ident
                && self.peek_at(2).text == "sealed"
                && self.modifier_follows(3)
            {
                self.pos += 3;
                modifiers.keywords.push("non-sealed".to_string());
            } else if token.kind == TokenKind::Keyword
                && MODIFIER_KEYWORDS.contains(&token.text.as_str())
                && !(token.text == "default" && (self.peek_at(1).is_punct(":") || self.peek_at(1).is_punct("->")))
            {
                modifiers.keywords.push(self.advance().text);
            } else {
                return Ok(modifiers);
            }
        }
    }

    /// `sealed` and `non-sealed` only count when a declaration keyword follows
    fn modifier_follows(&self, offset: usize) -> bool {
        let next = self.peek_at(offset);
        next.is_keyword("class")
            || next.is_keyword("interface")
            || (next.kind == TokenKind::Keyword && MODIFIER_KEYWORDS.contains(&next.text.as_str()))
    }

    /// At `class`, `interface`, `enum` or a `record Name(` / `record Name<` header
    fn at_type_decl(&self) -> bool {
        self.check_kw("class") || self.check_kw("interface") || self.check_kw("enum") || self.at_record()
    }

    fn at_record(&self) -> bool {
        self.check_ident("record")
            && self.peek_at(1).kind == TokenKind::Ident
            && (self.peek_at(2).is_punct("(") || self.peek_at(2).is_punct("<"))
    }

    fn annotation(&mut self) -> PResult<Annotation> {
        self.expect("@")?;
        let name = self.qualified_name()?;
        let args = if self.eat("(") {
            let mut args = Vec::new();
            while !self.check(")") {
                if self.peek().kind == TokenKind::Ident && self.peek_at(1).is_punct("=") {
                    let key = self.ident()?;
                    self.advance();
                    args.push(Expr::Assign {
                        op: "=".to_string(),
                        target: Box::new(Expr::Name(key)),
                        value: Box::new(self.element_value()?),
                    });
                } else {
                    args.push(self.element_value()?);
                }
                if !self.eat(",") {
                    break;
                }
            }
            self.expect(")")?;
            Some(args)
        } else {
            None
        };
        Ok(Annotation { name, args })
    }

    fn element_value(&mut self) -> PResult<Expr> {
        if self.check("{") {
            Ok(Expr::ArrayInit(self.array_init()?))
        } else {
            self.ternary()
        }
    }

    fn type_decl(&mut self, modifiers: Modifiers) -> PResult<TypeDecl> {
        let kind = if self.eat_kw("class") {
            TypeKind::Class
        } else if self.eat_kw("interface") {
            TypeKind::Interface
        } else if self.eat_kw("enum") {
            TypeKind::Enum
        } else if self.at_record() {
            self.advance();
            TypeKind::Record
        } else {
            return Err(self.error_here("expected 'class', 'interface', 'enum' or 'record'"));
        };
        let name = self.ident()?;
        let type_params = if self.check("<") {
            self.type_params()?
        } else {
            Vec::new()
        };
        let record_components = if kind == TypeKind::Record {
            self.params()?
        } else {
            Vec::new()
        };

        let mut extends = Vec::new();
        let mut implements = Vec::new();
        let mut permits = Vec::new();
        if self.eat_kw("extends") {
            extends = self.type_list()?;
        }
        if self.eat_kw("implements") {
            implements = self.type_list()?;
        }
        if self.check_ident("permits") {
            self.advance();
            permits = self.type_list()?;
        }

        self.expect("{")?;
        let enum_constants = if kind == TypeKind::Enum {
            self.enum_constants()?
        } else {
            Vec::new()
        };
        let members = self.class_body()?;

        Ok(TypeDecl {
            modifiers,
            kind,
            name,
            type_params,
            extends,
            implements,
            permits,
            record_components,
            enum_constants,
            members,
        })
    }

    fn enum_constants(&mut self) -> PResult<Vec<EnumConstant>> {
        let mut constants = Vec::new();
        loop {
            if self.eat(";") || self.check("}") {
                break;
            }
            self.modifiers()?;
            let name = self.ident()?;
            let args = if self.check("(") {
                Some(self.arguments()?)
            } else {
                None
            };
            let body = if self.eat("{") {
                Some(self.class_body()?)
            } else {
                None
            };
            constants.push(EnumConstant { name, args, body });
            if !self.eat(",") {
                self.eat(";");
                break;
            }
        }
        Ok(constants)
    }

    /// Members up to and including the closing brace
    fn class_body(&mut self) -> PResult<Vec<Member>> {
        let mut members = Vec::new();
        while !self.eat("}") {
            if self.peek().kind == TokenKind::Eof {
                return Err(self.error_here("expected '}'"));
            }
            if let Some(member) = self.member()? {
                members.push(member);
            }
        }
        Ok(members)
    }

    fn member(&mut self) -> PResult<Option<Member>> {
        if self.eat(";") {
            return Ok(None);
        }
        if self.check("{") {
            let body = self.block()?;
            return Ok(Some(Member::Initializer(Initializer {
                is_static: false,
                body,
            })));
        }
        if self.check_kw("static") && self.peek_at(1).is_punct("{") {
            self.advance();
            let body = self.block()?;
            return Ok(Some(Member::Initializer(Initializer {
                is_static: true,
                body,
            })));
        }

        let modifiers = self.modifiers()?;
        if self.at_type_decl() {
            return Ok(Some(Member::Type(self.type_decl(modifiers)?)));
        }

        let type_params = if self.check("<") {
            self.type_params()?
        } else {
            Vec::new()
        };

        if self.peek().kind == TokenKind::Ident && self.peek_at(1).is_punct("{") {
            let name = self.ident()?;
            let body = self.block()?;
            return Ok(Some(Member::Constructor(ConstructorDecl {
                modifiers,
                type_params,
                name,
                compact: true,
                params: Vec::new(),
                throws: Vec::new(),
                body,
            })));
        }

        if self.peek().kind == TokenKind::Ident && self.peek_at(1).is_punct("(") {
            let name = self.ident()?;
            let params = self.params()?;
            let throws = self.throws()?;
            let body = self.block()?;
            return Ok(Some(Member::Constructor(ConstructorDecl {
                modifiers,
                type_params,
                name,
                compact: false,
                params,
                throws,
                body,
            })));
        }

        let mut return_type = if self.eat_kw("void") {
            TypeRef::simple("void")
        } else {
            self.parse_type()?
        };
        let name = self.ident()?;

        if self.check("(") {
            let params = self.params()?;
            return_type.dims += self.dims();
            let throws = self.throws()?;
            let body = if self.eat(";") {
                None
            } else {
                Some(self.block()?)
            };
            return Ok(Some(Member::Method(MethodDecl {
                modifiers,
                type_params,
                return_type,
                name,
                params,
                throws,
                body,
            })));
        }

        let declarators = self.declarators(name)?;
        self.expect(";")?;
        Ok(Some(Member::Field(FieldDecl {
            modifiers,
            ty: return_type,
            declarators,
        })))
    }

    fn type_params(&mut self) -> PResult<Vec<TypeParam>> {
        self.expect("<")?;
        let mut params = Vec::new();
        loop {
            let name = self.ident()?;
            let mut bounds = Vec::new();
            if self.eat_kw("extends") {
                bounds.push(self.parse_type()?);
                while self.eat("&") {
                    bounds.push(self.parse_type()?);
                }
            }
            params.push(TypeParam { name, bounds });
            if !self.eat(",") {
                break;
            }
        }
        self.expect(">")?;
        Ok(params)
    }

    fn type_list(&mut self) -> PResult<Vec<TypeRef>> {
        let mut types = vec![self.parse_type()?];
        while self.eat(",") {
            types.push(self.parse_type()?);
        }
        Ok(types)
    }

    fn params(&mut self) -> PResult<Vec<Param>> {
        self.expect("(")?;
        let mut params = Vec::new();
        if self.eat(")") {
            return Ok(params);
        }
        loop {
            let modifiers = self.modifiers()?;
            let ty = self.parse_type()?;
            let varargs = self.eat("...");
            let name = self.ident()?;
            let dims = self.dims();
            params.push(Param {
                modifiers,
                ty,
                varargs,
                name,
                dims,
            });
            if !self.eat(",") {
                break;
            }
        }
        self.expect(")")?;
        Ok(params)
    }

    fn throws(&mut self) -> PResult<Vec<TypeRef>> {
        if self.eat_kw("throws") {
            self.type_list()
        } else {
            Ok(Vec::new())
        }
    }

    /// Declarators of a field or local, the first name already consumed
    fn declarators(&mut self, first: String) -> PResult<Vec<Declarator>> {
        let mut declarators = Vec::new();
        let mut name = first;
        loop {
            let dims = self.dims();
            let init = if self.eat("=") {
                Some(self.var_init()?)
            } else {
                None
            };
            declarators.push(Declarator { name, dims, init });
            if !self.eat(",") {
                return Ok(declarators);
            }
            name = self.ident()?;
        }
    }

    fn var_init(&mut self) -> PResult<Expr> {
        if self.check("{") {
            Ok(Expr::ArrayInit(self.array_init()?))
        } else {
            self.expression()
        }
    }

    fn array_init(&mut self) -> PResult<Vec<Expr>> {
        self.expect("{")?;
        let mut elements = Vec::new();
        while !self.check("}") {
            elements.push(self.var_init()?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect("}")?;
        Ok(elements)
    }

    // ─── Types ──────────────────────────────────────────────────────────

    fn parse_type(&mut self) -> PResult<TypeRef> {
        let mut segments = Vec::new();
        let token = self.peek();
        if token.kind == TokenKind::Keyword && PRIMITIVE_TYPES.contains(&token.text.as_str()) {
            let name = self.advance().text;
            segments.push(TypeSegment { name, args: None });
        } else {
            loop {
                let name = self.ident()?;
                let args = if self.check("<") {
                    Some(self.type_args()?)
                } else {
                    None
                };
                segments.push(TypeSegment { name, args });
                if self.check(".") && self.peek_at(1).kind == TokenKind::Ident {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        let dims = self.dims();
        Ok(TypeRef { segments, dims })
    }

    fn type_args(&mut self) -> PResult<Vec<TypeArg>> {
        self.expect("<")?;
        let mut args = Vec::new();
        if self.eat(">") {
            return Ok(args);
        }
        loop {
            if self.eat("?") {
                let bound = if self.eat_kw("extends") {
                    Some((WildcardBound::Extends, self.parse_type()?))
                } else if self.eat_kw("super") {
                    Some((WildcardBound::Super, self.parse_type()?))
                } else {
                    None
                };
                args.push(TypeArg::Wildcard(bound));
            } else {
                args.push(TypeArg::Type(self.parse_type()?));
            }
            if !self.eat(",") {
                break;
            }
        }
        self.expect(">")?;
        Ok(args)
    }

    /// Count `[]` pairs
    fn dims(&mut self) -> usize {
        let mut dims = 0;
        while self.check("[") && self.peek_at(1).is_punct("]") {
            self.advance();
            self.advance();
            dims += 1;
        }
        dims
    }

    // ─── Statements ─────────────────────────────────────────────────────

    fn block(&mut self) -> PResult<Block> {
        self.expect("{")?;
        let mut stmts = Vec::new();
        while !self.eat("}") {
            if self.peek().kind == TokenKind::Eof {
                return Err(self.error_here("expected '}'"));
            }
            stmts.push(self.block_statement()?);
        }
        Ok(Block { stmts })
    }

    /// A statement that may also be a local variable or class declaration
    fn block_statement(&mut self) -> PResult<Stmt> {
        if self.is_yield() {
            return self.statement();
        }
        if self.at_type_decl() {
            let decl = self.type_decl(Modifiers::default())?;
            return Ok(self.stmt(StmtKind::LocalClass(Box::new(decl))));
        }
        if self.check_kw("final") || self.check_kw("abstract") || self.check("@") {
            let modifiers = self.modifiers()?;
            if self.at_type_decl() {
                let decl = self.type_decl(modifiers)?;
                return Ok(self.stmt(StmtKind::LocalClass(Box::new(decl))));
            }
            let local = self.local_var_rest(modifiers)?;
            self.expect(";")?;
            return Ok(self.stmt(StmtKind::LocalVar(local)));
        }
        if self.looks_like_local_var() {
            let local = self.local_var_rest(Modifiers::default())?;
            self.expect(";")?;
            return Ok(self.stmt(StmtKind::LocalVar(local)));
        }
        self.statement()
    }

    fn local_var_rest(&mut self, modifiers: Modifiers) -> PResult<LocalVar> {
        let ty = self.parse_type()?;
        let name = self.ident()?;
        let declarators = self.declarators(name)?;
        Ok(LocalVar {
            modifiers,
            ty,
            declarators,
        })
    }

    fn looks_like_local_var(&mut self) -> bool {
        let token = self.peek();
        let type_start = token.kind == TokenKind::Ident
            || (token.kind == TokenKind::Keyword && PRIMITIVE_TYPES.contains(&token.text.as_str()));
        if !type_start {
            return false;
        }
        self.lookahead(|p| {
            if p.parse_type().is_err() || p.peek().kind != TokenKind::Ident {
                return false;
            }
            let next = p.peek_at(1);
            ["=", ";", ",", "[", ":"].iter().any(|punct| next.is_punct(punct))
        })
    }

    fn is_yield(&self) -> bool {
        let token = self.peek();
        if token.kind != TokenKind::Ident || token.text != "yield" {
            return false;
        }
        let next = self.peek_at(1);
        next.kind != TokenKind::Punct || ["(", "-", "+", "!", "~"].iter().any(|p| next.is_punct(p))
    }

    fn statement(&mut self) -> PResult<Stmt> {
        let token = self.peek().clone();

        if token.kind == TokenKind::Ident {
            if self.peek_at(1).is_punct(":") {
                let label = self.ident()?;
                self.advance();
                let body = self.statement()?;
                return Ok(self.stmt(StmtKind::Labeled {
                    label,
                    body: Box::new(body),
                }));
            }
            if self.is_yield() {
                self.advance();
                let value = self.expression()?;
                self.expect(";")?;
                return Ok(self.stmt(StmtKind::Yield(value)));
            }
        }

        let kind = match (token.kind, token.text.as_str()) {
            (TokenKind::Punct, "{") => StmtKind::Block(self.block()?),
            (TokenKind::Punct, ";") => {
                self.advance();
                StmtKind::Empty
            }
            (TokenKind::Keyword, "if") => {
                self.advance();
                let cond = self.paren_expression()?;
                let then_branch = Box::new(self.statement()?);
                let else_branch = if self.eat_kw("else") {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                StmtKind::If {
                    cond,
                    then_branch,
                    else_branch,
                }
            }
            (TokenKind::Keyword, "while") => {
                self.advance();
                let cond = self.paren_expression()?;
                let body = Box::new(self.statement()?);
                StmtKind::While { cond, body }
            }
            (TokenKind::Keyword, "do") => {
                self.advance();
                let body = Box::new(self.statement()?);
                self.expect_kw("while")?;
                let cond = self.paren_expression()?;
                self.expect(";")?;
                StmtKind::DoWhile { body, cond }
            }
            (TokenKind::Keyword, "for") => self.for_statement()?,
            (TokenKind::Keyword, "return") => {
                self.advance();
                let value = if self.check(";") {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(";")?;
                StmtKind::Return(value)
            }
            (TokenKind::Keyword, "break") | (TokenKind::Keyword, "continue") => {
                self.advance();
                let label = if self.peek().kind == TokenKind::Ident {
                    Some(self.ident()?)
                } else {
                    None
                };
                self.expect(";")?;
                if token.text == "break" {
                    StmtKind::Break(label)
                } else {
                    StmtKind::Continue(label)
                }
            }
            (TokenKind::Keyword, "throw") => {
                self.advance();
                let value = self.expression()?;
                self.expect(";")?;
                StmtKind::Throw(value)
            }
            (TokenKind::Keyword, "try") => self.try_statement()?,
            (TokenKind::Keyword, "switch") => {
                self.advance();
                let selector = self.paren_expression()?;
                let cases = self.switch_cases()?;
                StmtKind::Switch { selector, cases }
            }
            (TokenKind::Keyword, "synchronized") => {
                self.advance();
                let lock = self.paren_expression()?;
                let body = self.block()?;
                StmtKind::Synchronized { lock, body }
            }
            (TokenKind::Keyword, "assert") => {
                self.advance();
                let cond = self.expression()?;
                let message = if self.eat(":") {
                    Some(self.expression()?)
                } else {
                    None
                };
                self.expect(";")?;
                StmtKind::Assert { cond, message }
            }
            _ => {
                let expr = self.expression()?;
                self.expect(";")?;
                StmtKind::Expr(expr)
            }
        };
        Ok(self.stmt(kind))
    }

    fn paren_expression(&mut self) -> PResult<Expr> {
        self.expect("(")?;
        let expr = self.expression()?;
        self.expect(")")?;
        Ok(expr)
    }

    fn for_statement(&mut self) -> PResult<StmtKind> {
        self.expect_kw("for")?;
        self.expect("(")?;

        let each = self.speculate(|p| {
            let modifiers = p.modifiers()?;
            let ty = p.parse_type()?;
            let name = p.ident()?;
            p.expect(":")?;
            Ok((modifiers, ty, name))
        });
        if let Some((modifiers, ty, name)) = each {
            let iterable = self.expression()?;
            self.expect(")")?;
            let body = Box::new(self.statement()?);
            return Ok(StmtKind::ForEach {
                modifiers,
                ty,
                name,
                iterable,
                body,
            });
        }

        let init = if self.check(";") {
            ForInit::Empty
        } else if self.check_kw("final") || self.check("@") || self.looks_like_local_var() {
            let modifiers = self.modifiers()?;
            ForInit::Decl(self.local_var_rest(modifiers)?)
        } else {
            ForInit::Exprs(self.expression_list()?)
        };
        self.expect(";")?;
        let cond = if self.check(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(";")?;
        let update = if self.check(")") {
            Vec::new()
        } else {
            self.expression_list()?
        };
        self.expect(")")?;
        let body = Box::new(self.statement()?);

        Ok(StmtKind::For {
            init,
            cond,
            update,
            body,
        })
    }

    fn expression_list(&mut self) -> PResult<Vec<Expr>> {
        let mut exprs = vec![self.expression()?];
        while self.eat(",") {
            exprs.push(self.expression()?);
        }
        Ok(exprs)
    }

    fn try_statement(&mut self) -> PResult<StmtKind> {
        self.expect_kw("try")?;

        let mut resources = Vec::new();
        if self.eat("(") {
            while !self.check(")") {
                if self.check_kw("final") || self.check("@") || self.looks_like_local_var() {
                    let modifiers = self.modifiers()?;
                    let ty = self.parse_type()?;
                    let name = self.ident()?;
                    self.expect("=")?;
                    let init = self.expression()?;
                    resources.push(Resource::Decl {
                        modifiers,
                        ty,
                        name,
                        init,
                    });
                } else {
                    resources.push(Resource::Expr(self.expression()?));
                }
                if !self.eat(";") {
                    break;
                }
            }
            self.expect(")")?;
        }

        let body = self.block()?;
        let mut catches = Vec::new();
        while self.eat_kw("catch") {
            self.expect("(")?;
            let modifiers = self.modifiers()?;
            let mut types = vec![self.parse_type()?];
            while self.eat("|") {
                types.push(self.parse_type()?);
            }
            let name = self.ident()?;
            self.expect(")")?;
            let body = self.block()?;
            catches.push(CatchClause {
                modifiers,
                types,
                name,
                body,
            });
        }
        let finally = if self.eat_kw("finally") {
            Some(self.block()?)
        } else {
            None
        };

        if resources.is_empty() && catches.is_empty() && finally.is_none() {
            return Err(self.error_here("expected 'catch' or 'finally'"));
        }
        Ok(StmtKind::Try {
            resources,
            body,
            catches,
            finally,
        })
    }

    fn switch_cases(&mut self) -> PResult<Vec<SwitchCase>> {
        self.expect("{")?;
        let mut cases = Vec::new();
        while !self.eat("}") {
            let label = if self.eat_kw("default") {
                CaseLabel::Default
            } else if self.eat_kw("case") {
                let saved = self.no_lambda;
                self.no_lambda = true;
                let mut exprs = vec![self.ternary()?];
                while self.eat(",") {
                    exprs.push(self.ternary()?);
                }
                self.no_lambda = saved;
                CaseLabel::Case(exprs)
            } else {
                return Err(self.error_here("expected 'case' or 'default'"));
            };

            let arrow = if self.eat("->") {
                true
            } else {
                self.expect(":")?;
                false
            };

            let body = if arrow {
                let stmt = if self.check("{") || self.check_kw("throw") {
                    self.statement()?
                } else {
                    let expr = self.expression()?;
                    self.expect(";")?;
                    self.stmt(StmtKind::Expr(expr))
                };
                vec![stmt]
            } else {
                let mut body = Vec::new();
                while !(self.check_kw("case") || self.check_kw("default") || self.check("}")) {
                    if self.peek().kind == TokenKind::Eof {
                        return Err(self.error_here("expected '}'"));
                    }
                    body.push(self.block_statement()?);
                }
                body
            };
            cases.push(SwitchCase { label, arrow, body });
        }
        Ok(cases)
    }

    // ─── Expressions ────────────────────────────────────────────────────

    fn expression(&mut self) -> PResult<Expr> {
        let target = self.ternary()?;
        let token = self.peek();
        if token.kind == TokenKind::Punct && ASSIGN_OPS.contains(&token.text.as_str()) {
            let op = self.advance().text;
            let value = self.expression()?;
            return Ok(Expr::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            });
        }
        Ok(target)
    }

    fn ternary(&mut self) -> PResult<Expr> {
        let cond = self.binary(1)?;
        if !self.eat("?") {
            return Ok(cond);
        }
        let then_expr = self.expression()?;
        self.expect(":")?;
        let else_expr = self.ternary()?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    fn binary(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            if self.check_kw("instanceof") {
                if RELATIONAL_PREC < min_prec {
                    break;
                }
                self.advance();
                self.eat_kw("final");
                let ty = self.parse_type()?;
                let binding = if self.peek().kind == TokenKind::Ident {
                    Some(self.ident()?)
                } else {
                    None
                };
                lhs = Expr::InstanceOf {
                    expr: Box::new(lhs),
                    ty,
                    binding,
                };
                continue;
            }

            let Some((op, width)) = self.binary_op() else {
                break;
            };
            let prec = precedence(&op);
            if prec < min_prec {
                break;
            }
            for _ in 0..width {
                self.advance();
            }
            let rhs = self.binary(prec + 1)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// Operator at the cursor and how many tokens it spans
    fn binary_op(&self) -> Option<(String, usize)> {
        let token = self.peek();
        if token.kind != TokenKind::Punct {
            return None;
        }
        if token.text == ">" {
            let second = self.peek_at(1);
            if token.joint && second.is_punct(">") {
                if second.joint && self.peek_at(2).is_punct(">") {
                    return Some((">>>".to_string(), 3));
                }
                return Some((">>".to_string(), 2));
            }
            return Some((">".to_string(), 1));
        }
        SIMPLE_BINARY_OPS
            .contains(&token.text.as_str())
            .then(|| (token.text.clone(), 1))
    }

    fn unary(&mut self) -> PResult<Expr> {
        let token = self.peek();
        if token.kind == TokenKind::Punct
            && ["+", "-", "!", "~", "++", "--"].contains(&token.text.as_str())
        {
            let op = self.advance().text;
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        if self.check("(") {
            if let Some(cast) = self.try_cast()? {
                return Ok(cast);
            }
        }
        self.postfix()
    }

    fn try_cast(&mut self) -> PResult<Option<Expr>> {
        let start = self.pos;
        let Some(ty) = self.speculate(|p| {
            p.expect("(")?;
            let ty = p.parse_type()?;
            p.expect(")")?;
            Ok(ty)
        }) else {
            return Ok(None);
        };

        let next = self.peek();
        let operand_follows = match next.kind {
            TokenKind::Ident
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::Char
            | TokenKind::Str
            | TokenKind::TextBlock => true,
            TokenKind::Keyword => {
                ["this", "super", "new", "true", "false", "null", "switch"].contains(&next.text.as_str())
                    || PRIMITIVE_TYPES.contains(&next.text.as_str())
            }
            TokenKind::Punct => ["(", "!", "~"].contains(&next.text.as_str()),
            TokenKind::Eof => false,
        };

        if ty.is_primitive() || operand_follows {
            let expr = self.unary()?;
            return Ok(Some(Expr::Cast {
                ty,
                expr: Box::new(expr),
            }));
        }
        self.pos = start;
        Ok(None)
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(".") {
                if self.eat_kw("class") {
                    expr = Expr::ClassLit(self.expr_to_type(expr, 0)?);
                    continue;
                }
                if self.eat_kw("this") {
                    expr = Expr::FieldAccess {
                        target: Box::new(expr),
                        name: "this".to_string(),
                    };
                    continue;
                }
                let type_args = if self.check("<") {
                    self.type_args()?
                } else {
                    Vec::new()
                };
                let name = self.ident()?;
                if self.check("(") {
                    let args = self.arguments()?;
                    expr = Expr::MethodCall {
                        target: Some(Box::new(expr)),
                        type_args,
                        name,
                        args,
                    };
                } else {
                    expr = Expr::FieldAccess {
                        target: Box::new(expr),
                        name,
                    };
                }
            } else if self.check("[") {
                if self.peek_at(1).is_punct("]") {
                    let dims = self.dims();
                    let ty = self.expr_to_type(expr, dims)?;
                    expr = self.type_suffix(ty)?;
                    continue;
                }
                self.advance();
                let index = self.expression()?;
                self.expect("]")?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat("::") {
                let name = if self.eat_kw("new") {
                    "new".to_string()
                } else {
                    self.ident()?
                };
                expr = Expr::MethodRef {
                    target: Box::new(expr),
                    name,
                };
            } else if self.check("++") || self.check("--") {
                let op = self.advance().text;
                expr = Expr::Postfix {
                    op,
                    operand: Box::new(expr),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// `.class` or `::new`/`::name` after a type in expression position
    fn type_suffix(&mut self, ty: TypeRef) -> PResult<Expr> {
        if self.eat(".") {
            self.expect_kw("class")?;
            return Ok(Expr::ClassLit(ty));
        }
        if self.eat("::") {
            let name = if self.eat_kw("new") {
                "new".to_string()
            } else {
                self.ident()?
            };
            return Ok(Expr::MethodRef {
                target: Box::new(Expr::Type(ty)),
                name,
            });
        }
        Err(self.error_here("expected '.class' or '::'"))
    }

    fn expr_to_type(&self, expr: Expr, dims: usize) -> PResult<TypeRef> {
        fn collect(expr: Expr, segments: &mut Vec<TypeSegment>) -> bool {
            match expr {
                Expr::Name(name) => {
                    segments.push(TypeSegment { name, args: None });
                    true
                }
                Expr::FieldAccess { target, name } => {
                    let ok = collect(*target, segments);
                    segments.push(TypeSegment { name, args: None });
                    ok
                }
                _ => false,
            }
        }

        if let Expr::Type(mut ty) = expr {
            ty.dims += dims;
            return Ok(ty);
        }
        let mut segments = Vec::new();
        if collect(expr, &mut segments) {
            Ok(TypeRef { segments, dims })
        } else {
            Err(self.error_here("expected a type name"))
        }
    }

    fn primary(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        let literal = |kind| Expr::Literal(Literal {
            kind,
            text: token.text.clone(),
        });

        match token.kind {
            TokenKind::Int => {
                self.advance();
                Ok(literal(LiteralKind::Int))
            }
            TokenKind::Float => {
                self.advance();
                Ok(literal(LiteralKind::Float))
            }
            TokenKind::Char => {
                self.advance();
                Ok(literal(LiteralKind::Char))
            }
            TokenKind::Str => {
                self.advance();
                Ok(literal(LiteralKind::String))
            }
            TokenKind::TextBlock => {
                self.advance();
                Ok(literal(LiteralKind::TextBlock))
            }
            TokenKind::Ident => {
                if !self.no_lambda && self.peek_at(1).is_punct("->") {
                    return self.lambda();
                }
                self.advance();
                if self.check("(") {
                    let args = self.arguments()?;
                    return Ok(Expr::MethodCall {
                        target: None,
                        type_args: Vec::new(),
                        name: token.text,
                        args,
                    });
                }
                Ok(Expr::Name(token.text))
            }
            TokenKind::Keyword => match token.text.as_str() {
                "true" | "false" => {
                    self.advance();
                    Ok(literal(LiteralKind::Bool))
                }
                "null" => {
                    self.advance();
                    Ok(literal(LiteralKind::Null))
                }
                "this" | "super" => {
                    self.advance();
                    if self.check("(") {
                        let args = self.arguments()?;
                        return Ok(Expr::MethodCall {
                            target: None,
                            type_args: Vec::new(),
                            name: token.text.clone(),
                            args,
                        });
                    }
                    Ok(if token.text == "this" { Expr::This } else { Expr::Super })
                }
                "new" => self.creator(),
                "switch" => {
                    self.advance();
                    let selector = self.paren_expression()?;
                    let cases = self.switch_cases()?;
                    Ok(Expr::Switch {
                        selector: Box::new(selector),
                        cases,
                    })
                }
                "void" => {
                    self.advance();
                    let ty = TypeRef::simple("void");
                    self.type_suffix(ty)
                }
                name if PRIMITIVE_TYPES.contains(&name) => {
                    let ty = self.parse_type()?;
                    self.type_suffix(ty)
                }
                _ => Err(self.error_here("expected expression")),
            },
            TokenKind::Punct if token.text == "(" => {
                if self.lambda_ahead() {
                    return self.lambda();
                }
                let saved = self.no_lambda;
                self.no_lambda = false;
                let inner = self.paren_expression();
                self.no_lambda = saved;
                Ok(Expr::Paren(Box::new(inner?)))
            }
            _ => Err(self.error_here("expected expression")),
        }
    }

    fn lambda_ahead(&self) -> bool {
        !self.no_lambda
            && self
                .matching_paren(self.pos)
                .and_then(|close| self.tokens.get(close + 1))
                .is_some_and(|token| token.is_punct("->"))
    }

    fn lambda(&mut self) -> PResult<Expr> {
        let (params, parenthesized) = if self.peek().kind == TokenKind::Ident {
            let name = self.ident()?;
            (vec![LambdaParam { ty: None, name }], false)
        } else {
            self.expect("(")?;
            let mut params = Vec::new();
            while !self.check(")") {
                let inferred = self.peek().kind == TokenKind::Ident
                    && (self.peek_at(1).is_punct(",") || self.peek_at(1).is_punct(")"));
                if inferred {
                    params.push(LambdaParam {
                        ty: None,
                        name: self.ident()?,
                    });
                } else {
                    self.modifiers()?;
                    let ty = self.parse_type()?;
                    let name = self.ident()?;
                    params.push(LambdaParam { ty: Some(ty), name });
                }
                if !self.eat(",") {
                    break;
                }
            }
            self.expect(")")?;
            (params, true)
        };
        self.expect("->")?;

        let saved = self.no_lambda;
        self.no_lambda = false;
        let body = if self.check("{") {
            self.block().map(LambdaBody::Block)
        } else {
            self.expression().map(|e| LambdaBody::Expr(Box::new(e)))
        };
        self.no_lambda = saved;

        Ok(Expr::Lambda {
            params,
            parenthesized,
            body: body?,
        })
    }

    fn creator(&mut self) -> PResult<Expr> {
        self.expect_kw("new")?;
        let mut ty = self.parse_type()?;

        if ty.dims > 0 {
            let extra_dims = ty.dims;
            ty.dims = 0;
            let init = self.array_init()?;
            return Ok(Expr::NewArray {
                element: ty,
                dims: Vec::new(),
                extra_dims,
                init: Some(init),
            });
        }

        if self.check("[") {
            let mut dims = Vec::new();
            while self.check("[") && !self.peek_at(1).is_punct("]") {
                self.advance();
                dims.push(self.expression()?);
                self.expect("]")?;
            }
            let extra_dims = self.dims();
            return Ok(Expr::NewArray {
                element: ty,
                dims,
                extra_dims,
                init: None,
            });
        }

        let args = self.arguments()?;
        let body = if self.eat("{") {
            Some(self.class_body()?)
        } else {
            None
        };
        Ok(Expr::New { ty, args, body })
    }

    fn arguments(&mut self) -> PResult<Vec<Expr>> {
        let saved = std::mem::replace(&mut self.no_lambda, false);
        let result = self.argument_list();
        self.no_lambda = saved;
        result
    }

    fn argument_list(&mut self) -> PResult<Vec<Expr>> {
        self.expect("(")?;
        let mut args = Vec::new();
        while !self.check(")") {
            args.push(self.expression()?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect(")")?;
        Ok(args)
    }
}

fn precedence(op: &str) -> u8 {
    match op {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" => 4,
        "&" => 5,
        "==" | "!=" => 6,
        "<" | ">" | "<=" | ">=" => RELATIONAL_PREC,
        "<<" | ">>" | ">>>" => 8,
        "+" | "-" => 9,
        _ => 10,
    }
}
