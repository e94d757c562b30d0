//! The recursive-descent parser/semantic builder (component P).
//!
//! A `Parser<'a>` holds the lexer's output plus lookahead state, and
//! builds the entity graph directly as it recognizes each declaration
//! instead of producing an intermediate AST: IDL's grammar is shallow
//! enough (no expression-statement bodies, no control flow) that entities
//! *are* the natural parse tree, a single-pass "parse is semantic
//! analysis" design.

use std::path::{Path, PathBuf};

use crate::diagnostic::{CompileError, ParseError, SemanticError};
use crate::entity::{
    Completeness, Direction, EntityArena, EntityData, EntityHandle, EntityKind, Param, PreprocessorDirective,
    PrimitiveKind, StructMember, SwitchKind, UnionCase,
};
use crate::eval::{EvalOutcome, Evaluator};
use crate::lexer::Lexer;
use crate::scope::{ScopeStack, Symbol, SymbolTable};
use crate::stream::TokenStream;
use crate::token::{Keyword, MetaKind, Span, Token, TokenKind};
use crate::value::{ArraySize, ArrayValue, ScalarValue, ValueNode};

/// Everything the parser accumulates while processing one or more
/// translation units that share an entity graph (used for `#include`).
pub struct ParseContext {
    pub arena: EntityArena,
    pub symbols: SymbolTable,
    pub scopes: ScopeStack,
}

impl ParseContext {
    /// Creates a fresh, empty context.
    pub fn new() -> Self {
        Self {
            arena: EntityArena::new(),
            symbols: SymbolTable::new(),
            scopes: ScopeStack::new(),
        }
    }
}

impl Default for ParseContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses one file's token stream against a shared [`ParseContext`].
pub struct Parser<'a> {
    stream: TokenStream,
    ctx: &'a mut ParseContext,
    errors: Vec<CompileError>,
}

impl<'a> Parser<'a> {
    /// Lexes `source` (attributing spans to `path`) and builds a parser
    /// over the resulting token stream.
    pub fn new(source: &str, path: PathBuf, ctx: &'a mut ParseContext) -> (Self, Vec<CompileError>) {
        let (tokens, lex_errors) = Lexer::new(source, path).tokenize();
        let errors = lex_errors.into_iter().map(CompileError::from).collect();
        (
            Self {
                stream: TokenStream::new(tokens),
                ctx,
                errors: Vec::new(),
            },
            errors,
        )
    }

    /// Parses the whole file as a sequence of top-level declarations,
    /// returning the handles created and any errors recorded along the way.
    pub fn parse_file(&mut self) -> (Vec<EntityHandle>, Vec<CompileError>) {
        let mut top = Vec::new();
        while !self.stream.at_eof() {
            match self.parse_declaration(None) {
                Ok(Some(handle)) => top.push(handle),
                Ok(None) => {}
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }
        (top, std::mem::take(&mut self.errors))
    }

    /// Skips tokens until the next plausible declaration boundary, so one
    /// syntax error doesn't cascade into spurious follow-on errors.
    fn synchronize(&mut self) {
        loop {
            if self.stream.at_eof() {
                return;
            }
            if matches!(self.stream.peek(0).kind, TokenKind::Punct(";")) {
                self.stream.advance();
                return;
            }
            if matches!(self.stream.peek(0).kind, TokenKind::Punct("}")) {
                return;
            }
            self.stream.advance();
        }
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.stream.peek(0).kind
    }

    fn current_span(&self) -> Span {
        self.stream.peek(0).span.clone()
    }

    fn expect_punct(&mut self, p: &'static str) -> Result<Token, CompileError> {
        if let TokenKind::Punct(found) = self.stream.peek(0).kind {
            if found == p {
                return Ok(self.stream.advance());
            }
        }
        Err(self.parse_error(format!("expected '{p}', found {}", self.stream.peek(0).kind)))
    }

    fn expect_identifier(&mut self) -> Result<(Symbol, String, Span), CompileError> {
        let tok = self.stream.peek(0).clone();
        match tok.ident_text() {
            Some(text) if matches!(tok.kind, TokenKind::Identifier) => {
                self.stream.advance();
                let sym = self.ctx.symbols.intern(text);
                Ok((sym, text.to_string(), tok.span))
            }
            _ => Err(self.parse_error(format!("expected identifier, found {}", tok.kind))),
        }
    }

    fn parse_error(&self, message: impl Into<String>) -> CompileError {
        CompileError::Parse(ParseError {
            message: message.into(),
            span: self.current_span(),
        })
    }

    fn semantic_error(&self, span: Span, message: impl Into<String>) -> CompileError {
        CompileError::Semantic(SemanticError {
            message: message.into(),
            span,
        })
    }

    /// Dispatches on the next keyword to parse one top-level or
    /// container-nested declaration. A `#include`/`#define`/`#undef`
    /// produces its own [`EntityKind::Preprocessor`] entity so G1 can
    /// still pass it through; actually resolving an `#include`'s target
    /// file and merging its entities is left to the driver (component
    /// parsing never touches the filesystem). When nested inside a
    /// container, the resulting entity's kind is checked against
    /// [`crate::entity::supports`] so e.g. a `union` nested inside a
    /// `struct` is rejected rather than silently accepted.
    fn parse_declaration(&mut self, parent: Option<EntityHandle>) -> Result<Option<EntityHandle>, CompileError> {
        let result = match self.peek_kind().clone() {
            TokenKind::Meta(crate::token::MetaKind::Verbatim(text)) => {
                let span = self.current_span();
                self.stream.advance();
                let name = self.ctx.symbols.intern("%verbatim%");
                Ok(Some(self.ctx.arena.insert(EntityData {
                    name,
                    scoped_name: self.scoped_name(parent, name),
                    span,
                    parent,
                    completeness: Completeness::Complete,
                    leading_comment: None,
                    kind: EntityKind::Verbatim(text),
                })))
            }
            TokenKind::Meta(MetaKind::IncludeLocal(path)) => Ok(Some(self.declare_preprocessor(parent, PreprocessorDirective::IncludeLocal(path)))),
            TokenKind::Meta(MetaKind::IncludeSystem(path)) => Ok(Some(self.declare_preprocessor(parent, PreprocessorDirective::IncludeSystem(path)))),
            TokenKind::Meta(MetaKind::Define(text)) => Ok(Some(self.declare_preprocessor(parent, PreprocessorDirective::Define(text)))),
            TokenKind::Meta(MetaKind::Undef(text)) => Ok(Some(self.declare_preprocessor(parent, PreprocessorDirective::Undef(text)))),
            TokenKind::Keyword(Keyword::Module) => self.parse_module(parent).map(Some),
            TokenKind::Keyword(Keyword::Interface) => self.parse_interface(parent, false).map(Some),
            TokenKind::Keyword(Keyword::Local) => {
                self.stream.advance();
                self.expect_keyword(Keyword::Interface)?;
                self.parse_interface(parent, true).map(Some)
            }
            TokenKind::Keyword(Keyword::Struct) => self.parse_struct(parent).map(Some),
            TokenKind::Keyword(Keyword::Exception) => self.parse_exception(parent).map(Some),
            TokenKind::Keyword(Keyword::Enum) => self.parse_enum(parent).map(Some),
            TokenKind::Keyword(Keyword::Union) => self.parse_union(parent).map(Some),
            TokenKind::Keyword(Keyword::Typedef) => self.parse_typedef(parent).map(Some),
            TokenKind::Keyword(Keyword::Const) => self.parse_const(parent).map(Some),
            TokenKind::Keyword(Keyword::Attribute) | TokenKind::Keyword(Keyword::Readonly) => {
                self.parse_attribute(parent).map(Some)
            }
            _ if self.looks_like_type() => self.parse_operation_or_member(parent).map(Some),
            other => Err(self.parse_error(format!("unexpected token {other} at declaration position"))),
        }?;

        if let (Some(parent), Some(member)) = (parent, result) {
            let container_kind = self.ctx.arena.get(parent).kind.clone();
            let member_kind = self.ctx.arena.get(member).kind.clone();
            let exempt = matches!(member_kind, EntityKind::Verbatim(_) | EntityKind::Preprocessor(_));
            if !exempt && !crate::entity::supports(&container_kind, &member_kind) {
                let span = self.ctx.arena.get(member).span.clone();
                return Err(self.semantic_error(span, "this declaration is not allowed inside its enclosing container".to_string()));
            }
        }

        Ok(result)
    }

    /// Advances past the already-peeked `Meta` token and records `directive`
    /// as its own entity, so it survives into G1 passthrough and, for
    /// includes, is visible to the driver's `#include` resolution pass.
    fn declare_preprocessor(&mut self, parent: Option<EntityHandle>, directive: PreprocessorDirective) -> EntityHandle {
        let span = self.current_span();
        self.stream.advance();
        let name = self.ctx.symbols.intern("%preprocessor%");
        self.ctx.arena.insert(EntityData {
            name,
            scoped_name: self.scoped_name(parent, name),
            span,
            parent,
            completeness: Completeness::Complete,
            leading_comment: None,
            kind: EntityKind::Preprocessor(directive),
        })
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Result<(), CompileError> {
        if let TokenKind::Keyword(found) = &self.stream.peek(0).kind {
            if *found == kw {
                self.stream.advance();
                return Ok(());
            }
        }
        Err(self.parse_error(format!("expected '{kw}'")))
    }

    fn looks_like_type(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(_) | TokenKind::Identifier)
    }

    fn parse_module(&mut self, parent: Option<EntityHandle>) -> Result<EntityHandle, CompileError> {
        self.stream.advance();
        let (name, _, span) = self.expect_identifier()?;
        let handle = self.declare(parent, name, span, EntityKind::Module { members: Vec::new() })?;
        self.expect_punct("{")?;
        self.ctx.scopes.push();
        let mut members = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::Punct("}")) {
            match self.parse_declaration(Some(handle)) {
                Ok(Some(member)) => members.push(member),
                Ok(None) => {}
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }
        self.ctx.scopes.pop();
        self.expect_punct("}")?;
        self.expect_punct(";")?;
        if let EntityKind::Module { members: slot } = &mut self.ctx.arena.get_mut(handle).kind {
            *slot = members;
        }
        Ok(handle)
    }

    fn declare(
        &mut self,
        parent: Option<EntityHandle>,
        name: Symbol,
        span: Span,
        kind: EntityKind,
    ) -> Result<EntityHandle, CompileError> {
        if let Some(existing) = self.ctx.scopes.lookup_local(name) {
            return Err(self.semantic_error(span, format!("'{existing:?}' is already declared in this scope")));
        }
        let scoped_name = self.scoped_name(parent, name);
        let handle = self.ctx.arena.insert(EntityData {
            name,
            scoped_name,
            span,
            parent,
            completeness: Completeness::Complete,
            leading_comment: None,
            kind,
        });
        self.ctx.scopes.bind(name, handle);
        Ok(handle)
    }

    fn scoped_name(&self, parent: Option<EntityHandle>, name: Symbol) -> Vec<Symbol> {
        match parent {
            Some(p) => {
                let mut v = self.ctx.arena.get(p).scoped_name.clone();
                v.push(name);
                v
            }
            None => vec![name],
        }
    }

    fn parse_interface(&mut self, parent: Option<EntityHandle>, local: bool) -> Result<EntityHandle, CompileError> {
        self.stream.advance();
        let (name, _, span) = self.expect_identifier()?;
        let mut bases = Vec::new();
        if matches!(self.peek_kind(), TokenKind::Punct(":")) {
            self.stream.advance();
            loop {
                let (base_sym, base_text, base_span) = self.expect_identifier()?;
                let base = self
                    .ctx
                    .scopes
                    .lookup(base_sym)
                    .ok_or_else(|| self.semantic_error(base_span, format!("unresolved base interface '{base_text}'")))?;
                bases.push(base);
                if matches!(self.peek_kind(), TokenKind::Punct(",")) {
                    self.stream.advance();
                } else {
                    break;
                }
            }
        }
        let handle = self.declare(
            parent,
            name,
            span,
            EntityKind::Interface {
                local,
                bases,
                members: Vec::new(),
            },
        )?;
        self.expect_punct("{")?;
        self.ctx.scopes.push();
        let mut members = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::Punct("}")) {
            match self.parse_declaration(Some(handle)) {
                Ok(Some(member)) => members.push(member),
                Ok(None) => {}
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }
        self.ctx.scopes.pop();
        self.expect_punct("}")?;
        self.expect_punct(";")?;
        if let EntityKind::Interface { members: slot, .. } = &mut self.ctx.arena.get_mut(handle).kind {
            *slot = members;
        }
        Ok(handle)
    }

    fn parse_struct(&mut self, parent: Option<EntityHandle>) -> Result<EntityHandle, CompileError> {
        self.stream.advance();
        let (name, _, span) = self.expect_identifier()?;
        let handle = self.declare(parent, name, span, EntityKind::Struct { members: Vec::new() })?;
        self.expect_punct("{")?;
        let mut members = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::Punct("}")) {
            let (member_type, _) = self.parse_type_ref()?;
            members.push(self.parse_decl_item(member_type)?);
        }
        self.expect_punct("}")?;
        self.expect_punct(";")?;
        if let EntityKind::Struct { members: slot } = &mut self.ctx.arena.get_mut(handle).kind {
            *slot = members;
        }
        Ok(handle)
    }

    fn parse_exception(&mut self, parent: Option<EntityHandle>) -> Result<EntityHandle, CompileError> {
        self.stream.advance();
        let (name, name_text, span) = self.expect_identifier()?;
        let handle = self.declare(
            parent,
            name,
            span,
            EntityKind::Exception {
                members: Vec::new(),
                description: format!("{name_text} exception"),
            },
        )?;
        self.expect_punct("{")?;
        let mut members = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::Punct("}")) {
            let (member_type, _) = self.parse_type_ref()?;
            members.push(self.parse_decl_item(member_type)?);
        }
        self.expect_punct("}")?;
        self.expect_punct(";")?;
        if let EntityKind::Exception { members: slot, .. } = &mut self.ctx.arena.get_mut(handle).kind {
            *slot = members;
        }
        Ok(handle)
    }

    /// Parses one `decl_item := identifier { '[' expr ']' } [ '='
    /// initializer ]` for a struct/exception member already past its type.
    fn parse_decl_item(&mut self, member_type: EntityHandle) -> Result<StructMember, CompileError> {
        let (member_name, _, _) = self.expect_identifier()?;
        let array_dims = self.parse_array_dims()?;
        let initializer = if matches!(self.peek_kind(), TokenKind::Punct("=")) {
            self.stream.advance();
            Some(self.parse_initializer()?)
        } else {
            None
        };
        self.expect_punct(";")?;
        Ok(StructMember {
            name: member_name,
            member_type,
            array_dims,
            initializer,
        })
    }

    /// Parses the right-hand side of a member's `= initializer`: either a
    /// brace-delimited list (`{ a, b, ... }`, itself recursively either an
    /// array or a compound's positional members) or a single constant
    /// expression.
    fn parse_initializer(&mut self) -> Result<ValueNode, CompileError> {
        if matches!(self.peek_kind(), TokenKind::Punct("{")) {
            self.stream.advance();
            let mut elements = Vec::new();
            while !matches!(self.peek_kind(), TokenKind::Punct("}")) {
                elements.push(self.parse_initializer()?);
                if matches!(self.peek_kind(), TokenKind::Punct(",")) {
                    self.stream.advance();
                } else {
                    break;
                }
            }
            self.expect_punct("}")?;
            let size = ArraySize::Fixed(elements.len() as u64);
            return Ok(ValueNode::Array(ArrayValue { size, elements }));
        }
        let outcome = {
            let mut evaluator =
                Evaluator::new(&mut self.stream, &self.ctx.arena, &self.ctx.scopes, &mut self.ctx.symbols);
            evaluator.eval_expr().map_err(|e| self.parse_error(e.to_string()))?
        };
        Ok(match outcome {
            EvalOutcome::Const(v) => ValueNode::Scalar(ScalarValue::fixed(v)),
            EvalOutcome::Dynamic(expr) => ValueNode::Scalar(ScalarValue::dynamic(expr)),
        })
    }

    fn parse_enum(&mut self, parent: Option<EntityHandle>) -> Result<EntityHandle, CompileError> {
        self.stream.advance();
        let (name, _, span) = self.expect_identifier()?;
        let handle = self.declare(parent, name, span, EntityKind::Enum { enumerators: Vec::new() })?;
        self.expect_punct("{")?;
        let mut enumerators = Vec::new();
        loop {
            let (enum_sym, _, enum_span) = self.expect_identifier()?;
            self.declare(Some(handle), enum_sym, enum_span, EntityKind::ConstDecl {
                const_type: handle,
                value: crate::variant::ConstVariant::I64(enumerators.len() as i64),
            })?;
            enumerators.push(enum_sym);
            if matches!(self.peek_kind(), TokenKind::Punct(",")) {
                self.stream.advance();
            } else {
                break;
            }
        }
        self.expect_punct("}")?;
        self.expect_punct(";")?;
        if let EntityKind::Enum { enumerators: slot } = &mut self.ctx.arena.get_mut(handle).kind {
            *slot = enumerators;
        }
        Ok(handle)
    }

    /// Parses `union Name switch(<type-or-variable>) { case ...: Type member; ... };`.
    ///
    /// The switch expression is ambiguous between a type (`switch(long)`)
    /// and a variable reference (`switch(count)`) until resolved against
    /// scope: an identifier that resolves to a sibling declaration makes
    /// this variable-based; anything else (a type keyword, or an
    /// identifier naming a typedef/enum) makes it type-based.
    fn parse_union(&mut self, parent: Option<EntityHandle>) -> Result<EntityHandle, CompileError> {
        self.stream.advance();
        let (name, _, span) = self.expect_identifier()?;
        self.expect_keyword(Keyword::Switch)?;
        self.expect_punct("(")?;
        let switch_span = self.current_span();
        let switch = self.parse_switch_discriminant(parent, switch_span)?;
        self.expect_punct(")")?;
        let handle = self.declare(
            parent,
            name,
            span,
            EntityKind::Union {
                switch,
                cases: Vec::new(),
            },
        )?;
        self.expect_punct("{")?;
        let mut cases = Vec::new();
        loop {
            let mut labels = Vec::new();
            let mut is_default = false;
            loop {
                match self.peek_kind() {
                    TokenKind::Keyword(Keyword::Case) => {
                        self.stream.advance();
                        let outcome = self.eval_case_label()?;
                        if let EvalOutcome::Const(v) = outcome {
                            labels.push(v);
                        }
                        self.expect_punct(":")?;
                    }
                    TokenKind::Keyword(Keyword::Default) => {
                        self.stream.advance();
                        self.expect_punct(":")?;
                        is_default = true;
                    }
                    _ => break,
                }
            }
            if labels.is_empty() && !is_default {
                break;
            }
            let (member_type, _) = self.parse_type_ref()?;
            let (member_name, _, _) = self.expect_identifier()?;
            let array_dims = self.parse_array_dims()?;
            self.expect_punct(";")?;
            cases.push(UnionCase {
                labels,
                is_default,
                member: member_name,
                member_type,
                array_dims,
            });
        }
        self.expect_punct("}")?;
        self.expect_punct(";")?;
        if let EntityKind::Union { cases: slot, .. } = &mut self.ctx.arena.get_mut(handle).kind {
            *slot = cases;
        }
        Ok(handle)
    }

    fn parse_switch_discriminant(
        &mut self,
        parent: Option<EntityHandle>,
        span: Span,
    ) -> Result<SwitchKind, CompileError> {
        if let TokenKind::Identifier = self.peek_kind() {
            let tok = self.stream.peek(0).clone();
            if let Some(existing) = self.ctx.scopes.lookup(self.ctx.symbols.intern(&tok.lexeme)) {
                // A variable-based union must share a common ancestor
                // container with the variable it switches on.
                if let Some(parent) = parent {
                    if self.ctx.arena.common_ancestor(parent, existing).is_none() {
                        return Err(self.semantic_error(
                            span,
                            format!("switch variable '{}' is not visible from a common ancestor of this union", tok.lexeme),
                        ));
                    }
                }
                self.stream.advance();
                return Ok(SwitchKind::VariableBased { variable: existing });
            }
        }
        let (discriminant_type, _) = self.parse_type_ref()?;
        Ok(SwitchKind::TypeBased { discriminant_type })
    }

    fn eval_case_label(&mut self) -> Result<EvalOutcome, CompileError> {
        let mut evaluator = Evaluator::new(&mut self.stream, &self.ctx.arena, &self.ctx.scopes, &mut self.ctx.symbols);
        evaluator.eval_expr().map_err(|e| {
            CompileError::Semantic(SemanticError {
                message: e.to_string(),
                span: Span::synthetic(),
            })
        })
    }

    fn parse_typedef(&mut self, parent: Option<EntityHandle>) -> Result<EntityHandle, CompileError> {
        self.stream.advance();
        let (target, _) = self.parse_type_ref()?;
        let (name, _, span) = self.expect_identifier()?;
        let array_dims = self.parse_array_dims()?;
        self.expect_punct(";")?;
        self.declare(parent, name, span, EntityKind::Typedef { target, array_dims })
    }

    fn parse_const(&mut self, parent: Option<EntityHandle>) -> Result<EntityHandle, CompileError> {
        self.stream.advance();
        let (const_type, _) = self.parse_type_ref()?;
        let (name, _, span) = self.expect_identifier()?;
        self.expect_punct("=")?;
        let outcome = {
            let mut evaluator =
                Evaluator::new(&mut self.stream, &self.ctx.arena, &self.ctx.scopes, &mut self.ctx.symbols);
            evaluator.eval_expr().map_err(|e| self.semantic_error(span.clone(), e.to_string()))?
        };
        self.expect_punct(";")?;
        let value = match outcome {
            EvalOutcome::Const(v) => v,
            EvalOutcome::Dynamic(_) => {
                return Err(self.semantic_error(span, "const declarations require a compile-time constant initializer"))
            }
        };
        self.declare(parent, name, span, EntityKind::ConstDecl { const_type, value })
    }

    fn parse_attribute(&mut self, parent: Option<EntityHandle>) -> Result<EntityHandle, CompileError> {
        let readonly = if matches!(self.peek_kind(), TokenKind::Keyword(Keyword::Readonly)) {
            self.stream.advance();
            true
        } else {
            false
        };
        self.expect_keyword(Keyword::Attribute)?;
        let (attr_type, _) = self.parse_type_ref()?;
        let (name, _, span) = self.expect_identifier()?;
        self.expect_punct(";")?;
        self.declare(parent, name, span, EntityKind::Attribute { attr_type, readonly })
    }

    fn parse_operation_or_member(&mut self, parent: Option<EntityHandle>) -> Result<EntityHandle, CompileError> {
        let (return_type, _) = self.parse_type_ref()?;
        let (name, _, span) = self.expect_identifier()?;
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::Punct(")")) {
            let direction = match self.peek_kind() {
                TokenKind::Keyword(Keyword::In) => {
                    self.stream.advance();
                    Direction::In
                }
                TokenKind::Keyword(Keyword::Out) => {
                    self.stream.advance();
                    Direction::Out
                }
                TokenKind::Keyword(Keyword::Inout) => {
                    self.stream.advance();
                    Direction::Inout
                }
                _ => return Err(self.parse_error("expected parameter direction ('in'/'out'/'inout')")),
            };
            let (param_type, _) = self.parse_type_ref()?;
            let (param_name, _, _) = self.expect_identifier()?;
            params.push(Param {
                name: param_name,
                direction,
                param_type,
            });
            if matches!(self.peek_kind(), TokenKind::Punct(",")) {
                self.stream.advance();
            } else {
                break;
            }
        }
        self.expect_punct(")")?;
        let mut raises = Vec::new();
        if matches!(self.peek_kind(), TokenKind::Keyword(Keyword::Raises)) {
            self.stream.advance();
            self.expect_punct("(")?;
            loop {
                let (_, text, rspan) = self.expect_identifier()?;
                let sym = self.ctx.symbols.intern(&text);
                let exc = self
                    .ctx
                    .scopes
                    .lookup(sym)
                    .ok_or_else(|| self.semantic_error(rspan, format!("unresolved exception '{text}'")))?;
                raises.push(exc);
                if matches!(self.peek_kind(), TokenKind::Punct(",")) {
                    self.stream.advance();
                } else {
                    break;
                }
            }
            self.expect_punct(")")?;
        }
        self.expect_punct(";")?;
        self.declare(
            parent,
            name,
            span,
            EntityKind::Operation {
                return_type,
                params,
                raises,
            },
        )
    }

    fn parse_array_dims(&mut self) -> Result<Vec<crate::value::ValueNode>, CompileError> {
        let mut dims = Vec::new();
        while matches!(self.peek_kind(), TokenKind::Punct("[")) {
            self.stream.advance();
            if matches!(self.peek_kind(), TokenKind::Punct("]")) {
                self.stream.advance();
                dims.push(crate::value::ValueNode::Array(crate::value::ArrayValue {
                    size: crate::value::ArraySize::FixedUnbound,
                    elements: Vec::new(),
                }));
                continue;
            }
            let outcome = {
                let mut evaluator =
                    Evaluator::new(&mut self.stream, &self.ctx.arena, &self.ctx.scopes, &mut self.ctx.symbols);
                evaluator.eval_expr().map_err(|e| self.parse_error(e.to_string()))?
            };
            self.expect_punct("]")?;
            let size = match outcome {
                EvalOutcome::Const(v) => match v {
                    crate::variant::ConstVariant::I64(i) => crate::value::ArraySize::Fixed(i as u64),
                    crate::variant::ConstVariant::U64(u) => crate::value::ArraySize::Fixed(u),
                    _ => return Err(self.parse_error("array size must be an integer constant")),
                },
                EvalOutcome::Dynamic(s) => crate::value::ArraySize::Dynamic(s),
            };
            dims.push(crate::value::ValueNode::Array(crate::value::ArrayValue {
                size,
                elements: Vec::new(),
            }));
        }
        Ok(dims)
    }

    /// Parses a type reference: either a primitive keyword, a
    /// `sequence<T[,bound]>`, or a (possibly scoped) identifier resolving
    /// to a previously declared entity.
    fn parse_type_ref(&mut self) -> Result<(EntityHandle, Span), CompileError> {
        let span = self.current_span();
        match self.peek_kind().clone() {
            TokenKind::Keyword(Keyword::Sequence) => {
                self.stream.advance();
                self.expect_punct("<")?;
                let (element, _) = self.parse_type_ref()?;
                let bound = if matches!(self.peek_kind(), TokenKind::Punct(",")) {
                    self.stream.advance();
                    let mut evaluator =
                        Evaluator::new(&mut self.stream, &self.ctx.arena, &self.ctx.scopes, &mut self.ctx.symbols);
                    match evaluator.eval_expr().map_err(|e| self.parse_error(e.to_string()))? {
                        EvalOutcome::Const(v) => Some(v),
                        EvalOutcome::Dynamic(_) => None,
                    }
                } else {
                    None
                };
                self.expect_punct(">")?;
                let name = self.ctx.symbols.intern("sequence");
                let handle = self.ctx.arena.insert(EntityData {
                    name,
                    scoped_name: vec![name],
                    span: span.clone(),
                    parent: None,
                    completeness: Completeness::Complete,
                    leading_comment: None,
                    kind: EntityKind::Sequence { element, bound },
                });
                Ok((handle, span))
            }
            TokenKind::Keyword(kw) if primitive_kind(&kw).is_some() => {
                self.stream.advance();
                let prim = primitive_kind(&kw).unwrap();
                let name = self.ctx.symbols.intern(&kw.to_string());
                Ok((self.ctx.arena.primitive(prim, name, span.clone()), span))
            }
            TokenKind::Identifier => {
                let (sym, text, ident_span) = self.expect_identifier()?;
                match self.ctx.scopes.lookup(sym) {
                    Some(handle) => Ok((handle, ident_span)),
                    None => Err(self.semantic_error(ident_span, format!("unresolved type '{text}'"))),
                }
            }
            other => Err(self.parse_error(format!("expected a type, found {other}"))),
        }
    }
}

fn primitive_kind(kw: &Keyword) -> Option<PrimitiveKind> {
    Some(match kw {
        Keyword::Boolean => PrimitiveKind::Boolean,
        Keyword::Octet => PrimitiveKind::Octet,
        Keyword::Char => PrimitiveKind::Char,
        Keyword::Char16 => PrimitiveKind::Char16,
        Keyword::Char32 => PrimitiveKind::Char32,
        Keyword::Wchar => PrimitiveKind::Wchar,
        Keyword::Short => PrimitiveKind::Short,
        Keyword::Long => PrimitiveKind::Long,
        Keyword::LongLong => PrimitiveKind::LongLong,
        Keyword::UnsignedShort => PrimitiveKind::UShort,
        Keyword::UnsignedLong => PrimitiveKind::ULong,
        Keyword::UnsignedLongLong => PrimitiveKind::ULongLong,
        Keyword::Int8 => PrimitiveKind::Int8,
        Keyword::Int16 => PrimitiveKind::Int16,
        Keyword::Int32 => PrimitiveKind::Int32,
        Keyword::Int64 => PrimitiveKind::Int64,
        Keyword::Uint8 => PrimitiveKind::Uint8,
        Keyword::Uint16 => PrimitiveKind::Uint16,
        Keyword::Uint32 => PrimitiveKind::Uint32,
        Keyword::Uint64 => PrimitiveKind::Uint64,
        Keyword::Float => PrimitiveKind::Float,
        Keyword::Double => PrimitiveKind::Double,
        Keyword::LongDouble => PrimitiveKind::LongDouble,
        Keyword::Fixed => PrimitiveKind::Fixed,
        Keyword::String => PrimitiveKind::String,
        Keyword::U8string => PrimitiveKind::U8string,
        Keyword::U16string => PrimitiveKind::U16string,
        Keyword::U32string => PrimitiveKind::U32string,
        Keyword::Wstring => PrimitiveKind::Wstring,
        Keyword::Any => PrimitiveKind::Any,
        Keyword::Void => PrimitiveKind::Void,
        _ => return None,
    })
}

/// Convenience wrapper: parses a single standalone file into a fresh context.
pub fn parse_file(source: &str, path: &Path) -> Result<(ParseContext, Vec<EntityHandle>), Vec<CompileError>> {
    let mut ctx = ParseContext::new();
    let (mut parser, mut errors) = Parser::new(source, path.to_path_buf(), &mut ctx);
    let (top, parse_errors) = parser.parse_file();
    errors.extend(parse_errors);
    drop(parser);
    if errors.is_empty() {
        Ok((ctx, top))
    } else {
        Err(errors)
    }
}
