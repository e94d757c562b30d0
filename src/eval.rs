//! Constant expression evaluation (component V).
//!
//! A precedence-climbing ("Pratt") evaluator over the token stream, using
//! a binding-power table but folding directly to [`ConstVariant`]
//! instead of building an AST: constant
//! expressions in IDL are only ever used as array bounds, case labels, or
//! `const` initializers, so there's no reuse benefit to a separate tree.
//! When an identifier resolves to something other than a `const`
//! declaration, the whole (sub)expression becomes dynamic and the source
//! text consumed so far is retained for verbatim re-emission.

use crate::entity::{EntityArena, EntityKind};
use crate::scope::{ScopeStack, SymbolTable};
use crate::stream::TokenStream;
use crate::token::TokenKind;
use crate::variant::{ConstVariant, VariantError};

/// The result of evaluating a constant expression.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    /// Fully folded to a compile-time constant.
    Const(ConstVariant),
    /// Depends on a non-const identifier; carries the source text consumed.
    Dynamic(String),
}

/// Errors specific to constant-expression evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Variant(#[from] VariantError),
    #[error("expected an expression, found {found}")]
    ExpectedExpression { found: String },
    #[error("unresolved identifier '{0}'")]
    Unresolved(String),
    #[error("expected '{expected}', found {found}")]
    ExpectedToken { expected: &'static str, found: String },
}

/// Evaluates constant expressions against a live scope/entity graph.
pub struct Evaluator<'a> {
    stream: &'a mut TokenStream,
    arena: &'a EntityArena,
    scopes: &'a ScopeStack,
    symbols: &'a mut SymbolTable,
    text: String,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator borrowing the stream, entity arena, and scope
    /// stack it needs to resolve identifiers.
    pub fn new(
        stream: &'a mut TokenStream,
        arena: &'a EntityArena,
        scopes: &'a ScopeStack,
        symbols: &'a mut SymbolTable,
    ) -> Self {
        Self {
            stream,
            arena,
            scopes,
            symbols,
            text: String::new(),
        }
    }

    /// Parses and evaluates one full expression (the conditional/ternary
    /// level, the lowest precedence IDL constant expressions support).
    pub fn eval_expr(&mut self) -> Result<EvalOutcome, EvalError> {
        self.eval_binary(0)
    }

    fn consume(&mut self) -> crate::token::Token {
        let tok = self.stream.advance();
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(&tok.lexeme);
        tok
    }

    fn binding_power(op: &str) -> Option<(u8, u8)> {
        Some(match op {
            "||" => (1, 2),
            "&&" => (3, 4),
            "|" => (5, 6),
            "^" => (7, 8),
            "&" => (9, 10),
            "==" | "!=" => (11, 12),
            "<" | ">" | "<=" | ">=" => (13, 14),
            "<<" | ">>" => (15, 16),
            "+" | "-" => (17, 18),
            "*" | "/" | "%" => (19, 20),
            _ => return None,
        })
    }

    fn eval_binary(&mut self, min_bp: u8) -> Result<EvalOutcome, EvalError> {
        let mut lhs = self.eval_unary()?;
        loop {
            let op = match &self.stream.peek(0).kind {
                TokenKind::Punct(p) => *p,
                _ => break,
            };
            let Some((left_bp, right_bp)) = Self::binding_power(op) else {
                break;
            };
            if left_bp < min_bp {
                break;
            }
            self.consume();
            let rhs = self.eval_binary(right_bp)?;
            lhs = self.combine(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn combine(&self, op: &str, lhs: EvalOutcome, rhs: EvalOutcome) -> Result<EvalOutcome, EvalError> {
        let (a, b) = match (lhs, rhs) {
            (EvalOutcome::Const(a), EvalOutcome::Const(b)) => (a, b),
            (lhs, rhs) => {
                let lt = match lhs {
                    EvalOutcome::Const(v) => v.to_string(),
                    EvalOutcome::Dynamic(s) => s,
                };
                let rt = match rhs {
                    EvalOutcome::Const(v) => v.to_string(),
                    EvalOutcome::Dynamic(s) => s,
                };
                return Ok(EvalOutcome::Dynamic(format!("{lt} {op} {rt}")));
            }
        };
        let result = match op {
            "+" => a.checked_add(&b)?,
            "-" => a.checked_sub(&b)?,
            "*" => a.checked_mul(&b)?,
            "/" => a.checked_div(&b)?,
            "%" => a.checked_rem(&b)?,
            "&" => a.checked_bitand(&b)?,
            "|" => a.checked_bitor(&b)?,
            "^" => a.checked_bitxor(&b)?,
            "<<" => a.checked_shl(&b)?,
            ">>" => a.checked_shr(&b)?,
            "&&" => ConstVariant::Bool(truthy(&a) && truthy(&b)),
            "||" => ConstVariant::Bool(truthy(&a) || truthy(&b)),
            "==" => ConstVariant::Bool(a == b),
            "!=" => ConstVariant::Bool(a != b),
            "<" | ">" | "<=" | ">=" => ConstVariant::Bool(compare(op, &a, &b)?),
            _ => return Err(EvalError::ExpectedExpression { found: op.to_string() }),
        };
        Ok(EvalOutcome::Const(result))
    }

    fn eval_unary(&mut self) -> Result<EvalOutcome, EvalError> {
        if let TokenKind::Punct(p @ ("-" | "!" | "~" | "+")) = self.stream.peek(0).kind {
            self.consume();
            let operand = self.eval_unary()?;
            return Ok(match operand {
                EvalOutcome::Const(v) => EvalOutcome::Const(match p {
                    "-" => -v,
                    "!" => ConstVariant::Bool(!truthy(&v)),
                    "~" => !v,
                    _ => v,
                }),
                EvalOutcome::Dynamic(s) => EvalOutcome::Dynamic(format!("{p}{s}")),
            });
        }
        self.eval_primary()
    }

    fn eval_primary(&mut self) -> Result<EvalOutcome, EvalError> {
        let tok = self.stream.peek(0).clone();
        match &tok.kind {
            TokenKind::Punct("(") => {
                self.consume();
                let inner = self.eval_binary(0)?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            TokenKind::IntLiteral(lit) => {
                self.consume();
                Ok(EvalOutcome::Const(if lit.unsigned_hint() {
                    ConstVariant::U64(lit.value)
                } else {
                    ConstVariant::I64(lit.value as i64)
                }))
            }
            TokenKind::FloatLiteral(lit) => {
                self.consume();
                Ok(EvalOutcome::Const(ConstVariant::F64(lit.value)))
            }
            TokenKind::CharLiteral { value, encoding } => {
                let (value, encoding) = (*value, *encoding);
                self.consume();
                Ok(EvalOutcome::Const(ConstVariant::Char { value, encoding }))
            }
            TokenKind::StringLiteral { value, encoding } => {
                let (value, encoding) = (value.clone(), *encoding);
                self.consume();
                Ok(EvalOutcome::Const(ConstVariant::Str { value, encoding }))
            }
            TokenKind::Identifier if tok.lexeme == "true" || tok.lexeme == "false" => {
                self.consume();
                Ok(EvalOutcome::Const(ConstVariant::Bool(tok.lexeme == "true")))
            }
            TokenKind::Identifier => {
                self.consume();
                self.resolve_identifier(&tok.lexeme)
            }
            other => Err(EvalError::ExpectedExpression { found: other.to_string() }),
        }
    }

    fn resolve_identifier(&mut self, name: &str) -> Result<EvalOutcome, EvalError> {
        let sym = self.symbols.intern(name);
        match self.scopes.lookup(sym) {
            Some(handle) => match &self.arena.get(handle).kind {
                EntityKind::ConstDecl { value, .. } => Ok(EvalOutcome::Const(value.clone())),
                _ => Ok(EvalOutcome::Dynamic(name.to_string())),
            },
            None => Err(EvalError::Unresolved(name.to_string())),
        }
    }

    fn expect_punct(&mut self, expected: &'static str) -> Result<(), EvalError> {
        if let TokenKind::Punct(p) = self.stream.peek(0).kind {
            if p == expected {
                self.consume();
                return Ok(());
            }
        }
        Err(EvalError::ExpectedToken {
            expected,
            found: self.stream.peek(0).kind.to_string(),
        })
    }
}

fn truthy(v: &ConstVariant) -> bool {
    match v {
        ConstVariant::Bool(b) => *b,
        ConstVariant::I64(i) => *i != 0,
        ConstVariant::U64(u) => *u != 0,
        ConstVariant::F64(f) | ConstVariant::LongDouble(f) => *f != 0.0,
        _ => true,
    }
}

fn compare(op: &str, a: &ConstVariant, b: &ConstVariant) -> Result<bool, EvalError> {
    let (af, bf) = (numeric(a), numeric(b));
    let (af, bf) = match (af, bf) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(EvalError::Variant(VariantError::IncompatibleTypes {
                lhs: a.type_name(),
                rhs: b.type_name(),
            }))
        }
    };
    Ok(match op {
        "<" => af < bf,
        ">" => af > bf,
        "<=" => af <= bf,
        ">=" => af >= bf,
        _ => unreachable!(),
    })
}

fn numeric(v: &ConstVariant) -> Option<f64> {
    match v {
        ConstVariant::I64(i) => Some(*i as f64),
        ConstVariant::U64(u) => Some(*u as f64),
        ConstVariant::F64(f) | ConstVariant::LongDouble(f) => Some(*f),
        ConstVariant::Fixed(f) => Some(f.to_f64()),
        ConstVariant::Bool(b) => Some(*b as i64 as f64),
        ConstVariant::Char { value, .. } => Some(*value as f64),
        ConstVariant::Str { .. } => None,
    }
}

/// Small helper trait implemented on [`crate::token::IntLiteral`] so the
/// evaluator can pick signed vs. unsigned without duplicating suffix logic.
trait UnsignedHint {
    fn unsigned_hint(&self) -> bool;
}

impl UnsignedHint for crate::token::IntLiteral {
    fn unsigned_hint(&self) -> bool {
        self.suffix.unsigned
    }
}
