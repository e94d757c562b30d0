//! Lexical tokens produced by the lexer.
//!
//! A token carries its kind, the raw source text that produced it, a
//! decoded literal value where applicable, and a source location. Comment
//! tokens additionally retain their original style so they can be
//! re-emitted verbatim by the generators.

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A source location: file path, 1-based line, 1-based column, byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Span {
    /// Path of the file this span belongs to.
    pub file: Rc<PathBuf>,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number (one column per byte; tabs count as one column).
    pub column: usize,
    /// Byte offset into the file (start, inclusive).
    pub offset: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(file: Rc<PathBuf>, line: usize, column: usize, offset: usize) -> Self {
        Self {
            file,
            line,
            column,
            offset,
        }
    }

    /// A span used for synthesized tokens with no real source location.
    pub fn synthetic() -> Self {
        Self {
            file: Rc::new(PathBuf::from("<synthetic>")),
            line: 0,
            column: 0,
            offset: 0,
        }
    }

    /// Returns the path as a display-friendly string.
    pub fn path(&self) -> &Path {
        &self.file
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.file.display(), self.line, self.column)
    }
}

/// Character/string encoding prefix, per §3.1/§3.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CharEncoding {
    /// Default narrow byte (`char`/`string`/`octet`).
    Byte,
    /// `char16`/`u16string`.
    Utf16,
    /// `char32`/`u32string`.
    Utf32,
    /// `wchar`/`wstring`. Width is fixed to 32 bits: see DESIGN.md.
    Wide,
}

/// Integer literal suffix, recorded so the evaluator can pick the smallest
/// category that fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntSuffix {
    /// `u`/`U` suffix present.
    pub unsigned: bool,
    /// Number of `l`/`L` suffix characters (0, 1, or 2 for `ll`).
    pub long_count: u8,
}

/// A decoded integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntLiteral {
    /// The literal's value, always stored widened to 64 bits.
    pub value: u64,
    /// Whether the source token had a leading `-` folded in (never true;
    /// unary minus is a separate token: kept for documentation purposes).
    pub suffix: IntSuffix,
}

/// Floating literal suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FloatSuffix {
    /// No suffix: `double`.
    #[default]
    None,
    /// `f`/`F`: single precision.
    Float,
    /// `l`/`L`: `long double`.
    LongDouble,
    /// `d`/`D`: `fixed`, decimal-exact.
    Fixed,
}

/// A decoded floating-point literal.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FloatLiteral {
    /// The literal's value.
    pub value: f64,
    /// The suffix that selects the target category.
    pub suffix: FloatSuffix,
}

/// Decoded value carried by literal tokens.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TokenValue {
    /// Decoded integer literal.
    Int(IntLiteral),
    /// Decoded floating literal.
    Float(FloatLiteral),
    /// Decoded character literal; multi-character literals pack
    /// big-endian into `value` (`'DCBA'` = 0x44434241).
    Char { value: u32, encoding: CharEncoding },
    /// Decoded (and encoding-concatenated) string literal.
    Str { value: String, encoding: CharEncoding },
}

/// Comment rendering style, preserved so re-emission matches the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CommentStyle {
    /// `/* ... */`
    CBlock,
    /// `/** ... */`
    CBlockJavadoc,
    /// `/*! ... */`
    CBlockQt,
    /// `// ...`
    CppLine,
    /// `/// ...`
    CppLineJavadoc,
    /// `//! ...`
    CppLineQt,
}

/// Whether a comment attaches to the token before or after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CommentPosition {
    /// Comment precedes the next non-comment token on its own line(s).
    Leading,
    /// Comment follows the previous non-comment token on the same line.
    Trailing,
}

/// Preprocessor-meta directive captured verbatim by the lexer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MetaKind {
    /// `#include "file"`: quoted form, searched relative to the source file first.
    IncludeLocal(String),
    /// `#include <file>`: angle form, searched along `--include` paths only.
    IncludeSystem(String),
    /// `#define NAME [value]`.
    Define(String),
    /// `#undef NAME`.
    Undef(String),
    /// A `%{ ... %}` verbatim block, copied through to the definition file untouched.
    Verbatim(String),
}

/// The category of a lexical token.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TokenKind {
    /// `[A-Za-z_][A-Za-z0-9_]*`, or a keyword recognized by exact spelling.
    Identifier,
    /// A keyword (reserved identifier with dedicated meaning).
    Keyword(Keyword),
    /// An integer literal.
    IntLiteral(IntLiteral),
    /// A floating-point literal.
    FloatLiteral(FloatLiteral),
    /// A character literal.
    CharLiteral { value: u32, encoding: CharEncoding },
    /// A string literal (already concatenated with adjacent same-encoding literals).
    StringLiteral { value: String, encoding: CharEncoding },
    /// Punctuation or operator, stored as its exact spelling.
    Punct(&'static str),
    /// A preprocessor-meta directive.
    Meta(MetaKind),
    /// A comment, retained as a token (not stripped).
    Comment { text: String, style: CommentStyle, position: CommentPosition },
    /// End of file.
    Eof,
}

/// IDL keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Keyword {
    Module,
    Struct,
    Exception,
    Enum,
    Interface,
    Union,
    Switch,
    Case,
    Default,
    Typedef,
    Const,
    Local,
    Raises,
    Getraises,
    Setraises,
    In,
    Out,
    Inout,
    Readonly,
    Attribute,
    // Primitive type keywords
    Boolean,
    Char,
    Char16,
    Char32,
    Wchar,
    Octet,
    Short,
    Long,
    LongLong,
    UnsignedShort,
    UnsignedLong,
    UnsignedLongLong,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    Double,
    LongDouble,
    Fixed,
    String,
    U8string,
    U16string,
    U32string,
    Wstring,
    Sequence,
    Pointer,
    Any,
    Void,
}

impl Keyword {
    /// Attempts to classify an identifier-shaped lexeme as a keyword.
    pub fn from_str(s: &str) -> Option<Keyword> {
        use Keyword::*;
        Some(match s {
            "module" => Module,
            "struct" => Struct,
            "exception" => Exception,
            "enum" => Enum,
            "interface" => Interface,
            "union" => Union,
            "switch" => Switch,
            "case" => Case,
            "default" => Default,
            "typedef" => Typedef,
            "const" => Const,
            "local" => Local,
            "raises" => Raises,
            "getraises" => Getraises,
            "setraises" => Setraises,
            "in" => In,
            "out" => Out,
            "inout" => Inout,
            "readonly" => Readonly,
            "attribute" => Attribute,
            "boolean" => Boolean,
            "char" => Char,
            "char16" => Char16,
            "char32" => Char32,
            "wchar" => Wchar,
            "octet" => Octet,
            "short" => Short,
            "long" => Long,
            "unsigned" => return None, // handled as two-word combos by the lexer
            "float" => Float,
            "double" => Double,
            "fixed" => Fixed,
            "string" => String,
            "u8string" => U8string,
            "u16string" => U16string,
            "u32string" => U32string,
            "wstring" => Wstring,
            "sequence" => Sequence,
            "pointer" => Pointer,
            "any" => Any,
            "void" => Void,
            "int8" => Int8,
            "int16" => Int16,
            "int32" => Int32,
            "int64" => Int64,
            "uint8" => Uint8,
            "uint16" => Uint16,
            "uint32" => Uint32,
            "uint64" => Uint64,
            _ => return None,
        })
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Keyword::Module => "module",
            Keyword::Struct => "struct",
            Keyword::Exception => "exception",
            Keyword::Enum => "enum",
            Keyword::Interface => "interface",
            Keyword::Union => "union",
            Keyword::Switch => "switch",
            Keyword::Case => "case",
            Keyword::Default => "default",
            Keyword::Typedef => "typedef",
            Keyword::Const => "const",
            Keyword::Local => "local",
            Keyword::Raises => "raises",
            Keyword::Getraises => "getraises",
            Keyword::Setraises => "setraises",
            Keyword::In => "in",
            Keyword::Out => "out",
            Keyword::Inout => "inout",
            Keyword::Readonly => "readonly",
            Keyword::Attribute => "attribute",
            Keyword::Boolean => "boolean",
            Keyword::Char => "char",
            Keyword::Char16 => "char16",
            Keyword::Char32 => "char32",
            Keyword::Wchar => "wchar",
            Keyword::Octet => "octet",
            Keyword::Short => "short",
            Keyword::Long => "long",
            Keyword::LongLong => "long long",
            Keyword::UnsignedShort => "unsigned short",
            Keyword::UnsignedLong => "unsigned long",
            Keyword::UnsignedLongLong => "unsigned long long",
            Keyword::Int8 => "int8",
            Keyword::Int16 => "int16",
            Keyword::Int32 => "int32",
            Keyword::Int64 => "int64",
            Keyword::Uint8 => "uint8",
            Keyword::Uint16 => "uint16",
            Keyword::Uint32 => "uint32",
            Keyword::Uint64 => "uint64",
            Keyword::Float => "float",
            Keyword::Double => "double",
            Keyword::LongDouble => "long double",
            Keyword::Fixed => "fixed",
            Keyword::String => "string",
            Keyword::U8string => "u8string",
            Keyword::U16string => "u16string",
            Keyword::U32string => "u32string",
            Keyword::Wstring => "wstring",
            Keyword::Sequence => "sequence",
            Keyword::Pointer => "pointer",
            Keyword::Any => "any",
            Keyword::Void => "void",
        };
        write!(f, "{s}")
    }
}

/// A lexical token with its source location.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Token {
    /// The category of this token.
    pub kind: TokenKind,
    /// The exact source text that produced this token.
    pub lexeme: String,
    /// Source location of the first byte of the token.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    /// True for any token other than whitespace-adjacent comments/EOF.
    pub fn is_significant(&self) -> bool {
        !matches!(self.kind, TokenKind::Comment { .. } | TokenKind::Eof)
    }

    /// Returns the identifier text if this token is an identifier or keyword.
    pub fn ident_text(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier => Some(&self.lexeme),
            TokenKind::Keyword(_) => Some(&self.lexeme),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Keyword(k) => write!(f, "'{k}'"),
            TokenKind::IntLiteral(_) => write!(f, "integer literal"),
            TokenKind::FloatLiteral(_) => write!(f, "floating literal"),
            TokenKind::CharLiteral { .. } => write!(f, "character literal"),
            TokenKind::StringLiteral { .. } => write!(f, "string literal"),
            TokenKind::Punct(p) => write!(f, "'{p}'"),
            TokenKind::Meta(_) => write!(f, "preprocessor directive"),
            TokenKind::Comment { .. } => write!(f, "comment"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}
