//! The lexer (component L): turns IDL source text into a token vector.
//!
//! Hand-rolled rather than built on `logos`: a
//! `Lexer<'a>` walks the source as a byte/char cursor, tracking line and
//! column, and pushes tokens (including comments and `%{ ... %}` verbatim
//! blocks) one at a time. Errors are collected rather than aborting the
//! scan, so a single file can report more than one lexical problem.

use std::path::PathBuf;
use std::rc::Rc;

use crate::token::{
    CharEncoding, CommentPosition, CommentStyle, FloatLiteral, FloatSuffix, IntLiteral, IntSuffix, Keyword, MetaKind,
    Span, Token, TokenKind,
};

/// A lexical error with its location.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{span}: {message}")]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// The lexer. Construct with [`Lexer::new`], then call [`Lexer::tokenize`].
pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<char>,
    file: Rc<PathBuf>,
    pos: usize,
    line: usize,
    column: usize,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `source`, attributing spans to `file`.
    pub fn new(source: &'a str, file: PathBuf) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            file: Rc::new(file),
            pos: 0,
            line: 1,
            column: 1,
            errors: Vec::new(),
        }
    }

    /// Runs the lexer to completion, returning the token vector (always
    /// terminated by an `Eof` token) and any errors collected along the way.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexError>) {
        let mut tokens = Vec::new();
        let mut pending_leading: Vec<Token> = Vec::new();
        loop {
            self.skip_inline_whitespace();
            if self.is_eof() {
                break;
            }
            let start_line = self.line;
            let span = self.current_span();
            match self.scan_one() {
                Some(tok) => {
                    if matches!(tok.kind, TokenKind::Comment { position: CommentPosition::Trailing, .. })
                        && tokens.iter().rev().any(|t: &Token| !matches!(t.kind, TokenKind::Comment { .. }))
                        && start_line == tokens.last().map(|t| t.span.line).unwrap_or(0)
                    {
                        tokens.push(tok);
                    } else if matches!(tok.kind, TokenKind::Comment { .. }) {
                        pending_leading.push(tok);
                    } else {
                        tokens.extend(pending_leading.drain(..));
                        tokens.push(tok);
                    }
                }
                None => {
                    if self.pos == self.char_pos_for(&span) {
                        // scan_one reported an error but did not advance; force progress.
                        self.bump();
                    }
                }
            }
        }
        tokens.extend(pending_leading.drain(..));
        tokens.push(Token::new(TokenKind::Eof, "", self.current_span()));
        (tokens, self.errors)
    }

    fn char_pos_for(&self, span: &Span) -> usize {
        span.offset
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn current_span(&self) -> Span {
        Span::new(self.file.clone(), self.line, self.column, self.pos)
    }

    fn skip_inline_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.errors.push(LexError {
            message: message.into(),
            span,
        });
    }

    fn scan_one(&mut self) -> Option<Token> {
        let span = self.current_span();
        let c = self.peek_char()?;

        if c == '/' && self.peek_at(1) == Some('/') {
            return Some(self.scan_line_comment(span));
        }
        if c == '/' && self.peek_at(1) == Some('*') {
            return Some(self.scan_block_comment(span));
        }
        if c == '%' && self.peek_at(1) == Some('{') {
            return Some(self.scan_verbatim_block(span));
        }
        if c == '#' {
            return self.scan_meta(span);
        }
        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit())) {
            return Some(self.scan_number(span));
        }
        if c == '"' {
            return Some(self.scan_string(span, CharEncoding::Byte));
        }
        if c == '\'' {
            return Some(self.scan_char(span, CharEncoding::Byte));
        }
        if c.is_alphabetic() || c == '_' {
            return Some(self.scan_identifier_or_literal_prefix(span));
        }
        Some(self.scan_punct(span))
    }

    fn scan_line_comment(&mut self, span: Span) -> Token {
        self.bump();
        self.bump();
        let style = match self.peek_char() {
            Some('/') if self.peek_at(1) != Some('/') => {
                self.bump();
                CommentStyle::CppLineJavadoc
            }
            Some('!') => {
                self.bump();
                CommentStyle::CppLineQt
            }
            _ => CommentStyle::CppLine,
        };
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.bump();
        }
        Token::new(
            TokenKind::Comment {
                text: text.trim().to_string(),
                style,
                position: CommentPosition::Leading,
            },
            format!("//{text}"),
            span,
        )
    }

    fn scan_block_comment(&mut self, span: Span) -> Token {
        self.bump();
        self.bump();
        let style = match self.peek_char() {
            Some('*') if self.peek_at(1) != Some('/') => {
                self.bump();
                CommentStyle::CBlockJavadoc
            }
            Some('!') => {
                self.bump();
                CommentStyle::CBlockQt
            }
            _ => CommentStyle::CBlock,
        };
        let mut text = String::new();
        loop {
            match self.peek_char() {
                None => {
                    self.error(span.clone(), "unterminated block comment");
                    break;
                }
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    break;
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
        Token::new(
            TokenKind::Comment {
                text: text.trim().to_string(),
                style,
                position: CommentPosition::Leading,
            },
            format!("/*{text}*/"),
            span,
        )
    }

    /// `%{ ... %}` verbatim passthrough, copied through unmodified by G1.
    fn scan_verbatim_block(&mut self, span: Span) -> Token {
        self.bump();
        self.bump();
        let mut text = String::new();
        loop {
            match self.peek_char() {
                None => {
                    self.error(span.clone(), "unterminated verbatim block, expected %}");
                    break;
                }
                Some('%') if self.peek_at(1) == Some('}') => {
                    self.bump();
                    self.bump();
                    break;
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
        Token::new(TokenKind::Meta(MetaKind::Verbatim(text.clone())), format!("%{{{text}%}}"), span)
    }

    fn scan_meta(&mut self, span: Span) -> Option<Token> {
        self.bump();
        self.skip_inline_whitespace();
        let mut directive = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() {
                directive.push(c);
                self.bump();
            } else {
                break;
            }
        }
        self.skip_inline_whitespace();
        let mut rest = String::new();
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            rest.push(c);
            self.bump();
        }
        let rest = rest.trim().to_string();
        let kind = match directive.as_str() {
            "include" => {
                if let Some(inner) = rest.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
                    MetaKind::IncludeLocal(inner.to_string())
                } else if let Some(inner) = rest.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                    MetaKind::IncludeSystem(inner.to_string())
                } else {
                    self.error(span.clone(), "malformed #include directive");
                    return None;
                }
            }
            "define" => MetaKind::Define(rest),
            "undef" => MetaKind::Undef(rest),
            other => {
                self.error(span.clone(), format!("unknown preprocessor directive '#{other}'"));
                return None;
            }
        };
        Some(Token::new(TokenKind::Meta(kind), format!("#{directive} {rest}"), span))
    }

    fn scan_identifier_or_literal_prefix(&mut self, span: Span) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }

        // Encoding-prefixed char/string literals: L'x', u8"s", u16"s", u32"s".
        match (text.as_str(), self.peek_char()) {
            ("L", Some('\'')) => return self.scan_char(span, CharEncoding::Wide),
            ("L", Some('"')) => return self.scan_string(span, CharEncoding::Wide),
            ("u8", Some('"')) => return self.scan_string(span, CharEncoding::Byte),
            ("u", Some('\'')) => return self.scan_char(span, CharEncoding::Utf16),
            ("u", Some('"')) => return self.scan_string(span, CharEncoding::Utf16),
            ("U", Some('\'')) => return self.scan_char(span, CharEncoding::Utf32),
            ("U", Some('"')) => return self.scan_string(span, CharEncoding::Utf32),
            ("u16", Some('\'')) => return self.scan_char(span, CharEncoding::Utf16),
            ("u16", Some('"')) => return self.scan_string(span, CharEncoding::Utf16),
            ("u32", Some('\'')) => return self.scan_char(span, CharEncoding::Utf32),
            ("u32", Some('"')) => return self.scan_string(span, CharEncoding::Utf32),
            _ => {}
        }

        // `unsigned short` / `unsigned long` / `unsigned long long` / `long long` / `long double`.
        if text == "unsigned" || text == "long" {
            let save = (self.pos, self.line, self.column);
            self.skip_inline_whitespace();
            let mut next = String::new();
            while let Some(c) = self.peek_char() {
                if c.is_alphanumeric() || c == '_' {
                    next.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            let combo = match (text.as_str(), next.as_str()) {
                ("unsigned", "short") => Some(Keyword::UnsignedShort),
                ("unsigned", "long") => {
                    let save2 = (self.pos, self.line, self.column);
                    self.skip_inline_whitespace();
                    let mut third = String::new();
                    while let Some(c) = self.peek_char() {
                        if c.is_alphanumeric() || c == '_' {
                            third.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    if third == "long" {
                        Some(Keyword::UnsignedLongLong)
                    } else {
                        (self.pos, self.line, self.column) = save2;
                        Some(Keyword::UnsignedLong)
                    }
                }
                ("long", "long") => Some(Keyword::LongLong),
                ("long", "double") => Some(Keyword::LongDouble),
                _ => None,
            };
            if let Some(kw) = combo {
                let lexeme = format!("{kw}");
                return Token::new(TokenKind::Keyword(kw), lexeme, span);
            }
            (self.pos, self.line, self.column) = save;
        }

        match Keyword::from_str(&text) {
            Some(kw) => Token::new(TokenKind::Keyword(kw), text, span),
            None => Token::new(TokenKind::Identifier, text, span),
        }
    }

    fn scan_number(&mut self, span: Span) -> Token {
        let start = self.pos;
        let mut is_float = false;
        let mut is_hex = false;
        let mut is_binary = false;

        if self.peek_char() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            is_hex = true;
            self.bump();
            self.bump();
            while self.peek_char().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
        } else if self.peek_char() == Some('0') && matches!(self.peek_at(1), Some('b') | Some('B')) {
            is_binary = true;
            self.bump();
            self.bump();
            while matches!(self.peek_char(), Some('0') | Some('1')) {
                self.bump();
            }
        } else {
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
            if self.peek_char() == Some('.') {
                is_float = true;
                self.bump();
                while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
            if matches!(self.peek_char(), Some('e') | Some('E')) {
                is_float = true;
                self.bump();
                if matches!(self.peek_char(), Some('+') | Some('-')) {
                    self.bump();
                }
                while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }

        let digits_end = self.pos;
        let text: String = self.chars[start..digits_end].iter().collect();

        if is_float {
            let suffix = match self.peek_char() {
                Some('f') | Some('F') => {
                    self.bump();
                    FloatSuffix::Float
                }
                Some('l') | Some('L') => {
                    self.bump();
                    FloatSuffix::LongDouble
                }
                Some('d') | Some('D') => {
                    self.bump();
                    FloatSuffix::Fixed
                }
                _ => FloatSuffix::None,
            };
            let value: f64 = text.parse().unwrap_or(0.0);
            let lexeme: String = self.chars[start..self.pos].iter().collect();
            return Token::new(TokenKind::FloatLiteral(FloatLiteral { value, suffix }), lexeme, span);
        }

        let mut suffix = IntSuffix::default();
        loop {
            match self.peek_char() {
                Some('u') | Some('U') if !suffix.unsigned => {
                    suffix.unsigned = true;
                    self.bump();
                }
                Some('l') | Some('L') if suffix.long_count < 2 => {
                    suffix.long_count += 1;
                    self.bump();
                }
                _ => break,
            }
        }
        // A leading `0` followed by more digits is octal, per §4.1; a lone
        // `0` stays decimal (and parses the same under either radix).
        let is_octal = !is_hex && !is_binary && text.len() > 1 && text.starts_with('0');
        let radix = if is_hex {
            16
        } else if is_binary {
            2
        } else if is_octal {
            8
        } else {
            10
        };
        let digits = if is_hex || is_binary {
            &text[2..]
        } else if is_octal {
            &text[1..]
        } else {
            text.as_str()
        };
        let value = u64::from_str_radix(digits, radix).unwrap_or_else(|_| {
            self.error(span.clone(), format!("integer literal '{text}' out of range"));
            0
        });
        let lexeme: String = self.chars[start..self.pos].iter().collect();
        Token::new(TokenKind::IntLiteral(IntLiteral { value, suffix }), lexeme, span)
    }

    fn scan_string(&mut self, span: Span, encoding: CharEncoding) -> Token {
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek_char() {
                None => {
                    self.error(span.clone(), "unterminated string literal");
                    break;
                }
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    value.push(self.scan_escape(&span));
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
        let lexeme = format!("\"{value}\"");
        Token::new(TokenKind::StringLiteral { value, encoding }, lexeme, span)
    }

    fn scan_char(&mut self, span: Span, encoding: CharEncoding) -> Token {
        self.bump();
        let mut codepoints = Vec::new();
        loop {
            match self.peek_char() {
                None => {
                    self.error(span.clone(), "unterminated character literal");
                    break;
                }
                Some('\'') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    codepoints.push(self.scan_escape(&span) as u32);
                }
                Some(c) => {
                    codepoints.push(c as u32);
                    self.bump();
                }
            }
        }
        // Multi-character literals pack big-endian, matching `'ABCD'` C semantics.
        let value = codepoints.iter().fold(0u32, |acc, &c| acc.wrapping_shl(8).wrapping_add(c & 0xFF));
        let value = if codepoints.len() == 1 { codepoints[0] } else { value };
        Token::new(TokenKind::CharLiteral { value, encoding }, "", span)
    }

    fn scan_escape(&mut self, span: &Span) -> char {
        match self.bump() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some('\\') => '\\',
            Some('\'') => '\'',
            Some('"') => '"',
            Some('x') => {
                let mut hex = String::new();
                while self.peek_char().is_some_and(|c| c.is_ascii_hexdigit()) {
                    hex.push(self.bump().unwrap());
                }
                u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32).unwrap_or('\u{fffd}')
            }
            Some(other) => {
                self.error(span.clone(), format!("unknown escape sequence '\\{other}'"));
                other
            }
            None => {
                self.error(span.clone(), "unterminated escape sequence");
                '\0'
            }
        }
    }

    const PUNCTS_3: &'static [&'static str] = &["<<=", ">>="];
    const PUNCTS_2: &'static [&'static str] = &["::", "<<", ">>", "&&", "||", "==", "!=", "<=", ">="];

    fn scan_punct(&mut self, span: Span) -> Token {
        let c0 = self.bump().unwrap();
        let c1 = self.peek_char();
        let c2 = self.peek_at(1);

        for p in Self::PUNCTS_3 {
            let mut it = p.chars();
            if Some(it.next().unwrap()) == Some(c0) && it.next() == c1 && it.next() == c2 {
                self.bump();
                self.bump();
                return Token::new(TokenKind::Punct(p), *p, span);
            }
        }
        for p in Self::PUNCTS_2 {
            let mut it = p.chars();
            if Some(it.next().unwrap()) == Some(c0) && it.next() == c1 {
                self.bump();
                return Token::new(TokenKind::Punct(p), *p, span);
            }
        }
        const SINGLE: &[&str] = &[
            "{", "}", "(", ")", "[", "]", ";", ":", ",", ".", "=", "<", ">", "+", "-", "*", "/", "%", "&", "|", "^",
            "!", "~", "?",
        ];
        for p in SINGLE {
            if p.chars().next() == Some(c0) {
                return Token::new(TokenKind::Punct(p), *p, span);
            }
        }
        self.error(span.clone(), format!("unexpected character '{c0}'"));
        Token::new(TokenKind::Punct("?"), c0.to_string(), span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        let (tokens, errors) = Lexer::new(src, PathBuf::from("t.idl")).tokenize();
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens
    }

    #[test]
    fn lexes_a_simple_interface() {
        let tokens = lex("interface Foo { void bar(); };");
        let kinds: Vec<_> = tokens.iter().map(|t| &t.kind).collect();
        assert!(matches!(kinds[0], TokenKind::Keyword(Keyword::Interface)));
        assert!(matches!(kinds[1], TokenKind::Identifier));
        assert!(matches!(kinds.last().unwrap(), TokenKind::Eof));
    }

    #[test]
    fn combines_unsigned_long_long() {
        let tokens = lex("unsigned long long x;");
        assert!(matches!(tokens[0].kind, TokenKind::Keyword(Keyword::UnsignedLongLong)));
    }

    #[test]
    fn combines_long_double() {
        let tokens = lex("long double x;");
        assert!(matches!(tokens[0].kind, TokenKind::Keyword(Keyword::LongDouble)));
    }

    #[test]
    fn lone_long_is_not_consumed_by_combo_lookahead() {
        let tokens = lex("long x;");
        assert!(matches!(tokens[0].kind, TokenKind::Keyword(Keyword::Long)));
        assert!(matches!(tokens[1].kind, TokenKind::Identifier));
    }

    #[test]
    fn hex_integer_literal() {
        let tokens = lex("0xFF");
        match &tokens[0].kind {
            TokenKind::IntLiteral(lit) => assert_eq!(lit.value, 255),
            other => panic!("expected int literal, got {other:?}"),
        }
    }

    #[test]
    fn octal_integer_literal() {
        let tokens = lex("010");
        match &tokens[0].kind {
            TokenKind::IntLiteral(lit) => assert_eq!(lit.value, 8),
            other => panic!("expected int literal, got {other:?}"),
        }
    }

    #[test]
    fn binary_integer_literal() {
        let tokens = lex("0b101");
        match &tokens[0].kind {
            TokenKind::IntLiteral(lit) => assert_eq!(lit.value, 5),
            other => panic!("expected int literal, got {other:?}"),
        }
    }

    #[test]
    fn lone_zero_is_still_decimal_zero() {
        let tokens = lex("0");
        match &tokens[0].kind {
            TokenKind::IntLiteral(lit) => assert_eq!(lit.value, 0),
            other => panic!("expected int literal, got {other:?}"),
        }
    }

    #[test]
    fn float_literal_with_suffix() {
        let tokens = lex("3.14f");
        match &tokens[0].kind {
            TokenKind::FloatLiteral(lit) => {
                assert!((lit.value - 3.14).abs() < 1e-9);
                assert_eq!(lit.suffix, FloatSuffix::Float);
            }
            other => panic!("expected float literal, got {other:?}"),
        }
    }

    #[test]
    fn multi_char_literal_packs_big_endian() {
        let tokens = lex("'AB'");
        match &tokens[0].kind {
            TokenKind::CharLiteral { value, .. } => assert_eq!(*value, 0x4142),
            other => panic!("expected char literal, got {other:?}"),
        }
    }

    #[test]
    fn bare_u_prefix_is_a_utf16_char_literal() {
        let tokens = lex("u'x'");
        match &tokens[0].kind {
            TokenKind::CharLiteral { encoding, .. } => assert_eq!(*encoding, CharEncoding::Utf16),
            other => panic!("expected char literal, got {other:?}"),
        }
    }

    #[test]
    fn bare_capital_u_prefix_is_a_utf32_char_literal() {
        let tokens = lex("U'x'");
        match &tokens[0].kind {
            TokenKind::CharLiteral { encoding, .. } => assert_eq!(*encoding, CharEncoding::Utf32),
            other => panic!("expected char literal, got {other:?}"),
        }
    }

    #[test]
    fn string_literal_decodes_escapes() {
        let tokens = lex(r#""a\nb""#);
        match &tokens[0].kind {
            TokenKind::StringLiteral { value, .. } => assert_eq!(value, "a\nb"),
            other => panic!("expected string literal, got {other:?}"),
        }
    }

    #[test]
    fn verbatim_block_is_captured_whole() {
        let tokens = lex("%{ raw text %}");
        match &tokens[0].kind {
            TokenKind::Meta(MetaKind::Verbatim(text)) => assert_eq!(text.trim(), "raw text"),
            other => panic!("expected verbatim meta, got {other:?}"),
        }
    }

    #[test]
    fn include_directive_distinguishes_local_and_system() {
        let tokens = lex("#include \"a.idl\"\n#include <b.idl>\n");
        assert!(matches!(&tokens[0].kind, TokenKind::Meta(MetaKind::IncludeLocal(p)) if p == "a.idl"));
        assert!(matches!(&tokens[1].kind, TokenKind::Meta(MetaKind::IncludeSystem(p)) if p == "b.idl"));
    }

    #[test]
    fn unterminated_block_comment_reports_error() {
        let (_, errors) = Lexer::new("/* never closes", PathBuf::from("t.idl")).tokenize();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn javadoc_and_qt_comment_styles_are_distinguished() {
        let tokens = lex("/** doc */ /*! qt */ // line\n");
        let styles: Vec<_> = tokens
            .iter()
            .filter_map(|t| match &t.kind {
                TokenKind::Comment { style, .. } => Some(*style),
                _ => None,
            })
            .collect();
        assert_eq!(styles, vec![CommentStyle::CBlockJavadoc, CommentStyle::CBlockQt, CommentStyle::CppLine]);
    }
}
