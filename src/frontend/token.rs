//! Token definitions for the C subset

use crate::types::{BinaryOp, AssignOp, DataType};
use crate::utils::Span;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn eof(span: Span) -> Self {
        Self { kind: TokenKind::Eof, span }
    }
}

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ============ Keywords ============
    /// int
    Int,
    /// float
    Float,
    /// char
    Char,
    /// void
    Void,
    /// if
    If,
    /// else
    Else,
    /// for
    For,
    /// while
    While,
    /// return
    Return,
    /// printf
    Printf,

    // ============ Identifiers and Literals ============
    /// Identifier (variable name, function name)
    Ident(String),
    /// Integer literal
    IntLit(i64),
    /// Floating-point literal
    FloatLit(f64),
    /// String literal
    StringLit(String),
    /// Character literal
    CharLit(u8),

    // ============ Operators ============
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// =
    Eq,
    /// ==
    EqEq,
    /// !=
    Ne,
    /// <
    Lt,
    /// <=
    Le,
    /// >
    Gt,
    /// >=
    Ge,
    /// !
    Not,
    /// ~
    Tilde,
    /// ++
    PlusPlus,
    /// --
    MinusMinus,
    /// +=
    PlusEq,
    /// -=
    MinusEq,
    /// *=
    StarEq,
    /// /=
    SlashEq,
    /// %=
    PercentEq,
    /// ?
    Question,
    /// :
    Colon,

    // ============ Delimiters ============
    /// (
    LParen,
    /// )
    RParen,
    /// {
    LBrace,
    /// }
    RBrace,
    /// ,
    Comma,
    /// ;
    Semicolon,

    // ============ Special ============
    /// End of file
    Eof,
    /// Unknown/invalid character
    Unknown(char),
}

impl TokenKind {
    /// Try to convert an identifier to a keyword
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        match s {
            "int" => Some(TokenKind::Int),
            "float" => Some(TokenKind::Float),
            "char" => Some(TokenKind::Char),
            "void" => Some(TokenKind::Void),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "for" => Some(TokenKind::For),
            "while" => Some(TokenKind::While),
            "return" => Some(TokenKind::Return),
            "printf" => Some(TokenKind::Printf),
            _ => None,
        }
    }

    /// Storage type named by a type-specifier keyword
    pub fn type_specifier(&self) -> Option<DataType> {
        match self {
            TokenKind::Int => Some(DataType::Int),
            TokenKind::Float => Some(DataType::Float),
            TokenKind::Char => Some(DataType::Char),
            TokenKind::Void => Some(DataType::Void),
            _ => None,
        }
    }

    /// Binding power and operator of a binary operator (for Pratt parsing).
    /// Returns None if not a binary operator.
    pub fn binary_op(&self) -> Option<(u8, BinaryOp)> {
        match self {
            // Equality (lowest)
            TokenKind::EqEq => Some((1, BinaryOp::Eq)),
            TokenKind::Ne => Some((1, BinaryOp::Ne)),

            // Comparison
            TokenKind::Lt => Some((2, BinaryOp::Lt)),
            TokenKind::Gt => Some((2, BinaryOp::Gt)),
            TokenKind::Le => Some((2, BinaryOp::Le)),
            TokenKind::Ge => Some((2, BinaryOp::Ge)),

            // Additive
            TokenKind::Plus => Some((3, BinaryOp::Add)),
            TokenKind::Minus => Some((3, BinaryOp::Sub)),

            // Multiplicative (highest for binary)
            TokenKind::Star => Some((4, BinaryOp::Mul)),
            TokenKind::Slash => Some((4, BinaryOp::Div)),
            TokenKind::Percent => Some((4, BinaryOp::Mod)),

            _ => None,
        }
    }

    pub fn assign_op(&self) -> Option<AssignOp> {
        match self {
            TokenKind::Eq => Some(AssignOp::Assign),
            TokenKind::PlusEq => Some(AssignOp::Add),
            TokenKind::MinusEq => Some(AssignOp::Sub),
            TokenKind::StarEq => Some(AssignOp::Mul),
            TokenKind::SlashEq => Some(AssignOp::Div),
            TokenKind::PercentEq => Some(AssignOp::Mod),
            _ => None,
        }
    }
}
