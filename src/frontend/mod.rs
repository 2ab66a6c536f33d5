//! Frontend module - Lexer and reduction-driving parser

pub mod token;
pub mod lexer;
pub mod parser;
