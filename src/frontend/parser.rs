//! Parser for the C subset
//!
//! Recursive descent with Pratt parsing for binary operators. The parser
//! builds no tree of its own: every recognised rule is reported, bottom-up
//! and in source order, to a `ReductionSink`, which assembles the tree.

use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::semantic::dispatch::{Reduction, ReductionSink};
use crate::types::{DataType, UnaryOp};
use crate::utils::{Error, Result, Span};

/// What the last parsed expression looked like, as far as assignment cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExprShape {
    /// A bare identifier, which may be assigned to
    Identifier,
    Other,
}

/// The parser
pub struct Parser<'s, S: ReductionSink> {
    tokens: Vec<Token>,
    pos: usize,
    eof: Token,
    sink: &'s mut S,
}

impl<'s, S: ReductionSink> Parser<'s, S> {
    /// Create a new parser from a lexer, reporting into `sink`
    ///
    /// The whole input is tokenized up front, so malformed literals fail
    /// here before any reduction reaches the sink.
    pub fn new(mut lexer: Lexer, sink: &'s mut S) -> Result<Self> {
        let tokens = lexer.tokenize()?;
        let eof = tokens
            .last()
            .cloned()
            .unwrap_or_else(|| Token::eof(Default::default()));
        Ok(Self { tokens, pos: 0, eof, sink })
    }

    // ==================== Helper Methods ====================

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self) -> &TokenKind {
        self.tokens.get(self.pos + 1).map_or(&self.eof.kind, |t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("{:?}", expected)))
        }
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        match self.current_kind() {
            TokenKind::Unknown(ch) => Error::InvalidCharacter {
                ch: *ch,
                span: self.current().span,
            },
            got => Error::UnexpectedToken {
                expected: expected.to_string(),
                got: format!("{:?}", got),
                span: self.current().span,
            },
        }
    }

    /// Line of the most recently consumed token
    fn line(&self) -> u32 {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.span.line,
            None => self.current().span.line,
        }
    }

    fn emit(&mut self, reduction: Reduction) -> Result<()> {
        let line = self.line();
        self.sink.reduce(reduction, line)
    }

    fn parse_ident(&mut self) -> Result<String> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            TokenKind::Unknown(ch) => Err(Error::InvalidCharacter { ch, span: token.span }),
            _ => Err(Error::ExpectedIdent { span: token.span }),
        }
    }

    /// Consume a type keyword if one is next
    fn parse_type_specifier(&mut self) -> Option<DataType> {
        let ty = self.current_kind().type_specifier()?;
        self.advance();
        Some(ty)
    }

    // ==================== Declarations ====================

    /// Parse a complete translation unit and reduce it to the program root
    pub fn parse_program(&mut self) -> Result<()> {
        if self.is_at_end() {
            return Err(self.unexpected("declaration"));
        }

        self.parse_external()?;
        while !self.is_at_end() {
            self.parse_external()?;
            self.emit(Reduction::Sequence)?;
        }

        self.emit(Reduction::Program)
    }

    /// A function definition or a global declaration
    fn parse_external(&mut self) -> Result<()> {
        let ty = self.parse_type_specifier();
        if let Some(ty) = ty {
            self.emit(Reduction::TypeSpecifier(ty))?;
        }

        let name_span = self.current().span;
        let name = self.parse_ident()?;

        if self.check(&TokenKind::LParen) {
            return self.parse_function(name);
        }

        match ty {
            Some(ty) => self.parse_declaration_rest(ty, name, name_span),
            None => Err(self.unexpected("'('")),
        }
    }

    fn parse_function(&mut self, name: String) -> Result<()> {
        self.emit(Reduction::FunctionDeclarator { name })?;
        self.expect(TokenKind::LParen)?;
        self.emit(Reduction::OpenScope)?;
        self.parse_params()?;
        self.expect(TokenKind::RParen)?;

        // The parameter scope doubles as the body scope
        self.expect(TokenKind::LBrace)?;
        self.parse_block_items()?;
        self.expect(TokenKind::RBrace)?;

        self.emit(Reduction::FunctionDefinition)
    }

    fn parse_params(&mut self) -> Result<()> {
        if self.check(&TokenKind::RParen) {
            return Ok(());
        }
        if self.check(&TokenKind::Void) && matches!(self.peek_kind(), TokenKind::RParen) {
            self.advance();
            return Ok(());
        }

        loop {
            let Some(ty) = self.parse_type_specifier() else {
                return Err(self.unexpected("parameter type"));
            };
            let span = self.current().span;
            let name = self.parse_ident()?;
            if ty == DataType::Void {
                return Err(Error::VoidVariable { name, span });
            }
            self.emit(Reduction::Param { name, ty })?;

            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(())
    }

    /// Declarators after the type and first name, through the `;`
    fn parse_declaration_rest(
        &mut self,
        ty: DataType,
        first: String,
        first_span: Span,
    ) -> Result<()> {
        self.parse_declarator(ty, first, first_span)?;
        while self.consume(&TokenKind::Comma) {
            let span = self.current().span;
            let name = self.parse_ident()?;
            self.parse_declarator(ty, name, span)?;
            self.emit(Reduction::DeclaratorList)?;
        }
        self.expect(TokenKind::Semicolon)?;
        self.emit(Reduction::Declaration)
    }

    fn parse_declarator(
        &mut self,
        ty: DataType,
        name: String,
        span: Span,
    ) -> Result<()> {
        if ty == DataType::Void {
            return Err(Error::VoidVariable { name, span });
        }
        let init = self.consume(&TokenKind::Eq);
        if init {
            self.parse_assignment()?;
        }
        self.emit(Reduction::Declarator { name, init })
    }

    /// A declaration inside a block, starting at its type keyword
    fn parse_local_declaration(&mut self, ty: DataType) -> Result<()> {
        self.emit(Reduction::TypeSpecifier(ty))?;
        let span = self.current().span;
        let name = self.parse_ident()?;
        self.parse_declaration_rest(ty, name, span)
    }

    // ==================== Statements ====================

    /// Items between braces, folded left into one frame. Stops before `}`.
    fn parse_block_items(&mut self) -> Result<()> {
        if self.check(&TokenKind::RBrace) {
            return self.emit(Reduction::EmptyBlock);
        }

        self.parse_block_item()?;
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            self.parse_block_item()?;
            self.emit(Reduction::Sequence)?;
        }
        Ok(())
    }

    fn parse_block_item(&mut self) -> Result<()> {
        match self.parse_type_specifier() {
            Some(ty) => self.parse_local_declaration(ty),
            None => self.parse_stmt(),
        }
    }

    /// A nested `{ ... }` with its own scope
    fn parse_compound(&mut self) -> Result<()> {
        self.expect(TokenKind::LBrace)?;
        self.emit(Reduction::OpenScope)?;
        self.parse_block_items()?;
        self.expect(TokenKind::RBrace)?;
        self.emit(Reduction::CloseBlock)
    }

    fn parse_stmt(&mut self) -> Result<()> {
        match self.current_kind() {
            TokenKind::LBrace => self.parse_compound(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Printf => self.parse_print(),
            _ => self.parse_expr_stmt(),
        }
    }

    /// `expr ;` or a lone `;`
    fn parse_expr_stmt(&mut self) -> Result<()> {
        if self.consume(&TokenKind::Semicolon) {
            return self.emit(Reduction::EmptyStatement);
        }
        self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(())
    }

    fn parse_if(&mut self) -> Result<()> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        self.parse_stmt()?;

        let has_else = self.consume(&TokenKind::Else);
        if has_else {
            self.parse_stmt()?;
        }
        self.emit(Reduction::If { has_else })
    }

    fn parse_while(&mut self) -> Result<()> {
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        self.parse_stmt()?;
        self.emit(Reduction::While)
    }

    fn parse_for(&mut self) -> Result<()> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;
        self.parse_expr_stmt()?;
        self.parse_expr_stmt()?;
        if self.check(&TokenKind::RParen) {
            self.emit(Reduction::EmptyStatement)?;
        } else {
            self.parse_expr()?;
        }
        self.expect(TokenKind::RParen)?;
        self.parse_stmt()?;
        self.emit(Reduction::For)
    }

    fn parse_return(&mut self) -> Result<()> {
        self.expect(TokenKind::Return)?;
        let has_value = !self.check(&TokenKind::Semicolon);
        if has_value {
            self.parse_expr()?;
        }
        self.expect(TokenKind::Semicolon)?;
        self.emit(Reduction::Return { has_value })
    }

    fn parse_print(&mut self) -> Result<()> {
        self.expect(TokenKind::Printf)?;
        self.expect(TokenKind::LParen)?;
        self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Semicolon)?;
        self.emit(Reduction::Print)
    }

    // ==================== Expression Parsing ====================

    /// Comma expression
    fn parse_expr(&mut self) -> Result<ExprShape> {
        let mut shape = self.parse_assignment()?;
        while self.consume(&TokenKind::Comma) {
            self.parse_assignment()?;
            self.emit(Reduction::Comma)?;
            shape = ExprShape::Other;
        }
        Ok(shape)
    }

    /// Right-associative assignment
    fn parse_assignment(&mut self) -> Result<ExprShape> {
        let target_span = self.current().span;
        let shape = self.parse_ternary()?;

        let Some(op) = self.current_kind().assign_op() else {
            return Ok(shape);
        };
        if shape != ExprShape::Identifier {
            return Err(Error::InvalidAssignmentTarget { span: target_span });
        }

        self.advance();
        self.parse_assignment()?;
        self.emit(Reduction::Assign(op))?;
        Ok(ExprShape::Other)
    }

    fn parse_ternary(&mut self) -> Result<ExprShape> {
        let shape = self.parse_binary(0)?;
        if !self.consume(&TokenKind::Question) {
            return Ok(shape);
        }

        self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        self.parse_ternary()?;
        self.emit(Reduction::Ternary)?;
        Ok(ExprShape::Other)
    }

    /// Parse binary operators with binding power (Pratt parsing)
    fn parse_binary(&mut self, min_bp: u8) -> Result<ExprShape> {
        let mut shape = self.parse_unary()?;

        loop {
            let Some((bp, op)) = self.current_kind().binary_op() else {
                break;
            };
            if bp < min_bp {
                break;
            }

            self.advance();
            // Left-associative
            self.parse_binary(bp + 1)?;
            self.emit(Reduction::Binary(op))?;
            shape = ExprShape::Other;
        }

        Ok(shape)
    }

    fn parse_unary(&mut self) -> Result<ExprShape> {
        let op = match self.current_kind() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::PlusPlus => UnaryOp::PreInc,
            TokenKind::MinusMinus => UnaryOp::PreDec,
            _ => return self.parse_postfix(),
        };

        self.advance();
        self.parse_unary()?;
        self.emit(Reduction::Unary(op))?;
        Ok(ExprShape::Other)
    }

    fn parse_postfix(&mut self) -> Result<ExprShape> {
        let mut shape = self.parse_primary()?;

        loop {
            let op = match self.current_kind() {
                TokenKind::PlusPlus => UnaryOp::PostInc,
                TokenKind::MinusMinus => UnaryOp::PostDec,
                _ => break,
            };
            self.advance();
            self.emit(Reduction::Unary(op))?;
            shape = ExprShape::Other;
        }

        Ok(shape)
    }

    fn parse_primary(&mut self) -> Result<ExprShape> {
        let token = self.current().clone();

        match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                if !self.consume(&TokenKind::LParen) {
                    self.emit(Reduction::Identifier(name))?;
                    return Ok(ExprShape::Identifier);
                }

                let has_args = !self.check(&TokenKind::RParen);
                if has_args {
                    self.parse_expr()?;
                }
                self.expect(TokenKind::RParen)?;
                self.emit(Reduction::Call { name, has_args })?;
                Ok(ExprShape::Other)
            }
            TokenKind::IntLit(value) => {
                self.advance();
                self.emit(Reduction::IntLiteral(value))?;
                Ok(ExprShape::Other)
            }
            TokenKind::FloatLit(value) => {
                self.advance();
                self.emit(Reduction::FloatLiteral(value))?;
                Ok(ExprShape::Other)
            }
            TokenKind::CharLit(c) => {
                self.advance();
                self.emit(Reduction::CharLiteral(c))?;
                Ok(ExprShape::Other)
            }
            TokenKind::StringLit(s) => {
                self.advance();
                self.emit(Reduction::StringLiteral(s))?;
                Ok(ExprShape::Other)
            }
            TokenKind::LParen => {
                self.advance();
                self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(ExprShape::Other)
            }
            TokenKind::Unknown(ch) => Err(Error::InvalidCharacter { ch, span: token.span }),
            _ => Err(Error::ExpectedExpr { span: token.span }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssignOp, BinaryOp};
    use pretty_assertions::assert_eq;

    /// Sink that only records what it is told
    #[derive(Default)]
    struct Recorder {
        steps: Vec<(Reduction, u32)>,
    }

    impl ReductionSink for Recorder {
        fn reduce(&mut self, reduction: Reduction, line: u32) -> Result<()> {
            self.steps.push((reduction, line));
            Ok(())
        }
    }

    fn parse(source: &str) -> Result<Vec<Reduction>> {
        let mut recorder = Recorder::default();
        Parser::new(Lexer::new(source), &mut recorder)?.parse_program()?;
        Ok(recorder.steps.into_iter().map(|(r, _)| r).collect())
    }

    #[test]
    fn test_function_reduction_order() {
        let steps = parse("int main() { int a = 1; return a; }").unwrap();
        assert_eq!(
            steps,
            vec![
                Reduction::TypeSpecifier(DataType::Int),
                Reduction::FunctionDeclarator { name: "main".into() },
                Reduction::OpenScope,
                Reduction::TypeSpecifier(DataType::Int),
                Reduction::IntLiteral(1),
                Reduction::Declarator { name: "a".into(), init: true },
                Reduction::Declaration,
                Reduction::Identifier("a".into()),
                Reduction::Return { has_value: true },
                Reduction::Sequence,
                Reduction::FunctionDefinition,
                Reduction::Program,
            ]
        );
    }

    #[test]
    fn test_precedence_and_associativity() {
        let steps = parse("void f() { x = y = 1 + 2 * 3 - 4; }").unwrap();
        assert_eq!(
            &steps[3..13],
            &[
                Reduction::Identifier("x".into()),
                Reduction::Identifier("y".into()),
                Reduction::IntLiteral(1),
                Reduction::IntLiteral(2),
                Reduction::IntLiteral(3),
                Reduction::Binary(BinaryOp::Mul),
                Reduction::Binary(BinaryOp::Add),
                Reduction::IntLiteral(4),
                Reduction::Binary(BinaryOp::Sub),
                Reduction::Assign(AssignOp::Assign),
            ]
        );
        assert_eq!(steps[13], Reduction::Assign(AssignOp::Assign));
    }

    #[test]
    fn test_nested_block_opens_scope() {
        let steps = parse("int main() { { ; } }").unwrap();
        assert_eq!(
            &steps[3..6],
            &[Reduction::OpenScope, Reduction::EmptyStatement, Reduction::CloseBlock]
        );
    }

    #[test]
    fn test_for_with_empty_slots() {
        let steps = parse("int main() { for (;;) ; }").unwrap();
        assert_eq!(
            &steps[3..8],
            &[
                Reduction::EmptyStatement,
                Reduction::EmptyStatement,
                Reduction::EmptyStatement,
                Reduction::EmptyStatement,
                Reduction::For,
            ]
        );
    }

    #[test]
    fn test_params_and_missing_return_type() {
        let steps = parse("f(int a, float b) {}").unwrap();
        assert_eq!(
            steps,
            vec![
                Reduction::FunctionDeclarator { name: "f".into() },
                Reduction::OpenScope,
                Reduction::Param { name: "a".into(), ty: DataType::Int },
                Reduction::Param { name: "b".into(), ty: DataType::Float },
                Reduction::EmptyBlock,
                Reduction::FunctionDefinition,
                Reduction::Program,
            ]
        );
    }

    #[test]
    fn test_postfix_and_call() {
        let steps = parse("int main() { i++; g(); h(1, 2); }").unwrap();
        assert!(steps.contains(&Reduction::Unary(UnaryOp::PostInc)));
        assert!(steps.contains(&Reduction::Call { name: "g".into(), has_args: false }));
        assert!(steps.contains(&Reduction::Call { name: "h".into(), has_args: true }));
        assert!(steps.contains(&Reduction::Comma));
    }

    #[test]
    fn test_lines_follow_tokens() {
        let mut recorder = Recorder::default();
        Parser::new(Lexer::new("int main()\n{\n  x = 1;\n}\n"), &mut recorder)
            .unwrap()
            .parse_program()
            .unwrap();
        let assign = recorder
            .steps
            .iter()
            .find(|(r, _)| *r == Reduction::Assign(AssignOp::Assign))
            .unwrap();
        assert_eq!(assign.1, 3);
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse("int main() { 1 = 2; }").unwrap_err();
        assert!(matches!(err, Error::InvalidAssignmentTarget { .. }));
    }

    #[test]
    fn test_void_variable_rejected() {
        let err = parse("int main() { void v; }").unwrap_err();
        assert!(matches!(err, Error::VoidVariable { ref name, .. } if name == "v"));
    }

    #[test]
    fn test_unknown_character() {
        let err = parse("int main() { a = @; }").unwrap_err();
        assert!(matches!(err, Error::InvalidCharacter { ch: '@', .. }));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(matches!(parse("").unwrap_err(), Error::UnexpectedToken { .. }));
    }
}
