//! Reduction dispatcher
//!
//! The driver reports every grammar reduction, in grammar order, through
//! `ReductionSink::reduce`. For a rule of arity k the dispatcher pops exactly
//! k subtrees from the assembly stack, types and folds them, and pushes one
//! combined node. Symbol-table effects (declarations, scope changes) happen
//! at the same moment, so a reduction always sees the bindings that were
//! visible at that point in the source.

use log::debug;

use crate::semantic::ast::{Ast, AstNode, FunctionSig, NodeId, NodeKind, Param};
use crate::semantic::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::semantic::stack::AssemblyStack;
use crate::semantic::symbols::{Declaration, SymbolRole, SymbolTable};
use crate::types::{
    coerce_assignment, conversion_issue, fold_binary, fold_unary, step, AssignOp, BinaryOp,
    DataType, Operand, TypeIssue, UnaryOp, Value,
};
use crate::utils::{Error, Result};

/// One grammar reduction, with the payload the driver has for it
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    // ==================== Leaves ====================
    IntLiteral(i64),
    FloatLiteral(f64),
    CharLiteral(u8),
    StringLiteral(String),
    /// Identifier used as an operand
    Identifier(String),

    // ==================== Declarations ====================
    /// `int` / `float` / `char` / `void` ahead of a declaration
    TypeSpecifier(DataType),
    /// `name` or `name = init` inside a declaration (init: pops 1)
    Declarator { name: String, init: bool },
    /// `a, b` inside a declaration (pops 2)
    DeclaratorList,
    /// End of a declaration statement
    Declaration,

    // ==================== Expressions ====================
    Assign(AssignOp),
    Binary(BinaryOp),
    Unary(UnaryOp),
    /// `c ? a : b` (pops 3)
    Ternary,
    /// `a, b` in an expression (pops 2)
    Comma,
    /// `name(...)`, popping the argument list when present
    Call { name: String, has_args: bool },

    // ==================== Statements ====================
    EmptyStatement,
    EmptyBlock,
    /// `{` of a nested block, `(` of a function's parameter list
    OpenScope,
    /// A nested compound statement has been reduced to a statement
    CloseBlock,
    If { has_else: bool },
    While,
    For,
    Return { has_value: bool },
    Print,
    /// Two consecutive statements or external declarations (pops 2)
    Sequence,

    // ==================== Functions ====================
    /// Function name, before its parameter list
    FunctionDeclarator { name: String },
    Param { name: String, ty: DataType },
    /// Function body complete (pops 1)
    FunctionDefinition,

    /// Start symbol: the single remaining frame becomes the root
    Program,
}

impl Reduction {
    /// Rule label used in logs and internal errors
    pub fn rule(&self) -> &'static str {
        match self {
            Self::IntLiteral(_) => "int-literal",
            Self::FloatLiteral(_) => "float-literal",
            Self::CharLiteral(_) => "char-literal",
            Self::StringLiteral(_) => "string-literal",
            Self::Identifier(_) => "identifier",
            Self::TypeSpecifier(_) => "type-specifier",
            Self::Declarator { .. } => "declarator",
            Self::DeclaratorList => "declarator-list",
            Self::Declaration => "declaration",
            Self::Assign(op) => op.symbol(),
            Self::Binary(op) => op.symbol(),
            Self::Unary(op) => op.symbol(),
            Self::Ternary => "?:",
            Self::Comma => ",",
            Self::Call { .. } => "call",
            Self::EmptyStatement => ";",
            Self::EmptyBlock => "{}",
            Self::OpenScope => "open-scope",
            Self::CloseBlock => "close-block",
            Self::If { .. } => "if",
            Self::While => "while",
            Self::For => "for",
            Self::Return { .. } => "return",
            Self::Print => "printf",
            Self::Sequence => "stmt",
            Self::FunctionDeclarator { .. } => "function-declarator",
            Self::Param { .. } => "param",
            Self::FunctionDefinition => "function-definition",
            Self::Program => "program",
        }
    }
}

/// Anything that consumes reductions from a parse driver
pub trait ReductionSink {
    fn reduce(&mut self, reduction: Reduction, line: u32) -> Result<()>;
}

/// Library-side analysis knobs
#[derive(Debug, Clone, Default)]
pub struct AnalyzerOptions {
    /// Print diagnostics to stderr as they are found
    pub echo_diagnostics: bool,
}

/// The analysis context: everything one in-flight pass owns
pub struct Analyzer {
    ast: Ast,
    stack: AssemblyStack,
    symbols: SymbolTable,
    diagnostics: Diagnostics,
    /// Type named by the declaration currently being reduced
    pending_type: Option<DataType>,
    /// Function whose body is currently being reduced
    function: Option<FunctionSig>,
    root: Option<NodeId>,
}

/// Result of a completed pass
#[derive(Debug)]
pub struct Analysis {
    pub ast: Ast,
    pub root: NodeId,
    pub symbols: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::with_options(AnalyzerOptions::default())
    }

    pub fn with_options(options: AnalyzerOptions) -> Self {
        Self {
            ast: Ast::new(),
            stack: AssemblyStack::new(),
            symbols: SymbolTable::new(),
            diagnostics: Diagnostics::new().with_echo(options.echo_diagnostics),
            pending_type: None,
            function: None,
            root: None,
        }
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Top of the assembly stack
    pub fn top(&self) -> Option<NodeId> {
        self.stack.peek()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Hand over the accepted tree and tables
    pub fn finish(self) -> Result<Analysis> {
        let root = self.root.ok_or(Error::RootNotUnique { found: self.stack.len() })?;
        Ok(Analysis {
            ast: self.ast,
            root,
            symbols: self.symbols,
            diagnostics: self.diagnostics.into_records(),
        })
    }

    // ==================== Helpers ====================

    fn push(&mut self, node: AstNode) -> NodeId {
        let id = self.ast.alloc(node);
        self.stack.push(id);
        id
    }

    fn attr(&self, id: NodeId) -> Operand {
        self.ast.get(id).attr
    }

    fn report(&mut self, kind: DiagnosticKind, line: u32) {
        self.diagnostics.report(kind, line);
    }

    fn report_issue(&mut self, issue: Option<TypeIssue>, line: u32) {
        if let Some(issue) = issue {
            self.report(issue.into(), line);
        }
    }

    fn leaf(&mut self, token: String, attr: Operand, line: u32) {
        self.push(AstNode::leaf(token, line).with_attr(attr));
    }

    fn unary_node(&mut self, token: &str, rule: &str, attr: Operand, line: u32) -> Result<()> {
        let operand = self.stack.pop(rule, line)?;
        self.push(AstNode::new(token, NodeKind::Unary { operand }, line).with_attr(attr));
        Ok(())
    }

    fn binary_node(&mut self, token: &str, left: NodeId, right: NodeId, attr: Operand, line: u32) {
        self.push(AstNode::new(token, NodeKind::Binary { left, right }, line).with_attr(attr));
    }

    // ==================== Rules ====================

    fn reduce_identifier(&mut self, name: String, line: u32) {
        let reference = self.symbols.reference(&name, line);
        if reference.undeclared {
            self.report(DiagnosticKind::UndeclaredIdentifier { name: name.clone() }, line);
        }
        let symbol = self.symbols.get(reference.id);
        let attr = Operand::new(symbol.ty, symbol.value);
        let node = AstNode::leaf(name, line).with_attr(attr).with_symbol(reference.id);
        self.push(node);
    }

    fn reduce_declarator(&mut self, name: String, init: bool, line: u32) -> Result<()> {
        let ty = self.pending_type.ok_or_else(|| Error::OutOfOrder {
            rule: "declarator".to_string(),
            line,
        })?;

        if !init {
            match self.symbols.declare(&name, ty, SymbolRole::Identifier, Value::Undefined, line) {
                Declaration::Redefinition(_) => {
                    self.report(DiagnosticKind::Redefinition { name: name.clone() }, line);
                }
                Declaration::Bound(_) => {}
            }
            self.leaf(format!("decl {}", name), Operand::new(ty, Value::Undefined), line);
            return Ok(());
        }

        let init = self.stack.pop("declarator", line)?;
        let coerced = coerce_assignment(ty, &self.attr(init));
        let mut target = AstNode::leaf(name.as_str(), line).with_attr(coerced.operand);

        match self.symbols.declare(&name, ty, SymbolRole::Identifier, coerced.operand.value, line) {
            Declaration::Redefinition(original) => {
                self.report(DiagnosticKind::Redefinition { name }, line);
                target = target.with_symbol(original);
            }
            Declaration::Bound(id) => {
                self.report_issue(coerced.issue, line);
                target = target.with_symbol(id);
            }
        }

        let left = self.ast.alloc(target);
        self.binary_node("=", left, init, coerced.operand, line);
        Ok(())
    }

    fn reduce_assign(&mut self, op: AssignOp, line: u32) -> Result<()> {
        let [lhs, rhs] = self.stack.pop_n::<2>(op.symbol(), line)?;
        let current = self.attr(lhs);
        let incoming = self.attr(rhs);

        let (computed, fold_issue) = match op.binary() {
            Some(bin) => {
                let folded = fold_binary(bin, &current, &incoming);
                (folded.operand, folded.issue)
            }
            None => (incoming, None),
        };
        let invalid = matches!(fold_issue, Some(TypeIssue::InvalidOperand { .. }));
        self.report_issue(fold_issue, line);

        let mut attr = computed;
        if let Some(id) = self.ast.get(lhs).symbol {
            let target_ty = self.symbols.get(id).ty;
            if target_ty.is_storage() {
                if !invalid {
                    self.report_issue(conversion_issue(target_ty, incoming.ty), line);
                }
                let value = computed.value.convert_to(target_ty);
                self.symbols.set_value(id, value);
                attr = Operand::new(target_ty, value);
            }
        }

        self.binary_node(op.symbol(), lhs, rhs, attr, line);
        Ok(())
    }

    fn reduce_binary(&mut self, op: BinaryOp, line: u32) -> Result<()> {
        let [left, right] = self.stack.pop_n::<2>(op.symbol(), line)?;
        let folded = fold_binary(op, &self.attr(left), &self.attr(right));
        self.report_issue(folded.issue, line);
        self.binary_node(op.symbol(), left, right, folded.operand, line);
        Ok(())
    }

    fn reduce_unary(&mut self, op: UnaryOp, line: u32) -> Result<()> {
        let operand = self.stack.pop(op.symbol(), line)?;
        let current = self.attr(operand);
        let folded = fold_unary(op, &current);
        self.report_issue(folded.issue, line);

        if op.is_increment() {
            if let Some(id) = self.ast.get(operand).symbol {
                if self.symbols.get(id).ty.is_storage() {
                    self.symbols.set_value(id, step(&current, op));
                }
            }
        }

        self.push(
            AstNode::new(op.symbol(), NodeKind::Unary { operand }, line).with_attr(folded.operand),
        );
        Ok(())
    }

    fn reduce_ternary(&mut self, line: u32) -> Result<()> {
        let [cond, then_branch, else_branch] = self.stack.pop_n::<3>("?:", line)?;
        let (then_attr, else_attr) = (self.attr(then_branch), self.attr(else_branch));
        let attr = match self.attr(cond).value.is_truthy() {
            Some(true) => then_attr,
            Some(false) => else_attr,
            None => {
                let ty = if then_attr.ty == DataType::Float || else_attr.ty == DataType::Float {
                    DataType::Float
                } else {
                    then_attr.ty
                };
                Operand::new(ty, Value::Undefined)
            }
        };
        let kind = NodeKind::Conditional {
            cond,
            then_branch,
            else_branch: Some(else_branch),
        };
        self.push(AstNode::new("?:", kind, line).with_attr(attr));
        Ok(())
    }

    fn reduce_call(&mut self, name: String, has_args: bool, line: u32) -> Result<()> {
        let reference = self.symbols.reference(&name, line);
        if reference.undeclared {
            self.report(DiagnosticKind::UndeclaredIdentifier { name: name.clone() }, line);
        }
        let symbol = self.symbols.get(reference.id);
        let attr = Operand::new(symbol.ty, Value::Undefined);
        let token = format!("call {}", name);
        if has_args {
            self.unary_node(&token, "call", attr, line)?;
        } else {
            self.leaf(token, attr, line);
        }
        Ok(())
    }

    fn reduce_if(&mut self, has_else: bool, line: u32) -> Result<()> {
        let kind = if has_else {
            let [cond, then_branch, else_branch] = self.stack.pop_n::<3>("if", line)?;
            NodeKind::Conditional { cond, then_branch, else_branch: Some(else_branch) }
        } else {
            let [cond, then_branch] = self.stack.pop_n::<2>("if", line)?;
            NodeKind::Conditional { cond, then_branch, else_branch: None }
        };
        self.push(AstNode::new("if", kind, line));
        Ok(())
    }

    fn reduce_function_declarator(&mut self, name: String, line: u32) {
        let ret = match self.pending_type.take() {
            Some(ty) => ty,
            None => {
                self.report(DiagnosticKind::MissingTypeSpecifier { name: name.clone() }, line);
                DataType::Int
            }
        };
        if let Declaration::Redefinition(_) =
            self.symbols.declare(&name, ret, SymbolRole::Function, Value::Undefined, line)
        {
            self.report(DiagnosticKind::Redefinition { name: name.clone() }, line);
        }
        self.function = Some(FunctionSig { name, ret, params: Vec::new() });
    }

    fn reduce_param(&mut self, name: String, ty: DataType, line: u32) -> Result<()> {
        let function = self.function.as_mut().ok_or_else(|| Error::OutOfOrder {
            rule: "param".to_string(),
            line,
        })?;
        function.params.push(Param { name: name.clone(), ty });
        if let Declaration::Redefinition(_) =
            self.symbols.declare(&name, ty, SymbolRole::Param, Value::Undefined, line)
        {
            self.report(DiagnosticKind::Redefinition { name }, line);
        }
        Ok(())
    }

    fn reduce_function_definition(&mut self, line: u32) -> Result<()> {
        let sig = self.function.take().ok_or_else(|| Error::OutOfOrder {
            rule: "function-definition".to_string(),
            line,
        })?;
        let body = self.stack.pop("function-definition", line)?;
        self.symbols.close_function_scope(line)?;
        let attr = Operand::new(sig.ret, Value::Undefined);
        let token = sig.name.clone();
        self.push(AstNode::new(token, NodeKind::Function { body, sig }, line).with_attr(attr));
        Ok(())
    }

    fn reduce_program(&mut self) -> Result<()> {
        if self.stack.len() != 1 {
            return Err(Error::RootNotUnique { found: self.stack.len() });
        }
        let root = self.stack.pop("program", 0)?;
        self.symbols.cleanup();
        self.root = Some(root);
        debug!("program accepted: {} node(s)", self.ast.subtree_size(root));
        Ok(())
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReductionSink for Analyzer {
    fn reduce(&mut self, reduction: Reduction, line: u32) -> Result<()> {
        if self.root.is_some() {
            return Err(Error::AlreadyFinished);
        }
        debug!("reduce {} at line {} (stack {})", reduction.rule(), line, self.stack.len());

        match reduction {
            Reduction::IntLiteral(i) => self.leaf(i.to_string(), Operand::int(i), line),
            Reduction::FloatLiteral(f) => {
                self.leaf(Value::Float(f).to_string(), Operand::float(f), line)
            }
            Reduction::CharLiteral(c) => {
                self.leaf(Value::Char(c).to_string(), Operand::char(c), line)
            }
            Reduction::StringLiteral(s) => {
                self.leaf(format!("\"{}\"", s), Operand::unknown(), line)
            }
            Reduction::Identifier(name) => self.reduce_identifier(name, line),

            Reduction::TypeSpecifier(ty) => self.pending_type = Some(ty),
            Reduction::Declarator { name, init } => self.reduce_declarator(name, init, line)?,
            Reduction::DeclaratorList => {
                let [left, right] = self.stack.pop_n::<2>(",", line)?;
                let attr = self.attr(right);
                self.binary_node(",", left, right, attr, line);
            }
            Reduction::Declaration => self.pending_type = None,

            Reduction::Assign(op) => self.reduce_assign(op, line)?,
            Reduction::Binary(op) => self.reduce_binary(op, line)?,
            Reduction::Unary(op) => self.reduce_unary(op, line)?,
            Reduction::Ternary => self.reduce_ternary(line)?,
            Reduction::Comma => {
                let [left, right] = self.stack.pop_n::<2>(",", line)?;
                let attr = self.attr(right);
                self.binary_node(",", left, right, attr, line);
            }
            Reduction::Call { name, has_args } => self.reduce_call(name, has_args, line)?,

            Reduction::EmptyStatement => self.leaf(";".to_string(), Operand::unknown(), line),
            Reduction::EmptyBlock => self.leaf("{}".to_string(), Operand::unknown(), line),
            Reduction::OpenScope => {
                self.symbols.open_scope();
            }
            Reduction::CloseBlock => {
                self.symbols.close_scope(line)?;
            }
            Reduction::If { has_else } => self.reduce_if(has_else, line)?,
            Reduction::While => {
                let [cond, body] = self.stack.pop_n::<2>("while", line)?;
                self.binary_node("while", cond, body, Operand::unknown(), line);
            }
            Reduction::For => {
                let [init, cond, incr, body] = self.stack.pop_n::<4>("for", line)?;
                self.push(AstNode::new("for", NodeKind::Loop { init, cond, incr, body }, line));
            }
            Reduction::Return { has_value: true } => {
                self.unary_node("return", "return", Operand::unknown(), line)?
            }
            Reduction::Return { has_value: false } => {
                self.leaf("return".to_string(), Operand::unknown(), line)
            }
            Reduction::Print => self.unary_node("printf", "printf", Operand::unknown(), line)?,
            Reduction::Sequence => {
                let [left, right] = self.stack.pop_n::<2>("stmt", line)?;
                self.binary_node("stmt", left, right, Operand::unknown(), line);
            }

            Reduction::FunctionDeclarator { name } => self.reduce_function_declarator(name, line),
            Reduction::Param { name, ty } => self.reduce_param(name, ty, line)?,
            Reduction::FunctionDefinition => self.reduce_function_definition(line)?,

            Reduction::Program => self.reduce_program()?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::diagnostics::Severity;
    use pretty_assertions::assert_eq;

    fn run(analyzer: &mut Analyzer, steps: Vec<Reduction>) {
        for step in steps {
            analyzer.reduce(step, 1).unwrap();
        }
    }

    #[test]
    fn test_binary_reduction_pops_two_pushes_one() {
        let mut analyzer = Analyzer::new();
        run(
            &mut analyzer,
            vec![
                Reduction::IntLiteral(2),
                Reduction::IntLiteral(3),
                Reduction::Binary(BinaryOp::Mul),
            ],
        );
        assert_eq!(analyzer.stack_depth(), 1);
        let top = analyzer.ast().get(analyzer.top().unwrap());
        assert_eq!(top.token, "*");
        assert_eq!(top.children().len(), 2);
        assert_eq!(top.attr, Operand::int(6));
    }

    #[test]
    fn test_for_assigns_slots_in_syntactic_order() {
        let mut analyzer = Analyzer::new();
        run(
            &mut analyzer,
            vec![
                Reduction::IntLiteral(1),
                Reduction::IntLiteral(2),
                Reduction::IntLiteral(3),
                Reduction::IntLiteral(4),
                Reduction::For,
            ],
        );
        let node = analyzer.ast().get(analyzer.top().unwrap());
        let NodeKind::Loop { init, cond, incr, body } = node.kind.clone() else {
            panic!("expected loop node");
        };
        let tokens: Vec<&str> = [init, cond, incr, body]
            .iter()
            .map(|id| analyzer.ast().get(*id).token.as_str())
            .collect();
        assert_eq!(tokens, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_underflow_aborts() {
        let mut analyzer = Analyzer::new();
        analyzer.reduce(Reduction::IntLiteral(1), 3).unwrap();
        let err = analyzer.reduce(Reduction::If { has_else: true }, 3).unwrap_err();
        assert!(err.is_internal());
        assert!(matches!(err, Error::StackUnderflow { needed: 3, available: 1, .. }));
    }

    #[test]
    fn test_close_without_open_aborts() {
        let mut analyzer = Analyzer::new();
        let err = analyzer.reduce(Reduction::CloseBlock, 2).unwrap_err();
        assert_eq!(err, Error::NegativeScopeDepth { line: 2 });
    }

    #[test]
    fn test_declaration_binds_type_and_value() {
        let mut analyzer = Analyzer::new();
        run(
            &mut analyzer,
            vec![
                Reduction::TypeSpecifier(DataType::Int),
                Reduction::FloatLiteral(2.5),
                Reduction::Declarator { name: "n".into(), init: true },
                Reduction::Declaration,
            ],
        );
        let n = analyzer.symbols().iter().next().unwrap();
        assert_eq!((n.ty, n.value), (DataType::Int, Value::Int(2)));
        let diags = analyzer.diagnostics().records();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(
            diags[0].kind,
            DiagnosticKind::ImplicitNarrowing { from: DataType::Float, to: DataType::Int }
        );
    }

    #[test]
    fn test_float_initialiser_narrows_to_char() {
        let mut analyzer = Analyzer::new();
        run(
            &mut analyzer,
            vec![
                Reduction::TypeSpecifier(DataType::Char),
                Reduction::FloatLiteral(65.7),
                Reduction::Declarator { name: "c".into(), init: true },
                Reduction::Declaration,
            ],
        );
        let c = analyzer.symbols().iter().next().unwrap();
        assert_eq!((c.ty, c.value), (DataType::Char, Value::Char(b'A')));
        let kinds: Vec<_> = analyzer.diagnostics().records().iter().map(|d| d.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![DiagnosticKind::ImplicitNarrowing { from: DataType::Float, to: DataType::Char }]
        );
    }

    #[test]
    fn test_declarator_without_type_is_out_of_order() {
        let mut analyzer = Analyzer::new();
        let err = analyzer
            .reduce(Reduction::Declarator { name: "q".into(), init: false }, 1)
            .unwrap_err();
        assert!(matches!(err, Error::OutOfOrder { .. }));
    }

    #[test]
    fn test_program_requires_single_root() {
        let mut analyzer = Analyzer::new();
        run(&mut analyzer, vec![Reduction::EmptyStatement, Reduction::EmptyStatement]);
        let err = analyzer.reduce(Reduction::Program, 1).unwrap_err();
        assert_eq!(err, Error::RootNotUnique { found: 2 });

        analyzer.reduce(Reduction::Sequence, 1).unwrap();
        analyzer.reduce(Reduction::Program, 1).unwrap();
        assert!(analyzer.root().is_some());
        assert_eq!(analyzer.reduce(Reduction::EmptyStatement, 1), Err(Error::AlreadyFinished));
    }

    #[test]
    fn test_compound_assignment_folds_and_stores() {
        let mut analyzer = Analyzer::new();
        run(
            &mut analyzer,
            vec![
                Reduction::TypeSpecifier(DataType::Float),
                Reduction::IntLiteral(4),
                Reduction::Declarator { name: "f".into(), init: true },
                Reduction::Declaration,
                Reduction::Identifier("f".into()),
                Reduction::CharLiteral(2),
                Reduction::Assign(AssignOp::Mul),
            ],
        );
        let f = analyzer.symbols().iter().next().unwrap();
        assert_eq!(f.value, Value::Float(8.0));
        // char on the right of a float target is still flagged
        let kinds: Vec<_> = analyzer.diagnostics().records().iter().map(|d| d.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![DiagnosticKind::ImplicitWidening { from: DataType::Char, to: DataType::Float }]
        );
    }
}
