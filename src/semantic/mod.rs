//! Semantic analysis
//!
//! Single-pass: the parser reports reductions and the `Analyzer` builds the
//! tree, resolves names and folds constants as they arrive.

pub mod ast;
pub mod diagnostics;
pub mod dispatch;
pub mod stack;
pub mod symbols;

pub use ast::{Ast, AstNode, NodeId, NodeKind};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use dispatch::{Analysis, Analyzer, AnalyzerOptions, Reduction, ReductionSink};
pub use symbols::{SymbolRecord, SymbolTable};

use log::info;

use crate::frontend::lexer::Lexer;
use crate::frontend::parser::Parser;
use crate::utils::Result;

/// Run the whole pass over `source`
pub fn analyze_source(source: &str, options: AnalyzerOptions) -> Result<Analysis> {
    let mut analyzer = Analyzer::with_options(options);
    Parser::new(Lexer::new(source), &mut analyzer)?.parse_program()?;
    let analysis = analyzer.finish()?;
    info!(
        "analysis done: {} node(s), {} diagnostic(s)",
        analysis.ast.len(),
        analysis.diagnostics.len()
    );
    Ok(analysis)
}
