//! Analysis reports
//!
//! Gathers the outputs of one pass (diagnostics, symbol dump, tree) into a
//! single serializable document, plus the plain-text renderings the CLI
//! prints.

pub mod tree_printer;

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::semantic::{Analysis, Diagnostic, Severity, SymbolRecord};
use crate::utils::Error;

// ==================== Analysis Report ====================

/// Everything one run produced, ready for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// No errors (warnings allowed) and no fatal failure
    pub success: bool,

    pub source_file: String,

    /// Recovered issues, in source order
    pub diagnostics: Vec<Diagnostic>,

    /// Surviving symbols after cleanup
    pub symbols: Vec<SymbolRecord>,

    /// Bracketed preorder of the accepted tree
    pub preorder: Option<String>,

    /// Fatal error that stopped the pass, if any
    pub fatal: Option<String>,

    pub stats: AnalysisStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub error_count: usize,
    pub warning_count: usize,
    pub symbol_count: usize,
    pub node_count: usize,
    /// Deepest level of the tree (root = 1)
    pub tree_depth: u32,
    /// Lines of source
    pub loc: usize,
    pub total_time_ms: u64,
}

impl AnalysisReport {
    /// Build a report from a completed pass
    pub fn from_analysis(analysis: &Analysis, source_file: &str, source: &str) -> Self {
        let error_count = analysis
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        let symbols = analysis.symbols.dump();

        let stats = AnalysisStats {
            error_count,
            warning_count: analysis.diagnostics.len() - error_count,
            symbol_count: symbols.len(),
            node_count: analysis.ast.subtree_size(analysis.root),
            tree_depth: tree_printer::max_level(&analysis.ast, analysis.root),
            loc: source.lines().count(),
            total_time_ms: 0,
        };

        Self {
            success: error_count == 0,
            source_file: source_file.to_string(),
            diagnostics: analysis.diagnostics.clone(),
            symbols,
            preorder: Some(tree_printer::preorder(&analysis.ast, analysis.root)),
            fatal: None,
            stats,
        }
    }

    /// Build a report for a pass that aborted
    pub fn from_error(error: &Error, source_file: &str, source: &str) -> Self {
        Self {
            success: false,
            source_file: source_file.to_string(),
            diagnostics: Vec::new(),
            symbols: Vec::new(),
            preorder: None,
            fatal: Some(error.to_string()),
            stats: AnalysisStats {
                loc: source.lines().count(),
                ..Default::default()
            },
        }
    }

    pub fn with_elapsed_ms(mut self, ms: u64) -> Self {
        self.stats.total_time_ms = ms;
        self
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

// ==================== Text Rendering ====================

/// Symbol dump as an aligned table
pub fn render_symbol_table(records: &[SymbolRecord]) -> String {
    let name_width = records
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(0)
        .max("name".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:<nw$} {:<6} {:>5} {:>5}  value",
        "role",
        "name",
        "type",
        "scope",
        "line",
        nw = name_width
    );
    for record in records {
        let value = record.value.map_or_else(|| "-".to_string(), |v| v.to_string());
        let _ = writeln!(
            out,
            "{:<10} {:<nw$} {:<6} {:>5} {:>5}  {}",
            record.role.name(),
            record.name,
            record.ty,
            record.scope,
            record.line,
            value,
            nw = name_width
        );
    }
    out
}

/// One diagnostic per line, in source order
pub fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for diagnostic in diagnostics {
        let _ = writeln!(out, "{}", diagnostic);
    }
    out
}

/// Closing summary line, e.g. `1 error(s), 2 warning(s)`
pub fn render_summary(stats: &AnalysisStats) -> String {
    format!("{} error(s), {} warning(s)", stats.error_count, stats.warning_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::{analyze_source, AnalyzerOptions};
    use pretty_assertions::assert_eq;

    fn report(source: &str) -> AnalysisReport {
        let analysis = analyze_source(source, AnalyzerOptions::default()).unwrap();
        AnalysisReport::from_analysis(&analysis, "test.c", source)
    }

    #[test]
    fn test_report_counts() {
        let r = report("int main() {\n int i = 2.5;\n j = 1;\n return i;\n}");
        assert!(!r.success);
        assert_eq!(r.stats.error_count, 1);
        assert_eq!(r.stats.warning_count, 1);
        assert_eq!(r.stats.symbol_count, 1);
        assert_eq!(r.stats.loc, 5);
        assert!(r.preorder.is_some());
        assert!(r.fatal.is_none());
    }

    #[test]
    fn test_warnings_alone_succeed() {
        let r = report("int main() { int i; i = 1.5; return i; }");
        assert!(r.success);
        assert_eq!(r.stats.warning_count, 1);
    }

    #[test]
    fn test_json_shape() {
        let r = report("int main() { char c = 'x'; float f = c; return 0; }");
        let json: serde_json::Value = serde_json::from_str(&r.to_json()).unwrap();

        assert_eq!(json["source_file"], "test.c");
        assert_eq!(json["diagnostics"][0]["kind"], "implicit_widening");
        assert_eq!(json["diagnostics"][0]["severity"], "warning");
        assert_eq!(json["diagnostics"][0]["from"], "char");
        assert_eq!(json["symbols"][1]["name"], "f");
        assert_eq!(json["symbols"][1]["type"], "float");
        assert_eq!(json["symbols"][1]["value"]["value"], 120.0);
    }

    #[test]
    fn test_fatal_report() {
        let err = analyze_source("int main() { 3 = x; }", AnalyzerOptions::default()).unwrap_err();
        let r = AnalysisReport::from_error(&err, "bad.c", "int main() { 3 = x; }");
        assert!(!r.success);
        assert_eq!(r.fatal.as_deref(), Some("line 1: expression is not assignable"));
        assert!(r.preorder.is_none());
    }

    #[test]
    fn test_symbol_table_text() {
        let r = report("int total = 3;\nfloat ratio;\nint main() { return total; }");
        let expected = "\
role       name  type   scope  line  value
identifier total int        0     1  3
identifier ratio float      0     2  -
";
        assert_eq!(render_symbol_table(&r.symbols), expected);
    }

    #[test]
    fn test_diagnostic_lines() {
        let r = report("int main() {\n y = 1;\n}");
        assert_eq!(
            render_diagnostics(&r.diagnostics),
            "Line:2: error: use of undeclared identifier 'y'\n"
        );
        assert_eq!(render_summary(&r.stats), "1 error(s), 0 warning(s)");
    }
}
