//! Type System for cfront
//!
//! Storage types, folded constant values and the coercion rules applied
//! when a value crosses from one storage type into another. Everything in
//! here is pure: the dispatcher turns the returned `TypeIssue`s into
//! diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Inferred storage type of a symbol or expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Not yet bound by a declaration (or the result of an invalid operation)
    Untyped,
    Int,
    Float,
    Char,
    /// Return type placeholder for `void` functions
    Void,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Untyped => "untyped",
            Self::Int => "int",
            Self::Float => "float",
            Self::Char => "char",
            Self::Void => "void",
        }
    }

    pub fn is_typed(&self) -> bool {
        !matches!(self, Self::Untyped)
    }

    /// Check if a value of this type can be stored in a variable
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::Char)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Statically folded value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    Int(i64),
    Float(f64),
    Char(u8),
    /// Sentinel for values that cannot be computed statically
    Undefined,
}

impl Value {
    pub fn is_defined(&self) -> bool {
        !matches!(self, Self::Undefined)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(i) => Some(i as f64),
            Self::Float(f) => Some(f),
            Self::Char(c) => Some(c as f64),
            Self::Undefined => None,
        }
    }

    /// Integer view used by integer arithmetic; floats truncate toward zero
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int(i) => Some(i),
            Self::Float(f) => Some(f.trunc() as i64),
            Self::Char(c) => Some(c as i64),
            Self::Undefined => None,
        }
    }

    /// True only for a statically known zero
    pub fn is_zero(&self) -> bool {
        self.as_f64() == Some(0.0)
    }

    pub fn is_truthy(&self) -> Option<bool> {
        self.as_f64().map(|v| v != 0.0)
    }

    /// Convert into the representation of `ty` (C cast semantics)
    pub fn convert_to(self, ty: DataType) -> Value {
        match ty {
            DataType::Int => self.as_i64().map_or(Value::Undefined, Value::Int),
            DataType::Float => self.as_f64().map_or(Value::Undefined, Value::Float),
            DataType::Char => self.as_i64().map_or(Value::Undefined, |i| Value::Char(i as u8)),
            DataType::Untyped | DataType::Void => self,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{:.6}", v),
            Self::Char(c) => write!(f, "{}", *c as char),
            Self::Undefined => f.write_str("-"),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, Self::Lt | Self::Gt | Self::Le | Self::Ge | Self::Eq | Self::Ne)
    }
}

/// Unary operators, prefix and postfix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Neg => "-",
            Self::Not => "!",
            Self::BitNot => "~",
            Self::PreInc => "++",
            Self::PreDec => "--",
            Self::PostInc => "post++",
            Self::PostDec => "post--",
        }
    }

    /// `++`/`--` in either position write back to their operand
    pub fn is_increment(&self) -> bool {
        matches!(self, Self::PreInc | Self::PreDec | Self::PostInc | Self::PostDec)
    }
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl AssignOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Mul => "*=",
            Self::Div => "/=",
            Self::Mod => "%=",
        }
    }

    /// The arithmetic a compound assignment performs before storing
    pub fn binary(&self) -> Option<BinaryOp> {
        match self {
            Self::Assign => None,
            Self::Add => Some(BinaryOp::Add),
            Self::Sub => Some(BinaryOp::Sub),
            Self::Mul => Some(BinaryOp::Mul),
            Self::Div => Some(BinaryOp::Div),
            Self::Mod => Some(BinaryOp::Mod),
        }
    }
}

/// Type and folded value carried by an expression subtree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operand {
    pub ty: DataType,
    pub value: Value,
}

impl Operand {
    pub fn new(ty: DataType, value: Value) -> Self {
        Self { ty, value }
    }

    pub fn int(i: i64) -> Self {
        Self::new(DataType::Int, Value::Int(i))
    }

    pub fn float(f: f64) -> Self {
        Self::new(DataType::Float, Value::Float(f))
    }

    pub fn char(c: u8) -> Self {
        Self::new(DataType::Char, Value::Char(c))
    }

    /// Operand of unknown type and value
    pub fn unknown() -> Self {
        Self::new(DataType::Untyped, Value::Undefined)
    }
}

/// Problems found while typing or folding an expression
#[derive(Debug, Clone, PartialEq)]
pub enum TypeIssue {
    Narrowing { from: DataType, to: DataType },
    Widening { from: DataType, to: DataType },
    InvalidOperand { op: &'static str, ty: DataType },
    DivisionByZero,
}

/// Result of folding one operation
#[derive(Debug, Clone, PartialEq)]
pub struct Folded {
    pub operand: Operand,
    pub issue: Option<TypeIssue>,
}

impl Folded {
    fn ok(operand: Operand) -> Self {
        Self { operand, issue: None }
    }

    fn invalid(issue: TypeIssue) -> Self {
        Self {
            operand: Operand::unknown(),
            issue: Some(issue),
        }
    }
}

/// Arithmetic result type: float wins, everything else promotes to int
fn arithmetic_type(lhs: DataType, rhs: DataType) -> DataType {
    if lhs == DataType::Float || rhs == DataType::Float {
        DataType::Float
    } else {
        DataType::Int
    }
}

/// Type and fold a binary operation
pub fn fold_binary(op: BinaryOp, lhs: &Operand, rhs: &Operand) -> Folded {
    if op == BinaryOp::Mod {
        if let Some(ty) = [lhs.ty, rhs.ty].into_iter().find(|t| *t == DataType::Float) {
            return Folded::invalid(TypeIssue::InvalidOperand { op: op.symbol(), ty });
        }
    }

    if matches!(op, BinaryOp::Div | BinaryOp::Mod) && rhs.value.is_zero() {
        return Folded {
            operand: Operand::new(arithmetic_type(lhs.ty, rhs.ty), Value::Undefined),
            issue: Some(TypeIssue::DivisionByZero),
        };
    }

    if op.is_comparison() {
        let value = match (lhs.value.as_f64(), rhs.value.as_f64()) {
            (Some(a), Some(b)) => Value::Int(compare(op, a, b) as i64),
            _ => Value::Undefined,
        };
        return Folded::ok(Operand::new(DataType::Int, value));
    }

    let ty = arithmetic_type(lhs.ty, rhs.ty);
    let value = match ty {
        DataType::Float => match (lhs.value.as_f64(), rhs.value.as_f64()) {
            (Some(a), Some(b)) => Value::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                _ => a / b,
            }),
            _ => Value::Undefined,
        },
        _ => match (lhs.value.as_i64(), rhs.value.as_i64()) {
            (Some(a), Some(b)) => Value::Int(match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div => a.wrapping_div(b),
                _ => a.wrapping_rem(b),
            }),
            _ => Value::Undefined,
        },
    };
    Folded::ok(Operand::new(ty, value))
}

fn compare(op: BinaryOp, a: f64, b: f64) -> bool {
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Gt => a > b,
        BinaryOp::Le => a <= b,
        BinaryOp::Ge => a >= b,
        BinaryOp::Eq => a == b,
        _ => a != b,
    }
}

/// Type and fold a unary operation
pub fn fold_unary(op: UnaryOp, operand: &Operand) -> Folded {
    let promoted = if operand.ty == DataType::Float {
        DataType::Float
    } else {
        DataType::Int
    };

    match op {
        UnaryOp::Plus => Folded::ok(Operand::new(promoted, operand.value.convert_to(promoted))),
        UnaryOp::Neg => {
            let value = match operand.value.convert_to(promoted) {
                Value::Int(i) => Value::Int(i.wrapping_neg()),
                Value::Float(f) => Value::Float(-f),
                other => other,
            };
            Folded::ok(Operand::new(promoted, value))
        }
        UnaryOp::Not => {
            let value = operand
                .value
                .is_truthy()
                .map_or(Value::Undefined, |t| Value::Int(!t as i64));
            Folded::ok(Operand::new(DataType::Int, value))
        }
        UnaryOp::BitNot => {
            if operand.ty == DataType::Float {
                return Folded::invalid(TypeIssue::InvalidOperand {
                    op: op.symbol(),
                    ty: DataType::Float,
                });
            }
            let value = operand.value.as_i64().map_or(Value::Undefined, |i| Value::Int(!i));
            Folded::ok(Operand::new(DataType::Int, value))
        }
        UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
            let stepped = step(operand, op);
            let value = match op {
                UnaryOp::PreInc | UnaryOp::PreDec => stepped,
                _ => operand.value,
            };
            Folded::ok(Operand::new(operand.ty, value))
        }
    }
}

/// The value `++`/`--` writes back into its operand
pub fn step(operand: &Operand, op: UnaryOp) -> Value {
    let delta: i64 = match op {
        UnaryOp::PreInc | UnaryOp::PostInc => 1,
        _ => -1,
    };
    match operand.value {
        Value::Int(i) => Value::Int(i.wrapping_add(delta)),
        Value::Float(f) => Value::Float(f + delta as f64),
        Value::Char(c) => Value::Char(c.wrapping_add(delta as u8)),
        Value::Undefined => Value::Undefined,
    }
}

/// Diagnostic-worthy conversions when storing a `source` into a `target`
pub fn conversion_issue(target: DataType, source: DataType) -> Option<TypeIssue> {
    match (target, source) {
        (DataType::Int, DataType::Float) | (DataType::Char, DataType::Float) => {
            Some(TypeIssue::Narrowing { from: source, to: target })
        }
        (DataType::Float, DataType::Char) => Some(TypeIssue::Widening { from: source, to: target }),
        _ => None,
    }
}

/// Store `rhs` into a location of type `target`
pub fn coerce_assignment(target: DataType, rhs: &Operand) -> Folded {
    let issue = conversion_issue(target, rhs.ty);
    Folded {
        operand: Operand::new(target, rhs.value.convert_to(target)),
        issue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_int_arithmetic_folds() {
        let folded = fold_binary(BinaryOp::Add, &Operand::int(2), &Operand::int(3));
        assert_eq!(folded.operand, Operand::int(5));
        assert!(folded.issue.is_none());

        let folded = fold_binary(BinaryOp::Div, &Operand::int(7), &Operand::int(2));
        assert_eq!(folded.operand.value, Value::Int(3));
    }

    #[test]
    fn test_mixed_arithmetic_is_float() {
        let folded = fold_binary(BinaryOp::Mul, &Operand::int(2), &Operand::float(1.5));
        assert_eq!(folded.operand, Operand::float(3.0));
    }

    #[test]
    fn test_char_promotes_to_int() {
        let folded = fold_binary(BinaryOp::Add, &Operand::char(b'a'), &Operand::int(1));
        assert_eq!(folded.operand, Operand::int(98));
    }

    #[test]
    fn test_float_modulo_is_invalid() {
        let folded = fold_binary(BinaryOp::Mod, &Operand::int(5), &Operand::float(2.0));
        assert_eq!(
            folded.issue,
            Some(TypeIssue::InvalidOperand { op: "%", ty: DataType::Float })
        );
        assert_eq!(folded.operand.value, Value::Undefined);
    }

    #[test]
    fn test_division_by_zero() {
        let folded = fold_binary(BinaryOp::Div, &Operand::int(1), &Operand::int(0));
        assert_eq!(folded.issue, Some(TypeIssue::DivisionByZero));
        assert_eq!(folded.operand.value, Value::Undefined);

        let folded = fold_binary(BinaryOp::Mod, &Operand::int(1), &Operand::char(0));
        assert_eq!(folded.issue, Some(TypeIssue::DivisionByZero));
    }

    #[test]
    fn test_unknown_divisor_is_not_zero() {
        let divisor = Operand::new(DataType::Int, Value::Undefined);
        let folded = fold_binary(BinaryOp::Div, &Operand::int(4), &divisor);
        assert!(folded.issue.is_none());
        assert_eq!(folded.operand.value, Value::Undefined);
    }

    #[test]
    fn test_comparison_yields_int() {
        let folded = fold_binary(BinaryOp::Lt, &Operand::float(1.5), &Operand::int(2));
        assert_eq!(folded.operand, Operand::int(1));
    }

    #[test]
    fn test_conversion_table() {
        assert_eq!(
            conversion_issue(DataType::Int, DataType::Float),
            Some(TypeIssue::Narrowing { from: DataType::Float, to: DataType::Int })
        );
        assert_eq!(
            conversion_issue(DataType::Float, DataType::Char),
            Some(TypeIssue::Widening { from: DataType::Char, to: DataType::Float })
        );
        assert_eq!(
            conversion_issue(DataType::Char, DataType::Float),
            Some(TypeIssue::Narrowing { from: DataType::Float, to: DataType::Char })
        );
        assert_eq!(conversion_issue(DataType::Float, DataType::Int), None);
        assert_eq!(conversion_issue(DataType::Int, DataType::Char), None);
    }

    #[test]
    fn test_coerce_truncates() {
        let folded = coerce_assignment(DataType::Int, &Operand::float(3.9));
        assert_eq!(folded.operand, Operand::int(3));

        let folded = coerce_assignment(DataType::Char, &Operand::float(65.7));
        assert_eq!(folded.operand, Operand::char(b'A'));
    }

    #[test]
    fn test_increment_forms() {
        let x = Operand::int(4);
        assert_eq!(fold_unary(UnaryOp::PreInc, &x).operand.value, Value::Int(5));
        assert_eq!(fold_unary(UnaryOp::PostInc, &x).operand.value, Value::Int(4));
        assert_eq!(step(&x, UnaryOp::PostDec), Value::Int(3));
    }

    #[test]
    fn test_bitnot_rejects_float() {
        let folded = fold_unary(UnaryOp::BitNot, &Operand::float(1.0));
        assert!(matches!(folded.issue, Some(TypeIssue::InvalidOperand { op: "~", .. })));
        assert_eq!(fold_unary(UnaryOp::BitNot, &Operand::int(0)).operand.value, Value::Int(-1));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Float(5.0).to_string(), "5.000000");
        assert_eq!(Value::Char(b'z').to_string(), "z");
        assert_eq!(Value::Undefined.to_string(), "-");
    }
}
