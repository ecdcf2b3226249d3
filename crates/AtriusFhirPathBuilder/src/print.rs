//! # Expression Printer
//!
//! Renders an [`Expression`] tree as FHIRPath text with minimal parentheses.
//!
//! Every operator node has a precedence (lower binds weaker):
//!
//! | Node | Precedence |
//! |------|------------|
//! | `or` | 3 |
//! | `and` | 4 |
//! | `in`, `contains` | 5 |
//! | `=`, `!=` | 6 |
//! | `<`, `<=`, `>`, `>=` | 7 |
//! | `between` | 10 |
//!
//! A node is wrapped in parentheses when its precedence is lower than the one
//! required by the surrounding [`PrintContext`]. Conjunctions and disjunctions put
//! each operand on its own line, prefixed by the context's indentation.
//!
//! The target of an invocation (`<target>.<member>`) requires the tightest
//! binding, so operator nodes used as targets are always parenthesized. Function
//! arguments start again at precedence zero.

use std::fmt;

use crate::expression::{Expression, Invocation, Term};

pub const OR_PRECEDENCE: u8 = 3;
pub const AND_PRECEDENCE: u8 = 4;
pub const MEMBERSHIP_PRECEDENCE: u8 = 5;
pub const BETWEEN_PRECEDENCE: u8 = 10;
/// Required precedence for the target of an invocation.
pub const INVOCATION_TARGET_PRECEDENCE: u8 = 11;

const INDENT: &str = "  ";

/// Printing state: the precedence the enclosing node requires and the current
/// indentation depth.
///
/// # Examples
///
/// ```rust
/// use atrius_fhirpath_builder::{Expression, PrintContext};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let a = Expression::identifier("a")?;
/// let b = Expression::identifier("b")?;
/// let c = Expression::identifier("c")?;
///
/// let expr = Expression::and(Expression::or(a, b), c);
/// assert_eq!(PrintContext::ZERO.print(&expr), "(a or\nb) and\nc");
/// assert_eq!(PrintContext::ZERO.increase().print(&expr), "(a or\n  b) and\n  c");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintContext {
    pub precedence: u8,
    pub indent: usize,
}

impl PrintContext {
    pub const ZERO: PrintContext = PrintContext {
        precedence: 0,
        indent: 0,
    };

    pub fn with_precedence(self, precedence: u8) -> PrintContext {
        PrintContext { precedence, ..self }
    }

    /// Returns a context one indentation level deeper.
    pub fn increase(self) -> PrintContext {
        PrintContext {
            indent: self.indent + 1,
            ..self
        }
    }

    pub fn indent_str(&self) -> String {
        INDENT.repeat(self.indent)
    }

    /// Wraps `text` in parentheses if a node of `precedence` binds weaker than
    /// this context requires.
    pub fn parenthesize(&self, precedence: u8, text: String) -> String {
        if precedence < self.precedence {
            format!("({})", text)
        } else {
            text
        }
    }

    pub fn print(&self, expr: &Expression) -> String {
        match expr {
            Expression::Term(term) => self.print_term(term),
            Expression::Invocation(target, invocation) => format!(
                "{}.{}",
                self.with_precedence(INVOCATION_TARGET_PRECEDENCE).print(target),
                self.print_invocation(invocation)
            ),
            Expression::Comparison(a, comparator, b) => {
                let precedence = comparator.precedence();
                self.binary(precedence, a, &comparator.to_string(), b)
            }
            Expression::Membership(a, op, b) => {
                self.binary(MEMBERSHIP_PRECEDENCE, a, &op.to_string(), b)
            }
            Expression::Between(expr, lower, upper) => {
                let child = self.with_precedence(BETWEEN_PRECEDENCE);
                self.parenthesize(
                    BETWEEN_PRECEDENCE,
                    format!(
                        "{} between {} and {}",
                        child.print(expr),
                        child.print(lower),
                        child.print(upper)
                    ),
                )
            }
            Expression::And(operands) => self.junction(AND_PRECEDENCE, "and", operands),
            Expression::Or(operands) => self.junction(OR_PRECEDENCE, "or", operands),
        }
    }

    fn print_term(&self, term: &Term) -> String {
        match term {
            Term::Literal(literal) => literal.to_string(),
            Term::Identifier(name) => name.clone(),
            Term::Invocation(invocation) => self.print_invocation(invocation),
        }
    }

    fn print_invocation(&self, invocation: &Invocation) -> String {
        let args = self.with_precedence(0);
        match invocation {
            Invocation::Member(name) => name.clone(),
            Invocation::Function(name, params) => format!(
                "{}({})",
                name,
                params
                    .iter()
                    .map(|param| args.print(param))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Invocation::Where(criteria) => format!("where({})", args.print(criteria)),
            Invocation::ReverseResolve(reference) => {
                format!("reverseResolve({})", args.print(reference))
            }
        }
    }

    fn binary(&self, precedence: u8, a: &Expression, op: &str, b: &Expression) -> String {
        let child = self.with_precedence(precedence);
        self.parenthesize(
            precedence,
            format!("{} {} {}", child.print(a), op, child.print(b)),
        )
    }

    fn junction(&self, precedence: u8, keyword: &str, operands: &[Expression]) -> String {
        // A single operand prints as itself, in the caller's context.
        if let [only] = operands {
            return self.print(only);
        }
        let child = self.with_precedence(precedence);
        let separator = format!(" {}\n{}", keyword, self.indent_str());
        self.parenthesize(
            precedence,
            operands
                .iter()
                .map(|operand| child.print(operand))
                .collect::<Vec<_>>()
                .join(&separator),
        )
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&PrintContext::ZERO.print(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::Comparator;
    use crate::expression::MembershipOperator;
    use rust_decimal_macros::dec;

    fn atom(name: &str) -> Expression {
        Expression::identifier(name).unwrap()
    }

    #[test]
    fn test_parenthesize_only_when_weaker() {
        let ctx = PrintContext::ZERO.with_precedence(AND_PRECEDENCE);
        assert_eq!(ctx.parenthesize(OR_PRECEDENCE, "x".to_string()), "(x)");
        assert_eq!(ctx.parenthesize(AND_PRECEDENCE, "x".to_string()), "x");
        assert_eq!(ctx.parenthesize(MEMBERSHIP_PRECEDENCE, "x".to_string()), "x");
    }

    #[test]
    fn test_booleans_print_as_bare_tokens() {
        assert_eq!(Expression::TRUE.to_string(), "true");
        assert_eq!(Expression::FALSE.to_string(), "false");
    }

    #[test]
    fn test_comparison() {
        let expr = Expression::comparison(
            Expression::member("value"),
            Comparator::LessEqual,
            Expression::quantity(dec!(30), Some("g/dl")),
        );
        assert_eq!(expr.to_string(), "value <= 30 'g/dl'");
    }

    #[test]
    fn test_flat_and_chain() {
        let expr = Expression::and(Expression::and(atom("a"), atom("b")), atom("c"));
        assert_eq!(expr.to_string(), "a and\nb and\nc");
    }

    #[test]
    fn test_nested_or_prints_without_extra_parentheses() {
        let expr = Expression::or(Expression::or(atom("a"), atom("b")), atom("c"));
        assert!(matches!(&expr, Expression::Or(operands) if operands.len() == 2));
        assert_eq!(expr.to_string(), "a or\nb or\nc");
    }

    #[test]
    fn test_or_inside_and_is_parenthesized() {
        let expr = Expression::and(
            Expression::or(atom("a"), atom("b")),
            Expression::or(atom("c"), atom("d")),
        );
        assert_eq!(expr.to_string(), "(a or\nb) and\n(c or\nd)");
    }

    #[test]
    fn test_and_inside_or_is_not_parenthesized() {
        let expr = Expression::or(
            Expression::and(atom("a"), atom("b")),
            Expression::and(atom("c"), atom("d")),
        );
        assert_eq!(expr.to_string(), "a and\nb or\nc and\nd");
    }

    #[test]
    fn test_single_operand_junction_is_transparent() {
        let expr = Expression::And(vec![Expression::Or(vec![atom("a")]), atom("b")]);
        assert_eq!(expr.to_string(), "a and\nb");

        let expr = Expression::And(vec![Expression::Or(vec![atom("a"), atom("b")])]);
        assert_eq!(expr.to_string(), "a or\nb");
    }

    #[test]
    fn test_invocation_on_operator_target_is_parenthesized() {
        let expr = Expression::or(atom("a"), atom("b")).not();
        assert_eq!(expr.to_string(), "(a or\nb).not()");

        assert_eq!(atom("a").not().to_string(), "a.not()");
    }

    #[test]
    fn test_function_arguments_reset_precedence() {
        let inner = Expression::or(atom("a"), atom("b"));
        let call = atom("x").exists(inner);
        let expr = Expression::and(call, atom("c"));
        assert_eq!(expr.to_string(), "x.exists(a or\nb) and\nc");
    }

    #[test]
    fn test_where_and_exists_chain() {
        let expr = atom("code")
            .filter(Expression::comparison(
                atom("system"),
                Comparator::Equal,
                Expression::string("http://loinc.org"),
            ))
            .exists(Expression::comparison(
                atom("code"),
                Comparator::Equal,
                Expression::string("29463-7"),
            ));
        assert_eq!(
            expr.to_string(),
            "code.where(system = 'http://loinc.org').exists(code = '29463-7')"
        );
    }

    #[test]
    fn test_reverse_resolve() {
        let expr = Expression::reverse_resolve(atom("Observation").dot("subject"))
            .exists(Expression::TRUE);
        assert_eq!(expr.to_string(), "reverseResolve(Observation.subject).exists(true)");
    }

    #[test]
    fn test_between_node() {
        let expr = Expression::between_node(
            Expression::member("value"),
            Expression::quantity(dec!(1), None),
            Expression::quantity(dec!(2), None),
        );
        assert_eq!(expr.to_string(), "value between 1 and 2");

        let negated = expr.not();
        assert_eq!(negated.to_string(), "(value between 1 and 2).not()");
    }

    #[test]
    fn test_membership() {
        let expr = Expression::membership(
            Expression::string("x"),
            MembershipOperator::In,
            atom("codes"),
        );
        assert_eq!(expr.to_string(), "'x' in codes");

        let in_and = Expression::and(expr.clone(), atom("b"));
        assert_eq!(in_and.to_string(), "'x' in codes and\nb");
    }

    #[test]
    fn test_printing_is_idempotent() {
        let expr = Expression::and(
            Expression::or(atom("a"), atom("b")),
            Expression::comparison(atom("c"), Comparator::GreaterThan, Expression::quantity(dec!(1), None)),
        );
        assert_eq!(expr.to_string(), expr.to_string());
    }
}
