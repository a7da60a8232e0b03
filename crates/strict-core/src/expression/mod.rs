// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Typed expressions and their canonical textual form.
//!
//! Expressions are produced by the line parser in [`parser`] after the
//! token scan ([`token`]) and the Shunting-Yard postfix conversion
//! ([`shunting_yard`]). Every expression carries the [`TypeId`] of its
//! value; there is no untyped AST stage.
//!
//! [`Display`](std::fmt::Display) renders the canonical source text:
//! parsing the rendered text again yields an equal expression. Statement
//! forms (`if`, `for`) render multi-line with their body's tab depth.

use ecow::EcoString;

use crate::package::TypeId;
use crate::types::Body;

pub(crate) mod parser;
pub(crate) mod scope;
pub(crate) mod shunting_yard;
pub(crate) mod token;

/// A typed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    /// The type of this expression's value.
    pub return_type: TypeId,
}

impl Expression {
    #[must_use]
    pub fn new(kind: ExpressionKind, return_type: TypeId) -> Self {
        Self { kind, return_type }
    }
}

/// The expression sum type.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// A number literal.
    Number(f64),
    /// A text literal, stored without the quotes.
    Text(EcoString),
    /// A boolean literal.
    Boolean(bool),
    /// A list literal `(a, b, c)`; the return type is the `List`
    /// instantiation for the shared element type.
    List(Vec<Expression>),
    /// A variable or parameter read.
    VariableCall { name: EcoString },
    /// A member read, on `instance` or on the enclosing type.
    MemberCall {
        instance: Option<Box<Expression>>,
        name: EcoString,
    },
    /// A method call, on `instance` or on the enclosing type.
    MethodCall {
        instance: Option<Box<Expression>>,
        name: EcoString,
        arguments: Vec<Expression>,
    },
    /// A constructor call `TypeName(args…)`, resolved through `from` or
    /// member-wise auto-initialization.
    From {
        name: EcoString,
        arguments: Vec<Expression>,
    },
    /// A binary operator, resolved to a method on the left operand's type
    /// or on `BinaryOperator`.
    Binary {
        left: Box<Expression>,
        operator: EcoString,
        right: Box<Expression>,
    },
    /// The only unary, `not x`, resolved to `x.not()`.
    Not(Box<Expression>),
    /// An immutable binding, `let x = value`.
    Assignment {
        name: EcoString,
        value: Box<Expression>,
    },
    /// A mutable binding, `mutable x = value`.
    MutableDeclaration {
        name: EcoString,
        value: Box<Expression>,
    },
    /// Reassignment of a mutable variable or member, `x = value`.
    Reassignment {
        target: Box<Expression>,
        value: Box<Expression>,
    },
    /// `if condition` with bodies, or the inline `condition ? a else b`.
    If {
        condition: Box<Expression>,
        then: Branch,
        otherwise: Option<Branch>,
    },
    /// `for iterable` or `for x in iterable` with a child body.
    For {
        /// The explicit loop variable, when written with `in`.
        variable: Option<EcoString>,
        /// The iterated expression.
        iterable: Box<Expression>,
        body: Body,
    },
    /// An explicit `return value`.
    Return(Box<Expression>),
}

/// One arm of an `if`: an indented body or an inline expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Branch {
    Body(Body),
    Expression(Box<Expression>),
}

impl Branch {
    /// The type of the arm's value.
    #[must_use]
    pub fn return_type(&self) -> TypeId {
        match self {
            Branch::Body(body) => body.return_type,
            Branch::Expression(expression) => expression.return_type,
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "guarded by the fract and magnitude checks"
)]
fn write_number(f: &mut std::fmt::Formatter<'_>, value: f64) -> std::fmt::Result {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        write!(f, "{}", value as i64)
    } else {
        write!(f, "{value}")
    }
}

/// True when rendering `kind` as a binary operand needs parentheses to
/// reparse into the same tree.
fn operand_needs_parens(kind: &ExpressionKind, parent_power: u8, is_right: bool) -> bool {
    match kind {
        ExpressionKind::Binary { operator, .. } => {
            let power = shunting_yard::binding_power(operator).unwrap_or(u8::MAX);
            power < parent_power || (is_right && power == parent_power)
        }
        ExpressionKind::Not(_) => shunting_yard::NOT_BINDING_POWER < parent_power,
        ExpressionKind::If {
            then: Branch::Expression(_),
            ..
        } => true,
        _ => false,
    }
}

fn write_operand(
    f: &mut std::fmt::Formatter<'_>,
    operand: &Expression,
    parent_power: u8,
    is_right: bool,
) -> std::fmt::Result {
    if operand_needs_parens(&operand.kind, parent_power, is_right) {
        write!(f, "({operand})")
    } else {
        write!(f, "{operand}")
    }
}

fn write_call_target(
    f: &mut std::fmt::Formatter<'_>,
    instance: Option<&Expression>,
    name: &str,
) -> std::fmt::Result {
    if let Some(instance) = instance {
        if operand_needs_parens(&instance.kind, u8::MAX, false) {
            write!(f, "({instance}).")?;
        } else {
            write!(f, "{instance}.")?;
        }
    }
    write!(f, "{name}")
}

fn write_arguments(f: &mut std::fmt::Formatter<'_>, arguments: &[Expression]) -> std::fmt::Result {
    write!(f, "(")?;
    for (i, argument) in arguments.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{argument}")?;
    }
    write!(f, ")")
}

impl std::fmt::Display for Expression {
    #[expect(clippy::too_many_lines, reason = "one arm per expression kind")]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ExpressionKind::Number(value) => write_number(f, *value),
            ExpressionKind::Text(value) => write!(f, "\"{value}\""),
            ExpressionKind::Boolean(value) => write!(f, "{value}"),
            ExpressionKind::List(elements) => write_arguments(f, elements),
            ExpressionKind::VariableCall { name } => write!(f, "{name}"),
            ExpressionKind::MemberCall { instance, name } => {
                write_call_target(f, instance.as_deref(), name)
            }
            ExpressionKind::MethodCall {
                instance,
                name,
                arguments,
            } => {
                write_call_target(f, instance.as_deref(), name)?;
                if arguments.is_empty() {
                    Ok(())
                } else {
                    write_arguments(f, arguments)
                }
            }
            ExpressionKind::From { name, arguments } => {
                write!(f, "{name}")?;
                write_arguments(f, arguments)
            }
            ExpressionKind::Binary {
                left,
                operator,
                right,
            } => {
                let power = shunting_yard::binding_power(operator).unwrap_or(0);
                write_operand(f, left, power, false)?;
                write!(f, " {operator} ")?;
                write_operand(f, right, power, true)
            }
            ExpressionKind::Not(inner) => {
                write!(f, "not ")?;
                write_operand(f, inner, shunting_yard::NOT_BINDING_POWER, false)
            }
            ExpressionKind::Assignment { name, value } => write!(f, "let {name} = {value}"),
            ExpressionKind::MutableDeclaration { name, value } => {
                write!(f, "mutable {name} = {value}")
            }
            ExpressionKind::Reassignment { target, value } => write!(f, "{target} = {value}"),
            ExpressionKind::If {
                condition,
                then: Branch::Expression(then),
                otherwise: Some(Branch::Expression(otherwise)),
            } => write!(f, "{condition} ? {then} else {otherwise}"),
            ExpressionKind::If {
                condition,
                then,
                otherwise,
            } => {
                write!(f, "if {condition}")?;
                if let Branch::Body(body) = then {
                    write!(f, "\n{body}")?;
                    if let Some(Branch::Body(otherwise)) = otherwise {
                        writeln!(f)?;
                        for _ in 1..body.tabs {
                            write!(f, "\t")?;
                        }
                        write!(f, "else\n{otherwise}")?;
                    }
                }
                Ok(())
            }
            ExpressionKind::For {
                variable,
                iterable,
                body,
            } => {
                match variable {
                    Some(variable) => write!(f, "for {variable} in {iterable}")?,
                    None => write!(f, "for {iterable}")?,
                }
                write!(f, "\n{body}")
            }
            ExpressionKind::Return(value) => write!(f, "return {value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty() -> TypeId {
        TypeId::from_raw(0)
    }

    fn number(value: f64) -> Expression {
        Expression::new(ExpressionKind::Number(value), ty())
    }

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(number(5.0).to_string(), "5");
        assert_eq!(number(-2.0).to_string(), "-2");
        assert_eq!(number(3.5).to_string(), "3.5");
    }

    #[test]
    fn binary_renders_with_single_spaces() {
        let sum = Expression::new(
            ExpressionKind::Binary {
                left: Box::new(number(1.0)),
                operator: "+".into(),
                right: Box::new(number(2.0)),
            },
            ty(),
        );
        assert_eq!(sum.to_string(), "1 + 2");
    }

    #[test]
    fn constructor_call_renders_arguments() {
        let range = Expression::new(
            ExpressionKind::From {
                name: "Range".into(),
                arguments: vec![
                    number(0.0),
                    Expression::new(
                        ExpressionKind::MemberCall {
                            instance: None,
                            name: "number".into(),
                        },
                        ty(),
                    ),
                ],
            },
            ty(),
        );
        assert_eq!(range.to_string(), "Range(0, number)");
    }

    #[test]
    fn conditional_expression_renders_inline() {
        let conditional = Expression::new(
            ExpressionKind::If {
                condition: Box::new(Expression::new(ExpressionKind::Boolean(true), ty())),
                then: Branch::Expression(Box::new(number(1.0))),
                otherwise: Some(Branch::Expression(Box::new(number(2.0)))),
            },
            ty(),
        );
        assert_eq!(conditional.to_string(), "true ? 1 else 2");
    }

    #[test]
    fn method_call_without_arguments_renders_bare() {
        let length = Expression::new(
            ExpressionKind::MethodCall {
                instance: Some(Box::new(Expression::new(
                    ExpressionKind::VariableCall { name: "xs".into() },
                    ty(),
                ))),
                name: "Length".into(),
                arguments: Vec::new(),
            },
            ty(),
        );
        assert_eq!(length.to_string(), "xs.Length");
    }
}
