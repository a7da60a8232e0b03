// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Building typed expressions from pre-parsed body lines.
//!
//! Each line is recognized by prefix (`if`, `else`, `for`, `let`,
//! `constant`, `mutable`, `return`, reassignment) or parsed as a value
//! expression: tokens go through the Shunting-Yard conversion and the
//! postfix stream is folded bottom-up into typed expressions, resolving
//! every identifier against (in order) body variables, parameters,
//! members, types, and methods of the enclosing context.
//!
//! The parser owns a mutable borrow of the whole [`Program`] because
//! resolution can instantiate generic types on demand.

use ecow::EcoString;

use super::scope::ScopeStack;
use super::shunting_yard::{self, PostfixItem, Primary, Segment};
use super::token::{self, Token};
use super::{Branch, Expression, ExpressionKind};
use crate::error::{ErrorKind, ErrorScope, ParseError, Result};
use crate::package::{PackageId, Program, TypeId};
use crate::parse::body::{PreBody, PreItem};
use crate::resolve::{self, generics, is_compatible};
use crate::types::{Body, BodyId, SourceLine, Variable};

/// Parses expressions within one type, and optionally one method.
pub(crate) struct ExpressionParser<'a> {
    program: &'a mut Program,
    type_id: TypeId,
    package: PackageId,
    method_index: Option<usize>,
    scope: ErrorScope,
    scopes: ScopeStack,
    line: SourceLine,
    /// Next body id, counting from the method's top body.
    next_body: u32,
    /// The body currently being parsed, recorded as the parent of any
    /// child body opened inside it.
    current_body: Option<BodyId>,
}

impl<'a> ExpressionParser<'a> {
    /// A parser for a method body; the method's parameters form the
    /// outermost variable frame.
    pub fn for_method(program: &'a mut Program, type_id: TypeId, method_index: usize) -> Self {
        let data = program.get_type(type_id);
        let method = &data.methods[method_index];
        let scope = ErrorScope::in_method(data.name.clone(), method.name.clone());
        let package = data.package;
        let parameters: Vec<Variable> = method
            .parameters
            .iter()
            .map(|parameter| Variable {
                name: parameter.name.clone(),
                variable_type: parameter.declared_type,
                is_mutable: parameter.is_mutable,
            })
            .collect();
        let mut scopes = ScopeStack::new();
        for parameter in parameters {
            scopes
                .define(parameter)
                .expect("parameter names are unique after signature resolution");
        }
        Self {
            program,
            type_id,
            package,
            method_index: Some(method_index),
            scope,
            scopes,
            line: SourceLine::new(0, ""),
            next_body: 0,
            current_body: None,
        }
    }

    /// A parser for declaration-level expressions (member initializers,
    /// parameter defaults): no method context, no variables in scope.
    pub fn for_declarations(program: &'a mut Program, type_id: TypeId) -> Self {
        let data = program.get_type(type_id);
        let scope = ErrorScope::new(data.name.clone());
        let package = data.package;
        Self {
            program,
            type_id,
            package,
            method_index: None,
            scope,
            scopes: ScopeStack::new(),
            line: SourceLine::new(0, ""),
            next_body: 0,
            current_body: None,
        }
    }

    /// Parses a member initializer at its `has` line.
    pub fn parse_member_initializer(
        mut self,
        line: &SourceLine,
        text: &str,
    ) -> Result<Expression> {
        self.line = line.clone();
        self.expression_text(text)
    }

    /// Parses a parameter default value.
    pub fn parse_default_value(mut self, text: &str) -> Result<Expression> {
        self.line = SourceLine::new(0, text);
        self.expression_text(text)
    }

    /// Parses a whole pre-parsed method body.
    pub fn parse_body(mut self, pre: &PreBody) -> Result<Body> {
        self.body(pre)
    }

    fn fail(&self, kind: ErrorKind) -> ParseError {
        self.scope.at(self.line.number, &self.line.text, kind)
    }

    fn type_name(&self, ty: TypeId) -> EcoString {
        self.program.get_type(ty).name.clone()
    }

    fn define(&mut self, variable: Variable) -> Result<()> {
        self.scopes.define(variable).map_err(|kind| self.fail(kind))
    }

    // ========================================================================
    // Bodies and statements
    // ========================================================================

    fn body(&mut self, pre: &PreBody) -> Result<Body> {
        let id = BodyId::from_raw(self.next_body);
        self.next_body += 1;
        let parent = self.current_body;
        self.current_body = Some(id);
        self.scopes.push();
        let expressions = self.body_items(pre);
        let variables = self.scopes.pop();
        self.current_body = parent;
        let expressions = expressions?;
        let return_type = expressions
            .last()
            .map_or_else(|| self.program.base_type("None"), |last| last.return_type);
        Ok(Body {
            id,
            parent,
            tabs: pre.tabs,
            line_range: pre.start_line..pre.end_line + 1,
            variables,
            expressions,
            return_type,
        })
    }

    fn body_items(&mut self, pre: &PreBody) -> Result<Vec<Expression>> {
        let mut expressions = Vec::new();
        let mut index = 0;
        while index < pre.items.len() {
            match &pre.items[index] {
                PreItem::Body(child) => {
                    let line = first_line(child);
                    return Err(self.scope.at(
                        line.number,
                        &line.text,
                        ErrorKind::InvalidIndentation { tabs: child.tabs },
                    ));
                }
                PreItem::Line(line) => {
                    self.line = line.clone();
                    let expression = self.statement(line.content(), pre, &mut index)?;
                    expressions.push(expression);
                }
            }
            index += 1;
        }
        Ok(expressions)
    }

    fn statement(&mut self, content: &str, pre: &PreBody, index: &mut usize) -> Result<Expression> {
        if let Some(rest) = content.strip_prefix("if ") {
            return self.if_statement(rest, pre, index);
        }
        if content == "else" {
            return Err(self.fail(ErrorKind::UnexpectedElse));
        }
        if let Some(rest) = content.strip_prefix("for ") {
            return self.for_statement(rest, pre, index);
        }
        if let Some(rest) = content.strip_prefix("return ") {
            return self.return_statement(rest);
        }
        if let Some(rest) = content.strip_prefix("let ") {
            return self.declaration(rest, false);
        }
        if let Some(rest) = content.strip_prefix("constant ") {
            return self.declaration(rest, false);
        }
        if let Some(rest) = content.strip_prefix("mutable ") {
            return self.declaration(rest, true);
        }
        if let Some((target, value)) = reassignment_parts(content) {
            return self.reassignment(target, value);
        }
        self.expression_text(content)
    }

    /// The child body following the line at `index`, required.
    fn child_body(&mut self, pre: &PreBody, index: &mut usize) -> Result<Body> {
        match pre.items.get(*index + 1) {
            Some(PreItem::Body(child)) => {
                *index += 1;
                self.body(child)
            }
            _ => Err(self.fail(ErrorKind::MissingIndentedBlock)),
        }
    }

    fn if_statement(&mut self, rest: &str, pre: &PreBody, index: &mut usize) -> Result<Expression> {
        let condition = self.expression_text(rest)?;
        self.check_boolean(&condition)?;
        let then = self.child_body(pre, index)?;
        let mut otherwise = None;
        if let Some(PreItem::Line(line)) = pre.items.get(*index + 1) {
            if line.content() == "else" {
                *index += 1;
                self.line = line.clone();
                otherwise = Some(self.child_body(pre, index)?);
            }
        }
        let return_type = then.return_type;
        Ok(Expression::new(
            ExpressionKind::If {
                condition: Box::new(condition),
                then: Branch::Body(then),
                otherwise: otherwise.map(Branch::Body),
            },
            return_type,
        ))
    }

    fn for_statement(
        &mut self,
        rest: &str,
        pre: &PreBody,
        index: &mut usize,
    ) -> Result<Expression> {
        let (variable, iterable_text) = match rest.split_once(" in ") {
            Some((name, iterable)) => (Some(name), iterable),
            None => (None, rest),
        };
        let iterable = self.expression_text(iterable_text)?;
        let Some(element) = resolve::element_type(self.program, iterable.return_type) else {
            let found = self.type_name(iterable.return_type);
            return Err(self.fail(ErrorKind::NotIterable(found)));
        };
        self.scopes.push();
        match variable {
            // An explicit variable replaces the implicit index and value,
            // which is what allows loops to nest.
            Some(name) => self.bind_loop_variable(name, element)?,
            None => {
                let number = self.program.base_type("Number");
                self.define(Variable {
                    name: "index".into(),
                    variable_type: number,
                    is_mutable: false,
                })?;
                self.define(Variable {
                    name: "value".into(),
                    variable_type: element,
                    is_mutable: false,
                })?;
            }
        }
        let body = self.child_body(pre, index);
        self.scopes.pop();
        let body = body?;
        let none = self.program.base_type("None");
        Ok(Expression::new(
            ExpressionKind::For {
                variable: variable.map(EcoString::from),
                iterable: Box::new(iterable),
                body,
            },
            none,
        ))
    }

    /// Binds the explicit loop variable of `for name in …`: an existing
    /// binding must be mutable and accept the element type, a fresh one
    /// is introduced mutable.
    fn bind_loop_variable(&mut self, name: &str, element: TypeId) -> Result<()> {
        if name.is_empty() || !name.starts_with(char::is_lowercase) {
            return Err(self.fail(ErrorKind::UnexpectedToken(name.into())));
        }
        if let Some(existing) = self.scopes.lookup(name) {
            let existing = existing.clone();
            if !existing.is_mutable {
                return Err(self.fail(ErrorKind::ImmutableLoopVariable(name.into())));
            }
            if !is_compatible(self.program, element, existing.variable_type) {
                return Err(self.fail(ErrorKind::LoopVariableMismatch {
                    name: name.into(),
                    expected: self.type_name(existing.variable_type),
                    found: self.type_name(element),
                }));
            }
            return Ok(());
        }
        self.define(Variable {
            name: name.into(),
            variable_type: element,
            is_mutable: true,
        })
    }

    fn return_statement(&mut self, rest: &str) -> Result<Expression> {
        let value = self.expression_text(rest)?;
        if let Some(method_index) = self.method_index {
            let declared = self.program.get_type(self.type_id).methods[method_index].return_type;
            let none = self.program.base_type("None");
            if declared != none && !is_compatible(self.program, value.return_type, declared) {
                return Err(self.fail(ErrorKind::ReturnTypeMismatch {
                    found: self.type_name(value.return_type),
                    expected: self.type_name(declared),
                }));
            }
        }
        let return_type = value.return_type;
        Ok(Expression::new(
            ExpressionKind::Return(Box::new(value)),
            return_type,
        ))
    }

    fn declaration(&mut self, rest: &str, mutable: bool) -> Result<Expression> {
        let Some((name, value_text)) = rest.split_once(" = ") else {
            return Err(self.fail(ErrorKind::UnexpectedToken(rest.into())));
        };
        if name.is_empty()
            || !name.starts_with(char::is_lowercase)
            || !name.chars().all(char::is_alphanumeric)
        {
            return Err(self.fail(ErrorKind::UnexpectedToken(name.into())));
        }
        let value = self.expression_text(value_text)?;
        // `let x = Mutable(…)` is the second spelling of a mutable binding.
        let is_mutable =
            mutable || resolve::mutable_underlying(self.program, value.return_type).is_some();
        self.define(Variable {
            name: name.into(),
            variable_type: value.return_type,
            is_mutable,
        })?;
        let return_type = value.return_type;
        let kind = if mutable {
            ExpressionKind::MutableDeclaration {
                name: name.into(),
                value: Box::new(value),
            }
        } else {
            ExpressionKind::Assignment {
                name: name.into(),
                value: Box::new(value),
            }
        };
        Ok(Expression::new(kind, return_type))
    }

    fn reassignment(&mut self, target_text: &str, value_text: &str) -> Result<Expression> {
        let value = self.expression_text(value_text)?;
        let target = self.expression_text(target_text)?;
        match &target.kind {
            ExpressionKind::VariableCall { name } => {
                let variable = self
                    .scopes
                    .lookup(name)
                    .expect("variable calls resolve from scope")
                    .clone();
                if !variable.is_mutable {
                    return Err(self.fail(ErrorKind::ImmutableReassignment(name.clone())));
                }
                if !is_compatible(self.program, value.return_type, variable.variable_type) {
                    return Err(self.fail(ErrorKind::IncompatibleReassignment {
                        name: name.clone(),
                        expected: self.type_name(variable.variable_type),
                        found: self.type_name(value.return_type),
                    }));
                }
            }
            ExpressionKind::MemberCall { instance, name } => {
                let owner = instance.as_ref().map_or(self.type_id, |instance| {
                    resolve::unwrap_mutable(self.program, instance.return_type)
                });
                let member = self
                    .program
                    .get_type(owner)
                    .find_member(name)
                    .expect("member calls resolve from the owner")
                    .clone();
                if !member.is_mutable {
                    return Err(self.fail(ErrorKind::ImmutableReassignment(name.clone())));
                }
                if !is_compatible(self.program, value.return_type, member.declared_type) {
                    return Err(self.fail(ErrorKind::IncompatibleReassignment {
                        name: name.clone(),
                        expected: self.type_name(member.declared_type),
                        found: self.type_name(value.return_type),
                    }));
                }
            }
            _ => return Err(self.fail(ErrorKind::UnexpectedToken(target_text.into()))),
        }
        let return_type = value.return_type;
        Ok(Expression::new(
            ExpressionKind::Reassignment {
                target: Box::new(target),
                value: Box::new(value),
            },
            return_type,
        ))
    }

    // ========================================================================
    // Value expressions
    // ========================================================================

    /// Parses one value expression from text.
    pub(crate) fn expression_text(&mut self, text: &str) -> Result<Expression> {
        let tokens = token::tokenize(text).map_err(|kind| self.fail(kind))?;
        self.expression_tokens(&tokens)
    }

    fn expression_tokens(&mut self, tokens: &[Token]) -> Result<Expression> {
        if let Some(question) = tokens
            .iter()
            .position(|token| matches!(token, Token::Question))
        {
            return self.conditional(tokens, question);
        }
        let postfix = shunting_yard::to_postfix(tokens).map_err(|kind| self.fail(kind))?;
        self.build_postfix(&postfix)
    }

    /// The inline conditional `condition ? then else otherwise`.
    fn conditional(&mut self, tokens: &[Token], question: usize) -> Result<Expression> {
        let rest = &tokens[question + 1..];
        if rest.iter().any(|token| matches!(token, Token::Question)) {
            return Err(self.fail(ErrorKind::NestedConditional));
        }
        let else_position = rest
            .iter()
            .position(|token| matches!(token, Token::Identifier(name) if name == "else"))
            .ok_or_else(|| self.fail(ErrorKind::UnexpectedToken("?".into())))?;
        let condition = self.expression_tokens(&tokens[..question])?;
        self.check_boolean(&condition)?;
        let then = self.expression_tokens(&rest[..else_position])?;
        let otherwise = self.expression_tokens(&rest[else_position + 1..])?;
        if !is_compatible(self.program, otherwise.return_type, then.return_type) {
            return Err(self.fail(ErrorKind::ConditionalBranchMismatch {
                then: self.type_name(then.return_type),
                otherwise: self.type_name(otherwise.return_type),
            }));
        }
        let return_type = then.return_type;
        Ok(Expression::new(
            ExpressionKind::If {
                condition: Box::new(condition),
                then: Branch::Expression(Box::new(then)),
                otherwise: Some(Branch::Expression(Box::new(otherwise))),
            },
            return_type,
        ))
    }

    fn check_boolean(&self, condition: &Expression) -> Result<()> {
        let boolean = self.program.base_type("Boolean");
        if resolve::unwrap_mutable(self.program, condition.return_type) != boolean {
            return Err(self.fail(ErrorKind::ConditionMustBeBoolean(
                self.type_name(condition.return_type),
            )));
        }
        Ok(())
    }

    fn build_postfix(&mut self, items: &[PostfixItem]) -> Result<Expression> {
        let mut stack: Vec<Expression> = Vec::new();
        for item in items {
            match item {
                PostfixItem::Operand(primary) => {
                    let expression = self.primary(primary)?;
                    stack.push(expression);
                }
                PostfixItem::Operator(operator) => {
                    let right = self.pop_operand(&mut stack)?;
                    let left = self.pop_operand(&mut stack)?;
                    let expression = self.binary(left, operator, right)?;
                    stack.push(expression);
                }
                PostfixItem::Not => {
                    let value = self.pop_operand(&mut stack)?;
                    let expression = self.not(value)?;
                    stack.push(expression);
                }
            }
        }
        if stack.len() != 1 {
            return Err(self.fail(ErrorKind::UnexpectedToken("end of line".into())));
        }
        Ok(stack.pop().expect("stack has exactly one expression"))
    }

    fn pop_operand(&self, stack: &mut Vec<Expression>) -> Result<Expression> {
        stack
            .pop()
            .ok_or_else(|| self.fail(ErrorKind::UnexpectedToken("end of line".into())))
    }

    fn binary(&mut self, left: Expression, operator: &str, right: Expression) -> Result<Expression> {
        let resolved = resolve::find_binary_method(
            self.program,
            left.return_type,
            operator,
            right.return_type,
        )
        .map_err(|kind| self.fail(kind))?;
        Ok(Expression::new(
            ExpressionKind::Binary {
                left: Box::new(left),
                operator: operator.into(),
                right: Box::new(right),
            },
            resolved.return_type,
        ))
    }

    fn not(&mut self, value: Expression) -> Result<Expression> {
        let target = resolve::unwrap_mutable(self.program, value.return_type);
        let resolved = resolve::find_method(self.program, target, "not", &[])
            .map_err(|kind| self.fail(kind))?;
        Ok(Expression::new(
            ExpressionKind::Not(Box::new(value)),
            resolved.return_type,
        ))
    }

    fn primary(&mut self, primary: &Primary) -> Result<Expression> {
        match primary {
            Primary::Number(value) => Ok(Expression::new(
                ExpressionKind::Number(*value),
                self.program.base_type("Number"),
            )),
            Primary::Text(value) => Ok(Expression::new(
                ExpressionKind::Text(value.clone()),
                self.program.base_type("Text"),
            )),
            Primary::Group(tokens) => self.expression_tokens(tokens),
            Primary::List(elements) => self.list(elements),
            Primary::Chain(segments) => self.chain(segments),
            Primary::Access { base, segments } => {
                let mut expression = self.primary(base)?;
                for segment in segments {
                    expression = self.next_segment(expression, segment)?;
                }
                Ok(expression)
            }
        }
    }

    fn list(&mut self, elements: &[Vec<Token>]) -> Result<Expression> {
        let mut built = Vec::with_capacity(elements.len());
        for tokens in elements {
            built.push(self.expression_tokens(tokens)?);
        }
        let first = built[0].return_type;
        for element in &built[1..] {
            if !is_compatible(self.program, element.return_type, first) {
                return Err(self.fail(ErrorKind::ListElementTypeMismatch {
                    expected: self.type_name(first),
                    found: self.type_name(element.return_type),
                }));
            }
        }
        let element = resolve::unwrap_mutable(self.program, first);
        let list = self.program.base_type("List");
        let instance = generics::instantiate(self.program, list, &[element])
            .map_err(|kind| self.fail(kind))?;
        Ok(Expression::new(ExpressionKind::List(built), instance))
    }

    fn chain(&mut self, segments: &[Segment]) -> Result<Expression> {
        let mut expression = self.first_segment(&segments[0])?;
        for segment in &segments[1..] {
            expression = self.next_segment(expression, segment)?;
        }
        Ok(expression)
    }

    fn build_arguments(&mut self, segment: &Segment) -> Result<Option<Vec<Expression>>> {
        match &segment.arguments {
            None => Ok(None),
            Some(lists) => {
                let mut arguments = Vec::with_capacity(lists.len());
                for tokens in lists {
                    arguments.push(self.expression_tokens(tokens)?);
                }
                Ok(Some(arguments))
            }
        }
    }

    /// Resolves the leading segment of a chain: variable, parameter,
    /// member, type, then method.
    fn first_segment(&mut self, segment: &Segment) -> Result<Expression> {
        let name = &segment.name;
        let Some(arguments) = self.build_arguments(segment)? else {
            if name == "true" || name == "false" {
                return Ok(Expression::new(
                    ExpressionKind::Boolean(name == "true"),
                    self.program.base_type("Boolean"),
                ));
            }
            if let Some(variable) = self.scopes.lookup(name) {
                let return_type = variable.variable_type;
                return Ok(Expression::new(
                    ExpressionKind::VariableCall { name: name.clone() },
                    return_type,
                ));
            }
            let member_type = self
                .program
                .get_type(self.type_id)
                .find_member(name)
                .map(|member| member.declared_type);
            if let Some(return_type) = member_type {
                return Ok(Expression::new(
                    ExpressionKind::MemberCall {
                        instance: None,
                        name: name.clone(),
                    },
                    return_type,
                ));
            }
            return match resolve::find_method(self.program, self.type_id, name, &[]) {
                Ok(resolved) => Ok(Expression::new(
                    ExpressionKind::MethodCall {
                        instance: None,
                        name: name.clone(),
                        arguments: Vec::new(),
                    },
                    resolved.return_type,
                )),
                Err(ErrorKind::MethodNotFound { .. }) => {
                    Err(self.fail(ErrorKind::UnknownIdentifier(name.clone())))
                }
                Err(kind) => Err(self.fail(kind)),
            };
        };
        if name.starts_with(char::is_uppercase) {
            let found =
                resolve::find_type(self.program, self.package, Some(self.type_id), name);
            if let Some(ty) = found {
                return self.from_call(ty, name, arguments);
            }
        }
        let argument_types: Vec<TypeId> =
            arguments.iter().map(|argument| argument.return_type).collect();
        let resolved = resolve::find_method(self.program, self.type_id, name, &argument_types)
            .map_err(|kind| self.fail(kind))?;
        Ok(Expression::new(
            ExpressionKind::MethodCall {
                instance: None,
                name: name.clone(),
                arguments,
            },
            resolved.return_type,
        ))
    }

    /// A constructor call: `from` overloads first, then member-wise
    /// auto-initialization.
    fn from_call(
        &mut self,
        ty: TypeId,
        name: &EcoString,
        arguments: Vec<Expression>,
    ) -> Result<Expression> {
        let argument_types: Vec<TypeId> =
            arguments.iter().map(|argument| argument.return_type).collect();
        let target = if self.program.get_type(ty).is_generic {
            let implementations: Vec<TypeId> = argument_types
                .iter()
                .map(|&argument| resolve::unwrap_mutable(self.program, argument))
                .collect();
            generics::instantiate(self.program, ty, &implementations)
                .map_err(|kind| self.fail(kind))?
        } else {
            ty
        };
        match resolve::find_method(self.program, target, "from", &argument_types) {
            Ok(resolved) => Ok(Expression::new(
                ExpressionKind::From {
                    name: name.clone(),
                    arguments,
                },
                resolved.return_type,
            )),
            Err(from_error) => {
                let members = self.program.get_type(target).members.clone();
                let auto_initializes = members.len() == arguments.len()
                    && members
                        .iter()
                        .zip(&argument_types)
                        .all(|(member, &argument)| {
                            is_compatible(self.program, argument, member.declared_type)
                        });
                if auto_initializes {
                    Ok(Expression::new(
                        ExpressionKind::From {
                            name: name.clone(),
                            arguments,
                        },
                        target,
                    ))
                } else {
                    Err(self.fail(from_error))
                }
            }
        }
    }

    /// Resolves a dotted segment against the instance's return type.
    fn next_segment(&mut self, instance: Expression, segment: &Segment) -> Result<Expression> {
        let name = &segment.name;
        let arguments = self.build_arguments(segment)?;
        let owner = resolve::unwrap_mutable(self.program, instance.return_type);
        match arguments {
            None => {
                let member_type = self
                    .program
                    .get_type(owner)
                    .find_member(name)
                    .map(|member| member.declared_type);
                if let Some(return_type) = member_type {
                    return Ok(Expression::new(
                        ExpressionKind::MemberCall {
                            instance: Some(Box::new(instance)),
                            name: name.clone(),
                        },
                        return_type,
                    ));
                }
                match resolve::find_method(self.program, owner, name, &[]) {
                    Ok(resolved) => Ok(Expression::new(
                        ExpressionKind::MethodCall {
                            instance: Some(Box::new(instance)),
                            name: name.clone(),
                            arguments: Vec::new(),
                        },
                        resolved.return_type,
                    )),
                    Err(ErrorKind::MethodNotFound { .. })
                        if name.starts_with(char::is_lowercase) =>
                    {
                        Err(self.fail(ErrorKind::MemberNotFound {
                            name: name.clone(),
                            on: self.type_name(owner),
                        }))
                    }
                    Err(kind) => Err(self.fail(kind)),
                }
            }
            Some(arguments) => {
                let argument_types: Vec<TypeId> =
                    arguments.iter().map(|argument| argument.return_type).collect();
                let resolved = resolve::find_method(self.program, owner, name, &argument_types)
                    .map_err(|kind| self.fail(kind))?;
                Ok(Expression::new(
                    ExpressionKind::MethodCall {
                        instance: Some(Box::new(instance)),
                        name: name.clone(),
                        arguments,
                    },
                    resolved.return_type,
                ))
            }
        }
    }
}

/// Splits `target = value` when the left side is a plain identifier or
/// dotted member path.
fn reassignment_parts(content: &str) -> Option<(&str, &str)> {
    let (target, value) = content.split_once(" = ")?;
    let plain = !target.is_empty()
        && target.starts_with(char::is_lowercase)
        && target
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.');
    plain.then_some((target, value))
}

/// The first source line anywhere inside a pre-parsed body.
fn first_line(pre: &PreBody) -> &SourceLine {
    match pre.items.first().expect("pre-parsed bodies are non-empty") {
        PreItem::Line(line) => line,
        PreItem::Body(child) => first_line(child),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn fixture() -> (Program, TypeId) {
        let mut program = Program::new();
        let package = program.add_package(program.root(), "Demo", "Demo".into());
        let ty = program
            .add_type_source(
                package,
                "Counter",
                "has number\nhas log\nRun Number\n\tnumber",
            )
            .unwrap();
        (program, ty)
    }

    fn parse(program: &mut Program, ty: TypeId, text: &str) -> Result<Expression> {
        ExpressionParser::for_method(program, ty, 0).expression_text(text)
    }

    fn parse_ok(program: &mut Program, ty: TypeId, text: &str) -> Expression {
        parse(program, ty, text).unwrap()
    }

    #[test]
    fn arithmetic_types_as_number() {
        let (mut program, ty) = fixture();
        let expression = parse_ok(&mut program, ty, "1 + 2 * 3");
        assert_eq!(expression.return_type, program.base_type("Number"));
        assert_eq!(expression.to_string(), "1 + 2 * 3");
    }

    #[test]
    fn grouping_survives_the_round_trip() {
        let (mut program, ty) = fixture();
        let expression = parse_ok(&mut program, ty, "(1 + 2) * 3");
        assert_eq!(expression.to_string(), "(1 + 2) * 3");
        let reparsed = parse_ok(&mut program, ty, "(1 + 2) * 3");
        assert_eq!(expression, reparsed);
    }

    #[test]
    fn comparison_and_logic_type_as_boolean() {
        let (mut program, ty) = fixture();
        let boolean = program.base_type("Boolean");
        assert_eq!(parse_ok(&mut program, ty, "1 < 2").return_type, boolean);
        assert_eq!(
            parse_ok(&mut program, ty, "1 < 2 and 3 >= 2").return_type,
            boolean
        );
        assert_eq!(parse_ok(&mut program, ty, "number is 5").return_type, boolean);
        assert_eq!(
            parse_ok(&mut program, ty, "number is not 5").return_type,
            boolean
        );
    }

    #[test]
    fn text_concatenation_types_as_text() {
        let (mut program, ty) = fixture();
        let expression = parse_ok(&mut program, ty, "\"a\" + \"b\"");
        assert_eq!(expression.return_type, program.base_type("Text"));
    }

    #[test]
    fn number_argument_upcasts_to_text() {
        let (mut program, ty) = fixture();
        let expression = parse_ok(&mut program, ty, "\"total \" + 5");
        assert_eq!(expression.return_type, program.base_type("Text"));
    }

    #[test]
    fn adding_text_to_number_is_rejected() {
        let (mut program, ty) = fixture();
        let error = parse(&mut program, ty, "1 + \"x\"").unwrap_err();
        assert_eq!(error.category(), ErrorCategory::TypeError);
    }

    #[test]
    fn not_resolves_on_booleans_only() {
        let (mut program, ty) = fixture();
        let expression = parse_ok(&mut program, ty, "not true");
        assert_eq!(expression.return_type, program.base_type("Boolean"));
        let error = parse(&mut program, ty, "not 5").unwrap_err();
        assert_eq!(error.category(), ErrorCategory::NameResolution);
    }

    #[test]
    fn members_resolve_without_an_instance() {
        let (mut program, ty) = fixture();
        let expression = parse_ok(&mut program, ty, "number + 1");
        assert_eq!(expression.return_type, program.base_type("Number"));
        assert_eq!(expression.to_string(), "number + 1");
    }

    #[test]
    fn dotted_member_methods_resolve() {
        let (mut program, ty) = fixture();
        let expression = parse_ok(&mut program, ty, "log.Write(\"hi\")");
        assert_eq!(expression.return_type, program.base_type("None"));
        assert_eq!(expression.to_string(), "log.Write(\"hi\")");
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        let (mut program, ty) = fixture();
        let error = parse(&mut program, ty, "missing + 1").unwrap_err();
        assert_eq!(error.kind, ErrorKind::UnknownIdentifier("missing".into()));
    }

    #[test]
    fn list_literal_instantiates_the_element_list() {
        let (mut program, ty) = fixture();
        let expression = parse_ok(&mut program, ty, "(1, 2, 3)");
        assert_eq!(program.get_type(expression.return_type).name, "Numbers");
        assert_eq!(expression.to_string(), "(1, 2, 3)");
    }

    #[test]
    fn mixed_list_elements_are_rejected() {
        let (mut program, ty) = fixture();
        let error = parse(&mut program, ty, "(1, \"x\")").unwrap_err();
        assert_eq!(error.category(), ErrorCategory::TypeError);
    }

    #[test]
    fn list_methods_see_substituted_signatures() {
        let (mut program, ty) = fixture();
        let length = parse_ok(&mut program, ty, "(1, 2).Length");
        assert_eq!(length.return_type, program.base_type("Number"));
        let contains = parse_ok(&mut program, ty, "(1, 2).Contains(2)");
        assert_eq!(contains.return_type, program.base_type("Boolean"));
    }

    #[test]
    fn constructor_resolves_through_from() {
        let (mut program, ty) = fixture();
        let expression = parse_ok(&mut program, ty, "Character(7)");
        assert_eq!(expression.return_type, program.base_type("Character"));
        assert_eq!(expression.to_string(), "Character(7)");
    }

    #[test]
    fn constructor_with_wrong_arity_is_rejected() {
        let (mut program, ty) = fixture();
        let error = parse(&mut program, ty, "Range(1, 2, 3)").unwrap_err();
        assert!(matches!(
            error.kind,
            ErrorKind::ArgumentsDoNotMatchMethodParameters { .. }
        ));
    }

    #[test]
    fn mutable_wrapper_constructor_instantiates() {
        let (mut program, ty) = fixture();
        let expression = parse_ok(&mut program, ty, "Mutable(5)");
        assert_eq!(program.get_type(expression.return_type).name, "Mutable(Number)");
    }

    #[test]
    fn conditional_expression_types_from_then_branch() {
        let (mut program, ty) = fixture();
        let expression = parse_ok(&mut program, ty, "true ? 1 else 2");
        assert_eq!(expression.return_type, program.base_type("Number"));
        assert_eq!(expression.to_string(), "true ? 1 else 2");
    }

    #[test]
    fn conditional_branch_mismatch_is_rejected() {
        let (mut program, ty) = fixture();
        let error = parse(&mut program, ty, "true ? 1 else \"x\"").unwrap_err();
        assert_eq!(
            error.kind,
            ErrorKind::ConditionalBranchMismatch {
                then: "Number".into(),
                otherwise: "Text".into(),
            }
        );
    }

    #[test]
    fn conditional_condition_must_be_boolean() {
        let (mut program, ty) = fixture();
        let error = parse(&mut program, ty, "1 ? 2 else 3").unwrap_err();
        assert_eq!(error.kind, ErrorKind::ConditionMustBeBoolean("Number".into()));
    }

    #[test]
    fn nested_conditionals_are_rejected() {
        let (mut program, ty) = fixture();
        let error = parse(&mut program, ty, "true ? 1 else false ? 2 else 3").unwrap_err();
        assert_eq!(error.kind, ErrorKind::NestedConditional);
    }

    #[test]
    fn display_parenthesizes_looser_children() {
        let (mut program, ty) = fixture();
        let expression = parse_ok(&mut program, ty, "2 * (3 + 4)");
        assert_eq!(expression.to_string(), "2 * (3 + 4)");
        let expression = parse_ok(&mut program, ty, "not (true and false)");
        assert_eq!(expression.to_string(), "not (true and false)");
    }

    #[test]
    fn rendered_expressions_reparse_equal() {
        let (mut program, ty) = fixture();
        for text in [
            "1 + 2 * 3",
            "(1 + 2) * 3",
            "number is not 5",
            "not (true and false)",
            "(1, 2, 3).Contains(number)",
            "Range(0, number).Length",
            "\"count \" + number",
            "true ? 1 else 2",
        ] {
            let expression = parse_ok(&mut program, ty, text);
            let rendered = expression.to_string();
            let reparsed = parse_ok(&mut program, ty, &rendered);
            assert_eq!(expression, reparsed, "round trip changed {text}");
            assert_eq!(rendered, reparsed.to_string());
        }
    }

    proptest::proptest! {
        #[test]
        fn random_arithmetic_round_trips(
            a in -999i32..999,
            b in 0u32..999,
            c in 0u32..999,
            first in proptest::sample::select(vec!["+", "-", "*", "/", "%"]),
            second in proptest::sample::select(vec!["+", "-", "*", "/", "%"]),
            grouped in proptest::bool::ANY,
        ) {
            let (mut program, ty) = fixture();
            let text = if grouped {
                format!("({a} {first} {b}) {second} {c}")
            } else {
                format!("{a} {first} {b} {second} {c}")
            };
            let expression = parse_ok(&mut program, ty, &text);
            let rendered = expression.to_string();
            let reparsed = parse_ok(&mut program, ty, &rendered);
            proptest::prop_assert_eq!(&expression, &reparsed);
            proptest::prop_assert_eq!(rendered, reparsed.to_string());
        }
    }
}
