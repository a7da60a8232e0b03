// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Hard structural limits enforced during parsing.
//!
//! Each check returns the [`ErrorKind`] to raise so callers can attach the
//! offending line. The limits below are the complete list; there is no
//! configuration surface for them.

use crate::error::ErrorKind;

/// Maximum number of members a type may declare.
pub const MAX_MEMBER_COUNT: usize = 50;
/// Maximum number of lines in a type's source file.
pub const MAX_LINE_COUNT: usize = 256;
/// Maximum number of methods a type may define.
pub const MAX_METHOD_COUNT: usize = 15;
/// Maximum number of characters in a single line.
pub const MAX_LINE_LENGTH: usize = 120;
/// Maximum nesting depth of parenthesized expressions.
pub const MAX_EXPRESSION_NESTING: usize = 5;
/// Maximum number of lines in a method body.
pub const MAX_METHOD_BODY_LINES: usize = 12;
/// Maximum number of parameters a method may take.
pub const MAX_PARAMETER_COUNT: usize = 3;

pub(crate) fn check_member_count(count: usize) -> Result<(), ErrorKind> {
    if count > MAX_MEMBER_COUNT {
        return Err(ErrorKind::TooManyMembers(count));
    }
    Ok(())
}

pub(crate) fn check_line_count(count: usize) -> Result<(), ErrorKind> {
    if count > MAX_LINE_COUNT {
        return Err(ErrorKind::TooManyLines(count));
    }
    Ok(())
}

pub(crate) fn check_method_count(count: usize) -> Result<(), ErrorKind> {
    if count > MAX_METHOD_COUNT {
        return Err(ErrorKind::TooManyMethods(count));
    }
    Ok(())
}

pub(crate) fn check_line_length(length: usize) -> Result<(), ErrorKind> {
    if length > MAX_LINE_LENGTH {
        return Err(ErrorKind::LineTooLong(length));
    }
    Ok(())
}

pub(crate) fn check_expression_nesting(depth: usize) -> Result<(), ErrorKind> {
    if depth > MAX_EXPRESSION_NESTING {
        return Err(ErrorKind::NestingTooDeep(depth));
    }
    Ok(())
}

pub(crate) fn check_method_body_lines(count: usize) -> Result<(), ErrorKind> {
    if count > MAX_METHOD_BODY_LINES {
        return Err(ErrorKind::MethodBodyTooLong(count));
    }
    Ok(())
}

pub(crate) fn check_parameter_count(count: usize) -> Result<(), ErrorKind> {
    if count > MAX_PARAMETER_COUNT {
        return Err(ErrorKind::TooManyParameters(count));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_accept_the_boundary_value() {
        assert!(check_member_count(MAX_MEMBER_COUNT).is_ok());
        assert!(check_line_count(MAX_LINE_COUNT).is_ok());
        assert!(check_method_count(MAX_METHOD_COUNT).is_ok());
        assert!(check_line_length(MAX_LINE_LENGTH).is_ok());
        assert!(check_expression_nesting(MAX_EXPRESSION_NESTING).is_ok());
        assert!(check_method_body_lines(MAX_METHOD_BODY_LINES).is_ok());
        assert!(check_parameter_count(MAX_PARAMETER_COUNT).is_ok());
    }

    #[test]
    fn limits_reject_one_past_the_boundary() {
        assert_eq!(
            check_member_count(MAX_MEMBER_COUNT + 1),
            Err(ErrorKind::TooManyMembers(51))
        );
        assert_eq!(
            check_line_count(MAX_LINE_COUNT + 1),
            Err(ErrorKind::TooManyLines(257))
        );
        assert_eq!(
            check_method_count(MAX_METHOD_COUNT + 1),
            Err(ErrorKind::TooManyMethods(16))
        );
        assert_eq!(
            check_line_length(MAX_LINE_LENGTH + 1),
            Err(ErrorKind::LineTooLong(121))
        );
        assert_eq!(
            check_expression_nesting(MAX_EXPRESSION_NESTING + 1),
            Err(ErrorKind::NestingTooDeep(6))
        );
        assert_eq!(
            check_method_body_lines(MAX_METHOD_BODY_LINES + 1),
            Err(ErrorKind::MethodBodyTooLong(13))
        );
        assert_eq!(
            check_parameter_count(MAX_PARAMETER_COUNT + 1),
            Err(ErrorKind::TooManyParameters(4))
        );
    }
}
