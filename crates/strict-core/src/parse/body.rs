// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The body pre-parser.
//!
//! Groups a method's raw lines into a tree of [`PreBody`] nodes by tab
//! depth, without touching the line contents. Expression parsing happens
//! later, on first body access; this split is what makes lazy per-method
//! parsing possible.
//!
//! A line one tab deeper than the current body opens a child body; a jump
//! of more than one tab, a depth outside 1..3, or space indentation is
//! rejected here.

use crate::error::{ErrorKind, ErrorScope, Result};
use crate::types::SourceLine;

/// Deepest allowed body indentation.
const MAX_BODY_TABS: usize = 3;

/// A pre-parsed body: same-depth lines and child bodies, in source order.
#[derive(Debug, Clone)]
pub(crate) struct PreBody {
    pub tabs: usize,
    pub items: Vec<PreItem>,
    pub start_line: usize,
    pub end_line: usize,
}

/// One entry of a pre-parsed body.
#[derive(Debug, Clone)]
pub(crate) enum PreItem {
    Line(SourceLine),
    Body(PreBody),
}

/// Groups `lines` into a body tree rooted at depth `tabs`.
///
/// The caller guarantees `lines` is non-empty; the first line must sit at
/// exactly `tabs` tabs.
pub(crate) fn pre_parse(lines: &[SourceLine], tabs: usize, scope: &ErrorScope) -> Result<PreBody> {
    let first = lines.first().expect("body pre-parse needs lines");
    if first.tabs() != tabs {
        return Err(scope.at(
            first.number,
            &first.text,
            ErrorKind::InvalidIndentation { tabs: first.tabs() },
        ));
    }
    let mut position = 0;
    let body = parse_at(lines, &mut position, tabs, scope)?;
    debug_assert_eq!(position, lines.len(), "pre-parse consumes every line");
    Ok(body)
}

fn parse_at(
    lines: &[SourceLine],
    position: &mut usize,
    tabs: usize,
    scope: &ErrorScope,
) -> Result<PreBody> {
    let start_line = lines[*position].number;
    let mut end_line = start_line;
    let mut items = Vec::new();
    while let Some(line) = lines.get(*position) {
        let depth = line.tabs();
        if depth < tabs {
            break;
        }
        if depth == tabs {
            end_line = line.number;
            items.push(PreItem::Line(line.clone()));
            *position += 1;
            continue;
        }
        if depth != tabs + 1 || depth > MAX_BODY_TABS {
            return Err(scope.at(
                line.number,
                &line.text,
                ErrorKind::InvalidIndentation { tabs: depth },
            ));
        }
        let child = parse_at(lines, position, tabs + 1, scope)?;
        end_line = child.end_line;
        items.push(PreItem::Body(child));
    }
    Ok(PreBody {
        tabs,
        items,
        start_line,
        end_line,
    })
}
