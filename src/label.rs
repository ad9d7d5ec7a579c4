//! Display text for marked constructs.

use std::collections::HashMap;

use swc_core::{
    common::{util::take::Take, Span, DUMMY_SP},
    ecma::{
        ast::*,
        codegen::to_code,
        visit::{VisitMut, VisitMutWith},
    },
};

use crate::wrap;

/// Label of a call-form application without arguments (`#p ()`).
pub const EMPTY_CALL: &str = "empty debug call";

/// How an instrumented construct reads in an enclosing label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restore {
    /// The wrapped expression itself (`#p x` reads as `x`).
    Bare,
    /// The wrapped expression in parentheses (`#p (a + b)` reads as `(a + b)`).
    Paren,
}

/// Instrumented constructs created so far, by the span of their call.
///
/// A wrapper around a wrapped value reuses the value's span, so one span can
/// carry several wrappers. They are kept innermost first.
#[derive(Debug, Default)]
pub struct Wrapped(HashMap<Span, Vec<Restore>>);

impl Wrapped {
    pub fn record(&mut self, span: Span, restore: Restore) {
        if !span.is_dummy() {
            self.0.entry(span).or_default().push(restore);
        }
    }

    /// Restore mode of the wrapper `depth` levels below the outermost one
    /// at `span`.
    fn get(&self, span: Span, depth: usize) -> Option<Restore> {
        self.0.get(&span)?.iter().rev().nth(depth).copied()
    }
}

/// Label of a call-form application: its argument list, re-printed.
pub fn of_call_form(args: &[ExprOrSpread], wrapped: &Wrapped) -> String {
    if args.is_empty() {
        return EMPTY_CALL.to_string();
    }
    let parts: Vec<String> = args
        .iter()
        .map(|arg| {
            let text = render(&arg.expr, wrapped);
            if arg.spread.is_some() {
                format!("...{text}")
            } else {
                text
            }
        })
        .collect();
    format!("({})", parts.join(", "))
}

/// Re-print `expr`, showing nested instrumented constructs as the source
/// they replaced.
pub fn render(expr: &Expr, wrapped: &Wrapped) -> String {
    let mut expr = expr.clone();
    expr.visit_mut_with(&mut Unwrap { wrapped });
    to_code(&expr)
}

struct Unwrap<'a> {
    wrapped: &'a Wrapped,
}

impl VisitMut for Unwrap<'_> {
    fn visit_mut_expr(&mut self, n: &mut Expr) {
        let mut depth = 0;
        let mut last = None;
        while let Expr::Call(call) = n {
            if !wrap::is_wrapper(call) {
                break;
            }
            if last != Some(call.span) {
                depth = 0;
                last = Some(call.span);
            }
            let Some(restore) = self.wrapped.get(call.span, depth) else {
                break;
            };
            depth += 1;
            let inner = call.args[0].expr.take();
            *n = match restore {
                Restore::Bare => *inner,
                Restore::Paren => match *inner {
                    // already parenthesized by the wrap builder
                    paren @ Expr::Paren(_) => paren,
                    other => Expr::Paren(ParenExpr {
                        span: DUMMY_SP,
                        expr: Box::new(other),
                    }),
                },
            };
        }
        n.visit_mut_children_with(self);
    }
}
