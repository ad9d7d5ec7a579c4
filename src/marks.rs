//! Pre-pass that moves markers out of identifier text into an explicit
//! side-channel.
//!
//! After [`strip_marks`] runs, no identifier carries the reserved prefix
//! any more (apart from call-form callees, which the rewrite replaces), and
//! every marked node is remembered by span in a [`MarkSet`].

use std::collections::HashSet;

use swc_core::{
    common::{BytePos, Span},
    ecma::{
        ast::*,
        visit::{VisitMut, VisitMutWith},
    },
};

#[derive(Debug, Default)]
pub struct MarkSet {
    names: HashSet<Span>,
    calls: HashSet<Span>,
    /// Bare prefixes that neither name anything nor apply to an expression.
    pub dangling: Vec<Span>,
}

impl MarkSet {
    pub fn is_name(&self, span: Span) -> bool {
        self.names.contains(&span)
    }

    /// Consume the mark on a name. Returns `false` if it was not marked or
    /// has already been handled.
    pub fn take_name(&mut self, span: Span) -> bool {
        self.names.remove(&span)
    }

    pub fn take_call(&mut self, span: Span) -> bool {
        self.calls.remove(&span)
    }

    /// Marks no handler has consumed.
    pub fn remaining(&self) -> usize {
        self.names.len() + self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0 && self.dangling.is_empty()
    }
}

/// Strip `prefix` from marked names in `program` and collect the marks.
///
/// With `offsets`, only identifiers starting at one of those positions count
/// as marked (the positions the preprocessor inserted the prefix at). Without
/// it, as in plugin mode where parsing happened elsewhere, every identifier
/// carrying the prefix counts.
pub fn strip_marks(
    program: &mut Program,
    prefix: &str,
    offsets: Option<&HashSet<BytePos>>,
) -> MarkSet {
    let mut stripper = MarkStripper {
        prefix,
        offsets,
        marks: MarkSet::default(),
    };
    program.visit_mut_with(&mut stripper);
    stripper.marks
}

struct MarkStripper<'a> {
    prefix: &'a str,
    offsets: Option<&'a HashSet<BytePos>>,
    marks: MarkSet,
}

impl MarkStripper<'_> {
    fn at_marker(&self, span: Span) -> bool {
        match self.offsets {
            Some(offsets) => offsets.contains(&span.lo),
            None => true,
        }
    }

    /// Returns the stripped name if `sym` is a marked name.
    fn strip(&mut self, sym: &str, span: Span) -> Option<String> {
        let rest = sym.strip_prefix(self.prefix)?;
        if !self.at_marker(span) {
            return None;
        }
        if rest.is_empty() {
            self.marks.dangling.push(span);
            return None;
        }
        if !span.is_dummy() {
            self.marks.names.insert(span);
        }
        Some(rest.to_string())
    }

    fn is_call_form(&self, call: &CallExpr) -> bool {
        match &call.callee {
            Callee::Expr(callee) => match &**callee {
                Expr::Ident(id) => id.sym.as_ref() == self.prefix && self.at_marker(id.span),
                _ => false,
            },
            _ => false,
        }
    }
}

impl VisitMut for MarkStripper<'_> {
    fn visit_mut_call_expr(&mut self, n: &mut CallExpr) {
        if self.is_call_form(n) {
            self.marks.calls.insert(n.span);
            // The bare-prefix callee is replaced wholesale later; only the
            // arguments can carry further markers.
            n.args.visit_mut_with(self);
            return;
        }
        n.visit_mut_children_with(self);
    }

    fn visit_mut_ident(&mut self, n: &mut Ident) {
        if let Some(name) = self.strip(n.sym.as_ref(), n.span) {
            n.sym = name.into();
        }
    }

    fn visit_mut_ident_name(&mut self, n: &mut IdentName) {
        if let Some(name) = self.strip(n.sym.as_ref(), n.span) {
            n.sym = name.into();
        }
    }
}
