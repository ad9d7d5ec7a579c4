use std::collections::HashSet;

use swc_core::{
    common::{util::take::Take, Span, Spanned, SyntaxContext, DUMMY_SP},
    ecma::{
        ast::*,
        visit::{Visit, VisitMut, VisitMutWith, VisitWith},
    },
};
use tracing::debug;

use crate::{
    config::Config,
    label::{self, Restore, Wrapped},
    marks::MarkSet,
    skip::{self, Rule, Site},
    wrap::{self, WrapBuilder},
};

// -----------------------------------------------------------------------------
// Entry
// -----------------------------------------------------------------------------

/// Instrument every marked construct in `program`.
///
/// `marks` comes from [`crate::marks::strip_marks`] run on the same program.
pub fn rewrite(program: &mut Program, config: &Config, marks: MarkSet) {
    let mut transform = HashpTransform::new(config, marks, program);
    program.visit_mut_with(&mut transform);
    transform.finish();
}

// -----------------------------------------------------------------------------
// Transform state
// -----------------------------------------------------------------------------

pub struct HashpTransform {
    builder: WrapBuilder,
    marks: MarkSet,
    wrapped: Wrapped,
    names: UsedNames,

    // Slot the next visited expression sits in.
    site: Site,
    // Diagnostics to insert before the statement being visited.
    pending: Vec<Stmt>,
}

impl HashpTransform {
    pub fn new(config: &Config, marks: MarkSet, program: &Program) -> Self {
        Self {
            builder: WrapBuilder::new(config),
            marks,
            wrapped: Wrapped::default(),
            names: UsedNames::collect(program),
            site: Site::Reference,
            pending: vec![],
        }
    }

    pub fn finish(self) {
        let remaining = self.marks.remaining();
        if remaining > 0 {
            debug!(remaining, "markers in unsupported positions were stripped only");
        }
    }

    // ---------- driver helpers ----------

    /// Visit `node` with the next expression treated as sitting in `site`.
    fn visit_at<N: VisitMutWith<Self>>(&mut self, site: Site, node: &mut N) {
        self.site = site;
        node.visit_mut_with(self);
        self.site = Site::Reference;
    }

    fn wrap(&mut self, expr: Box<Expr>, label: &str, span: Span, restore: Restore) -> Expr {
        self.wrapped.record(span, restore);
        self.builder.wrap(expr, label, span)
    }

    // ---------- expression rules ----------

    /// Instrument `expr` if it is a marked name, a member access with a
    /// marked property, or a call-form application.
    fn instrument(&mut self, expr: &mut Expr) -> bool {
        self.wrap_name(expr) || self.wrap_member(expr) || self.wrap_call_form(expr)
    }

    fn wrap_name(&mut self, expr: &mut Expr) -> bool {
        let (span, label) = match &*expr {
            Expr::Ident(i) if self.marks.take_name(i.span) => (i.span, i.sym.to_string()),
            _ => return false,
        };
        let value = match expr.take() {
            Expr::Ident(i) => wrap::name_expr(i),
            other => Box::new(other),
        };
        debug!(%label, "wrapped marked name");
        *expr = self.wrap(value, &label, span, Restore::Bare);
        true
    }

    fn wrap_member(&mut self, expr: &mut Expr) -> bool {
        let (span, label) = match &*expr {
            Expr::Member(MemberExpr {
                span,
                prop: MemberProp::Ident(prop),
                ..
            }) if self.marks.take_name(prop.span) => (*span, prop.sym.to_string()),
            _ => return false,
        };
        let value = Box::new(expr.take());
        debug!(%label, "wrapped member access with marked property");
        *expr = self.wrap(value, &label, span, Restore::Bare);
        true
    }

    fn wrap_call_form(&mut self, expr: &mut Expr) -> bool {
        let Expr::Call(call) = expr else {
            return false;
        };
        if !self.marks.take_call(call.span) {
            return false;
        }
        let span = call.span;
        let label = label::of_call_form(&call.args, &self.wrapped);
        let mut args: Vec<Box<Expr>> = call.args.drain(..).map(|a| a.expr).collect();
        let value = match args.len() {
            0 => wrap::undefined(),
            1 => args.remove(0),
            _ => Box::new(Expr::Seq(SeqExpr {
                span: DUMMY_SP,
                exprs: args,
            })),
        };
        debug!(%label, "wrapped call-form marker");
        *expr = self.wrap(value, &label, span, Restore::Paren);
        true
    }

    /// Return arguments and arrow bodies instrument call-forms only. A marked
    /// name there is renamed.
    fn call_form_only(&mut self, expr: &mut Expr) {
        if !self.wrap_call_form(expr) {
            self.rename_only(expr);
        }
    }

    /// Consume the mark on a name without instrumenting it.
    fn rename_only(&mut self, expr: &Expr) {
        let span = match expr {
            Expr::Ident(i) => i.span,
            Expr::Member(MemberExpr {
                prop: MemberProp::Ident(p),
                ..
            }) => p.span,
            _ => return,
        };
        if self.marks.take_name(span) {
            debug!("marker on call or assignment target renamed only");
        }
    }

    // ---------- binding rules ----------

    /// Marked bindings introduced by `node`, consumed from the mark set.
    fn marked_bindings<N>(&mut self, node: &N) -> Vec<Ident>
    where
        N: VisitWith<MarkedBindings>,
    {
        let mut collector = MarkedBindings {
            marks: std::mem::take(&mut self.marks),
            found: vec![],
        };
        node.visit_with(&mut collector);
        self.marks = collector.marks;
        collector.found
    }

    fn binding_logs<N>(&mut self, node: &N) -> Vec<Stmt>
    where
        N: VisitWith<MarkedBindings>,
    {
        self.marked_bindings(node)
            .into_iter()
            .map(|id| {
                let label = id.sym.clone();
                debug!(%label, "logging marked binding");
                self.builder.log_stmt(&label, Box::new(Expr::Ident(id)))
            })
            .collect()
    }

    /// Put parameter diagnostics at the top of `body`, after any directives.
    fn prepend_to_body(body: &mut BlockStmt, logs: Vec<Stmt>) {
        if logs.is_empty() {
            return;
        }
        let at = body
            .stmts
            .iter()
            .take_while(|s| {
                matches!(s, Stmt::Expr(ExprStmt { expr, .. }) if matches!(&**expr, Expr::Lit(Lit::Str(_))))
            })
            .count();
        let rest = body.stmts.split_off(at);
        body.stmts.extend(logs);
        body.stmts.extend(rest);
    }

    // ---------- declarations ----------

    /// Rewrite one statement-level `var`/`let`/`const` declaration.
    fn rewrite_var_decl(&mut self, var: Box<VarDecl>) -> Vec<Emitted> {
        if var.declare {
            return vec![Emitted::Decl(var)];
        }
        let VarDecl {
            span,
            ctxt,
            kind,
            declare,
            decls,
        } = *var;
        let rebuild = |decls: Vec<VarDeclarator>| {
            Box::new(VarDecl {
                span,
                ctxt,
                kind,
                declare,
                decls,
            })
        };

        let mut out = vec![];
        let mut chunk = vec![];
        let mut logs = vec![];
        for decl in decls {
            match self.split_object_pattern(decl, kind) {
                Ok(sequence) => {
                    if !chunk.is_empty() {
                        out.push(Emitted::Decl(rebuild(std::mem::take(&mut chunk))));
                    }
                    out.extend(logs.drain(..).map(Emitted::Log));
                    out.extend(sequence);
                }
                Err(decl) => {
                    logs.extend(self.binding_logs(&decl.name));
                    chunk.push(decl);
                }
            }
        }
        if !chunk.is_empty() {
            out.push(Emitted::Decl(rebuild(chunk)));
        }
        out.extend(logs.into_iter().map(Emitted::Log));
        out
    }

    /// `const { #p x, y } = init` becomes
    ///
    /// ```js
    /// const _temp = init;
    /// const x = _temp.x;
    /// const y = _temp.y;
    /// console.log("#p x => ", x);
    /// ```
    ///
    /// Declarators without a marked top-level property are handed back.
    fn split_object_pattern(
        &mut self,
        decl: VarDeclarator,
        kind: VarDeclKind,
    ) -> Result<Vec<Emitted>, VarDeclarator> {
        let VarDeclarator {
            span,
            name,
            init,
            definite,
        } = decl;
        let (pat, init) = match (name, init) {
            (Pat::Object(pat), Some(init))
                if pat.props.iter().any(|p| self.is_marked_simple_prop(p)) =>
            {
                (pat, init)
            }
            (name, init) => {
                return Err(VarDeclarator {
                    span,
                    name,
                    init,
                    definite,
                })
            }
        };

        let temp = self.names.fresh("temp");
        let mut out = vec![Emitted::Temp(var_decl(
            kind,
            Pat::Ident(BindingIdent {
                id: temp.clone(),
                type_ann: pat.type_ann.clone(),
            }),
            init,
        ))];
        let mut logs = vec![];
        let has_rest = pat.props.iter().any(|p| matches!(p, ObjectPatProp::Rest(_)));

        if has_rest {
            // The rest object has to exclude every listed key, so keep the
            // pattern whole.
            let residual = Pat::Object(ObjectPat { type_ann: None, ..pat });
            logs.extend(self.binding_logs(&residual));
            out.push(Emitted::Decl(var_decl(kind, residual, ident_expr(&temp))));
        } else {
            // Properties are read in source order. Runs of properties that
            // are not simple bindings stay together as a residual pattern.
            let mut residual = vec![];
            for prop in pat.props {
                match simple_binding(prop) {
                    Ok((key, binding, marked_key)) => {
                        self.flush_residual(&mut residual, kind, &temp, &mut out, &mut logs);
                        let marked_binding = self.marks.take_name(binding.id.span);
                        let marked_key = marked_key.map(|s| self.marks.take_name(s)).unwrap_or(false);
                        if marked_binding || marked_key {
                            logs.push(self.builder.log_stmt(
                                &binding.id.sym,
                                Box::new(Expr::Ident(binding.id.clone())),
                            ));
                        }
                        let init = Box::new(Expr::Member(MemberExpr {
                            span: DUMMY_SP,
                            obj: ident_expr(&temp),
                            prop: MemberProp::Ident(key),
                        }));
                        out.push(Emitted::Decl(var_decl(kind, Pat::Ident(binding), init)));
                    }
                    Err(prop) => residual.push(prop),
                }
            }
            self.flush_residual(&mut residual, kind, &temp, &mut out, &mut logs);
        }

        debug!(temp = %temp.sym, logged = logs.len(), "split marked destructuring");
        out.extend(logs.into_iter().map(Emitted::Log));
        Ok(out)
    }

    fn flush_residual(
        &mut self,
        residual: &mut Vec<ObjectPatProp>,
        kind: VarDeclKind,
        temp: &Ident,
        out: &mut Vec<Emitted>,
        logs: &mut Vec<Stmt>,
    ) {
        if residual.is_empty() {
            return;
        }
        let pat = Pat::Object(ObjectPat {
            span: DUMMY_SP,
            props: std::mem::take(residual),
            optional: false,
            type_ann: None,
        });
        logs.extend(self.binding_logs(&pat));
        out.push(Emitted::Decl(var_decl(kind, pat, ident_expr(temp))));
    }

    fn is_marked_simple_prop(&self, prop: &ObjectPatProp) -> bool {
        match prop {
            ObjectPatProp::Assign(AssignPatProp {
                key, value: None, ..
            }) => self.marks.is_name(key.id.span),
            ObjectPatProp::KeyValue(KeyValuePatProp {
                key: PropName::Ident(key),
                value,
            }) => match &**value {
                Pat::Ident(binding) => {
                    self.marks.is_name(key.span) || self.marks.is_name(binding.id.span)
                }
                _ => false,
            },
            _ => false,
        }
    }

    // ---------- statement lists ----------

    fn visit_stmt_item(&mut self, stmt: &mut Stmt) -> Vec<Stmt> {
        let outer = std::mem::take(&mut self.pending);
        stmt.visit_mut_with(self);
        std::mem::replace(&mut self.pending, outer)
    }

    fn visit_module_item(&mut self, item: &mut ModuleItem) -> Vec<Stmt> {
        let outer = std::mem::take(&mut self.pending);
        item.visit_mut_with(self);
        std::mem::replace(&mut self.pending, outer)
    }
}

/// Output of rewriting a declaration statement.
enum Emitted {
    /// Declaration of user-visible bindings (exported if the original was).
    Decl(Box<VarDecl>),
    /// Declaration of an internal temporary.
    Temp(Box<VarDecl>),
    Log(Stmt),
}

impl Emitted {
    fn into_stmt(self) -> Stmt {
        match self {
            Emitted::Decl(v) | Emitted::Temp(v) => Stmt::Decl(Decl::Var(v)),
            Emitted::Log(s) => s,
        }
    }

    fn into_item(self, export: Option<Span>) -> ModuleItem {
        match (self, export) {
            (Emitted::Decl(v), Some(span)) => ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl {
                span,
                decl: Decl::Var(v),
            })),
            (other, _) => ModuleItem::Stmt(other.into_stmt()),
        }
    }
}

fn var_decl(kind: VarDeclKind, name: Pat, init: Box<Expr>) -> Box<VarDecl> {
    Box::new(VarDecl {
        span: DUMMY_SP,
        ctxt: SyntaxContext::empty(),
        kind,
        declare: false,
        decls: vec![VarDeclarator {
            span: DUMMY_SP,
            name,
            init: Some(init),
            definite: false,
        }],
    })
}

fn ident_expr(id: &Ident) -> Box<Expr> {
    Box::new(Expr::Ident(id.clone()))
}

/// Splits a destructuring property of the form `x` or `key: x` into the
/// property name, the bound identifier and (for `key: x`) the key's span.
fn simple_binding(
    prop: ObjectPatProp,
) -> Result<(IdentName, BindingIdent, Option<Span>), ObjectPatProp> {
    match prop {
        ObjectPatProp::Assign(AssignPatProp {
            key, value: None, ..
        }) => Ok((IdentName::new(key.id.sym.clone(), DUMMY_SP), key, None)),
        ObjectPatProp::KeyValue(KeyValuePatProp {
            key: PropName::Ident(key),
            value,
        }) => match *value {
            Pat::Ident(binding) => {
                let key_span = key.span;
                Ok((IdentName::new(key.sym, DUMMY_SP), binding, Some(key_span)))
            }
            other => Err(ObjectPatProp::KeyValue(KeyValuePatProp {
                key: PropName::Ident(key),
                value: Box::new(other),
            })),
        },
        other => Err(other),
    }
}

// -----------------------------------------------------------------------------
// Traversal: children first, then the handler for the node itself
// -----------------------------------------------------------------------------

impl VisitMut for HashpTransform {
    fn visit_mut_module_items(&mut self, items: &mut Vec<ModuleItem>) {
        let mut out = Vec::with_capacity(items.len());
        for mut item in std::mem::take(items) {
            let queued = self.visit_module_item(&mut item);
            out.extend(queued.into_iter().map(ModuleItem::Stmt));
            match item {
                ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) => {
                    out.extend(self.rewrite_var_decl(var).into_iter().map(|e| e.into_item(None)));
                }
                ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl {
                    span,
                    decl: Decl::Var(var),
                })) => {
                    out.extend(
                        self.rewrite_var_decl(var)
                            .into_iter()
                            .map(|e| e.into_item(Some(span))),
                    );
                }
                other => out.push(other),
            }
        }
        *items = out;
    }

    fn visit_mut_stmts(&mut self, stmts: &mut Vec<Stmt>) {
        let mut out = Vec::with_capacity(stmts.len());
        for mut stmt in std::mem::take(stmts) {
            let queued = self.visit_stmt_item(&mut stmt);
            out.extend(queued);
            match stmt {
                Stmt::Decl(Decl::Var(var)) => {
                    out.extend(self.rewrite_var_decl(var).into_iter().map(Emitted::into_stmt));
                }
                other => out.push(other),
            }
        }
        *stmts = out;
    }

    // ---------- generic expression rule ----------

    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        let site = std::mem::replace(&mut self.site, Site::Reference);
        expr.visit_mut_children_with(self);
        match skip::resolve(site) {
            Rule::Wrap => {
                self.instrument(expr);
            }
            Rule::RenameOnly => {
                self.rename_only(expr);
                // `#p (f)(x)`: the call-form is an expression of its own.
                self.wrap_call_form(expr);
            }
            Rule::Dedicated => {}
        }
    }

    fn visit_mut_callee(&mut self, n: &mut Callee) {
        self.site = Site::Callee;
        n.visit_mut_children_with(self);
        self.site = Site::Reference;
    }

    fn visit_mut_update_expr(&mut self, n: &mut UpdateExpr) {
        self.visit_at(Site::AssignTarget, &mut n.arg);
    }

    // ---------- array element / spread ----------

    fn visit_mut_array_lit(&mut self, n: &mut ArrayLit) {
        for elem in n.elems.iter_mut().flatten() {
            self.visit_at(Site::ArrayElement, &mut elem.expr);
            if self.instrument(&mut elem.expr) {
                debug!(spread = elem.spread.is_some(), "instrumented array element");
            }
        }
    }

    // ---------- return statement ----------

    fn visit_mut_return_stmt(&mut self, n: &mut ReturnStmt) {
        self.visit_at(Site::ReturnArg, &mut n.arg);
        if let Some(arg) = &mut n.arg {
            self.call_form_only(arg);
        }
    }

    // ---------- declarator initializer ----------

    fn visit_mut_var_declarator(&mut self, n: &mut VarDeclarator) {
        n.name.visit_mut_with(self);
        self.visit_at(Site::DeclInit, &mut n.init);
        if let Some(init) = &mut n.init {
            self.instrument(init);
        }
    }

    // ---------- functions & parameters ----------

    fn visit_mut_arrow_expr(&mut self, n: &mut ArrowExpr) {
        n.params.visit_mut_with(self);
        match &mut *n.body {
            BlockStmtOrExpr::Expr(body) => {
                self.visit_at(Site::ArrowBody, body);
                self.call_form_only(body);
            }
            BlockStmtOrExpr::BlockStmt(block) => block.visit_mut_with(self),
        }

        let logs = self.binding_logs(&n.params);
        if logs.is_empty() {
            return;
        }
        if let BlockStmtOrExpr::Expr(expr) = &mut *n.body {
            let ret = Stmt::Return(ReturnStmt {
                span: expr.span(),
                arg: Some(expr.take()),
            });
            *n.body = BlockStmtOrExpr::BlockStmt(BlockStmt {
                span: DUMMY_SP,
                stmts: vec![ret],
                ctxt: SyntaxContext::empty(),
            });
        }
        if let BlockStmtOrExpr::BlockStmt(block) = &mut *n.body {
            Self::prepend_to_body(block, logs);
        }
    }

    fn visit_mut_function(&mut self, n: &mut Function) {
        n.visit_mut_children_with(self);
        if n.body.is_none() {
            return;
        }
        let logs = self.binding_logs(&n.params);
        if let Some(body) = &mut n.body {
            Self::prepend_to_body(body, logs);
        }
    }

    fn visit_mut_constructor(&mut self, n: &mut Constructor) {
        n.visit_mut_children_with(self);
        if n.body.is_none() {
            return;
        }
        let logs = self.binding_logs(&n.params);
        if let Some(body) = &mut n.body {
            Self::prepend_to_body(body, logs);
        }
    }

    fn visit_mut_setter_prop(&mut self, n: &mut SetterProp) {
        n.visit_mut_children_with(self);
        if n.body.is_none() {
            return;
        }
        let logs = self.binding_logs(&n.param);
        if let Some(body) = &mut n.body {
            Self::prepend_to_body(body, logs);
        }
    }

    // ---------- object property ----------

    fn visit_mut_prop(&mut self, n: &mut Prop) {
        n.visit_mut_children_with(self);
        match n {
            Prop::KeyValue(KeyValueProp {
                key: PropName::Ident(key),
                value,
            }) if self.marks.take_name(key.span) => {
                let label = key.sym.to_string();
                let span = value.span();
                debug!(%label, "wrapped marked object property");
                **value = self.wrap(value.take(), &label, span, Restore::Bare);
            }
            Prop::Shorthand(ident) if self.marks.take_name(ident.span) => {
                let label = ident.sym.to_string();
                let key = IdentName::new(ident.sym.clone(), ident.span);
                let span = ident.span;
                let value = wrap::name_expr(ident.clone());
                debug!(%label, "wrapped marked shorthand property");
                *n = Prop::KeyValue(KeyValueProp {
                    key: PropName::Ident(key),
                    value: Box::new(self.wrap(value, &label, span, Restore::Bare)),
                });
            }
            Prop::Method(MethodProp {
                key: PropName::Ident(key),
                ..
            })
            | Prop::Getter(GetterProp {
                key: PropName::Ident(key),
                ..
            })
            | Prop::Setter(SetterProp {
                key: PropName::Ident(key),
                ..
            }) if self.marks.take_name(key.span) => {
                debug!(label = %key.sym, "marked property without value");
                let log = self.builder.log_stmt(&key.sym, wrap::undefined());
                self.pending.push(log);
            }
            _ => {}
        }
    }

    // ---------- class field ----------

    fn visit_mut_class_prop(&mut self, n: &mut ClassProp) {
        n.visit_mut_children_with(self);
        let PropName::Ident(key) = &n.key else {
            return;
        };
        if !self.marks.take_name(key.span) {
            return;
        }
        let label = key.sym.to_string();
        match &mut n.value {
            Some(value) => {
                let span = value.span();
                debug!(%label, "wrapped marked class field");
                **value = self.wrap(value.take(), &label, span, Restore::Bare);
            }
            None => debug!(%label, "marked class field without initializer renamed only"),
        }
    }

    // ---------- types carry no runtime values ----------

    fn visit_mut_ts_type(&mut self, _: &mut TsType) {}

    fn visit_mut_ts_interface_decl(&mut self, _: &mut TsInterfaceDecl) {}
}

// -----------------------------------------------------------------------------
// Marked binding collector
// -----------------------------------------------------------------------------

/// Collects the identifiers a pattern binds whose mark is still pending.
/// Default values, computed keys and types are not bindings and are skipped.
struct MarkedBindings {
    marks: MarkSet,
    found: Vec<Ident>,
}

impl Visit for MarkedBindings {
    fn visit_binding_ident(&mut self, n: &BindingIdent) {
        if self.marks.take_name(n.id.span) {
            self.found.push(n.id.clone());
        }
    }

    fn visit_key_value_pat_prop(&mut self, n: &KeyValuePatProp) {
        if let (PropName::Ident(key), Pat::Ident(binding)) = (&n.key, &*n.value) {
            if self.marks.take_name(key.span) {
                self.marks.take_name(binding.id.span);
                self.found.push(binding.id.clone());
                return;
            }
        }
        n.value.visit_with(self);
    }

    fn visit_expr(&mut self, _: &Expr) {}

    fn visit_ts_type_ann(&mut self, _: &TsTypeAnn) {}

    fn visit_decorator(&mut self, _: &Decorator) {}
}

// -----------------------------------------------------------------------------
// Fresh names
// -----------------------------------------------------------------------------

/// Every identifier name in the program, for generating temporaries that
/// cannot collide with user code.
struct UsedNames {
    used: HashSet<String>,
}

impl UsedNames {
    fn collect(program: &Program) -> Self {
        let mut collector = NameCollector { out: HashSet::new() };
        program.visit_with(&mut collector);
        Self { used: collector.out }
    }

    /// `_temp`, then `_temp2`, `_temp3`, ...
    fn fresh(&mut self, base: &str) -> Ident {
        let mut name = format!("_{base}");
        let mut n = 1;
        while self.used.contains(&name) {
            n += 1;
            name = format!("_{base}{n}");
        }
        self.used.insert(name.clone());
        Ident::new(name.into(), DUMMY_SP, SyntaxContext::empty())
    }
}

struct NameCollector {
    out: HashSet<String>,
}

impl Visit for NameCollector {
    fn visit_ident(&mut self, n: &Ident) {
        self.out.insert(n.sym.to_string());
    }
}
