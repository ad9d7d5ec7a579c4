use swc_core::{
    common::{Span, SyntaxContext, DUMMY_SP},
    ecma::{ast::*, utils::ExprFactory},
};

use crate::config::Config;

/// Builds the diagnostic call and the instrumented replacement expression.
pub struct WrapBuilder {
    message_prefix: String,
    logger: Vec<String>,
}

impl WrapBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            message_prefix: config.message_prefix(),
            logger: config.logger.split('.').map(str::to_string).collect(),
        }
    }

    fn logger_callee(&self) -> Box<Expr> {
        let mut segments = self.logger.iter();
        let root = segments.next().map(String::as_str).unwrap_or("console");
        let mut callee = Box::new(Expr::Ident(Ident::new(
            root.into(),
            DUMMY_SP,
            SyntaxContext::empty(),
        )));
        for seg in segments {
            callee = Box::new(Expr::Member(MemberExpr {
                span: DUMMY_SP,
                obj: callee,
                prop: MemberProp::Ident(IdentName::new(seg.as_str().into(), DUMMY_SP)),
            }));
        }
        callee
    }

    /// `console.log("#p <label> => ", <value>)`
    pub fn log_call(&self, label: &str, value: Box<Expr>) -> Expr {
        let message = format!("{}{} => ", self.message_prefix, label);
        Expr::Call(CallExpr {
            span: DUMMY_SP,
            callee: self.logger_callee().as_callee(),
            args: vec![
                Expr::Lit(Lit::Str(Str {
                    span: DUMMY_SP,
                    value: message.into(),
                    raw: None,
                }))
                .as_arg(),
                value.as_arg(),
            ],
            type_args: None,
            ctxt: SyntaxContext::empty(),
        })
    }

    pub fn log_stmt(&self, label: &str, value: Box<Expr>) -> Stmt {
        Stmt::Expr(ExprStmt {
            span: DUMMY_SP,
            expr: Box::new(self.log_call(label, value)),
        })
    }

    /// `((value) => { console.log("#p <label> => ", value); return value; })(<expr>)`
    ///
    /// `expr` ends up as the only call argument, so it is evaluated exactly
    /// once and before the diagnostic. The call keeps `span` so label
    /// rendering can find the construct again.
    pub fn wrap(&self, expr: Box<Expr>, label: &str, span: Span) -> Expr {
        let param = Ident::new(PARAM.into(), DUMMY_SP, SyntaxContext::empty());
        let body = BlockStmt {
            span: DUMMY_SP,
            stmts: vec![
                self.log_stmt(label, Box::new(Expr::Ident(param.clone()))),
                Stmt::Return(ReturnStmt {
                    span: DUMMY_SP,
                    arg: Some(Box::new(Expr::Ident(param.clone()))),
                }),
            ],
            ctxt: SyntaxContext::empty(),
        };
        let arrow = Expr::Arrow(ArrowExpr {
            span: DUMMY_SP,
            params: vec![Pat::Ident(BindingIdent {
                id: param,
                type_ann: None,
            })],
            body: Box::new(BlockStmtOrExpr::BlockStmt(body)),
            is_async: false,
            is_generator: false,
            type_params: None,
            return_type: None,
            ctxt: SyntaxContext::empty(),
        });
        Expr::Call(CallExpr {
            span,
            callee: paren(Box::new(arrow)).as_callee(),
            args: vec![single_arg(expr).as_arg()],
            type_args: None,
            ctxt: SyntaxContext::empty(),
        })
    }
}

const PARAM: &str = "value";

/// Whether `call` has the shape [`WrapBuilder::wrap`] produces.
pub fn is_wrapper(call: &CallExpr) -> bool {
    let Callee::Expr(callee) = &call.callee else {
        return false;
    };
    let Expr::Paren(ParenExpr { expr, .. }) = &**callee else {
        return false;
    };
    match &**expr {
        Expr::Arrow(arrow) => {
            call.args.len() == 1
                && matches!(arrow.params.as_slice(), [Pat::Ident(p)] if p.id.sym.as_ref() == PARAM)
        }
        _ => false,
    }
}

fn paren(expr: Box<Expr>) -> Expr {
    Expr::Paren(ParenExpr {
        span: DUMMY_SP,
        expr,
    })
}

/// A comma sequence would otherwise be printed as several arguments.
fn single_arg(expr: Box<Expr>) -> Box<Expr> {
    if matches!(*expr, Expr::Seq(_)) {
        Box::new(paren(expr))
    } else {
        expr
    }
}

/// Expression denoted by a stripped marker name.
///
/// `#p 4` and `#p this` reach the tree as identifiers named `4` and `this`;
/// they are turned back into the literal or `this` they spell.
pub fn name_expr(ident: Ident) -> Box<Expr> {
    let span = ident.span;
    let name = ident.sym.as_ref();
    let expr = match name {
        "this" => Expr::This(ThisExpr { span }),
        "true" | "false" => Expr::Lit(Lit::Bool(Bool {
            span,
            value: name == "true",
        })),
        "null" => Expr::Lit(Lit::Null(Null { span })),
        _ if name.starts_with(|c: char| c.is_ascii_digit()) => match parse_number(name) {
            Some(value) => Expr::Lit(Lit::Num(Number {
                span,
                value,
                raw: Some(name.into()),
            })),
            None => Expr::Ident(ident),
        },
        _ => Expr::Ident(ident),
    };
    Box::new(expr)
}

fn parse_number(raw: &str) -> Option<f64> {
    let digits = raw.replace('_', "");
    let lower = digits.to_ascii_lowercase();
    let radix = |prefix: &str, radix: u32| {
        lower
            .strip_prefix(prefix)
            .and_then(|d| u64::from_str_radix(d, radix).ok())
            .map(|v| v as f64)
    };
    radix("0x", 16)
        .or_else(|| radix("0o", 8))
        .or_else(|| radix("0b", 2))
        .or_else(|| digits.parse::<f64>().ok())
}

pub fn undefined() -> Box<Expr> {
    Box::new(Expr::Ident(Ident::new(
        "undefined".into(),
        DUMMY_SP,
        SyntaxContext::empty(),
    )))
}
