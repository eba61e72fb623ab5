// Parser for kernel definition bodies.
//
// Parses a token stream (from the lexer) into a single `FnDef` using chumsky
// combinators. Block structure arrives pre-tokenized as Indent/Dedent pairs,
// so the grammar itself is context-free.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns an AST plus any parse errors (non-fatal).
// Failure modes: syntax errors produce `Rich` diagnostics; parsing continues.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::lexer::Token;

/// Result of parsing: AST plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub def: Option<FnDef>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse a kernel definition string. Lexes then parses.
///
/// Returns the `def` (if parsing succeeded) plus any errors.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    // Convert lexer output to chumsky stream.
    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = fndef_parser(source);
    let (def, parse_errors) = parser.parse(stream).into_output_errors();

    // Merge lex errors + parse errors.
    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Rich::custom(span, e.message)
        })
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        def,
        errors: all_errors,
    }
}

// ── Main parser builder ──
//
// All grammar rules are built inside `fndef_parser` so that the `source`
// reference is captured once and shared by all combinators.

fn fndef_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, FnDef, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    // ── Identifier ──

    let ident = just(Token::Ident).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        Ident {
            name: source[span.start()..span.end()].to_string(),
            span,
        }
    });

    // ── Expression grammar ──
    //
    // ternary > comparison (single, non-associative) > add/sub > mul >
    // postfix (subscript, call) > atom.

    let expr = recursive(|expr| {
        let int = select! {
            Token::Int(n) = e => Expr { kind: ExprKind::Int(n), span: e.span() },
        };

        // Unary minus is a literal negation only; `-name` is not grammar.
        let neg_int = just(Token::Minus)
            .ignore_then(select! { Token::Int(n) => n })
            .map_with(|n, e| Expr {
                kind: ExprKind::Int(-n),
                span: e.span(),
            });

        let boolean = select! {
            Token::True = e => Expr { kind: ExprKind::Bool(true), span: e.span() },
            Token::False = e => Expr { kind: ExprKind::Bool(false), span: e.span() },
        };

        let name = ident.clone().map(|id| Expr {
            kind: ExprKind::Name(id.name),
            span: id.span,
        });

        let paren = expr
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        let atom = int.or(boolean).or(name).or(paren);

        // ── Postfix: subscripts and calls ──

        enum Postfix {
            Index(Expr),
            Call(Vec<Expr>),
        }

        let index = expr
            .clone()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map(Postfix::Index);

        let call_args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map(Postfix::Call);

        let postfix = atom.foldl_with(index.or(call_args).repeated(), |base, op, e| {
            let span: SimpleSpan = e.span();
            match op {
                Postfix::Index(ix) => Expr {
                    kind: ExprKind::Subscript {
                        base: Box::new(base),
                        index: Box::new(ix),
                    },
                    span,
                },
                Postfix::Call(args) => Expr {
                    kind: ExprKind::Call {
                        callee: Box::new(base),
                        args,
                    },
                    span,
                },
            }
        });

        let factor = neg_int.or(postfix);

        // ── Arithmetic ──

        let mul_op = just(Token::Star).to(BinOp::Mul);
        let term = factor
            .clone()
            .foldl_with(mul_op.then(factor).repeated(), |lhs, (op, rhs), e| Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span: e.span(),
            });

        let add_op = just(Token::Plus)
            .to(BinOp::Add)
            .or(just(Token::Minus).to(BinOp::Sub));
        let arith = term
            .clone()
            .foldl_with(add_op.then(term).repeated(), |lhs, (op, rhs), e| Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span: e.span(),
            });

        // ── Comparison: at most one operator, non-associative ──

        let cmp_op = select! {
            Token::Lt => CmpOp::Lt,
            Token::Gt => CmpOp::Gt,
            Token::Le => CmpOp::Le,
            Token::Ge => CmpOp::Ge,
            Token::EqEq => CmpOp::Eq,
            Token::Ne => CmpOp::Ne,
        };

        let comparison = arith
            .clone()
            .then(cmp_op.then(arith).or_not())
            .map_with(|(lhs, rest), e| match rest {
                Some((op, rhs)) => Expr {
                    kind: ExprKind::Compare {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    span: e.span(),
                },
                None => lhs,
            });

        // ── Ternary: `body if test else orelse` ──

        comparison
            .clone()
            .then(
                just(Token::If)
                    .ignore_then(comparison)
                    .then_ignore(just(Token::Else))
                    .then(expr.clone())
                    .or_not(),
            )
            .map_with(|(body, rest), e| match rest {
                Some((test, orelse)) => Expr {
                    kind: ExprKind::Ternary {
                        test: Box::new(test),
                        body: Box::new(body),
                        orelse: Box::new(orelse),
                    },
                    span: e.span(),
                },
                None => body,
            })
    });

    // ── Statements ──

    let stmt = recursive(|stmt| {
        let block = just(Token::Newline)
            .ignore_then(just(Token::Indent))
            .ignore_then(stmt.clone().repeated().at_least(1).collect::<Vec<_>>())
            .then_ignore(just(Token::Dedent));

        let for_stmt = just(Token::For)
            .ignore_then(ident.clone())
            .then_ignore(just(Token::In))
            .then_ignore(just(Token::Range))
            .then(
                expr.clone()
                    .separated_by(just(Token::Comma))
                    .at_least(1)
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .then_ignore(just(Token::Colon))
            .then(block.clone())
            .map_with(|((var, bounds), body), e| Stmt {
                kind: StmtKind::For { var, bounds, body },
                span: e.span(),
            });

        let while_stmt = just(Token::While)
            .ignore_then(expr.clone())
            .then_ignore(just(Token::Colon))
            .then(block.clone())
            .map_with(|(test, body), e| Stmt {
                kind: StmtKind::While { test, body },
                span: e.span(),
            });

        let if_stmt = just(Token::If)
            .ignore_then(expr.clone())
            .then_ignore(just(Token::Colon))
            .then(block.clone())
            .then(
                just(Token::Else)
                    .ignore_then(just(Token::Colon))
                    .ignore_then(block.clone())
                    .or_not(),
            )
            .map_with(|((test, then_body), else_body), e| Stmt {
                kind: StmtKind::If {
                    test,
                    then_body,
                    else_body: else_body.unwrap_or_default(),
                },
                span: e.span(),
            });

        // Assignment target: a name with zero or more subscripts.
        let target = {
            let base = ident.clone().map(|id| Expr {
                kind: ExprKind::Name(id.name),
                span: id.span,
            });
            let index = expr
                .clone()
                .delimited_by(just(Token::LBracket), just(Token::RBracket));
            base.foldl_with(index.repeated(), |b, ix, e| Expr {
                kind: ExprKind::Subscript {
                    base: Box::new(b),
                    index: Box::new(ix),
                },
                span: e.span(),
            })
        };

        enum Rhs {
            Plain(Expr),
            Aug(AugOp, Expr),
        }

        let aug_op = select! {
            Token::PlusAssign => AugOp::Add,
            Token::MinusAssign => AugOp::Sub,
            Token::StarAssign => AugOp::Mul,
        };

        let rhs = just(Token::Assign)
            .ignore_then(expr.clone())
            .map(Rhs::Plain)
            .or(aug_op.then(expr.clone()).map(|(op, v)| Rhs::Aug(op, v)));

        let simple = target
            .then(rhs)
            .then_ignore(just(Token::Newline))
            .map_with(|(target, rhs), e| match rhs {
                Rhs::Plain(value) => Stmt {
                    kind: StmtKind::Assign { target, value },
                    span: e.span(),
                },
                Rhs::Aug(op, value) => Stmt {
                    kind: StmtKind::AugAssign { target, op, value },
                    span: e.span(),
                },
            });

        for_stmt.or(while_stmt).or(if_stmt).or(simple)
    });

    // ── Definition: `def name(params): block` ──

    let params = ident
        .clone()
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LParen), just(Token::RParen));

    let def_block = just(Token::Newline)
        .ignore_then(just(Token::Indent))
        .ignore_then(stmt.repeated().at_least(1).collect::<Vec<_>>())
        .then_ignore(just(Token::Dedent));

    just(Token::Def)
        .ignore_then(ident)
        .then(params)
        .then_ignore(just(Token::Colon))
        .then(def_block)
        .map_with(|((name, params), body), e| FnDef {
            name,
            params,
            body,
            span: e.span(),
        })
        .then_ignore(end())
}

// ── Tests ──
