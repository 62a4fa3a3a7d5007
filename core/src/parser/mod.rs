//! Expression parser
//!
//! PEST-based parser for `{{ ... }}` workflow expressions. Produces the closed
//! [`Expr`] vocabulary consumed by both the evaluator and the type classifier,
//! with span information for error reporting.
//!
//! Syntax outside that vocabulary (object literals, arrow functions, `this`,
//! comma sequences) is still recognised so it can be reported as an
//! unsupported node instead of a plain syntax error.

use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;
use std::sync::OnceLock;

use crate::executor::types::{BinaryOp, Expr, LitValue, LogicalOp, Span, UnaryOp};


/// Bracket nesting, prefix-operator runs, right-associative chains and AST
/// depth are all capped here so that neither the recursive descent parser
/// nor the tree it builds can exhaust the stack.
pub const MAX_NESTING_DEPTH: usize = 256;

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "parser/expression.pest"]
struct ExpressionParser;

fn pratt() -> &'static PrattParser<Rule> {
    static PRATT: OnceLock<PrattParser<Rule>> = OnceLock::new();
    PRATT.get_or_init(|| {
        PrattParser::new()
            .op(Op::infix(Rule::op_conditional, Assoc::Right))
            .op(Op::infix(Rule::op_or, Assoc::Left))
            .op(Op::infix(Rule::op_and, Assoc::Left))
            .op(Op::infix(Rule::op_bitor, Assoc::Left))
            .op(Op::infix(Rule::op_bitxor, Assoc::Left))
            .op(Op::infix(Rule::op_bitand, Assoc::Left))
            .op(Op::infix(Rule::op_eq, Assoc::Left)
                | Op::infix(Rule::op_ne, Assoc::Left)
                | Op::infix(Rule::op_strict_eq, Assoc::Left)
                | Op::infix(Rule::op_strict_ne, Assoc::Left))
            .op(Op::infix(Rule::op_lt, Assoc::Left)
                | Op::infix(Rule::op_gt, Assoc::Left)
                | Op::infix(Rule::op_lte, Assoc::Left)
                | Op::infix(Rule::op_gte, Assoc::Left))
            .op(Op::infix(Rule::op_shl, Assoc::Left)
                | Op::infix(Rule::op_shr, Assoc::Left)
                | Op::infix(Rule::op_ushr, Assoc::Left))
            .op(Op::infix(Rule::op_add, Assoc::Left) | Op::infix(Rule::op_sub, Assoc::Left))
            .op(Op::infix(Rule::op_mul, Assoc::Left)
                | Op::infix(Rule::op_div, Assoc::Left)
                | Op::infix(Rule::op_mod, Assoc::Left))
            .op(Op::infix(Rule::op_pow, Assoc::Right))
            .op(Op::prefix(Rule::op_neg)
                | Op::prefix(Rule::op_plus)
                | Op::prefix(Rule::op_not)
                | Op::prefix(Rule::op_bitnot))
            .op(Op::postfix(Rule::dot_member)
                | Op::postfix(Rule::computed_member)
                | Op::postfix(Rule::call_args))
    })
}

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Malformed input
    Syntax(String, Option<Span>),
    /// Well-formed syntax whose node kind the sandbox does not admit
    Unsupported(String, Span),
    /// Input nested beyond [`MAX_NESTING_DEPTH`]
    NestingTooDeep,
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::Syntax(_, span) => *span,
            ParseError::Unsupported(_, span) => Some(*span),
            ParseError::NestingTooDeep => None,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Syntax(msg, _) => write!(f, "{}", msg),
            ParseError::Unsupported(kind, _) => write!(f, "Unsupported node type: {}", kind),
            ParseError::NestingTooDeep => write!(f, "Maximum recursion depth exceeded"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (line, col) = match err.line_col {
            pest::error::LineColLocation::Pos(pos) => pos,
            pest::error::LineColLocation::Span(start, _) => start,
        };
        let span = Span {
            start: 0,
            end: 0,
            start_line: line.saturating_sub(1),
            start_col: col.saturating_sub(1),
            end_line: line.saturating_sub(1),
            end_col: col,
        };
        let message = match &err.variant {
            pest::error::ErrorVariant::ParsingError { .. } => {
                format!("Unexpected token at character {}", col.saturating_sub(1))
            }
            pest::error::ErrorVariant::CustomError { message } => message.clone(),
        };
        ParseError::Syntax(message, Some(span))
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Span Helpers ===================== */

/// Convert a PEST pair's span to our Span type
fn pair_to_span(pair: &Pair<Rule>, source: &str) -> Span {
    let pest_span = pair.as_span();
    let start = pest_span.start();
    let end = pest_span.end();

    let (start_line, start_col) = offset_to_line_col(source, start);
    let (end_line, end_col) = offset_to_line_col(source, end);

    Span::new(start, end, start_line, start_col, end_line, end_col)
}

/// Convert byte offset to (line, column) - 0-indexed
fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 0;
    let mut col = 0;

    for (idx, ch) in source.char_indices() {
        if idx >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/* ===================== Public API ===================== */

/// Parse a single expression (the text between `{{` and `}}`)
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    check_nesting(source)?;

    let mut pairs = ExpressionParser::parse(Rule::program, source)?;
    let program = pairs
        .next()
        .ok_or_else(|| ParseError::Syntax("Empty expression".to_string(), None))?;
    let program_span = pair_to_span(&program, source);

    let mut exprs: Vec<Pair<Rule>> = program
        .into_inner()
        .filter(|pair| pair.as_rule() == Rule::expr)
        .collect();
    if exprs.len() != 1 {
        return Err(ParseError::Unsupported(
            "Compound".to_string(),
            program_span,
        ));
    }

    let root = exprs.remove(0);
    build_expression(root, source).map(|built| built.expr)
}

/* ===================== Nesting Guard ===================== */

/// Cheap pre-scan bounding the recursion the parser itself will need.
///
/// Left-associative chains are iterative in the Pratt parser and are bounded
/// later by the AST depth check, so only the recursive shapes are counted.
/// Right-associative runs (`?:` and `**`) only chain within one operand, so a
/// run ends at `,` and at the bracket that closes it.
fn check_nesting(source: &str) -> ParseResult<()> {
    let mut depth = 0usize;
    let mut prefix_run = 0usize;
    // One open run per bracket level, plus the top level
    let mut runs: Vec<usize> = vec![0];
    let mut right_assoc = 0usize;
    let mut chars = source.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' => {
                // Skip string contents so brackets inside literals do not count
                while let Some(inner) = chars.next() {
                    if inner == '\\' {
                        chars.next();
                    } else if inner == ch {
                        break;
                    }
                }
                prefix_run = 0;
            }
            '(' | '[' | '{' => {
                depth += 1;
                prefix_run = 0;
                runs.push(0);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                prefix_run = 0;
                if runs.len() > 1 {
                    right_assoc -= runs.pop().unwrap_or(0);
                }
            }
            ',' => {
                prefix_run = 0;
                if let Some(run) = runs.last_mut() {
                    right_assoc -= *run;
                    *run = 0;
                }
            }
            '!' | '-' | '+' | '~' => prefix_run += 1,
            '?' => open_run(&mut runs, &mut right_assoc),
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                open_run(&mut runs, &mut right_assoc);
            }
            c if c.is_whitespace() => {}
            _ => prefix_run = 0,
        }

        if depth > MAX_NESTING_DEPTH
            || prefix_run > MAX_NESTING_DEPTH
            || right_assoc > MAX_NESTING_DEPTH
        {
            return Err(ParseError::NestingTooDeep);
        }
    }

    Ok(())
}

fn open_run(runs: &mut [usize], right_assoc: &mut usize) {
    if let Some(run) = runs.last_mut() {
        *run += 1;
    }
    *right_assoc += 1;
}

/* ===================== AST Builder ===================== */

/// An expression together with the height of its tree
struct Built {
    expr: Expr,
    depth: usize,
}

impl Built {
    fn leaf(expr: Expr) -> Self {
        Built { expr, depth: 1 }
    }

    fn node(expr: Expr, child_depth: usize) -> ParseResult<Self> {
        let depth = child_depth + 1;
        if depth > MAX_NESTING_DEPTH {
            return Err(ParseError::NestingTooDeep);
        }
        Ok(Built { expr, depth })
    }
}

fn unexpected(pair: &Pair<Rule>, source: &str) -> ParseError {
    ParseError::Syntax(
        format!("Unexpected rule: {:?}", pair.as_rule()),
        Some(pair_to_span(pair, source)),
    )
}

fn build_expression(pair: Pair<Rule>, source: &str) -> ParseResult<Built> {
    pratt()
        .map_primary(|primary| build_primary(primary, source))
        .map_prefix(|op, operand| build_prefix(op, operand?, source))
        .map_postfix(|lhs, op| build_postfix(lhs?, op, source))
        .map_infix(|lhs, op, rhs| build_infix(lhs?, op, rhs?, source))
        .parse(pair.into_inner())
}

fn build_list(pair: Pair<Rule>, source: &str) -> ParseResult<(Vec<Expr>, usize)> {
    let mut depth = 0;
    let mut exprs = Vec::new();
    for expr_pair in pair.into_inner() {
        let built = build_expression(expr_pair, source)?;
        depth = depth.max(built.depth);
        exprs.push(built.expr);
    }
    Ok((exprs, depth))
}

fn build_prefix(op: Pair<Rule>, operand: Built, source: &str) -> ParseResult<Built> {
    let operator = match op.as_rule() {
        Rule::op_neg => UnaryOp::Neg,
        Rule::op_plus => UnaryOp::Plus,
        Rule::op_not => UnaryOp::Not,
        Rule::op_bitnot => UnaryOp::BitNot,
        _ => return Err(unexpected(&op, source)),
    };
    let span = pair_to_span(&op, source).merge(&operand.expr.span());
    Built::node(
        Expr::Unary {
            operator,
            argument: Box::new(operand.expr),
            span,
        },
        operand.depth,
    )
}

fn build_postfix(lhs: Built, op: Pair<Rule>, source: &str) -> ParseResult<Built> {
    let span = lhs.expr.span().merge(&pair_to_span(&op, source));

    match op.as_rule() {
        Rule::dot_member => {
            let ident = op
                .into_inner()
                .next()
                .ok_or_else(|| ParseError::Syntax("Expected property name".to_string(), Some(span)))?;
            let property = Expr::Identifier {
                name: ident.as_str().to_string(),
                span: pair_to_span(&ident, source),
            };
            Built::node(
                Expr::Member {
                    object: Box::new(lhs.expr),
                    property: Box::new(property),
                    computed: false,
                    span,
                },
                lhs.depth,
            )
        }
        Rule::computed_member => {
            let inner = op
                .into_inner()
                .next()
                .ok_or_else(|| ParseError::Syntax("Expected property expression".to_string(), Some(span)))?;
            let property = build_expression(inner, source)?;
            Built::node(
                Expr::Member {
                    object: Box::new(lhs.expr),
                    property: Box::new(property.expr),
                    computed: true,
                    span,
                },
                lhs.depth.max(property.depth),
            )
        }
        Rule::call_args => {
            let (arguments, args_depth) = build_list(op, source)?;
            Built::node(
                Expr::Call {
                    callee: Box::new(lhs.expr),
                    arguments,
                    span,
                },
                lhs.depth.max(args_depth),
            )
        }
        _ => Err(unexpected(&op, source)),
    }
}

fn build_infix(lhs: Built, op: Pair<Rule>, rhs: Built, source: &str) -> ParseResult<Built> {
    let span = lhs.expr.span().merge(&rhs.expr.span());
    let child_depth = lhs.depth.max(rhs.depth);

    let operator = match op.as_rule() {
        Rule::op_conditional => {
            let inner = op
                .into_inner()
                .next()
                .ok_or_else(|| ParseError::Syntax("Expected consequent".to_string(), Some(span)))?;
            let consequent = build_expression(inner, source)?;
            return Built::node(
                Expr::Conditional {
                    test: Box::new(lhs.expr),
                    consequent: Box::new(consequent.expr),
                    alternate: Box::new(rhs.expr),
                    span,
                },
                child_depth.max(consequent.depth),
            );
        }
        Rule::op_and | Rule::op_or => {
            let operator = if op.as_rule() == Rule::op_and {
                LogicalOp::And
            } else {
                LogicalOp::Or
            };
            return Built::node(
                Expr::Logical {
                    operator,
                    left: Box::new(lhs.expr),
                    right: Box::new(rhs.expr),
                    span,
                },
                child_depth,
            );
        }
        Rule::op_bitor => BinaryOp::BitOr,
        Rule::op_bitxor => BinaryOp::BitXor,
        Rule::op_bitand => BinaryOp::BitAnd,
        Rule::op_eq => BinaryOp::Eq,
        Rule::op_ne => BinaryOp::Ne,
        Rule::op_strict_eq => BinaryOp::StrictEq,
        Rule::op_strict_ne => BinaryOp::StrictNe,
        Rule::op_lt => BinaryOp::Lt,
        Rule::op_gt => BinaryOp::Gt,
        Rule::op_lte => BinaryOp::Lte,
        Rule::op_gte => BinaryOp::Gte,
        Rule::op_shl => BinaryOp::Shl,
        Rule::op_shr => BinaryOp::Shr,
        Rule::op_ushr => BinaryOp::UShr,
        Rule::op_add => BinaryOp::Add,
        Rule::op_sub => BinaryOp::Sub,
        Rule::op_mul => BinaryOp::Mul,
        Rule::op_div => BinaryOp::Div,
        Rule::op_mod => BinaryOp::Mod,
        Rule::op_pow => BinaryOp::Pow,
        _ => return Err(unexpected(&op, source)),
    };

    Built::node(
        Expr::Binary {
            operator,
            left: Box::new(lhs.expr),
            right: Box::new(rhs.expr),
            span,
        },
        child_depth,
    )
}

fn build_primary(pair: Pair<Rule>, source: &str) -> ParseResult<Built> {
    let span = pair_to_span(&pair, source);

    match pair.as_rule() {
        Rule::paren => {
            let inner = pair
                .into_inner()
                .next()
                .ok_or_else(|| ParseError::Syntax("Expected expression".to_string(), Some(span)))?;
            build_expression(inner, source)
        }
        Rule::identifier => Ok(Built::leaf(Expr::Identifier {
            name: pair.as_str().to_string(),
            span,
        })),
        Rule::number => {
            let num_str = pair.as_str();
            let value = num_str.parse::<f64>().map_err(|e| {
                ParseError::Syntax(
                    format!("Failed to parse number '{}': {}", num_str, e),
                    Some(span),
                )
            })?;
            Ok(Built::leaf(Expr::Literal {
                value: LitValue::Num(value),
                span,
            }))
        }
        Rule::string => {
            let raw = pair.as_str();
            // Strip the surrounding quotes; both are single-byte
            let body = &raw[1..raw.len() - 1];
            Ok(Built::leaf(Expr::Literal {
                value: LitValue::Str(unescape(body)),
                span,
            }))
        }
        Rule::boolean => Ok(Built::leaf(Expr::Literal {
            value: LitValue::Bool(pair.as_str() == "true"),
            span,
        })),
        Rule::null_lit => Ok(Built::leaf(Expr::Literal {
            value: LitValue::Null,
            span,
        })),
        Rule::template => build_template(pair, source),
        Rule::array_lit => {
            let (elements, depth) = build_list(pair, source)?;
            Built::node(Expr::Array { elements, span }, depth)
        }
        Rule::object_lit => Err(ParseError::Unsupported("ObjectExpression".to_string(), span)),
        Rule::arrow_function => Err(ParseError::Unsupported(
            "ArrowFunctionExpression".to_string(),
            span,
        )),
        Rule::this_lit => Err(ParseError::Unsupported("ThisExpression".to_string(), span)),
        _ => Err(unexpected(&pair, source)),
    }
}

fn build_template(pair: Pair<Rule>, source: &str) -> ParseResult<Built> {
    let span = pair_to_span(&pair, source);
    let mut quasis = Vec::new();
    let mut expressions = Vec::new();
    let mut current = String::new();
    let mut depth = 0;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::template_chunk => current.push_str(&unescape(part.as_str())),
            Rule::template_sub => {
                let inner = part
                    .into_inner()
                    .next()
                    .ok_or_else(|| ParseError::Syntax("Expected expression".to_string(), Some(span)))?;
                let built = build_expression(inner, source)?;
                depth = depth.max(built.depth);
                quasis.push(std::mem::take(&mut current));
                expressions.push(built.expr);
            }
            _ => return Err(unexpected(&part, source)),
        }
    }
    quasis.push(current);

    Built::node(
        Expr::Template {
            quasis,
            expressions,
            span,
        },
        depth,
    )
}

/* ===================== String Escapes ===================== */

/// Cook the escape sequences of a string or template chunk
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(escaped) = chars.next() else {
            break;
        };
        match escaped {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            // Line continuation
            '\n' => {}
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) if hex.len() == 2 => out.push(c),
                    _ => {
                        out.push('x');
                        out.push_str(&hex);
                    }
                }
            }
            'u' => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => {
                        out.push('u');
                        out.push_str(&hex);
                    }
                }
            }
            other => out.push(other),
        }
    }

    out
}
