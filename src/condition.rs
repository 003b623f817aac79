//! MSBuild condition parsing and the equality-only condition check.
//!
//! `.vcxproj` `<ItemDefinitionGroup>` elements are guarded by conditions such
//! as:
//!
//! - `'$(Configuration)|$(Platform)'=='Debug|Win32'`
//! - `'$(Configuration)'=='Release' and '$(Platform)'=='x64'`
//!
//! [`is_true`] substitutes the two build-axis macros and then asks an
//! [`ExpressionParser`] for an expression tree. The condition holds when the
//! tree contains an `==` node whose operands are identical literals. Nothing
//! else is evaluated: `and`, `or`, `!` and `!=` are parsed but have no
//! boolean meaning here, so compound conditions lean towards `true`.
//!
//! ## Grammar of [`MsBuildExpressionParser`] (case-insensitive keywords)
//!
//! ```text
//! expr       = or_expr
//! or_expr    = and_expr ('or' and_expr)*
//! and_expr   = comparison ('and' comparison)*
//! comparison = unary (('==' | '!=' | '<=' | '>=' | '<' | '>') unary)?
//! unary      = '!'* primary
//! primary    = quoted | call | word | '(' expr ')'
//! call       = word '(' (expr (',' expr)*)? ')'
//! quoted     = "'" chars "'"
//! ```

use chumsky::prelude::*;

use crate::vcxproj::ProjectConfiguration;

// ═══════════════════════════════════════════════════════════════════════════════
//  AST
// ═══════════════════════════════════════════════════════════════════════════════

/// A parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `'text'`, stored without the quotes.
    Quoted(String),
    /// An unquoted word such as `true` or `Win32`.
    Word(String),
    /// `lhs op rhs`.
    Binary {
        op: Operator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    /// `!operand`.
    Not(Box<Expression>),
    /// `Name(args…)`, for example `Exists('file')`.
    Call { name: String, args: Vec<Expression> },
}

/// Binary operators known to the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl Expression {
    /// Operator of a binary node.
    pub fn operator(&self) -> Option<Operator> {
        match self {
            Self::Binary { op, .. } => Some(*op),
            _ => None,
        }
    }

    /// Both operands of a binary node.
    pub fn operands(&self) -> Option<(&Expression, &Expression)> {
        match self {
            Self::Binary { lhs, rhs, .. } => Some((lhs.as_ref(), rhs.as_ref())),
            _ => None,
        }
    }

    /// Text of a literal node (quoted string or bare word).
    pub fn literal_text(&self) -> Option<&str> {
        match self {
            Self::Quoted(s) | Self::Word(s) => Some(s),
            _ => None,
        }
    }

    /// Direct children, in source order.
    fn children(&self) -> Vec<&Expression> {
        match self {
            Self::Quoted(_) | Self::Word(_) => Vec::new(),
            Self::Binary { lhs, rhs, .. } => vec![lhs.as_ref(), rhs.as_ref()],
            Self::Not(inner) => vec![inner.as_ref()],
            Self::Call { args, .. } => args.iter().collect(),
        }
    }

    /// `true` when this node is `==` between two literals spelled the same.
    /// A quoted string never equals a bare word.
    fn is_matching_equality(&self) -> bool {
        match self {
            Self::Binary { op: Operator::Equal, lhs, rhs } => match (lhs.as_ref(), rhs.as_ref()) {
                (Self::Quoted(a), Self::Quoted(b)) | (Self::Word(a), Self::Word(b)) => a == b,
                _ => false,
            },
            _ => false,
        }
    }

    /// Search this tree, pre-order, for a matching `==` node.
    pub fn contains_matching_equality(&self) -> bool {
        self.is_matching_equality()
            || self.children().into_iter().any(Expression::contains_matching_equality)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Parser capability
// ═══════════════════════════════════════════════════════════════════════════════

/// Turns condition text into an [`Expression`] tree.
///
/// Returns `None` when the text does not form an expression.
pub trait ExpressionParser {
    fn parse(&self, text: &str) -> Option<Expression>;
}

/// Default [`ExpressionParser`] for MSBuild condition syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsBuildExpressionParser;

impl ExpressionParser for MsBuildExpressionParser {
    fn parse(&self, text: &str) -> Option<Expression> {
        match parse_condition(text) {
            Ok(expr) => Some(expr),
            Err(message) => {
                log::debug!("{message}");
                None
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Chumsky parser
// ═══════════════════════════════════════════════════════════════════════════════

/// Case-insensitive alphabetic keyword such as `and` / `And`.
fn keyword<'a>(
    kw: &'static str,
) -> impl Parser<'a, &'a str, &'a str, extra::Err<Simple<'a, char>>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphabetic())
        .repeated()
        .at_least(1)
        .to_slice()
        .filter(move |s: &&str| s.eq_ignore_ascii_case(kw))
        .padded()
}

/// Build the chumsky parser for condition expressions.
fn condition_parser<'a>() -> impl Parser<'a, &'a str, Expression, extra::Err<Simple<'a, char>>> {
    recursive(|expr| {
        // ── Single-quoted string value ───────────────────────────────────
        let quoted = just('\'')
            .ignore_then(none_of('\'').repeated().to_slice())
            .then_ignore(just('\''))
            .map(|s: &str| Expression::Quoted(s.to_string()));

        // ── Bare word: identifiers, numbers, dotted names ────────────────
        let word = any()
            .filter(|c: &char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
            .repeated()
            .at_least(1)
            .to_slice();

        // ── Call:  Name(arg, …) ──────────────────────────────────────────
        let call = word
            .clone()
            .then(
                expr.clone()
                    .separated_by(just(',').padded())
                    .collect::<Vec<_>>()
                    .delimited_by(just('(').padded(), just(')').padded()),
            )
            .map(|(name, args): (&str, Vec<Expression>)| Expression::Call {
                name: name.to_string(),
                args,
            });

        // ── Parenthesized expression ─────────────────────────────────────
        let paren_expr = expr.delimited_by(just('(').padded(), just(')').padded());

        let primary = choice((
            quoted,
            call,
            word.map(|s: &str| Expression::Word(s.to_string())),
            paren_expr,
        ))
        .padded();

        // ── Prefix negation ──────────────────────────────────────────────
        let unary = just('!')
            .padded()
            .repeated()
            .collect::<Vec<_>>()
            .then(primary)
            .map(|(bangs, operand): (Vec<char>, Expression)| {
                bangs
                    .into_iter()
                    .fold(operand, |inner, _| Expression::Not(Box::new(inner)))
            });

        // ── Comparison operators ─────────────────────────────────────────
        let cmp_op = choice((
            just("==").to(Operator::Equal),
            just("!=").to(Operator::NotEqual),
            just("<=").to(Operator::LessEqual),
            just(">=").to(Operator::GreaterEqual),
            just("<").to(Operator::Less),
            just(">").to(Operator::Greater),
        ))
        .padded();

        // ── Comparison:  lhs op rhs ──────────────────────────────────────
        let comparison = unary
            .clone()
            .then(cmp_op.then(unary).or_not())
            .map(|(lhs, rest): (Expression, Option<(Operator, Expression)>)| match rest {
                Some((op, rhs)) => Expression::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                None => lhs,
            });

        // ── 'and' binds tighter than 'or' ──────────────────────────────
        let and_expr = comparison.clone().foldl(
            keyword("and").ignore_then(comparison).repeated(),
            |lhs, rhs| Expression::Binary {
                op: Operator::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        );

        // ── 'or' ────────────────────────────────────────────────────────
        and_expr.clone().foldl(
            keyword("or").ignore_then(and_expr).repeated(),
            |lhs, rhs| Expression::Binary {
                op: Operator::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        )
    })
    .padded()
}

/// Parse condition text into an [`Expression`].
pub fn parse_condition(input: &str) -> Result<Expression, String> {
    condition_parser()
        .parse(input)
        .into_result()
        .map_err(|errs| {
            let messages: Vec<String> = errs.iter().map(|e| format!("{e}")).collect();
            format!(
                "Failed to parse condition '{}': {}",
                input,
                messages.join("; ")
            )
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Evaluation
// ═══════════════════════════════════════════════════════════════════════════════

const CONFIGURATION_MACRO: &str = "$(Configuration)";
const PLATFORM_MACRO: &str = "$(Platform)";

/// Replace `$(Configuration)` and `$(Platform)` in one left-to-right pass.
///
/// Substituted values are never rescanned. Any other `$(…)` reference is
/// copied through unchanged.
pub fn substitute_macros(condition: &str, axis: &ProjectConfiguration) -> String {
    let mut result = String::with_capacity(condition.len());
    let mut rest = condition;

    while let Some(pos) = rest.find("$(") {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix(CONFIGURATION_MACRO) {
            result.push_str(&axis.configuration);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(PLATFORM_MACRO) {
            result.push_str(&axis.platform);
            rest = after;
        } else {
            result.push_str("$(");
            rest = &tail[2..];
        }
    }
    result.push_str(rest);

    result
}

/// Decide whether `condition` holds for one build-axis entry.
///
/// Text that the parser rejects is `false`.
pub fn is_true<P>(parser: &P, condition: &str, axis: &ProjectConfiguration) -> bool
where
    P: ExpressionParser + ?Sized,
{
    let text = substitute_macros(condition, axis);
    match parser.parse(&text) {
        Some(tree) => tree.contains_matching_equality(),
        None => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
