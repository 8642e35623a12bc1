//! Expression resolver.
//!
//! Turns the text inside a `[[...]]`/`{{...}}` binding into an expression that
//! is valid inside a `${...}` interpolation of a render method:
//!
//! 1. Identifier and member chains are qualified with `this.` unless their root
//!    is in the [`QualificationContext`] (loop and column variables).
//! 2. Chains can be null-guarded, either with a conjunction of prefixes or with
//!    optional chaining, so `a.b.c` never throws when `a` is missing.
//! 3. Calls keep their parenthesized callee; arguments are always guarded.
//!
//! Already-qualified output resolves to itself: the root `this` is part of
//! every context.

use crate::binding::{split_two_way_event, BindingOrText, SegmentKind};
use crate::diagnostics::{Diagnostic, PL_WARN_EXPRESSION_KIND, PL_WARN_EXPRESSION_PARSE};
use oxc_allocator::Allocator;
use oxc_ast::ast::Expression;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use oxc_syntax::operator::UnaryOperator;

pub const INSTANCE_PREFIX: &str = "this";
pub const UNDEFINED: &str = "undefined";
pub const EMPTY_STRING: &str = "''";
pub const EMPTY_ARRAY: &str = "[]";

// ═══════════════════════════════════════════════════════════════════════════════
// QUALIFICATION CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered set of names that resolve without the `this.` prefix.
///
/// Never mutated in place: nested scopes derive a new context with [`with`](Self::with).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualificationContext {
    names: Vec<String>,
}

impl QualificationContext {
    /// The component scope: only `this` is qualified.
    pub fn root() -> Self {
        QualificationContext {
            names: vec![INSTANCE_PREFIX.to_string()],
        }
    }

    /// No qualified names at all. Only useful for guarding free-standing chains.
    pub fn empty() -> Self {
        QualificationContext { names: Vec::new() }
    }

    pub fn with(&self, extra: &[&str]) -> Self {
        let mut names = self.names.clone();
        for name in extra {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        QualificationContext { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

impl Default for QualificationContext {
    fn default() -> Self {
        Self::root()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Split `a.b[c.d].e` before top-level dots and brackets: `["a", "b", "[c.d]", "e"]`.
///
/// Bracket segments keep their `[`; see [`join_chain`].
pub fn split_chain(chain: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in chain.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '[' => {
                if depth == 0 && i > start {
                    parts.push(&chain[start..i]);
                    start = i;
                }
                depth += 1;
            }
            '(' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '.' if depth == 0 => {
                parts.push(&chain[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < chain.len() {
        parts.push(&chain[start..]);
    }
    parts
}

/// Reassemble chain segments. Segments from `optional_from` on are joined
/// with `?.`; earlier ones with `.`, or nothing before a bracket.
pub fn join_chain(parts: &[&str], optional_from: usize) -> String {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            if i >= optional_from {
                out.push_str("?.");
            } else if !part.starts_with('[') {
                out.push('.');
            }
        }
        out.push_str(part);
    }
    out
}

/// Root name of a chain: the leading identifier before any `.`, `[` or `(`.
pub fn chain_root(chain: &str) -> &str {
    let end = chain
        .find(|c: char| c == '.' || c == '[' || c == '(' || c == '?' || c.is_whitespace())
        .unwrap_or(chain.len());
    &chain[..end]
}

/// Prefix `this.` unless the chain root is already qualified.
pub fn qualify(chain: &str, context: &QualificationContext) -> String {
    if context.contains(chain_root(chain)) {
        chain.to_string()
    } else {
        format!("{}.{}", INSTANCE_PREFIX, chain)
    }
}

/// Guard a chain with a conjunction of its prefixes.
///
/// `a.b.c` becomes `(a && a.b) ? a.b.c : undefined`. Prefixes present in
/// `assumed` are taken as non-null. A fallback other than `undefined` also
/// requires the full chain itself.
pub fn null_guard(chain: &str, assumed: &QualificationContext, undefined_value: &str) -> String {
    let parts = split_chain(chain);
    if parts.is_empty() {
        return undefined_value.to_string();
    }
    let last = if undefined_value == UNDEFINED {
        parts.len() - 1
    } else {
        parts.len()
    };

    let conditions: Vec<String> = (1..=last)
        .map(|i| join_chain(&parts[..i], usize::MAX))
        .filter(|prefix| !assumed.contains(prefix))
        .collect();

    if conditions.is_empty() {
        chain.to_string()
    } else {
        format!(
            "({}) ? {} : {}",
            conditions.join(" && "),
            chain,
            undefined_value
        )
    }
}

/// Guard a chain with `?.` after the qualified root.
pub fn optional_chain(chain: &str, assumed: &QualificationContext, undefined_value: &str) -> String {
    let parts = split_chain(chain);
    let chained = match parts.first() {
        None => return undefined_value.to_string(),
        Some(root) if assumed.contains(root) => join_chain(&parts, 2),
        Some(_) => join_chain(&parts, 1),
    };
    if undefined_value == UNDEFINED || (parts.len() == 1 && assumed.contains(parts[0])) {
        chained
    } else {
        format!("{} ?? {}", chained, undefined_value)
    }
}

/// Single-quoted JS string literal for a text segment.
pub fn quote_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn slice(source: &str, span: Span) -> &str {
    &source[span.start as usize..span.end as usize]
}

fn unparenthesized<'b, 'a>(mut expr: &'b Expression<'a>) -> &'b Expression<'a> {
    while let Expression::ParenthesizedExpression(paren) = expr {
        expr = &paren.expression;
    }
    expr
}

fn unary_prefix(operator: UnaryOperator) -> &'static str {
    operator.as_str()
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLVER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct ExpressionResolver {
    pub optional_chaining: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ExpressionResolver {
    pub fn new(optional_chaining: bool) -> Self {
        Self {
            optional_chaining,
            diagnostics: Vec::new(),
        }
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Null-safety for an already-qualified chain, in the configured mode.
    pub fn null_safe(&self, chain: &str, assumed: &QualificationContext, undefined_value: &str) -> String {
        if self.optional_chaining {
            optional_chain(chain, assumed, undefined_value)
        } else {
            null_guard(chain, assumed, undefined_value)
        }
    }

    /// Resolve one binding expression.
    ///
    /// Unparseable text is returned as written.
    pub fn resolve(
        &mut self,
        expression: &str,
        make_null_safe: bool,
        context: &QualificationContext,
        undefined_value: &str,
    ) -> String {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_module(true);

        match Parser::new(&allocator, expression, source_type).parse_expression() {
            Ok(expr) => {
                let span = expr.span();
                let leading = &expression[..span.start as usize];
                let trailing = &expression[span.end as usize..];
                if leading.trim().is_empty() && trailing.trim().is_empty() {
                    return self.resolve_node(expression, &expr, make_null_safe, context, undefined_value);
                }
                self.unparsed(expression, format!("unexpected `{}`", trailing.trim()))
            }
            Err(errors) => {
                let reason = errors
                    .first()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "syntax error".to_string());
                self.unparsed(expression, reason)
            }
        }
    }

    fn unparsed(&mut self, expression: &str, reason: String) -> String {
        tracing::debug!("unable to parse binding `{}`: {}", expression, reason);
        self.diagnostics.push(
            Diagnostic::new(
                PL_WARN_EXPRESSION_PARSE,
                format!("cannot parse binding `{}`", expression),
            )
            .with_hint(reason),
        );
        expression.to_string()
    }

    /// Resolve a split attribute value or text.
    ///
    /// A lone binding resolves directly; mixed text and bindings become a `+`
    /// concatenation where missing values render as the empty string.
    pub fn resolve_segments(
        &mut self,
        segments: &[BindingOrText],
        make_null_safe: bool,
        context: &QualificationContext,
    ) -> String {
        if let [only] = segments {
            return match only.kind {
                SegmentKind::Text => quote_literal(&only.value),
                SegmentKind::OneWay => self.resolve(&only.value, make_null_safe, context, UNDEFINED),
                SegmentKind::TwoWay => {
                    let (target, _) = split_two_way_event(&only.value);
                    self.resolve(target, make_null_safe, context, UNDEFINED)
                }
            };
        }

        segments
            .iter()
            .map(|segment| match segment.kind {
                SegmentKind::Text => quote_literal(&segment.value),
                SegmentKind::OneWay => format!(
                    "({})",
                    self.resolve(&segment.value, make_null_safe, context, EMPTY_STRING)
                ),
                SegmentKind::TwoWay => {
                    let (target, _) = split_two_way_event(&segment.value);
                    format!(
                        "({})",
                        self.resolve(target, make_null_safe, context, EMPTY_STRING)
                    )
                }
            })
            .collect::<Vec<_>>()
            .join("+")
    }

    fn resolve_node(
        &mut self,
        source: &str,
        expr: &Expression<'_>,
        make_null_safe: bool,
        context: &QualificationContext,
        undefined_value: &str,
    ) -> String {
        match expr {
            Expression::Identifier(_)
            | Expression::ThisExpression(_)
            | Expression::StaticMemberExpression(_)
            | Expression::ComputedMemberExpression(_) => {
                let qualified = qualify(slice(source, expr.span()), context);
                if make_null_safe {
                    self.null_safe(&qualified, context, undefined_value)
                } else {
                    qualified
                }
            }
            Expression::BooleanLiteral(_)
            | Expression::NullLiteral(_)
            | Expression::NumericLiteral(_)
            | Expression::BigIntLiteral(_)
            | Expression::StringLiteral(_)
            | Expression::RegExpLiteral(_) => slice(source, expr.span()).to_string(),
            Expression::UnaryExpression(unary) => format!(
                "{}({})",
                unary_prefix(unary.operator),
                self.resolve_node(source, unparenthesized(&unary.argument), make_null_safe, context, undefined_value)
            ),
            Expression::CallExpression(call) => {
                // The callee keeps its receiver: a guarded callee would detach `this`.
                let callee = self.resolve_node(source, unparenthesized(&call.callee), false, context, UNDEFINED);
                let args = call
                    .arguments
                    .iter()
                    .map(|argument| match argument.as_expression() {
                        Some(arg) => self.resolve_node(source, arg, true, context, UNDEFINED),
                        None => slice(source, argument.span()).to_string(),
                    })
                    .collect::<Vec<_>>();
                format!("({})({})", callee, args.join(", "))
            }
            Expression::ParenthesizedExpression(paren) => format!(
                "({})",
                self.resolve_node(source, &paren.expression, make_null_safe, context, undefined_value)
            ),
            other => {
                let text = slice(source, other.span());
                tracing::debug!("binding expression `{}` left as written", text);
                self.diagnostics.push(Diagnostic::new(
                    PL_WARN_EXPRESSION_KIND,
                    format!("expression `{}` is not rewritten", text),
                ));
                text.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::split_bindings;
    use pretty_assertions::assert_eq;

    fn resolve(expr: &str, safe: bool) -> String {
        ExpressionResolver::new(false).resolve(expr, safe, &QualificationContext::root(), UNDEFINED)
    }

    #[test]
    fn test_unqualified_identifier_gets_prefix() {
        assert_eq!(resolve("title", true), "this.title");
        assert_eq!(resolve("user.name", false), "this.user.name");
        assert!(resolve("user.address.city", true).starts_with("(this.user && this.user.address)"));
    }

    #[test]
    fn test_qualified_root_is_not_prefixed() {
        let ctx = QualificationContext::root().with(&["item", "index"]);
        let mut resolver = ExpressionResolver::new(false);
        assert_eq!(resolver.resolve("item.value", true, &ctx, UNDEFINED), "item.value");
        assert_eq!(resolver.resolve("index", true, &ctx, UNDEFINED), "index");
        assert_eq!(
            resolver.resolve("item.owner.name", true, &ctx, UNDEFINED),
            "(item.owner) ? item.owner.name : undefined"
        );
    }

    #[test]
    fn test_null_guard_three_levels() {
        assert_eq!(
            null_guard("a.b.c", &QualificationContext::empty(), UNDEFINED),
            "(a && a.b) ? a.b.c : undefined"
        );
    }

    #[test]
    fn test_null_guard_skips_assumed_prefixes() {
        assert_eq!(
            null_guard("this.a.b", &QualificationContext::root(), UNDEFINED),
            "(this.a) ? this.a.b : undefined"
        );
        assert_eq!(null_guard("this.a", &QualificationContext::root(), UNDEFINED), "this.a");
    }

    #[test]
    fn test_null_guard_fallback_requires_full_chain() {
        assert_eq!(
            null_guard("this.items", &QualificationContext::root(), EMPTY_ARRAY),
            "(this.items) ? this.items : []"
        );
    }

    #[test]
    fn test_optional_chaining_mode() {
        let mut resolver = ExpressionResolver::new(true);
        let ctx = QualificationContext::root();
        assert_eq!(resolver.resolve("a.b.c", true, &ctx, UNDEFINED), "this.a?.b?.c");
        assert_eq!(resolver.resolve("items", true, &ctx, EMPTY_ARRAY), "this.items ?? []");
        assert_eq!(
            optional_chain("a.b", &QualificationContext::empty(), UNDEFINED),
            "a?.b"
        );
    }

    #[test]
    fn test_literals_are_verbatim() {
        assert_eq!(resolve("'x'", true), "'x'");
        assert_eq!(resolve("42", true), "42");
        assert_eq!(resolve("true", true), "true");
    }

    #[test]
    fn test_unary_wraps_operand() {
        assert_eq!(resolve("!loggedIn", true), "!(this.loggedIn)");
        assert_eq!(
            resolve("!user.active", true),
            "!((this.user) ? this.user.active : undefined)"
        );
    }

    #[test]
    fn test_call_parenthesizes_callee_and_guards_args() {
        assert_eq!(
            resolve("_format(user.name, 'x', count)", true),
            "(this._format)((this.user) ? this.user.name : undefined, 'x', this.count)"
        );
        assert_eq!(
            resolve("and(a, b)", false),
            "(this.and)(this.a, this.b)"
        );
    }

    #[test]
    fn test_unsupported_kind_is_kept_with_diagnostic() {
        let mut resolver = ExpressionResolver::new(false);
        let out = resolver.resolve("a + b", true, &QualificationContext::root(), UNDEFINED);
        assert_eq!(out, "a + b");
        assert_eq!(resolver.diagnostics.len(), 1);
        assert_eq!(resolver.diagnostics[0].code, PL_WARN_EXPRESSION_KIND);
    }

    #[test]
    fn test_unparseable_is_kept_with_diagnostic() {
        let mut resolver = ExpressionResolver::new(false);
        let out = resolver.resolve("a b (", true, &QualificationContext::root(), UNDEFINED);
        assert_eq!(out, "a b (");
        assert_eq!(resolver.diagnostics[0].code, PL_WARN_EXPRESSION_PARSE);
    }

    #[test]
    fn test_resolving_qualified_output_is_stable() {
        for expr in ["name", "user.name", "_f(a)", "!open"] {
            let once = resolve(expr, false);
            let twice = resolve(&once, false);
            assert_eq!(once, twice);
            assert!(!twice.contains("this.this."));
        }
        let guarded = resolve("user.name", true);
        assert!(!resolve(&guarded, true).contains("this.this."));
    }

    #[test]
    fn test_trailing_tokens_are_kept_with_diagnostic() {
        for expr in ["items.0.name", "_f(a) b"] {
            let mut resolver = ExpressionResolver::new(false);
            let out = resolver.resolve(expr, true, &QualificationContext::root(), UNDEFINED);
            assert_eq!(out, expr);
            assert_eq!(resolver.diagnostics.len(), 1);
            assert_eq!(resolver.diagnostics[0].code, PL_WARN_EXPRESSION_PARSE);
        }
        assert_eq!(resolve("  name ", false), "this.name");
    }

    #[test]
    fn test_computed_member_chain_guards_every_prefix() {
        assert_eq!(
            resolve("items[0].name", true),
            "(this.items && this.items[0]) ? this.items[0].name : undefined"
        );
        assert_eq!(
            null_guard("this.rows[i]", &QualificationContext::root(), EMPTY_ARRAY),
            "(this.rows && this.rows[i]) ? this.rows[i] : []"
        );
        let mut resolver = ExpressionResolver::new(true);
        assert_eq!(
            resolver.resolve("items[0].name", true, &QualificationContext::root(), UNDEFINED),
            "this.items?.[0]?.name"
        );
    }

    #[test]
    fn test_parenthesized_operand_is_not_rewrapped() {
        assert_eq!(resolve("!(open)", false), "!(this.open)");
        assert_eq!(resolve("!((open))", false), "!(this.open)");
    }

    #[test]
    fn test_mixed_segments_concatenate() {
        let mut resolver = ExpressionResolver::new(false);
        let segments = split_bindings("Hello [[user.first]] it's [[count]]");
        assert_eq!(
            resolver.resolve_segments(&segments, true, &QualificationContext::root()),
            "'Hello '+((this.user && this.user.first) ? this.user.first : '')+' it\\'s '+((this.count) ? this.count : '')"
        );
    }

    #[test]
    fn test_single_two_way_segment_drops_event() {
        let mut resolver = ExpressionResolver::new(false);
        let segments = split_bindings("{{checked::change}}");
        assert_eq!(
            resolver.resolve_segments(&segments, false, &QualificationContext::root()),
            "this.checked"
        );
    }

    #[test]
    fn test_split_chain_respects_brackets() {
        assert_eq!(split_chain("a.b[c.d].e"), vec!["a", "b", "[c.d]", "e"]);
        assert_eq!(split_chain("rows[0][1]"), vec!["rows", "[0]", "[1]"]);
        assert_eq!(split_chain("f('x.y').z"), vec!["f('x.y')", "z"]);
        assert_eq!(chain_root("items[0].name"), "items");
    }
}
