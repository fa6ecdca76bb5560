//! Converts a `bc_syntax::tree::ParseProgram` into a [`crate::ast::Program`].
//!
//! Three jobs live here that the grammar deliberately leaves undone:
//! operator-tree folding (§4.1), `a[b]` desugaring to `Deref(Binary(Add))`,
//! and literal decoding (octal/decimal numbers, `*`-escapes, big-endian
//! character packing). None of this touches scope resolution directly;
//! [`crate::scope`] is consulted by the codegen declaration pass, not here,
//! since referencing an as-yet-undeclared forward label or function is legal
//! in B and must not fail at build time.

use bc_syntax::tree as pt;

use crate::ast::{AssignOp, Definition, Expr, Ival, Place, Program, Stmt};
use crate::ast::BinOp as AstBinOp;
use crate::error::{BcError, BcResult};

/// Target facts the builder needs to decode character literals; threaded in
/// rather than hardcoded so the same builder works for any word width.
#[derive(Debug, Clone, Copy)]
pub struct BuildConfig {
    pub bytes_per_word: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig { bytes_per_word: 8 }
    }
}

pub fn build_program(parse: &pt::ParseProgram, config: &BuildConfig) -> BcResult<Program> {
    let definitions = parse
        .definitions
        .iter()
        .map(|d| build_definition(d, config))
        .collect::<BcResult<Vec<_>>>()?;
    Ok(Program { definitions })
}

fn build_definition(def: &pt::ParseDefinition, config: &BuildConfig) -> BcResult<Definition> {
    match def {
        pt::ParseDefinition::Function { name, params, body } => Ok(Definition::Function {
            name: name.clone(),
            params: params.clone(),
            body: build_stmt(body, config)?,
        }),
        pt::ParseDefinition::Vector {
            name,
            max_index,
            ivals,
        } => {
            let max_index = max_index
                .as_ref()
                .map(|text| parse_number_text(text))
                .transpose()?
                .map(|n| n as u64);
            let ivals = build_ivals(ivals, config)?;
            Ok(Definition::Vector {
                name: name.clone(),
                max_index,
                ivals,
            })
        }
        pt::ParseDefinition::Simple { name, ivals } => Ok(Definition::Simple {
            name: name.clone(),
            ivals: build_ivals(ivals, config)?,
        }),
    }
}

/// Reconciles a vector's allocated length from its bracketed maximum index
/// and initializer count: `max(explicit_max_index + 1, ivals.len(), 1)`.
/// An unbracketed `name` definition with more than one initializer is
/// treated the same way, as though it had been written `name[]`.
pub fn vector_length(max_index: Option<u64>, ival_count: usize) -> u64 {
    let from_index = max_index.map(|m| m + 1).unwrap_or(0);
    from_index.max(ival_count as u64).max(1)
}

fn build_ivals(ivals: &[pt::ParseIval], config: &BuildConfig) -> BcResult<Vec<Ival>> {
    ivals.iter().map(|i| build_ival(i, config)).collect()
}

fn build_ival(ival: &pt::ParseIval, config: &BuildConfig) -> BcResult<Ival> {
    match ival {
        pt::ParseIval::Ident(name) => Ok(Ival::Name(name.clone())),
        pt::ParseIval::Number(text) => Ok(Ival::Number(parse_number_text(text)?)),
        pt::ParseIval::Char(text) => {
            let bytes = decode_char_literal(text, config)?;
            Ok(Ival::Number(pack_be(&bytes)))
        }
        pt::ParseIval::Str(text) => Ok(Ival::Str(decode_string_literal(text)?)),
    }
}

fn build_stmt(stmt: &pt::ParseStmt, config: &BuildConfig) -> BcResult<Stmt> {
    Ok(match stmt {
        pt::ParseStmt::Auto(decls) => {
            let decls = decls
                .iter()
                .map(|(name, size)| {
                    let size = size
                        .as_ref()
                        .map(|text| parse_number_text(text))
                        .transpose()?
                        .map(|n| n as u64);
                    Ok((name.clone(), size))
                })
                .collect::<BcResult<Vec<_>>>()?;
            Stmt::Auto(decls)
        }
        pt::ParseStmt::Extrn(names) => Stmt::Extrn(names.clone()),
        pt::ParseStmt::Compound(stmts) => Stmt::Compound(
            stmts
                .iter()
                .map(|s| build_stmt(s, config))
                .collect::<BcResult<Vec<_>>>()?,
        ),
        pt::ParseStmt::If(cond, then_branch, else_branch) => Stmt::If {
            cond: build_expr(cond, config)?,
            then_branch: Box::new(build_stmt(then_branch, config)?),
            else_branch: else_branch
                .as_ref()
                .map(|s| build_stmt(s, config))
                .transpose()?
                .map(Box::new),
        },
        pt::ParseStmt::While(cond, body) => Stmt::While {
            cond: build_expr(cond, config)?,
            body: Box::new(build_stmt(body, config)?),
        },
        pt::ParseStmt::Switch(scrutinee, body) => Stmt::Switch {
            scrutinee: build_expr(scrutinee, config)?,
            body: Box::new(build_stmt(body, config)?),
        },
        pt::ParseStmt::Case(text, body) => Stmt::Case {
            value: parse_number_text(text)?,
            body: Box::new(build_stmt(body, config)?),
        },
        pt::ParseStmt::Default(body) => Stmt::Default {
            body: Box::new(build_stmt(body, config)?),
        },
        pt::ParseStmt::Break => Stmt::Break,
        pt::ParseStmt::Return(expr) => Stmt::Return(
            expr.as_ref()
                .map(|e| build_expr(e, config))
                .transpose()?,
        ),
        pt::ParseStmt::Goto(target) => {
            let expr = build_expr(target, config)?;
            match expr {
                Expr::Ident(name) => Stmt::Goto(name),
                _ => {
                    return Err(BcError::semantic(
                        "goto target must be a plain label name",
                    ))
                }
            }
        }
        pt::ParseStmt::Label(name, body) => Stmt::Label {
            name: name.clone(),
            body: Box::new(build_stmt(body, config)?),
        },
        pt::ParseStmt::Null => Stmt::Null,
        pt::ParseStmt::Expr(expr) => Stmt::Expr(build_expr(expr, config)?),
    })
}

fn build_expr(expr: &pt::ParseExpr, config: &BuildConfig) -> BcResult<Expr> {
    match expr {
        pt::ParseExpr::Assign { op, lhs, rhs } => {
            let lhs = build_expr(lhs, config)?;
            let rhs = build_expr(rhs, config)?;
            if lhs.as_place().is_none() {
                return Err(BcError::semantic("left side of assignment is not an lvalue"));
            }
            let op = match op {
                pt::AssignOp::Assign => AssignOp::Assign,
                pt::AssignOp::Add => AssignOp::Compound(AstBinOp::Add),
                pt::AssignOp::Sub => AssignOp::Compound(AstBinOp::Sub),
                pt::AssignOp::Mul => AssignOp::Compound(AstBinOp::Mul),
                pt::AssignOp::Div => AssignOp::Compound(AstBinOp::Div),
                pt::AssignOp::Mod => AssignOp::Compound(AstBinOp::Mod),
                pt::AssignOp::Shl => AssignOp::Compound(AstBinOp::Shl),
                pt::AssignOp::Shr => AssignOp::Compound(AstBinOp::Shr),
                pt::AssignOp::And => AssignOp::Compound(AstBinOp::And),
                pt::AssignOp::Or => AssignOp::Compound(AstBinOp::Or),
            };
            Ok(Expr::Assign {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            })
        }
        pt::ParseExpr::Ternary {
            cond,
            then_branch,
            else_branch,
        } => Ok(Expr::Ternary {
            cond: Box::new(fold_chain(cond, config)?),
            then_branch: Box::new(build_expr(then_branch, config)?),
            else_branch: Box::new(build_expr(else_branch, config)?),
        }),
        pt::ParseExpr::Chain(chain) => fold_chain(chain, config),
    }
}

/// B's precedence table, tightest-binding first. `&&`/`||` do not exist in
/// this dialect; `&`/`|` are plain bitwise operators one level below
/// equality, matching the historical grammar.
const PRECEDENCE_LEVELS: &[&[pt::BinOp]] = &[
    &[pt::BinOp::Mul, pt::BinOp::Div, pt::BinOp::Mod],
    &[pt::BinOp::Add, pt::BinOp::Sub],
    &[pt::BinOp::Shl, pt::BinOp::Shr],
    &[pt::BinOp::Lt, pt::BinOp::Le, pt::BinOp::Gt, pt::BinOp::Ge],
    &[pt::BinOp::Eq, pt::BinOp::Ne],
    &[pt::BinOp::And],
    &[pt::BinOp::Or],
];

fn fold_chain(chain: &pt::OperatorChain, config: &BuildConfig) -> BcResult<Expr> {
    let mut operands = vec![build_unary(&chain.first, config)?];
    let mut operators = Vec::with_capacity(chain.rest.len());
    for (op, unary) in &chain.rest {
        operators.push(*op);
        operands.push(build_unary(unary, config)?);
    }

    for level in PRECEDENCE_LEVELS {
        let mut i = 0;
        while i < operators.len() {
            if level.contains(&operators[i]) {
                let lhs = operands.remove(i);
                let rhs = operands.remove(i);
                let folded = Expr::Binary {
                    op: convert_bin_op(operators[i]),
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                };
                operands.insert(i, folded);
                operators.remove(i);
            } else {
                i += 1;
            }
        }
    }

    debug_assert!(operators.is_empty());
    Ok(operands.into_iter().next().expect("chain always has one operand"))
}

fn convert_bin_op(op: pt::BinOp) -> AstBinOp {
    match op {
        pt::BinOp::Shl => AstBinOp::Shl,
        pt::BinOp::Shr => AstBinOp::Shr,
        pt::BinOp::Le => AstBinOp::Le,
        pt::BinOp::Ge => AstBinOp::Ge,
        pt::BinOp::Eq => AstBinOp::Eq,
        pt::BinOp::Ne => AstBinOp::Ne,
        pt::BinOp::Lt => AstBinOp::Lt,
        pt::BinOp::Gt => AstBinOp::Gt,
        pt::BinOp::Add => AstBinOp::Add,
        pt::BinOp::Sub => AstBinOp::Sub,
        pt::BinOp::Mul => AstBinOp::Mul,
        pt::BinOp::Div => AstBinOp::Div,
        pt::BinOp::Mod => AstBinOp::Mod,
        pt::BinOp::And => AstBinOp::And,
        pt::BinOp::Or => AstBinOp::Or,
    }
}

/// Binds a unary's suffixes first, then its trailing postfix `++`/`--`, then
/// its prefix operators applied in reverse order so `**p` parses as
/// `Deref(Deref(p))` rather than the other way round.
fn build_unary(unary: &pt::ParseUnary, config: &BuildConfig) -> BcResult<Expr> {
    let mut expr = build_postfix_expr(&unary.postfix_expr, config)?;

    for op in &unary.trailing {
        expr = match op {
            pt::PostfixOp::Incr => Expr::PostIncr(Box::new(expr)),
            pt::PostfixOp::Decr => Expr::PostDecr(Box::new(expr)),
        };
    }

    for op in unary.prefix.iter().rev() {
        expr = match op {
            pt::PrefixOp::Incr => Expr::PreIncr(Box::new(expr)),
            pt::PrefixOp::Decr => Expr::PreDecr(Box::new(expr)),
            pt::PrefixOp::Neg => Expr::Neg(Box::new(expr)),
            pt::PrefixOp::Not => Expr::Not(Box::new(expr)),
            pt::PrefixOp::Complement => Expr::Complement(Box::new(expr)),
            pt::PrefixOp::Deref => Expr::Deref(Box::new(expr)),
            pt::PrefixOp::AddrOf => Expr::AddrOf(Box::new(expr)),
        };
    }

    Ok(expr)
}

fn build_postfix_expr(postfix: &pt::ParsePostfixExpr, config: &BuildConfig) -> BcResult<Expr> {
    let mut expr = build_primary(&postfix.primary, config)?;
    for suffix in &postfix.suffixes {
        expr = match suffix {
            // `a[b]` is sugar for `*(a + b)`: desugared here so the rest of
            // the frontend only ever sees `Deref`/`Binary(Add, ..)`.
            pt::ParseSuffix::Index(index) => Expr::Deref(Box::new(Expr::Binary {
                op: AstBinOp::Add,
                lhs: Box::new(expr),
                rhs: Box::new(build_expr(index, config)?),
            })),
            pt::ParseSuffix::Call(args) => Expr::Call {
                callee: Box::new(expr),
                args: args
                    .iter()
                    .map(|a| build_expr(a, config))
                    .collect::<BcResult<Vec<_>>>()?,
            },
        };
    }
    Ok(expr)
}

fn build_primary(primary: &pt::ParsePrimary, config: &BuildConfig) -> BcResult<Expr> {
    Ok(match primary {
        pt::ParsePrimary::Paren(inner) => build_expr(inner, config)?,
        pt::ParsePrimary::Number(text) => Expr::Number(parse_number_text(text)?),
        pt::ParsePrimary::Char(text) => {
            let bytes = decode_char_literal(text, config)?;
            Expr::Number(pack_be(&bytes))
        }
        pt::ParsePrimary::Str(text) => Expr::Str(decode_string_literal(text)?),
        pt::ParsePrimary::Ident(name) => {
            if name == "__bytes_per_word" {
                Expr::BytesPerWord
            } else {
                Expr::Ident(name.clone())
            }
        }
    })
}

/// Parses a lexed number token: a leading `0` marks octal, matching B's
/// convention (there is no `0x` prefix in this dialect).
fn parse_number_text(text: &str) -> BcResult<i64> {
    if text == "0" {
        return Ok(0);
    }
    if let Some(rest) = text.strip_prefix('0') {
        i64::from_str_radix(rest, 8)
            .map_err(|e| BcError::semantic(format!("invalid octal literal `{text}`: {e}")))
    } else {
        text.parse::<i64>()
            .map_err(|e| BcError::semantic(format!("invalid decimal literal `{text}`: {e}")))
    }
}

/// Decodes one `*`-escape inside a char or string literal body. `text` is
/// the raw grammar-matched body (without surrounding quotes).
fn decode_escapes(text: &str) -> BcResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '*' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let escaped = chars
            .next()
            .ok_or_else(|| BcError::semantic("dangling `*` escape at end of literal"))?;
        match escaped {
            'n' => out.push(0x0A),
            't' => out.push(0x09),
            '0' => out.push(0x00),
            'e' => out.push(0x04),
            '(' => out.push(b'{'),
            ')' => out.push(b'}'),
            '*' => out.push(b'*'),
            '\'' => out.push(b'\''),
            '"' => out.push(b'"'),
            other => {
                return Err(BcError::semantic(format!(
                    "unknown escape `*{other}` in literal"
                )))
            }
        }
    }
    Ok(out)
}

fn decode_char_literal(text: &str, config: &BuildConfig) -> BcResult<Vec<u8>> {
    let bytes = decode_escapes(text)?;
    if bytes.len() as u64 > config.bytes_per_word {
        return Err(BcError::semantic(format!(
            "character constant `{text}` holds more bytes than fit in a word"
        )));
    }
    Ok(bytes)
}

/// String literals are terminated with B's 0x04 sentinel byte; that is
/// appended once, at the string-constant pool, not here (Open Question 2),
/// so this only decodes escapes.
fn decode_string_literal(text: &str) -> BcResult<Vec<u8>> {
    decode_escapes(text)
}

/// Packs up to `bytes_per_word` bytes big-endian into a single word, as B's
/// multi-character constants do (`'ab'` is `(a << 8) | b`, not `a | (b << 8)`).
fn pack_be(bytes: &[u8]) -> i64 {
    let mut acc: i64 = 0;
    for &b in bytes {
        acc = (acc << 8) | b as i64;
    }
    acc
}

impl Place {
    /// Re-derives the `Expr` this place was built from, for contexts that
    /// need to re-emit it as an r-value (e.g. compound assignment reads the
    /// current value before writing the new one).
    pub fn as_expr(&self) -> Expr {
        match self {
            Place::Ident(name) => Expr::Ident(name.clone()),
            Place::Deref(inner) => Expr::Deref(Box::new(inner.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bc_syntax::parse_program;

    fn build_src(src: &str) -> Program {
        let parsed = parse_program(src).expect("parse");
        build_program(&parsed, &BuildConfig::default()).expect("build")
    }

    #[test]
    fn folds_precedence_so_mul_binds_tighter_than_add() {
        let program = build_src("f() { return(1 + 2 * 3); }");
        let Definition::Function { body, .. } = &program.definitions[0] else {
            panic!("expected function");
        };
        let Stmt::Compound(stmts) = body else {
            panic!("expected compound body");
        };
        let Stmt::Return(Some(expr)) = &stmts[0] else {
            panic!("expected return");
        };
        match expr {
            Expr::Binary { op: AstBinOp::Add, lhs, rhs } => {
                assert_eq!(**lhs, Expr::Number(1));
                match &**rhs {
                    Expr::Binary { op: AstBinOp::Mul, lhs, rhs } => {
                        assert_eq!(**lhs, Expr::Number(2));
                        assert_eq!(**rhs, Expr::Number(3));
                    }
                    other => panic!("expected nested mul, got {other:?}"),
                }
            }
            other => panic!("expected top-level add, got {other:?}"),
        }
    }

    #[test]
    fn desugars_index_to_deref_of_add() {
        let program = build_src("f(a, b) { return(a[b]); }");
        let Definition::Function { body, .. } = &program.definitions[0] else {
            panic!("expected function");
        };
        let Stmt::Compound(stmts) = body else {
            panic!("expected compound body");
        };
        let Stmt::Return(Some(expr)) = &stmts[0] else {
            panic!("expected return");
        };
        match expr {
            Expr::Deref(inner) => match &**inner {
                Expr::Binary { op: AstBinOp::Add, lhs, rhs } => {
                    assert_eq!(**lhs, Expr::Ident("a".to_string()));
                    assert_eq!(**rhs, Expr::Ident("b".to_string()));
                }
                other => panic!("expected Binary(Add), got {other:?}"),
            },
            other => panic!("expected Deref, got {other:?}"),
        }
    }

    #[test]
    fn double_deref_binds_prefix_ops_innermost_first() {
        let program = build_src("f(p) { return(**p); }");
        let Definition::Function { body, .. } = &program.definitions[0] else {
            panic!("expected function");
        };
        let Stmt::Compound(stmts) = body else {
            panic!("expected compound body");
        };
        let Stmt::Return(Some(expr)) = &stmts[0] else {
            panic!("expected return");
        };
        match expr {
            Expr::Deref(outer) => match &**outer {
                Expr::Deref(inner) => assert_eq!(**inner, Expr::Ident("p".to_string())),
                other => panic!("expected nested Deref, got {other:?}"),
            },
            other => panic!("expected Deref, got {other:?}"),
        }
    }

    #[test]
    fn vector_length_takes_the_max_of_index_and_initializer_count() {
        assert_eq!(vector_length(Some(4), 1), 5);
        assert_eq!(vector_length(Some(1), 3), 3);
        assert_eq!(vector_length(None, 0), 1);
    }

    #[test]
    fn rejects_assignment_to_non_lvalue() {
        let parsed = parse_program("f() { 1 = 2; }").expect("parse");
        let err = build_program(&parsed, &BuildConfig::default()).unwrap_err();
        assert!(matches!(err, BcError::Semantic(_)));
    }

    #[test]
    fn decodes_star_escapes_in_strings() {
        let program = build_src(r#"f() { return("hi*n"); }"#);
        let Definition::Function { body, .. } = &program.definitions[0] else {
            panic!("expected function");
        };
        let Stmt::Compound(stmts) = body else {
            panic!("expected compound body");
        };
        let Stmt::Return(Some(Expr::Str(bytes))) = &stmts[0] else {
            panic!("expected string return");
        };
        assert_eq!(bytes, b"hi\n");
    }

    #[test]
    fn packs_multi_char_constant_big_endian() {
        let program = build_src("f() { return('ab'); }");
        let Definition::Function { body, .. } = &program.definitions[0] else {
            panic!("expected function");
        };
        let Stmt::Compound(stmts) = body else {
            panic!("expected compound body");
        };
        let Stmt::Return(Some(Expr::Number(n))) = &stmts[0] else {
            panic!("expected number return");
        };
        assert_eq!(*n, ((b'a' as i64) << 8) | b'b' as i64);
    }

    #[test]
    fn octal_literal_with_leading_zero() {
        assert_eq!(parse_number_text("017").unwrap(), 15);
        assert_eq!(parse_number_text("10").unwrap(), 10);
    }
}
