use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use tracing::instrument;

use crate::tree::*;

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct BGrammarParser;

#[derive(Debug)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseError {}

#[instrument(level = "debug", skip(source))]
pub fn parse_program(source: &str) -> Result<ParseProgram, ParseError> {
    let mut pairs =
        BGrammarParser::parse(Rule::program, source).map_err(|e| ParseError(e.to_string()))?;
    let program_pair = pairs.next().expect("program rule always matches SOI..EOI");
    let definitions = program_pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::definition)
        .map(convert_definition)
        .collect();
    Ok(ParseProgram { definitions })
}

fn convert_definition(pair: Pair<Rule>) -> ParseDefinition {
    let inner = pair.into_inner().next().expect("definition has one child");
    match inner.as_rule() {
        Rule::function_def => convert_function_def(inner),
        Rule::vector_def => convert_vector_def(inner),
        Rule::simple_def => convert_simple_def(inner),
        rule => unreachable!("unexpected definition alternative {rule:?}"),
    }
}

fn convert_function_def(pair: Pair<Rule>) -> ParseDefinition {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_string();
    let mut params = Vec::new();
    let mut body = None;
    for p in inner {
        match p.as_rule() {
            Rule::param_list => {
                params = p.into_inner().map(|id| id.as_str().to_string()).collect();
            }
            Rule::compound_stmt => {
                body = Some(convert_compound(p));
            }
            rule => unreachable!("unexpected function_def child {rule:?}"),
        }
    }
    ParseDefinition::Function {
        name,
        params,
        body: body.expect("function_def always has a compound_stmt"),
    }
}

fn convert_vector_def(pair: Pair<Rule>) -> ParseDefinition {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_string();
    let vector_suffix = inner.next().expect("vector_def has a vector_suffix");
    let max_index = vector_suffix
        .into_inner()
        .next()
        .map(|p| p.as_str().to_string());
    let ivals = inner
        .next()
        .map(convert_ival_list)
        .unwrap_or_default();
    ParseDefinition::Vector {
        name,
        max_index,
        ivals,
    }
}

fn convert_simple_def(pair: Pair<Rule>) -> ParseDefinition {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_string();
    let ivals = inner.next().map(convert_ival_list).unwrap_or_default();
    ParseDefinition::Simple { name, ivals }
}

fn convert_ival_list(pair: Pair<Rule>) -> Vec<ParseIval> {
    pair.into_inner().map(convert_ival).collect()
}

fn convert_ival(pair: Pair<Rule>) -> ParseIval {
    let inner = pair.into_inner().next().expect("ival has one child");
    let text = inner.as_str().to_string();
    match inner.as_rule() {
        Rule::ident => ParseIval::Ident(text),
        Rule::number_lit => ParseIval::Number(text),
        Rule::char_lit => ParseIval::Char(text),
        Rule::string_lit => ParseIval::Str(text),
        rule => unreachable!("unexpected ival alternative {rule:?}"),
    }
}

fn convert_compound(pair: Pair<Rule>) -> ParseStmt {
    ParseStmt::Compound(pair.into_inner().map(convert_statement).collect())
}

fn convert_statement(pair: Pair<Rule>) -> ParseStmt {
    let inner = pair.into_inner().next().expect("statement has one child");
    match inner.as_rule() {
        Rule::compound_stmt => convert_compound(inner),
        Rule::auto_stmt => convert_auto(inner),
        Rule::extrn_stmt => {
            ParseStmt::Extrn(inner.into_inner().map(|id| id.as_str().to_string()).collect())
        }
        Rule::if_stmt => convert_if(inner),
        Rule::while_stmt => convert_while(inner),
        Rule::switch_stmt => convert_switch(inner),
        Rule::case_stmt => convert_case(inner),
        Rule::default_stmt => {
            let body = inner.into_inner().next().expect("default_stmt has a body");
            ParseStmt::Default(Box::new(convert_statement(body)))
        }
        Rule::break_stmt => ParseStmt::Break,
        Rule::return_stmt => {
            let expr = inner.into_inner().next().map(convert_expr);
            ParseStmt::Return(expr)
        }
        Rule::goto_stmt => {
            let expr = inner.into_inner().next().expect("goto_stmt has an expr");
            ParseStmt::Goto(convert_expr(expr))
        }
        Rule::label_stmt => convert_label(inner),
        Rule::null_stmt => ParseStmt::Null,
        Rule::expr_stmt => {
            let expr = inner.into_inner().next().expect("expr_stmt has an expr");
            ParseStmt::Expr(convert_expr(expr))
        }
        rule => unreachable!("unexpected statement alternative {rule:?}"),
    }
}

fn convert_auto(pair: Pair<Rule>) -> ParseStmt {
    let decls = pair
        .into_inner()
        .map(|decl| {
            let mut parts = decl.into_inner();
            let name = parts.next().unwrap().as_str().to_string();
            let size = parts.next().map(|p| p.as_str().to_string());
            (name, size)
        })
        .collect();
    ParseStmt::Auto(decls)
}

fn convert_if(pair: Pair<Rule>) -> ParseStmt {
    let mut inner = pair.into_inner();
    let cond = convert_expr(inner.next().unwrap());
    let then_branch = Box::new(convert_statement(inner.next().unwrap()));
    let else_branch = inner.next().map(|p| Box::new(convert_statement(p)));
    ParseStmt::If(cond, then_branch, else_branch)
}

fn convert_while(pair: Pair<Rule>) -> ParseStmt {
    let mut inner = pair.into_inner();
    let cond = convert_expr(inner.next().unwrap());
    let body = Box::new(convert_statement(inner.next().unwrap()));
    ParseStmt::While(cond, body)
}

fn convert_switch(pair: Pair<Rule>) -> ParseStmt {
    let mut inner = pair.into_inner();
    let scrutinee = convert_expr(inner.next().unwrap());
    let body = Box::new(convert_statement(inner.next().unwrap()));
    ParseStmt::Switch(scrutinee, body)
}

fn convert_case(pair: Pair<Rule>) -> ParseStmt {
    let mut inner = pair.into_inner();
    let value = inner.next().unwrap().as_str().to_string();
    let body = Box::new(convert_statement(inner.next().unwrap()));
    ParseStmt::Case(value, body)
}

fn convert_label(pair: Pair<Rule>) -> ParseStmt {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_string();
    let body = Box::new(convert_statement(inner.next().unwrap()));
    ParseStmt::Label(name, body)
}

fn convert_expr(pair: Pair<Rule>) -> ParseExpr {
    debug_assert_eq!(pair.as_rule(), Rule::expr);
    let mut inner = pair.into_inner();
    let ternary = inner.next().expect("expr always starts with a ternary_expr");
    let lhs = convert_ternary(ternary);
    match (inner.next(), inner.next()) {
        (Some(op_pair), Some(rhs_pair)) => {
            let op = convert_assign_op(op_pair.as_str());
            ParseExpr::Assign {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(convert_expr(rhs_pair)),
            }
        }
        _ => lhs,
    }
}

fn convert_assign_op(text: &str) -> AssignOp {
    match text {
        "=" => AssignOp::Assign,
        "=+" => AssignOp::Add,
        "=-" => AssignOp::Sub,
        "=*" => AssignOp::Mul,
        "=/" => AssignOp::Div,
        "=%" => AssignOp::Mod,
        "=<<" => AssignOp::Shl,
        "=>>" => AssignOp::Shr,
        "=&" => AssignOp::And,
        "=|" => AssignOp::Or,
        other => unreachable!("unexpected assignment operator {other:?}"),
    }
}

fn convert_ternary(pair: Pair<Rule>) -> ParseExpr {
    let mut inner = pair.into_inner();
    let chain = convert_operator_chain(inner.next().unwrap());
    match (inner.next(), inner.next()) {
        (Some(then_pair), Some(else_pair)) => ParseExpr::Ternary {
            cond: chain,
            then_branch: Box::new(convert_expr(then_pair)),
            else_branch: Box::new(convert_conditional(else_pair)),
        },
        _ => ParseExpr::Chain(chain),
    }
}

fn convert_conditional(pair: Pair<Rule>) -> ParseExpr {
    // `conditional_expr` has the same shape as `ternary_expr`.
    convert_ternary(pair)
}

fn convert_operator_chain(pair: Pair<Rule>) -> OperatorChain {
    let mut inner = pair.into_inner();
    let first = convert_unary(inner.next().unwrap());
    let mut rest = Vec::new();
    let remaining: Vec<Pair<Rule>> = inner.collect();
    let mut iter = remaining.into_iter();
    while let (Some(op_pair), Some(operand_pair)) = (iter.next(), iter.next()) {
        rest.push((convert_bin_op(op_pair.as_str()), convert_unary(operand_pair)));
    }
    OperatorChain { first, rest }
}

fn convert_bin_op(text: &str) -> BinOp {
    match text {
        "<<" => BinOp::Shl,
        ">>" => BinOp::Shr,
        "<=" => BinOp::Le,
        ">=" => BinOp::Ge,
        "==" => BinOp::Eq,
        "!=" => BinOp::Ne,
        "<" => BinOp::Lt,
        ">" => BinOp::Gt,
        "+" => BinOp::Add,
        "-" => BinOp::Sub,
        "*" => BinOp::Mul,
        "/" => BinOp::Div,
        "%" => BinOp::Mod,
        "&" => BinOp::And,
        "|" => BinOp::Or,
        other => unreachable!("unexpected binary operator {other:?}"),
    }
}

fn convert_unary(pair: Pair<Rule>) -> ParseUnary {
    let mut prefix = Vec::new();
    let mut postfix_expr = None;
    let mut trailing = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::prefix_op => prefix.push(convert_prefix_op(p.as_str())),
            Rule::postfix_expr => postfix_expr = Some(convert_postfix_expr(p)),
            Rule::postfix_op => trailing.push(convert_postfix_op(p.as_str())),
            rule => unreachable!("unexpected unary_expr child {rule:?}"),
        }
    }
    ParseUnary {
        prefix,
        postfix_expr: postfix_expr.expect("unary_expr always has a postfix_expr"),
        trailing,
    }
}

fn convert_prefix_op(text: &str) -> PrefixOp {
    match text {
        "++" => PrefixOp::Incr,
        "--" => PrefixOp::Decr,
        "-" => PrefixOp::Neg,
        "!" => PrefixOp::Not,
        "~" => PrefixOp::Complement,
        "*" => PrefixOp::Deref,
        "&" => PrefixOp::AddrOf,
        other => unreachable!("unexpected prefix operator {other:?}"),
    }
}

fn convert_postfix_op(text: &str) -> PostfixOp {
    match text {
        "++" => PostfixOp::Incr,
        "--" => PostfixOp::Decr,
        other => unreachable!("unexpected postfix operator {other:?}"),
    }
}

fn convert_postfix_expr(pair: Pair<Rule>) -> ParsePostfixExpr {
    let mut inner = pair.into_inner();
    let primary = convert_primary(inner.next().unwrap());
    let suffixes = inner.map(convert_suffix).collect();
    ParsePostfixExpr { primary, suffixes }
}

fn convert_suffix(pair: Pair<Rule>) -> ParseSuffix {
    match pair.as_rule() {
        Rule::index_suffix => {
            let expr = pair.into_inner().next().expect("index_suffix has an expr");
            ParseSuffix::Index(Box::new(convert_expr(expr)))
        }
        Rule::call_suffix => {
            let args = pair
                .into_inner()
                .next()
                .map(convert_arg_list)
                .unwrap_or_default();
            ParseSuffix::Call(args)
        }
        rule => unreachable!("unexpected suffix alternative {rule:?}"),
    }
}

fn convert_arg_list(pair: Pair<Rule>) -> Vec<ParseExpr> {
    pair.into_inner().map(convert_expr).collect()
}

fn convert_primary(pair: Pair<Rule>) -> ParsePrimary {
    debug_assert_eq!(pair.as_rule(), Rule::primary);
    let inner = pair.into_inner().next().expect("primary always has one child");
    let text = inner.as_str().to_string();
    match inner.as_rule() {
        Rule::number_lit => ParsePrimary::Number(text),
        Rule::char_lit => ParsePrimary::Char(text),
        Rule::string_lit => ParsePrimary::Str(text),
        Rule::ident => ParsePrimary::Ident(text),
        Rule::expr => ParsePrimary::Paren(Box::new(convert_expr(inner))),
        rule => unreachable!("unexpected primary alternative {rule:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_countdown_function() {
        let program = parse_program(
            "countdown(n) {\n\
             \tauto i;\n\
             \ti = n;\n\
             \twhile (i) {\n\
             \t\ti = i - 1;\n\
             \t}\n\
             \treturn(i);\n\
             }",
        )
        .unwrap();
        assert_eq!(program.definitions.len(), 1);
        match &program.definitions[0] {
            ParseDefinition::Function { name, params, body } => {
                assert_eq!(name, "countdown");
                assert_eq!(params, &["n".to_string()]);
                match body {
                    ParseStmt::Compound(stmts) => assert_eq!(stmts.len(), 3),
                    other => panic!("expected compound body, got {other:?}"),
                }
            }
            other => panic!("expected a function definition, got {other:?}"),
        }
    }

    #[test]
    fn parses_vector_with_initializer_list() {
        let program = parse_program("v[3] 1, 2, 3;").unwrap();
        match &program.definitions[0] {
            ParseDefinition::Vector {
                name,
                max_index,
                ivals,
            } => {
                assert_eq!(name, "v");
                assert_eq!(max_index.as_deref(), Some("3"));
                assert_eq!(ivals.len(), 3);
            }
            other => panic!("expected a vector definition, got {other:?}"),
        }
    }

    #[test]
    fn parses_switch_with_fallthrough_cases() {
        let program = parse_program(
            "f(x) {\n\
             \tswitch (x) {\n\
             \tcase 1:\n\
             \tcase 2:\n\
             \t\tx = 1;\n\
             \t\tbreak;\n\
             \tdefault:\n\
             \t\tx = 0;\n\
             \t}\n\
             }",
        )
        .unwrap();
        assert_eq!(program.definitions.len(), 1);
    }

    #[test]
    fn parses_operator_chain_without_resolving_precedence() {
        let program = parse_program("f() { return(1 + 2 * 3); }").unwrap();
        let ParseDefinition::Function { body, .. } = &program.definitions[0] else {
            panic!("expected function");
        };
        let ParseStmt::Compound(stmts) = body else {
            panic!("expected compound body");
        };
        let ParseStmt::Return(Some(ParseExpr::Chain(chain))) = &stmts[0] else {
            panic!("expected a return of an operator chain");
        };
        // Flat: `1` followed by (Add, 2) and (Mul, 3) -- no precedence applied.
        assert_eq!(chain.rest.len(), 2);
        assert_eq!(chain.rest[0].0, BinOp::Add);
        assert_eq!(chain.rest[1].0, BinOp::Mul);
    }

    #[test]
    fn identifier_may_contain_a_backspace_byte() {
        let program = parse_program("a\u{8}b() { return(1); }").unwrap();
        match &program.definitions[0] {
            ParseDefinition::Function { name, .. } => assert_eq!(name, "a\u{8}b"),
            other => panic!("expected a function definition, got {other:?}"),
        }
    }

    #[test]
    fn parses_string_and_char_literals_with_star_escapes() {
        let program = parse_program("main() { return(\"hi*n\"); }").unwrap();
        let ParseDefinition::Function { body, .. } = &program.definitions[0] else {
            panic!("expected function");
        };
        let ParseStmt::Compound(stmts) = body else {
            panic!("expected compound body");
        };
        let ParseStmt::Return(Some(ParseExpr::Chain(chain))) = &stmts[0] else {
            panic!("expected a return of a chain");
        };
        match &chain.first.postfix_expr.primary {
            ParsePrimary::Str(text) => assert_eq!(text, "hi*n"),
            other => panic!("expected a string literal primary, got {other:?}"),
        }
    }
}
