//! Compact source rendering for debugging and golden assertions.
//!
//! Not a production emitter: it prints a single line with fixed spacing
//! and ignores operator precedence beyond parenthesizing function-valued
//! callees, which is all the lowering tests need.

use crate::node::{Ast, Kind, NodeId, Prop};

/// Render the subtree rooted at `n` as source text.
pub fn to_source(ast: &Ast, n: NodeId) -> String {
    match ast.kind(n) {
        Kind::Script => join_stmts(ast, n),
        _ => stmt(ast, n),
    }
}

fn join_stmts(ast: &Ast, n: NodeId) -> String {
    ast.children(n)
        .iter()
        .map(|&c| stmt(ast, c))
        .collect::<Vec<_>>()
        .join(" ")
}

fn stmt(ast: &Ast, n: NodeId) -> String {
    match ast.kind(n) {
        Kind::Block => {
            if !ast.has_children(n) {
                "{}".to_string()
            } else {
                format!("{{ {} }}", join_stmts(ast, n))
            }
        }
        Kind::Var | Kind::Let | Kind::Const => format!("{};", decl_text(ast, n)),
        Kind::ExprResult => format!("{};", expr(ast, ast.child(n, 0))),
        Kind::If => {
            let mut s = format!(
                "if ({}) {}",
                expr(ast, ast.child(n, 0)),
                stmt(ast, ast.child(n, 1))
            );
            if ast.child_count(n) > 2 {
                s.push_str(&format!(" else {}", stmt(ast, ast.child(n, 2))));
            }
            s
        }
        Kind::For => format!(
            "for ({}; {}; {}) {}",
            header(ast, ast.child(n, 0)),
            header(ast, ast.child(n, 1)),
            header(ast, ast.child(n, 2)),
            stmt(ast, ast.child(n, 3))
        ),
        Kind::ForIn => format!(
            "for ({} in {}) {}",
            header(ast, ast.child(n, 0)),
            expr(ast, ast.child(n, 1)),
            stmt(ast, ast.child(n, 2))
        ),
        Kind::ForOf => format!(
            "for ({} of {}) {}",
            header(ast, ast.child(n, 0)),
            expr(ast, ast.child(n, 1)),
            stmt(ast, ast.child(n, 2))
        ),
        Kind::While => format!(
            "while ({}) {}",
            expr(ast, ast.child(n, 0)),
            stmt(ast, ast.child(n, 1))
        ),
        Kind::Do => format!(
            "do {} while ({});",
            stmt(ast, ast.child(n, 0)),
            expr(ast, ast.child(n, 1))
        ),
        Kind::Return => match ast.first_child(n) {
            Some(e) => format!("return {};", expr(ast, e)),
            None => "return;".to_string(),
        },
        Kind::Label => format!("{}: {}", ast.string(n), stmt(ast, ast.child(n, 0))),
        Kind::Try => {
            let mut s = format!("try {}", stmt(ast, ast.child(n, 0)));
            for &c in &ast.children(n)[1..] {
                if ast.kind(c) == Kind::Catch {
                    s.push_str(&format!(" {}", stmt(ast, c)));
                } else {
                    s.push_str(&format!(" finally {}", stmt(ast, c)));
                }
            }
            s
        }
        Kind::Catch => format!(
            "catch ({}) {}",
            ast.string(ast.child(n, 0)),
            stmt(ast, ast.child(n, 1))
        ),
        Kind::Class => format!(
            "class {} {}",
            ast.string(ast.child(n, 0)),
            stmt(ast, ast.child(n, 1))
        ),
        Kind::Function => expr(ast, n),
        Kind::Empty => ";".to_string(),
        _ => format!("{};", expr(ast, n)),
    }
}

/// A `for` header slot or declaration header: no trailing semicolon, and
/// `Empty` renders as nothing.
fn header(ast: &Ast, n: NodeId) -> String {
    match ast.kind(n) {
        Kind::Empty => String::new(),
        Kind::Var | Kind::Let | Kind::Const => decl_text(ast, n),
        _ => expr(ast, n),
    }
}

fn decl_text(ast: &Ast, n: NodeId) -> String {
    let kw = match ast.kind(n) {
        Kind::Var => "var",
        Kind::Let => "let",
        Kind::Const => "const",
        other => unreachable!("not a declaration: {other:?}"),
    };
    let declarators = ast
        .children(n)
        .iter()
        .map(|&d| match ast.first_child(d) {
            Some(init) => format!("{} = {}", ast.string(d), expr(ast, init)),
            None => ast.string(d).to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    let prefix = if ast.bool_prop(n, Prop::Const) {
        "/** @const */ "
    } else {
        ""
    };
    format!("{prefix}{kw} {declarators}")
}

fn expr(ast: &Ast, n: NodeId) -> String {
    match ast.kind(n) {
        Kind::Name | Kind::Num => ast.string(n).to_string(),
        Kind::Str => format!("\"{}\"", ast.string(n)),
        Kind::Assign => format!(
            "{} = {}",
            expr(ast, ast.child(n, 0)),
            expr(ast, ast.child(n, 1))
        ),
        Kind::Comma => format!(
            "{}, {}",
            expr(ast, ast.child(n, 0)),
            expr(ast, ast.child(n, 1))
        ),
        Kind::Bin => format!(
            "{} {} {}",
            expr(ast, ast.child(n, 0)),
            ast.string(n),
            expr(ast, ast.child(n, 1))
        ),
        Kind::Inc => format!("{}++", expr(ast, ast.child(n, 0))),
        Kind::Call => {
            let callee = ast.child(n, 0);
            let callee_text = if ast.kind(callee) == Kind::Function {
                format!("({})", expr(ast, callee))
            } else {
                expr(ast, callee)
            };
            let args = ast.children(n)[1..]
                .iter()
                .map(|&a| expr(ast, a))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{callee_text}({args})")
        }
        Kind::GetProp => format!(
            "{}.{}",
            expr(ast, ast.child(n, 0)),
            ast.string(ast.child(n, 1))
        ),
        Kind::ObjectLit => {
            if !ast.has_children(n) {
                "{}".to_string()
            } else {
                let entries = ast
                    .children(n)
                    .iter()
                    .map(|&k| format!("{}: {}", ast.string(k), expr(ast, ast.child(k, 0))))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{entries}}}")
            }
        }
        Kind::Function => {
            let name = ast.string(ast.child(n, 0));
            let params = ast
                .children(ast.child(n, 1))
                .iter()
                .map(|&p| ast.string(p).to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let body = stmt(ast, ast.child(n, 2));
            if name.is_empty() {
                format!("function({params}) {body}")
            } else {
                format!("function {name}({params}) {body}")
            }
        }
        Kind::Cast => expr(ast, ast.child(n, 0)),
        other => unreachable!("not an expression: {other:?}"),
    }
}
