//! # Parsing trees, expressions and models
//!
//! Three grammars live here. The bracket grammar reads the serialized form of
//! a [`Tree`] (`{label{child}{child}}`), which is how trees are stored inside
//! edit actions and corpus files. The expression grammar reads the subset of
//! the Alloy expression language that [`crate::producer::AlloyProducer`]
//! understands and produces an unresolved [`Expr`]; resolving identifiers
//! against an exercise model happens in the producer. The model grammar
//! collects the [`Declarations`] of an exercise model and skips everything
//! else.

use crate::tree::Tree;

use chumsky::prelude::*;
use indexmap::IndexSet;

// Shorthand

trait P<T>: Parser<char, T, Error = Simple<char>> {}
impl<S, T> P<T> for S where S: Parser<char, T, Error = Simple<char>> {}

// Errors

fn error(
    title: &str,
    code: i32,
    source: &'static str,
    src: &str,
    err: &Simple<char>,
) -> String {
    use ariadne::*;

    let err_span = err.span();
    let err_expected = err
        .expected()
        .filter_map(|mtok| mtok.map(|tok| format!("`{}`", tok)))
        .collect::<Vec<_>>();

    let error_color = Color::Red;

    let mut report =
        Report::build(ReportKind::Error, source, err_span.start)
            .with_code(code)
            .with_message(title)
            .with_label(
                Label::new((source, err_span))
                    .with_message(format!(
                        "{}",
                        "Unexpected token".fg(error_color),
                    ))
                    .with_color(error_color),
            );

    if !err_expected.is_empty() {
        report = report.with_note(format!(
            "{}{}",
            if err_expected.len() == 1 {
                format!("Expected {}", err_expected[0])
            } else {
                format!("Expected one of {}", err_expected.join(", "))
            },
            match err.found() {
                Some(tok) => format!(", but found `{}`", tok),
                None => "".to_owned(),
            }
        ));
    }

    let mut buf: Vec<u8> = vec![];
    match report
        .finish()
        .write(sources(vec![(source, src)]), &mut buf)
    {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("{}: {}", title, err),
    }
}

fn first_error(
    title: &str,
    code: i32,
    source: &'static str,
    src: &str,
    errs: Vec<Simple<char>>,
) -> String {
    match errs.first() {
        Some(err) => error(title, code, source, src, err),
        None => title.to_owned(),
    }
}

////////////////////////////////////////////////////////////////////////////////
// Bracket trees

fn bracket_tree() -> impl P<Tree> {
    recursive(|tree| {
        let escaped = just('\\').ignore_then(one_of("{}\\"));
        let plain = none_of("{}\\");
        let label = escaped.or(plain).repeated().at_least(1).collect::<String>();
        label
            .then(tree.repeated())
            .delimited_by(just('{'), just('}'))
            .map(|(label, children)| Tree::new(label, children))
    })
}

/// Parse a tree in bracket notation
pub fn tree(src: &str) -> Result<Tree, String> {
    bracket_tree()
        .padded()
        .then_ignore(end())
        .parse(src)
        .map_err(|errs| first_error("Tree parse error", 0, "tree", src, errs))
}

////////////////////////////////////////////////////////////////////////////////
// Expressions

/// The unresolved syntax of an expression.
///
/// Operator names are normalized: `&&` becomes `and`, `=>` becomes
/// `implies`, and so on, so that alternate spellings produce the same tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Name(String),
    Int(String),
    Const(String),
    Unary(String, Box<Expr>),
    Binary(String, Box<Expr>, Box<Expr>),
    Quant {
        op: String,
        disj: bool,
        vars: Vec<String>,
        bound: Box<Expr>,
        body: Box<Expr>,
    },
}

const KEYWORDS: &[&str] = &[
    "all", "and", "disj", "iden", "iff", "implies", "in", "lone", "no", "none",
    "not", "one", "or", "some", "univ",
];

const QUANTIFIERS: &[&str] = &["all", "some", "no", "lone", "one"];

const MULTIPLICITIES: &[&str] = &["some", "no", "lone", "one"];

fn ident() -> impl P<String> + Clone {
    text::ident()
        .try_map(|s: String, span| {
            if KEYWORDS.contains(&s.as_str()) {
                Err(Simple::custom(span, format!("unexpected keyword `{}`", s)))
            } else {
                Ok(s)
            }
        })
        .padded()
}

fn kw(k: &'static str) -> impl P<String> + Clone {
    text::keyword(k).padded().to(k.to_owned())
}

fn sym(s: &'static str, name: &'static str) -> impl P<String> + Clone {
    just(s).padded().to(name.to_owned())
}

fn one_of_words(words: &'static [&'static str]) -> BoxedParser<'static, char, String, Simple<char>> {
    let mut parser = kw(words[0]).boxed();
    for &w in &words[1..] {
        parser = parser.or(kw(w)).boxed();
    }
    parser
}

fn fold_binary(
    lower: BoxedParser<'static, char, Expr, Simple<char>>,
    op: impl P<String> + Clone + 'static,
) -> BoxedParser<'static, char, Expr, Simple<char>> {
    lower
        .clone()
        .then(op.then(lower).repeated())
        .foldl(|l, (op, r)| Expr::Binary(op, Box::new(l), Box::new(r)))
        .boxed()
}

fn prefix(
    lower: BoxedParser<'static, char, Expr, Simple<char>>,
    op: impl P<String> + Clone + 'static,
) -> BoxedParser<'static, char, Expr, Simple<char>> {
    op.repeated()
        .then(lower)
        .foldr(|op, e| Expr::Unary(op, Box::new(e)))
        .boxed()
}

fn expr() -> impl P<Expr> {
    recursive(|expr| {
        let expr = expr.boxed();

        let atom = choice((
            expr.clone().delimited_by(just('(').padded(), just(')').padded()),
            text::int(10).padded().map(Expr::Int),
            choice((kw("none"), kw("univ"), kw("iden"))).map(Expr::Const),
            ident().map(Expr::Name),
        ))
        .boxed();

        // ~ ^ *
        let closure = prefix(
            atom,
            choice((sym("~", "~"), sym("^", "^"), sym("*", "*"))),
        );

        let join = fold_binary(closure, sym(".", "."));
        let arrow = fold_binary(join, sym("->", "->"));
        let intersection = fold_binary(
            arrow,
            just("&").then_ignore(just("&").not().rewind()).padded().to("&".to_owned()),
        );
        let union = fold_binary(
            intersection,
            choice((
                sym("+", "+"),
                just("-")
                    .then_ignore(just(">").not().rewind())
                    .padded()
                    .to("-".to_owned()),
            )),
        );

        let quant = one_of_words(QUANTIFIERS)
            .then(kw("disj").or_not())
            .then(ident().separated_by(just(',').padded()).at_least(1))
            .then_ignore(just(':').padded())
            .then(union.clone())
            .then_ignore(just('|').then_ignore(just('|').not().rewind()).padded())
            .then(expr.clone())
            .map(|((((op, disj), vars), bound), body)| Expr::Quant {
                op,
                disj: disj.is_some(),
                vars,
                bound: Box::new(bound),
                body: Box::new(body),
            })
            .boxed();

        let multiplicity = choice((
            quant,
            one_of_words(MULTIPLICITIES)
                .then(union.clone())
                .map(|(op, e)| Expr::Unary(op, Box::new(e))),
            union,
        ))
        .boxed();

        let comparison_op = choice((
            just("!in").padded().to("!in".to_owned()),
            kw("not").then(kw("in")).to("!in".to_owned()),
            kw("in"),
            sym("!=", "!="),
            sym("=<", "=<"),
            sym(">=", ">="),
            just("=")
                .then_ignore(just(">").not().rewind())
                .padded()
                .to("=".to_owned()),
            just("<")
                .then_ignore(choice((just("=>"), just(":"))).not().rewind())
                .padded()
                .to("<".to_owned()),
            sym(">", ">"),
        ));
        let comparison = multiplicity
            .clone()
            .then(comparison_op.then(multiplicity).or_not())
            .map(|(l, rest)| match rest {
                Some((op, r)) => Expr::Binary(op, Box::new(l), Box::new(r)),
                None => l,
            })
            .boxed();

        let negation = prefix(
            comparison,
            choice((
                kw("not").then_ignore(kw("in").not().rewind()),
                just("!")
                    .then_ignore(choice((just("="), just("in"))).not().rewind())
                    .padded()
                    .to("not".to_owned()),
            )),
        );

        let conjunction = fold_binary(
            negation,
            choice((kw("and"), sym("&&", "and"))),
        );
        let implication = fold_binary(
            conjunction,
            choice((kw("implies"), sym("=>", "implies"))),
        );
        let equivalence =
            fold_binary(implication, choice((kw("iff"), sym("<=>", "iff"))));
        fold_binary(equivalence, choice((kw("or"), sym("||", "or"))))
    })
}

/// Parse an expression
pub fn expression(src: &str) -> Result<Expr, String> {
    expr()
        .padded()
        .then_ignore(end())
        .parse(src)
        .map_err(|errs| {
            first_error("Expression parse error", 1, "expression", src, errs)
        })
}

////////////////////////////////////////////////////////////////////////////////
// Model declarations

/// The signature and field names declared in a model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    pub sigs: IndexSet<String>,
    pub fields: IndexSet<String>,
}

// Whitespace plus `//`, `--` and `/* */` comments
fn trivia() -> impl P<()> + Clone {
    let line_comment = just("//")
        .or(just("--"))
        .then(take_until(text::newline().or(end())))
        .ignored();
    let block_comment = just("/*").then(take_until(just("*/"))).ignored();
    choice((
        line_comment,
        block_comment,
        filter(|c: &char| c.is_whitespace()).ignored(),
    ))
    .repeated()
    .ignored()
}

fn lexeme<T>(p: impl P<T> + Clone) -> impl P<T> + Clone {
    p.then_ignore(trivia())
}

fn model_word() -> impl P<String> + Clone {
    lexeme(
        filter(|c: &char| c.is_alphanumeric() || *c == '_')
            .chain(
                filter(|c: &char| c.is_alphanumeric() || *c == '_' || *c == '\'')
                    .repeated(),
            )
            .collect::<String>(),
    )
}

fn model_kw(k: &'static str) -> impl P<()> + Clone {
    model_word().try_map(move |w, span| {
        if w == k {
            Ok(())
        } else {
            Err(Simple::custom(span, format!("expected `{}`", k)))
        }
    })
}

fn model_punct(c: char) -> impl P<char> + Clone {
    lexeme(just(c))
}

// A word, a symbol, or a bracketed group of token trees
fn token_tree() -> impl P<()> + Clone {
    recursive(|tree| {
        let group = |open, close| {
            tree.clone()
                .repeated()
                .delimited_by(model_punct(open), model_punct(close))
                .ignored()
        };
        choice((
            group('(', ')'),
            group('[', ']'),
            group('{', '}'),
            model_word().ignored(),
            // an unclosed `/*` is not a symbol
            just("/*")
                .not()
                .rewind()
                .ignore_then(lexeme(filter(|c: &char| {
                    !c.is_whitespace() && !"()[]{}".contains(*c)
                })))
                .ignored(),
        ))
    })
}

fn model() -> impl P<Declarations> {
    // var f, g: lone (A + B)
    let field_type = model_punct(',')
        .not()
        .rewind()
        .ignore_then(token_tree())
        .repeated()
        .at_least(1);
    let field = model_kw("var")
        .or_not()
        .ignore_then(model_kw("disj").or_not())
        .ignore_then(model_word().separated_by(model_punct(',')).at_least(1))
        .then_ignore(model_punct(':'))
        .then_ignore(field_type);

    // sig A, B extends C { fields }
    let sig = model_kw("sig")
        .ignore_then(model_word().separated_by(model_punct(',')).at_least(1))
        .then_ignore(
            model_punct('{')
                .not()
                .rewind()
                .ignore_then(token_tree())
                .repeated(),
        )
        .then(
            field
                .separated_by(model_punct(','))
                .allow_trailing()
                .delimited_by(model_punct('{'), model_punct('}')),
        );

    let other = model_kw("sig").not().rewind().ignore_then(token_tree());

    trivia()
        .ignore_then(choice((sig.map(Some), other.to(None))).repeated())
        .then_ignore(end())
        .map(|items| {
            let mut decls = Declarations::default();
            for (sigs, fields) in items.into_iter().flatten() {
                decls.sigs.extend(sigs);
                decls.fields.extend(fields.into_iter().flatten());
            }
            decls
        })
}

/// Parse the declarations of a model
pub fn declarations(src: &str) -> Result<Declarations, String> {
    model()
        .parse(src)
        .map_err(|errs| first_error("Model parse error", 2, "model", src, errs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Box<Expr> {
        Box::new(Expr::Name(s.to_owned()))
    }

    #[test]
    fn bracket_round_trip() {
        let src = "{root{and{no{sig/A}}{one of{var0}{sig/B}}}}";
        let t = tree(src).unwrap();
        assert_eq!(t.label(), "root");
        assert_eq!(t.node_count(), 7);
        assert_eq!(t.to_string(), src);
    }

    #[test]
    fn bracket_escapes() {
        let t = Tree::new("a{b}", vec![Tree::leaf("c\\d")]);
        assert_eq!(tree(&t.to_string()).unwrap(), t);
    }

    #[test]
    fn bracket_rejects_garbage() {
        assert!(tree("{a{b}").is_err());
        assert!(tree("{}").is_err());
        assert!(tree("a").is_err());
    }

    #[test]
    fn conjunction_of_multiplicities() {
        let e = expression("no Trash and no Protected").unwrap();
        assert_eq!(
            e,
            Expr::Binary(
                "and".to_owned(),
                Box::new(Expr::Unary("no".to_owned(), name("Trash"))),
                Box::new(Expr::Unary("no".to_owned(), name("Protected"))),
            )
        );
    }

    #[test]
    fn alternate_spellings_normalize() {
        assert_eq!(
            expression("a && b").unwrap(),
            expression("a and b").unwrap()
        );
        assert_eq!(
            expression("!(a in b)").unwrap(),
            expression("not (a in b)").unwrap()
        );
        assert_eq!(
            expression("a !in b").unwrap(),
            expression("a not in b").unwrap()
        );
    }

    #[test]
    fn precedence() {
        // join binds tighter than union, union tighter than comparison
        let e = expression("x.f + y in z").unwrap();
        match e {
            Expr::Binary(op, l, _) => {
                assert_eq!(op, "in");
                match *l {
                    Expr::Binary(op, ll, _) => {
                        assert_eq!(op, "+");
                        assert!(matches!(*ll, Expr::Binary(ref o, _, _) if o == "."));
                    }
                    _ => panic!("expected union"),
                }
            }
            _ => panic!("expected comparison"),
        }
    }

    #[test]
    fn quantifier_versus_multiplicity() {
        let q = expression("some f: File | f in Trash").unwrap();
        assert!(matches!(q, Expr::Quant { ref op, .. } if op == "some"));

        let m = expression("some File").unwrap();
        assert!(matches!(m, Expr::Unary(ref op, _) if op == "some"));
    }

    #[test]
    fn quantifier_with_several_variables() {
        let q = expression("all disj x, y: File | x != y").unwrap();
        match q {
            Expr::Quant { disj, vars, .. } => {
                assert!(disj);
                assert_eq!(vars, vec!["x".to_owned(), "y".to_owned()]);
            }
            _ => panic!("expected quantifier"),
        }
    }

    #[test]
    fn sigs_and_fields() {
        let decls = declarations(
            "abstract sig A, B extends C { f, g: set A, var h: lone (A + B) }",
        )
        .unwrap();
        assert_eq!(
            decls.sigs.into_iter().collect::<Vec<_>>(),
            vec!["A".to_owned(), "B".to_owned()]
        );
        assert_eq!(
            decls.fields.into_iter().collect::<Vec<_>>(),
            vec!["f".to_owned(), "g".to_owned(), "h".to_owned()]
        );
    }

    #[test]
    fn other_paragraphs_are_skipped() {
        let decls = declarations(
            "module trash
             open util/ordering[File]
             sig File { link: File -> lone File } { some link }
             one sig Trash in File + File {}
             fact { all f: File | f.link in File }
             pred inv1 { no Trash }
             run {} for 3",
        )
        .unwrap();
        assert_eq!(decls.sigs.len(), 2);
        assert!(decls.sigs.contains("Trash"));
        assert_eq!(decls.fields.iter().collect::<Vec<_>>(), vec!["link"]);
    }

    #[test]
    fn comments_declare_nothing() {
        let decls = declarations(
            "sig File {}
             // sig Line {}
             -- sig Dash {}
             /* sig Ghost {}
                sig Spirit { f: File } */
             sig Trash in File {}",
        )
        .unwrap();
        assert_eq!(
            decls.sigs.into_iter().collect::<Vec<_>>(),
            vec!["File".to_owned(), "Trash".to_owned()]
        );
        assert!(decls.fields.is_empty());
    }

    #[test]
    fn model_errors_are_reported() {
        let err = declarations("sig File {} /* never closed").unwrap_err();
        assert!(err.contains("Model parse error"));
        assert!(declarations("sig File { link: File ").is_err());
    }

    #[test]
    fn expression_errors_are_reported() {
        let err = expression("no and").unwrap_err();
        assert!(err.contains("Expression parse error"));
    }
}
