//! # AST producers
//!
//! An [`AstProducer`] turns the text of a submission into a raw labeled
//! [`Tree`]. Raw trees are not canonical: bound variables still carry their
//! source spelling behind a `$` sigil (`$f` where the variable is declared,
//! `$f/File` where it is used) and commutative operands appear in source
//! order. [`crate::canonical::canonicalize`] takes it from there.

use crate::parse::{self, Declarations, Expr};
use crate::tree::Tree;

use serde::{Deserialize, Serialize};

/// The sigil that marks a raw (not yet anonymized) variable label.
pub const VARIABLE_SIGIL: char = '$';

/// The label of the node pairing a quantified variable with its bound.
pub const DECLARATION_LABEL: &str = "one of";

////////////////////////////////////////////////////////////////////////////////
// Errors

/// An expression could not be turned into a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub expression: String,
    pub message: String,
}

impl ParseError {
    pub fn new(expression: &str, message: String) -> Self {
        Self {
            expression: expression.to_owned(),
            message,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "could not parse '{}': {}", self.expression, self.message)
    }
}

impl std::error::Error for ParseError {}

////////////////////////////////////////////////////////////////////////////////
// Producers

/// Turns submission text into a raw tree, in the context of an exercise
/// model.
pub trait AstProducer: Send + Sync {
    fn parse(&self, model: &str, expression: &str) -> Result<Tree, ParseError>;
}

/// Reads trees that are already written in bracket notation.
#[derive(Debug, Clone, Default)]
pub struct BracketProducer;

impl AstProducer for BracketProducer {
    fn parse(&self, _model: &str, expression: &str) -> Result<Tree, ParseError> {
        parse::tree(expression).map_err(|e| ParseError::new(expression, e))
    }
}

/// Reads Alloy expressions, resolving names against the signatures and
/// fields declared in the exercise model.
#[derive(Debug, Clone, Default)]
pub struct AlloyProducer;

impl AstProducer for AlloyProducer {
    fn parse(&self, model: &str, expression: &str) -> Result<Tree, ParseError> {
        let expr = parse::expression(expression)
            .map_err(|e| ParseError::new(expression, e))?;
        let decls = parse::declarations(model)
            .map_err(|e| ParseError::new(expression, e))?;
        let mut resolver = Resolver {
            decls: &decls,
            scope: vec![],
        };
        resolver
            .resolve(&expr)
            .map_err(|message| ParseError::new(expression, message))
    }
}

/// A producer chosen by name, for callers that pick the input notation at
/// run time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Syntax {
    #[default]
    Alloy,
    Bracket,
}

impl std::str::FromStr for Syntax {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(&format!("\"{}\"", s))
    }
}

impl AstProducer for Syntax {
    fn parse(&self, model: &str, expression: &str) -> Result<Tree, ParseError> {
        match self {
            Syntax::Alloy => AlloyProducer.parse(model, expression),
            Syntax::Bracket => BracketProducer.parse(model, expression),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Resolution

struct Resolver<'a> {
    decls: &'a Declarations,
    scope: Vec<(String, String)>,
}

impl Resolver<'_> {
    fn variable_type(&self, bound: &Tree) -> String {
        match bound.label().strip_prefix("sig/") {
            Some(sig) if bound.is_leaf() => sig.to_owned(),
            _ => "univ".to_owned(),
        }
    }

    fn name(&self, name: &str) -> Result<Tree, String> {
        if let Some((_, ty)) = self.scope.iter().rev().find(|(v, _)| v == name) {
            return Ok(Tree::leaf(format!("{}{}/{}", VARIABLE_SIGIL, name, ty)));
        }
        if self.decls.sigs.contains(name) {
            return Ok(Tree::leaf(format!("sig/{}", name)));
        }
        if self.decls.fields.contains(name) {
            return Ok(Tree::leaf(format!("field/{}", name)));
        }
        Err(format!("unknown identifier '{}'", name))
    }

    fn quantifier(
        &mut self,
        op: &str,
        vars: &[String],
        bound: &Tree,
        body: &Expr,
    ) -> Result<Tree, String> {
        let Some((var, rest)) = vars.split_first() else {
            return self.resolve(body);
        };

        let decl = Tree::new(
            DECLARATION_LABEL,
            vec![
                Tree::leaf(format!("{}{}", VARIABLE_SIGIL, var)),
                bound.clone(),
            ],
        );

        let ty = self.variable_type(bound);
        self.scope.push((var.clone(), ty));
        let inner = if rest.is_empty() {
            self.resolve(body)
        } else {
            self.quantifier(op, rest, bound, body)
        };
        self.scope.pop();

        Ok(Tree::new(op, vec![decl, inner?]))
    }

    fn resolve(&mut self, e: &Expr) -> Result<Tree, String> {
        match e {
            Expr::Name(n) => self.name(n),
            Expr::Int(i) => Ok(Tree::leaf(i.clone())),
            Expr::Const(c) => Ok(Tree::leaf(c.clone())),
            Expr::Unary(op, e) => Ok(Tree::new(op.clone(), vec![self.resolve(e)?])),
            Expr::Binary(op, l, r) => {
                let l = self.resolve(l)?;
                let r = self.resolve(r)?;
                Ok(Tree::new(op.clone(), vec![l, r]))
            }
            Expr::Quant {
                op,
                disj,
                vars,
                bound,
                body,
            } => {
                let bound = self.resolve(bound)?;
                let q = self.quantifier(op, vars, &bound, body)?;
                if *disj {
                    let mut children = vec![Tree::leaf("disj")];
                    children.extend(q.children().iter().cloned());
                    Ok(Tree::new(q.label(), children))
                } else {
                    Ok(q)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRASH_MODEL: &str = "
        sig File { link : set File }
        sig Trash in File {}
        sig Protected in File {}
        // a comment with sig Fake in it
        pred prop1 { }
    ";

    #[test]
    fn commented_out_sigs_are_unknown() {
        let model = "sig File {}\n/* sig Ghost {} */\n";
        assert!(AlloyProducer.parse(model, "no File").is_ok());
        let err = AlloyProducer.parse(model, "no Ghost").unwrap_err();
        assert!(err.message.contains("Ghost"));
        assert!(AlloyProducer.parse(TRASH_MODEL, "no Fake").is_err());
    }

    #[test]
    fn broken_models_are_reported() {
        let err = AlloyProducer
            .parse("sig File { link: File", "no File")
            .unwrap_err();
        assert!(err.message.contains("Model parse error"));
    }

    #[test]
    fn resolves_names() {
        let t = AlloyProducer
            .parse(TRASH_MODEL, "no Trash and no Protected")
            .unwrap();
        assert_eq!(t.to_string(), "{and{no{sig/Trash}}{no{sig/Protected}}}");
    }

    #[test]
    fn quantified_variables() {
        let t = AlloyProducer
            .parse(TRASH_MODEL, "all f, g: File | f.link in g")
            .unwrap();
        assert_eq!(
            t.to_string(),
            "{all{one of{$f}{sig/File}}{all{one of{$g}{sig/File}}\
             {in{.{$f/File}{field/link}}{$g/File}}}}"
        );
    }

    #[test]
    fn disjoint_quantifier() {
        let t = AlloyProducer
            .parse(TRASH_MODEL, "some disj a, b: File | a = b")
            .unwrap();
        assert_eq!(t.children()[0].label(), "disj");
        assert_eq!(t.children()[1].label(), DECLARATION_LABEL);
    }

    #[test]
    fn unknown_identifier() {
        let err = AlloyProducer.parse(TRASH_MODEL, "no Recycle").unwrap_err();
        assert!(err.message.contains("Recycle"));
        assert_eq!(err.expression, "no Recycle");
    }

    #[test]
    fn variables_go_out_of_scope() {
        assert!(AlloyProducer
            .parse(TRASH_MODEL, "(all f: File | f in Trash) and f in Trash")
            .is_err());
    }

    #[test]
    fn bracket_producer() {
        let t = BracketProducer.parse("", "{no{sig/A}}").unwrap();
        assert_eq!(t.label(), "no");
        assert!(BracketProducer.parse("", "no A").is_err());
    }
}
