//! # Hints
//!
//! Picks the single most useful action out of an edit script and phrases it
//! for a student. Missing structure is the most common and most actionable
//! mistake, so insertions win over deletions, deletions over relabelings, and
//! relabelings over moves; within a class the earliest action wins.

use crate::script::EditAction;
use crate::tree::ROOT_LABEL;

use serde::{Deserialize, Serialize};

////////////////////////////////////////////////////////////////////////////////
// Results

/// A rendered hint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HintResult {
    /// Edit distance between the submission and the correct answer the hint
    /// leads toward.
    pub distance_to_solution: usize,
    pub message: String,
    pub action: EditAction,
}

/// The script is empty, so there is nothing to suggest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoActionAvailable;

impl std::fmt::Display for NoActionAvailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no edit action available")
    }
}

impl std::error::Error for NoActionAvailable {}

////////////////////////////////////////////////////////////////////////////////
// Selection

/// Lower is more important.
pub fn priority(action: &EditAction) -> u8 {
    match action {
        EditAction::Insert { .. } => 0,
        EditAction::Delete { .. } => 1,
        EditAction::Update { .. } => 2,
        EditAction::Move { .. } => 3,
    }
}

/// The most important action; ties go to the earliest one.
pub fn select_action(
    actions: &[EditAction],
) -> Result<&EditAction, NoActionAvailable> {
    actions.iter().min_by_key(|a| priority(a)).ok_or(NoActionAvailable)
}

////////////////////////////////////////////////////////////////////////////////
// Label descriptions

/// How a label reads in prose: its name, and the role phrase explaining what
/// it is for (empty when there is nothing useful to say).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub name: String,
    pub role: &'static str,
}

fn typed(label: &str, prefix: &str) -> Option<String> {
    let rest = label.strip_prefix(prefix)?;
    Some(rest.to_owned())
}

fn variable_type(label: &str) -> Option<&str> {
    let rest = label.strip_prefix("var")?;
    let (digits, ty) = rest.split_once('/')?;
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(ty)
    } else {
        None
    }
}

pub fn describe(label: &str) -> Description {
    if let Some(ty) = variable_type(label) {
        return Description {
            name: format!("variable of type {}", ty),
            role: "",
        };
    }
    if let Some(sig) = typed(label, "sig/") {
        return Description {
            name: format!("signature of type {}", sig),
            role: "",
        };
    }
    if let Some(field) = typed(label, "field/") {
        return Description {
            name: format!("field '{}'", field),
            role: "",
        };
    }

    let (name, role) = match label.to_lowercase().as_str() {
        // set operators
        "." => ("dot join operator ('.')", " to perform a relational join between sets or relations"),
        "+" => ("union operator ('+')", " to combine two sets"),
        "&" => ("intersection operator ('&')", " to find the common elements between two sets"),
        "++" => ("relational override operator ('++')", " to combine two sets eliminating duplicates"),
        "-" => ("difference operator ('-')", " to remove elements from a set"),
        "in" => ("inclusion operator ('in')", " to specify that some element(s) belong to a set"),
        "!in" | "not in" => ("exclusion operator ('!in')", " to specify that some element(s) do not belong to a set"),
        "<:" => ("restriction operator ('<:')", " to restrict the domain of a relation"),
        ":>" => ("restriction operator (':>')", " to restrict the range of a relation"),
        "->" => ("arrow operator ('->')", " to map a relation"),

        // other operators
        "not" | "!" => ("negation operator ('not')", " to specify that the expression is false"),
        "~" => ("transpose operator ('~')", " to transpose a relation"),
        "^" => ("transitive closure operator ('^')", " to get the transitive closure of a relation"),
        "*" => ("reflexive-transitive closure operator ('*')", " to get the reflexive-transitive closure of a relation"),
        "implies" | "=>" => ("implication operator ('=>')", " to specify that if the left side is true, then the right side must also be true"),
        "iff" | "<=>" => ("equivalence operator ('iff')", " to specify the equivalence of the right and left side of the expression"),
        ">=" => ("greater than or equal to operator ('>=')", " to specify that the left side is greater than or equal to the right side"),
        "<" => ("less than operator ('<')", " to specify that the left side is less than the right side"),
        ">" => ("greater than operator ('>')", " to specify that the left side is greater than the right side"),
        "=<" => ("less than or equal to operator ('=<')", " to specify that the left side is less than or equal to the right side"),
        "!=" => ("not equal operator ('!=')", " to specify that the left side is not equal to the right side"),
        "=" => ("equal operator ('=')", " to specify that the left side is equal to the right side"),

        // quantifiers and constants
        "one" => ("unique quantifier ('one')", " to specify that there is exactly one element in a set"),
        "no" => ("no quantifier ('no')", " to specify that there are no elements in a set"),
        "lone" => ("lone quantifier ('lone')", " to specify that there is at most one element in a set"),
        "all" => ("universal quantifier ('all')", " to specify that all elements in a set satisfy a condition"),
        "some" => ("existential quantifier ('some')", " to specify that some elements in a set satisfy a condition"),
        "univ" => ("universal set ('univ')", " to refer to every element"),
        "none" => ("empty set constructor ('none')", " to specify that a set is empty"),
        "iden" => ("identity relation constructor ('iden')", " to specify the identity relation"),
        "disj" => ("disjoint operator ('disj')", " to specify that two sets are disjoint"),
        "let" => ("\"let\" ('let var = expression1 | expression2')", " to introduce a new variable"),

        // logic operators
        "or" | "||" => ("disjunction operator ('or')", " to combine two boolean expressions"),
        "and" | "&&" => ("conjunction operator ('and')", " to combine two boolean expressions"),

        // temporal operators
        "always" => ("temporal operator ('always')", " to specify that a property should always hold"),
        "eventually" => ("temporal operator ('eventually')", " to specify that a property will eventually hold in the future"),
        "after" => ("temporal operator ('after')", " to specify that a property will hold in the next state"),
        "until" => ("temporal operator ('until')", " to specify that a property will hold until another property holds"),
        "before" => ("temporal operator ('before')", " to specify that a property held in the previous state"),
        "once" => ("temporal operator ('once')", " to specify that a property once held in the past"),
        "historically" => ("temporal operator ('historically')", " to specify that a property always held in the past"),
        "since" => ("temporal operator ('since')", " to specify that a property holds since another property"),

        _ => {
            return Description {
                name: label.to_owned(),
                role: "",
            }
        }
    };

    Description {
        name: name.to_owned(),
        role,
    }
}

////////////////////////////////////////////////////////////////////////////////
// Rendering

const DEFAULT_ROLE: &str = " to help satisfy the required property";

const VARIABLE_ADVICE: &str =
    "You can use variables to help specify the condition.";

fn introduces_variables(label: &str) -> bool {
    matches!(label, "all" | "some")
}

/// The progress sentence for a given distance to the solution.
pub fn distance_banner(distance: usize) -> &'static str {
    match distance {
        0 => "Good job! If you want you can try another approach.",
        1 => "One step away from the solution!",
        2 | 3 => "Near a solution!",
        _ => "Keep going!",
    }
}

fn first_signature(node: &crate::tree::Tree) -> Option<String> {
    if let Some(sig) = typed(node.label(), "sig/") {
        return Some(sig);
    }
    node.children().iter().find_map(first_signature)
}

fn render_insert(node: &crate::tree::Tree, parent: &str) -> String {
    if introduces_variables(parent) {
        if let Some(sig) = first_signature(node) {
            return format!(
                "{} Consider introducing a new variable \"{}\" to your \
                 expression using the {}.",
                VARIABLE_ADVICE,
                sig,
                describe(parent).name
            );
        }
    }

    let label = node.label();
    let desc = describe(label);
    if introduces_variables(label) {
        return format!(
            "{} Consider introducing a new variable to your expression using \
             the {}.",
            VARIABLE_ADVICE, desc.name
        );
    }

    let suggestion = if variable_type(label).is_some() {
        format!(
            "{} Consider using a {} to correctly capture the property you \
             want to specify.",
            VARIABLE_ADVICE, desc.name
        )
    } else {
        let role = if desc.role.is_empty() {
            DEFAULT_ROLE
        } else {
            desc.role
        };
        format!("Consider adding a {}{}.", desc.name, role)
    };

    if parent == ROOT_LABEL {
        format!(
            "{} Think about how you can incorporate this at the top level of \
             your expression to ensure the required property.",
            suggestion
        )
    } else {
        format!(
            "{} Think about how you can incorporate this within the {} \
             expression.",
            suggestion,
            describe(parent).name
        )
    }
}

fn render_delete(label: &str) -> String {
    format!(
        "It seems like you have unnecessary elements in your expression. You \
         can try simplifying your expression by deleting the {}. If you want \
         to keep it, try to fix your expression another way and reach a \
         different solution!",
        describe(label).name
    )
}

fn render_update(old: &str, new: &str) -> String {
    let old = describe(old);
    let new = describe(new);
    let new_role = if new.role.is_empty() {
        DEFAULT_ROLE
    } else {
        new.role
    };
    format!(
        "Instead of using {}{}, try using {}{}.",
        old.name, old.role, new.name, new_role
    )
}

fn render_move(label: &str, parent: &str) -> String {
    let placement = if parent == ROOT_LABEL {
        "Try moving it to the top level of your expression so that you \
         correctly ensure the required property."
            .to_owned()
    } else {
        format!(
            "Try moving it inside the {} expression so that you correctly \
             ensure the required property.",
            describe(parent).name
        )
    };
    format!(
        "It seems like the {} is not in the right place. {}",
        describe(label).name,
        placement
    )
}

/// The action phrased as advice.
pub fn render(action: &EditAction) -> String {
    match action {
        EditAction::Insert {
            node, parent_label, ..
        } => render_insert(node, parent_label),
        EditAction::Delete { node, .. } => render_delete(node.label()),
        EditAction::Update {
            old_value,
            new_value,
            ..
        } => render_update(old_value, new_value),
        EditAction::Move {
            node,
            new_parent_label,
            ..
        } => render_move(node.label(), new_parent_label),
    }
}

/// Selects and renders the hint for a script leading `distance` edits away.
pub fn hint(
    distance: usize,
    actions: &[EditAction],
) -> Result<HintResult, NoActionAvailable> {
    let action = select_action(actions)?;
    Ok(HintResult {
        distance_to_solution: distance,
        message: format!("{} {}", distance_banner(distance), render(action)),
        action: action.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    fn insert(node: &str, parent: &str) -> EditAction {
        EditAction::Insert {
            node: node.parse().unwrap(),
            parent_label: parent.to_owned(),
            position: 0,
            parent_path: vec![0],
        }
    }

    fn update(old: &str, new: &str) -> EditAction {
        EditAction::Update {
            node_label: old.to_owned(),
            old_value: old.to_owned(),
            new_value: new.to_owned(),
            path: vec![0, 0],
        }
    }

    fn moved(node: &str) -> EditAction {
        EditAction::Move {
            node: node.parse().unwrap(),
            new_parent_label: "and".to_owned(),
            new_position: 1,
            path: vec![0, 1],
            new_parent_path: vec![0, 0],
        }
    }

    fn delete(node: &str) -> EditAction {
        EditAction::Delete {
            node: node.parse().unwrap(),
            path: vec![0, 1],
        }
    }

    #[test]
    fn priority_order() {
        let actions = vec![
            moved("{sig/A}"),
            update("sig/A", "sig/B"),
            delete("{sig/C}"),
            insert("{no{sig/D}}", "root"),
            insert("{sig/E}", "and"),
        ];
        assert_eq!(select_action(&actions), Ok(&actions[3]));
        assert_eq!(select_action(&actions[..3]), Ok(&actions[2]));
        assert_eq!(select_action(&actions[..2]), Ok(&actions[1]));
        assert_eq!(select_action(&actions[..1]), Ok(&actions[0]));
        assert_eq!(select_action(&[]), Err(NoActionAvailable));
    }

    #[test]
    fn banners() {
        assert_eq!(distance_banner(1), "One step away from the solution!");
        assert_eq!(distance_banner(3), "Near a solution!");
        assert_eq!(distance_banner(4), "Keep going!");
    }

    #[test]
    fn descriptions() {
        assert_eq!(describe("var0/File").name, "variable of type File");
        assert_eq!(describe("sig/Trash").name, "signature of type Trash");
        assert_eq!(describe("&&"), describe("and"));
        assert_eq!(describe("mystery").name, "mystery");
        assert_eq!(describe("varX/File").name, "varX/File");
    }

    #[test]
    fn insert_at_top_level() {
        let message = render(&insert("{and}", "root"));
        assert!(message.starts_with("Consider adding a conjunction operator"));
        assert!(message.contains("at the top level"));
    }

    #[test]
    fn insert_under_quantifier_suggests_a_variable() {
        let message = render(&insert("{one of{var0}{sig/File}}", "all"));
        assert!(message.contains("new variable \"File\""));
        assert!(message.contains("universal quantifier"));
    }

    #[test]
    fn update_and_delete_messages() {
        assert_eq!(
            render(&update("sig/File", "sig/Trash")),
            "Instead of using signature of type File, try using signature of \
             type Trash to help satisfy the required property."
        );
        assert!(render(&delete("{no{sig/A}}")).contains("deleting the no quantifier"));
    }

    #[test]
    fn full_hint() {
        let result = hint(3, &[update("in", "!in"), insert("{sig/A}", "in")]).unwrap();
        assert_eq!(result.distance_to_solution, 3);
        assert!(result.message.starts_with("Near a solution! Consider adding"));
        assert_eq!(result.action.kind(), "Insert");
        assert!(matches!(
            result.action,
            EditAction::Insert { ref node, .. } if *node == Tree::leaf("sig/A")
        ));
    }
}
