//! CPLEX-LP text rendering of a model, for debugging and for feeding the
//! program to an external solver by hand.

use std::fmt::Write;

use crate::bnb::BranchAndBoundModel;
use crate::expr::Relation;

/// Renders the live constraints of `model` in LP format.
///
/// The program has no objective, so `obj` is the constant 0.
///
/// # Example
///
/// ```
/// use idxinteract_ilp::{render_lp, BranchAndBoundSolver, IlpModel, LinearConstraint, SolverService, Term};
///
/// let mut model = BranchAndBoundSolver::default().create_model();
/// let x = model.add_binary_variable("x[C,0]");
/// model.add_linear_constraint(LinearConstraint::eq("one", vec![Term::new(x, 1.0)], 1.0)).unwrap();
///
/// let lp = render_lp(&model);
/// assert!(lp.contains(" one: +1 x_C_0_ = +1\n"));
/// assert!(lp.ends_with("Binary\n x_C_0_\nEnd\n"));
/// ```
pub fn render_lp(model: &BranchAndBoundModel) -> String {
    let names: Vec<String> = model.variables().map(|(_, n)| sanitize(n)).collect();

    let mut out = String::from("Minimize\n obj: 0\nSubject To\n");
    for (handle, c) in model.constraints() {
        let label = if c.name.is_empty() {
            format!("c{}", handle.index())
        } else {
            sanitize(&c.name)
        };
        let _ = write!(out, " {}:", label);
        if c.terms.is_empty() {
            out.push_str(" 0");
        }
        for term in &c.terms {
            let _ = write!(out, " {:+} {}", term.coef, names[term.var.index()]);
        }
        let sense = match c.relation {
            Relation::Le => "<=",
            Relation::Eq => "=",
            Relation::Ge => ">=",
        };
        let _ = writeln!(out, " {} {:+}", sense, c.rhs);
    }

    out.push_str("Binary\n");
    for name in &names {
        let _ = writeln!(out, " {}", name);
    }
    out.push_str("End\n");
    out
}

/// Keeps `[A-Za-z0-9_]`, maps everything else to `_`.
fn sanitize(name: &str) -> String {
    let mut s: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if s.starts_with(|c: char| c.is_ascii_digit()) || s.is_empty() {
        s.insert(0, 'v');
    }
    s
}
