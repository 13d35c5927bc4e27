//! Integration Tests for the Datum Expression Graph
//!
//! These tests exercise the whole engine through the editor-facing
//! `Document` API: expression edits, dependency propagation, cycle
//! rejection, and removal semantics.

use trellis_core::graph::{DatumId, Document};

fn pair() -> (Document, DatumId, DatumId) {
    let mut doc = Document::new();
    let n = doc.add_node("n").unwrap();
    let a = doc.add_input(n, "a", "2").unwrap();
    let b = doc.add_input(n, "b", "a * 3").unwrap();
    (doc, a, b)
}

/// Invariant: an invalid datum never exposes a value.
#[test]
fn invalid_implies_no_value() {
    let mut doc = Document::new();
    let n = doc.add_node("n").unwrap();
    let d = doc.add_input(n, "d", "1").unwrap();

    for text in ["bad syntax (", "1/0", "ghost + 1", "d", "sqrt(-1)"] {
        doc.set_expr(d, text);
        assert!(!doc.valid(d), "`{text}` should be invalid");
        assert!(doc.value(d).is_none(), "`{text}` should have no value");
    }
}

/// Round-trip: whatever text is set is what `get_expr` returns, valid
/// or not.
#[test]
fn expression_text_round_trips() {
    let mut doc = Document::new();
    let n = doc.add_node("n").unwrap();
    let d = doc.add_input(n, "d", "0").unwrap();

    for text in ["1 + 2", "totally broken ((", "", "  min(1, 2)  ", "x.y.z"] {
        doc.set_expr(d, text);
        assert_eq!(doc.get_expr(d), text);
    }
}

/// Setting the same expression twice ends in the same state as setting
/// it once.
#[test]
fn set_expr_is_idempotent() {
    let (mut doc, a, b) = pair();

    doc.set_expr(a, "5");
    let once = (doc.value(a), doc.valid(a), doc.value(b), doc.valid(b));

    doc.set_expr(a, "5");
    let twice = (doc.value(a), doc.valid(a), doc.value(b), doc.valid(b));

    assert_eq!(once, twice);
    assert_eq!(doc.value(b), Some(15.0));
}

/// Scenario A: `a = "2"`, `b = "a * 3"` evaluates to 6.
#[test]
fn scenario_a_basic_dependency() {
    let (doc, a, b) = pair();
    assert!(doc.valid(a));
    assert_eq!(doc.value(a), Some(2.0));
    assert!(doc.valid(b));
    assert_eq!(doc.value(b), Some(6.0));
}

/// Scenario B: a self-reference on a fresh datum is rejected as a
/// cycle.
#[test]
fn scenario_b_self_reference_rejected() {
    let mut doc = Document::new();
    let n = doc.add_node("n").unwrap();
    let a = doc.add_input(n, "a", "1").unwrap();

    doc.set_expr(a, "a");
    assert!(!doc.valid(a));
    assert_eq!(doc.get_expr(a), "a");
    assert!(doc.value(a).is_none());
}

/// Scenario C: a parse failure upstream cascades invalidity downstream
/// without raising anything at the caller.
#[test]
fn scenario_c_cascading_invalidity() {
    let (mut doc, a, b) = pair();

    doc.set_expr(a, "bad syntax (");
    assert!(!doc.valid(a));
    assert!(!doc.valid(b));
    assert!(doc.value(b).is_none());
    // b's own text is untouched and still parses.
    assert_eq!(doc.get_expr(b), "a * 3");
}

/// Scenario D: removing a referenced datum invalidates its dependents.
#[test]
fn scenario_d_removal_invalidates_referencers() {
    let (mut doc, _a, b) = pair();
    let n = doc.node_by_name("n").unwrap().id();

    doc.remove_input(n, "a");
    assert!(!doc.valid(b));
    assert!(doc.value(b).is_none());
}

/// Scenario E: division by zero is invalid, and distinguishable from a
/// parse failure (the expression still has a parsed form).
#[test]
fn scenario_e_division_by_zero() {
    let mut doc = Document::new();
    let n = doc.add_node("n").unwrap();
    let d = doc.add_input(n, "d", "1/0").unwrap();

    assert!(!doc.valid(d));
    assert!(doc.graph().get(d).unwrap().ast().is_some());

    doc.set_expr(d, "1/(");
    assert!(!doc.valid(d));
    assert!(doc.graph().get(d).unwrap().ast().is_none());
}

/// A cycle-inducing edit changes nothing but the edited datum's text
/// and validity.
#[test]
fn cycle_rejection_is_atomic() {
    let mut doc = Document::new();
    let n = doc.add_node("n").unwrap();
    let a = doc.add_input(n, "a", "1").unwrap();
    let b = doc.add_input(n, "b", "a + 1").unwrap();
    let c = doc.add_input(n, "c", "b + 1").unwrap();

    // a -> c closes a loop through b and c.
    doc.set_expr(a, "c");

    assert!(!doc.valid(a));
    assert_eq!(doc.get_expr(a), "c");
    // Everything downstream kept its value.
    assert_eq!(doc.value(b), Some(2.0));
    assert_eq!(doc.value(c), Some(3.0));
    // And the graph's edges are as before the edit.
    assert!(doc.graph().get(a).unwrap().dependencies().is_empty());
    assert!(doc.graph().get(c).unwrap().dependents().is_empty());
}

/// A rejected cyclic expression stays dead: a later edit to a real
/// upstream datum re-evaluates the rejected datum along its old edges,
/// and that must surface invalidity, not execute the cyclic expression
/// against stale downstream values.
#[test]
fn rejected_cycle_stays_invalid_after_upstream_edits() {
    let mut doc = Document::new();
    let n = doc.add_node("n").unwrap();
    let c = doc.add_input(n, "c", "1").unwrap();
    let a = doc.add_input(n, "a", "c * 2").unwrap();
    let b = doc.add_input(n, "b", "a * 3").unwrap();
    assert_eq!(doc.value(b), Some(6.0));

    // a -> b closes a loop through b's own dependency on a.
    doc.set_expr(a, "b * 2");
    assert!(!doc.valid(a));
    // Rejection itself touches nothing downstream.
    assert_eq!(doc.value(b), Some(6.0));

    // c still feeds a through the old edge; re-evaluating a must not
    // revive the rejected expression.
    doc.set_expr(c, "5");
    assert!(!doc.valid(a));
    assert!(doc.value(a).is_none());
    assert_eq!(doc.get_expr(a), "b * 2");
    // b now reads an invalid upstream and follows it down.
    assert!(!doc.valid(b));

    // Re-committing a working expression heals the chain.
    doc.set_expr(a, "c * 2");
    assert_eq!(doc.value(a), Some(10.0));
    assert_eq!(doc.value(b), Some(30.0));
}

/// A name that did not resolve when its expression was committed does
/// not silently start resolving once the name appears: without an edge
/// the value would never track its source. The datum stays invalid
/// until the user re-commits the expression.
#[test]
fn late_created_names_require_a_recommit() {
    let mut doc = Document::new();
    let n1 = doc.add_node("n1").unwrap();
    let a = doc.add_input(n1, "a", "2").unwrap();
    let b = doc.add_input(n1, "b", "a + n2.x").unwrap();
    assert!(!doc.valid(b));

    // The referenced node shows up after the fact.
    let n2 = doc.add_node("n2").unwrap();
    let x = doc.add_input(n2, "x", "10").unwrap();

    // An upstream edit re-evaluates b, but the uncommitted name still
    // reads as unresolved: no edge, no value.
    doc.set_expr(a, "3");
    assert!(!doc.valid(b));
    assert!(doc.value(b).is_none());

    // Re-committing the same text binds the edge; from then on edits
    // to the referenced datum propagate normally.
    doc.set_expr(b, "a + n2.x");
    assert_eq!(doc.value(b), Some(13.0));
    doc.set_expr(x, "100");
    assert_eq!(doc.value(b), Some(103.0));
}

/// Edits deep in a chain only touch what is downstream.
#[test]
fn propagation_reaches_the_whole_chain() {
    let mut doc = Document::new();
    let n = doc.add_node("n").unwrap();
    let a = doc.add_input(n, "a", "1").unwrap();
    let b = doc.add_input(n, "b", "a * 2").unwrap();
    let c = doc.add_input(n, "c", "b * 2").unwrap();
    let d = doc.add_input(n, "d", "c * 2").unwrap();

    doc.set_expr(a, "3");
    assert_eq!(doc.value(b), Some(6.0));
    assert_eq!(doc.value(c), Some(12.0));
    assert_eq!(doc.value(d), Some(24.0));

    // Editing the middle leaves the top alone.
    doc.set_expr(c, "100");
    assert_eq!(doc.value(a), Some(3.0));
    assert_eq!(doc.value(b), Some(6.0));
    assert_eq!(doc.value(d), Some(200.0));
}

/// Diamond-shaped graphs evaluate each affected datum exactly once and
/// converge to the right value.
#[test]
fn diamond_propagation() {
    let mut doc = Document::new();
    let n = doc.add_node("n").unwrap();
    let root = doc.add_input(n, "root", "1").unwrap();
    doc.add_input(n, "left", "root + 1").unwrap();
    doc.add_input(n, "right", "root * 10").unwrap();
    let join = doc.add_input(n, "join", "left + right").unwrap();

    assert_eq!(doc.value(join), Some(12.0));

    doc.set_expr(root, "5");
    assert_eq!(doc.value(join), Some(56.0));
}

/// Cross-node references work through qualified names and respect
/// removal.
#[test]
fn cross_node_dependencies() {
    let mut doc = Document::new();
    let shape = doc.add_node("shape").unwrap();
    let view = doc.add_node("view").unwrap();

    doc.add_input(shape, "radius", "3").unwrap();
    let area = doc
        .add_input(view, "area", "3.14159 * shape.radius ^ 2")
        .unwrap();
    let ratio = doc.add_input(view, "ratio", "area / 10").unwrap();

    let expected = 3.14159 * 3.0f64.powf(2.0);
    assert_eq!(doc.value(area), Some(expected));
    assert_eq!(doc.value(ratio), Some(expected / 10.0));

    doc.remove_node(shape);
    assert!(!doc.valid(area));
    assert!(!doc.valid(ratio));
}

/// Validity is recoverable: fixing the upstream expression heals the
/// downstream datums on the same call.
#[test]
fn invalidity_is_recoverable() {
    let (mut doc, a, b) = pair();

    doc.set_expr(a, "1/0");
    assert!(!doc.valid(a));
    assert!(!doc.valid(b));

    doc.set_expr(a, "7");
    assert!(doc.valid(a));
    assert_eq!(doc.value(b), Some(21.0));
}

/// The editor contract: iterate a node's inputs in declaration order
/// and poll each datum's state, as the panel does on every refresh.
#[test]
fn editor_polling_surface() {
    let mut doc = Document::new();
    let n = doc.add_node("n").unwrap();
    doc.add_input(n, "x", "1").unwrap();
    doc.add_input(n, "y", "x + 1").unwrap();
    doc.add_input(n, "z", "oops (").unwrap();

    let node = doc.node(n).unwrap();
    let rows: Vec<(String, String, bool)> = node
        .inputs()
        .map(|(name, datum)| {
            (
                name.to_string(),
                doc.get_expr(datum).to_string(),
                doc.valid(datum),
            )
        })
        .collect();

    assert_eq!(
        rows,
        vec![
            ("x".to_string(), "1".to_string(), true),
            ("y".to_string(), "x + 1".to_string(), true),
            ("z".to_string(), "oops (".to_string(), false),
        ]
    );

    // Position is editor-owned state the engine never interprets.
    doc.node_mut(n).unwrap().set_position(40.0, 25.0);
    assert_eq!(doc.node(n).unwrap().position(), (40.0, 25.0));
}
