// End-to-end scenarios for the sheet engine: literals, escapes, formula
// dependencies, cycle rejection, materialization, and printable-size
// bookkeeping, exercised through the public API only.

use pretty_assertions::assert_eq;

use cellgrid::error::EngineError;
use cellgrid::position::{Position, Size};
use cellgrid::sheet::Sheet;
use cellgrid::value::Value;

fn pos(name: &str) -> Position {
    name.parse().unwrap()
}

fn set(sheet: &mut Sheet, name: &str, text: &str) {
    sheet.set_cell(pos(name), text).unwrap();
}

fn value(sheet: &Sheet, name: &str) -> Value {
    sheet.get_value(pos(name)).unwrap()
}

fn text(sheet: &Sheet, name: &str) -> String {
    sheet.get_text(pos(name)).unwrap()
}

#[test]
fn literal_and_escape() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "hello");
    set(&mut sheet, "A2", "'123");

    assert_eq!(value(&sheet, "A1"), Value::Text("hello".into()));
    assert_eq!(value(&sheet, "A2"), Value::Text("123".into()));
    assert_eq!(text(&sheet, "A2"), "'123");
}

#[test]
fn formula_and_dependency_cache() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "2");
    set(&mut sheet, "A2", "3");
    set(&mut sheet, "A3", "=A1+A2");
    assert_eq!(value(&sheet, "A3"), Value::Number(5.0));

    set(&mut sheet, "A1", "10");
    assert_eq!(value(&sheet, "A3"), Value::Number(13.0));
}

#[test]
fn cycle_rejection_preserves_state() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "=A2");
    set(&mut sheet, "A2", "=A3");

    let err = sheet.set_cell(pos("A3"), "=A1").unwrap_err();
    match err {
        EngineError::CircularDependency(path) => {
            assert_eq!(path, "A3->A1->A2->A3");
            assert_eq!(err_display(&path), "Find cycle: A3->A1->A2->A3");
        }
        other => panic!("expected CircularDependency, got {:?}", other),
    }

    // A3 is back to its pre-call state.
    assert_eq!(text(&sheet, "A3"), "");
    assert!(sheet.get_cell(pos("A3")).unwrap().is_some());
}

fn err_display(path: &str) -> String {
    EngineError::CircularDependency(path.to_string()).to_string()
}

#[test]
fn clear_keeps_referenced_cells_alive() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "B1", "=A1");
    sheet.clear_cell(pos("A1")).unwrap();

    // A1 remains materialized as Empty because B1 still reads it.
    assert!(sheet.get_cell(pos("A1")).unwrap().is_some());
    assert_eq!(value(&sheet, "B1"), Value::Number(0.0));

    sheet.clear_cell(pos("B1")).unwrap();
    sheet.clear_cell(pos("A1")).unwrap();
    assert!(sheet.get_cell(pos("A1")).unwrap().is_none());
    assert!(sheet.get_cell(pos("B1")).unwrap().is_none());
}

#[test]
fn materialization_on_reference() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "=B5");

    let b5 = sheet.get_cell(pos("B5")).unwrap().expect("B5 materialized");
    assert_eq!(b5.text(), "");
    assert_eq!(value(&sheet, "A1"), Value::Number(0.0));
    assert_eq!(sheet.printable_size(), Size::new(5, 2));
}

#[test]
fn printable_size_trimming() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "C3", "x");
    assert_eq!(sheet.printable_size(), Size::new(3, 3));

    sheet.clear_cell(pos("C3")).unwrap();
    assert_eq!(sheet.printable_size(), Size::new(0, 0));
}

#[test]
fn formula_text_roundtrip() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "= 1 + ( 2 * B2 ) ");
    assert_eq!(text(&sheet, "A1"), "=1+2*B2");

    // Re-setting the canonical text is a no-op that leaves it unchanged.
    let canonical = text(&sheet, "A1");
    set(&mut sheet, "A1", &canonical);
    assert_eq!(text(&sheet, "A1"), canonical);
}

#[test]
fn escape_roundtrip() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "'=A2+A3");
    assert_eq!(value(&sheet, "A1"), Value::Text("=A2+A3".into()));
    assert_eq!(text(&sheet, "A1"), "'=A2+A3");
    // Escaped text never creates references.
    assert!(sheet.get_cell(pos("A2")).unwrap().is_none());
}

#[test]
fn printed_grid_matches_layout() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "name");
    set(&mut sheet, "B1", "total");
    set(&mut sheet, "A2", "'007");
    set(&mut sheet, "B2", "=2+3");

    let mut values = Vec::new();
    sheet.print_values(&mut values).unwrap();
    assert_eq!(
        String::from_utf8(values).unwrap(),
        "name\ttotal\n007\t5\n"
    );

    let mut texts = Vec::new();
    sheet.print_texts(&mut texts).unwrap();
    assert_eq!(
        String::from_utf8(texts).unwrap(),
        "name\ttotal\n'007\t=2+3\n"
    );
}

#[test]
fn chained_recalculation() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "1");
    set(&mut sheet, "A2", "=A1*2");
    set(&mut sheet, "A3", "=A2*2");
    set(&mut sheet, "A4", "=A3*2");
    assert_eq!(value(&sheet, "A4"), Value::Number(8.0));

    set(&mut sheet, "A1", "3");
    assert_eq!(value(&sheet, "A4"), Value::Number(24.0));
    assert_eq!(value(&sheet, "A3"), Value::Number(12.0));
    assert_eq!(value(&sheet, "A2"), Value::Number(6.0));
}

#[test]
fn diamond_dependencies_evaluate_once_per_read() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "10");
    set(&mut sheet, "B1", "=A1+1");
    set(&mut sheet, "C1", "=A1+2");
    set(&mut sheet, "D1", "=B1+C1");
    assert_eq!(value(&sheet, "D1"), Value::Number(23.0));

    // Both arms were memoized by the D1 read.
    let b1 = sheet.get_cell(pos("B1")).unwrap().unwrap();
    let c1 = sheet.get_cell(pos("C1")).unwrap().unwrap();
    assert_eq!(b1.cached_value(), Some(Value::Number(11.0)));
    assert_eq!(c1.cached_value(), Some(Value::Number(12.0)));
}

#[test]
fn overwrite_breaks_old_dependency() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "1");
    set(&mut sheet, "B1", "=A1+1");
    assert_eq!(value(&sheet, "B1"), Value::Number(2.0));

    // B1 becomes a literal; A1 edits must no longer reach it.
    set(&mut sheet, "B1", "done");
    set(&mut sheet, "A1", "999");
    assert_eq!(value(&sheet, "B1"), Value::Text("done".into()));

    let a1 = sheet.get_cell(pos("A1")).unwrap().unwrap();
    assert!(!a1.is_referenced());
}

#[test]
fn two_cell_cycle_message_lists_both_cells() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "=B1");
    let err = sheet.set_cell(pos("B1"), "=A1").unwrap_err();
    match err {
        EngineError::CircularDependency(path) => assert_eq!(path, "B1->A1->B1"),
        other => panic!("expected CircularDependency, got {:?}", other),
    }
}
