//! Cycle detection over the forward-reference graph.
//!
//! Runs before an edit commits: the edited cell's *candidate* edges are
//! supplied by the caller, every other node's edges come from the sheet. The
//! walk is a three-color DFS with an explicit frame stack, so depth is bounded
//! by heap, not the call stack.

use rustc_hash::FxHashMap;

use crate::position::Position;

#[derive(Clone, Copy, PartialEq)]
enum Color {
    // White (unseen) is represented by absence from the marker map.
    Gray,
    Black,
}

struct Frame<'s> {
    pos: Position,
    edges: &'s [Position],
    next: usize,
}

/// Search for a cycle reachable from `start`, treating `start_edges` as the
/// start node's outgoing edges.
///
/// Returns the cycle path rendered as `"P1->P2->…->P1"`: the trace suffix
/// from the first occurrence of the revisited node. Black nodes are never
/// re-entered, so each position appears in the trace at most once before the
/// closing repeat.
pub fn find_cycle<'s>(
    start: Position,
    start_edges: &'s [Position],
    edges_of: impl Fn(Position) -> &'s [Position],
) -> Option<String> {
    let mut marker: FxHashMap<Position, Color> = FxHashMap::default();
    let mut trace: Vec<Position> = vec![start];
    let mut stack: Vec<Frame<'s>> = Vec::new();

    marker.insert(start, Color::Gray);
    stack.push(Frame { pos: start, edges: start_edges, next: 0 });

    while let Some(frame) = stack.last_mut() {
        if frame.next < frame.edges.len() {
            let next = frame.edges[frame.next];
            frame.next += 1;

            match marker.get(&next) {
                Some(Color::Gray) => {
                    trace.push(next);
                    return Some(render_cycle(&trace, next));
                }
                Some(Color::Black) => {}
                None => {
                    marker.insert(next, Color::Gray);
                    trace.push(next);
                    stack.push(Frame { pos: next, edges: edges_of(next), next: 0 });
                }
            }
        } else {
            marker.insert(frame.pos, Color::Black);
            trace.pop();
            stack.pop();
        }
    }

    None
}

fn render_cycle(trace: &[Position], entry: Position) -> String {
    let first = trace
        .iter()
        .position(|&p| p == entry)
        .unwrap_or(0);
    trace[first..]
        .iter()
        .map(Position::to_string)
        .collect::<Vec<_>>()
        .join("->")
}
