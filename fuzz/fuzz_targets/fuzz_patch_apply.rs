#![no_main]

use arbitrary::Arbitrary;
use fdash_core::{PatchOperation, PathSegment};
use libfuzzer_sys::fuzz_target;
use serde_json::{Value, json};

#[derive(Debug, Arbitrary)]
enum Segment {
    Key(u8),
    Index(u8),
}

#[derive(Debug, Arbitrary)]
enum Op {
    Set(Vec<Segment>, i32),
    Increment(Vec<Segment>, i32),
    Multiply(Vec<Segment>, i8),
    Append(Vec<Segment>, i32),
    Prepend(Vec<Segment>, i32),
    Insert(Vec<Segment>, u8, i32),
    Remove(Vec<Segment>, i32),
    Delete(Vec<Segment>),
    Clear(Vec<Segment>),
    Reverse(Vec<Segment>),
}

const KEYS: [&str; 4] = ["count", "items", "meta", "name"];

fn path(segments: Vec<Segment>) -> Vec<PathSegment> {
    segments
        .into_iter()
        .take(4)
        .map(|segment| match segment {
            Segment::Key(k) => PathSegment::from(KEYS[usize::from(k) % KEYS.len()]),
            Segment::Index(i) => PathSegment::from(usize::from(i % 8)),
        })
        .collect()
}

fn operation(op: Op) -> PatchOperation {
    match op {
        Op::Set(p, v) => PatchOperation::Set { path: path(p), value: v.into() },
        Op::Increment(p, by) => PatchOperation::Increment { path: path(p), by: by.into() },
        Op::Multiply(p, by) => PatchOperation::Multiply { path: path(p), by: by.into() },
        Op::Append(p, v) => PatchOperation::Append { path: path(p), value: v.into() },
        Op::Prepend(p, v) => PatchOperation::Prepend { path: path(p), value: v.into() },
        Op::Insert(p, index, v) => PatchOperation::Insert {
            path: path(p),
            index: usize::from(index % 8),
            value: v.into(),
        },
        Op::Remove(p, v) => PatchOperation::Remove { path: path(p), value: v.into() },
        Op::Delete(p) => PatchOperation::Delete { path: path(p) },
        Op::Clear(p) => PatchOperation::Clear { path: path(p) },
        Op::Reverse(p) => PatchOperation::Reverse { path: path(p) },
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let state: Value = json!({"count": 0, "items": [1, 2, 3], "meta": {"name": "x"}});
    let ops: Vec<PatchOperation> = ops.into_iter().take(64).map(operation).collect();

    // Applying must never panic and never mutate the input.
    let before = state.clone();
    let _ = fdash_core::patch::apply(&state, &ops);
    assert_eq!(state, before, "input state mutated");

    // The wire form must round-trip to the same result.
    if let Ok(wire) = serde_json::to_string(&ops) {
        let back: Vec<PatchOperation> = serde_json::from_str(&wire).expect("wire form reparses");
        assert_eq!(
            fdash_core::patch::apply(&state, &ops),
            fdash_core::patch::apply(&state, &back),
            "wire form changed the result"
        );
    }
});
