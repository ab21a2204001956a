//! Test: Common Usage - the composition operators as callers use them

use crate::helpers::*;
use forkline::{branch, handler_fn, parallel, series, Pipeline, Standalone};
use serde_json::json;

/// In-place mutations run in order; the caller's record is left untouched
#[tokio::test]
async fn test_series_mutations_apply_in_order() {
    let f = series![
        forkline::handler_ref(handler_fn(|rec, _| {
            rec.insert("a".into(), json!("s1"));
            Ok(())
        })),
        append("a", "-s2"),
    ];

    let input = record(json!({ "a": "s0" }));
    let out = outputs(&f, &input).await;

    assert_eq!(out, vec![json!({ "a": "s1-s2" })]);
    assert_eq!(input["a"], json!("s0"));
}

#[tokio::test]
async fn test_branch_yields_one_output_per_handler() {
    let f = branch![returns(json!({ "a": 1 })), returns(json!({ "b": 1 }))];
    assert_eq!(
        outputs(&f, json!({ "x": 1 })).await,
        vec![json!({ "x": 1, "a": 1 }), json!({ "x": 1, "b": 1 })]
    );
}

#[tokio::test]
async fn test_parallel_merges_disjoint_partials() {
    let f = parallel![
        returns(json!({ "a": 1 })),
        returns(json!({ "b": { "c": 2 } })),
        returns(json!({ "d": [3] })),
    ];
    assert_eq!(
        outputs(&f, json!({ "x": 0 })).await,
        vec![json!({ "x": 0, "a": 1, "b": { "c": 2 }, "d": [3] })]
    );
}

#[tokio::test]
async fn test_pipeline_wraps_a_single_handler() {
    let f = Pipeline::new(returns(json!({ "seen": true })));
    assert_eq!(
        outputs(&f, json!([{ "n": 1 }, { "n": 2 }])).await,
        vec![json!({ "n": 1, "seen": true }), json!({ "n": 2, "seen": true })]
    );
}

/// Operators built from the context behave like the free-standing ones
#[tokio::test]
async fn test_context_builds_sub_pipelines() {
    let a = set("a", json!(1));
    let b = set("b", json!(1));
    let inline = handler_fn(move |_, ctx| {
        ctx.next(ctx.branch(vec![a.clone(), b.clone()]));
        Ok(())
    });
    let f = series![inline, set("tail", json!(true))];

    assert_eq!(
        outputs(&f, json!({})).await,
        vec![json!({ "a": 1, "tail": true }), json!({ "b": 1, "tail": true })]
    );
}

#[tokio::test]
async fn test_deeply_nested_composition() {
    let f = series![
        set("start", json!(true)),
        branch![
            series![set("arm", json!("left")), parallel![set("l1", json!(1)), set("l2", json!(2))]],
            series![set("arm", json!("right")), returns(json!(true)), set("never", json!(1))],
        ],
        set("end", json!(true)),
    ];

    assert_eq!(
        outputs(&f, json!({})).await,
        vec![
            json!({ "start": true, "arm": "left", "l1": 1, "l2": 2, "end": true }),
            json!({ "start": true, "arm": "right" }),
        ]
    );
}

#[tokio::test]
async fn test_entries_are_reusable() {
    let f = series![append("log", "x")];
    assert_eq!(outputs(&f, json!({})).await, vec![json!({ "log": "x" })]);
    assert_eq!(outputs(&f, json!({})).await, vec![json!({ "log": "x" })]);

    let cloned = f.clone();
    assert_eq!(cloned.run(json!({ "log": "y" })).await.unwrap().len(), 1);
}
