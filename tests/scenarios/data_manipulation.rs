//! Test: Data Manipulation - merge, replace, fan-out and scheduling

use crate::helpers::*;
use forkline::{
    branch, handler_async, handler_fn, handler_ref, series, Extensions, Outcome, Pipeline,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

fn counter(field: &'static str) -> forkline::HandlerRef {
    handler_ref(handler_fn(move |rec, _| {
        let x = rec["x"].as_i64().unwrap_or_default();
        rec.insert(field.to_string(), x.into());
        rec.insert("x".to_string(), (x + 1).into());
        Ok(())
    }))
}

/// Each array result multiplies the lineages still to run
#[tokio::test]
async fn test_arrays_in_series() {
    let f = series![
        returns(json!([{ "a": 1 }, { "b": 1 }])),
        returns(json!([{ "c": 2 }, { "d": 2 }])),
    ];
    assert_eq!(
        outputs(&f, json!({ "x": 0 })).await,
        vec![
            json!({ "x": 0, "a": 1, "c": 2 }),
            json!({ "x": 0, "a": 1, "d": 2 }),
            json!({ "x": 0, "b": 1, "c": 2 }),
            json!({ "x": 0, "b": 1, "d": 2 }),
        ]
    );
}

#[tokio::test]
async fn test_detached_records_replace() {
    let f = series![
        set("x", json!(0)),
        handler_ref(handler_fn(|_, ctx| Ok(ctx.detached(record(json!({ "y": 1 })))))),
    ];
    assert_eq!(outputs(&f, json!({ "x": 5 })).await, vec![json!({ "y": 1 })]);
}

#[tokio::test]
async fn test_detached_in_branch() {
    let detached = |field: &'static str| {
        handler_ref(handler_fn(move |_, ctx| {
            let mut fresh = forkline::Record::new();
            fresh.insert(field.to_string(), json!(1));
            Ok(ctx.detached(fresh))
        }))
    };
    let f = branch![
        series![detached("c"), returns(json!([{}, null]))],
        series![detached("d"), returns(json!([{}, null]))],
    ];

    // each arm yields its record twice: once itself, once from the copy it spawned
    assert_eq!(
        outputs(&f, json!({ "x": 0 })).await,
        vec![json!({ "c": 1 }), json!({ "c": 1 }), json!({ "d": 1 }), json!({ "d": 1 })]
    );
}

#[tokio::test]
async fn test_next_jumps_the_queue_and_push_appends() {
    let (a, b, c, d, e) = (counter("a"), counter("b"), counter("c"), counter("d"), counter("e"));
    let scheduler = handler_fn(move |_, ctx| {
        ctx.push(vec![c.clone(), d.clone()]);
        ctx.next(vec![a.clone(), b.clone()]);
        ctx.push(e.clone());
        Ok(())
    });

    let out = outputs(&Pipeline::new(scheduler), json!({ "x": 0 })).await;
    assert_eq!(out, vec![json!({ "a": 0, "b": 1, "c": 2, "d": 3, "e": 4, "x": 5 })]);
}

#[tokio::test]
async fn test_rebase_discards_previous_record() {
    let rebase = handler_fn(|_, ctx| {
        ctx.rebase(record(json!({ "x": 10 })));
        Ok(())
    });
    let f = series![counter("a"), rebase, counter("b")];
    assert_eq!(outputs(&f, json!({ "x": 0 })).await, vec![json!({ "b": 10, "x": 11 })]);
}

#[tokio::test]
async fn test_secondary_outcome_kinds() {
    let f = series![
        returns(json!([{ "primary": true }, false, true, null, { "merged": true }])),
        set("tail", json!(true)),
    ];

    assert_eq!(
        outputs(&f, json!({})).await,
        vec![
            // `true` snapshots the record as it was before the primary outcome
            json!({}),
            json!({ "primary": true, "tail": true }),
            json!({ "merged": true, "tail": true }),
            json!({ "tail": true }),
        ]
    );
}

#[tokio::test]
async fn test_nested_objects_are_merged() {
    let f = series![
        returns(json!({ "user": { "name": "ada" } })),
        returns(json!({ "user": { "role": "admin" }, "tags": ["b"] })),
    ];
    assert_eq!(
        outputs(&f, json!({ "user": { "id": 1 }, "tags": ["a"] })).await,
        vec![json!({ "user": { "id": 1, "name": "ada", "role": "admin" }, "tags": ["b"] })]
    );
}

#[tokio::test]
async fn test_guarded_keys_are_never_merged() {
    let f = series![returns(json!({ "__proto__": { "polluted": true }, "constructor": 1, "ok": 1 }))];
    assert_eq!(outputs(&f, json!({})).await, vec![json!({ "ok": 1 })]);
}

#[tokio::test]
async fn test_forks_do_not_share_records() {
    let f = series![
        set("shared", json!({ "n": 0 })),
        branch![
            handler_ref(handler_fn(|rec, _| {
                rec["shared"]["n"] = json!(1);
                Ok(())
            })),
            set("other", json!(true)),
        ],
    ];
    assert_eq!(
        outputs(&f, json!({})).await,
        vec![
            json!({ "shared": { "n": 1 } }),
            json!({ "shared": { "n": 0 }, "other": true }),
        ]
    );
}

#[tokio::test]
async fn test_extensions_are_visible_to_every_lineage() {
    #[derive(Default)]
    struct Calls(AtomicUsize);

    let bump = handler_async(|_, ext: Extensions| async move {
        let calls = ext.get::<Calls>().map(|c| c.0.fetch_add(1, Ordering::SeqCst));
        Ok(Outcome::Merge(record(json!({ "call": calls }))))
    });
    let ext = Extensions::new().with(Calls::default());
    let f = Pipeline::with_extensions(
        series![returns(json!([{ "arm": 1 }, { "arm": 2 }, { "arm": 3 }])), bump],
        ext.clone(),
    );

    let out = outputs(&f, json!({})).await;
    assert_eq!(out.len(), 3);
    assert_eq!(ext.get::<Calls>().unwrap().0.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_fresh_extensions_per_run() {
    let remember = handler_fn(|rec, ctx| {
        let previous = ctx.extensions().insert(String::from("seen"));
        rec.insert("first".into(), previous.is_none().into());
        Ok(())
    });
    let f = Pipeline::new(remember);

    assert_eq!(
        outputs(&f, json!([{}, {}])).await,
        vec![json!({ "first": true }), json!({ "first": false })]
    );
    assert_eq!(outputs(&f, json!({})).await, vec![json!({ "first": true })]);
}
