use nova_dfa_assist::{run_dfa_assist, AnalysisLock, DfaAssistConfig, DfaHint, HintKind, Larva};
use nova_flow::{Condition, DfType, JvmType, TypeConstraint};
use nova_jdwp::JdwpValue;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use super::fixture::*;

#[test]
fn known_int_makes_branch_unreachable() -> anyhow::Result<()> {
    let host = TestHost::new(|factory| {
        let x = int_local(factory, "x");
        Some(single_branch(Condition::not_equal(x, DfType::int(5))))
    });
    let mut client = client_with(paused_frame().with_local("x", JdwpValue::Int(5)));
    let lock = AnalysisLock::new();
    let cancel = CancellationToken::new();

    let larva = {
        let read = lock.read();
        Larva::hatch(&read, &host, &mut client, FRAME, Some(&element()))?.expect("larva")
    };
    let groups: Vec<_> = larva
        .aliases()
        .iter()
        .map(|(value, vars)| (value.clone(), vars.len()))
        .collect();
    assert_eq!(groups, vec![(JdwpValue::Int(5), 1)]);

    let pupa = larva.pupate(&mut client, &cancel)?;
    let read = lock.read();
    let runner = pupa
        .transform(&read, &DfaAssistConfig::default())
        .expect("fresh sources");
    let x = runner.factory().variables().next().expect("x");
    assert_eq!(
        runner.starting_state().df_type(runner.factory(), x),
        DfType::int(5)
    );

    let listener = runner.interpret(&read, &cancel).expect("interpretation completes");
    assert_eq!(
        listener.hints(),
        vec![DfaHint {
            anchor: BRANCH,
            kind: HintKind::AlwaysFalse,
        }]
    );
    Ok(())
}

#[test]
fn shared_object_aliases_are_equal() -> anyhow::Result<()> {
    let host = TestHost::new(|factory| {
        let point = JvmType::Class(factory.table().lookup("com.example.Point")?);
        let a = factory.local("a", &point);
        let b = factory.local("b", &point);
        Some(single_branch(Condition::equal(a, b)))
    });
    let mut client = client_with(paused_frame());
    let point_type = client.define_type("Lcom/example/Point;", None, None);
    let shared = client.new_object(point_type);
    client.set_local(FRAME, "a", JdwpValue::Object(shared.clone()));
    client.set_local(FRAME, "b", JdwpValue::Object(shared));

    let lock = AnalysisLock::new();
    let cancel = CancellationToken::new();
    let larva = {
        let read = lock.read();
        Larva::hatch(&read, &host, &mut client, FRAME, Some(&element()))?.expect("larva")
    };
    let pupa = larva.pupate(&mut client, &cancel)?;
    let read = lock.read();
    let runner = pupa
        .transform(&read, &DfaAssistConfig::default())
        .expect("fresh sources");

    let vars: Vec<_> = runner.factory().variables().collect();
    let state = runner.starting_state();
    assert!(state.are_equal(vars[0], vars[1]));
    assert_eq!(state.distinct_pairs().count(), 0);

    let listener = runner.interpret(&read, &cancel).expect("interpretation completes");
    assert_eq!(
        listener.hints(),
        vec![DfaHint {
            anchor: BRANCH,
            kind: HintKind::AlwaysTrue,
        }]
    );
    Ok(())
}

#[test]
fn distinct_objects_compare_unequal() -> anyhow::Result<()> {
    let host = TestHost::new(|factory| {
        let point = JvmType::Class(factory.table().lookup("com.example.Point")?);
        let p = factory.local("p", &point);
        let q = factory.local("q", &point);
        Some(single_branch(Condition::equal(p, q)))
    });
    let mut client = client_with(paused_frame());
    let point_type = client.define_type("Lcom/example/Point;", None, None);
    let first = client.new_object(point_type);
    let second = client.new_object(point_type);
    client.set_local(FRAME, "p", JdwpValue::Object(first));
    client.set_local(FRAME, "q", JdwpValue::Object(second));

    let lock = AnalysisLock::new();
    let cancel = CancellationToken::new();
    let larva = {
        let read = lock.read();
        Larva::hatch(&read, &host, &mut client, FRAME, Some(&element()))?.expect("larva")
    };
    let pupa = larva.pupate(&mut client, &cancel)?;
    let read = lock.read();
    let runner = pupa
        .transform(&read, &DfaAssistConfig::default())
        .expect("fresh sources");

    let vars: Vec<_> = runner.factory().variables().collect();
    assert!(runner.starting_state().are_distinct(vars[0], vars[1]));
    assert_eq!(
        runner.starting_state().df_type(runner.factory(), vars[0]),
        DfType::not_null(TypeConstraint::exact(host.point()))
    );

    let listener = runner.interpret(&read, &cancel).expect("interpretation completes");
    assert_eq!(
        listener.hints(),
        vec![DfaHint {
            anchor: BRANCH,
            kind: HintKind::AlwaysFalse,
        }]
    );
    Ok(())
}

#[test]
fn edits_after_snapshot_discard_the_run() -> anyhow::Result<()> {
    let host = TestHost::new(|factory| {
        let x = int_local(factory, "x");
        Some(single_branch(Condition::not_equal(x, DfType::int(5))))
    });
    let mut client = client_with(paused_frame().with_local("x", JdwpValue::Int(5)));
    let lock = AnalysisLock::new();
    let cancel = CancellationToken::new();

    let larva = {
        let read = lock.read();
        Larva::hatch(&read, &host, &mut client, FRAME, Some(&element()))?.expect("larva")
    };
    let pupa = larva.pupate(&mut client, &cancel)?;
    let runner = {
        let read = lock.read();
        pupa.transform(&read, &DfaAssistConfig::default())
            .expect("fresh sources")
    };

    {
        let _write = lock.write();
        host.tracker.increment();
    }
    let read = lock.read();
    assert!(runner.interpret(&read, &cancel).is_none());
    Ok(())
}

#[test]
fn edits_during_fetch_discard_the_run() -> anyhow::Result<()> {
    let host = TestHost::new(|factory| {
        let x = int_local(factory, "x");
        Some(single_branch(Condition::not_equal(x, DfType::int(5))))
    });
    let mut client = client_with(paused_frame().with_local("x", JdwpValue::Int(5)));
    let lock = AnalysisLock::new();
    let cancel = CancellationToken::new();

    let larva = {
        let read = lock.read();
        Larva::hatch(&read, &host, &mut client, FRAME, Some(&element()))?.expect("larva")
    };
    let stamp = larva.stamp();
    let pupa = larva.pupate(&mut client, &cancel)?;
    assert_eq!(host.tracker.increment(), stamp + 1);

    let read = lock.read();
    assert!(pupa.transform(&read, &DfaAssistConfig::default()).is_none());
    Ok(())
}

#[test]
fn full_pipeline_reports_condition_outcome() -> anyhow::Result<()> {
    let host = TestHost::new(|factory| {
        let x = int_local(factory, "x");
        Some(single_branch(Condition::equal(x, DfType::int(5))))
    });
    let mut client = client_with(paused_frame().with_local("x", JdwpValue::Int(5)));
    let listener = run_dfa_assist(
        &AnalysisLock::new(),
        &host,
        &mut client,
        FRAME,
        Some(&element()),
        &DfaAssistConfig::default(),
        &CancellationToken::new(),
    )?
    .expect("listener");
    assert_eq!(
        listener.hints(),
        vec![DfaHint {
            anchor: BRANCH,
            kind: HintKind::AlwaysTrue,
        }]
    );
    assert_eq!(listener.hints()[0].kind.to_string(), "is always true");
    Ok(())
}

fn hints_for_double(x: f64, condition: fn(nova_flow::VarId) -> Condition) -> Vec<DfaHint> {
    let host = TestHost::new(move |factory| {
        let var = double_local(factory, "x");
        Some(single_branch(condition(var)))
    });
    let mut client = client_with(paused_frame().with_local("x", JdwpValue::Double(x)));
    run_dfa_assist(
        &AnalysisLock::new(),
        &host,
        &mut client,
        FRAME,
        Some(&element()),
        &DfaAssistConfig::default(),
        &CancellationToken::new(),
    )
    .expect("no remote failure")
    .expect("listener")
    .hints()
}

#[test]
fn negative_zero_equals_zero() {
    let always_true = vec![DfaHint {
        anchor: BRANCH,
        kind: HintKind::AlwaysTrue,
    }];
    assert_eq!(
        hints_for_double(-0.0, |x| Condition::equal(x, DfType::double(0.0))),
        always_true
    );
    assert_eq!(
        hints_for_double(0.0, |x| Condition::equal(x, DfType::double(-0.0))),
        always_true
    );
}

#[test]
fn nan_never_compares_equal() {
    let always_false = vec![DfaHint {
        anchor: BRANCH,
        kind: HintKind::AlwaysFalse,
    }];
    assert_eq!(
        hints_for_double(f64::NAN, |x| Condition::equal(x, DfType::double(f64::NAN))),
        always_false
    );
    assert_eq!(
        hints_for_double(f64::NAN, |x| Condition::equal(x, x)),
        always_false
    );
    assert_eq!(
        hints_for_double(f64::NAN, |x| Condition::not_equal(x, DfType::double(1.0))),
        vec![DfaHint {
            anchor: BRANCH,
            kind: HintKind::AlwaysTrue,
        }]
    );
}
