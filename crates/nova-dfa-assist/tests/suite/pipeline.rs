use nova_dfa_assist::{
    run_dfa_assist, AnalysisLock, DebuggerDfaListener, DfaAssistConfig, DfaAssistError,
    DfaAssistResult, LanguageId, Larva, SourceElement, ValueSnapshot,
};
use nova_flow::{AnchorId, Condition, DfType, JvmType};
use nova_jdwp::{JdwpError, JdwpValue, MockJdwpClient};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use super::fixture::*;

fn int_branch_host() -> TestHost {
    TestHost::new(|factory| {
        let x = int_local(factory, "x");
        Some(single_branch(Condition::not_equal(x, DfType::int(5))))
    })
}

fn point_branch_host() -> TestHost {
    TestHost::new(|factory| {
        let point = JvmType::Class(factory.table().lookup("com.example.Point")?);
        let p = factory.local("p", &point);
        let q = factory.local("q", &point);
        Some(single_branch(Condition::equal(p, q)))
    })
}

fn run(
    host: &TestHost,
    client: &mut MockJdwpClient,
    element: Option<&SourceElement>,
    config: &DfaAssistConfig,
) -> DfaAssistResult<Option<Box<dyn DebuggerDfaListener>>> {
    run_dfa_assist(
        &AnalysisLock::new(),
        host,
        client,
        FRAME,
        element,
        config,
        &CancellationToken::new(),
    )
}

fn run_default(
    host: &TestHost,
    client: &mut MockJdwpClient,
    element: Option<&SourceElement>,
) -> DfaAssistResult<Option<Box<dyn DebuggerDfaListener>>> {
    run(host, client, element, &DfaAssistConfig::default())
}

fn x_is_five() -> MockJdwpClient {
    client_with(paused_frame().with_local("x", JdwpValue::Int(5)))
}

#[test]
fn assist_applies_only_to_matching_pauses() -> anyhow::Result<()> {
    let host = int_branch_host();

    assert!(run_default(&host, &mut x_is_five(), None)?.is_none());

    let invalid = SourceElement {
        valid: false,
        ..element()
    };
    assert!(run_default(&host, &mut x_is_five(), Some(&invalid))?.is_none());

    let kotlin = SourceElement {
        language: LanguageId("kotlin"),
        ..element()
    };
    assert!(run_default(&host, &mut x_is_five(), Some(&kotlin))?.is_none());

    let other_line = SourceElement {
        line: LINE + 1,
        ..element()
    };
    assert!(run_default(&host, &mut x_is_five(), Some(&other_line))?.is_none());

    let other_class = SourceElement {
        enclosing_class: "com.example.Other".to_string(),
        ..element()
    };
    assert!(run_default(&host, &mut x_is_five(), Some(&other_class))?.is_none());

    let unbound_anchor = SourceElement {
        anchor: Some(AnchorId(99)),
        ..element()
    };
    assert!(run_default(&host, &mut x_is_five(), Some(&unbound_anchor))?.is_none());

    let no_block = SourceElement {
        code_block: None,
        ..element()
    };
    assert!(run_default(&host, &mut x_is_five(), Some(&no_block))?.is_none());

    // Sanity check: the unmodified element does produce a listener.
    assert!(run_default(&host, &mut x_is_five(), Some(&element()))?.is_some());
    Ok(())
}

#[test]
fn pauses_in_nested_classes_match_the_outer_element() -> anyhow::Result<()> {
    let host = int_branch_host();
    let mut frame = paused_frame().with_local("x", JdwpValue::Int(5));
    frame.location.class_signature = "Lcom/example/Main$1;".to_string();
    let mut client = client_with(frame);
    assert!(run_default(&host, &mut client, Some(&element()))?.is_some());
    Ok(())
}

#[test]
fn dumb_mode_and_disabled_config_skip_the_assist() -> anyhow::Result<()> {
    let mut host = int_branch_host();
    let config = DfaAssistConfig {
        enabled: false,
        ..DfaAssistConfig::default()
    };
    let mut client = x_is_five();
    assert!(run(&host, &mut client, Some(&element()), &config)?.is_none());
    assert_eq!(client.calls(), 0);

    host.dumb = true;
    assert!(run_default(&host, &mut client, Some(&element()))?.is_none());
    assert_eq!(client.calls(), 0);
    Ok(())
}

#[test]
fn missing_flow_or_live_values_skip_the_assist() -> anyhow::Result<()> {
    let no_flow = TestHost::new(|_| None);
    assert!(run_default(&no_flow, &mut x_is_five(), Some(&element()))?.is_none());

    let host = int_branch_host();
    let mut unset = client_with(paused_frame());
    assert!(run_default(&host, &mut unset, Some(&element()))?.is_none());
    Ok(())
}

#[test]
fn malformed_location_is_an_error() {
    let host = int_branch_host();
    let mut frame = paused_frame().with_local("x", JdwpValue::Int(5));
    frame.location.class_signature = "[I".to_string();
    let mut client = client_with(frame);
    assert!(matches!(
        run_default(&host, &mut client, Some(&element())),
        Err(DfaAssistError::InvalidLocation(_))
    ));
}

#[test]
fn class_loader_filter_keeps_parent_loaded_types() -> anyhow::Result<()> {
    let host = point_branch_host();
    let mut client = MockJdwpClient::new();
    let parent = client.new_class_loader(None);
    let app = client.new_class_loader(Some(&parent));
    let stranger = client.new_class_loader(None);

    let shared_point = client.define_type("Lcom/example/Point;", None, Some(parent.id));
    let isolated_point =
        client.define_type("Lcom/example/Point$Isolated;", None, Some(stranger.id));
    let p = client.new_object(shared_point);
    let q = client.new_object(isolated_point);
    client.set_frame(
        FRAME,
        paused_frame()
            .with_class_loader(Some(app.id))
            .with_local("p", JdwpValue::Object(p.clone()))
            .with_local("q", JdwpValue::Object(q)),
    );

    let lock = AnalysisLock::new();
    let larva = {
        let read = lock.read();
        Larva::hatch(&read, &host, &mut client, FRAME, Some(&element()))?.expect("larva")
    };
    assert_eq!(larva.aliases().len(), 2);
    let pupa = larva.pupate(&mut client, &CancellationToken::new())?;

    let snapshots: Vec<_> = pupa.snapshots().iter().collect();
    assert_eq!(
        snapshots,
        vec![(
            &JdwpValue::Object(p),
            &ValueSnapshot::ObjectRef {
                signature: "Lcom/example/Point;".to_string(),
            }
        )]
    );
    Ok(())
}

#[test]
fn disconnect_while_snapshotting_aborts() -> anyhow::Result<()> {
    let host = point_branch_host();
    let mut client = client_with(paused_frame());
    let point = client.define_type("Lcom/example/Point;", None, None);
    let p = client.new_object(point);
    client.set_local(FRAME, "p", JdwpValue::Object(p));

    let lock = AnalysisLock::new();
    let larva = {
        let read = lock.read();
        Larva::hatch(&read, &host, &mut client, FRAME, Some(&element()))?.expect("larva")
    };
    client.fail_after(0);
    assert!(matches!(
        larva.pupate(&mut client, &CancellationToken::new()),
        Err(DfaAssistError::Jdwp(JdwpError::NotConnected))
    ));
    Ok(())
}

#[test]
fn disconnect_surfaces_from_the_full_pipeline() {
    let host = int_branch_host();
    let mut client = x_is_five();
    client.fail_after(0);
    let err = match run_default(&host, &mut client, Some(&element())) {
        Err(err) => err,
        Ok(_) => panic!("expected a remote error"),
    };
    assert!(err.is_remote());
}

#[test]
fn snapshotting_under_read_access_is_rejected() -> anyhow::Result<()> {
    let host = int_branch_host();
    let mut client = x_is_five();
    let lock = AnalysisLock::new();
    let read = lock.read();
    let larva = Larva::hatch(&read, &host, &mut client, FRAME, Some(&element()))?.expect("larva");
    assert!(matches!(
        larva.pupate(&mut client, &CancellationToken::new()),
        Err(DfaAssistError::ReadAccessHeld)
    ));
    Ok(())
}

#[test]
fn cancellation_yields_no_result() -> anyhow::Result<()> {
    let host = int_branch_host();
    let mut client = x_is_five();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = run_dfa_assist(
        &AnalysisLock::new(),
        &host,
        &mut client,
        FRAME,
        Some(&element()),
        &DfaAssistConfig::default(),
        &cancel,
    )?;
    assert!(result.is_none());
    Ok(())
}

#[test]
fn interpretation_is_repeatable() -> anyhow::Result<()> {
    let host = point_branch_host();
    let mut client = client_with(paused_frame());
    let point = client.define_type("Lcom/example/Point;", None, None);
    let first = client.new_object(point);
    let second = client.new_object(point);
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
    let before = runner.starting_state().clone();

    let first_run = runner.interpret(&read, &cancel).expect("completes").hints();
    let second_run = runner.interpret(&read, &cancel).expect("completes").hints();
    assert_eq!(first_run, second_run);
    assert_eq!(runner.starting_state(), &before);
    Ok(())
}

#[test]
fn exhausted_step_budget_yields_no_result() -> anyhow::Result<()> {
    let host = int_branch_host();
    let config = DfaAssistConfig {
        max_interpreter_steps: 0,
        ..DfaAssistConfig::default()
    };
    assert!(run(&host, &mut x_is_five(), Some(&element()), &config)?.is_none());
    Ok(())
}
