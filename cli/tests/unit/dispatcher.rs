//! Queue construction and both dispatch modes.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use poweroff_guests::application::services::dispatcher::{
    build_queue, dispatch, run_concurrent, run_sequential,
};
use poweroff_guests::domain::error::{ConfigError, DispatchError, TransportError};
use poweroff_guests::domain::protocol::{FailureKind, ShutdownEvent};
use poweroff_guests::domain::server::ControllerKind;
use poweroff_guests::domain::settings::Synchronicity;

use crate::helpers::{nas_record, record, vm_record};
use crate::mocks::{MockProbe, MockTransport, context};

fn outcome_summary(
    report: &poweroff_guests::domain::protocol::DispatchReport,
) -> Vec<(String, Option<FailureKind>)> {
    report
        .outcomes
        .iter()
        .map(|o| (o.server.clone(), o.result.as_ref().err().map(|f| f.kind)))
        .collect()
}

#[test]
fn test_build_queue_keeps_record_order() {
    let queue = build_queue(vec![
        nas_record(0, "nas.lan"),
        vm_record(1, "esxi1.lan"),
        vm_record(2, "esxi2.lan"),
    ])
    .unwrap();

    let kinds: Vec<_> = queue.iter().map(|c| c.kind()).collect();
    assert_eq!(
        kinds,
        [
            ControllerKind::HttpCookie,
            ControllerKind::VmSession,
            ControllerKind::VmSession
        ]
    );
    let hosts: Vec<_> = queue.iter().map(|c| c.record().host.as_str()).collect();
    assert_eq!(hosts, ["nas.lan", "esxi1.lan", "esxi2.lan"]);
}

#[test]
fn test_build_queue_rejects_unknown_kind() {
    let err = build_queue(vec![
        vm_record(0, "esxi.lan"),
        record(1, "XenController", "xen.lan"),
    ])
    .unwrap_err();

    match err {
        ConfigError::UnknownControllerKind { index, kind, valid } => {
            assert_eq!(index, 1);
            assert_eq!(kind, "XenController");
            assert!(valid.contains("VMServerController"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_sequential_failure_does_not_stop_later_servers() {
    // server1 does not answer pings and refuses connections; server2 is healthy.
    let transport = MockTransport::new().unreachable("server1");
    let ctx = context(transport, MockProbe::answering(&["server2"]));
    let queue = build_queue(vec![vm_record(0, "server1"), vm_record(1, "server2")]).unwrap();

    let report = run_sequential(&queue, &ctx).await;

    assert_eq!(
        outcome_summary(&report),
        [
            ("server1".to_string(), Some(FailureKind::Transport)),
            ("server2".to_string(), None),
        ]
    );
    assert!(!report.outcomes[0].reachability.reachable);
    assert_eq!(ctx.transport.sent_to("server1").len(), 1);
    assert_eq!(ctx.transport.sent_to("server2").len(), 4);
    assert_eq!(ctx.events.failed(), ["server1"]);
    assert_eq!(ctx.events.executed(), ["server2"]);

    let combined = report.combined_failure().unwrap();
    assert!(combined.starts_with("1 of 2 server(s)"), "got: {combined}");
    assert!(combined.contains("server1"));
}

#[tokio::test]
async fn test_sequential_runs_servers_one_after_another() {
    let ctx = context(MockTransport::new(), MockProbe::answering(&["a", "b"]));
    let queue = build_queue(vec![vm_record(0, "a"), vm_record(1, "b")]).unwrap();

    run_sequential(&queue, &ctx).await;

    let hosts: Vec<_> = ctx
        .transport
        .sent()
        .iter()
        .map(|(r, _)| crate::mocks::host_of(&r.url))
        .collect();
    assert_eq!(hosts, ["a", "a", "a", "a", "b", "b", "b", "b"]);
}

#[tokio::test]
async fn test_concurrent_outcomes_match_sequential_classification() {
    let records = vec![
        vm_record(0, "esxi1"),
        vm_record(1, "esxi2"),
        vm_record(2, "esxi3"),
    ];
    let failing = || {
        MockTransport::new().script(
            "esxi2",
            vec![Err(TransportError::Status {
                url: "https://esxi2:443/sdk".into(),
                status: 503,
            })],
        )
    };
    let probe = || MockProbe::answering(&["esxi1", "esxi2", "esxi3"]);

    let seq_ctx = context(failing(), probe());
    let sequential = run_sequential(&build_queue(records.clone()).unwrap(), &seq_ctx).await;

    let conc_ctx = Arc::new(context(failing(), probe()));
    let concurrent = run_concurrent(build_queue(records).unwrap(), Arc::clone(&conc_ctx))
        .await
        .unwrap();

    assert_eq!(outcome_summary(&concurrent), outcome_summary(&sequential));
    assert_eq!(
        outcome_summary(&concurrent),
        [
            ("esxi1".to_string(), None),
            ("esxi2".to_string(), Some(FailureKind::Transport)),
            ("esxi3".to_string(), None),
        ]
    );
    let mut executed = conc_ctx.events.executed();
    executed.sort();
    assert_eq!(executed, ["esxi1", "esxi3"]);
}

#[tokio::test]
async fn test_concurrent_panic_is_catastrophic() {
    let transport = MockTransport::new().panicking("boom");
    let ctx = Arc::new(context(transport, MockProbe::answering(&["boom", "fine"])));
    let queue = build_queue(vec![vm_record(0, "boom"), vm_record(1, "fine")]).unwrap();

    let err = run_concurrent(queue, Arc::clone(&ctx)).await.unwrap_err();

    assert!(matches!(err, DispatchError::Catastrophic(_)));
    // The healthy server still ran to completion.
    assert_eq!(ctx.events.executed(), ["fine"]);
}

#[tokio::test]
async fn test_dispatch_empty_queue_succeeds() {
    let ctx = Arc::new(context(MockTransport::new(), MockProbe::default()));

    for mode in [Synchronicity::Synchronous, Synchronicity::Asynchronous] {
        let report = dispatch(mode, Vec::new(), Arc::clone(&ctx)).await.unwrap();
        assert!(report.outcomes.is_empty());
        assert!(report.all_succeeded());
        assert!(report.combined_failure().is_none());
    }
    assert!(ctx.events.events().is_empty());
}

#[tokio::test]
async fn test_dispatch_mixed_protocols_concurrently() {
    let ctx = Arc::new(context(
        MockTransport::new(),
        MockProbe::answering(&["esxi", "nas"]),
    ));
    let queue = build_queue(vec![vm_record(0, "esxi"), nas_record(1, "nas")]).unwrap();

    let report = dispatch(Synchronicity::Asynchronous, queue, Arc::clone(&ctx))
        .await
        .unwrap();

    // The unscripted NAS page carries no authtoken.
    assert_eq!(
        outcome_summary(&report),
        [
            ("esxi".to_string(), None),
            ("nas".to_string(), Some(FailureKind::Transport)),
        ]
    );
    let precheck_count = ctx
        .events
        .events()
        .iter()
        .filter(|e| matches!(e, ShutdownEvent::PrecheckStarted { .. }))
        .count();
    assert_eq!(precheck_count, 2);
}
