//! VM-session controller driven end to end against mock ports.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use poweroff_guests::application::ports::TransportResponse;
use poweroff_guests::application::services::controller::ShutdownController;
use poweroff_guests::application::services::controller::vm_session::{
    CLIENT_USER_AGENT, SOAP_ACTION,
};
use poweroff_guests::domain::error::TransportError;
use poweroff_guests::domain::protocol::{ControllerState, FailureKind, ShutdownEvent};
use poweroff_guests::domain::settings::ReachabilityPolicy;

use crate::helpers::vm_record;
use crate::mocks::{
    MockProbe, MockTransport, MockVault, PASSWORD, context, context_with, ok_response,
    ok_with_cookie, status_response,
};

const HOST: &str = "esxi.lan";

fn controller() -> ShutdownController {
    ShutdownController::for_record(vm_record(0, HOST)).unwrap()
}

#[tokio::test]
async fn test_vm_session_happy_path_sends_four_operations() {
    let ctx = context(MockTransport::new(), MockProbe::answering(&[HOST]));

    let outcome = controller().run(&ctx).await;

    assert!(outcome.is_success(), "outcome: {outcome:?}");
    assert_eq!(outcome.reached, ControllerState::ShutdownIssued);
    assert!(outcome.reachability.reachable);

    let sent = ctx.transport.sent();
    assert_eq!(sent.len(), 4);
    for (i, (request, body)) in sent.iter().enumerate() {
        assert_eq!(request.url, "https://esxi.lan:443/sdk");
        assert_eq!(request.header("User-Agent"), Some(CLIENT_USER_AGENT));
        assert_eq!(request.header("SOAPAction"), Some(SOAP_ACTION));
        let body = body.as_deref().expect("every operation has a body");
        let id = format!("AC1CF80C-{:08X}", i + 1);
        assert!(body.contains(&id), "operation {i} missing {id}");
    }
    assert!(sent[0].0.header("Cookie").is_none());
    for (request, _) in &sent[1..] {
        assert_eq!(request.header("Cookie"), Some("vmware_soap_session=\"52a1\""));
    }
}

#[tokio::test]
async fn test_vm_session_login_body_carries_username_and_password() {
    let ctx = context(MockTransport::new(), MockProbe::answering(&[HOST]));

    controller().run(&ctx).await;

    let sent = ctx.transport.sent();
    let login = sent[2].1.as_deref().unwrap();
    assert!(login.contains("<userName>root</userName>"));
    assert!(login.contains(&format!("<password>{PASSWORD}</password>")));
    assert!(login.contains("ha-sessionmgr"));
    let shutdown = sent[3].1.as_deref().unwrap();
    assert!(shutdown.contains("<force>true</force>"));
    assert!(!shutdown.contains(PASSWORD));
    assert_eq!(ctx.vault.decrypts(), 1);
}

#[tokio::test]
async fn test_vm_session_missing_cookie_stops_after_hello() {
    let transport = MockTransport::new().script(HOST, vec![Ok(ok_response("<hello/>"))]);
    let ctx = context(transport, MockProbe::answering(&[HOST]));

    let outcome = controller().run(&ctx).await;

    let failure = outcome.result.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Transport);
    assert!(failure.detail.contains("cookie"), "detail: {}", failure.detail);
    assert_eq!(outcome.reached, ControllerState::Idle);
    assert_eq!(ctx.transport.sent().len(), 1);
}

#[tokio::test]
async fn test_vm_session_login_fault_is_a_credential_failure() {
    let fault = "<soap:Fault><faultcode>ServerFaultCode</faultcode>\
                 <faultstring>Cannot complete login due to an incorrect user name or password.</faultstring>\
                 </soap:Fault>";
    let transport = MockTransport::new().script(
        HOST,
        vec![
            Ok(ok_with_cookie("<hello/>")),
            Ok(ok_response("<handshake/>")),
            Ok(status_response(500, fault)),
        ],
    );
    let ctx = context(transport, MockProbe::answering(&[HOST]));

    let outcome = controller().run(&ctx).await;

    let failure = outcome.result.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Credential);
    assert!(failure.detail.contains("incorrect user name"));
    assert_eq!(outcome.reached, ControllerState::Greeted);
    assert_eq!(ctx.transport.sent().len(), 3);
}

#[tokio::test]
async fn test_vm_session_login_fault_with_success_status_is_still_rejected() {
    let fault = "<soap:Fault><faultstring>Permission to perform this operation was denied.</faultstring></soap:Fault>";
    let transport = MockTransport::new().script(
        HOST,
        vec![
            Ok(ok_with_cookie("<hello/>")),
            Ok(ok_response("<handshake/>")),
            Ok(ok_response(fault)),
        ],
    );
    let ctx = context(transport, MockProbe::answering(&[HOST]));

    let failure = controller().run(&ctx).await.result.unwrap_err();

    assert_eq!(failure.kind, FailureKind::Credential);
    assert!(failure.detail.contains("Permission to perform"));
}

#[tokio::test]
async fn test_vm_session_server_error_without_fault_is_transport_failure() {
    let transport = MockTransport::new().script(
        HOST,
        vec![Ok(TransportResponse {
            cookie: ok_with_cookie("").cookie,
            ..status_response(503, "<html>busy</html>")
        })],
    );
    let ctx = context(transport, MockProbe::answering(&[HOST]));

    let outcome = controller().run(&ctx).await;

    let failure = outcome.result.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Transport);
    assert!(failure.detail.contains("HTTP 503"), "detail: {}", failure.detail);
    assert_eq!(outcome.reached, ControllerState::Idle);
    assert_eq!(ctx.transport.sent().len(), 1);
}

#[tokio::test]
async fn test_vm_session_empty_credential_never_decrypts() {
    let mut record = vm_record(0, HOST);
    record.credential.clear();
    let controller = ShutdownController::for_record(record).unwrap();
    let ctx = context(MockTransport::new(), MockProbe::answering(&[HOST]));

    let outcome = controller.run(&ctx).await;

    let failure = outcome.result.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Credential);
    assert_eq!(ctx.vault.decrypts(), 0);
    // Hello and HandShake went out; the login envelope was never built.
    assert_eq!(ctx.transport.sent().len(), 2);
}

#[tokio::test]
async fn test_vm_session_decrypt_failure_does_not_send_login() {
    let ctx = context_with(
        MockTransport::new(),
        MockProbe::answering(&[HOST]),
        MockVault::failing(),
        ReachabilityPolicy::Advisory,
    );

    let outcome = controller().run(&ctx).await;

    assert_eq!(outcome.result.unwrap_err().kind, FailureKind::Credential);
    assert_eq!(ctx.transport.sent().len(), 2);
}

#[tokio::test]
async fn test_vm_session_fail_fast_skips_unreachable_host() {
    let ctx = context_with(
        MockTransport::new(),
        MockProbe::default(),
        MockVault::default(),
        ReachabilityPolicy::FailFast,
    );

    let outcome = controller().run(&ctx).await;

    assert_eq!(outcome.result.unwrap_err().kind, FailureKind::Unreachable);
    assert_eq!(outcome.reachability.attempts, 3);
    assert!(ctx.transport.sent().is_empty());
}

#[tokio::test]
async fn test_vm_session_advisory_precheck_still_attempts_shutdown() {
    let ctx = context(MockTransport::new(), MockProbe::default());

    let outcome = controller().run(&ctx).await;

    assert!(!outcome.reachability.reachable);
    assert!(outcome.is_success());
    assert_eq!(ctx.transport.sent().len(), 4);
}

#[tokio::test]
async fn test_vm_session_status_error_reports_state_reached() {
    let transport = MockTransport::new().script(
        HOST,
        vec![
            Ok(ok_with_cookie("<hello/>")),
            Ok(ok_response("<handshake/>")),
            Ok(ok_response("<session/>")),
            Err(TransportError::Status {
                url: "https://esxi.lan:443/sdk".into(),
                status: 500,
            }),
        ],
    );
    let ctx = context(transport, MockProbe::answering(&[HOST]));

    let outcome = controller().run(&ctx).await;

    assert_eq!(outcome.result.unwrap_err().kind, FailureKind::Transport);
    assert_eq!(outcome.reached, ControllerState::Authenticated);
}

#[tokio::test]
async fn test_vm_session_emits_step_and_outcome_events() {
    let ctx = context(MockTransport::new(), MockProbe::answering(&[HOST]));

    controller().run(&ctx).await;

    let events = ctx.events.events();
    let completed: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ShutdownEvent::StepCompleted { step, .. } => Some(*step),
            _ => None,
        })
        .collect();
    assert_eq!(completed, ["Hello", "HandShake", "Login", "Shutdown"]);
    assert!(matches!(events.first(), Some(ShutdownEvent::PrecheckStarted { .. })));
    assert!(matches!(
        events.last(),
        Some(ShutdownEvent::ShutdownExecuted { .. })
    ));
    assert_eq!(ctx.events.executed(), [HOST]);
}

#[tokio::test]
async fn test_vm_session_repeated_runs_restart_operation_ids() {
    let controller = controller();
    let ctx = context(MockTransport::new(), MockProbe::answering(&[HOST]));

    controller.run(&ctx).await;
    controller.run(&ctx).await;

    let sent = ctx.transport.sent();
    assert_eq!(sent.len(), 8);
    assert!(sent[4].1.as_deref().unwrap().contains("AC1CF80C-00000001"));
}
