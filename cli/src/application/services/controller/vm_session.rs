//! VM-session protocol: four SOAP operations against the host's `/sdk`
//! endpoint, the session cookie captured from the first reply.

use crate::application::ports::TransportResponse;
use crate::domain::envelope::soap_fault;
use crate::domain::error::{CredentialError, ShutdownError};
use crate::domain::protocol::{ControllerState, ProtocolStep, RequestMethod, StepBody};
use crate::domain::server::ServerAdminRecord;

pub const SDK_PATH: &str = "/sdk";
pub const CONTENT_TYPE: &str = "text/xml; charset=\"utf-8\"";
pub const SOAP_ACTION: &str = "\"urn:internalvim25/4.1\"";
pub const CLIENT_USER_AGENT: &str = "VMware VI Client/4.0.0";

/// Fixed first half of every operation ID.
const OPERATION_ID_PREFIX: u32 = 0xAC1C_F80C;

const RETRIEVE_SERVICE_CONTENT: &str = r#"
    <RetrieveServiceContent xmlns="urn:internalvim25">
      <_this xsi:type="ManagedObjectReference" type="ServiceInstance" serverGuid="">ServiceInstance</_this>
    </RetrieveServiceContent>"#;

const RETRIEVE_INTERNAL_CONTENT: &str = r#"
    <RetrieveInternalContent xmlns="urn:internalvim25">
      <_this xsi:type="ManagedObjectReference" type="ServiceInstance" serverGuid="">ServiceInstance</_this>
    </RetrieveInternalContent>"#;

const LOGIN: &str = r#"
    <Login xmlns="urn:internalvim25">
      <_this xsi:type="ManagedObjectReference" type="SessionManager" serverGuid="">ha-sessionmgr</_this>
      <userName></userName>
      <password></password>
      <locale>en_US</locale>
    </Login>"#;

const SHUTDOWN_HOST: &str = r#"
    <ShutdownHost_Task xmlns="urn:internalvim25">
      <_this xsi:type="ManagedObjectReference" type="HostSystem" serverGuid="">ha-host</_this>
      <force>true</force>
    </ShutdownHost_Task>"#;

pub const STEP_HELLO: &str = "Hello";
pub const STEP_HANDSHAKE: &str = "HandShake";
pub const STEP_LOGIN: &str = "Login";
pub const STEP_SHUTDOWN: &str = "Shutdown";

/// `<operationID>AC1CF80C-0000000N</operationID>` for the n-th operation.
#[must_use]
pub fn operation_id_header(sequence: u32) -> String {
    format!("<operationID>{OPERATION_ID_PREFIX:08X}-{sequence:08X}</operationID>")
}

#[derive(Debug, Clone)]
pub struct VmSessionController {
    record: ServerAdminRecord,
    steps: Vec<ProtocolStep>,
}

impl VmSessionController {
    /// Bind to `record` and assemble the four operations. Operation IDs are
    /// numbered from 1 per controller.
    #[must_use]
    pub fn new(record: ServerAdminRecord) -> Self {
        let step = |sequence: u32,
                    name: &'static str,
                    body: StepBody,
                    reaches: ControllerState| ProtocolStep {
            name,
            path: SDK_PATH,
            method: RequestMethod::Post,
            content_type: Some(CONTENT_TYPE),
            headers: vec![
                ("User-Agent", CLIENT_USER_AGENT.to_string()),
                ("SOAPAction", SOAP_ACTION.to_string()),
                ("Accept", "text/xml".to_string()),
            ],
            referer_path: None,
            body,
            captures_cookie: sequence == 1,
            reaches,
        };
        let envelope = |sequence: u32, body: &'static str| StepBody::Envelope {
            header: operation_id_header(sequence),
            body,
        };

        let steps = vec![
            step(
                1,
                STEP_HELLO,
                envelope(1, RETRIEVE_SERVICE_CONTENT),
                ControllerState::Greeted,
            ),
            step(
                2,
                STEP_HANDSHAKE,
                envelope(2, RETRIEVE_INTERNAL_CONTENT),
                ControllerState::Greeted,
            ),
            step(
                3,
                STEP_LOGIN,
                StepBody::LoginEnvelope {
                    header: operation_id_header(3),
                    body: LOGIN,
                },
                ControllerState::Authenticated,
            ),
            step(
                4,
                STEP_SHUTDOWN,
                envelope(4, SHUTDOWN_HOST),
                ControllerState::ShutdownIssued,
            ),
        ];
        Self { record, steps }
    }

    #[must_use]
    pub fn record(&self) -> &ServerAdminRecord {
        &self.record
    }

    #[must_use]
    pub fn steps(&self) -> &[ProtocolStep] {
        &self.steps
    }

    /// A SOAP fault in the login reply means the host refused the
    /// credentials, whatever the HTTP status (hosts answer 500). Other
    /// replies are not inspected.
    pub(super) fn inspect(
        &self,
        step: &ProtocolStep,
        response: &TransportResponse,
    ) -> Result<(), ShutdownError> {
        if step.name == STEP_LOGIN
            && let Some(fault) = soap_fault(&response.body)
        {
            return Err(CredentialError::Rejected(fault).into());
        }
        Ok(())
    }
}
