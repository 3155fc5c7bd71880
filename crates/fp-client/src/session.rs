//! Session ownership and the invoke gateway.
//!
//! [`SessionGateway`] is the single place that knows about session tokens.
//! Callers hand it an operation body; it wraps the body in a SOAP envelope
//! with the current `SessionHeader`, dispatches it over the [`Transport`],
//! and — when the server reports the token invalid — re-authenticates
//! exactly once and retries the identical call before surfacing anything.
//!
//! The stored session sits behind a `tokio::sync::Mutex` so that concurrent
//! invokers cannot clobber each other's freshly obtained token.

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use url::Url;

use crate::credentials::Credentials;
use crate::error::{Error, ErrorKind, Result};
use crate::transport::{SoapRequest, Transport};
use crate::xml;

/// Which SOAP API surface an operation belongs to.
///
/// The surfaces share one session but live on different endpoints and
/// namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapApi {
    /// Partner API: `login`, `query`, record CRUD.
    Partner,
    /// Metadata API: `retrieve`, `deploy`, `listMetadata`, ...
    Metadata,
    /// Apex API: `executeAnonymous`.
    Apex,
}

impl SoapApi {
    /// XML namespace of the operation elements for this surface.
    pub fn namespace(self) -> &'static str {
        match self {
            SoapApi::Partner => "urn:partner.soap.sforce.com",
            SoapApi::Metadata => "http://soap.sforce.com/2006/04/metadata",
            SoapApi::Apex => "http://soap.sforce.com/2006/08/apex",
        }
    }
}

/// An authenticated session: endpoints plus the token.
///
/// Obtained from `login` and owned by the gateway; the token is redacted
/// from Debug output.
#[derive(Clone)]
pub struct Session {
    session_id: String,
    server_url: String,
    metadata_url: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &"[REDACTED]")
            .field("server_url", &self.server_url)
            .field("metadata_url", &self.metadata_url)
            .finish()
    }
}

impl Session {
    /// Build a session from parts, e.g. a token obtained out of band.
    pub fn from_parts(
        session_id: impl Into<String>,
        server_url: impl Into<String>,
        metadata_url: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            server_url: server_url.into(),
            metadata_url: metadata_url.into(),
        }
    }

    fn endpoint(&self, api: SoapApi) -> String {
        match api {
            SoapApi::Partner => self.server_url.clone(),
            SoapApi::Metadata => self.metadata_url.clone(),
            // The Apex endpoint is not in the login response; it differs
            // from the Partner one only in the path segment.
            SoapApi::Apex => self.server_url.replace("/Soap/u/", "/Soap/s/"),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Login host, e.g. [`crate::PRODUCTION_LOGIN_URL`].
    pub login_url: String,
    /// API version used for endpoints, e.g. `"62.0"`.
    pub api_version: String,
    /// Substrings of fault codes/strings that signal an expired session.
    ///
    /// The vendor's fault taxonomy is not fully enumerated, so the policy
    /// is configurable rather than a hardcoded match.
    pub session_expiry_codes: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            login_url: crate::PRODUCTION_LOGIN_URL.to_string(),
            api_version: crate::DEFAULT_API_VERSION.to_string(),
            session_expiry_codes: vec!["INVALID_SESSION_ID".to_string()],
        }
    }
}

impl GatewayConfig {
    pub fn with_login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = url.into();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_session_expiry_codes(mut self, codes: Vec<String>) -> Self {
        self.session_expiry_codes = codes;
        self
    }
}

/// Owns the session and performs all remote calls.
#[derive(Debug)]
pub struct SessionGateway<T> {
    transport: T,
    credentials: Credentials,
    config: GatewayConfig,
    session: Mutex<Option<Session>>,
}

impl<T: Transport> SessionGateway<T> {
    /// Create a gateway that will log in lazily on the first invoke.
    pub fn new(transport: T, credentials: Credentials, config: GatewayConfig) -> Result<Self> {
        Url::parse(&config.login_url).map_err(|e| {
            Error::with_source(
                ErrorKind::Config(format!("invalid login URL {:?}", config.login_url)),
                e,
            )
        })?;
        Ok(Self {
            transport,
            credentials,
            config,
            session: Mutex::new(None),
        })
    }

    /// Create a gateway with an already-established session.
    ///
    /// The session is still replaced through the normal renewal path if the
    /// server rejects it.
    pub fn with_session(
        transport: T,
        credentials: Credentials,
        config: GatewayConfig,
        session: Session,
    ) -> Result<Self> {
        let mut gateway = Self::new(transport, credentials, config)?;
        gateway.session = Mutex::new(Some(session));
        Ok(gateway)
    }

    pub fn api_version(&self) -> &str {
        &self.config.api_version
    }

    /// Invoke a named operation.
    ///
    /// `body` is the operation element (with its namespace declaration);
    /// the gateway supplies the envelope and `SessionHeader`. On an
    /// invalid-session fault the gateway re-authenticates once and retries
    /// the identical call; a session fault on the retry surfaces as
    /// [`ErrorKind::SessionRetryExhausted`], any other fault as
    /// [`ErrorKind::OperationFault`].
    #[instrument(skip(self, body), fields(api = ?api))]
    pub async fn invoke(&self, api: SoapApi, operation: &str, body: &str) -> Result<String> {
        let session = self.current_session().await?;
        match self.dispatch(&session, api, operation, body).await {
            Err(err) if self.is_expired_session(&err) => {
                info!(operation, "session rejected by server, re-authenticating once");
                let fresh = self.renew_session(&session).await?;
                self.dispatch(&fresh, api, operation, body)
                    .await
                    .map_err(|retry_err| {
                        if self.is_expired_session(&retry_err) {
                            match retry_err.kind {
                                ErrorKind::OperationFault { operation, fault } => Error::new(
                                    ErrorKind::SessionRetryExhausted { operation, fault },
                                ),
                                kind => Error { kind, source: retry_err.source },
                            }
                        } else {
                            retry_err
                        }
                    })
            }
            other => other,
        }
    }

    async fn dispatch(
        &self,
        session: &Session,
        api: SoapApi,
        operation: &str,
        body: &str,
    ) -> Result<String> {
        let envelope = build_envelope(api, &session.session_id, body);
        let endpoint = session.endpoint(api);
        let response = self
            .transport
            .call(SoapRequest {
                endpoint: &endpoint,
                action: operation,
                envelope: &envelope,
            })
            .await?;

        match response.fault {
            Some(fault) => Err(Error::new(ErrorKind::OperationFault {
                operation: operation.to_string(),
                fault,
            })),
            None => Ok(response.body),
        }
    }

    fn is_expired_session(&self, err: &Error) -> bool {
        match err.fault() {
            Some(fault) => self.config.session_expiry_codes.iter().any(|code| {
                fault.fault_code.contains(code) || fault.fault_string.contains(code)
            }),
            None => false,
        }
    }

    /// The current session, logging in first if none is established.
    async fn current_session(&self) -> Result<Session> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }
        let session = self.login().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Replace a stale session, unless another invoker already has.
    async fn renew_session(&self, stale: &Session) -> Result<Session> {
        let mut guard = self.session.lock().await;
        if let Some(current) = guard.as_ref() {
            if current.session_id != stale.session_id {
                debug!("session already renewed by a concurrent invoker");
                return Ok(current.clone());
            }
        }
        let fresh = self.login().await?;
        *guard = Some(fresh.clone());
        Ok(fresh)
    }

    #[instrument(skip(self))]
    async fn login(&self) -> Result<Session> {
        let endpoint = format!(
            "{}/services/Soap/u/{}",
            self.config.login_url.trim_end_matches('/'),
            self.config.api_version
        );
        let envelope = build_login_envelope(
            self.credentials.username(),
            &self.credentials.login_password(),
        );

        let response = self
            .transport
            .call(SoapRequest {
                endpoint: &endpoint,
                action: "login",
                envelope: &envelope,
            })
            .await?;

        if let Some(fault) = response.fault {
            return Err(Error::new(ErrorKind::LoginFailed(fault.to_string())));
        }

        let session_id = xml::extract_tag(&response.body, "sessionId").ok_or_else(|| {
            Error::new(ErrorKind::InvalidResponse(
                "No sessionId in login response".to_string(),
            ))
        })?;
        let server_url = xml::extract_tag(&response.body, "serverUrl").ok_or_else(|| {
            Error::new(ErrorKind::InvalidResponse(
                "No serverUrl in login response".to_string(),
            ))
        })?;
        let metadata_url =
            xml::extract_tag(&response.body, "metadataServerUrl").ok_or_else(|| {
                Error::new(ErrorKind::InvalidResponse(
                    "No metadataServerUrl in login response".to_string(),
                ))
            })?;

        info!(username = self.credentials.username(), "logged in");
        Ok(Session {
            session_id,
            server_url,
            metadata_url,
        })
    }
}

fn build_envelope(api: SoapApi, session_id: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <soapenv:Header>
    <SessionHeader xmlns="{namespace}">
      <sessionId>{session_id}</sessionId>
    </SessionHeader>
  </soapenv:Header>
  <soapenv:Body>
    {body}
  </soapenv:Body>
</soapenv:Envelope>"#,
        namespace = api.namespace(),
        session_id = xml::escape(session_id),
        body = body,
    )
}

fn build_login_envelope(username: &str, password: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <login xmlns="urn:partner.soap.sforce.com">
      <username>{username}</username>
      <password>{password}</password>
    </login>
  </soapenv:Body>
</soapenv:Envelope>"#,
        username = xml::escape(username),
        password = xml::escape(password),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{SoapFault, SoapResponse};
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// Transport that replays a fixed script and records every call.
    struct ScriptedTransport {
        script: StdMutex<VecDeque<SoapResponse>>,
        calls: StdMutex<Vec<(String, String)>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<SoapResponse>) -> Self {
            Self {
                script: StdMutex::new(script.into()),
                calls: StdMutex::new(Vec::new()),
            }
        }

        fn actions(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(action, _)| action.clone())
                .collect()
        }

        fn envelopes(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(_, envelope)| envelope.clone())
                .collect()
        }
    }

    impl Transport for &ScriptedTransport {
        async fn call(&self, request: SoapRequest<'_>) -> Result<SoapResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((request.action.to_string(), request.envelope.to_string()));
            Ok(self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted"))
        }
    }

    fn ok(body: &str) -> SoapResponse {
        SoapResponse {
            body: body.to_string(),
            fault: None,
        }
    }

    fn fault(code: &str, string: &str) -> SoapResponse {
        SoapResponse {
            body: String::new(),
            fault: Some(SoapFault {
                fault_code: code.to_string(),
                fault_string: string.to_string(),
            }),
        }
    }

    fn login_response() -> SoapResponse {
        ok(r#"<loginResponse><result>
            <metadataServerUrl>https://na1.salesforce.com/services/Soap/m/62.0/00D</metadataServerUrl>
            <serverUrl>https://na1.salesforce.com/services/Soap/u/62.0/00D</serverUrl>
            <sessionId>FRESH_TOKEN</sessionId>
        </result></loginResponse>"#)
    }

    fn preset_session() -> Session {
        Session::from_parts(
            "STALE_TOKEN",
            "https://na1.salesforce.com/services/Soap/u/62.0/00D",
            "https://na1.salesforce.com/services/Soap/m/62.0/00D",
        )
    }

    fn gateway(transport: &ScriptedTransport) -> SessionGateway<&ScriptedTransport> {
        SessionGateway::with_session(
            transport,
            Credentials::new("user@example.com", "pw"),
            GatewayConfig::default(),
            preset_session(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_invoke_success_passes_body_through() {
        let transport = ScriptedTransport::new(vec![ok("<retrieveResponse><result><id>09S</id></result></retrieveResponse>")]);
        let gateway = gateway(&transport);

        let body = gateway
            .invoke(SoapApi::Metadata, "retrieve", "<retrieve/>")
            .await
            .unwrap();

        assert!(body.contains("09S"));
        assert_eq!(transport.actions(), vec!["retrieve"]);
    }

    #[tokio::test]
    async fn test_expired_session_triggers_exactly_one_relogin_and_retry() {
        let transport = ScriptedTransport::new(vec![
            fault("sf:INVALID_SESSION_ID", "Invalid Session ID"),
            login_response(),
            ok("<listMetadataResponse><result><fullName>Foo</fullName></result></listMetadataResponse>"),
        ]);
        let gateway = gateway(&transport);

        let body = gateway
            .invoke(SoapApi::Metadata, "listMetadata", "<listMetadata/>")
            .await
            .unwrap();

        assert!(body.contains("Foo"));
        assert_eq!(transport.actions(), vec!["listMetadata", "login", "listMetadata"]);
        // The retried call must carry the fresh token.
        let envelopes = transport.envelopes();
        assert!(envelopes[0].contains("STALE_TOKEN"));
        assert!(envelopes[2].contains("FRESH_TOKEN"));
    }

    #[tokio::test]
    async fn test_non_session_fault_is_not_retried() {
        let transport = ScriptedTransport::new(vec![fault(
            "sf:INSUFFICIENT_ACCESS",
            "insufficient access rights",
        )]);
        let gateway = gateway(&transport);

        let err = gateway
            .invoke(SoapApi::Metadata, "deploy", "<deploy/>")
            .await
            .unwrap_err();

        match err.kind {
            ErrorKind::OperationFault { operation, fault } => {
                assert_eq!(operation, "deploy");
                assert_eq!(fault.fault_code, "sf:INSUFFICIENT_ACCESS");
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
        assert_eq!(transport.actions(), vec!["deploy"]);
    }

    #[tokio::test]
    async fn test_second_session_fault_exhausts_retry() {
        let transport = ScriptedTransport::new(vec![
            fault("sf:INVALID_SESSION_ID", "Invalid Session ID"),
            login_response(),
            fault("sf:INVALID_SESSION_ID", "Invalid Session ID"),
        ]);
        let gateway = gateway(&transport);

        let err = gateway
            .invoke(SoapApi::Partner, "query", "<query/>")
            .await
            .unwrap_err();

        assert!(matches!(err.kind, ErrorKind::SessionRetryExhausted { .. }));
        assert_eq!(transport.actions(), vec!["query", "login", "query"]);
    }

    #[tokio::test]
    async fn test_lazy_login_on_first_invoke() {
        let transport = ScriptedTransport::new(vec![
            login_response(),
            ok("<queryResponse><result><done>true</done></result></queryResponse>"),
        ]);
        let gateway = SessionGateway::new(
            &transport,
            Credentials::new("user@example.com", "pw"),
            GatewayConfig::default(),
        )
        .unwrap();

        gateway
            .invoke(SoapApi::Partner, "query", "<query/>")
            .await
            .unwrap();

        assert_eq!(transport.actions(), vec!["login", "query"]);
    }

    #[tokio::test]
    async fn test_custom_expiry_codes() {
        let transport = ScriptedTransport::new(vec![
            fault("sf:SESSION_GONE", "session has gone away"),
            login_response(),
            ok("<ok/>"),
        ]);
        let gateway = SessionGateway::with_session(
            &transport,
            Credentials::new("u", "p"),
            GatewayConfig::default().with_session_expiry_codes(vec!["SESSION_GONE".to_string()]),
            preset_session(),
        )
        .unwrap();

        gateway
            .invoke(SoapApi::Partner, "query", "<query/>")
            .await
            .unwrap();
        assert_eq!(transport.actions(), vec!["query", "login", "query"]);
    }

    #[test]
    fn test_invalid_login_url_rejected() {
        let err = SessionGateway::new(
            NullTransport,
            Credentials::new("u", "p"),
            GatewayConfig::default().with_login_url("not a url"),
        )
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Config(_)));
    }

    /// Transport stand-in for tests that never dispatch.
    struct NullTransport;

    impl Transport for NullTransport {
        async fn call(&self, _request: SoapRequest<'_>) -> Result<SoapResponse> {
            unreachable!("no calls expected")
        }
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let session = preset_session();
        let debug = format!("{session:?}");
        assert!(!debug.contains("STALE_TOKEN"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_apex_endpoint_derived_from_partner() {
        let session = preset_session();
        assert_eq!(
            session.endpoint(SoapApi::Apex),
            "https://na1.salesforce.com/services/Soap/s/62.0/00D"
        );
    }
}
