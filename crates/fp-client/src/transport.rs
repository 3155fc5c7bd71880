//! Wire-level SOAP transport.
//!
//! The rest of the library is agnostic to the wire format: callers hand a
//! [`Transport`] a complete envelope plus the operation name and endpoint,
//! and get back the raw response body with any SOAP fault already separated
//! out. [`SoapTransport`] is the one concrete adapter, speaking SOAP 1.1
//! over HTTP via `reqwest`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, ErrorKind, Result};
use crate::xml;

/// A SOAP fault returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapFault {
    pub fault_code: String,
    pub fault_string: String,
}

impl std::fmt::Display for SoapFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SOAP Fault: {} - {}", self.fault_code, self.fault_string)
    }
}

impl std::error::Error for SoapFault {}

/// One outbound SOAP call.
#[derive(Debug, Clone, Copy)]
pub struct SoapRequest<'a> {
    /// Full endpoint URL, e.g. `https://na1.salesforce.com/services/Soap/m/62.0`.
    pub endpoint: &'a str,
    /// Operation name, sent as the `SOAPAction` header.
    pub action: &'a str,
    /// Complete SOAP envelope.
    pub envelope: &'a str,
}

/// The response to a SOAP call, with any fault pre-parsed.
#[derive(Debug, Clone)]
pub struct SoapResponse {
    /// Raw response body.
    pub body: String,
    /// Present when the body carried a SOAP fault.
    pub fault: Option<SoapFault>,
}

/// Transport over which SOAP calls are made.
///
/// Implementations must distinguish a fault from a result; everything else
/// about the wire format is their business. Swap in a scripted
/// implementation to test session and orchestration logic without a server.
#[allow(async_fn_in_trait)]
pub trait Transport: Send + Sync {
    async fn call(&self, request: SoapRequest<'_>) -> Result<SoapResponse>;
}

/// SOAP 1.1 over HTTP via `reqwest`.
#[derive(Debug, Clone)]
pub struct SoapTransport {
    http: reqwest::Client,
}

impl SoapTransport {
    /// Create a transport with a default HTTP client.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;
        Ok(Self { http })
    }

    /// Use a custom HTTP client (timeouts, proxies, ...).
    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for SoapTransport {
    async fn call(&self, request: SoapRequest<'_>) -> Result<SoapResponse> {
        debug!(
            endpoint = request.endpoint,
            action = request.action,
            "sending SOAP request"
        );

        let response = self
            .http
            .post(request.endpoint)
            .header("Content-Type", "text/xml;charset=UTF-8")
            .header("SOAPAction", request.action)
            .body(request.envelope.to_string())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let fault = parse_fault(&body);

        // Salesforce reports SOAP faults with a 500; only a non-success
        // status without a fault body is a transport-level failure.
        if !status.is_success() && fault.is_none() {
            return Err(Error::new(ErrorKind::Http(format!(
                "status {} from {}",
                status.as_u16(),
                request.endpoint
            ))));
        }

        Ok(SoapResponse { body, fault })
    }
}

/// Parse a SOAP fault from a response body, if one is present.
#[must_use]
pub fn parse_fault(body: &str) -> Option<SoapFault> {
    if !body.contains("faultcode") {
        return None;
    }

    let fault_code = xml::extract_tag(body, "faultcode")?;
    let fault_string =
        xml::extract_tag(body, "faultstring").unwrap_or_else(|| "Unknown error".to_string());

    Some(SoapFault {
        fault_code,
        fault_string,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FAULT_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <soapenv:Fault>
      <faultcode>sf:INVALID_SESSION_ID</faultcode>
      <faultstring>INVALID_SESSION_ID: Invalid Session ID found in SessionHeader</faultstring>
    </soapenv:Fault>
  </soapenv:Body>
</soapenv:Envelope>"#;

    #[test]
    fn test_parse_fault() {
        let fault = parse_fault(FAULT_BODY).unwrap();
        assert_eq!(fault.fault_code, "sf:INVALID_SESSION_ID");
        assert!(fault.fault_string.contains("Invalid Session ID"));
        assert!(parse_fault("<result>ok</result>").is_none());
    }

    #[tokio::test]
    async fn test_successful_call_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("SOAPAction", "retrieve"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<result><id>09S000</id></result>"),
            )
            .mount(&server)
            .await;

        let transport = SoapTransport::new().unwrap();
        let response = transport
            .call(SoapRequest {
                endpoint: &server.uri(),
                action: "retrieve",
                envelope: "<soapenv:Envelope/>",
            })
            .await
            .unwrap();

        assert!(response.fault.is_none());
        assert!(response.body.contains("09S000"));
    }

    #[tokio::test]
    async fn test_fault_with_http_500_is_surfaced_as_fault() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string(FAULT_BODY))
            .mount(&server)
            .await;

        let transport = SoapTransport::new().unwrap();
        let response = transport
            .call(SoapRequest {
                endpoint: &server.uri(),
                action: "deploy",
                envelope: "<soapenv:Envelope/>",
            })
            .await
            .unwrap();

        let fault = response.fault.unwrap();
        assert_eq!(fault.fault_code, "sf:INVALID_SESSION_ID");
    }

    #[tokio::test]
    async fn test_non_soap_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let transport = SoapTransport::new().unwrap();
        let err = transport
            .call(SoapRequest {
                endpoint: &server.uri(),
                action: "query",
                envelope: "<soapenv:Envelope/>",
            })
            .await
            .unwrap_err();

        assert!(matches!(err.kind, ErrorKind::Http(_)));
    }
}
