//! Workspace integration tests.
//!
//! Full orchestration flows — login, manifest translation, job polling,
//! archive packing, session renewal — exercised against a mock SOAP server.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use forcepack::client::{Credentials, GatewayConfig, Session, SessionGateway, SoapTransport};
use forcepack::manifest::Manifest;
use forcepack::metadata::{archive, DeployOptions, MetadataApi, PollConfig};
use forcepack::partner::PartnerApi;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn soap_body(inner: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>{inner}</soapenv:Body>
</soapenv:Envelope>"#
    )
}

fn login_body(base: &str) -> String {
    soap_body(&format!(
        r#"<loginResponse><result>
            <metadataServerUrl>{base}/services/Soap/m/62.0</metadataServerUrl>
            <serverUrl>{base}/services/Soap/u/62.0</serverUrl>
            <sessionId>SESSION_ONE</sessionId>
        </result></loginResponse>"#
    ))
}

const SESSION_FAULT: &str = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <soapenv:Fault>
      <faultcode>sf:INVALID_SESSION_ID</faultcode>
      <faultstring>INVALID_SESSION_ID: Invalid Session ID found in SessionHeader</faultstring>
    </soapenv:Fault>
  </soapenv:Body>
</soapenv:Envelope>"#;

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/services/Soap/u/62.0"))
        .and(body_string_contains("<login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_body(&server.uri())))
        .mount(server)
        .await;
}

fn fresh_gateway(server: &MockServer) -> Arc<SessionGateway<SoapTransport>> {
    Arc::new(
        SessionGateway::new(
            SoapTransport::new().unwrap(),
            Credentials::new("ci@example.com", "pw").with_security_token("tok"),
            GatewayConfig::default().with_login_url(server.uri()),
        )
        .unwrap(),
    )
}

fn fast_poll() -> PollConfig {
    PollConfig::default()
        .with_interval(Duration::from_millis(1))
        .with_timeout(Some(Duration::from_secs(5)))
}

#[tokio::test]
async fn retrieve_round_trip_through_login_polling_and_archive() {
    init_tracing();
    let server = MockServer::start().await;
    mount_login(&server).await;

    // A local source tree, described by a manifest built from its paths.
    let source = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(source.path().join("classes")).unwrap();
    std::fs::write(
        source.path().join("classes/Invoicing.cls"),
        "public class Invoicing {}",
    )
    .unwrap();
    std::fs::write(
        source.path().join("classes/Invoicing.cls-meta.xml"),
        "<ApexClass/>",
    )
    .unwrap();

    let mut manifest = Manifest::new("62.0");
    manifest.add_from_paths(["classes/Invoicing.cls"]).unwrap();
    let files = manifest.archive_file_list().unwrap();
    assert_eq!(
        files,
        vec!["classes/Invoicing.cls", "classes/Invoicing.cls-meta.xml"]
    );

    // The blob the server will hand back for this retrieve.
    let blob = archive::make_zip(source.path(), &files).unwrap();

    Mock::given(method("POST"))
        .and(path("/services/Soap/m/62.0"))
        .and(body_string_contains("<retrieveRequest>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_body(
            r#"<retrieveResponse><result><done>false</done><id>09S0000000AAAAA</id><state>Queued</state></result></retrieveResponse>"#,
        )))
        .mount(&server)
        .await;

    let checks = AtomicU32::new(0);
    let blob_for_mock = blob.clone();
    Mock::given(method("POST"))
        .and(path("/services/Soap/m/62.0"))
        .and(body_string_contains("<checkRetrieveStatus"))
        .respond_with(move |_: &Request| {
            let body = if checks.fetch_add(1, Ordering::SeqCst) == 0 {
                soap_body(
                    r#"<checkRetrieveStatusResponse><result><done>false</done><id>09S0000000AAAAA</id><status>InProgress</status><success>false</success></result></checkRetrieveStatusResponse>"#,
                )
            } else {
                soap_body(&format!(
                    r#"<checkRetrieveStatusResponse><result><done>true</done><id>09S0000000AAAAA</id><status>Succeeded</status><success>true</success><zipFile>{blob_for_mock}</zipFile></result></checkRetrieveStatusResponse>"#,
                ))
            };
            ResponseTemplate::new(200).set_body_string(body)
        })
        .mount(&server)
        .await;

    let api = MetadataApi::new(fresh_gateway(&server)).with_poll_config(fast_poll());
    let result = api.retrieve(&manifest).await.unwrap();

    // Unpack what came back and compare with the source tree.
    let dest = tempfile::tempdir().unwrap();
    let written = archive::unzip(dest.path(), result.zip_file.as_deref().unwrap(), None).unwrap();
    assert_eq!(written, 2);
    assert_eq!(
        std::fs::read_to_string(dest.path().join("classes/Invoicing.cls")).unwrap(),
        "public class Invoicing {}"
    );

    // Lazy login, one submit, two status checks.
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn deploy_recovers_from_expired_session() {
    init_tracing();
    let server = MockServer::start().await;
    mount_login(&server).await;

    // The deploy is rejected while the envelope still carries the expired
    // token; the retry with the renewed one goes through.
    Mock::given(method("POST"))
        .and(path("/services/Soap/m/62.0"))
        .and(body_string_contains("<deploy "))
        .respond_with(|request: &Request| {
            if String::from_utf8_lossy(&request.body).contains("EXPIRED_TOKEN") {
                ResponseTemplate::new(500).set_body_string(SESSION_FAULT)
            } else {
                ResponseTemplate::new(200).set_body_string(soap_body(
                    r#"<deployResponse><result><done>false</done><id>0Af0000000BBBBB</id></result></deployResponse>"#,
                ))
            }
        })
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/services/Soap/m/62.0"))
        .and(body_string_contains("<checkDeployStatus"))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_body(
            r#"<checkDeployStatusResponse><result><done>true</done><id>0Af0000000BBBBB</id><numberComponentsDeployed>1</numberComponentsDeployed><numberComponentsTotal>1</numberComponentsTotal><status>Succeeded</status><success>true</success></result></checkDeployStatusResponse>"#,
        )))
        .mount(&server)
        .await;

    let base = server.uri();
    let gateway = Arc::new(
        SessionGateway::with_session(
            SoapTransport::new().unwrap(),
            Credentials::new("ci@example.com", "pw"),
            GatewayConfig::default().with_login_url(server.uri()),
            Session::from_parts(
                "EXPIRED_TOKEN",
                format!("{base}/services/Soap/u/62.0"),
                format!("{base}/services/Soap/m/62.0"),
            ),
        )
        .unwrap(),
    );

    let api = MetadataApi::new(gateway).with_poll_config(fast_poll());
    let result = api
        .deploy(b"PK fake zip bytes", &DeployOptions::default())
        .await
        .unwrap();

    assert_eq!(result.id, "0Af0000000BBBBB");
    assert!(result.success);
    // Failed deploy, login, retried deploy, one status check.
    assert_eq!(server.received_requests().await.unwrap().len(), 4);

    // The validated deploy id can be promoted.
    Mock::given(method("POST"))
        .and(body_string_contains("<deployRecentValidation"))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_body(
            r#"<deployRecentValidationResponse><result>0Af0000000CCCCC</result></deployRecentValidationResponse>"#,
        )))
        .mount(&server)
        .await;
    let quick_id = api.deploy_recent_validation(&result.id).await.unwrap();
    assert_eq!(quick_id, "0Af0000000CCCCC");
}

#[tokio::test]
async fn partner_queries_share_one_login() {
    init_tracing();
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/services/Soap/u/62.0"))
        .and(body_string_contains("<queryString>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_body(
            r#"<queryResponse><result>
                <done>true</done>
                <records xsi:type="sf:sObject"><sf:type>Account</sf:type><sf:Id>001A</sf:Id><sf:Name>Acme</sf:Name></records>
                <size>1</size>
            </result></queryResponse>"#,
        )))
        .mount(&server)
        .await;

    let partner = PartnerApi::new(fresh_gateway(&server));
    let first = partner.query_all("SELECT Id, Name FROM Account").await.unwrap();
    let second = partner.query_all("SELECT Id, Name FROM Account").await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].fields["Name"], "Acme");
    assert_eq!(second.len(), 1);

    // One login serves both queries.
    let requests = server.received_requests().await.unwrap();
    let logins = requests
        .iter()
        .filter(|r| String::from_utf8_lossy(&r.body).contains("<login"))
        .count();
    assert_eq!(logins, 1);
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn deploy_blob_round_trips_through_base64() {
    // The deploy envelope carries the zip base64-encoded; confirm the raw
    // bytes survive the encoding the orchestrator applies.
    init_tracing();
    let server = MockServer::start().await;
    mount_login(&server).await;

    let payload: &[u8] = b"PK\x03\x04 not a real archive";
    let expected = general_purpose::STANDARD.encode(payload);

    Mock::given(method("POST"))
        .and(body_string_contains("<deploy "))
        .and(body_string_contains(&expected))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_body(
            r#"<deployResponse><result><id>0Af0000000DDDDD</id></result></deployResponse>"#,
        )))
        .mount(&server)
        .await;

    let api = MetadataApi::new(fresh_gateway(&server)).with_poll_config(fast_poll());
    let id = api
        .start_deploy(payload, &DeployOptions::default())
        .await
        .unwrap();
    assert_eq!(id, "0Af0000000DDDDD");
}
