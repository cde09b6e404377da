//! End-to-end tests against a wiremock stand-in for the Shine cloud:
//! scraped login page, versioned bundles, login, listing and snapshots.

use base64::prelude::{BASE64_STANDARD, BASE64_URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use rsa::{RsaPrivateKey, pkcs8::EncodePublicKey};
use serde_json::json;
use wiremock::{
    Mock,
    MockServer,
    ResponseTemplate,
    matchers::{body_partial_json, header_exists, method, path},
};

use super::*;
use crate::core::poller::Poller;

fn test_api(server: &MockServer) -> Api {
    Api::new(
        "fox@example.com".to_string(),
        "hunter2".to_string(),
        format!("{}/login", server.uri()),
        server.uri(),
    )
    .unwrap()
}

/// Base64 SPKI body, exactly as the web app embeds it in a bundle.
fn public_key_body(private_key: &RsaPrivateKey) -> String {
    BASE64_STANDARD.encode(private_key.to_public_key().to_public_key_der().unwrap().as_bytes())
}

fn bearer_token(expires_at: i64) -> String {
    let header = BASE64_URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = BASE64_URL_SAFE_NO_PAD.encode(format!(r#"{{"userId":"42","exp":{expires_at}}}"#));
    format!("Bearer_{header}.{payload}.c2lnbmF0dXJl")
}

/// Serve the login page, the main bundle it references, and the login
/// route's lazily loaded chunk carrying the public key.
async fn mount_front_end(server: &MockServer, key_body: &str) {
    let page = r#"<html><head lang="en">
        <script type="module" crossorigin src="/assets/index.a1b2c3.js"></script>
    </head><body><div id="app"></div></body></html>"#;
    let bundle = r#"const Ds=[{path:"/",component:He},
        {path: "/login", component: () => ie(() => import("./Login.js"),
        ["/assets/index.Login.9d8c.js"])}];"#;
    let chunk = format!(
        r#"var qe="decoy";qe="{key_body}";function mt(t){{e.setPublicKey(qe);return t}}"#
    );

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/assets/index.a1b2c3.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string(bundle))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/assets/index.Login.9d8c.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string(chunk))
        .mount(server)
        .await;
}

async fn mount_login(server: &MockServer, expected_calls: u64) {
    let token = bearer_token(Utc::now().timestamp() + 3600);
    Mock::given(method("POST"))
        .and(path("/userlogin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"token": token}})))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_device_list(server: &MockServer, serial_numbers: &[&str]) {
    let devices: Vec<_> = serial_numbers
        .iter()
        .map(|serial_number| json!({"deviceSn": serial_number}))
        .collect();
    Mock::given(method("POST"))
        .and(path("/device/list_device_all_type"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"dataList": devices}})))
        .mount(server)
        .await;
}

async fn mount_snapshot(server: &MockServer, serial_number: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/device/get_device_snapshot"))
        .and(body_partial_json(json!({"deviceSn": serial_number})))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn polls_an_inverter_and_a_battery_end_to_end() {
    let server = MockServer::start().await;
    let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
    mount_front_end(&server, &public_key_body(&private_key)).await;
    mount_login(&server, 1).await;
    mount_device_list(&server, &["INV1", "BAT1"]).await;
    mount_snapshot(
        &server,
        "INV1",
        ResponseTemplate::new(200).set_body_json(json!({
            "data": {"productTypeEnum": "HIGH_FREQUENCY_INVERTER", "pvPower": 1054.0, "emsSoc": 87}
        })),
    )
    .await;
    mount_snapshot(
        &server,
        "BAT1",
        ResponseTemplate::new(200).set_body_json(json!({
            "data": {"productTypeEnum": "LITHIUM_BATTERY_PACK", "battVolt": "51.2", "battSoc": 93}
        })),
    )
    .await;

    let mut poller = Poller::new(test_api(&server));
    let readings = poller.refresh().await.unwrap();

    assert_eq!(readings.len(), 2);
    assert_eq!(readings["INV1"].data.len(), 23);
    assert_eq!(readings["BAT1"].data.len(), 7);
}

#[tokio::test]
async fn login_is_cached_within_the_token_expiry() {
    let server = MockServer::start().await;
    let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
    mount_front_end(&server, &public_key_body(&private_key)).await;
    // The `expect(1)` is the assertion: the second cycle reuses the session.
    mount_login(&server, 1).await;
    mount_device_list(&server, &["INV1"]).await;
    mount_snapshot(
        &server,
        "INV1",
        ResponseTemplate::new(200)
            .set_body_json(json!({"data": {"productTypeEnum": "HIGH_FREQUENCY_INVERTER"}})),
    )
    .await;

    let mut poller = Poller::new(test_api(&server));
    poller.refresh().await.unwrap();
    poller.refresh().await.unwrap();
}

#[tokio::test]
async fn failing_snapshot_only_skips_that_device() {
    let server = MockServer::start().await;
    let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
    mount_front_end(&server, &public_key_body(&private_key)).await;
    mount_login(&server, 1).await;
    mount_device_list(&server, &["INV1", "BAT1"]).await;
    mount_snapshot(
        &server,
        "INV1",
        ResponseTemplate::new(200)
            .set_body_json(json!({"data": {"productTypeEnum": "HIGH_FREQUENCY_INVERTER"}})),
    )
    .await;
    mount_snapshot(&server, "BAT1", ResponseTemplate::new(500)).await;

    let mut poller = Poller::new(test_api(&server));
    let readings = poller.refresh().await.unwrap();

    assert_eq!(readings.keys().collect::<Vec<_>>(), ["INV1"]);
}

#[tokio::test]
async fn missing_token_aborts_the_cycle() {
    let server = MockServer::start().await;
    let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
    mount_front_end(&server, &public_key_body(&private_key)).await;
    Mock::given(method("POST"))
        .and(path("/userlogin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .mount(&server)
        .await;

    let error = Poller::new(test_api(&server)).refresh().await.unwrap_err();
    assert!(matches!(
        error,
        Error::Authentication(AuthenticationError::MissingToken),
    ));
}

#[tokio::test]
async fn stubbed_extractor_bypasses_the_bundle_hunt() {
    struct FixedKey(String);

    impl PublicKeyExtractor for FixedKey {
        fn extract(&self, _corpus: &str) -> Result<String, ExtractionError> {
            Ok(self.0.clone())
        }
    }

    let server = MockServer::start().await;
    let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
    // The referenced bundle 404s: fetch failures are skipped, and the
    // stubbed strategy does not need the corpus anyway.
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><script src="/assets/index.gone.js"></script></head></html>"#,
        ))
        .mount(&server)
        .await;
    mount_login(&server, 1).await;

    let pem = private_key
        .to_public_key()
        .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
        .unwrap();
    let mut api = test_api(&server).with_extractor(Box::new(FixedKey(pem)));
    api.login().await.unwrap();
    assert!(api.session().is_some_and(Session::is_valid));
}

#[tokio::test]
async fn front_end_without_bundle_reference_fails_extraction() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><head></head><body>maintenance</body></html>"),
        )
        .mount(&server)
        .await;

    let mut api = test_api(&server);
    assert!(matches!(
        api.login().await.unwrap_err(),
        Error::Extraction(ExtractionError::MissingScriptReference),
    ));
}
