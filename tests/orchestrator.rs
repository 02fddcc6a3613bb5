//! Startup and termination behavior of the endpoint orchestrator.

use std::time::Duration;

use tokio::net::TcpStream;

use porta::config::{BackendConfig, Config, HostConfig};
use porta::lifecycle::{EndpointKind, StartupError};
use porta::net::KeyMaterial;
use porta::Orchestrator;

mod common;

fn plain_config() -> Config {
    let mut config = Config::default();
    config.redirector.listen = Some("127.0.0.1:0".into());
    config.http.listen = Some("127.0.0.1:0".into());
    config
}

fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_tls_bind_failure_aborts_startup() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let cert = common::test_cert("localhost");
    let key = KeyMaterial::load(&cert.cert_path, &cert.key_path).unwrap();

    let mut config = plain_config();
    config.tls.listen = Some(occupied.local_addr().unwrap().to_string());

    let result = Orchestrator::bind(&config, common::single_host("*", "ok"), Some(&key));
    match result {
        Err(StartupError::Bind { endpoint, .. }) => assert_eq!(endpoint, EndpointKind::Tls),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("startup should fail when the TLS port is taken"),
    }
}

#[tokio::test]
async fn test_endpoints_in_start_order() {
    let cert = common::test_cert("localhost");
    let key = KeyMaterial::load(&cert.cert_path, &cert.key_path).unwrap();

    let mut config = plain_config();
    config.tls.listen = Some("127.0.0.1:0".into());

    let orchestrator = Orchestrator::bind(&config, common::single_host("*", "ok"), Some(&key)).unwrap();
    assert_eq!(
        orchestrator.endpoints(),
        vec![EndpointKind::Redirector, EndpointKind::Http, EndpointKind::Tls]
    );
}

#[tokio::test]
async fn test_tls_without_keypair_is_skipped() {
    let mut config = plain_config();
    config.tls.listen = Some("127.0.0.1:0".into());

    let orchestrator = Orchestrator::bind(&config, common::single_host("*", "ok"), None).unwrap();
    assert_eq!(orchestrator.endpoints(), vec![EndpointKind::Redirector, EndpointKind::Http]);
    assert!(orchestrator.local_addr(EndpointKind::Tls).is_none());
}

#[tokio::test]
async fn test_nothing_to_run_is_an_error() {
    let result = Orchestrator::bind(&Config::default(), common::single_host("*", "ok"), None);
    assert!(matches!(result, Err(StartupError::NoEndpoints)));
}

#[tokio::test]
async fn test_missing_key_file_fails_startup() {
    let cert = common::test_cert("localhost");
    let mut config = plain_config();
    config.tls.listen = Some("127.0.0.1:0".into());
    config.tls.cert = Some(cert.cert_path.clone());
    config.tls.key = Some(cert.dir.path().join("missing.pem"));

    assert!(matches!(Orchestrator::from_config(&config), Err(StartupError::Tls(_))));
}

#[tokio::test]
async fn test_first_exit_stops_every_endpoint() {
    let orchestrator = Orchestrator::bind(&plain_config(), common::single_host("*", "ok"), None).unwrap();
    let http_addr = orchestrator.local_addr(EndpointKind::Http).unwrap();
    let redirector_addr = orchestrator.local_addr(EndpointKind::Redirector).unwrap();
    let http = orchestrator.handle(EndpointKind::Http).unwrap();
    let redirector = orchestrator.handle(EndpointKind::Redirector).unwrap();

    let running = tokio::spawn(orchestrator.run());
    http.listening().await.unwrap();
    redirector.listening().await.unwrap();
    assert!(TcpStream::connect(redirector_addr).await.is_ok());

    http.shutdown();
    let exit = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(exit.endpoint, EndpointKind::Http);
    assert!(exit.result.is_ok());

    assert!(TcpStream::connect(redirector_addr).await.is_err());
    assert!(TcpStream::connect(http_addr).await.is_err());
}

#[tokio::test]
async fn test_redirector_and_http_endpoints() {
    let backend = common::start_mock_backend("from upstream").await;

    let mut config = plain_config();
    config.default_host = "fallback.example".into();
    config.hosts.push(HostConfig {
        hostnames: vec!["*.example.com".into()],
        backend: BackendConfig::Proxy {
            upstream: format!("http://{backend}"),
        },
    });

    let orchestrator = Orchestrator::from_config(&config).unwrap();
    let http_addr = orchestrator.local_addr(EndpointKind::Http).unwrap();
    let redirector_addr = orchestrator.local_addr(EndpointKind::Redirector).unwrap();
    let http = orchestrator.handle(EndpointKind::Http).unwrap();
    let redirector = orchestrator.handle(EndpointKind::Redirector).unwrap();
    tokio::spawn(orchestrator.run());
    http.listening().await.unwrap();
    redirector.listening().await.unwrap();

    let client = no_redirect_client();

    let res = client
        .get(format!("http://{redirector_addr}/a/b?c=d"))
        .header("Host", "www.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 301);
    assert_eq!(res.headers()["location"], "https://www.example.com/a/b?c=d");

    let res = client
        .get(format!("http://{http_addr}/"))
        .header("Host", "api.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().get("strict-transport-security").is_none());
    assert_eq!(res.text().await.unwrap(), "from upstream");

    let res = client
        .get(format!("http://{http_addr}/"))
        .header("Host", "example.org")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}
