//! Login / logout round trip against a mock identity service.

use blenderid_core::{Config, HttpAuthClient, ProfileStore, SessionController};
use mockito::{Matcher, Server, ServerGuard};
use tempfile::TempDir;

const IDENTIFY_OK: &str =
    r#"{"status": "success", "data": {"user_id": 42, "oauth_token": {"access_token": "abc"}}}"#;

fn controller(server: &ServerGuard, dir: &TempDir) -> SessionController<HttpAuthClient> {
    let config = Config::new(server.url(), dir.path().join("blender_id").join("profiles.json"));
    let client = HttpAuthClient::new(&config).expect("Failed to build client");
    SessionController::init(client, ProfileStore::new(config.profiles_path.clone()))
        .expect("Failed to open profile store")
}

fn login_alice(server: &mut ServerGuard, controller: &mut SessionController<HttpAuthClient>) {
    let identify = server
        .mock("POST", "/u/identify")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("username".into(), "alice".into()),
            Matcher::UrlEncoded("password".into(), "pw".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(IDENTIFY_OK)
        .create();

    let mut password = String::from("pw");
    let outcome = controller.login("alice", &mut password).unwrap();

    identify.assert();
    assert!(outcome.is_ok(), "login failed: {:?}", outcome);
    assert!(password.is_empty());
}

#[test]
fn test_login_then_logout() {
    let mut server = Server::new();
    let dir = TempDir::new().unwrap();
    let mut controller = controller(&server, &dir);

    login_alice(&mut server, &mut controller);

    let active = controller.store().get_active_profile().unwrap().unwrap();
    assert_eq!(active.user_id, "42");
    assert_eq!(active.username, "alice");
    assert_eq!(active.token, "abc");

    let revoke = server
        .mock("POST", "/u/delete_token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("user_id".into(), "42".into()),
            Matcher::UrlEncoded("token".into(), "abc".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"status": "success"}"#)
        .create();

    controller.logout().unwrap();

    revoke.assert();
    assert!(!controller.is_logged_in());
    assert!(controller.store().get_active_profile().unwrap().is_none());
    assert!(controller.store().get_profile("42").unwrap().is_none());
}

#[test]
fn test_logout_when_revoke_fails() {
    let mut server = Server::new();
    let dir = TempDir::new().unwrap();
    let mut controller = controller(&server, &dir);

    login_alice(&mut server, &mut controller);

    let _revoke = server
        .mock("POST", "/u/delete_token")
        .with_status(500)
        .create();

    controller.logout().unwrap();

    assert!(!controller.is_logged_in());
    assert!(controller.store().get_active_profile().unwrap().is_none());
    assert!(controller.store().get_profile("42").unwrap().is_none());
}

#[test]
fn test_session_survives_restart() {
    let mut server = Server::new();
    let dir = TempDir::new().unwrap();

    {
        let mut first = controller(&server, &dir);
        login_alice(&mut server, &mut first);
    }

    let restarted = controller(&server, &dir);
    assert!(restarted.is_logged_in());
    assert_eq!(restarted.current_username(), Some("alice"));
    assert_eq!(restarted.session().unique_id, "42");
}

#[test]
fn test_failed_login_keeps_store_empty() {
    let mut server = Server::new();
    let dir = TempDir::new().unwrap();
    let mut controller = controller(&server, &dir);

    let _identify = server
        .mock("POST", "/u/identify")
        .with_status(200)
        .with_body(r#"{"status": "fail", "data": {"username": "unknown"}}"#)
        .create();

    let outcome = controller.login("mallory", &mut String::from("pw")).unwrap();

    assert_eq!(outcome.error_message(), Some("Username does not exist"));
    assert!(!controller.is_logged_in());
    let document = controller.store().load().unwrap();
    assert!(document.profiles.is_empty());
    assert_eq!(document.active_profile, None);
}
