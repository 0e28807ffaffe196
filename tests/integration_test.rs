// Integration tests for the cio binary

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use httpmock::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

const TOKEN: &str = "test-token-1234";

/// A `cio` command pointed at the mock server, isolated from the user's config.
fn cio(server: &MockServer, home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("cio");
    cmd.env("CIO_BASE_URL", server.base_url())
        .env("CUSTOMERIO_API_TOKEN", TOKEN)
        .env("CIO_CONFIG_DIR", home.path().join("config"))
        .env_remove("CIO_REGION")
        .env_remove("CIO_LOG")
        .current_dir(home.path());
    cmd
}

fn home() -> TempDir {
    tempfile::tempdir().unwrap()
}

#[test]
fn test_list_pretty_prints_response() {
    let server = MockServer::start();
    let home = home();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/segments")
            .header("Authorization", format!("Bearer {TOKEN}"));
        then.status(200).body(r#"{"segments":[{"id":1,"name":"vip"}]}"#);
    });

    cio(&server, &home)
        .args(["segments", "ls"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  \"segments\": ["))
        .stdout(predicate::str::contains("\"name\": \"vip\""));

    mock.assert();
}

#[test]
fn test_alias_with_jq_filter() {
    let server = MockServer::start();
    let home = home();
    server.mock(|when, then| {
        when.method(GET).path("/v1/segments");
        then.status(200)
            .body(r#"{"segments":[{"id":1,"name":"vip"},{"id":2,"name":"new"}]}"#);
    });

    cio(&server, &home)
        .args(["segments", "list", "--jq", ".segments[].name"])
        .assert()
        .success()
        .stdout("vip\nnew\n");
}

#[test]
fn test_jq_select_from_global_position() {
    let server = MockServer::start();
    let home = home();
    server.mock(|when, then| {
        when.method(GET).path("/v1/segments/42");
        then.status(200)
            .body(r#"{"segment":{"id":42,"tags":[{"n":1},{"n":5}]}}"#);
    });

    cio(&server, &home)
        .args([
            "--jq",
            "[.segment.tags[] | select(.n > 2) | .n]",
            "segments",
            "get",
            "42",
        ])
        .assert()
        .success()
        .stdout("[\n  5\n]\n");
}

#[test]
fn test_plain_output_is_single_line() {
    let server = MockServer::start();
    let home = home();
    server.mock(|when, then| {
        when.method(GET).path("/v1/info/ip_addresses");
        then.status(200).body("{\n  \"ip_addresses\": [\"1.2.3.4\"]\n}");
    });

    cio(&server, &home)
        .args(["info", "ip-addresses", "--plain"])
        .assert()
        .success()
        .stdout("{\"ip_addresses\":[\"1.2.3.4\"]}\n");
}

#[test]
fn test_jq_with_plain_is_rejected_before_request() {
    let server = MockServer::start();
    let home = home();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/v1/segments");
        then.status(200).body("{}");
    });

    cio(&server, &home)
        .args(["segments", "ls", "--plain", "--jq", ".segments"])
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains(
            "--jq requires JSON output mode (remove --plain or use --json)",
        ));

    cio(&server, &home)
        .args(["segments", "ls", "--plain", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "--json and --plain cannot be used together",
        ));

    mock.assert_hits(0);
}

#[test]
fn test_invalid_jq_writes_nothing_to_stdout() {
    let server = MockServer::start();
    let home = home();
    server.mock(|when, then| {
        when.method(GET).path("/v1/segments");
        then.status(200).body(r#"{"segments":[]}"#);
    });

    cio(&server, &home)
        .args(["segments", "ls", "--jq", "..invalid["])
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("jq parse error"));
}

#[test]
fn test_http_error_reaches_stderr() {
    let server = MockServer::start();
    let home = home();
    server.mock(|when, then| {
        when.method(GET).path("/v1/segments/99");
        then.status(404).body("  segment not found\n");
    });

    cio(&server, &home)
        .args(["segments", "get", "99"])
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("HTTP 404: segment not found"));
}

#[test]
fn test_empty_response_renders_empty_object() {
    let server = MockServer::start();
    let home = home();
    let mock = server.mock(|when, then| {
        when.method(DELETE).path("/v1/segments/7");
        then.status(204);
    });

    cio(&server, &home)
        .args(["segments", "rm", "7"])
        .assert()
        .success()
        .stdout("{}\n");

    mock.assert();
}

#[test]
fn test_required_body_missing_makes_no_request() {
    let server = MockServer::start();
    let home = home();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/segments");
        then.status(200).body("{}");
    });

    cio(&server, &home)
        .args(["segments", "create"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("request body is required"));

    mock.assert_hits(0);
}

#[test]
fn test_body_from_flag_and_stdin() {
    let server = MockServer::start();
    let home = home();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/send/email")
            .header("Content-Type", "application/json")
            .body(r#"{"to":"a@b.com"}"#);
        then.status(200).body(r#"{"delivery_id":"d1"}"#);
    });

    cio(&server, &home)
        .args(["send", "email", "--body", r#"{"to":"a@b.com"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"delivery_id\": \"d1\""));

    cio(&server, &home)
        .args(["send", "email", "--jq", ".delivery_id"])
        .write_stdin(r#"{"to":"a@b.com"}"#)
        .assert()
        .success()
        .stdout("d1\n");

    mock.assert_hits(2);
}

#[test]
fn test_customer_search_by_email_or_body() {
    let server = MockServer::start();
    let home = home();
    let by_email = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/customers")
            .query_param("email", "a@b.com");
        then.status(200).body(r#"{"results":[{"id":"c1"}]}"#);
    });
    let by_filter = server.mock(|when, then| {
        when.method(POST).path("/v1/customers").body(r#"{"filter":{}}"#);
        then.status(200).body(r#"{"identifiers":[]}"#);
    });

    cio(&server, &home)
        .args(["customers", "search", "--email", "a@b.com", "--jq", ".results[0].id"])
        .assert()
        .success()
        .stdout("c1\n");

    cio(&server, &home)
        .args(["customers", "search", "--body", r#"{"filter":{}}"#])
        .assert()
        .success();

    by_email.assert();
    by_filter.assert();
}

#[test]
fn test_get_or_put_switches_on_body() {
    let server = MockServer::start();
    let home = home();
    let get = server.mock(|when, then| {
        when.method(GET).path("/v1/campaigns/1/actions/2/language/en");
        then.status(200).body(r#"{"action":{"language":"en"}}"#);
    });
    let put = server.mock(|when, then| {
        when.method(PUT)
            .path("/v1/campaigns/1/actions/2/language/en")
            .body(r#"{"subject":"Hi"}"#);
        then.status(200).body(r#"{"action":{"subject":"Hi"}}"#);
    });

    cio(&server, &home)
        .args(["campaigns", "translation", "1", "2", "en"])
        .assert()
        .success();

    cio(&server, &home)
        .args(["campaigns", "translation", "1", "2", "en", "--body", r#"{"subject":"Hi"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"subject\": \"Hi\""));

    get.assert();
    put.assert();
}

#[test]
fn test_trigger_defaults_to_empty_object() {
    let server = MockServer::start();
    let home = home();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/campaigns/7/triggers").body("{}");
        then.status(200).body(r#"{"id":1}"#);
    });

    cio(&server, &home)
        .args(["broadcasts", "trigger", "7"])
        .assert()
        .success();

    mock.assert();
}

#[test]
fn test_path_arguments_keep_email_addresses() {
    let server = MockServer::start();
    let home = home();
    let mock = server.mock(|when, then| {
        when.method(PUT).path("/v1/esp_suppression/bad@test.com");
        then.status(200).body("{}");
    });

    cio(&server, &home)
        .args(["esp-suppression", "suppress", "bad@test.com"])
        .assert()
        .success();

    mock.assert();
}

#[test]
fn test_missing_token_is_reported() {
    let server = MockServer::start();
    let home = home();

    cio(&server, &home)
        .env_remove("CUSTOMERIO_API_TOKEN")
        .args(["segments", "ls"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CUSTOMERIO_API_TOKEN"));
}

#[test]
fn test_token_from_configure() {
    let server = MockServer::start();
    let home = home();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/activities")
            .header("Authorization", "Bearer stored-token-5678");
        then.status(200).body(r#"{"activities":[]}"#);
    });

    cio(&server, &home)
        .env_remove("CUSTOMERIO_API_TOKEN")
        .args(["configure", "--token", "stored-token-5678"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved API token to"));

    cio(&server, &home)
        .env_remove("CUSTOMERIO_API_TOKEN")
        .args(["activities", "ls"])
        .assert()
        .success();

    mock.assert();
}

#[test]
fn test_config_show_masks_token_and_maps_region() {
    let server = MockServer::start();
    let home = home();

    cio(&server, &home)
        .env_remove("CIO_BASE_URL")
        .args(["config-show", "--region", "eu"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: https://api-eu.customer.io"))
        .stdout(predicate::str::contains("region: eu"))
        .stdout(predicate::str::contains("token: test...1234"))
        .stdout(predicate::str::contains(TOKEN).not());

    cio(&server, &home)
        .env_remove("CIO_BASE_URL")
        .env("CIO_REGION", "mars")
        .args(["config-show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: https://api.customer.io"));
}

#[test]
fn test_status_reports_authentication() {
    let server = MockServer::start();
    let home = home();
    server.mock(|when, then| {
        when.method(GET).path("/v1/info/ip_addresses");
        then.status(200).body(r#"{"ip_addresses":[]}"#);
    });

    cio(&server, &home)
        .args(["status"])
        .assert()
        .success()
        .stdout("Authenticated (test...1234)\nRegion: us\n");

    cio(&server, &home)
        .args(["status", "--json", "--jq", ".authenticated"])
        .assert()
        .success()
        .stdout("true\n");
}

#[test]
fn test_status_failure_prints_guidance() {
    let server = MockServer::start();
    let home = home();
    server.mock(|when, then| {
        when.method(GET).path("/v1/info/ip_addresses");
        then.status(401).body("unauthorized");
    });

    cio(&server, &home)
        .args(["status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Authentication failed."))
        .stderr(predicate::str::contains("Error: authentication failed"));
}

#[test]
fn test_version_and_completion() {
    let server = MockServer::start();
    let home = home();

    cio(&server, &home)
        .arg("version")
        .assert()
        .success()
        .stdout(format!("cio {}\n", env!("CARGO_PKG_VERSION")));

    cio(&server, &home)
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cio"));
}

#[test]
fn test_get_commands_do_not_accept_body() {
    let server = MockServer::start();
    let home = home();

    cio(&server, &home)
        .args(["segments", "ls", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--body").not());

    cio(&server, &home)
        .args(["segments", "create", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--body"));
}
