use salus_it500::{MessageLogMode, SalusClient};
use serde_json::{Value, json};
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn log_records_exchanges_without_secrets() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/public/login.php"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/public/control.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<input type="hidden" id="token" value="very-secret-token">"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/public/ajax_device_values.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"current_tempZ1": "20.0"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/includes/set.php"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let tmp = NamedTempFile::new().unwrap();
    let log_path = tmp.path().to_str().unwrap().to_string();

    let mut client = SalusClient::builder("me@example.com", "hunter2", "STA1")
        .base_url(server.uri())
        .message_log(MessageLogMode::Diffed, &log_path)
        .build()
        .unwrap();
    client.read().await.unwrap();
    client.read().await.unwrap();
    client.set_temperature(21.5).await.unwrap();

    let contents = std::fs::read_to_string(&log_path).unwrap();
    assert!(!contents.contains("hunter2"));
    assert!(!contents.contains("very-secret-token"));

    let lines: Vec<Value> = contents
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let dirs: Vec<&str> = lines.iter().map(|l| l["dir"].as_str().unwrap()).collect();
    assert_eq!(dirs, vec!["login", "token", "read", "read", "cmd"]);
    assert_eq!(lines[2]["full"], true);
    assert_eq!(lines[3]["changes"].as_array().unwrap().len(), 0);
    assert_eq!(lines[4]["fields"]["current_tempZ1"], "21.5");
    assert_eq!(lines[4]["status"], 200);
}
