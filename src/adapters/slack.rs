// ABOUTME: Slack adapter posting native Block Kit payloads through the Web API
// ABOUTME: Validates payload limits, posts messages and uploads attached files into the thread

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

use super::error::{AdapterError, Result};
use super::{DeliveryResponse, MessageAdapter};
use crate::compiler;
use crate::credentials::Credentials;

const SERVICE: &str = "slack";
pub const DEFAULT_API_BASE: &str = "https://slack.com/api";
pub const MAX_BLOCKS: usize = 50;
pub const MAX_HEADER_CHARS: usize = 150;
pub const MAX_TEXT_CHARS: usize = 40_000;

/// Destination fields copied onto the post body unless the message sets them
const DESTINATION_FIELDS: [&str; 4] = ["thread_ts", "username", "icon_emoji", "icon_url"];

#[derive(Debug, Clone)]
pub struct SlackOptions {
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for SlackOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct SlackAdapter {
    http_client: Client,
    options: SlackOptions,
}

/// A file listed under `message.files`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Attachment {
    Path(PathBuf),
    Full {
        path: PathBuf,
        title: Option<String>,
        filename: Option<String>,
    },
}

impl Attachment {
    pub fn path(&self) -> &Path {
        match self {
            Attachment::Path(path) | Attachment::Full { path, .. } => path,
        }
    }

    pub fn filename(&self) -> String {
        let from_path = || {
            self.path()
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string())
        };
        match self {
            Attachment::Full {
                filename: Some(filename),
                ..
            } => filename.clone(),
            _ => from_path(),
        }
    }

    pub fn title(&self) -> String {
        match self {
            Attachment::Full {
                title: Some(title), ..
            } => title.clone(),
            _ => self.filename(),
        }
    }
}

/// Body for `chat.postMessage` plus the attachments split off the message
#[derive(Debug, Clone, PartialEq)]
pub struct PostRequest {
    pub channel: String,
    pub body: Value,
    pub attachments: Vec<Attachment>,
}

impl SlackAdapter {
    pub fn new(options: SlackOptions) -> Self {
        let http_client = Client::builder()
            .timeout(options.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http_client,
            options,
        }
    }

    pub fn options(&self) -> &SlackOptions {
        &self.options
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.options.api_base.trim_end_matches('/'), method)
    }

    async fn call(&self, method: &str, token: &str, request: reqwest::RequestBuilder) -> Result<Value> {
        debug!("Calling Slack {}", method);
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AdapterError::delivery(SERVICE, format!("{} request failed: {}", method, e), None))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AdapterError::delivery(
                SERVICE,
                format!("{} response could not be read: {}", method, e),
                None,
            )
        })?;
        parse_api_response(method, status, &body)
    }

    /// Read every attachment up front so a bad path fails before anything is posted
    async fn read_attachments(&self, attachments: &[Attachment]) -> Result<Vec<Vec<u8>>> {
        let mut contents = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let bytes = fs::read(attachment.path())
                .await
                .map_err(|source| AdapterError::Attachment {
                    service: SERVICE.to_string(),
                    path: attachment.path().to_path_buf(),
                    source,
                })?;
            debug!("Read {} bytes from {}", bytes.len(), attachment.path().display());
            contents.push(bytes);
        }
        Ok(contents)
    }

    async fn upload(
        &self,
        token: &str,
        channel: &str,
        thread_ts: Option<&str>,
        attachment: &Attachment,
        bytes: Vec<u8>,
    ) -> Result<Value> {
        let filename = attachment.filename();
        let length = bytes.len().to_string();

        let ticket = self
            .call(
                "files.getUploadURLExternal",
                token,
                self.http_client
                    .post(self.endpoint("files.getUploadURLExternal"))
                    .form(&[("filename", filename.as_str()), ("length", length.as_str())]),
            )
            .await?;
        let (Some(upload_url), Some(file_id)) = (
            ticket.get("upload_url").and_then(Value::as_str),
            ticket.get("file_id").and_then(Value::as_str),
        ) else {
            return Err(AdapterError::delivery(
                SERVICE,
                "files.getUploadURLExternal returned no upload_url or file_id",
                Some(ticket.to_string()),
            ));
        };

        let transfer = self
            .http_client
            .post(upload_url)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AdapterError::delivery(SERVICE, format!("file transfer failed: {}", e), None))?;
        if !transfer.status().is_success() {
            let status = transfer.status();
            let body = transfer.text().await.map_err(|e| {
                AdapterError::delivery(
                    SERVICE,
                    format!("file transfer failed with status {}; response could not be read: {}", status, e),
                    None,
                )
            })?;
            return Err(AdapterError::delivery(
                SERVICE,
                format!("file transfer failed with status {}", status),
                Some(body),
            ));
        }

        let files = json!([{"id": file_id, "title": attachment.title()}]).to_string();
        let mut form = vec![("files", files), ("channel_id", channel.to_string())];
        if let Some(thread_ts) = thread_ts {
            form.push(("thread_ts", thread_ts.to_string()));
        }

        let completed = self
            .call(
                "files.completeUploadExternal",
                token,
                self.http_client
                    .post(self.endpoint("files.completeUploadExternal"))
                    .form(&form),
            )
            .await?;

        info!("Uploaded {} to {}", filename, channel);
        Ok(completed)
    }
}

#[async_trait]
impl MessageAdapter for SlackAdapter {
    fn name(&self) -> &'static str {
        SERVICE
    }

    fn supports_compile(&self) -> bool {
        true
    }

    fn compile(&self, message: &Value) -> Result<Value> {
        Ok(compiler::compile(message)?)
    }

    fn required_credentials(&self) -> &'static [&'static str] {
        &["token"]
    }

    fn validate(&self, message: &Value) -> Result<()> {
        let errors = validate_payload(message);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AdapterError::ValidationInvalid {
                service: SERVICE.to_string(),
                errors,
            })
        }
    }

    fn validate_destination(&self, destination: &Value) -> Result<()> {
        destination_channel(destination).map(|_| ())
    }

    async fn send(
        &self,
        message: &Value,
        destination: &Value,
        credentials: &Credentials,
    ) -> Result<DeliveryResponse> {
        let token = credentials
            .get("token")
            .ok_or_else(|| AdapterError::MissingCredential {
                service: SERVICE.to_string(),
                key: "token".to_string(),
            })?;
        let request = build_post_request(message, destination)?;
        let contents = self.read_attachments(&request.attachments).await?;

        info!("Posting message to Slack channel {}", request.channel);
        let posted = self
            .call(
                "chat.postMessage",
                token,
                self.http_client
                    .post(self.endpoint("chat.postMessage"))
                    .json(&request.body),
            )
            .await?;

        let ts = posted.get("ts").and_then(Value::as_str).map(str::to_string);
        let channel = posted
            .get("channel")
            .and_then(Value::as_str)
            .unwrap_or(&request.channel)
            .to_string();

        let thread_ts = request
            .body
            .get("thread_ts")
            .and_then(Value::as_str)
            .or(ts.as_deref());
        for (attachment, bytes) in request.attachments.iter().zip(contents) {
            self.upload(token, &channel, thread_ts, attachment, bytes).await?;
        }

        Ok(DeliveryResponse {
            service: SERVICE.to_string(),
            channel: Some(channel),
            ts,
            raw: posted,
        })
    }
}

/// Every limit the payload breaks, in document order
pub fn validate_payload(message: &Value) -> Vec<String> {
    let Some(object) = message.as_object() else {
        return vec!["payload must be an object".to_string()];
    };
    let mut errors = Vec::new();

    let text = object.get("text").and_then(Value::as_str).unwrap_or_default();
    if text.chars().count() > MAX_TEXT_CHARS {
        errors.push(format!("text exceeds {} characters", MAX_TEXT_CHARS));
    }

    let blocks = match object.get("blocks") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(blocks)) => blocks.as_slice(),
        Some(_) => {
            errors.push("blocks must be an array".to_string());
            &[][..]
        }
    };

    if text.trim().is_empty() && blocks.is_empty() {
        errors.push("message needs non-empty 'text' or 'blocks'".to_string());
    }
    if blocks.len() > MAX_BLOCKS {
        errors.push(format!(
            "{} blocks exceeds the limit of {}",
            blocks.len(),
            MAX_BLOCKS
        ));
    }

    for (index, block) in blocks.iter().enumerate() {
        match block.get("type").and_then(Value::as_str) {
            None => errors.push(format!("blocks[{}] has no string 'type'", index)),
            Some("header") => {
                let length = block
                    .pointer("/text/text")
                    .and_then(Value::as_str)
                    .map(|text| text.chars().count())
                    .unwrap_or_default();
                if length > MAX_HEADER_CHARS {
                    errors.push(format!(
                        "blocks[{}] header text exceeds {} characters",
                        index, MAX_HEADER_CHARS
                    ));
                }
            }
            Some(_) => {}
        }
    }

    if let Some(files) = object.get("files").filter(|files| !files.is_null()) {
        if let Err(e) = serde_json::from_value::<Vec<Attachment>>(files.clone()) {
            errors.push(format!("files: {}", e));
        }
    }

    errors
}

/// The channel a destination addresses; required for every Slack send
pub fn destination_channel(destination: &Value) -> Result<&str> {
    destination
        .get("channel")
        .and_then(Value::as_str)
        .filter(|channel| !channel.trim().is_empty())
        .ok_or_else(|| AdapterError::MissingDestination {
            service: SERVICE.to_string(),
            field: "channel".to_string(),
        })
}

/// Split attachments off the message and address it using the destination
pub fn build_post_request(message: &Value, destination: &Value) -> Result<PostRequest> {
    let channel = destination_channel(destination)?.to_string();

    let mut body = Map::new();
    let mut files = None;
    for (key, value) in message.as_object().into_iter().flatten() {
        if key == "files" {
            files = Some(value.clone());
        } else {
            body.insert(key.clone(), value.clone());
        }
    }

    let attachments = match files {
        None | Some(Value::Null) => Vec::new(),
        Some(files) => serde_json::from_value(files).map_err(|e| AdapterError::ValidationInvalid {
            service: SERVICE.to_string(),
            errors: vec![format!("files: {}", e)],
        })?,
    };

    body.insert("channel".to_string(), Value::String(channel.clone()));
    for field in DESTINATION_FIELDS {
        if body.contains_key(field) {
            continue;
        }
        if let Some(value) = destination.get(field) {
            body.insert(field.to_string(), value.clone());
        }
    }

    Ok(PostRequest {
        channel,
        body: Value::Object(body),
        attachments,
    })
}

/// Interpret a Web API reply; HTTP errors and `ok: false` both fail with the raw body
pub fn parse_api_response(method: &str, status: StatusCode, body: &str) -> Result<Value> {
    if !status.is_success() {
        return Err(AdapterError::delivery(
            SERVICE,
            format!("{} failed with status {}", method, status),
            Some(body.to_string()),
        ));
    }

    let parsed: Value = serde_json::from_str(body).map_err(|e| {
        AdapterError::delivery(
            SERVICE,
            format!("{} returned invalid JSON: {}", method, e),
            Some(body.to_string()),
        )
    })?;

    if parsed.get("ok").and_then(Value::as_bool) != Some(true) {
        let error = parsed
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error");
        return Err(AdapterError::delivery(
            SERVICE,
            format!("{} returned error '{}'", method, error),
            Some(body.to_string()),
        ));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    #[test]
    fn test_validate_accepts_text_or_blocks() {
        assert!(validate_payload(&json!({"text": "Hello, World!"})).is_empty());
        assert!(validate_payload(&json!({"blocks": [{"type": "divider"}]})).is_empty());
    }

    #[test]
    fn test_validate_reports_everything() {
        let long_header = "h".repeat(MAX_HEADER_CHARS + 1);
        let errors = validate_payload(&json!({
            "text": "",
            "blocks": [
                {"text": "untyped"},
                {"type": "header", "text": {"type": "plain_text", "text": long_header}}
            ]
        }));
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("blocks[0]"));
        assert!(errors[1].contains("header text"));

        let empty = validate_payload(&json!({"text": "  "}));
        assert_eq!(empty, vec!["message needs non-empty 'text' or 'blocks'"]);
    }

    #[test]
    fn test_validate_limits() {
        let blocks: Vec<Value> = (0..=MAX_BLOCKS).map(|_| json!({"type": "divider"})).collect();
        let errors = validate_payload(&json!({"blocks": blocks}));
        assert_eq!(errors, vec!["51 blocks exceeds the limit of 50"]);

        let text = "x".repeat(MAX_TEXT_CHARS + 1);
        assert_eq!(validate_payload(&json!({"text": text})).len(), 1);

        assert_eq!(validate_payload(&json!("text")), vec!["payload must be an object"]);
    }

    #[test]
    fn test_adapter_validate_error() {
        let adapter = SlackAdapter::new(SlackOptions::default());
        let err = adapter.validate(&json!({})).unwrap_err();
        assert!(matches!(err, AdapterError::ValidationInvalid { .. }));
    }

    #[test]
    fn test_post_request_merges_destination() {
        let request = build_post_request(
            &json!({"text": "hi", "username": "release-bot", "files": ["out/report.csv", {"path": "a.log", "title": "Log"}]}),
            &json!({"service": "slack", "channel": "#ops", "username": "ignored", "icon_emoji": ":rocket:"}),
        )
        .unwrap();

        assert_eq!(request.channel, "#ops");
        assert_eq!(
            request.body,
            json!({"text": "hi", "username": "release-bot", "channel": "#ops", "icon_emoji": ":rocket:"})
        );
        assert_eq!(request.attachments.len(), 2);
        assert_eq!(request.attachments[0].filename(), "report.csv");
        assert_eq!(request.attachments[1].title(), "Log");
    }

    #[test]
    fn test_post_request_needs_channel() {
        let err = build_post_request(&json!({"text": "hi"}), &json!({"service": "slack"})).unwrap_err();
        assert!(matches!(err, AdapterError::MissingDestination { .. }));
    }

    #[test]
    fn test_parse_api_response() {
        let ok = parse_api_response("chat.postMessage", StatusCode::OK, r#"{"ok":true,"ts":"1.2"}"#)
            .unwrap();
        assert_eq!(ok["ts"], "1.2");

        match parse_api_response("chat.postMessage", StatusCode::OK, r#"{"ok":false,"error":"channel_not_found"}"#) {
            Err(AdapterError::DeliveryFailed { reason, raw, .. }) => {
                assert!(reason.contains("channel_not_found"));
                assert_eq!(raw.as_deref(), Some(r#"{"ok":false,"error":"channel_not_found"}"#));
            }
            other => panic!("expected delivery failure, got {:?}", other),
        }

        assert!(matches!(
            parse_api_response("chat.postMessage", StatusCode::BAD_GATEWAY, "upstream"),
            Err(AdapterError::DeliveryFailed { .. })
        ));
    }

    #[test]
    fn test_endpoint_joins_base() {
        let adapter = SlackAdapter::new(SlackOptions {
            api_base: "http://localhost:9999/api/".to_string(),
            ..Default::default()
        });
        assert_eq!(adapter.endpoint("chat.postMessage"), "http://localhost:9999/api/chat.postMessage");
    }

    /// Local Web API stand-in: answers each request by path suffix and records
    /// the request line and body in arrival order
    async fn stub_slack(routes: Vec<(&'static str, String)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let routes: Vec<(&'static str, String)> = routes
            .into_iter()
            .map(|(path, body)| (path, body.replace("{base}", &base)))
            .collect();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let request = read_request(&mut socket).await;
                let request_line = request.lines().next().unwrap_or_default().to_string();
                recorded.lock().unwrap().push(request);

                let path = request_line.split_whitespace().nth(1).unwrap_or_default();
                let body = routes
                    .iter()
                    .find(|(suffix, _)| path.ends_with(suffix))
                    .map(|(_, body)| body.clone())
                    .unwrap_or_else(|| r#"{"ok":false,"error":"unknown_method"}"#.to_string());
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        (format!("{}/api", base), requests)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0_u8; 4096];
        loop {
            let Ok(read) = socket.read(&mut chunk).await else { break };
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);

            let text = String::from_utf8_lossy(&buffer);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buffer.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    fn stub_adapter(api_base: String) -> SlackAdapter {
        SlackAdapter::new(SlackOptions {
            api_base,
            ..Default::default()
        })
    }

    fn token() -> Credentials {
        Credentials::from_map([("token".to_string(), "xoxb-test".to_string())].into())
    }

    #[tokio::test]
    async fn test_send_posts_then_uploads_into_thread() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("report.csv");
        std::fs::write(&report, "a,b\n1,2\n").unwrap();

        let (api_base, requests) = stub_slack(vec![
            ("/chat.postMessage", r#"{"ok":true,"channel":"C123","ts":"1700000000.000100"}"#.to_string()),
            (
                "/files.getUploadURLExternal",
                r#"{"ok":true,"upload_url":"{base}/upload/F1","file_id":"F1"}"#.to_string(),
            ),
            ("/upload/F1", "OK - 8".to_string()),
            ("/files.completeUploadExternal", r#"{"ok":true,"files":[{"id":"F1"}]}"#.to_string()),
        ])
        .await;

        let message = json!({"text": "nightly report", "files": [report.to_str().unwrap()]});
        let response = stub_adapter(api_base)
            .send(&message, &json!({"channel": "#reports"}), &token())
            .await
            .unwrap();

        assert_eq!(response.channel.as_deref(), Some("C123"));
        assert_eq!(response.ts.as_deref(), Some("1700000000.000100"));

        let requests = requests.lock().unwrap().clone();
        let lines: Vec<&str> = requests.iter().map(|r| r.lines().next().unwrap()).collect();
        assert_eq!(
            lines,
            vec![
                "POST /api/chat.postMessage HTTP/1.1",
                "POST /api/files.getUploadURLExternal HTTP/1.1",
                "POST /upload/F1 HTTP/1.1",
                "POST /api/files.completeUploadExternal HTTP/1.1",
            ]
        );
        assert!(!requests[0].contains("files"));
        assert!(requests[1].contains("filename=report.csv"));
        assert!(requests[2].ends_with("a,b\n1,2\n"));
        assert!(requests[3].contains("thread_ts=1700000000.000100"));
        assert!(requests[3].contains("channel_id=C123"));
    }

    #[tokio::test]
    async fn test_unreadable_attachment_fails_before_posting() {
        let (api_base, requests) = stub_slack(vec![(
            "/chat.postMessage",
            r#"{"ok":true,"channel":"C123","ts":"1.0"}"#.to_string(),
        )])
        .await;

        let message = json!({"text": "hi", "files": ["/no/such/file.csv"]});
        let err = stub_adapter(api_base)
            .send(&message, &json!({"channel": "#ops"}), &token())
            .await
            .unwrap_err();

        match err {
            AdapterError::Attachment { service, path, .. } => {
                assert_eq!(service, "slack");
                assert_eq!(path, PathBuf::from("/no/such/file.csv"));
            }
            other => panic!("expected attachment error, got {:?}", other),
        }
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_truncated_response_is_delivery_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let api_base = format!("http://{}/api", listener.local_addr().unwrap());
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let _ = read_request(&mut socket).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 64\r\nConnection: close\r\n\r\n{\"ok\":")
                    .await;
            }
        });

        let err = stub_adapter(api_base)
            .send(&json!({"text": "hi"}), &json!({"channel": "#ops"}), &token())
            .await
            .unwrap_err();

        match err {
            AdapterError::DeliveryFailed { service, reason, .. } => {
                assert_eq!(service, "slack");
                assert!(reason.contains("could not be read"), "{}", reason);
            }
            other => panic!("expected delivery failure, got {:?}", other),
        }
    }

    #[test]
    fn test_destination_needs_channel() {
        let adapter = SlackAdapter::new(SlackOptions::default());
        assert!(adapter.validate_destination(&json!({"service": "slack", "channel": "#ops"})).is_ok());
        assert!(matches!(
            adapter.validate_destination(&json!({"service": "slack", "channel": "  "})),
            Err(AdapterError::MissingDestination { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_malformed_files() {
        let errors = validate_payload(&json!({"text": "hi", "files": [{"title": "no path"}]}));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("files:"));
        assert!(validate_payload(&json!({"text": "hi", "files": ["a.log", {"path": "b.log"}]})).is_empty());
    }

    #[tokio::test]
    async fn test_send_requires_token() {
        let adapter = SlackAdapter::new(SlackOptions::default());
        let err = adapter
            .send(&json!({"text": "hi"}), &json!({"channel": "#ops"}), &Credentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::MissingCredential { .. }));
    }
}
