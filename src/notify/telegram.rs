use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;
use std::time::Duration;
use super::{ Notifier, NotifyError };

pub struct TelegramNotifier {
    http: HttpClient,
    api_base: String,
    bot_token: String,
    chat_id: String,
    parse_mode: Option<String>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

impl TelegramNotifier {
    pub fn new(
        api_base: String,
        bot_token: String,
        chat_id: String,
        parse_mode: Option<String>,
        timeout: Option<Duration>
    ) -> Result<Self, NotifyError> {
        let mut builder = HttpClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| NotifyError::Request(e.to_string()))?;

        Ok(Self {
            http,
            api_base,
            bot_token,
            chat_id,
            parse_mode,
        })
    }

    fn url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base.trim_end_matches('/'), self.bot_token)
    }

    /// reqwest errors embed the URL, which carries the bot token.
    fn redact(&self, message: String) -> String {
        if self.bot_token.is_empty() {
            message
        } else {
            message.replace(&self.bot_token, "***")
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: self.parse_mode.as_deref(),
        };

        let resp = self.http
            .post(self.url())
            .json(&payload)
            .send().await
            .map_err(|e| NotifyError::Request(self.redact(e.to_string())))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Status { status, body: self.redact(body) });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn notifier(base: String, timeout: Option<Duration>) -> TelegramNotifier {
        TelegramNotifier::new(
            base,
            "123:SECRET".to_string(),
            "-100200".to_string(),
            Some("Markdown".to_string()),
            timeout
        ).unwrap()
    }

    #[tokio::test]
    async fn posts_send_message_payload() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/bot123:SECRET/sendMessage")
                .json_body_includes(
                    json!({
                        "chat_id": "-100200",
                        "text": "*Client:* Hello",
                        "parse_mode": "Markdown"
                    }).to_string()
                );
            then.status(200).json_body(json!({ "ok": true, "result": {} }));
        });

        notifier(server.base_url(), None).notify("*Client:* Hello").await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot123:SECRET/sendMessage");
            then.status(400).json_body(
                json!({ "ok": false, "description": "Bad Request: chat not found" })
            );
        });

        let err = notifier(server.base_url(), None).notify("hi").await.unwrap_err();
        match err {
            NotifyError::Status { status, body } => {
                assert_eq!(status.as_u16(), 400);
                assert!(body.contains("chat not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn timeouts_are_errors_without_the_token() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot123:SECRET/sendMessage");
            then.status(200).delay(Duration::from_millis(500));
        });

        let err = notifier(server.base_url(), Some(Duration::from_millis(50)))
            .notify("hi").await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Request(_)));
        assert!(!err.to_string().contains("SECRET"));
    }

    #[tokio::test]
    async fn connection_errors_are_errors() {
        let err = notifier("http://127.0.0.1:9".to_string(), Some(Duration::from_secs(2)))
            .notify("hi").await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Request(_)));
        assert!(!err.to_string().contains("SECRET"));
    }
}
