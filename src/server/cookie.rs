use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use hmac::{ Hmac, Mac };
use sha2::Sha256;
use std::time::Duration;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "session";

/// Signs and verifies session ids carried in the `session` cookie as
/// `<id>.<hex hmac-sha256 of id>`.
#[derive(Clone)]
pub struct SessionCookies {
    secret: Vec<u8>,
    max_age: Duration,
}

impl SessionCookies {
    pub fn new(secret: &str, max_age: Duration) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            max_age,
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length")
    }

    pub fn sign(&self, id: &str) -> String {
        let mut mac = self.mac();
        mac.update(id.as_bytes());
        format!("{}.{}", id, hex::encode(mac.finalize().into_bytes()))
    }

    /// Returns the session id when the signature matches.
    pub fn verify(&self, value: &str) -> Option<String> {
        let (id, sig) = value.rsplit_once('.')?;
        if id.is_empty() {
            return None;
        }
        let sig = hex::decode(sig).ok()?;
        let mut mac = self.mac();
        mac.update(id.as_bytes());
        mac.verify_slice(&sig).ok()?;
        Some(id.to_string())
    }

    /// The session id from the request cookie, or a new one when it is
    /// missing or badly signed. The flag is true for new sessions.
    pub fn resolve(&self, headers: &HeaderMap) -> (String, bool) {
        match cookie_value(headers, SESSION_COOKIE).and_then(|v| self.verify(&v)) {
            Some(id) => (id, false),
            None => (Uuid::new_v4().to_string(), true),
        }
    }

    /// `Set-Cookie` value refreshing the idle window for `id`.
    pub fn set_cookie(&self, id: &str) -> String {
        format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            self.sign(id),
            self.max_age.as_secs()
        )
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
