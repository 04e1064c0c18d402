use serde::{ Serialize, Deserialize };

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct PingResponse {
    pub message: String,
}
