use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
}

#[derive(Deserialize, Debug)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub typ: String,
    pub message: String,
}

#[derive(Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}
