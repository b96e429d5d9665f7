use reqwest;
use serde::Serialize;
use serde_json::Value;

use crate::config::{Config, ModelsConfig};
use crate::error::{Result, TapeError};
use crate::extract;
use crate::request::{RequestIntent, UserContent};

macro_rules! debug_println {
    ($($arg:tt)*) => {
        if std::env::var("TAPE_DEBUG").is_ok() {
            println!($($arg)*);
        }
    };
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: Content,
}

/// `content` is either a plain string or, for vision requests, an
/// array of typed parts.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

pub struct OpenRouterClient {
    base_url: String,
    api_key: String,
    referer: String,
    title: String,
    models: ModelsConfig,
    client: reqwest::Client,
}

impl OpenRouterClient {
    pub fn new(config: &Config, api_key: String) -> Self {
        OpenRouterClient {
            base_url: config.openrouter.base_url.clone(),
            api_key,
            referer: config.openrouter.referer.clone(),
            title: config.openrouter.title.clone(),
            models: config.models.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Sends one chat completion and returns the first completion's
    /// text. A single attempt per user action; the cooldown gate is
    /// the only defense against repeated load.
    pub async fn chat(&self, intent: &RequestIntent) -> Result<String> {
        let body = self.build_request(intent);
        debug_println!(
            "openrouter request: model={} kind={}",
            body.model,
            intent.kind().label()
        );

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
            .timeout(intent.kind().timeout())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TapeError::Timeout
                } else {
                    TapeError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TapeError::Timeout
            } else {
                TapeError::Transport(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(TapeError::Upstream {
                status: status.as_u16(),
                body: upstream_error_message(&text),
            });
        }

        let envelope: Value =
            serde_json::from_str(&text).map_err(|e| TapeError::Parse(e.to_string()))?;
        extract::completion_text(&envelope)
    }

    fn build_request(&self, intent: &RequestIntent) -> ChatRequest {
        let user = match intent.user_content() {
            UserContent::Text(text) => Message {
                role: "user",
                content: Content::Text(text),
            },
            UserContent::Vision {
                text,
                image_data_url,
            } => Message {
                role: "user",
                content: Content::Parts(vec![
                    ContentPart::Text { text },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image_data_url,
                            detail: "high",
                        },
                    },
                ]),
            },
        };

        ChatRequest {
            model: intent.model(&self.models).to_string(),
            messages: vec![
                Message {
                    role: "system",
                    content: Content::Text(intent.system_prompt()),
                },
                user,
            ],
            temperature: intent.temperature(),
            max_tokens: intent.max_tokens(),
        }
    }
}

/// Upstream failures carry `{"error": {"message": ...}}` when the
/// provider produced one; otherwise the raw body is surfaced.
fn upstream_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
    }
    body.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::SimulationForm;

    fn client() -> OpenRouterClient {
        OpenRouterClient::new(&Config::default(), "test-key".to_string())
    }

    #[test]
    fn text_request_serializes_to_provider_shape() {
        let intent = RequestIntent::Chat {
            message: "How often should I water basil?".to_string(),
        };
        let body = serde_json::to_value(client().build_request(&intent)).unwrap();

        assert_eq!(body["model"], "anthropic/claude-3-sonnet");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(
            body["messages"][1]["content"],
            "How often should I water basil?"
        );
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["max_tokens"], 300);
    }

    #[test]
    fn vision_request_uses_multipart_content() {
        let intent = RequestIntent::DiseaseAnalysis {
            image_data_url: "data:image/jpeg;base64,AAAA".to_string(),
            plant_type: "tomato".to_string(),
            symptoms: "yellow leaves".to_string(),
        };
        let body = serde_json::to_value(client().build_request(&intent)).unwrap();

        assert_eq!(body["model"], "qwen/qwen-vl-plus");
        let content = &body["messages"][1]["content"];
        assert!(content.is_array());
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/jpeg;base64,AAAA");
        assert_eq!(content[1]["image_url"]["detail"], "high");
        assert!(body.get("temperature").is_none());
        assert_eq!(body["max_tokens"], 2000);
    }

    #[test]
    fn simulation_request_omits_max_tokens() {
        let intent = RequestIntent::Simulation(SimulationForm {
            plant_type: "Tomato".to_string(),
            temperature: "18-24".to_string(),
            humidity: "60%".to_string(),
            ..Default::default()
        });
        let body = serde_json::to_value(client().build_request(&intent)).unwrap();
        assert_eq!(body["model"], "openai/gpt-3.5-turbo");
        assert!(body.get("max_tokens").is_none());
        let temp = body["temperature"].as_f64().unwrap();
        assert!((temp - 0.7).abs() < 1e-6);
    }

    #[test]
    fn credential_never_enters_the_request_body() {
        let client = client();
        let intents = [
            RequestIntent::Chat {
                message: "hi".to_string(),
            },
            RequestIntent::Simulation(SimulationForm {
                plant_type: "Tomato".to_string(),
                temperature: "18-24".to_string(),
                humidity: "60%".to_string(),
                ..Default::default()
            }),
            RequestIntent::DiseaseAnalysis {
                image_data_url: "data:image/jpeg;base64,AAAA".to_string(),
                plant_type: "tomato".to_string(),
                symptoms: String::new(),
            },
            RequestIntent::VarietyLookup {
                plant: "tomato".to_string(),
            },
            RequestIntent::WeatherLookup {
                city: "Lisbon".to_string(),
                country: "Portugal".to_string(),
            },
        ];
        for intent in &intents {
            let body = serde_json::to_string(&client.build_request(intent)).unwrap();
            assert!(
                !body.contains("test-key"),
                "{} body must not carry the credential",
                intent.kind().label()
            );
        }
    }

    #[test]
    fn upstream_error_body_prefers_provider_message() {
        assert_eq!(
            upstream_error_message(r#"{"error":{"message":"model overloaded"}}"#),
            "model overloaded"
        );
        assert_eq!(upstream_error_message("bad gateway"), "bad gateway");
        assert_eq!(upstream_error_message(""), "");
    }
}
