use crate::config::{GameConfig, MAX_SCALE, MIN_SCALE};
use crate::settings::Settings;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum GenerateError
{
    #[error("no API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("offline mode")]
    Offline,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service answered {status}: {body}")]
    Status
    {
        status: u16,
        body: String,
    },

    #[error("reply contained no text")]
    EmptyReply,

    #[error("reply is not a game config: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid game config: {0}")]
    Invalid(String),
}

/// Anything that can turn a mood into a game configuration.
pub trait ConfigSource
{
    fn generate(&self, mood: &str) -> Result<GameConfig, GenerateError>;
}

pub type SharedSource = Arc<dyn ConfigSource + Send + Sync>;

/// Never fails: any generation error is logged and replaced by
/// [`GameConfig::fallback`].
pub fn generate_or_fallback(source: &dyn ConfigSource, mood: &str) -> GameConfig
{
    match source.generate(mood) {
        Ok(config) => {
            info!(mood, game = %config.game_type, title = %config.title, "generated game config");
            config
        }
        Err(err) => {
            warn!(mood, error = %err, "config generation failed, using fallback");
            GameConfig::fallback()
        }
    }
}

pub struct Offline;

impl ConfigSource for Offline
{
    fn generate(&self, _mood: &str) -> Result<GameConfig, GenerateError>
    {
        Err(GenerateError::Offline)
    }
}

/// Always hands out the same config, whatever the mood.
pub struct Fixed(pub GameConfig);

impl ConfigSource for Fixed
{
    fn generate(&self, _mood: &str) -> Result<GameConfig, GenerateError>
    {
        Ok(self.0.clone())
    }
}

pub fn connect(settings: &Settings) -> SharedSource
{
    if settings.offline {
        info!("offline mode, every session uses the fallback config");
        return Arc::new(Offline);
    }
    match GeminiClient::new(settings) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            warn!(error = %err, "couldn't set up the config generator, using fallback configs");
            Arc::new(Offline)
        }
    }
}

pub struct GeminiClient
{
    http: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient
{
    pub fn new(settings: &Settings) -> Result<Self, GenerateError>
    {
        let api_key = settings
            .api_key
            .clone()
            .ok_or(GenerateError::MissingApiKey)?;
        let http = Client::builder().timeout(settings.timeout).build()?;
        let endpoint = format!("{}/models/{}:generateContent", settings.base_url, settings.model);
        Ok(Self {
            http,
            api_key,
            endpoint,
        })
    }
}

impl ConfigSource for GeminiClient
{
    fn generate(&self, mood: &str) -> Result<GameConfig, GenerateError>
    {
        let request = serde_json::json!({
            "contents": [{ "parts": [{ "text": build_prompt(mood) }] }],
            "generationConfig": { "responseMimeType": "application/json" },
        });
        debug!(endpoint = %self.endpoint, mood, "requesting game config");

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let reply: GenerateResponse = response.json()?;
        let text = reply.text().ok_or(GenerateError::EmptyReply)?;
        parse_reply(&text)
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse
{
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate
{
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content
{
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part
{
    text: Option<String>,
}

impl GenerateResponse
{
    fn text(&self) -> Option<String>
    {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|part| part.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

pub fn build_prompt(mood: &str) -> String
{
    format!(
        "The player feels \"{mood}\". Design a short casual mini-game that fits this mood.\n\
         Reply with a single JSON object and nothing else, using exactly these fields:\n\
         {{\n\
           \"gameType\": one of \"clicker\", \"catcher\", \"memory\",\n\
           \"title\": short game title,\n\
           \"description\": one sentence,\n\
           \"instructions\": one or two sentences telling the player what to do,\n\
           \"theme\": {{ \"primary\", \"secondary\", \"background\", \"text\", \"accent\" }} \
           as #rrggbb colours,\n\
           \"assets\": 12 to 20 emoji that match the mood,\n\
           \"parameters\": {{ \"speed\": 1-10, \"difficulty\": 1-10 }}\n\
         }}"
    )
}

/// Parses the model's reply, tolerating a surrounding Markdown code fence.
pub fn parse_reply(text: &str) -> Result<GameConfig, GenerateError>
{
    let json = strip_code_fence(text);
    if json.is_empty() {
        return Err(GenerateError::EmptyReply);
    }
    let config: GameConfig = serde_json::from_str(json)?;
    validate(config)
}

fn strip_code_fence(text: &str) -> &str
{
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Without a newline the info string runs straight into the object.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.find('{').map_or(rest, |brace| &rest[brace..]),
    };
    body.trim_end().trim_end_matches("```").trim()
}

fn validate(mut config: GameConfig) -> Result<GameConfig, GenerateError>
{
    config.assets = config
        .assets
        .into_iter()
        .map(|asset| asset.trim().to_string())
        .filter(|asset| !asset.is_empty())
        .collect();
    if config.assets.is_empty() {
        return Err(GenerateError::Invalid("asset list is empty".to_string()));
    }

    let params = &mut config.parameters;
    if !params.speed.is_finite() || !params.difficulty.is_finite() {
        return Err(GenerateError::Invalid("non-finite parameters".to_string()));
    }
    params.speed = params.speed.clamp(MIN_SCALE, MAX_SCALE);
    params.difficulty = params.difficulty.clamp(MIN_SCALE, MAX_SCALE);
    Ok(config)
}
