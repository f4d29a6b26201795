use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_SCALE: f32 = 1.0;
pub const MAX_SCALE: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType
{
    Clicker,
    Catcher,
    Memory,
}

impl GameType
{
    pub const ALL: [GameType; 3] = [GameType::Clicker, GameType::Catcher, GameType::Memory];

    pub fn name(self) -> &'static str
    {
        match self {
            GameType::Clicker => "clicker",
            GameType::Catcher => "catcher",
            GameType::Memory => "memory",
        }
    }

    pub fn from_name(name: &str) -> Option<Self>
    {
        Self::ALL
            .into_iter()
            .find(|game| game.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for GameType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Theme
{
    pub primary: String,
    pub secondary: String,
    pub background: String,
    pub text: String,
    pub accent: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameters
{
    pub speed: f32,
    // Carried for compatibility; no mini-game reads it.
    pub difficulty: f32,
}

/// Everything a mini-game needs to run one session. Produced once by the
/// generator and only ever read afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig
{
    pub game_type: GameType,
    pub title: String,
    pub description: String,
    pub instructions: String,
    pub theme: Theme,
    pub assets: Vec<String>,
    pub parameters: Parameters,
}

impl GameConfig
{
    pub fn fallback() -> Self
    {
        Self {
            game_type: GameType::Clicker,
            title: "Mood Pop".to_string(),
            description: "Pop the bubbles before they fade away.".to_string(),
            instructions: "Click the growing bubbles to score 10 points each. You have 30 seconds."
                .to_string(),
            theme: Theme {
                primary: "#6366f1".to_string(),
                secondary: "#ec4899".to_string(),
                background: "#0f172a".to_string(),
                text: "#f8fafc".to_string(),
                accent: "#facc15".to_string(),
            },
            assets: ["⭐", "🎈", "🍀", "🌈", "🎯"]
                .into_iter()
                .map(String::from)
                .collect(),
            parameters: Parameters {
                speed: 5.0,
                difficulty: 5.0,
            },
        }
    }

    pub fn with_game_type(mut self, game_type: GameType) -> Self
    {
        self.game_type = game_type;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self
    {
        self.parameters.speed = speed;
        self
    }

    pub fn speed(&self) -> f32
    {
        self.parameters.speed
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_camel_case_json()
    {
        let json = r##"{
            "gameType": "catcher",
            "title": "Storm",
            "description": "d",
            "instructions": "i",
            "theme": {
                "primary": "#111111",
                "secondary": "#222222",
                "background": "#000000",
                "text": "#ffffff",
                "accent": "#ff0000"
            },
            "assets": ["⚡", "🌩️"],
            "parameters": { "speed": 8, "difficulty": 3 }
        }"##;
        let config: GameConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.game_type, GameType::Catcher);
        assert_eq!(config.assets, vec!["⚡".to_string(), "🌩️".to_string()]);
        assert_eq!(
            config.parameters,
            Parameters {
                speed: 8.0,
                difficulty: 3.0
            }
        );
    }

    #[test]
    fn serializes_with_contract_field_names()
    {
        let value = serde_json::to_value(GameConfig::fallback()).unwrap();
        assert_eq!(value["gameType"], "clicker");
        assert_eq!(value["parameters"]["difficulty"], 5.0);
        assert!(value.get("game_type").is_none());
    }

    #[test]
    fn unknown_game_type_is_rejected()
    {
        let mut value = serde_json::to_value(GameConfig::fallback()).unwrap();
        value["gameType"] = "puzzle".into();
        assert!(serde_json::from_value::<GameConfig>(value).is_err());
    }

    #[test]
    fn game_type_names_round_trip()
    {
        for game in GameType::ALL {
            assert_eq!(GameType::from_name(game.name()), Some(game));
        }
        assert_eq!(GameType::from_name(" Memory "), Some(GameType::Memory));
        assert_eq!(GameType::from_name("snake"), None);
    }

    #[test]
    fn fallback_shape()
    {
        let config = GameConfig::fallback();
        assert_eq!(config.game_type, GameType::Clicker);
        assert_eq!(config.assets.len(), 5);
        assert_eq!(config.parameters.speed, 5.0);
        assert_eq!(config.parameters.difficulty, 5.0);
    }
}
