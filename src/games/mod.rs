pub mod catcher;
pub mod clicker;
pub mod memory;

use crate::config::{GameConfig, GameType};
use crate::screen::{Canvas, Projection, Rgb};
use std::fmt;
use std::time::{Duration, Instant};

pub const FIELD_WIDTH: f32 = 800.0;
pub const FIELD_HEIGHT: f32 = 600.0;
const FRAME: Duration = Duration::from_micros(16_667);
const PLACEHOLDER_ASSET: &str = "●";

pub struct GameDescriptor
{
    pub game_type: GameType,
    pub description: &'static str,
}

pub fn registry() -> Vec<GameDescriptor>
{
    vec![
        GameDescriptor {
            game_type: GameType::Clicker,
            description: "Click the growing targets before they fade (30s)",
        },
        GameDescriptor {
            game_type: GameType::Catcher,
            description: "Move the paddle to catch falling items (5 lives)",
        },
        GameDescriptor {
            game_type: GameType::Memory,
            description: "Flip cards and find every matching pair",
        },
    ]
}

/// One-shot game-over callback. Consumed on first use, so a session can
/// report at most one score.
pub struct GameOver
{
    callback: Option<Box<dyn FnOnce(u32)>>,
}

impl GameOver
{
    pub fn new(callback: impl FnOnce(u32) + 'static) -> Self
    {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    pub fn fire(&mut self, score: u32) -> bool
    {
        match self.callback.take() {
            Some(callback) => {
                callback(score);
                true
            }
            None => false,
        }
    }

    pub fn is_fired(&self) -> bool
    {
        self.callback.is_none()
    }
}

impl fmt::Debug for GameOver
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("GameOver")
            .field("fired", &self.is_fired())
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerKind
{
    Press,
    Move,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pointer
{
    pub kind: PointerKind,
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameKey
{
    Left,
    Right,
    Up,
    Down,
    Select,
}

/// Display-side projection of a session, refreshed at redraw rate.
#[derive(Clone, Debug, PartialEq)]
pub struct Hud
{
    pub score: u32,
    pub status: String,
}

/// Theme colours resolved once per session for drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette
{
    pub primary: Rgb,
    pub secondary: Rgb,
    pub background: Rgb,
    pub text: Rgb,
    pub accent: Rgb,
}

impl Palette
{
    pub fn from_config(config: &GameConfig) -> Self
    {
        let theme = &config.theme;
        Self {
            primary: Rgb::parse_or(&theme.primary, Rgb::new(99, 102, 241)),
            secondary: Rgb::parse_or(&theme.secondary, Rgb::new(236, 72, 153)),
            background: Rgb::parse_or(&theme.background, Rgb::new(15, 23, 42)),
            text: Rgb::parse_or(&theme.text, Rgb::new(248, 250, 252)),
            accent: Rgb::parse_or(&theme.accent, Rgb::new(250, 204, 21)),
        }
    }
}

pub trait MiniGame
{
    fn pointer(&mut self, pointer: Pointer, now: Instant);

    fn key(&mut self, key: GameKey, now: Instant);

    fn update(&mut self, now: Instant);

    /// Ends the session immediately, reporting a score of 0.
    fn abort(&mut self);

    fn is_over(&self) -> bool;

    fn hud(&self) -> Hud;

    fn draw(&self, canvas: &mut Canvas, projection: &Projection);
}

pub fn mount(
    config: &GameConfig,
    on_game_over: impl FnOnce(u32) + 'static,
    now: Instant,
) -> Box<dyn MiniGame>
{
    let game_over = GameOver::new(on_game_over);
    match config.game_type {
        GameType::Clicker => Box::new(clicker::Clicker::new(config, game_over, now)),
        GameType::Catcher => Box::new(catcher::Catcher::new(config, game_over, now)),
        GameType::Memory => Box::new(memory::Memory::new(config, game_over, now)),
    }
}

/// Elapsed time expressed in 60 Hz frames.
pub(crate) fn frames_between(from: Instant, to: Instant) -> f32
{
    to.saturating_duration_since(from).as_secs_f32() / FRAME.as_secs_f32()
}

pub(crate) fn asset_or_placeholder(assets: &[String], index: usize) -> &str
{
    assets
        .get(index)
        .map(String::as_str)
        .unwrap_or(PLACEHOLDER_ASSET)
}

pub(crate) fn speed_ms(base: f32, per_speed: f32, floor: f32, speed: f32) -> Duration
{
    let millis = (base - per_speed * speed).max(floor);
    Duration::from_micros((millis * 1000.0).round() as u64)
}

#[cfg(test)]
pub(crate) mod test_support
{
    use super::GameOver;
    use std::cell::RefCell;
    use std::rc::Rc;

    pub fn recorder() -> (GameOver, Rc<RefCell<Vec<u32>>>)
    {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        let game_over = GameOver::new(move |score| sink.borrow_mut().push(score));
        (game_over, calls)
    }
}
