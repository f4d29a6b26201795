use super::{
    asset_or_placeholder, frames_between, speed_ms, GameKey, GameOver, Hud, MiniGame, Palette,
    Pointer, FIELD_HEIGHT, FIELD_WIDTH,
};
use crate::config::GameConfig;
use crate::screen::{Canvas, Projection};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tracing::debug;

const PADDLE_WIDTH: f32 = 100.0;
const PADDLE_HEIGHT: f32 = 20.0;
const PADDLE_Y: f32 = FIELD_HEIGHT - 50.0;
const KEY_STEP: f32 = 40.0;
const ITEM_SIZE: f32 = 30.0;
const START_LIVES: u8 = 5;

pub fn spawn_interval(speed: f32) -> Duration
{
    speed_ms(1500.0, 100.0, 300.0, speed)
}

#[derive(Clone, Debug, PartialEq)]
struct Item
{
    x: f32,
    y: f32,
    speed: f32,
    asset: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Paddle
{
    x: f32,
}

impl Paddle
{
    fn centered() -> Self
    {
        Self {
            x: (FIELD_WIDTH - PADDLE_WIDTH) / 2.0,
        }
    }

    fn center_on(&mut self, x: f32)
    {
        self.x = (x - PADDLE_WIDTH / 2.0).clamp(0.0, FIELD_WIDTH - PADDLE_WIDTH);
    }

    fn center(&self) -> f32
    {
        self.x + PADDLE_WIDTH / 2.0
    }

    fn catches(&self, item: &Item) -> bool
    {
        let middle = item.x + ITEM_SIZE / 2.0;
        item.y + ITEM_SIZE >= PADDLE_Y
            && item.y <= PADDLE_Y + PADDLE_HEIGHT
            && middle >= self.x
            && middle <= self.x + PADDLE_WIDTH
    }
}

pub struct Catcher
{
    rng: StdRng,
    assets: Vec<String>,
    speed: f32,
    palette: Palette,
    paddle: Paddle,
    items: Vec<Item>,
    score: u32,
    lives: u8,
    next_spawn: Instant,
    last_update: Instant,
    over: bool,
    game_over: GameOver,
}

impl Catcher
{
    pub fn new(config: &GameConfig, game_over: GameOver, now: Instant) -> Self
    {
        Self::with_rng(config, game_over, now, StdRng::from_entropy())
    }

    pub fn with_rng(config: &GameConfig, game_over: GameOver, now: Instant, rng: StdRng) -> Self
    {
        let speed = config.speed();
        Self {
            rng,
            assets: config.assets.clone(),
            speed,
            palette: Palette::from_config(config),
            paddle: Paddle::centered(),
            items: Vec::new(),
            score: 0,
            lives: START_LIVES,
            next_spawn: now + spawn_interval(speed),
            last_update: now,
            over: false,
            game_over,
        }
    }

    fn spawn(&mut self)
    {
        let x = self.rng.gen_range(0.0..=FIELD_WIDTH - ITEM_SIZE);
        let speed = self.rng.gen_range(0.0..2.0) + self.speed * 0.5;
        let asset = if self.assets.is_empty() {
            0
        } else {
            self.rng.gen_range(0..self.assets.len())
        };
        self.items.push(Item {
            x,
            y: 0.0,
            speed,
            asset,
        });
    }

    fn finish(&mut self, score: u32)
    {
        self.over = true;
        self.items.clear();
        if self.game_over.fire(score) {
            debug!(score, "catcher session over");
        }
    }
}

impl MiniGame for Catcher
{
    fn pointer(&mut self, pointer: Pointer, _now: Instant)
    {
        if !self.over {
            self.paddle.center_on(pointer.x);
        }
    }

    fn key(&mut self, key: GameKey, _now: Instant)
    {
        if self.over {
            return;
        }
        let center = self.paddle.center();
        match key {
            GameKey::Left => self.paddle.center_on(center - KEY_STEP),
            GameKey::Right => self.paddle.center_on(center + KEY_STEP),
            _ => {}
        }
    }

    fn update(&mut self, now: Instant)
    {
        if self.over {
            return;
        }

        let frames = frames_between(self.last_update, now);
        self.last_update = now;
        for item in &mut self.items {
            item.y += item.speed * frames;
        }

        let mut index = 0;
        while index < self.items.len() {
            let caught = self.paddle.catches(&self.items[index]);
            let missed = !caught && self.items[index].y > FIELD_HEIGHT;
            if caught {
                self.items.remove(index);
                self.score += 1;
            } else if missed {
                self.items.remove(index);
                self.lives = self.lives.saturating_sub(1);
                if self.lives == 0 {
                    let score = self.score;
                    self.finish(score);
                    return;
                }
            } else {
                index += 1;
            }
        }

        if now >= self.next_spawn {
            self.spawn();
            self.next_spawn = now + spawn_interval(self.speed);
        }
    }

    fn abort(&mut self)
    {
        if !self.over {
            self.finish(0);
        }
    }

    fn is_over(&self) -> bool
    {
        self.over
    }

    fn hud(&self) -> Hud
    {
        let hearts: String = (0..START_LIVES)
            .map(|i| if i < self.lives { '♥' } else { '·' })
            .collect();
        Hud {
            score: self.score,
            status: format!("Lives: {hearts}  Falling: {}", self.items.len()),
        }
    }

    fn draw(&self, canvas: &mut Canvas, projection: &Projection)
    {
        for item in &self.items {
            let (col, row) = projection.to_cell(item.x + ITEM_SIZE / 2.0, item.y + ITEM_SIZE / 2.0);
            let glyph = asset_or_placeholder(&self.assets, item.asset);
            canvas.put_centered(col, row, glyph, Some(self.palette.text));
        }

        let (left, top) = projection.to_cell(self.paddle.x, PADDLE_Y);
        let (right, bottom) =
            projection.to_cell(self.paddle.x + PADDLE_WIDTH - 0.01, PADDLE_Y + PADDLE_HEIGHT);
        for row in top..=bottom {
            for col in left..=right {
                canvas.fill(col, row, '█', self.palette.accent);
            }
        }
    }
}
