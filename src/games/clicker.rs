use super::{
    asset_or_placeholder, frames_between, speed_ms, GameKey, GameOver, Hud, MiniGame, Palette,
    Pointer, PointerKind, FIELD_HEIGHT, FIELD_WIDTH,
};
use crate::config::GameConfig;
use crate::screen::{lerp_color, Canvas, Projection};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tracing::debug;

const MAX_RADIUS: f32 = 40.0;
const START_LIFE: f32 = 100.0;
const GROWTH_PER_FRAME: f32 = 0.5;
const DECAY_PER_FRAME: f32 = 0.5;
const HIT_POINTS: u32 = 10;
const ROUND_SECONDS: u32 = 30;
const TICK: Duration = Duration::from_secs(1);

pub fn spawn_interval(speed: f32) -> Duration
{
    speed_ms(1000.0, 80.0, 200.0, speed)
}

#[derive(Clone, Debug, PartialEq)]
struct Target
{
    x: f32,
    y: f32,
    radius: f32,
    life: f32,
    asset: usize,
}

impl Target
{
    fn contains(&self, x: f32, y: f32) -> bool
    {
        let dx = x - self.x;
        let dy = y - self.y;
        (dx * dx + dy * dy).sqrt() <= self.radius
    }
}

pub struct Clicker
{
    rng: StdRng,
    assets: Vec<String>,
    speed: f32,
    palette: Palette,
    targets: Vec<Target>,
    score: u32,
    time_left: u32,
    next_tick: Instant,
    next_spawn: Instant,
    last_update: Instant,
    over: bool,
    game_over: GameOver,
}

impl Clicker
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
            targets: Vec::new(),
            score: 0,
            time_left: ROUND_SECONDS,
            next_tick: now + TICK,
            next_spawn: now + spawn_interval(speed),
            last_update: now,
            over: false,
            game_over,
        }
    }

    fn spawn(&mut self)
    {
        let x = self.rng.gen_range(MAX_RADIUS..=FIELD_WIDTH - MAX_RADIUS);
        let y = self.rng.gen_range(MAX_RADIUS..=FIELD_HEIGHT - MAX_RADIUS);
        let asset = if self.assets.is_empty() {
            0
        } else {
            self.rng.gen_range(0..self.assets.len())
        };
        self.targets.push(Target {
            x,
            y,
            radius: 0.0,
            life: START_LIFE,
            asset,
        });
    }

    fn finish(&mut self, score: u32)
    {
        self.over = true;
        self.targets.clear();
        if self.game_over.fire(score) {
            debug!(score, "clicker session over");
        }
    }
}

impl MiniGame for Clicker
{
    fn pointer(&mut self, pointer: Pointer, _now: Instant)
    {
        if self.over || pointer.kind != PointerKind::Press {
            return;
        }
        if let Some(index) = self
            .targets
            .iter()
            .position(|target| target.contains(pointer.x, pointer.y))
        {
            self.targets.remove(index);
            self.score += HIT_POINTS;
        }
    }

    fn key(&mut self, _key: GameKey, _now: Instant) {}

    fn update(&mut self, now: Instant)
    {
        if self.over {
            return;
        }

        while now >= self.next_tick && self.time_left > 0 {
            self.time_left -= 1;
            self.next_tick += TICK;
        }
        if self.time_left == 0 {
            let score = self.score;
            self.finish(score);
            return;
        }

        let frames = frames_between(self.last_update, now);
        self.last_update = now;
        let rate = self.speed / 5.0;
        for target in &mut self.targets {
            target.radius = (target.radius + GROWTH_PER_FRAME * rate * frames).min(MAX_RADIUS);
            target.life -= DECAY_PER_FRAME * rate * frames;
        }
        self.targets.retain(|target| target.life > 0.0);

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
        Hud {
            score: self.score,
            status: format!("Time left: {:>2}s  Targets: {}", self.time_left, self.targets.len()),
        }
    }

    fn draw(&self, canvas: &mut Canvas, projection: &Projection)
    {
        for target in &self.targets {
            let fade = 1.0 - (target.life / START_LIFE).clamp(0.0, 1.0);
            let fill = lerp_color(self.palette.primary, self.palette.background, fade * 0.8);
            let r = target.radius;
            let (min_col, min_row) = projection.to_cell(target.x - r, target.y - r);
            let (max_col, max_row) = projection.to_cell(target.x + r, target.y + r);
            for row in min_row..=max_row {
                for col in min_col..=max_col {
                    let (x, y) = projection.to_field(col, row);
                    if target.contains(x, y) {
                        canvas.tint(col, row, fill);
                    }
                }
            }
            let (col, row) = projection.to_cell(target.x, target.y);
            let glyph = asset_or_placeholder(&self.assets, target.asset);
            canvas.put_centered(col, row, glyph, Some(self.palette.text));
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::games::test_support::recorder;
    use proptest::prelude::*;

    fn session(now: Instant) -> (Clicker, std::rc::Rc<std::cell::RefCell<Vec<u32>>>)
    {
        let (game_over, calls) = recorder();
        let clicker = Clicker::with_rng(
            &GameConfig::fallback(),
            game_over,
            now,
            StdRng::seed_from_u64(7),
        );
        (clicker, calls)
    }

    fn press(x: f32, y: f32) -> Pointer
    {
        Pointer {
            kind: PointerKind::Press,
            x,
            y,
        }
    }

    fn target_at(x: f32, y: f32, radius: f32) -> Target
    {
        Target {
            x,
            y,
            radius,
            life: START_LIFE,
            asset: 0,
        }
    }

    proptest! {
        #[test]
        fn spawn_interval_matches_formula(speed in 1u32..=10) {
            let expected = (1000i64 - 80 * speed as i64).max(200) as u128;
            prop_assert_eq!(spawn_interval(speed as f32).as_millis(), expected);
        }
    }

    #[test]
    fn spawn_interval_floor()
    {
        assert_eq!(spawn_interval(10.0), Duration::from_millis(200));
        assert_eq!(spawn_interval(20.0), Duration::from_millis(200));
        assert_eq!(spawn_interval(5.0), Duration::from_millis(600));
    }

    #[test]
    fn spawns_after_one_interval()
    {
        let t0 = Instant::now();
        let (mut clicker, _) = session(t0);
        clicker.update(t0 + Duration::from_millis(599));
        assert!(clicker.targets.is_empty());
        clicker.update(t0 + Duration::from_millis(600));
        assert_eq!(clicker.targets.len(), 1);
        let target = &clicker.targets[0];
        assert_eq!(target.radius, 0.0);
        assert_eq!(target.life, START_LIFE);
        assert!(target.x >= MAX_RADIUS && target.x <= FIELD_WIDTH - MAX_RADIUS);
        assert!(target.y >= MAX_RADIUS && target.y <= FIELD_HEIGHT - MAX_RADIUS);
        assert!(target.asset < clicker.assets.len());
    }

    #[test]
    fn targets_grow_to_max_radius()
    {
        let t0 = Instant::now();
        let (mut clicker, _) = session(t0);
        clicker.next_spawn = t0 + Duration::from_secs(60);
        clicker.targets.push(target_at(400.0, 300.0, 0.0));

        clicker.update(t0 + Duration::from_millis(500));
        let radius = clicker.targets[0].radius;
        assert!(radius > 14.0 && radius < 16.0, "radius {radius}");

        clicker.update(t0 + Duration::from_millis(2000));
        assert_eq!(clicker.targets[0].radius, MAX_RADIUS);
    }

    #[test]
    fn hit_scores_ten_and_removes_target()
    {
        let t0 = Instant::now();
        let (mut clicker, _) = session(t0);
        clicker.targets.push(target_at(200.0, 200.0, 30.0));
        clicker.pointer(press(220.0, 215.0), t0);
        assert_eq!(clicker.score, HIT_POINTS);
        assert!(clicker.targets.is_empty());
    }

    #[test]
    fn miss_changes_nothing()
    {
        let t0 = Instant::now();
        let (mut clicker, _) = session(t0);
        clicker.targets.push(target_at(200.0, 200.0, 10.0));
        clicker.pointer(press(220.0, 200.0), t0);
        assert_eq!(clicker.score, 0);
        assert_eq!(clicker.targets.len(), 1);
    }

    #[test]
    fn overlapping_targets_lose_the_oldest_first()
    {
        let t0 = Instant::now();
        let (mut clicker, _) = session(t0);
        clicker.targets.push(target_at(100.0, 100.0, 40.0));
        clicker.targets.push(target_at(110.0, 100.0, 40.0));
        clicker.pointer(press(105.0, 100.0), t0);
        assert_eq!(clicker.score, HIT_POINTS);
        assert_eq!(clicker.targets, vec![target_at(110.0, 100.0, 40.0)]);
    }

    #[test]
    fn pointer_move_never_hits()
    {
        let t0 = Instant::now();
        let (mut clicker, _) = session(t0);
        clicker.targets.push(target_at(100.0, 100.0, 40.0));
        clicker.pointer(
            Pointer {
                kind: PointerKind::Move,
                x: 100.0,
                y: 100.0,
            },
            t0,
        );
        assert_eq!(clicker.targets.len(), 1);
    }

    #[test]
    fn faded_target_is_removed_without_score()
    {
        let t0 = Instant::now();
        let (mut clicker, _) = session(t0);
        clicker.next_spawn = t0 + Duration::from_secs(60);
        clicker.targets.push(target_at(400.0, 300.0, 0.0));

        // 100 life at 0.5 per frame lasts 200 frames, about 3.33s.
        clicker.update(t0 + Duration::from_secs(3));
        assert_eq!(clicker.targets.len(), 1);
        clicker.update(t0 + Duration::from_millis(3400));
        assert!(clicker.targets.is_empty());
        assert_eq!(clicker.score, 0);
    }

    #[test]
    fn countdown_reports_score_once()
    {
        let t0 = Instant::now();
        let (mut clicker, calls) = session(t0);
        clicker.score = 70;
        clicker.update(t0 + Duration::from_secs(29));
        assert!(!clicker.is_over());
        assert_eq!(clicker.time_left, 1);

        clicker.update(t0 + Duration::from_secs(30));
        assert!(clicker.is_over());
        clicker.update(t0 + Duration::from_secs(31));
        clicker.abort();
        assert_eq!(*calls.borrow(), vec![70]);
    }

    #[test]
    fn abort_reports_zero()
    {
        let t0 = Instant::now();
        let (mut clicker, calls) = session(t0);
        clicker.score = 120;
        clicker.abort();
        assert!(clicker.is_over());
        assert_eq!(*calls.borrow(), vec![0]);
    }

    #[test]
    fn empty_assets_do_not_panic()
    {
        let t0 = Instant::now();
        let mut config = GameConfig::fallback();
        config.assets.clear();
        let (game_over, _) = recorder();
        let mut clicker = Clicker::with_rng(&config, game_over, t0, StdRng::seed_from_u64(1));
        clicker.update(t0 + Duration::from_secs(1));
        assert_eq!(clicker.targets.len(), 1);

        let mut canvas = Canvas::new(80, 20, None);
        clicker.targets[0].radius = MAX_RADIUS;
        clicker.draw(&mut canvas, &Projection::new(80, 20, FIELD_WIDTH, FIELD_HEIGHT));
    }
}
