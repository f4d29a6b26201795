use super::{
    GameKey, GameOver, Hud, MiniGame, Palette, Pointer, PointerKind, FIELD_HEIGHT, FIELD_WIDTH,
};
use crate::config::GameConfig;
use crate::screen::{lerp_color, Canvas, Projection};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tracing::debug;

const PAIRS: usize = 8;
const COLUMNS: usize = 4;
const CARD_GAP: f32 = 10.0;
const REVEAL_DELAY: Duration = Duration::from_secs(1);
const FINISH_DELAY: Duration = Duration::from_secs(1);
const MAX_SCORE: u32 = 1000;
const MOVE_PENALTY: u32 = 20;

pub fn final_score(moves: u32) -> u32
{
    MAX_SCORE.saturating_sub(moves.saturating_mul(MOVE_PENALTY))
}

/// Takes the first eight assets, pairs them up and shuffles. Repeated
/// assets are kept as-is.
pub fn build_deck(assets: &[String], rng: &mut impl Rng) -> Vec<String>
{
    let mut deck: Vec<String> = assets.iter().take(PAIRS).cloned().collect();
    deck.extend_from_within(..);
    deck.shuffle(rng);
    deck
}

#[derive(Clone, Debug, PartialEq)]
struct Card
{
    asset: String,
    face_up: bool,
    matched: bool,
}

pub struct Memory
{
    palette: Palette,
    cards: Vec<Card>,
    flipped: Vec<usize>,
    moves: u32,
    matches: u32,
    cursor: usize,
    flip_back_at: Option<Instant>,
    finish_at: Option<Instant>,
    over: bool,
    game_over: GameOver,
}

impl Memory
{
    pub fn new(config: &GameConfig, game_over: GameOver, now: Instant) -> Self
    {
        Self::with_rng(config, game_over, now, StdRng::from_entropy())
    }

    pub fn with_rng(config: &GameConfig, game_over: GameOver, now: Instant, mut rng: StdRng) -> Self
    {
        let cards: Vec<Card> = build_deck(&config.assets, &mut rng)
            .into_iter()
            .map(|asset| Card {
                asset,
                face_up: false,
                matched: false,
            })
            .collect();
        let finish_at = if cards.is_empty() {
            Some(now + FINISH_DELAY)
        } else {
            None
        };
        Self {
            palette: Palette::from_config(config),
            cards,
            flipped: Vec::with_capacity(2),
            moves: 0,
            matches: 0,
            cursor: 0,
            flip_back_at: None,
            finish_at,
            over: false,
            game_over,
        }
    }

    fn rows(&self) -> usize
    {
        self.cards.len().div_ceil(COLUMNS).max(1)
    }

    fn card_size(&self) -> (f32, f32)
    {
        (FIELD_WIDTH / COLUMNS as f32, FIELD_HEIGHT / self.rows() as f32)
    }

    fn card_at(&self, x: f32, y: f32) -> Option<usize>
    {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let (w, h) = self.card_size();
        let col = (x / w) as usize;
        let row = (y / h) as usize;
        if col >= COLUMNS {
            return None;
        }
        let index = row * COLUMNS + col;
        (index < self.cards.len()).then_some(index)
    }

    fn select(&mut self, index: usize, now: Instant)
    {
        if self.over || self.finish_at.is_some() || self.flipped.len() >= 2 {
            return;
        }
        let Some(card) = self.cards.get_mut(index) else {
            return;
        };
        if card.matched || card.face_up {
            return;
        }
        card.face_up = true;
        self.flipped.push(index);
        if self.flipped.len() < 2 {
            return;
        }

        self.moves += 1;
        let (first, second) = (self.flipped[0], self.flipped[1]);
        if self.cards[first].asset == self.cards[second].asset {
            self.cards[first].matched = true;
            self.cards[second].matched = true;
            self.matches += 1;
            self.flipped.clear();
            if self.cards.iter().all(|card| card.matched) {
                self.finish_at = Some(now + FINISH_DELAY);
            }
        } else {
            self.flip_back_at = Some(now + REVEAL_DELAY);
        }
    }

    fn finish(&mut self, score: u32)
    {
        self.over = true;
        self.flip_back_at = None;
        self.finish_at = None;
        if self.game_over.fire(score) {
            debug!(score, moves = self.moves, "memory session over");
        }
    }

    fn move_cursor(&mut self, key: GameKey)
    {
        if self.cards.is_empty() {
            return;
        }
        let last = self.cards.len() - 1;
        self.cursor = match key {
            GameKey::Left => self.cursor.saturating_sub(1),
            GameKey::Right => (self.cursor + 1).min(last),
            GameKey::Up => self.cursor.checked_sub(COLUMNS).unwrap_or(self.cursor),
            GameKey::Down => {
                let below = self.cursor + COLUMNS;
                if below <= last { below } else { self.cursor }
            }
            GameKey::Select => self.cursor,
        };
    }
}

impl MiniGame for Memory
{
    fn pointer(&mut self, pointer: Pointer, now: Instant)
    {
        if pointer.kind != PointerKind::Press {
            return;
        }
        if let Some(index) = self.card_at(pointer.x, pointer.y) {
            self.cursor = index;
            self.select(index, now);
        }
    }

    fn key(&mut self, key: GameKey, now: Instant)
    {
        match key {
            GameKey::Select => self.select(self.cursor, now),
            other => self.move_cursor(other),
        }
    }

    fn update(&mut self, now: Instant)
    {
        if self.over {
            return;
        }
        if self.flip_back_at.is_some_and(|at| now >= at) {
            for index in self.flipped.drain(..) {
                self.cards[index].face_up = false;
            }
            self.flip_back_at = None;
        }
        if self.finish_at.is_some_and(|at| now >= at) {
            let score = final_score(self.moves);
            self.finish(score);
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
            score: final_score(self.moves),
            status: format!(
                "Moves: {}  Pairs: {}/{}",
                self.moves,
                self.matches,
                self.cards.len() / 2
            ),
        }
    }

    fn draw(&self, canvas: &mut Canvas, projection: &Projection)
    {
        let (w, h) = self.card_size();
        for (index, card) in self.cards.iter().enumerate() {
            let left = (index % COLUMNS) as f32 * w + CARD_GAP;
            let top = (index / COLUMNS) as f32 * h + CARD_GAP;
            let right = left + w - 2.0 * CARD_GAP;
            let bottom = top + h - 2.0 * CARD_GAP;

            let mut fill = if card.matched {
                lerp_color(self.palette.accent, self.palette.background, 0.5)
            } else if card.face_up {
                self.palette.secondary
            } else {
                self.palette.primary
            };
            if index == self.cursor && !self.over {
                fill = lerp_color(fill, self.palette.text, 0.35);
            }

            let (min_col, min_row) = projection.to_cell(left, top);
            let (max_col, max_row) = projection.to_cell(right, bottom);
            for row in min_row..=max_row {
                for col in min_col..=max_col {
                    canvas.tint(col, row, fill);
                }
            }

            let (col, row) = projection.to_cell((left + right) / 2.0, (top + bottom) / 2.0);
            let face = if card.face_up || card.matched {
                card.asset.as_str()
            } else {
                "?"
            };
            canvas.put_centered(col, row, face, Some(self.palette.text));
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::games::test_support::recorder;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn assets(n: usize) -> Vec<String>
    {
        (0..n).map(|i| format!("a{i}")).collect()
    }

    fn config_with(assets: Vec<String>) -> GameConfig
    {
        let mut config = GameConfig::fallback();
        config.assets = assets;
        config
    }

    fn session(
        config: &GameConfig,
        now: Instant,
    ) -> (Memory, std::rc::Rc<std::cell::RefCell<Vec<u32>>>)
    {
        let (game_over, calls) = recorder();
        let memory = Memory::with_rng(config, game_over, now, StdRng::seed_from_u64(3));
        (memory, calls)
    }

    fn counts(deck: &[String]) -> HashMap<&str, usize>
    {
        let mut counts = HashMap::new();
        for asset in deck {
            *counts.entry(asset.as_str()).or_insert(0) += 1;
        }
        counts
    }

    // Indices of the two cards holding each asset, in asset order.
    fn pairs(memory: &Memory) -> Vec<(usize, usize)>
    {
        let mut seen: Vec<(String, usize)> = Vec::new();
        let mut pairs = Vec::new();
        for (index, card) in memory.cards.iter().enumerate() {
            if let Some(pos) = seen.iter().position(|(asset, _)| *asset == card.asset) {
                let (_, first) = seen.remove(pos);
                pairs.push((first, index));
            } else {
                seen.push((card.asset.clone(), index));
            }
        }
        pairs
    }

    fn mismatch(memory: &Memory) -> (usize, usize)
    {
        let first = 0;
        let second = memory
            .cards
            .iter()
            .position(|card| card.asset != memory.cards[first].asset)
            .unwrap();
        (first, second)
    }

    proptest! {
        #[test]
        fn deck_pairs_every_asset(len in 8usize..=20, seed in 0u64..500) {
            let mut rng = StdRng::seed_from_u64(seed);
            let deck = build_deck(&assets(len), &mut rng);
            prop_assert_eq!(deck.len(), 16);
            let counts = counts(&deck);
            prop_assert_eq!(counts.len(), 8);
            prop_assert!(counts.values().all(|&count| count == 2));
        }
    }

    #[test]
    fn short_asset_list_gives_smaller_deck()
    {
        let mut rng = StdRng::seed_from_u64(1);
        let deck = build_deck(&assets(3), &mut rng);
        assert_eq!(deck.len(), 6);
        assert!(counts(&deck).values().all(|&count| count == 2));
    }

    #[test]
    fn repeated_assets_are_not_deduplicated()
    {
        let mut rng = StdRng::seed_from_u64(1);
        let mut list = assets(8);
        list[1] = "a0".to_string();
        let deck = build_deck(&list, &mut rng);
        assert_eq!(deck.len(), 16);
        assert_eq!(counts(&deck)["a0"], 4);
    }

    #[test]
    fn matching_pair_stays_up()
    {
        let t0 = Instant::now();
        let (mut memory, _) = session(&config_with(assets(12)), t0);
        let (a, b) = pairs(&memory)[0];
        memory.select(a, t0);
        memory.select(b, t0);
        assert_eq!(memory.moves, 1);
        assert_eq!(memory.matches, 1);
        assert!(memory.cards[a].matched && memory.cards[b].matched);
        assert!(memory.flipped.is_empty());
        assert!(memory.flip_back_at.is_none());
    }

    #[test]
    fn mismatch_flips_back_after_delay()
    {
        let t0 = Instant::now();
        let (mut memory, _) = session(&config_with(assets(12)), t0);
        let (a, b) = mismatch(&memory);
        memory.select(a, t0);
        memory.select(b, t0);
        assert_eq!(memory.moves, 1);
        assert_eq!(memory.matches, 0);

        memory.update(t0 + Duration::from_millis(999));
        assert!(memory.cards[a].face_up && memory.cards[b].face_up);

        memory.update(t0 + REVEAL_DELAY);
        assert!(!memory.cards[a].face_up && !memory.cards[b].face_up);
        assert!(memory.flipped.is_empty());
    }

    #[test]
    fn third_card_waits_for_resolution()
    {
        let t0 = Instant::now();
        let (mut memory, _) = session(&config_with(assets(12)), t0);
        let (a, b) = mismatch(&memory);
        memory.select(a, t0);
        memory.select(b, t0);
        let third = (0..memory.cards.len()).find(|i| *i != a && *i != b).unwrap();
        memory.select(third, t0);
        assert!(!memory.cards[third].face_up);
        assert_eq!(memory.moves, 1);

        memory.update(t0 + REVEAL_DELAY);
        memory.select(third, t0 + REVEAL_DELAY);
        assert!(memory.cards[third].face_up);
    }

    #[test]
    fn same_card_twice_is_not_a_move()
    {
        let t0 = Instant::now();
        let (mut memory, _) = session(&config_with(assets(12)), t0);
        memory.select(0, t0);
        memory.select(0, t0);
        assert_eq!(memory.moves, 0);
        assert_eq!(memory.flipped, vec![0]);
    }

    #[test]
    fn clearing_the_board_scores_once()
    {
        let t0 = Instant::now();
        let (mut memory, calls) = session(&config_with(assets(12)), t0);
        let (a, b) = mismatch(&memory);
        memory.select(a, t0);
        memory.select(b, t0);
        memory.update(t0 + REVEAL_DELAY);

        let done = t0 + REVEAL_DELAY;
        for (a, b) in pairs(&memory) {
            memory.select(a, done);
            memory.select(b, done);
        }
        assert_eq!(memory.moves, 9);
        assert_eq!(memory.matches, 8);
        assert!(!memory.is_over());

        memory.update(done + Duration::from_millis(500));
        assert!(calls.borrow().is_empty());
        memory.update(done + FINISH_DELAY);
        assert!(memory.is_over());
        memory.update(done + FINISH_DELAY * 2);
        memory.abort();
        assert_eq!(*calls.borrow(), vec![1000 - 9 * 20]);
    }

    #[test]
    fn score_never_goes_negative()
    {
        assert_eq!(final_score(0), 1000);
        assert_eq!(final_score(49), 20);
        assert_eq!(final_score(50), 0);
        assert_eq!(final_score(500), 0);
        assert_eq!(final_score(u32::MAX), 0);
    }

    #[test]
    fn empty_assets_finish_with_full_score()
    {
        let t0 = Instant::now();
        let (mut memory, calls) = session(&config_with(Vec::new()), t0);
        assert!(memory.cards.is_empty());
        memory.key(GameKey::Right, t0);
        memory.key(GameKey::Select, t0);
        memory.update(t0 + FINISH_DELAY);
        assert_eq!(*calls.borrow(), vec![1000]);
    }

    #[test]
    fn abort_reports_zero()
    {
        let t0 = Instant::now();
        let (mut memory, calls) = session(&config_with(assets(8)), t0);
        memory.abort();
        assert!(memory.is_over());
        assert_eq!(*calls.borrow(), vec![0]);
    }

    #[test]
    fn pointer_selects_card_under_it()
    {
        let t0 = Instant::now();
        let (mut memory, _) = session(&config_with(assets(8)), t0);
        // 16 cards: 4 columns of 200 x 4 rows of 150.
        memory.pointer(
            Pointer {
                kind: PointerKind::Press,
                x: 450.0,
                y: 200.0,
            },
            t0,
        );
        assert_eq!(memory.cursor, 6);
        assert!(memory.cards[6].face_up);
        assert_eq!(memory.card_at(900.0, 10.0), None);
        assert_eq!(memory.card_at(10.0, 700.0), None);
    }

    #[test]
    fn cursor_moves_within_grid()
    {
        let t0 = Instant::now();
        let (mut memory, _) = session(&config_with(assets(5)), t0);
        // 10 cards: rows of 4, 4, 2.
        memory.key(GameKey::Up, t0);
        assert_eq!(memory.cursor, 0);
        memory.key(GameKey::Down, t0);
        memory.key(GameKey::Down, t0);
        assert_eq!(memory.cursor, 8);
        memory.key(GameKey::Right, t0);
        memory.key(GameKey::Right, t0);
        assert_eq!(memory.cursor, 9);
        memory.key(GameKey::Down, t0);
        assert_eq!(memory.cursor, 9);
        memory.key(GameKey::Select, t0);
        assert!(memory.cards[9].face_up);
    }
}
