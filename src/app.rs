use crate::config::GameConfig;
use crate::error::Result;
use crate::games::{
    self, GameKey, Hud, MiniGame, Palette, Pointer, PointerKind, FIELD_HEIGHT, FIELD_WIDTH,
};
use crate::generator::{generate_or_fallback, SharedSource};
use crate::screen::{
    clip, layout_metrics, paint, present, Canvas, Projection, TerminalGuard, HEADER_LINES,
};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use std::cell::Cell;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use unicode_width::UnicodeWidthStr;

const TICK_MS: u64 = 33;
const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

pub const MOODS: [&str; 8] = [
    "Happy", "Sad", "Angry", "Calm", "Excited", "Anxious", "Bored", "Curious",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen
{
    MoodSelect,
    Loading,
    Playing,
    GameOver,
}

/// Owns the mood, the generated config and the last score, and only moves
/// between screens along the allowed transitions.
#[derive(Debug)]
pub struct Orchestrator
{
    screen: Screen,
    mood: Option<String>,
    config: Option<GameConfig>,
    score: Option<u32>,
}

impl Default for Orchestrator
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl Orchestrator
{
    pub fn new() -> Self
    {
        Self {
            screen: Screen::MoodSelect,
            mood: None,
            config: None,
            score: None,
        }
    }

    pub fn screen(&self) -> Screen
    {
        self.screen
    }

    pub fn mood(&self) -> Option<&str>
    {
        self.mood.as_deref()
    }

    pub fn config(&self) -> Option<&GameConfig>
    {
        self.config.as_ref()
    }

    pub fn score(&self) -> Option<u32>
    {
        self.score
    }

    pub fn select_mood(&mut self, mood: &str) -> bool
    {
        if !self.require(Screen::MoodSelect, "select_mood") {
            return false;
        }
        info!(mood, "mood selected");
        self.mood = Some(mood.to_string());
        self.screen = Screen::Loading;
        true
    }

    pub fn config_ready(&mut self, config: GameConfig) -> bool
    {
        if !self.require(Screen::Loading, "config_ready") {
            return false;
        }
        info!(game = %config.game_type, title = %config.title, "starting session");
        self.config = Some(config);
        self.screen = Screen::Playing;
        true
    }

    pub fn finish(&mut self, score: u32) -> bool
    {
        if !self.require(Screen::Playing, "finish") {
            return false;
        }
        info!(score, "session finished");
        self.score = Some(score);
        self.screen = Screen::GameOver;
        true
    }

    pub fn play_again(&mut self) -> bool
    {
        if !self.require(Screen::GameOver, "play_again") {
            return false;
        }
        self.score = None;
        self.screen = Screen::Playing;
        true
    }

    pub fn new_mood(&mut self) -> bool
    {
        if !self.require(Screen::GameOver, "new_mood") {
            return false;
        }
        self.mood = None;
        self.config = None;
        self.score = None;
        self.screen = Screen::MoodSelect;
        true
    }

    fn require(&self, screen: Screen, action: &str) -> bool
    {
        if self.screen != screen {
            warn!(?screen, current = ?self.screen, action, "ignored screen transition");
            return false;
        }
        true
    }
}

/// A mounted mini-game plus the slot its game-over callback reports into.
pub struct Round
{
    session: Box<dyn MiniGame>,
    reported: Rc<Cell<Option<u32>>>,
}

impl Round
{
    pub fn mount(config: &GameConfig, now: Instant) -> Self
    {
        let reported = Rc::new(Cell::new(None));
        let sink = Rc::clone(&reported);
        let session = games::mount(config, move |score| sink.set(Some(score)), now);
        Self { session, reported }
    }

    pub fn session(&mut self) -> &mut dyn MiniGame
    {
        self.session.as_mut()
    }

    pub fn result(&self) -> Option<u32>
    {
        self.reported.get()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoodChoice
{
    Quit,
    Mood(String),
}

pub fn parse_mood_choice(input: &str) -> MoodChoice
{
    let choice = input.trim();
    if choice.is_empty() {
        return MoodChoice::Mood(MOODS[0].to_string());
    }
    if choice.eq_ignore_ascii_case("q") {
        return MoodChoice::Quit;
    }
    if let Ok(index) = choice.parse::<usize>() {
        if index >= 1 && index <= MOODS.len() {
            return MoodChoice::Mood(MOODS[index - 1].to_string());
        }
    }
    MoodChoice::Mood(choice.to_string())
}

fn prompt_mood() -> Result<MoodChoice>
{
    println!("Mood Arcade");
    println!();
    println!("How are you feeling?");
    for (idx, mood) in MOODS.iter().enumerate() {
        println!("  {}. {}", idx + 1, mood);
    }
    println!();
    print!("Enter a number or type your own mood (default 1, q to quit): ");
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(MoodChoice::Quit);
    }
    Ok(parse_mood_choice(&input))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AfterGame
{
    PlayAgain,
    NewMood,
    Quit,
}

pub fn run(source: SharedSource, mut next_mood: Option<String>) -> Result<()>
{
    let mut orchestrator = Orchestrator::new();
    loop {
        let mood = match next_mood.take() {
            Some(mood) => mood,
            None => match prompt_mood()? {
                MoodChoice::Mood(mood) => mood,
                MoodChoice::Quit => return Ok(()),
            },
        };
        orchestrator.select_mood(&mood);

        let mut term = TerminalGuard::enter()?;
        let Some(config) = wait_for_config(&mut term, &source, &mood)? else {
            return Ok(());
        };
        orchestrator.config_ready(config);

        loop {
            let Some(config) = orchestrator.config().cloned() else {
                break;
            };
            let (score, quit) = play(&mut term, &config, &mood)?;
            orchestrator.finish(score);
            if quit {
                return Ok(());
            }
            match game_over_screen(&mut term, &orchestrator)? {
                AfterGame::PlayAgain => {
                    orchestrator.play_again();
                }
                AfterGame::NewMood => {
                    orchestrator.new_mood();
                    break;
                }
                AfterGame::Quit => return Ok(()),
            }
        }
    }
}

/// Starts config generation for `mood` on a worker thread.
pub fn spawn_generation(source: &SharedSource, mood: &str) -> Receiver<GameConfig>
{
    let (tx, rx) = mpsc::channel();
    let worker_source = Arc::clone(source);
    let worker_mood = mood.to_string();
    thread::spawn(move || {
        let config = generate_or_fallback(worker_source.as_ref(), &worker_mood);
        let _ = tx.send(config);
    });
    rx
}

/// `None` while the worker is still busy. A worker that died without
/// answering yields the fallback config.
pub fn poll_generation(rx: &Receiver<GameConfig>) -> Option<GameConfig>
{
    match rx.try_recv() {
        Ok(config) => Some(config),
        Err(TryRecvError::Empty) => None,
        Err(TryRecvError::Disconnected) => {
            warn!("config worker vanished, using fallback");
            Some(GameConfig::fallback())
        }
    }
}

fn wait_for_config(
    term: &mut TerminalGuard,
    source: &SharedSource,
    mood: &str,
) -> Result<Option<GameConfig>>
{
    let rx = spawn_generation(source, mood);
    let start = Instant::now();
    let mut last_tick: Option<Instant> = None;
    loop {
        if let Some(config) = poll_generation(&rx) {
            return Ok(Some(config));
        }

        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                if is_quit_key(&key) || key.code == KeyCode::Esc {
                    return Ok(None);
                }
            }
        }

        if last_tick.is_none_or(|tick| tick.elapsed() >= Duration::from_millis(TICK_MS)) {
            let frame = (start.elapsed().as_millis() / 120) as usize % SPINNER.len();
            let (width, _) = layout_metrics();
            let lines = vec![
                "Mood Arcade".to_string(),
                String::new(),
                clip(
                    &format!("{} Dreaming up a game for \"{}\"...", SPINNER[frame], mood),
                    width,
                ),
                String::new(),
                "ESC to quit".to_string(),
            ];
            present(term.stdout(), &lines)?;
            last_tick = Some(Instant::now());
        }

        thread::sleep(Duration::from_millis(5));
    }
}

fn play(term: &mut TerminalGuard, config: &GameConfig, mood: &str) -> Result<(u32, bool)>
{
    let palette = Palette::from_config(config);
    let mut round = Round::mount(config, Instant::now());
    let mut last_tick: Option<Instant> = None;
    let mut quit = false;

    loop {
        let now = Instant::now();
        let (width, field_height) = layout_metrics();
        let projection = Projection::new(width, field_height, FIELD_WIDTH, FIELD_HEIGHT);

        quit |= handle_input(round.session(), &projection, now)?;
        round.session().update(now);
        if let Some(score) = round.result() {
            return Ok((score, quit));
        }

        if last_tick.is_none_or(|tick| tick.elapsed() >= Duration::from_millis(TICK_MS)) {
            let session = round.session();
            let hud = session.hud();
            let mut canvas = Canvas::new(width, field_height, Some(palette.background));
            session.draw(&mut canvas, &projection);
            let lines = play_frame(config, mood, &palette, &hud, &canvas, width);
            present(term.stdout(), &lines)?;
            last_tick = Some(Instant::now());
        }

        thread::sleep(Duration::from_millis(1));
    }
}

/// Lays out one playing frame: header, playfield rows, separator, footer.
/// Text lines are clipped to `width` so none of them wraps.
fn play_frame(
    config: &GameConfig,
    mood: &str,
    palette: &Palette,
    hud: &Hud,
    canvas: &Canvas,
    width: usize,
) -> Vec<String>
{
    let tag = format!("  ({mood} / {})", config.game_type);
    let title = clip(&config.title, width);
    let tag = clip(&tag, width - title.width());

    let mut lines = Vec::new();
    lines.push(format!("{}{}", paint(&title, palette.accent), paint(&tag, palette.secondary)));
    lines.push(clip(&config.description, width));
    lines.push(clip(&format!("Score: {:>5}  {}", hud.score, hud.status), width));
    lines.extend(canvas.rows());
    lines.push(paint(&"=".repeat(width), palette.primary));
    lines.push(clip(&config.instructions, width));
    lines.push(clip("Controls: mouse or arrows + enter, ESC to give up", width));
    lines
}

// Returns true when the player asked to leave the app entirely.
fn handle_input(session: &mut dyn MiniGame, projection: &Projection, now: Instant) -> Result<bool>
{
    let mut quit = false;
    while event::poll(Duration::from_millis(0))? {
        match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                if is_quit_key(&key) {
                    session.abort();
                    quit = true;
                } else if key.code == KeyCode::Esc {
                    session.abort();
                } else if let Some(game_key) = game_key(key.code) {
                    session.key(game_key, now);
                }
            }
            Event::Mouse(mouse) => {
                if let Some(pointer) = pointer_from_mouse(&mouse, projection) {
                    session.pointer(pointer, now);
                }
            }
            _ => {}
        }
    }
    Ok(quit)
}

fn is_quit_key(key: &KeyEvent) -> bool
{
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

pub fn game_key(code: KeyCode) -> Option<GameKey>
{
    match code {
        KeyCode::Left => Some(GameKey::Left),
        KeyCode::Right => Some(GameKey::Right),
        KeyCode::Up => Some(GameKey::Up),
        KeyCode::Down => Some(GameKey::Down),
        KeyCode::Enter | KeyCode::Char(' ') => Some(GameKey::Select),
        _ => None,
    }
}

/// Converts a terminal mouse event into playfield coordinates. Presses
/// outside the playfield are dropped; movement is clamped onto it.
pub fn pointer_from_mouse(mouse: &MouseEvent, projection: &Projection) -> Option<Pointer>
{
    let kind = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => PointerKind::Press,
        MouseEventKind::Moved | MouseEventKind::Drag(MouseButton::Left) => PointerKind::Move,
        _ => return None,
    };
    let col = mouse.column as usize;
    let row = (mouse.row as usize).checked_sub(HEADER_LINES);
    let inside = col < projection.cols && row.is_some_and(|row| row < projection.rows);
    if kind == PointerKind::Press && !inside {
        return None;
    }
    let col = col.min(projection.cols - 1);
    let row = row.unwrap_or(0).min(projection.rows - 1);
    let (x, y) = projection.to_field(col, row);
    Some(Pointer { kind, x, y })
}

fn game_over_screen(term: &mut TerminalGuard, orchestrator: &Orchestrator) -> Result<AfterGame>
{
    let score = orchestrator.score().unwrap_or(0);
    let title = orchestrator
        .config()
        .map(|config| config.title.as_str())
        .unwrap_or("Mood Arcade");
    let (width, _) = layout_metrics();
    let lines = vec![
        "Game over".to_string(),
        String::new(),
        clip(&format!("Mood: {}", orchestrator.mood().unwrap_or("-")), width),
        clip(&format!("Game: {title}"), width),
        format!("Score: {score}"),
        String::new(),
        "ENTER/SPACE play again   N new mood   Q/ESC quit".to_string(),
    ];
    present(term.stdout(), &lines)?;

    while event::poll(Duration::from_millis(0))? {
        let _ = event::read()?;
    }

    loop {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                if is_quit_key(&key) {
                    return Ok(AfterGame::Quit);
                }
                match key.code {
                    KeyCode::Enter | KeyCode::Char(' ') => return Ok(AfterGame::PlayAgain),
                    KeyCode::Char('n') | KeyCode::Char('N') => return Ok(AfterGame::NewMood),
                    KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => {
                        return Ok(AfterGame::Quit)
                    }
                    _ => {}
                }
            }
        }
    }
}
