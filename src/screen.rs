use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use std::io::{self, Stdout, Write};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const HEADER_LINES: usize = 3;
pub const FOOTER_LINES: usize = 2;

pub struct TerminalGuard
{
    stdout: Stdout,
}

impl TerminalGuard
{
    pub fn enter() -> io::Result<Self>
    {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture, Hide)?;
        Ok(Self { stdout })
    }

    pub fn stdout(&mut self) -> &mut Stdout
    {
        &mut self.stdout
    }
}

impl Drop for TerminalGuard
{
    fn drop(&mut self)
    {
        let _ = execute!(self.stdout, Show, DisableMouseCapture, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb
{
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb
{
    pub const fn new(r: u8, g: u8, b: u8) -> Self
    {
        Self { r, g, b }
    }

    /// Accepts `#rgb` and `#rrggbb` (the leading `#` is optional).
    pub fn parse(value: &str) -> Option<Self>
    {
        let hex = value.trim().trim_start_matches('#');
        if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let r = channel(&hex[0..1])?;
                let g = channel(&hex[1..2])?;
                let b = channel(&hex[2..3])?;
                Some(Self::new(r * 17, g * 17, b * 17))
            }
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => None,
        }
    }

    pub fn parse_or(value: &str, default: Rgb) -> Self
    {
        Self::parse(value).unwrap_or(default)
    }
}

pub fn lerp_color(start: Rgb, end: Rgb, t: f32) -> Rgb
{
    let t = t.clamp(0.0, 1.0);
    Rgb {
        r: lerp(start.r as f32, end.r as f32, t) as u8,
        g: lerp(start.g as f32, end.g as f32, t) as u8,
        b: lerp(start.b as f32, end.b as f32, t) as u8,
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32
{
    a + (b - a) * t
}

#[derive(Clone, Debug, PartialEq)]
struct Cell
{
    // Empty text marks the right half of a wide glyph.
    text: String,
    fg: Option<Rgb>,
    bg: Option<Rgb>,
}

impl Cell
{
    fn blank(bg: Option<Rgb>) -> Self
    {
        Self {
            text: " ".to_string(),
            fg: None,
            bg,
        }
    }
}

pub struct Canvas
{
    width: usize,
    height: usize,
    background: Option<Rgb>,
    cells: Vec<Cell>,
}

impl Canvas
{
    pub fn new(width: usize, height: usize, background: Option<Rgb>) -> Self
    {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            background,
            cells: vec![Cell::blank(background); width * height],
        }
    }

    pub fn fill(&mut self, col: usize, row: usize, ch: char, color: Rgb)
    {
        self.put_str(col, row, ch.encode_utf8(&mut [0u8; 4]), Some(color));
    }

    pub fn tint(&mut self, col: usize, row: usize, bg: Rgb)
    {
        if let Some(cell) = self.cell_mut(col, row) {
            cell.bg = Some(bg);
        }
    }

    /// Writes `text` starting at the given cell, clipping at the right edge.
    /// Wide glyphs take two cells; zero-width characters attach to the
    /// previous glyph.
    pub fn put_str(&mut self, col: usize, row: usize, text: &str, fg: Option<Rgb>)
    {
        if row >= self.height {
            return;
        }
        let mut x = col;
        let mut last: Option<usize> = None;
        for ch in text.chars() {
            let w = ch.width().unwrap_or(0);
            if w == 0 {
                if let Some(prev) = last {
                    let index = row * self.width + prev;
                    self.cells[index].text.push(ch);
                }
                continue;
            }
            if x + w > self.width {
                break;
            }
            self.release(x, row);
            if w == 2 {
                self.release(x + 1, row);
            }
            let bg = self.cells[row * self.width + x].bg;
            self.cells[row * self.width + x] = Cell {
                text: ch.to_string(),
                fg,
                bg,
            };
            if w == 2 {
                let index = row * self.width + x + 1;
                self.cells[index].text.clear();
                self.cells[index].bg = bg;
            }
            last = Some(x);
            x += w;
        }
    }

    /// Writes `text` centered on `col`.
    pub fn put_centered(&mut self, col: usize, row: usize, text: &str, fg: Option<Rgb>)
    {
        let w = text.width();
        let start = col.saturating_sub(w / 2);
        self.put_str(start, row, text, fg);
    }

    fn cell_mut(&mut self, col: usize, row: usize) -> Option<&mut Cell>
    {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.cells.get_mut(row * self.width + col)
    }

    // Blanks whatever wide glyph currently overlaps the cell.
    fn release(&mut self, col: usize, row: usize)
    {
        let index = row * self.width + col;
        if self.cells[index].text.is_empty() && col > 0 {
            let bg = self.cells[index - 1].bg;
            self.cells[index - 1] = Cell::blank(bg.or(self.background));
            self.cells[index].text = " ".to_string();
        } else if col + 1 < self.width && self.cells[index + 1].text.is_empty() {
            self.cells[index + 1].text = " ".to_string();
        }
    }

    pub fn rows(&self) -> Vec<String>
    {
        self.cells.chunks(self.width).map(render_row).collect()
    }

    #[cfg(test)]
    pub fn text_at(&self, col: usize, row: usize) -> &str
    {
        &self.cells[row * self.width + col].text
    }
}

fn render_row(row: &[Cell]) -> String
{
    let mut line = String::with_capacity(row.len() + 16);
    let mut active: (Option<Rgb>, Option<Rgb>) = (None, None);
    for cell in row {
        if cell.text.is_empty() {
            continue;
        }
        let wanted = (cell.fg, cell.bg);
        if wanted != active {
            line.push_str("\x1b[0m");
            if let Some(color) = cell.fg {
                line.push_str(&ansi_fg(color));
            }
            if let Some(color) = cell.bg {
                line.push_str(&ansi_bg(color));
            }
            active = wanted;
        }
        line.push_str(&cell.text);
    }
    if active != (None, None) {
        line.push_str("\x1b[0m");
    }
    line
}

pub fn ansi_fg(color: Rgb) -> String
{
    format!("\x1b[38;2;{};{};{}m", color.r, color.g, color.b)
}

pub fn ansi_bg(color: Rgb) -> String
{
    format!("\x1b[48;2;{};{};{}m", color.r, color.g, color.b)
}

pub fn paint(text: &str, color: Rgb) -> String
{
    format!("{}{}\x1b[0m", ansi_fg(color), text)
}

/// Maps the logical playfield onto the terminal cells used to draw it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection
{
    pub cols: usize,
    pub rows: usize,
    pub field_width: f32,
    pub field_height: f32,
}

impl Projection
{
    pub fn new(cols: usize, rows: usize, field_width: f32, field_height: f32) -> Self
    {
        Self {
            cols: cols.max(1),
            rows: rows.max(1),
            field_width,
            field_height,
        }
    }

    pub fn cell_width(&self) -> f32
    {
        self.field_width / self.cols as f32
    }

    pub fn cell_height(&self) -> f32
    {
        self.field_height / self.rows as f32
    }

    pub fn to_cell(&self, x: f32, y: f32) -> (usize, usize)
    {
        let col = (x / self.cell_width()).floor().max(0.0) as usize;
        let row = (y / self.cell_height()).floor().max(0.0) as usize;
        (col.min(self.cols - 1), row.min(self.rows - 1))
    }

    /// Centre of the cell in playfield units.
    pub fn to_field(&self, col: usize, row: usize) -> (f32, f32)
    {
        (
            (col as f32 + 0.5) * self.cell_width(),
            (row as f32 + 0.5) * self.cell_height(),
        )
    }
}

/// Terminal size split into header, playfield and footer.
pub fn layout_metrics() -> (usize, usize)
{
    let (cols, rows) = terminal::size().unwrap_or((80, 24));
    split_layout(cols as usize, rows as usize)
}

/// Header, playfield, separator and footer fill exactly `rows` lines.
pub fn split_layout(cols: usize, rows: usize) -> (usize, usize)
{
    let extra = HEADER_LINES + 1 + FOOTER_LINES;
    (cols.max(10), rows.saturating_sub(extra).max(6))
}

/// Cuts `text` to at most `width` display cells.
pub fn clip(text: &str, width: usize) -> String
{
    let mut used = 0;
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out
}

// Each line is placed on its own row with no line break after it, so a full
// frame never scrolls the terminal.
pub fn present<W: Write>(out: &mut W, lines: &[String]) -> io::Result<()>
{
    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
    for (row, line) in lines.iter().enumerate() {
        let row = u16::try_from(row).unwrap_or(u16::MAX);
        queue!(out, MoveTo(0, row))?;
        out.write_all(line.as_bytes())?;
    }
    out.flush()
}
