use color_eyre::eyre::Result;
use crossterm::event::{self, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Padding, Paragraph, Widget},
    DefaultTerminal, Frame,
};
use std::sync::{
    atomic::{AtomicU16, Ordering},
    mpsc::Receiver,
    Arc,
};
use tinsel_core::{Dispatch, Poll, Shared, LINE_COUNT, MELODIES, PATTERNS};

pub const HISTORY_LEN: usize = 6;
const LOG_DURATION: std::time::Duration = std::time::Duration::from_millis(1000);
const FRAME: std::time::Duration = std::time::Duration::from_millis(16);

/// line names, mask bit order
const LINES: [char; LINE_COUNT] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I'];

pub enum Cmd {
    Log(String),
    Poll(Poll),
}

pub struct TuiHandler {
    mask: Arc<AtomicU16>,
    shared: Arc<Shared>,

    /// (pattern, step)
    lights: Option<(usize, usize)>,
    /// newest last
    history: heapless::Deque<Dispatch, HISTORY_LEN>,

    log: Option<(std::time::Instant, String)>,
}

impl TuiHandler {
    pub fn new(mask: Arc<AtomicU16>, shared: Arc<Shared>) -> Self {
        Self {
            mask,
            shared,
            lights: None,
            history: heapless::Deque::new(),
            log: None,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal, board_rx: &Receiver<Cmd>) -> Result<()> {
        loop {
            if let Some((start, ..)) = &self.log {
                if start.elapsed() >= LOG_DURATION {
                    self.log = None;
                }
            }
            if event::poll(FRAME)? && self.kbd()? {
                break;
            }
            loop {
                match board_rx.try_recv() {
                    Ok(cmd) => self.cmd(cmd),
                    Err(std::sync::mpsc::TryRecvError::Empty) => break,
                    Err(e) => Err(e)?,
                }
            }
            // leds and buzzer change between commands
            terminal.draw(|frame| self.draw(frame))?;
        }
        Ok(())
    }

    /// returns true if should exit
    fn kbd(&mut self) -> Result<bool> {
        if let event::Event::Key(KeyEvent {
            code: KeyCode::Char('q') | KeyCode::Esc,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        {
            return Ok(true);
        }
        Ok(false)
    }

    pub fn cmd(&mut self, cmd: Cmd) {
        match cmd {
            Cmd::Log(msg) => self.log = Some((std::time::Instant::now(), msg)),
            Cmd::Poll(poll) => {
                if let Some(advance) = poll.lights {
                    if advance.picked {
                        self.log = Some((
                            std::time::Instant::now(),
                            format!("pattern {}", advance.pattern + 1),
                        ));
                    }
                    self.lights = Some((advance.pattern, advance.step));
                }
                if let Some(dispatch) = poll.note {
                    if dispatch.picked {
                        self.log = Some((
                            std::time::Instant::now(),
                            MELODIES[dispatch.melody].title.to_string(),
                        ));
                    }
                    if dispatch.task.is_none() {
                        self.log = Some((
                            std::time::Instant::now(),
                            format!("skipped '{}'", dispatch.symbol.escape_ascii()),
                        ));
                    }
                    if self.history.is_full() {
                        self.history.pop_front();
                    }
                    let _ = self.history.push_back(dispatch);
                }
            }
        }
    }

    fn draw(&self, frame: &mut Frame) {
        frame.render_widget(self, frame.area());
    }

    fn render_lights(&self, area: Rect, buf: &mut Buffer) {
        let mask = self.mask.load(Ordering::Relaxed);
        let mut spans = Vec::with_capacity(LINE_COUNT * 2);
        for (bit, name) in LINES.iter().enumerate() {
            let lit = (mask >> bit) & 1 == 1;
            let lamp = if lit {
                Span::raw("●").yellow().bold()
            } else {
                Span::raw("○").dark_gray()
            };
            spans.push(lamp);
            spans.push(Span::raw(format!("{} ", name)).dark_gray());
        }
        let title = match self.lights {
            Some((pattern, step)) => format!(
                " pattern {} step {}/{} ",
                pattern + 1,
                step + 1,
                PATTERNS[pattern].steps.len()
            ),
            None => " lights ".to_string(),
        };
        Paragraph::new(Line::from(spans).centered())
            .block(
                Block::bordered()
                    .bold()
                    .title(title)
                    .padding(Padding::vertical(1)),
            )
            .render(area, buf);
    }

    fn render_buzzer(&self, area: Rect, buf: &mut Buffer) {
        let playing = self.shared.is_playing();
        let mut lines = Vec::with_capacity(HISTORY_LEN);
        for (i, dispatch) in self.history.iter().enumerate() {
            let newest = i + 1 == self.history.len();
            let name = match dispatch.note {
                Some(note) => match note.hz() {
                    Some(hz) => format!("{:?} {:>3} Hz", note, hz),
                    None => "rest".to_string(),
                },
                None => format!("'{}' ?", dispatch.symbol.escape_ascii()),
            };
            let text = match dispatch.task {
                Some(task) => format!(
                    "{:>3} {:<12} half {:>2}  on {:>5}  off {:>4}",
                    dispatch.index + 1,
                    name,
                    task.half_period,
                    task.active,
                    task.silence
                ),
                None => format!("{:>3} {:<12} skipped", dispatch.index + 1, name),
            };
            let style = if newest && playing {
                Style::new().bold()
            } else {
                Style::new().dark_gray()
            };
            lines.push(Line::styled(text, style));
        }
        let title = match self.history.back() {
            Some(dispatch) => format!(" {} ", MELODIES[dispatch.melody].title),
            None => " buzzer ".to_string(),
        };
        let state = if playing { " playing " } else { " idle " };
        Paragraph::new(Text::from(lines))
            .block(
                Block::bordered()
                    .bold()
                    .title(title)
                    .title_bottom(Line::from(state).right_aligned())
                    .padding(Padding::horizontal(1)),
            )
            .render(area, buf);
    }

    fn render_log(&self, area: Rect, buf: &mut Buffer) {
        if let Some((_, msg)) = &self.log {
            Paragraph::new(Text::raw(msg)).centered().render(area, buf);
        }
    }
}

impl Widget for &TuiHandler {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [area] = Layout::horizontal(vec![Constraint::Max(48)])
            .flex(Flex::Center)
            .areas(area);
        let [lights_area, buzzer_area, log_area, help_area] = Layout::vertical(
            Constraint::from_maxes([5, HISTORY_LEN as u16 + 2, 1, 1]),
        )
        .flex(Flex::Center)
        .areas(area);
        self.render_lights(lights_area, buf);
        self.render_buzzer(buzzer_area, buf);
        self.render_log(log_area, buf);
        Paragraph::new(Text::raw("q quit").dark_gray())
            .centered()
            .render(help_area, buf);
    }
}
