use ratatui::{
    prelude::{Constraint, CrosstermBackend, Direction, Layout},
    style::{Color, Modifier, Style, Stylize},
    text::Line,
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};

use crate::client::{Dispatcher, QueryClient};
use crate::screen::{Action, Screen};

type CrosstermTerminal = ratatui::Terminal<CrosstermBackend<std::io::Stderr>>;

const FPS: f64 = 30.0;

/// Restores the terminal when dropped, so an error mid-loop doesn't leave it in raw mode
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> crate::Result<Self> {
        enable_raw_mode()?;
        execute!(std::io::stderr(), EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = execute!(std::io::stderr(), LeaveAlternateScreen) {
            tracing::error!(error = %e, "failed to leave alternate screen");
        }
        if let Err(e) = disable_raw_mode() {
            tracing::error!(error = %e, "failed to disable raw mode");
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Quit,
    Screen(Action),
}

/// Map a key press to what it should do. Releases and repeats are ignored.
fn parse_key(key: KeyEvent) -> Option<Input> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let input = match key {
        KeyEvent {
            code: KeyCode::Char('c') | KeyCode::Char('d'),
            modifiers: KeyModifiers::CONTROL,
            ..
        } => Input::Quit,

        KeyEvent {
            code: KeyCode::Char('u'),
            modifiers: KeyModifiers::CONTROL,
            ..
        } => Input::Screen(Action::ClearInput),

        KeyEvent {
            code: KeyCode::Char(c),
            modifiers,
            ..
        } if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
            Input::Screen(Action::TypeChar(c))
        }

        KeyEvent {
            code: KeyCode::Esc, ..
        } => Input::Quit,

        KeyEvent {
            code: KeyCode::Backspace,
            ..
        } => Input::Screen(Action::DeleteChar),

        KeyEvent {
            code: KeyCode::Enter,
            ..
        } => Input::Screen(Action::Submit),

        KeyEvent {
            code: KeyCode::Up, ..
        } => Input::Screen(Action::ScrollUp),

        KeyEvent {
            code: KeyCode::Down,
            ..
        } => Input::Screen(Action::ScrollDown),

        KeyEvent {
            code: KeyCode::PageUp,
            ..
        } => Input::Screen(Action::PageUp),

        KeyEvent {
            code: KeyCode::PageDown,
            ..
        } => Input::Screen(Action::PageDown),

        _ => return None,
    };

    Some(input)
}

pub struct App<D: Dispatcher = QueryClient> {
    should_quit: bool,
    screen: Screen<D>,
    tick_duration: std::time::Duration,
    tick: usize,
}

impl<D: Dispatcher> App<D> {
    pub fn new(dispatcher: D) -> Self {
        Self {
            should_quit: false,
            screen: Screen::new(dispatcher),
            tick_duration: std::time::Duration::from_secs_f64(1.0 / FPS),
            tick: 0,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match parse_key(key) {
            Some(Input::Quit) => self.should_quit = true,
            Some(Input::Screen(action)) => self.screen.update(action),
            None => (),
        }
    }

    fn update(&mut self) -> crate::Result<()> {
        if event::poll(self.tick_duration)? {
            if let Event::Key(key) = event::read()? {
                self.handle_key(key);
            }
        }

        self.screen.poll();
        self.tick = self.tick.wrapping_add(1);

        Ok(())
    }

    fn ui(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(frame.size());

        let input_style = if self.screen.can_submit() {
            Style::new().blue()
        } else {
            Style::new().fg(Color::DarkGray)
        };

        let input = Paragraph::new(self.screen.question()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(input_style)
                .border_type(BorderType::Thick)
                .title(" Question ")
                .title(
                    ratatui::widgets::block::Title::from(format!(" {} ", self.screen.action_label()))
                        .alignment(ratatui::layout::Alignment::Right),
                ),
        );

        frame.render_widget(input, chunks[0]);

        let cursor_x = chunks[0]
            .x
            .saturating_add(1)
            .saturating_add(self.screen.question().chars().count() as u16)
            .min(chunks[0].right().saturating_sub(2));
        frame.set_cursor(cursor_x, chunks[0].y + 1);

        let result = Paragraph::new(self.screen.result_text(self.tick / 4))
            .block(Block::default().borders(Borders::ALL).title(" RAG Query "))
            .wrap(Wrap { trim: false })
            .scroll((self.screen.scroll(), 0));

        frame.render_widget(result, chunks[1]);

        let help = Paragraph::new(Line::from(
            "Enter: ask  Ctrl-U: clear  Up/Down/PgUp/PgDn: scroll  Esc: quit",
        ))
        .style(Style::default().add_modifier(Modifier::DIM));

        frame.render_widget(help, chunks[2]);
    }

    pub fn run(&mut self) -> crate::Result<()> {
        let backend = CrosstermBackend::new(std::io::stderr());
        let mut terminal = CrosstermTerminal::new(backend)?;
        let _guard = TerminalGuard::enter()?;

        tracing::info!("screen started");

        while !self.should_quit {
            self.update()?;

            terminal.draw(|frame| self.ui(frame))?;
        }

        if self.screen.is_loading() {
            tracing::info!("closing with a query still pending, its result will be ignored");
        }

        Ok(())
    }
}
