mod config;
mod session;
mod tower;
mod ui;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders},
    Terminal,
};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tui_textarea::TextArea;

use config::Config;
use session::{Outcome, Phase, PlayerRecord, SaveStore, Session, Signal};
use tower::{default_catalog, load_catalog};

const TICK: Duration = Duration::from_millis(100);

enum Screen {
    TitleScreen,
    NameEntry,
    Tower,
    Memo,
    MemoWall,
    Rules,
    Goodbye,
}

#[derive(Clone, Copy, PartialEq)]
enum MenuOption {
    Continue,
    NewGame,
    MemoWall,
    Rules,
    Quit,
}

impl MenuOption {
    fn label(self) -> &'static str {
        match self {
            MenuOption::Continue => "CONTINUE",
            MenuOption::NewGame => "NEW PLAYER",
            MenuOption::MemoWall => "MEMO WALL",
            MenuOption::Rules => "RULES",
            MenuOption::Quit => "QUIT",
        }
    }
}

struct App<'a> {
    session: Session,
    screen: Screen,
    menu: Vec<MenuOption>,
    menu_selection: usize,
    input: TextArea<'a>,
    message: String,
    message_style: Style,
    memo_outcome: Outcome,
    last_record: Option<PlayerRecord>,
    should_quit: bool,
}

impl<'a> App<'a> {
    fn new(session: Session) -> Self {
        let mut app = App {
            session,
            screen: Screen::TitleScreen,
            menu: Vec::new(),
            menu_selection: 0,
            input: text_input(" Input ", ""),
            message: String::new(),
            message_style: Style::default().fg(Color::Yellow),
            memo_outcome: Outcome::Fail,
            last_record: None,
            should_quit: false,
        };
        app.show_title();
        app
    }

    fn show_title(&mut self) {
        self.menu = vec![
            MenuOption::NewGame,
            MenuOption::MemoWall,
            MenuOption::Rules,
            MenuOption::Quit,
        ];
        if self.session.resumable().is_some() {
            self.menu.insert(0, MenuOption::Continue);
        }
        self.menu_selection = 0;
        self.screen = Screen::TitleScreen;
    }

    fn selected_option(&self) -> MenuOption {
        self.menu[self.menu_selection]
    }

    fn info(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.message_style = Style::default().fg(Color::Yellow);
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.message_style = Style::default().fg(Color::Red);
    }

    fn typed(&self) -> String {
        self.input.lines().join(" ")
    }

    fn open_name_entry(&mut self) {
        self.input = text_input(" Your name [Enter: confirm | Esc: back] ", "name");
        self.info("Every name gets exactly one climb.");
        self.screen = Screen::NameEntry;
    }

    fn enter_tower(&mut self, signal: Signal) {
        self.screen = Screen::Tower;
        self.info(signal.message());
        self.refresh_tower_input();
    }

    /// The single input box doubles as the answer box or the floor selector.
    fn refresh_tower_input(&mut self) {
        let panel = self.session.panel();
        self.input = if panel.can_submit {
            text_input(" Answer [Enter: submit | Esc: leave tower] ", "answer")
        } else if panel.can_change_floor {
            text_input(" Floor [Enter: ride | Esc: leave tower] ", "floor number")
        } else {
            text_input(" ... ", "")
        };
    }

    fn open_memo(&mut self, outcome: Outcome) {
        self.memo_outcome = outcome;
        self.input = text_input(" Memo for those who follow [Enter: sign] ", "memo");
        self.screen = Screen::Memo;
    }

    fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Won { .. } => {
                self.message = signal.message();
                self.message_style = Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD);
                self.open_memo(Outcome::Success);
            }
            Signal::Defeated => {
                self.message = signal.message();
                self.message_style = Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD);
                self.open_memo(Outcome::Fail);
            }
            Signal::AttemptsExhausted { .. }
            | Signal::DefeatScheduled { .. }
            | Signal::Retry { .. } => {
                self.warn(signal.message());
                self.refresh_tower_input();
            }
            _ => {
                self.info(signal.message());
                self.refresh_tower_input();
            }
        }
    }

    fn confirm_title(&mut self) {
        match self.selected_option() {
            MenuOption::Continue => match self.session.resume() {
                Ok(signal) => self.enter_tower(signal),
                Err(err) => self.warn(err.to_string()),
            },
            MenuOption::NewGame => self.open_name_entry(),
            MenuOption::MemoWall => self.screen = Screen::MemoWall,
            MenuOption::Rules => self.screen = Screen::Rules,
            MenuOption::Quit => self.should_quit = true,
        }
    }

    fn confirm_name(&mut self) {
        let name = self.typed();
        match self.session.start_new_player(&name) {
            Ok(signal) => self.enter_tower(signal),
            Err(err) => {
                self.warn(err.to_string());
                self.input = text_input(" Your name [Enter: confirm | Esc: back] ", "name");
            }
        }
    }

    fn confirm_tower_input(&mut self) {
        let panel = self.session.panel();
        let typed = self.typed();

        let result = if panel.can_submit {
            self.session.submit_answer(&typed)
        } else if panel.can_change_floor {
            match typed.trim().parse::<i64>() {
                Ok(floor) => self.session.change_floor(floor),
                Err(_) => {
                    self.warn("Enter a floor number.");
                    self.refresh_tower_input();
                    return;
                }
            }
        } else {
            return;
        };

        match result {
            Ok(signal) => self.handle_signal(signal),
            Err(err) => {
                self.warn(err.to_string());
                self.refresh_tower_input();
            }
        }
    }

    fn leave_tower(&mut self) {
        if matches!(self.session.phase(), Phase::Playing) {
            self.warn("You walk out of the tower. This run ends here.");
            self.open_memo(Outcome::Fail);
        }
    }

    fn confirm_memo(&mut self) {
        let memo = self.typed();
        match self.session.finalize_session(&memo, self.memo_outcome) {
            Ok(record) => {
                self.last_record = Some(record);
                self.screen = Screen::Goodbye;
            }
            Err(err) => {
                error!(error = %err, "could not record run");
                self.warn(err.to_string());
                self.show_title();
            }
        }
    }

    fn on_tick(&mut self, elapsed: Duration) {
        if let Some(signal) = self.session.tick(elapsed) {
            self.handle_signal(signal);
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match self.screen {
            Screen::TitleScreen => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.menu_selection = self
                        .menu_selection
                        .checked_sub(1)
                        .unwrap_or(self.menu.len() - 1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.menu_selection = (self.menu_selection + 1) % self.menu.len();
                }
                KeyCode::Enter => self.confirm_title(),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
            Screen::MemoWall | Screen::Rules => self.show_title(),
            Screen::Goodbye => match key.code {
                KeyCode::Char('q') => self.should_quit = true,
                _ => {
                    self.message.clear();
                    self.show_title();
                }
            },
            Screen::NameEntry => match key.code {
                KeyCode::Enter => self.confirm_name(),
                KeyCode::Esc => {
                    self.message.clear();
                    self.show_title();
                }
                _ => {
                    self.input.input(key);
                }
            },
            Screen::Tower => match key.code {
                KeyCode::Enter => self.confirm_tower_input(),
                KeyCode::Esc => self.leave_tower(),
                _ => {
                    self.input.input(key);
                }
            },
            Screen::Memo => match key.code {
                KeyCode::Enter => self.confirm_memo(),
                _ => {
                    self.input.input(key);
                }
            },
        }
    }
}

fn text_input<'a>(title: &'a str, placeholder: &str) -> TextArea<'a> {
    let mut input = TextArea::default();
    input.set_block(Block::default().borders(Borders::ALL).title(title));
    input.set_cursor_line_style(Style::default());
    input.set_placeholder_text(placeholder);
    input
}

fn main() -> Result<()> {
    let config = Config::from_env();
    init_tracing(&config.log_path)?;
    info!("=== Riddle Tower startup ===");

    let catalog = match &config.catalog_path {
        Some(path) => load_catalog(path)?,
        None => default_catalog()?,
    };
    info!(
        tower = %catalog.settings.name,
        floors = catalog.total_floors(),
        save = %config.save_path.display(),
        "catalog loaded"
    );

    let session = Session::open(catalog, SaveStore::new(&config.save_path));
    let mut app = App::new(session);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.session.save();
    info!("=== Riddle Tower shutdown ===");

    if let Some(record) = &app.last_record {
        println!(
            "\nLast climb: {} reached floor {} ({}).\n",
            record.player_id,
            record.floor_reached,
            record.outcome.label()
        );
    }

    result
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let mut last_tick = Instant::now();

    while !app.should_quit {
        terminal.draw(|f| ui::draw(f, &*app))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        let now = Instant::now();
        app.on_tick(now - last_tick);
        last_tick = now;
    }

    Ok(())
}

fn init_tracing(log_path: &Path) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .compact()
        .init();
    Ok(())
}
