use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::session::{Outcome, Phase};
use crate::{App, Screen};

const RULES: &str = "\
Each name may climb the tower exactly once.

Ride the elevator by typing a floor number. Riddle floors must be answered
before you can ride again. A correct answer clears the floor and sends you
back to the lobby; solve the riddle on the top floor to win.

Wrong answers cost one attempt from a budget shared across the whole climb.
When the budget is gone, the tower throws you out.

The lobby and rest stops take no answers. Some floors are best avoided.

Whatever happens, leave a memo for the next climber.";

pub fn draw(f: &mut Frame, app: &App) {
    match app.screen {
        Screen::TitleScreen => draw_title_screen(f, app),
        Screen::NameEntry => draw_name_entry(f, app),
        Screen::Tower => draw_tower(f, app),
        Screen::Memo => draw_memo(f, app),
        Screen::MemoWall => draw_memo_wall(f, app),
        Screen::Rules => draw_rules(f),
        Screen::Goodbye => draw_goodbye(f, app),
    }
}

fn draw_tower(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(f.area());

    f.render_widget(status_bar(app), chunks[0]);

    let panel = app.session.panel();
    let floor_view = Paragraph::new(panel.body)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", panel.heading)),
        )
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White));
    f.render_widget(floor_view, chunks[1]);

    f.render_widget(&app.input, chunks[2]);
    render_message(f, app, chunks[3]);
}

fn status_bar(app: &App) -> Paragraph<'static> {
    let session = &app.session;
    let player = session.current_player().unwrap_or("-").to_string();
    let attempts = session.attempts_left();
    let cleared = session
        .current_player()
        .map_or(0, |player| session.state().cleared_count(player));

    let mut spans = vec![
        Span::styled(
            format!(" {} ", session.catalog().settings.name.to_uppercase()),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ),
        Span::raw("  "),
        Span::styled(
            format!(" {} ", player),
            Style::default().fg(Color::White).bg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(
            format!(
                " Floor {}/{} ",
                session.current_floor(),
                session.catalog().total_floors()
            ),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("  "),
        Span::styled(
            format!(" Cleared: {} ", cleared),
            Style::default().fg(Color::Magenta),
        ),
        Span::raw("  "),
        Span::styled(
            format!(" Attempts: {} ", attempts),
            Style::default().fg(if attempts > 1 {
                Color::Green
            } else if attempts == 1 {
                Color::Yellow
            } else {
                Color::Red
            }),
        ),
    ];

    if let Phase::Doomed { remaining, .. } = session.phase() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!(" {:.1}s ", remaining.as_secs_f32()),
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        ));
    }

    Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM))
}

fn render_message(f: &mut Frame, app: &App, area: Rect) {
    let message = Paragraph::new(app.message.as_str())
        .block(Block::default().borders(Borders::ALL).title(" Intercom "))
        .wrap(Wrap { trim: false })
        .style(app.message_style);
    f.render_widget(message, area);
}

fn centered_column(area: Rect, constraints: &[Constraint]) -> Vec<Rect> {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(15),
            Constraint::Percentage(70),
            Constraint::Percentage(15),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints.to_vec())
        .split(horizontal[1])
        .to_vec()
}

fn draw_name_entry(f: &mut Frame, app: &App) {
    let chunks = centered_column(
        f.area(),
        &[
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(0),
        ],
    );

    let heading = Paragraph::new("Who dares to climb?")
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(heading, chunks[0]);
    f.render_widget(&app.input, chunks[1]);
    render_message(f, app, chunks[2]);
}

fn draw_memo(f: &mut Frame, app: &App) {
    let chunks = centered_column(
        f.area(),
        &[
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Min(0),
        ],
    );

    let (title, style) = match app.memo_outcome {
        Outcome::Success => (
            " VICTORY! ",
            Style::default().fg(Color::Black).bg(Color::Green),
        ),
        Outcome::Fail => (
            " GAME OVER ",
            Style::default().fg(Color::White).bg(Color::Red),
        ),
    };
    let banner = Paragraph::new(title)
        .style(style.add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(banner, chunks[0]);

    render_message(f, app, chunks[1]);
    f.render_widget(&app.input, chunks[2]);
}

fn draw_memo_wall(f: &mut Frame, app: &App) {
    let board = app.session.memo_board();
    let lines: Vec<Line> = if board.is_empty() {
        vec![Line::from(Span::styled(
            "The wall is still blank.",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        board
            .iter()
            .flat_map(|record| {
                let color = match record.outcome {
                    Outcome::Success => Color::Green,
                    Outcome::Fail => Color::Red,
                };
                [
                    Line::from(vec![
                        Span::styled(
                            record.player_id.clone(),
                            Style::default().add_modifier(Modifier::BOLD),
                        ),
                        Span::raw("  "),
                        Span::styled(
                            format!("floor {} ({})", record.floor_reached, record.outcome.label()),
                            Style::default().fg(color),
                        ),
                        Span::styled(
                            format!("  {}", record.timestamp.format("%Y-%m-%d %H:%M")),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ]),
                    Line::from(format!("  \"{}\"", record.memo)),
                    Line::from(""),
                ]
            })
            .collect()
    };

    let wall = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Memo Wall [any key: back] "),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(wall, f.area());
}

fn draw_rules(f: &mut Frame) {
    let rules = Paragraph::new(RULES)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" House Rules [any key: back] "),
        )
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::Cyan));
    f.render_widget(rules, f.area());
}

fn draw_goodbye(f: &mut Frame, app: &App) {
    let text = match &app.last_record {
        Some(record) => format!(
            "Goodbye, {}.\n\nYou reached floor {}. Your memo is on the wall.\n\n\
            Press any key for the next climber, or q to quit.",
            record.player_id, record.floor_reached
        ),
        None => "Goodbye.\n\nPress any key to continue, or q to quit.".to_string(),
    };
    let goodbye = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Yellow));
    f.render_widget(goodbye, f.area());
}

fn draw_title_screen(f: &mut Frame, app: &App) {
    let area = f.area();

    let title_art = r#"
    ╔═══════════════════════════════════════════════╗
    ║                                               ║
    ║     ╦═╗ ╦ ╔╦╗ ╔╦╗ ╦   ╔═╗                     ║
    ║     ╠╦╝ ║  ║║  ║║ ║   ║╣                      ║
    ║     ╩╚═ ╩ ═╩╝ ═╩╝ ╩═╝ ╚═╝                     ║
    ║                    ╔╦╗ ╔═╗ ╦ ╦ ╔═╗ ╦═╗        ║
    ║                     ║  ║ ║ ║║║ ║╣  ╠╦╝        ║
    ║                     ╩  ╚═╝ ╚╩╝ ╚═╝ ╩╚═        ║
    ║                                               ║
    ║        "One name. One climb. No second        ║
    ║                 chances."                     ║
    ║                                               ║
    ╚═══════════════════════════════════════════════╝
"#;

    let mut constraints = vec![Constraint::Length(15)];
    constraints.extend(app.menu.iter().map(|_| Constraint::Length(2)));
    constraints.push(Constraint::Length(2));
    constraints.push(Constraint::Min(1));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let title = Paragraph::new(title_art)
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    for (index, option) in app.menu.iter().enumerate() {
        let style = if index == app.menu_selection {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        let item = Paragraph::new(format!("  {}  ", option.label()))
            .style(style)
            .alignment(Alignment::Center);
        f.render_widget(item, chunks[index + 1]);
    }

    let message = Paragraph::new(app.message.as_str())
        .style(app.message_style)
        .alignment(Alignment::Center);
    f.render_widget(message, chunks[app.menu.len() + 1]);

    let help = Paragraph::new("↑/↓ to select  •  ENTER to confirm  •  q to quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(help, chunks[app.menu.len() + 2]);
}
