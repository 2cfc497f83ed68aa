use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::error::BoardError;
use crate::models::{Application, DecodedPage, ListQuery};
use crate::notice::{Notice, NoticeLevel};
use crate::reconciler::{DragOutcome, DragPhase, DragReconciler, DropTarget};
use crate::status::Status;
use crate::view::BoardView;

struct BoardState {
    board: BoardView,
    column: usize,
    rows: [usize; Status::ALL.len()],
    last_notice: Option<(Notice, Instant)>,
}

const NOTICE_TTL: Duration = Duration::from_secs(4);

impl BoardState {
    fn new(apps: &[Application]) -> Self {
        Self {
            board: BoardView::build(apps),
            column: 0,
            rows: [0; Status::ALL.len()],
            last_notice: None,
        }
    }

    fn rebuild(&mut self, apps: &[Application]) {
        self.board = BoardView::build(apps);
        for (idx, column) in self.board.columns.iter().enumerate() {
            self.rows[idx] = self.rows[idx].min(column.cards.len().saturating_sub(1));
        }
    }

    fn show(&mut self, notice: Notice) {
        self.last_notice = Some((notice, Instant::now()));
    }

    fn expire_notice(&mut self) {
        if self
            .last_notice
            .as_ref()
            .is_some_and(|(_, shown)| shown.elapsed() >= NOTICE_TTL)
        {
            self.last_notice = None;
        }
    }

    fn current_status(&self) -> Status {
        Status::ALL[self.column]
    }

    fn current_card(&self) -> Option<&Application> {
        self.board.columns.get(self.column)?.cards.get(self.rows[self.column])
    }

    fn left(&mut self) {
        self.column = self.column.saturating_sub(1);
    }

    fn right(&mut self) {
        if self.column + 1 < Status::ALL.len() {
            self.column += 1;
        }
    }

    fn down(&mut self) {
        let len = self.board.columns[self.column].cards.len();
        if len > 0 && self.rows[self.column] < len - 1 {
            self.rows[self.column] += 1;
        }
    }

    fn up(&mut self) {
        self.rows[self.column] = self.rows[self.column].saturating_sub(1);
    }
}

pub fn run_board(
    reconciler: &mut DragReconciler,
    notices: &mut UnboundedReceiver<Notice>,
    query: ListQuery,
) -> Result<()> {
    let handle = Handle::current();
    let store = reconciler.store().clone();
    handle.block_on(store.list(&query))?;

    let mut state = BoardState::new(&store.cached());

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, reconciler, notices, &handle, &query);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut BoardState,
    reconciler: &mut DragReconciler,
    notices: &mut UnboundedReceiver<Notice>,
    handle: &Handle,
    query: &ListQuery,
) -> Result<()> {
    let store = reconciler.store().clone();
    let mut refresh: Option<JoinHandle<Result<DecodedPage, BoardError>>> = None;
    loop {
        while let Ok(notice) = notices.try_recv() {
            state.show(notice);
        }
        if refresh.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(task) = refresh.take() {
                match handle.block_on(task) {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => state.show(Notice::error(format!("Refresh failed: {}", e))),
                    Err(e) => state.show(Notice::error(format!("Refresh task failed: {}", e))),
                }
            }
        }
        state.expire_notice();
        state.rebuild(&store.cached());
        let holding = match reconciler.phase() {
            DragPhase::Dragging { source } => Some(source.clone()),
            _ => None,
        };
        terminal.draw(|frame| draw(frame, state, holding.as_deref()))?;

        // Poll so spawned patches show up without a key press.
        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char('q') => break,
            KeyCode::Esc => {
                if holding.is_some() {
                    reconciler.pointer_cancel();
                } else {
                    break;
                }
            }
            KeyCode::Left | KeyCode::Char('h') => state.left(),
            KeyCode::Right | KeyCode::Char('l') => state.right(),
            KeyCode::Down | KeyCode::Char('j') if holding.is_none() => state.down(),
            KeyCode::Up | KeyCode::Char('k') if holding.is_none() => state.up(),
            KeyCode::Char(' ') if holding.is_none() => {
                if let Some(card) = state.current_card() {
                    reconciler.begin_drag(card.id.clone())?;
                }
            }
            KeyCode::Enter if holding.is_some() => {
                let target = DropTarget::zone(state.current_status());
                let _guard = handle.enter();
                if let DragOutcome::Dispatched { to, .. } = reconciler.end_drag(Some(target))? {
                    let idx = Status::ALL.iter().position(|s| *s == to).unwrap_or(0);
                    state.column = idx;
                }
            }
            KeyCode::Char('d') if holding.is_none() => {
                if let Some(card) = state.current_card() {
                    let id = card.id.clone();
                    let store = store.clone();
                    // Outcome arrives as a notice.
                    handle.spawn(async move {
                        let _ = store.remove(&id).await;
                    });
                }
            }
            KeyCode::Char('r') if refresh.is_none() => {
                let store = store.clone();
                let query = query.clone();
                refresh = Some(handle.spawn(async move { store.list(&query).await }));
            }
            _ => {}
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &BoardState, holding: Option<&str>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, Status::ALL.len() as u32); Status::ALL.len()])
        .split(rows[0]);

    for (idx, column) in state.board.columns.iter().enumerate() {
        let items: Vec<ListItem> = column
            .cards
            .iter()
            .map(|app| {
                let marker = if holding == Some(app.id.as_str()) { "*" } else { " " };
                let tailored = if app.tailored { "+" } else { " " };
                ListItem::new(format!(
                    "{}{} {}\n   {}",
                    marker,
                    tailored,
                    truncate(&app.company_name, 22),
                    truncate(&app.role_name, 22)
                ))
            })
            .collect();

        let focused = idx == state.column;
        let border_style = if focused && holding.is_some() {
            Style::default().fg(Color::Yellow)
        } else if focused {
            Style::default().fg(status_color(column.status))
        } else {
            Style::default()
        };

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title(format!(" {} ", column.title())),
            )
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

        let mut list_state = ListState::default();
        if focused && holding.is_none() && !column.cards.is_empty() {
            list_state.select(Some(state.rows[idx]));
        }
        frame.render_stateful_widget(list, columns[idx], &mut list_state);
    }

    let detail = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, rows[1]);

    let footer = match &state.last_notice {
        Some((notice, _)) => {
            let color = match notice.level {
                NoticeLevel::Success => Color::Green,
                NoticeLevel::Error => Color::Red,
            };
            Paragraph::new(format!(" {}", notice.message)).style(Style::default().fg(color))
        }
        None if holding.is_some() => Paragraph::new(" h/l:choose column  enter:drop  esc:cancel")
            .style(Style::default().fg(Color::Yellow)),
        None => Paragraph::new(" h/l:column  j/k:card  space:pick up  d:delete  r:refresh  q:quit")
            .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, rows[2]);
}

fn build_detail(state: &BoardState) -> Text<'_> {
    let Some(app) = state.current_card() else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        format!("{} at {}", app.role_name, app.company_name),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", app.status.label()),
        Style::default().fg(status_color(app.status)),
    )));
    lines.push(Line::from(format!(
        "Applied: {}{}",
        app.date_of_application.format("%b %-d, %Y"),
        if app.tailored { "  (tailored resume)" } else { "" }
    )));
    if let Some(link) = &app.job_link {
        lines.push(Line::from(format!("Link: {}", link)));
    }
    if let Some(referral) = &app.referral {
        lines.push(Line::from(format!("Referral: {}", referral)));
    }
    if let Some(description) = &app.job_description {
        lines.push(Line::from(""));
        for line in textwrap::fill(description, 100).lines() {
            lines.push(Line::from(line.to_string()));
        }
    }
    Text::from(lines)
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Applied => Color::Blue,
        Status::Rejected => Color::Gray,
        Status::OnlineAssessment => Color::Magenta,
        Status::Interview => Color::Yellow,
        Status::Offer => Color::Green,
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
