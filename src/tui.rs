use std::time::{Duration, Instant};

use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::api::{self, NasaClient};
use crate::cache;
use crate::config::AppPaths;
use crate::hash::short_digest;
use crate::image_ops::{dimensions, scale_to_fit};
use crate::storage::ApodStore;
use crate::storage::models::ApodRecord;
use crate::storage::sqlite::SqliteStorage;
use crate::wallpaper;

const PREVIEW_BOUNDS: (u32, u32) = (800, 600);

#[derive(PartialEq)]
enum Mode {
    Normal,
    FetchDate,
}

struct App {
    records: Vec<ApodRecord>,
    list_state: ListState,
    mode: Mode,
    date_input: String,
    status: String,
    status_time: Option<Instant>,
    explanation_scroll: u16,
    should_quit: bool,
}

impl App {
    fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            records: Vec::new(),
            list_state,
            mode: Mode::Normal,
            date_input: String::new(),
            status: String::new(),
            status_time: None,
            explanation_scroll: 0,
            should_quit: false,
        }
    }

    fn set_status(&mut self, msg: String) {
        self.status = msg;
        self.status_time = Some(Instant::now());
    }

    fn selected_record(&self) -> Option<&ApodRecord> {
        self.list_state.selected().and_then(|i| self.records.get(i))
    }

    fn select_next(&mut self) {
        if self.records.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.records.len() - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
        self.explanation_scroll = 0;
    }

    fn select_prev(&mut self) {
        if self.records.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
        self.explanation_scroll = 0;
    }

    fn select_first(&mut self) {
        if !self.records.is_empty() {
            self.list_state.select(Some(0));
            self.explanation_scroll = 0;
        }
    }

    fn select_last(&mut self) {
        if !self.records.is_empty() {
            self.list_state.select(Some(self.records.len() - 1));
            self.explanation_scroll = 0;
        }
    }

    fn refresh(&mut self, storage: &SqliteStorage) {
        match storage.list() {
            Ok(records) => self.records = records,
            Err(e) => self.set_status(format!("Error: {e}")),
        }

        // Clamp selection
        if self.records.is_empty() {
            self.list_state.select(None);
        } else if let Some(i) = self.list_state.selected() {
            if i >= self.records.len() {
                self.list_state.select(Some(self.records.len() - 1));
            }
        } else {
            self.list_state.select(Some(0));
        }
    }

    fn set_selected_as_desktop(&mut self) {
        let Some(record) = self.selected_record() else {
            return;
        };
        let id = record.id;
        let path = std::path::PathBuf::from(&record.file_path);
        match wallpaper::set_desktop_background(&path) {
            Ok(()) => self.set_status(format!("Set #{id} as desktop background")),
            Err(e) => self.set_status(format!("Wallpaper failed: {e}")),
        }
    }

    fn open_selected(&mut self) {
        let Some(record) = self.selected_record() else {
            return;
        };
        let id = record.id;
        let path = record.file_path.clone();
        match open_in_system_viewer(&path) {
            Ok(()) => self.set_status(format!("Opened #{id}")),
            Err(e) => self.set_status(format!("Open failed: {e}")),
        }
    }

    fn fetch_entered_date(&mut self, storage: &SqliteStorage, paths: &AppPaths) {
        let input = self.date_input.trim().to_string();
        self.date_input.clear();

        let Ok(date) = NaiveDate::parse_from_str(&input, "%Y-%m-%d") else {
            self.set_status(format!("Invalid date \"{input}\" (use YYYY-MM-DD)"));
            return;
        };
        if let Err(e) = api::validate_date(date) {
            self.set_status(format!("{e}"));
            return;
        }

        let client = NasaClient::from_env();
        match cache::add_to_cache(&client, storage, &paths.images_dir, date) {
            Ok(id) => {
                self.set_status(format!("Cached APOD {date} as #{id}"));
                self.refresh(storage);
                if let Some(i) = self.records.iter().position(|r| r.id == id) {
                    self.list_state.select(Some(i));
                    self.explanation_scroll = 0;
                }
            }
            Err(e) => self.set_status(format!("Fetch failed: {e}")),
        }
    }
}

fn open_in_system_viewer(path: &str) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    let mut command = {
        let mut c = std::process::Command::new("open");
        c.arg(path);
        c
    };
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", "", path]);
        c
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = {
        let mut c = std::process::Command::new("xdg-open");
        c.arg(path);
        c
    };
    command.spawn().map(|_| ())
}

fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{truncated}…")
    } else {
        truncated
    }
}

// ── UI rendering ───────────────────────────────────────────────────

fn draw(frame: &mut Frame, app: &mut App) {
    let [title_area, body_area, help_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    // Title bar
    let title = format!(" APOD — {} cached image(s) ", app.records.len());
    frame.render_widget(
        Paragraph::new(title).style(Style::new().fg(Color::Black).bg(Color::Cyan)),
        title_area,
    );

    // Body: two-pane split
    let [list_area, preview_area] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)])
            .areas(body_area);

    // Left pane: cached titles
    let items: Vec<ListItem> = app
        .records
        .iter()
        .map(|record| {
            ListItem::new(format!(
                "{:>4}  {}",
                record.id,
                truncate_chars(&record.title, 40)
            ))
        })
        .collect();

    let list_title = if app.mode == Mode::FetchDate {
        format!("Fetch date: {}_", app.date_input)
    } else {
        "Cached images".to_string()
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(list_title))
        .highlight_style(
            Style::new()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, list_area, &mut app.list_state);

    // Right pane: record preview
    let preview_content = if let Some(record) = app.selected_record() {
        let dims_line = match dimensions(std::path::Path::new(&record.file_path)) {
            Ok(dims) => {
                let scaled = scale_to_fit(dims, PREVIEW_BOUNDS);
                format!(
                    "{}x{} (displays at {}x{})",
                    dims.0, dims.1, scaled.0, scaled.1
                )
            }
            Err(_) => "unknown".to_string(),
        };

        let mut lines = vec![
            Line::from(vec![
                Span::styled("ID:     ", Style::new().fg(Color::DarkGray)),
                Span::raw(record.id.to_string()),
            ]),
            Line::from(vec![
                Span::styled("Title:  ", Style::new().fg(Color::DarkGray)),
                Span::raw(record.title.clone()),
            ]),
            Line::from(vec![
                Span::styled("File:   ", Style::new().fg(Color::DarkGray)),
                Span::raw(record.file_path.clone()),
            ]),
            Line::from(vec![
                Span::styled("Size:   ", Style::new().fg(Color::DarkGray)),
                Span::raw(dims_line),
            ]),
            Line::from(vec![
                Span::styled("SHA256: ", Style::new().fg(Color::DarkGray)),
                Span::raw(short_digest(&record.sha256).to_string()),
            ]),
            Line::raw("─────────────────────────"),
        ];
        for line in record.explanation.lines() {
            lines.push(Line::raw(line.to_string()));
        }
        lines
    } else {
        vec![Line::raw("No cached images. Press [f] to fetch one.")]
    };

    let preview_title = if app.explanation_scroll > 0 {
        format!("Preview [scroll: {}]", app.explanation_scroll)
    } else {
        "Preview".to_string()
    };

    let preview = Paragraph::new(preview_content)
        .block(Block::default().borders(Borders::ALL).title(preview_title))
        .wrap(Wrap { trim: false })
        .scroll((app.explanation_scroll, 0));

    frame.render_widget(preview, preview_area);

    // Auto-clear status after 3 seconds
    if let Some(t) = app.status_time
        && t.elapsed() > Duration::from_secs(3)
    {
        app.status.clear();
        app.status_time = None;
    }

    // Help bar
    let help_text = match app.mode {
        Mode::Normal => {
            if app.status.is_empty() {
                " [q]uit [f]etch date [Enter]set desktop [o]pen [r]efresh [J/K]scroll".to_string()
            } else {
                format!(" {} ", app.status)
            }
        }
        Mode::FetchDate => " Type YYYY-MM-DD · [Enter] fetch · [Esc] cancel".to_string(),
    };

    frame.render_widget(
        Paragraph::new(help_text).style(Style::new().fg(Color::Black).bg(Color::White)),
        help_area,
    );
}

// ── Event handling ─────────────────────────────────────────────────

fn handle_event(app: &mut App, storage: &SqliteStorage, paths: &AppPaths) -> std::io::Result<()> {
    if !event::poll(Duration::from_millis(250))? {
        return Ok(());
    }

    let Event::Key(key) = event::read()? else {
        return Ok(());
    };
    if key.kind != KeyEventKind::Press {
        return Ok(());
    }

    match app.mode {
        Mode::Normal => {
            let shifted = key.modifiers.contains(KeyModifiers::SHIFT);
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
                KeyCode::Char('J') if shifted => {
                    app.explanation_scroll = app.explanation_scroll.saturating_add(1);
                }
                KeyCode::Char('K') if shifted => {
                    app.explanation_scroll = app.explanation_scroll.saturating_sub(1);
                }
                KeyCode::Char('j') | KeyCode::Down => app.select_next(),
                KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
                KeyCode::Char('g') | KeyCode::Home => app.select_first(),
                KeyCode::Char('G') | KeyCode::End => app.select_last(),
                KeyCode::Enter | KeyCode::Char('s') => app.set_selected_as_desktop(),
                KeyCode::Char('o') => app.open_selected(),
                KeyCode::Char('f') => {
                    app.mode = Mode::FetchDate;
                    app.date_input.clear();
                    app.status.clear();
                    app.status_time = None;
                }
                KeyCode::Char('r') => {
                    app.refresh(storage);
                    app.set_status("Refreshed".to_string());
                }
                _ => {}
            }
        }
        Mode::FetchDate => match key.code {
            KeyCode::Esc => {
                app.mode = Mode::Normal;
                app.date_input.clear();
            }
            KeyCode::Enter => {
                app.mode = Mode::Normal;
                app.fetch_entered_date(storage, paths);
            }
            KeyCode::Backspace => {
                app.date_input.pop();
            }
            KeyCode::Char(c) => {
                app.date_input.push(c);
            }
            _ => {}
        },
    }

    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────

pub fn run(paths: &AppPaths) -> crate::errors::Result<()> {
    let storage = cache::init_cache(paths)?;

    let mut app = App::new();
    app.refresh(&storage);

    let mut terminal = ratatui::init();

    let result = (|| {
        loop {
            terminal.draw(|frame| draw(frame, &mut app))?;
            handle_event(&mut app, &storage, paths)?;
            if app.should_quit {
                break;
            }
        }
        Ok::<(), std::io::Error>(())
    })();

    ratatui::restore();

    result?;
    Ok(())
}
