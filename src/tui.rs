use anyhow::{anyhow, Result};
use chrono::Local;
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
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::export::{education_summary, export_applications};
use crate::models::{Application, MaritalStatus, YesNo};
use crate::sync::{SearchResponse, SearchSequencer, SyncCoordinator};

type Shared = Arc<Mutex<SyncCoordinator>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Search,
    ConfirmDelete,
}

struct AppState {
    records: Vec<Application>,
    selected: usize,
    scroll_offset: u16,
    query: String,
    mode: Mode,
    loading: bool,
    status: String,
}

impl AppState {
    fn new(records: Vec<Application>) -> Self {
        let status = format!("{} records loaded", records.len());
        Self {
            records,
            selected: 0,
            scroll_offset: 0,
            query: String::new(),
            mode: Mode::Browse,
            loading: false,
            status,
        }
    }

    fn current(&self) -> Option<&Application> {
        self.records.get(self.selected)
    }

    fn next(&mut self) {
        if !self.records.is_empty() && self.selected < self.records.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    /// Swap in a new result set, keeping the selection in range.
    fn replace(&mut self, records: Vec<Application>) {
        let keep = self.current().map(|a| a.id.clone());
        self.records = records;
        self.selected = keep
            .and_then(|id| self.records.iter().position(|a| a.id == id))
            .unwrap_or(0);
        self.scroll_offset = 0;
    }

    fn remove(&mut self, id: &str) {
        self.records.retain(|a| a.id != id);
        if self.selected >= self.records.len() {
            self.selected = self.records.len().saturating_sub(1);
        }
        self.scroll_offset = 0;
    }
}

/// Searches already in flight were answered before the delete and would
/// bring the row back, so retire their tickets along with the row.
fn forget_deleted(state: &mut AppState, sequencer: &SearchSequencer, id: &str) {
    sequencer.dispatch();
    state.loading = false;
    state.remove(id);
}

fn lock(sync: &Shared) -> Result<MutexGuard<'_, SyncCoordinator>> {
    sync.lock().map_err(|_| anyhow!("sync coordinator lock poisoned"))
}

/// Run a search off the UI thread. Every keystroke gets its own ticket;
/// whichever response is current when it lands wins.
fn dispatch_search(sync: &Shared, sequencer: &SearchSequencer, query: &str, tx: &Sender<SearchResponse>) {
    let ticket = sequencer.dispatch();
    let sync = Arc::clone(sync);
    let tx = tx.clone();
    let query = query.to_string();
    thread::spawn(move || {
        let response = match sync.lock() {
            Ok(mut coordinator) => coordinator.search_tagged(ticket, &query),
            Err(_) => return,
        };
        let _ = tx.send(response);
    });
}

pub fn run_console(sync: SyncCoordinator, export_dir: PathBuf) -> Result<()> {
    let sync: Shared = Arc::new(Mutex::new(sync));
    let records = lock(&sync)?.list();
    let mut state = AppState::new(records);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, &sync, &export_dir);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    sync: &Shared,
    export_dir: &Path,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    let sequencer = SearchSequencer::new();
    let (tx, rx): (Sender<SearchResponse>, Receiver<SearchResponse>) = mpsc::channel();

    loop {
        for response in rx.try_iter() {
            if sequencer.accept(&response) {
                state.loading = false;
                state.replace(response.records);
                state.status = format!("{} records match '{}'", state.records.len(), response.query);
            } else {
                tracing::debug!(query = %response.query, "dropping stale search response");
            }
        }
        list_state.select(if state.records.is_empty() { None } else { Some(state.selected) });

        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match state.mode {
            Mode::Search => match key.code {
                KeyCode::Esc | KeyCode::Enter => state.mode = Mode::Browse,
                KeyCode::Backspace => {
                    state.query.pop();
                    state.loading = true;
                    dispatch_search(sync, &sequencer, &state.query, &tx);
                }
                KeyCode::Char(c) => {
                    state.query.push(c);
                    state.loading = true;
                    dispatch_search(sync, &sequencer, &state.query, &tx);
                }
                _ => {}
            },

            Mode::ConfirmDelete => {
                match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => {
                        if let Some(id) = state.current().map(|a| a.id.clone()) {
                            let outcome = lock(sync)?.delete(&id)?;
                            forget_deleted(state, &sequencer, &id);
                            state.status = if outcome.mirrored {
                                format!("Deleted {}", id)
                            } else {
                                format!("Deleted {} locally (queued for sync)", id)
                            };
                        }
                    }
                    _ => state.status = "Delete cancelled".to_string(),
                }
                state.mode = Mode::Browse;
            }

            Mode::Browse => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('/') => state.mode = Mode::Search,
                KeyCode::Char('r') => {
                    state.loading = true;
                    dispatch_search(sync, &sequencer, &state.query, &tx);
                }
                KeyCode::Char('d') => {
                    if let Some(prompt) = state.current().map(|app| format!("Delete {} ({})? y/n", app.form.full_name(), app.id)) {
                        state.status = prompt;
                        state.mode = Mode::ConfirmDelete;
                    }
                }
                KeyCode::Char('e') => {
                    state.status = match export_applications(&state.records, export_dir, Local::now())? {
                        Some(path) => format!("Exported {} records to {}", state.records.len(), path.display()),
                        None => "No records to export.".to_string(),
                    };
                }
                _ => {}
            },
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    // Search bar
    let search_title = if state.mode == Mode::Search { " Search (typing) " } else { " Search (/) " };
    let spinner = if state.loading { "  ..." } else { "" };
    let search = Paragraph::new(format!("{}{}", state.query, spinner)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(search_title)
            .border_style(if state.mode == Mode::Search {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            }),
    );
    frame.render_widget(search, rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[1]);

    // Left panel: applicants
    let items: Vec<ListItem> = state
        .records
        .iter()
        .map(|app| {
            let name = app.form.full_name();
            let name = if name.len() > 24 {
                format!("{}...", name.chars().take(21).collect::<String>())
            } else {
                name
            };
            ListItem::new(format!("{:<10} {}", app.form.employee_code, name))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Applicants ({}) ", state.records.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: detail
    let detail = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail, chunks[1]);

    // Footer
    let footer = match state.mode {
        Mode::ConfirmDelete => Paragraph::new(format!(" {}", state.status)).style(Style::default().fg(Color::Red)),
        _ => Paragraph::new(format!(
            " j/k:navigate  J/K:scroll  /:search  r:reload  d:delete  e:export  q:quit | {}",
            state.status
        ))
        .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, rows[2]);
}

fn heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan),
    ))
}

fn field(label: &str, value: &str) -> Line<'static> {
    let value = if value.trim().is_empty() { "-" } else { value };
    Line::from(vec![
        Span::styled(format!("  {:<16}", label), Style::default().fg(Color::DarkGray)),
        Span::raw(value.to_string()),
    ])
}

fn build_detail(state: &AppState) -> Text<'static> {
    let Some(app) = state.current() else {
        return Text::raw(if state.query.is_empty() {
            "No applications found."
        } else {
            "No applications match this search."
        });
    };
    let f = &app.form;
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        f.full_name(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("{}  |  {}", f.employee_code, app.id)));
    lines.push(Line::from(Span::styled(
        format!("Submitted {}", app.submitted_at),
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));

    lines.push(heading("PERSONAL"));
    lines.push(field("Father", &f.father_name));
    lines.push(field("Mother", &f.mother_name));
    lines.push(field("Email", &f.email));
    lines.push(field("Mobile", &f.mobile));
    lines.push(field("Alt. mobile", &f.alternate_mobile));
    lines.push(field("DOB", &f.dob));
    lines.push(field("DOJ", &f.doj));
    lines.push(field("Marital status", &f.marital_status.to_string()));
    if f.marital_status == MaritalStatus::Married {
        lines.push(field("Wife", &f.wife_name));
    }
    lines.push(field("Blood group", &f.blood_group));
    lines.push(field("Family members", &f.family_members_count));
    lines.push(Line::from(""));

    lines.push(heading("BANK & ID"));
    lines.push(field("Account", &f.bank_account));
    lines.push(field("IFSC", &f.ifsc_code));
    lines.push(field("Aadhaar", &f.aadhaar_number));
    lines.push(field("PAN", &f.pan_number));
    lines.push(field("UAN", &f.uan_number));
    lines.push(field("ESIC", &f.esic_number));
    lines.push(Line::from(""));

    lines.push(heading("ADDRESS"));
    for (label, address) in [("Local", &f.local_address), ("Permanent", &f.permanent_address)] {
        let wrapped = textwrap::fill(address, 50);
        let mut parts = wrapped.lines();
        lines.push(field(label, parts.next().unwrap_or("")));
        for rest in parts {
            lines.push(field("", rest));
        }
    }
    lines.push(field("Pincode", &f.pincode));
    lines.push(Line::from(""));

    lines.push(heading("EDUCATION"));
    let education = education_summary(f);
    if education.is_empty() {
        lines.push(field("", ""));
    } else {
        for entry in education.split("; ") {
            lines.push(Line::from(format!("  {}", entry)));
        }
    }
    lines.push(Line::from(""));

    lines.push(heading("EMPLOYMENT"));
    let jobs: Vec<_> = f.employment.iter().filter(|e| !e.is_blank()).collect();
    if jobs.is_empty() {
        lines.push(Line::from("  (fresher)"));
    }
    for emp in jobs {
        lines.push(Line::from(format!(
            "  {} - {} ({}), {} to {}, CTC {}",
            emp.employer, emp.designation, emp.location, emp.from_date, emp.to_date, emp.ctc
        )));
    }
    lines.push(Line::from(""));

    lines.push(heading("REFERENCES"));
    for reference in &f.references {
        lines.push(Line::from(format!(
            "  {} ({}) {}",
            reference.name, reference.organization, reference.mobile
        )));
    }
    lines.push(Line::from(""));

    lines.push(heading("DECLARATION"));
    if f.is_related_to_company == YesNo::Yes {
        lines.push(field(
            "Related to",
            &format!(
                "{} ({}, {})",
                f.related_person_name, f.related_company_name, f.related_department
            ),
        ));
    } else {
        lines.push(field("Related to", "nobody in the company"));
    }
    lines.push(field("Signature", &f.signature));
    lines.push(field("Date", &f.submission_date));

    Text::from(lines)
}
