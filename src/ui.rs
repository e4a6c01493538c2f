use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::block::Title;
use ratatui::widgets::{Block, BorderType, Borders, Clear, Gauge, Paragraph, Wrap};
use ratatui::Terminal;
use std::cell::RefCell;
use std::io::{stdout, Stdout};
use std::path::Path;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use stickydesk::geometry::{Frame, Point, Screen, Size};
use stickydesk::minimize::GaugeView;
use stickydesk::model::{ListHash, TaskList};
use stickydesk::settings::Settings;
use stickydesk::storage::YamlStore;
use stickydesk::updates::{
    release_checklist, GithubReleases, UpdateSource, UpdateStatus, CURRENT_VERSION,
};
use stickydesk::window::{VirtualHost, VirtualWindow, WindowHost, WindowId};
use stickydesk::{DeskEvent, Desktop, ListChange};
use tracing::{info, warn};

const POINTS_PER_COL: i32 = 10;
const POINTS_PER_ROW: i32 = 20;
const FOOTER_ROWS: u16 = 2;
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const ABOUT_SIZE: Size = Size::new(420, 200);

pub fn run(store: YamlStore, mut settings: Settings, config_path: &Path) -> Result<()> {
    let checklist = release_checklist(settings.last_seen_version.as_deref(), CURRENT_VERSION);
    if settings.last_seen_version.as_deref() != Some(CURRENT_VERSION) {
        settings.last_seen_version = Some(CURRENT_VERSION.to_string());
        if let Err(err) = settings.save(config_path) {
            warn!(%err, "could not record the running version");
        }
    }

    let mut terminal = setup_terminal()?;
    let result = match App::new(&mut terminal, store, settings, checklist) {
        Ok(mut app) => app.event_loop(&mut terminal),
        Err(err) => Err(err),
    };
    teardown_terminal(&mut terminal)?;
    result
}

type Desk = Desktop<YamlStore, VirtualHost>;

struct App {
    desk: Desk,
    editor: Option<NoteEditor>,
    changes: Rc<RefCell<Vec<ListChange>>>,
    clipboard: Option<arboard::Clipboard>,
    about: Option<WindowId>,
    update: UpdateCheck,
    status: String,
    last_tick: Instant,
}

/// Latest-version lookup behind the About window; runs once per session.
enum UpdateCheck {
    Idle,
    Checking(Receiver<Option<String>>),
    Done(UpdateStatus),
}

impl UpdateCheck {
    fn start(&mut self) {
        if !matches!(self, UpdateCheck::Idle) {
            return;
        }
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(GithubReleases::default().latest_version());
        });
        *self = UpdateCheck::Checking(rx);
    }

    fn poll(&mut self) {
        let UpdateCheck::Checking(rx) = self else {
            return;
        };
        let latest = match rx.try_recv() {
            Ok(latest) => latest,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => None,
        };
        *self = UpdateCheck::Done(UpdateStatus::from_versions(
            latest.as_deref(),
            CURRENT_VERSION,
        ));
    }
}

/// Row of the focused note being edited.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Row {
    Topic,
    Task(DateTime<Utc>),
    NewTask,
}

struct NoteEditor {
    hash: ListHash,
    row: Row,
    field: FieldValue,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_grapheme(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_grapheme(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_grapheme(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl NoteEditor {
    fn new(hash: &str, row: Row, list: &TaskList) -> Self {
        NoteEditor {
            hash: hash.to_string(),
            row,
            field: FieldValue::new(&row_text(list, row)),
        }
    }
}

impl App {
    fn new(
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        store: YamlStore,
        settings: Settings,
        checklist: Option<TaskList>,
    ) -> Result<Self> {
        let size = terminal.size()?;
        let host = VirtualHost::new(vec![screen_for(size.width, size.height)]);
        let mut desk = Desktop::new(store, host, settings);

        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        desk.subscribe(move |change| sink.borrow_mut().push(change.clone()));

        desk.open_windows_for_all_lists().context("opening notes")?;
        if let Some(checklist) = checklist {
            desk.open_release_notes(checklist)
                .context("opening release notes")?;
        }

        let clipboard = match arboard::Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(err) => {
                warn!(%err, "clipboard unavailable");
                None
            }
        };

        let mut app = App {
            desk,
            editor: None,
            changes,
            clipboard,
            about: None,
            update: UpdateCheck::Idle,
            status: String::new(),
            last_tick: Instant::now(),
        };
        app.status = format!("{} note(s) on the desk", app.desk.notes().len());
        app.sync_editor();
        Ok(app)
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(POLL_INTERVAL)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key)? {
                            break;
                        }
                    }
                    Event::Resize(width, height) => {
                        self.desk
                            .host_mut()
                            .set_screens(vec![screen_for(width, height)]);
                        self.desk.handle(DeskEvent::ScreenParametersChanged)?;
                    }
                    _ => {}
                }
            }
            let elapsed = self.last_tick.elapsed();
            self.last_tick = Instant::now();
            self.desk.tick(elapsed.as_secs_f64())?;
            self.desk.host_mut().step_animations();
            self.update.poll();
            self.after_action()?;
        }
        Ok(())
    }

    /// Returns `true` when the desktop should quit.
    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char(ch) = key.code {
                return self.handle_command(ch);
            }
        }
        match key.code {
            KeyCode::F(1) => self.toggle_about()?,
            KeyCode::F(2) => {
                let visibility = self.desk.visibility();
                self.desk.handle(DeskEvent::VisibilityChanged {
                    blur: !visibility.blur,
                    to_normal_level: visibility.normal_level,
                })?;
            }
            KeyCode::F(3) => {
                let visibility = self.desk.visibility();
                self.desk.handle(DeskEvent::VisibilityChanged {
                    blur: visibility.blur,
                    to_normal_level: !visibility.normal_level,
                })?;
                self.status = if visibility.normal_level {
                    "Notes float above other windows".into()
                } else {
                    "Notes stay at normal level".into()
                };
            }
            KeyCode::Tab => {
                self.commit_editor()?;
                self.desk.focus_next(true)?;
            }
            KeyCode::BackTab => {
                self.commit_editor()?;
                self.desk.focus_next(false)?;
            }
            KeyCode::Up => self.move_row(-1)?,
            KeyCode::Down => self.move_row(1)?,
            KeyCode::Enter => self.submit_row()?,
            KeyCode::Esc => self.commit_editor()?,
            KeyCode::Left => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.field.move_left();
                }
            }
            KeyCode::Right => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.field.move_right();
                }
            }
            KeyCode::Backspace => self.backspace()?,
            KeyCode::Char(ch) => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.field.insert_char(ch);
                }
            }
            _ => {}
        }
        self.after_action()?;
        Ok(false)
    }

    fn handle_command(&mut self, ch: char) -> Result<bool> {
        self.commit_editor()?;
        let focused = self.desk.focused_list().map(str::to_string);
        match ch {
            'q' => {
                self.desk.handle(DeskEvent::ApplicationWillTerminate)?;
                info!("quit");
                return Ok(true);
            }
            'n' => self.desk.handle(DeskEvent::NewNoteRequested)?,
            'w' => self.close_focused()?,
            'g' => self.desk.handle(DeskEvent::ArrangeRequested)?,
            'b' => self.desk.handle(DeskEvent::ArrangeMinimizedRequested)?,
            'd' => {
                if let Some(hash) = focused {
                    self.desk.toggle_minimized(&hash);
                }
            }
            'y' => self.desk.handle(DeskEvent::MinimizeAllRequested)?,
            'u' => self.desk.handle(DeskEvent::BringAllUpRequested)?,
            't' => self.toggle_selected()?,
            'x' => {
                if let Some(hash) = focused {
                    if self.desk.cancel_fade(&hash) {
                        self.status = "Kept the note".into();
                    } else if !self.desk.settings().is_pro() {
                        self.status = "Keeping finished notes needs the pro license".into();
                    }
                }
            }
            'c' => self.copy_focused(),
            'v' => self.paste_into_focused()?,
            _ => {}
        }
        self.after_action()?;
        Ok(false)
    }

    /// Keeps the desktop's focus in step with the host and the editor with the desktop.
    fn after_action(&mut self) -> Result<()> {
        let key = self.desk.host().key_window();
        if key != self.desk.focused_window() {
            if let Some(window) = key {
                self.desk.handle(DeskEvent::WindowDidBecomeKey(window))?;
            }
        }
        if let Some(about) = self.about {
            if !self.desk.host().is_open(about) {
                self.about = None;
            }
        }
        let changes: Vec<ListChange> = self.changes.borrow_mut().drain(..).collect();
        for change in changes {
            match change {
                ListChange::Created(_) => self.status = "New note".into(),
                ListChange::Deleted(hash) => {
                    if self.editor.as_ref().map_or(false, |e| e.hash == hash) {
                        self.editor = None;
                    }
                    self.status = "Note removed".into();
                }
                ListChange::Updated(_) => {}
            }
        }
        self.sync_editor();
        Ok(())
    }

    fn sync_editor(&mut self) {
        let Some(hash) = self.desk.focused_list().map(str::to_string) else {
            self.editor = None;
            return;
        };
        let Some(list) = self.desk.list(&hash) else {
            self.editor = None;
            return;
        };
        let stale = match &self.editor {
            Some(editor) if editor.hash == hash => match editor.row {
                Row::Task(created) => list.task(created).map_or(true, |t| t.is_done()),
                Row::Topic | Row::NewTask => false,
            },
            _ => true,
        };
        if stale {
            self.editor = Some(NoteEditor::new(&hash, Row::NewTask, list));
        }
    }

    /// Writes the edited row back to the note.
    fn commit_editor(&mut self) -> Result<()> {
        let Some(editor) = self.editor.as_mut() else {
            return Ok(());
        };
        let Some(list) = self.desk.list(&editor.hash) else {
            return Ok(());
        };
        let text = editor.field.value.clone();
        if text == row_text(list, editor.row) {
            return Ok(());
        }
        match editor.row {
            Row::Topic => self.desk.set_topic(&editor.hash, &text)?,
            Row::Task(created) => {
                self.desk.edit_task(&editor.hash, created, &text)?;
            }
            Row::NewTask => {
                self.desk.add_task(&editor.hash, &text, None)?;
            }
        }
        if let Some(list) = self.desk.list(&editor.hash) {
            editor.field = FieldValue::new(&row_text(list, editor.row));
        }
        Ok(())
    }

    fn move_row(&mut self, delta: isize) -> Result<()> {
        self.commit_editor()?;
        let Some(editor) = self.editor.as_mut() else {
            return Ok(());
        };
        let Some(list) = self.desk.list(&editor.hash) else {
            return Ok(());
        };
        let rows = rows_of(list);
        let current = rows.iter().position(|r| *r == editor.row).unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, rows.len() as isize - 1) as usize;
        *editor = NoteEditor::new(&editor.hash, rows[next], list);
        Ok(())
    }

    fn submit_row(&mut self) -> Result<()> {
        let row = self.editor.as_ref().map(|e| e.row);
        self.commit_editor()?;
        if row != Some(Row::NewTask) {
            self.move_row(1)?;
        }
        Ok(())
    }

    /// Backspace on an empty task deletes it.
    fn backspace(&mut self) -> Result<()> {
        let Some(editor) = self.editor.as_mut() else {
            return Ok(());
        };
        if let Row::Task(created) = editor.row {
            if editor.field.value.is_empty() {
                let hash = editor.hash.clone();
                self.move_row(-1)?;
                self.desk.remove_task(&hash, created)?;
                return Ok(());
            }
        }
        editor.field.backspace();
        Ok(())
    }

    fn toggle_selected(&mut self) -> Result<()> {
        let Some(editor) = self.editor.as_ref() else {
            return Ok(());
        };
        if let Row::Task(created) = editor.row {
            let hash = editor.hash.clone();
            // the row stops being selectable once done
            self.move_row(1)?;
            self.desk.toggle_task(&hash, created)?;
        }
        Ok(())
    }

    fn close_focused(&mut self) -> Result<()> {
        let blocked = self
            .desk
            .focused_list()
            .and_then(|hash| self.desk.list(hash))
            .map_or(false, |list| !list.is_deletable());
        self.desk.handle(DeskEvent::CloseRequested)?;
        if blocked {
            self.status = "Finish or clear the note to close it".into();
        }
        Ok(())
    }

    fn toggle_about(&mut self) -> Result<()> {
        if let Some(about) = self.about.take() {
            self.desk.host_mut().close(about);
            return Ok(());
        }
        let Some(screen) = self.desk.host().main_screen() else {
            return Ok(());
        };
        let frame = Frame::centered_at(screen.frame.center(), ABOUT_SIZE);
        let host = self.desk.host_mut();
        let window = host.open("About", frame);
        host.set_close_button_enabled(window, true);
        self.about = Some(window);
        self.update.start();
        self.desk.handle(DeskEvent::WindowDidBecomeKey(window))?;
        Ok(())
    }

    /// Copies the selected task, or the whole note as HTML from any other row.
    fn copy_focused(&mut self) {
        let selected = self.editor.as_ref().and_then(|e| match e.row {
            Row::Task(created) => Some((e.hash.clone(), created)),
            Row::Topic | Row::NewTask => None,
        });
        let (content, what) = match selected {
            Some((hash, created)) => (self.desk.copy_task(&hash, created), "task"),
            None => (
                self.desk.focused_list().and_then(|h| self.desk.copy(h)),
                "note",
            ),
        };
        let Some(content) = content else {
            return;
        };
        match self.clipboard.as_mut().map(|c| c.set_text(content)) {
            Some(Ok(())) => self.status = format!("Copied {}", what),
            Some(Err(err)) => warn!(%err, "clipboard write failed"),
            None => self.status = "Clipboard unavailable".into(),
        }
    }

    fn paste_into_focused(&mut self) -> Result<()> {
        let Some(editor) = self.editor.as_ref() else {
            return Ok(());
        };
        let hash = editor.hash.clone();
        let row = editor.row;
        let content = match self.clipboard.as_mut().map(|c| c.get_text()) {
            Some(Ok(content)) => content,
            Some(Err(err)) => {
                warn!(%err, "clipboard read failed");
                return Ok(());
            }
            None => return Ok(()),
        };
        let Some(list) = self.desk.list(&hash) else {
            return Ok(());
        };
        let pasted = match row {
            Row::Task(created) => self.desk.paste_into_task(&hash, created, &content)?,
            Row::Topic => self.desk.paste(&hash, &content, 0)?,
            Row::NewTask => {
                let at = list.next_order();
                self.desk.paste(&hash, &content, at)?
            }
        };
        if let Some(editor) = self.editor.as_mut() {
            if let Some(list) = self.desk.list(&hash) {
                editor.field = FieldValue::new(&row_text(list, editor.row));
            }
        }
        self.status = format!("Pasted {} task(s)", pasted);
        Ok(())
    }

    fn draw(&self, f: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(FOOTER_ROWS)])
            .split(f.size());
        let desk_area = chunks[0];
        let host = self.desk.host();
        let key = host.key_window();
        for id in host.stacking_order() {
            let Some(window) = host.window(id) else {
                continue;
            };
            let Some(rect) = frame_to_rect(window.shown, desk_area) else {
                continue;
            };
            f.render_widget(Clear, rect);
            if Some(id) == self.about {
                self.draw_about(f, rect);
            } else {
                self.draw_note(f, rect, id, window, key == Some(id));
            }
        }
        self.draw_footer(f, chunks[1]);
    }

    fn draw_note(
        &self,
        f: &mut ratatui::Frame<'_>,
        rect: Rect,
        id: WindowId,
        window: &VirtualWindow,
        focused: bool,
    ) {
        let Some(note) = self.desk.note_for_window(id) else {
            return;
        };
        let Some(list) = self.desk.list(&note.hash) else {
            return;
        };
        let color = if list.is_system() {
            Color::LightGreen
        } else {
            Color::Yellow
        };
        let mut style = Style::default().fg(color);
        if window.alpha < 1.0 {
            style = style.add_modifier(Modifier::DIM);
        }
        let title = list.topic.clone().unwrap_or_else(|| "New note".to_string());
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_type(if focused {
                BorderType::Thick
            } else {
                BorderType::Rounded
            })
            .border_style(style)
            .title(truncate_text(
                &blur(&title, window.blurred),
                rect.width.saturating_sub(6) as usize,
            ));
        if !window.close_hidden {
            let mark = if window.close_enabled { "[x]" } else { "[-]" };
            block = block.title(Title::from(mark).alignment(Alignment::Right));
        }
        let inner = block.inner(rect);
        f.render_widget(block, rect);

        if note.minimize.is_minimized() {
            let gauge = GaugeView::of(list);
            let widget = Gauge::default()
                .gauge_style(style)
                .ratio(gauge.ratio().clamp(0.0, 1.0))
                .label(gauge.label());
            f.render_widget(widget, inner);
            return;
        }

        let overlay_rows = if note.fade.is_done() && inner.height >= 4 {
            2
        } else {
            0
        };
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(overlay_rows)])
            .split(inner);

        let editor = self
            .editor
            .as_ref()
            .filter(|e| focused && e.hash == note.hash);
        let lines = note_lines(list, editor, window.blurred);
        f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), parts[0]);

        if overlay_rows > 0 {
            self.draw_done_overlay(f, parts[1], note);
        }
    }

    fn draw_done_overlay(
        &self,
        f: &mut ratatui::Frame<'_>,
        area: Rect,
        note: &stickydesk::desktop::NoteWindow,
    ) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);
        f.render_widget(
            Paragraph::new("✓ All done")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Green)),
            rows[0],
        );
        if !note.fade.shows_progress() {
            return;
        }
        let timeout = note.fade.timeout().max(f64::EPSILON);
        let mut label = "Fading out...".to_string();
        if note.fade.can_cancel(self.desk.settings().license) {
            label.push_str(" ^X keep");
        }
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::DarkGray))
            .ratio((note.fade.progress() / timeout).clamp(0.0, 1.0))
            .label(label);
        f.render_widget(gauge, rows[1]);
    }

    fn draw_about(&self, f: &mut ratatui::Frame<'_>, rect: Rect) {
        let mut lines = vec![
            Line::from(Span::styled(
                format!("stickydesk v{}", CURRENT_VERSION),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from("Floating to-do notes that fade away once done."),
            Line::from(Span::styled(
                format!("License: {:?}", self.desk.settings().license),
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(""),
        ];
        match &self.update {
            UpdateCheck::Idle | UpdateCheck::Checking(_) => {
                lines.push(Line::from("Checking for updates..."));
            }
            UpdateCheck::Done(status) => {
                let color = if status.is_available() {
                    Color::LightGreen
                } else {
                    Color::Reset
                };
                lines.push(Line::from(Span::styled(
                    status.headline(),
                    Style::default().fg(color),
                )));
                lines.push(Line::from(status.detail()));
            }
        }
        let about = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::LightCyan))
                    .title("About"),
            );
        f.render_widget(about, rect);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);
        f.render_widget(
            Paragraph::new(help_line()).alignment(Alignment::Center),
            rows[0],
        );
        let visibility = self.desk.visibility();
        let mut flags = Vec::new();
        if visibility.blur {
            flags.push("blurred");
        }
        if visibility.normal_level {
            flags.push("normal level");
        }
        let status = if flags.is_empty() {
            self.status.clone()
        } else {
            format!("{}  ({})", self.status, flags.join(", "))
        };
        f.render_widget(
            Paragraph::new(status).style(Style::default().fg(Color::DarkGray)),
            rows[1],
        );
    }
}

/// Editable rows; done tasks are shown but cannot be selected.
fn rows_of(list: &TaskList) -> Vec<Row> {
    let mut rows = vec![Row::Topic];
    rows.extend(
        list.ordered()
            .iter()
            .filter(|t| !t.is_done())
            .map(|t| Row::Task(t.created_at)),
    );
    rows.push(Row::NewTask);
    rows
}

fn row_text(list: &TaskList, row: Row) -> String {
    match row {
        Row::Topic => list.topic.clone().unwrap_or_default(),
        Row::Task(created) => list.task(created).map(|t| t.text.clone()).unwrap_or_default(),
        Row::NewTask => String::new(),
    }
}

fn note_lines(list: &TaskList, editor: Option<&NoteEditor>, blurred: bool) -> Vec<Line<'static>> {
    let selected = Style::default().add_modifier(Modifier::REVERSED);
    let mut lines = Vec::new();
    if let Some(editor) = editor.filter(|e| e.row == Row::Topic) {
        lines.push(Line::from(vec![
            Span::styled("# ", Style::default().fg(Color::DarkGray)),
            Span::styled(editor.field.with_caret(), selected),
        ]));
    }
    for task in list.ordered() {
        let editing = editor.filter(|e| e.row == Row::Task(task.created_at));
        let check = if task.is_done() { "[x] " } else { "[ ] " };
        let (text, mut style) = match editing {
            Some(editor) => (editor.field.with_caret(), selected),
            None => (blur(&task.text, blurred), Style::default()),
        };
        if task.is_done() {
            style = style.fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT);
        }
        lines.push(Line::from(vec![Span::raw(check), Span::styled(text, style)]));
    }
    match editor.filter(|e| e.row == Row::NewTask) {
        Some(editor) => lines.push(Line::from(vec![
            Span::raw("+ "),
            Span::styled(editor.field.with_caret(), selected),
        ])),
        None => lines.push(Line::from(Span::styled(
            "+ new task",
            Style::default().fg(Color::DarkGray),
        ))),
    }
    lines
}

fn help_line() -> Line<'static> {
    let key = Style::default().fg(Color::LightCyan);
    let mut spans = Vec::new();
    for (k, label) in [
        ("^N", "new"),
        ("^W", "close"),
        ("^G", "arrange"),
        ("^D", "minimize"),
        ("^T", "done"),
        ("Tab", "next"),
        ("F1", "about"),
        ("F2", "blur"),
        ("^Q", "quit"),
    ] {
        spans.push(Span::styled(k, key));
        spans.push(Span::raw(format!(" {}  ", label)));
    }
    Line::from(spans)
}

/// The terminal is one screen without a menu bar.
fn screen_for(cols: u16, rows: u16) -> Screen {
    let height = rows.saturating_sub(FOOTER_ROWS) as i32 * POINTS_PER_ROW;
    Screen {
        id: 0,
        frame: Frame::from_parts(
            Point::new(0, 0),
            Size::new(cols as i32 * POINTS_PER_COL, height),
        ),
        menu_bar_height: 0,
    }
}

/// Maps a bottom-left-origin frame in points onto terminal cells, clipped to `area`.
fn frame_to_rect(frame: Frame, area: Rect) -> Option<Rect> {
    let screen_height = area.height as i32 * POINTS_PER_ROW;
    let left = frame.x.div_euclid(POINTS_PER_COL);
    let top = (screen_height - frame.max_y()).div_euclid(POINTS_PER_ROW);
    let width = (frame.width / POINTS_PER_COL).max(1);
    let height = (frame.height / POINTS_PER_ROW).max(1);

    let x0 = left.max(0);
    let y0 = top.max(0);
    let x1 = (left + width).min(area.width as i32);
    let y1 = (top + height).min(area.height as i32);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(Rect::new(
        area.x + x0 as u16,
        area.y + y0 as u16,
        (x1 - x0) as u16,
        (y1 - y0) as u16,
    ))
}

fn blur(text: &str, blurred: bool) -> String {
    if !blurred {
        return text.to_string();
    }
    text.chars()
        .map(|c| if c.is_whitespace() { c } else { '░' })
        .collect()
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn prev_grapheme(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map_or(0, |(idx, _)| idx)
}

fn next_grapheme(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map_or(text.len(), |ch| cursor + ch.len_utf8())
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_map_to_cells_with_y_flipped() {
        let area = Rect::new(0, 0, 80, 20);
        let note = Frame::new(0, 0, 250, 300);
        assert_eq!(frame_to_rect(note, area), Some(Rect::new(0, 5, 25, 15)));
        let top_right = Frame::new(550, 100, 250, 300);
        assert_eq!(frame_to_rect(top_right, area), Some(Rect::new(55, 0, 25, 15)));
    }

    #[test]
    fn offscreen_frames_are_clipped_or_dropped() {
        let area = Rect::new(0, 0, 80, 20);
        assert_eq!(
            frame_to_rect(Frame::new(-100, 0, 250, 300), area),
            Some(Rect::new(0, 5, 15, 15))
        );
        assert_eq!(frame_to_rect(Frame::new(900, 0, 250, 300), area), None);
    }

    #[test]
    fn screen_leaves_room_for_footer() {
        let screen = screen_for(120, 40);
        assert_eq!(screen.frame, Frame::new(0, 0, 1200, 760));
        assert_eq!(screen.menu_bar_height, 0);
    }

    #[test]
    fn field_edits_respect_multibyte_chars() {
        let mut field = FieldValue::new("café");
        field.backspace();
        assert_eq!(field.value, "caf");
        field.move_left();
        field.insert_char('ß');
        assert_eq!(field.value, "caßf");
        field.move_right();
        assert_eq!(field.with_caret(), "caßf▌");
    }

    #[test]
    fn done_tasks_are_not_selectable_rows() {
        use chrono::TimeZone;
        let stamp = |secs: i64| Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        let mut list = TaskList::new(stamp(0));
        list.append_task("milk");
        list.append_task("eggs");
        list.append_task("bread");
        let eggs = list.ordered()[1].created_at;
        list.toggle_done(eggs);

        let rows = rows_of(&list);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], Row::Topic);
        assert!(!rows.contains(&Row::Task(eggs)));
        assert_eq!(rows[3], Row::NewTask);

        // still drawn, just not reachable
        assert_eq!(note_lines(&list, None, false).len(), 4);
    }

    #[test]
    fn blur_keeps_word_shapes() {
        assert_eq!(blur("buy milk", true), "░░░ ░░░░");
        assert_eq!(blur("buy milk", false), "buy milk");
        assert_eq!(truncate_text("Groceries for the week", 10), "Groceri...");
    }
}
