#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};

use crate::config::Config;
use crate::task::model::{Priority, Task};
use crate::task::storage::KeyValueStore;
use crate::task::store::{Outcome, Rejection, TaskStore};
use crate::task::view::FilterMode;
use crate::theme::{Theme, ThemeStore};
use crate::tui::TerminalGuard;
use crate::tui::palette::Palette;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Input,
}

#[derive(Debug, Clone, Default)]
struct TextInput {
    text: String,
    cursor: usize,
}

impl TextInput {
    fn new(initial: impl Into<String>) -> Self {
        let text = initial.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    fn as_str(&self) -> &str {
        &self.text
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_at(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map_or(self.text.len(), |(i, _)| i)
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_at(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let start = self.byte_at(self.cursor - 1);
        let end = self.byte_at(self.cursor);
        self.text.replace_range(start..end, "");
        self.cursor -= 1;
    }

    fn delete(&mut self) {
        if self.cursor >= self.len() {
            return;
        }
        let start = self.byte_at(self.cursor);
        let end = self.byte_at(self.cursor + 1);
        self.text.replace_range(start..end, "");
    }

    fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditField {
    Text,
    Priority,
}

/// Screen state of the edit dialog. The draft itself lives in the store.
#[derive(Debug, Clone)]
struct EditDialog {
    input: TextInput,
    field: EditField,
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingsItem {
    LightTheme,
    DarkTheme,
    ClearAll,
}

const SETTINGS_ITEMS: [SettingsItem; 3] = [
    SettingsItem::LightTheme,
    SettingsItem::DarkTheme,
    SettingsItem::ClearAll,
];

#[derive(Debug, Clone, Default)]
struct SettingsDialog {
    selected: usize,
}

#[derive(Debug, Clone)]
struct ConfirmDialog {
    title: String,
    message: String,
    action: ConfirmAction,
}

#[derive(Debug, Clone)]
enum ConfirmAction {
    DeleteTask { id: String },
    ClearAll,
}

#[derive(Debug, Clone)]
struct Toast {
    message: String,
    until: Instant,
}

impl Toast {
    fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            until: Instant::now() + Duration::from_secs(3),
        }
    }
}

struct AppState<S> {
    store: TaskStore<S>,
    themes: ThemeStore<S>,
    theme: Theme,
    icons: bool,
    confirm_delete: bool,

    mode: Mode,
    input: TextInput,
    list_state: ListState,

    edit: Option<EditDialog>,
    settings: Option<SettingsDialog>,
    confirm: Option<ConfirmDialog>,
    show_help: bool,

    toast: Option<Toast>,
    last_error: Option<String>,
    should_quit: bool,
}

impl<S: KeyValueStore> AppState<S> {
    fn new(cfg: &Config, store: TaskStore<S>, themes: ThemeStore<S>) -> Self {
        let theme = themes.load();
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        let mut app = Self {
            store,
            themes,
            theme,
            icons: cfg.ui.icons,
            confirm_delete: cfg.ui.confirm_delete,
            mode: Mode::Normal,
            input: TextInput::default(),
            list_state,
            edit: None,
            settings: None,
            confirm: None,
            show_help: false,
            toast: None,
            last_error: None,
            should_quit: false,
        };
        // Start typing straight away when there is nothing to look at yet.
        if app.store.tasks().is_empty() {
            app.mode = Mode::Input;
        }
        app
    }

    fn palette(&self) -> Palette {
        Palette::for_theme(self.theme)
    }

    fn visible_len(&self) -> usize {
        self.store.view().tasks.len()
    }

    fn selected_index(&self) -> usize {
        self.list_state.selected().unwrap_or(0)
    }

    fn selected_task(&self) -> Option<&Task> {
        let idx = self.selected_index();
        self.store.view().tasks.get(idx).map(|v| v.task)
    }

    fn selected_id(&self) -> Option<String> {
        self.selected_task().map(|t| t.id.clone())
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_len();
        let idx = self.selected_index().min(len.saturating_sub(1));
        self.list_state.select(Some(idx));
    }

    fn move_selection(&mut self, delta: i64) {
        let len = self.visible_len();
        if len == 0 {
            return;
        }
        let cur = i64::try_from(self.selected_index()).unwrap_or(0);
        let max = i64::try_from(len - 1).unwrap_or(0);
        let next = usize::try_from((cur + delta).clamp(0, max)).unwrap_or(0);
        self.list_state.select(Some(next));
    }

    fn select_last(&mut self) {
        self.list_state
            .select(Some(self.visible_len().saturating_sub(1)));
    }

    fn set_filter(&mut self, filter: FilterMode) {
        if self.store.filter() != filter {
            self.store.set_filter(filter);
            self.list_state.select(Some(0));
        }
    }

    fn apply_theme(&mut self, theme: Theme) {
        self.theme = theme;
        if let Err(e) = self.themes.save(theme) {
            tracing::warn!(error = %format!("{e:#}"), "failed to save theme");
            self.toast = Some(Toast::info(format!("Theme not saved: {e}")));
        }
    }

    fn sync_persist_error(&mut self) {
        self.last_error = self
            .store
            .last_persist_error()
            .map(|e| format!("Changes not saved: {e}"));
    }
}

/// Runs the interactive list until the user quits.
pub fn run<S: KeyValueStore>(
    cfg: &Config,
    store: TaskStore<S>,
    themes: ThemeStore<S>,
) -> anyhow::Result<()> {
    let mut guard = TerminalGuard::new()?;
    let mut app = AppState::new(cfg, store, themes);

    loop {
        if let Some(toast) = &app.toast
            && Instant::now() >= toast.until
        {
            app.toast = None;
        }

        guard.terminal()?.draw(|f| draw(f, &mut app))?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(50))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            handle_key(key, &mut app);
        }
    }

    Ok(())
}

fn draw<S: KeyValueStore>(f: &mut Frame<'_>, app: &mut AppState<S>) {
    let area = f.area();
    let palette = app.palette();
    f.render_widget(Block::default().style(palette.base()), area);

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(f, root[0], app, &palette);
    draw_input(f, root[1], app, &palette);
    draw_filters(f, root[2], app, &palette);
    draw_list(f, root[3], app, &palette);
    draw_stats(f, root[4], app, &palette);
    draw_footer(f, root[5], app);

    if let Some(dialog) = &app.edit {
        draw_edit_popup(f, app, dialog, &palette);
    } else if let Some(dialog) = &app.settings {
        draw_settings_popup(f, app, dialog, &palette);
    }
    if let Some(confirm) = &app.confirm {
        draw_confirm(f, confirm, &palette);
    }
    if app.show_help {
        draw_help(f, &palette);
    }
}

fn draw_header<S: KeyValueStore>(f: &mut Frame<'_>, area: Rect, app: &AppState<S>, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let title = Paragraph::new(Line::from(Span::styled(
        "Simple Todo",
        Style::default()
            .fg(palette.fg)
            .add_modifier(Modifier::BOLD),
    )));
    f.render_widget(title, chunks[0]);

    let indicator = match app.theme {
        Theme::Light => "☀ Light",
        Theme::Dark => "☾ Dark",
    };
    let right = Paragraph::new(Line::from(vec![
        Span::styled(indicator, Style::default().fg(palette.accent)),
        Span::styled("  t toggle • s settings", palette.dim()),
    ]))
    .alignment(Alignment::Right);
    f.render_widget(right, chunks[1]);
}

fn draw_input<S: KeyValueStore>(f: &mut Frame<'_>, area: Rect, app: &AppState<S>, palette: &Palette) {
    let focused = app.mode == Mode::Input && !has_modal(app);
    let border = if focused {
        Style::default().fg(palette.accent)
    } else {
        palette.dim()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title("New task");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let line = if app.input.as_str().is_empty() {
        Line::from(Span::styled("Add a new task...", palette.dim()))
    } else {
        Line::from(Span::styled(app.input.as_str(), Style::default().fg(palette.fg)))
    };
    f.render_widget(Paragraph::new(line), inner);

    if focused {
        let offset = cursor_x_for_text(app.input.as_str(), app.input.cursor);
        f.set_cursor_position((cursor_column(inner, offset), inner.y));
    }
}

fn draw_filters<S: KeyValueStore>(f: &mut Frame<'_>, area: Rect, app: &AppState<S>, palette: &Palette) {
    let titles: Vec<Line> = FilterMode::ALL
        .iter()
        .enumerate()
        .map(|(i, m)| Line::from(format!("{} [{}]", m.title(), i + 1)))
        .collect();
    let selected = FilterMode::ALL
        .iter()
        .position(|m| *m == app.store.filter())
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(palette.dim())
        .highlight_style(palette.highlight())
        .divider(" | ");
    f.render_widget(tabs, area);
}

fn draw_list<S: KeyValueStore>(f: &mut Frame<'_>, area: Rect, app: &mut AppState<S>, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.dim())
        .title("Tasks");
    let view = app.store.view();

    if view.is_empty() {
        let inner = block.inner(area);
        f.render_widget(block, area);
        let msg = Paragraph::new(view.filter.empty_message())
            .style(palette.dim())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        let mid = Rect {
            y: inner.y + inner.height / 2,
            height: 1.min(inner.height),
            ..inner
        };
        f.render_widget(msg, mid);
        return;
    }

    let items: Vec<ListItem> = view
        .tasks
        .iter()
        .map(|row| {
            let t = row.task;
            let check = match (app.icons, t.completed) {
                (true, true) => "✓ ",
                (true, false) => "○ ",
                (false, true) => "[x] ",
                (false, false) => "[ ] ",
            };
            let mut spans = vec![
                Span::styled(check, Style::default().fg(if t.completed {
                    palette.success
                } else {
                    palette.muted
                })),
                Span::styled(t.text.clone(), palette.task_text(t)),
            ];
            if row.editable {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(
                    format!("[{}]", t.priority.label()),
                    palette.priority(t.priority),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("▸ ");
    f.render_stateful_widget(list, area, &mut app.list_state);
}

fn draw_stats<S: KeyValueStore>(f: &mut Frame<'_>, area: Rect, app: &AppState<S>, palette: &Palette) {
    let view = app.store.view();
    let shown = format!("showing {} ({})", view.tasks.len(), view.filter);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);
    f.render_widget(Paragraph::new(view.summary()).style(palette.dim()), chunks[0]);
    f.render_widget(
        Paragraph::new(shown)
            .style(palette.dim())
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn draw_footer<S: KeyValueStore>(f: &mut Frame<'_>, area: Rect, app: &AppState<S>) {
    let mut left = if app.confirm.is_some() {
        "y confirm • n cancel".to_owned()
    } else if app.edit.is_some() {
        "Enter save • Esc cancel • Tab switch field • ←/→ priority".to_owned()
    } else if app.settings.is_some() {
        "j/k move • Enter apply • Esc close".to_owned()
    } else if app.show_help {
        "any key closes help".to_owned()
    } else {
        match app.mode {
            Mode::Input => "Enter add • Esc done".to_owned(),
            Mode::Normal => "q quit • a add • j/k move • Space toggle • p priority • e edit • d delete • 1-3/Tab filter • ? help".to_owned(),
        }
    };

    if let Some(err) = &app.last_error {
        left = format!("Error: {err}");
    } else if let Some(toast) = &app.toast {
        left.clone_from(&toast.message);
    }

    let bg = if app.last_error.is_some() {
        ratatui::style::Color::Red
    } else {
        ratatui::style::Color::Blue
    };
    let p = Paragraph::new(Line::from(Span::styled(
        left,
        Style::default().fg(ratatui::style::Color::White).bg(bg),
    )))
    .style(Style::default().bg(bg));
    f.render_widget(p, area);
}

fn draw_edit_popup<S: KeyValueStore>(
    f: &mut Frame<'_>,
    app: &AppState<S>,
    dialog: &EditDialog,
    palette: &Palette,
) {
    let area = centered_rect(70, 40, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Edit Task")
        .style(palette.base());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let current = app.store.draft().map_or(Priority::Normal, |d| d.priority);
    let label = |field: EditField, text: &'static str| {
        let style = if dialog.field == field {
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        Span::styled(text, style)
    };

    let mut priority_spans = vec![label(EditField::Priority, "Priority: ")];
    for p in Priority::ALL {
        let style = if p == current {
            palette.priority(p).add_modifier(Modifier::REVERSED)
        } else {
            palette.priority(p)
        };
        priority_spans.push(Span::styled(format!(" {} ", p.label()), style));
        priority_spans.push(Span::raw(" "));
    }

    let mut lines = vec![
        Line::from(vec![
            label(EditField::Text, "Text: "),
            Span::raw(dialog.input.as_str()),
        ]),
        Line::from(""),
        Line::from(priority_spans),
        Line::from(""),
    ];
    if let Some(err) = &dialog.error {
        lines.push(Line::from(Span::styled(
            err.as_str(),
            Style::default().fg(palette.error),
        )));
    }
    lines.push(Line::from(Span::styled(
        "[Enter] Save Changes    [Esc] Cancel",
        palette.dim(),
    )));
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);

    if dialog.field == EditField::Text {
        let prefix = u16::try_from("Text: ".chars().count()).unwrap_or(0);
        let offset = prefix.saturating_add(cursor_x_for_text(dialog.input.as_str(), dialog.input.cursor));
        f.set_cursor_position((cursor_column(inner, offset), inner.y));
    }
}

fn draw_settings_popup<S: KeyValueStore>(
    f: &mut Frame<'_>,
    app: &AppState<S>,
    dialog: &SettingsDialog,
    palette: &Palette,
) {
    let area = centered_rect(60, 50, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Settings")
        .style(palette.base());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let row = |idx: usize, text: String| {
        let marker = if dialog.selected == idx { "> " } else { "  " };
        let style = if dialog.selected == idx {
            palette.highlight()
        } else {
            Style::default()
        };
        Line::from(Span::styled(format!("{marker}{text}"), style))
    };
    let radio = |theme: Theme| if app.theme == theme { "(•)" } else { "( )" };

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let lines = vec![
        Line::from(Span::styled("Theme", bold)),
        row(0, format!("{} Light", radio(Theme::Light))),
        row(1, format!("{} Dark", radio(Theme::Dark))),
        Line::from(""),
        Line::from(Span::styled("Clear Data", bold)),
        row(
            2,
            format!("Clear All Todos ({})", app.store.tasks().len()),
        ),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn draw_confirm(f: &mut Frame<'_>, confirm: &ConfirmDialog, palette: &Palette) {
    let area = centered_rect(60, 25, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(confirm.title.as_str())
        .border_style(Style::default().fg(palette.error))
        .style(palette.base());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = vec![
        Line::from(confirm.message.clone()),
        Line::from(""),
        Line::from("[y] Yes    [n] No"),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn draw_help(f: &mut Frame<'_>, palette: &Palette) {
    let area = centered_rect(70, 70, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .style(palette.base());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = vec![
        Line::from("Keys:"),
        Line::from("  a / i        Add tasks (Enter adds, Esc leaves input)"),
        Line::from("  j/k, ↑/↓     Move"),
        Line::from("  g/G          Top/bottom"),
        Line::from("  Space / x    Toggle completed"),
        Line::from("  p            Cycle priority (active tasks)"),
        Line::from("  e / Enter    Edit text and priority (active tasks)"),
        Line::from("  d / Del      Delete"),
        Line::from("  1 / 2 / 3    All / Active / Completed"),
        Line::from("  Tab, h/l     Next/previous filter"),
        Line::from("  t            Toggle light/dark theme"),
        Line::from("  s            Settings (theme, clear all)"),
        Line::from("  q / Ctrl-C   Quit"),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn has_modal<S>(app: &AppState<S>) -> bool {
    app.edit.is_some() || app.settings.is_some() || app.confirm.is_some() || app.show_help
}

fn handle_key<S: KeyValueStore>(key: KeyEvent, app: &mut AppState<S>) {
    dispatch_key(key, app);
    app.clamp_selection();
    app.sync_persist_error();
}

fn dispatch_key<S: KeyValueStore>(key: KeyEvent, app: &mut AppState<S>) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
        if app.edit.is_some() {
            let _ = app.store.cancel_edit();
        }
        app.should_quit = true;
        return;
    }

    // Modals take precedence
    if app.confirm.is_some() {
        handle_confirm_key(key, app);
        return;
    }
    if app.edit.is_some() {
        handle_edit_key(key, app);
        return;
    }
    if app.settings.is_some() {
        handle_settings_key(key, app);
        return;
    }
    if app.show_help {
        app.show_help = false;
        return;
    }

    match app.mode {
        Mode::Input => handle_input_key(key, app),
        Mode::Normal => handle_normal_key(key, app),
    }
}

fn handle_normal_key<S: KeyValueStore>(key: KeyEvent, app: &mut AppState<S>) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('a' | 'i') => app.mode = Mode::Input,
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Char('1') => app.set_filter(FilterMode::All),
        KeyCode::Char('2') => app.set_filter(FilterMode::Active),
        KeyCode::Char('3') => app.set_filter(FilterMode::Completed),
        KeyCode::Tab | KeyCode::Char('l') => app.set_filter(app.store.filter().next()),
        KeyCode::BackTab | KeyCode::Char('h') => app.set_filter(app.store.filter().prev()),
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::PageUp => app.move_selection(-10),
        KeyCode::PageDown => app.move_selection(10),
        KeyCode::Home | KeyCode::Char('g') => app.list_state.select(Some(0)),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Char(' ' | 'x') => {
            if let Some(id) = app.selected_id() {
                let _ = app.store.toggle(&id);
            }
        }
        KeyCode::Char('p') => cycle_selected_priority(app),
        KeyCode::Char('e') | KeyCode::Enter => open_edit(app),
        KeyCode::Char('d') | KeyCode::Delete => request_delete(app),
        KeyCode::Char('t') => app.apply_theme(app.theme.toggled()),
        KeyCode::Char('s') => app.settings = Some(SettingsDialog::default()),
        _ => {}
    }
}

fn handle_input_key<S: KeyValueStore>(key: KeyEvent, app: &mut AppState<S>) {
    match key.code {
        KeyCode::Esc => app.mode = Mode::Normal,
        KeyCode::Enter => {
            if app.store.add(app.input.as_str()).is_applied() {
                app.input.clear();
                if app.store.filter() != FilterMode::Completed {
                    app.select_last();
                }
            }
        }
        _ => handle_text_input_key(key, &mut app.input),
    }
}

fn cycle_selected_priority<S: KeyValueStore>(app: &mut AppState<S>) {
    let Some(task) = app.selected_task() else {
        return;
    };
    if task.completed {
        app.toast = Some(Toast::info("Completed tasks have no priority"));
        return;
    }
    let id = task.id.clone();
    let _ = app.store.cycle_priority(&id);
}

fn open_edit<S: KeyValueStore>(app: &mut AppState<S>) {
    let Some(task) = app.selected_task() else {
        return;
    };
    if task.completed {
        app.toast = Some(Toast::info("Completed tasks can't be edited"));
        return;
    }
    let id = task.id.clone();
    if app.store.start_edit(&id).is_applied()
        && let Some(draft) = app.store.draft()
    {
        app.edit = Some(EditDialog {
            input: TextInput::new(draft.text.as_str()),
            field: EditField::Text,
            error: None,
        });
    }
}

fn request_delete<S: KeyValueStore>(app: &mut AppState<S>) {
    let Some(task) = app.selected_task() else {
        return;
    };
    let id = task.id.clone();
    if !app.confirm_delete {
        let _ = app.store.delete(&id);
        return;
    }
    app.confirm = Some(ConfirmDialog {
        title: "Delete task".to_owned(),
        message: format!("Delete \"{}\"?", truncate_str(&task.text, 60)),
        action: ConfirmAction::DeleteTask { id },
    });
}

fn handle_edit_key<S: KeyValueStore>(key: KeyEvent, app: &mut AppState<S>) {
    let Some(dialog) = app.edit.as_mut() else {
        return;
    };

    match key.code {
        KeyCode::Esc => {
            let _ = app.store.cancel_edit();
            app.edit = None;
        }
        KeyCode::Enter => match app.store.commit_edit() {
            Outcome::Applied => {
                app.edit = None;
                app.toast = Some(Toast::info("Task updated"));
            }
            Outcome::Rejected(Rejection::EmptyText) => {
                dialog.error = Some("Task text must not be empty".to_owned());
            }
            Outcome::Rejected(other) => {
                app.edit = None;
                app.toast = Some(Toast::info(format!("Edit discarded: {other}")));
            }
        },
        KeyCode::Tab | KeyCode::BackTab => {
            dialog.field = match dialog.field {
                EditField::Text => EditField::Priority,
                EditField::Priority => EditField::Text,
            };
        }
        _ => match dialog.field {
            EditField::Text => {
                let before = dialog.input.text.clone();
                handle_text_input_key(key, &mut dialog.input);
                if dialog.input.text != before {
                    dialog.error = None;
                    let _ = app.store.update_draft_text(dialog.input.as_str());
                }
            }
            EditField::Priority => {
                let current = app.store.draft().map_or(Priority::Normal, |d| d.priority);
                let next = match key.code {
                    KeyCode::Left | KeyCode::Char('h') => current.prev(),
                    KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => current.next(),
                    KeyCode::Char('n') => Priority::Normal,
                    KeyCode::Char('p') => Priority::Pending,
                    KeyCode::Char('u') => Priority::Urgent,
                    _ => return,
                };
                let _ = app.store.update_draft_priority(next);
            }
        },
    }
}

fn handle_settings_key<S: KeyValueStore>(key: KeyEvent, app: &mut AppState<S>) {
    let Some(dialog) = app.settings.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc | KeyCode::Char('q' | 's') => app.settings = None,
        KeyCode::Up | KeyCode::Char('k') => dialog.selected = dialog.selected.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => {
            dialog.selected = (dialog.selected + 1).min(SETTINGS_ITEMS.len() - 1);
        }
        KeyCode::Enter | KeyCode::Char(' ') => match SETTINGS_ITEMS[dialog.selected] {
            SettingsItem::LightTheme => app.apply_theme(Theme::Light),
            SettingsItem::DarkTheme => app.apply_theme(Theme::Dark),
            SettingsItem::ClearAll => {
                let count = app.store.tasks().len();
                app.confirm = Some(ConfirmDialog {
                    title: "Clear all".to_owned(),
                    message: format!("Delete all {count} tasks? This cannot be undone."),
                    action: ConfirmAction::ClearAll,
                });
            }
        },
        _ => {}
    }
}

fn handle_confirm_key<S: KeyValueStore>(key: KeyEvent, app: &mut AppState<S>) {
    match key.code {
        KeyCode::Char('n') | KeyCode::Esc => app.confirm = None,
        KeyCode::Char('y') => {
            let Some(confirm) = app.confirm.take() else {
                return;
            };
            match confirm.action {
                ConfirmAction::DeleteTask { id } => {
                    if app.store.delete(&id).is_applied() {
                        app.toast = Some(Toast::info("Task deleted"));
                    }
                }
                ConfirmAction::ClearAll => {
                    let _ = app.store.clear_all();
                    app.settings = None;
                    app.toast = Some(Toast::info("All tasks cleared"));
                }
            }
        }
        _ => {}
    }
}

fn handle_text_input_key(key: KeyEvent, input: &mut TextInput) {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.cursor = input.cursor.saturating_sub(1),
        KeyCode::Right => input.cursor = (input.cursor + 1).min(input.len()),
        KeyCode::Home => input.cursor = 0,
        KeyCode::End => input.cursor = input.len(),
        KeyCode::Char(c) => {
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT)
            {
                input.insert_char(c);
            }
        }
        _ => {}
    }
}

fn truncate_str(s: &str, max: usize) -> String {
    let mut out: String = s.chars().take(max).collect();
    if s.chars().count() > max {
        out.push('…');
    }
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn cursor_x_for_text(text: &str, cursor: usize) -> u16 {
    // Approximate: one column per char.
    u16::try_from(text.chars().take(cursor).count()).unwrap_or(u16::MAX)
}

/// Keeps the cursor on the last cell of `area` once the text runs past it.
fn cursor_column(area: Rect, offset: u16) -> u16 {
    area.x
        .saturating_add(offset.min(area.width.saturating_sub(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::storage::{DEFAULT_TASKS_KEY, MemoryStore};
    use crate::theme::THEME_KEY;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn app() -> (AppState<MemoryStore>, MemoryStore) {
        let mem = MemoryStore::new();
        let cfg = Config::default();
        let store = crate::task::open(&cfg, mem.clone());
        let themes = ThemeStore::new(mem.clone(), cfg.ui.default_theme);
        (AppState::new(&cfg, store, themes), mem)
    }

    fn press(app: &mut AppState<MemoryStore>, code: KeyCode) {
        handle_key(KeyEvent::new(code, KeyModifiers::NONE), app);
    }

    fn type_str(app: &mut AppState<MemoryStore>, s: &str) {
        for c in s.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn add_tasks(app: &mut AppState<MemoryStore>, texts: &[&str]) {
        app.mode = Mode::Input;
        for text in texts {
            type_str(app, text);
            press(app, KeyCode::Enter);
        }
        press(app, KeyCode::Esc);
    }

    fn render(app: &mut AppState<MemoryStore>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).expect("terminal");
        terminal.draw(|f| draw(f, app)).expect("draw");
        let buf = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn starts_in_input_mode_when_empty() {
        let (mut app, _) = app();
        assert_eq!(app.mode, Mode::Input);
        let screen = render(&mut app);
        assert!(screen.contains("No tasks yet. Add one above!"));
        assert!(screen.contains("0 tasks remaining"));
    }

    #[test]
    fn enter_adds_and_clears_input() {
        let (mut app, _) = app();
        type_str(&mut app, "Buy milk");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store.tasks().len(), 1);
        assert_eq!(app.store.tasks()[0].text, "Buy milk");
        assert!(app.input.as_str().is_empty());

        type_str(&mut app, "   ");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store.tasks().len(), 1);
        assert_eq!(app.input.as_str(), "   ");

        let screen = render(&mut app);
        assert!(screen.contains("Buy milk"));
        assert!(screen.contains("[Normal]"));
        assert!(screen.contains("1 total tasks"));
    }

    #[test]
    fn toggle_then_filter_active() {
        let (mut app, _) = app();
        add_tasks(&mut app, &["A", "B"]);
        press(&mut app, KeyCode::Char('g'));
        press(&mut app, KeyCode::Char(' '));
        assert!(app.store.tasks()[0].completed);

        press(&mut app, KeyCode::Char('2'));
        let visible: Vec<String> = app
            .store
            .view()
            .tasks
            .iter()
            .map(|v| v.task.text.clone())
            .collect();
        assert_eq!(visible, ["B"]);
        assert!(render(&mut app).contains("1 tasks remaining"));

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.store.filter(), FilterMode::Completed);
        assert_eq!(app.selected_task().map(|t| t.text.as_str()), Some("A"));
    }

    #[test]
    fn blank_edit_keeps_dialog_open() {
        let (mut app, _) = app();
        add_tasks(&mut app, &["orig"]);
        press(&mut app, KeyCode::Char('e'));
        assert!(app.edit.is_some());

        for _ in 0..4 {
            press(&mut app, KeyCode::Backspace);
        }
        press(&mut app, KeyCode::Enter);
        assert!(app.edit.as_ref().is_some_and(|d| d.error.is_some()));
        assert_eq!(app.store.tasks()[0].text, "orig");
        assert!(render(&mut app).contains("Task text must not be empty"));

        type_str(&mut app, "new");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('u'));
        press(&mut app, KeyCode::Enter);
        assert!(app.edit.is_none());
        assert_eq!(app.store.tasks()[0].text, "new");
        assert_eq!(app.store.tasks()[0].priority, Priority::Urgent);
    }

    #[test]
    fn escape_discards_edit() {
        let (mut app, _) = app();
        add_tasks(&mut app, &["keep"]);
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, " me");
        press(&mut app, KeyCode::Esc);
        assert!(app.edit.is_none());
        assert!(app.store.draft().is_none());
        assert_eq!(app.store.tasks()[0].text, "keep");
    }

    #[test]
    fn completed_tasks_hide_priority_controls() {
        let (mut app, _) = app();
        add_tasks(&mut app, &["done"]);
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Char('p'));
        press(&mut app, KeyCode::Char('e'));
        assert!(app.edit.is_none());
        assert_eq!(app.store.tasks()[0].priority, Priority::Normal);
        assert!(!render(&mut app).contains("[Normal]"));
    }

    #[test]
    fn p_cycles_priority_of_active_task() {
        let (mut app, _) = app();
        add_tasks(&mut app, &["A"]);
        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.store.tasks()[0].priority, Priority::Pending);
        assert!(render(&mut app).contains("[Pending]"));
    }

    #[test]
    fn delete_asks_for_confirmation() {
        let (mut app, _) = app();
        add_tasks(&mut app, &["A"]);
        press(&mut app, KeyCode::Char('d'));
        assert!(app.confirm.is_some());
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.store.tasks().len(), 1);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.store.tasks().is_empty());
    }

    #[test]
    fn settings_clear_all_persists_empty_collection() {
        let (mut app, mem) = app();
        add_tasks(&mut app, &["X", "Y"]);
        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('y'));

        assert!(app.store.tasks().is_empty());
        assert!(app.settings.is_none());
        assert_eq!(mem.get(DEFAULT_TASKS_KEY).unwrap().as_deref(), Some(&b"[]"[..]));
    }

    #[test]
    fn theme_toggle_is_remembered() {
        let (mut app, mem) = app();
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('t'));
        assert_eq!(app.theme, Theme::Dark);
        assert_eq!(mem.get(THEME_KEY).unwrap().as_deref(), Some(&b"\"dark\""[..]));
        assert!(render(&mut app).contains("☾ Dark"));
    }

    #[test]
    fn save_failure_is_shown_not_fatal() {
        let (mut app, mem) = app();
        mem.fail_writes(true);
        type_str(&mut app, "offline");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store.tasks().len(), 1);
        assert!(app.last_error.is_some());
        assert!(render(&mut app).contains("Changes not saved"));

        mem.fail_writes(false);
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char(' '));
        assert!(app.last_error.is_none());
    }

    #[test]
    fn very_long_text_renders_in_input_and_edit() {
        let (mut app, _) = app();
        let long = "a".repeat(70_000);
        app.input = TextInput::new(long.as_str());
        assert!(render(&mut app).contains("aaaa"));

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store.tasks().len(), 1);
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('e'));
        assert!(app.edit.is_some());
        assert!(render(&mut app).contains("Edit Task"));
    }

    #[test]
    fn cursor_stays_inside_area() {
        let area = Rect::new(5, 1, 10, 1);
        assert_eq!(cursor_column(area, 3), 8);
        assert_eq!(cursor_column(area, u16::MAX), 14);
        assert_eq!(cursor_column(Rect::new(u16::MAX - 2, 0, 2, 1), 70), u16::MAX - 1);
    }

    #[test]
    fn theme_save_failure_shows_toast() {
        let (mut app, mem) = app();
        press(&mut app, KeyCode::Esc);
        mem.fail_writes(true);
        press(&mut app, KeyCode::Char('t'));
        assert_eq!(app.theme, Theme::Dark);
        assert!(app.toast.as_ref().is_some_and(|t| t.message.starts_with("Theme not saved")));
        assert!(mem.get(THEME_KEY).unwrap().is_none());
        assert!(render(&mut app).contains("Theme not saved"));
    }

    #[test]
    fn text_input_handles_multibyte_chars() {
        let mut input = TextInput::new("héllo");
        input.cursor = 2;
        input.backspace();
        assert_eq!(input.as_str(), "hllo");
        input.insert_char('é');
        assert_eq!(input.as_str(), "héllo");
        input.cursor = 0;
        input.delete();
        assert_eq!(input.as_str(), "éllo");
    }
}
