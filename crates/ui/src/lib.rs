//! ratatui-based UI.

use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use chrono::Local;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Clear, HighlightSpacing, List, ListItem, ListState, Paragraph, Wrap,
};
use tracing::debug;
use txtreader_application::{
    AppContext, ReaderState, SettingsChange, format_last_read, is_text_document,
};
use txtreader_core::{Argb, DisplayConfig, MAX_FONT_SIZE, MIN_FONT_SIZE, Viewport};
use txtreader_engine::{CellMetrics, TAB_CELLS};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiExit {
    Quit,
    /// Open this file, saving the current one first.
    Open(PathBuf),
    /// Close the open document and save its progress.
    Close,
    /// Drop the record with this identity.
    Forget(String),
}

#[derive(Debug, Clone)]
pub struct UiOutcome {
    pub ctx: AppContext,
    pub exit: UiExit,
}

pub struct Ui {
    ctx: AppContext,
    open_panel: OpenPathPanel,
    goto_panel: GotoPanel,
    settings_panel: SettingsPanel,
}

impl Ui {
    pub fn new(mut ctx: AppContext) -> Self {
        ctx.config.normalize();
        Self {
            ctx,
            open_panel: OpenPathPanel::default(),
            goto_panel: GotoPanel::default(),
            settings_panel: SettingsPanel::default(),
        }
    }

    pub fn run(&mut self) -> anyhow::Result<UiOutcome> {
        let mut terminal = setup_terminal()?;
        terminal.clear().ok();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut terminal)
        }));
        let restore_result = restore_terminal(&mut terminal);

        match (result, restore_result) {
            (Ok(Ok(outcome)), Ok(())) => Ok(outcome),
            (Ok(Ok(_)), Err(err)) => Err(err),
            (Ok(Err(err)), Ok(())) => Err(err),
            (Ok(_), Err(err)) => Err(err),
            (Err(panic), Ok(())) => Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => Err(anyhow::anyhow!(
                "{}\n(additionally failed to restore terminal: {err})",
                panic_to_string(panic)
            )),
        }
    }

    fn accent_color(&self) -> Color {
        argb_color(self.ctx.config.foreground)
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<UiOutcome> {
        let tick_rate = Duration::from_millis(250);
        let mut needs_redraw = true;

        loop {
            if needs_redraw {
                terminal.draw(|frame| self.draw(frame.area(), frame))?;
                needs_redraw = false;
            }

            if !event::poll(tick_rate)? {
                continue;
            }

            match event::read()? {
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }

                    needs_redraw = true;
                    self.ctx.notice = None;

                    let reading = self.ctx.reader.is_some();
                    let exit = if self.settings_panel.open {
                        self.handle_settings_panel_key(key)?
                    } else if reading && self.goto_panel.open {
                        self.handle_goto_panel_key(key)?
                    } else if reading {
                        self.handle_reader_key(key)?
                    } else if self.open_panel.open {
                        self.handle_open_panel_key(key)?
                    } else {
                        self.handle_main_key(key)?
                    };

                    if let Some(exit) = exit {
                        return Ok(UiOutcome {
                            ctx: self.ctx.clone(),
                            exit,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    fn handle_main_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => Ok(Some(UiExit::Quit)),
            KeyCode::Enter => Ok(self
                .ctx
                .selected_record()
                .map(|record| UiExit::Open(PathBuf::from(&record.file_path)))),
            KeyCode::Char('o') => {
                self.open_panel.open = true;
                self.open_panel.input.clear();
                self.open_panel.error = None;
                Ok(None)
            }
            KeyCode::Char('d') | KeyCode::Delete => Ok(self
                .ctx
                .selected_record()
                .map(|record| UiExit::Forget(record.file_path.clone()))),
            KeyCode::Down => {
                self.ctx.select_next();
                Ok(None)
            }
            KeyCode::Up => {
                self.ctx.select_prev();
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn handle_open_panel_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && let KeyCode::Char('u') = key.code
        {
            self.open_panel.input.clear();
            return Ok(None);
        }

        match key.code {
            KeyCode::Esc => {
                self.open_panel.open = false;
                self.open_panel.error = None;
                Ok(None)
            }
            KeyCode::Enter => {
                let input = self.open_panel.input.trim();
                if input.is_empty() {
                    self.open_panel.error = Some("Enter a file path".to_string());
                    return Ok(None);
                }

                let path = PathBuf::from(input);
                if !is_text_document(&path) {
                    self.open_panel.error = Some("Only .txt files can be opened".to_string());
                    return Ok(None);
                }
                if !path.is_file() {
                    self.open_panel.error = Some(format!("No such file: {}", path.display()));
                    return Ok(None);
                }

                self.open_panel.open = false;
                self.open_panel.error = None;
                Ok(Some(UiExit::Open(path)))
            }
            KeyCode::Backspace => {
                self.open_panel.input.pop();
                Ok(None)
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                self.open_panel.input.push(ch);
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn handle_reader_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Ok(Some(UiExit::Close)),
            KeyCode::Char('g') => {
                self.goto_panel.open = true;
                self.goto_panel.input.clear();
                self.goto_panel.error = None;
                return Ok(None);
            }
            KeyCode::Char('s') => {
                let page = self
                    .ctx
                    .reader
                    .as_ref()
                    .filter(|reader| reader.page_count() > 0)
                    .map(ReaderState::current_index);
                self.settings_panel.draft = Some(SettingsChange::from_config(&self.ctx.config, page));
                self.settings_panel.open = true;
                self.settings_panel.selected = 0;
                self.settings_panel.error = None;
                return Ok(None);
            }
            _ => {}
        }

        let Some(reader) = self.ctx.reader.as_mut() else {
            return Ok(None);
        };
        match key.code {
            KeyCode::Right
            | KeyCode::Down
            | KeyCode::PageDown
            | KeyCode::Char(' ')
            | KeyCode::Char('j')
            | KeyCode::Char('l') => {
                reader.next_page();
            }
            KeyCode::Left
            | KeyCode::Up
            | KeyCode::PageUp
            | KeyCode::Char('k')
            | KeyCode::Char('h') => {
                reader.prev_page();
            }
            KeyCode::Home => {
                if let Err(err) = reader.jump_to(0) {
                    debug!(%err, "jump to first page ignored");
                }
            }
            KeyCode::End => {
                let last = reader.page_count().saturating_sub(1);
                if let Err(err) = reader.jump_to(last) {
                    debug!(%err, "jump to last page ignored");
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn handle_goto_panel_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        match key.code {
            KeyCode::Esc => {
                self.goto_panel.open = false;
                self.goto_panel.input.clear();
                self.goto_panel.error = None;
                Ok(None)
            }
            KeyCode::Enter => {
                let input = self.goto_panel.input.trim();
                if input.is_empty() {
                    self.goto_panel.error = Some("Enter a page number".to_string());
                    return Ok(None);
                }

                let page = match input.parse::<usize>() {
                    Ok(p) if p >= 1 => p,
                    _ => {
                        self.goto_panel.error = Some("Invalid page number".to_string());
                        return Ok(None);
                    }
                };

                let Some(reader) = self.ctx.reader.as_mut() else {
                    return Ok(None);
                };
                if let Err(err) = reader.jump_to(page - 1) {
                    self.goto_panel.error = Some(err.to_string());
                    return Ok(None);
                }

                self.ctx.notice = Some(format!("jumped to page {page}"));
                self.goto_panel.open = false;
                self.goto_panel.error = None;
                Ok(None)
            }
            KeyCode::Backspace => {
                self.goto_panel.input.pop();
                Ok(None)
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.goto_panel.input.clear();
                Ok(None)
            }
            KeyCode::Char(ch) if ch.is_ascii_digit() => {
                self.goto_panel.input.push(ch);
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn handle_settings_panel_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        match key.code {
            KeyCode::Esc => {
                self.settings_panel.open = false;
                self.settings_panel.draft = None;
                Ok(None)
            }
            KeyCode::Up => {
                self.settings_panel.selected = self.settings_panel.selected.saturating_sub(1);
                Ok(None)
            }
            KeyCode::Down => {
                self.settings_panel.selected = (self.settings_panel.selected + 1)
                    .min(SETTINGS_MENU_ITEM_COUNT.saturating_sub(1));
                Ok(None)
            }
            KeyCode::Left => {
                self.settings_panel.adjust(-1);
                Ok(None)
            }
            KeyCode::Right => {
                self.settings_panel.adjust(1);
                Ok(None)
            }
            KeyCode::Enter => {
                let Some(draft) = self.settings_panel.draft.clone() else {
                    self.settings_panel.open = false;
                    return Ok(None);
                };
                match self.ctx.apply_settings(&draft) {
                    Ok(()) => {
                        self.settings_panel.open = false;
                        self.settings_panel.draft = None;
                        self.ctx.notice = Some("settings applied".to_string());
                    }
                    Err(err) => {
                        self.settings_panel.error = Some(err.to_string());
                    }
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn draw(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        frame.render_widget(Clear, area);
        if self.ctx.reader.is_some() {
            self.draw_reader(area, frame);
        } else {
            self.draw_home(area, frame);
        }

        if self.open_panel.open {
            self.draw_open_panel(area, frame);
        }
        if self.goto_panel.open {
            self.draw_goto_panel(area, frame);
        }
        if self.settings_panel.open {
            self.draw_settings_panel(area, frame);
        }
    }

    fn draw_home(&self, area: Rect, frame: &mut ratatui::Frame) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);

        let title = Paragraph::new(Line::from(vec![
            Span::styled("txtreader", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" · recent documents"),
        ]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(title, layout[0]);

        self.draw_records(frame, layout[1]);

        let footer = Paragraph::new(Text::from(self.home_footer_lines()))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(footer, layout[2]);
    }

    fn home_footer_lines(&self) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(vec![
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" quit  "),
            Span::styled("↑/↓", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" move  "),
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" read  "),
            Span::styled("o", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" open file  "),
            Span::styled("d", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" forget"),
        ])];
        if let Some(notice) = &self.ctx.notice {
            lines.push(Line::styled(
                notice.clone(),
                Style::default().fg(Color::Yellow),
            ));
        }
        lines
    }

    fn draw_records(&self, frame: &mut ratatui::Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Documents");

        if self.ctx.records.is_empty() {
            let lines = vec![
                Line::raw("Nothing read yet."),
                Line::raw(""),
                Line::raw("Press o to open a .txt file."),
            ];
            let paragraph = Paragraph::new(Text::from(lines))
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }

        let now = Local::now().naive_local();
        let max_width = area.width.saturating_sub(6) as usize;
        let items: Vec<ListItem> = self
            .ctx
            .records
            .iter()
            .map(|record| {
                let status = format!(
                    "  p{} · {}",
                    record.current_page.saturating_add(1),
                    format_last_read(record.last_reading_time, now)
                );
                let name_width =
                    max_width.saturating_sub(UnicodeWidthStr::width(status.as_str()));
                ListItem::new(Text::from(vec![
                    Line::from(vec![
                        Span::styled(
                            fit_width(record.file_name(), name_width.max(8)),
                            Style::default().add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(status, Style::default().fg(Color::Gray)),
                    ]),
                    Line::styled(
                        fit_width(record.directory(), max_width.max(8)),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();

        let highlight_style = Style::default()
            .fg(Color::Black)
            .bg(self.accent_color())
            .add_modifier(Modifier::BOLD);

        let list = List::new(items)
            .block(block)
            .highlight_style(highlight_style)
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);

        let mut state = ListState::default();
        state.select(Some(self.ctx.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_reader(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        let metrics = cell_metrics_for(&self.ctx.config);
        let body = reading_area(layout[1], &self.ctx.config, &metrics);
        let viewport = Viewport::for_metrics(
            u32::from(body.width).saturating_mul(metrics.cell_width_px),
            u32::from(body.height).saturating_mul(metrics.cell_height_px),
            &metrics,
        );
        let font = self.ctx.config.font_key();
        if let Some(reader) = self.ctx.reader.as_mut()
            && reader.layout(viewport, font, &metrics)
        {
            debug!(
                cols = body.width,
                rows = body.height,
                pages = reader.page_count(),
                "reflowed"
            );
        }

        let Some(reader) = self.ctx.reader.as_ref() else {
            return;
        };

        let progress = reader.progress();
        let name = std::path::Path::new(reader.path())
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| reader.path().to_string());
        let header = Paragraph::new(Line::from(vec![
            Span::styled(name, Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!(
                "  p{}/{} · {:.0}%",
                progress.current_page.saturating_add(1).min(progress.total_pages),
                progress.total_pages,
                progress.percent()
            )),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(header, layout[0]);

        let config = &self.ctx.config;
        let mut style = Style::default().fg(argb_color(config.foreground));
        if config.font_style.is_bold() {
            style = style.add_modifier(Modifier::BOLD);
        }
        if config.font_style.is_italic() {
            style = style.add_modifier(Modifier::ITALIC);
        }

        match reader.current_page() {
            Some(page) => {
                let lines: Vec<Line> = page
                    .lines()
                    .iter()
                    .map(|line| Line::raw(expand_tabs(line.as_str())))
                    .collect();
                frame.render_widget(Paragraph::new(Text::from(lines)).style(style), body);
            }
            None => {
                let message = if viewport.has_room() {
                    "(empty document)"
                } else {
                    "(window too small)"
                };
                let paragraph = Paragraph::new(Line::raw(message))
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::DarkGray));
                frame.render_widget(paragraph, layout[1]);
            }
        }

        let footer = match &self.ctx.notice {
            Some(notice) => Line::styled(notice.clone(), Style::default().fg(Color::Yellow)),
            None => Line::from(vec![
                Span::styled("←/→", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" page  "),
                Span::styled("g", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" go to  "),
                Span::styled("s", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" settings  "),
                Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" close"),
            ]),
        };
        frame.render_widget(
            Paragraph::new(footer).alignment(Alignment::Center),
            layout[2],
        );
    }

    fn draw_open_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(70, 28, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            "Open document",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(block.clone(), popup_area);

        let inner = block.inner(popup_area);
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Path: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(self.open_panel.input.clone()),
            ]),
            Line::raw(""),
            Line::raw("Enter opens a .txt file, Esc cancels, Ctrl+u clears."),
        ];

        if let Some(err) = &self.open_panel.error {
            lines.push(Line::raw(""));
            lines.push(Line::styled(
                err.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }

        let paragraph = Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: true })
            .alignment(Alignment::Left);
        frame.render_widget(paragraph, inner);
    }

    fn draw_goto_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(48, 28, area);
        frame.render_widget(Clear, popup_area);

        let total = self.ctx.reader.as_ref().map(ReaderState::page_count);
        let title = match total {
            Some(total) if total > 0 => format!("Go to page (1..={total})"),
            _ => "Go to page".to_string(),
        };

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(block.clone(), popup_area);

        let inner = block.inner(popup_area);
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Page: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(self.goto_panel.input.clone()),
            ]),
            Line::raw(""),
            Line::raw("Enter jumps, Esc cancels, Ctrl+u clears."),
        ];

        if let Some(err) = &self.goto_panel.error {
            lines.push(Line::raw(""));
            lines.push(Line::from(Span::styled(
                err.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
        }

        let paragraph = Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: true })
            .alignment(Alignment::Left);
        frame.render_widget(paragraph, inner);
    }

    fn draw_settings_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let Some(draft) = &self.settings_panel.draft else {
            return;
        };

        let popup_area = centered_rect(50, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            "Settings",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(block.clone(), popup_area);

        let inner = block.inner(popup_area);
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(4)])
            .split(inner);

        let highlight_style = Style::default()
            .fg(Color::Black)
            .bg(self.accent_color())
            .add_modifier(Modifier::BOLD);

        let page = match draft.jump_page {
            Some(page) => (page + 1).to_string(),
            None => "-".to_string(),
        };
        let rows = [
            ("Font", draft.font.clone()),
            ("Style", draft.font_style.to_string()),
            ("Size", draft.font_size.to_string()),
            ("Colour", draft.foreground.to_string()),
            ("Width", format!("{}px", draft.width)),
            ("Height", format!("{}px", draft.height)),
            ("Page", page),
        ];
        let items: Vec<ListItem> = rows
            .into_iter()
            .map(|(label, value)| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{label}: "),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(value),
                ]))
            })
            .collect();

        let list = List::new(items)
            .highlight_style(highlight_style)
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always)
            .block(Block::default());

        let mut state = ListState::default();
        state.select(Some(
            self.settings_panel
                .selected
                .min(SETTINGS_MENU_ITEM_COUNT.saturating_sub(1)),
        ));
        frame.render_stateful_widget(list, sections[0], &mut state);

        let mut help_lines = vec![Line::from(vec![
            Span::styled("↑/↓", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" select  "),
            Span::styled("←/→", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" adjust  "),
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" apply  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ])];
        if let Some(err) = &self.settings_panel.error {
            help_lines.push(Line::styled(
                err.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }
        let help = Paragraph::new(Text::from(help_lines))
            .wrap(Wrap { trim: true })
            .alignment(Alignment::Left);
        frame.render_widget(help, sections[1]);
    }
}

#[derive(Debug, Clone, Default)]
struct OpenPathPanel {
    open: bool,
    input: String,
    error: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct GotoPanel {
    open: bool,
    input: String,
    error: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct SettingsPanel {
    open: bool,
    selected: usize,
    draft: Option<SettingsChange>,
    error: Option<String>,
}

const SETTINGS_MENU_FONT: usize = 0;
const SETTINGS_MENU_STYLE: usize = 1;
const SETTINGS_MENU_SIZE: usize = 2;
const SETTINGS_MENU_COLOUR: usize = 3;
const SETTINGS_MENU_WIDTH: usize = 4;
const SETTINGS_MENU_HEIGHT: usize = 5;
const SETTINGS_MENU_PAGE: usize = 6;
const SETTINGS_MENU_ITEM_COUNT: usize = 7;

const FONT_FAMILIES: [&str; 5] = ["Serif", "SansSerif", "Monospaced", "Dialog", "DialogInput"];
const PALETTE: [Argb; 6] = [
    Argb::WHITE,
    Argb(0xFFC0_C0C0),
    Argb(0xFFFF_D700),
    Argb(0xFF90_EE90),
    Argb(0xFF87_CEEB),
    Argb(0xFFFF_A07A),
];
const WINDOW_STEP_PX: i64 = 50;

impl SettingsPanel {
    fn adjust(&mut self, delta: i64) {
        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        self.error = None;
        match self.selected {
            SETTINGS_MENU_FONT => {
                let idx = FONT_FAMILIES
                    .iter()
                    .position(|family| family.eq_ignore_ascii_case(&draft.font));
                draft.font = FONT_FAMILIES[cycle_index(idx, delta, FONT_FAMILIES.len())].to_string();
            }
            SETTINGS_MENU_STYLE => {
                draft.font_style = draft.font_style.cycle();
            }
            SETTINGS_MENU_SIZE => {
                draft.font_size = add_signed(draft.font_size, delta).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
            }
            SETTINGS_MENU_COLOUR => {
                let idx = PALETTE.iter().position(|color| *color == draft.foreground);
                draft.foreground = PALETTE[cycle_index(idx, delta, PALETTE.len())];
            }
            SETTINGS_MENU_WIDTH => {
                draft.width = add_signed(draft.width, delta * WINDOW_STEP_PX);
            }
            SETTINGS_MENU_HEIGHT => {
                draft.height = add_signed(draft.height, delta * WINDOW_STEP_PX);
            }
            SETTINGS_MENU_PAGE => {
                if let Some(page) = draft.jump_page {
                    draft.jump_page = Some(add_signed(page as u32, delta) as usize);
                }
            }
            _ => {}
        }
    }
}

fn cycle_index(current: Option<usize>, delta: i64, len: usize) -> usize {
    let Some(current) = current else {
        return 0;
    };
    (current as i64 + delta).rem_euclid(len as i64) as usize
}

fn add_signed(value: u32, delta: i64) -> u32 {
    (i64::from(value) + delta).clamp(0, i64::from(u32::MAX)) as u32
}

/// Pixel grid the reader measures against: half-width cells and lines 1.2x
/// the font size.
fn cell_metrics_for(config: &DisplayConfig) -> CellMetrics {
    let size = config.font_size.max(MIN_FONT_SIZE);
    CellMetrics::new(size.div_ceil(2).max(1), (size * 6).div_ceil(5).max(1))
}

/// Centered part of `area` covered by the configured window size.
fn reading_area(area: Rect, config: &DisplayConfig, metrics: &CellMetrics) -> Rect {
    let cols = config.window.width / metrics.cell_width_px.max(1);
    let rows = config.window.height / metrics.cell_height_px.max(1);
    let width = area.width.min(u16::try_from(cols).unwrap_or(u16::MAX));
    let height = area.height.min(u16::try_from(rows).unwrap_or(u16::MAX));
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn argb_color(color: Argb) -> Color {
    Color::Rgb(color.red(), color.green(), color.blue())
}

fn expand_tabs(text: &str) -> String {
    if !text.contains('\t') {
        return text.to_string();
    }
    text.replace('\t', &" ".repeat(TAB_CELLS as usize))
}

fn fit_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut width = 0usize;
    for ch in text.chars() {
        let mut buf = [0u8; 4];
        let s: &str = ch.encode_utf8(&mut buf);
        let w = UnicodeWidthStr::width(s);
        if width + w + 1 > max_width {
            break;
        }
        out.push(ch);
        width += w;
    }
    out.push('…');
    out
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("leave alt screen")?;
    Ok(())
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
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
