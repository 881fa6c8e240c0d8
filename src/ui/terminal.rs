use anyhow::{Context, Result, anyhow};
use crossbeam::channel::{self, Receiver, Sender};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph},
};
use std::{
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::audio::{
    AudioOutput, EngineConfig, LoopVoice, PlaybackSession, PlayerEngine, PlayerEvent,
    SessionCommand, Transport, decode,
};
use crate::catalog::{Catalog, TrackEntry};
use crate::config::Config;
use crate::ui::picker::PatchPicker;
use crate::ui::theme::{self, Theme, ThemePicker};

/// Top-level interaction controller: either picking a patch or playing one.
enum Mode {
    Picking(PatchPicker),
    Playing(PlayingState),
}

struct PlayingState {
    patch_index: usize,
    patch_label: String,
    patch_info: String,
    // Metadata for the tracks that actually decoded, in voice order.
    tracks: Vec<TrackEntry>,
}

/// Precomputed per-voice display row, assembled outside the draw closure.
struct TrackRow {
    label: String,
    info: String,
    enabled: bool,
    position_seconds: f64,
    duration_seconds: f64,
}

pub struct PlayerUI {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    catalog: Catalog,
    config: Config,
    theme: &'static Theme,
    mode: Mode,
    theme_picker: Option<ThemePicker>,
    // Audio side, opened lazily on first load so a missing device leaves the
    // picker usable.
    engine: Option<Arc<PlayerEngine>>,
    output: Option<AudioOutput>,
    command_sender: Option<Sender<SessionCommand>>,
    event_receiver: Option<Receiver<PlayerEvent>>,
    status: Option<String>,
    status_timer: Option<Instant>,
    is_running: bool,
    last_update: Instant,
}

impl PlayerUI {
    pub fn new(catalog: Catalog, config: Config, initial_patch: Option<usize>) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let theme = theme::by_name(&config.theme);
        let mut ui = Self {
            terminal,
            mode: Mode::Picking(PatchPicker::new(&catalog)),
            catalog,
            config,
            theme,
            theme_picker: None,
            engine: None,
            output: None,
            command_sender: None,
            event_receiver: None,
            status: None,
            status_timer: None,
            is_running: true,
            last_update: Instant::now(),
        };

        // A patch given on the command line goes straight to the player.
        if let Some(index) = initial_patch
            && let Err(e) = ui.enter_playing(index)
        {
            ui.show_status(&format!("{}", e));
        }
        Ok(ui)
    }

    pub fn run(&mut self) -> Result<()> {
        while self.is_running {
            self.process_events()?;
            self.check_status_timer();

            if self.last_update.elapsed() >= Duration::from_millis(50) {
                self.draw()?;
                self.last_update = Instant::now();
            }

            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    fn process_events(&mut self) -> Result<()> {
        if event::poll(Duration::from_millis(0))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            self.handle_key_event(key);
        }

        if let Some(receiver) = &self.event_receiver {
            let mut errors = Vec::new();
            while let Ok(event) = receiver.try_recv() {
                let PlayerEvent::Error(message) = event;
                errors.push(message);
            }
            for message in errors {
                tracing::warn!(%message, "audio event");
                self.show_status(&message);
            }
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        // Ctrl+C quits from any state.
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }

        if self.theme_picker.is_some() {
            self.handle_theme_picker_key(key);
            return;
        }

        match &mut self.mode {
            Mode::Picking(_) => self.handle_picker_key(key),
            Mode::Playing(_) => self.handle_player_key(key),
        }
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        let mut committed: Option<String> = None;
        let mut quit = false;

        if let Mode::Picking(picker) = &mut self.mode {
            match key.code {
                KeyCode::Up => picker.move_selection(-1),
                KeyCode::Down => picker.move_selection(1),
                KeyCode::Backspace => picker.pop_char(),
                // Enter on an empty result set is ignored.
                KeyCode::Enter => committed = picker.commit().map(str::to_string),
                KeyCode::Esc => {
                    if picker.filter().is_empty() {
                        quit = true;
                    } else {
                        picker.set_filter("");
                    }
                }
                KeyCode::Char(c) => picker.push_char(c),
                _ => {}
            }
        }

        if quit {
            self.quit();
        } else if let Some(id) = committed
            && let Some(index) = self.catalog.position_of(&id)
            && let Err(e) = self.enter_playing(index)
        {
            self.show_status(&format!("{}", e));
        }
    }

    fn handle_player_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.quit(),
            KeyCode::Char(' ') => self.send_command(SessionCommand::ToggleAll),
            KeyCode::Char('1') => self.send_command(SessionCommand::ToggleVoice(0)),
            KeyCode::Char('2') => self.send_command(SessionCommand::ToggleVoice(1)),
            KeyCode::Char('3') => self.send_command(SessionCommand::ToggleVoice(2)),
            KeyCode::Left => self.navigate(-1),
            KeyCode::Right => self.navigate(1),
            KeyCode::Char('t') | KeyCode::Char('T') => {
                self.theme_picker = Some(ThemePicker::new(self.theme.name));
            }
            KeyCode::Esc => self.back_to_picker(),
            _ => {}
        }
    }

    fn handle_theme_picker_key(&mut self, key: KeyEvent) {
        let Some(picker) = &mut self.theme_picker else {
            return;
        };
        match key.code {
            KeyCode::Up => picker.move_selection(-1),
            KeyCode::Down => picker.move_selection(1),
            KeyCode::Backspace => picker.pop_char(),
            KeyCode::Enter => {
                if let Some(name) = picker.commit() {
                    self.apply_theme(name);
                }
                self.theme_picker = None;
            }
            KeyCode::Esc => self.theme_picker = None,
            KeyCode::Char(c) => picker.push_char(c),
            _ => {}
        }
    }

    fn apply_theme(&mut self, name: &str) {
        self.theme = theme::by_name(name);
        self.config.theme = self.theme.name.to_string();
        if let Err(e) = self.config.save() {
            tracing::warn!(error = %e, "could not persist theme");
        }
        self.show_status(&format!("Theme: {}", self.theme.name));
    }

    /// Open the output device and spin up the engine. Lazy: failure keeps
    /// the picker running instead of killing the process.
    fn ensure_audio(&mut self) -> Result<()> {
        if self.engine.is_some() {
            return Ok(());
        }

        let mut output = AudioOutput::open().context("cannot open audio output")?;
        let (command_sender, command_receiver) = channel::unbounded::<SessionCommand>();
        let (event_sender, event_receiver) = channel::unbounded::<PlayerEvent>();

        let engine = Arc::new(PlayerEngine::new(
            EngineConfig {
                sample_rate: output.sample_rate(),
                ..EngineConfig::default()
            },
            command_receiver,
        ));
        output
            .start(Arc::clone(&engine), event_sender)
            .context("cannot start audio output")?;

        tracing::debug!(device = output.device_name(), "audio output running");
        self.engine = Some(engine);
        self.output = Some(output);
        self.command_sender = Some(command_sender);
        self.event_receiver = Some(event_receiver);
        Ok(())
    }

    /// Build a session for the patch at `patch_index` and start it (loading
    /// auto-plays). Decode happens here on the UI thread; the audio callback
    /// only ever sees the finished session.
    fn enter_playing(&mut self, patch_index: usize) -> Result<()> {
        self.ensure_audio()?;
        let engine = self
            .engine
            .clone()
            .ok_or_else(|| anyhow!("audio engine not running"))?;

        let patch = self
            .catalog
            .patches()
            .get(patch_index)
            .ok_or_else(|| anyhow!("patch index out of range"))?
            .clone();

        let mut voices = Vec::new();
        let mut loaded_tracks = Vec::new();
        for track in &patch.tracks {
            match decode::decode_track(&track.file, engine.sample_rate()) {
                Ok(source) => {
                    voices.push(LoopVoice::new(source));
                    loaded_tracks.push(track.clone());
                }
                Err(e) => {
                    // Skip the track, keep the rest of the patch playable.
                    tracing::warn!(patch = %patch.id, track = track.number, error = %e, "track unavailable");
                }
            }
        }

        if voices.is_empty() {
            return Err(anyhow!("no playable tracks in {}", patch.display_name()));
        }
        if loaded_tracks.len() < patch.tracks.len() {
            self.show_status(&format!(
                "{} track(s) unavailable",
                patch.tracks.len() - loaded_tracks.len()
            ));
        }

        let mut session = PlaybackSession::new(voices);
        session.start();
        engine.install_session(session);

        let mut info_parts: Vec<String> = Vec::new();
        if let Some(style) = &patch.style {
            info_parts.push(style.clone());
        }
        if !patch.tags.is_empty() {
            info_parts.push(patch.tags.join(", "));
        }

        self.mode = Mode::Playing(PlayingState {
            patch_index,
            patch_label: patch.display_name(),
            patch_info: info_parts.join(" \u{2022} "),
            tracks: loaded_tracks,
        });
        tracing::debug!(patch = %patch.id, "playing");
        Ok(())
    }

    /// Move to the adjacent patch in catalog order: full teardown of the
    /// current session, fresh auto-started session for the neighbor.
    fn navigate(&mut self, delta: isize) {
        let Mode::Playing(state) = &self.mode else {
            return;
        };
        let target = state.patch_index as isize + delta;
        if target < 0 || target >= self.catalog.len() as isize {
            return;
        }
        if let Err(e) = self.enter_playing(target as usize) {
            self.show_status(&format!("{}", e));
        }
    }

    fn back_to_picker(&mut self) {
        if let Some(engine) = &self.engine {
            engine.clear_session();
        }
        self.theme_picker = None;
        self.mode = Mode::Picking(PatchPicker::new(&self.catalog));
    }

    fn quit(&mut self) {
        if let Some(engine) = &self.engine {
            engine.clear_session();
        }
        // Dropping the output closes the device before the terminal is
        // restored.
        let _ = self.output.take();
        self.is_running = false;
    }

    fn send_command(&self, command: SessionCommand) {
        if let Some(sender) = &self.command_sender {
            let _ = sender.try_send(command);
        }
    }

    fn show_status(&mut self, message: &str) {
        self.status = Some(message.to_string());
        self.status_timer = Some(Instant::now());
    }

    fn check_status_timer(&mut self) {
        if let Some(timer) = self.status_timer
            && timer.elapsed() >= Duration::from_secs(3)
        {
            self.status = None;
            self.status_timer = None;
        }
    }

    fn draw(&mut self) -> Result<()> {
        let theme = self.theme;
        let status = self.status.clone();
        let theme_picker_rows: Option<(Vec<String>, usize, String)> =
            self.theme_picker.as_ref().map(|picker| {
                (
                    picker.matches().map(|t| t.name.to_string()).collect(),
                    picker.selected_index(),
                    picker.filter().to_string(),
                )
            });

        match &self.mode {
            Mode::Picking(picker) => {
                let rows: Vec<String> = picker.matches().map(|e| e.label.clone()).collect();
                let selected = picker.selected_index();
                let filter = picker.filter().to_string();
                let total = self.catalog.len();
                self.terminal.draw(|f| {
                    Self::draw_picker_static(f, theme, &rows, selected, &filter, total, &status);
                })?;
            }
            Mode::Playing(state) => {
                let snapshot = self.engine.as_ref().and_then(|e| e.snapshot());
                let transport = snapshot
                    .as_ref()
                    .map(|s| s.transport)
                    .unwrap_or(Transport::Stopped);
                let rows: Vec<TrackRow> = state
                    .tracks
                    .iter()
                    .enumerate()
                    .map(|(i, track)| {
                        let voice = snapshot.as_ref().and_then(|s| s.voices.get(i));
                        TrackRow {
                            label: format!("{} {}", track.number, track.display_name()),
                            info: track.info_line(),
                            enabled: voice.map(|v| v.enabled).unwrap_or(false),
                            position_seconds: voice.map(|v| v.position_seconds).unwrap_or(0.0),
                            duration_seconds: voice.map(|v| v.duration_seconds).unwrap_or(0.0),
                        }
                    })
                    .collect();
                let label = state.patch_label.clone();
                let info = state.patch_info.clone();
                self.terminal.draw(|f| {
                    Self::draw_player_static(f, theme, &label, &info, transport, &rows, &status);
                    if let Some((names, selected, filter)) = &theme_picker_rows {
                        Self::draw_theme_overlay_static(f, theme, names, *selected, filter);
                    }
                })?;
            }
        }
        Ok(())
    }

    fn draw_picker_static(
        f: &mut Frame,
        theme: &Theme,
        rows: &[String],
        selected: usize,
        filter: &str,
        total: usize,
        status: &Option<String>,
    ) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(3), // Filter
                Constraint::Min(0),    // Patch list
                Constraint::Length(3), // Footer
            ])
            .split(f.area());

        let header_text = match status {
            Some(message) => format!("\u{2713} {}", message),
            None => format!("{} patches in catalog", total),
        };
        let header = Paragraph::new(header_text)
            .style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Loopcat"));
        f.render_widget(header, chunks[0]);

        let filter_line = if filter.is_empty() {
            Line::from(Span::styled(
                "Type to filter...",
                Style::default().fg(theme.dim),
            ))
        } else {
            Line::from(vec![
                Span::raw("Filter: "),
                Span::styled(filter.to_string(), Style::default().fg(theme.accent)),
            ])
        };
        let filter_widget =
            Paragraph::new(filter_line).block(Block::default().borders(Borders::ALL));
        f.render_widget(filter_widget, chunks[1]);

        let visible = chunks[2].height.saturating_sub(2) as usize;
        let scroll = scroll_offset(selected, visible, rows.len());
        let items: Vec<ListItem> = rows
            .iter()
            .enumerate()
            .skip(scroll)
            .take(visible.max(1))
            .map(|(i, label)| {
                let style = if i == selected {
                    Style::default()
                        .fg(theme.highlight_fg)
                        .bg(theme.accent)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(label.clone()).style(style)
            })
            .collect();

        let title = if rows.is_empty() {
            "Patches (no matches)".to_string()
        } else {
            format!("Patches ({})", rows.len())
        };
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(list, chunks[2]);

        let footer = Paragraph::new("\u{2191}\u{2193} Select | Enter Play | Esc Clear/Quit")
            .style(Style::default().fg(theme.dim))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(footer, chunks[3]);
    }

    fn draw_player_static(
        f: &mut Frame,
        theme: &Theme,
        patch_label: &str,
        patch_info: &str,
        transport: Transport,
        rows: &[TrackRow],
        status: &Option<String>,
    ) {
        let mut constraints = vec![Constraint::Length(3)]; // Header
        for _ in rows {
            constraints.push(Constraint::Length(4));
        }
        constraints.push(Constraint::Min(0));
        constraints.push(Constraint::Length(3)); // Footer

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(f.area());

        let transport_text = match transport {
            Transport::Running => Span::styled(
                "\u{25b6} RUNNING",
                Style::default().fg(theme.playing).add_modifier(Modifier::BOLD),
            ),
            Transport::Stopped => Span::styled(
                "\u{23f9} STOPPED",
                Style::default().fg(theme.stopped).add_modifier(Modifier::BOLD),
            ),
        };
        let header_line = match status {
            Some(message) => Line::from(Span::styled(
                format!("\u{2713} {}", message),
                Style::default().fg(theme.accent),
            )),
            None => {
                let mut spans = vec![
                    Span::styled(
                        patch_label.to_string(),
                        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    transport_text,
                ];
                if !patch_info.is_empty() {
                    spans.push(Span::styled(
                        format!("  {}", patch_info),
                        Style::default().fg(theme.dim),
                    ));
                }
                Line::from(spans)
            }
        };
        let header = Paragraph::new(header_line)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Loopcat"));
        f.render_widget(header, chunks[0]);

        for (i, row) in rows.iter().enumerate() {
            Self::draw_track_row_static(f, chunks[i + 1], theme, row, transport);
        }

        let footer = Paragraph::new(
            "Space All Start/Stop | 1-3 Toggle Track | \u{2190}\u{2192} Prev/Next | T Theme | Esc Back | Q Quit",
        )
        .style(Style::default().fg(theme.dim))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(footer, chunks[chunks.len() - 1]);
    }

    fn draw_track_row_static(
        f: &mut Frame,
        area: Rect,
        theme: &Theme,
        row: &TrackRow,
        transport: Transport,
    ) {
        let sounding = row.enabled && transport == Transport::Running;
        let (status_text, border_color) = if sounding {
            ("\u{25b6} PLAYING", theme.playing)
        } else if row.enabled {
            ("\u{23f8} ARMED", theme.accent)
        } else {
            ("\u{23f9} MUTED", theme.stopped)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(Line::from(vec![
                Span::styled(
                    format!(" {} ", row.label),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("{} ", status_text),
                    Style::default().fg(border_color),
                ),
            ]));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let lines = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(inner);

        if !row.info.is_empty() {
            let info = Paragraph::new(row.info.clone()).style(Style::default().fg(theme.dim));
            f.render_widget(info, lines[0]);
        }

        let ratio = if row.duration_seconds > 0.0 {
            (row.position_seconds / row.duration_seconds).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(if sounding { theme.playing } else { theme.dim }))
            .ratio(ratio)
            .label(format!(
                "{:.1}s / {:.1}s",
                row.position_seconds, row.duration_seconds
            ));
        f.render_widget(gauge, lines[1]);
    }

    fn draw_theme_overlay_static(
        f: &mut Frame,
        theme: &Theme,
        names: &[String],
        selected: usize,
        filter: &str,
    ) {
        let area = f.area();
        let width = 40u16.min(area.width);
        let height = ((names.len() + 4).min(16)) as u16;
        let x = (area.width.saturating_sub(width)) / 2;
        let y = (area.height.saturating_sub(height)) / 2;
        let overlay = Rect::new(x, y, width, height);

        f.render_widget(Clear, overlay);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.accent))
            .title(" Theme ");
        let inner = block.inner(overlay);
        f.render_widget(block, overlay);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(inner);

        let filter_text = if filter.is_empty() {
            Span::styled("Type to filter...", Style::default().fg(theme.dim))
        } else {
            Span::raw(format!("Filter: {}", filter))
        };
        f.render_widget(Paragraph::new(Line::from(filter_text)), chunks[0]);

        let items: Vec<ListItem> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let style = if i == selected {
                    Style::default().fg(theme.highlight_fg).bg(theme.accent)
                } else {
                    Style::default()
                };
                ListItem::new(name.clone()).style(style)
            })
            .collect();
        f.render_widget(List::new(items), chunks[1]);
    }
}

/// Keep the selection visible inside a window of `visible` rows.
fn scroll_offset(selected: usize, visible: usize, total: usize) -> usize {
    if visible == 0 || total <= visible {
        return 0;
    }
    if selected >= visible {
        (selected + 1 - visible).min(total - visible)
    } else {
        0
    }
}

impl Drop for PlayerUI {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
    }
}
