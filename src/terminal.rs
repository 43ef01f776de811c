// SPDX-License-Identifier: GPL-3.0-only

//! Terminal scanner
//!
//! Renders the camera preview with Unicode half-block characters, shows the
//! decoded result in a panel and notices in the status bar. This loop is the
//! UI thread: it is the only caller of [`ScannerModel::update`].

use crate::app::frame_processor::DecodedBarcode;
use crate::app::{EffectRunner, Message, Notice, Platform, ScannerModel};
use crate::backends::camera::types::{CameraFrame, FrameReceiver, PixelFormat};
use crate::config::Config;
use crate::constants::{app_info, pipeline, timing};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use std::io::{self, stdout};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info};

const HINTS: &str = "t torch | f flip | i image | Esc back | q quit";
const RESULT_HINTS: &str = "c copy | o open | Esc scan again";

/// Run the terminal scanner until the user quits
pub fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        version = app_info::version(),
        environment = app_info::runtime_environment(),
        "Starting terminal scanner"
    );
    gstreamer::init()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("scanner-effects")
        .build()?;
    let platform = Platform::system(&config);

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, config, platform, runtime.handle().clone());

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    runtime.shutdown_timeout(std::time::Duration::from_secs(timing::STOP_TIMEOUT_SECS));
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: Config,
    platform: Platform,
    handle: tokio::runtime::Handle,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (preview_tx, mut preview_rx): (_, FrameReceiver) =
        futures::channel::mpsc::channel(pipeline::PREVIEW_CHANNEL_CAPACITY);

    let mut model = ScannerModel::new(
        config,
        Arc::clone(&platform.permissions),
        Arc::clone(&platform.live_decoder),
        tx.clone(),
        preview_tx,
    )?;
    let runner = EffectRunner::new(platform, handle, tx);

    let mut preview = PreviewWidget::default();
    let mut notice: Option<(Notice, Instant)> = None;

    runner.run_all(model.update(Message::ViewAttached));

    loop {
        while let Ok(message) = rx.try_recv() {
            runner.run_all(model.update(message));
        }

        // Drain to the newest preview frame
        while let Ok(frame) = preview_rx.try_recv() {
            preview.frame = Some(frame);
        }

        if let Some(latest) = model.take_notices().pop() {
            notice = Some((latest, Instant::now()));
        }
        if notice
            .as_ref()
            .is_some_and(|(_, shown)| shown.elapsed() > timing::NOTICE_DURATION)
        {
            notice = None;
        }

        if model.should_exit() {
            break;
        }

        terminal.draw(|f| {
            let area = f.area();
            let main_area = Rect {
                height: area.height.saturating_sub(1),
                ..area
            };
            let status_area = Rect {
                y: area.y + area.height.saturating_sub(1),
                height: 1,
                ..area
            };

            preview.waiting = !model.session().is_bound();
            f.render_widget(&preview, main_area);

            if let Some(barcode) = model.panel().barcode() {
                f.render_widget(ResultPanelWidget { barcode }, panel_area(main_area));
            }

            let message = match &notice {
                Some((notice, _)) => notice.message(),
                None if model.panel().is_visible() => RESULT_HINTS.to_string(),
                None => HINTS.to_string(),
            };
            f.render_widget(
                StatusBar {
                    message: &message,
                    detail: session_detail(&model),
                },
                status_area,
            );
        })?;

        if event::poll(timing::UI_TICK)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key_action(key) {
                KeyAction::Quit => break,
                KeyAction::Send(message) => runner.run_all(model.update(message)),
                KeyAction::None => {}
            }
        }
    }

    info!("Leaving terminal scanner");
    runner.run_all(model.update(Message::Shutdown));
    Ok(())
}

#[derive(Debug)]
enum KeyAction {
    Send(Message),
    Quit,
    None,
}

fn key_action(key: KeyEvent) -> KeyAction {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return KeyAction::Quit;
    }

    let message = match key.code {
        KeyCode::Char('q') => return KeyAction::Quit,
        KeyCode::Char('t') => Message::ToggleTorch,
        KeyCode::Char('f') => Message::FlipCamera,
        KeyCode::Char('i') => Message::PickImage,
        KeyCode::Char('c') => Message::CopyResult,
        KeyCode::Char('o') => Message::OpenResultLink,
        KeyCode::Esc | KeyCode::Backspace => Message::Back,
        other => {
            debug!(key = ?other, "Unbound key");
            return KeyAction::None;
        }
    };
    KeyAction::Send(message)
}

fn session_detail(model: &ScannerModel) -> String {
    let session = model.session();
    let mut detail = match session.device_name() {
        Some(name) => name.to_string(),
        None if model.is_still_image_active() => "decoding image".to_string(),
        None => format!("{} camera", session.facing()),
    };
    if session.torch_on() {
        detail.push_str(" | torch");
    }
    detail
}

/// Centered box covering most of the preview
fn panel_area(area: Rect) -> Rect {
    let width = area.width.saturating_sub(4).min(72);
    let height = area.height.saturating_sub(2).min(12);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Camera frame rendered with half-block characters
#[derive(Default)]
struct PreviewWidget {
    frame: Option<Arc<CameraFrame>>,
    waiting: bool,
}

impl Widget for &PreviewWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let frame = match &self.frame {
            Some(frame) if !self.waiting => frame,
            _ => {
                let msg = "Waiting for camera...";
                let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
                let y = area.y + area.height / 2;
                if y < area.y + area.height && x < area.x + area.width {
                    buf.set_string(x, y, msg, Style::default());
                }
                return;
            }
        };
        if frame.width == 0 || frame.height == 0 || area.width == 0 || area.height == 0 {
            return;
        }

        // Each cell shows two vertical pixels
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            ((h * frame_aspect) as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            (w as u16, (w / frame_aspect / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;
        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        for ty in 0..display_height {
            for tx in 0..display_width {
                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(sample_pixel(frame, src_x, src_y_top));
                    cell.set_bg(sample_pixel(frame, src_x, src_y_bottom));
                }
            }
        }
    }
}

fn sample_pixel(frame: &CameraFrame, x: u32, y: u32) -> Color {
    let x = x.min(frame.width - 1);
    let y = y.min(frame.height - 1);
    let data = frame.data_slice();
    let row = (y * frame.stride) as usize;

    let rgb = match frame.format {
        PixelFormat::RGBA | PixelFormat::RGB24 => {
            let idx = row + (x * frame.format.bytes_per_pixel()) as usize;
            data.get(idx..idx + 3).map(|p| (p[0], p[1], p[2]))
        }
        // Luma only; chroma does not matter at terminal resolution
        PixelFormat::Gray8 | PixelFormat::NV12 => {
            data.get(row + x as usize).map(|&v| (v, v, v))
        }
    };
    let (r, g, b) = rgb.unwrap_or((0, 0, 0));
    Color::Rgb(r, g, b)
}

/// Decoded result overlay
struct ResultPanelWidget<'a> {
    barcode: &'a DecodedBarcode,
}

impl Widget for ResultPanelWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let action = self.barcode.action();
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", self.barcode.format))
            .style(Style::default().fg(Color::White).bg(Color::Black));

        let mut lines = vec![
            Line::from(Span::styled(
                action.kind_label(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::default(),
        ];
        lines.extend(self.barcode.text.lines().map(|l| Line::from(l.to_string())));

        let details = action.details();
        if !details.is_empty() {
            lines.push(Line::default());
        }
        for (label, value) in details {
            lines.push(Line::from(vec![
                Span::styled(format!("{}: ", label), Style::default().fg(Color::Gray)),
                Span::raw(value),
            ]));
        }

        Clear.render(area, buf);
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
    detail: String,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default().fg(Color::White).bg(Color::DarkGray);
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let width = area.width as usize;
        let message: String = self.message.chars().take(width).collect();
        buf.set_string(area.x, area.y, &message, style);

        let used = message.chars().count() + 2;
        let detail_len = self.detail.chars().count();
        if used + detail_len <= width {
            let x = area.x + (width - detail_len) as u16;
            buf.set_string(x, area.y, &self.detail, style);
        }
    }
}
