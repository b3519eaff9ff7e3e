//! slowRhythm — lane chart view, editing and playback

use crate::audio::SineTone;
use crate::repaint::RepaintController;
use crate::theme::{menu_bar, status_bar, SlowColors};
use egui::{Align2, Context, FontId, Key, Painter, PointerButton, Pos2, Rect, Sense, Stroke};
use rhythmcore::chart::lane_label;
use rhythmcore::editor::CellPos;
use rhythmcore::scroll::{self, Viewport};
use rhythmcore::{export, EditError, GridSource, Session, Settings, ToneGenerator};
use std::ops::{ControlFlow, Range};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const HEADER_HEIGHT: f32 = 22.0;
const ROW_LABEL_WIDTH: f32 = 48.0;
const WHEEL_SCALE: f32 = 2.0;

/// Lane widths relative to a normal lane. The SPACE lane of the eight-lane
/// layout is wider.
fn lane_weight(lane: usize, lane_count: usize) -> f32 {
    if lane_count == 8 && lane == 4 {
        4.0 / 3.0
    } else {
        1.0
    }
}

/// Scratch and space lanes are drawn hollow.
fn is_accent_lane(lane: usize, lane_count: usize) -> bool {
    lane_count == 8 && (lane == 0 || lane == 4)
}

fn is_midi_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("mid") || e.eq_ignore_ascii_case("midi"))
        .unwrap_or(false)
}

/// Screen placement of the grid for one frame.
struct GridGeometry {
    grid: Rect,
    /// Left edge of every lane plus the right edge of the last one.
    edges: Vec<f32>,
    row_height: f32,
    scroll_y: f32,
    rows: usize,
}

impl GridGeometry {
    fn new(grid: Rect, lane_count: usize, rows: usize, row_height: f32, scroll_y: f32) -> Self {
        let total: f32 = (0..lane_count).map(|lane| lane_weight(lane, lane_count)).sum();
        let mut edges = Vec::with_capacity(lane_count + 1);
        let mut x = grid.min.x;
        edges.push(x);
        for lane in 0..lane_count {
            x += grid.width() * lane_weight(lane, lane_count) / total;
            edges.push(x);
        }
        Self {
            grid,
            edges,
            row_height,
            scroll_y,
            rows,
        }
    }

    fn row_top(&self, row: usize) -> f32 {
        self.grid.min.y + row as f32 * self.row_height - self.scroll_y
    }

    fn cell_rect(&self, row: usize, lane: usize) -> Rect {
        let top = self.row_top(row);
        Rect::from_min_max(
            Pos2::new(self.edges[lane], top),
            Pos2::new(self.edges[lane + 1], top + self.row_height),
        )
    }

    fn cell_at(&self, pos: Pos2) -> Option<CellPos> {
        if !self.grid.contains(pos) {
            return None;
        }
        let row = ((pos.y - self.grid.min.y + self.scroll_y) / self.row_height).floor();
        if row < 0.0 || row as usize >= self.rows {
            return None;
        }
        let lane = self.edges.windows(2).position(|e| pos.x >= e[0] && pos.x < e[1])?;
        Some((row as usize, lane))
    }
}

fn paint_cells<G: GridSource>(
    painter: &Painter,
    source: &G,
    geometry: &GridGeometry,
    rows: Range<usize>,
) {
    let lane_count = source.lane_count();
    for row in rows {
        for lane in 0..lane_count {
            let Some(cell) = source.cell_at(row, lane) else {
                continue;
            };
            let rect = geometry.cell_rect(row, lane).shrink(1.5);
            let text_color = if is_accent_lane(lane, lane_count) {
                painter.rect_filled(rect, 0.0, SlowColors::WHITE);
                painter.rect_stroke(rect, 0.0, Stroke::new(2.0, SlowColors::BLACK));
                SlowColors::BLACK
            } else {
                painter.rect_filled(rect, 0.0, SlowColors::BLACK);
                SlowColors::WHITE
            };
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                cell.label(),
                FontId::proportional(11.0),
                text_color,
            );
        }
    }
}

pub struct SlowRhythmApp {
    session: Session,
    tone: SineTone,
    repaint: RepaintController,
    /// Pixels from the top of the grid to the top of the view.
    scroll_y: f32,
    /// Geometry of the last painted frame; transport commands use it.
    viewport: Viewport,
    /// Seek that waits for the grid to be laid out.
    pending_seek: Option<i64>,
    selected: Option<CellPos>,
    drag_from: Option<CellPos>,
    status: String,
    show_about: bool,
}

impl SlowRhythmApp {
    pub fn new(settings: Settings) -> Self {
        let tone = SineTone::new(Duration::from_millis(settings.playback.preview_ms));
        let repaint = RepaintController::new(Duration::from_millis(settings.playback.tick_interval_ms));
        let row_height = settings.row_height;
        Self {
            session: Session::with_wall_clock(settings),
            tone,
            repaint,
            scroll_y: 0.0,
            viewport: Viewport::new(0.0, 600.0, row_height),
            pending_seek: Some(0),
            selected: None,
            drag_from: None,
            status: "[F5] play | click a note to hear it".into(),
            show_about: false,
        }
    }

    pub fn load_from_path(&mut self, path: PathBuf) {
        self.tone.all_off();
        let report = self.session.load(&path);
        self.selected = None;
        self.drag_from = None;
        self.pending_seek = Some(0);
        self.repaint.mark_needs_repaint();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.status = if self.session.chart().is_empty() {
            format!("no notes in {}", name)
        } else if report.dropped > 0 {
            format!("{}: {} notes, {} dropped (row full)", name, report.placed, report.dropped)
        } else {
            format!("{}: {} notes", name, report.placed)
        };
    }

    fn reload(&mut self) {
        if let Some(path) = self.session.path().map(Path::to_path_buf) {
            self.load_from_path(path);
        }
    }

    fn export_chart(&mut self) {
        let path = PathBuf::from(&self.session.settings().export_file_name);
        self.status = match export::export_to_path(self.session.chart(), &path) {
            Ok(count) => format!("saved {} notes to {}", count, path.display()),
            Err(err) => {
                warn!(path = %path.display(), %err, "export failed");
                format!("save failed: {}", err)
            }
        };
    }

    fn toggle_playback(&mut self) {
        if self.session.toggle_playback(&self.viewport) {
            self.status = "playing...".into();
        } else {
            self.tone.all_off();
            self.status = "stopped".into();
        }
    }

    fn adjust_speed(&mut self, delta: f64) {
        let speed = self.session.adjust_speed(delta);
        self.status = format!("speed {:.1}x", speed);
    }

    fn report_edit_error(&mut self, err: EditError) {
        debug!(%err, "edit rejected");
        self.status = err.to_string();
    }

    fn undo(&mut self) {
        if self.session.editor_mut().undo() {
            self.status = "undo".into();
        }
    }

    fn redo(&mut self) {
        if self.session.editor_mut().redo() {
            self.status = "redo".into();
        }
    }

    fn delete_selected(&mut self) {
        let Some(pos) = self.selected else {
            return;
        };
        match self.session.editor_mut().delete(pos) {
            Ok(Some(cell)) => self.status = format!("deleted {}", cell.label()),
            Ok(None) => {}
            Err(err) => self.report_edit_error(err),
        }
    }

    /// Returns the text to put on the system clipboard.
    fn copy_selected(&mut self) -> Option<String> {
        let pos = self.selected?;
        match self.session.editor_mut().copy(pos) {
            Ok(Some(cell)) => {
                self.status = format!("copied {}", cell.label());
                Some(cell.label())
            }
            Ok(None) => None,
            Err(err) => {
                self.report_edit_error(err);
                None
            }
        }
    }

    fn paste_at_selected(&mut self) {
        let Some(pos) = self.selected else {
            return;
        };
        match self.session.editor_mut().paste(pos) {
            Ok(cell) => self.status = format!("pasted {}", cell.label()),
            Err(err) => self.report_edit_error(err),
        }
    }

    fn swap(&mut self, from: CellPos, to: CellPos) {
        match self.session.editor_mut().swap(from, to) {
            Ok(true) => {
                self.selected = Some(to);
                self.status = "moved".into();
            }
            Ok(false) => {}
            Err(err) => self.report_edit_error(err),
        }
    }

    fn move_selection(&mut self, d_row: i64, d_lane: i64) {
        let Some((row, lane)) = self.selected else {
            return;
        };
        let chart = self.session.chart();
        let row = (row as i64 + d_row).clamp(0, chart.rows() as i64 - 1) as usize;
        let lane = (lane as i64 + d_lane).clamp(0, chart.lanes() as i64 - 1) as usize;
        self.selected = Some((row, lane));
    }

    fn handle_keys(&mut self, ctx: &Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .filter(|p| is_midi_file(p))
                .collect()
        });
        if let Some(path) = dropped.into_iter().next() {
            self.load_from_path(path);
        }

        let step = self.session.settings().playback.speed_step;
        let (copy, paste) = ctx.input(|i| {
            let cmd = i.modifiers.command;

            if i.key_pressed(Key::F5) || i.key_pressed(Key::Space) {
                self.toggle_playback();
            }
            if i.key_pressed(Key::Num1) {
                self.adjust_speed(-step);
            }
            if i.key_pressed(Key::Num2) {
                self.adjust_speed(step);
            }
            if i.key_pressed(Key::Home) {
                self.pending_seek = Some(0);
            }

            if cmd && i.key_pressed(Key::Z) {
                if i.modifiers.shift {
                    self.redo();
                } else {
                    self.undo();
                }
            }
            if cmd && i.key_pressed(Key::Y) {
                self.redo();
            }
            if cmd && i.key_pressed(Key::S) {
                self.export_chart();
            }
            if cmd && i.key_pressed(Key::R) {
                self.reload();
            }
            if i.key_pressed(Key::Delete) || i.key_pressed(Key::Backspace) {
                self.delete_selected();
            }

            if i.key_pressed(Key::ArrowUp) {
                self.move_selection(-1, 0);
            }
            if i.key_pressed(Key::ArrowDown) {
                self.move_selection(1, 0);
            }
            if i.key_pressed(Key::ArrowLeft) {
                self.move_selection(0, -1);
            }
            if i.key_pressed(Key::ArrowRight) {
                self.move_selection(0, 1);
            }

            // The platform layer may turn these shortcuts into clipboard
            // events instead of key presses.
            let copy = i.events.iter().any(|e| matches!(e, egui::Event::Copy))
                || (cmd && i.key_pressed(Key::C));
            let paste = i.events.iter().any(|e| matches!(e, egui::Event::Paste(_)))
                || (cmd && i.key_pressed(Key::V));
            (copy, paste)
        });

        if copy {
            if let Some(text) = self.copy_selected() {
                ctx.output_mut(|o| o.copied_text = text);
            }
        }
        if paste {
            self.paste_at_selected();
        }
    }

    /// Advance playback or apply input scrolling, then clamp.
    fn update_scroll(&mut self, ui: &egui::Ui, response: &egui::Response, viewport: Viewport) -> Viewport {
        if let Some(tick) = self.pending_seek.take() {
            self.scroll_y = self.session.seek(tick, &viewport);
        }

        if self.session.is_playing() {
            let tone = &mut self.tone;
            let offset = self.session.tick(&viewport, |_, _, cell| {
                tone.play_pitch(cell.pitch);
                ControlFlow::Continue(())
            });
            if let Some(offset) = offset {
                self.scroll_y = offset;
            }
            if !self.session.is_playing() {
                self.status = "finished".into();
            }
        } else {
            if response.hovered() {
                let wheel = ui.input(|i| i.raw_scroll_delta.y);
                self.scroll_y -= wheel * WHEEL_SCALE;
            }
            if response.dragged_by(PointerButton::Secondary) {
                self.scroll_y -= response.drag_delta().y;
            }
        }

        let rows = self.session.layout().rows() as f32;
        let max_scroll = (rows * viewport.row_height - viewport.height).max(0.0);
        self.scroll_y = self.scroll_y.clamp(0.0, max_scroll);
        viewport.with_scroll(self.scroll_y)
    }

    fn render_chart(&mut self, ui: &mut egui::Ui) {
        let available = ui.available_size();
        let (response, painter) = ui.allocate_painter(available, Sense::click_and_drag());
        let rect = response.rect;
        painter.rect_filled(rect, 0.0, SlowColors::WHITE);

        let layout = self.session.layout();
        let grid = Rect::from_min_max(
            Pos2::new(rect.min.x + ROW_LABEL_WIDTH, rect.min.y + HEADER_HEIGHT),
            rect.max,
        );
        let row_height = self.session.settings().row_height;
        let viewport = self.update_scroll(ui, &response, Viewport::new(self.scroll_y, grid.height(), row_height));
        self.viewport = viewport;

        let geometry = GridGeometry::new(grid, layout.lane_count(), layout.row_count(), row_height, self.scroll_y);
        let visible = viewport.visible_rows(layout.row_count());
        let grid_painter = painter.with_clip_rect(grid);

        // Rows
        for row in visible.clone() {
            let top = geometry.row_top(row);
            let row_rect = Rect::from_min_max(Pos2::new(grid.min.x, top), Pos2::new(grid.max.x, top + row_height));
            if row as i64 == layout.judgment_row() {
                grid_painter.rect_filled(row_rect, 0.0, SlowColors::JUDGMENT);
            }
            grid_painter.hline(grid.x_range(), row_rect.max.y, Stroke::new(0.5, SlowColors::BLACK));
        }
        for &x in &geometry.edges {
            grid_painter.vline(x, grid.y_range(), Stroke::new(0.5, SlowColors::BLACK));
        }

        paint_cells(&grid_painter, self.session.chart(), &geometry, visible.clone());

        if let Some((row, lane)) = self.selected {
            if visible.contains(&row) {
                let cell = geometry.cell_rect(row, lane);
                grid_painter.rect_stroke(cell.shrink(0.5), 0.0, Stroke::new(2.0, SlowColors::BLACK));
                grid_painter.rect_stroke(cell.shrink(3.0), 0.0, Stroke::new(1.5, SlowColors::JUDGMENT));
            }
        }

        // Judgment line
        let line_y = grid.min.y + viewport.judgment_line_y(&layout);
        if grid.y_range().contains(line_y) {
            grid_painter.hline(grid.x_range(), line_y, Stroke::new(2.0, SlowColors::BLACK));
        }

        // Lane header
        let header = Rect::from_min_max(Pos2::new(grid.min.x, rect.min.y), Pos2::new(rect.max.x, grid.min.y));
        painter.rect_filled(header, 0.0, SlowColors::WHITE);
        for lane in 0..layout.lane_count() {
            let x0 = geometry.edges[lane];
            let x1 = geometry.edges[lane + 1];
            painter.text(
                Pos2::new((x0 + x1) / 2.0, header.center().y),
                Align2::CENTER_CENTER,
                lane_label(lane, layout.lane_count()),
                FontId::proportional(12.0),
                SlowColors::BLACK,
            );
            painter.vline(x0, header.y_range(), Stroke::new(1.0, SlowColors::BLACK));
        }
        painter.hline(rect.x_range(), header.max.y, Stroke::new(1.0, SlowColors::BLACK));

        // Row numbers
        let labels = Rect::from_min_max(Pos2::new(rect.min.x, grid.min.y), Pos2::new(grid.min.x, rect.max.y));
        let label_painter = painter.with_clip_rect(labels);
        for row in visible {
            if let Some(number) = layout.row_label(row as i64) {
                label_painter.text(
                    Pos2::new(labels.max.x - 4.0, geometry.row_top(row) + row_height / 2.0),
                    Align2::RIGHT_CENTER,
                    number.to_string(),
                    FontId::proportional(10.0),
                    SlowColors::BLACK,
                );
            }
        }
        painter.vline(grid.min.x, rect.y_range(), Stroke::new(1.0, SlowColors::BLACK));

        // Press selects and previews, release after a drag swaps.
        let (pressed, released, press_origin, latest) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.press_origin(),
                i.pointer.latest_pos(),
            )
        });
        if pressed && response.hovered() {
            if let Some(pos) = press_origin.and_then(|p| geometry.cell_at(p)) {
                self.selected = Some(pos);
                self.drag_from = None;
                if let Some(cell) = self.session.chart().cell_at(pos.0, pos.1).copied() {
                    self.drag_from = Some(pos);
                    self.tone.play_pitch(cell.pitch);
                    self.status = format!("[preview] {}", cell.label());
                }
            }
        }
        if let Some(from) = self.drag_from {
            if let Some(target) = latest.and_then(|p| geometry.cell_at(p)).filter(|&t| t != from) {
                grid_painter.rect_stroke(geometry.cell_rect(target.0, target.1).shrink(1.0), 0.0, Stroke::new(2.0, SlowColors::JUDGMENT));
            }
            if released {
                self.drag_from = None;
                if let Some(to) = latest.and_then(|p| geometry.cell_at(p)) {
                    if to != from {
                        self.swap(from, to);
                    }
                }
            }
        }

        painter.rect_stroke(rect, 0.0, Stroke::new(1.0, SlowColors::BLACK));
    }

    fn status_text(&self) -> String {
        let layout = self.session.layout();
        let (state, tick) = if self.session.is_playing() {
            ("playing", self.session.current_tick())
        } else {
            ("stopped", scroll::tick_in_view(&layout, &self.viewport))
        };
        format!(
            "{} | {} notes | tick {} | {:.0} BPM | {:.1}x | {}",
            state,
            self.session.chart().len(),
            tick,
            self.session.bpm(),
            self.session.speed(),
            self.status
        )
    }

    fn render_about(&mut self, ctx: &Context) {
        egui::Window::new("about slowRhythm")
            .collapsible(false)
            .resizable(false)
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.heading("slowRhythm");
                    ui.label(format!("version {}", env!("CARGO_PKG_VERSION")));
                    ui.add_space(8.0);
                    ui.label("MIDI to rhythm game chart editor");
                });
                ui.add_space(8.0);
                ui.separator();
                ui.label("F5 / space   play, stop");
                ui.label("1 / 2        slower, faster");
                ui.label("home         back to the start");
                ui.label("drag         move a note within its row");
                ui.label("⌘S           save chart");
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button("ok").clicked() {
                        self.show_about = false;
                    }
                });
            });
    }
}

impl eframe::App for SlowRhythmApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);

        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            menu_bar(ui, |ui| {
                ui.menu_button("file", |ui| {
                    if ui.button("reload      ⌘R").clicked() {
                        self.reload();
                        ui.close_menu();
                    }
                    if ui.button("save chart  ⌘S").clicked() {
                        self.export_chart();
                        ui.close_menu();
                    }
                });
                ui.menu_button("edit", |ui| {
                    let can_undo = self.session.editor().history().can_undo();
                    let can_redo = self.session.editor().history().can_redo();
                    if ui.add_enabled(can_undo, egui::Button::new("undo     ⌘Z")).clicked() {
                        self.undo();
                        ui.close_menu();
                    }
                    if ui.add_enabled(can_redo, egui::Button::new("redo     ⌘Y")).clicked() {
                        self.redo();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("copy     ⌘C").clicked() {
                        if let Some(text) = self.copy_selected() {
                            ui.ctx().output_mut(|o| o.copied_text = text);
                        }
                        ui.close_menu();
                    }
                    let can_paste = self.session.editor().clipboard().is_some();
                    if ui.add_enabled(can_paste, egui::Button::new("paste    ⌘V")).clicked() {
                        self.paste_at_selected();
                        ui.close_menu();
                    }
                    if ui.button("delete   ⌫").clicked() {
                        self.delete_selected();
                        ui.close_menu();
                    }
                });
                ui.menu_button("transport", |ui| {
                    let play_text = if self.session.is_playing() { "stop     F5" } else { "play     F5" };
                    if ui.button(play_text).clicked() {
                        self.toggle_playback();
                        ui.close_menu();
                    }
                    if ui.button("rewind   home").clicked() {
                        self.pending_seek = Some(0);
                        ui.close_menu();
                    }
                    ui.separator();
                    let step = self.session.settings().playback.speed_step;
                    if ui.button("slower   1").clicked() {
                        self.adjust_speed(-step);
                        ui.close_menu();
                    }
                    if ui.button("faster   2").clicked() {
                        self.adjust_speed(step);
                        ui.close_menu();
                    }
                });
                ui.menu_button("help", |ui| {
                    if ui.button("about").clicked() {
                        self.show_about = true;
                        ui.close_menu();
                    }
                });
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            status_bar(ui, &self.status_text());
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(SlowColors::WHITE))
            .show(ctx, |ui| self.render_chart(ui));

        if self.show_about {
            self.render_about(ctx);
        }

        self.repaint.set_continuous(self.session.is_playing());
        if self.pending_seek.is_some() || self.drag_from.is_some() {
            self.repaint.mark_needs_repaint();
        }
        self.repaint.end_frame(ctx);
    }
}
