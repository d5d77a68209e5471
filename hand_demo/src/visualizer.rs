//! Software-rendered visualizer using `minifb`.
//!
//! Layout (resizable; the panel keeps its width, the viewport takes the rest):
//!
//! ```text
//! ┌──────────────────────────────────────────────┬──────────────────┐
//! │                                              │  SENSORS         │
//! │                                              │  CH1 ████▌   62  │
//! │            3D hand viewport                  │  …               │
//! │                                              │  PREDICTION      │
//! │                                              │  FIST   96.1%    │
//! │                                              │  [1 REST] …      │
//! ├──────────────────────────────────────────────┴──────────────────┤
//! │  status bar                                                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Drawing goes through [`Canvas`], which knows nothing about the window, so
//! the frame can be rendered and inspected in tests.

use std::sync::mpsc::Sender;

use emg_stream::{Gesture, CHANNELS, GESTURE_COUNT};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::config::WindowConfig;
use crate::frame_timing::FrameStats;
use crate::gesture::{GestureEvent, InputKey};
use crate::hand::HandModel;
use crate::inference::{DecisionLabel, DecisionPolicy};
use crate::kinematics::{build_scene, Camera, Shape};
use crate::state::TelemetrySnapshot;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

const PANEL_W:      usize = 320;
const STATUS_H:     usize = 28;
const PAD:          usize = 16;
const BUTTON_H:     usize = 34;
const BUTTON_GAP:   usize = 8;
const BAR_H:        usize = 14;

const BG_TOP:       u32 = 0xFFF8FAFC;
const BG_BOTTOM:    u32 = 0xFFE2E8F0;
const PANEL_BG:     u32 = 0xFFFFFFFF;
const PANEL_EDGE:   u32 = 0xFFCBD5E1;
const STATUS_BG:    u32 = 0xFF1A237E;
const TEXT:         u32 = 0xFF0F172A;
const TEXT_DIM:     u32 = 0xFF64748B;
const ACCENT:       u32 = 0xFF00BCD4;
const NAVY:         u32 = 0xFF1A237E;
const BAR_TRACK:    u32 = 0xFFE2E8F0;
const WARN:         u32 = 0xFFE11D48;

// ════════════════════════════════════════════════════════════════════════════
// Layout
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, w: usize, h: usize) -> Self { Rect { x, y, w, h } }

    pub fn is_empty(&self) -> bool { self.w == 0 || self.h == 0 }

    pub fn contains(&self, px: usize, py: usize) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }
}

/// Screen regions for a given surface size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub viewport:   Rect,
    pub panel:      Rect,
    pub sensors:    Rect,
    pub prediction: Rect,
    pub buttons:    [Rect; GESTURE_COUNT],
    pub status:     Rect,
}

impl Layout {
    pub fn new(width: usize, height: usize) -> Self {
        let status_h = STATUS_H.min(height);
        let body_h   = height - status_h;
        let panel_w  = PANEL_W.min(width / 2);
        let view_w   = width - panel_w;

        let panel   = Rect::new(view_w, 0, panel_w, body_h);
        let inner_w = panel_w.saturating_sub(2 * PAD);
        let inner_x = view_w + PAD;

        let sensors    = Rect::new(inner_x, PAD, inner_w, 24 + CHANNELS * (BAR_H + 12));
        let pred_y     = sensors.y + sensors.h + PAD;
        let prediction = Rect::new(inner_x, pred_y, inner_w, 150);

        let first_button = prediction.y + prediction.h + PAD;
        let buttons = std::array::from_fn(|i| {
            Rect::new(inner_x, first_button + i * (BUTTON_H + BUTTON_GAP), inner_w, BUTTON_H)
        });

        Layout {
            viewport: Rect::new(0, 0, view_w, body_h),
            panel,
            sensors,
            prediction,
            buttons,
            status: Rect::new(0, body_h, width, status_h),
        }
    }

    /// Gesture button under a click, if any.  Buttons pushed below the
    /// panel by a short window are not clickable.
    pub fn button_at(&self, x: usize, y: usize) -> Option<Gesture> {
        self.buttons
            .iter()
            .position(|r| r.y + r.h <= self.panel.h && r.contains(x, y))
            .and_then(Gesture::from_index)
    }
}

/// Keyboard → gesture input.
pub fn map_key(key: Key) -> Option<InputKey> {
    let k = match key {
        Key::Key1 | Key::NumPad1 => InputKey::Digit(1),
        Key::Key2 | Key::NumPad2 => InputKey::Digit(2),
        Key::Key3 | Key::NumPad3 => InputKey::Digit(3),
        Key::Key4 | Key::NumPad4 => InputKey::Digit(4),
        Key::Key5 | Key::NumPad5 => InputKey::Digit(5),
        Key::R => InputKey::R,
        Key::F => InputKey::F,
        Key::O => InputKey::O,
        Key::P => InputKey::P,
        Key::I => InputKey::I,
        Key::Q | Key::Escape => InputKey::Quit,
        _ => return None,
    };
    Some(k)
}

// ════════════════════════════════════════════════════════════════════════════
// Canvas
// ════════════════════════════════════════════════════════════════════════════

/// ARGB framebuffer with the drawing primitives the demo needs.
#[derive(Debug, Default)]
pub struct Canvas {
    buf:    Vec<u32>,
    width:  usize,
    height: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Canvas { buf: vec![BG_TOP; width * height], width, height }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if (width, height) != (self.width, self.height) {
            self.width  = width;
            self.height = height;
            self.buf.clear();
            self.buf.resize(width * height, BG_TOP);
        }
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn pixels(&self) -> &[u32] { &self.buf }
    pub fn is_empty(&self) -> bool { self.width == 0 || self.height == 0 }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.buf[y * self.width + x])
    }

    fn set_pixel(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.buf[y as usize * self.width + x as usize] = color;
        }
    }

    fn fill_rect(&mut self, r: Rect, color: u32) {
        for row in r.y..(r.y + r.h).min(self.height) {
            for col in r.x..(r.x + r.w).min(self.width) {
                self.buf[row * self.width + col] = color;
            }
        }
    }

    fn draw_border(&mut self, r: Rect, color: u32) {
        if r.is_empty() { return; }
        let (x0, y0) = (r.x as isize, r.y as isize);
        let (x1, y1) = ((r.x + r.w - 1) as isize, (r.y + r.h - 1) as isize);
        for x in x0..=x1 {
            self.set_pixel(x, y0, color);
            self.set_pixel(x, y1, color);
        }
        for y in y0..=y1 {
            self.set_pixel(x0, y, color);
            self.set_pixel(x1, y, color);
        }
    }

    fn vertical_gradient(&mut self, r: Rect, top: u32, bottom: u32) {
        let span = r.h.saturating_sub(1).max(1) as f32;
        for row in r.y..(r.y + r.h).min(self.height) {
            let c = blend(top, bottom, (row - r.y) as f32 / span);
            for col in r.x..(r.x + r.w).min(self.width) {
                self.buf[row * self.width + col] = c;
            }
        }
    }

    fn fill_disc(&mut self, cx: f32, cy: f32, r: f32, color: u32) {
        let (x0, x1) = ((cx - r).floor() as isize, (cx + r).ceil() as isize);
        let (y0, y1) = ((cy - r).floor() as isize, (cy + r).ceil() as isize);
        let r2 = r * r;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let (dx, dy) = (x as f32 + 0.5 - cx, y as f32 + 0.5 - cy);
                if dx * dx + dy * dy <= r2 {
                    self.set_pixel(x, y, color);
                }
            }
        }
    }

    /// Tapered capsule between two screen points.
    fn fill_capsule(&mut self, a: (f32, f32), b: (f32, f32), ra: f32, rb: f32, color: u32) {
        let rmax = ra.max(rb);
        let x0 = (a.0.min(b.0) - rmax).floor() as isize;
        let x1 = (a.0.max(b.0) + rmax).ceil() as isize;
        let y0 = (a.1.min(b.1) - rmax).floor() as isize;
        let y1 = (a.1.max(b.1) + rmax).ceil() as isize;
        let (abx, aby) = (b.0 - a.0, b.1 - a.1);
        let len2 = abx * abx + aby * aby;

        for y in y0..=y1 {
            for x in x0..=x1 {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                let t = if len2 > 1e-6 {
                    (((px - a.0) * abx + (py - a.1) * aby) / len2).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let (qx, qy) = (a.0 + abx * t - px, a.1 + aby * t - py);
                let r = ra + (rb - ra) * t;
                if qx * qx + qy * qy <= r * r {
                    self.set_pixel(x, y, color);
                }
            }
        }
    }

    /// Scanline fill, even-odd rule.
    fn fill_polygon(&mut self, pts: &[(f32, f32)], color: u32) {
        if pts.len() < 3 { return; }
        let ymin = pts.iter().map(|p| p.1).fold(f32::INFINITY, f32::min).floor().max(0.0) as usize;
        let ymax = pts.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max).ceil();
        let ymax = (ymax.max(0.0) as usize).min(self.height);

        let mut xs: Vec<f32> = Vec::with_capacity(8);
        for y in ymin..ymax {
            let yc = y as f32 + 0.5;
            xs.clear();
            for (i, p0) in pts.iter().enumerate() {
                let p1 = pts[(i + 1) % pts.len()];
                if (p0.1 <= yc && yc < p1.1) || (p1.1 <= yc && yc < p0.1) {
                    xs.push(p0.0 + (yc - p0.1) * (p1.0 - p0.0) / (p1.1 - p0.1));
                }
            }
            xs.sort_by(f32::total_cmp);
            for pair in xs.chunks_exact(2) {
                let from = (pair[0] - 0.5).ceil().max(0.0) as isize;
                let to   = (pair[1] - 0.5).floor() as isize;
                for x in from..=to {
                    self.set_pixel(x, y as isize, color);
                }
            }
        }
    }

    /// Minimal bitmap font: 3×5 glyphs, each pixel `scale`×`scale`.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) {
        let s = scale.max(1);
        let mut cx = x;
        for ch in text.chars() {
            if cx + 3 * s > self.width { break; }
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(Rect::new(cx + col * s, y + row * s, s, s), color);
                    }
                }
            }
            cx += 4 * s; // 3 wide + 1 gap
        }
    }
}

pub fn text_width(text: &str, scale: usize) -> usize {
    (text.chars().count() * 4 * scale.max(1)).saturating_sub(scale.max(1))
}

// ════════════════════════════════════════════════════════════════════════════
// Frame
// ════════════════════════════════════════════════════════════════════════════

/// Everything one frame shows.  Read-only; drawing never feeds back.
pub struct FrameView<'a> {
    pub hand:      &'a HandModel,
    pub telemetry: TelemetrySnapshot,
    pub timing:    FrameStats,
    pub policy:    DecisionPolicy,
}

/// Render one frame into `canvas`.  A zero-sized canvas is left untouched.
pub fn draw_frame(canvas: &mut Canvas, camera: &mut Camera, view: &FrameView<'_>) {
    if canvas.is_empty() {
        return;
    }
    let layout = Layout::new(canvas.width(), canvas.height());

    // ── Viewport ──────────────────────────────────────────────────────────
    canvas.vertical_gradient(layout.viewport, BG_TOP, BG_BOTTOM);
    if !layout.viewport.is_empty() {
        camera.resize(layout.viewport.w, layout.viewport.h);
        draw_hand(canvas, camera, view.hand);
    }

    // ── Panel ─────────────────────────────────────────────────────────────
    canvas.fill_rect(layout.panel, PANEL_BG);
    canvas.draw_border(layout.panel, PANEL_EDGE);
    draw_sensors(canvas, layout.sensors, &view.telemetry);
    draw_prediction(canvas, layout.prediction, &view.telemetry, view.policy);
    draw_buttons(canvas, &layout, view.telemetry.gesture);

    // ── Status bar ────────────────────────────────────────────────────────
    draw_status(canvas, layout.status, view);
}

fn draw_hand(canvas: &mut Canvas, camera: &Camera, hand: &HandModel) {
    for item in camera.project_scene(&build_scene(hand)) {
        match item.shape {
            Shape::Disc { x, y, r }           => canvas.fill_disc(x, y, r, item.color),
            Shape::Capsule { a, b, ra, rb }   => canvas.fill_capsule(a, b, ra, rb, item.color),
            Shape::Polygon(ref pts)           => canvas.fill_polygon(pts, item.color),
        }
    }
}

fn draw_sensors(canvas: &mut Canvas, r: Rect, t: &TelemetrySnapshot) {
    canvas.draw_label("SENSORS", r.x, r.y, 2, TEXT_DIM);
    let value_w = text_width("100", 2) + 8;
    let label_w = text_width("CH1", 2) + 10;
    let track_w = r.w.saturating_sub(label_w + value_w);

    for (ch, &energy) in t.energy.0.iter().enumerate() {
        let y = r.y + 24 + ch * (BAR_H + 12);
        let e = if energy.is_finite() { energy.clamp(0.0, 100.0) } else { 0.0 };
        canvas.draw_label(&format!("CH{}", ch + 1), r.x, y + 2, 2, TEXT);

        let track = Rect::new(r.x + label_w, y, track_w, BAR_H);
        canvas.fill_rect(track, BAR_TRACK);
        let fill = (track_w as f32 * e / 100.0).round() as usize;
        canvas.fill_rect(Rect::new(track.x, y, fill, BAR_H), blend(ACCENT, NAVY, e / 100.0));

        canvas.draw_label(&format!("{:.0}", e), track.x + track_w + 8, y + 2, 2, TEXT);
    }
}

fn draw_prediction(canvas: &mut Canvas, r: Rect, t: &TelemetrySnapshot, policy: DecisionPolicy) {
    canvas.draw_label("PREDICTION", r.x, r.y, 2, TEXT_DIM);
    let d = t.decision;

    let (headline, color) = match d.label {
        DecisionLabel::Error   => ("ERROR".to_string(), WARN),
        DecisionLabel::Gesture(g) => (g.label().to_string(), NAVY),
        other => (other.to_string(), TEXT_DIM),
    };
    let scale = if text_width(&headline, 5) <= r.w { 5 } else { 3 };
    canvas.draw_label(&headline, r.x, r.y + 22, scale, color);

    let y = r.y + 60;
    canvas.draw_label(&format!("CONFIDENCE {:.1}%", d.confidence * 100.0), r.x, y, 2, TEXT);
    let track = Rect::new(r.x, y + 16, r.w, 8);
    canvas.fill_rect(track, BAR_TRACK);
    let fill = (r.w as f32 * d.confidence.clamp(0.0, 1.0)).round() as usize;
    canvas.fill_rect(Rect::new(r.x, y + 16, fill, 8), ACCENT);

    canvas.draw_label(&format!("LATENCY {:.2} MS", d.latency_ms), r.x, y + 34, 2, TEXT);

    let mode = match policy {
        DecisionPolicy::DemoGuaranteed => "MODE DEMO",
        DecisionPolicy::RawModel       => "MODE RAW",
    };
    let raw = d.model_label.map(|g| g.label()).unwrap_or("-");
    canvas.draw_label(&format!("{}  MODEL {}", mode, raw), r.x, y + 56, 2, TEXT_DIM);
}

fn draw_buttons(canvas: &mut Canvas, layout: &Layout, selected: Gesture) {
    for (g, r) in Gesture::ALL.iter().zip(layout.buttons.iter()) {
        if r.y + r.h > layout.panel.h { break; }
        let active = *g == selected;
        canvas.fill_rect(*r, if active { NAVY } else { PANEL_BG });
        canvas.draw_border(*r, if active { NAVY } else { PANEL_EDGE });

        let text = format!("{} {}", g.index() + 1, g.label());
        let ty = r.y + (r.h.saturating_sub(10)) / 2;
        canvas.draw_label(&text, r.x + 12, ty, 2, if active { 0xFFFFFFFF } else { TEXT });
    }
}

fn draw_status(canvas: &mut Canvas, r: Rect, view: &FrameView<'_>) {
    if r.is_empty() { return; }
    canvas.fill_rect(r, STATUS_BG);
    let f = &view.timing;
    let text = format!(
        "FPS {:.0}  TICK {:.1} MS  MISSED {}  CYCLES {}   |   1-5 / R F O P I = GESTURE   Q / ESC = QUIT",
        f.fps, f.work_p50_ms, f.missed, view.telemetry.cycles,
    );
    canvas.draw_label(&text, r.x + 10, r.y + (r.h.saturating_sub(10)) / 2, 2, 0xFFEEEEEE);
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer (window)
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:     Window,
    canvas:     Canvas,
    camera:     Camera,
    event_tx:   Sender<GestureEvent>,
    mouse_down: bool,
}

impl Visualizer {
    pub fn new(cfg: &WindowConfig, frame_limit: std::time::Duration, event_tx: Sender<GestureEvent>) -> Result<Self, String> {
        let mut window = Window::new(
            "EMG Gesture Demo — Real-Time Hand",
            cfg.width.max(1), cfg.height.max(1),
            WindowOptions {
                resize: cfg.resizable,
                ..WindowOptions::default()
            },
        ).map_err(|e| e.to_string())?;

        window.limit_update_rate(Some(frame_limit));

        Ok(Visualizer {
            window,
            canvas: Canvas::new(cfg.width, cfg.height),
            camera: Camera::new(cfg.width, cfg.height),
            event_tx,
            mouse_down: false,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Translate key presses and button clicks into [`GestureEvent`]s.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        for key in self.window.get_keys_pressed(KeyRepeat::No) {
            if let Some(ev) = map_key(key).and_then(GestureEvent::from_key) {
                let _ = self.event_tx.send(ev);
                if ev == GestureEvent::Quit { return false; }
            }
        }

        // Click = press edge of the left button.
        let down = self.window.get_mouse_down(MouseButton::Left);
        if down && !self.mouse_down {
            if let Some((mx, my)) = self.window.get_mouse_pos(MouseMode::Discard) {
                let (w, h) = self.window.get_size();
                if let Some(g) = Layout::new(w, h).button_at(mx as usize, my as usize) {
                    let _ = self.event_tx.send(GestureEvent::Select(g));
                }
            }
        }
        self.mouse_down = down;
        true
    }

    /// Render one frame at the window's current size.
    pub fn render(&mut self, view: &FrameView<'_>) {
        let (w, h) = self.window.get_size();
        if w == 0 || h == 0 {
            // Minimised: keep pumping events, draw nothing.
            self.window.update();
            return;
        }
        self.canvas.resize(w, h);
        draw_frame(&mut self.canvas, &mut self.camera, view);
        self.window.update_with_buffer(self.canvas.pixels(), w, h).ok();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        '|' => [0b010, 0b010, 0b010, 0b010, 0b010],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0-t) + cb as f32 * t).round() as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar,br) << 16) | (lerp(ag,bg) << 8) | lerp(ab,bb)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::Decision;
    use emg_stream::ChannelEnergy;

    fn telemetry(gesture: Gesture) -> TelemetrySnapshot {
        TelemetrySnapshot {
            gesture,
            decision: Decision {
                label:       DecisionLabel::Gesture(gesture),
                confidence:  0.95,
                latency_ms:  0.4,
                model_label: Some(gesture),
            },
            energy: ChannelEnergy([20.0, 40.0, 60.0, 80.0]),
            cycles: 3,
        }
    }

    #[test]
    fn layout_regions_tile_the_surface() {
        let l = Layout::new(1100, 640);
        assert_eq!(l.viewport, Rect::new(0, 0, 780, 612));
        assert_eq!(l.panel.x, 780);
        assert_eq!(l.status, Rect::new(0, 612, 1100, 28));
        for w in l.buttons.windows(2) {
            assert!(w[0].y + w[0].h <= w[1].y);
        }
        assert!(l.buttons[4].y + l.buttons[4].h <= l.panel.h);
    }

    #[test]
    fn clicks_hit_buttons() {
        let l = Layout::new(1100, 640);
        for (i, r) in l.buttons.iter().enumerate() {
            assert_eq!(l.button_at(r.x + 5, r.y + 5), Gesture::from_index(i));
        }
        assert_eq!(l.button_at(10, 10), None);
    }

    #[test]
    fn tiny_surface_has_no_clickable_buttons() {
        let l = Layout::new(200, 100);
        let r = l.buttons[0];
        assert_eq!(l.button_at(r.x + 1, r.y + 1), None);
        let z = Layout::new(0, 0);
        assert!(z.viewport.is_empty() && z.panel.is_empty());
    }

    #[test]
    fn keys_map_to_inputs() {
        assert_eq!(map_key(Key::Key3), Some(InputKey::Digit(3)));
        assert_eq!(map_key(Key::NumPad5), Some(InputKey::Digit(5)));
        assert_eq!(map_key(Key::Escape), Some(InputKey::Quit));
        assert_eq!(map_key(Key::Z), None);
    }

    #[test]
    fn hand_is_drawn_over_gradient() {
        let hand = HandModel::new(Gesture::Open);
        let view = FrameView {
            hand:      &hand,
            telemetry: telemetry(Gesture::Open),
            timing:    FrameStats::default(),
            policy:    DecisionPolicy::DemoGuaranteed,
        };
        let mut canvas = Canvas::new(1100, 640);
        let mut camera = Camera::new(1, 1);
        draw_frame(&mut canvas, &mut camera, &view);

        let l = Layout::new(1100, 640);
        let (cx, cy) = (l.viewport.w / 2, l.viewport.h / 2);
        let bg = blend(BG_TOP, BG_BOTTOM, cy as f32 / (l.viewport.h - 1) as f32);
        assert_ne!(canvas.pixel(cx, cy), Some(bg));
        // Corner of the viewport is background.
        assert_eq!(canvas.pixel(0, 0), Some(BG_TOP));
        assert_eq!(camera.size(), (l.viewport.w, l.viewport.h));
    }

    #[test]
    fn selected_button_is_highlighted() {
        let hand = HandModel::default();
        let view = FrameView {
            hand:      &hand,
            telemetry: telemetry(Gesture::Pinch),
            timing:    FrameStats::default(),
            policy:    DecisionPolicy::RawModel,
        };
        let mut canvas = Canvas::new(1100, 640);
        draw_frame(&mut canvas, &mut Camera::new(1, 1), &view);

        let l = Layout::new(1100, 640);
        let pinch = l.buttons[Gesture::Pinch.index()];
        let rest  = l.buttons[Gesture::Rest.index()];
        assert_eq!(canvas.pixel(pinch.x + 2, pinch.y + 2), Some(NAVY));
        assert_eq!(canvas.pixel(rest.x + 2, rest.y + 2), Some(PANEL_BG));
    }

    #[test]
    fn zero_sized_canvas_is_skipped() {
        let hand = HandModel::default();
        let view = FrameView {
            hand:      &hand,
            telemetry: telemetry(Gesture::Rest),
            timing:    FrameStats::default(),
            policy:    DecisionPolicy::DemoGuaranteed,
        };
        let mut canvas = Canvas::new(0, 0);
        let mut camera = Camera::new(640, 480);
        draw_frame(&mut canvas, &mut camera, &view);
        assert!(canvas.pixels().is_empty());
        assert_eq!(camera.size(), (640, 480));
    }

    #[test]
    fn polygon_fill_covers_square() {
        let mut c = Canvas::new(20, 20);
        c.fill_polygon(&[(2.0, 2.0), (12.0, 2.0), (12.0, 12.0), (2.0, 12.0)], 0xFF000000);
        let n = c.pixels().iter().filter(|&&p| p == 0xFF000000).count();
        assert_eq!(n, 100);
    }

    #[test]
    fn shapes_clip_at_edges() {
        let mut c = Canvas::new(10, 10);
        c.fill_disc(-5.0, -5.0, 8.0, 0xFF111111);
        c.fill_capsule((-20.0, 5.0), (30.0, 5.0), 2.0, 1.0, 0xFF222222);
        c.draw_border(Rect::new(8, 8, 0, 5), 0xFF333333);
        c.draw_border(Rect::new(5, 5, 20, 20), 0xFF333333);
        assert_eq!(c.pixel(0, 0), Some(0xFF111111));
        assert_eq!(c.pixel(9, 5), Some(0xFF222222));
        assert_eq!(c.pixel(5, 9), Some(0xFF333333));
    }

    #[test]
    fn text_width_matches_font_advance() {
        assert_eq!(text_width("FIST", 1), 15);
        assert_eq!(text_width("", 2), 0);
        assert_eq!(char_glyph('%'), [0b101, 0b001, 0b010, 0b100, 0b101]);
    }
}
