use crate::experiments::ExperimentCatalog;
use crate::session::{LaunchSession, LaunchUi};
use eframe::egui;
use std::time::{Duration, Instant};

pub const APP_TITLE: &str = "MMT Virtual Lab – GNU Radio";
const BRAND: &str = "MMT Virtual Lab";
const SUBTITLE: &str = "Signal Processing Experiments (AM, FM, FSK, QPSK, 16-QAM)";
const HINT: &str =
    "Tip: After GRC opens, press ▶ to run. Use QT GUI sinks for Time/Freq/Constellation.";

const PRIMARY: egui::Color32 = egui::Color32::from_rgb(0x0A, 0x66, 0xC2);
const MUTED: egui::Color32 = egui::Color32::from_rgb(0x6B, 0x72, 0x80);
const ACCENT_BG: egui::Color32 = egui::Color32::from_rgb(0xF3, 0xF6, 0xFB);

const BUSY_REPAINT: Duration = Duration::from_millis(100);

/// What the launch machinery asked the window to display.
#[derive(Debug, Default)]
pub struct UiState {
    status: Option<(String, Instant)>,
    busy: Option<String>,
    error: Option<(String, String)>,
}

impl UiState {
    /// Status bar text, if it has not expired at `now`.
    pub fn status_text(&self, now: Instant) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|(_, until)| now < *until)
            .map(|(msg, _)| msg.as_str())
    }

    pub fn busy_label(&self) -> Option<&str> {
        self.busy.as_deref()
    }

    /// Title and message of the error dialog waiting to be acknowledged.
    pub fn pending_error(&self) -> Option<(&str, &str)> {
        self.error
            .as_ref()
            .map(|(title, msg)| (title.as_str(), msg.as_str()))
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// A modal is up; the main panel must not take clicks.
    pub fn blocks_input(&self) -> bool {
        self.busy.is_some() || self.error.is_some()
    }

    fn status_expiry(&self) -> Option<Instant> {
        self.status.as_ref().map(|(_, until)| *until)
    }
}

impl LaunchUi for UiState {
    fn show_indicator(&mut self, label: &str) {
        self.busy = Some(label.to_string());
    }

    fn hide_indicator(&mut self) {
        self.busy = None;
    }

    fn status(&mut self, message: &str, duration: Duration) {
        self.status = Some((message.to_string(), Instant::now() + duration));
    }

    fn error(&mut self, title: &str, message: &str) {
        self.error = Some((title.to_string(), message.to_string()));
    }
}

pub struct LauncherApp {
    session: LaunchSession,
    catalog: ExperimentCatalog,
    selected: usize,
    state: UiState,
    closing: bool,
}

impl LauncherApp {
    pub fn new(session: LaunchSession, catalog: ExperimentCatalog) -> Self {
        Self {
            session,
            catalog,
            selected: 0,
            state: UiState::default(),
            closing: false,
        }
    }

    fn open_selected(&mut self) {
        let Some(entry) = self.catalog.entries().get(self.selected) else {
            return;
        };
        let file = entry.file.clone();
        self.session.open_experiment(&file, &mut self.state);
    }

    fn header(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header")
            .frame(
                egui::Frame::none()
                    .fill(PRIMARY)
                    .inner_margin(egui::Margin::symmetric(16.0, 12.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(BRAND)
                            .color(egui::Color32::WHITE)
                            .size(18.0)
                            .strong(),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(
                            egui::RichText::new(SUBTITLE)
                                .color(egui::Color32::WHITE)
                                .size(12.0),
                        );
                    });
                });
            });
    }

    fn status_bar(&self, ctx: &egui::Context, now: Instant) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(msg) = self.state.status_text(now) {
                    ui.label(msg);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(egui::RichText::new("© MakeMyTechnology").color(MUTED));
                });
            });
        });
    }

    fn busy_overlay(&self, ctx: &egui::Context) {
        let Some(label) = self.state.busy_label() else {
            return;
        };
        input_blocker(ctx, "busy_backdrop");
        egui::Window::new("busy")
            .title_bar(false)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(label);
                });
            });
        ctx.set_cursor_icon(egui::CursorIcon::Wait);
    }

    fn error_dialog(&mut self, ctx: &egui::Context) {
        let Some((title, message)) = self
            .state
            .pending_error()
            .map(|(t, m)| (t.to_string(), m.to_string()))
        else {
            return;
        };
        input_blocker(ctx, "error_backdrop");
        let mut dismissed = false;
        egui::Window::new(title)
            .id(egui::Id::new("launch_error"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(&message);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.state.dismiss_error();
        }
    }
}

impl eframe::App for LauncherApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        if !self.closing && ctx.input(|i| i.viewport().close_requested()) {
            self.closing = true;
            self.session.close(&mut self.state);
        }
        self.session.pump(now, &mut self.state);

        self.header(ctx);
        self.status_bar(ctx, now);

        let mut open_selected = false;
        let mut open_blank = false;
        let enabled = !self.state.blocks_input();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.set_enabled(enabled);
            egui::Frame::none()
                .fill(ACCENT_BG)
                .rounding(12.0)
                .inner_margin(egui::Margin::same(16.0))
                .show(ui, |ui| {
                    ui.label(egui::RichText::new("SELECT EXPERIMENT").size(12.0).color(MUTED));
                    let entries = self.catalog.entries();
                    let current = entries
                        .get(self.selected)
                        .map(|e| e.label.as_str())
                        .unwrap_or_default();
                    egui::ComboBox::from_id_source("experiment")
                        .width(ui.available_width())
                        .selected_text(current)
                        .show_ui(ui, |ui| {
                            for (i, entry) in entries.iter().enumerate() {
                                ui.selectable_value(&mut self.selected, i, entry.label.as_str());
                            }
                        });
                    ui.add_space(8.0);
                    let size = [ui.available_width(), 36.0];
                    open_selected = ui.add_sized(size, primary_button("Open GNU Radio")).clicked();
                    open_blank = ui
                        .add_sized(size, primary_button("Open GNU Radio (blank)"))
                        .clicked();
                    ui.add_space(8.0);
                    ui.label(egui::RichText::new(HINT).color(MUTED));
                });
        });

        if enabled && open_selected {
            self.open_selected();
        } else if enabled && open_blank {
            self.session.open_blank(&mut self.state);
        }

        self.busy_overlay(ctx);
        self.error_dialog(ctx);

        if self.session.busy() {
            let wake = self
                .session
                .deadline()
                .map(|d| d.saturating_duration_since(now).min(BUSY_REPAINT))
                .unwrap_or(BUSY_REPAINT);
            ctx.request_repaint_after(wake);
        } else if let Some(until) = self.state.status_expiry() {
            if until > now {
                ctx.request_repaint_after(until - now);
            }
        }
    }
}

/// Dim the window and swallow clicks below the modal windows.
fn input_blocker(ctx: &egui::Context, id: &str) {
    let screen = ctx.screen_rect();
    egui::Area::new(egui::Id::new(id))
        .fixed_pos(screen.min)
        .order(egui::Order::PanelResizeLine)
        .show(ctx, |ui| {
            ui.painter()
                .rect_filled(screen, 0.0, egui::Color32::from_black_alpha(96));
            ui.allocate_rect(screen, egui::Sense::click_and_drag());
        });
}

fn primary_button(text: &str) -> egui::Button<'static> {
    egui::Button::new(
        egui::RichText::new(text.to_string())
            .color(egui::Color32::WHITE)
            .strong(),
    )
    .fill(PRIMARY)
    .rounding(10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_expires() {
        let mut state = UiState::default();
        state.status("Started pythonw.exe", Duration::from_secs(8));
        let now = Instant::now();
        assert_eq!(state.status_text(now), Some("Started pythonw.exe"));
        assert_eq!(state.status_text(now + Duration::from_secs(9)), None);
    }

    #[test]
    fn indicator_and_error_round_trip() {
        let mut state = UiState::default();
        state.show_indicator("Locating GNU Radio…");
        assert_eq!(state.busy_label(), Some("Locating GNU Radio…"));
        state.hide_indicator();
        assert_eq!(state.busy_label(), None);

        state.error("App not found", "GNU Radio Companion was not found on this system.");
        assert_eq!(state.pending_error().map(|(t, _)| t), Some("App not found"));
        assert!(state.blocks_input());
        state.dismiss_error();
        assert!(state.pending_error().is_none());
        assert!(!state.blocks_input());
    }

    #[test]
    fn busy_indicator_blocks_input() {
        let mut state = UiState::default();
        assert!(!state.blocks_input());
        state.show_indicator("Opening GNU Radio…");
        assert!(state.blocks_input());
    }
}
