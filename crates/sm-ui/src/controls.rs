//! Story controls: step text, Previous, one dot per step, Next

use egui::{Button, Color32, Margin, Response, RichText, Sense, Stroke, Ui, Vec2};
use sm_views::{step_label, StoryMount, StoryViewModel};
use tracing::debug;

use crate::theme::{error_color, Palette};

/// What the user asked for this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryCommand {
    Previous,
    Next,
    GoTo(usize),
}

impl StoryCommand {
    pub fn apply(self, mount: &StoryMount) {
        match self {
            StoryCommand::Previous => mount.previous(),
            StoryCommand::Next => mount.next(),
            StoryCommand::GoTo(index) => mount.go_to(index),
        }
    }
}

/// Story controls configuration
#[derive(Debug, Clone)]
pub struct StoryControlsConfig {
    /// Diameter of a step dot
    pub dot_size: f32,

    /// Space reserved for title and description
    pub min_text_height: f32,
}

impl Default for StoryControlsConfig {
    fn default() -> Self {
        Self {
            dot_size: 12.0,
            min_text_height: 64.0,
        }
    }
}

/// Controls widget for one mounted story
pub struct StoryControls {
    palette: Palette,
    config: StoryControlsConfig,
}

impl StoryControls {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            config: StoryControlsConfig::default(),
        }
    }

    pub fn with_config(mut self, config: StoryControlsConfig) -> Self {
        self.config = config;
        self
    }

    /// Draw the controls and apply whatever the user clicked
    pub fn show(&self, ui: &mut Ui, mount: &StoryMount) {
        if let Some(command) = self.ui(ui, &mount.view_model()) {
            debug!("Story command {:?}", command);
            command.apply(mount);
        }
    }

    /// Draw the controls for `model`
    ///
    /// Controls are drawn even when the map failed to load; navigation is
    /// then a no-op downstream.
    pub fn ui(&self, ui: &mut Ui, model: &StoryViewModel) -> Option<StoryCommand> {
        let mut command = None;

        egui::Frame::none()
            .fill(self.palette.surface)
            .inner_margin(Margin::symmetric(24.0, 16.0))
            .show(ui, |ui| {
                if let Some(error) = &model.failed {
                    ui.colored_label(error_color(), format!("Map unavailable: {}", error));
                }

                ui.vertical(|ui| {
                    ui.set_min_height(self.config.min_text_height);
                    if let Some(title) = &model.title {
                        ui.label(RichText::new(title).heading().strong().color(self.palette.text));
                    }
                    if let Some(description) = &model.description {
                        ui.label(RichText::new(description).color(self.palette.text.gamma_multiply(0.9)));
                    }
                });

                ui.horizontal(|ui| {
                    if self.nav_button(ui, "Previous", model.can_previous).clicked() {
                        command = Some(StoryCommand::Previous);
                    }

                    ui.add_space(8.0);
                    for index in 0..model.total {
                        let label = step_label(index);
                        let response = self.dot(ui, model.is_current(index));
                        response.widget_info(|| {
                            egui::WidgetInfo::labeled(egui::WidgetType::Button, label.clone())
                        });
                        if response.on_hover_text(label.as_str()).clicked() {
                            command = Some(StoryCommand::GoTo(index));
                        }
                    }
                    ui.add_space(8.0);

                    if self.nav_button(ui, "Next", model.can_next).clicked() {
                        command = Some(StoryCommand::Next);
                    }
                });
            });

        command
    }

    fn nav_button(&self, ui: &mut Ui, text: &str, enabled: bool) -> Response {
        ui.add_enabled(
            enabled,
            Button::new(RichText::new(text).color(Color32::WHITE)).fill(self.palette.primary),
        )
    }

    fn dot(&self, ui: &mut Ui, active: bool) -> Response {
        let (rect, response) = ui.allocate_exact_size(Vec2::splat(self.config.dot_size), Sense::click());
        let scale = if response.hovered() { 1.2 } else { 1.0 };
        let radius = (rect.width() / 2.0 - 1.0) * scale;
        let painter = ui.painter();

        if active {
            painter.circle(rect.center(), radius, self.palette.primary, Stroke::new(2.0, self.palette.primary));
        } else {
            painter.circle_stroke(rect.center(), radius, Stroke::new(2.0, self.palette.text));
        }
        response
    }
}

impl Default for StoryControls {
    fn default() -> Self {
        Self::new(Palette::default())
    }
}
