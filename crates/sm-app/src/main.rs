//! Story map viewer entry point

use std::sync::Arc;

use anyhow::Result;
use eframe::egui::{self, Context};
use sm_core::{ActionOverrides, StepChange};
use sm_data::{MapLibrary, MountConfig};
use sm_render::{HeadlessBackend, MapBackend};
use sm_ui::{panel_ids, MapViewport, StoryControls, Theme};
use sm_views::StoryMount;
use tracing::{error, info, warn};

mod custom_actions;
mod demos;

use demos::{demo_catalog, Demo};

const TOKEN_VAR: &str = "MAPBOX_ACCESS_TOKEN";

/// Which story is on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    File,
    Demo(usize),
}

/// Main application state
struct StoryMapApp {
    /// Tokio runtime the map loads run on
    runtime: tokio::runtime::Runtime,

    demos: Vec<Demo>,
    selection: Selection,

    /// Configuration passed on the command line
    loaded: Option<(String, MountConfig)>,

    access_token: Option<String>,

    backend: Arc<HeadlessBackend>,
    mount: Option<Arc<StoryMount>>,

    controls: StoryControls,
    viewport: MapViewport,

    egui_ctx: Context,
}

impl StoryMapApp {
    fn new(
        cc: &eframe::CreationContext<'_>,
        runtime: tokio::runtime::Runtime,
        loaded: Option<(String, MountConfig)>,
        access_token: Option<String>,
    ) -> Self {
        let theme = Theme::default();
        sm_ui::apply_theme(&cc.egui_ctx, &theme);

        let mut app = Self {
            runtime,
            demos: demo_catalog(),
            selection: Selection::Demo(0),
            loaded,
            access_token,
            backend: Arc::new(HeadlessBackend::maplibre()),
            mount: None,
            controls: StoryControls::new(theme.palette),
            viewport: MapViewport::new(theme.palette),
            egui_ctx: cc.egui_ctx.clone(),
        };

        let initial = if app.loaded.is_some() {
            Selection::File
        } else {
            Selection::Demo(0)
        };
        app.select(initial);
        app
    }

    fn select(&mut self, selection: Selection) {
        self.selection = selection;
        match selection {
            Selection::File => {
                if let Some((path, config)) = &self.loaded {
                    info!("Showing story from {}", path);
                    let config = config.clone();
                    self.start(config, ActionOverrides::new());
                }
            }
            Selection::Demo(index) => {
                let Some(demo) = self.demos.get(index) else {
                    return;
                };
                info!("Showing demo '{}'", demo.name);
                let config = demo.mount_config(self.access_token.as_deref());
                match demo.overrides() {
                    Ok(overrides) => self.start(config, overrides),
                    Err(err) => error!("Demo '{}' has bad actions: {}", demo.name, err),
                }
            }
        }
    }

    /// Replace the mounted story
    fn start(&mut self, config: MountConfig, overrides: ActionOverrides) {
        if let Some(previous) = self.mount.take() {
            previous.unmount();
        }

        self.backend = Arc::new(HeadlessBackend::new(config.map.library));
        let backend: Arc<dyn MapBackend> = self.backend.clone();
        let mount = Arc::new(StoryMount::new(config, backend, overrides));

        let ctx = self.egui_ctx.clone();
        mount.set_repaint_hook(move || ctx.request_repaint());

        // Lives as long as the mount's engine
        let total = mount.engine().len();
        let _ = mount.on_step_change(move |change: &StepChange| {
            info!("Step {} of {}", change.index + 1, total);
        });

        let task = Arc::clone(&mount);
        self.runtime.spawn(async move {
            if let Err(err) = task.mount().await {
                warn!("Story did not mount: {}", err);
            }
        });
        self.mount = Some(mount);
    }

    fn picker_label(&self, selection: Selection) -> String {
        match selection {
            Selection::File => self
                .loaded
                .as_ref()
                .map(|(path, _)| path.clone())
                .unwrap_or_else(|| "story file".to_string()),
            Selection::Demo(index) => self
                .demos
                .get(index)
                .map(|demo| demo.name.to_string())
                .unwrap_or_default(),
        }
    }

    fn story_picker(&mut self, ui: &mut egui::Ui) {
        let mut choice = self.selection;
        let mut options = Vec::new();
        if self.loaded.is_some() {
            options.push(Selection::File);
        }
        options.extend((0..self.demos.len()).map(Selection::Demo));

        ui.horizontal(|ui| {
            ui.label("Story");
            egui::ComboBox::from_id_source(panel_ids::STORY_PICKER)
                .selected_text(self.picker_label(self.selection))
                .show_ui(ui, |ui| {
                    for option in &options {
                        ui.selectable_value(&mut choice, *option, self.picker_label(*option));
                    }
                });

            if let Selection::Demo(index) = self.selection {
                if let Some(demo) = self.demos.get(index) {
                    ui.weak(demo.summary);
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let library = self.backend.library();
                let hint = match library {
                    MapLibrary::Mapbox => library.name().to_string(),
                    MapLibrary::Maplibre => format!("{} (set {} for Mapbox)", library.name(), TOKEN_VAR),
                };
                ui.weak(hint);
            });
        });

        if choice != self.selection {
            self.select(choice);
        }
    }
}

impl eframe::App for StoryMapApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        // Map actions run on this thread and schedule their loads on the runtime
        let _guard = self.runtime.enter();

        if let Some(mount) = &self.mount {
            ctx.input(|i| {
                if i.key_pressed(egui::Key::ArrowRight) {
                    mount.next();
                }
                if i.key_pressed(egui::Key::ArrowLeft) {
                    mount.previous();
                }
            });
        }

        egui::TopBottomPanel::top(panel_ids::STORY_PICKER).show(ctx, |ui| {
            self.story_picker(ui);
        });

        let Some(mount) = self.mount.clone() else {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.centered_and_justified(|ui| ui.label("No story loaded"));
            });
            return;
        };

        egui::TopBottomPanel::bottom(panel_ids::CONTROLS)
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                self.controls.show(ui, &mount);
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let surface = mount.map().and_then(|_| self.backend.latest_surface());
                let snapshot = surface.as_ref().map(|s| s.snapshot());
                let engine = mount.engine();
                let response = self
                    .viewport
                    .ui(ui, snapshot.as_ref(), engine.story(), engine.current_index());

                if let Some(surface) = surface {
                    let size = response.rect.size();
                    surface.set_viewport_size(size.x as f64, size.y as f64);
                }
            });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(mount) = self.mount.take() {
            mount.unmount();
        }
    }
}

impl Drop for StoryMapApp {
    fn drop(&mut self) {
        if let Some(mount) = self.mount.take() {
            mount.unmount();
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("Starting story map viewer");

    let runtime = tokio::runtime::Runtime::new()?;

    let loaded = match std::env::args().nth(1) {
        Some(path) => match runtime.block_on(MountConfig::load(&path)) {
            Ok(config) => {
                info!("Loaded {} steps from {}", config.story.len(), path);
                Some((path, config))
            }
            Err(err) => {
                error!("Could not load {}: {}", path, err);
                None
            }
        },
        None => None,
    };

    let access_token = std::env::var(TOKEN_VAR).ok().filter(|token| !token.trim().is_empty());
    if access_token.is_none() {
        info!("{} is not set; demos use MapLibre", TOKEN_VAR);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([640.0, 480.0]),
        default_theme: eframe::Theme::Dark,
        persist_window: false,
        ..Default::default()
    };

    eframe::run_native(
        "Story Map",
        options,
        Box::new(move |cc| Box::new(StoryMapApp::new(cc, runtime, loaded, access_token))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run app: {}", e))?;

    Ok(())
}
