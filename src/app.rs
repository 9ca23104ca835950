use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use eframe::egui::{self, Context as EguiContext, Key, TopBottomPanel, ViewportCommand};
use eframe::{App, Frame};
use image::DynamicImage;

use crate::canvas;
use crate::config::EditorConfig;
use crate::flatten;
use crate::state::EditorState;
use crate::toolbar;

/// Receives the flattened output raster on save. Supplied by the caller;
/// the editor itself never touches disk or network.
pub type SaveCallback = Box<dyn FnMut(&DynamicImage) -> Result<()>>;

enum View {
    /// Image decoded, scene not built yet: the surface size comes from the
    /// first laid-out frame.
    Loading { image: Arc<DynamicImage> },
    Ready(EditorState),
    /// Decode failed; a persistent error screen replaces the surface.
    Failed(String),
}

pub struct EditorApp {
    view: View,
    on_save: SaveCallback,
}

impl EditorApp {
    pub fn new(image_path: &Path, on_save: SaveCallback) -> Self {
        let view = match image::open(image_path) {
            Ok(image) => {
                log::info!(
                    "loaded {} ({}x{})",
                    image_path.display(),
                    image.width(),
                    image.height()
                );
                View::Loading {
                    image: Arc::new(image),
                }
            }
            Err(err) => {
                log::error!("cannot decode {}: {err}", image_path.display());
                View::Failed(err.to_string())
            }
        };
        Self { view, on_save }
    }

    fn export(&mut self) {
        let View::Ready(state) = &mut self.view else {
            return;
        };
        state.busy = true;
        let result = flatten::export_region(&state.scene)
            .and_then(|output| (self.on_save)(&output).map(|()| output));
        state.busy = false;
        match result {
            Ok(output) => {
                log::info!("exported {}x{}", output.width(), output.height());
            }
            Err(err) => log::warn!("export failed: {err:#}"),
        }
    }

    fn handle_shortcuts(&mut self, ctx: &EguiContext) -> bool {
        let View::Ready(state) = &mut self.view else {
            // Escape leaves the error screen too.
            if ctx.input(|input| input.key_pressed(Key::Escape)) {
                ctx.send_viewport_cmd(ViewportCommand::Close);
            }
            return false;
        };

        if state.text_edit.is_some() {
            // The overlay owns the keyboard; it handles Escape itself.
            return false;
        }

        if ctx.input(|input| input.key_pressed(Key::Escape)) {
            ctx.send_viewport_cmd(ViewportCommand::Close);
            return false;
        }

        if ctx.wants_keyboard_input() {
            return false;
        }

        let command = ctx.input(|input| input.modifiers.command || input.modifiers.ctrl);
        let shift = ctx.input(|input| input.modifiers.shift);

        if command && ctx.input(|input| input.key_pressed(Key::Z)) {
            if shift {
                state.redo();
            } else {
                state.undo();
            }
        }
        if command && ctx.input(|input| input.key_pressed(Key::Y)) {
            state.redo();
        }
        if ctx.input(|input| input.key_pressed(Key::Delete) || input.key_pressed(Key::Backspace)) {
            state.delete_selected();
        }

        command && ctx.input(|input| input.key_pressed(Key::S))
    }
}

impl App for EditorApp {
    fn update(&mut self, ctx: &EguiContext, _frame: &mut Frame) {
        let mut export_requested = self.handle_shortcuts(ctx);

        TopBottomPanel::top("snapcrop_toolbar").show(ctx, |ui| {
            if let View::Ready(state) = &mut self.view {
                if toolbar::show(ui, state).export_clicked {
                    export_requested = true;
                }
            } else {
                ui.label("SnapCrop");
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| match &mut self.view {
            View::Loading { image } => {
                // The surface takes the container layout as it is right now;
                // the fit transform is not recomputed afterwards.
                let surface = ui.available_size();
                let state =
                    EditorState::new(Arc::clone(image), surface, EditorConfig::load_or_default());
                self.view = View::Ready(state);
                ctx.request_repaint();
            }
            View::Ready(state) => canvas::show_canvas(ui, ctx, state),
            View::Failed(message) => canvas::show_load_error(ui, message),
        });

        if export_requested {
            self.export();
        }
    }
}
