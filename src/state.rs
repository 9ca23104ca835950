use std::sync::Arc;

use egui::{ColorImage, Context as EguiContext, TextureHandle, TextureOptions, Vec2};
use image::DynamicImage;

use crate::config::EditorConfig;
use crate::crop::PendingCrop;
use crate::history::UndoHistory;
use crate::object::{Handle, ObjectId, Point, SceneObject, StrokeWidth, Tool};
use crate::scene::Scene;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragMode {
    Draw,
    Move,
    Resize,
}

#[derive(Clone, Debug)]
pub struct DragState {
    pub mode: DragMode,
    pub start: Point,
    pub current: Point,
    /// In-progress object for a drawing drag; removed if the drag is
    /// abandoned or too small.
    pub transient: Option<ObjectId>,
    /// Target of a select-mode move/resize.
    pub target: Option<ObjectId>,
    pub handle: Option<Handle>,
    pub original: Option<SceneObject>,
}

#[derive(Clone, Debug)]
pub struct TextEditState {
    pub target: ObjectId,
    pub buffer: String,
    /// Select the whole content when the editor gains focus.
    pub select_all: bool,
}

/// All mutable editor state behind the drawing surface: the scene, the
/// history arena, the active tool and whatever interaction is in flight.
/// Owned by the app and passed into every handler, so teardown is explicit.
pub struct EditorState {
    pub scene: Scene,
    pub history: UndoHistory<Scene>,
    pub tool: Tool,
    pub active_color: [u8; 4],
    pub active_stroke: StrokeWidth,
    pub selection: Option<ObjectId>,
    pub drag: Option<DragState>,
    pub pending_crop: Option<PendingCrop>,
    pub text_edit: Option<TextEditState>,
    /// Set while a decode or rasterization is in flight; pointer input is
    /// ignored so nothing mutates a scene mid-rebuild.
    pub busy: bool,
    pub config: EditorConfig,
    texture: Option<TextureHandle>,
    texture_generation: Option<u64>,
    next_generation: u64,
}

impl EditorState {
    pub fn new(image: Arc<DynamicImage>, surface: Vec2, config: EditorConfig) -> Self {
        let scene = Scene::build(image, 0, surface);
        let history = UndoHistory::new(scene.clone(), config.history_cap);
        Self {
            scene,
            history,
            tool: Tool::Select,
            active_color: config.last_color,
            active_stroke: config.last_stroke,
            selection: None,
            drag: None,
            pending_crop: None,
            text_edit: None,
            busy: false,
            config,
            texture: None,
            texture_generation: None,
            next_generation: 1,
        }
    }

    pub fn next_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    /// Pushes the current scene onto the history. No-op edits are dropped
    /// by the history itself.
    pub fn commit(&mut self) {
        self.history.push_snapshot(self.scene.clone());
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) {
        if self.busy || self.text_edit.is_some() {
            return;
        }
        if let Some(snapshot) = self.history.undo() {
            self.restore(snapshot);
        }
    }

    pub fn redo(&mut self) {
        if self.busy || self.text_edit.is_some() {
            return;
        }
        if let Some(snapshot) = self.history.redo() {
            self.restore(snapshot);
        }
    }

    /// Replaces the scene from a snapshot, then reasserts the base-image
    /// invariant and the active tool's interactivity policy so stale flags
    /// captured under another tool cannot resurface.
    fn restore(&mut self, snapshot: Scene) {
        self.scene = snapshot;
        self.scene.ensure_base_invariant();
        self.scene.apply_tool_policy(self.tool);
        self.selection = None;
        self.drag = None;
        self.pending_crop = None;
        self.text_edit = None;
    }

    /// Switching tools abandons any drag in flight (removing its transient
    /// object) and cancels a pending crop before the new tool takes over.
    pub fn set_tool(&mut self, tool: Tool) {
        if let Some(drag) = self.drag.take() {
            if let Some(id) = drag.transient {
                self.scene.remove_object(id);
            }
        }
        crate::crop::cancel(self);
        if tool != Tool::Select {
            self.selection = None;
        }
        self.tool = tool;
        self.scene.apply_tool_policy(tool);
        log::debug!("tool changed to {tool:?}");
    }

    pub fn set_color(&mut self, rgba: [u8; 4]) {
        self.active_color = rgba;
        self.config.last_color = rgba;
        let _ = self.config.save();

        let mut changed = false;
        if let Some(id) = self.selection {
            if let Some(object) = self.scene.object_mut(id) {
                if object.color != rgba {
                    object.color = rgba;
                    changed = true;
                }
            }
        }
        if changed {
            self.commit();
        }
    }

    pub fn set_stroke(&mut self, stroke: StrokeWidth) {
        self.active_stroke = stroke;
        self.config.last_stroke = stroke;
        let _ = self.config.save();

        let mut changed = false;
        if let Some(id) = self.selection {
            if let Some(object) = self.scene.object_mut(id) {
                if object.stroke_width != stroke {
                    object.stroke_width = stroke;
                    changed = true;
                }
            }
        }
        if changed {
            self.commit();
        }
    }

    pub fn delete_selected(&mut self) {
        let Some(id) = self.selection.take() else {
            return;
        };
        if self.scene.remove_object(id).is_some() {
            self.commit();
        }
    }

    pub fn clear_annotations(&mut self) {
        // A pending crop selection goes with everything else; dropping its
        // guide without clearing the pending state would leave the
        // apply/cancel affordance pointing at nothing.
        crate::crop::cancel(self);
        if self.scene.annotation_count() == 0 {
            return;
        }
        self.selection = None;
        self.scene.clear_annotations();
        self.commit();
    }

    /// Finishes text editing: empty content discards the textbox silently,
    /// anything else lands as a single history commit.
    pub fn finish_text_edit(&mut self) {
        let Some(edit) = self.text_edit.take() else {
            return;
        };
        let content = edit.buffer.trim().to_string();
        if content.is_empty() {
            self.scene.remove_object(edit.target);
            return;
        }
        if let Some(object) = self.scene.object_mut(edit.target) {
            if let crate::object::ObjectKind::Textbox {
                content: existing, ..
            } = &mut object.kind
            {
                *existing = content;
            }
        }
        self.commit();
    }

    /// Uploads the base raster as an egui texture, re-uploading only when
    /// the raster generation changed (initial load, crop apply, undo/redo
    /// across a crop).
    pub fn ensure_texture(&mut self, ctx: &EguiContext) -> TextureHandle {
        let generation = self.scene.base_generation();
        if let (Some(texture), Some(uploaded)) = (&self.texture, self.texture_generation) {
            if uploaded == generation {
                return texture.clone();
            }
        }
        let rgba = self.scene.base_pixels.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        let color = ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
        let texture = ctx.load_texture("base-image", color, TextureOptions::LINEAR);
        self.texture = Some(texture.clone());
        self.texture_generation = Some(generation);
        texture
    }
}
