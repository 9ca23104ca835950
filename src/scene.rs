use std::sync::Arc;

use egui::{Pos2, Rect, Vec2};
use image::DynamicImage;

use crate::object::{ObjectId, ObjectKind, SceneObject, StrokeWidth, Tool};

/// Smallest drawing surface the editor will lay out against.
pub const MIN_SURFACE: Vec2 = Vec2::new(320.0, 240.0);

/// Largest upscale applied when fitting a small image to a large surface.
pub const MAX_UPSCALE: f32 = 2.0;

/// Fit-to-surface placement of the base image: uniform scale plus centering
/// offsets. Derived once per scene build, never per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitTransform {
    pub scale: f32,
    pub offset: Vec2,
}

impl FitTransform {
    pub fn compute(image: Vec2, surface: Vec2) -> Self {
        let surface = surface.max(MIN_SURFACE);
        let scale = (surface.x / image.x)
            .min(surface.y / image.y)
            .min(MAX_UPSCALE);
        let scaled = image * scale;
        Self {
            scale,
            offset: (surface - scaled) * 0.5,
        }
    }

    /// On-surface bounding box of the fitted image, letterbox excluded.
    pub fn image_bounds(&self, image: Vec2) -> Rect {
        Rect::from_min_size(self.offset.to_pos2(), image * self.scale)
    }
}

/// Ordered set of drawables over one base raster. All object coordinates are
/// surface-space. `objects[0]` is always the base image and is never
/// selectable or pointer-interactive.
#[derive(Clone, Debug)]
pub struct Scene {
    pub surface: Vec2,
    pub fit: FitTransform,
    pub base_pixels: Arc<DynamicImage>,
    pub objects: Vec<SceneObject>,
    next_id: ObjectId,
}

impl PartialEq for Scene {
    /// Structural equality: the raster is compared by generation and
    /// dimensions (carried by the base object), never by pixel buffer.
    fn eq(&self, other: &Self) -> bool {
        self.surface == other.surface && self.fit == other.fit && self.objects == other.objects
    }
}

impl Scene {
    pub fn build(base_pixels: Arc<DynamicImage>, generation: u64, surface: Vec2) -> Self {
        let surface = surface.max(MIN_SURFACE);
        let image = Vec2::new(base_pixels.width() as f32, base_pixels.height() as f32);
        let fit = FitTransform::compute(image, surface);
        let base = SceneObject {
            id: 0,
            kind: ObjectKind::BaseImage {
                generation,
                width: base_pixels.width(),
                height: base_pixels.height(),
            },
            color: [0; 4],
            stroke_width: StrokeWidth::Thin,
            selectable: false,
            evented: false,
        };
        Self {
            surface,
            fit,
            base_pixels,
            objects: vec![base],
            next_id: 1,
        }
    }

    pub fn base_generation(&self) -> u64 {
        match self.objects.first().map(|o| &o.kind) {
            Some(ObjectKind::BaseImage { generation, .. }) => *generation,
            _ => 0,
        }
    }

    pub fn base_size(&self) -> Vec2 {
        Vec2::new(
            self.base_pixels.width() as f32,
            self.base_pixels.height() as f32,
        )
    }

    /// On-surface rectangle the base image occupies.
    pub fn image_bounds(&self) -> Rect {
        self.fit.image_bounds(self.base_size())
    }

    /// Inserts a transient object: not selectable, not pointer-interactive
    /// until promoted on successful pointer-up.
    pub fn add_transient(
        &mut self,
        kind: ObjectKind,
        color: [u8; 4],
        stroke_width: StrokeWidth,
    ) -> ObjectId {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.objects.push(SceneObject {
            id,
            kind,
            color,
            stroke_width,
            selectable: false,
            evented: false,
        });
        id
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<SceneObject> {
        let index = self.objects.iter().position(|o| o.id == id && !o.is_base())?;
        Some(self.objects.remove(index))
    }

    pub fn promote(&mut self, id: ObjectId) {
        if let Some(object) = self.object_mut(id) {
            if !object.is_base() {
                object.selectable = true;
                object.evented = true;
            }
        }
    }

    /// Removes every persistent annotation, leaving the base image alone.
    pub fn clear_annotations(&mut self) {
        self.objects.retain(|o| o.is_base());
    }

    pub fn annotation_count(&self) -> usize {
        self.objects.iter().filter(|o| !o.is_base()).count()
    }

    /// Topmost pointer-interactive object under `point`, if any.
    pub fn hit_test(&self, point: crate::object::Point, tolerance: f32) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .find(|o| o.contains(point, tolerance))
            .map(|o| o.id)
    }

    /// Reasserts that the base image sits first in z-order and stays
    /// non-interactive. Called after every snapshot restore.
    pub fn ensure_base_invariant(&mut self) {
        if let Some(index) = self.objects.iter().position(SceneObject::is_base) {
            if index != 0 {
                let base = self.objects.remove(index);
                self.objects.insert(0, base);
            }
        }
        if let Some(base) = self.objects.first_mut() {
            base.selectable = false;
            base.evented = false;
        }
        let max_id = self.objects.iter().map(|o| o.id).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id + 1);
    }

    /// Applies the active tool's interactivity policy to every non-base
    /// object. A restored snapshot must not resurrect flags captured under
    /// whatever tool was active at the time.
    pub fn apply_tool_policy(&mut self, tool: Tool) {
        let interactive = tool.objects_interactive();
        for object in self.objects.iter_mut().skip(1) {
            if object.is_guide() {
                continue;
            }
            object.selectable = interactive;
            object.evented = interactive;
        }
    }
}
