use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;

use crate::flatten;
use crate::object::{ObjectId, RectData};
use crate::scene::Scene;
use crate::state::EditorState;

/// A completed crop drag awaiting its apply/cancel decision. The guide
/// object stays visible in the scene until then.
#[derive(Clone, Copy, Debug)]
pub struct PendingCrop {
    /// Selection rectangle in surface coordinates.
    pub rect: RectData,
    pub guide: ObjectId,
}

/// Commits the pending crop: rasterizes the whole surface, crops it to the
/// clamped selection and rebuilds the scene around the result as its new
/// base image. One history commit; undo restores the pre-crop vector scene.
///
/// On failure the guide and pending state are put back exactly as they
/// were, so the editor never ends up half-transitioned.
pub fn apply(state: &mut EditorState) -> Result<()> {
    let Some(pending) = state.pending_crop.take() else {
        return Ok(());
    };
    let guide = state.scene.remove_object(pending.guide);

    state.busy = true;
    let result = rebuild_from_crop(state, pending.rect);
    state.busy = false;

    match result {
        Ok(()) => {
            let size = state.scene.base_size();
            log::info!("crop applied, new base image {}x{}", size.x, size.y);
            Ok(())
        }
        Err(err) => {
            if let Some(guide) = guide {
                state.scene.objects.push(guide);
            }
            state.pending_crop = Some(pending);
            log::warn!("crop apply failed, selection restored: {err:#}");
            Err(err)
        }
    }
}

/// Drops the pending selection. No history commit, no scene rebuild.
pub fn cancel(state: &mut EditorState) {
    if let Some(pending) = state.pending_crop.take() {
        state.scene.remove_object(pending.guide);
    }
}

fn rebuild_from_crop(state: &mut EditorState, rect: RectData) -> Result<()> {
    let surface = flatten::rasterize_surface(&state.scene)
        .context("cannot rasterize surface for crop")?;
    let clamped = clamp_to_surface(rect, surface.width(), surface.height())
        .ok_or_else(|| anyhow!("crop selection is outside the surface"))?;

    let (x, y, width, height) = clamped;
    let cropped = image::imageops::crop_imm(&surface, x, y, width, height).to_image();
    let generation = state.next_generation();
    let surface_size = state.scene.surface;

    // Rebuild, not mutate: the vector objects are flattened into the new
    // base raster and the fit transform is recomputed for its size.
    state.scene = Scene::build(
        Arc::new(DynamicImage::ImageRgba8(cropped)),
        generation,
        surface_size,
    );
    state.scene.apply_tool_policy(state.tool);
    state.selection = None;
    state.commit();
    Ok(())
}

/// Clamps a selection to the surface bounds, in whole pixels. Returns
/// `None` when nothing of it lies on the surface.
fn clamp_to_surface(rect: RectData, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let rect = rect.normalize();
    let x0 = rect.min.x.max(0.0).floor() as u32;
    let y0 = rect.min.y.max(0.0).floor() as u32;
    let x1 = (rect.max.x.round() as i64).clamp(0, width as i64) as u32;
    let y1 = (rect.max.y.round() as i64).clamp(0, height as i64) as u32;
    if x0 >= width || y0 >= height || x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0, y0, x1 - x0, y1 - y0))
}

#[cfg(test)]
mod tests {
    use egui::Vec2;
    use image::{DynamicImage, Rgba, RgbaImage};

    use super::*;
    use crate::config::EditorConfig;
    use crate::object::{ObjectKind, Point, Tool};
    use crate::pointer::{dispatch, PointerEvent};

    fn test_state() -> EditorState {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            800,
            600,
            Rgba([200, 200, 200, 255]),
        ));
        EditorState::new(
            Arc::new(image),
            Vec2::new(1280.0, 760.0),
            EditorConfig::default(),
        )
    }

    fn drag(state: &mut EditorState, from: (f32, f32), to: (f32, f32)) {
        dispatch(state, PointerEvent::Down(Point::new(from.0, from.1)));
        dispatch(state, PointerEvent::Moved(Point::new(to.0, to.1)));
        dispatch(state, PointerEvent::Up(Point::new(to.0, to.1)));
    }

    #[test]
    fn crop_drag_leaves_pending_selection() {
        let mut state = test_state();
        state.set_tool(Tool::Crop);
        drag(&mut state, (50.0, 50.0), (250.0, 200.0));

        let pending = state.pending_crop.expect("pending crop set");
        assert_eq!(pending.rect.min.x, 50.0);
        assert_eq!(pending.rect.width(), 200.0);
        assert_eq!(pending.rect.height(), 150.0);
        // The guide stays on scene but is never interactive.
        let guide = state.scene.object(pending.guide).expect("guide visible");
        assert!(matches!(guide.kind, ObjectKind::Guide { .. }));
        assert!(!guide.selectable);
        // Nothing committed yet.
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn apply_rebuilds_scene_and_is_undoable() {
        let mut state = test_state();
        let original = state.scene.clone();
        state.set_tool(Tool::Crop);
        drag(&mut state, (50.0, 50.0), (250.0, 200.0));

        apply(&mut state).expect("crop apply succeeds");

        // New scene: cropped raster as the sole object, fit recomputed.
        assert_eq!(state.scene.base_pixels.width(), 200);
        assert_eq!(state.scene.base_pixels.height(), 150);
        assert_eq!(state.scene.annotation_count(), 0);
        assert!(state.pending_crop.is_none());
        assert_eq!(state.history.len(), 2);

        // Undo restores the exact pre-crop scene, not merely an earlier crop.
        state.undo();
        assert_eq!(state.scene, original);
        assert_eq!(state.scene.base_pixels.width(), 800);
        assert_eq!(state.scene.base_pixels.height(), 600);

        state.redo();
        assert_eq!(state.scene.base_pixels.width(), 200);
    }

    #[test]
    fn apply_flattens_existing_annotations() {
        let mut state = test_state();
        state.set_tool(Tool::Rect);
        drag(&mut state, (300.0, 100.0), (500.0, 300.0));
        assert_eq!(state.scene.annotation_count(), 1);

        state.set_tool(Tool::Crop);
        drag(&mut state, (0.0, 0.0), (600.0, 500.0));
        apply(&mut state).expect("crop apply succeeds");

        // The rectangle is pixels now, not an object.
        assert_eq!(state.scene.annotation_count(), 0);
    }

    #[test]
    fn cancel_discards_selection_without_commit() {
        let mut state = test_state();
        state.set_tool(Tool::Crop);
        drag(&mut state, (50.0, 50.0), (250.0, 200.0));
        cancel(&mut state);

        assert!(state.pending_crop.is_none());
        assert_eq!(state.scene.annotation_count(), 0);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.scene.base_pixels.width(), 800);
    }

    #[test]
    fn clear_annotations_cancels_pending_crop() {
        let mut state = test_state();
        state.set_tool(Tool::Crop);
        drag(&mut state, (50.0, 50.0), (250.0, 200.0));
        assert!(state.pending_crop.is_some());

        state.clear_annotations();

        assert!(state.pending_crop.is_none());
        assert_eq!(state.scene.annotation_count(), 0);
        // Dropping a selection is not an edit.
        assert_eq!(state.history.len(), 1);
        // A stale apply must be a no-op, not a blind crop.
        apply(&mut state).expect("apply without pending is a no-op");
        assert_eq!(state.scene.base_pixels.width(), 800);
    }

    #[test]
    fn switching_tool_cancels_pending_crop() {
        let mut state = test_state();
        state.set_tool(Tool::Crop);
        drag(&mut state, (50.0, 50.0), (250.0, 200.0));
        assert!(state.pending_crop.is_some());

        state.set_tool(Tool::Rect);
        assert!(state.pending_crop.is_none());
        assert_eq!(state.scene.annotation_count(), 0);
    }

    #[test]
    fn selection_clamps_to_surface_bounds() {
        assert_eq!(
            clamp_to_surface(
                RectData::from_points(Point::new(-20.0, -20.0), Point::new(100.0, 50.0)),
                1280,
                760
            ),
            Some((0, 0, 100, 50))
        );
        assert_eq!(
            clamp_to_surface(
                RectData::from_points(Point::new(1200.0, 700.0), Point::new(1400.0, 900.0)),
                1280,
                760
            ),
            Some((1200, 700, 80, 60))
        );
        assert_eq!(
            clamp_to_surface(
                RectData::from_points(Point::new(1300.0, 800.0), Point::new(1400.0, 900.0)),
                1280,
                760
            ),
            None
        );
    }
}
