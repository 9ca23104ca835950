use crate::crop::{self, PendingCrop};
use crate::object::{ObjectId, ObjectKind, Point, RectData, Tool};
use crate::state::{DragMode, DragState, EditorState, TextEditState};

/// Pointer tolerance for picking an annotation, in surface units.
const PICK_TOLERANCE: f32 = 6.0;

/// Pointer tolerance for grabbing a resize handle, in surface units.
const HANDLE_TOLERANCE: f32 = 8.0;

/// A pointer gesture step in surface coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Moved(Point),
    Up(Point),
}

/// The whole down/move/up protocol for every tool, as one deterministic
/// reducer over the editor state. Input is ignored while a rebuild is in
/// flight or a text edit owns the keyboard.
pub fn dispatch(state: &mut EditorState, event: PointerEvent) {
    if state.busy || state.text_edit.is_some() {
        return;
    }
    match event {
        PointerEvent::Down(point) => pointer_down(state, point),
        PointerEvent::Moved(point) => pointer_moved(state, point),
        PointerEvent::Up(point) => pointer_up(state, point),
    }
}

fn draw_drag(state: &mut EditorState, start: Point, transient: ObjectId) {
    state.drag = Some(DragState {
        mode: DragMode::Draw,
        start,
        current: start,
        transient: Some(transient),
        target: None,
        handle: None,
        original: None,
    });
}

fn pointer_down(state: &mut EditorState, point: Point) {
    // A new drag always supersedes whatever was left half-finished.
    if let Some(drag) = state.drag.take() {
        if let Some(id) = drag.transient {
            state.scene.remove_object(id);
        }
    }

    let color = state.active_color;
    let stroke = state.active_stroke;
    // Shapes start with a 1-unit dummy size anchored at the down-point.
    let dummy = RectData {
        min: point,
        max: Point::new(point.x + 1.0, point.y + 1.0),
    };

    match state.tool {
        Tool::None => {}
        Tool::Select => select_down(state, point),
        Tool::Crop => {
            crop::cancel(state);
            let id = state
                .scene
                .add_transient(ObjectKind::Guide { rect: dummy }, color, stroke);
            draw_drag(state, point, id);
        }
        Tool::Draw => {
            let id = state.scene.add_transient(
                ObjectKind::FreehandPath {
                    points: vec![point],
                },
                color,
                stroke,
            );
            draw_drag(state, point, id);
        }
        Tool::Rect => {
            let id = state
                .scene
                .add_transient(ObjectKind::Rectangle { rect: dummy }, color, stroke);
            draw_drag(state, point, id);
        }
        Tool::Circle => {
            let id = state
                .scene
                .add_transient(ObjectKind::Ellipse { rect: dummy }, color, stroke);
            draw_drag(state, point, id);
        }
        Tool::Arrow => {
            let id = state.scene.add_transient(
                ObjectKind::Arrow {
                    from: point,
                    to: point,
                },
                color,
                stroke,
            );
            draw_drag(state, point, id);
        }
        Tool::Text => {
            let id = state
                .scene
                .add_transient(ObjectKind::Guide { rect: dummy }, color, stroke);
            draw_drag(state, point, id);
        }
    }
}

fn select_down(state: &mut EditorState, point: Point) {
    if let Some(selected) = state.selection {
        if let Some(handle) = handle_under_pointer(state, selected, point) {
            let original = state.scene.object(selected).cloned();
            state.drag = Some(DragState {
                mode: DragMode::Resize,
                start: point,
                current: point,
                transient: None,
                target: Some(selected),
                handle: Some(handle),
                original,
            });
            return;
        }
    }

    match state.scene.hit_test(point, PICK_TOLERANCE) {
        Some(id) => {
            state.selection = Some(id);
            let original = state.scene.object(id).cloned();
            state.drag = Some(DragState {
                mode: DragMode::Move,
                start: point,
                current: point,
                transient: None,
                target: Some(id),
                handle: None,
                original,
            });
        }
        None => state.selection = None,
    }
}

fn handle_under_pointer(
    state: &EditorState,
    id: ObjectId,
    point: Point,
) -> Option<crate::object::Handle> {
    let object = state.scene.object(id)?;
    object
        .handles()
        .into_iter()
        .find(|(_, anchor)| anchor.delta(point).length() <= HANDLE_TOLERANCE)
        .map(|(handle, _)| handle)
}

fn pointer_moved(state: &mut EditorState, point: Point) {
    let Some(drag) = state.drag.as_mut() else {
        return;
    };
    drag.current = point;
    let (mode, start, transient, target, handle, original) = (
        drag.mode,
        drag.start,
        drag.transient,
        drag.target,
        drag.handle,
        drag.original.clone(),
    );

    match mode {
        DragMode::Draw => {
            let Some(id) = transient else {
                return;
            };
            let Some(object) = state.scene.object_mut(id) else {
                return;
            };
            match &mut object.kind {
                ObjectKind::FreehandPath { points } => points.push(point),
                ObjectKind::Rectangle { rect }
                | ObjectKind::Ellipse { rect }
                | ObjectKind::Guide { rect } => {
                    *rect = RectData::from_points(start, point);
                }
                ObjectKind::Arrow { to, .. } => *to = point,
                _ => {}
            }
        }
        DragMode::Move => {
            if let (Some(id), Some(original)) = (target, original) {
                let delta = start.delta(point);
                if let Some(object) = state.scene.object_mut(id) {
                    *object = original;
                    object.move_by(delta);
                }
            }
        }
        DragMode::Resize => {
            if let (Some(id), Some(handle), Some(original)) = (target, handle, original) {
                if let Some(object) = state.scene.object_mut(id) {
                    *object = original;
                    object.resize_from_handle(handle, point);
                }
            }
        }
    }
}

fn pointer_up(state: &mut EditorState, point: Point) {
    let Some(mut drag) = state.drag.take() else {
        return;
    };
    drag.current = point;

    match drag.mode {
        DragMode::Draw => finish_draw(state, drag),
        DragMode::Move | DragMode::Resize => {
            if drag.start.delta(drag.current).length_sq() > 0.01 {
                state.commit();
            }
        }
    }
}

fn finish_draw(state: &mut EditorState, drag: DragState) {
    let Some(id) = drag.transient else {
        return;
    };
    let width = (drag.current.x - drag.start.x).abs();
    let height = (drag.current.y - drag.start.y).abs();
    let min_drag = state.config.min_drag;

    match state.tool {
        Tool::Draw => {
            // The stroke finalizes on its own completion, whatever its size.
            state.scene.promote(id);
            state.commit();
        }
        Tool::Rect | Tool::Circle => {
            if width < min_drag || height < min_drag {
                state.scene.remove_object(id);
                return;
            }
            state.scene.promote(id);
            state.commit();
        }
        Tool::Arrow => {
            // The line and its head promote together or not at all.
            if width < min_drag && height < min_drag {
                state.scene.remove_object(id);
                return;
            }
            state.scene.promote(id);
            state.commit();
        }
        Tool::Text => {
            state.scene.remove_object(id);
            spawn_textbox(state, drag.start, drag.current);
        }
        Tool::Crop => {
            if width < min_drag || height < min_drag {
                state.scene.remove_object(id);
                return;
            }
            let rect = RectData::from_points(drag.start, drag.current);
            if let Some(object) = state.scene.object_mut(id) {
                if let ObjectKind::Guide { rect: guide } = &mut object.kind {
                    *guide = rect;
                }
            }
            state.pending_crop = Some(PendingCrop { rect, guide: id });
        }
        Tool::None | Tool::Select => {
            state.scene.remove_object(id);
        }
    }
}

fn spawn_textbox(state: &mut EditorState, start: Point, end: Point) {
    let rect = RectData::from_points(start, end);
    let width = rect.width().max(state.config.text_min_width);
    let dragged_height = rect.height();
    let font_size = state.config.clamp_font(if dragged_height >= 1.0 {
        dragged_height
    } else {
        state.config.text_default_font
    });

    let color = state.active_color;
    let stroke = state.active_stroke;
    let id = state.scene.add_transient(
        ObjectKind::Textbox {
            pos: rect.min,
            width,
            content: String::new(),
            font_size,
        },
        color,
        stroke,
    );
    state.scene.promote(id);
    // Commit happens when the edit session ends, not here.
    state.text_edit = Some(TextEditState {
        target: id,
        buffer: String::new(),
        select_all: true,
    });
}

/// Re-enters edit mode on an existing textbox (select-tool double-click).
pub fn begin_text_edit(state: &mut EditorState, id: ObjectId) {
    let Some(object) = state.scene.object(id) else {
        return;
    };
    let ObjectKind::Textbox { content, .. } = &object.kind else {
        return;
    };
    state.selection = Some(id);
    state.text_edit = Some(TextEditState {
        target: id,
        buffer: content.clone(),
        select_all: true,
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use egui::Vec2;
    use image::DynamicImage;

    use super::*;
    use crate::config::EditorConfig;

    fn test_state() -> EditorState {
        let image = Arc::new(DynamicImage::new_rgba8(800, 600));
        EditorState::new(image, Vec2::new(1280.0, 760.0), EditorConfig::default())
    }

    fn drag(state: &mut EditorState, from: (f32, f32), to: (f32, f32)) {
        dispatch(state, PointerEvent::Down(Point::new(from.0, from.1)));
        dispatch(state, PointerEvent::Moved(Point::new(to.0, to.1)));
        dispatch(state, PointerEvent::Up(Point::new(to.0, to.1)));
    }

    #[test]
    fn rect_drag_promotes_and_commits() {
        let mut state = test_state();
        state.set_tool(Tool::Rect);
        drag(&mut state, (100.0, 100.0), (300.0, 250.0));

        assert_eq!(state.scene.annotation_count(), 1);
        let object = state.scene.objects.last().expect("rectangle exists");
        assert!(object.selectable);
        assert!(object.evented);
        match &object.kind {
            ObjectKind::Rectangle { rect } => {
                assert_eq!(rect.min.x, 100.0);
                assert_eq!(rect.min.y, 100.0);
                assert_eq!(rect.width(), 200.0);
                assert_eq!(rect.height(), 150.0);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(state.history.len(), 2);
    }

    #[test]
    fn sub_minimum_drag_leaves_nothing() {
        let mut state = test_state();
        for tool in [Tool::Rect, Tool::Circle] {
            state.set_tool(tool);
            drag(&mut state, (10.0, 10.0), (13.0, 100.0));
            assert_eq!(state.scene.annotation_count(), 0, "{tool:?}");
            assert_eq!(state.history.len(), 1, "{tool:?}");
        }
        state.set_tool(Tool::Crop);
        drag(&mut state, (10.0, 10.0), (13.0, 100.0));
        assert!(state.pending_crop.is_none());
        assert_eq!(state.scene.annotation_count(), 0);
    }

    #[test]
    fn circle_drag_defines_bounding_box() {
        let mut state = test_state();
        state.set_tool(Tool::Circle);
        drag(&mut state, (200.0, 100.0), (100.0, 300.0));

        let object = state.scene.objects.last().expect("ellipse exists");
        match &object.kind {
            ObjectKind::Ellipse { rect } => {
                let r = rect.to_rect();
                assert_eq!(r.center().x, 150.0);
                assert_eq!(r.center().y, 200.0);
                assert_eq!(r.width() * 0.5, 50.0);
                assert_eq!(r.height() * 0.5, 100.0);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn arrow_promotes_as_pair() {
        let mut state = test_state();
        state.set_tool(Tool::Arrow);
        drag(&mut state, (0.0, 0.0), (0.0, 100.0));

        let object = state.scene.objects.last().expect("arrow exists");
        match &object.kind {
            ObjectKind::Arrow { from, to } => {
                let angle = crate::object::arrow_head_angle(*from, *to);
                assert!((angle - 180.0).abs() < 1e-4);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(state.history.len(), 2);
    }

    #[test]
    fn freehand_stroke_finalizes_on_completion() {
        let mut state = test_state();
        state.set_tool(Tool::Draw);
        dispatch(&mut state, PointerEvent::Down(Point::new(10.0, 10.0)));
        dispatch(&mut state, PointerEvent::Moved(Point::new(20.0, 15.0)));
        dispatch(&mut state, PointerEvent::Moved(Point::new(30.0, 25.0)));
        dispatch(&mut state, PointerEvent::Up(Point::new(30.0, 25.0)));

        let object = state.scene.objects.last().expect("path exists");
        match &object.kind {
            ObjectKind::FreehandPath { points } => assert_eq!(points.len(), 3),
            other => panic!("unexpected kind {other:?}"),
        }
        assert!(object.selectable);
        assert_eq!(state.history.len(), 2);
    }

    #[test]
    fn text_drag_spawns_textbox_and_edit_session() {
        let mut state = test_state();
        state.set_tool(Tool::Text);
        drag(&mut state, (10.0, 10.0), (60.0, 40.0));

        let object = state.scene.objects.last().expect("textbox exists");
        match &object.kind {
            ObjectKind::Textbox {
                width, font_size, ..
            } => {
                // Narrow drags widen to the configured minimum.
                assert_eq!(*width, 160.0);
                assert_eq!(*font_size, 30.0);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert!(state.text_edit.is_some());
        // No guide left behind, no commit until the edit session ends.
        assert_eq!(state.scene.annotation_count(), 1);
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn text_click_uses_default_font() {
        let mut state = test_state();
        state.set_tool(Tool::Text);
        drag(&mut state, (10.0, 10.0), (10.0, 10.0));
        let object = state.scene.objects.last().expect("textbox exists");
        match &object.kind {
            ObjectKind::Textbox { font_size, .. } => assert_eq!(*font_size, 28.0),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn tool_switch_abandons_transient() {
        let mut state = test_state();
        state.set_tool(Tool::Rect);
        dispatch(&mut state, PointerEvent::Down(Point::new(10.0, 10.0)));
        dispatch(&mut state, PointerEvent::Moved(Point::new(200.0, 200.0)));
        state.set_tool(Tool::Arrow);

        assert_eq!(state.scene.annotation_count(), 0);
        assert!(state.drag.is_none());
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn select_move_commits_once() {
        let mut state = test_state();
        state.set_tool(Tool::Rect);
        drag(&mut state, (100.0, 100.0), (300.0, 250.0));
        state.set_tool(Tool::Select);

        // Grab the left edge of the rectangle and move it.
        drag(&mut state, (100.0, 180.0), (140.0, 200.0));
        assert_eq!(state.history.len(), 3);

        let object = state.scene.objects.last().expect("rectangle exists");
        match &object.kind {
            ObjectKind::Rectangle { rect } => assert_eq!(rect.min.y, 120.0),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn read_only_tool_creates_nothing() {
        let mut state = test_state();
        state.set_tool(Tool::None);
        drag(&mut state, (10.0, 10.0), (200.0, 200.0));
        assert_eq!(state.scene.annotation_count(), 0);
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn busy_editor_ignores_input() {
        let mut state = test_state();
        state.set_tool(Tool::Rect);
        state.busy = true;
        drag(&mut state, (100.0, 100.0), (300.0, 250.0));
        assert_eq!(state.scene.annotation_count(), 0);
    }
}
