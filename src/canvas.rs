use egui::{
    vec2, Align2, Context, FontId, Id, Painter, Pos2, Rect, Response, ScrollArea, Sense, Shape,
    Stroke, Ui, Vec2,
};

use crate::crop;
use crate::object::{ObjectKind, Point, SceneObject, Tool};
use crate::pointer::{self, PointerEvent};
use crate::state::EditorState;
use crate::theme;

/// Renders the drawing surface and feeds pointer gestures into the tool
/// reducer. The surface size is fixed at scene build time; an outer scroll
/// area absorbs any mismatch with the window.
pub fn show_canvas(ui: &mut Ui, ctx: &Context, state: &mut EditorState) {
    let texture = state.ensure_texture(ctx);

    ScrollArea::both()
        .id_source("snapcrop_canvas_scroll")
        .show(ui, |ui| {
            let (canvas_rect, response) =
                ui.allocate_exact_size(state.scene.surface, Sense::click_and_drag());
            let origin = canvas_rect.min.to_vec2();

            let painter = ui.painter_at(canvas_rect);
            painter.rect_filled(canvas_rect, 0.0, theme::CANVAS_BG);

            let image_rect = state.scene.image_bounds().translate(origin);
            painter.rect_stroke(image_rect.expand(1.0), 0.0, Stroke::new(1.0, theme::IMAGE_FRAME));
            painter.image(
                texture.id(),
                image_rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                egui::Color32::WHITE,
            );

            let editing = state.text_edit.as_ref().map(|edit| edit.target);
            for object in state.scene.objects.iter().skip(1) {
                if editing == Some(object.id) {
                    continue;
                }
                draw_object(&painter, object, origin);
            }
            draw_selection(&painter, state, origin);

            handle_pointer(ctx, state, &response, origin);
            pending_crop_controls(ui, state, origin);
            text_edit_overlay(ui, ctx, state, origin);
        });
}

fn draw_object(painter: &Painter, object: &SceneObject, origin: Vec2) {
    let color = egui::Color32::from_rgba_unmultiplied(
        object.color[0],
        object.color[1],
        object.color[2],
        object.color[3],
    );
    let stroke = Stroke::new(object.stroke_width.px(), color);
    let at = |p: Point| p.to_pos2() + origin;

    match &object.kind {
        ObjectKind::BaseImage { .. } => {}
        ObjectKind::FreehandPath { points } => {
            let screen: Vec<Pos2> = points.iter().map(|p| at(*p)).collect();
            painter.add(Shape::line(screen, stroke));
        }
        ObjectKind::Rectangle { rect } => {
            painter.rect_stroke(rect.to_rect().translate(origin), 0.0, stroke);
        }
        ObjectKind::Ellipse { rect } => {
            let points = ellipse_polyline(rect.to_rect().translate(origin), 56);
            painter.add(Shape::closed_line(points, stroke));
        }
        ObjectKind::Arrow { from, to } => draw_arrow(painter, at(*from), at(*to), stroke),
        ObjectKind::Textbox {
            pos,
            content,
            font_size,
            ..
        } => {
            painter.text(
                at(*pos),
                Align2::LEFT_TOP,
                content,
                FontId::proportional(*font_size),
                color,
            );
        }
        ObjectKind::Guide { rect } => {
            let r = rect.to_rect().translate(origin);
            painter.rect_filled(r, 0.0, theme::GUIDE_FILL);
            let guide_stroke = Stroke::new(1.5, theme::GUIDE);
            for [a, b] in [
                [r.left_top(), r.right_top()],
                [r.right_top(), r.right_bottom()],
                [r.right_bottom(), r.left_bottom()],
                [r.left_bottom(), r.left_top()],
            ] {
                painter.extend(Shape::dashed_line(&[a, b], guide_stroke, 6.0, 4.0));
            }
        }
    }
}

fn draw_arrow(painter: &Painter, from: Pos2, to: Pos2, stroke: Stroke) {
    painter.line_segment([from, to], stroke);

    let direction = to - from;
    let len = direction.length().max(1.0);
    let unit = direction / len;
    let head_length = 12.0;
    let head_half_width = 7.0;

    let base = to - unit * head_length;
    let normal = vec2(-unit.y, unit.x);
    let left = base + normal * head_half_width;
    let right = base - normal * head_half_width;

    painter.add(Shape::convex_polygon(
        vec![to, left, right],
        stroke.color,
        Stroke::NONE,
    ));
}

fn draw_selection(painter: &Painter, state: &EditorState, origin: Vec2) {
    let Some(selected) = state.selection else {
        return;
    };
    let Some(object) = state.scene.object(selected) else {
        return;
    };

    let bounds = object.bounds().translate(origin);
    painter.rect_stroke(bounds.expand(3.0), 2.0, Stroke::new(1.8, theme::SELECTION));

    for (_, point) in object.handles() {
        let pos = point.to_pos2() + origin;
        let handle_rect = Rect::from_center_size(pos, vec2(9.0, 9.0));
        painter.rect_filled(handle_rect, 2.0, theme::HANDLE_FILL);
        painter.rect_stroke(handle_rect, 2.0, Stroke::new(1.0, theme::HANDLE_STROKE));
    }
}

fn handle_pointer(ctx: &Context, state: &mut EditorState, response: &Response, origin: Vec2) {
    let to_surface = |pos: Pos2| Point::new(pos.x - origin.x, pos.y - origin.y);

    if response.double_clicked() && state.tool == Tool::Select {
        if let Some(pos) = response.interact_pointer_pos() {
            let point = to_surface(pos);
            if let Some(id) = state.scene.hit_test(point, 6.0) {
                pointer::begin_text_edit(state, id);
                return;
            }
        }
    }

    if response.drag_started() {
        if let Some(pos) = response.interact_pointer_pos() {
            pointer::dispatch(state, PointerEvent::Down(to_surface(pos)));
        }
    }
    if response.dragged() {
        if let Some(pos) = response.interact_pointer_pos() {
            pointer::dispatch(state, PointerEvent::Moved(to_surface(pos)));
        }
    }
    if response.drag_stopped() {
        let pos = response
            .interact_pointer_pos()
            .or_else(|| ctx.input(|input| input.pointer.latest_pos()));
        if let Some(pos) = pos {
            pointer::dispatch(state, PointerEvent::Up(to_surface(pos)));
        }
    }
    // A plain click is a degenerate drag: down and up at the same point.
    if response.clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            let point = to_surface(pos);
            pointer::dispatch(state, PointerEvent::Down(point));
            pointer::dispatch(state, PointerEvent::Up(point));
        }
    }
}

fn pending_crop_controls(ui: &mut Ui, state: &mut EditorState, origin: Vec2) {
    let Some(pending) = state.pending_crop else {
        return;
    };

    let anchor = pending.rect.normalize().max.to_pos2() + origin + vec2(8.0, 8.0);
    egui::Area::new(Id::new("snapcrop_crop_controls"))
        .order(egui::Order::Foreground)
        .fixed_pos(anchor)
        .show(ui.ctx(), |ui| {
            ui.horizontal(|ui| {
                if ui.button("Apply").clicked() {
                    // Failures roll the selection back; nothing to surface.
                    let _ = crop::apply(state);
                }
                if ui.button("Cancel").clicked() {
                    crop::cancel(state);
                }
            });
        });
}

fn text_edit_overlay(ui: &mut Ui, ctx: &Context, state: &mut EditorState, origin: Vec2) {
    let Some(edit) = state.text_edit.as_ref() else {
        return;
    };
    let target = edit.target;
    let mut buffer = edit.buffer.clone();
    let select_all = edit.select_all;

    let Some(object) = state.scene.object(target) else {
        state.text_edit = None;
        return;
    };
    let ObjectKind::Textbox {
        pos,
        width,
        font_size,
        ..
    } = object.kind.clone()
    else {
        state.text_edit = None;
        return;
    };
    let color = egui::Color32::from_rgba_unmultiplied(
        object.color[0],
        object.color[1],
        object.color[2],
        object.color[3],
    );

    let field_id = Id::new("snapcrop_text_edit_field");
    let mut finished = false;

    egui::Area::new(Id::new("snapcrop_text_edit"))
        .order(egui::Order::Foreground)
        .fixed_pos(pos.to_pos2() + origin)
        .show(ctx, |ui| {
            let output = egui::TextEdit::multiline(&mut buffer)
                .id(field_id)
                .font(FontId::proportional(font_size))
                .text_color(color)
                .desired_width(width)
                .desired_rows(1)
                .frame(false)
                .show(ui);

            if select_all {
                let chars = buffer.chars().count();
                let mut field_state =
                    egui::text_edit::TextEditState::load(ctx, field_id).unwrap_or_default();
                field_state
                    .cursor
                    .set_char_range(Some(egui::text::CCursorRange::two(
                        egui::text::CCursor::new(0),
                        egui::text::CCursor::new(chars),
                    )));
                field_state.store(ctx, field_id);
                output.response.request_focus();
            }

            let escape = ui.input(|input| input.key_pressed(egui::Key::Escape));
            let cmd_enter = ui.input(|input| {
                input.key_pressed(egui::Key::Enter)
                    && (input.modifiers.command || input.modifiers.ctrl)
            });
            if escape || cmd_enter || (output.response.lost_focus() && !select_all) {
                finished = true;
            }
        });

    if let Some(edit) = state.text_edit.as_mut() {
        edit.buffer = buffer;
        edit.select_all = false;
    }
    if finished {
        state.finish_text_edit();
    }
}

pub fn show_load_error(ui: &mut Ui, message: &str) {
    let (rect, _) = ui.allocate_exact_size(ui.available_size(), Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, theme::CANVAS_BG);
    painter.text(
        rect.center(),
        Align2::CENTER_CENTER,
        format!("Could not load image\n{message}"),
        FontId::proportional(17.0),
        theme::ERROR_TEXT,
    );
}

fn ellipse_polyline(rect: Rect, segments: usize) -> Vec<Pos2> {
    let mut points = Vec::with_capacity(segments);
    let center = rect.center();
    let rx = rect.width() * 0.5;
    let ry = rect.height() * 0.5;

    for i in 0..segments {
        let t = (i as f32 / segments as f32) * std::f32::consts::TAU;
        points.push(Pos2::new(center.x + rx * t.cos(), center.y + ry * t.sin()));
    }

    points
}
