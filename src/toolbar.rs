use egui::{Color32, RichText, Ui};

use crate::object::{StrokeWidth, Tool};
use crate::state::EditorState;

const TOOLS: &[(Tool, &str)] = &[
    (Tool::Select, "Select"),
    (Tool::Crop, "Crop"),
    (Tool::Draw, "Draw"),
    (Tool::Rect, "Rect"),
    (Tool::Circle, "Circle"),
    (Tool::Arrow, "Arrow"),
    (Tool::Text, "Text"),
    (Tool::None, "View"),
];

#[derive(Default)]
pub struct ToolbarResponse {
    pub export_clicked: bool,
}

pub fn show(ui: &mut Ui, state: &mut EditorState) -> ToolbarResponse {
    let mut response = ToolbarResponse::default();

    ui.horizontal(|ui| {
        for (tool, label) in TOOLS {
            if ui
                .selectable_label(state.tool == *tool, *label)
                .clicked()
            {
                state.set_tool(*tool);
            }
        }

        ui.separator();

        let mut color = Color32::from_rgba_unmultiplied(
            state.active_color[0],
            state.active_color[1],
            state.active_color[2],
            state.active_color[3],
        );
        if ui.color_edit_button_srgba(&mut color).changed() {
            state.set_color([color.r(), color.g(), color.b(), color.a()]);
        }

        for (stroke, label) in [
            (StrokeWidth::Thin, "S"),
            (StrokeWidth::Medium, "M"),
            (StrokeWidth::Thick, "L"),
        ] {
            if ui
                .selectable_label(state.active_stroke == stroke, label)
                .clicked()
            {
                state.set_stroke(stroke);
            }
        }

        ui.separator();

        if ui
            .add_enabled(state.can_undo(), egui::Button::new("Undo"))
            .clicked()
        {
            state.undo();
        }
        if ui
            .add_enabled(state.can_redo(), egui::Button::new("Redo"))
            .clicked()
        {
            state.redo();
        }
        if ui.button("Clear").clicked() {
            state.clear_annotations();
        }

        ui.separator();

        if ui.button(RichText::new("Save").strong()).clicked() {
            response.export_clicked = true;
        }
    });

    response
}
