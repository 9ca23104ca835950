use egui::Color32;

pub const CANVAS_BG: Color32 = Color32::from_rgb(28, 30, 36);
pub const IMAGE_FRAME: Color32 = Color32::from_rgb(58, 62, 72);
pub const SELECTION: Color32 = Color32::from_rgb(77, 141, 255);
pub const HANDLE_FILL: Color32 = Color32::from_rgb(77, 141, 255);
pub const HANDLE_STROKE: Color32 = Color32::from_rgba_premultiplied(200, 200, 200, 200);
pub const GUIDE: Color32 = Color32::from_rgb(240, 240, 240);
pub const GUIDE_FILL: Color32 = Color32::from_rgba_premultiplied(40, 40, 40, 40);
pub const ERROR_TEXT: Color32 = Color32::from_rgb(235, 100, 100);
