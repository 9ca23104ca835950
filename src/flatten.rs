use ab_glyph::FontArc;
use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use tiny_skia::{
    FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};

use crate::object::{ObjectKind, Point, SceneObject};
use crate::scene::Scene;

/// Rasterizes the whole visible surface at 1:1 surface resolution: fitted
/// base image plus every annotation, guides excluded.
pub fn rasterize_surface(scene: &Scene) -> Result<RgbaImage> {
    let width = scene.surface.x.round() as u32;
    let height = scene.surface.y.round() as u32;
    let mut pixmap =
        Pixmap::new(width, height).ok_or_else(|| anyhow!("cannot allocate surface pixmap"))?;

    draw_base_image(scene, &mut pixmap)?;

    for object in scene.objects.iter().skip(1) {
        draw_object_shape(&mut pixmap, object)?;
    }

    let mut output = RgbaImage::from_raw(width, height, pixmap.data().to_vec())
        .ok_or_else(|| anyhow!("cannot construct output image"))?;

    draw_text_objects(&mut output, &scene.objects);

    Ok(output)
}

/// Flattens exactly the base image's fitted sub-region of the surface,
/// letterbox padding excluded. Read-only; the scene is untouched.
pub fn export_region(scene: &Scene) -> Result<DynamicImage> {
    let surface = rasterize_surface(scene)?;
    let bounds = scene.image_bounds();

    let x = (bounds.min.x.round().max(0.0)) as u32;
    let y = (bounds.min.y.round().max(0.0)) as u32;
    let width = (bounds.width().round() as u32).min(surface.width().saturating_sub(x));
    let height = (bounds.height().round() as u32).min(surface.height().saturating_sub(y));
    if width == 0 || height == 0 {
        return Err(anyhow!("fitted image region is empty"));
    }

    let cropped = image::imageops::crop_imm(&surface, x, y, width, height).to_image();
    Ok(DynamicImage::ImageRgba8(cropped))
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .context("cannot encode PNG")?;
    Ok(buffer.into_inner())
}

fn draw_base_image(scene: &Scene, pixmap: &mut Pixmap) -> Result<()> {
    let rgba = scene.base_pixels.to_rgba8();
    let mut base = Pixmap::new(rgba.width(), rgba.height())
        .ok_or_else(|| anyhow!("cannot allocate base pixmap"))?;
    let data = base.data_mut();
    if data.len() != rgba.len() {
        return Err(anyhow!("base image and pixmap size mismatch"));
    }
    data.copy_from_slice(rgba.as_raw());

    let fit = scene.fit;
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..Default::default()
    };
    pixmap.draw_pixmap(
        0,
        0,
        base.as_ref(),
        &paint,
        Transform::from_scale(fit.scale, fit.scale).post_translate(fit.offset.x, fit.offset.y),
        None,
    );
    Ok(())
}

fn draw_object_shape(pixmap: &mut Pixmap, object: &SceneObject) -> Result<()> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(
        object.color[0],
        object.color[1],
        object.color[2],
        object.color[3],
    );
    paint.anti_alias = true;

    let stroke = Stroke {
        width: object.stroke_width.px(),
        ..Default::default()
    };

    match &object.kind {
        ObjectKind::BaseImage { .. } | ObjectKind::Guide { .. } | ObjectKind::Textbox { .. } => {}
        ObjectKind::FreehandPath { points } => {
            if points.len() < 2 {
                return Ok(());
            }
            let mut pb = PathBuilder::new();
            pb.move_to(points[0].x, points[0].y);
            for point in &points[1..] {
                pb.line_to(point.x, point.y);
            }
            let path = pb.finish().ok_or_else(|| anyhow!("cannot build path"))?;
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
        ObjectKind::Rectangle { rect } => {
            let rect = rect.normalize();
            let tiny_rect =
                tiny_skia::Rect::from_ltrb(rect.min.x, rect.min.y, rect.max.x, rect.max.y)
                    .ok_or_else(|| anyhow!("invalid rectangle"))?;
            let path = PathBuilder::from_rect(tiny_rect);
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
        ObjectKind::Ellipse { rect } => {
            let rect = rect.normalize().to_rect();
            let center = rect.center();
            let rx = (rect.width() * 0.5).max(1.0);
            let ry = (rect.height() * 0.5).max(1.0);
            let mut pb = PathBuilder::new();
            pb.push_circle(0.0, 0.0, 1.0);
            let path = pb
                .finish()
                .ok_or_else(|| anyhow!("cannot build ellipse path"))?;
            let transform = Transform::from_scale(rx, ry).post_translate(center.x, center.y);
            pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        }
        ObjectKind::Arrow { from, to } => {
            stroke_line(pixmap, *from, *to, &paint, &stroke)?;
            fill_arrow_head(pixmap, *from, *to, &paint)?;
        }
    }

    Ok(())
}

fn stroke_line(
    pixmap: &mut Pixmap,
    from: Point,
    to: Point,
    paint: &Paint,
    stroke: &Stroke,
) -> Result<()> {
    let mut pb = PathBuilder::new();
    pb.move_to(from.x, from.y);
    pb.line_to(to.x, to.y);
    let path = pb.finish().ok_or_else(|| anyhow!("cannot build line"))?;
    pixmap.stroke_path(&path, paint, stroke, Transform::identity(), None);
    Ok(())
}

fn fill_arrow_head(pixmap: &mut Pixmap, from: Point, to: Point, paint: &Paint) -> Result<()> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let length = (dx * dx + dy * dy).sqrt().max(1.0);
    let ux = dx / length;
    let uy = dy / length;
    let head_len = 14.0;
    let head_w = 9.0;

    let base_x = to.x - ux * head_len;
    let base_y = to.y - uy * head_len;
    let left_x = base_x - uy * head_w;
    let left_y = base_y + ux * head_w;
    let right_x = base_x + uy * head_w;
    let right_y = base_y - ux * head_w;

    let mut pb = PathBuilder::new();
    pb.move_to(to.x, to.y);
    pb.line_to(left_x, left_y);
    pb.line_to(right_x, right_y);
    pb.close();
    let path = pb
        .finish()
        .ok_or_else(|| anyhow!("cannot build arrow head path"))?;
    pixmap.fill_path(&path, paint, FillRule::Winding, Transform::identity(), None);
    Ok(())
}

fn draw_text_objects(image: &mut RgbaImage, objects: &[SceneObject]) {
    let Some(font) = load_system_font() else {
        return;
    };

    for object in objects {
        let ObjectKind::Textbox {
            pos,
            content,
            font_size,
            ..
        } = &object.kind
        else {
            continue;
        };
        let line_height = font_size * 1.3;
        for (index, line) in content.lines().enumerate() {
            draw_text_mut(
                image,
                Rgba(object.color),
                pos.x as i32,
                (pos.y + line_height * index as f32) as i32,
                *font_size,
                &font,
                line,
            );
        }
    }
}

fn load_system_font() -> Option<FontArc> {
    let candidates = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/noto/NotoSans-Regular.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/System/Library/Fonts/SFNS.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    for path in candidates {
        if let Ok(bytes) = std::fs::read(path) {
            if let Ok(font) = FontArc::try_from_vec(bytes) {
                return Some(font);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use egui::Vec2;
    use image::{DynamicImage, Rgba, RgbaImage};

    use super::*;
    use crate::object::{RectData, StrokeWidth};

    fn test_scene() -> Scene {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            800,
            600,
            Rgba([200, 200, 200, 255]),
        ));
        Scene::build(Arc::new(image), 0, Vec2::new(1280.0, 760.0))
    }

    #[test]
    fn rasterize_matches_surface_resolution() {
        let scene = test_scene();
        let output = rasterize_surface(&scene).expect("rasterize succeeds");
        assert_eq!(output.width(), 1280);
        assert_eq!(output.height(), 760);
    }

    #[test]
    fn annotations_land_on_the_raster() {
        let mut scene = test_scene();
        let id = scene.add_transient(
            ObjectKind::Rectangle {
                rect: RectData::from_points(
                    crate::object::Point::new(300.0, 100.0),
                    crate::object::Point::new(500.0, 300.0),
                ),
            },
            [255, 0, 0, 255],
            StrokeWidth::Thick,
        );
        scene.promote(id);

        let output = rasterize_surface(&scene).expect("rasterize succeeds");
        let on_edge = output.get_pixel(400, 100);
        assert!(on_edge[0] > 180 && on_edge[1] < 120, "edge pixel {on_edge:?}");
        // Well inside the rectangle the base image shows through.
        let inside = output.get_pixel(400, 200);
        assert_eq!(inside[0], inside[1]);
    }

    #[test]
    fn export_excludes_letterbox_padding() {
        let scene = test_scene();
        // 800x600 fitted into 1280x760: scale 760/600, drawn 1013x760.
        let output = export_region(&scene).expect("export succeeds");
        assert_eq!(output.width(), 1013);
        assert_eq!(output.height(), 760);
    }

    #[test]
    fn export_leaves_scene_untouched() {
        let scene = test_scene();
        let before = scene.clone();
        let _ = export_region(&scene).expect("export succeeds");
        assert_eq!(scene, before);
    }

    #[test]
    fn png_round_trip_preserves_dimensions() {
        let scene = test_scene();
        let output = export_region(&scene).expect("export succeeds");
        let bytes = encode_png(&output).expect("encode succeeds");
        let decoded = image::load_from_memory(&bytes).expect("decode succeeds");
        assert_eq!(decoded.width(), output.width());
        assert_eq!(decoded.height(), output.height());
    }
}
