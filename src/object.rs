use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

pub type ObjectId = u64;

/// Active editing tool. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    None,
    Select,
    Crop,
    Draw,
    Rect,
    Circle,
    Arrow,
    Text,
}

impl Tool {
    /// Interactivity that persistent non-base objects get under this tool.
    pub fn objects_interactive(self) -> bool {
        !matches!(self, Tool::None)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum StrokeWidth {
    Thin,
    Medium,
    Thick,
}

impl StrokeWidth {
    pub fn px(self) -> f32 {
        match self {
            Self::Thin => 1.5,
            Self::Medium => 3.0,
            Self::Thick => 5.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_pos2(self) -> Pos2 {
        Pos2::new(self.x, self.y)
    }

    pub fn from_pos2(value: Pos2) -> Self {
        Self {
            x: value.x,
            y: value.y,
        }
    }

    pub fn delta(self, other: Point) -> Vec2 {
        Vec2::new(other.x - self.x, other.y - self.y)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct RectData {
    pub min: Point,
    pub max: Point,
}

impl RectData {
    pub fn from_points(a: Point, b: Point) -> Self {
        Self { min: a, max: b }.normalize()
    }

    pub fn normalize(self) -> Self {
        let min_x = self.min.x.min(self.max.x);
        let min_y = self.min.y.min(self.max.y);
        let max_x = self.min.x.max(self.max.x);
        let max_y = self.min.y.max(self.max.y);
        Self {
            min: Point { x: min_x, y: min_y },
            max: Point { x: max_x, y: max_y },
        }
    }

    pub fn to_rect(self) -> Rect {
        let norm = self.normalize();
        Rect::from_min_max(norm.min.to_pos2(), norm.max.to_pos2())
    }

    pub fn from_rect(value: Rect) -> Self {
        Self {
            min: Point::from_pos2(value.min),
            max: Point::from_pos2(value.max),
        }
    }

    pub fn width(self) -> f32 {
        (self.max.x - self.min.x).abs()
    }

    pub fn height(self) -> f32 {
        (self.max.y - self.min.y).abs()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    ArrowFrom,
    ArrowTo,
}

/// One drawable in the scene's z-order. The background raster is an object
/// like any other, except it is never selectable or pointer-interactive.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SceneObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub color: [u8; 4],
    pub stroke_width: StrokeWidth,
    pub selectable: bool,
    pub evented: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum ObjectKind {
    /// The background raster. `generation` identifies the pixel buffer so
    /// snapshots compare structurally without touching pixel data.
    BaseImage {
        generation: u64,
        width: u32,
        height: u32,
    },
    FreehandPath {
        points: Vec<Point>,
    },
    Rectangle {
        rect: RectData,
    },
    Ellipse {
        rect: RectData,
    },
    /// Line plus triangular head, promoted and deleted as one pair.
    Arrow {
        from: Point,
        to: Point,
    },
    Textbox {
        pos: Point,
        width: f32,
        content: String,
        font_size: f32,
    },
    /// Dashed selection rectangle used by the crop and text drags.
    /// Never promoted; removed on pointer-up or apply/cancel.
    Guide {
        rect: RectData,
    },
}

impl SceneObject {
    pub fn is_base(&self) -> bool {
        matches!(self.kind, ObjectKind::BaseImage { .. })
    }

    pub fn is_guide(&self) -> bool {
        matches!(self.kind, ObjectKind::Guide { .. })
    }

    pub fn bounds(&self) -> Rect {
        match &self.kind {
            ObjectKind::BaseImage { width, height, .. } => Rect::from_min_size(
                Pos2::ZERO,
                Vec2::new(*width as f32, *height as f32),
            ),
            ObjectKind::FreehandPath { points } => {
                let mut rect = Rect::NOTHING;
                for p in points {
                    rect.extend_with(p.to_pos2());
                }
                rect.expand(self.stroke_width.px())
            }
            ObjectKind::Rectangle { rect } | ObjectKind::Ellipse { rect } => {
                rect.to_rect().expand(4.0)
            }
            ObjectKind::Arrow { from, to } => {
                Rect::from_two_pos(from.to_pos2(), to.to_pos2()).expand(8.0)
            }
            ObjectKind::Textbox {
                pos,
                width,
                font_size,
                content,
            } => {
                let lines = content.lines().count().max(1) as f32;
                Rect::from_min_size(
                    pos.to_pos2(),
                    Vec2::new(*width, font_size * 1.3 * lines),
                )
            }
            ObjectKind::Guide { rect } => rect.to_rect(),
        }
    }

    pub fn contains(&self, point: Point, tolerance: f32) -> bool {
        if !self.evented {
            return false;
        }
        let p = point.to_pos2();
        match &self.kind {
            ObjectKind::BaseImage { .. } | ObjectKind::Guide { .. } => false,
            ObjectKind::FreehandPath { points } => points.windows(2).any(|seg| {
                distance_to_segment(p, seg[0].to_pos2(), seg[1].to_pos2())
                    <= tolerance + self.stroke_width.px()
            }),
            ObjectKind::Rectangle { rect } => {
                let r = rect.to_rect();
                let expanded = r.expand(tolerance + self.stroke_width.px());
                if !expanded.contains(p) {
                    return false;
                }
                let inner = r.shrink((self.stroke_width.px() + tolerance).max(1.0));
                !inner.contains(p)
            }
            ObjectKind::Ellipse { rect } => {
                let r = rect.to_rect();
                let center = r.center();
                let radii = r.size() * 0.5;
                if radii.x <= 0.1 || radii.y <= 0.1 {
                    return false;
                }
                let nx = (p.x - center.x) / radii.x;
                let ny = (p.y - center.y) / radii.y;
                let d = nx * nx + ny * ny;
                let ring = (self.stroke_width.px() + tolerance) / radii.x.min(radii.y).max(1.0);
                (1.0 - ring).powi(2) <= d && d <= (1.0 + ring).powi(2)
            }
            ObjectKind::Arrow { from, to } => {
                distance_to_segment(p, from.to_pos2(), to.to_pos2())
                    <= tolerance + self.stroke_width.px()
            }
            ObjectKind::Textbox { .. } => self.bounds().expand(tolerance).contains(p),
        }
    }

    pub fn move_by(&mut self, delta: Vec2) {
        let move_point = |p: &mut Point| {
            p.x += delta.x;
            p.y += delta.y;
        };
        match &mut self.kind {
            ObjectKind::BaseImage { .. } => {}
            ObjectKind::FreehandPath { points } => points.iter_mut().for_each(move_point),
            ObjectKind::Rectangle { rect }
            | ObjectKind::Ellipse { rect }
            | ObjectKind::Guide { rect } => {
                move_point(&mut rect.min);
                move_point(&mut rect.max);
            }
            ObjectKind::Arrow { from, to } => {
                move_point(from);
                move_point(to);
            }
            ObjectKind::Textbox { pos, .. } => move_point(pos),
        }
    }

    pub fn handles(&self) -> Vec<(Handle, Point)> {
        match &self.kind {
            ObjectKind::Arrow { from, to } => {
                vec![(Handle::ArrowFrom, *from), (Handle::ArrowTo, *to)]
            }
            ObjectKind::Rectangle { rect } | ObjectKind::Ellipse { rect } => {
                let r = rect.to_rect();
                let c = r.center();
                vec![
                    (Handle::TopLeft, Point::from_pos2(r.left_top())),
                    (Handle::Top, Point::new(c.x, r.top())),
                    (Handle::TopRight, Point::from_pos2(r.right_top())),
                    (Handle::Right, Point::new(r.right(), c.y)),
                    (Handle::BottomRight, Point::from_pos2(r.right_bottom())),
                    (Handle::Bottom, Point::new(c.x, r.bottom())),
                    (Handle::BottomLeft, Point::from_pos2(r.left_bottom())),
                    (Handle::Left, Point::new(r.left(), c.y)),
                ]
            }
            _ => vec![],
        }
    }

    pub fn resize_from_handle(&mut self, handle: Handle, to: Point) {
        match &mut self.kind {
            ObjectKind::Arrow { from, to: target } => match handle {
                Handle::ArrowFrom => *from = to,
                Handle::ArrowTo => *target = to,
                _ => {}
            },
            ObjectKind::Rectangle { rect } | ObjectKind::Ellipse { rect } => {
                let mut r = rect.to_rect();
                match handle {
                    Handle::TopLeft => r.min = to.to_pos2(),
                    Handle::Top => r.min.y = to.y,
                    Handle::TopRight => {
                        r.min.y = to.y;
                        r.max.x = to.x;
                    }
                    Handle::Right => r.max.x = to.x,
                    Handle::BottomRight => r.max = to.to_pos2(),
                    Handle::Bottom => r.max.y = to.y,
                    Handle::BottomLeft => {
                        r.min.x = to.x;
                        r.max.y = to.y;
                    }
                    Handle::Left => r.min.x = to.x,
                    _ => {}
                }
                *rect = RectData::from_rect(r).normalize();
            }
            _ => {}
        }
    }
}

/// Rotation of the triangular arrow head, in degrees, so that it points
/// along the drag direction: `atan2(dy, dx) + 90`.
pub fn arrow_head_angle(from: Point, to: Point) -> f32 {
    (to.y - from.y).atan2(to.x - from.x).to_degrees() + 90.0
}

pub fn distance_to_segment(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let ap = point - a;
    let ab_len_sq = ab.length_sq();
    if ab_len_sq <= f32::EPSILON {
        return ap.length();
    }
    let t = (ap.dot(ab) / ab_len_sq).clamp(0.0, 1.0);
    let projection = a + ab * t;
    (point - projection).length()
}
