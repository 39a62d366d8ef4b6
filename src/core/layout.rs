//! Fixed stamp geometry plus the parts that follow the measured grade width.

/// Left margin of the grade text, in scene user units
pub const LEFT_MARGIN: f32 = 30.0;
/// Baseline of the grade text
pub const GRADE_Y: f32 = 70.0;
/// Baseline of the max grade label
pub const MAX_GRADE_Y: f32 = 115.0;
/// Rotation applied to the grade and the underline, in degrees
pub const ROTATION_DEG: f32 = -7.0;
/// Width assumed before the grade text has ever been measured
pub const PROVISIONAL_TEXT_WIDTH: f32 = 80.0;

const LINE_DROP: f32 = 15.0;
const LINE_SAG: f32 = 20.0;
const LINE_OVERHANG: f32 = 15.0;
const LABEL_SHIFT: f32 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Quadratic underline drawn below the grade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadLine {
    pub start: Point,
    pub control: Point,
    pub end: Point,
    /// Rotation pivot (the line start)
    pub pivot: Point,
}

impl QuadLine {
    /// SVG path data for the curve
    pub fn path_data(&self) -> String {
        format!(
            "M {} {} Q {} {}, {} {}",
            self.start.x, self.start.y, self.control.x, self.control.y, self.end.x, self.end.y
        )
    }
}

/// Everything needed to place the stamp elements
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutGeometry {
    pub left_margin: f32,
    pub grade_origin: Point,
    pub rotation_deg: f32,
    pub line: QuadLine,
    pub max_label: Point,
    /// Width the dependent geometry was computed from
    pub text_width: f32,
}

impl LayoutGeometry {
    pub fn for_text_width(text_width: f32) -> Self {
        let gx = LEFT_MARGIN;
        let gy = GRADE_Y;
        let half = text_width / 2.0;

        Self {
            left_margin: LEFT_MARGIN,
            grade_origin: Point::new(gx, gy),
            rotation_deg: ROTATION_DEG,
            line: QuadLine {
                start: Point::new(gx, gy + LINE_DROP),
                control: Point::new(gx + half, gy + LINE_SAG),
                end: Point::new(gx + text_width + LINE_OVERHANG, gy + LINE_DROP),
                pivot: Point::new(gx, gy + LINE_DROP),
            },
            max_label: Point::new(gx + half + LABEL_SHIFT, MAX_GRADE_Y),
            text_width,
        }
    }
}
