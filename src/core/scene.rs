//! Declarative vector description of the stamp and its SVG serialization.
//!
//! A `Scene` is a plain tree of SVG nodes computed from the grade state and
//! the current layout. It never talks to a renderer; the exporter and the
//! preview parse its serialized form.

use crate::core::grade_state::GradeState;
use crate::core::layout::LayoutGeometry;
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fmt;
use std::io::Cursor;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const FONT_FAMILY: &str = "Trebuchet MS, Arial, sans-serif";
const GRADE_FONT_SIZE: &str = "65";
const MAX_GRADE_FONT_SIZE: &str = "35";
const MAX_GRADE_FILL: &str = "#D40000";
const OUTLINE_COLOR: &str = "#FFFFFF";

/// Default visible region of the stamp
pub const DEFAULT_VIEW_BOX: ViewBox = ViewBox {
    x: 0.0,
    y: 0.0,
    width: 200.0,
    height: 120.0,
};

/// Visible region of a scene, in user units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

impl fmt::Display for ViewBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.x, self.y, self.width, self.height)
    }
}

/// One SVG element
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub tag: &'static str,
    pub attrs: Vec<(&'static str, String)>,
    pub children: Vec<Node>,
    pub text: Option<String>,
}

impl Node {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl ToString) -> Self {
        self.attrs.push((name, value.to_string()));
        self
    }

    pub fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    fn write(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<()> {
        let mut start = BytesStart::new(self.tag);
        for (name, value) in &self.attrs {
            start.push_attribute((*name, value.as_str()));
        }

        if self.children.is_empty() && self.text.is_none() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if let Some(text) = &self.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.tag)))?;
        Ok(())
    }
}

/// The stamp scene
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    view_box: ViewBox,
    defs: Vec<Node>,
    content: Vec<Node>,
}

impl Scene {
    /// Build the stamp from the current values and layout
    pub fn compose(state: &GradeState, geometry: &LayoutGeometry) -> Self {
        let origin = geometry.grade_origin;
        let rotation = geometry.rotation_deg;

        let grade = Node::new("g")
            .attr(
                "transform",
                format!("rotate({}, {}, {})", rotation, origin.x, origin.y),
            )
            .child(grade_text(&state.display_grade(), origin.x, origin.y));

        let pivot = geometry.line.pivot;
        let underline = Node::new("path")
            .attr("d", geometry.line.path_data())
            .attr("stroke", "url(#lineGradient)")
            .attr("stroke-width", 3)
            .attr(
                "transform",
                format!("rotate({}, {}, {})", rotation, pivot.x, pivot.y),
            )
            .attr("filter", "url(#shadow)")
            .attr("fill", "none");

        let label = Node::new("text")
            .attr("x", geometry.max_label.x)
            .attr("y", geometry.max_label.y)
            .attr("font-family", FONT_FAMILY)
            .attr("font-size", MAX_GRADE_FONT_SIZE)
            .attr("fill", MAX_GRADE_FILL)
            .attr("text-anchor", "middle")
            .attr("filter", "url(#shadow)")
            .attr("paint-order", "stroke")
            .attr("stroke", OUTLINE_COLOR)
            .attr("stroke-width", 1)
            .attr("stroke-linecap", "round")
            .attr("stroke-linejoin", "round")
            .text(state.max_grade());

        Self {
            view_box: DEFAULT_VIEW_BOX,
            defs: vec![shadow_filter(), grade_gradient(), line_gradient()],
            content: vec![grade, underline, label],
        }
    }

    /// A bare scene holding only the grade glyphs, unrotated, for measuring
    pub fn grade_measurement(display_grade: &str, origin_x: f32, origin_y: f32) -> Self {
        Self {
            view_box: DEFAULT_VIEW_BOX,
            defs: Vec::new(),
            content: vec![grade_glyphs(display_grade, origin_x, origin_y)],
        }
    }

    pub fn view_box(&self) -> ViewBox {
        self.view_box
    }

    pub fn content(&self) -> &[Node] {
        &self.content
    }

    /// Isolated copy of the scene showing only `view_box`
    pub fn with_view_box(&self, view_box: ViewBox) -> Self {
        let mut copy = self.clone();
        copy.view_box = view_box;
        copy
    }

    /// Serialize to a self-contained SVG document. The root carries no
    /// width/height, so the intrinsic size equals the view box.
    pub fn to_svg(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = Node::new("svg")
            .attr("xmlns", SVG_NS)
            .attr("viewBox", self.view_box);
        if !self.defs.is_empty() {
            let mut defs = Node::new("defs");
            defs.children = self.defs.clone();
            root = root.child(defs);
        }
        root.children.extend(self.content.iter().cloned());
        root.write(&mut writer)?;

        Ok(String::from_utf8(writer.into_inner().into_inner())?)
    }
}

/// Grade text with font settings only; no paint servers or filters
fn grade_glyphs(content: &str, x: f32, y: f32) -> Node {
    Node::new("text")
        .attr("x", x)
        .attr("y", y)
        .attr("font-family", FONT_FAMILY)
        .attr("font-size", GRADE_FONT_SIZE)
        .attr("font-weight", "bold")
        .text(content)
}

fn grade_text(content: &str, x: f32, y: f32) -> Node {
    grade_glyphs(content, x, y)
        .attr("fill", "url(#gradeGradient)")
        .attr("filter", "url(#shadow)")
        .attr("paint-order", "stroke")
        .attr("stroke", OUTLINE_COLOR)
        .attr("stroke-width", 2)
        .attr("stroke-linecap", "round")
        .attr("stroke-linejoin", "round")
}

fn shadow_filter() -> Node {
    Node::new("filter")
        .attr("id", "shadow")
        .attr("x", "-20%")
        .attr("y", "-20%")
        .attr("width", "140%")
        .attr("height", "140%")
        .child(
            Node::new("feGaussianBlur")
                .attr("in", "SourceAlpha")
                .attr("stdDeviation", 1.5),
        )
        .child(Node::new("feOffset").attr("dx", 1.5).attr("dy", 1.5))
        .child(
            Node::new("feComponentTransfer").child(
                Node::new("feFuncA")
                    .attr("type", "linear")
                    .attr("slope", 0.4),
            ),
        )
        .child(
            Node::new("feMerge")
                .child(Node::new("feMergeNode"))
                .child(Node::new("feMergeNode").attr("in", "SourceGraphic")),
        )
}

fn grade_gradient() -> Node {
    Node::new("linearGradient")
        .attr("id", "gradeGradient")
        .attr("x1", "0%")
        .attr("y1", "0%")
        .attr("x2", "100%")
        .attr("y2", "100%")
        .child(stop("0%", "#FF0000"))
        .child(stop("50%", "#FF0000"))
        .child(stop("100%", "#CC0000"))
}

fn line_gradient() -> Node {
    Node::new("linearGradient")
        .attr("id", "lineGradient")
        .attr("x1", "0%")
        .attr("y1", "0%")
        .attr("x2", "100%")
        .attr("y2", "0%")
        .child(stop("0%", "#FF0000"))
        .child(stop("100%", "#CC0000"))
}

fn stop(offset: &str, color: &str) -> Node {
    Node::new("stop")
        .attr("offset", offset)
        .attr("stop-color", color)
}
