//! Component parameters and their bindings.
//!
//! A parameter is a typed, named knob on a component. Each one is bound to
//! exactly one field of one template node, addressed by the node's
//! `template_uid` and a closed `(bucket, field)` target, never a free-form
//! path. Instances supply raw override values; resolution coerces them
//! against the declared type and falls back to the default when they do not
//! fit.

use crate::id::NodeId;
use crate::model::{Color, Direction, Layout, NodeProps, Style};
use serde::{Deserialize, Serialize};

// ─── Definitions ─────────────────────────────────────────────────────────

/// The declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    /// Hex color string (`#RRGGBB`, `#RGB`, …).
    Color,
    /// One of a fixed set of strings.
    Enum { options: Vec<String> },
}

/// A resolved, type-valid parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Color(Color),
}

impl ParamType {
    /// Coerce a raw JSON value to this type. `None` when the shape or the
    /// primitive type does not match.
    pub fn coerce(&self, raw: &serde_json::Value) -> Option<ParamValue> {
        use serde_json::Value;
        match (self, raw) {
            (ParamType::String, Value::String(s)) => Some(ParamValue::Text(s.clone())),
            (ParamType::Number, Value::Number(n)) => {
                // Bound fields are f32; anything wider would become infinite.
                n.as_f64()
                    .filter(|f| f.is_finite() && f.abs() <= f64::from(f32::MAX))
                    .map(ParamValue::Number)
            }
            (ParamType::Boolean, Value::Bool(b)) => Some(ParamValue::Boolean(*b)),
            (ParamType::Color, Value::String(s)) => Color::from_hex(s).map(ParamValue::Color),
            (ParamType::Enum { options }, Value::String(s)) if options.contains(s) => {
                Some(ParamValue::Text(s.clone()))
            }
            _ => None,
        }
    }
}

/// Addressable fields in the `props` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropField {
    Text,
    Src,
    Alt,
    Icon,
    Clip,
}

/// Addressable fields in the `style` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StyleField {
    FillColor,
    TextColor,
    StrokeColor,
    StrokeWidth,
    CornerRadius,
    Opacity,
    FontSize,
    FontWeight,
}

/// Addressable fields in the `layout` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutField {
    Width,
    Height,
    Gap,
    Padding,
    Direction,
    Visible,
}

/// The `(bucket, field)` pair a binding writes to. Serialized as
/// `{"bucket": "props", "field": "text"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "bucket", content = "field", rename_all = "camelCase")]
pub enum BindingTarget {
    Props(PropField),
    Style(StyleField),
    Layout(LayoutField),
}

/// Where a parameter's value lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamBinding {
    pub target_template_uid: NodeId,
    pub target: BindingTarget,
}

/// A typed parameter on a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentParamDef {
    /// Unique within the component.
    pub key: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub default_value: serde_json::Value,
    /// Property-panel grouping only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub binding: ParamBinding,
}

impl ComponentParamDef {
    pub fn new(
        key: impl Into<String>,
        param_type: ParamType,
        default_value: serde_json::Value,
        target_template_uid: NodeId,
        target: BindingTarget,
    ) -> Self {
        Self {
            key: key.into(),
            param_type,
            default_value,
            group: None,
            binding: ParamBinding {
                target_template_uid,
                target,
            },
        }
    }

    /// The default coerced to the declared type; `None` if the definition
    /// itself is malformed.
    pub fn resolved_default(&self) -> Option<ParamValue> {
        self.param_type.coerce(&self.default_value)
    }
}

// ─── Application ─────────────────────────────────────────────────────────

impl ParamValue {
    /// Text rendition for string-typed fields.
    fn as_text(&self) -> String {
        match self {
            ParamValue::Text(s) => s.clone(),
            ParamValue::Number(n) => format_number(*n),
            ParamValue::Boolean(b) => b.to_string(),
            ParamValue::Color(c) => c.to_hex(),
        }
    }

    fn as_number(&self) -> Option<f32> {
        match self {
            ParamValue::Number(n) => Some(*n as f32),
            _ => None,
        }
    }

    fn as_color(&self) -> Option<Color> {
        match self {
            ParamValue::Color(c) => Some(*c),
            ParamValue::Text(s) => Color::from_hex(s),
            _ => None,
        }
    }
}

/// `3.0` → `"3"`, `2.5` → `"2.5"`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Write `value` into the field addressed by `target`.
///
/// Returns `false` (and leaves the node untouched) when the field does not
/// exist on this node type or the value cannot represent it.
pub fn apply_binding(
    target: BindingTarget,
    value: &ParamValue,
    props: &mut NodeProps,
    style: &mut Style,
    layout: &mut Layout,
) -> bool {
    match target {
        BindingTarget::Props(field) => apply_prop(field, value, props),
        BindingTarget::Style(field) => apply_style(field, value, style),
        BindingTarget::Layout(field) => apply_layout(field, value, layout),
    }
}

fn apply_prop(field: PropField, value: &ParamValue, props: &mut NodeProps) -> bool {
    match (field, props) {
        (PropField::Text, NodeProps::Text(p)) => p.text = value.as_text(),
        (PropField::Src, NodeProps::Image(p)) => p.src = value.as_text(),
        (PropField::Alt, NodeProps::Image(p)) => p.alt = Some(value.as_text()),
        (PropField::Icon, NodeProps::Icon(p)) => p.icon = value.as_text(),
        (PropField::Clip, NodeProps::Container(p)) => match value {
            ParamValue::Boolean(b) => p.clip = *b,
            _ => return false,
        },
        _ => return false,
    }
    true
}

fn apply_style(field: StyleField, value: &ParamValue, style: &mut Style) -> bool {
    let slot = match field {
        StyleField::FillColor => &mut style.fill_color,
        StyleField::TextColor => &mut style.text_color,
        StyleField::StrokeColor => &mut style.stroke_color,
        StyleField::StrokeWidth => return set_number(&mut style.stroke_width, value),
        StyleField::CornerRadius => return set_number(&mut style.corner_radius, value),
        StyleField::Opacity => {
            return match value.as_number() {
                Some(n) => {
                    style.opacity = Some(n.clamp(0.0, 1.0));
                    true
                }
                None => false,
            };
        }
        StyleField::FontSize => return set_number(&mut style.font_size, value),
        StyleField::FontWeight => {
            return match value.as_number() {
                Some(n) => {
                    style.font_weight = Some(n.round().clamp(1.0, 1000.0) as u16);
                    true
                }
                None => false,
            };
        }
    };
    match value.as_color() {
        Some(c) => {
            *slot = Some(c);
            true
        }
        None => false,
    }
}

fn apply_layout(field: LayoutField, value: &ParamValue, layout: &mut Layout) -> bool {
    match field {
        LayoutField::Width => set_number(&mut layout.width, value),
        LayoutField::Height => set_number(&mut layout.height, value),
        LayoutField::Gap => set_number(&mut layout.gap, value),
        LayoutField::Padding => set_number(&mut layout.padding, value),
        LayoutField::Direction => {
            let direction = match value {
                ParamValue::Text(s) if s == "row" => Direction::Row,
                ParamValue::Text(s) if s == "column" => Direction::Column,
                _ => return false,
            };
            layout.direction = Some(direction);
            true
        }
        LayoutField::Visible => match value {
            ParamValue::Boolean(b) => {
                layout.visible = Some(*b);
                true
            }
            _ => false,
        },
    }
}

fn set_number(slot: &mut Option<f32>, value: &ParamValue) -> bool {
    match value.as_number() {
        Some(n) => {
            *slot = Some(n);
            true
        }
        None => false,
    }
}

// ─── Legacy overrides ────────────────────────────────────────────────────

/// Apply a deprecated per-node override entry of the shape
/// `{"props": {"text": "…"}, "style": {"opacity": 0.5}}`.
///
/// Only `props.text` / `props.src` / `props.icon` (strings) and
/// `style.opacity` (number) are honoured. Anything else is ignored.
pub fn apply_legacy_override(
    entry: &serde_json::Value,
    props: &mut NodeProps,
    style: &mut Style,
) -> bool {
    let mut applied = false;

    if let Some(p) = entry.get("props").and_then(serde_json::Value::as_object) {
        let pick = |key: &str| p.get(key).and_then(serde_json::Value::as_str);
        match props {
            NodeProps::Text(t) => {
                if let Some(text) = pick("text") {
                    t.text = text.to_string();
                    applied = true;
                }
            }
            NodeProps::Image(i) => {
                if let Some(src) = pick("src") {
                    i.src = src.to_string();
                    applied = true;
                }
            }
            NodeProps::Icon(i) => {
                if let Some(icon) = pick("icon") {
                    i.icon = icon.to_string();
                    applied = true;
                }
            }
            _ => {}
        }
    }

    if let Some(opacity) = entry
        .get("style")
        .and_then(|s| s.get("opacity"))
        .and_then(serde_json::Value::as_f64)
        .filter(|o| o.is_finite())
    {
        style.opacity = Some((opacity as f32).clamp(0.0, 1.0));
        applied = true;
    }

    applied
}
