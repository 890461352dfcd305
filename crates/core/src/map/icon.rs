use std::fmt::Write;

pub const PIN_CLASS: &str = "custom-marker";

/// Pin-shaped marker icon, anchored at its tip.
#[derive(Clone, Debug, PartialEq)]
pub struct IconSpec {
    pub color: String,
    pub size: [u32; 2],
    pub anchor: [i32; 2],
    pub popup_anchor: [i32; 2],
    pub class_name: String,
}

impl IconSpec {
    pub fn pin(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            size: [32, 40],
            anchor: [16, 40],
            popup_anchor: [0, -40],
            class_name: PIN_CLASS.to_string(),
        }
    }

    /// SVG markup of the pin, filled with `color`.
    pub fn svg(&self) -> String {
        let [width, height] = self.size;
        let mut svg = String::new();

        let _ = write!(
            svg,
            r#"<svg width="{width}" height="{height}" viewBox="0 0 32 40" fill="none" xmlns="http://www.w3.org/2000/svg">"#
        );
        let _ = write!(
            svg,
            r#"<path d="M16 0C7.16344 0 0 7.16344 0 16C0 28 16 40 16 40S32 28 32 16C32 7.16344 24.8366 0 16 0Z" fill="{}" stroke="white" stroke-width="2"/>"#,
            escape_attribute(&self.color)
        );
        svg.push_str(r#"<circle cx="16" cy="15" r="5" fill="white"/></svg>"#);

        svg
    }
}

pub fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svg_fills_with_color() {
        let svg = IconSpec::pin("#ff0000").svg();
        assert!(svg.starts_with("<svg width=\"32\" height=\"40\""));
        assert!(svg.contains("fill=\"#ff0000\""));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn svg_escapes_hostile_color() {
        let svg = IconSpec::pin("red\" onload=\"x").svg();
        assert!(!svg.contains("onload=\"x"));
        assert!(svg.contains("red&quot; onload=&quot;x"));
    }
}
