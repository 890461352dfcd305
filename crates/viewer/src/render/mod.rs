use std::fmt::Write;

use pointmap_core::map::icon::escape_attribute;

use crate::scene::MapSnapshot;

pub mod script;

/// What the page shows in place of the map.
pub enum PageBody<'a> {
    Map(&'a MapSnapshot),
    /// Still waiting on resources.
    Loading,
    Fallback { reason: &'a str },
}

pub fn render_page(head: &str, container: &str, body: PageBody<'_>) -> String {
    let container = escape_attribute(container);
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Point map</title>\n");
    html.push_str(head);
    html.push_str(
        "<style>html,body{margin:0;height:100%}.map{width:100%;height:100%}\
         .custom-marker{background:none;border:none}\
         .map-fallback{display:flex;align-items:center;justify-content:center;\
         height:100%;font-family:sans-serif;color:#666}</style>\n",
    );
    html.push_str("</head>\n<body>\n");

    match body {
        PageBody::Map(snapshot) => {
            let _ = writeln!(html, "<div id=\"{container}\" class=\"map\"></div>");
            let _ = writeln!(html, "<script>\n{}</script>", script::map_script(snapshot));
        }
        PageBody::Loading => {
            let _ = writeln!(
                html,
                "<div id=\"{container}\" class=\"map map-fallback\">Loading map…</div>"
            );
        }
        PageBody::Fallback { reason } => {
            let _ = writeln!(
                html,
                "<div id=\"{container}\" class=\"map map-fallback\">Map unavailable: {}</div>",
                escape_attribute(reason)
            );
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}
