use std::fmt::Write;

use pointmap_core::map::icon::escape_attribute;

use crate::scene::MapSnapshot;

/// A JavaScript string literal that is also safe inside a `<script>` block.
pub fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace("</", "<\\/")
}

/// Leaflet calls that rebuild `snapshot` in the browser.
pub fn map_script(snapshot: &MapSnapshot) -> String {
    let mut js = String::new();
    let [lat, lng] = snapshot.view.center;

    let _ = writeln!(
        js,
        "const map = L.map({}).setView([{lat}, {lng}], {});",
        js_string(snapshot.container.as_str()),
        snapshot.view.zoom
    );

    for tiles in &snapshot.tiles {
        let _ = writeln!(
            js,
            "L.tileLayer({}, {{ attribution: {}, maxZoom: {} }}).addTo(map);",
            js_string(&tiles.url_template),
            js_string(&tiles.attribution),
            tiles.max_zoom
        );
    }

    for marker in &snapshot.markers {
        let icon = &marker.icon;
        let _ = write!(
            js,
            "L.marker([{}, {}], {{ icon: L.divIcon({{ html: {}, className: {}, iconSize: [{}, {}], iconAnchor: [{}, {}], popupAnchor: [{}, {}] }}) }}).addTo(map)",
            marker.position.y(),
            marker.position.x(),
            js_string(&icon.svg()),
            js_string(&icon.class_name),
            icon.size[0],
            icon.size[1],
            icon.anchor[0],
            icon.anchor[1],
            icon.popup_anchor[0],
            icon.popup_anchor[1],
        );
        // leaflet parses popup strings as HTML
        if let Some(popup) = &marker.popup {
            let _ = write!(js, ".bindPopup({})", js_string(&escape_attribute(popup)));
        }
        js.push_str(";\n");
    }

    js
}
