//! Repair arbitrary JSON into a well-formed [`ContentDocument`].
//!
//! Input is untrusted (editor local storage, legacy exports, hand edits), so
//! nothing here fails: every field that does not have the expected shape is
//! replaced by its own default while valid siblings are kept.

use serde_json::{Map, Value};

use super::id::BlockId;
use super::model::{
    Align, Background, BackgroundKind, Block, BlockKind, Booking, ButtonLink, Contacts,
    ContentDocument, Gradient, Grid, MapView, Media, Site, Spacer, TextContent, TextStyle,
    WorkingDay, MAX_GRID_DIMENSION, SCHEMA_VERSION,
};

const MIN_ZOOM: f64 = 1.0;
const MAX_ZOOM: f64 = 18.0;
const MIN_SLOT_MINUTES: f64 = 10.0;
const DEFAULT_SLOT_MINUTES: u32 = 60;
const DEFAULT_GRID_DIMENSION: u32 = 2;
const DEFAULT_CONTACTS_TITLE: &str = "Контакты";

/// Normalize a raw document. Non-objects yield [`ContentDocument::default`].
pub fn normalize(raw: &Value) -> ContentDocument {
    let base = ContentDocument::default();
    let Some(root) = raw.as_object() else {
        return base;
    };

    let empty = Map::new();
    let site = object_field(root, "site").unwrap_or(&empty);
    let title = string_field(site, "title").unwrap_or(base.site.title.as_str()).to_string();
    let subtitle = string_field(site, "subtitle")
        .unwrap_or(base.site.subtitle.as_str())
        .to_string();
    let background = normalize_background(site.get("background"), &base.site.background);

    let blocks = root
        .get("blocks")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(normalize_block).collect())
        .unwrap_or_default();

    ContentDocument {
        version: SCHEMA_VERSION,
        site: Site {
            title,
            subtitle,
            background,
        },
        blocks,
    }
}

fn normalize_background(raw: Option<&Value>, fallback: &Background) -> Background {
    let Some(bg) = raw.and_then(Value::as_object) else {
        return fallback.clone();
    };

    let kind = string_field(bg, "type")
        .and_then(BackgroundKind::parse)
        .unwrap_or(fallback.kind);
    let solid = string_field(bg, "solid").unwrap_or(fallback.solid.as_str()).to_string();

    let empty = Map::new();
    let gradient = object_field(bg, "gradient").unwrap_or(&empty);
    let from = string_field(gradient, "from")
        .unwrap_or(fallback.gradient.from.as_str())
        .to_string();
    let to = string_field(gradient, "to")
        .unwrap_or(fallback.gradient.to.as_str())
        .to_string();
    let angle = coerce_number(gradient.get("angle")).unwrap_or(fallback.gradient.angle);

    Background {
        kind,
        solid,
        gradient: Gradient { from, to, angle },
        image_data_url: string_field(bg, "imageDataUrl").map(str::to_string),
    }
}

/// Normalize one block. Returns `None` only when `raw` is not an object.
pub fn normalize_block(raw: &Value) -> Option<Block> {
    let b = raw.as_object()?;

    let kind = string_field(b, "type")
        .and_then(BlockKind::parse)
        .unwrap_or(BlockKind::Text);
    let id = string_field(b, "id")
        .and_then(BlockId::parse)
        .unwrap_or_else(BlockId::generate);
    let align = string_field(b, "align")
        .and_then(Align::parse)
        .unwrap_or_default();
    let background = normalize_background(b.get("background"), &Background::block_default());

    Some(Block {
        id,
        kind,
        align,
        background,
        text: object_field(b, "text").map(normalize_text),
        image: object_field(b, "image").and_then(normalize_media),
        video: object_field(b, "video").and_then(normalize_media),
        grid: object_field(b, "grid").map(normalize_grid),
        map: object_field(b, "map").and_then(normalize_map),
        booking: object_field(b, "booking").and_then(normalize_booking),
        button: object_field(b, "button").and_then(normalize_button),
        spacer: object_field(b, "spacer").and_then(normalize_spacer),
        contacts: object_field(b, "contacts").map(normalize_contacts),
    })
}

fn normalize_text(t: &Map<String, Value>) -> TextContent {
    let style = t.get("style");
    let flag = |name: &str| truthy(style.and_then(|s| s.get(name)));
    TextContent {
        value: string_field(t, "value").unwrap_or_default().to_string(),
        style: TextStyle {
            bold: flag("bold"),
            italic: flag("italic"),
            underline: flag("underline"),
        },
    }
}

fn normalize_media(m: &Map<String, Value>) -> Option<Media> {
    let src = string_field(m, "src")?;
    Some(Media {
        src: src.to_string(),
        alt: string_field(m, "alt").unwrap_or_default().to_string(),
    })
}

fn normalize_grid(g: &Map<String, Value>) -> Grid {
    let dimension = |name: &str| {
        coerce_number(g.get(name))
            .map(|n| n.floor().clamp(1.0, f64::from(MAX_GRID_DIMENSION)) as u32)
            .unwrap_or(DEFAULT_GRID_DIMENSION)
    };
    let cols = dimension("cols");
    let rows = dimension("rows");
    let needed = (cols * rows) as usize;

    let mut cells: Vec<Option<Block>> = g
        .get("cells")
        .and_then(Value::as_array)
        .map(|raw| raw.iter().take(needed).map(normalize_block).collect())
        .unwrap_or_default();
    cells.resize(needed, None);

    Grid { cols, rows, cells }
}

fn normalize_map(m: &Map<String, Value>) -> Option<MapView> {
    let lat = coerce_number(m.get("lat"))?;
    let lon = coerce_number(m.get("lon"))?;
    let zoom = coerce_number(m.get("zoom"))?;
    Some(MapView {
        lat,
        lon,
        zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
    })
}

fn normalize_booking(b: &Map<String, Value>) -> Option<Booking> {
    let title = string_field(b, "title")?.to_string();
    let slot_minutes = coerce_number(b.get("slotMinutes"))
        .map(|n| n.max(MIN_SLOT_MINUTES).floor() as u32)
        .unwrap_or(DEFAULT_SLOT_MINUTES);
    let days = match b.get("days").and_then(Value::as_array) {
        Some(raw) => raw.iter().filter_map(normalize_working_day).collect(),
        None => default_working_days(),
    };
    Some(Booking {
        title,
        slot_minutes,
        days,
    })
}

fn normalize_working_day(raw: &Value) -> Option<WorkingDay> {
    let d = raw.as_object()?;
    let dow = coerce_number(d.get("dow"))?;
    let start = string_field(d, "start")?;
    let end = string_field(d, "end")?;
    Some(WorkingDay {
        dow: dow.floor().clamp(1.0, 7.0) as u8,
        start: start.to_string(),
        end: end.to_string(),
    })
}

/// Monday to Friday, 10:00 to 18:00.
pub fn default_working_days() -> Vec<WorkingDay> {
    (1..=5)
        .map(|dow| WorkingDay {
            dow,
            start: "10:00".to_string(),
            end: "18:00".to_string(),
        })
        .collect()
}

fn normalize_button(b: &Map<String, Value>) -> Option<ButtonLink> {
    Some(ButtonLink {
        label: string_field(b, "label")?.to_string(),
        url: string_field(b, "url")?.to_string(),
    })
}

fn normalize_spacer(s: &Map<String, Value>) -> Option<Spacer> {
    let height = coerce_number(s.get("height"))?;
    Some(Spacer {
        height: height.max(0.0),
    })
}

fn normalize_contacts(c: &Map<String, Value>) -> Contacts {
    let field = |name: &str| string_field(c, name).unwrap_or_default().to_string();
    Contacts {
        title: string_field(c, "title")
            .unwrap_or(DEFAULT_CONTACTS_TITLE)
            .to_string(),
        phone: field("phone"),
        address: field("address"),
        instagram: field("instagram"),
    }
}

fn object_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    obj.get(key).and_then(Value::as_object)
}

fn string_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

/// Loose numeric coercion: numbers, numeric strings (blank = 0), booleans and
/// `null` (= 0). Missing, non-finite or structured values yield `None`.
pub(crate) fn coerce_number(raw: Option<&Value>) -> Option<f64> {
    let n = match raw? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().ok()?
            }
        }
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::Array(_) | Value::Object(_) => return None,
    };
    n.is_finite().then_some(n)
}

fn truthy(raw: Option<&Value>) -> bool {
    match raw {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}
