use serde::{Deserialize, Serialize};

use super::id::BlockId;

/// Schema tag written on every normalized document.
pub const SCHEMA_VERSION: u32 = 1;

/// Upper bound for grid `cols` and `rows`.
pub const MAX_GRID_DIMENSION: u32 = 24;

/// Root of the published site: `content.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDocument {
    pub version: u32,
    pub site: Site,
    pub blocks: Vec<Block>,
}

impl Default for ContentDocument {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            site: Site {
                title: "Булочки & Тортики".to_string(),
                subtitle: "Домашняя выпечка на заказ".to_string(),
                background: Background::site_default(),
            },
            blocks: Vec::new(),
        }
    }
}

impl ContentDocument {
    /// Visit every block depth-first: a block, then its grid cells row-major.
    pub fn walk_blocks<'a>(&'a self, f: &mut impl FnMut(&'a Block)) {
        fn walk<'a>(blocks: impl Iterator<Item = &'a Block>, f: &mut impl FnMut(&'a Block)) {
            for block in blocks {
                f(block);
                if let Some(grid) = &block.grid {
                    walk(grid.cells.iter().flatten(), &mut *f);
                }
            }
        }
        walk(self.blocks.iter(), f);
    }

    /// Mutable, fallible counterpart of [`ContentDocument::walk_blocks`].
    /// Stops at the first error.
    pub fn try_walk_blocks_mut<E>(
        &mut self,
        f: &mut impl FnMut(&mut Block) -> Result<(), E>,
    ) -> Result<(), E> {
        fn walk<'a, E>(
            blocks: impl Iterator<Item = &'a mut Block>,
            f: &mut impl FnMut(&mut Block) -> Result<(), E>,
        ) -> Result<(), E> {
            for block in blocks {
                f(block)?;
                if let Some(grid) = &mut block.grid {
                    walk(grid.cells.iter_mut().flatten(), &mut *f)?;
                }
            }
            Ok(())
        }
        walk(self.blocks.iter_mut(), f)
    }

    /// Total number of blocks, nested grid cells included.
    pub fn block_count(&self) -> usize {
        let mut count = 0;
        self.walk_blocks(&mut |_| count += 1);
        count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub title: String,
    pub subtitle: String,
    pub background: Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    Solid,
    Gradient,
    Image,
}

impl BackgroundKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "solid" => Some(Self::Solid),
            "gradient" => Some(Self::Gradient),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    pub from: String,
    pub to: String,
    /// Degrees.
    pub angle: f64,
}

/// Background of the site or of a single block.
///
/// Only `kind` decides what is rendered, but every variant's payload is kept
/// so switching back and forth between kinds never loses data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Background {
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
    pub solid: String,
    pub gradient: Gradient,
    /// Inline `data:` payload before publish, `/assets/...` path after.
    pub image_data_url: Option<String>,
}

/// The active variant of a [`Background`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill<'a> {
    Solid(&'a str),
    Gradient(&'a Gradient),
    /// An image background without an image falls back to its solid color.
    Image { src: &'a str },
}

impl Background {
    pub fn site_default() -> Self {
        Self {
            kind: BackgroundKind::Gradient,
            solid: "#0b0b10".to_string(),
            gradient: Gradient {
                from: "#0b0b10".to_string(),
                to: "#1b1330".to_string(),
                angle: 25.0,
            },
            image_data_url: None,
        }
    }

    pub fn block_default() -> Self {
        Self {
            kind: BackgroundKind::Solid,
            solid: "#11111a".to_string(),
            gradient: Gradient {
                from: "#11111a".to_string(),
                to: "#1d1633".to_string(),
                angle: 20.0,
            },
            image_data_url: None,
        }
    }

    pub fn fill(&self) -> Fill<'_> {
        match (self.kind, self.image_data_url.as_deref()) {
            (BackgroundKind::Solid, _) | (BackgroundKind::Image, None) => Fill::Solid(&self.solid),
            (BackgroundKind::Gradient, _) => Fill::Gradient(&self.gradient),
            (BackgroundKind::Image, Some(src)) => Fill::Image { src },
        }
    }

    /// Switch the active variant. Inactive payloads are left in place.
    pub fn set_kind(&mut self, kind: BackgroundKind) {
        self.kind = kind;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Image,
    Video,
    Mixed,
    Grid,
    Map,
    Booking,
    Button,
    Contacts,
    Divider,
    Spacer,
}

impl BlockKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "mixed" => Some(Self::Mixed),
            "grid" => Some(Self::Grid),
            "map" => Some(Self::Map),
            "booking" => Some(Self::Booking),
            "button" => Some(Self::Button),
            "contacts" => Some(Self::Contacts),
            "divider" => Some(Self::Divider),
            "spacer" => Some(Self::Spacer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
    pub style: TextStyle,
}

/// Image or video source. `src` may hold an inline `data:` payload until publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub src: String,
    pub alt: String,
}

/// Fixed `cols × rows` matrix of optional nested blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub cols: u32,
    pub rows: u32,
    /// Row-major; always exactly `cols * rows` long once normalized.
    pub cells: Vec<Option<Block>>,
}

impl Grid {
    /// An empty grid with every cell vacant.
    pub fn new(cols: u32, rows: u32) -> Self {
        let cols = cols.clamp(1, MAX_GRID_DIMENSION);
        let rows = rows.clamp(1, MAX_GRID_DIMENSION);
        Self {
            cols,
            rows,
            cells: vec![None; (cols * rows) as usize],
        }
    }

    pub fn capacity(&self) -> usize {
        (self.cols * self.rows) as usize
    }

    /// Cell at `(col, row)`, if in range and occupied.
    pub fn cell(&self, col: u32, row: u32) -> Option<&Block> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.cells
            .get((row * self.cols + col) as usize)
            .and_then(Option::as_ref)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub lat: f64,
    pub lon: f64,
    pub zoom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub title: String,
    pub slot_minutes: u32,
    pub days: Vec<WorkingDay>,
}

/// Opening hours for one weekday. `dow` is ISO: 1 = Monday .. 7 = Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingDay {
    pub dow: u8,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spacer {
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contacts {
    pub title: String,
    pub phone: String,
    pub address: String,
    pub instagram: String,
}

/// One content block.
///
/// The wire shape carries every payload slot on every block (`null` when
/// unused). [`Block::content`] gives the typed view for the active `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub align: Align,
    pub background: Background,
    pub text: Option<TextContent>,
    pub image: Option<Media>,
    pub video: Option<Media>,
    pub grid: Option<Grid>,
    pub map: Option<MapView>,
    pub booking: Option<Booking>,
    pub button: Option<ButtonLink>,
    pub spacer: Option<Spacer>,
    pub contacts: Option<Contacts>,
}

/// Payload of the active block variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockContent<'a> {
    Text(&'a TextContent),
    Image(&'a Media),
    Video(&'a Media),
    Mixed {
        text: Option<&'a TextContent>,
        image: Option<&'a Media>,
    },
    Grid(&'a Grid),
    Map(&'a MapView),
    Booking(&'a Booking),
    Button(&'a ButtonLink),
    Contacts(&'a Contacts),
    Spacer(&'a Spacer),
    Divider,
    /// The kind's payload slot is empty.
    Missing(BlockKind),
}

impl Block {
    /// A fresh block of `kind` with a new id, default background and no payload.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: BlockId::generate(),
            kind,
            align: Align::Left,
            background: Background::block_default(),
            text: None,
            image: None,
            video: None,
            grid: None,
            map: None,
            booking: None,
            button: None,
            spacer: None,
            contacts: None,
        }
    }

    pub fn content(&self) -> BlockContent<'_> {
        let kind = self.kind;
        let content = match kind {
            BlockKind::Text => self.text.as_ref().map(BlockContent::Text),
            BlockKind::Image => self.image.as_ref().map(BlockContent::Image),
            BlockKind::Video => self.video.as_ref().map(BlockContent::Video),
            BlockKind::Mixed => match (self.text.as_ref(), self.image.as_ref()) {
                (None, None) => None,
                (text, image) => Some(BlockContent::Mixed { text, image }),
            },
            BlockKind::Grid => self.grid.as_ref().map(BlockContent::Grid),
            BlockKind::Map => self.map.as_ref().map(BlockContent::Map),
            BlockKind::Booking => self.booking.as_ref().map(BlockContent::Booking),
            BlockKind::Button => self.button.as_ref().map(BlockContent::Button),
            BlockKind::Contacts => self.contacts.as_ref().map(BlockContent::Contacts),
            BlockKind::Spacer => self.spacer.as_ref().map(BlockContent::Spacer),
            BlockKind::Divider => Some(BlockContent::Divider),
        };
        content.unwrap_or(BlockContent::Missing(kind))
    }
}
