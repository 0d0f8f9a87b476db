use anyhow::bail;
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt::{self, Display};

/// Backlight color. Each channel is an intensity in [0, 1]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Color {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);
    pub const OFF: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }

    fn is_valid(self) -> bool {
        [self.red, self.green, self.blue]
            .iter()
            .all(|channel| (0.0..=1.0).contains(channel))
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.red, self.green, self.blue)
    }
}

/// A named backlight color, as shown in the menu and written by the settings
/// process
#[derive(Clone, Debug, PartialEq)]
pub struct ColorEntry {
    pub name: String,
    pub rgb: Color,
}

/// Ordered, immutable list of selectable colors. Order is the order the menu
/// cycles through them.
#[derive(Clone, Debug)]
pub struct Catalog {
    entries: IndexMap<String, ColorEntry>,
}

impl Catalog {
    const BUILTIN: [(&'static str, Color); 8] = [
        ("Red", Color::new(1.0, 0.0, 0.0)),
        ("Green", Color::new(0.0, 1.0, 0.0)),
        ("Blue", Color::new(0.0, 0.0, 1.0)),
        ("Yellow", Color::new(1.0, 1.0, 0.0)),
        ("Teal", Color::new(0.0, 1.0, 1.0)),
        ("Violet", Color::new(1.0, 0.0, 1.0)),
        ("White", Color::WHITE),
        ("Off", Color::OFF),
    ];

    /// Build a catalog, rejecting empty lists, duplicate names, and
    /// out-of-range channels
    pub fn new(entries: Vec<ColorEntry>) -> anyhow::Result<Self> {
        if entries.is_empty() {
            bail!("Color catalog cannot be empty");
        }
        if let Some(name) =
            entries.iter().map(|entry| &entry.name).duplicates().next()
        {
            bail!("Duplicate color `{name}` in catalog");
        }
        if let Some(entry) = entries.iter().find(|entry| !entry.rgb.is_valid())
        {
            bail!(
                "Color `{}` has channel outside [0, 1]: {}",
                entry.name,
                entry.rgb
            );
        }

        let entries = entries
            .into_iter()
            .map(|entry| (entry.name.clone(), entry))
            .collect();
        Ok(Self { entries })
    }

    /// The stock 8 colors
    pub fn builtin() -> anyhow::Result<Self> {
        Self::new(
            Self::BUILTIN
                .iter()
                .map(|&(name, rgb)| ColorEntry {
                    name: name.into(),
                    rgb,
                })
                .collect(),
        )
    }

    /// Look up a color by exact (case-sensitive) name
    pub fn get(&self, name: &str) -> Option<&ColorEntry> {
        self.entries.get(name)
    }

    pub fn get_index(&self, index: usize) -> Option<&ColorEntry> {
        self.entries.get_index(index).map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
