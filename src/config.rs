use std::{
    collections::{HashMap, HashSet},
    fmt, fs,
    path::{Path, PathBuf},
};

use anyhow::bail;
use serde::{de::Visitor, Deserialize};

use crate::brush::{BrushConfig, BrushSize, Color};

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Initial window size in logical pixels.
    pub width: u32,
    pub height: u32,
    /// Palette entry selected at startup.
    pub default_color: String,
    pub background_color: Color,
    /// Image shown beneath the drawing at startup.
    pub background: Option<PathBuf>,
    /// Where saved drawings go. Defaults to the platform's local data directory.
    pub output_dir: Option<PathBuf>,
    /// Program (and leading arguments) that receives the saved file's path on "share".
    pub share_command: Vec<String>,
    /// Widths of the small, medium and large brushes.
    pub brush_sizes: [f32; 3],
    #[serde(rename = "color")]
    pub palette: Vec<PaletteEntry>,
    pub bind: HashMap<Key, CommandVerb>,
}

impl Config {
    pub fn load<A: AsRef<Path>>(path: A) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("window size must be non-zero (got {}x{})", self.width, self.height);
        }

        if self.palette.is_empty() {
            bail!("there must be at least one [[color]] in the palette");
        }
        let mut names = HashSet::new();
        for entry in &self.palette {
            if !names.insert(entry.name.as_str()) {
                bail!("palette color '{}' is defined more than once", entry.name);
            }
        }
        if self.color(&self.default_color).is_none() {
            bail!(
                "`default_color = \"{}\"` does not name a palette color",
                self.default_color
            );
        }

        if let Some(bad) = self.brush_sizes.iter().find(|w| !w.is_finite() || **w <= 0.0) {
            bail!("brush sizes must be positive (found {bad})");
        }

        for (key, verb) in &self.bind {
            if let CommandVerb::Color(name) = verb {
                if self.color(name).is_none() {
                    bail!("key '{}' is bound to unknown palette color '{name}'", key.0);
                }
            }
        }

        Ok(())
    }

    pub fn color(&self, name: &str) -> Option<Color> {
        self.palette
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value)
    }

    pub fn brush_width(&self, size: BrushSize) -> f32 {
        self.brush_sizes[size.index()]
    }

    /// The brush in effect before the user picks anything.
    pub fn initial_brush(&self) -> BrushConfig {
        BrushConfig {
            color: self.color(&self.default_color).unwrap_or(Color::BLACK),
            width: self.brush_width(BrushSize::Small),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        dirs::data_local_dir()
            .map(|dir| dir.join(env!("CARGO_PKG_NAME")))
            .unwrap_or_else(|| PathBuf::from(env!("CARGO_PKG_NAME")))
            .join("kids")
    }
}

impl Default for Config {
    fn default() -> Self {
        let palette = [
            ("red", Color::rgb(0xff, 0x00, 0x00)),
            ("black", Color::BLACK),
            ("green", Color::rgb(0x00, 0xc8, 0x53)),
            ("blue", Color::rgb(0x29, 0x62, 0xff)),
            ("cyan", Color::rgb(0x00, 0xe5, 0xff)),
            ("purple", Color::rgb(0xaa, 0x00, 0xff)),
            ("yellow", Color::rgb(0xff, 0xd6, 0x00)),
        ]
        .into_iter()
        .map(|(name, value)| PaletteEntry {
            name: name.into(),
            value,
        })
        .collect();

        let bind = [
            ('z', CommandVerb::Undo),
            ('s', CommandVerb::Save),
            ('p', CommandVerb::Share),
            ('c', CommandVerb::NextColor),
            ('1', CommandVerb::WidthSmall),
            ('2', CommandVerb::WidthMedium),
            ('3', CommandVerb::WidthLarge),
        ]
        .into_iter()
        .map(|(c, verb)| (Key(c), verb))
        .collect();

        Self {
            width: 1024,
            height: 768,
            default_color: "black".into(),
            background_color: Color::WHITE,
            background: None,
            output_dir: None,
            share_command: Vec::new(),
            brush_sizes: [10.0, 20.0, 30.0],
            palette,
            bind,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaletteEntry {
    pub name: String,
    pub value: Color,
}

/// A key binding: one (case-insensitive) character as produced by the keyboard layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(pub char);

impl Key {
    pub fn from_text(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(Key(c.to_ascii_lowercase())),
            _ => None,
        }
    }
}

impl<'a> Deserialize<'a> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        struct FromStrVisitor;

        impl<'de> Visitor<'de> for FromStrVisitor {
            type Value = Key;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("single character key")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Key::from_text(v)
                    .ok_or_else(|| E::custom(format_args!("invalid key '{v}', expected one character")))
            }
        }

        deserializer.deserialize_str(FromStrVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum CommandVerb {
    #[serde(rename = "UNDO")]
    Undo,
    #[serde(rename = "SAVE")]
    Save,
    #[serde(rename = "SHARE")]
    Share,
    #[serde(rename = "NEXT_COLOR")]
    NextColor,
    #[serde(rename = "WIDTH_SMALL")]
    WidthSmall,
    #[serde(rename = "WIDTH_MEDIUM")]
    WidthMedium,
    #[serde(rename = "WIDTH_LARGE")]
    WidthLarge,
    #[serde(rename = "COLOR")]
    Color(String),
}
