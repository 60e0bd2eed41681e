use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Semantic bucket of an imported solid, inferred from its name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Buildings,
    Vegetation,
    RoadsInfrastructure,
    Vehicles,
    Furniture,
    Lighting,
    WaterFeatures,
    Terrain,
    SignsSignals,
    StreetFurniture,
    WallsBarriers,
    Other,
}

// The order of this table is the matching priority: the first rule with a keyword
// contained in the name wins.
static RULES: &[(Category, &[&str])] = &[
    (Category::Buildings, &[
        "building", "house", "tower", "roof", "facade", "apartment", "office", "skyscraper",
        "church", "garage", "shed", "hall",
    ]),
    (Category::Vegetation, &[
        "tree", "plant", "bush", "shrub", "grass", "garden", "hedge", "flower", "forest", "palm",
        "leaf", "vegetation",
    ]),
    (Category::RoadsInfrastructure, &[
        "road", "sidewalk", "pavement", "path", "bridge", "highway", "crossing", "curb",
        "asphalt", "parking", "rail",
    ]),
    (Category::Vehicles, &[
        "car", "vehicle", "bus", "truck", "bike", "bicycle", "train", "tram", "van", "motorcycle",
    ]),
    (Category::Furniture, &[
        "furniture", "chair", "table", "sofa", "desk", "bed", "shelf", "cabinet",
    ]),
    (Category::Lighting, &[
        "light", "lamp", "lantern", "illumination",
    ]),
    (Category::WaterFeatures, &[
        "water", "fountain", "pond", "lake", "river", "pool", "canal", "stream",
    ]),
    (Category::Terrain, &[
        "terrain", "ground", "land", "hill", "mountain", "soil", "earth", "topography",
    ]),
    (Category::SignsSignals, &[
        "sign", "traffic", "billboard", "marker",
    ]),
    (Category::StreetFurniture, &[
        "bench", "bin", "trash", "bollard", "hydrant", "kiosk", "mailbox",
    ]),
    (Category::WallsBarriers, &[
        "wall", "fence", "barrier", "gate",
    ]),
];

/// Maps a solid name to its category. Matching is case-insensitive and by substring.
pub fn categorize(name: &str) -> Category {
    let name = name.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k)))
        .map(|&(category, _)| category)
        .unwrap_or(Category::Other)
}

impl Category {
    /// Every category, in matching priority order.
    pub const ALL: [Category; 12] = [
        Category::Buildings,
        Category::Vegetation,
        Category::RoadsInfrastructure,
        Category::Vehicles,
        Category::Furniture,
        Category::Lighting,
        Category::WaterFeatures,
        Category::Terrain,
        Category::SignsSignals,
        Category::StreetFurniture,
        Category::WallsBarriers,
        Category::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Buildings => "Buildings",
            Category::Vegetation => "Vegetation",
            Category::RoadsInfrastructure => "Roads & Infrastructure",
            Category::Vehicles => "Vehicles",
            Category::Furniture => "Furniture",
            Category::Lighting => "Lighting",
            Category::WaterFeatures => "Water Features",
            Category::Terrain => "Terrain",
            Category::SignsSignals => "Signs & Signals",
            Category::StreetFurniture => "Street Furniture",
            Category::WallsBarriers => "Walls & Barriers",
            Category::Other => "Other",
        }
    }

    /// Accepts either the display label or the variant name, ignoring case, spaces,
    /// underscores, dashes and `&`.
    pub fn from_label(s: &str) -> Option<Category> {
        let key = |s: &str| -> String {
            s.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect()
        };
        let wanted = key(s);
        Category::ALL.into_iter().find(|c| key(c.label()) == wanted)
    }

    pub fn default_color(self) -> Color {
        match self {
            Category::Buildings => Color::new(0x80, 0x80, 0x80),
            Category::Vegetation => Color::new(0x22, 0x8b, 0x22),
            Category::RoadsInfrastructure => Color::new(0x40, 0x40, 0x40),
            Category::Vehicles => Color::new(0xb2, 0x22, 0x22),
            Category::Furniture => Color::new(0x8b, 0x45, 0x13),
            Category::Lighting => Color::new(0xff, 0xd7, 0x00),
            Category::WaterFeatures => Color::new(0x1e, 0x90, 0xff),
            Category::Terrain => Color::new(0x90, 0xee, 0x90),
            Category::SignsSignals => Color::new(0xff, 0x8c, 0x00),
            Category::StreetFurniture => Color::new(0xa0, 0x52, 0x2d),
            Category::WallsBarriers => Color::new(0xa9, 0xa9, 0xa9),
            Category::Other => Color::new(0xcc, 0xcc, 0xcc),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
