use std::io::{BufRead, Write};
use std::path::Path;
use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::color::Color;

pub mod planting;
pub mod sun;

// The ground plane spans [-GROUND_HALF_SIZE, GROUND_HALF_SIZE] in X and Z
pub const GROUND_HALF_SIZE: f32 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TreeRecord", into = "TreeRecord")]
pub struct Tree {
    pub position: [f32; 3],
    pub height: f32,
    pub color: Color,
}

// Trees are stored as `{"position": [..], "userData": {"height": .., "color": ".."}}`
#[derive(Serialize, Deserialize)]
struct TreeRecord {
    position: [f32; 3],
    #[serde(rename = "userData")]
    user_data: TreeProperties,
}

#[derive(Serialize, Deserialize)]
struct TreeProperties {
    height: f32,
    color: Color,
}

impl From<TreeRecord> for Tree {
    fn from(r: TreeRecord) -> Tree {
        Tree {
            position: r.position,
            height: r.user_data.height,
            color: r.user_data.color,
        }
    }
}

impl From<Tree> for TreeRecord {
    fn from(t: Tree) -> TreeRecord {
        TreeRecord {
            position: t.position,
            user_data: TreeProperties {
                height: t.height,
                color: t.color,
            },
        }
    }
}

impl Tree {
    // The trunk is buried a bit: the group origin is raised by 15% of the height
    pub fn new(x: f32, z: f32, height: f32, color: Color) -> Tree {
        Tree {
            position: [x, height * 0.15, z],
            height,
            color,
        }
    }
    pub fn distance_xz(&self, x: f32, z: f32) -> f32 {
        let dx = self.position[0] - x;
        let dz = self.position[2] - z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// A box standing on the ground, `position` is its center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub position: [f32; 3],
    // a unit box scaled to the size
    #[serde(rename = "scale")]
    pub size: [f32; 3],
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PatchKind {
    Street,
    Green,
}

impl PatchKind {
    pub fn size(self) -> [f32; 3] {
        match self {
            PatchKind::Street => [5.0, 0.1, 5.0],
            PatchKind::Green => [10.0, 0.1, 10.0],
        }
    }
}

/// A thin slab painted on the ground with the street or green space tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub kind: PatchKind,
    pub center: [f32; 3],
}

impl Patch {
    pub fn size(&self) -> [f32; 3] {
        self.kind.size()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub trees: Vec<Tree>,
    #[serde(default)]
    pub buildings: Vec<Building>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<Patch>,
}

impl Scene {
    pub fn empty() -> Scene {
        Scene::default()
    }

    /// Adds `count` random boxes: 5 to 15 wide and deep, 10 to 40 high, anywhere in the
    /// central 180 x 180 area.
    pub fn add_random_buildings(&mut self, rng: &mut impl Rng, count: usize) {
        for _ in 0 .. count {
            let width = rng.gen_range(5.0 .. 15.0);
            let height = rng.gen_range(10.0 .. 40.0);
            let depth = rng.gen_range(5.0 .. 15.0);
            let x = rng.gen_range(-90.0 .. 90.0);
            let z = rng.gen_range(-90.0 .. 90.0);
            self.buildings.push(Building {
                position: [x, height / 2.0, z],
                size: [width, height, depth],
            });
        }
    }

    pub fn draw_patch(&mut self, kind: PatchKind, x: f32, z: f32) -> &Patch {
        self.patches.push(Patch {
            kind,
            center: [x, 0.05, z],
        });
        &self.patches[self.patches.len() - 1]
    }

    /// Removes the tree closest to `(x, z)`, measured on the ground, if it is within `radius`.
    pub fn remove_tree_near(&mut self, x: f32, z: f32, radius: f32) -> Option<Tree> {
        let (index, _) = self.trees
            .iter()
            .map(|t| t.distance_xz(x, z))
            .enumerate()
            .filter(|&(_, d)| d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))?;
        Some(self.trees.remove(index))
    }

    pub fn save<W: Write>(&self, w: W) -> Result<()> {
        serde_json::to_writer_pretty(w, self)?;
        Ok(())
    }

    pub fn load<R: BufRead>(r: R) -> Result<Scene> {
        let scene = serde_json::from_reader(r)?;
        Ok(scene)
    }

    pub fn save_file(&self, file_name: &Path) -> Result<()> {
        let f = std::fs::File::create(file_name)
            .with_context(|| format!("Error creating file {}", file_name.display()))?;
        let f = std::io::BufWriter::new(f);
        self.save(f)
            .with_context(|| format!("Error saving scene {}", file_name.display()))
    }

    pub fn load_file(file_name: &Path) -> Result<Scene> {
        let f = std::fs::File::open(file_name)
            .with_context(|| format!("Error opening file {}", file_name.display()))?;
        let f = std::io::BufReader::new(f);
        Self::load(f)
            .with_context(|| format!("Error reading scene {}", file_name.display()))
    }
}
