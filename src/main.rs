use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::{rngs::SmallRng, SeedableRng};

mod catalog;
mod category;
mod color;
mod config;
mod mesh;
mod scene;
mod stl;
mod util_3d;

use catalog::{Catalog, Source};
use category::{categorize, Category};
use color::Color;
use config::Config;
use scene::{planting::{self, PlantingMode}, sun, PatchKind, Scene};
use stl::export::StlFormat;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
/// Imports, groups and transforms the solids of STL city models
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lists the solids of an STL file
    Scan {
        #[arg(value_name = "STL_FILE")]
        file: PathBuf,
    },
    /// Lists the categories of the solids of an STL file
    Categories {
        #[arg(value_name = "STL_FILE")]
        file: PathBuf,
    },
    /// Lists the objects loaded from an STL file, with the index used by `convert --remove`
    Objects {
        #[arg(value_name = "STL_FILE")]
        file: PathBuf,
    },
    /// Loads solids from an STL file, transforms them and writes them as a single STL
    Convert {
        #[arg(value_name = "STL_FILE")]
        file: PathBuf,
        #[arg(short, long, value_name = "OUT_FILE")]
        output: PathBuf,
        #[arg(long = "solid", value_name = "INDEX", help = "Loads the solid with this index, can be repeated")]
        solids: Vec<usize>,
        #[arg(long = "category", value_name = "NAME", value_parser = parse_category, help = "Loads the solids of this category, can be repeated")]
        categories: Vec<Category>,
        #[arg(long = "remove", value_name = "INDEX", help = "Removes the loaded object with this index before exporting, can be repeated")]
        removed: Vec<usize>,
        #[arg(long = "hide", value_name = "NAME", value_parser = parse_category, help = "Leaves this category out of the output")]
        hidden: Vec<Category>,
        #[arg(long)]
        scale: Option<f32>,
        #[arg(long, value_name = "X,Y,Z", value_parser = parse_vec3, allow_hyphen_values = true, help = "Rotation in degrees")]
        rotate: Option<[f32; 3]>,
        #[arg(long, value_name = "X,Y,Z", value_parser = parse_vec3, allow_hyphen_values = true)]
        position: Option<[f32; 3]>,
        #[arg(long, value_name = "#RRGGBB")]
        color: Option<Color>,
        #[arg(long, conflicts_with = "binary")]
        ascii: bool,
        #[arg(long)]
        binary: bool,
    },
    /// Computes the position of the sun
    Sun {
        #[arg(long)]
        month: u8,
        #[arg(long)]
        day: u8,
        #[arg(long, default_value_t = 12)]
        hour: u8,
        #[arg(long, default_value_t = 0)]
        minute: u8,
        #[arg(long, allow_hyphen_values = true)]
        latitude: Option<f64>,
    },
    /// Edits scene files
    Scene {
        #[command(subcommand)]
        command: SceneCommand,
    },
    /// Shows the configuration, with the given changes
    Config {
        #[command(flatten)]
        overrides: ConfigOverrides,
        #[arg(long, help = "Writes the configuration file, creating it if needed")]
        save: bool,
    },
}

#[derive(clap::Args, Debug, Default)]
struct ConfigOverrides {
    #[arg(long)]
    scale: Option<f32>,
    #[arg(long, value_name = "X,Y,Z", value_parser = parse_vec3, allow_hyphen_values = true, help = "Rotation in degrees")]
    rotate: Option<[f32; 3]>,
    #[arg(long, value_name = "X,Y,Z", value_parser = parse_vec3, allow_hyphen_values = true)]
    position: Option<[f32; 3]>,
    #[arg(long, value_name = "#RRGGBB")]
    mesh_color: Option<Color>,
    #[arg(long, help = "Uses the color of each category")]
    category_colors: bool,
    #[arg(long, value_enum)]
    format: Option<StlFormat>,
    #[arg(long)]
    brush_distance: Option<f32>,
    #[arg(long, value_name = "MIN,MAX", value_parser = parse_vec2)]
    tree_height: Option<[f32; 2]>,
    #[arg(long, value_name = "#RRGGBB")]
    tree_color: Option<Color>,
    #[arg(long, allow_hyphen_values = true)]
    latitude: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    longitude: Option<f64>,
}

impl ConfigOverrides {
    fn apply(self, config: &mut Config) -> Result<()> {
        if let Some(scale) = self.scale {
            config.transform.scale = scale;
        }
        if let Some(rotate) = self.rotate {
            config.transform.rotation = rotate;
        }
        if let Some(position) = self.position {
            config.position = position;
        }
        if self.category_colors {
            config.mesh_color = None;
        }
        if let Some(color) = self.mesh_color {
            config.mesh_color = Some(color);
        }
        if let Some(format) = self.format {
            config.export_format = format;
        }
        if let Some(distance) = self.brush_distance {
            config.brush_distance = distance;
        }
        if let Some([min, max]) = self.tree_height {
            config.tree.height_min = min;
            config.tree.height_max = max;
        }
        if let Some(color) = self.tree_color {
            config.tree.color = color;
        }
        if let Some(latitude) = self.latitude {
            config.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            config.longitude = longitude;
        }
        config.validate()
    }
}

#[derive(Subcommand, Debug)]
enum SceneCommand {
    /// Creates a scene with random buildings
    New {
        #[arg(value_name = "SCENE_FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 10)]
        buildings: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Plants trees
    Plant {
        #[arg(value_name = "SCENE_FILE")]
        file: PathBuf,
        #[arg(long, value_name = "X,Z", value_parser = parse_vec2, allow_hyphen_values = true)]
        at: [f32; 2],
        #[arg(long, help = "Scatters several trees around the point")]
        brush: bool,
        #[arg(long)]
        distance: Option<f32>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Draws a street or green space patch
    Draw {
        #[arg(value_name = "SCENE_FILE")]
        file: PathBuf,
        #[arg(long, value_enum)]
        kind: PatchKind,
        #[arg(long, value_name = "X,Z", value_parser = parse_vec2, allow_hyphen_values = true)]
        at: [f32; 2],
    },
    /// Removes the tree closest to a point
    Remove {
        #[arg(value_name = "SCENE_FILE")]
        file: PathBuf,
        #[arg(long, value_name = "X,Z", value_parser = parse_vec2, allow_hyphen_values = true)]
        at: [f32; 2],
        #[arg(long, default_value_t = 2.0, help = "Only trees this close to the point are removed")]
        radius: f32,
    },
}

fn parse_floats<const N: usize>(s: &str) -> Result<[f32; N], String> {
    let vs: Vec<f32> = s
        .split(',')
        .map(|x| x.trim().parse::<f32>().map_err(|e| format!("{x:?}: {e}")))
        .collect::<Result<_, _>>()?;
    vs.try_into().map_err(|_| format!("expected {N} comma separated numbers"))
}
fn parse_vec3(s: &str) -> Result<[f32; 3], String> {
    parse_floats(s)
}
fn parse_vec2(s: &str) -> Result<[f32; 2], String> {
    parse_floats(s)
}
fn parse_category(s: &str) -> Result<Category, String> {
    Category::from_label(s).ok_or_else(|| {
        let names: Vec<_> = Category::ALL.iter().map(|c| c.label()).collect();
        format!("unknown category, expected one of: {}", names.join(", "))
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = Config::load_or_default();
    if let Err(e) = run(cli.command, config) {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}

fn run(command: Command, config: Config) -> Result<()> {
    match command {
        Command::Scan { file } => {
            let session = match Catalog::read_file(&file)? {
                Source::Ascii(session) => session,
                Source::Binary { facets, .. } => {
                    println!("binary STL, 1 solid with {} facets", facets.len());
                    return Ok(());
                }
            };
            println!("{}: {} solids", session.name(), session.solids().len());
            for (i, solid) in session.solids().iter().enumerate() {
                println!("{i:4} {:<32} {:8} facets  {}", solid.name, solid.facet_count, categorize(&solid.name));
            }
        }
        Command::Categories { file } => {
            let mut catalog = Catalog::default();
            load_everything(&mut catalog, &file)?;
            for c in catalog.list_categories() {
                println!("{:<24} {:6}", c.category.label(), c.count);
            }
        }
        Command::Objects { file } => {
            let mut catalog = Catalog::default();
            catalog.set_color(config.mesh_color);
            load_everything(&mut catalog, &file)?;
            let [rx, ry, rz] = config.transform.rotation;
            catalog.set_transform(config.transform.scale, rx, ry, rz)?;
            let [x, y, z] = config.position;
            catalog.set_position(x, y, z)?;
            for (i, obj) in catalog.objects().iter().enumerate() {
                let (a, b) = obj.world_bounding_box();
                let size = b - a;
                println!("{i:4} {:<32} {:<24} {:8} triangles  {}  size {:.3} x {:.3} x {:.3}",
                    obj.name(), obj.category().label(), obj.source().triangle_count(), obj.color(), size.x, size.y, size.z);
            }
        }
        Command::Convert { file, output, solids, categories, removed, hidden, scale, rotate, position, color, ascii, binary } => {
            let mut catalog = Catalog::default();
            catalog.set_color(color.or(config.mesh_color));

            if solids.is_empty() && categories.is_empty() {
                load_everything(&mut catalog, &file)?;
            } else {
                let session = match Catalog::read_file(&file)? {
                    Source::Ascii(session) => session,
                    Source::Binary { .. } => anyhow::bail!("{} is a binary STL, it has no named solids to select", file.display()),
                };
                for i in solids {
                    catalog.load_single(&session, i)?;
                }
                for c in categories {
                    catalog.load_category(&session, c)?;
                }
            }

            // from the highest index down, so that the others do not move
            let mut removed = removed;
            removed.sort_unstable();
            removed.dedup();
            for i in removed.into_iter().rev() {
                let obj = catalog.remove(i)?;
                log::info!("Removed {}", obj.name());
            }

            let [rx, ry, rz] = rotate.unwrap_or(config.transform.rotation);
            catalog.set_transform(scale.unwrap_or(config.transform.scale), rx, ry, rz)?;
            let [x, y, z] = position.unwrap_or(config.position);
            catalog.set_position(x, y, z)?;

            let present: Vec<_> = catalog.list_categories().into_iter().map(|c| c.category).collect();
            for c in hidden {
                if present.contains(&c) && catalog.is_category_visible(c) {
                    catalog.toggle_category_visibility(c)?;
                }
            }

            let format = match (ascii, binary) {
                (true, _) => StlFormat::Ascii,
                (_, true) => StlFormat::Binary,
                _ => config.export_format,
            };
            let name = output.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            let f = std::fs::File::create(&output)
                .with_context(|| format!("Error creating file {}", output.display()))?;
            let f = std::io::BufWriter::new(f);
            if present.iter().all(|&c| catalog.is_category_visible(c)) {
                catalog.export_stl(f, &name, format)?;
            } else {
                catalog.export_visible_stl(f, &name, format)?;
            }
            let tr = catalog.transform();
            let (o, c) = (catalog.offset(), catalog.world_center());
            log::info!("Saved {} objects to {}", catalog.len(), output.display());
            log::info!("Scale {}, rotation {:?}, position ({}, {}, {}), center ({:.3}, {:.3}, {:.3})",
                tr.scale, tr.rotation, o.x, o.y, o.z, c.x, c.y, c.z);
        }
        Command::Sun { month, day, hour, minute, latitude } => {
            let latitude = latitude.unwrap_or(config.latitude);
            let pos = sun::sun_position(month, day, hour, minute, latitude)?;
            let light = pos.light_position(sun::LIGHT_DISTANCE);
            println!("elevation: {:.2}°", pos.elevation.to_degrees());
            println!("azimuth:   {:.2}°", pos.azimuth.to_degrees());
            println!("light:     ({:.2}, {:.2}, {:.2})", light.x, light.y, light.z);
            println!("daylight:  {} (intensity {})", sun::is_daylight(hour), sun::light_intensity(hour));
        }
        Command::Scene { command } => run_scene(command, &config)?,
        Command::Config { overrides, save } => {
            let mut config = config;
            overrides.apply(&mut config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                let file_name = config.save()?;
                log::info!("Saved configuration to {}", file_name.display());
            }
        }
    }
    Ok(())
}

fn load_everything(catalog: &mut Catalog, file: &Path) -> Result<()> {
    match Catalog::read_file(file)? {
        Source::Ascii(session) => {
            catalog.load_all(&session)?;
        }
        Source::Binary { name, facets } => {
            catalog.clear();
            catalog.load_facets(&name, &facets);
        }
    }
    Ok(())
}

fn rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}

fn run_scene(command: SceneCommand, config: &Config) -> Result<()> {
    match command {
        SceneCommand::New { file, buildings, seed } => {
            let mut scene = Scene::empty();
            scene.add_random_buildings(&mut rng(seed), buildings);
            scene.save_file(&file)?;
            log::info!("Created {} with {buildings} buildings", file.display());
        }
        SceneCommand::Plant { file, at: [x, z], brush, distance, seed } => {
            let mut scene = Scene::load_file(&file)?;
            let mode = if brush {
                PlantingMode::Brush { distance: distance.unwrap_or(config.brush_distance) }
            } else {
                PlantingMode::Single
            };
            let n = planting::plant(&mut scene, &mut rng(seed), x, z, mode, &config.tree)?;
            scene.save_file(&file)?;
            log::info!("Planted {n} trees, {} in total", scene.trees.len());
        }
        SceneCommand::Draw { file, kind, at: [x, z] } => {
            let mut scene = Scene::load_file(&file)?;
            let [w, _, d] = scene.draw_patch(kind, x, z).size();
            log::info!("Drew a {w} x {d} {kind:?} patch at ({x}, {z})");
            scene.save_file(&file)?;
        }
        SceneCommand::Remove { file, at: [x, z], radius } => {
            let mut scene = Scene::load_file(&file)?;
            let Some(tree) = scene.remove_tree_near(x, z, radius) else {
                anyhow::bail!("No tree within {radius} of ({x}, {z})");
            };
            scene.save_file(&file)?;
            log::info!("Removed the tree at ({}, {}), {} left", tree.position[0], tree.position[2], scene.trees.len());
        }
    }
    Ok(())
}
