use std::io::Write;
use std::path::Path;
use anyhow::{anyhow, bail, Context, Result};
use cgmath::Zero;
use fxhash::FxHashSet;
use serde::Serialize;

use crate::category::{categorize, Category};
use crate::color::Color;
use crate::mesh::{LoadedMesh, Transform};
use crate::stl::{self, export::StlFormat, Facet, SolidDescriptor};
use crate::util_3d::Vector3;

/// The result of scanning an ASCII STL document.
///
/// It keeps the document text so that the solids can be extracted later, and it must be passed
/// back to the `Catalog::load_*` functions.
#[derive(Debug, Clone)]
pub struct ImportSession {
    name: String,
    text: String,
    solids: Vec<SolidDescriptor>,
}

impl ImportSession {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn solids(&self) -> &[SolidDescriptor] {
        &self.solids
    }
    pub fn solid_by_index(&self, index: usize) -> Result<&SolidDescriptor> {
        self.solids
            .get(index)
            .ok_or_else(|| anyhow!("solid {index} not found, the file has {} solids", self.solids.len()))
    }
    fn facets(&self, solid: &SolidDescriptor) -> Vec<Facet> {
        let block = stl::extract_solid(&self.text, solid);
        let facets = stl::parse_facets(block);
        if facets.len() != solid.facet_count {
            log::warn!("solid {:?}: {} facets announced, {} parsed", solid.name, solid.facet_count, facets.len());
        }
        facets
    }
}

/// What a file turned out to contain.
#[derive(Debug)]
pub enum Source {
    Ascii(ImportSession),
    // binary STL has a single unnamed solid
    Binary { name: String, facets: Vec<Facet> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub count: usize,
    pub visible: bool,
}

/// The loaded objects, plus the transform and position shared by all of them.
#[derive(Debug)]
pub struct Catalog {
    objects: Vec<LoadedMesh>,
    transform: Transform,
    offset: Vector3,
    color: Option<Color>,
    hidden: FxHashSet<Category>,
}

impl Default for Catalog {
    fn default() -> Catalog {
        Catalog {
            objects: Vec::new(),
            transform: Transform::default(),
            offset: Vector3::zero(),
            color: None,
            hidden: FxHashSet::default(),
        }
    }
}

impl Catalog {
    /// Forces the color of the objects loaded from now on, `None` uses the category color.
    pub fn set_color(&mut self, color: Option<Color>) {
        self.color = color;
    }

    pub fn scan(name: &str, text: &str) -> Result<ImportSession> {
        log::info!("Scanning {name}...");
        let solids = stl::scan_solids(text);
        if solids.is_empty() {
            bail!("No solids found in {name}");
        }
        log::info!("Found {} solids in {name}", solids.len());
        Ok(ImportSession {
            name: name.to_owned(),
            text: text.to_owned(),
            solids,
        })
    }

    pub fn open_bytes(name: &str, bytes: &[u8]) -> Result<Source> {
        if stl::is_ascii_stl(bytes) {
            let text = String::from_utf8_lossy(bytes);
            Ok(Source::Ascii(Self::scan(name, &text)?))
        } else {
            let facets = stl::data::decode_binary(bytes)
                .with_context(|| format!("Error reading binary STL {name}"))?;
            log::info!("Read {} facets from binary STL {name}", facets.len());
            Ok(Source::Binary { name: name.to_owned(), facets })
        }
    }

    pub fn read_file(file_name: &Path) -> Result<Source> {
        let bytes = std::fs::read(file_name)
            .with_context(|| format!("Error reading file {}", file_name.display()))?;
        let name = file_name
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::open_bytes(&name, &bytes)
    }

    fn push(&mut self, name: &str, facets: &[Facet]) -> &LoadedMesh {
        let color = self.color.unwrap_or_else(|| categorize(name).default_color());
        let mesh = LoadedMesh::build(name, facets, self.transform, self.offset, color);
        log::debug!("Loaded {:?}: {} triangles", name, mesh.live().triangle_count());
        self.objects.push(mesh);
        &self.objects[self.objects.len() - 1]
    }

    pub fn load_single(&mut self, session: &ImportSession, index: usize) -> Result<&LoadedMesh> {
        let solid = session.solid_by_index(index)?;
        let facets = session.facets(solid);
        Ok(self.push(&solid.name, &facets))
    }

    /// Loads every solid of the given category, in file order. Returns how many were loaded.
    pub fn load_category(&mut self, session: &ImportSession, category: Category) -> Result<usize> {
        let selected: Vec<&SolidDescriptor> = session.solids
            .iter()
            .filter(|s| categorize(&s.name) == category)
            .collect();
        if selected.is_empty() {
            bail!("No solids of category {category} in {}", session.name);
        }
        log::info!("Loading {} solids of category {category}...", selected.len());
        for solid in &selected {
            let facets = session.facets(solid);
            self.push(&solid.name, &facets);
        }
        Ok(selected.len())
    }

    /// Replaces the whole catalog with every solid of the session.
    pub fn load_all(&mut self, session: &ImportSession) -> Result<usize> {
        if session.solids.is_empty() {
            bail!("No solids found in {}", session.name);
        }
        self.clear();
        log::info!("Loading {} solids...", session.solids.len());
        for solid in &session.solids {
            let facets = session.facets(solid);
            self.push(&solid.name, &facets);
        }
        log::info!("Loaded {} objects", self.objects.len());
        Ok(self.objects.len())
    }

    pub fn load_facets(&mut self, name: &str, facets: &[Facet]) -> &LoadedMesh {
        self.push(name, facets)
    }

    /// Removes an object. The indices of the following objects go down by one.
    pub fn remove(&mut self, index: usize) -> Result<LoadedMesh> {
        if index >= self.objects.len() {
            bail!("object {index} not found, the catalog has {} objects", self.objects.len());
        }
        Ok(self.objects.remove(index))
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.hidden.clear();
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }
    pub fn offset(&self) -> Vector3 {
        self.offset
    }

    pub fn set_transform(&mut self, scale: f32, rotation_x: f32, rotation_y: f32, rotation_z: f32) -> Result<()> {
        let transform = Transform::new(scale, [rotation_x, rotation_y, rotation_z])?;
        self.retransform(transform)
    }

    /// Moves the bounding box center of every object to the given point.
    pub fn set_position(&mut self, x: f32, y: f32, z: f32) -> Result<()> {
        let offset = Vector3::new(x, y, z);
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            bail!("invalid position {offset:?}");
        }
        self.offset = offset;
        self.retransform(self.transform)
    }

    pub fn retransform(&mut self, transform: Transform) -> Result<()> {
        transform.validate()?;
        self.transform = transform;
        for obj in &mut self.objects {
            obj.retransform(self.transform, self.offset);
        }
        Ok(())
    }

    pub fn objects(&self) -> &[LoadedMesh] {
        &self.objects
    }
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Non empty categories, in priority order.
    pub fn list_categories(&self) -> Vec<CategorySummary> {
        let mut counts = [0; Category::ALL.len()];
        for obj in &self.objects {
            let category = obj.category();
            if let Some(i) = Category::ALL.iter().position(|c| *c == category) {
                counts[i] += 1;
            }
        }
        Category::ALL
            .into_iter()
            .zip(counts)
            .filter(|&(_, count)| count > 0)
            .map(|(category, count)| CategorySummary {
                category,
                count,
                visible: !self.hidden.contains(&category),
            })
            .collect()
    }

    /// Shows or hides the objects of a category, returns the new visibility.
    pub fn toggle_category_visibility(&mut self, category: Category) -> Result<bool> {
        if !self.objects.iter().any(|o| o.category() == category) {
            bail!("No objects of category {category}");
        }
        let visible = !self.hidden.remove(&category);
        if !visible {
            self.hidden.insert(category);
        }
        Ok(visible)
    }

    pub fn is_category_visible(&self, category: Category) -> bool {
        !self.hidden.contains(&category)
    }

    pub fn visible_objects(&self) -> impl Iterator<Item = &LoadedMesh> + '_ {
        self.objects.iter().filter(|o| self.is_category_visible(o.category()))
    }

    /// All the triangles of all the objects, in world coordinates.
    pub fn export_triangles(&self) -> Vec<[Vector3; 3]> {
        self.objects.iter().flat_map(|o| o.world_triangles()).collect()
    }

    pub fn export_stl<W: Write>(&self, w: W, name: &str, format: StlFormat) -> Result<()> {
        if self.objects.is_empty() {
            bail!("Nothing to export, no objects are loaded");
        }
        write_stl(w, name, format, &self.export_triangles())
    }

    /// Like `export_stl` but leaving out the hidden categories.
    pub fn export_visible_stl<W: Write>(&self, w: W, name: &str, format: StlFormat) -> Result<()> {
        let triangles: Vec<_> = self.visible_objects().flat_map(|o| o.world_triangles()).collect();
        if triangles.is_empty() {
            bail!("Nothing to export, no visible objects");
        }
        write_stl(w, name, format, &triangles)
    }

    // Center of the union of every object bounding box, zero when empty
    pub fn world_center(&self) -> Vector3 {
        if self.objects.is_empty() {
            return Vector3::zero();
        }
        crate::util_3d::bounding_box_center(self.objects.iter().flat_map(|o| {
            let (a, b) = o.world_bounding_box();
            [a, b]
        }))
    }
}

fn write_stl<W: Write>(w: W, name: &str, format: StlFormat, triangles: &[[Vector3; 3]]) -> Result<()> {
    log::info!("Exporting {} triangles as {format:?} STL", triangles.len());
    match format {
        StlFormat::Ascii => stl::export::write_ascii(w, name, triangles),
        StlFormat::Binary => stl::export::write_binary(w, name, triangles),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::unit_cube;
    use approx::assert_abs_diff_eq;

    fn block(name: &str, facets: &[Facet]) -> String {
        let mut s = format!("solid {name}\n");
        for f in facets {
            s.push_str(&format!("  facet normal {} {} {}\n    outer loop\n", f.normal.x, f.normal.y, f.normal.z));
            for v in &f.vertices {
                s.push_str(&format!("      vertex {} {} {}\n", v.x, v.y, v.z));
            }
            s.push_str("    endloop\n  endfacet\n");
        }
        s.push_str(&format!("endsolid {name}\n"));
        s
    }

    fn city() -> String {
        let cube = unit_cube();
        [
            block("office_building", &cube),
            block("oak_tree", &cube[.. 4]),
            block("garden_bench", &cube[.. 2]),
            block("pine_tree", &cube[.. 6]),
        ]
        .concat()
    }

    #[test]
    fn scan_lists_every_solid() {
        let session = Catalog::scan("city", &city()).unwrap();
        let names: Vec<_> = session.solids().iter().map(|s| (s.name.as_str(), s.facet_count)).collect();
        assert_eq!(names, [("office_building", 12), ("oak_tree", 4), ("garden_bench", 2), ("pine_tree", 6)]);
    }

    #[test]
    fn scan_without_solids_fails() {
        assert!(Catalog::scan("empty", "nothing here\n").is_err());
    }

    #[test]
    fn load_single_and_stale_index() {
        let session = Catalog::scan("city", &city()).unwrap();
        let mut catalog = Catalog::default();
        let obj = catalog.load_single(&session, 1).unwrap();
        assert_eq!(obj.name(), "oak_tree");
        assert_eq!(obj.live().triangle_count(), 4);
        assert!(catalog.load_single(&session, 4).is_err());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn load_category_keeps_file_order() {
        let session = Catalog::scan("city", &city()).unwrap();
        let mut catalog = Catalog::default();
        assert_eq!(catalog.load_category(&session, Category::Vegetation).unwrap(), 3);
        let names: Vec<_> = catalog.objects().iter().map(|o| o.name()).collect();
        assert_eq!(names, ["oak_tree", "garden_bench", "pine_tree"]);
        assert!(catalog.load_category(&session, Category::Vehicles).is_err());
        // categories are additive
        catalog.load_category(&session, Category::Buildings).unwrap();
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn load_all_resets_the_catalog() {
        let session = Catalog::scan("city", &city()).unwrap();
        let mut catalog = Catalog::default();
        catalog.load_single(&session, 0).unwrap();
        assert_eq!(catalog.load_all(&session).unwrap(), 4);
        let names: Vec<_> = catalog.objects().iter().map(|o| o.name()).collect();
        assert_eq!(names, ["office_building", "oak_tree", "garden_bench", "pine_tree"]);
        catalog.load_all(&session).unwrap();
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn load_all_handles_many_solids() {
        let tri = &unit_cube()[.. 1];
        let text: String = (0 .. 4000).map(|i| block(&format!("house_{i}"), tri)).collect();
        let session = Catalog::scan("town", &text).unwrap();
        let mut catalog = Catalog::default();
        assert_eq!(catalog.load_all(&session).unwrap(), 4000);
        assert_eq!(catalog.objects()[3999].name(), "house_3999");
        assert!(catalog.objects().iter().all(|o| o.live().triangle_count() == 1));
    }

    #[test]
    fn remove_shifts_indices() {
        let session = Catalog::scan("city", &city()).unwrap();
        let mut catalog = Catalog::default();
        catalog.load_all(&session).unwrap();
        let removed = catalog.remove(1).unwrap();
        assert_eq!(removed.name(), "oak_tree");
        assert_eq!(catalog.objects()[1].name(), "garden_bench");
        assert!(catalog.remove(3).is_err());
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn retransform_twice_is_the_same_as_once() {
        let session = Catalog::scan("city", &city()).unwrap();
        let mut catalog = Catalog::default();
        catalog.load_all(&session).unwrap();
        catalog.set_transform(2.5, 10.0, 20.0, 30.0).unwrap();
        let once: Vec<_> = catalog.objects().iter().map(|o| (o.position(), o.live().clone())).collect();
        catalog.set_transform(2.5, 10.0, 20.0, 30.0).unwrap();
        let twice: Vec<_> = catalog.objects().iter().map(|o| (o.position(), o.live().clone())).collect();
        assert_eq!(once, twice);
        assert!(catalog.set_transform(0.0, 0.0, 0.0, 0.0).is_err());
        assert_eq!(catalog.transform().scale, 2.5);
    }

    #[test]
    fn set_position_recenters() {
        let session = Catalog::scan("city", &city()).unwrap();
        let mut catalog = Catalog::default();
        catalog.load_single(&session, 0).unwrap();
        catalog.set_position(10.0, 0.0, -5.0).unwrap();
        catalog.set_position(10.0, 0.0, -5.0).unwrap();
        let (a, b) = catalog.objects()[0].world_bounding_box();
        assert_abs_diff_eq!((a + b) / 2.0, Vector3::new(10.0, 0.0, -5.0), epsilon = 1e-5);
        // objects loaded later use the current position too
        catalog.load_single(&session, 3).unwrap();
        assert_abs_diff_eq!(catalog.world_center(), Vector3::new(10.0, 0.0, -5.0), epsilon = 1e-5);
    }

    #[test]
    fn categories_and_visibility() {
        let session = Catalog::scan("city", &city()).unwrap();
        let mut catalog = Catalog::default();
        catalog.load_all(&session).unwrap();
        let cats = catalog.list_categories();
        assert_eq!(cats, [
            CategorySummary { category: Category::Buildings, count: 1, visible: true },
            CategorySummary { category: Category::Vegetation, count: 3, visible: true },
        ]);
        assert!(!catalog.toggle_category_visibility(Category::Vegetation).unwrap());
        assert_eq!(catalog.visible_objects().count(), 1);
        assert!(!catalog.list_categories()[1].visible);
        assert!(catalog.toggle_category_visibility(Category::Vegetation).unwrap());
        assert_eq!(catalog.visible_objects().count(), 4);
        assert!(catalog.toggle_category_visibility(Category::Lighting).is_err());
    }

    #[test]
    fn colors_come_from_category_unless_forced() {
        let session = Catalog::scan("city", &city()).unwrap();
        let mut catalog = Catalog::default();
        catalog.load_single(&session, 1).unwrap();
        assert_eq!(catalog.objects()[0].color(), Category::Vegetation.default_color());
        catalog.set_color(Some(Color::new(1, 2, 3)));
        catalog.load_single(&session, 1).unwrap();
        assert_eq!(catalog.objects()[1].color(), Color::new(1, 2, 3));
    }

    #[test]
    fn binary_goes_to_the_binary_decoder() {
        let mut bytes = Vec::new();
        stl::export::write_binary(&mut bytes, "", &[[Vector3::zero(), Vector3::unit_x(), Vector3::unit_y()]]).unwrap();
        match Catalog::open_bytes("part", &bytes).unwrap() {
            Source::Binary { name, facets } => {
                assert_eq!(name, "part");
                assert_eq!(facets.len(), 1);
            }
            Source::Ascii(_) => panic!("binary STL detected as text"),
        }
        match Catalog::open_bytes("city", city().as_bytes()).unwrap() {
            Source::Ascii(session) => assert_eq!(session.solids().len(), 4),
            Source::Binary { .. } => panic!("text STL detected as binary"),
        }
    }

    #[test]
    fn export_needs_objects() {
        let catalog = Catalog::default();
        assert!(catalog.export_stl(Vec::new(), "x", StlFormat::Binary).is_err());
    }

    #[test]
    fn export_merges_world_geometry() {
        let session = Catalog::scan("city", &city()).unwrap();
        let mut catalog = Catalog::default();
        catalog.load_all(&session).unwrap();
        let mut out = Vec::new();
        catalog.export_stl(&mut out, "city", StlFormat::Ascii).unwrap();
        let text = String::from_utf8(out).unwrap();
        let solids = stl::scan_solids(&text);
        assert_eq!(solids.len(), 1);
        assert_eq!(solids[0].facet_count, 12 + 4 + 2 + 6);
        let (a, b) = crate::util_3d::bounding_box(stl::parse_facets(&text).iter().flat_map(|f| f.vertices));
        assert_abs_diff_eq!(a, Vector3::new(-0.5, -0.5, -0.5), epsilon = 1e-5);
        assert_abs_diff_eq!(b, Vector3::new(0.5, 0.5, 0.5), epsilon = 1e-5);
    }

    #[test]
    fn hidden_categories_are_not_exported() {
        let session = Catalog::scan("city", &city()).unwrap();
        let mut catalog = Catalog::default();
        catalog.load_all(&session).unwrap();
        catalog.toggle_category_visibility(Category::Vegetation).unwrap();
        let mut out = Vec::new();
        catalog.export_visible_stl(&mut out, "city", StlFormat::Binary).unwrap();
        assert_eq!(out.len(), 84 + 12 * 50);
        catalog.toggle_category_visibility(Category::Buildings).unwrap();
        assert!(catalog.export_visible_stl(Vec::new(), "city", StlFormat::Binary).is_err());
    }

    #[test]
    fn read_failure_is_reported() {
        let err = Catalog::read_file(Path::new("/nonexistent/dir/model.stl")).unwrap_err();
        assert!(err.to_string().contains("model.stl"));
    }
}
