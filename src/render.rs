//! Rasterising label collections into class and instance images.
//!
//! Collections are rendered leaf by leaf in flattened document order. Group
//! containers contribute through their children and composites have no shape,
//! so neither is rendered on its own.

use std::collections::BTreeMap;

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use imlabel_raster::Vertex;
use ndarray::{Array2, Array3, Zip, s};

use crate::model::{Label, LabelClass, LabelClassGroup, LabelCollection, LabelContext, LabelId};

// ============================================================================
// Class mapping
// ============================================================================

/// Maps label classifications to class indices.
///
/// Indices start at 1; 0 is the background. Unmapped classifications are not
/// rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMapping {
    indices: BTreeMap<Option<String>, usize>,
}

impl ClassMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: map `class` to `index`.
    pub fn with(mut self, class: impl Into<String>, index: usize) -> Self {
        self.insert(Some(class.into()), index);
        self
    }

    /// Builder: map labels without a classification to `index`.
    pub fn with_unclassified(mut self, index: usize) -> Self {
        self.insert(None, index);
        self
    }

    pub fn insert(&mut self, class: Option<String>, index: usize) {
        self.indices.insert(class, index);
    }

    /// Explicit `(class, index)` pairs.
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, usize)>) -> Self {
        Self {
            indices: pairs
                .into_iter()
                .map(|(k, i)| (Some(k.into()), i))
                .collect(),
        }
    }

    /// The `i`-th class of the sequence gets index `i + 1`.
    pub fn from_sequence<K: Into<String>>(classes: impl IntoIterator<Item = K>) -> Self {
        Self::from_pairs(classes.into_iter().enumerate().map(|(i, k)| (k, i + 1)))
    }

    /// Every class of the `i`-th group gets index `i + 1`.
    pub fn from_groups<K, G>(groups: impl IntoIterator<Item = G>) -> Self
    where
        K: Into<String>,
        G: IntoIterator<Item = K>,
    {
        let mut mapping = Self::new();
        for (i, group) in groups.into_iter().enumerate() {
            for class in group {
                mapping.insert(Some(class.into()), i + 1);
            }
        }
        mapping
    }

    pub fn from_label_classes(classes: &[LabelClass]) -> Self {
        Self::from_sequence(classes.iter().map(|c| c.name.as_str()))
    }

    /// All classes of one label class group share its index.
    pub fn from_class_groups(groups: &[LabelClassGroup]) -> Self {
        Self::from_groups(
            groups
                .iter()
                .map(|g| g.group_classes.iter().map(|c| c.name.as_str())),
        )
    }

    /// Index for a classification, if it is rendered.
    pub fn index_of(&self, class: Option<&str>) -> Option<usize> {
        let index = *self.indices.get(&class.map(str::to_string))?;
        (index > 0).then_some(index)
    }

    /// Largest index in the mapping; the number of class channels.
    pub fn max_index(&self) -> usize {
        self.indices.values().copied().max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

// ============================================================================
// Options and output
// ============================================================================

/// Output size and mode for rendering a collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub width: usize,
    pub height: usize,
    /// Produce one boolean plane per class or instance instead of an index image
    pub multichannel: bool,
    pub fill: bool,
    pub context: LabelContext,
}

impl RenderOptions {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            multichannel: false,
            fill: true,
            context: LabelContext::default(),
        }
    }

    pub fn with_multichannel(mut self, multichannel: bool) -> Self {
        self.multichannel = multichannel;
        self
    }

    pub fn with_fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_context(mut self, context: LabelContext) -> Self {
        self.context = context;
        self
    }
}

/// A rendered label image.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelRaster {
    /// `(height, width)` indices, 0 for background
    Indexed(Array2<i32>),
    /// `(height, width, channels)` coverage planes
    Multichannel(Array3<bool>),
}

impl LabelRaster {
    /// `(height, width)` of the raster.
    pub fn size(&self) -> (usize, usize) {
        match self {
            LabelRaster::Indexed(a) => a.dim(),
            LabelRaster::Multichannel(a) => {
                let (h, w, _) = a.dim();
                (h, w)
            }
        }
    }

    pub fn as_indexed(&self) -> Option<&Array2<i32>> {
        match self {
            LabelRaster::Indexed(a) => Some(a),
            LabelRaster::Multichannel(_) => None,
        }
    }

    pub fn as_multichannel(&self) -> Option<&Array3<bool>> {
        match self {
            LabelRaster::Multichannel(a) => Some(a),
            LabelRaster::Indexed(_) => None,
        }
    }
}

/// Result of [`LabelCollection::render_label_instances`].
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRender {
    pub raster: LabelRaster,
    /// Class index of each instance; entry 0 is the background and holds 0
    pub instance_classes: Vec<usize>,
    /// Id of each instance; entry 0 is the background and holds `None`
    pub object_ids: Vec<Option<LabelId>>,
}

impl InstanceRender {
    /// Number of rendered instances, excluding the background.
    pub fn instance_count(&self) -> usize {
        self.instance_classes.len().saturating_sub(1)
    }
}

// ============================================================================
// Rendering
// ============================================================================

impl LabelCollection {
    /// Flattened labels that render on their own.
    fn render_leaves(&self) -> impl Iterator<Item = &Label> + '_ {
        self.flatten()
            .into_iter()
            .filter(|l| !l.is_group() && !l.is_composite())
    }

    /// Render a semantic segmentation image.
    ///
    /// In index mode later labels overwrite earlier ones. In multichannel mode
    /// channel `i - 1` holds the coverage of class index `i`.
    pub fn render_label_classes(&self, mapping: &ClassMapping, options: &RenderOptions) -> LabelRaster {
        let (w, h) = (options.width, options.height);
        let mut indexed = Array2::<i32>::zeros((h, w));
        let mut planes = Array3::<bool>::from_elem((h, w, mapping.max_index()), false);
        let mut rendered = 0usize;

        for label in self.render_leaves() {
            let Some(index) = mapping.index_of(label.classification.as_deref()) else {
                continue;
            };
            let Some(mask) = label.render_mask(w, h, options.fill, Vertex::ZERO, &options.context) else {
                continue;
            };
            log::trace!("Rendering {} label {:?} as class {}", label.label_type(), label.id, index);
            if options.multichannel {
                let mut plane = planes.slice_mut(s![.., .., index - 1]);
                Zip::from(&mut plane).and(&mask).for_each(|p, &m| *p |= m);
            } else {
                paint(&mut indexed, &mask, index as i32);
            }
            rendered += 1;
        }

        log::info!("Rendered {} labels into a {}x{} class image", rendered, w, h);
        if options.multichannel {
            LabelRaster::Multichannel(planes)
        } else {
            LabelRaster::Indexed(indexed)
        }
    }

    /// Render an instance segmentation image.
    ///
    /// Each rendered label is one instance, numbered from 1 in document
    /// order. In multichannel mode plane 0 marks pixels no label covers and
    /// plane `n` holds instance `n`. Without a mapping every label is
    /// rendered with class index 1.
    pub fn render_label_instances(&self, mapping: Option<&ClassMapping>, options: &RenderOptions) -> InstanceRender {
        let (w, h) = (options.width, options.height);
        let mut masks = Vec::new();
        let mut instance_classes = vec![0];
        let mut object_ids = vec![None];

        for label in self.render_leaves() {
            let class = match mapping {
                Some(m) => match m.index_of(label.classification.as_deref()) {
                    Some(i) => i,
                    None => continue,
                },
                None => 1,
            };
            let Some(mask) = label.render_mask(w, h, options.fill, Vertex::ZERO, &options.context) else {
                continue;
            };
            masks.push(mask);
            instance_classes.push(class);
            object_ids.push(label.id.clone());
        }

        let raster = if options.multichannel {
            let mut planes = Array3::<bool>::from_elem((h, w, masks.len() + 1), false);
            planes.slice_mut(s![.., .., 0]).fill(true);
            for (n, mask) in masks.iter().enumerate() {
                planes.slice_mut(s![.., .., n + 1]).assign(mask);
                Zip::from(planes.slice_mut(s![.., .., 0]))
                    .and(mask)
                    .for_each(|bg, &m| *bg &= !m);
            }
            LabelRaster::Multichannel(planes)
        } else {
            let mut indexed = Array2::<i32>::zeros((h, w));
            for (n, mask) in masks.iter().enumerate() {
                paint(&mut indexed, mask, (n + 1) as i32);
            }
            LabelRaster::Indexed(indexed)
        };

        log::info!("Rendered {} label instances into a {}x{} image", masks.len(), w, h);
        InstanceRender {
            raster,
            instance_classes,
            object_ids,
        }
    }

    /// Cut out each matching label from `image` with its mask as alpha.
    ///
    /// The crop window runs from the floor of the label's lower bound up to,
    /// but not including, the ceiling of its upper bound, clamped to the image.
    /// Rasterisation covers boundary pixels inclusively, so a box with integer
    /// corners loses its last row and column of mask pixels in the cut-out.
    ///
    /// Labels whose box falls outside the image or whose mask is empty are
    /// skipped.
    pub fn extract_label_images(
        &self,
        image: &DynamicImage,
        classes: Option<&[&str]>,
        context: &LabelContext,
    ) -> Vec<RgbaImage> {
        let (img_w, img_h) = image.dimensions();
        let mut out = Vec::new();

        for label in self.render_leaves() {
            if let Some(filter) = classes {
                match label.classification.as_deref() {
                    Some(c) if filter.contains(&c) => {}
                    _ => continue,
                }
            }
            let Some(bounds) = label.bounding_box(context) else {
                continue;
            };
            let (x0, y0, x1, y1) = bounds.pixel_window(img_w as usize, img_h as usize);
            let (w, h) = (x1 - x0, y1 - y0);
            if w == 0 || h == 0 {
                continue;
            }
            let offset = Vertex::new(-(x0 as f64), -(y0 as f64));
            let Some(mask) = label.render_mask(w, h, true, offset, context) else {
                continue;
            };
            if !mask.iter().any(|&m| m) {
                continue;
            }
            let crop = image
                .crop_imm(x0 as u32, y0 as u32, w as u32, h as u32)
                .to_rgba8();
            let cutout = RgbaImage::from_fn(w as u32, h as u32, |x, y| {
                let Rgba([r, g, b, _]) = *crop.get_pixel(x, y);
                let alpha = if mask[[y as usize, x as usize]] { 255 } else { 0 };
                Rgba([r, g, b, alpha])
            });
            out.push(cutout);
        }

        log::info!("Extracted {} label images", out.len());
        out
    }
}

fn paint(target: &mut Array2<i32>, mask: &Array2<bool>, value: i32) {
    Zip::from(target).and(mask).for_each(|t, &m| {
        if m {
            *t = value;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> LabelCollection {
        LabelCollection::from_labels(vec![
            Label::bbox(Vertex::new(5.0, 5.0), Vertex::new(4.0, 4.0)).with_class("a"),
            Label::bbox(Vertex::new(7.0, 5.0), Vertex::new(4.0, 4.0)).with_class("b"),
            Label::group(vec![
                Label::point(Vertex::new(15.0, 15.0)).with_class("a"),
                Label::composite(vec![]),
            ])
            .with_class("b"),
            Label::point(Vertex::new(1.0, 18.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_mapping_constructors() {
        let m = ClassMapping::from_sequence(["a", "b", "c"]);
        assert_eq!(m.index_of(Some("a")), Some(1));
        assert_eq!(m.index_of(Some("c")), Some(3));
        assert_eq!(m.index_of(None), None);
        assert_eq!(m.max_index(), 3);

        let g = ClassMapping::from_groups([vec!["a", "b"], vec!["c"]]);
        assert_eq!(g.index_of(Some("b")), Some(1));
        assert_eq!(g.index_of(Some("c")), Some(2));

        let groups = [
            LabelClassGroup::new("x", vec![LabelClass::new("tree", "Tree")]),
            LabelClassGroup::new("y", vec![LabelClass::new("car", "Car"), LabelClass::new("bus", "Bus")]),
        ];
        let cg = ClassMapping::from_class_groups(&groups);
        assert_eq!(cg.index_of(Some("bus")), Some(2));
        let lc = ClassMapping::from_label_classes(&groups[1].group_classes);
        assert_eq!(lc.index_of(Some("bus")), Some(2));

        let z = ClassMapping::new().with("a", 0).with_unclassified(4);
        assert_eq!(z.index_of(Some("a")), None);
        assert_eq!(z.index_of(None), Some(4));
        assert_eq!(z.len(), 2);
    }

    #[test]
    fn test_classes_painters_order() {
        let c = labels();
        let mapping = ClassMapping::from_sequence(["a", "b"]);
        let raster = c.render_label_classes(&mapping, &RenderOptions::new(20, 20));
        let img = raster.as_indexed().unwrap();
        assert_eq!(img.dim(), (20, 20));
        assert_eq!(img[[5, 3]], 1);
        // overlap taken by the later label
        assert_eq!(img[[5, 6]], 2);
        assert_eq!(img[[5, 9]], 2);
        // group child rendered with its own class
        assert_eq!(img[[15, 15]], 1);
        // unclassified point is unmapped
        assert_eq!(img[[18, 1]], 0);
        assert_eq!(img[[0, 0]], 0);
    }

    #[test]
    fn test_classes_multichannel() {
        let c = labels();
        let mapping = ClassMapping::from_sequence(["a", "b"]);
        let raster = c.render_label_classes(&mapping, &RenderOptions::new(20, 20).with_multichannel(true));
        let planes = raster.as_multichannel().unwrap();
        assert_eq!(planes.dim(), (20, 20, 2));
        assert!(planes[[5, 6, 0]] && planes[[5, 6, 1]]);
        assert!(planes[[15, 15, 0]] && !planes[[15, 15, 1]]);
        assert_eq!(raster.size(), (20, 20));
    }

    #[test]
    fn test_instances_indexed() {
        let c = labels();
        let mapping = ClassMapping::from_sequence(["a", "b"]);
        let inst = c.render_label_instances(Some(&mapping), &RenderOptions::new(20, 20));
        assert_eq!(inst.instance_classes, vec![0, 1, 2, 1]);
        assert_eq!(inst.instance_count(), 3);
        assert_eq!(inst.object_ids[0], None);
        assert_eq!(inst.object_ids[3], c.labels()[2].children()[0].id);
        let img = inst.raster.as_indexed().unwrap();
        assert_eq!(img[[5, 3]], 1);
        assert_eq!(img[[5, 6]], 2);
        assert_eq!(img[[15, 15]], 3);
    }

    #[test]
    fn test_instances_without_mapping() {
        let c = labels();
        let inst = c.render_label_instances(None, &RenderOptions::new(20, 20).with_multichannel(true));
        assert_eq!(inst.instance_classes, vec![0, 1, 1, 1, 1]);
        let planes = inst.raster.as_multichannel().unwrap();
        assert_eq!(planes.dim(), (20, 20, 5));
        assert!(planes[[0, 19, 0]]);
        assert!(!planes[[18, 1, 0]] && planes[[18, 1, 4]]);
        assert!(planes[[5, 6, 1]] && planes[[5, 6, 2]]);
    }

    #[test]
    fn test_outline_mode() {
        let c = LabelCollection::from_labels(vec![
            Label::bbox(Vertex::new(10.0, 10.0), Vertex::new(6.0, 6.0)).with_class("a"),
        ])
        .unwrap();
        let mapping = ClassMapping::from_sequence(["a"]);
        let raster = c.render_label_classes(&mapping, &RenderOptions::new(20, 20).with_fill(false));
        let img = raster.as_indexed().unwrap();
        assert_eq!(img[[7, 10]], 1);
        assert_eq!(img[[10, 10]], 0);
    }

    #[test]
    fn test_extract_label_images() {
        let mut rgb = image::RgbImage::new(20, 20);
        for (x, y, p) in rgb.enumerate_pixels_mut() {
            *p = image::Rgb([x as u8, y as u8, 7]);
        }
        let image = DynamicImage::ImageRgb8(rgb);
        let c = LabelCollection::from_labels(vec![
            Label::bbox(Vertex::new(5.0, 5.0), Vertex::new(4.0, 2.0)).with_class("a"),
            Label::polygon(vec![vec![
                Vertex::new(10.0, 10.0),
                Vertex::new(16.0, 10.0),
                Vertex::new(10.0, 16.0),
            ]])
            .with_class("b"),
            Label::point(Vertex::new(50.0, 50.0)).with_class("a"),
            Label::bbox(Vertex::new(2.0, 2.0), Vertex::new(0.0, 0.0)).with_class("a"),
        ])
        .unwrap();

        let ctx = LabelContext::default();
        let all = c.extract_label_images(&image, None, &ctx);
        assert_eq!(all.len(), 2);
        let first = &all[0];
        assert_eq!(first.dimensions(), (4, 2));
        assert_eq!(*first.get_pixel(0, 0), Rgba([3, 4, 7, 255]));

        let tri = &all[1];
        assert_eq!(tri.dimensions(), (6, 6));
        assert_eq!(tri.get_pixel(0, 0).0[3], 255);
        assert_eq!(tri.get_pixel(5, 5).0[3], 0);

        let only_b = c.extract_label_images(&image, Some(&["b"]), &ctx);
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b[0].dimensions(), (6, 6));
    }

    #[test]
    fn test_huge_shapes_render_within_image() {
        let c = LabelCollection::from_labels(vec![
            Label::bbox(Vertex::new(10.0, 10.0), Vertex::new(2e6, 2e6)).with_class("a"),
            Label::point(Vertex::new(-1e300, 5.0)).with_class("b"),
            Label::polygon(vec![vec![
                Vertex::new(-1e300, -1e300),
                Vertex::new(1e300, -1e300),
                Vertex::new(0.0, 1e300),
            ]])
            .with_class("b"),
        ])
        .unwrap();
        let mapping = ClassMapping::from_sequence(["a", "b"]);

        let filled = c.render_label_classes(&mapping, &RenderOptions::new(20, 20));
        assert!(filled.as_indexed().unwrap().iter().all(|&v| v == 2));

        let outlined = c.render_label_classes(&mapping, &RenderOptions::new(20, 20).with_fill(false));
        assert!(outlined.as_indexed().unwrap().iter().all(|&v| v == 0));

        let wide = RenderOptions::new(20, 20).with_context(LabelContext::new(1e12));
        let discs = LabelCollection::from_labels(vec![Label::point(Vertex::new(3.0, 3.0))])
            .unwrap()
            .render_label_instances(None, &wide);
        assert!(discs.raster.as_indexed().unwrap().iter().all(|&v| v == 1));
    }

    #[test]
    fn test_extract_crop_excludes_upper_edge() {
        let image = DynamicImage::ImageRgb8(image::RgbImage::new(20, 20));
        let c = LabelCollection::from_labels(vec![Label::bbox(Vertex::new(10.0, 10.0), Vertex::new(4.0, 6.0))])
            .unwrap();
        let cut = c.extract_label_images(&image, None, &LabelContext::default());
        assert_eq!(cut[0].dimensions(), (4, 6));
        assert!(cut[0].pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn test_end_to_end_box() {
        let c = LabelCollection::from_labels(vec![
            Label::bbox(Vertex::new(10.0, 10.0), Vertex::new(4.0, 6.0))
                .with_id("p__1")
                .with_class("tree"),
        ])
        .unwrap();
        let mapping = ClassMapping::new().with("tree", 1);
        let raster = c.render_label_classes(&mapping, &RenderOptions::new(20, 20));
        let img = raster.as_indexed().unwrap();
        for ((y, x), v) in img.indexed_iter() {
            let inside = (8..=12).contains(&x) && (7..=13).contains(&y);
            assert_eq!(*v, inside as i32, "pixel ({x}, {y})");
        }
    }
}
