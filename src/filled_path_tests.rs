use crate::math::{point, Point};
use crate::{
    chunk_from_fill_rule, chunk_from_winding_number, ClipEquation, ClipMatrix, CustomFillRule,
    FillAttribute, FilledPath, FillOptions, FillRule, FlattenedPath, ScratchSpace,
};

fn path_from_polygons(polygons: &[&[Point]]) -> FlattenedPath {
    let mut builder = FlattenedPath::builder();
    for polygon in polygons {
        builder.add_polygon(polygon);
    }
    builder.build()
}

fn filled(polygons: &[&[Point]]) -> FilledPath {
    FilledPath::new(&path_from_polygons(polygons))
}

/// Everything a writer produced, copied out so the borrow of the path ends.
#[derive(Clone, Debug, PartialEq)]
struct Mesh {
    attributes: Vec<Vec<FillAttribute>>,
    /// (attribute chunk, indices) per index chunk.
    chunks: Vec<(usize, Vec<u32>)>,
}

impl Mesh {
    fn from_writer(writer: &crate::DataWriter) -> Mesh {
        let attributes = (0..writer.number_attribute_chunks())
            .map(|c| {
                let mut attrs = vec![
                    FillAttribute {
                        position: point(0.0, 0.0),
                        interior: 0.0,
                    };
                    writer.number_attributes(c)
                ];
                writer.write_attributes(&mut attrs, c);
                attrs
            })
            .collect();
        let chunks = (0..writer.number_index_chunks())
            .map(|c| {
                let mut indices = vec![0u32; writer.number_indices(c)];
                writer.write_indices(&mut indices, 0, c);
                (writer.attribute_chunk_selection(c), indices)
            })
            .collect();
        Mesh { attributes, chunks }
    }

    fn triangles(&self) -> Vec<[Point; 3]> {
        let mut out = Vec::new();
        for (attribute_chunk, indices) in &self.chunks {
            let attrs = &self.attributes[*attribute_chunk];
            for tri in indices.chunks(3) {
                out.push([
                    attrs[tri[0] as usize].position,
                    attrs[tri[1] as usize].position,
                    attrs[tri[2] as usize].position,
                ]);
            }
        }
        out
    }

    fn covers(&self, p: Point) -> bool {
        self.triangles()
            .iter()
            .any(|t| point_in_triangle(p, t[0], t[1], t[2]))
    }

    fn total_indices(&self) -> usize {
        self.chunks.iter().map(|(_, i)| i.len()).sum()
    }
}

fn point_in_triangle(p: Point, a: Point, b: Point, c: Point) -> bool {
    fn edge(p: Point, a: Point, b: Point) -> f32 {
        (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
    }
    let eps = 1e-4;
    let d1 = edge(p, a, b);
    let d2 = edge(p, b, c);
    let d3 = edge(p, c, a);
    let has_neg = d1 < -eps || d2 < -eps || d3 < -eps;
    let has_pos = d1 > eps || d2 > eps || d3 > eps;
    !(has_neg && has_pos)
}

fn full_mesh<R: CustomFillRule>(filled: &mut FilledPath, rule: &R) -> Mesh {
    let mut scratch = ScratchSpace::new();
    let writer = filled.compute_writer(
        &mut scratch,
        rule,
        &[],
        &ClipMatrix::identity(),
        u32::MAX,
        u32::MAX,
    );
    Mesh::from_writer(&writer)
}

// x >= min.x, x <= max.x, y >= min.y, y <= max.y.
fn rect_clip(min: Point, max: Point) -> [ClipEquation; 4] {
    [
        ClipEquation::new(1.0, 0.0, -min.x),
        ClipEquation::new(-1.0, 0.0, max.x),
        ClipEquation::new(0.0, 1.0, -min.y),
        ClipEquation::new(0.0, -1.0, max.y),
    ]
}

fn regular_polygon(center: Point, radius: f32, steps: usize) -> Vec<Point> {
    (0..steps)
        .map(|i| {
            let a = (i as f32) * 2.0 * std::f32::consts::PI / (steps as f32);
            point(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect()
}

#[test]
fn unit_square_nonzero() {
    let mut filled = filled(&[&[
        point(0.0, 0.0),
        point(1.0, 0.0),
        point(1.0, 1.0),
        point(0.0, 1.0),
    ]]);
    assert_eq!(filled.number_subsets(), 1);
    {
        let subset = filled.subset(0);
        assert_eq!(subset.winding_numbers(), &[1]);
        // Two triangles, six-way subdivided.
        assert_eq!(subset.index_chunk(chunk_from_winding_number(1)).len(), 36);
        assert_eq!(
            subset.index_chunk(chunk_from_fill_rule(FillRule::NonZero)).len(),
            36
        );
        assert!(subset
            .index_chunk(chunk_from_fill_rule(FillRule::ComplementNonZero))
            .is_empty());
        // 4 corners, 5 midpoints, 2 centroids.
        assert_eq!(subset.number_attributes(), 11);
        assert!(!subset.triangulation_failed());
    }

    let mesh = full_mesh(&mut filled, &FillRule::NonZero);
    assert_eq!(mesh.total_indices(), 36);
    for &(x, y) in &[(0.25, 0.25), (0.75, 0.25), (0.5, 0.5), (0.2, 0.8)] {
        assert!(mesh.covers(point(x, y)), "({x}, {y}) must be covered");
    }
}

#[test]
fn concentric_squares_nonzero_and_complement() {
    let outer = [
        point(0.0, 0.0),
        point(10.0, 0.0),
        point(10.0, 10.0),
        point(0.0, 10.0),
    ];
    // Clockwise inner square: the hole has winding zero.
    let inner = [
        point(3.0, 3.0),
        point(3.0, 7.0),
        point(7.0, 7.0),
        point(7.0, 3.0),
    ];
    let mut filled = filled(&[&outer, &inner]);
    {
        let subset = filled.subset(0);
        assert_eq!(subset.winding_numbers(), &[0, 1]);
    }

    let annulus = [point(1.5, 5.0), point(5.0, 1.5), point(8.5, 5.0), point(5.0, 8.5)];
    let hole = [point(5.0, 5.0), point(4.0, 4.5), point(6.0, 5.5)];

    let nonzero = full_mesh(&mut filled, &FillRule::NonZero);
    for p in &annulus {
        assert!(nonzero.covers(*p), "annulus point {p:?}");
    }
    for p in &hole {
        assert!(!nonzero.covers(*p), "hole point {p:?}");
    }

    let complement = full_mesh(&mut filled, &FillRule::ComplementNonZero);
    for p in &hole {
        assert!(complement.covers(*p), "hole point {p:?}");
    }
    for p in &annulus {
        assert!(!complement.covers(*p), "annulus point {p:?}");
    }
}

#[test]
fn bowtie_separates_windings() {
    let mut filled = filled(&[&[
        point(0.0, 0.0),
        point(1.0, 1.0),
        point(1.0, 0.0),
        point(0.0, 1.0),
    ]]);
    {
        let subset = filled.subset(0);
        assert_eq!(subset.winding_numbers(), &[-1, 0, 1]);
        // Each half of the bowtie is two triangles around the crossing.
        assert_eq!(subset.index_chunk(chunk_from_winding_number(1)).len(), 36);
        assert_eq!(subset.index_chunk(chunk_from_winding_number(-1)).len(), 36);
    }

    let left = point(0.2, 0.5);
    let right = point(0.8, 0.5);
    let bottom_wedge = point(0.5, 0.15);

    let odd_even = full_mesh(&mut filled, &FillRule::OddEven);
    assert!(odd_even.covers(left));
    assert!(odd_even.covers(right));
    assert!(!odd_even.covers(bottom_wedge));

    let nonzero = full_mesh(&mut filled, &FillRule::NonZero);
    assert!(nonzero.covers(left));
    assert!(nonzero.covers(right));
    assert!(!nonzero.covers(bottom_wedge));
}

#[test]
fn coincident_shared_edge_makes_no_sliver() {
    let mut filled = filled(&[
        &[point(0.0, 0.0), point(1.0, 0.0), point(0.0, 1.0)],
        &[point(1.0, 0.0), point(1.0, 1.0), point(0.0, 1.0)],
    ]);
    let subset = filled.subset(0);
    assert_eq!(subset.winding_numbers(), &[1]);
    // Two input triangles, each six-way subdivided, and nothing else.
    assert_eq!(
        subset.index_chunk(chunk_from_fill_rule(FillRule::NonZero)).len(),
        2 * 6 * 3
    );
}

#[test]
fn zero_height_path_selects_nothing() {
    let mut filled = filled(&[&[point(0.0, 3.0), point(5.0, 3.0), point(10.0, 3.0)]]);
    assert_eq!(filled.number_subsets(), 0);

    let mut scratch = ScratchSpace::new();
    let mut dst = Vec::new();
    let n = filled.select_subsets(
        &mut scratch,
        &[],
        &ClipMatrix::identity(),
        u32::MAX,
        u32::MAX,
        &mut dst,
    );
    assert_eq!(n, 0);

    let writer = filled.compute_writer(
        &mut scratch,
        &FillRule::NonZero,
        &[],
        &ClipMatrix::identity(),
        u32::MAX,
        u32::MAX,
    );
    assert_eq!(writer.number_attribute_chunks(), 0);
    assert_eq!(writer.number_index_chunks(), 0);
}

#[test]
fn tall_thin_path_splits_along_the_long_axis() {
    // A 1 x 100 rectangle outline with 82 vertices.
    let mut outline = Vec::new();
    for i in 0..=40 {
        outline.push(point(0.0, i as f32 * 2.5));
    }
    for i in (0..=40).rev() {
        outline.push(point(1.0, i as f32 * 2.5));
    }
    let mut filled = filled(&[&outline]);
    assert_eq!(filled.number_subsets(), 3);
    assert_eq!(filled.subset(1).bounds().max.y, 50.0);
    assert_eq!(filled.subset(2).bounds().min.y, 50.0);
    assert_eq!(filled.subset(1).bounds().width(), 1.0);

    // The two halves stitch back together.
    let mesh = full_mesh(&mut filled, &FillRule::NonZero);
    for &(x, y) in &[(0.5, 25.0), (0.5, 50.0), (0.5, 75.0)] {
        assert!(mesh.covers(point(x, y)), "({x}, {y}) must be covered");
    }
}

#[test]
fn deep_hierarchy_preserves_windings() {
    let diamond = [
        point(0.0, -100.0),
        point(100.0, 0.0),
        point(0.0, 100.0),
        point(-100.0, 0.0),
    ];
    let blob = regular_polygon(point(0.0, 0.0), 5.0, 300);
    let mut filled = filled(&[&diamond, &blob]);
    assert!(filled.number_subsets() > 3);

    let nonzero = full_mesh(&mut filled, &FillRule::NonZero);
    // Inside the diamond, outside the blob: winding 1.
    for &(x, y) in &[(20.0, 20.0), (-30.0, 10.0), (0.0, -60.0), (1.0, 8.0)] {
        assert!(nonzero.covers(point(x, y)), "({x}, {y}) must be covered");
    }
    // Inside the blob: winding 2.
    assert!(nonzero.covers(point(0.0, 0.0)));
    // Outside the diamond but inside the bounding box.
    assert!(!nonzero.covers(point(80.0, 80.0)));

    let double = full_mesh(&mut filled, &|w: i32| w == 2);
    assert!(double.covers(point(0.0, 0.0)));
    assert!(!double.covers(point(20.0, 20.0)));
}

#[test]
fn guiding_boxes_do_not_change_coverage() {
    // Build the blob as one long edge so the guide-box grouping actually
    // kicks in (it restarts at every edge start).
    let blob = regular_polygon(point(0.0, 0.0), 5.0, 40);
    let mut builder = FlattenedPath::builder();
    builder.begin(blob[0]);
    builder.edge(&blob[1..]);
    builder.close();
    let path = builder.build();

    let mut plain = FilledPath::new(&path);
    let mut guided =
        FilledPath::with_options(&path, &FillOptions::DEFAULT.with_guiding_boxes(true));

    let mesh_plain = full_mesh(&mut plain, &FillRule::NonZero);
    let mesh_guided = full_mesh(&mut guided, &FillRule::NonZero);

    for i in -6..=6 {
        for j in -6..=6 {
            let p = point(i as f32 * 0.8, j as f32 * 0.8);
            assert_eq!(
                mesh_plain.covers(p),
                mesh_guided.covers(p),
                "coverage must not depend on guide boxes at {p:?}"
            );
        }
    }
}

#[test]
fn selection_respects_the_clip_region() {
    let diamond = [
        point(0.0, -100.0),
        point(100.0, 0.0),
        point(0.0, 100.0),
        point(-100.0, 0.0),
    ];
    let blob = regular_polygon(point(0.0, 0.0), 5.0, 300);
    let mut filled = filled(&[&diamond, &blob]);

    let clip_min = point(0.0, 0.0);
    let clip_max = point(10.0, 10.0);
    let planes = rect_clip(clip_min, clip_max);
    let mut scratch = ScratchSpace::new();
    let mut dst = Vec::new();
    let n = filled.select_subsets(
        &mut scratch,
        &planes,
        &ClipMatrix::identity(),
        u32::MAX,
        u32::MAX,
        &mut dst,
    );
    assert!(n > 0);
    for &id in &dst {
        let b = filled.subset(id).bounds();
        assert!(
            b.min.x <= clip_max.x && b.max.x >= clip_min.x
                && b.min.y <= clip_max.y && b.max.y >= clip_min.y,
            "subset {id} does not intersect the clip rectangle"
        );
    }

    let writer = filled.compute_writer(
        &mut scratch,
        &FillRule::NonZero,
        &planes,
        &ClipMatrix::identity(),
        u32::MAX,
        u32::MAX,
    );
    let mesh = Mesh::from_writer(&writer);
    assert!(mesh.covers(point(2.0, 2.0)));
    assert!(mesh.covers(point(7.0, 1.0)));
}

#[test]
fn selection_coarsens_once_sizes_are_known() {
    let blob = regular_polygon(point(0.0, 0.0), 5.0, 300);
    let mut filled = filled(&[&blob]);
    let mut scratch = ScratchSpace::new();
    let mut dst = Vec::new();

    // The first pass does not know interior sizes yet, so it emits leaves.
    let first = filled.select_subsets(
        &mut scratch,
        &[],
        &ClipMatrix::identity(),
        u32::MAX,
        u32::MAX,
        &mut dst,
    );
    assert!(first > 1);

    // Sizes are now memoized bottom-up; the whole path fits one draw.
    let second = filled.select_subsets(
        &mut scratch,
        &[],
        &ClipMatrix::identity(),
        u32::MAX,
        u32::MAX,
        &mut dst,
    );
    assert_eq!(second, 1);
    assert_eq!(dst[0], 0);
}

#[test]
fn merged_interior_nodes_cover_like_their_leaves() {
    let blob = regular_polygon(point(0.0, 0.0), 5.0, 300);
    let mut filled = filled(&[&blob]);

    // First writer selects leaves, second the merged root (see
    // selection_coarsens_once_sizes_are_known).
    let leaves = full_mesh(&mut filled, &FillRule::NonZero);
    let merged = full_mesh(&mut filled, &FillRule::NonZero);

    for i in -8..=8 {
        for j in -8..=8 {
            let p = point(i as f32 * 0.7, j as f32 * 0.7);
            assert_eq!(
                leaves.covers(p),
                merged.covers(p),
                "merged bake must match leaf bakes at {p:?}"
            );
        }
    }
}

#[test]
fn baking_is_idempotent() {
    let blob = regular_polygon(point(0.0, 0.0), 5.0, 100);
    let mut filled = filled(&[&blob]);

    let snapshot = |s: &crate::Subset| {
        (
            s.winding_numbers().to_vec(),
            s.attributes().to_vec(),
            (0..s.number_index_chunks())
                .map(|c| s.index_chunk(c).to_vec())
                .collect::<Vec<_>>(),
        )
    };

    let first = snapshot(&filled.subset(0));
    let second = snapshot(&filled.subset(0));
    assert_eq!(first, second);
}

#[test]
fn identical_inputs_produce_identical_output() {
    let diamond = [
        point(0.0, -50.0),
        point(50.0, 0.0),
        point(0.0, 50.0),
        point(-50.0, 0.0),
    ];
    let blob = regular_polygon(point(2.0, 1.0), 7.0, 120);

    let run = || {
        let mut filled = filled(&[&diamond, &blob]);
        full_mesh(&mut filled, &FillRule::NonZero)
    };
    assert_eq!(run(), run());
}

#[test]
fn boundary_flags_mark_fill_silhouettes() {
    let outer = [
        point(0.0, 0.0),
        point(10.0, 0.0),
        point(10.0, 10.0),
        point(0.0, 10.0),
    ];
    let inner = [
        point(3.0, 3.0),
        point(3.0, 7.0),
        point(7.0, 7.0),
        point(7.0, 3.0),
    ];
    let mut filled = filled(&[&outer, &inner]);
    let mesh = full_mesh(&mut filled, &FillRule::NonZero);

    let find = |p: Point| {
        mesh.attributes
            .iter()
            .flatten()
            .find(|a| a.position == p)
            .copied()
    };

    // The inner square's corners touch both winding-1 and winding-0
    // triangles: they sit on the fill boundary.
    let corner = find(point(3.0, 3.0)).expect("inner corner vertex");
    assert_eq!(corner.interior, 0.0);

    // The outer corners touch winding-1 triangles only; under the non-zero
    // rule they are interior.
    let outer_corner = find(point(0.0, 0.0)).expect("outer corner vertex");
    assert_eq!(outer_corner.interior, 1.0);

    assert!(mesh.attributes.iter().flatten().any(|a| a.interior == 1.0));
    assert!(mesh.attributes.iter().flatten().any(|a| a.interior == 0.0));
}

#[test]
fn nested_same_direction_squares_reach_winding_two() {
    let outer = [
        point(0.0, 0.0),
        point(10.0, 0.0),
        point(10.0, 10.0),
        point(0.0, 10.0),
    ];
    let inner = [
        point(2.0, 2.0),
        point(8.0, 2.0),
        point(8.0, 8.0),
        point(2.0, 8.0),
    ];
    let mut filled = filled(&[&outer, &inner]);
    {
        let subset = filled.subset(0);
        assert_eq!(subset.winding_numbers(), &[1, 2]);
        assert!(!subset.index_chunk(chunk_from_winding_number(2)).is_empty());
    }

    let doubled = full_mesh(&mut filled, &|w: i32| w == 2);
    assert!(doubled.covers(point(5.0, 5.0)));
    assert!(!doubled.covers(point(1.0, 1.0)));
}

#[test]
fn invalid_fill_rule_index_defaults_to_nonzero() {
    assert_eq!(FillRule::from_index(0), FillRule::NonZero);
    assert_eq!(FillRule::from_index(3), FillRule::ComplementOddEven);
    assert_eq!(FillRule::from_index(17), FillRule::NonZero);
}
