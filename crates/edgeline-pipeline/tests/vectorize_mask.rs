//! End-to-end properties of `vectorize` on hand-built masks.

#![allow(clippy::unwrap_used)]

use edgeline_pipeline::{
    BinaryMask, Dimensions, PathCommand, PathTracer, PipelineConfig, Point, TracerKind, vectorize,
};

/// Parse an ASCII mask: `#` is set, anything else is clear.
fn mask(rows: &[&str]) -> BinaryMask {
    let rows: Vec<Vec<bool>> = rows
        .iter()
        .map(|r| r.chars().map(|c| c == '#').collect())
        .collect();
    BinaryMask::from_rows(&rows).unwrap()
}

fn frame_points(doc: &edgeline_pipeline::VectorDocument) -> Vec<Point> {
    doc.paths
        .iter()
        .flat_map(|p| p.commands.iter().map(|c| doc.transform.apply(c.point())))
        .collect()
}

#[test]
fn every_element_starts_with_a_move_and_has_a_segment() {
    let m = mask(&[
        "#....#....",
        ".#...#....",
        "..#..#..##",
        "...#.#.#..",
        ".....##...",
        "..........",
        "#########.",
    ]);
    let doc = vectorize(&m, &PipelineConfig::default()).unwrap();
    assert!(!doc.paths.is_empty());
    for element in &doc.paths {
        assert!(element.commands.len() >= 2);
        assert!(matches!(element.commands[0], PathCommand::MoveTo(_)));
        assert!(
            element.commands[1..]
                .iter()
                .all(|c| matches!(c, PathCommand::LineTo(_)))
        );
    }
}

#[test]
fn coordinates_have_at_most_one_decimal() {
    let m = mask(&[
        "..####....",
        ".#....#...",
        "#......#..",
        ".#....#...",
        "..####....",
    ]);
    let doc = vectorize(&m, &PipelineConfig::default()).unwrap();
    for element in &doc.paths {
        for c in &element.commands {
            let p = c.point();
            for v in [p.x, p.y] {
                assert!(((v * 10.0).round() - v * 10.0).abs() < 1e-6, "{v} not rounded");
            }
        }
    }
}

#[test]
fn interpolated_output_stays_inside_frame() {
    let m = mask(&[
        "#.........#",
        ".#.......#.",
        "..#######..",
    ]);
    let config = PipelineConfig {
        smoothing_factor: 0.0,
        frame_size: 100.0,
        ..PipelineConfig::default()
    };
    let doc = vectorize(&m, &config).unwrap();
    for p in frame_points(&doc) {
        assert!((-0.5..=100.5).contains(&p.x), "x={} out of frame", p.x);
        assert!((-0.5..=100.5).contains(&p.y), "y={} out of frame", p.y);
    }
}

#[test]
fn path_count_matches_traced_paths_of_two_or_more() {
    let m = mask(&[
        "##...#",
        "......",
        "..###.",
        "......",
        "#....#",
    ]);
    let traced = TracerKind::Greedy.trace(&m);
    let doc = vectorize(&m, &PipelineConfig::default()).unwrap();
    assert_eq!(traced.len(), 2);
    assert_eq!(doc.paths.len(), traced.len());
}

#[test]
fn tracer_choice_is_honored() {
    let m = mask(&["#...", ".#.#", "..#.", "...#"]);
    let config = |tracer| PipelineConfig {
        tracer,
        smoothing_factor: 0.0,
        ..PipelineConfig::default()
    };
    let greedy = vectorize(&m, &config(TracerKind::Greedy)).unwrap();
    let straight = vectorize(&m, &config(TracerKind::DirectionContinuity)).unwrap();
    assert_ne!(greedy.paths, straight.paths);
    let end = |doc: &edgeline_pipeline::VectorDocument| {
        doc.paths[0].commands.last().map(|c| c.point()).unwrap()
    };
    assert_eq!(end(&straight), Point::new(3.0, 3.0));
}

#[test]
fn wide_mask_is_centered_vertically() {
    let m = BinaryMask::from_fn(
        Dimensions {
            width: 100,
            height: 50,
        },
        |x, y| y == 25 && x < 90,
    );
    let doc = vectorize(&m, &PipelineConfig::default()).unwrap();
    assert!((doc.transform.scale - 2.56).abs() < 1e-12);
    assert!(doc.transform.offset_x.abs() < 1e-12);
    assert!((doc.transform.offset_y - 64.0).abs() < 1e-12);
}
