use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};

use lightshape::{
    batch::{self, Query},
    march::{march, MarchConfig},
    solve, Frame, Prim, Shape, SolveConfig,
};

#[test]
fn segment_approached_sideways() {
    let shape = Shape::local(Prim::segment(1.0).unwrap());
    let res = solve(
        &Point3::new(0.0, 0.5, 0.0),
        &Vector3::new(0.0, 0.0, 1.0),
        &shape,
        &SolveConfig::default(),
    )
    .unwrap();

    assert_relative_eq!(res.distance, 0.5, epsilon = 1e-6);
    assert!(res.point.coords.norm() < 0.05);
    assert!(res.normal.y > 0.99);
    assert_eq!(res.normal.x, 0.0);
}

#[test]
fn segment_close_above_either_approach() {
    let shape = Shape::local(Prim::segment(1.0).unwrap());
    let query = Point3::new(0.0, 0.05, 0.0);

    for approach in [Vector3::new(0.0, 1.0, 0.0), Vector3::new(0.0, -1.0, 0.0)] {
        let res = solve(&query, &approach, &shape, &SolveConfig::default()).unwrap();

        assert!(res.normal.y > 0.9);
        assert!(res.normal.dot(&(query - res.point)) > 0.0);
        assert!(res.point.coords.norm() < 0.05);
    }
}

#[test]
fn rectangle_along_its_normal() {
    let shape = Shape::local(Prim::rectangle(2.0, 2.0).unwrap());
    let approach = Vector3::new(0.0, 1.0, 0.0);
    let res = solve(
        &Point3::new(0.0, 1.0, 0.0),
        &approach,
        &shape,
        &SolveConfig::default(),
    )
    .unwrap();

    assert_relative_eq!(res.distance, 1.0, epsilon = 1e-6);
    assert!(res.normal.angle(&approach) < 5f32.to_radians());
    assert_relative_eq!(res.point, Point3::origin(), epsilon = 1e-5);
}

#[test]
fn rectangle_in_a_rotated_frame() {
    let frame = Frame::new()
        .translate(&Point3::new(1.0, 2.0, 3.0))
        .rotate_euler(0.0, 0.0, -90.0);
    let shape = Shape::new(Prim::rectangle(2.0, 2.0).unwrap(), frame);

    // the rectangle's up now points along world +X
    let approach = shape.frame.up().into_inner();
    let query = Point3::new(2.5, 2.0, 3.0);
    let res = solve(&query, &approach, &shape, &SolveConfig::default()).unwrap();

    assert_relative_eq!(res.distance, 1.5, epsilon = 1e-5);
    assert!(res.normal.angle(&approach) < 5f32.to_radians());
    assert_relative_eq!(res.point, Point3::new(1.0, 2.0, 3.0), epsilon = 1e-4);
}

#[test]
fn solve_is_pure() {
    let shapes = [
        Shape::local(Prim::segment(1.0).unwrap()),
        Shape::local(Prim::rectangle(2.0, 1.0).unwrap()),
        Shape::local(Prim::torus(1.5).unwrap()),
    ];
    let query = Point3::new(0.3, 1.2, -0.7);
    let approach = Vector3::new(-0.2, -1.0, 0.4);

    for shape in &shapes {
        let first = solve(&query, &approach, shape, &SolveConfig::default());
        let second = solve(&query, &approach, shape, &SolveConfig::default());
        assert_eq!(first, second);
    }
}

#[test]
fn march_converges_head_on() {
    let shape = Shape::local(Prim::segment(1.0).unwrap());
    let config = MarchConfig {
        min_dist: 1e-4,
        ..MarchConfig::default()
    };
    for &d in &[0.25f32, 1.0, 7.5] {
        // aim from beyond the end point straight at it
        let origin = Point3::new(0.5 + d * 0.6, d * 0.8, 0.0);
        let res = march(
            &origin,
            &Vector3::new(-0.6, -0.8, 0.0),
            &shape,
            &config,
        )
        .unwrap();

        assert_relative_eq!(res.steps()[0].distance, d, epsilon = 1e-5);
        for pair in res.steps().windows(2) {
            assert!(pair[1].distance <= pair[0].distance);
        }
        assert!(res.last().distance < d);
    }
}

#[test]
fn batch_over_a_torus() {
    let shape = Shape::local(Prim::torus(2.0).unwrap());
    let queries: Vec<Query> = (0..16)
        .map(|i| {
            let a = i as f32 / 16.0 * std::f32::consts::TAU;
            Query::new(
                Point3::new(3.0 * a.cos(), 0.0, 3.0 * a.sin()),
                Vector3::new(-a.cos(), 0.0, -a.sin()),
            )
        })
        .collect();

    let results = batch::solve_all(&queries, &shape, &SolveConfig::default());
    assert_eq!(results.len(), queries.len());
    for (query, res) in queries.iter().zip(results) {
        let res = res.unwrap();
        assert!(res.distance < 0.1);

        // every sample lands on the ring, between the query and the center
        let radial = Vector3::new(res.point.x, 0.0, res.point.z).norm();
        assert_relative_eq!(radial, 2.0, epsilon = 0.1);
        assert!(res.normal.dot(&-query.direction) > 0.85);
    }
}
