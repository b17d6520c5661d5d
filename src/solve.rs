use log::{debug, trace};
use nalgebra::{Point3, Unit, Vector3};

use crate::{
    error::Result,
    gradient::{estimate_normal, GradientConfig},
    march::{march, MarchConfig},
    math::{self, Finite},
    shape::Shape,
};

/// Below this length the cross product of the approach direction with a reference axis is
/// treated as parallel.
const TANGENT_EPSILON: f32 = 1e-4;

/// Field differences below this are float noise when comparing the two sides of a center.
const SIDE_EPSILON: f32 = 1e-4;

/// How the solver finds the point it takes the gradient at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Composition {
    /// Sphere trace from the query point and use the closest sample of the march.
    #[default]
    March,

    /// Offset the query point by one unit along a tangent of the approach direction, then take
    /// a single step along the approach direction.
    TangentOffset,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveConfig {
    pub march: MarchConfig,
    pub gradient: GradientConfig,
    pub composition: Composition,
}

/// The solver's estimate of the surface near a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    /// The field value at the point the normal was taken from.
    pub distance: f32,

    /// The estimated nearest point on the surface, in world space.
    pub point: Point3<f32>,

    /// The outward surface normal, in world space.
    pub normal: Unit<Vector3<f32>>,
}

/// A unit direction perpendicular to `direction`: world up projected onto the plane
/// perpendicular to `direction`, or world right when `direction` is parallel to up.
pub fn tangent(direction: &Unit<Vector3<f32>>) -> Unit<Vector3<f32>> {
    let project = |axis: Vector3<f32>| {
        let side = axis.cross(&direction.into_inner());
        Unit::try_new(side, TANGENT_EPSILON)
            .map(|side| Unit::new_normalize(direction.cross(&side.into_inner())))
    };

    project(Vector3::y()).unwrap_or_else(|| {
        trace!("approach {:?} is parallel to up, using right", direction);

        // a direction parallel to up is perpendicular to right, so this projection never fails
        project(Vector3::x()).unwrap_or_else(Vector3::x_axis)
    })
}

/// Find the point the normal is estimated from, according to the configured composition.
fn center(
    query: &Point3<f32>,
    approach: &Unit<Vector3<f32>>,
    shape: &Shape,
    config: &SolveConfig,
) -> Result<Point3<f32>> {
    match config.composition {
        Composition::March => {
            let res = march(query, approach, shape, &config.march)?;
            Ok(res.closest().point)
        }

        Composition::TangentOffset => {
            let probe = query + tangent(approach).into_inner();
            Ok(probe + approach.scale(shape.distance(&probe)))
        }
    }
}

/// Find the nearest point on `shape` to `query` when approaching along `approach`, along with
/// the outward normal there.
pub fn solve(
    query: &Point3<f32>,
    approach: &Vector3<f32>,
    shape: &Shape,
    config: &SolveConfig,
) -> Result<SurfaceSample> {
    config.gradient.validate()?;
    query.ensure_finite("query")?;
    let approach = math::direction(approach)?;

    let center = center(query, &approach, shape, config)?;
    let distance = shape.distance(&center);

    // Near the zero set of an unsigned field the one-sided probes can straddle the surface, so
    // take the gradient from whichever side along the approach lies further from the shape. On
    // a tie the center is on the surface, and the side the approach came from wins.
    let delta = config.gradient.delta;
    let normal = if distance <= delta {
        let step = approach.scale(delta);
        let (behind, ahead) = (center - step, center + step);
        let probe = if shape.distance(&ahead) > shape.distance(&behind) + SIDE_EPSILON {
            ahead
        } else {
            behind
        };
        debug!(
            "center {:?} is within {} of the surface, estimating the normal at {:?}",
            center, delta, probe
        );
        estimate_normal(&probe, shape, &config.gradient)?
    } else {
        estimate_normal(&center, shape, &config.gradient)?
    };

    Ok(SurfaceSample {
        distance,
        point: center - normal.scale(distance),
        normal,
    })
}

#[cfg(test)]
use {
    crate::{error::Error, shape::Prim, transform::Frame},
    approx::assert_relative_eq,
};

#[test]
fn test_tangent() {
    let t = tangent(&Vector3::z_axis());
    assert_relative_eq!(t.into_inner(), Vector3::new(0., 1., 0.));

    let d = Unit::new_normalize(Vector3::new(1., 1., 0.));
    let t = tangent(&d);
    assert_relative_eq!(t.dot(&d.into_inner()), 0., epsilon = 1e-6);
    assert!(t.y > 0.);
}

#[test]
fn test_tangent_parallel_to_up() {
    let t = tangent(&Vector3::y_axis());
    assert_eq!(t.into_inner(), Vector3::new(1., 0., 0.));

    let t = tangent(&-Vector3::y_axis());
    assert_eq!(t.into_inner(), Vector3::new(1., 0., 0.));

    // nearly parallel directions still produce a finite perpendicular
    let d = Unit::new_normalize(Vector3::new(1e-6, 1., 0.));
    let t = tangent(&d);
    assert!(t.iter().all(|c| c.is_finite()));
    assert_relative_eq!(t.dot(&d.into_inner()), 0., epsilon = 1e-5);
}

#[test]
fn test_solve_head_on_rectangle() {
    let shape = Shape::local(Prim::rectangle(2., 2.).unwrap());
    let res = solve(
        &Point3::new(0.2, 3., 0.1),
        &Vector3::new(0., -1., 0.),
        &shape,
        &SolveConfig::default(),
    )
    .unwrap();

    assert_eq!(res.distance, 0.);
    assert_relative_eq!(res.point, Point3::new(0.2, 0., 0.1), epsilon = 1e-6);
    assert_relative_eq!(res.normal.into_inner(), Vector3::new(0., 1., 0.), epsilon = 1e-6);
}

#[test]
fn test_solve_from_below() {
    let shape = Shape::local(Prim::rectangle(2., 2.).unwrap());
    let res = solve(
        &Point3::new(0., -2., 0.),
        &Vector3::new(0., 1., 0.),
        &shape,
        &SolveConfig::default(),
    )
    .unwrap();

    assert_eq!(res.distance, 0.);
    assert_relative_eq!(res.normal.into_inner(), Vector3::new(0., -1., 0.), epsilon = 1e-6);
}

#[test]
fn test_solve_near_surface_from_either_side() {
    let shape = Shape::local(Prim::rectangle(4., 4.).unwrap());

    for composition in [Composition::March, Composition::TangentOffset] {
        let config = SolveConfig {
            composition,
            ..SolveConfig::default()
        };

        // the tangent offset moves the foot one unit along world right
        let foot = match composition {
            Composition::March => Point3::origin(),
            Composition::TangentOffset => Point3::new(1., 0., 0.),
        };

        for approach in [Vector3::y(), -Vector3::y()] {
            for h in [0.01, 0.05, 0.099, 0.1, 0.11] {
                let query = Point3::new(0., h, 0.);
                let res = solve(&query, &approach, &shape, &config).unwrap();

                assert!(
                    res.normal.dot(&(query - res.point)) > 0.,
                    "{:?} {:?} at {}: {:?}",
                    composition,
                    approach,
                    h,
                    res
                );
                assert!((res.point - foot).norm() < 0.05);
                assert_relative_eq!(res.normal.into_inner(), Vector3::y(), epsilon = 1e-5);
            }
        }
    }
}

#[test]
fn test_solve_in_frame() {
    let frame = Frame::new()
        .translate(&Point3::new(0., 0., 4.))
        .rotate_euler(90., 0., 0.);
    let shape = Shape::new(Prim::rectangle(2., 2.).unwrap(), frame);

    // the rectangle now lies in the world XY plane at z = 4
    let res = solve(
        &Point3::new(0., 0., 1.),
        &Vector3::new(0., 0., 1.),
        &shape,
        &SolveConfig::default(),
    )
    .unwrap();

    assert_relative_eq!(res.distance, 0., epsilon = 1e-5);
    assert_relative_eq!(res.point, Point3::new(0., 0., 4.), epsilon = 1e-4);
    assert_relative_eq!(res.normal.into_inner(), Vector3::new(0., 0., -1.), epsilon = 1e-4);
}

#[test]
fn test_solve_tangent_offset() {
    use std::f32::consts::FRAC_1_SQRT_2;

    let shape = Shape::local(Prim::rectangle(4., 4.).unwrap());
    let config = SolveConfig {
        composition: Composition::TangentOffset,
        ..SolveConfig::default()
    };

    // the tangent is (0, 1, 1) / sqrt(2), so the probe sits at a height of 2 + 1/sqrt(2) above
    // the footprint and the single step covers that much along the approach
    let res = solve(
        &Point3::new(0., 2., -1.),
        &Vector3::new(0., -1., 1.),
        &shape,
        &config,
    )
    .unwrap();

    assert_relative_eq!(res.distance, 1.5 - FRAC_1_SQRT_2, epsilon = 1e-5);
    assert_relative_eq!(
        res.point,
        Point3::new(0., 0., 3. * FRAC_1_SQRT_2 - 0.5),
        epsilon = 1e-5
    );
    assert_relative_eq!(res.normal.into_inner(), Vector3::new(0., 1., 0.), epsilon = 1e-6);
}

#[test]
fn test_solve_tangent_offset_parallel_to_up() {
    let shape = Shape::local(Prim::rectangle(4., 4.).unwrap());
    let config = SolveConfig {
        composition: Composition::TangentOffset,
        ..SolveConfig::default()
    };

    // the tangent falls back to world right, the probe lands at (1, 2, 0)
    let res = solve(
        &Point3::new(0., 2., 0.),
        &Vector3::new(0., -1., 0.),
        &shape,
        &config,
    )
    .unwrap();

    assert_eq!(res.distance, 0.);
    assert_relative_eq!(res.point, Point3::new(1., 0., 0.), epsilon = 1e-6);
    assert_relative_eq!(res.normal.into_inner(), Vector3::new(0., 1., 0.), epsilon = 1e-6);
}

#[test]
fn test_solve_rejects_bad_input() {
    let shape = Shape::local(Prim::segment(1.).unwrap());
    let config = SolveConfig::default();

    assert_eq!(
        solve(&Point3::new(0., f32::INFINITY, 0.), &Vector3::z(), &shape, &config),
        Err(Error::NonFinite("query"))
    );
    assert_eq!(
        solve(&Point3::new(0., 1., 0.), &Vector3::zeros(), &shape, &config),
        Err(Error::DegenerateDirection)
    );
    assert_eq!(
        solve(
            &Point3::new(0., 1., 0.),
            &Vector3::new(f32::NAN, 0., 0.),
            &shape,
            &config
        ),
        Err(Error::NonFinite("direction"))
    );

    let config = SolveConfig {
        march: MarchConfig {
            max_steps: 0,
            ..MarchConfig::default()
        },
        ..SolveConfig::default()
    };
    assert!(matches!(
        solve(&Point3::new(0., 1., 0.), &Vector3::z(), &shape, &config),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn test_solve_never_returns_nan() {
    let shapes = [
        Shape::local(Prim::segment(0.).unwrap()),
        Shape::local(Prim::segment(1.).unwrap()),
        Shape::local(Prim::rectangle(2., 1.).unwrap()),
        Shape::local(Prim::torus(1.).unwrap()),
    ];
    let directions = [
        Vector3::x(),
        Vector3::y(),
        -Vector3::y(),
        Vector3::z(),
        Vector3::new(1., 1., 1.),
    ];
    let queries = [
        Point3::origin(),
        Point3::new(0., 1., 0.),
        Point3::new(2., -1., 0.5),
        Point3::new(0., 0.05, 0.05),
    ];

    for composition in [Composition::March, Composition::TangentOffset] {
        let config = SolveConfig {
            composition,
            ..SolveConfig::default()
        };
        for shape in &shapes {
            for dir in &directions {
                for query in &queries {
                    match solve(query, dir, shape, &config) {
                        Ok(res) => {
                            assert!(res.distance.is_finite() && res.distance >= 0.);
                            assert!(res.point.is_finite());
                            assert!(res.normal.iter().all(|c| c.is_finite()));
                        }
                        Err(err) => assert!(matches!(err, Error::DegenerateGradient { .. })),
                    }
                }
            }
        }
    }
}
