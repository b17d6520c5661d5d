use crossbeam::thread;
use log::debug;
use nalgebra::{Point3, Vector3};

use crate::{
    error::Result,
    shape::Shape,
    solve::{solve, SolveConfig, SurfaceSample},
};

/// A query point and the direction the surface is approached along.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Query {
    pub point: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Query {
    pub fn new(point: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self { point, direction }
    }
}

/// Solve every query against `shape`, using one worker per CPU.
pub fn solve_all(
    queries: &[Query],
    shape: &Shape,
    config: &SolveConfig,
) -> Vec<Result<SurfaceSample>> {
    solve_all_with_threads(queries, shape, config, num_cpus::get())
}

/// Solve every query against `shape` on up to `num_threads` workers. Results are returned in
/// the same order as `queries`, and match what [`solve`] returns for each one.
pub fn solve_all_with_threads(
    queries: &[Query],
    shape: &Shape,
    config: &SolveConfig,
    num_threads: usize,
) -> Vec<Result<SurfaceSample>> {
    if queries.is_empty() {
        return Vec::new();
    }

    let num_threads = num_threads.clamp(1, queries.len());
    let chunk_size = (queries.len() + num_threads - 1) / num_threads;
    debug!(
        "solving {} queries on {} threads",
        queries.len(),
        num_threads
    );

    thread::scope(|s| {
        let workers: Vec<_> = queries
            .chunks(chunk_size)
            .map(|chunk| {
                s.spawn(move |_| {
                    chunk
                        .iter()
                        .map(|q| solve(&q.point, &q.direction, shape, config))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        workers
            .into_iter()
            .flat_map(|worker| {
                worker
                    .join()
                    .unwrap_or_else(|err| std::panic::resume_unwind(err))
            })
            .collect()
    })
    .unwrap_or_else(|err| std::panic::resume_unwind(err))
}

#[cfg(test)]
use crate::{error::Error, shape::Prim};

#[cfg(test)]
fn queries() -> Vec<Query> {
    (0..37)
        .map(|i| {
            let t = i as f32 / 36.;
            Query::new(
                Point3::new(-2. + 4. * t, 1. + t, 0.5 - t),
                Vector3::new(0., -1., 0.25),
            )
        })
        .collect()
}

#[test]
fn test_matches_sequential() {
    let shape = Shape::local(Prim::rectangle(2., 1.).unwrap());
    let config = SolveConfig::default();
    let queries = queries();

    let expected: Vec<_> = queries
        .iter()
        .map(|q| solve(&q.point, &q.direction, &shape, &config))
        .collect();

    for threads in [1, 2, 3, 8, 100] {
        assert_eq!(
            solve_all_with_threads(&queries, &shape, &config, threads),
            expected
        );
    }
    assert_eq!(solve_all(&queries, &shape, &config), expected);
}

#[test]
fn test_empty() {
    let shape = Shape::local(Prim::segment(1.).unwrap());
    assert!(solve_all(&[], &shape, &SolveConfig::default()).is_empty());
}

#[test]
fn test_errors_stay_in_place() {
    let shape = Shape::local(Prim::segment(1.).unwrap());
    let queries = [
        Query::new(Point3::new(0., 1., 0.), Vector3::new(0., -1., 0.)),
        Query::new(Point3::new(0., 1., 0.), Vector3::zeros()),
        Query::new(Point3::new(0., 2., 0.), Vector3::new(0., 1., 0.)),
    ];
    let res = solve_all_with_threads(&queries, &shape, &SolveConfig::default(), 0);
    assert_eq!(res.len(), 3);
    assert!(res[0].is_ok());
    assert_eq!(res[1], Err(Error::DegenerateDirection));
    assert!(res[2].is_ok());
}
