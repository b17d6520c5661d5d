use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nalgebra::{Point3, Vector3};

use lightshape::{
    batch::{self, Query},
    field::project_on_segment,
    gradient::GradientConfig,
    march::{march, MarchConfig},
    solve::{solve, Composition, SolveConfig, SurfaceSample},
    transform::{ApplyTransform, Frame},
    uniforms::{LightMode, LightParams, UniformMap},
};

/// Inspect the distance field of an area light shape.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// Light shape: line, quad, torus or cross.
    #[arg(long, default_value = "line")]
    mode: LightMode,

    #[arg(long, default_value_t = 1.0)]
    length: f32,

    #[arg(long, default_value_t = 0.0)]
    width: f32,

    #[arg(long, default_value_t = 2.0)]
    range: f32,

    #[arg(long, default_value_t = 200.0)]
    luminance: f32,

    #[arg(long)]
    affect_diffuse: bool,

    #[arg(long)]
    affect_specular: bool,

    /// World position of the light, as `x,y,z`.
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true, default_value = "0,0,0")]
    position: Vector3<f32>,

    /// Euler rotation of the light in degrees, as `x,y,z`.
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true, default_value = "0,0,0")]
    rotation: Vector3<f32>,

    /// Per-axis scale of the light, as `x,y,z`.
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true, default_value = "1,1,1")]
    scale: Vector3<f32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate the field at a world-space point.
    Field {
        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        point: Vector3<f32>,
    },

    /// Sphere trace from a point along a direction.
    March {
        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        point: Vector3<f32>,

        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        direction: Vector3<f32>,

        #[arg(long, default_value_t = 4)]
        steps: u32,

        #[arg(long, default_value_t = 0.0)]
        min_dist: f32,
    },

    /// Find the nearest surface point and normal.
    Solve {
        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        point: Vector3<f32>,

        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        direction: Vector3<f32>,

        #[command(flatten)]
        solver: SolverArgs,
    },

    /// Solve evenly spaced queries on the line between two points, in parallel.
    Scan {
        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        from: Vector3<f32>,

        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        to: Vector3<f32>,

        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        direction: Vector3<f32>,

        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Worker threads, defaults to one per CPU.
        #[arg(long)]
        jobs: Option<usize>,

        #[command(flatten)]
        solver: SolverArgs,
    },

    /// Project a point onto the light's end points segment.
    Project {
        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        point: Vector3<f32>,
    },

    /// Print the shader parameters the light publishes.
    Uniforms,
}

#[derive(clap::Args, Debug)]
struct SolverArgs {
    #[arg(long, default_value_t = 4)]
    steps: u32,

    /// Finite difference offset used for the normal.
    #[arg(long, default_value_t = 0.1)]
    delta: f32,

    /// Offset along a tangent instead of sphere tracing from the query.
    #[arg(long)]
    tangent_offset: bool,
}

impl SolverArgs {
    fn config(&self) -> SolveConfig {
        SolveConfig {
            march: MarchConfig {
                max_steps: self.steps,
                ..MarchConfig::default()
            },
            gradient: GradientConfig {
                delta: self.delta,
                ..GradientConfig::default()
            },
            composition: if self.tangent_offset {
                Composition::TangentOffset
            } else {
                Composition::March
            },
        }
    }
}

fn parse_vec3(s: &str) -> std::result::Result<Vector3<f32>, String> {
    let parts = s
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| format!("invalid number in `{}`: {}", s, err))?;

    match parts.as_slice() {
        &[x, y, z] => Ok(Vector3::new(x, y, z)),
        _ => Err(format!("expected three comma separated values, got `{}`", s)),
    }
}

fn print_sample(res: &SurfaceSample) {
    println!(
        "distance {:.6}  point ({:.6}, {:.6}, {:.6})  normal ({:.6}, {:.6}, {:.6})",
        res.distance, res.point.x, res.point.y, res.point.z, res.normal.x, res.normal.y, res.normal.z
    );
}

impl Cli {
    fn light(&self) -> Result<LightParams> {
        let frame = Frame::new()
            .translate(&Point3::from(self.position))
            .rotate_euler(self.rotation.x, self.rotation.y, self.rotation.z)
            .scale(&self.scale)
            .context("invalid light scale")?;

        Ok(LightParams {
            mode: self.mode,
            length: self.length,
            width: self.width,
            range: self.range,
            luminance: self.luminance,
            affect_diffuse: self.affect_diffuse,
            affect_specular: self.affect_specular,
            frame,
        })
    }
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let light = cli.light()?;

    match &cli.command {
        Command::Field { point } => {
            let shape = light.shape()?;
            let point = Point3::from(*point);
            let local = point.invert(&shape.frame);
            println!(
                "local ({}, {}, {})  distance {}",
                local.x,
                local.y,
                local.z,
                shape.distance(&point)
            );
        }

        Command::March {
            point,
            direction,
            steps,
            min_dist,
        } => {
            let shape = light.shape()?;
            let config = MarchConfig {
                max_steps: *steps,
                min_dist: *min_dist,
            };
            let res = march(&Point3::from(*point), direction, &shape, &config)?;
            for (i, sample) in res.steps().iter().enumerate() {
                println!(
                    "{:>3}  ({:.6}, {:.6}, {:.6})  {:.6}",
                    i, sample.point.x, sample.point.y, sample.point.z, sample.distance
                );
            }
            if res.diverged() {
                println!("diverged, closest sample at distance {:.6}", res.closest().distance);
            }
        }

        Command::Solve {
            point,
            direction,
            solver,
        } => {
            let shape = light.shape()?;
            let res = solve(&Point3::from(*point), direction, &shape, &solver.config())?;
            print_sample(&res);
        }

        Command::Scan {
            from,
            to,
            direction,
            count,
            jobs,
            solver,
        } => {
            let shape = light.shape()?;
            let count = (*count).max(1);
            let queries: Vec<Query> = (0..count)
                .map(|i| {
                    let t = if count > 1 {
                        i as f32 / (count - 1) as f32
                    } else {
                        0.
                    };
                    Query::new(Point3::from(from.lerp(to, t)), *direction)
                })
                .collect();

            let config = solver.config();
            let results = match jobs {
                Some(jobs) => batch::solve_all_with_threads(&queries, &shape, &config, *jobs),
                None => batch::solve_all(&queries, &shape, &config),
            };

            for (query, res) in queries.iter().zip(results) {
                print!(
                    "({:.3}, {:.3}, {:.3})  ",
                    query.point.x, query.point.y, query.point.z
                );
                match res {
                    Ok(res) => print_sample(&res),
                    Err(err) => println!("{}", err),
                }
            }
        }

        Command::Project { point } => {
            let shape = light.shape()?;
            let (p0, p1) = shape
                .endpoints()
                .with_context(|| format!("{:?} lights have no end points", cli.mode))?;
            let proj = project_on_segment(&Point3::from(*point), &p0, &p1);
            println!(
                "distance {:.6}  point ({:.6}, {:.6}, {:.6})",
                proj.distance, proj.point.x, proj.point.y, proj.point.z
            );
        }

        Command::Uniforms => {
            let mut uniforms = UniformMap::new();
            light.publish(&mut uniforms);
            for (name, value) in uniforms.iter() {
                println!("{} = {}", name, value);
            }
        }
    }

    Ok(())
}
