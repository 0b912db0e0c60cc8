//! Viewer binary.
//!
//! Usage:
//!   pivot [MODEL.obj|MODEL.stl] [--texture image.png] [--axis-entry preserve] ...
//!
//! Without a model the built-in cube is shown. Controls:
//!   U/J, I/K, O/L   rotate (yaw/pitch/roll or X/Y/Z, depending on mode)
//!   1 / 2           Euler / axis-angle mode
//!   3               toggle camera view lock
//!   R               reset the active mode
//!   WASD, mouse     fly the camera; scroll to zoom
//!   Esc             quit

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use pivot::{
    AxisAngleDelta, AxisAngleEntry, GeometryOptions, MeshSource, OrientationConfig, ViewerConfig,
};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum EntryPolicy {
    /// Start axis-angle mode from identity.
    Discard,
    /// Keep the rotation accumulated before leaving axis-angle mode.
    Preserve,
    /// Start axis-angle mode from --preset.
    Preset,
}

#[derive(Debug, Parser)]
#[command(version, about = "Rotate a 3D model with Euler or axis-angle input")]
struct Args {
    /// OBJ or STL model to show (defaults to a cube)
    model: Option<PathBuf>,

    /// Image applied to the mesh surface
    #[arg(long)]
    texture: Option<PathBuf>,

    /// Treat the model as Z-up and turn it Y-up
    #[arg(long)]
    upright: bool,

    /// Keep the model's original size instead of fitting it to a unit cube
    #[arg(long)]
    no_normalize: bool,

    /// Recompute normals from faces
    #[arg(long)]
    smooth_normals: bool,

    #[arg(long, default_value = "Pivot")]
    title: String,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Euler step per frame while a key is held, in degrees
    #[arg(long, default_value_t = 0.5)]
    euler_step: f32,

    /// Axis-angle step per frame while a key is held, in degrees
    #[arg(long, default_value_t = 0.35)]
    axis_step: f32,

    /// What entering axis-angle mode does to the accumulated rotation
    #[arg(long, value_enum, default_value_t = EntryPolicy::Discard)]
    axis_entry: EntryPolicy,

    /// Starting rotation for `--axis-entry preset`, as X,Y,Z degrees
    #[arg(
        long,
        value_delimiter = ',',
        allow_negative_numbers = true,
        default_values_t = [0.0, 0.0, 0.0]
    )]
    preset: Vec<f32>,

    /// Camera movement speed in units per second
    #[arg(long, default_value_t = 3.0)]
    speed: f32,

    /// Mouse look sensitivity in radians per pixel
    #[arg(long, default_value_t = 0.003)]
    sensitivity: f32,

    /// Vertical field of view in degrees (1 to 45)
    #[arg(long, default_value_t = 45.0)]
    fov: f32,
}

impl Args {
    fn axis_entry(&self) -> anyhow::Result<AxisAngleEntry> {
        Ok(match self.axis_entry {
            EntryPolicy::Discard => AxisAngleEntry::Discard,
            EntryPolicy::Preserve => AxisAngleEntry::Preserve,
            EntryPolicy::Preset => {
                let [x, y, z]: [f32; 3] = self
                    .preset
                    .as_slice()
                    .try_into()
                    .context("--preset takes exactly three values")?;
                AxisAngleEntry::Preset(AxisAngleDelta::new(x, y, z))
            }
        })
    }

    fn into_config(self) -> anyhow::Result<ViewerConfig> {
        let orientation = OrientationConfig::new()
            .euler_step_degrees(self.euler_step)
            .axis_step_degrees(self.axis_step)
            .axis_entry(self.axis_entry()?);

        let mesh = match self.model {
            Some(path) => MeshSource::File {
                path,
                options: GeometryOptions {
                    upright: self.upright,
                    normalize: !self.no_normalize,
                    smooth_normals: self.smooth_normals,
                    ..Default::default()
                },
            },
            None => MeshSource::Cube,
        };

        let mut config = ViewerConfig::new()
            .title(self.title)
            .size(self.width, self.height)
            .mesh(mesh)
            .orientation(orientation)
            .camera_speed(self.speed)
            .mouse_sensitivity(self.sensitivity)
            .fov(self.fov);
        if let Some(texture) = self.texture {
            config = config.texture(texture);
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Args::parse().into_config()?;
    info!(
        mesh = ?config.mesh,
        axis_entry = ?config.orientation.axis_entry,
        "starting viewer"
    );

    pivot::run(config).context("viewer exited with an error")
}
