//! Command-line options and the viewer configuration they produce.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use glam::Vec3;

/// Single-dash long spellings accepted alongside their `--` forms.
const SINGLE_DASH_LONGS: [&str; 3] = ["sca", "tra", "tex"];

#[derive(Parser, Debug)]
#[command(
    name = "meshview",
    version,
    about = "Spinning mesh viewer (N: debug normals, F11: screenshot, Esc: quit)"
)]
pub struct Cli {
    /// Mesh file to load (.obj or .stl). Defaults to a built-in cube.
    #[arg(short = 'o', value_name = "FILE")]
    pub mesh: Option<PathBuf>,

    /// Uniform scale applied to the mesh.
    #[arg(long = "sca", value_name = "FLOAT", default_value_t = 1.0, allow_negative_numbers = true)]
    pub scale: f32,

    /// Translation applied after rotation and scale.
    #[arg(
        long = "tra",
        num_args = 3,
        value_names = ["X", "Y", "Z"],
        allow_negative_numbers = true
    )]
    pub translation: Option<Vec<f32>>,

    /// Texture image. Defaults to a built-in checkerboard.
    #[arg(long = "tex", value_name = "FILE")]
    pub texture: Option<PathBuf>,

    /// Directory holding `primary.wgsl` and `normals.wgsl`.
    #[arg(long, value_name = "DIR", default_value = "shaders")]
    pub shader_dir: PathBuf,

    /// Initial window width in pixels.
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Initial window height in pixels.
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    /// Directory screenshots are written to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub screenshot_dir: PathBuf,
}

impl Cli {
    /// Parses `args` (program name first), accepting `-sca`, `-tra` and `-tex`.
    pub fn parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }
}

/// Rewrites `-sca`, `-tra` and `-tex` (and their `=value` forms) to `--`.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let Some(rest) = text.strip_prefix('-') else {
                return arg;
            };
            let name = rest.split_once('=').map_or(rest, |(name, _)| name);
            if SINGLE_DASH_LONGS.contains(&name) {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}

/// Everything the viewer needs to start.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    pub mesh: Option<PathBuf>,
    pub scale: f32,
    pub translation: Vec3,
    pub texture: Option<PathBuf>,
    pub shader_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub screenshot_dir: PathBuf,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            mesh: None,
            scale: 1.0,
            translation: Vec3::ZERO,
            texture: None,
            shader_dir: PathBuf::from("shaders"),
            width: 800,
            height: 800,
            screenshot_dir: PathBuf::from("."),
        }
    }
}

impl From<Cli> for ViewerConfig {
    fn from(cli: Cli) -> Self {
        let translation = match cli.translation.as_deref() {
            Some(&[x, y, z]) => Vec3::new(x, y, z),
            _ => Vec3::ZERO,
        };
        Self {
            mesh: cli.mesh,
            scale: cli.scale,
            translation,
            texture: cli.texture,
            shader_dir: cli.shader_dir,
            width: cli.width,
            height: cli.height,
            screenshot_dir: cli.screenshot_dir,
        }
    }
}
