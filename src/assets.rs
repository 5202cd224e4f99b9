//! File-backed startup assets: shader sources and texture images.

use std::fs;
use std::path::{Path, PathBuf};

use crate::shading::ShadingVariant;
use crate::texture::TextureBuffer;

/// Failures reading assets from disk. All are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read shader '{}': {source}", path.display())]
    ShaderText {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load image '{}': {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Reads a whole shader file into memory.
pub fn load_shader_text(path: impl AsRef<Path>) -> Result<String, AssetError> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|source| AssetError::ShaderText {
        path: path.to_path_buf(),
        source,
    })
}

/// Decodes an image file and expands it to RGBA. Row 0 is the visual top.
pub fn load_image_rgba(path: impl AsRef<Path>) -> Result<TextureBuffer, AssetError> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|source| AssetError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(TextureBuffer::from_image(image.to_rgba8()))
}

/// WGSL source for both shading programs.
#[derive(Clone, Debug)]
pub struct ShaderSources {
    pub primary: String,
    pub debug_normals: String,
}

impl ShaderSources {
    /// Loads `primary.wgsl` and `normals.wgsl` from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, AssetError> {
        let dir = dir.as_ref();
        Ok(Self {
            primary: load_shader_text(dir.join(Self::file_name(ShadingVariant::Primary)))?,
            debug_normals: load_shader_text(
                dir.join(Self::file_name(ShadingVariant::DebugNormals)),
            )?,
        })
    }

    pub fn file_name(variant: ShadingVariant) -> &'static str {
        match variant {
            ShadingVariant::Primary => "primary.wgsl",
            ShadingVariant::DebugNormals => "normals.wgsl",
        }
    }

    pub fn get(&self, variant: ShadingVariant) -> &str {
        match variant {
            ShadingVariant::Primary => &self.primary,
            ShadingVariant::DebugNormals => &self.debug_normals,
        }
    }
}
