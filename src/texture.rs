use crate::gpu::GpuContext;

/// Channels per texel. Decoded images are always expanded to RGBA.
pub const RGBA_CHANNELS: usize = 4;

/// Errors raised when building a [`TextureBuffer`].
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("texture {width}x{height} needs {expected} bytes of RGBA data, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Row-major RGBA8 pixels on the CPU, waiting to be uploaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl TextureBuffer {
    /// Wraps decoded pixels. Row 0 is whatever the decoder made it, which for
    /// image files is the visual top.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, TextureError> {
        let expected = width as usize * height as usize * RGBA_CHANNELS;
        if pixels.len() != expected {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_image(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }

    /// Light and dark grey checkerboard with `cells` squares per side.
    pub fn checkerboard(size: u32, cells: u32) -> Self {
        let cell = (size / cells.max(1)).max(1);
        let mut pixels = vec![0u8; size as usize * size as usize * RGBA_CHANNELS];

        for y in 0..size {
            for x in 0..size {
                let idx = (y as usize * size as usize + x as usize) * RGBA_CHANNELS;
                let value = if (x / cell + y / cell) % 2 == 0 { 255 } else { 32 };

                pixels[idx] = value;
                pixels[idx + 1] = value;
                pixels[idx + 2] = value;
                pixels[idx + 3] = 255;
            }
        }

        Self {
            width: size,
            height: size,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Bytes in one row.
    pub fn row_stride(&self) -> usize {
        self.width as usize * RGBA_CHANNELS
    }

    pub fn row(&self, index: u32) -> &[u8] {
        let stride = self.row_stride();
        let start = index as usize * stride;
        &self.pixels[start..start + stride]
    }

    pub fn is_power_of_two(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }

    /// Swaps row `h` with row `height - 1 - h` for every `h` in the top half.
    /// An odd middle row stays where it is.
    pub fn flip_vertical(&mut self) {
        let stride = self.row_stride();
        let height = self.height as usize;

        for h in 0..height / 2 {
            let mirror = height - 1 - h;
            let (upper, lower) = self.pixels.split_at_mut(mirror * stride);
            upper[h * stride..(h + 1) * stride].swap_with_slice(&mut lower[..stride]);
        }
    }

    /// Readies decoded pixels for upload: warns about non-power-of-two sizes
    /// and flips the rows so row 0 is the visual bottom, which is where mesh
    /// texture coordinates put `v = 0`.
    pub fn prepare(mut self) -> Self {
        if !self.is_power_of_two() {
            tracing::warn!(
                width = self.width,
                height = self.height,
                "texture dimensions are not a power of two; older GPU paths may sample it poorly"
            );
        }
        self.flip_vertical();
        self
    }
}

/// A GPU texture that can be bound to shaders.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Uploads prepared RGBA pixels.
    pub fn from_buffer(gpu: &GpuContext, buffer: &TextureBuffer, label: &str) -> Self {
        Self::from_rgba(gpu, buffer.pixels(), buffer.width(), buffer.height(), label)
    }

    /// Create a texture from raw RGBA data.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every byte of row `r` is `r`, so row order is visible at a glance.
    fn marked(width: u32, height: u32) -> TextureBuffer {
        let stride = width as usize * RGBA_CHANNELS;
        let pixels = (0..height)
            .flat_map(|row| std::iter::repeat_n(row as u8, stride))
            .collect();
        TextureBuffer::new(width, height, pixels).unwrap()
    }

    #[test]
    fn flip_twice_restores_even_and_odd_heights() {
        for height in [1, 2, 4, 5, 7] {
            let original = marked(3, height);
            let mut flipped = original.clone();
            flipped.flip_vertical();
            flipped.flip_vertical();
            assert_eq!(flipped, original, "height {height}");
        }
    }

    #[test]
    fn flip_reverses_row_order() {
        let mut buffer = marked(2, 4);
        buffer.flip_vertical();
        for row in 0..4 {
            assert!(buffer.row(row).iter().all(|&b| b == (3 - row) as u8));
        }
    }

    #[test]
    fn odd_height_keeps_middle_row() {
        let mut buffer = marked(5, 3);
        buffer.flip_vertical();
        assert!(buffer.row(1).iter().all(|&b| b == 1));
        assert!(buffer.row(0).iter().all(|&b| b == 2));
        assert!(buffer.row(2).iter().all(|&b| b == 0));
    }

    #[test]
    fn prepare_keeps_dimensions() {
        let prepared = marked(6, 3).prepare();
        assert_eq!((prepared.width(), prepared.height()), (6, 3));
        assert_eq!(prepared.pixels().len(), 6 * 3 * RGBA_CHANNELS);
        assert!(prepared.row(0).iter().all(|&b| b == 2));
    }

    #[test]
    fn power_of_two_check() {
        assert!(marked(256, 64).is_power_of_two());
        assert!(!marked(256, 65).is_power_of_two());
        assert!(!marked(3, 4).is_power_of_two());
    }

    #[test]
    fn rejects_short_buffers() {
        let err = TextureBuffer::new(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            TextureError::SizeMismatch {
                expected: 16,
                actual: 15,
                ..
            }
        ));
    }

    #[test]
    fn checkerboard_alternates() {
        let board = TextureBuffer::checkerboard(8, 2);
        assert_eq!(board.row(0)[0], 255);
        assert_eq!(board.row(0)[4 * RGBA_CHANNELS], 32);
        assert_eq!(board.row(4)[0], 32);
        assert!(board.is_power_of_two());
    }
}
