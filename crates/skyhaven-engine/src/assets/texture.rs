use std::path::{Path, PathBuf};

use super::AssetError;

/// Decoded RGBA8 pixels, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl ImageData {
    /// 1×1 image of a single color.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self { width: 1, height: 1, rgba: rgba.to_vec() }
    }
}

pub fn load_image(path: &Path) -> Result<ImageData, AssetError> {
    let img = image::open(path).map_err(|source| AssetError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = img.to_rgba8();
    Ok(ImageData {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

/// Six square faces of equal size, ordered +X, −X, +Y, −Y, +Z, −Z.
#[derive(Debug, Clone)]
pub struct CubemapData {
    pub size: u32,
    pub faces: Vec<ImageData>,
}

/// Color of a face that failed to load.
const MISSING_FACE: [u8; 4] = [0, 0, 0, 255];

/// Loads six cubemap faces.
///
/// A face that cannot be decoded, or does not match the size of the first
/// good face, is logged and replaced by a black face. Fails only when no face
/// is usable.
pub fn load_cubemap(faces: &[PathBuf; 6]) -> Result<CubemapData, AssetError> {
    let images = faces.iter().map(|path| (path.as_path(), load_image(path))).collect();
    assemble_cubemap(images)
}

fn assemble_cubemap(images: Vec<(&Path, Result<ImageData, AssetError>)>) -> Result<CubemapData, AssetError> {
    let size = images
        .iter()
        .find_map(|(_, img)| img.as_ref().ok().filter(|i| i.width == i.height && i.width > 0))
        .map(|img| img.width);

    let Some(size) = size else {
        let first_error = images.into_iter().find_map(|(path, img)| match img {
            Err(e) => Some(e),
            Ok(img) => Some(AssetError::CubemapFace {
                path: path.to_path_buf(),
                width: img.width,
                height: img.height,
                expected: img.width,
            }),
        });
        return Err(first_error.unwrap_or(AssetError::NoCubemapFaces));
    };

    let faces = images
        .into_iter()
        .map(|(path, img)| {
            let err = match img {
                Ok(img) if img.width == size && img.height == size => return img,
                Ok(img) => AssetError::CubemapFace {
                    path: path.to_path_buf(),
                    width: img.width,
                    height: img.height,
                    expected: size,
                },
                Err(e) => e,
            };
            log::warn!("{err}; using a black face");
            ImageData {
                width: size,
                height: size,
                rgba: MISSING_FACE.repeat((size * size) as usize),
            }
        })
        .collect();

    Ok(CubemapData { size, faces })
}

/// How the GPU interprets stored texel values.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ColorSpace {
    /// Color images (diffuse maps, skybox): decoded to linear on sample.
    Srgb,
    /// Data images (specular maps).
    Linear,
}

impl ColorSpace {
    fn format(self) -> wgpu::TextureFormat {
        match self {
            ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// GPU texture plus the view the shaders bind.
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Texture {
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &ImageData,
        color_space: ColorSpace,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: color_space.format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        write_layer(queue, &texture, image, 0);

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// 1×1 texture, used in place of a missing or unreadable image.
    pub fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        color_space: ColorSpace,
        label: &str,
    ) -> Self {
        Self::from_image(device, queue, &ImageData::solid(rgba), color_space, label)
    }

    pub fn cubemap(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &CubemapData,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: data.size,
                height: data.size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ColorSpace::Srgb.format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in data.faces.iter().enumerate() {
            write_layer(queue, &texture, face, layer as u32);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        Self { texture, view }
    }
}

fn write_layer(queue: &wgpu::Queue, texture: &wgpu::Texture, image: &ImageData, layer: u32) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
            aspect: wgpu::TextureAspect::All,
        },
        &image.rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width),
            rows_per_image: Some(image.height),
        },
        wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: u32) -> ImageData {
        ImageData {
            width: size,
            height: size,
            rgba: vec![255; (size * size * 4) as usize],
        }
    }

    #[test]
    fn loads_png_as_rgba8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        image::RgbImage::from_pixel(3, 2, image::Rgb([255, 0, 0]))
            .save(&path)
            .unwrap();

        let img = load_image(&path).unwrap();
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(img.rgba.len(), 3 * 2 * 4);
        assert_eq!(&img.rgba[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn missing_image_reports_path() {
        let err = load_image(Path::new("definitely/not/here.png")).unwrap_err();
        assert!(err.to_string().contains("here.png"));
    }

    fn missing(name: &str) -> Result<ImageData, AssetError> {
        load_image(Path::new(name))
    }

    // ── cubemap ───────────────────────────────────────────────────────────

    #[test]
    fn cubemap_accepts_six_equal_squares() {
        let p = Path::new("face.png");
        let cube = assemble_cubemap((0..6).map(|_| (p, Ok(square(4)))).collect()).unwrap();
        assert_eq!(cube.size, 4);
        assert_eq!(cube.faces.len(), 6);
    }

    #[test]
    fn unreadable_face_is_replaced_and_others_kept() {
        let p = Path::new("face.png");
        let mut faces: Vec<_> = (0..6).map(|_| (p, Ok(square(4)))).collect();
        faces[2] = (Path::new("up.png"), missing("nowhere/up.png"));

        let cube = assemble_cubemap(faces).unwrap();
        assert_eq!(cube.faces.len(), 6);
        assert_eq!(cube.faces[0], square(4));
        assert_eq!(cube.faces[2].width, 4);
        assert!(cube.faces[2].rgba.chunks_exact(4).all(|px| px == MISSING_FACE));
    }

    #[test]
    fn mismatched_face_is_replaced() {
        let p = Path::new("face.png");
        let mut faces: Vec<_> = (0..6).map(|_| (p, Ok(square(4)))).collect();
        faces[3] = (Path::new("dn.png"), Ok(square(8)));
        faces[0].1 = Ok(ImageData { width: 4, height: 2, rgba: vec![0; 32] });

        let cube = assemble_cubemap(faces).unwrap();
        assert_eq!(cube.size, 4);
        assert!(cube.faces.iter().all(|f| f.width == 4 && f.height == 4));
        assert!(cube.faces[3].rgba.chunks_exact(4).all(|px| px == MISSING_FACE));
    }

    #[test]
    fn first_good_face_sets_the_size() {
        let p = Path::new("face.png");
        let mut faces: Vec<_> = (0..6).map(|_| (p, Ok(square(2)))).collect();
        faces[0] = (p, missing("nowhere/rt.png"));
        faces[1] = (p, Ok(square(8)));

        let cube = assemble_cubemap(faces).unwrap();
        assert_eq!(cube.size, 8);
        assert_eq!(cube.faces[1], square(8));
    }

    #[test]
    fn cubemap_without_any_usable_face_fails() {
        let faces: Vec<_> = (0..6).map(|_| (Path::new("x.png"), missing("nowhere/x.png"))).collect();

        let err = assemble_cubemap(faces).unwrap_err();
        assert!(matches!(err, AssetError::Image { .. }));
    }
}
