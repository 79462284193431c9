use crate::payload::decode_payload;
use crate::{InputShape, PreprocessError};
use common::span;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use image::DynamicImage;
use ndarray::{Array, IxDyn};

/// Decode → channel convert → resize → scale to `[0, 1]` → `[1, H, W, C]`.
pub struct CpuPreProcessor {
    input_shape: InputShape,
    resizer: Resizer,
}

impl CpuPreProcessor {
    pub fn new(input_shape: InputShape) -> Result<Self, PreprocessError> {
        if input_shape.width == 0 || input_shape.height == 0 {
            return Err(PreprocessError::EmptyShape(
                input_shape.width,
                input_shape.height,
            ));
        }
        if !matches!(input_shape.channels, 1 | 3) {
            return Err(PreprocessError::UnsupportedChannels(input_shape.channels));
        }

        Ok(Self {
            input_shape,
            resizer: Resizer::new(),
        })
    }

    pub fn input_shape(&self) -> InputShape {
        self.input_shape
    }

    /// Preprocess the `image` field of a detection request.
    pub fn preprocess_payload(&mut self, image: &str) -> Result<Array<f32, IxDyn>, PreprocessError> {
        let _s = span!("preprocess_payload");
        let decoded = decode_payload(image)?;
        self.preprocess_image(&decoded)
    }

    pub fn preprocess_image(
        &mut self,
        image: &DynamicImage,
    ) -> Result<Array<f32, IxDyn>, PreprocessError> {
        let (pixels, pixel_type) = match self.input_shape.channels {
            1 => (image.to_luma8().into_raw(), PixelType::U8),
            _ => (image.to_rgb8().into_raw(), PixelType::U8x3),
        };

        tracing::trace!(
            width = image.width(),
            height = image.height(),
            channels = self.input_shape.channels,
            "Preprocessing decoded image"
        );

        let resized = self.resize(&pixels, image.width(), image.height(), pixel_type)?;
        self.normalize(&resized)
    }

    fn resize(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        pixel_type: PixelType,
    ) -> Result<Image<'static>, PreprocessError> {
        let _s = span!("resize");

        let src = ImageRef::new(width, height, pixels, pixel_type)?;
        let mut resized = Image::new(self.input_shape.width, self.input_shape.height, pixel_type);

        self.resizer.resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        Ok(resized)
    }

    fn normalize(&self, image: &Image) -> Result<Array<f32, IxDyn>, PreprocessError> {
        let _s = span!("normalize");

        let output: Vec<f32> = image.buffer().iter().map(|&v| v as f32 / 255.0).collect();

        Ok(Array::from_shape_vec(
            IxDyn(&self.input_shape.batch_dims()),
            output,
        )?)
    }
}
