use crate::assets::color::Color;
use crate::assets::decode::PreparedImage;
use crate::effects::composite::{fill, over_in_place};
use crate::foundation::core::{Affine, Canvas, Rect};
use crate::foundation::error::{BrandframeError, BrandframeResult};
use crate::model::adjustments::Adjustments;
use crate::model::annotation::{AnnotationId, TextAlign, TextAnnotation};
use crate::render::backend::FrameRGBA;
use crate::render::surface::{LayerPainter, affine_to_cpu, image_paint, rect_to_cpu};
use crate::render::transform::resolve;
use crate::text::layout::TextEngine;
use crate::text::paint::{paint_annotation, paint_selection};

/// Fill shown when no media is loaded.
pub const PLACEHOLDER_FILL: Color = Color::rgb(0x1a, 0x1a, 0x1a);
/// Prompt caption drawn on the placeholder.
pub const PLACEHOLDER_CAPTION: &str = "Upload image or video";
pub const PLACEHOLDER_CAPTION_COLOR: Color = Color::rgb(0x66, 0x66, 0x66);
pub const PLACEHOLDER_CAPTION_PX: f64 = 32.0;

/// Immutable inputs of one composite call.
#[derive(Clone, Copy, Debug)]
pub struct FrameInputs<'a> {
    pub canvas: Canvas,
    /// Current source pixels (image, or the presented video frame). `None` draws the placeholder.
    pub background: Option<&'a PreparedImage>,
    pub adjustments: &'a Adjustments,
    /// Branding overlay; stretched to the canvas. `None` when no department is chosen.
    pub template: Option<&'a PreparedImage>,
    /// Paint order is list order.
    pub annotations: &'a [TextAnnotation],
    /// Outlined annotation. Leave `None` for exported frames.
    pub selected: Option<AnnotationId>,
}

/// Flattens background, template and text into one frame.
///
/// Layers, bottom to top: clear, background (or placeholder), template, annotations in list
/// order, selection outline. Output depends only on the inputs; the held contexts are scratch.
pub struct Compositor {
    painter: LayerPainter,
    text: TextEngine,
}

impl Compositor {
    pub fn new(text: TextEngine) -> Self {
        Self {
            painter: LayerPainter::new(),
            text,
        }
    }

    pub fn text(&self) -> &TextEngine {
        &self.text
    }

    pub fn text_mut(&mut self) -> &mut TextEngine {
        &mut self.text
    }

    #[tracing::instrument(level = "trace", skip_all)]
    pub fn compose(&mut self, inputs: &FrameInputs<'_>) -> BrandframeResult<FrameRGBA> {
        let canvas = inputs.canvas;
        if canvas.width == 0 || canvas.height == 0 {
            return Err(BrandframeError::validation("canvas must be non-empty"));
        }
        let mut frame = vec![0u8; canvas.rgba_len()];

        match inputs.background {
            Some(img) => self.draw_background(&mut frame, canvas, img, inputs.adjustments)?,
            None => self.draw_placeholder(&mut frame, canvas)?,
        }

        if let Some(template) = inputs.template {
            self.draw_template(&mut frame, canvas, template)?;
        }

        for ann in inputs.annotations {
            let ann = ann.clamped();
            let block = self.text.shape(&ann);
            paint_annotation(&mut frame, canvas, &mut self.painter, &block, &ann)?;
        }

        if let Some(sel) = inputs.selected
            && let Some(ann) = inputs.annotations.iter().find(|a| a.id == sel)
        {
            let ann = ann.clamped();
            let block = self.text.shape(&ann);
            paint_selection(&mut frame, canvas, &mut self.painter, &block.geometry, &ann)?;
        }

        Ok(FrameRGBA {
            width: canvas.width,
            height: canvas.height,
            data: frame,
            premultiplied: true,
        })
    }

    fn draw_background(
        &mut self,
        frame: &mut [u8],
        canvas: Canvas,
        img: &PreparedImage,
        adj: &Adjustments,
    ) -> BrandframeResult<()> {
        let params = resolve(img.width, img.height, adj, canvas)?;
        let paint = image_paint(img)?;
        let (w, h) = (f64::from(img.width), f64::from(img.height));
        let mut layer = self.painter.paint_layer(canvas.width, canvas.height, |ctx| {
            ctx.set_transform(affine_to_cpu(params.image_transform()));
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(paint);
            ctx.fill_rect(&rect_to_cpu(Rect::new(0.0, 0.0, w, h)));
            Ok(())
        })?;
        params.filters.apply(&mut layer, canvas.width, canvas.height)?;
        over_in_place(frame, &layer, 1.0)
    }

    fn draw_placeholder(&mut self, frame: &mut [u8], canvas: Canvas) -> BrandframeResult<()> {
        fill(frame, PLACEHOLDER_FILL.to_rgba8_premul().to_array());
        let Some(family) = self.text.fonts().default_family().map(str::to_owned) else {
            return Ok(());
        };
        let caption = TextAnnotation {
            text: PLACEHOLDER_CAPTION.to_owned(),
            position: canvas.center(),
            font_size_px: PLACEHOLDER_CAPTION_PX,
            color: PLACEHOLDER_CAPTION_COLOR,
            font_family: family,
            text_align: TextAlign::Center,
            ..TextAnnotation::default()
        };
        let block = self.text.shape(&caption);
        paint_annotation(frame, canvas, &mut self.painter, &block, &caption)
    }

    fn draw_template(
        &mut self,
        frame: &mut [u8],
        canvas: Canvas,
        template: &PreparedImage,
    ) -> BrandframeResult<()> {
        if template.is_empty() {
            return Ok(());
        }
        if template.width == canvas.width && template.height == canvas.height {
            return over_in_place(frame, &template.rgba8_premul, 1.0);
        }
        let paint = image_paint(template)?;
        let (tw, th) = (f64::from(template.width), f64::from(template.height));
        let stretch = Affine::scale_non_uniform(canvas.width_f64() / tw, canvas.height_f64() / th);
        let layer = self.painter.paint_layer(canvas.width, canvas.height, |ctx| {
            ctx.set_transform(affine_to_cpu(stretch));
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(paint);
            ctx.fill_rect(&rect_to_cpu(Rect::new(0.0, 0.0, tw, th)));
            Ok(())
        })?;
        over_in_place(frame, &layer, 1.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
