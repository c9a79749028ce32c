//! Strokes annotations on top of the composited page.

use crate::app::{AppError, AppResult};
use image::{Rgba, RgbaImage};
use inkpage_core::canvas::GROUP_OUTLINE_PADDING;
use inkpage_core::{AnnotationCanvas, scale_point};
use tiny_skia::{ColorU8, LineCap, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

const LINE_COLOR: [u8; 4] = [30, 90, 200, 255];
const GROUP_COLOR: [u8; 4] = [150, 150, 150, 255];
const NEWEST_GROUP_COLOR: [u8; 4] = [220, 60, 60, 255];
const TEXT_COLOR: [u8; 4] = [40, 160, 90, 255];

/// Segment stroke width in display pixels.
const LINE_WIDTH: f32 = 2.0;

/// Group outline and text marker stroke width in display pixels.
const OUTLINE_WIDTH: f32 = 2.0;

/// Edge of the marker drawn for a text box, in display pixels.
const TEXT_MARKER_SIZE: f32 = 12.0;

/// Draw segments, group outlines and text box markers at `scale`.
pub fn draw_annotations(
    image: &mut RgbaImage,
    canvas: &AnnotationCanvas,
    scale: f64,
) -> AppResult<()> {
    let mut pixmap = to_pixmap(image)?;
    let outline = Stroke {
        width: OUTLINE_WIDTH,
        ..Stroke::default()
    };

    for group in canvas.group_boxes(scale) {
        let color = if group.is_newest { NEWEST_GROUP_COLOR } else { GROUP_COLOR };
        let rect = group.outline(GROUP_OUTLINE_PADDING);
        let Some(rect) = Rect::from_ltrb(
            rect.x0 as f32,
            rect.y0 as f32,
            rect.x1 as f32,
            rect.y1 as f32,
        ) else {
            continue;
        };
        let path = PathBuilder::from_rect(rect);
        pixmap.stroke_path(&path, &paint(color), &outline, Transform::identity(), None);
    }

    // Segments stay in model space; the transform maps them onto the page.
    let mut builder = PathBuilder::new();
    for segment in canvas.lines() {
        builder.move_to(segment.a.x as f32, segment.a.y as f32);
        builder.line_to(segment.b.x as f32, segment.b.y as f32);
    }
    if let Some(path) = builder.finish() {
        let zoom = scale as f32;
        let stroke = Stroke {
            width: LINE_WIDTH / zoom,
            line_cap: LineCap::Round,
            ..Stroke::default()
        };
        let transform = Transform::from_scale(zoom, zoom);
        pixmap.stroke_path(&path, &paint(LINE_COLOR), &stroke, transform, None);
    }

    for text in canvas.text_boxes() {
        let origin = scale_point(text.position, scale);
        let marker = Rect::from_xywh(
            origin.x as f32,
            origin.y as f32,
            TEXT_MARKER_SIZE,
            TEXT_MARKER_SIZE,
        );
        if let Some(marker) = marker {
            let path = PathBuilder::from_rect(marker);
            let paint = paint(TEXT_COLOR);
            pixmap.stroke_path(&path, &paint, &outline, Transform::identity(), None);
        }
    }

    copy_back(&pixmap, image);
    Ok(())
}

fn paint(color: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = true;
    paint
}

/// Copy a straight-alpha image into a premultiplied pixmap.
fn to_pixmap(image: &RgbaImage) -> AppResult<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height()).ok_or_else(|| {
        AppError::Overlay(format!(
            "cannot allocate a {}x{} pixmap",
            image.width(),
            image.height()
        ))
    })?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

fn copy_back(pixmap: &Pixmap, image: &mut RgbaImage) {
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
}
