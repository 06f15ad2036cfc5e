//! Image placement geometry.
//!
//! Images get a page each. Placement always works on a portrait (or square)
//! shape: landscape images are turned 90 degrees first, then scaled to the
//! largest size that fits the page box with the aspect ratio intact.

use crate::error::Error;

pub const A4_WIDTH_CM: f32 = 21.0;
pub const A4_HEIGHT_CM: f32 = 29.7;
/// Total margin taken off each page dimension before placing an image.
pub const IMAGE_PAGE_MARGIN_CM: f32 = 6.0;

pub const POINTS_PER_CM: f32 = 72.0 / 2.54;

pub fn cm_to_pt(cm: f32) -> f32 {
    cm * POINTS_PER_CM
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// The source was wider than tall and is drawn turned 90 degrees.
    pub rotated: bool,
    /// Size of the placed (post-rotation) shape, in the unit of the box.
    pub width: f32,
    pub height: f32,
}

/// Fit a `width` x `height` pixel image into a `max_width` x `max_height` box.
pub fn place_image(width: f32, height: f32, max_width: f32, max_height: f32) -> Result<Placement, Error> {
    let valid = |v: f32| v.is_finite() && v > 0.0;
    if !(valid(width) && valid(height) && valid(max_width) && valid(max_height)) {
        return Err(Error::ImageGeometry {
            width,
            height,
            max_width,
            max_height,
        });
    }

    let (rotated, width, height) = if width > height {
        (true, height, width)
    } else {
        (false, width, height)
    };
    let ratio = height / width;
    let (placed_width, placed_height) = if max_width * ratio <= max_height {
        (max_width, max_width * ratio)
    } else {
        (max_height / ratio, max_height)
    };
    Ok(Placement {
        rotated,
        width: placed_width,
        height: placed_height,
    })
}

/// Place a pixel-sized image on an A4 page less the image page margin (cm).
pub fn place_on_a4(pixel_width: u32, pixel_height: u32) -> Result<Placement, Error> {
    place_image(
        pixel_width as f32,
        pixel_height as f32,
        A4_WIDTH_CM - IMAGE_PAGE_MARGIN_CM,
        A4_HEIGHT_CM - IMAGE_PAGE_MARGIN_CM,
    )
}
