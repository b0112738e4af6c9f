/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Used-value computation for background layers: positioning area, tile
//! size (including `contain`/`cover` and `round` quantization), tile
//! position, and clip rectangle.

use app_units::Au;
use euclid::default::Size2D;

use crate::box_tree::{BackgroundImage, BoxOffsets};
use crate::geom::{LayoutRect, LayoutSideOffsets, LayoutSize, LayoutVector};
use crate::model;
use crate::style::properties::{
    BackgroundBox, BackgroundPosition, BackgroundRepeat, BackgroundRepeatKeyword, BackgroundSize,
    LengthPercentage, LengthPercentageAuto,
};

/// The border, padding, or content rectangle of a block, in the block's own
/// coordinate space.
pub(crate) fn area_rect(
    area: BackgroundBox,
    box_offsets: &BoxOffsets,
    borders: &LayoutSideOffsets,
) -> LayoutRect {
    match area {
        BackgroundBox::BorderBox => LayoutRect::new(box_offsets.border_pos, box_offsets.border_size),
        BackgroundBox::PaddingBox => {
            let origin = box_offsets.border_pos + LayoutVector::new(borders.left, borders.top);
            let size = LayoutSize::new(
                box_offsets.border_size.width - borders.horizontal(),
                box_offsets.border_size.height - borders.vertical(),
            );
            LayoutRect::new(origin, size)
        },
        BackgroundBox::ContentBox => {
            LayoutRect::new(box_offsets.content_pos, box_offsets.content_size)
        },
    }
}

fn scale_size(natural: LayoutSize, factor: f64) -> LayoutSize {
    LayoutSize::new(
        Au((f64::from(natural.width.0) * factor).round() as i32),
        Au((f64::from(natural.height.0) * factor).round() as i32),
    )
}

fn used_size(size: &BackgroundSize, natural: LayoutSize, area: LayoutSize) -> LayoutSize {
    let aspect = |width: Au, of: Au, other: Au| -> Au {
        if of.0 == 0 {
            Au(0)
        } else {
            Au((f64::from(width.0) * f64::from(other.0) / f64::from(of.0)).round() as i32)
        }
    };

    match *size {
        BackgroundSize::Explicit { width, height } => {
            let solve = |value: LengthPercentageAuto, base: Au| match value {
                LengthPercentageAuto::Px(px) => Some(model::positive_length(px)),
                LengthPercentageAuto::Percentage(p) => Some(model::positive_percentage(p, base)),
                LengthPercentageAuto::Auto => None,
            };
            match (solve(width, area.width), solve(height, area.height)) {
                (Some(w), Some(h)) => LayoutSize::new(w, h),
                (Some(w), None) => LayoutSize::new(w, aspect(w, natural.width, natural.height)),
                (None, Some(h)) => LayoutSize::new(aspect(h, natural.height, natural.width), h),
                (None, None) => natural,
            }
        },
        BackgroundSize::Contain | BackgroundSize::Cover => {
            if natural.width.0 == 0 || natural.height.0 == 0 {
                return natural;
            }
            let x_factor = f64::from(area.width.0) / f64::from(natural.width.0);
            let y_factor = f64::from(area.height.0) / f64::from(natural.height.0);
            let factor = if matches!(size, BackgroundSize::Contain) {
                x_factor.min(y_factor)
            } else {
                x_factor.max(y_factor)
            };
            scale_size(natural, factor)
        },
    }
}

/// `repeat: round` quantizes the tile size so a whole number of tiles fills
/// the positioning area. Each axis is quantized independently.
fn round_axis(size: Au, area: Au) -> Au {
    if size.0 <= 0 || area.0 <= 0 {
        return size;
    }
    let count = (f64::from(area.0) / f64::from(size.0)).round().max(1.0) as i32;
    area / count
}

fn position_component(value: LengthPercentage, leftover: Au) -> Au {
    match value {
        LengthPercentage::Px(px) => model::length(px),
        LengthPercentage::Percentage(p) => model::percentage(p, leftover),
    }
}

/// Computes the used geometry of one background-image layer. The caller
/// fills in the image handle; everything else is derived from the
/// declarations and the block's final geometry.
pub(crate) fn background_image(
    natural_px: Size2D<u32>,
    origin: BackgroundBox,
    position: &BackgroundPosition,
    size: &BackgroundSize,
    repeat: BackgroundRepeat,
    clip: BackgroundBox,
    box_offsets: &BoxOffsets,
    borders: &LayoutSideOffsets,
) -> BackgroundImage {
    let positioning_area = area_rect(origin, box_offsets, borders);
    let natural = LayoutSize::new(
        Au::from_px(natural_px.width as i32),
        Au::from_px(natural_px.height as i32),
    );

    let mut tile = used_size(size, natural, positioning_area.size);
    if repeat.x == BackgroundRepeatKeyword::Round {
        tile.width = round_axis(tile.width, positioning_area.size.width);
    }
    if repeat.y == BackgroundRepeatKeyword::Round {
        tile.height = round_axis(tile.height, positioning_area.size.height);
    }

    let leftover = LayoutSize::new(
        positioning_area.size.width - tile.width,
        positioning_area.size.height - tile.height,
    );
    let offset = LayoutVector::new(
        position_component(position.x, leftover.width),
        position_component(position.y, leftover.height),
    );

    BackgroundImage {
        image: None,
        origin: positioning_area.origin,
        position: positioning_area.origin + offset,
        size: tile,
        repeat,
        clip: area_rect(clip, box_offsets, borders),
    }
}
