/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The cosmetic pass: a second walk over the element tree, after geometry
//! is final, resolving everything paint needs but layout does not: used
//! colors, border colors, backgrounds, and relative-positioning offsets
//! against the now-known containing block sizes.

use app_units::Au;
use log::debug;
use pixels::ImageStore;

use crate::LayoutError;
use crate::background;
use crate::box_tree::{BackgroundImage, BlockRef, BorderColors, BoxTree, GeneratedBox};
use crate::dom::{Node, NodeCategory, NodeTree};
use crate::fallible::FallibleVec;
use crate::geom::{LayoutSize, LayoutVector};
use crate::model;
use crate::model::UsedBoxStyle;
use crate::style::StyleComputer;
use crate::style::properties::{
    Background, BackgroundClip, BackgroundColor, BackgroundImageSource, BorderStyle, BorderStyles,
    BoxStyle, Color, Cosmetic, CssColor, Insets, Position, Rgba,
};

struct Frame {
    pushed_cb: bool,
}

pub(crate) fn run_cosmetic_pass(
    tree: &NodeTree,
    boxes: &mut BoxTree,
    images: &ImageStore,
    viewport: LayoutSize,
) -> Result<(), LayoutError> {
    let Some(root) = tree.root() else {
        return Ok(());
    };

    let mut styles: StyleComputer<'_, Cosmetic> = StyleComputer::new(tree);
    let mut color_stack: Vec<Rgba> = vec![Rgba::BLACK];
    let mut cb_stack: Vec<LayoutSize> = vec![viewport];
    let mut frames: Vec<Frame> = Vec::new();
    let mut node_stack: Vec<Option<Node>> = vec![Some(root)];
    let mut root_color = Rgba::BLACK;

    while let Some(&top) = node_stack.last() {
        match top {
            None => {
                node_stack.pop();
                if node_stack.is_empty() {
                    break;
                }
                let frame = frames.pop().expect("cosmetic frame underflow");
                color_stack.pop();
                if frame.pushed_cb {
                    cb_stack.pop();
                }
                advance(tree, &mut node_stack);
            },
            Some(node) => {
                if tree.category(node) == NodeCategory::Text {
                    advance(tree, &mut node_stack);
                    continue;
                }
                let Some(generated) = boxes.generated_box(node) else {
                    // display: none; nothing in this subtree generated a box.
                    advance(tree, &mut node_stack);
                    continue;
                };

                let is_root = tree.parent(node).is_none();
                let parent_color = *color_stack.last().unwrap();
                let containing_block = *cb_stack.last().unwrap();
                let (current_color, pushed_cb) = cosmetic_element(
                    &mut styles,
                    boxes,
                    images,
                    node,
                    generated,
                    is_root,
                    parent_color,
                    containing_block,
                    &mut cb_stack,
                )?;
                if is_root {
                    root_color = current_color;
                }

                frames.try_push(Frame { pushed_cb })?;
                color_stack.try_push(current_color)?;
                node_stack.try_push(tree.first_child(node))?;
            },
        }
    }

    // Until background propagation exists, every IFC paints its text with
    // the root element's used color.
    for ifc in &mut boxes.ifcs {
        ifc.font_color = root_color;
    }
    debug!("cosmetic pass complete; root color {:?}", root_color);
    Ok(())
}

fn advance(tree: &NodeTree, node_stack: &mut Vec<Option<Node>>) {
    let top = node_stack.last_mut().expect("cursor underflow");
    match *top {
        Some(node) => *top = tree.next_sibling(node),
        None => unreachable!("advanced past end of siblings"),
    }
}

/// Resolves the cosmetic groups for one element and writes the used values
/// into its generated box. Returns the element's used color and whether a
/// containing block was pushed for its children.
fn cosmetic_element(
    styles: &mut StyleComputer<'_, Cosmetic>,
    boxes: &mut BoxTree,
    images: &ImageStore,
    node: Node,
    generated: GeneratedBox,
    is_root: bool,
    parent_color: Rgba,
    containing_block: LayoutSize,
    cb_stack: &mut Vec<LayoutSize>,
) -> Result<(Rgba, bool), LayoutError> {
    styles.set_current_node(node)?;
    let box_style: BoxStyle = styles.specified_value();
    styles.set_computed_value(box_style.clone());
    let color_group: Color = styles.specified_value();
    styles.set_computed_value(color_group.clone());
    let border_styles: BorderStyles = styles.specified_value();
    styles.set_computed_value(border_styles.clone());
    let border_colors: crate::style::properties::BorderColors = styles.specified_value();
    styles.set_computed_value(border_colors.clone());
    let background_color: BackgroundColor = styles.specified_value();
    styles.set_computed_value(background_color.clone());
    let background_clip: BackgroundClip = styles.specified_value();
    styles.set_computed_value(background_clip.clone());
    let background_group: Background = styles.specified_value();
    styles.set_computed_value(background_group.clone());
    let insets: Insets = styles.specified_value();
    styles.set_computed_value(insets.clone());
    styles.commit_node()?;

    // `color: currentcolor` computes to the inherited color.
    let current_color = model::color(color_group.color, parent_color);
    let used_style: UsedBoxStyle = model::box_style(&box_style, is_root);

    // A side with no border style paints nothing, whatever its color.
    let side = |style: BorderStyle, color: CssColor| match style {
        BorderStyle::None | BorderStyle::Hidden => Rgba::TRANSPARENT,
        _ => model::color(color, current_color),
    };
    let used_border_colors = BorderColors {
        top: side(border_styles.top, border_colors.top),
        right: side(border_styles.right, border_colors.right),
        bottom: side(border_styles.bottom, border_colors.bottom),
        left: side(border_styles.left, border_colors.left),
    };

    match generated {
        GeneratedBox::Block(block_ref) => {
            let pushed = fill_block(
                boxes,
                images,
                block_ref,
                used_style.position,
                current_color,
                &used_border_colors,
                &background_color,
                &background_clip,
                &background_group,
                &insets,
                containing_block,
                cb_stack,
            )?;
            Ok((current_color, pushed))
        },
        GeneratedBox::InlineBox { ifc, index } => {
            let inline_boxes = &mut boxes.ifc_mut(ifc).inline_boxes;
            let i = index.to_usize();
            inline_boxes.border_colors[i] = used_border_colors;
            inline_boxes.background_color[i] =
                model::color(background_color.color, current_color);
            inline_boxes.insets[i] =
                resolve_used_insets(used_style.position, &insets, containing_block);
            Ok((current_color, false))
        },
        GeneratedBox::Text(_) => Ok((current_color, false)),
    }
}

fn fill_block(
    boxes: &mut BoxTree,
    images: &ImageStore,
    block_ref: BlockRef,
    position: Position,
    current_color: Rgba,
    border_colors: &BorderColors,
    background_color: &BackgroundColor,
    background_clip: &BackgroundClip,
    background_group: &Background,
    insets: &Insets,
    containing_block: LayoutSize,
    cb_stack: &mut Vec<LayoutSize>,
) -> Result<bool, LayoutError> {
    let (offsets, borders, content_size) = {
        let subtree = boxes.subtree(block_ref.subtree);
        (
            *subtree.box_offsets(block_ref.index),
            *subtree.borders(block_ref.index),
            subtree.box_offsets(block_ref.index).content_size,
        )
    };

    // Each declared image layer cycles through the shorter longhand lists.
    // `none` layers are skipped outright; an unresolvable URL keeps its
    // (empty) slot so layer indices stay meaningful to the renderer.
    let mut layers: Vec<BackgroundImage> = Vec::new();
    for (layer, source) in background_group.images.iter().enumerate() {
        let url = match source {
            BackgroundImageSource::None => continue,
            BackgroundImageSource::Url(url) => url,
        };
        let record = match images.get_image_by_url(url) {
            None => BackgroundImage::default(),
            Some(handle) => {
                let natural = images
                    .dimensions(handle)
                    .expect("image registry returned a dangling handle");
                let cycled = |index: usize, len: usize| index % len;
                let origin =
                    background_group.origins[cycled(layer, background_group.origins.len())];
                let position_decl =
                    &background_group.positions[cycled(layer, background_group.positions.len())];
                let size = &background_group.sizes[cycled(layer, background_group.sizes.len())];
                let repeat =
                    background_group.repeats[cycled(layer, background_group.repeats.len())];
                let clip = background_clip.clips[cycled(layer, background_clip.clips.len())];
                let mut record = background::background_image(
                    natural,
                    origin,
                    position_decl,
                    size,
                    repeat,
                    clip,
                    &offsets,
                    &borders,
                );
                record.image = Some(handle);
                record
            },
        };
        layers.try_push(record)?;
    }

    let images_handle = if layers.is_empty() {
        None
    } else {
        let handle = boxes.background_images.alloc(layers.len())?;
        for (i, record) in layers.into_iter().enumerate() {
            boxes.background_images.set(handle, i, record);
        }
        Some(handle)
    };

    let color = model::color(background_color.color, current_color);
    let color_clip = background::area_rect(
        *background_clip.clips.last().expect("empty background-clip list"),
        &offsets,
        &borders,
    );

    let subtree = boxes.subtree_mut(block_ref.subtree);
    let i = block_ref.index;
    subtree.border_colors[i] = *border_colors;
    subtree.background[i].color = color;
    subtree.background[i].color_clip = color_clip;
    subtree.background[i].images = images_handle;
    subtree.insets[i] = resolve_used_insets(position, insets, containing_block);

    cb_stack.try_push(content_size)?;
    Ok(true)
}

/// Relative-positioning translation against the final containing block
/// (CSS 2.2 §9.4.3: the explicit side wins, both `auto` means no offset).
fn resolve_used_insets(
    position: Position,
    insets: &Insets,
    containing_block: LayoutSize,
) -> LayoutVector {
    match position {
        Position::Static => LayoutVector::new(Au(0), Au(0)),
        Position::Relative => {
            let left = model::length_percentage_auto(insets.left, containing_block.width);
            let right = model::length_percentage_auto(insets.right, containing_block.width);
            let top = model::length_percentage_auto(insets.top, containing_block.height);
            let bottom = model::length_percentage_auto(insets.bottom, containing_block.height);
            let x = match (left.non_auto(), right.non_auto()) {
                (Some(left), _) => left,
                (None, Some(right)) => -right,
                (None, None) => Au(0),
            };
            let y = match (top.non_auto(), bottom.non_auto()) {
                (Some(top), _) => top,
                (None, Some(bottom)) => -bottom,
                (None, None) => Au(0),
            };
            LayoutVector::new(x, y)
        },
        Position::Absolute | Position::Fixed | Position::Sticky => {
            unreachable!("out-of-flow positioning reached the cosmetic pass")
        },
    }
}
