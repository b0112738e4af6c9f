/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Decoded image storage for the layout engine.
//!
//! Layout never decodes images; it receives them through an [`ImageStore`]
//! that maps an opaque [`ImageHandle`] to pre-decoded pixel data plus the
//! image's natural dimensions. Lookup by URL is how declared background
//! images are resolved; a URL that the embedder never registered simply
//! resolves to `None`.

use euclid::default::Size2D;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use url::Url;

/// The format of the decoded pixel bytes of an [`Image`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PixelFormat {
    /// Luminance channel only.
    K8,
    /// Luminance + alpha.
    KA8,
    /// RGB, 8 bits per channel.
    RGB8,
    /// RGB + alpha, 8 bits per channel.
    RGBA8,
    /// BGR + alpha, 8 bits per channel.
    BGRA8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::K8 => 1,
            PixelFormat::KA8 => 2,
            PixelFormat::RGB8 => 3,
            PixelFormat::RGBA8 | PixelFormat::BGRA8 => 4,
        }
    }
}

/// A decoded raster image.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub bytes: Vec<u8>,
}

impl Image {
    pub fn new(width: u32, height: u32, format: PixelFormat, bytes: Vec<u8>) -> Image {
        debug_assert_eq!(
            bytes.len(),
            width as usize * height as usize * format.bytes_per_pixel(),
        );
        Image {
            width,
            height,
            format,
            bytes,
        }
    }

    pub fn dimensions(&self) -> Size2D<u32> {
        Size2D::new(self.width, self.height)
    }
}

/// An opaque reference to an image registered in an [`ImageStore`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ImageHandle(u32);

/// The image registry handed to layout. Read-only for the engine's lifetime.
#[derive(Debug, Default)]
pub struct ImageStore {
    images: Vec<Image>,
    by_url: FxHashMap<Url, ImageHandle>,
}

impl ImageStore {
    pub fn new() -> ImageStore {
        ImageStore::default()
    }

    /// Registers a decoded image and returns its handle.
    pub fn add_image(&mut self, image: Image) -> ImageHandle {
        let handle = ImageHandle(self.images.len() as u32);
        self.images.push(image);
        handle
    }

    /// Registers a decoded image addressable by URL.
    pub fn add_url_image(&mut self, url: Url, image: Image) -> ImageHandle {
        let handle = self.add_image(image);
        self.by_url.insert(url, handle);
        handle
    }

    pub fn get(&self, handle: ImageHandle) -> Option<&Image> {
        self.images.get(handle.0 as usize)
    }

    /// The natural dimensions of the image, in pixels.
    pub fn dimensions(&self, handle: ImageHandle) -> Option<Size2D<u32>> {
        self.get(handle).map(Image::dimensions)
    }

    pub fn get_image_by_url(&self, url: &Url) -> Option<ImageHandle> {
        self.by_url.get(url).copied()
    }
}
