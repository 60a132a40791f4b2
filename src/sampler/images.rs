use std::collections::HashSet;

use crate::provider::ImageInfo;

/// Drops repeated tags of the same image.
///
/// The first tag listed for an image id is always kept. Later tags of the same
/// id are kept only when they are `latest`; any other repeat is dropped.
pub fn dedup_images(images: Vec<ImageInfo>) -> Vec<ImageInfo> {
    let mut seen: HashSet<String> = HashSet::with_capacity(images.len());
    images
        .into_iter()
        .filter(|image| seen.insert(image.id.clone()) || image.tag == "latest")
        .collect()
}
