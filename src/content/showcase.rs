//! Gallery images and tourist attractions on public pages.

use std::collections::BTreeMap;

use crate::content::collection::Collection;
use crate::content::entities::{Entity, GalleryImage, Showcased, TouristAttraction};

pub type Gallery = Collection<GalleryImage>;
pub type Attractions = Collection<TouristAttraction>;

impl<E: Entity + Showcased> Collection<E> {
    /// Active items of the cached list, in display order.
    pub fn visible(&self) -> Vec<E> {
        let mut visible: Vec<E> = self
            .items()
            .iter()
            .filter(|e| e.is_active())
            .cloned()
            .collect();
        visible.sort_by_key(|e| e.sort_order());
        visible
    }
}

impl Collection<GalleryImage> {
    /// Visible images grouped by category; uncategorized images go under "".
    pub fn by_category(&self) -> BTreeMap<String, Vec<GalleryImage>> {
        let mut groups: BTreeMap<String, Vec<GalleryImage>> = BTreeMap::new();
        for image in self.visible() {
            groups
                .entry(image.category.clone().unwrap_or_default())
                .or_default()
                .push(image);
        }
        groups
    }
}
