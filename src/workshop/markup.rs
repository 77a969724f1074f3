//! Extraction of the "required items" section from a detail page
//!
//! The page lists dependencies as direct `<a href=...>` children of the element
//! whose id is `RequiredItems`. Pages are parsed into a full document tree, so
//! implied end tags, comments and script bodies follow browser rules.

use super::reference::parse_item_reference;
use crate::error::{Error, Result};
use crate::types::ItemId;
use scraper::{ElementRef, Html};
use std::collections::HashSet;

/// Id of the element listing an item's dependencies
pub const REQUIRED_ITEMS_ID: &str = "RequiredItems";

/// Collect the dependency ids declared on a detail page
///
/// Returns ids in document order with repeats dropped (first occurrence
/// wins). A page without a `RequiredItems` element declares no dependencies.
///
/// # Errors
///
/// Returns [`Error::MalformedDependencyLink`] if a link in the section has no
/// `href` or its `href` does not contain an item id.
///
/// # Examples
///
/// ```
/// use workshop_deps::workshop::extract_dependency_ids;
/// use workshop_deps::ItemId;
///
/// let html = r#"
///     <div class="requiredItemsContainer" id="RequiredItems">
///         <a href="https://steamcommunity.com/workshop/filedetails/?id=11" target="_blank">
///             <div class="requiredItem">Core Library</div>
///         </a>
///         <a href="https://steamcommunity.com/workshop/filedetails/?id=22" target="_blank">
///             <div class="requiredItem">Textures</div>
///         </a>
///     </div>"#;
///
/// assert_eq!(extract_dependency_ids(html)?, vec![ItemId(11), ItemId(22)]);
/// # Ok::<(), workshop_deps::Error>(())
/// ```
pub fn extract_dependency_ids(html: &str) -> Result<Vec<ItemId>> {
    let document = Html::parse_document(html);
    let Some(section) = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().id() == Some(REQUIRED_ITEMS_ID))
    else {
        return Ok(Vec::new());
    };

    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    let links = section
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "a");

    for link in links {
        let href = link
            .value()
            .attr("href")
            .ok_or_else(|| Error::MalformedDependencyLink {
                reference: link.html(),
                reason: "dependency link has no href".to_string(),
            })?;
        let id = parse_item_reference(href)?;
        if seen.insert(id) {
            ids.push(id);
        }
    }

    tracing::trace!(dependencies = ids.len(), "Parsed required items section");
    Ok(ids)
}
