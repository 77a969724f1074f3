//! Workshop fixtures: detail pages, web API bodies and in-memory catalogues

use std::sync::Arc;
use std::time::Duration;
use workshop_deps::workshop::{InMemoryWorkshop, detail_link};
use workshop_deps::{AppId, Config, ItemId};

/// Application the fixture items belong to
pub const GAME: AppId = AppId(294100);

/// Render a detail page whose "required items" section links to `dependencies`
///
/// The page carries the noise a real one has around the section: a script
/// block, a description with unrelated links and a sidebar.
pub fn detail_page(title: &str, dependencies: &[ItemId]) -> String {
    let links: String = dependencies
        .iter()
        .map(|&id| {
            format!(
                r#"
            <a href="{}" target="_blank">
                <div class="requiredItem">Item {id}</div>
            </a>"#,
                detail_link(id)
            )
        })
        .collect();

    let section = if dependencies.is_empty() {
        String::new()
    } else {
        format!(
            r#"<div class="requiredItemsContainer" id="RequiredItems">{links}
        </div>"#
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Steam Workshop::{title}</title>
    <script type="text/javascript">var g_rgItems = [];  if (a < b) {{ }}</script>
</head>
<body>
    <div class="workshopItemTitle">{title}</div>
    <div class="workshopItemDescription">See <a href="https://example.com/?id=31337">the wiki</a>.</div>
    {section}
    <div class="rightDetailsBlock">
        <a href="https://steamcommunity.com/sharedfiles/filedetails/?id=1">Related</a>
    </div>
</body>
</html>"#
    )
}

/// `GetPublishedFileDetails` body describing one item
pub fn details_body(id: ItemId, title: &str, app: AppId, visibility: i32) -> serde_json::Value {
    serde_json::json!({
        "response": {
            "result": 1,
            "resultcount": 1,
            "publishedfiledetails": [{
                "publishedfileid": id.to_string(),
                "result": 1,
                "creator": "76561197960287930",
                "creator_app_id": app.get(),
                "consumer_app_id": app.get(),
                "title": title,
                "visibility": visibility,
                "file_size": "1048576"
            }]
        }
    })
}

/// `GetPublishedFileDetails` body for an item that does not exist
pub fn missing_body(id: ItemId) -> serde_json::Value {
    serde_json::json!({
        "response": {
            "result": 1,
            "resultcount": 1,
            "publishedfiledetails": [{ "publishedfileid": id.to_string(), "result": 9 }]
        }
    })
}

/// Configuration with short polling and retry delays
pub fn fast_config() -> Config {
    let mut config = Config {
        context: GAME,
        ..Default::default()
    };
    config.monitor.poll_interval = Duration::from_millis(5);
    config.monitor.max_duration = Some(Duration::from_secs(10));
    config.retry.initial_delay = Duration::from_millis(5);
    config.retry.max_delay = Duration::from_millis(20);
    config.retry.jitter = false;
    config
}

/// A mod pack with shared, cyclic and nested dependencies
///
/// ```text
/// 100 (pack) -> 200, 300
/// 200        -> 400
/// 300        -> 400, 100
/// 400        -> (none)
/// ```
pub async fn mod_pack(download_step: f64) -> Arc<InMemoryWorkshop> {
    let workshop = Arc::new(InMemoryWorkshop::new().with_download_step(download_step));
    for (id, title) in [
        (100, "Mod Pack"),
        (200, "Core Library"),
        (300, "Textures"),
        (400, "Harmony"),
    ] {
        workshop.add_item(ItemId(id), title, GAME).await;
    }
    workshop
        .declare_dependencies(ItemId(100), &[ItemId(200), ItemId(300)])
        .await;
    workshop.declare_dependencies(ItemId(200), &[ItemId(400)]).await;
    workshop
        .declare_dependencies(ItemId(300), &[ItemId(400), ItemId(100)])
        .await;
    workshop
}
