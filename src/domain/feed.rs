use serde::{Deserialize, Serialize};

/// A subscribed feed or a folder grouping other feeds.
///
/// Folders are ordinary feed records that other feeds name as their `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Feed {
    /// `0` until the store assigns an id on save.
    #[serde(rename = "feedID")]
    pub id: i64,
    pub title: Option<String>,
    pub url: Option<String>,
    pub parent: Option<i64>,
    pub hidden: bool,
    pub omit_in_unread: bool,
    pub favicon: Option<String>,
}

impl Feed {
    pub fn new(url: String) -> Self {
        Self {
            url: Some(url),
            ..Default::default()
        }
    }

    pub fn folder(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent: i64) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or("(Untitled)")
    }

    /// Backup form: no favicon payload and no null-valued fields.
    pub fn minimized(&self) -> MinimizedFeed<'_> {
        MinimizedFeed {
            id: self.id,
            title: self.title.as_deref(),
            url: self.url.as_deref(),
            parent: self.parent,
            hidden: self.hidden,
            omit_in_unread: self.omit_in_unread,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimizedFeed<'a> {
    #[serde(rename = "feedID")]
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<i64>,
    pub hidden: bool,
    pub omit_in_unread: bool,
}
