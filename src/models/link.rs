use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{links, tags};

/// Everything a caller supplies to create or update a link. `tags` is the
/// explicit tag-path set; ancestor association is derived, not supplied.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkInput {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

/// Link data handed back to the rendering collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct LinkView {
    pub id: i32,
    pub url: String,
    pub name: String,
    pub description: String,
    pub private: bool,
    pub created: DateTime<Utc>,
    pub user: String,
    pub is_mine: bool,
    pub tags: Vec<TagView>,
}

impl LinkView {
    #[must_use]
    pub fn new(
        link: links::Model,
        owner_name: &str,
        viewer_id: Option<i32>,
        mut tags: Vec<tags::Model>,
    ) -> Self {
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            id: link.id,
            url: link.url,
            name: link.name,
            description: link.description,
            private: link.private,
            created: link.created,
            user: owner_name.to_string(),
            is_mine: viewer_id == Some(link.user_id),
            tags: tags
                .into_iter()
                .map(|t| TagView::new(owner_name, &t.name))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TagView {
    pub name: String,
    pub url: String,
}

impl TagView {
    #[must_use]
    pub fn new(owner_name: &str, tag_name: &str) -> Self {
        // Tag paths contain '/', which stays a path separator in the href;
        // everything else gets percent-encoded segment by segment.
        let encoded = tag_name
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Self {
            name: tag_name.to_string(),
            url: format!("/u/{owner_name}/t/{encoded}"),
        }
    }
}
