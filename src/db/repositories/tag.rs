use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, SqlErr,
};

use crate::entities::{link_tags, tags};
use crate::error::{Error, Result};

/// Characters that may not appear anywhere in a tag path. `/` is not in the
/// set: it is exclusively the hierarchy separator, never a literal tag
/// character, so empty segments are rejected instead.
pub const BAD_TAG_CHARS: &[char] = &['{', '}', '[', ']', '\\', '(', ')', '#', '?'];

#[must_use]
pub fn is_valid_tag_path(path: &str) -> bool {
    !path.is_empty()
        && !path.contains(BAD_TAG_CHARS)
        && !path.split('/').any(str::is_empty)
}

pub async fn find_by_name<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    name: &str,
) -> Result<Option<tags::Model>> {
    Ok(tags::Entity::find()
        .filter(tags::Column::UserId.eq(user_id))
        .filter(tags::Column::Name.eq(name))
        .one(conn)
        .await?)
}

/// Resolve a tag path to its row, creating it (and any missing ancestors)
/// on the way down. `resolve_or_create(u, "food/bread/rye")` guarantees
/// `food` and `food/bread` exist afterwards. Idempotent: repeated calls
/// return the same row.
///
/// Generic over the connection so it composes into callers' transactions.
pub async fn resolve_or_create<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    path: &str,
) -> Result<tags::Model> {
    if !is_valid_tag_path(path) {
        return Err(Error::InvalidTagName(path.to_string()));
    }

    // Walk the prefixes root-first rather than recursing on string slices.
    let mut current: Option<tags::Model> = None;
    let mut prefix = String::with_capacity(path.len());

    for segment in path.split('/') {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(segment);

        let parent_id = current.as_ref().map(|t| t.id);
        current = Some(resolve_segment(conn, user_id, &prefix, parent_id).await?);
    }

    // A valid path has at least one segment.
    current.ok_or_else(|| Error::InvalidTagName(path.to_string()))
}

async fn resolve_segment<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    name: &str,
    parent_id: Option<i32>,
) -> Result<tags::Model> {
    if let Some(existing) = find_by_name(conn, user_id, name).await? {
        return Ok(existing);
    }

    let tag = tags::ActiveModel {
        name: Set(name.to_string()),
        parent_id: Set(parent_id),
        user_id: Set(user_id),
        ..Default::default()
    };

    match tag.insert(conn).await {
        Ok(model) => Ok(model),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            // A concurrent creator won the (user_id, name) race; the row
            // exists now, so re-fetch it.
            find_by_name(conn, user_id, name).await?.ok_or(Error::Database(e))
        }
        Err(e) => Err(e.into()),
    }
}

/// The tag itself, then its parent, grandparent, … up to the root.
pub async fn family<C: ConnectionTrait>(conn: &C, tag: &tags::Model) -> Result<Vec<tags::Model>> {
    let mut chain = vec![tag.clone()];

    let mut parent_id = tag.parent_id;
    while let Some(id) = parent_id {
        let Some(parent) = tags::Entity::find_by_id(id).one(conn).await? else {
            break;
        };
        parent_id = parent.parent_id;
        chain.push(parent);
    }

    Ok(chain)
}

/// Delete every tag of the user with no remaining link association. Runs
/// after any operation that may strand a tag.
pub async fn garbage_collect<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<u64> {
    let used: Vec<i32> = link_tags::Entity::find()
        .select_only()
        .column(link_tags::Column::TagId)
        .distinct()
        .into_tuple()
        .all(conn)
        .await?;

    let res = tags::Entity::delete_many()
        .filter(tags::Column::UserId.eq(user_id))
        .filter(tags::Column::Id.is_not_in(used))
        .exec(conn)
        .await?;

    Ok(res.rows_affected)
}

pub struct TagRepository {
    conn: DatabaseConnection,
}

impl TagRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn resolve_or_create(&self, user_id: i32, path: &str) -> Result<tags::Model> {
        resolve_or_create(&self.conn, user_id, path).await
    }

    pub async fn by_name(&self, user_id: i32, name: &str) -> Result<Option<tags::Model>> {
        find_by_name(&self.conn, user_id, name).await
    }

    pub async fn family(&self, tag: &tags::Model) -> Result<Vec<tags::Model>> {
        family(&self.conn, tag).await
    }

    pub async fn garbage_collect(&self, user_id: i32) -> Result<u64> {
        garbage_collect(&self.conn, user_id).await
    }

    pub async fn for_user(&self, user_id: i32) -> Result<Vec<tags::Model>> {
        Ok(tags::Entity::find()
            .filter(tags::Column::UserId.eq(user_id))
            .order_by_asc(tags::Column::Name)
            .all(&self.conn)
            .await?)
    }

    /// Tags that share at least one link with `tag` — the self-join over the
    /// association table keyed by shared link id, excluding the tag itself.
    /// Alphabetical by name for determinism.
    pub async fn related(&self, tag: &tags::Model) -> Result<Vec<tags::Model>> {
        let link_ids: Vec<i32> = link_tags::Entity::find()
            .select_only()
            .column(link_tags::Column::LinkId)
            .filter(link_tags::Column::TagId.eq(tag.id))
            .into_tuple()
            .all(&self.conn)
            .await?;

        if link_ids.is_empty() {
            return Ok(vec![]);
        }

        Ok(tags::Entity::find()
            .join(JoinType::InnerJoin, tags::Relation::LinkTags.def())
            .filter(link_tags::Column::LinkId.is_in(link_ids))
            .filter(tags::Column::Id.ne(tag.id))
            .distinct()
            .order_by_asc(tags::Column::Name)
            .all(&self.conn)
            .await?)
    }
}
