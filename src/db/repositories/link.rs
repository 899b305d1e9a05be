use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    JoinType, LoaderTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Set, SqlErr, TransactionTrait,
};

use super::tag;
use crate::entities::{link_tags, links, tags, users};
use crate::error::{Error, Result};
use crate::models::link::LinkInput;
use crate::models::pagination::Pagination;

/// Associate a link with a tag and, transitively, with every ancestor of
/// that tag. Idempotent; there is no automatic retraction counterpart —
/// `update` recomputes the desired association set from scratch instead.
pub async fn associate<C: ConnectionTrait>(
    conn: &C,
    link_id: i32,
    tag: &tags::Model,
) -> Result<()> {
    associate_pair(conn, link_id, tag.id).await?;

    let mut parent_id = tag.parent_id;
    while let Some(id) = parent_id {
        let Some(parent) = tags::Entity::find_by_id(id).one(conn).await? else {
            break;
        };
        associate_pair(conn, link_id, parent.id).await?;
        parent_id = parent.parent_id;
    }

    Ok(())
}

async fn associate_pair<C: ConnectionTrait>(conn: &C, link_id: i32, tag_id: i32) -> Result<()> {
    if link_tags::Entity::find_by_id((link_id, tag_id))
        .one(conn)
        .await?
        .is_some()
    {
        return Ok(());
    }

    let row = link_tags::ActiveModel {
        link_id: Set(link_id),
        tag_id: Set(tag_id),
    };

    match link_tags::Entity::insert(row).exec_without_returning(conn).await {
        Ok(_) => Ok(()),
        // Pair already present (concurrent associate): exactly what we want.
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// The requested tag paths plus every ancestor prefix they imply. This is
/// the full desired association set for a link.
fn expand_with_ancestors(paths: &[String]) -> BTreeSet<String> {
    let mut expanded = BTreeSet::new();

    for path in paths {
        let mut prefix = String::with_capacity(path.len());
        for segment in path.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            expanded.insert(prefix.clone());
        }
    }

    expanded
}

pub struct LinkRepository {
    conn: DatabaseConnection,
}

impl LinkRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Persist a link and its tag associations atomically: a failure on the
    /// Nth tag leaves no link behind.
    pub async fn create(&self, owner: &users::Model, input: &LinkInput) -> Result<links::Model> {
        let txn = self.conn.begin().await?;

        let link = links::ActiveModel {
            url: Set(input.url.clone()),
            name: Set(input.name.clone()),
            description: Set(input.description.clone()),
            created: Set(input.created.unwrap_or_else(Utc::now)),
            private: Set(input.private),
            user_id: Set(owner.id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for path in &input.tags {
            let tag = tag::resolve_or_create(&txn, owner.id, path).await?;
            associate(&txn, link.id, &tag).await?;
        }

        txn.commit().await?;
        Ok(link)
    }

    /// Replace url/name/description/private and reconcile the tag set, all
    /// in one transaction. The desired association set is the requested tags
    /// expanded with their ancestors; reconciliation is the symmetric
    /// difference against current rows, so unchanged associations are never
    /// dropped and recreated, and ancestors implied by a surviving child
    /// stay put. Stranded tags are garbage-collected afterwards.
    pub async fn update(&self, link: &links::Model, input: &LinkInput) -> Result<links::Model> {
        let txn = self.conn.begin().await?;

        let mut desired_ids = HashSet::new();
        for path in expand_with_ancestors(&input.tags) {
            let tag = tag::resolve_or_create(&txn, link.user_id, &path).await?;
            desired_ids.insert(tag.id);
        }

        let current = link_tags::Entity::find()
            .filter(link_tags::Column::LinkId.eq(link.id))
            .all(&txn)
            .await?;

        for row in &current {
            if !desired_ids.contains(&row.tag_id) {
                link_tags::Entity::delete_by_id((row.link_id, row.tag_id))
                    .exec(&txn)
                    .await?;
            }
        }

        let current_ids: HashSet<i32> = current.iter().map(|r| r.tag_id).collect();
        for tag_id in desired_ids.difference(&current_ids) {
            associate_pair(&txn, link.id, *tag_id).await?;
        }

        let mut active: links::ActiveModel = link.clone().into();
        active.url = Set(input.url.clone());
        active.name = Set(input.name.clone());
        active.description = Set(input.description.clone());
        active.private = Set(input.private);
        let updated = active.update(&txn).await?;

        tag::garbage_collect(&txn, link.user_id).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Remove the link and its association rows. Tags live independently;
    /// garbage collection is a separate concern.
    pub async fn delete(&self, link: &links::Model) -> Result<()> {
        let txn = self.conn.begin().await?;

        link_tags::Entity::delete_many()
            .filter(link_tags::Column::LinkId.eq(link.id))
            .exec(&txn)
            .await?;

        links::Entity::delete_by_id(link.id).exec(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    pub async fn by_id(&self, owner_id: i32, link_id: i32) -> Result<links::Model> {
        links::Entity::find_by_id(link_id)
            .filter(links::Column::UserId.eq(owner_id))
            .one(&self.conn)
            .await?
            .ok_or(Error::NoSuchLink(link_id))
    }

    /// One page of the owner's links visible to the viewer, newest first.
    pub async fn list_by_owner(
        &self,
        owner_id: i32,
        viewer_id: Option<i32>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<links::Model>, Pagination)> {
        let query = links::Entity::find()
            .filter(links::Column::UserId.eq(owner_id))
            .filter(visible_to(viewer_id));

        self.fetch_page(query, page, per_page).await
    }

    /// One page of the links carrying `tag`, visibility-filtered. Hierarchy
    /// propagation means a parent tag surfaces every descendant-tagged link
    /// without any extra work here.
    pub async fn list_by_tag(
        &self,
        tag: &tags::Model,
        viewer_id: Option<i32>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<links::Model>, Pagination)> {
        let query = links::Entity::find()
            .join(JoinType::InnerJoin, links::Relation::LinkTags.def())
            .filter(link_tags::Column::TagId.eq(tag.id))
            .filter(visible_to(viewer_id));

        self.fetch_page(query, page, per_page).await
    }

    /// Substring containment over name and description — no ranking.
    pub async fn search(
        &self,
        owner_id: i32,
        needle: &str,
        viewer_id: Option<i32>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<links::Model>, Pagination)> {
        let query = links::Entity::find()
            .filter(links::Column::UserId.eq(owner_id))
            .filter(visible_to(viewer_id))
            .filter(
                Condition::any()
                    .add(links::Column::Name.contains(needle))
                    .add(links::Column::Description.contains(needle)),
            );

        self.fetch_page(query, page, per_page).await
    }

    async fn fetch_page(
        &self,
        query: sea_orm::Select<links::Entity>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<links::Model>, Pagination)> {
        let page = page.max(1);
        let query = query.order_by_desc(links::Column::Created);

        // Pagination reflects the total matching count, not the slice size.
        let paginator = query.paginate(&self.conn, per_page);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;

        Ok((rows, Pagination::from_total(page, total, per_page)))
    }

    /// Tag sets for a page of links, one `Vec` per link in order.
    pub async fn tags_for_links(&self, links: &[links::Model]) -> Result<Vec<Vec<tags::Model>>> {
        Ok(links
            .load_many_to_many(tags::Entity, link_tags::Entity, &self.conn)
            .await?)
    }
}

fn visible_to(viewer_id: Option<i32>) -> Condition {
    let mut cond = Condition::any().add(links::Column::Private.eq(false));
    if let Some(viewer) = viewer_id {
        cond = cond.add(links::Column::UserId.eq(viewer));
    }
    cond
}
