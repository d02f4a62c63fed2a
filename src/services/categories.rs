use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    sea_query::OnConflict, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::category::{self, Entity as CategoryEntity, MAX_LEVEL},
    errors::ServiceError,
    services::catalog_import::slugify,
};

/// Input for [`CategoryService::create_if_absent`].
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parent_id: None,
        }
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn parent(mut self, parent_id: Option<Uuid>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

/// What `create_if_absent` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Uuid),
    Existing(Uuid),
}

impl CreateOutcome {
    pub fn id(&self) -> Uuid {
        match self {
            CreateOutcome::Created(id) | CreateOutcome::Existing(id) => *id,
        }
    }
}

/// Hands out sort orders for one creation run.
///
/// Seeded from the store's current maximum plus one (1 for an empty store)
/// and passed by reference to every creation call, so a run's categories get
/// consecutive positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrderSequence {
    next: i32,
}

impl SortOrderSequence {
    pub fn starting_after(current_max: Option<i32>) -> Self {
        Self {
            next: current_max.unwrap_or(0) + 1,
        }
    }

    pub fn allocate(&mut self) -> i32 {
        let value = self.next;
        self.next += 1;
        value
    }
}

/// A category with its children, ordered by sort order.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: category::Model,
    #[schema(no_recursion)]
    pub children: Vec<CategoryNode>,
}

/// Category store access.
#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a category whose name or slug matches exactly.
    pub async fn find_by_name_or_slug(
        &self,
        name: &str,
        slug: &str,
    ) -> Result<Option<category::Model>, ServiceError> {
        CategoryEntity::find()
            .filter(
                Condition::any()
                    .add(category::Column::Name.eq(name))
                    .add(category::Column::Slug.eq(slug)),
            )
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<category::Model>, ServiceError> {
        CategoryEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Current highest sort order, `None` for an empty store.
    pub async fn max_sort_order(&self) -> Result<Option<i32>, ServiceError> {
        let top = CategoryEntity::find()
            .order_by_desc(category::Column::SortOrder)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(top.map(|c| c.sort_order))
    }

    /// Creates a category unless one with the same name or slug exists.
    ///
    /// The insert itself ignores unique-constraint conflicts, so a category
    /// created concurrently by another run is reported as `Existing`.
    #[instrument(skip(self, new, sequence), fields(name = %new.name))]
    pub async fn create_if_absent(
        &self,
        new: NewCategory,
        sequence: &mut SortOrderSequence,
    ) -> Result<CreateOutcome, ServiceError> {
        let name = new.name.trim().to_string();
        let slug = new.slug();
        if name.is_empty() || slug.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "Category name '{}' has no usable characters",
                new.name
            )));
        }

        if let Some(existing) = self.find_by_name_or_slug(&name, &slug).await? {
            debug!(id = %existing.id, "Category already exists, skipping");
            return Ok(CreateOutcome::Existing(existing.id));
        }

        let level = match new.parent_id {
            None => 1,
            Some(parent_id) => {
                let parent = self.find_by_id(parent_id).await?.ok_or_else(|| {
                    ServiceError::NotFound(format!("Parent category {parent_id} not found"))
                })?;
                parent.level + 1
            }
        };
        if level > MAX_LEVEL {
            return Err(ServiceError::ValidationError(format!(
                "Category '{name}' would be at level {level}; the maximum depth is {MAX_LEVEL}"
            )));
        }

        let id = Uuid::new_v4();
        let sort_order = sequence.allocate();
        let model = category::ActiveModel {
            id: Set(id),
            name: Set(name.clone()),
            slug: Set(slug.clone()),
            description: Set(new.description),
            parent_id: Set(new.parent_id),
            level: Set(level),
            is_active: Set(true),
            sort_order: Set(sort_order),
            created_at: Set(Utc::now()),
        };

        let inserted = CategoryEntity::insert(model)
            .on_conflict(OnConflict::new().do_nothing().to_owned())
            .exec_without_returning(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        if inserted == 0 {
            let winner = self
                .find_by_name_or_slug(&name, &slug)
                .await?
                .ok_or_else(|| {
                    ServiceError::Conflict(format!(
                        "Category '{name}' conflicted on insert but could not be re-read"
                    ))
                })?;
            debug!(id = %winner.id, "Category created concurrently, skipping");
            return Ok(CreateOutcome::Existing(winner.id));
        }

        debug!(%id, level, sort_order, "Created category");
        Ok(CreateOutcome::Created(id))
    }

    /// All categories ordered by sort order.
    pub async fn list(&self) -> Result<Vec<category::Model>, ServiceError> {
        CategoryEntity::find()
            .order_by_asc(category::Column::SortOrder)
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// The category forest.
    pub async fn tree(&self) -> Result<Vec<CategoryNode>, ServiceError> {
        Ok(build_forest(self.list().await?))
    }
}

/// Nests a flat, sorted category list. Categories whose parent is missing
/// from the list are treated as roots.
pub fn build_forest(categories: Vec<category::Model>) -> Vec<CategoryNode> {
    let known: std::collections::HashSet<Uuid> = categories.iter().map(|c| c.id).collect();
    let mut children: HashMap<Option<Uuid>, Vec<category::Model>> = HashMap::new();
    for category in categories {
        let parent = category.parent_id.filter(|id| known.contains(id));
        children.entry(parent).or_default().push(category);
    }

    fn attach(
        parent: Option<Uuid>,
        children: &mut HashMap<Option<Uuid>, Vec<category::Model>>,
    ) -> Vec<CategoryNode> {
        children
            .remove(&parent)
            .unwrap_or_default()
            .into_iter()
            .map(|category| {
                let nested = attach(Some(category.id), children);
                CategoryNode {
                    category,
                    children: nested,
                }
            })
            .collect()
    }

    attach(None, &mut children)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str, parent: Option<Uuid>, level: i32, sort_order: i32) -> category::Model {
        category::Model {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slugify(name),
            description: None,
            parent_id: parent,
            level,
            is_active: true,
            sort_order,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn sequence_continues_after_current_max() {
        let mut empty = SortOrderSequence::starting_after(None);
        assert_eq!(empty.allocate(), 1);
        assert_eq!(empty.allocate(), 2);

        let mut seeded = SortOrderSequence::starting_after(Some(41));
        assert_eq!(seeded.allocate(), 42);
        assert_eq!(seeded.allocate(), 43);
    }

    #[test]
    fn forest_nests_children_in_list_order() {
        let root = category("Model Y", None, 1, 0);
        let body = category("Model Y - 10 - BODY", Some(root.id), 2, 1);
        let bumper = category("Model Y - 1001 - Bumper and Fascia", Some(body.id), 3, 2);
        let lighting = category("Model Y - 18 - LIGHTING", Some(root.id), 2, 3);
        let orphan = category("Loose", Some(Uuid::new_v4()), 2, 4);

        let forest = build_forest(vec![
            root.clone(),
            body.clone(),
            bumper.clone(),
            lighting.clone(),
            orphan.clone(),
        ]);

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].category.id, root.id);
        assert_eq!(forest[1].category.id, orphan.id);
        let mains: Vec<_> = forest[0].children.iter().map(|n| n.category.id).collect();
        assert_eq!(mains, vec![body.id, lighting.id]);
        assert_eq!(forest[0].children[0].children[0].category.id, bumper.id);
    }
}
