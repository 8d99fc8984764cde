//! Data providers the views are written against.

use sqlx::SqlitePool;

use crate::data::{Comment, Dish, Leader};
use crate::db::{self, LeaderSearchProps, NewCommentPropsBuilder, NotFound};

#[async_trait::async_trait]
pub trait LeaderService: Send + Sync {
    async fn get_leaders(&self) -> anyhow::Result<Vec<Leader>>;

    async fn get_featured_leader(&self) -> anyhow::Result<Option<Leader>>;
}

#[async_trait::async_trait]
pub trait DishService: Send + Sync {
    async fn get_dishes(&self) -> anyhow::Result<Vec<Dish>>;

    /// Ids of every dish, in menu order.
    async fn get_dish_ids(&self) -> anyhow::Result<Vec<i64>>;

    /// Fails with [`NotFound`] for an unknown id.
    async fn get_dish(&self, id: i64) -> anyhow::Result<Dish>;

    async fn get_featured_dish(&self) -> anyhow::Result<Option<Dish>>;

    /// Persist the dish with its full comment list and return the stored version.
    async fn save_dish(&self, dish: &Dish) -> anyhow::Result<Dish>;

    /// Append one comment without rewriting the others, returning the updated dish.
    async fn add_comment(&self, dish: i64, comment: &Comment) -> anyhow::Result<Dish>;
}

/// Both services backed by the sqlite database.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LeaderService for Store {
    async fn get_leaders(&self) -> anyhow::Result<Vec<Leader>> {
        db::get_leaders(&self.pool, LeaderSearchProps::All).await
    }

    async fn get_featured_leader(&self) -> anyhow::Result<Option<Leader>> {
        let leaders = db::get_leaders(&self.pool, LeaderSearchProps::Featured).await?;
        Ok(leaders.into_iter().next())
    }
}

#[async_trait::async_trait]
impl DishService for Store {
    async fn get_dishes(&self) -> anyhow::Result<Vec<Dish>> {
        db::get_dishes(&self.pool).await
    }

    async fn get_dish_ids(&self) -> anyhow::Result<Vec<i64>> {
        db::get_dish_ids(&self.pool).await
    }

    async fn get_dish(&self, id: i64) -> anyhow::Result<Dish> {
        db::get_dish(&self.pool, id)
            .await?
            .ok_or_else(|| NotFound::dish(id).into())
    }

    async fn get_featured_dish(&self) -> anyhow::Result<Option<Dish>> {
        db::get_featured_dish(&self.pool).await
    }

    async fn save_dish(&self, dish: &Dish) -> anyhow::Result<Dish> {
        db::save_dish(&self.pool, dish).await
    }

    async fn add_comment(&self, dish: i64, comment: &Comment) -> anyhow::Result<Dish> {
        let props = NewCommentPropsBuilder::default()
            .dish(dish)
            .author(comment.author.as_str())
            .rating(comment.rating)
            .comment(comment.comment.as_str())
            .date(comment.date)
            .build()?;
        db::add_comment(&self.pool, props).await?;
        self.get_dish(dish).await
    }
}
