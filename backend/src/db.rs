use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde::Deserialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::data::{Comment, Dish, DishRow, Leader};

const SCHEMA: [&str; 3] = [
    r#"
CREATE TABLE IF NOT EXISTS leader (
    id       INTEGER PRIMARY KEY,
    name     TEXT NOT NULL,
    image    TEXT NOT NULL DEFAULT '',
    role     TEXT NOT NULL DEFAULT '',
    abbr     TEXT NOT NULL DEFAULT '',
    featured BOOLEAN NOT NULL DEFAULT 0,
    bio      TEXT NOT NULL DEFAULT ''
)"#,
    r#"
CREATE TABLE IF NOT EXISTS dish (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    image       TEXT NOT NULL DEFAULT '',
    category    TEXT NOT NULL DEFAULT '',
    label       TEXT NOT NULL DEFAULT '',
    price       REAL NOT NULL DEFAULT 0,
    featured    BOOLEAN NOT NULL DEFAULT 0,
    description TEXT NOT NULL DEFAULT ''
)"#,
    r#"
CREATE TABLE IF NOT EXISTS comment (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    dish    INTEGER NOT NULL REFERENCES dish(id) ON DELETE CASCADE,
    rating  INTEGER NOT NULL,
    comment TEXT NOT NULL,
    author  TEXT NOT NULL,
    date    TEXT NOT NULL
)"#,
];

const DISH_COLUMNS: &str = "id, name, image, category, label, price, featured, description";

/// Returned (inside `anyhow::Error`) when a lookup by id matches nothing.
#[derive(Debug, thiserror::Error)]
#[error("no {kind} found with id {id}")]
pub struct NotFound {
    pub kind: &'static str,
    pub id: i64,
}

impl NotFound {
    pub fn dish(id: i64) -> Self {
        Self { kind: "dish", id }
    }
}

pub async fn connect(url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid database url {url}"))?
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options)
        .await
        .with_context(|| format!("fail to open database {url}"))?;
    migrate(&pool).await?;
    Ok(pool)
}

/// A private database living as long as the pool. It must stay on a single
/// connection, every new sqlite memory connection starts empty.
pub async fn connect_in_memory() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .context("fail to open in-memory database")?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(db_conn: &SqlitePool) -> anyhow::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(db_conn)
            .await
            .context("fail to create schema")?;
    }
    Ok(())
}

/// Initial content of the menu, in the layout of `data/db.json`.
#[derive(Debug, Deserialize)]
pub struct Seed {
    pub dishes: Vec<Dish>,
    pub leaders: Vec<Leader>,
}

impl Seed {
    pub fn bundled() -> anyhow::Result<Self> {
        serde_json::from_str(include_str!("../data/db.json")).context("fail to parse bundled seed")
    }
}

/// Fill an empty database. Returns false and touches nothing when dishes already exist.
pub async fn seed(db_conn: &SqlitePool, seed: &Seed) -> anyhow::Result<bool> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dish")
        .fetch_one(db_conn)
        .await?;
    if count > 0 {
        return Ok(false);
    }

    let mut tx = db_conn.begin().await?;
    for leader in &seed.leaders {
        sqlx::query(
            r#"
INSERT INTO leader
    (id, name, image, role, abbr, featured, bio)
VALUES
    (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(leader.id)
        .bind(&leader.name)
        .bind(&leader.image)
        .bind(&leader.role)
        .bind(&leader.abbr)
        .bind(leader.featured)
        .bind(&leader.bio)
        .execute(&mut tx)
        .await
        .with_context(|| format!("fail to add leader {}", leader.name))?;
    }

    for dish in &seed.dishes {
        sqlx::query(
            r#"
INSERT INTO dish
    (id, name, image, category, label, price, featured, description)
VALUES
    (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(dish.id)
        .bind(&dish.name)
        .bind(&dish.image)
        .bind(&dish.category)
        .bind(&dish.label)
        .bind(dish.price)
        .bind(dish.featured)
        .bind(&dish.description)
        .execute(&mut tx)
        .await
        .with_context(|| format!("fail to add dish {}", dish.name))?;

        for comment in &dish.comments {
            sqlx::query(
                "INSERT INTO comment (dish, rating, comment, author, date) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(dish.id)
            .bind(comment.rating)
            .bind(&comment.comment)
            .bind(&comment.author)
            .bind(comment.date)
            .execute(&mut tx)
            .await?;
        }
    }
    tx.commit().await?;

    tracing::info!(
        "seeded {} dishes and {} leaders",
        seed.dishes.len(),
        seed.leaders.len()
    );
    Ok(true)
}

#[derive(Clone, Copy)]
pub enum LeaderSearchProps {
    All,
    Featured,
}

pub async fn get_leaders(
    db_conn: &SqlitePool,
    props: LeaderSearchProps,
) -> anyhow::Result<Vec<Leader>> {
    let sql = match props {
        LeaderSearchProps::All => {
            "SELECT id, name, image, role, abbr, featured, bio FROM leader ORDER BY id"
        }
        LeaderSearchProps::Featured => {
            "SELECT id, name, image, role, abbr, featured, bio FROM leader WHERE featured = 1 ORDER BY id"
        }
    };
    let leaders = sqlx::query_as::<_, Leader>(sql)
        .fetch_all(db_conn)
        .await
        .context("fail to get leaders")?;
    Ok(leaders)
}

pub async fn get_comments(db_conn: &SqlitePool, dish: i64) -> anyhow::Result<Vec<Comment>> {
    let comments = sqlx::query_as::<_, Comment>(
        "SELECT rating, comment, author, date FROM comment WHERE dish = ? ORDER BY id",
    )
    .bind(dish)
    .fetch_all(db_conn)
    .await
    .with_context(|| format!("fail to get comments of dish {dish}"))?;
    Ok(comments)
}

pub async fn get_dishes(db_conn: &SqlitePool) -> anyhow::Result<Vec<Dish>> {
    let rows = sqlx::query_as::<_, DishRow>(&format!(
        "SELECT {DISH_COLUMNS} FROM dish ORDER BY id"
    ))
    .fetch_all(db_conn)
    .await
    .context("fail to get dishes")?;

    let mut dishes = Vec::with_capacity(rows.len());
    for row in rows {
        let comments = get_comments(db_conn, row.id).await?;
        dishes.push(row.with_comments(comments));
    }
    Ok(dishes)
}

pub async fn get_dish_ids(db_conn: &SqlitePool) -> anyhow::Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM dish ORDER BY id")
        .fetch_all(db_conn)
        .await
        .context("fail to get dish ids")?;
    Ok(ids)
}

pub async fn get_dish(db_conn: &SqlitePool, id: i64) -> anyhow::Result<Option<Dish>> {
    let row = sqlx::query_as::<_, DishRow>(&format!(
        "SELECT {DISH_COLUMNS} FROM dish WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(db_conn)
    .await
    .with_context(|| format!("fail to get dish {id}"))?;

    let Some(row) = row else { return Ok(None) };
    let comments = get_comments(db_conn, id).await?;
    Ok(Some(row.with_comments(comments)))
}

pub async fn get_featured_dish(db_conn: &SqlitePool) -> anyhow::Result<Option<Dish>> {
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM dish WHERE featured = 1 ORDER BY id")
        .fetch_optional(db_conn)
        .await
        .context("fail to get featured dish")?;
    match id {
        Some(id) => get_dish(db_conn, id).await,
        None => Ok(None),
    }
}

/// Overwrite a dish and its whole comment list, then read it back.
pub async fn save_dish(db_conn: &SqlitePool, dish: &Dish) -> anyhow::Result<Dish> {
    let mut tx = db_conn.begin().await?;

    let updated = sqlx::query(
        r#"
UPDATE dish SET
    name = ?, image = ?, category = ?, label = ?, price = ?, featured = ?, description = ?
WHERE id = ?"#,
    )
    .bind(&dish.name)
    .bind(&dish.image)
    .bind(&dish.category)
    .bind(&dish.label)
    .bind(dish.price)
    .bind(dish.featured)
    .bind(&dish.description)
    .bind(dish.id)
    .execute(&mut tx)
    .await
    .with_context(|| format!("fail to update dish {}", dish.id))?
    .rows_affected();
    if updated == 0 {
        return Err(NotFound::dish(dish.id).into());
    }

    sqlx::query("DELETE FROM comment WHERE dish = ?")
        .bind(dish.id)
        .execute(&mut tx)
        .await?;
    for comment in &dish.comments {
        sqlx::query(
            "INSERT INTO comment (dish, rating, comment, author, date) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(dish.id)
        .bind(comment.rating)
        .bind(&comment.comment)
        .bind(&comment.author)
        .bind(comment.date)
        .execute(&mut tx)
        .await
        .with_context(|| format!("fail to save comments of dish {}", dish.id))?;
    }
    tx.commit().await?;

    get_dish(db_conn, dish.id)
        .await?
        .ok_or_else(|| NotFound::dish(dish.id).into())
}

#[derive(Builder)]
pub struct NewCommentProps {
    dish: i64,
    #[builder(setter(into))]
    author: String,
    #[builder(default = "5")]
    rating: u8,
    #[builder(setter(into))]
    comment: String,
    #[builder(default = "Utc::now()")]
    date: DateTime<Utc>,
}

pub async fn add_comment(db_conn: &SqlitePool, props: NewCommentProps) -> anyhow::Result<()> {
    let NewCommentProps {
        dish,
        author,
        rating,
        comment,
        date,
    } = props;

    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM dish WHERE id = ?")
        .bind(dish)
        .fetch_optional(db_conn)
        .await?;
    if exists.is_none() {
        return Err(NotFound::dish(dish).into());
    }

    sqlx::query(
        r#"
INSERT INTO comment
    (dish, rating, comment, author, date)
VALUES
    (?, ?, ?, ?, ?)"#,
    )
    .bind(dish)
    .bind(rating)
    .bind(comment)
    .bind(&author)
    .bind(date)
    .execute(db_conn)
    .await
    .with_context(|| format!("fail to add comment from {author}"))?;

    Ok(())
}
