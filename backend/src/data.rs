use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Leader {
    pub id: i64,
    pub name: String,
    /// path to image, relative to the base url
    pub image: String,
    pub role: String,
    #[serde(default)]
    pub abbr: String,
    #[serde(default)]
    pub featured: bool,
    pub bio: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub id: i64,
    pub name: String,
    /// path to image, relative to the base url
    pub image: String,
    pub category: String,
    #[serde(default)]
    pub label: String,
    pub price: f64,
    #[serde(default)]
    pub featured: bool,
    pub description: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub rating: u8,
    pub comment: String,
    pub author: String,
    pub date: DateTime<Utc>,
}

/// A dish row without its comments.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct DishRow {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub category: String,
    pub label: String,
    pub price: f64,
    pub featured: bool,
    pub description: String,
}

impl DishRow {
    pub(crate) fn with_comments(self, comments: Vec<Comment>) -> Dish {
        Dish {
            id: self.id,
            name: self.name,
            image: self.image,
            category: self.category,
            label: self.label,
            price: self.price,
            featured: self.featured,
            description: self.description,
            comments,
        }
    }
}

impl Comment {
    /// Average rating of a comment list, `None` when there is nothing to average.
    pub fn average(comments: &[Comment]) -> Option<f64> {
        if comments.is_empty() {
            return None;
        }
        let sum: u32 = comments.iter().map(|c| u32::from(c.rating)).sum();
        Some(f64::from(sum) / comments.len() as f64)
    }
}
