//! Rendering of the views into bot messages, and the callback data of the inline buttons.

use fuzzy_matcher::{skim::SkimMatcherV2, FuzzyMatcher};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::config::Config;
use crate::data::{Comment, Dish};
use crate::view::{AboutView, DishDetailView};

const CALLBACK_CATEGORY: &str = "DISH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DishAction {
    Show,
    Back,
    Comment,
}

impl DishAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Show => "show",
            Self::Back => "back",
            Self::Comment => "comment",
        }
    }
}

/// Callback data of a dish button, laid out as "{category}-{id}-{action}".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DishCallback {
    pub id: i64,
    pub action: DishAction,
}

impl DishCallback {
    pub fn new(id: i64, action: DishAction) -> Self {
        Self { id, action }
    }

    pub fn encode(&self) -> String {
        format!("{CALLBACK_CATEGORY}-{}-{}", self.id, self.action.as_str())
    }

    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.splitn(3, '-');
        if parts.next()? != CALLBACK_CATEGORY {
            return None;
        }
        let id = parts.next()?.parse().ok()?;
        let action = match parts.next()? {
            "show" => DishAction::Show,
            "back" => DishAction::Back,
            "comment" => DishAction::Comment,
            _ => return None,
        };
        Some(Self { id, action })
    }
}

pub fn stars(rating: u8) -> String {
    "★".repeat(rating as usize) + &"☆".repeat(5usize.saturating_sub(rating as usize))
}

pub fn render_menu(dishes: &[Dish]) -> String {
    if dishes.is_empty() {
        return "The menu is empty.".to_string();
    }
    dishes.iter().fold(String::from("Menu:\n"), |sumed, dish| {
        format!("{sumed}\n{}. {} ({}) ${:.2}", dish.id, dish.name, dish.category, dish.price)
    })
}

fn render_comment(comment: &Comment) -> String {
    format!(
        "{} {}\n-- {}, {}",
        stars(comment.rating),
        comment.comment,
        comment.author,
        comment.date.format("%b %d, %Y")
    )
}

pub fn render_dish(view: &DishDetailView, cfg: &Config) -> String {
    let Some(dish) = &view.dish else {
        return match &view.err_mess {
            Some(err) => format!("Fail to load the dish: {err}"),
            None => "Loading...".to_string(),
        };
    };

    let mut text = dish.name.to_uppercase();
    if !dish.label.is_empty() {
        text += &format!(" [{}]", dish.label);
    }
    text += &format!(
        "\n{} - ${:.2}\n\n{}\n{}",
        dish.category,
        dish.price,
        dish.description,
        cfg.image_url(&dish.image)
    );

    match Comment::average(&dish.comments) {
        Some(average) => {
            text += &format!("\n\nComments ({average:.1} avg):");
            for comment in &dish.comments {
                text += "\n\n";
                text += &render_comment(comment);
            }
        }
        None => text += "\n\nNo comments yet.",
    }

    if let Some(err) = &view.err_mess {
        text += &format!("\n\n⚠ {err}");
    }
    text
}

pub fn dish_keyboard(view: &DishDetailView) -> InlineKeyboardMarkup {
    let btn = |text: &str, id: i64, action| {
        InlineKeyboardButton::callback(text, DishCallback::new(id, action).encode())
    };

    let mut buttons = Vec::new();
    if let Some(neighbors) = view.neighbors {
        buttons.push(vec![
            btn("« Prev", neighbors.prev, DishAction::Show),
            btn("Next »", neighbors.next, DishAction::Show),
        ]);
    }
    if let Some(dish) = &view.dish {
        let mut row = vec![btn("Leave a comment", dish.id, DishAction::Comment)];
        if !view.history().is_empty() {
            row.insert(0, btn("Back", dish.id, DishAction::Back));
        }
        buttons.push(row);
    }
    InlineKeyboardMarkup::new(buttons)
}

/// One button per dish, each opening its detail.
pub fn menu_keyboard<'a>(dishes: impl IntoIterator<Item = &'a Dish>) -> InlineKeyboardMarkup {
    let buttons = dishes.into_iter().map(|dish| {
        vec![InlineKeyboardButton::callback(
            dish.name.as_str(),
            DishCallback::new(dish.id, DishAction::Show).encode(),
        )]
    });
    InlineKeyboardMarkup::new(buttons)
}

pub fn render_about(view: &AboutView, cfg: &Config) -> String {
    if let Some(err) = &view.leader_err_mess {
        return format!("Fail to load our leaders: {err}");
    }
    view.leaders
        .iter()
        .fold(String::from("Corporate Leadership"), |sumed, leader| {
            format!(
                "{sumed}\n\n{} ({})\n{}\n{}",
                leader.name,
                leader.role,
                leader.bio,
                cfg.image_url(&leader.image)
            )
        })
}

/// Dishes whose name fuzzily matches `pattern`, best match first.
pub fn search_dishes<'a>(dishes: &'a [Dish], pattern: &str) -> Vec<&'a Dish> {
    let matcher = SkimMatcherV2::default();
    let mut found: Vec<_> = dishes
        .iter()
        .filter_map(|dish| {
            matcher
                .fuzzy_match(&dish.name, pattern)
                .map(|score| (score, dish))
        })
        .collect();
    found.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.id.cmp(&b.1.id)));
    found.into_iter().map(|(_, dish)| dish).collect()
}
