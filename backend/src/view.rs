//! View state behind the pages of the menu: the about page and the dish detail page.
//!
//! Views never fail. A failed fetch is kept as a message for the user and
//! the previous state stays on screen.

use chrono::{DateTime, Utc};

use crate::data::{Dish, Leader};
use crate::form::{CommentForm, FormErrors};
use crate::nav::{self, Neighbors};
use crate::service::{DishService, LeaderService};

#[derive(Debug, Default)]
pub struct AboutView {
    pub leaders: Vec<Leader>,
    pub leader_err_mess: Option<String>,
}

impl AboutView {
    pub async fn load<S: LeaderService + ?Sized>(service: &S) -> Self {
        match service.get_leaders().await {
            Ok(leaders) => Self {
                leaders,
                leader_err_mess: None,
            },
            Err(err) => {
                tracing::error!("fail to load leaders: {err:#}");
                Self {
                    leaders: Vec::new(),
                    leader_err_mess: Some(err.to_string()),
                }
            }
        }
    }
}

/// Whether the dish card is on screen or in transition between two dishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Shown,
    Hidden,
}

#[derive(Debug, Default)]
pub struct DishDetailView {
    pub dish: Option<Dish>,
    pub dish_ids: Vec<i64>,
    pub neighbors: Option<Neighbors>,
    pub err_mess: Option<String>,
    pub form: CommentForm,
    pub form_errors: FormErrors,
    pub visibility: Visibility,
    history: Vec<i64>,
}

impl DishDetailView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load_ids<S: DishService + ?Sized>(&mut self, service: &S) -> bool {
        match service.get_dish_ids().await {
            Ok(ids) => {
                self.dish_ids = ids;
                true
            }
            Err(err) => {
                self.fail("fail to load dish ids", err);
                false
            }
        }
    }

    /// Navigate to `id`, remembering the current dish for [`DishDetailView::go_back`].
    pub async fn show<S: DishService + ?Sized>(&mut self, service: &S, id: i64) -> bool {
        let current = self.dish.as_ref().map(|dish| dish.id);
        if !self.fetch(service, id).await {
            return false;
        }
        if let Some(current) = current.filter(|&current| current != id) {
            self.history.push(current);
        }
        true
    }

    pub async fn go_prev<S: DishService + ?Sized>(&mut self, service: &S) -> bool {
        match self.neighbors {
            Some(Neighbors { prev, .. }) => self.show(service, prev).await,
            None => false,
        }
    }

    pub async fn go_next<S: DishService + ?Sized>(&mut self, service: &S) -> bool {
        match self.neighbors {
            Some(Neighbors { next, .. }) => self.show(service, next).await,
            None => false,
        }
    }

    /// Return to the dish displayed before the current one. False without history.
    pub async fn go_back<S: DishService + ?Sized>(&mut self, service: &S) -> bool {
        let Some(previous) = self.history.pop() else {
            return false;
        };
        if self.fetch(service, previous).await {
            true
        } else {
            self.history.push(previous);
            false
        }
    }

    pub fn history(&self) -> &[i64] {
        &self.history
    }

    /// Recompute the field messages after the form was edited.
    pub fn on_value_changed(&mut self) {
        self.form_errors = self.form.form_errors();
    }

    /// Append the form's comment to the displayed dish and save it.
    ///
    /// The form is reset only once the dish is stored, so a failed save keeps
    /// the user's input.
    pub async fn submit_comment<S: DishService + ?Sized>(
        &mut self,
        service: &S,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(dish) = self.dish.as_ref() else {
            self.err_mess = Some("No dish is displayed".to_string());
            return false;
        };

        let comment = match self.form.build(now) {
            Ok(comment) => comment,
            Err(errors) => {
                self.form_errors = errors;
                return false;
            }
        };

        let mut dishcopy = dish.clone();
        dishcopy.comments.push(comment);
        match service.save_dish(&dishcopy).await {
            Ok(saved) => {
                tracing::info!(
                    "new comment on dish {} from {}",
                    saved.id,
                    self.form.author.value()
                );
                self.dish = Some(saved);
                self.form.reset();
                self.form_errors = FormErrors::default();
                self.err_mess = None;
                true
            }
            Err(err) => {
                self.fail("fail to save dish", err);
                false
            }
        }
    }

    async fn fetch<S: DishService + ?Sized>(&mut self, service: &S, id: i64) -> bool {
        if self.dish_ids.is_empty() {
            self.load_ids(service).await;
        }

        self.visibility = Visibility::Hidden;
        match service.get_dish(id).await {
            Ok(dish) => {
                self.neighbors = nav::neighbors(&self.dish_ids, dish.id);
                self.dish = Some(dish);
                self.err_mess = None;
                self.visibility = Visibility::Shown;
                true
            }
            Err(err) => {
                self.fail("fail to load dish", err);
                false
            }
        }
    }

    fn fail(&mut self, what: &str, err: anyhow::Error) {
        tracing::error!("{what}: {err:#}");
        self.err_mess = Some(err.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Comment;
    use crate::db;
    use crate::service::Store;

    async fn store() -> Store {
        let pool = db::connect_in_memory().await.unwrap();
        db::seed(&pool, &db::Seed::bundled().unwrap()).await.unwrap();
        Store::new(pool)
    }

    /// Every call fails, like an unreachable server.
    struct Offline;

    #[async_trait::async_trait]
    impl LeaderService for Offline {
        async fn get_leaders(&self) -> anyhow::Result<Vec<Leader>> {
            anyhow::bail!("Http failure response: 0 Unknown Error")
        }

        async fn get_featured_leader(&self) -> anyhow::Result<Option<Leader>> {
            anyhow::bail!("Http failure response: 0 Unknown Error")
        }
    }

    #[async_trait::async_trait]
    impl DishService for Offline {
        async fn get_dishes(&self) -> anyhow::Result<Vec<Dish>> {
            anyhow::bail!("Http failure response: 0 Unknown Error")
        }

        async fn get_dish_ids(&self) -> anyhow::Result<Vec<i64>> {
            anyhow::bail!("Http failure response: 0 Unknown Error")
        }

        async fn get_dish(&self, _id: i64) -> anyhow::Result<Dish> {
            anyhow::bail!("Http failure response: 0 Unknown Error")
        }

        async fn get_featured_dish(&self) -> anyhow::Result<Option<Dish>> {
            anyhow::bail!("Http failure response: 0 Unknown Error")
        }

        async fn save_dish(&self, _dish: &Dish) -> anyhow::Result<Dish> {
            anyhow::bail!("Http failure response: 0 Unknown Error")
        }

        async fn add_comment(&self, _dish: i64, _comment: &Comment) -> anyhow::Result<Dish> {
            anyhow::bail!("Http failure response: 0 Unknown Error")
        }
    }

    #[tokio::test]
    async fn test_about_loads_leaders() {
        let view = AboutView::load(&store().await).await;
        assert_eq!(view.leaders.len(), 4);
        assert!(view.leader_err_mess.is_none());
    }

    #[tokio::test]
    async fn test_about_keeps_error_message() {
        let view = AboutView::load(&Offline).await;
        assert!(view.leaders.is_empty());
        assert_eq!(
            view.leader_err_mess.as_deref(),
            Some("Http failure response: 0 Unknown Error")
        );
    }

    #[tokio::test]
    async fn test_show_sets_neighbors() {
        let store = store().await;
        let mut view = DishDetailView::new();
        assert!(view.load_ids(&store).await);
        assert!(view.show(&store, 0).await);

        assert_eq!(view.dish.as_ref().unwrap().name, "Uthappizza");
        assert_eq!(view.neighbors, Some(Neighbors { prev: 3, next: 1 }));
        assert_eq!(view.visibility, Visibility::Shown);
    }

    #[tokio::test]
    async fn test_prev_next_and_back() {
        let store = store().await;
        let mut view = DishDetailView::new();
        assert!(view.show(&store, 3).await);

        assert!(view.go_next(&store).await);
        assert_eq!(view.dish.as_ref().unwrap().id, 0);
        assert!(view.go_prev(&store).await);
        assert_eq!(view.dish.as_ref().unwrap().id, 3);
        assert_eq!(view.history(), &[3, 0]);

        assert!(view.go_back(&store).await);
        assert_eq!(view.dish.as_ref().unwrap().id, 0);
        assert!(view.go_back(&store).await);
        assert_eq!(view.dish.as_ref().unwrap().id, 3);
        assert!(!view.go_back(&store).await);
    }

    #[tokio::test]
    async fn test_unknown_dish_keeps_previous() {
        let store = store().await;
        let mut view = DishDetailView::new();
        assert!(view.show(&store, 1).await);
        assert!(!view.show(&store, 9).await);

        assert_eq!(view.dish.as_ref().unwrap().id, 1);
        assert_eq!(view.err_mess.as_deref(), Some("no dish found with id 9"));
        assert_eq!(view.visibility, Visibility::Hidden);
        assert!(view.history().is_empty());
    }

    #[tokio::test]
    async fn test_offline_detail() {
        let mut view = DishDetailView::new();
        assert!(!view.show(&Offline, 0).await);
        assert!(view.dish.is_none());
        assert!(view.err_mess.is_some());
        assert!(!view.go_next(&Offline).await);
    }

    #[tokio::test]
    async fn test_submit_comment() {
        let store = store().await;
        let mut view = DishDetailView::new();
        view.show(&store, 2).await;

        view.form.set_author("George Harrison");
        view.form.set_rating(5);
        view.form.set_comment("Here comes the vada");
        view.on_value_changed();
        assert!(view.form_errors.is_empty());

        assert!(view.submit_comment(&store, Utc::now()).await);
        let dish = view.dish.as_ref().unwrap();
        assert_eq!(dish.comments.len(), 2);
        assert_eq!(dish.comments[1].author, "George Harrison");
        assert_eq!(view.form.author.value(), "");

        let stored = store.get_dish(2).await.unwrap();
        assert_eq!(&stored, dish);
    }

    #[tokio::test]
    async fn test_submit_invalid_comment() {
        let store = store().await;
        let mut view = DishDetailView::new();
        view.show(&store, 2).await;

        view.form.set_author("G");
        assert!(!view.submit_comment(&store, Utc::now()).await);
        assert_eq!(
            view.form_errors.author,
            "Name must be at least 2 characters long."
        );
        assert_eq!(view.form_errors.comment, "Your comments are required.");
        assert_eq!(view.dish.as_ref().unwrap().comments.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_input() {
        let store = store().await;
        let mut view = DishDetailView::new();
        view.show(&store, 2).await;

        view.form.set_author("George");
        view.form.set_comment("Lost in the network");
        assert!(!view.submit_comment(&Offline, Utc::now()).await);

        assert_eq!(view.dish.as_ref().unwrap().comments.len(), 1);
        assert_eq!(view.form.author.value(), "George");
        assert!(view.err_mess.is_some());
    }
}
