use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use restaurant_menu::bot::{self as render, DishAction, DishCallback};
use restaurant_menu::config::Config;
use restaurant_menu::form::parse_rating;
use restaurant_menu::service::{DishService, Store};
use restaurant_menu::view::{AboutView, DishDetailView};
use teloxide::{
    dispatching::{dialogue::InMemStorage, UpdateHandler},
    prelude::*,
    types::{CallbackQuery, ChatId, Message},
    utils::command::BotCommands,
};
use tokio::sync::Mutex;

macro_rules! send {
    ([$bot:expr, $msg:expr], $text:expr) => {
        if let Err(e) = $bot.send_message($msg.chat.id, $text).await {
            tracing::error!("fail to send message: {e}")
        }
    };
}

type HandlerResult = anyhow::Result<()>;
type ChatDialogue = Dialogue<ChatState, InMemStorage<ChatState>>;

/// The dish page each chat is looking at. Updates of one chat are handled in
/// order by the dispatcher, so a view is never used by two handlers at once.
pub(super) type Views = Arc<Mutex<HashMap<ChatId, DishDetailView>>>;

/// Which comment field the bot is waiting for. The values live in the chat's view form.
#[derive(Clone, Debug, Default)]
pub(super) enum ChatState {
    #[default]
    Idle,
    AwaitAuthor {
        dish_id: i64,
    },
    AwaitRating {
        dish_id: i64,
    },
    AwaitComment {
        dish_id: i64,
    },
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub(super) enum Commands {
    #[command(description = "display this text.")]
    Help,
    #[command(description = "list the dishes on the menu.")]
    Menu,
    #[command(description = "show a dish, usage: /dish <id>")]
    Dish(String),
    #[command(description = "search a dish by name, usage: /search <name>")]
    Search(String),
    #[command(description = "meet the people behind the restaurant.")]
    About,
    #[command(description = "abort the comment being written.")]
    Cancel,
}

pub(super) fn handler_schema() -> UpdateHandler<anyhow::Error> {
    let command_handler = teloxide::filter_command::<Commands, _>()
        .branch(dptree::case![Commands::Help].endpoint(help_handler))
        .branch(dptree::case![Commands::Menu].endpoint(menu_handler))
        .branch(dptree::case![Commands::Dish(arg)].endpoint(dish_handler))
        .branch(dptree::case![Commands::Search(pattern)].endpoint(search_handler))
        .branch(dptree::case![Commands::About].endpoint(about_handler))
        .branch(dptree::case![Commands::Cancel].endpoint(cancel_handler));

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(dptree::case![ChatState::AwaitAuthor { dish_id }].endpoint(receive_author))
        .branch(dptree::case![ChatState::AwaitRating { dish_id }].endpoint(receive_rating))
        .branch(dptree::case![ChatState::AwaitComment { dish_id }].endpoint(receive_comment));

    let callback_handler = Update::filter_callback_query().endpoint(callback_handler);

    teloxide::dispatching::dialogue::enter::<Update, InMemStorage<ChatState>, ChatState, _>()
        .branch(message_handler)
        .branch(callback_handler)
}

async fn take_view(views: &Views, chat: ChatId) -> DishDetailView {
    views.lock().await.remove(&chat).unwrap_or_default()
}

async fn put_view(views: &Views, chat: ChatId, view: DishDetailView) {
    views.lock().await.insert(chat, view);
}

/// Back to idle. A chat that never entered a dialogue has no stored state,
/// which the storage reports as an error.
async fn leave_dialogue(dialogue: &ChatDialogue) {
    if let Err(e) = dialogue.exit().await {
        tracing::debug!("no dialogue to leave in chat {}: {e}", dialogue.chat_id().0);
    }
}

async fn send_dish(
    bot: &Bot,
    chat: ChatId,
    view: &DishDetailView,
    cfg: &Config,
) -> HandlerResult {
    bot.send_message(chat, render::render_dish(view, cfg))
        .reply_markup(render::dish_keyboard(view))
        .await?;
    Ok(())
}

async fn help_handler(msg: Message, bot: Bot) -> HandlerResult {
    send!([bot, msg], Commands::descriptions().to_string());
    Ok(())
}

async fn menu_handler(msg: Message, bot: Bot, store: Store) -> HandlerResult {
    match store.get_dishes().await {
        Ok(dishes) => {
            bot.send_message(msg.chat.id, render::render_menu(&dishes))
                .reply_markup(render::menu_keyboard(&dishes))
                .await?;
        }
        Err(e) => {
            tracing::error!("fail to load menu: {e:#}");
            send!([bot, msg], format!("Fail to load the menu: {e}"));
        }
    }
    Ok(())
}

async fn dish_handler(
    msg: Message,
    bot: Bot,
    arg: String,
    store: Store,
    cfg: Arc<Config>,
    views: Views,
) -> HandlerResult {
    let Ok(id) = arg.trim().parse::<i64>() else {
        send!([bot, msg], "Usage: /dish <id>\n\nUse /menu to find the id of a dish.");
        return Ok(());
    };

    let mut view = take_view(&views, msg.chat.id).await;
    view.show(&store, id).await;
    let result = send_dish(&bot, msg.chat.id, &view, &cfg).await;
    put_view(&views, msg.chat.id, view).await;
    result
}

async fn search_handler(msg: Message, bot: Bot, pattern: String, store: Store) -> HandlerResult {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        send!([bot, msg], "Usage: /search <name>");
        return Ok(());
    }

    let dishes = match store.get_dishes().await {
        Ok(dishes) => dishes,
        Err(e) => {
            send!([bot, msg], format!("Fail to search the menu: {e}"));
            return Ok(());
        }
    };
    let found = render::search_dishes(&dishes, pattern);
    if found.is_empty() {
        send!([bot, msg], format!("No dish matches \"{pattern}\""));
        return Ok(());
    }

    bot.send_message(msg.chat.id, format!("{} dish(es) found:", found.len()))
        .reply_markup(render::menu_keyboard(found))
        .await?;
    Ok(())
}

async fn about_handler(msg: Message, bot: Bot, store: Store, cfg: Arc<Config>) -> HandlerResult {
    let view = AboutView::load(&store).await;
    send!([bot, msg], render::render_about(&view, &cfg));
    Ok(())
}

async fn cancel_handler(
    msg: Message,
    bot: Bot,
    dialogue: ChatDialogue,
    views: Views,
) -> HandlerResult {
    leave_dialogue(&dialogue).await;
    if let Some(view) = views.lock().await.get_mut(&msg.chat.id) {
        view.form.reset();
    }
    send!([bot, msg], "Cancelled.");
    Ok(())
}

async fn callback_handler(
    q: CallbackQuery,
    bot: Bot,
    dialogue: ChatDialogue,
    store: Store,
    cfg: Arc<Config>,
    views: Views,
) -> HandlerResult {
    bot.answer_callback_query(q.id).await?;
    let (Some(data), Some(message)) = (q.data, q.message) else {
        return Ok(());
    };
    let Some(callback) = DishCallback::parse(&data) else {
        tracing::warn!("unexpected callback data: {data}");
        return Ok(());
    };

    let chat = message.chat.id;
    let mut view = take_view(&views, chat).await;
    match callback.action {
        DishAction::Show => {
            view.show(&store, callback.id).await;
        }
        DishAction::Back => {
            // the history is lost on restart, fall back to the dish of the button
            if !view.go_back(&store).await && view.dish.is_none() {
                view.show(&store, callback.id).await;
            }
        }
        DishAction::Comment => {
            if view.dish.as_ref().map(|dish| dish.id) != Some(callback.id) {
                view.show(&store, callback.id).await;
            }
            view.form.reset();
            put_view(&views, chat, view).await;
            dialogue
                .update(ChatState::AwaitAuthor {
                    dish_id: callback.id,
                })
                .await?;
            bot.send_message(chat, "What is your name? (/cancel to stop)")
                .await?;
            return Ok(());
        }
    }

    let text = render::render_dish(&view, &cfg);
    let markup = render::dish_keyboard(&view);
    put_view(&views, chat, view).await;
    if let Err(e) = bot
        .edit_message_text(chat, message.id, text)
        .reply_markup(markup)
        .await
    {
        tracing::error!("fail to edit message: {e}");
    }
    Ok(())
}

async fn receive_author(
    msg: Message,
    bot: Bot,
    dialogue: ChatDialogue,
    dish_id: i64,
    views: Views,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        send!([bot, msg], "Please send your name as text.");
        return Ok(());
    };

    let mut view = take_view(&views, msg.chat.id).await;
    view.form.set_author(text.trim());
    view.on_value_changed();
    let error = view.form_errors.author.clone();
    put_view(&views, msg.chat.id, view).await;

    if !error.is_empty() {
        send!([bot, msg], error);
        return Ok(());
    }
    dialogue.update(ChatState::AwaitRating { dish_id }).await?;
    send!([bot, msg], "How would you rate it, from 1 to 5?");
    Ok(())
}

async fn receive_rating(
    msg: Message,
    bot: Bot,
    dialogue: ChatDialogue,
    dish_id: i64,
    views: Views,
) -> HandlerResult {
    let Some(rating) = msg.text().and_then(parse_rating) else {
        send!([bot, msg], "Please answer with a number from 1 to 5.");
        return Ok(());
    };

    if let Some(view) = views.lock().await.get_mut(&msg.chat.id) {
        view.form.set_rating(rating);
    }
    dialogue.update(ChatState::AwaitComment { dish_id }).await?;
    send!([bot, msg], "Now write your comment.");
    Ok(())
}

async fn receive_comment(
    msg: Message,
    bot: Bot,
    dialogue: ChatDialogue,
    dish_id: i64,
    store: Store,
    cfg: Arc<Config>,
    views: Views,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        send!([bot, msg], "Please send your comment as text.");
        return Ok(());
    };

    let mut view = take_view(&views, msg.chat.id).await;
    view.form.set_comment(text.trim());
    view.on_value_changed();
    if !view.form_errors.comment.is_empty() {
        send!([bot, msg], view.form_errors.comment.clone());
        put_view(&views, msg.chat.id, view).await;
        return Ok(());
    }

    if view.dish.as_ref().map(|dish| dish.id) != Some(dish_id) {
        view.show(&store, dish_id).await;
    }

    let saved = view.submit_comment(&store, Utc::now()).await;
    let result = if saved {
        leave_dialogue(&dialogue).await;
        send!([bot, msg], "Thank you for your comment!");
        send_dish(&bot, msg.chat.id, &view, &cfg).await
    } else if !view.form_errors.is_empty() {
        // the form lost a field, most likely the bot restarted mid-dialogue
        dialogue
            .update(ChatState::AwaitAuthor { dish_id })
            .await?;
        send!(
            [bot, msg],
            format!("{}\n\nWhat is your name?", view.form_errors)
        );
        Ok(())
    } else {
        leave_dialogue(&dialogue).await;
        let err = view.err_mess.clone().unwrap_or_default();
        send!([bot, msg], format!("Fail to save your comment: {err}"));
        Ok(())
    };
    put_view(&views, msg.chat.id, view).await;
    result
}
