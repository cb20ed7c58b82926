use teloxide::{
    payloads::SendMessageSetters, prelude::Requester, types::Message, utils::command::BotCommands,
    Bot,
};

use crate::{keyboard::action_keyboard, state::QuizState, HandlerResult, UserDialogue};

#[derive(Debug, Clone, BotCommands)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "display help.")]
    Help,
    #[command(description = "abandon the current quiz")]
    Cancel,
    #[command(description = "start the bot")]
    Start,
}

pub async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

pub async fn cancel(bot: Bot, dialogue: UserDialogue, msg: Message) -> HandlerResult {
    // A live countdown must not outlive the dialogue it belongs to.
    if let Ok(Some(QuizState::Taking { ctx } | QuizState::Finished { ctx })) =
        dialogue.get().await
    {
        ctx.stop_timer();
    }

    bot.send_message(msg.chat.id, "Cancelling dialogue").await?;
    dialogue.update(QuizState::Start).await?;
    Ok(())
}

pub async fn start(bot: Bot, msg: Message, dialogue: UserDialogue) -> HandlerResult {
    bot.send_message(msg.chat.id, "Please choose what to do:")
        .reply_markup(action_keyboard())
        .await?;
    dialogue.update(QuizState::Start).await?;
    Ok(())
}
