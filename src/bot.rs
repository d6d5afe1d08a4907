use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use dotenvy::dotenv;
use rand::{SeedableRng, rngs::StdRng};
use teloxide::{
    payloads::SendPhotoSetters,
    prelude::*,
    types::{ChatId, InputFile},
};
use tracing_subscriber::EnvFilter;

use crate::{
    command::{Command, Query, classify},
    config::{Config, SharedConfig},
    cooldown::Remaining,
    error::GameError,
    ledger::{DrawResult, Ledger, OwnedCard, Player, UserAccount},
    messages::{Messages, effective_lang, format_with},
    rarity::Rarity,
    storage::SqliteStore,
    wager::{PendingWager, WagerKind},
};

/// Return the current unix timestamp in seconds
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn remaining_pairs(r: &Remaining) -> [(&'static str, String); 3] {
    [
        ("hours", r.hours.to_string()),
        ("minutes", r.minutes.to_string()),
        ("seconds", r.seconds.to_string()),
    ]
}

fn fill(template: &str, pairs: &[(&str, String)]) -> String {
    let borrowed: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
    format_with(template, &borrowed)
}

/// Text for a refused or failed action. `cooldown_template` is used for
/// `CooldownActive`, since draws and wagers word it differently.
pub fn error_reply(messages: &Messages, err: &GameError, cooldown_template: &str) -> String {
    match err {
        GameError::CatalogEmpty => messages.catalog_empty.clone(),
        GameError::CooldownActive(r) => fill(cooldown_template, &remaining_pairs(r)),
        GameError::InsufficientBalance { needed, available } => fill(
            &messages.insufficient_balance,
            &[
                ("needed", needed.to_string()),
                ("available", available.to_string()),
            ],
        ),
        GameError::InvalidWagerAmount => messages.invalid_wager.clone(),
        GameError::Persistence(_) => messages.try_again_later.clone(),
    }
}

/// Caption sent with a drawn card image.
pub fn card_caption(messages: &Messages, result: &DrawResult) -> String {
    let card = &result.entry.card;
    let status = if result.grant.is_new {
        messages.new_card.clone()
    } else {
        fill(
            &messages.duplicate_card,
            &[("count", result.grant.owned_count.to_string())],
        )
    };
    fill(
        &messages.card_caption,
        &[
            ("name", card.name.clone()),
            ("emoji", card.rarity.emoji().to_string()),
            ("rarity", messages.rarity_name(card.rarity).to_string()),
            ("status", status),
            ("points", result.grant.points_delta.to_string()),
            ("coins", result.grant.coins_delta.to_string()),
            ("score", result.account.score.to_string()),
        ],
    )
}

pub fn collection_reply(
    messages: &Messages,
    account: &UserAccount,
    cards: &[OwnedCard],
) -> String {
    if cards.is_empty() {
        return messages.collection_empty.clone();
    }
    let mut reply = fill(
        &messages.collection_header,
        &[
            ("score", account.score.to_string()),
            ("coins", account.coins.to_string()),
        ],
    );
    reply.push_str("\n\n");
    for rarity in Rarity::ALL.iter().rev() {
        let total: i64 = cards
            .iter()
            .filter(|c| c.rarity == *rarity)
            .map(|c| c.count)
            .sum();
        if total > 0 {
            reply.push_str(&format!(
                "{} {} — {}\n",
                rarity.emoji(),
                messages.rarity_name(*rarity),
                total
            ));
        }
    }
    reply.push('\n');
    for (i, card) in cards.iter().enumerate() {
        reply.push_str(&fill(
            &messages.collection_line,
            &[
                ("index", (i + 1).to_string()),
                ("name", card.name.clone()),
                ("rarity", messages.rarity_name(card.rarity).to_string()),
                ("count", card.count.to_string()),
            ],
        ));
        reply.push('\n');
    }
    reply
}

pub fn leaderboard_reply(messages: &Messages, top: &[UserAccount]) -> String {
    if top.is_empty() {
        return messages.leaderboard_empty.clone();
    }
    let mut reply = messages.leaderboard_header.clone();
    for (i, account) in top.iter().enumerate() {
        let name = if account.display_name.is_empty() {
            account.user_id.clone()
        } else {
            account.display_name.clone()
        };
        reply.push('\n');
        reply.push_str(&fill(
            &messages.leaderboard_line,
            &[
                ("place", (i + 1).to_string()),
                ("name", name),
                ("score", account.score.to_string()),
            ],
        ));
    }
    reply
}

/// Text revealing a placed bet.
pub fn reveal_reply(messages: &Messages, config: &Config, pending: &PendingWager) -> String {
    let score = pending.score.to_string();
    match pending.kind {
        WagerKind::Dice { roll } if pending.outcome.win => fill(
            &messages.wager_win,
            &[
                ("roll", roll.to_string()),
                ("payout", pending.outcome.payout().to_string()),
                ("score", score),
            ],
        ),
        WagerKind::Dice { roll } => fill(
            &messages.wager_loss,
            &[
                ("roll", roll.to_string()),
                ("stake", pending.outcome.stake.to_string()),
                ("score", score),
            ],
        ),
        WagerKind::Arcade(_) if pending.outcome.win => fill(
            &messages.arcade_win,
            &[
                ("reward", config.wager.arcade.reward.to_string()),
                ("score", score),
            ],
        ),
        WagerKind::Arcade(_) => fill(&messages.arcade_loss, &[("score", score)]),
    }
}

pub fn help_reply(messages: &Messages, config: &Config) -> String {
    let cooldown = Remaining::from_secs(config.draw.cooldown.as_secs());
    fill(
        &messages.help,
        &[
            ("triggers", config.triggers.phrases().join(", ")),
            ("cooldown", cooldown.to_string()),
            ("game_cost", config.wager.arcade.cost.to_string()),
        ],
    )
}

async fn reply_error(
    bot: &Bot,
    chat_id: ChatId,
    messages: &Messages,
    err: &GameError,
    cooldown_template: &str,
) -> Result<()> {
    match err {
        GameError::Persistence(e) => tracing::error!("store failure: {}", e),
        GameError::CooldownActive(r) => tracing::debug!("cooldown active: {} left", r),
        other => tracing::debug!("refused: {}", other),
    }
    bot.send_message(chat_id, error_reply(messages, err, cooldown_template))
        .await?;
    Ok(())
}

async fn send_card(
    bot: &Bot,
    chat_id: ChatId,
    caption: String,
    result: &DrawResult,
) -> Result<()> {
    bot.send_photo(chat_id, InputFile::file(result.entry.path.clone()))
        .caption(caption)
        .await?;
    Ok(())
}

/// Wait out the reveal delay and announce an already committed bet.
async fn reveal_wager(
    bot: Bot,
    chat_id: ChatId,
    config: SharedConfig,
    lang_code: Option<String>,
    pending: PendingWager,
) {
    tokio::time::sleep(config.wager.reveal_delay).await;
    let messages = config.messages_for(effective_lang(lang_code.as_deref(), config.lang));
    let text = reveal_reply(messages, &config, &pending);
    if let Err(err) = bot.send_message(chat_id, text).await {
        tracing::error!("failed to announce wager result: {:?}", err);
    }
}

/// Handle an incoming message: classify it, run the game action, reply.
async fn handle_message(
    bot: &Bot,
    msg: &Message,
    ledger: &Ledger,
    config: SharedConfig,
) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(command) = classify(text, &config.triggers) else {
        return Ok(());
    };
    let lang_code = msg.from.as_ref().and_then(|u| u.language_code.clone());
    let messages = config.messages_for(effective_lang(lang_code.as_deref(), config.lang));

    let Some(user) = msg.from.as_ref() else {
        bot.send_message(msg.chat.id, messages.cannot_play.clone())
            .await?;
        return Ok(());
    };
    let player = Player {
        id: user.id.0.to_string(),
        display_name: user.full_name(),
    };
    let chat_id = msg.chat.id;

    match command {
        Command::Draw => {
            let mut rng = StdRng::from_entropy();
            match ledger.draw(&player, now_unix(), &config.draw, &mut rng).await {
                Ok(result) => {
                    let caption = card_caption(messages, &result);
                    send_card(bot, chat_id, caption, &result).await?;
                }
                Err(err) => {
                    reply_error(bot, chat_id, messages, &err, &messages.draw_cooldown).await?;
                }
            }
        }
        Command::OpenChest(kind) => {
            let mut rng = StdRng::from_entropy();
            match ledger
                .open_chest(&player, kind, &config.chests, &config.draw, &mut rng)
                .await
            {
                Ok(result) => {
                    let price = config.chests.spec(kind).price;
                    let caption = format!(
                        "{}\n{}",
                        fill(
                            &messages.chest_opened,
                            &[
                                ("price", price.to_string()),
                                ("coins_left", result.account.coins.to_string()),
                            ],
                        ),
                        card_caption(messages, &result)
                    );
                    send_card(bot, chat_id, caption, &result).await?;
                }
                Err(err) => {
                    reply_error(bot, chat_id, messages, &err, &messages.draw_cooldown).await?;
                }
            }
        }
        Command::Wager(stake) => {
            let mut rng = StdRng::from_entropy();
            let placed = ledger
                .place_bet(&player, stake, now_unix(), &config.wager, &mut rng)
                .await;
            start_reveal(bot, chat_id, &config, messages, lang_code, placed, "🎲").await?;
        }
        Command::Arcade(game) => {
            let mut rng = StdRng::from_entropy();
            let placed = ledger
                .place_arcade(&player, game, now_unix(), &config.wager, &mut rng)
                .await;
            let emoji = game.emoji();
            start_reveal(bot, chat_id, &config, messages, lang_code, placed, emoji).await?;
        }
        Command::Query(query) => {
            let reply = match answer_query(ledger, &config, messages, &player, query) {
                Ok(reply) => reply,
                Err(err) => {
                    reply_error(bot, chat_id, messages, &err, &messages.draw_cooldown).await?;
                    return Ok(());
                }
            };
            bot.send_message(chat_id, reply).await?;
        }
    }
    Ok(())
}

async fn start_reveal(
    bot: &Bot,
    chat_id: ChatId,
    config: &SharedConfig,
    messages: &Messages,
    lang_code: Option<String>,
    placed: Result<PendingWager, GameError>,
    emoji: &str,
) -> Result<()> {
    let pending = match placed {
        Ok(pending) => pending,
        Err(err) => {
            return reply_error(bot, chat_id, messages, &err, &messages.wager_cooldown).await;
        }
    };
    bot.send_message(
        chat_id,
        fill(
            &messages.bet_placed,
            &[("emoji", emoji.to_string()), ("stake", pending.outcome.stake.to_string())],
        ),
    )
    .await?;
    tokio::spawn(reveal_wager(
        bot.clone(),
        chat_id,
        config.clone(),
        lang_code,
        pending,
    ));
    Ok(())
}

fn answer_query(
    ledger: &Ledger,
    config: &Config,
    messages: &Messages,
    player: &Player,
    query: Query,
) -> Result<String, GameError> {
    let account = || -> Result<UserAccount, GameError> {
        Ok(ledger
            .account(&player.id)?
            .unwrap_or_else(|| UserAccount::new(player.id.clone(), player.display_name.clone())))
    };
    Ok(match query {
        Query::Collection => {
            collection_reply(messages, &account()?, &ledger.collection(&player.id)?)
        }
        Query::Leaderboard => {
            leaderboard_reply(messages, &ledger.leaderboard(config.leaderboard_size)?)
        }
        Query::Balance => {
            let acc = account()?;
            fill(
                &messages.balance,
                &[("score", acc.score.to_string()), ("coins", acc.coins.to_string())],
            )
        }
        Query::Help => help_reply(messages, config),
    })
}

/// Run the bot: load config, open the store, and start polling.
pub async fn run_bot() -> Result<()> {
    dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config: SharedConfig = std::sync::Arc::new(Config::from_env()?);
    let store = SqliteStore::open(&config.database_path)?;
    let ledger = Ledger::new(store);
    tracing::info!(
        "starting: db={} cards={} draw_cooldown={}s",
        config.database_path.display(),
        config.draw.cards_dir.display(),
        config.draw.cooldown.as_secs()
    );

    let bot = Bot::from_env();
    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let ledger = ledger.clone();
        let config = config.clone();
        async move {
            if let Err(err) = handle_message(&bot, &msg, &ledger, config).await {
                tracing::error!("handler error: {:?}", err);
            }
            respond(())
        }
    })
    .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{CardDefinition, CatalogEntry},
        ledger::Grant,
        messages::default_messages,
        wager::WagerOutcome,
    };
    use std::path::{Path, PathBuf};

    fn draw_result(is_new: bool, count: i64) -> DrawResult {
        let mut account = UserAccount::new("1", "Ann");
        account.score = 30;
        DrawResult {
            entry: CatalogEntry {
                path: PathBuf::from("cards/fanya_mythic.png"),
                card: CardDefinition {
                    name: "Fanya".to_string(),
                    rarity: Rarity::Mythic,
                },
            },
            grant: Grant {
                is_new,
                points_delta: 25,
                coins_delta: if is_new { 5 } else { 0 },
                owned_count: count,
            },
            account,
        }
    }

    #[test]
    fn caption_mentions_new_card() {
        let text = card_caption(&default_messages(), &draw_result(true, 1));
        assert!(text.contains("Fanya"), "{text}");
        assert!(text.contains("Mythic"), "{text}");
        assert!(text.contains("New card"), "{text}");
        assert!(text.contains("+25 points, +5 coins"), "{text}");
        assert!(text.contains("Total: 30"), "{text}");
    }

    #[test]
    fn caption_mentions_duplicate_count() {
        let text = card_caption(&default_messages(), &draw_result(false, 3));
        assert!(text.contains("You have 3 now"), "{text}");
        assert!(text.contains("+0 coins"), "{text}");
    }

    #[test]
    fn cooldown_reply_shows_remaining() {
        let msgs = default_messages();
        let err = GameError::CooldownActive(Remaining::from_secs(3590));
        let text = error_reply(&msgs, &err, &msgs.draw_cooldown);
        assert!(text.contains("0h 59m 50s"), "{text}");
    }

    #[test]
    fn persistence_failure_is_generic() {
        let msgs = default_messages();
        let err = GameError::Persistence(std::io::Error::other("disk gone").into());
        assert_eq!(error_reply(&msgs, &err, &msgs.draw_cooldown), msgs.try_again_later);
    }

    #[test]
    fn collection_lists_tiers_and_cards() {
        let msgs = default_messages();
        let account = UserAccount::new("1", "Ann");
        let cards = vec![
            OwnedCard {
                name: "Crown".into(),
                rarity: Rarity::Legendary,
                count: 1,
            },
            OwnedCard {
                name: "Fanya".into(),
                rarity: Rarity::Common,
                count: 3,
            },
        ];
        let text = collection_reply(&msgs, &account, &cards);
        assert!(text.contains("Common — 3"), "{text}");
        assert!(text.contains("1. Crown - Legendary x1"), "{text}");
        assert!(text.contains("2. Fanya - Common x3"), "{text}");
        assert_eq!(collection_reply(&msgs, &account, &[]), msgs.collection_empty);
    }

    #[test]
    fn leaderboard_numbers_places() {
        let msgs = default_messages();
        let mut a = UserAccount::new("1", "Ann");
        a.score = 90;
        let mut b = UserAccount::new("2", "");
        b.score = 40;
        let text = leaderboard_reply(&msgs, &[a, b]);
        assert!(text.contains("1. Ann - 90"), "{text}");
        assert!(text.contains("2. 2 - 40"), "{text}");
    }

    #[test]
    fn reveal_texts() {
        let config = Config::from_lookup(|_| None, Path::new("no-such-dir")).unwrap();
        let msgs = default_messages();
        let win = PendingWager {
            user_id: "1".into(),
            kind: WagerKind::Dice { roll: 6 },
            outcome: WagerOutcome {
                win: true,
                stake: 10,
                delta: 5,
            },
            score: 105,
        };
        let text = reveal_reply(&msgs, &config, &win);
        assert!(text.contains("Rolled 6"), "{text}");
        assert!(text.contains("win 15"), "{text}");
        assert!(text.contains("Score: 105"), "{text}");

        let loss = PendingWager {
            outcome: WagerOutcome {
                win: false,
                stake: 10,
                delta: -10,
            },
            kind: WagerKind::Dice { roll: 2 },
            score: 90,
            ..win
        };
        let text = reveal_reply(&msgs, &config, &loss);
        assert!(text.contains("lose 10"), "{text}");
        assert!(text.contains("Score: 90"), "{text}");
    }

    #[test]
    fn help_lists_triggers() {
        let config = Config::from_lookup(|_| None, Path::new("no-such-dir")).unwrap();
        let text = help_reply(config.messages_for(crate::messages::Lang::En), &config);
        assert!(text.contains("фаня, фаняк"), "{text}");
        assert!(text.contains("0h 24m 0s"), "{text}");
    }
}
