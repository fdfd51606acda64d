//! What each chat interaction does, minus the Telegram I/O. Every function
//! returns the reply text for the handler to send.

use std::path::Path;

use tracing::{info, warn};
use wienergame_shared::Username;
use wienergame_shared::admin::{self, AdminDecision};
use wienergame_shared::rules::{MessageAction, RuleSet};

use crate::storage::{StorageError, Store};

pub const START_TEXT: &str = "Привіт! Я бот для підрахунку балів за виконані завдання.\n\
    Використовуйте команду /new_admin <username> для призначення адміністратора.";
pub const NEW_ADMIN_USAGE: &str =
    "Будь ласка, введіть username нового адміністратора після команди /new_admin.";
pub const NEW_ADMIN_DENIED: &str = "Тільки поточний адміністратор може змінити адміністратора.";
pub const ADMIN_ONLY: &str = "Тільки адміністратор може використовувати цю команду.";
pub const UPLOAD_NEEDS_DOCUMENT: &str =
    "Будь ласка, відповідайте на повідомлення з прикріпленим CSV-файлом.";
pub const UPLOAD_OK_PREFIX: &str = "Дані з CSV успішно завантажені в базу даних.";
pub const UPLOAD_FAILED_PREFIX: &str = "Помилка при завантаженні даних:";
pub const NO_USERNAME: &str = "Встановіть username у налаштуваннях Telegram, щоб брати участь у грі.";

pub fn new_admin_set_text(admin: &Username) -> String {
    format!("Новий адміністратор встановлений: {}", admin.mention())
}

pub fn task_saved_text(author: &str) -> String {
    format!("@{author}, ваше завдання збережено!")
}

pub fn score_text(user: &str, score: i32) -> String {
    format!("@{user}, ваш рахунок: {score}")
}

pub fn upload_result_text(result: &Result<usize, StorageError>) -> String {
    match result {
        Ok(rows) => format!("{UPLOAD_OK_PREFIX} Записів: {rows}"),
        Err(e) => format!("{UPLOAD_FAILED_PREFIX} {e}"),
    }
}

/// `/new_admin <username>`. Allowed while no admin exists, or for the admin.
pub async fn new_admin(
    store: &Store,
    requester: Option<&str>,
    args: &str,
) -> Result<String, StorageError> {
    let Some(candidate) = admin::parse_new_admin_arg(args) else {
        return Ok(NEW_ADMIN_USAGE.to_string());
    };
    let current = store.get_admin().await?;
    match admin::may_change_admin(current.as_deref(), requester) {
        AdminDecision::Denied => {
            warn!(
                requester = ?requester,
                current = ?current,
                candidate = %candidate,
                "new_admin denied"
            );
            Ok(NEW_ADMIN_DENIED.to_string())
        }
        decision => {
            store.set_admin(candidate.as_str()).await?;
            info!(?decision, requester = ?requester, admin = %candidate, "admin changed");
            Ok(new_admin_set_text(&candidate))
        }
    }
}

/// Whether `requester` may run admin-only commands.
pub async fn is_admin(store: &Store, requester: Option<&str>) -> Result<bool, StorageError> {
    let current = store.get_admin().await?;
    Ok(admin::is_admin(current.as_deref(), requester))
}

/// Imports a downloaded CSV file; failures become part of the reply.
pub async fn import_csv(store: &Store, path: &Path) -> String {
    let result = store.import_tasks_from_file(path).await;
    match &result {
        Ok(rows) => info!(rows, "csv import finished"),
        Err(e) => warn!(error = %e, "csv import failed"),
    }
    upload_result_text(&result)
}

/// Runs the free-text rules against a group message. `None` means the
/// message is not for the bot and gets no reply.
pub async fn group_text(
    store: &Store,
    rules: &RuleSet,
    author: &str,
    text: &str,
) -> Result<Option<String>, StorageError> {
    let Some((rule, action)) = rules.evaluate(text) else {
        return Ok(None);
    };
    match action {
        MessageAction::RecordTask(tc) => {
            let recorded = store
                .record_task(author, &tc.description, Some(tc.mentor.as_str()))
                .await?;
            info!(
                rule,
                username = %author,
                mentor = %tc.mentor,
                points = recorded.points,
                score = recorded.new_score,
                "task recorded"
            );
            Ok(Some(task_saved_text(author)))
        }
    }
}

pub async fn score(store: &Store, user: &str) -> Result<String, StorageError> {
    let value = store.get_user_score(user).await?;
    Ok(score_text(user, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_texts() {
        let carol = Username::parse("@carol").unwrap();
        assert_eq!(
            new_admin_set_text(&carol),
            "Новий адміністратор встановлений: @carol"
        );
        assert_eq!(task_saved_text("alice"), "@alice, ваше завдання збережено!");
        assert_eq!(score_text("alice", 10), "@alice, ваш рахунок: 10");
        assert!(START_TEXT.contains("/new_admin <username>"));
    }

    #[test]
    fn upload_reply_carries_error_text() {
        let ok = upload_result_text(&Ok(3));
        assert_eq!(ok, "Дані з CSV успішно завантажені в базу даних. Записів: 3");
        let err = upload_result_text(&Err(StorageError::Migration("boom".into())));
        assert_eq!(err, "Помилка при завантаженні даних: migration error: boom");
    }
}
