//! Fixed user-facing reply texts.

pub const HELP: &str = "
Вы можете управлять мной, посылая эти команды (только в приватном диалоге)

/suggest - предложить новую подпись
/approve - просмотр предложенных подписей (только для администрации)
/cancel - отменить текущую команду
";

pub const UNKNOWN_ERROR: &str = "Произошла непредвиденная ошибка.";

pub const SUGGEST_PROMPT: &str = "Отправьте в чат подпись, которую вы хотите предложить.";
pub const SUGGEST_SUCCESS: &str = "Подпись была успешно отправлена на подтверждение.";
pub const SUGGEST_DUPLICATE: &str = "Такая подпись уже существует. Попробуйте что-нибудь другое.";
pub const SUGGEST_CANCELLED: &str = "Команда /suggest была успешно отменена.";

pub const APPROVE_EMPTY: &str = "Не удалось найти подписи на одобрение.";
pub const APPROVE_FINISHED: &str = "Подписи на одобрение закончились";
pub const APPROVE_CANCELLED: &str = "Команда /approve была успешно отменена.";

pub const BUTTON_APPROVE: &str = "Одобрить";
pub const BUTTON_REJECT: &str = "Отклонить";
pub const BUTTON_CANCEL: &str = "Отмена";

/// Reply to a failed caption submission.
pub fn suggest_failed(detail: &str) -> String {
    format!("Не удалось отправить подпись. {detail}")
}
