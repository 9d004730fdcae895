//! Comment dialog of the chat bot as a plain state machine.
//!
//! [`transition`] is pure: it takes the current state and an event and
//! returns the next state plus the effects the host should run, in order.
//! The host executes effects (API calls, messages) and reports API outcomes
//! back as [`DialogEvent::Failed`] when something goes wrong.

use std::fmt::Write as _;

use crate::models::Comment;

pub const ADD_PROMPT: &str = "Введите ваш новый комментарий:";
pub const EDIT_PROMPT: &str = "✏️ Введите новый текст комментария:";
pub const CONFIRM_DELETE_PROMPT: &str = "Вы уверены, что хотите удалить этот комментарий?";
pub const NO_COMMENTS_TEXT: &str = "💬 У этой задачи пока нет комментариев.";

const SEPARATOR: &str = "───────────────────────────────────";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    List,
    Add,
    Edit { comment_id: i64 },
    ConfirmDelete { comment_id: i64 },
    /// The user left for the task details screen.
    Closed,
}

/// Data fixed for the lifetime of one dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogContext {
    pub task_id: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogEvent {
    /// Show (or refresh) the comment list.
    Open,
    AddPressed,
    EditRequested { comment_id: i64 },
    DeleteRequested { comment_id: i64 },
    TextEntered(String),
    Confirm,
    Cancel,
    Back,
    /// An effect's API call failed; carries the user-facing message.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadComments { task_id: String },
    CreateComment { task_id: String, user_id: i64, content: String },
    UpdateComment { task_id: String, comment_id: i64, content: String },
    DeleteComment { task_id: String, comment_id: i64 },
    Prompt(&'static str),
    ShowError(String),
    OpenTaskDetails { task_id: String },
}

pub fn transition(
    state: DialogState,
    event: DialogEvent,
    ctx: &DialogContext,
) -> (DialogState, Vec<Effect>) {
    use DialogEvent as E;
    use DialogState as S;

    let load = || Effect::LoadComments {
        task_id: ctx.task_id.clone(),
    };

    match (state, event) {
        (_, E::Open) => (S::List, vec![load()]),
        (_, E::EditRequested { comment_id }) => {
            (S::Edit { comment_id }, vec![Effect::Prompt(EDIT_PROMPT)])
        }
        (_, E::DeleteRequested { comment_id }) => (
            S::ConfirmDelete { comment_id },
            vec![Effect::Prompt(CONFIRM_DELETE_PROMPT)],
        ),
        (S::Closed, _) => (S::Closed, vec![]),
        (state, E::Failed(message)) => (state, vec![Effect::ShowError(message)]),

        (S::List, E::AddPressed) => (S::Add, vec![Effect::Prompt(ADD_PROMPT)]),
        (S::List, E::Back) => (
            S::Closed,
            vec![Effect::OpenTaskDetails {
                task_id: ctx.task_id.clone(),
            }],
        ),

        (S::Add, E::TextEntered(text)) => match normalize(&text) {
            Some(content) => (
                S::List,
                vec![
                    Effect::CreateComment {
                        task_id: ctx.task_id.clone(),
                        user_id: ctx.user_id,
                        content,
                    },
                    load(),
                ],
            ),
            None => (S::Add, vec![]),
        },
        (S::Edit { comment_id }, E::TextEntered(text)) => match normalize(&text) {
            Some(content) => (
                S::List,
                vec![
                    Effect::UpdateComment {
                        task_id: ctx.task_id.clone(),
                        comment_id,
                        content,
                    },
                    load(),
                ],
            ),
            None => (S::Edit { comment_id }, vec![]),
        },
        (S::ConfirmDelete { comment_id }, E::Confirm) => (
            S::List,
            vec![
                Effect::DeleteComment {
                    task_id: ctx.task_id.clone(),
                    comment_id,
                },
                load(),
            ],
        ),
        (S::Add | S::Edit { .. } | S::ConfirmDelete { .. }, E::Cancel | E::Back) => {
            (S::List, vec![load()])
        }

        (state, _) => (state, vec![]),
    }
}

fn normalize(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Target of a `/start <payload>` deep link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLink {
    Task { task_id: String },
    EditComment { comment_id: i64, task_id: String },
    DeleteComment { comment_id: i64, task_id: String },
}

impl StartLink {
    /// The event that opens the comment dialog at this link, if it targets one.
    pub fn dialog_entry(&self) -> Option<(DialogEvent, &str)> {
        match self {
            Self::Task { .. } => None,
            Self::EditComment {
                comment_id,
                task_id,
            } => Some((
                DialogEvent::EditRequested {
                    comment_id: *comment_id,
                },
                task_id.as_str(),
            )),
            Self::DeleteComment {
                comment_id,
                task_id,
            } => Some((
                DialogEvent::DeleteRequested {
                    comment_id: *comment_id,
                },
                task_id.as_str(),
            )),
        }
    }
}

pub fn parse_start_payload(payload: &str) -> Option<StartLink> {
    let payload = payload.trim();

    if let Some(rest) = payload.strip_prefix("edit_comment_") {
        let (comment_id, task_id) = split_comment_link(rest)?;
        return Some(StartLink::EditComment {
            comment_id,
            task_id,
        });
    }
    if let Some(rest) = payload.strip_prefix("delete_comment_") {
        let (comment_id, task_id) = split_comment_link(rest)?;
        return Some(StartLink::DeleteComment {
            comment_id,
            task_id,
        });
    }
    if let Some(task_id) = payload.strip_prefix("task_") {
        if !task_id.is_empty() {
            return Some(StartLink::Task {
                task_id: task_id.to_string(),
            });
        }
    }
    None
}

fn split_comment_link(rest: &str) -> Option<(i64, String)> {
    let (comment_id, task_id) = rest.split_once("_task_")?;
    let comment_id = comment_id.parse().ok()?;
    if task_id.is_empty() {
        return None;
    }
    Some((comment_id, task_id.to_string()))
}

/// Text of the list screen, with edit/delete deep links per comment.
pub fn render_comments(bot_username: &str, task_id: &str, comments: &[Comment]) -> String {
    if comments.is_empty() {
        return NO_COMMENTS_TEXT.to_string();
    }

    let base_url = format!("https://t.me/{bot_username}?start=");
    let mut text = String::from("🗒 <b>Комментарии:</b>\n\n");

    for (i, comment) in comments.iter().enumerate() {
        if i > 0 {
            text.push('\n');
        }
        let _ = write!(
            text,
            "{SEPARATOR}\n{}\n\n\
             ✏️ <a href='{base_url}edit_comment_{id}_task_{task_id}'>Изменить</a> | \
             🗑 <a href='{base_url}delete_comment_{id}_task_{task_id}'>Удалить</a>",
            escape_html(&comment.content),
            id = comment.id,
        );
    }

    text
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ctx() -> DialogContext {
        DialogContext {
            task_id: "T1".to_string(),
            user_id: 42,
        }
    }

    fn load() -> Effect {
        Effect::LoadComments {
            task_id: "T1".to_string(),
        }
    }

    #[test]
    fn open_shows_list_from_any_state() {
        for state in [
            DialogState::List,
            DialogState::Add,
            DialogState::Closed,
            DialogState::ConfirmDelete { comment_id: 3 },
        ] {
            let (next, effects) = transition(state, DialogEvent::Open, &ctx());
            assert_eq!(next, DialogState::List);
            assert_eq!(effects, vec![load()]);
        }
    }

    #[test]
    fn adding_a_comment_creates_then_reloads() {
        let (state, effects) = transition(DialogState::List, DialogEvent::AddPressed, &ctx());
        assert_eq!(state, DialogState::Add);
        assert_eq!(effects, vec![Effect::Prompt(ADD_PROMPT)]);

        let (state, effects) = transition(
            state,
            DialogEvent::TextEntered("  hello  ".to_string()),
            &ctx(),
        );
        assert_eq!(state, DialogState::List);
        assert_eq!(
            effects,
            vec![
                Effect::CreateComment {
                    task_id: "T1".to_string(),
                    user_id: 42,
                    content: "hello".to_string(),
                },
                load(),
            ]
        );
    }

    #[test]
    fn blank_text_keeps_waiting_for_input() {
        let (state, effects) =
            transition(DialogState::Add, DialogEvent::TextEntered("   ".into()), &ctx());
        assert_eq!(state, DialogState::Add);
        assert!(effects.is_empty());

        let edit = DialogState::Edit { comment_id: 5 };
        let (state, effects) = transition(edit, DialogEvent::TextEntered(String::new()), &ctx());
        assert_eq!(state, edit);
        assert!(effects.is_empty());
    }

    #[test]
    fn editing_updates_the_requested_comment() {
        let (state, _) = transition(
            DialogState::List,
            DialogEvent::EditRequested { comment_id: 5 },
            &ctx(),
        );
        let (state, effects) = transition(state, DialogEvent::TextEntered("fixed".into()), &ctx());

        assert_eq!(state, DialogState::List);
        assert_eq!(
            effects[0],
            Effect::UpdateComment {
                task_id: "T1".to_string(),
                comment_id: 5,
                content: "fixed".to_string(),
            }
        );
    }

    #[test]
    fn delete_requires_confirmation() {
        let (state, effects) = transition(
            DialogState::List,
            DialogEvent::DeleteRequested { comment_id: 9 },
            &ctx(),
        );
        assert_eq!(state, DialogState::ConfirmDelete { comment_id: 9 });
        assert_eq!(effects, vec![Effect::Prompt(CONFIRM_DELETE_PROMPT)]);

        let (cancelled, effects) = transition(state, DialogEvent::Cancel, &ctx());
        assert_eq!(cancelled, DialogState::List);
        assert_eq!(effects, vec![load()]);

        let (confirmed, effects) = transition(state, DialogEvent::Confirm, &ctx());
        assert_eq!(confirmed, DialogState::List);
        assert_eq!(
            effects,
            vec![
                Effect::DeleteComment {
                    task_id: "T1".to_string(),
                    comment_id: 9,
                },
                load(),
            ]
        );
    }

    #[test]
    fn back_from_list_returns_to_task() {
        let (state, effects) = transition(DialogState::List, DialogEvent::Back, &ctx());
        assert_eq!(state, DialogState::Closed);
        assert_eq!(
            effects,
            vec![Effect::OpenTaskDetails {
                task_id: "T1".to_string()
            }]
        );

        let (state, effects) = transition(state, DialogEvent::Confirm, &ctx());
        assert_eq!(state, DialogState::Closed);
        assert!(effects.is_empty());
    }

    #[test]
    fn failures_are_shown_without_changing_state() {
        let (state, effects) = transition(
            DialogState::Add,
            DialogEvent::Failed("Такой задачи мы у Вас не нашли".into()),
            &ctx(),
        );
        assert_eq!(state, DialogState::Add);
        assert_eq!(
            effects,
            vec![Effect::ShowError("Такой задачи мы у Вас не нашли".into())]
        );
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let (state, effects) = transition(DialogState::List, DialogEvent::Confirm, &ctx());
        assert_eq!(state, DialogState::List);
        assert!(effects.is_empty());
    }

    #[test]
    fn parses_start_payloads() {
        assert_eq!(
            parse_start_payload("task_abc"),
            Some(StartLink::Task {
                task_id: "abc".to_string()
            })
        );
        assert_eq!(
            parse_start_payload("edit_comment_12_task_abc"),
            Some(StartLink::EditComment {
                comment_id: 12,
                task_id: "abc".to_string()
            })
        );
        assert_eq!(
            parse_start_payload("delete_comment_3_task_a_b"),
            Some(StartLink::DeleteComment {
                comment_id: 3,
                task_id: "a_b".to_string()
            })
        );
        assert_eq!(parse_start_payload("edit_comment_x_task_abc"), None);
        assert_eq!(parse_start_payload("edit_comment_1_task_"), None);
        assert_eq!(parse_start_payload("task_"), None);
        assert_eq!(parse_start_payload("hello"), None);
    }

    #[test]
    fn start_link_opens_dialog_at_requested_comment() {
        let link = parse_start_payload("delete_comment_3_task_T1").unwrap();
        let (event, task_id) = link.dialog_entry().unwrap();
        assert_eq!(task_id, "T1");

        let (state, _) = transition(DialogState::Closed, event, &ctx());
        assert_eq!(state, DialogState::ConfirmDelete { comment_id: 3 });

        assert!(StartLink::Task { task_id: "T1".into() }.dialog_entry().is_none());
    }

    #[test]
    fn renders_empty_and_populated_lists() {
        assert_eq!(render_comments("bot", "T1", &[]), NO_COMMENTS_TEXT);

        let comments = vec![Comment {
            id: 7,
            task_id: "T1".to_string(),
            user_id: 42,
            content: "a <b> & c".to_string(),
            created_at: Utc::now(),
        }];
        let text = render_comments("todo_bot", "T1", &comments);

        assert!(text.starts_with("🗒 <b>Комментарии:</b>"));
        assert!(text.contains("a &lt;b&gt; &amp; c"));
        assert!(text.contains("https://t.me/todo_bot?start=edit_comment_7_task_T1"));
        assert!(text.contains("https://t.me/todo_bot?start=delete_comment_7_task_T1"));
    }
}
