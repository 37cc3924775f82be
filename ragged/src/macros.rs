/// Creates a single [`Message`](crate::Message) from a kind shorthand.
///
/// ```rust
/// use ragged::{MessageKind, msg};
///
/// let message = msg!(bot => "Done.");
/// assert_eq!(message.kind, MessageKind::Bot);
/// assert_eq!(message.text, "Done.");
///
/// let result = msg!(tool("call_1") => "Cargo.toml");
/// assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));
/// ```
#[macro_export]
macro_rules! msg {
    (system => $text:expr $(,)?) => {
        $crate::Message::system($text)
    };
    (user => $text:expr $(,)?) => {
        $crate::Message::user($text)
    };
    (bot => $text:expr $(,)?) => {
        $crate::Message::bot($text)
    };
    (error => $text:expr $(,)?) => {
        $crate::Message::error($text)
    };
    (tool($call_id:expr) => $text:expr $(,)?) => {
        $crate::Message::tool_result($call_id, $text)
    };
    ($kind:ident => $text:expr $(,)?) => {
        compile_error!("unsupported message kind: use system, user, bot, error, or tool(<call id>)");
    };
}

/// Creates a `Vec<Message>` from kind/text pairs.
///
/// ```rust
/// use ragged::{MessageKind, messages};
///
/// let history = messages![
///     system => "You are concise.",
///     user => "Summarize this repository.",
/// ];
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history[0].kind, MessageKind::System);
/// assert_eq!(history[1].kind, MessageKind::User);
/// ```
#[macro_export]
macro_rules! messages {
    () => {
        Vec::<$crate::Message>::new()
    };
    ($($kind:ident $(($call_id:expr))? => $text:expr),+ $(,)?) => {
        vec![$($crate::msg!($kind $(($call_id))? => $text)),+]
    };
}
