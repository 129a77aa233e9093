/// Reserved address carrying ephemeral status updates.
pub const STATUS_BROADCAST: &str = "status@broadcast";

const GROUP_SUFFIX: &str = "@g.us";
const USER_SERVER: &str = "s.whatsapp.net";

/// Multi-party chats are addressed with the `@g.us` server suffix.
pub fn is_group(jid: &str) -> bool {
    jid.ends_with(GROUP_SUFFIX)
}

pub fn is_status_broadcast(jid: &str) -> bool {
    jid == STATUS_BROADCAST
}

/// Turn a caller-supplied recipient into a sendable JID.
///
/// Bare phone numbers get the user server appended. Device suffixes
/// (`15037348571:20@s.whatsapp.net`) are stripped, since sends must target
/// the account rather than one of its devices.
pub fn normalize_recipient(to: &str) -> String {
    let to = to.trim();
    let Some((user, server)) = to.split_once('@') else {
        return format!("{}@{}", to.trim_start_matches('+'), USER_SERVER);
    };
    if server.contains('@') {
        return to.to_string();
    }
    let user = user.split(':').next().unwrap_or(user);
    format!("{}@{}", user, server)
}
