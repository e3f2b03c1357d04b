use serde::{Deserialize, Serialize};

/// Team resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub internal_id: Option<String>,
    pub visibility: Option<String>,
    pub is_archived: Option<bool>,
    pub web_url: Option<String>,
    pub created_date_time: Option<String>,
}

/// Channel within a team
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub membership_type: Option<String>,
    pub email: Option<String>,
    pub web_url: Option<String>,
    pub created_date_time: Option<String>,
}

/// Payload for creating a channel; unset fields are left out of the request
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChannel {
    pub display_name: String,
    pub description: Option<String>,
    pub membership_type: Option<String>,
}

/// Channel or team member
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMember {
    pub id: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
}

/// Message body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    pub content_type: Option<String>,
    pub content: Option<String>,
}

/// Sender identity of a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySet {
    pub user: Option<Identity>,
    pub application: Option<Identity>,
}

/// Channel message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub subject: Option<String>,
    pub body: Option<ItemBody>,
    pub from: Option<IdentitySet>,
    pub created_date_time: Option<String>,
    pub message_type: Option<String>,
    pub reply_to_id: Option<String>,
}

impl ChatMessage {
    pub fn sender_name(&self) -> Option<&str> {
        let from = self.from.as_ref()?;
        from.user
            .as_ref()
            .or(from.application.as_ref())
            .and_then(|i| i.display_name.as_deref())
    }
}
