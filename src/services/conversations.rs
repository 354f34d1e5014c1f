use crate::{
    auth::AuthUser,
    entities::{conversation, message, product, vendor},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("must not be blank"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct StartConversationInput {
    pub product_id: Uuid,
    #[validate(
        length(min = 1, max = 4000, message = "must be 1-4000 characters"),
        custom = "validate_not_blank"
    )]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SendMessageInput {
    #[validate(
        length(min = 1, max = 4000, message = "must be 1-4000 characters"),
        custom = "validate_not_blank"
    )]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<message::Model> for MessageResponse {
    fn from(model: message::Model) -> Self {
        Self {
            id: model.id,
            conversation_id: model.conversation_id,
            sender_id: model.sender_id,
            body: model.body,
            is_read: model.is_read,
            read_at: model.read_at,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    /// Messages addressed to the caller that are still unread
    pub unread_count: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StartedConversation {
    pub conversation: ConversationSummary,
    pub message: MessageResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkReadResponse {
    /// Messages newly marked as read
    pub updated: u64,
}

async fn insert_message<C: ConnectionTrait>(
    db: &C,
    conversation: conversation::Model,
    sender_id: Uuid,
    body: String,
) -> Result<(conversation::Model, message::Model), ServiceError> {
    let now = Utc::now();
    let message = message::ActiveModel {
        id: Set(Uuid::new_v4()),
        conversation_id: Set(conversation.id),
        sender_id: Set(sender_id),
        body: Set(body),
        is_read: Set(false),
        read_at: Set(None),
        created_at: Set(now),
    }
    .insert(db)
    .await?;

    let mut active: conversation::ActiveModel = conversation.into();
    active.last_message_at = Set(Some(now));
    let conversation = active.update(db).await?;
    Ok((conversation, message))
}

/// Buyer/seller messaging about a product
#[derive(Clone)]
pub struct ConversationService {
    db: Arc<DatabaseConnection>,
}

impl ConversationService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Opens (or reuses) the caller's thread with the product's seller and posts the first message.
    #[instrument(skip(self, user, input), fields(user_id = %user.user_id))]
    pub async fn start_conversation(
        &self,
        user: &AuthUser,
        input: StartConversationInput,
    ) -> Result<StartedConversation, ServiceError> {
        input.validate()?;
        let body = input.message.trim().to_string();

        let product = product::Entity::find_by_id(input.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product"))?;
        let seller = vendor::Entity::find_by_id(product.vendor_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Vendor"))?;
        if seller.user_id == user.user_id {
            return Err(ServiceError::BadRequest(
                "You cannot start a conversation about your own product".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let existing = conversation::Entity::find()
            .filter(conversation::Column::BuyerId.eq(user.user_id))
            .filter(conversation::Column::SellerId.eq(seller.user_id))
            .filter(conversation::Column::ProductId.eq(product.id))
            .one(&txn)
            .await?;
        let conversation = match existing {
            Some(conversation) => conversation,
            None => {
                conversation::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    buyer_id: Set(user.user_id),
                    seller_id: Set(seller.user_id),
                    product_id: Set(product.id),
                    last_message_at: Set(None),
                    created_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?
            }
        };
        let (conversation, message) = insert_message(&txn, conversation, user.user_id, body).await?;
        txn.commit().await?;

        info!(conversation_id = %conversation.id, product_id = %product.id, "conversation started");
        Ok(StartedConversation {
            conversation: ConversationSummary {
                id: conversation.id,
                buyer_id: conversation.buyer_id,
                seller_id: conversation.seller_id,
                product_id: conversation.product_id,
                product_name: Some(product.name),
                last_message: Some(message.body.clone()),
                last_message_at: conversation.last_message_at,
                unread_count: 0,
                created_at: conversation.created_at,
            },
            message: message.into(),
        })
    }

    /// Threads where the caller is buyer or seller, most recently active first.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list_conversations(&self, user: &AuthUser) -> Result<Vec<ConversationSummary>, ServiceError> {
        let conversations = conversation::Entity::find()
            .filter(
                Condition::any()
                    .add(conversation::Column::BuyerId.eq(user.user_id))
                    .add(conversation::Column::SellerId.eq(user.user_id)),
            )
            .order_by_desc(conversation::Column::LastMessageAt)
            .order_by_desc(conversation::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        if conversations.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = conversations.iter().map(|c| c.id).collect();
        let product_ids: Vec<Uuid> = conversations.iter().map(|c| c.product_id).collect();

        let names: HashMap<Uuid, String> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let messages = message::Entity::find()
            .filter(message::Column::ConversationId.is_in(ids))
            .order_by_asc(message::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        let mut last: HashMap<Uuid, String> = HashMap::new();
        let mut unread: HashMap<Uuid, u64> = HashMap::new();
        for m in messages {
            if !m.is_read && m.sender_id != user.user_id {
                *unread.entry(m.conversation_id).or_default() += 1;
            }
            last.insert(m.conversation_id, m.body);
        }

        Ok(conversations
            .into_iter()
            .map(|c| ConversationSummary {
                id: c.id,
                buyer_id: c.buyer_id,
                seller_id: c.seller_id,
                product_id: c.product_id,
                product_name: names.get(&c.product_id).cloned(),
                last_message: last.remove(&c.id),
                last_message_at: c.last_message_at,
                unread_count: unread.get(&c.id).copied().unwrap_or(0),
                created_at: c.created_at,
            })
            .collect())
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn get_messages(
        &self,
        user: &AuthUser,
        conversation_id: Uuid,
    ) -> Result<Vec<MessageResponse>, ServiceError> {
        let conversation = self.participant_conversation(user, conversation_id).await?;
        Ok(message::Entity::find()
            .filter(message::Column::ConversationId.eq(conversation.id))
            .order_by_asc(message::Column::CreatedAt)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(MessageResponse::from)
            .collect())
    }

    #[instrument(skip(self, user, input), fields(user_id = %user.user_id))]
    pub async fn send_message(
        &self,
        user: &AuthUser,
        conversation_id: Uuid,
        input: SendMessageInput,
    ) -> Result<MessageResponse, ServiceError> {
        input.validate()?;
        let body = input.body.trim().to_string();
        let conversation = self.participant_conversation(user, conversation_id).await?;

        let txn = self.db.begin().await?;
        let (_, message) = insert_message(&txn, conversation, user.user_id, body).await?;
        txn.commit().await?;
        Ok(message.into())
    }

    /// Marks messages sent to the caller as read. Already read messages keep their `read_at`.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn mark_read(
        &self,
        user: &AuthUser,
        conversation_id: Uuid,
    ) -> Result<MarkReadResponse, ServiceError> {
        let conversation = self.participant_conversation(user, conversation_id).await?;
        let result = message::Entity::update_many()
            .col_expr(message::Column::IsRead, Expr::value(true))
            .col_expr(message::Column::ReadAt, Expr::value(Utc::now()))
            .filter(message::Column::ConversationId.eq(conversation.id))
            .filter(message::Column::SenderId.ne(user.user_id))
            .filter(message::Column::IsRead.eq(false))
            .exec(&*self.db)
            .await?;
        Ok(MarkReadResponse {
            updated: result.rows_affected,
        })
    }

    async fn participant_conversation(
        &self,
        user: &AuthUser,
        conversation_id: Uuid,
    ) -> Result<conversation::Model, ServiceError> {
        let conversation = conversation::Entity::find_by_id(conversation_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Conversation"))?;
        if !conversation.is_participant(user.user_id) {
            return Err(ServiceError::Forbidden(
                "You are not a participant in this conversation".to_string(),
            ));
        }
        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   \n")]
    fn blank_body_is_rejected(#[case] body: &str) {
        let input = SendMessageInput { body: body.to_string() };
        assert!(input.validate().is_err());
    }

    #[test]
    fn overlong_body_is_rejected() {
        let input = StartConversationInput {
            product_id: Uuid::new_v4(),
            message: "a".repeat(4001),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn padded_body_passes() {
        let input = SendMessageInput { body: "  Muraho! Is this in stock? ".to_string() };
        assert!(input.validate().is_ok());
    }
}
