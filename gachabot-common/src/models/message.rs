// File: gachabot-common/src/models/message.rs

/// Renderable message payload handed to the notifier. Callers fill fields;
/// how the chat platform lays them out is the notifier's business.
#[derive(Debug, Clone, Default)]
pub struct MessageBody {
    pub content: Option<String>,
    pub card: Option<Card>,
}

impl MessageBody {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            card: None,
        }
    }

    pub fn card(card: Card) -> Self {
        Self {
            content: None,
            card: Some(card),
        }
    }
}

/// An embed-style card: title, link, labeled fields, image.
#[derive(Debug, Clone, Default)]
pub struct Card {
    pub title: String,
    pub url: Option<String>,
    pub fields: Vec<CardField>,
    pub image_url: Option<String>,
    pub footer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CardField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl CardField {
    pub fn inline(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: true,
        }
    }

    pub fn block(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: false,
        }
    }
}
