//! Chat-style conversation handed to a vision-language planner.
//!
//! Only the structure is modelled here. Tokenization and chat templating belong
//! to the model backend.

use crate::tensor::ImageTensor;

/// Default system instruction for the driving assistant.
pub const SYSTEM_PROMPT: &str = "You are a driving assistant that generates safe and accurate actions.";

/// Default user instruction placed after the camera frame.
pub const DEFAULT_USER_PROMPT: &str = "Explain the current scene and plan a safe 6-second trajectory.";

/// Speaker of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Instructions for the model.
    System,
    /// The human turn carrying the camera frame and the question.
    User,
    /// A (possibly partial) model turn.
    Assistant,
}

/// One piece of message content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    /// A camera frame.
    Image(ImageTensor),
    /// Plain text.
    Text(String),
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Who is speaking.
    pub role: Role,
    /// Ordered content parts.
    pub content: Vec<ContentPart>,
}

impl ChatMessage {
    /// A text-only message.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: vec![ContentPart::Text(text.into())],
        }
    }

    /// The last text part, if any.
    pub fn last_text(&self) -> Option<&str> {
        self.content.iter().rev().find_map(|part| match part {
            ContentPart::Text(text) => Some(text.as_str()),
            ContentPart::Image(_) => None,
        })
    }

    /// Iterator over image parts.
    pub fn images(&self) -> impl Iterator<Item = &ImageTensor> {
        self.content.iter().filter_map(|part| match part {
            ContentPart::Image(image) => Some(image),
            ContentPart::Text(_) => None,
        })
    }
}

/// System message followed by a user message holding the frame and the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Build the standard two-message conversation for one camera frame.
    pub fn for_image(image: ImageTensor) -> Self {
        let user = ChatMessage {
            role: Role::User,
            content: vec![
                ContentPart::Image(image),
                ContentPart::Text(DEFAULT_USER_PROMPT.to_string()),
            ],
        };
        Conversation {
            messages: vec![ChatMessage::text(Role::System, SYSTEM_PROMPT), user],
        }
    }

    /// Replace the text of the final part of the user message.
    ///
    /// If the user message ends with an image, the prompt is appended instead.
    pub fn set_user_prompt(&mut self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        let Some(user) = self.messages.iter_mut().rev().find(|m| m.role == Role::User) else {
            self.messages.push(ChatMessage::text(Role::User, prompt));
            return;
        };
        match user.content.last_mut() {
            Some(ContentPart::Text(text)) => *text = prompt,
            _ => user.content.push(ContentPart::Text(prompt)),
        }
    }

    /// Builder-style [`Conversation::set_user_prompt`].
    pub fn with_user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.set_user_prompt(prompt);
        self
    }

    /// All messages in order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The text the model is asked to continue from.
    pub fn user_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .and_then(ChatMessage::last_text)
    }

    /// First image in the conversation.
    pub fn image(&self) -> Option<&ImageTensor> {
        self.messages.iter().flat_map(|m| m.images()).next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn frame() -> ImageTensor {
        ImageTensor::from_rgb(&RgbImage::new(4, 2))
    }

    #[test]
    fn test_for_image_layout() {
        let conversation = Conversation::for_image(frame());
        let messages = conversation.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert!(matches!(messages[1].content[0], ContentPart::Image(_)));
        assert_eq!(conversation.user_prompt(), Some(DEFAULT_USER_PROMPT));
        assert_eq!(conversation.image().map(ImageTensor::shape), Some([1, 3, 2, 4]));
    }

    #[test]
    fn test_set_user_prompt_replaces_last_text() {
        let conversation = Conversation::for_image(frame()).with_user_prompt("Where can I park?");
        assert_eq!(conversation.user_prompt(), Some("Where can I park?"));
        // Image is kept, prompt replaced in place.
        assert_eq!(conversation.messages()[1].content.len(), 2);
    }

    #[test]
    fn test_set_user_prompt_appends_after_image() {
        let mut conversation = Conversation {
            messages: vec![ChatMessage {
                role: Role::User,
                content: vec![ContentPart::Image(frame())],
            }],
        };
        conversation.set_user_prompt("Describe the intersection.");
        assert_eq!(conversation.messages()[0].content.len(), 2);
        assert_eq!(conversation.user_prompt(), Some("Describe the intersection."));
    }
}
