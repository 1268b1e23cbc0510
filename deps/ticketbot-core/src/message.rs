use serenity::builder::CreateEmbed;
use serenity::utils::Colour;

pub const COLOR_DEFAULT: u32 = 0xD08132;
pub const COLOR_INFO: u32 = 0x00C9FF;
pub const COLOR_SUCCESS: u32 = 0x1ed760;
pub const COLOR_ERROR: u32 = 0xFF0000;
pub const COLOR_WARN: u32 = 0xFFB800;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Rich card attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

impl Embed {
    pub fn title<S: ToString>(&mut self, title: S) -> &mut Self {
        self.title = Some(title.to_string());
        self
    }
    pub fn description<S: ToString>(&mut self, description: S) -> &mut Self {
        self.description = Some(description.to_string());
        self
    }
    pub fn color(&mut self, color: u32) -> &mut Self {
        self.color = Some(color);
        self
    }
    pub fn field<N: ToString, V: ToString>(&mut self, name: N, value: V, inline: bool) -> &mut Self {
        self.fields.push(EmbedField {
            name: name.to_string(),
            value: value.to_string(),
            inline,
        });
        self
    }
    pub fn footer<S: ToString>(&mut self, footer: S) -> &mut Self {
        self.footer = Some(footer.to_string());
        self
    }
    pub fn get_field(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.value.as_str())
    }
}

impl From<&Embed> for CreateEmbed {
    fn from(embed: &Embed) -> Self {
        let mut res = CreateEmbed::default();
        if let Some(title) = &embed.title {
            res.title(title);
        }
        if let Some(description) = &embed.description {
            res.description(description);
        }
        if let Some(color) = embed.color {
            res.color(Colour(color));
        }
        for field in &embed.fields {
            res.field(&field.name, &field.value, field.inline);
        }
        if let Some(footer) = &embed.footer {
            res.footer(|f| f.text(footer));
        }
        res
    }
}

/// Message creation interface
///
/// Platform independent description of a message to send, so the same reply
/// can be built by the commands and checked in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub content: String,
    pub embeds: Vec<Embed>,
    /// When false, mentions in the message are rendered but nobody is pinged.
    pub allow_mentions: bool,
}

impl Message {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn with_text<S: ToString>(content: S) -> Self {
        Message {
            content: content.to_string(),
            ..Default::default()
        }
    }
    pub fn add_embed<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut Embed) -> &mut Embed,
    {
        let mut embed = Embed::default();
        f(&mut embed);
        self.embeds.push(embed);
        self
    }
    pub fn silent(mut self) -> Self {
        self.allow_mentions = false;
        self
    }
    pub fn last_embed(&self) -> Option<&Embed> {
        self.embeds.last()
    }
    pub fn create_embeds(&self) -> Vec<CreateEmbed> {
        self.embeds.iter().map(CreateEmbed::from).collect()
    }
}
impl Default for Message {
    fn default() -> Self {
        Self {
            content: String::new(),
            embeds: Vec::new(),
            allow_mentions: true,
        }
    }
}

/// Build an error message
pub fn error<S: ToString>(error_message: S) -> Message {
    custom_embed("Error", error_message, COLOR_ERROR)
}
/// Build a warning message
pub fn warn<S: ToString>(warn_message: S) -> Message {
    custom_embed("Warning", warn_message, COLOR_WARN)
}
/// Build a success message
pub fn success<S: ToString>(success_message: S) -> Message {
    custom_embed("Done", success_message, COLOR_SUCCESS)
}
/// Build an information message
pub fn info<S: ToString>(info_message: S) -> Message {
    custom_embed("Information", info_message, COLOR_INFO)
}
/// Build a custom message
pub fn custom_embed<S1, S2>(title: S1, message: S2, color: u32) -> Message
where
    S1: ToString,
    S2: ToString,
{
    let mut msg = Message::new();
    msg.add_embed(|e| e.title(title).description(message).color(color));
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_build_one_embed() {
        let msg = error("Nope");
        assert!(msg.content.is_empty());
        let embed = msg.last_embed().unwrap();
        assert_eq!(embed.title.as_deref(), Some("Error"));
        assert_eq!(embed.description.as_deref(), Some("Nope"));
        assert_eq!(embed.color, Some(COLOR_ERROR));
    }

    #[test]
    fn silent_message_keeps_content() {
        let msg = Message::with_text("<@1>").silent();
        assert_eq!(msg.content, "<@1>");
        assert!(!msg.allow_mentions);
    }
}
