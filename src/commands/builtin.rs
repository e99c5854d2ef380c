//! The built-in command set

use super::{CommandAction, CommandPlugin, Mood};
use crate::navigation::{CALCULATOR_URI, FACEBOOK_HOME, GOOGLE_HOME, WHATSAPP_WEB, YOUTUBE_HOME};

fn reply(name: &str, keywords: &[&str], text: String, description: &str) -> CommandPlugin {
    CommandPlugin::new(name, keywords, CommandAction::Reply(text), description)
}

fn open(name: &str, keywords: &[&str], url: &str, reply: &str, description: &str) -> CommandPlugin {
    CommandPlugin::new(
        name,
        keywords,
        CommandAction::Open {
            url: url.to_string(),
            reply: reply.to_string(),
        },
        description,
    )
}

/// Built-in plugins in match-priority order
///
/// Broad phrases ("hi", "what is") are deliberately substring matches, so
/// order decides overlaps: greetings first, web search last.
#[must_use]
pub fn builtin_plugins(assistant_name: &str) -> Vec<CommandPlugin> {
    let mut plugins = vec![
        reply(
            "Greeting",
            &["hey", "hello", "hi"],
            "Hello friend, How May I Help You?".to_string(),
            "Greets the user.",
        ),
        reply(
            "Identity",
            &["who are you"],
            format!(
                "My name is {assistant_name}. I'm a Virtual Assistant Created by Foxa, whose real name is Amay."
            ),
            "Explains who the assistant is.",
        ),
        reply(
            "Status",
            &["how are you"],
            "I am very fine. Thank you so much for asking. I feel so grateful for helping you."
                .to_string(),
            "Responds to status inquiry.",
        ),
        reply(
            "Name",
            &["what is your name"],
            format!("My name is {assistant_name}."),
            "Tells the assistant name.",
        ),
        reply(
            "Farewell",
            &["bye"],
            "Bye, nice meeting you.".to_string(),
            "Says goodbye.",
        ),
        reply(
            "Affection",
            &["i love you"],
            "I appreciate that. I'm here to help you anytime.".to_string(),
            "Responds to \"I love you\".",
        ),
        reply(
            "Compliment",
            &["you are awesome", "you're awesome"],
            "Thank you! I'm glad I could be of assistance.".to_string(),
            "Responds to compliments.",
        ),
        reply(
            "Joke",
            &["tell me a joke"],
            "Why don't scientists trust atoms? Because they make up everything!".to_string(),
            "Tells a joke.",
        ),
        open(
            "Open Google",
            &["open google"],
            GOOGLE_HOME,
            "Opening Google...",
            "Opens Google.",
        ),
        open(
            "Open YouTube",
            &["open youtube"],
            YOUTUBE_HOME,
            "Opening YouTube...",
            "Opens YouTube.",
        ),
        open(
            "Open Facebook",
            &["open facebook"],
            FACEBOOK_HOME,
            "Opening Facebook...",
            "Opens Facebook.",
        ),
        open(
            "Open WhatsApp",
            &["open whatsapp"],
            WHATSAPP_WEB,
            "Opening WhatsApp...",
            "Opens WhatsApp Web.",
        ),
        CommandPlugin::new(
            "Play Song",
            ["play "],
            CommandAction::PlaySong,
            "Plays a song on YouTube.",
        ),
    ];

    plugins.extend(Mood::ALL.into_iter().map(|mood| {
        CommandPlugin::new(
            format!("Mood: {}", mood.name()),
            mood.keywords(),
            CommandAction::Mood(mood),
            mood.description(),
        )
    }));

    plugins.extend([
        CommandPlugin::new(
            "Wikipedia",
            ["wikipedia"],
            CommandAction::Wikipedia,
            "Searches Wikipedia.",
        ),
        CommandPlugin::new(
            "Time",
            ["what time", "current time", "tell me the time"],
            CommandAction::Time,
            "Tells the current time.",
        ),
        CommandPlugin::new(
            "Date",
            ["what date", "current date", "today's date", "what is today"],
            CommandAction::Date,
            "Tells today's date.",
        ),
        CommandPlugin::new(
            "Help",
            ["help", "what can you do", "commands", "command list"],
            CommandAction::Help,
            "Lists all available commands.",
        ),
        open(
            "Calculator",
            &["open calculator", "calculator"],
            CALCULATOR_URI,
            "Opening Calculator",
            "Opens the system calculator.",
        ),
        CommandPlugin::new(
            "Open Camera",
            ["open camera", "turn on camera", "start camera"],
            CommandAction::OpenCamera,
            "Shows the camera preview.",
        ),
        CommandPlugin::new(
            "Close Camera",
            ["close camera", "turn off camera", "stop camera"],
            CommandAction::CloseCamera,
            "Turns the camera off.",
        ),
        CommandPlugin::new(
            "Search",
            ["what is", "who is", "what are", "tell me about"],
            CommandAction::Search,
            "Searches Google for information.",
        ),
    ]);

    plugins
}
