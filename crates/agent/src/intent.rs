use serde::Serialize;

/// What a chat message is asking about. Rules are tried in declaration order
/// and the first match wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatIntent {
    Greeting,
    Leads,
    Calls,
    Pipeline,
    Sync,
    Help,
    Fallback,
}

impl ChatIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Leads => "leads",
            Self::Calls => "calls",
            Self::Pipeline => "pipeline",
            Self::Sync => "sync",
            Self::Help => "help",
            Self::Fallback => "fallback",
        }
    }
}

struct Rule {
    intent: ChatIntent,
    keywords: &'static [&'static str],
}

const RULES: &[Rule] = &[
    Rule {
        intent: ChatIntent::Greeting,
        keywords: &["hello", "hi", "hey", "good morning", "good afternoon"],
    },
    Rule { intent: ChatIntent::Leads, keywords: &["lead", "contact", "prospect", "customer"] },
    Rule { intent: ChatIntent::Calls, keywords: &["call", "phone", "conversation", "talk"] },
    Rule {
        intent: ChatIntent::Pipeline,
        keywords: &["budget", "deal", "revenue", "pipeline", "money", "sales"],
    },
    Rule { intent: ChatIntent::Sync, keywords: &["sync", "update", "refresh", "latest"] },
    Rule {
        intent: ChatIntent::Help,
        keywords: &["help", "what can you do", "capabilities", "features"],
    },
];

/// Lowercased message split into words, for whole-word keyword matching.
pub struct Utterance {
    text: String,
    words: Vec<String>,
}

impl Utterance {
    pub fn new(message: &str) -> Self {
        let text = message.to_lowercase();
        let words = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect();
        Self { text, words }
    }

    /// Phrases match as substrings; single words match whole words, with a
    /// trailing plural `s` allowed.
    pub fn mentions(&self, keyword: &str) -> bool {
        if keyword.contains(' ') {
            return self.text.contains(keyword);
        }
        self.words.iter().any(|word| {
            word == keyword || word.strip_suffix('s').is_some_and(|stem| stem == keyword)
        })
    }

    pub fn mentions_prefix(&self, prefix: &str) -> bool {
        self.words.iter().any(|word| word.starts_with(prefix))
    }
}

pub fn detect(utterance: &Utterance) -> ChatIntent {
    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|keyword| utterance.mentions(keyword)))
        .map(|rule| rule.intent)
        .unwrap_or(ChatIntent::Fallback)
}
