pub struct Icons;

impl Icons {
    pub const BOOKS: &str = "📚";
    pub const SEARCH: &str = "🔍";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const FOLDER: &str = "📁";
    pub const QUESTION: &str = "❓";
    pub const ANSWER: &str = "💡";
    pub const NOTE: &str = "📌";
    pub const NEW: &str = "🆕";
    pub const INBOX: &str = "📥";
    pub const CALENDAR: &str = "📅";
    pub const EDIT: &str = "✏️";
    pub const DEL: &str = "🗑️";
    pub const DATABASE: &str = "🗄️";
    pub const KEY: &str = "🔑";
    pub const GLOBE: &str = "🌍";
    pub const ARROW: &str = "»";
}
