pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const WARN: &str = "⚠️";
    pub const SEARCH: &str = "🔍";
    pub const NEW: &str = "✨";
    pub const DEL: &str = "🗑️";
    pub const UP: &str = "⬆️";
    pub const DOWN: &str = "⬇️";
    pub const LINK: &str = "🔗";
    pub const BOLT: &str = "⚡";
}
