#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HotkeyError {
    #[error("Empty key combination")]
    EmptyCombination,

    #[error("Empty key token in '{0}'")]
    EmptyToken(String),

    #[error("Unknown key '{token}' in '{combination}'")]
    UnknownToken { token: String, combination: String },

    #[error("Key '{token}' appears twice in '{combination}'")]
    DuplicateToken { token: String, combination: String },

    #[error("Failed to install keyboard listener: {0}")]
    ListenerInstall(String),
}
