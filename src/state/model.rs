/// Lifecycle of one editor session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    Closed,
    #[default]
    Loading,
    Editing,
    Saving,
}

impl SessionState {
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Closed)
    }
}
