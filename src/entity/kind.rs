use std::fmt;

/// The three document kinds sharing one access pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// User activity record.
    Activity,
    /// Per-project result record with a contributions counter and answer arrays.
    Result,
    /// Per-project aggregate record with an enrollments counter.
    Stats,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [Self::Activity, Self::Result, Self::Stats];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Result => "result",
            Self::Stats => "stats",
        }
    }

    /// Alias the kind is bound to in update statements (`meta(<alias>).id`).
    pub fn alias(&self) -> &'static str {
        self.label()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
