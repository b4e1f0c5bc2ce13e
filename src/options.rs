/// How a union picks among alternatives that all decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnionPolicy {
    /// Alternatives are tried in declaration order; the first that decodes wins.
    #[default]
    FirstMatch,
    /// Every alternative is tried; more than one success is an error.
    Strict,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub union_policy: UnionPolicy,
}

impl DecodeOptions {
    pub fn strict() -> Self {
        Self { union_policy: UnionPolicy::Strict }
    }
}
