#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub name: String,
}
