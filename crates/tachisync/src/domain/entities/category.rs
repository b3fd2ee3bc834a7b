#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub sort_order: i64,
}

impl Category {
    /// Id of the implicit "Default" category, it never exists in storage
    pub const SYSTEM_ID: i64 = 0;
}
