use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub String);

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Dealer,
    Individual,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dealer => "dealer",
            Self::Individual => "individual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dealer" => Some(Self::Dealer),
            "individual" => Some(Self::Individual),
            _ => None,
        }
    }

    pub fn code_letter(&self) -> char {
        match self {
            Self::Dealer => 'D',
            Self::Individual => 'P',
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub uid: String,
    pub kind: OwnerKind,
    pub display_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub province: String,
    pub post_limit: u32,
}
