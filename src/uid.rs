use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Eq, PartialEq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct UID(String);

impl From<&str> for UID {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Default for UID {
    fn default() -> Self {
        Self::new()
    }
}

impl UID {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uids_differ() {
        let a = UID::new();
        let b = UID::new();
        assert_ne!(a, b);
        assert_eq!(UID::from("grid-1").as_str(), "grid-1");
    }
}
