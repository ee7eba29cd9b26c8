use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Admin {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub email: String,
}

#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
pub struct NewAdmin {
    pub name: String,
    pub description: String,
    pub email: String,
}

impl NewAdmin {
    pub fn into_admin(self) -> Admin {
        Admin {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            email: self.email,
        }
    }
}
