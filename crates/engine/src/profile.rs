//! Workspace profile: which schema, object types and attribute names
//! the workflows operate on. Every name has a conventional default so a
//! minimal configuration works out of the box.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Schema holding the managed records.
    pub schema: String,
    /// Object type of the managed records.
    pub object_type: String,
    /// Object type of the supplier catalogue.
    pub supplier_type: String,
    /// Tenant discriminator for cache keys. Filled from the connection's
    /// workspace id when left empty.
    pub workspace: String,
    pub user_email_attribute: String,
    pub assignee_attribute: String,
    pub retirement_date_attribute: String,
    pub status_attribute: String,
    pub model_attribute: String,
    pub serial_attribute: String,
    pub invoice_attribute: String,
    pub purchase_date_attribute: String,
    pub cost_attribute: String,
    pub colour_attribute: String,
    pub supplier_attribute: String,
}

impl Default for Profile {
    fn default() -> Self {
        Profile {
            schema: "Hardware".to_string(),
            object_type: "Laptops".to_string(),
            supplier_type: "Suppliers".to_string(),
            workspace: String::new(),
            user_email_attribute: "User Email".to_string(),
            assignee_attribute: "Assignee".to_string(),
            retirement_date_attribute: "Retirement Date".to_string(),
            status_attribute: "Asset Status".to_string(),
            model_attribute: "Model".to_string(),
            serial_attribute: "Serial Number".to_string(),
            invoice_attribute: "Invoice Number".to_string(),
            purchase_date_attribute: "Purchase Date".to_string(),
            cost_attribute: "Cost".to_string(),
            colour_attribute: "Colour".to_string(),
            supplier_attribute: "Supplier".to_string(),
        }
    }
}
