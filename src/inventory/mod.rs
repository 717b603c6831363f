pub mod directory;
pub mod static_inventory;

pub use directory::OrgDirectory;
pub use static_inventory::StaticInventory;
