pub mod family;

pub use family::FamilyService;
